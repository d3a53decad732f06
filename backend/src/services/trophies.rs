use chrono::Utc;
use sqlx::SqlitePool;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{TrophyRow, TrophyUnlockRow};
use shared::TrophyStatus;

#[derive(Debug, Error)]
pub enum TrophyError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Before/after view of a user's standing for one XP award.
#[derive(Debug, Clone, Copy)]
pub struct TrophySnapshot {
    pub prev_total_xp: i64,
    pub new_total_xp: i64,
    pub prev_level: i32,
    pub new_level: i32,
    /// Total approved completions across all tasks, including the one that
    /// triggered this evaluation.
    pub approved_tasks: i64,
}

struct TrophyRule {
    code: &'static str,
    applies: fn(&TrophySnapshot) -> bool,
}

/// Unlock conditions, evaluated in this order. XP and level rules fire on
/// the threshold crossing (previously below, now at or above); task-count
/// rules are guarded by the already-unlocked set.
const RULES: &[TrophyRule] = &[
    TrophyRule {
        code: "awakening",
        applies: |s| s.prev_total_xp <= 0 && s.new_total_xp > 0,
    },
    TrophyRule {
        code: "blade_accept",
        applies: |s| s.prev_total_xp < 10 && s.new_total_xp >= 10,
    },
    TrophyRule {
        code: "inner_pulse",
        applies: |s| s.approved_tasks >= 1,
    },
    TrophyRule {
        code: "contours_open",
        applies: |s| s.prev_level < 2 && s.new_level >= 2,
    },
    TrophyRule {
        code: "mind_ignition",
        applies: |s| s.prev_total_xp < 300 && s.new_total_xp >= 300,
    },
    TrophyRule {
        code: "step_renounce",
        applies: |s| s.approved_tasks >= 3,
    },
    TrophyRule {
        code: "initiated",
        applies: |s| s.prev_level < 3 && s.new_level >= 3,
    },
    TrophyRule {
        code: "shadow_cross",
        applies: |s| s.prev_level < 4 && s.new_level >= 4,
    },
    TrophyRule {
        code: "flame_bearer",
        applies: |s| s.prev_total_xp < 1000 && s.new_total_xp >= 1000,
    },
    TrophyRule {
        code: "chosen_node",
        applies: |s| s.approved_tasks >= 10,
    },
];

/// Codes that qualify under `snapshot` and are not in `unlocked` yet.
/// A single pass never yields the same code twice.
pub fn newly_qualified(snapshot: &TrophySnapshot, unlocked: &HashSet<String>) -> Vec<&'static str> {
    let mut seen: HashSet<&str> = unlocked.iter().map(String::as_str).collect();
    let mut fresh = Vec::new();

    for rule in RULES {
        if (rule.applies)(snapshot) && seen.insert(rule.code) {
            fresh.push(rule.code);
        }
    }

    fresh
}

/// Evaluate all trophy conditions for a user after an XP award and persist
/// any new unlocks. Returns the newly unlocked codes.
///
/// Callers treat this as best-effort: the approval that triggered it has
/// already committed, so failures are logged by the caller and swallowed.
pub async fn evaluate_unlocks(
    pool: &SqlitePool,
    user_id: i64,
    prev_total_xp: i64,
    new_total_xp: i64,
    prev_level: i32,
    new_level: i32,
) -> Result<Vec<&'static str>, TrophyError> {
    let approved_tasks = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM completions WHERE user_id = ? AND status = 'approved'",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let unlocked_codes: Vec<String> = sqlx::query_scalar(
        "SELECT trophy_code FROM trophy_unlocks WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    let unlocked: HashSet<String> = unlocked_codes.into_iter().collect();

    let snapshot = TrophySnapshot {
        prev_total_xp,
        new_total_xp,
        prev_level,
        new_level,
        approved_tasks,
    };

    let fresh = newly_qualified(&snapshot, &unlocked);
    if fresh.is_empty() {
        return Ok(fresh);
    }

    let now = Utc::now();
    for code in fresh.iter().copied() {
        // The unique (user_id, trophy_code) constraint makes a concurrent
        // duplicate a no-op rather than an error.
        sqlx::query(
            "INSERT OR IGNORE INTO trophy_unlocks (user_id, trophy_code, unlocked_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(code)
        .bind(now)
        .execute(pool)
        .await?;
    }

    Ok(fresh)
}

/// The trophy catalog, annotated with unlock state when a user is given.
pub async fn list_trophies(
    pool: &SqlitePool,
    user_id: Option<i64>,
) -> Result<Vec<TrophyStatus>, TrophyError> {
    let trophies: Vec<TrophyRow> =
        sqlx::query_as("SELECT * FROM trophies ORDER BY created_at ASC, code ASC")
            .fetch_all(pool)
            .await?;

    let unlocks: Vec<TrophyUnlockRow> = match user_id {
        Some(user_id) => {
            sqlx::query_as("SELECT * FROM trophy_unlocks WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(pool)
                .await?
        }
        None => Vec::new(),
    };

    let unlocked_at: std::collections::HashMap<String, chrono::DateTime<Utc>> = unlocks
        .into_iter()
        .map(|u| (u.trophy_code, u.unlocked_at))
        .collect();

    Ok(trophies
        .into_iter()
        .map(|row| {
            let at = unlocked_at.get(&row.code).copied();
            TrophyStatus {
                trophy: row.to_shared(),
                unlocked: at.is_some(),
                unlocked_at: at,
            }
        })
        .collect())
}
