use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::ProfileRow;
use crate::services::leveling;
use shared::Profile;

/// Upper bound on compare-and-swap retries when concurrent approvals
/// contend on the same profile row.
const MAX_CAS_ATTEMPTS: u32 = 8;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("Profile update contention for user {0}")]
    Contention(i64),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Result of an XP award: the total before the award and the updated profile.
#[derive(Debug, Clone)]
pub struct XpAward {
    pub prev_total_xp: i64,
    pub profile: Profile,
}

/// Fetch a user's profile, or the unpersisted empty view if none exists.
/// The second value is true when no stored profile was found.
pub async fn get_profile(pool: &SqlitePool, user_id: i64) -> Result<(Profile, bool), ProfileError> {
    let row: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match row {
        Some(row) => Ok((row.to_shared(), false)),
        None => Ok((Profile::empty(user_id), true)),
    }
}

/// Add `amount` XP to a user's profile, creating it if absent.
///
/// The increment is a compare-and-swap loop keyed on the previous
/// `total_xp`: a concurrent award invalidates the conditional update (zero
/// rows affected) and this attempt re-reads and retries, so no award is
/// ever lost. Derived columns are always recomputed through the leveling
/// engine from the new total.
pub async fn award_xp(pool: &SqlitePool, user_id: i64, amount: i64) -> Result<XpAward, ProfileError> {
    for _ in 0..MAX_CAS_ATTEMPTS {
        let existing: Option<ProfileRow> = sqlx::query_as("SELECT * FROM profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

        let now = Utc::now();

        match existing {
            None => {
                let stats = leveling::compute_level_stats(amount);
                let result = sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO profiles (user_id, total_xp, level, current_xp, next_level_xp, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(user_id)
                .bind(amount)
                .bind(stats.level)
                .bind(stats.current_xp)
                .bind(stats.next_level_xp)
                .bind(now)
                .execute(pool)
                .await?;

                if result.rows_affected() == 1 {
                    return Ok(XpAward {
                        prev_total_xp: 0,
                        profile: Profile {
                            user_id,
                            total_xp: amount,
                            level: stats.level,
                            current_xp: stats.current_xp,
                            next_level_xp: stats.next_level_xp,
                        },
                    });
                }
                // Lost the creation race to another writer; retry against
                // the row it inserted.
            }
            Some(row) => {
                let prev_total_xp = row.total_xp;
                let new_total_xp = prev_total_xp + amount;
                let stats = leveling::compute_level_stats(new_total_xp);

                let result = sqlx::query(
                    r#"
                    UPDATE profiles SET total_xp = ?, level = ?, current_xp = ?, next_level_xp = ?, updated_at = ?
                    WHERE user_id = ? AND total_xp = ?
                    "#,
                )
                .bind(new_total_xp)
                .bind(stats.level)
                .bind(stats.current_xp)
                .bind(stats.next_level_xp)
                .bind(now)
                .bind(user_id)
                .bind(prev_total_xp)
                .execute(pool)
                .await?;

                if result.rows_affected() == 1 {
                    return Ok(XpAward {
                        prev_total_xp,
                        profile: Profile {
                            user_id,
                            total_xp: new_total_xp,
                            level: stats.level,
                            current_xp: stats.current_xp,
                            next_level_xp: stats.next_level_xp,
                        },
                    });
                }
            }
        }
    }

    Err(ProfileError::Contention(user_id))
}

/// Overwrite a user's profile from a client-reported XP total.
///
/// Derived stats are always recomputed server-side; client-computed level
/// fields are never trusted.
pub async fn sync_profile(
    pool: &SqlitePool,
    user_id: i64,
    total_xp: i64,
) -> Result<Profile, ProfileError> {
    let stats = leveling::compute_level_stats(total_xp);
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO profiles (user_id, total_xp, level, current_xp, next_level_xp, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            total_xp = excluded.total_xp,
            level = excluded.level,
            current_xp = excluded.current_xp,
            next_level_xp = excluded.next_level_xp,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(user_id)
    .bind(total_xp)
    .bind(stats.level)
    .bind(stats.current_xp)
    .bind(stats.next_level_xp)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Profile {
        user_id,
        total_xp,
        level: stats.level,
        current_xp: stats.current_xp,
        next_level_xp: stats.next_level_xp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_error_display() {
        assert_eq!(
            ProfileError::Contention(42).to_string(),
            "Profile update contention for user 42"
        );
    }
}
