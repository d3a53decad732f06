use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{CompletionRow, PendingCompletionRow};
use crate::services::limits::{self, CompletionStamp};
use crate::services::{events, leveling, profiles, tasks as task_service, trophies};
use shared::{
    ApproveResponse, CompletionStatus, PendingCompletion, RejectResponse, SubmitOutcome, TaskStatus,
};

/// Review queue page size bounds.
const PENDING_DEFAULT_LIMIT: i64 = 50;
const PENDING_MAX_LIMIT: i64 = 200;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("Completion not found")]
    NotFound,
    #[error("Completion is not pending")]
    InvalidStatus,
    #[error("Profile error: {0}")]
    ProfileError(#[from] profiles::ProfileError),
    #[error("Task error: {0}")]
    TaskError(#[from] task_service::TaskError),
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Submit a completion claim for the task named by `task_code`.
///
/// Unknown codes, inactive tasks and exhausted quotas are ordinary outcomes
/// carried in [`SubmitOutcome`], not errors. XP is never awarded here; a
/// pending record is created for an admin to decide, with the task's current
/// reward captured as the snapshot that approval will pay out.
pub async fn submit(
    pool: &SqlitePool,
    user_id: i64,
    task_code: &str,
) -> Result<SubmitOutcome, CompletionError> {
    let code = task_code.trim().to_uppercase();

    let task = match task_service::find_task_by_code(pool, &code).await? {
        Some(task) => task,
        None => return Ok(SubmitOutcome::TaskNotFound { task_code: code }),
    };

    if !task.is_active || task.status != TaskStatus::Active {
        return Ok(SubmitOutcome::TaskInactive { task_code: code });
    }

    let day_start = limits::current_day_start();

    // The quota read and the pending insert share one write transaction so
    // two near-simultaneous submissions cannot both pass the check.
    let mut tx = pool.begin().await?;

    let prior: Vec<(DateTime<Utc>, String)> = sqlx::query_as(
        r#"
        SELECT created_at, status FROM completions
        WHERE task_id = ? AND user_id = ? AND status IN ('pending', 'approved')
        "#,
    )
    .bind(task.id.to_string())
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;

    let stamps: Vec<CompletionStamp> = prior
        .into_iter()
        .filter_map(|(created_at, status)| {
            status
                .parse()
                .ok()
                .map(|status| CompletionStamp { created_at, status })
        })
        .collect();

    let usage = limits::evaluate_limit(
        task.task_type,
        task.max_user_completions,
        &stamps,
        day_start,
    );

    if !usage.allowed() {
        tx.rollback().await?;
        return Ok(SubmitOutcome::LimitReached {
            task_code: task.code,
            used_count: usage.used_count,
            max_for_user: usage.max_for_user,
        });
    }

    let completion_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO completions (id, task_id, user_id, status, reward_xp, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(completion_id.to_string())
    .bind(task.id.to_string())
    .bind(user_id)
    .bind(CompletionStatus::Pending.as_str())
    .bind(task.reward_xp)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(SubmitOutcome::Pending {
        completion_id,
        task_code: task.code,
        reward_xp: task.reward_xp,
        used_count: usage.used_count + 1,
        max_for_user: usage.max_for_user,
    })
}

async fn find_completion(
    pool: &SqlitePool,
    completion_id: &Uuid,
) -> Result<CompletionRow, CompletionError> {
    let completion: Option<CompletionRow> =
        sqlx::query_as("SELECT * FROM completions WHERE id = ?")
            .bind(completion_id.to_string())
            .fetch_optional(pool)
            .await?;

    completion.ok_or(CompletionError::NotFound)
}

/// Transition a pending completion to a terminal status. The update is
/// conditional on `status = 'pending'`, so of two concurrent deciders only
/// one can succeed; the loser sees zero rows affected.
async fn transition_pending(
    pool: &SqlitePool,
    completion_id: &Uuid,
    to: CompletionStatus,
    admin_id: i64,
) -> Result<(), CompletionError> {
    let result = sqlx::query(
        r#"
        UPDATE completions SET status = ?, decided_at = ?, decided_by = ?
        WHERE id = ? AND status = 'pending'
        "#,
    )
    .bind(to.as_str())
    .bind(Utc::now())
    .bind(admin_id)
    .bind(completion_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(CompletionError::InvalidStatus);
    }

    Ok(())
}

/// Approve a pending completion and award its XP snapshot.
///
/// The status transition and the profile update commit first; the audit
/// event and trophy evaluation run after and are best-effort — their
/// failures are logged and never surface as the approval's failure.
pub async fn approve(
    pool: &SqlitePool,
    completion_id: &Uuid,
    admin_id: i64,
) -> Result<ApproveResponse, CompletionError> {
    let completion = find_completion(pool, completion_id).await?;

    if completion.status != CompletionStatus::Pending.as_str() {
        return Err(CompletionError::InvalidStatus);
    }

    transition_pending(pool, completion_id, CompletionStatus::Approved, admin_id).await?;

    let reward_xp = completion.reward_xp;
    let award = profiles::award_xp(pool, completion.user_id, reward_xp).await?;
    let prev_level = leveling::compute_level_stats(award.prev_total_xp).level;
    let new_level = award.profile.level;

    let task_id = Uuid::parse_str(&completion.task_id).unwrap_or_default();
    let event = events::NewXpEvent::task_completed(
        completion.user_id,
        task_id,
        reward_xp,
        prev_level,
        new_level,
    );
    if let Err(e) = events::append_event(pool, &event).await {
        log::error!(
            "Failed to append task_completed event for completion {completion_id}: {e:?}"
        );
    }

    match trophies::evaluate_unlocks(
        pool,
        completion.user_id,
        award.prev_total_xp,
        award.profile.total_xp,
        prev_level,
        new_level,
    )
    .await
    {
        Ok(unlocked) if !unlocked.is_empty() => {
            log::info!(
                "Unlocked trophies for user {}: {:?}",
                completion.user_id,
                unlocked
            );
        }
        Ok(_) => {}
        Err(e) => {
            log::error!(
                "Trophy evaluation failed for user {}: {e:?}",
                completion.user_id
            );
        }
    }

    Ok(ApproveResponse {
        completion_id: *completion_id,
        reward_xp,
        profile: award.profile,
    })
}

/// Reject a pending completion. Terminal; no XP, no profile change, no
/// trophy evaluation.
pub async fn reject(
    pool: &SqlitePool,
    completion_id: &Uuid,
    admin_id: i64,
) -> Result<RejectResponse, CompletionError> {
    let completion = find_completion(pool, completion_id).await?;

    if completion.status != CompletionStatus::Pending.as_str() {
        return Err(CompletionError::InvalidStatus);
    }

    transition_pending(pool, completion_id, CompletionStatus::Rejected, admin_id).await?;

    Ok(RejectResponse {
        completion_id: *completion_id,
        status: CompletionStatus::Rejected,
    })
}

/// The admin review queue: pending completions, oldest first so no request
/// starves, with task context joined in.
pub async fn list_pending(
    pool: &SqlitePool,
    limit: Option<i64>,
) -> Result<Vec<PendingCompletion>, CompletionError> {
    let limit = limit
        .filter(|n| *n > 0)
        .unwrap_or(PENDING_DEFAULT_LIMIT)
        .min(PENDING_MAX_LIMIT);

    let rows: Vec<PendingCompletionRow> = sqlx::query_as(
        r#"
        SELECT c.id, c.task_id, c.user_id, c.status, c.reward_xp, c.created_at, c.decided_at, c.decided_by,
               t.code AS task_code, t.title AS task_title
        FROM completions c
        JOIN tasks t ON t.id = c.task_id
        WHERE c.status = 'pending'
        ORDER BY c.created_at ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.to_shared()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{CreateTaskRequest, TaskType, XpEventType};
    use sqlx::sqlite::SqlitePoolOptions;

    const ADMIN_ID: i64 = 999;
    const USER_ID: i64 = 42;

    /// Fresh in-memory database with migrations applied. A single
    /// connection keeps every query on the same memory store.
    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        pool
    }

    async fn create_task(pool: &SqlitePool, reward_xp: i64, task_type: TaskType) -> shared::Task {
        let request = CreateTaskRequest {
            title: "Invite a friend".to_string(),
            description: None,
            category: Some("invite".to_string()),
            reward_xp,
            task_type: Some(task_type),
            max_user_completions: None,
            deadline_at: None,
        };
        task_service::create_task(pool, &request, ADMIN_ID).await.unwrap()
    }

    fn pending_id(outcome: &SubmitOutcome) -> Uuid {
        match outcome {
            SubmitOutcome::Pending { completion_id, .. } => *completion_id,
            other => panic!("expected pending outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_completion_error_display() {
        assert_eq!(CompletionError::NotFound.to_string(), "Completion not found");
        assert_eq!(
            CompletionError::InvalidStatus.to_string(),
            "Completion is not pending"
        );
    }

    #[test]
    fn test_pending_limit_clamping() {
        let clamp = |n: Option<i64>| {
            n.filter(|v| *v > 0)
                .unwrap_or(PENDING_DEFAULT_LIMIT)
                .min(PENDING_MAX_LIMIT)
        };

        assert_eq!(clamp(None), 50);
        assert_eq!(clamp(Some(0)), 50);
        assert_eq!(clamp(Some(-3)), 50);
        assert_eq!(clamp(Some(25)), 25);
        assert_eq!(clamp(Some(1000)), 200);
    }

    #[tokio::test]
    async fn test_submit_unknown_code() {
        let pool = setup_pool().await;

        let outcome = submit(&pool, USER_ID, "  missing_code ").await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::TaskNotFound { task_code } if task_code == "MISSING_CODE"
        ));
    }

    #[tokio::test]
    async fn test_submit_archived_task_is_inactive() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 100, TaskType::Single).await;
        task_service::archive_task(&pool, &task.code).await.unwrap();

        let outcome = submit(&pool, USER_ID, &task.code).await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::TaskInactive { .. }));
    }

    #[tokio::test]
    async fn test_submit_single_task_twice_hits_limit() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 100, TaskType::Single).await;

        let first = submit(&pool, USER_ID, &task.code).await.unwrap();
        assert!(matches!(
            first,
            SubmitOutcome::Pending { used_count: 1, max_for_user: Some(1), .. }
        ));

        let second = submit(&pool, USER_ID, &task.code).await.unwrap();
        assert!(matches!(
            second,
            SubmitOutcome::LimitReached { used_count: 1, max_for_user: Some(1), .. }
        ));

        // Another user still has quota
        let other = submit(&pool, USER_ID + 1, &task.code).await.unwrap();
        assert!(matches!(other, SubmitOutcome::Pending { .. }));
    }

    #[tokio::test]
    async fn test_submit_awards_no_xp() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 100, TaskType::Single).await;

        submit(&pool, USER_ID, &task.code).await.unwrap();

        let (profile, is_new) = profiles::get_profile(&pool, USER_ID).await.unwrap();
        assert!(is_new);
        assert_eq!(profile.total_xp, 0);
    }

    #[tokio::test]
    async fn test_approve_awards_xp_and_records_audit_trail() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 600, TaskType::Single).await;

        let outcome = submit(&pool, USER_ID, &task.code).await.unwrap();
        let completion_id = pending_id(&outcome);

        let response = approve(&pool, &completion_id, ADMIN_ID).await.unwrap();

        assert_eq!(response.reward_xp, 600);
        assert_eq!(response.profile.total_xp, 600);
        assert_eq!(response.profile.level, 2);
        assert_eq!(response.profile.current_xp, 100);
        assert_eq!(response.profile.next_level_xp, 1000);

        // Profile invariant: stored stats match the leveling engine exactly
        let (profile, is_new) = profiles::get_profile(&pool, USER_ID).await.unwrap();
        assert!(!is_new);
        let stats = leveling::compute_level_stats(profile.total_xp);
        assert_eq!(profile.level, stats.level);
        assert_eq!(profile.current_xp, stats.current_xp);
        assert_eq!(profile.next_level_xp, stats.next_level_xp);

        // Level transition is audited
        let feed = events::list_events(&pool, USER_ID).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].event_type, XpEventType::TaskCompleted);
        assert_eq!(feed[0].amount, Some(600));
        assert_eq!(feed[0].level_from, Some(1));
        assert_eq!(feed[0].level_to, Some(2));

        // First XP and level 2 trophies are newly unlocked
        let trophies = trophies::list_trophies(&pool, Some(USER_ID)).await.unwrap();
        let unlocked: Vec<&str> = trophies
            .iter()
            .filter(|t| t.unlocked)
            .map(|t| t.trophy.code.as_str())
            .collect();
        assert!(unlocked.contains(&"awakening"));
        assert!(unlocked.contains(&"contours_open"));
        assert!(unlocked.contains(&"inner_pulse"));
    }

    #[tokio::test]
    async fn test_approved_completion_is_terminal() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 100, TaskType::Single).await;
        let completion_id = pending_id(&submit(&pool, USER_ID, &task.code).await.unwrap());

        approve(&pool, &completion_id, ADMIN_ID).await.unwrap();

        assert!(matches!(
            approve(&pool, &completion_id, ADMIN_ID).await,
            Err(CompletionError::InvalidStatus)
        ));
        assert!(matches!(
            reject(&pool, &completion_id, ADMIN_ID).await,
            Err(CompletionError::InvalidStatus)
        ));

        // The second attempts performed no writes: XP was awarded once
        let (profile, _) = profiles::get_profile(&pool, USER_ID).await.unwrap();
        assert_eq!(profile.total_xp, 100);
    }

    #[tokio::test]
    async fn test_reject_leaves_profile_and_events_untouched() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 100, TaskType::Single).await;
        let completion_id = pending_id(&submit(&pool, USER_ID, &task.code).await.unwrap());

        let response = reject(&pool, &completion_id, ADMIN_ID).await.unwrap();
        assert_eq!(response.status, CompletionStatus::Rejected);

        let (profile, is_new) = profiles::get_profile(&pool, USER_ID).await.unwrap();
        assert!(is_new);
        assert_eq!(profile.total_xp, 0);
        assert!(events::list_events(&pool, USER_ID).await.unwrap().is_empty());

        // Rejected completions do not consume quota
        let retry = submit(&pool, USER_ID, &task.code).await.unwrap();
        assert!(matches!(retry, SubmitOutcome::Pending { used_count: 1, .. }));
    }

    #[tokio::test]
    async fn test_decide_unknown_completion() {
        let pool = setup_pool().await;
        let missing = Uuid::new_v4();

        assert!(matches!(
            approve(&pool, &missing, ADMIN_ID).await,
            Err(CompletionError::NotFound)
        ));
        assert!(matches!(
            reject(&pool, &missing, ADMIN_ID).await,
            Err(CompletionError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_pending_queue_is_oldest_first() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 50, TaskType::Multi).await;

        let first = pending_id(&submit(&pool, USER_ID, &task.code).await.unwrap());
        let second = pending_id(&submit(&pool, USER_ID, &task.code).await.unwrap());

        let queue = list_pending(&pool, None).await.unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue[0].completion.id, first);
        assert_eq!(queue[1].completion.id, second);
        assert_eq!(queue[0].task_code, task.code);
        assert_eq!(queue[0].task_title, task.title);

        let limited = list_pending(&pool, Some(1)).await.unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].completion.id, first);
    }

    #[tokio::test]
    async fn test_repeated_approvals_accumulate_xp() {
        let pool = setup_pool().await;
        let task = create_task(&pool, 300, TaskType::Multi).await;

        for _ in 0..3 {
            let id = pending_id(&submit(&pool, USER_ID, &task.code).await.unwrap());
            approve(&pool, &id, ADMIN_ID).await.unwrap();
        }

        let (profile, _) = profiles::get_profile(&pool, USER_ID).await.unwrap();
        assert_eq!(profile.total_xp, 900);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.current_xp, 400);
        assert_eq!(profile.next_level_xp, 1000);
    }
}
