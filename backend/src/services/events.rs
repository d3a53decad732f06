use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::XpEventRow;
use shared::{XpEvent, XpEventType};

/// Events endpoint page size; the feed is a recent-activity view, not a
/// full export.
const FEED_LIMIT: i64 = 50;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// An XP event to be appended to the audit log.
#[derive(Debug, Clone)]
pub struct NewXpEvent {
    pub user_id: i64,
    pub event_type: XpEventType,
    pub amount: Option<i64>,
    pub source: Option<String>,
    pub task_id: Option<Uuid>,
    pub level_from: Option<i32>,
    pub level_to: Option<i32>,
}

impl NewXpEvent {
    /// The event written when an approved completion awards XP.
    pub fn task_completed(
        user_id: i64,
        task_id: Uuid,
        amount: i64,
        level_from: i32,
        level_to: i32,
    ) -> Self {
        Self {
            user_id,
            event_type: XpEventType::TaskCompleted,
            amount: Some(amount),
            source: Some("task".to_string()),
            task_id: Some(task_id),
            level_from: Some(level_from),
            level_to: Some(level_to),
        }
    }
}

/// Append one event to the log. Events are never updated or deleted.
pub async fn append_event(pool: &SqlitePool, event: &NewXpEvent) -> Result<XpEvent, EventError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO xp_events (id, user_id, event_type, amount, source, task_id, level_from, level_to, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(event.user_id)
    .bind(event.event_type.as_str())
    .bind(event.amount)
    .bind(event.source.as_deref())
    .bind(event.task_id.map(|id| id.to_string()))
    .bind(event.level_from)
    .bind(event.level_to)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(XpEvent {
        id,
        user_id: event.user_id,
        event_type: event.event_type,
        amount: event.amount,
        source: event.source.clone(),
        task_id: event.task_id,
        level_from: event.level_from,
        level_to: event.level_to,
        created_at: now,
    })
}

/// Recent events for one user, newest first.
pub async fn list_events(pool: &SqlitePool, user_id: i64) -> Result<Vec<XpEvent>, EventError> {
    let events: Vec<XpEventRow> = sqlx::query_as(
        "SELECT * FROM xp_events WHERE user_id = ? ORDER BY created_at DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(FEED_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(events.into_iter().map(|e| e.to_shared()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_completed_event_shape() {
        let task_id = Uuid::new_v4();
        let event = NewXpEvent::task_completed(42, task_id, 600, 1, 2);

        assert_eq!(event.user_id, 42);
        assert_eq!(event.event_type, XpEventType::TaskCompleted);
        assert_eq!(event.amount, Some(600));
        assert_eq!(event.source.as_deref(), Some("task"));
        assert_eq!(event.task_id, Some(task_id));
        assert_eq!(event.level_from, Some(1));
        assert_eq!(event.level_to, Some(2));
    }
}
