use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for task completions
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CompletionRow {
    pub id: String,
    pub task_id: String,
    pub user_id: i64,
    pub status: String,
    pub reward_xp: i64,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<i64>,
}

impl CompletionRow {
    pub fn to_shared(&self) -> shared::Completion {
        shared::Completion {
            id: Uuid::parse_str(&self.id).unwrap(),
            task_id: Uuid::parse_str(&self.task_id).unwrap(),
            user_id: self.user_id,
            status: self
                .status
                .parse()
                .unwrap_or(shared::CompletionStatus::Pending),
            reward_xp: self.reward_xp,
            created_at: self.created_at,
            decided_at: self.decided_at,
            decided_by: self.decided_by,
        }
    }
}

/// Completion joined with its task, for the admin review queue
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PendingCompletionRow {
    pub id: String,
    pub task_id: String,
    pub user_id: i64,
    pub status: String,
    pub reward_xp: i64,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<i64>,
    pub task_code: String,
    pub task_title: String,
}

impl PendingCompletionRow {
    pub fn to_shared(&self) -> shared::PendingCompletion {
        let completion = CompletionRow {
            id: self.id.clone(),
            task_id: self.task_id.clone(),
            user_id: self.user_id,
            status: self.status.clone(),
            reward_xp: self.reward_xp,
            created_at: self.created_at,
            decided_at: self.decided_at,
            decided_by: self.decided_by,
        };

        shared::PendingCompletion {
            completion: completion.to_shared(),
            task_code: self.task_code.clone(),
            task_title: self.task_title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::CompletionStatus;

    #[test]
    fn test_completion_row_to_shared() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let task_id = Uuid::new_v4();

        let row = CompletionRow {
            id: id.to_string(),
            task_id: task_id.to_string(),
            user_id: 42,
            status: "pending".to_string(),
            reward_xp: 250,
            created_at: now,
            decided_at: None,
            decided_by: None,
        };

        let shared = row.to_shared();

        assert_eq!(shared.id, id);
        assert_eq!(shared.task_id, task_id);
        assert_eq!(shared.user_id, 42);
        assert_eq!(shared.status, CompletionStatus::Pending);
        assert_eq!(shared.reward_xp, 250);
        assert!(shared.decided_at.is_none());
    }

    #[test]
    fn test_pending_completion_row_to_shared() {
        let now = Utc::now();
        let row = PendingCompletionRow {
            id: Uuid::new_v4().to_string(),
            task_id: Uuid::new_v4().to_string(),
            user_id: 7,
            status: "pending".to_string(),
            reward_xp: 100,
            created_at: now,
            decided_at: None,
            decided_by: None,
            task_code: "STREAM_A1B2".to_string(),
            task_title: "Host a stream".to_string(),
        };

        let shared = row.to_shared();
        assert_eq!(shared.task_code, "STREAM_A1B2");
        assert_eq!(shared.task_title, "Host a stream");
        assert_eq!(shared.completion.user_id, 7);
    }
}
