use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for tasks
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TaskRow {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub reward_xp: i64,
    pub task_type: String,
    pub max_user_completions: Option<i64>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub status: String,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRow {
    pub fn to_shared(&self) -> shared::Task {
        shared::Task {
            id: Uuid::parse_str(&self.id).unwrap(),
            code: self.code.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            reward_xp: self.reward_xp,
            task_type: self.task_type.parse().unwrap_or(shared::TaskType::Single),
            max_user_completions: self.max_user_completions,
            deadline_at: self.deadline_at,
            is_active: self.is_active,
            status: self.status.parse().unwrap_or(shared::TaskStatus::Active),
            created_by: self.created_by,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{TaskStatus, TaskType};

    fn sample_row() -> TaskRow {
        let now = Utc::now();
        TaskRow {
            id: Uuid::new_v4().to_string(),
            code: "INVITE_X9K2".to_string(),
            title: "Invite a friend".to_string(),
            description: Some("Bring someone new".to_string()),
            category: "invite".to_string(),
            reward_xp: 150,
            task_type: "daily".to_string(),
            max_user_completions: Some(3),
            deadline_at: None,
            is_active: true,
            status: "active".to_string(),
            created_by: Some(111),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_task_row_to_shared() {
        let row = sample_row();
        let shared = row.to_shared();

        assert_eq!(shared.id.to_string(), row.id);
        assert_eq!(shared.code, "INVITE_X9K2");
        assert_eq!(shared.task_type, TaskType::Daily);
        assert_eq!(shared.status, TaskStatus::Active);
        assert_eq!(shared.reward_xp, 150);
        assert_eq!(shared.max_user_completions, Some(3));
        assert!(shared.is_active);
    }

    #[test]
    fn test_task_row_unknown_type_defaults_to_single() {
        let mut row = sample_row();
        row.task_type = "weekly".to_string();
        assert_eq!(row.to_shared().task_type, TaskType::Single);
    }
}
