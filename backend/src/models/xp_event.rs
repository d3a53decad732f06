use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for XP audit events
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct XpEventRow {
    pub id: String,
    pub user_id: i64,
    pub event_type: String,
    pub amount: Option<i64>,
    pub source: Option<String>,
    pub task_id: Option<String>,
    pub level_from: Option<i32>,
    pub level_to: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl XpEventRow {
    pub fn to_shared(&self) -> shared::XpEvent {
        shared::XpEvent {
            id: Uuid::parse_str(&self.id).unwrap(),
            user_id: self.user_id,
            event_type: self
                .event_type
                .parse()
                .unwrap_or(shared::XpEventType::XpGain),
            amount: self.amount,
            source: self.source.clone(),
            task_id: self.task_id.as_ref().and_then(|id| Uuid::parse_str(id).ok()),
            level_from: self.level_from,
            level_to: self.level_to,
            created_at: self.created_at,
        }
    }
}
