use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for per-user XP profiles
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProfileRow {
    pub user_id: i64,
    pub total_xp: i64,
    pub level: i32,
    pub current_xp: i64,
    pub next_level_xp: i64,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn to_shared(&self) -> shared::Profile {
        shared::Profile {
            user_id: self.user_id,
            total_xp: self.total_xp,
            level: self.level,
            current_xp: self.current_xp,
            next_level_xp: self.next_level_xp,
        }
    }
}
