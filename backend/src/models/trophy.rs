use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database model for trophy catalog entries
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrophyRow {
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TrophyRow {
    pub fn to_shared(&self) -> shared::Trophy {
        shared::Trophy {
            code: self.code.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            created_at: self.created_at,
        }
    }
}

/// Database model for per-user trophy unlocks
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrophyUnlockRow {
    pub user_id: i64,
    pub trophy_code: String,
    pub unlocked_at: DateTime<Utc>,
}
