use sqlx::SqlitePool;

use crate::config::Config;

pub mod completion;
pub mod profile;
pub mod task;
pub mod trophy;
pub mod xp_event;

pub use completion::*;
pub use profile::*;
pub use task::*;
pub use trophy::*;
pub use xp_event::*;

/// Application state shared across all handlers
pub struct AppState {
    pub db: SqlitePool,
    pub config: Config,
}
