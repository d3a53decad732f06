use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a string does not name a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized value: {0}")]
pub struct InvalidValue(pub String);

// ============================================================================
// Task Types
// ============================================================================

/// How often a user may complete a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// One completion ever, or up to the configured cap.
    Single,
    /// The cap resets every calendar day.
    Daily,
    /// Repeatable; unbounded unless a cap is configured.
    Multi,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Single => "single",
            TaskType::Daily => "daily",
            TaskType::Multi => "multi",
        }
    }
}

impl FromStr for TaskType {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(TaskType::Single),
            "daily" => Ok(TaskType::Daily),
            "multi" => Ok(TaskType::Multi),
            other => Err(InvalidValue(other.to_string())),
        }
    }
}

/// Task lifecycle status. Tasks are never hard-deleted while completions
/// reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Locked,
    Archived,
    Deleted,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Locked => "locked",
            TaskStatus::Archived => "archived",
            TaskStatus::Deleted => "deleted",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(TaskStatus::Active),
            "locked" => Ok(TaskStatus::Locked),
            "archived" => Ok(TaskStatus::Archived),
            "deleted" => Ok(TaskStatus::Deleted),
            other => Err(InvalidValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Short uppercase human code; stable and immutable once created.
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub reward_xp: i64,
    pub task_type: TaskType,
    pub max_user_completions: Option<i64>,
    pub deadline_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub status: TaskStatus,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task annotated with the requesting user's quota standing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskWithQuota {
    pub task: Task,
    pub used_count: i64,
    /// `None` means unbounded.
    pub max_for_user: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub reward_xp: i64,
    pub task_type: Option<TaskType>,
    pub max_user_completions: Option<i64>,
    pub deadline_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveTaskResponse {
    pub task_code: String,
    pub status: TaskStatus,
    pub already_archived: bool,
}

// ============================================================================
// Completion Types
// ============================================================================

/// Completion state machine: `pending` transitions exactly once, to
/// `approved` or `rejected`, and is never re-opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Pending,
    Approved,
    Rejected,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::Pending => "pending",
            CompletionStatus::Approved => "approved",
            CompletionStatus::Rejected => "rejected",
        }
    }

    /// Whether this completion consumes quota (rejected ones never do).
    pub fn counts_against_limit(&self) -> bool {
        matches!(self, CompletionStatus::Pending | CompletionStatus::Approved)
    }
}

impl FromStr for CompletionStatus {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(CompletionStatus::Pending),
            "approved" => Ok(CompletionStatus::Approved),
            "rejected" => Ok(CompletionStatus::Rejected),
            other => Err(InvalidValue(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Completion {
    pub id: Uuid,
    pub task_id: Uuid,
    pub user_id: i64,
    pub status: CompletionStatus,
    /// Reward captured when the completion was submitted.
    pub reward_xp: i64,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decided_by: Option<i64>,
}

/// A pending completion joined with its task, for the admin review queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingCompletion {
    pub completion: Completion,
    pub task_code: String,
    pub task_title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitCompletionRequest {
    pub task_code: String,
}

/// Result of a submission attempt. Business outcomes like an unknown code or
/// an exhausted quota are success payloads, not errors; callers branch on the
/// `status` discriminator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    Pending {
        completion_id: Uuid,
        task_code: String,
        reward_xp: i64,
        used_count: i64,
        max_for_user: Option<i64>,
    },
    TaskNotFound {
        task_code: String,
    },
    TaskInactive {
        task_code: String,
    },
    LimitReached {
        task_code: String,
        used_count: i64,
        max_for_user: Option<i64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveResponse {
    pub completion_id: Uuid,
    pub reward_xp: i64,
    pub profile: Profile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectResponse {
    pub completion_id: Uuid,
    pub status: CompletionStatus,
}

// ============================================================================
// Profile Types
// ============================================================================

/// Level standing derived from cumulative XP. Advancing from level L to
/// L + 1 costs `500 * L` XP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelStats {
    pub level: i32,
    pub current_xp: i64,
    pub next_level_xp: i64,
    pub progress_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub total_xp: i64,
    pub level: i32,
    pub current_xp: i64,
    pub next_level_xp: i64,
}

impl Profile {
    /// The view returned for users who have never earned XP; not persisted.
    pub fn empty(user_id: i64) -> Self {
        Self {
            user_id,
            total_xp: 0,
            level: 1,
            current_xp: 0,
            next_level_xp: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub profile: Profile,
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProfileRequest {
    pub total_xp: i64,
}

// ============================================================================
// XP Event Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XpEventType {
    XpGain,
    TaskCompleted,
    LevelUp,
}

impl XpEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            XpEventType::XpGain => "xp_gain",
            XpEventType::TaskCompleted => "task_completed",
            XpEventType::LevelUp => "level_up",
        }
    }
}

impl FromStr for XpEventType {
    type Err = InvalidValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xp_gain" => Ok(XpEventType::XpGain),
            "task_completed" => Ok(XpEventType::TaskCompleted),
            "level_up" => Ok(XpEventType::LevelUp),
            other => Err(InvalidValue(other.to_string())),
        }
    }
}

/// Append-only audit record of an XP-affecting occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XpEvent {
    pub id: Uuid,
    pub user_id: i64,
    pub event_type: XpEventType,
    pub amount: Option<i64>,
    pub source: Option<String>,
    pub task_id: Option<Uuid>,
    pub level_from: Option<i32>,
    pub level_to: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: String,
    pub amount: Option<i64>,
    pub source: Option<String>,
    pub task_id: Option<Uuid>,
    pub level_from: Option<i32>,
    pub level_to: Option<i32>,
}

// ============================================================================
// Trophy Types
// ============================================================================

/// Catalog entry; static reference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trophy {
    pub code: String,
    pub title: String,
    pub description: String,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrophyStatus {
    pub trophy: Trophy,
    pub unlocked: bool,
    pub unlocked_at: Option<DateTime<Utc>>,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSuccess<T> {
    pub data: T,
}

impl<T> ApiSuccess<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

// ============================================================================
// Tests
// ============================================================================
