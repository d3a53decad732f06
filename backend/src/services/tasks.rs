use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::models::TaskRow;
use crate::services::limits::{self, CompletionStamp};
use shared::{CreateTaskRequest, Task, TaskStatus, TaskWithQuota};

/// Maximum length of the title-derived code prefix.
const CODE_PREFIX_LEN: usize = 12;
const CODE_SUFFIX_LEN: usize = 4;
const CODE_SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Task not found")]
    NotFound,
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Derive a stable human code from a task title: uppercased alphanumeric
/// prefix plus a random suffix to keep codes unique across similar titles.
pub fn generate_task_code(title: &str) -> String {
    let mut base = String::new();
    let mut last_was_sep = false;
    for ch in title.to_uppercase().chars() {
        if ch.is_ascii_alphanumeric() {
            base.push(ch);
            last_was_sep = false;
        } else if !base.is_empty() && !last_was_sep {
            base.push('_');
            last_was_sep = true;
        }
        if base.len() >= CODE_PREFIX_LEN {
            break;
        }
    }
    let base = base.trim_matches('_');
    let prefix = if base.is_empty() { "TASK" } else { base };

    let mut rng = rand::thread_rng();
    let suffix: String = (0..CODE_SUFFIX_LEN)
        .map(|_| CODE_SUFFIX_ALPHABET[rng.gen_range(0..CODE_SUFFIX_ALPHABET.len())] as char)
        .collect();

    format!("{prefix}_{suffix}")
}

pub async fn create_task(
    pool: &SqlitePool,
    request: &CreateTaskRequest,
    created_by: i64,
) -> Result<Task, TaskError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let code = generate_task_code(&request.title);
    let category = request
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("general")
        .to_string();
    let task_type = request.task_type.unwrap_or(shared::TaskType::Single);
    let max_user_completions = request.max_user_completions.filter(|max| *max >= 0);

    sqlx::query(
        r#"
        INSERT INTO tasks (id, code, title, description, category, reward_xp, task_type, max_user_completions, deadline_at, is_active, status, created_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(&code)
    .bind(request.title.trim())
    .bind(request.description.as_deref().map(str::trim))
    .bind(&category)
    .bind(request.reward_xp)
    .bind(task_type.as_str())
    .bind(max_user_completions)
    .bind(request.deadline_at)
    .bind(true)
    .bind(TaskStatus::Active.as_str())
    .bind(created_by)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(Task {
        id,
        code,
        title: request.title.trim().to_string(),
        description: request.description.as_deref().map(|d| d.trim().to_string()),
        category,
        reward_xp: request.reward_xp,
        task_type,
        max_user_completions,
        deadline_at: request.deadline_at,
        is_active: true,
        status: TaskStatus::Active,
        created_by: Some(created_by),
        created_at: now,
        updated_at: now,
    })
}

/// Resolve a task by its (already normalized) human code.
pub async fn find_task_by_code(pool: &SqlitePool, code: &str) -> Result<Option<Task>, TaskError> {
    let task: Option<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await?;

    Ok(task.map(|t| t.to_shared()))
}

/// Plain task catalog, creation order. Inactive and archived tasks are
/// excluded unless `include_inactive` is set.
pub async fn list_tasks(
    pool: &SqlitePool,
    include_inactive: bool,
    category: Option<&str>,
) -> Result<Vec<Task>, TaskError> {
    let rows: Vec<TaskRow> = if include_inactive {
        sqlx::query_as("SELECT * FROM tasks ORDER BY created_at ASC")
            .fetch_all(pool)
            .await?
    } else {
        sqlx::query_as(
            "SELECT * FROM tasks WHERE is_active = 1 AND status IN ('active', 'locked') ORDER BY created_at ASC",
        )
        .fetch_all(pool)
        .await?
    };

    Ok(rows
        .into_iter()
        .map(|t| t.to_shared())
        .filter(|t| category.map(|c| t.category == c).unwrap_or(true))
        .collect())
}

/// Task catalog for one user, annotated with quota standing. Tasks whose
/// limit is already exhausted are omitted so clients only render what can
/// still be earned.
pub async fn list_tasks_with_quota(
    pool: &SqlitePool,
    user_id: i64,
    category: Option<&str>,
    day_start: DateTime<Utc>,
) -> Result<Vec<TaskWithQuota>, TaskError> {
    let tasks = list_tasks(pool, false, category).await?;

    let stamps: Vec<(String, DateTime<Utc>, String)> = sqlx::query_as(
        r#"
        SELECT task_id, created_at, status FROM completions
        WHERE user_id = ? AND status IN ('pending', 'approved')
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    let mut by_task: HashMap<String, Vec<CompletionStamp>> = HashMap::new();
    for (task_id, created_at, status) in stamps {
        if let Ok(status) = status.parse() {
            by_task
                .entry(task_id)
                .or_default()
                .push(CompletionStamp { created_at, status });
        }
    }

    let mut annotated = Vec::new();
    for task in tasks {
        let prior = by_task
            .get(&task.id.to_string())
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let usage = limits::evaluate_limit(
            task.task_type,
            task.max_user_completions,
            prior,
            day_start,
        );

        if !usage.allowed() {
            continue;
        }

        annotated.push(TaskWithQuota {
            task,
            used_count: usage.used_count,
            max_for_user: usage.max_for_user,
        });
    }

    Ok(annotated)
}

/// Soft-delete a task by code: mark it archived and inactive. Completions
/// referencing it are kept. Returns the task and whether it was already
/// archived.
pub async fn archive_task(pool: &SqlitePool, code: &str) -> Result<(Task, bool), TaskError> {
    let task = find_task_by_code(pool, code).await?.ok_or(TaskError::NotFound)?;

    if task.status == TaskStatus::Archived {
        return Ok((task, true));
    }

    let now = Utc::now();
    sqlx::query("UPDATE tasks SET status = 'archived', is_active = 0, updated_at = ? WHERE id = ?")
        .bind(now)
        .bind(task.id.to_string())
        .execute(pool)
        .await?;

    let mut archived = task;
    archived.status = TaskStatus::Archived;
    archived.is_active = false;
    archived.updated_at = now;
    Ok((archived, false))
}
