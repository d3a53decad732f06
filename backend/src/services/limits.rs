use chrono::{DateTime, Local, NaiveTime, Utc};
use shared::{CompletionStatus, TaskType};

/// The slice of a prior completion the limit policy needs.
#[derive(Debug, Clone, Copy)]
pub struct CompletionStamp {
    pub created_at: DateTime<Utc>,
    pub status: CompletionStatus,
}

/// A user's quota standing for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitUsage {
    pub used_count: i64,
    /// `None` means unbounded.
    pub max_for_user: Option<i64>,
}

impl LimitUsage {
    pub fn allowed(&self) -> bool {
        match self.max_for_user {
            None => true,
            Some(max) => self.used_count < max,
        }
    }
}

/// Decide how much of a task's per-user quota is already consumed.
///
/// Only pending and approved completions count; rejected ones never consume
/// quota. For `daily` tasks only completions at or after `day_start` count.
/// A configured cap must be positive to take effect; `single` and `daily`
/// fall back to 1, `multi` to unbounded.
pub fn evaluate_limit(
    task_type: TaskType,
    max_user_completions: Option<i64>,
    prior: &[CompletionStamp],
    day_start: DateTime<Utc>,
) -> LimitUsage {
    let configured = max_user_completions.filter(|max| *max > 0);

    let used_count = prior
        .iter()
        .filter(|stamp| stamp.status.counts_against_limit())
        .filter(|stamp| task_type != TaskType::Daily || stamp.created_at >= day_start)
        .count() as i64;

    let max_for_user = match task_type {
        TaskType::Single | TaskType::Daily => Some(configured.unwrap_or(1)),
        TaskType::Multi => configured,
    };

    LimitUsage {
        used_count,
        max_for_user,
    }
}

/// Start of the current calendar day in the server's local timezone,
/// expressed in UTC. The daily quota window resets at local midnight.
pub fn current_day_start() -> DateTime<Utc> {
    let now = Local::now();
    now.date_naive()
        .and_time(NaiveTime::MIN)
        .and_local_timezone(Local)
        .earliest()
        .unwrap_or(now)
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stamp(created_at: DateTime<Utc>, status: CompletionStatus) -> CompletionStamp {
        CompletionStamp { created_at, status }
    }

    fn day_start() -> DateTime<Utc> {
        "2026-08-07T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_single_default_cap_blocks_second_attempt() {
        let prior = [stamp(day_start(), CompletionStatus::Approved)];
        let usage = evaluate_limit(TaskType::Single, None, &prior, day_start());

        assert_eq!(usage.used_count, 1);
        assert_eq!(usage.max_for_user, Some(1));
        assert!(!usage.allowed());
    }

    #[test]
    fn test_single_rejected_does_not_consume_quota() {
        let prior = [stamp(day_start(), CompletionStatus::Rejected)];
        let usage = evaluate_limit(TaskType::Single, None, &prior, day_start());

        assert_eq!(usage.used_count, 0);
        assert!(usage.allowed());
    }

    #[test]
    fn test_single_pending_counts() {
        let prior = [stamp(day_start(), CompletionStatus::Pending)];
        let usage = evaluate_limit(TaskType::Single, None, &prior, day_start());

        assert_eq!(usage.used_count, 1);
        assert!(!usage.allowed());
    }

    #[test]
    fn test_daily_yesterday_does_not_count() {
        let yesterday = day_start() - Duration::hours(5);
        let prior = [stamp(yesterday, CompletionStatus::Approved)];
        let usage = evaluate_limit(TaskType::Daily, Some(1), &prior, day_start());

        assert_eq!(usage.used_count, 0);
        assert!(usage.allowed());
    }

    #[test]
    fn test_daily_today_counts() {
        let this_morning = day_start() + Duration::hours(8);
        let prior = [
            stamp(day_start() - Duration::days(1), CompletionStatus::Approved),
            stamp(this_morning, CompletionStatus::Pending),
        ];
        let usage = evaluate_limit(TaskType::Daily, Some(1), &prior, day_start());

        assert_eq!(usage.used_count, 1);
        assert!(!usage.allowed());
    }

    #[test]
    fn test_multi_unbounded() {
        let prior: Vec<CompletionStamp> = (0..500)
            .map(|i| {
                stamp(
                    day_start() - Duration::minutes(i),
                    CompletionStatus::Approved,
                )
            })
            .collect();
        let usage = evaluate_limit(TaskType::Multi, None, &prior, day_start());

        assert_eq!(usage.used_count, 500);
        assert_eq!(usage.max_for_user, None);
        assert!(usage.allowed());
    }

    #[test]
    fn test_multi_with_configured_cap() {
        let prior = [
            stamp(day_start(), CompletionStatus::Approved),
            stamp(day_start(), CompletionStatus::Approved),
            stamp(day_start(), CompletionStatus::Approved),
        ];
        let usage = evaluate_limit(TaskType::Multi, Some(3), &prior, day_start());

        assert_eq!(usage.used_count, 3);
        assert_eq!(usage.max_for_user, Some(3));
        assert!(!usage.allowed());
    }

    #[test]
    fn test_zero_cap_treated_as_unconfigured() {
        // max_user_completions = 0 means "no explicit cap"
        let usage = evaluate_limit(TaskType::Multi, Some(0), &[], day_start());
        assert_eq!(usage.max_for_user, None);

        let usage = evaluate_limit(TaskType::Single, Some(0), &[], day_start());
        assert_eq!(usage.max_for_user, Some(1));
    }

    #[test]
    fn test_configured_cap_overrides_single_default() {
        let prior = [stamp(day_start(), CompletionStatus::Approved)];
        let usage = evaluate_limit(TaskType::Single, Some(2), &prior, day_start());

        assert_eq!(usage.max_for_user, Some(2));
        assert!(usage.allowed());
    }
}
