use shared::LevelStats;

/// XP needed to advance from `level` to `level + 1`.
fn threshold_for(level: i32) -> i64 {
    500 * level as i64
}

/// Map cumulative XP to level standing.
///
/// Pure and total for non-negative input; callers validate at the boundary
/// and never pass negative totals. Level starts at 1 and each threshold is
/// consumed from the running pool before the next one applies.
pub fn compute_level_stats(total_xp: i64) -> LevelStats {
    let mut level = 1;
    let mut pool = total_xp.max(0);
    let mut next_level_xp = threshold_for(level);

    while pool >= next_level_xp {
        pool -= next_level_xp;
        level += 1;
        next_level_xp = threshold_for(level);
    }

    let progress_percent = if next_level_xp == 0 {
        100.0
    } else {
        (pool as f64 / next_level_xp as f64 * 100.0).min(100.0)
    };

    LevelStats {
        level,
        current_xp: pool,
        next_level_xp,
        progress_percent,
    }
}
