//! Freshness policy: decide whether the latest snapshot can be replayed.

use std::time::Duration;

/// Default budget for every data source: one day.
pub const DEFAULT_BUDGET: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Reuse,
    Refresh,
}

/// Pure freshness decision.
///
/// Refreshes when forced, when nothing has been captured yet, or when the
/// latest capture is strictly older than `budget`. A latest instant in the
/// future (clock skew between hosts) counts as fresh.
pub fn decide(latest: Option<i64>, now: i64, budget: Duration, force: bool) -> Decision {
    if force {
        return Decision::Refresh;
    }
    let Some(latest) = latest else {
        return Decision::Refresh;
    };
    let budget_secs = i64::try_from(budget.as_secs()).unwrap_or(i64::MAX);
    if now.saturating_sub(latest) > budget_secs {
        Decision::Refresh
    } else {
        Decision::Reuse
    }
}

/// Seconds elapsed since `latest`, clamped at zero.
pub fn age(latest: i64, now: i64) -> u64 {
    u64::try_from(now.saturating_sub(latest)).unwrap_or(0)
}
