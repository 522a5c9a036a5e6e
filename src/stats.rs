//! Average and median over duration samples.
//!
//! Both functions return a zero duration for an empty slice. Every summary
//! in the report is derived through them.

use chrono::Duration;

pub fn average(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::zero();
    }

    let total: i128 = durations
        .iter()
        .map(|d| i128::from(d.num_milliseconds()))
        .sum();
    let count = durations.len() as i128;

    from_millis(total / count)
}

pub fn median(durations: &[Duration]) -> Duration {
    if durations.is_empty() {
        return Duration::zero();
    }

    let mut sorted = durations.to_vec();
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        let lower = i128::from(sorted[mid - 1].num_milliseconds());
        let upper = i128::from(sorted[mid].num_milliseconds());
        from_millis((lower + upper) / 2)
    } else {
        sorted[mid]
    }
}

/// Percentage of `part` over `total`, zero when `total` is zero.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }

    #[allow(clippy::cast_precision_loss)]
    let rate = (part as f64 / total as f64) * 100.0;
    rate
}

// Means and midpoints of in-range samples stay in range.
fn from_millis(millis: i128) -> Duration {
    let bound = i128::from(i64::MAX);
    let millis = i64::try_from(millis.clamp(-bound, bound)).unwrap_or_default();
    Duration::milliseconds(millis)
}
