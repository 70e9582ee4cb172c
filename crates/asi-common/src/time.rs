//! Frame cadence and timestamp alignment helpers.

use chrono::{DateTime, Duration, SubsecRound, Utc};

/// Number of leading timestamps inspected when estimating cadence.
const CADENCE_SAMPLE: usize = 11;

/// Estimate the frame cadence in whole seconds.
///
/// Looks at the differences between the first few timestamps (truncated to
/// the second) and returns the most frequent one. On ties the difference
/// seen first wins. Returns `None` for fewer than two timestamps.
pub fn determine_cadence(timestamps: &[DateTime<Utc>]) -> Option<i64> {
    let sample: Vec<DateTime<Utc>> = timestamps
        .iter()
        .take(CADENCE_SAMPLE)
        .map(|t| t.trunc_subsecs(0))
        .collect();
    if sample.len() < 2 {
        return None;
    }

    let diffs: Vec<i64> = sample
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds())
        .collect();

    let mut best: Option<(i64, usize)> = None;
    for &d in &diffs {
        let count = diffs.iter().filter(|&&x| x == d).count();
        match best {
            Some((_, c)) if c >= count => {}
            _ => best = Some((d, count)),
        }
    }
    best.map(|(d, _)| d)
}

/// Build the regular timestamp sequence `start, start + cadence, ... <= end`.
///
/// `start` is truncated to the second. A non-positive cadence yields only
/// the start timestamp.
pub fn expected_timestamps(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    cadence_seconds: i64,
) -> Vec<DateTime<Utc>> {
    let start = start.trunc_subsecs(0);
    if cadence_seconds <= 0 {
        return vec![start];
    }

    let step = Duration::seconds(cadence_seconds);
    let mut out = Vec::new();
    let mut current = start;
    while current <= end {
        out.push(current);
        current = current + step;
    }
    out
}

/// Binary search a sorted timestamp list for `target`, at second precision.
pub fn find_frame(timestamps: &[DateTime<Utc>], target: DateTime<Utc>) -> Option<usize> {
    let target = target.trunc_subsecs(0);
    timestamps
        .binary_search_by(|t| t.trunc_subsecs(0).cmp(&target))
        .ok()
}

/// Index of the timestamp closest to `target`; the earliest wins ties.
pub fn nearest_frame(timestamps: &[DateTime<Utc>], target: DateTime<Utc>) -> Option<usize> {
    timestamps
        .iter()
        .enumerate()
        .min_by_key(|(i, t)| ((**t - target).num_milliseconds().abs(), *i))
        .map(|(i, _)| i)
}
