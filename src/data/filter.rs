use log::info;

use super::model::Batch;
use super::stats::{mean, std_dev};

// ---------------------------------------------------------------------------
// Z-score filter on particle counts
// ---------------------------------------------------------------------------

/// Return indices of intervals whose particle count lies within
/// `tolerance` sample standard deviations of the batch mean.
///
/// An interval is kept when `|n - mean| <= tolerance * std`. Everything is
/// kept when:
/// * `tolerance` is 0 (filter disabled)
/// * the batch has fewer than two intervals (std undefined)
/// * every interval has the same count (std is 0)
pub fn retained_indices(batch: &Batch, tolerance: f64) -> Vec<usize> {
    let counts: Vec<f64> = batch.iter().map(|m| m.num_particles as f64).collect();
    let mu = mean(&counts);
    let sigma = std_dev(&counts, 1);

    if tolerance == 0.0 || !sigma.is_finite() || sigma == 0.0 {
        return (0..counts.len()).collect();
    }

    let limit = tolerance * sigma;
    counts
        .iter()
        .enumerate()
        .filter(|(_, &n)| (n - mu).abs() <= limit)
        .map(|(i, _)| i)
        .collect()
}

/// Single-pass outlier rejection; returns a new batch of the kept intervals.
pub fn reject_outliers(batch: &Batch, tolerance: f64) -> Batch {
    let keep = retained_indices(batch, tolerance);
    let rejected = batch.len() - keep.len();
    if rejected > 0 {
        info!(
            "rejected {rejected} of {} intervals outside {tolerance} standard deviations",
            batch.len()
        );
    }
    Batch::from_measurements(
        keep.into_iter()
            .map(|i| batch.measurements[i].clone())
            .collect(),
    )
}
