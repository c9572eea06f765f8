use std::f64::consts::PI;

use log::warn;
use serde::Serialize;

use super::model::{Batch, CalibrationTable, Spectrogram, NUM_CLASSES};
use super::stats::{mean, std_dev, MeanStd};
use crate::error::{ReductionError, Result};

type Grid = [[f64; NUM_CLASSES]; NUM_CLASSES];

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// One non-empty bin of a marginal distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DistributionEntry {
    /// Class centre from the calibration table.
    pub bin: f64,
    /// Time-averaged droplet count.
    pub count: f64,
    /// Largest per-cell deviation over time along the summed axis.
    pub max_std: Option<f64>,
}

/// A size or velocity distribution with empty bins removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Distribution {
    pub entries: Vec<DistributionEntry>,
}

impl Distribution {
    /// Pair class centres with marginal counts (and optional deviations),
    /// dropping every bin whose count is exactly zero.
    pub fn from_marginal(bins: &[f64], counts: &[f64], max_std: Option<&[f64]>) -> Self {
        let entries = bins
            .iter()
            .zip(counts)
            .enumerate()
            .filter(|(_, (_, &count))| count != 0.0)
            .map(|(i, (&bin, &count))| DistributionEntry {
                bin,
                count,
                max_std: max_std.and_then(|s| s.get(i).copied()),
            })
            .collect();
        Distribution { entries }
    }

    pub fn bins(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.bin).collect()
    }

    pub fn counts(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.count).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Share of the estimated rainfall volume carried by each size class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeDistribution {
    /// Size classes with at least one droplet.
    pub sizes_mm: Vec<f64>,
    /// Fraction of total volume, aligned with `sizes_mm`.
    pub fractions: Vec<f64>,
    pub total_volume_mm3: f64,
    /// Volume-mean diameter.
    pub vmd_mm: f64,
}

/// Everything derived from the spectrograms of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralSummary {
    /// Droplet-weighted mean diameter of each interval (NaN when empty).
    pub interval_mean_diameters: Vec<f64>,
    /// Mean of the interval diameters and their spread over time.
    pub mean_diameter: MeanStd,
    pub size: Distribution,
    pub velocity: Distribution,
    pub volume: VolumeDistribution,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Reduce every spectrogram of `batch` into marginals, mean diameter and
/// the volume distribution.
pub fn aggregate(batch: &Batch, calibration: &CalibrationTable) -> Result<SpectralSummary> {
    if batch.is_empty() {
        return Err(ReductionError::DegenerateInput(
            "batch holds no spectral intervals".into(),
        ));
    }
    let sizes = calibration.particle_sizes_mm();
    let velocities = calibration.velocity_bins_m_per_s();

    let interval_mean_diameters: Vec<f64> = batch
        .iter()
        .map(|m| weighted_mean_diameter(&m.spectrogram, sizes))
        .collect();
    let mean_diameter = temporal_mean(&interval_mean_diameters);

    let spectra: Vec<&Spectrogram> = batch.iter().map(|m| &m.spectrogram).collect();
    let (avg, std, sum) = time_reduce(&spectra);

    let size_sum = sum_over_velocity(&avg);
    let size_std_max = max_over_velocity(&std);
    let velocity_sum = sum_over_diameter(&avg);
    let velocity_std_max = max_over_diameter(&std);

    let tot_drops = sum_over_velocity(&sum);
    let volumes: Vec<f64> = tot_drops
        .iter()
        .zip(sizes)
        .map(|(&n, &d)| n * droplet_volume(d))
        .collect();
    let total_volume: f64 = volumes.iter().sum();
    if total_volume == 0.0 {
        return Err(ReductionError::DegenerateInput(
            "no droplets recorded in any interval".into(),
        ));
    }
    let vmd_mm = volume_mean_diameter(&volumes, sizes);

    let (kept_sizes, fractions): (Vec<f64>, Vec<f64>) = sizes
        .iter()
        .zip(&size_sum)
        .zip(&volumes)
        .filter(|((_, &count), _)| count != 0.0)
        .map(|((&d, _), &v)| (d, v / total_volume))
        .unzip();

    Ok(SpectralSummary {
        interval_mean_diameters,
        mean_diameter,
        size: Distribution::from_marginal(sizes, &size_sum, Some(&size_std_max)),
        velocity: Distribution::from_marginal(velocities, &velocity_sum, Some(&velocity_std_max)),
        volume: VolumeDistribution {
            sizes_mm: kept_sizes,
            fractions,
            total_volume_mm3: total_volume,
            vmd_mm,
        },
    })
}

/// Droplet-weighted mean diameter of one interval; NaN without droplets.
pub fn weighted_mean_diameter(spectrogram: &Spectrogram, sizes: &[f64]) -> f64 {
    let by_diam = spectrogram.counts_by_diameter();
    let n: f64 = by_diam.iter().sum();
    if n == 0.0 {
        return f64::NAN;
    }
    by_diam.iter().zip(sizes).map(|(c, d)| c * d).sum::<f64>() / n
}

/// Mean and population spread of the non-NaN interval diameters.
fn temporal_mean(diameters: &[f64]) -> MeanStd {
    let defined: Vec<f64> = diameters.iter().copied().filter(|d| !d.is_nan()).collect();
    let empty = diameters.len() - defined.len();
    if empty > 0 {
        warn!("{empty} of {} intervals recorded no droplets", diameters.len());
    }
    MeanStd {
        mean: mean(&defined),
        std_dev: std_dev(&defined, 0),
    }
}

/// Volume of a sphere of diameter `d`.
fn droplet_volume(d: f64) -> f64 {
    4.0 / 3.0 * PI * (d / 2.0).powi(3)
}

/// Size class at which cumulative volume stops being strictly below half
/// the total.
pub fn volume_mean_diameter(volumes: &[f64], sizes: &[f64]) -> f64 {
    if sizes.is_empty() {
        return f64::NAN;
    }
    let half = volumes.iter().sum::<f64>() / 2.0;
    let below = volumes
        .iter()
        .scan(0.0, |acc, v| {
            *acc += v;
            Some(*acc)
        })
        .filter(|&cum| cum < half)
        .count();
    sizes[below.min(sizes.len() - 1)]
}

/// Elementwise mean, population std and sum over time.
fn time_reduce(spectra: &[&Spectrogram]) -> (Grid, Grid, Grid) {
    let n = spectra.len() as f64;
    let mut sum = [[0.0; NUM_CLASSES]; NUM_CLASSES];
    for spec in spectra {
        for (d, row) in spec.rows().enumerate() {
            for (v, &c) in row.iter().enumerate() {
                sum[d][v] += c as f64;
            }
        }
    }

    let mut avg = sum;
    avg.iter_mut().flatten().for_each(|x| *x /= n);

    let mut var = [[0.0; NUM_CLASSES]; NUM_CLASSES];
    for spec in spectra {
        for (d, row) in spec.rows().enumerate() {
            for (v, &c) in row.iter().enumerate() {
                var[d][v] += (c as f64 - avg[d][v]).powi(2);
            }
        }
    }
    var.iter_mut().flatten().for_each(|x| *x = (*x / n).sqrt());

    (avg, var, sum)
}

fn sum_over_velocity(grid: &Grid) -> [f64; NUM_CLASSES] {
    grid.map(|row| row.iter().sum())
}

fn max_over_velocity(grid: &Grid) -> [f64; NUM_CLASSES] {
    grid.map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

fn sum_over_diameter(grid: &Grid) -> [f64; NUM_CLASSES] {
    std::array::from_fn(|v| grid.iter().map(|row| row[v]).sum())
}

fn max_over_diameter(grid: &Grid) -> [f64; NUM_CLASSES] {
    std::array::from_fn(|v| grid.iter().map(|row| row[v]).fold(f64::NEG_INFINITY, f64::max))
}
