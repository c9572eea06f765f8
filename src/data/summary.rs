use std::collections::BTreeMap;
use std::fmt;

use log::warn;
use serde::Serialize;

use super::model::{Batch, Measurement};
use super::stats::{sample_mean_std, MeanStd};
use crate::error::{ReductionError, Result};

/// Millimetres to inches.
pub const MM_TO_IN: f64 = 0.0393701;

/// Millilitres to cubic inches.
const ML_TO_CUBIC_IN: f64 = 0.0610237;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Reported quantities, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    IntensityMmPerHr,
    IntensityInPerHr,
    NumParticles,
    WeightedMeanDiameter,
    KineticEnergy,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::IntensityMmPerHr,
        Metric::IntensityInPerHr,
        Metric::NumParticles,
        Metric::WeightedMeanDiameter,
        Metric::KineticEnergy,
    ];

    /// Row label used in the CSV report.
    pub fn label(self) -> &'static str {
        match self {
            Metric::IntensityMmPerHr => "Rain Intensity [mm/hr]",
            Metric::IntensityInPerHr => "Rain Intensity [in/hr]",
            Metric::NumParticles => "Number of Particles",
            Metric::WeightedMeanDiameter => "Weighted Average Diameter [mm]",
            Metric::KineticEnergy => "Kinetic Energy",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Collected-water comparison
// ---------------------------------------------------------------------------

/// A hand-collected water sample to compare the instrument against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollectedSample {
    pub volume_ml: f64,
    /// Footprint of the collection bin.
    pub area_in2: f64,
    pub duration_min: f64,
}

impl CollectedSample {
    /// Rain intensity implied by the collected volume.
    pub fn intensity_in_per_hr(&self) -> f64 {
        self.volume_ml * ML_TO_CUBIC_IN * 60.0 / (self.duration_min * self.area_in2)
    }
}

/// Collected water against the instrument's average intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationComparison {
    pub collected_volume_ml: f64,
    pub collected_intensity_in_per_hr: f64,
    /// Relative error as a fraction (0.2 = 20 %).
    pub percent_error: f64,
}

impl CalibrationComparison {
    pub fn compare(collected_intensity: f64, volume_ml: f64, intensity_avg_inhr: f64) -> Result<Self> {
        if intensity_avg_inhr == 0.0 {
            return Err(ReductionError::DivisionByZero(
                "average instrument intensity is zero".into(),
            ));
        }
        Ok(CalibrationComparison {
            collected_volume_ml: volume_ml,
            collected_intensity_in_per_hr: collected_intensity,
            percent_error: (1.0 - collected_intensity / intensity_avg_inhr).abs(),
        })
    }

    /// The error as shown in the report, e.g. `20.00%`.
    pub fn formatted_error(&self) -> String {
        format!("{:.2}%", self.percent_error * 100.0)
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub metrics: BTreeMap<Metric, MeanStd>,
    pub comparison: Option<CalibrationComparison>,
    /// Intervals that survived outlier rejection.
    pub intervals_used: usize,
}

impl SummaryStatistics {
    pub fn get(&self, metric: Metric) -> Option<MeanStd> {
        self.metrics.get(&metric).copied()
    }
}

/// Compute the scalar statistics of `filtered`.
///
/// `mean_diameter` comes from the spectral aggregation of the unfiltered
/// batch and is reported as given.
pub fn summarize(
    filtered: &Batch,
    mean_diameter: MeanStd,
    collected: Option<&CollectedSample>,
) -> Result<SummaryStatistics> {
    if filtered.is_empty() {
        return Err(ReductionError::DegenerateInput(
            "no intervals left for statistics".into(),
        ));
    }
    if filtered.len() == 1 {
        warn!("only one interval available, standard deviations are undefined");
    }

    let column = |f: fn(&Measurement) -> f64| -> Vec<f64> {
        filtered.iter().map(f).collect()
    };
    let intensity = column(|m| m.intensity_mm_per_hr);
    let intensity_in: Vec<f64> = intensity.iter().map(|v| v * MM_TO_IN).collect();

    let mut metrics = BTreeMap::new();
    metrics.insert(Metric::IntensityMmPerHr, sample_mean_std(&intensity));
    metrics.insert(Metric::IntensityInPerHr, sample_mean_std(&intensity_in));
    metrics.insert(
        Metric::NumParticles,
        sample_mean_std(&column(|m| m.num_particles as f64)),
    );
    metrics.insert(Metric::WeightedMeanDiameter, mean_diameter);
    metrics.insert(
        Metric::KineticEnergy,
        sample_mean_std(&column(|m| m.kinetic_energy)),
    );

    let comparison = collected
        .map(|sample| {
            CalibrationComparison::compare(
                sample.intensity_in_per_hr(),
                sample.volume_ml,
                metrics[&Metric::IntensityInPerHr].mean,
            )
        })
        .transpose()?;

    Ok(SummaryStatistics {
        metrics,
        comparison,
        intervals_used: filtered.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Spectrogram;

    fn interval(intensity: f64, particles: u64, ke: f64) -> Measurement {
        Measurement {
            timestamp: String::new(),
            intensity_mm_per_hr: intensity,
            total_precip_mm: 0.0,
            reflectivity: 0.0,
            visibility: 0.0,
            num_particles: particles,
            kinetic_energy: ke,
            spectrogram: Spectrogram::default(),
        }
    }

    fn diameter() -> MeanStd {
        MeanStd {
            mean: 1.5,
            std_dev: 0.25,
        }
    }

    #[test]
    fn means_and_sample_deviations() {
        let batch = Batch::from_measurements(vec![
            interval(10.0, 100, 1.0),
            interval(20.0, 300, 3.0),
        ]);
        let stats = summarize(&batch, diameter(), None).unwrap();

        let mm = stats.get(Metric::IntensityMmPerHr).unwrap();
        assert_eq!(mm.mean, 15.0);
        assert!((mm.std_dev - 50f64.sqrt()).abs() < 1e-12);

        let inch = stats.get(Metric::IntensityInPerHr).unwrap();
        assert!((inch.mean - 15.0 * MM_TO_IN).abs() < 1e-12);

        assert_eq!(stats.get(Metric::NumParticles).unwrap().mean, 200.0);
        assert_eq!(stats.get(Metric::KineticEnergy).unwrap().mean, 2.0);
        assert_eq!(stats.get(Metric::WeightedMeanDiameter), Some(diameter()));
        assert!(stats.comparison.is_none());
        assert_eq!(stats.intervals_used, 2);
    }

    #[test]
    fn metrics_iterate_in_report_order() {
        let batch = Batch::from_measurements(vec![interval(1.0, 1, 1.0)]);
        let stats = summarize(&batch, diameter(), None).unwrap();
        let order: Vec<Metric> = stats.metrics.keys().copied().collect();
        assert_eq!(order, Metric::ALL.to_vec());
        assert!(stats.get(Metric::KineticEnergy).unwrap().std_dev.is_nan());
    }

    #[test]
    fn percent_error_against_collected_water() {
        let cmp = CalibrationComparison::compare(2.0, 500.0, 2.5).unwrap();
        assert!((cmp.percent_error - 0.2).abs() < 1e-12);
        assert_eq!(cmp.formatted_error(), "20.00%");
    }

    #[test]
    fn zero_average_intensity_is_division_by_zero() {
        let batch = Batch::from_measurements(vec![interval(0.0, 5, 0.0), interval(0.0, 6, 0.0)]);
        let sample = CollectedSample {
            volume_ml: 500.0,
            area_in2: 117.0,
            duration_min: 10.0,
        };
        assert!(matches!(
            summarize(&batch, diameter(), Some(&sample)),
            Err(ReductionError::DivisionByZero(_))
        ));
    }

    #[test]
    fn collected_intensity_uses_bin_geometry() {
        let sample = CollectedSample {
            volume_ml: 1000.0,
            area_in2: 9.75 * 12.0,
            duration_min: 10.0,
        };
        let expected = 1000.0 * 0.0610237 * 60.0 / (10.0 * 117.0);
        assert!((sample.intensity_in_per_hr() - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_batch_is_degenerate() {
        assert!(matches!(
            summarize(&Batch::default(), diameter(), None),
            Err(ReductionError::DegenerateInput(_))
        ));
    }
}
