//! Run configuration.
//!
//! Every knob of a reduction run lives in [`ReductionConfig`]. It can be read
//! from a JSON file (any field may be omitted) and is validated once, before
//! the pipeline starts, so the numeric code never sees out-of-range values.
//!
//! ```json
//! {
//!   "top_skip": 2,
//!   "zscore_tolerance": 5,
//!   "collected_volume_ml": 500,
//!   "collection_geometry": { "rectangle": { "width_in": 9.75, "length_in": 12 } },
//!   "collection_duration_min": 10,
//!   "plot": { "errorbars": true, "label": "TG-1" }
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::loader::ParseOptions;
use crate::data::model::SpectrumOrder;
use crate::data::summary::CollectedSample;
use crate::error::{ReductionError, Result};

// ---------------------------------------------------------------------------
// Collection geometry
// ---------------------------------------------------------------------------

/// Footprint of the bin used to hand-collect rain water.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionGeometry {
    /// Footprint given directly, in square inches.
    AreaIn2(f64),
    Rectangle { width_in: f64, length_in: f64 },
}

impl CollectionGeometry {
    pub fn area_in2(&self) -> f64 {
        match *self {
            CollectionGeometry::AreaIn2(a) => a,
            CollectionGeometry::Rectangle { width_in, length_in } => width_in * length_in,
        }
    }
}

impl Default for CollectionGeometry {
    fn default() -> Self {
        CollectionGeometry::Rectangle {
            width_in: 9.75,
            length_in: 12.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Plot settings
// ---------------------------------------------------------------------------

/// Appearance of the rendered figures.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotConfig {
    /// Draw the per-bin maximum deviation as error bars.
    pub errorbars: bool,
    /// File name prefix; defaults to the input file stem.
    pub label: Option<String>,
    /// TrueType font for labels; a common system font is used when unset.
    pub font: Option<PathBuf>,
    pub size_count_range: (f64, f64),
    pub velocity_count_range: (f64, f64),
    pub volume_size_range: (f64, f64),
    pub volume_fraction_range: (f64, f64),
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            errorbars: false,
            label: None,
            font: None,
            size_count_range: (-50.0, 1300.0),
            velocity_count_range: (-20.0, 800.0),
            volume_size_range: (0.25, 25.0),
            volume_fraction_range: (-0.05, 0.6),
        }
    }
}

// ---------------------------------------------------------------------------
// Reduction config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionConfig {
    /// Rows discarded from the start of the file.
    pub top_skip: usize,
    /// Rows discarded from the end of the file.
    pub bottom_skip: usize,
    /// Outlier band in standard deviations; 0 disables rejection.
    pub zscore_tolerance: f64,
    /// Hand-collected water in mL; 0 disables the comparison.
    pub collected_volume_ml: f64,
    pub collection_geometry: CollectionGeometry,
    pub collection_duration_min: f64,
    pub spectrum_order: SpectrumOrder,
    pub plot: PlotConfig,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            top_skip: 0,
            bottom_skip: 0,
            zscore_tolerance: 5.0,
            collected_volume_ml: 0.0,
            collection_geometry: CollectionGeometry::default(),
            collection_duration_min: 10.0,
            spectrum_order: SpectrumOrder::default(),
            plot: PlotConfig::default(),
        }
    }
}

impl ReductionConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| ReductionError::Configuration(format!("invalid configuration: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<()> {
        non_negative("zscore_tolerance", self.zscore_tolerance)?;
        non_negative("collected_volume_ml", self.collected_volume_ml)?;
        if self.collected_volume_ml > 0.0 {
            if let CollectionGeometry::Rectangle { width_in, length_in } = self.collection_geometry {
                positive("collection_geometry.width_in", width_in)?;
                positive("collection_geometry.length_in", length_in)?;
            }
            positive("collection_geometry", self.collection_geometry.area_in2())?;
            positive("collection_duration_min", self.collection_duration_min)?;
        }

        let plot = &self.plot;
        for (name, range) in [
            ("plot.size_count_range", plot.size_count_range),
            ("plot.velocity_count_range", plot.velocity_count_range),
            ("plot.volume_size_range", plot.volume_size_range),
            ("plot.volume_fraction_range", plot.volume_fraction_range),
        ] {
            if !(range.0 < range.1) {
                return Err(ReductionError::Configuration(format!(
                    "{name}: lower bound {} must be below upper bound {}",
                    range.0, range.1
                )));
            }
        }
        if plot.volume_size_range.0 <= 0.0 {
            return Err(ReductionError::Configuration(
                "plot.volume_size_range must be positive for a log axis".into(),
            ));
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            top_skip: self.top_skip,
            bottom_skip: self.bottom_skip,
            order: self.spectrum_order,
        }
    }

    /// The collected-water sample, when a comparison was requested.
    pub fn collected_sample(&self) -> Option<CollectedSample> {
        (self.collected_volume_ml > 0.0).then(|| CollectedSample {
            volume_ml: self.collected_volume_ml,
            area_in2: self.collection_geometry.area_in2(),
            duration_min: self.collection_duration_min,
        })
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ReductionError::Configuration(format!(
            "{name} must be a non-negative number, got {value}"
        )))
    }
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ReductionError::Configuration(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = ReductionConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.zscore_tolerance, 5.0);
        assert!(cfg.collected_sample().is_none());
    }

    #[test]
    fn json_overrides_selected_fields() {
        let cfg = ReductionConfig::from_json_str(
            r#"{
                "top_skip": 2,
                "collected_volume_ml": 500,
                "collection_geometry": { "area_in2": 150.0625 },
                "spectrum_order": "velocity_major",
                "plot": { "errorbars": true }
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.top_skip, 2);
        assert_eq!(cfg.bottom_skip, 0);
        assert_eq!(cfg.spectrum_order, SpectrumOrder::VelocityMajor);
        assert!(cfg.plot.errorbars);
        assert_eq!(cfg.plot.size_count_range, (-50.0, 1300.0));

        let sample = cfg.collected_sample().unwrap();
        assert_eq!(sample.area_in2, 150.0625);
        assert_eq!(sample.duration_min, 10.0);
    }

    #[test]
    fn negative_skip_is_a_configuration_error() {
        assert!(matches!(
            ReductionConfig::from_json_str(r#"{ "top_skip": -1 }"#),
            Err(ReductionError::Configuration(_))
        ));
        assert!(ReductionConfig::from_json_str(r#"{ "typo_field": 1 }"#).is_err());
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        let cfg = ReductionConfig {
            zscore_tolerance: -1.0,
            ..ReductionConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ReductionError::Configuration(_))));

        let cfg = ReductionConfig {
            collected_volume_ml: 250.0,
            collection_duration_min: 0.0,
            ..ReductionConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = ReductionConfig {
            collected_volume_ml: 250.0,
            collection_geometry: CollectionGeometry::Rectangle {
                width_in: -2.0,
                length_in: -3.0,
            },
            ..ReductionConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_duration_is_fine_without_comparison() {
        let cfg = ReductionConfig {
            collection_duration_min: 0.0,
            ..ReductionConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }
}
