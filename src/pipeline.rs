use log::info;
use serde::Serialize;

use crate::config::ReductionConfig;
use crate::data::aggregate::{aggregate, SpectralSummary};
use crate::data::filter::reject_outliers;
use crate::data::loader::parse_records;
use crate::data::model::CalibrationTable;
use crate::data::summary::{summarize, SummaryStatistics};
use crate::error::Result;

/// Outcome of one reduction run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reduction {
    /// Spectral intervals found in the input.
    pub intervals_parsed: usize,
    /// Distributions and mean diameter, computed on every interval.
    pub spectral: SpectralSummary,
    /// Scalar statistics, computed on the intervals kept by the outlier filter.
    pub summary: SummaryStatistics,
}

/// Run the whole reduction on the contents of one instrument file.
///
/// Outlier rejection only feeds the scalar statistics; the spectral
/// aggregation always sees the full batch.
pub fn reduce(raw: &str, calibration: &CalibrationTable, config: &ReductionConfig) -> Result<Reduction> {
    config.validate()?;

    let batch = parse_records(raw, &config.parse_options())?;
    let spectral = aggregate(&batch, calibration)?;

    let kept = reject_outliers(&batch, config.zscore_tolerance);
    let summary = summarize(
        &kept,
        spectral.mean_diameter,
        config.collected_sample().as_ref(),
    )?;

    info!(
        "reduced {} intervals ({} used for statistics), VMD {} mm",
        batch.len(),
        kept.len(),
        spectral.volume.vmd_mm
    );
    Ok(Reduction {
        intervals_parsed: batch.len(),
        spectral,
        summary,
    })
}
