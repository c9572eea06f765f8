use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

use crate::data::summary::{Metric, SummaryStatistics};
use crate::error::Result;

/// Default name of the statistics report.
pub const REPORT_FILE_NAME: &str = "rainfall_stats.csv";

// ---------------------------------------------------------------------------
// CSV report
// ---------------------------------------------------------------------------

/// Write the statistics table, followed by the collected-water block when a
/// comparison was made.
pub fn write_report<W: Write>(writer: W, stats: &SummaryStatistics) -> Result<()> {
    let mut out = WriterBuilder::new().flexible(true).from_writer(writer);

    out.write_record(["Parsivel Statistics"])?;
    out.write_record(["Variable", "Average", "Standard Deviation"])?;
    for metric in Metric::ALL {
        if let Some(value) = stats.get(metric) {
            out.write_record([
                metric.label().to_string(),
                value.mean.to_string(),
                value.std_dev.to_string(),
            ])?;
        }
    }

    if let Some(cmp) = &stats.comparison {
        out.write_record([""])?;
        out.write_record(["Collected Water Statistics"])?;
        out.write_record(["Volume (mL)".to_string(), cmp.collected_volume_ml.to_string()])?;
        out.write_record([
            "Rain Intensity (in/hr)".to_string(),
            cmp.collected_intensity_in_per_hr.to_string(),
        ])?;
        out.write_record(["Percent Error".to_string(), cmp.formatted_error()])?;
    }

    out.flush()?;
    Ok(())
}

/// Write the report to `path`, replacing any existing file.
pub fn write_report_file(path: &Path, stats: &SummaryStatistics) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_report(file, stats)
}
