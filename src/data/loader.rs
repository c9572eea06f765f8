use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info};

use super::model::{Batch, CalibrationTable, Measurement, Spectrogram, SpectrumOrder, SPECTRUM_LEN};
use crate::error::{ReductionError, Result};

// ---------------------------------------------------------------------------
// Record schema
// ---------------------------------------------------------------------------

/// Column positions of the instrument's record format.
pub mod fields {
    pub const DATE: usize = 0;
    pub const TIME: usize = 1;
    pub const INTENSITY: usize = 2;
    pub const TOTAL_PRECIP: usize = 3;
    pub const REFLECTIVITY: usize = 4;
    pub const VISIBILITY: usize = 5;
    pub const NUM_PARTICLES: usize = 6;
    pub const KINETIC_ENERGY: usize = 7;
    /// Marks a row carrying spectral data.
    pub const SENTINEL: usize = 8;
    /// The spectrum window starts at the sentinel column itself.
    pub const SPECTRUM_START: usize = 8;
    pub const SPECTRUM_END: usize = SPECTRUM_START + super::SPECTRUM_LEN;
}

/// Value of the sentinel column on spectral rows.
pub const SPECTRUM_MARKER: &str = "<SPECTRUM>";
const SPECTRUM_CLOSE_MARKER: &str = "</SPECTRUM>";

/// Knobs of the record parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Rows dropped from the top of the file before validation.
    pub top_skip: usize,
    /// Rows dropped from the bottom of the file before validation.
    pub bottom_skip: usize,
    pub order: SpectrumOrder,
}

// ---------------------------------------------------------------------------
// Record parser
// ---------------------------------------------------------------------------

/// Parse raw instrument output into a [`Batch`].
///
/// Blank rows are ignored, then `top_skip`/`bottom_skip` rows are trimmed,
/// then rows without the spectrum sentinel are dropped as telemetry noise.
/// Every surviving row must parse cleanly or the whole call fails.
pub fn parse_records(raw: &str, options: &ParseOptions) -> Result<Batch> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(raw.as_bytes());

    let mut rows: Vec<(usize, StringRecord)> = Vec::new();
    for result in reader.records() {
        let record = result?;
        if is_blank(&record) {
            continue;
        }
        let line = record.position().map_or(rows.len() + 1, |p| p.line() as usize);
        rows.push((line, record));
    }

    let total = rows.len();
    let end = total.saturating_sub(options.bottom_skip);
    let kept = rows.get(options.top_skip..end).unwrap_or(&[]);

    let measurements = kept
        .iter()
        .filter(|(line, record)| {
            let spectral = record.get(fields::SENTINEL) == Some(SPECTRUM_MARKER);
            if !spectral {
                debug!("line {line}: no spectrum marker, skipping");
            }
            spectral
        })
        .map(|(line, record)| parse_measurement(*line, record, options.order))
        .collect::<Result<Vec<_>>>()?;

    info!(
        "parsed {} spectral intervals from {total} rows ({} trimmed)",
        measurements.len(),
        total - kept.len()
    );
    Ok(Batch::from_measurements(measurements))
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn parse_measurement(line: usize, record: &StringRecord, order: SpectrumOrder) -> Result<Measurement> {
    if record.len() < fields::SPECTRUM_END {
        return Err(ReductionError::parse(
            line,
            "spectrum",
            format!(
                "row has {} fields, expected at least {}",
                record.len(),
                fields::SPECTRUM_END
            ),
        ));
    }

    let text = |idx: usize| record.get(idx).unwrap_or("");
    let timestamp = format!("{} {}", text(fields::DATE), text(fields::TIME));

    let cells = (fields::SPECTRUM_START..fields::SPECTRUM_END)
        .map(|idx| parse_cell(line, idx, text(idx)))
        .collect::<Result<Vec<u32>>>()?;

    Ok(Measurement {
        timestamp,
        intensity_mm_per_hr: parse_float(line, "intensity", text(fields::INTENSITY))?,
        total_precip_mm: parse_float(line, "total_precip", text(fields::TOTAL_PRECIP))?,
        reflectivity: parse_float(line, "reflectivity", text(fields::REFLECTIVITY))?,
        visibility: parse_float(line, "visibility", text(fields::VISIBILITY))?,
        num_particles: text(fields::NUM_PARTICLES).parse::<u64>().map_err(|e| {
            ReductionError::parse(line, "num_particles", format!("'{}': {e}", text(fields::NUM_PARTICLES)))
        })?,
        kinetic_energy: parse_float(line, "kinetic_energy", text(fields::KINETIC_ENERGY))?,
        spectrogram: Spectrogram::from_flat(&cells, order)?,
    })
}

fn parse_float(line: usize, field: &str, s: &str) -> Result<f64> {
    s.parse::<f64>()
        .map_err(|e| ReductionError::parse(line, field, format!("'{s}': {e}")))
}

/// Empty and marker cells count as zero droplets.
fn parse_cell(line: usize, idx: usize, s: &str) -> Result<u32> {
    if s.is_empty() || s == SPECTRUM_MARKER || s == SPECTRUM_CLOSE_MARKER {
        return Ok(0);
    }
    s.parse::<u32>().map_err(|e| {
        ReductionError::parse(
            line,
            &format!("spectrum[{}]", idx - fields::SPECTRUM_START),
            format!("'{s}': {e}"),
        )
    })
}

// ---------------------------------------------------------------------------
// Calibration tables
// ---------------------------------------------------------------------------

/// Parse a plain list of numbers separated by whitespace, newlines or commas.
/// Anything after `#` on a line is a comment.
pub fn parse_calibration_values(text: &str) -> Result<Vec<f64>> {
    text.lines()
        .enumerate()
        .flat_map(|(i, line)| {
            let content = line.split('#').next().unwrap_or("");
            content
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|tok| !tok.is_empty())
                .map(move |tok| (i + 1, tok))
        })
        .map(|(line, tok)| {
            tok.parse::<f64>().map_err(|e| {
                ReductionError::Configuration(format!("calibration line {line}: '{tok}': {e}"))
            })
        })
        .collect()
}

/// Load both calibration tables, falling back to the Parsivel class centres
/// for any table not supplied.
pub fn load_calibration(sizes: Option<&Path>, velocities: Option<&Path>) -> Result<CalibrationTable> {
    let defaults = CalibrationTable::parsivel();
    let read = |path: Option<&Path>, fallback: &[f64]| -> Result<Vec<f64>> {
        match path {
            Some(p) => parse_calibration_values(&std::fs::read_to_string(p)?),
            None => Ok(fallback.to_vec()),
        }
    };
    CalibrationTable::new(
        read(sizes, defaults.particle_sizes_mm())?,
        read(velocities, defaults.velocity_bins_m_per_s())?,
    )
}
