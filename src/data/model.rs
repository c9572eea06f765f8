use serde::Deserialize;

use crate::error::{ReductionError, Result};

/// Number of diameter classes (and, equally, of velocity classes).
pub const NUM_CLASSES: usize = 32;

/// Number of cells in one flattened spectrogram.
pub const SPECTRUM_LEN: usize = NUM_CLASSES * NUM_CLASSES;

// ---------------------------------------------------------------------------
// Spectrogram – one interval's 32×32 droplet histogram
// ---------------------------------------------------------------------------

/// How a flat 1024-value spectrum is laid out on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectrumOrder {
    /// `flat[d * 32 + v]`: each run of 32 cells is one diameter class.
    #[default]
    DiameterMajor,
    /// `flat[v * 32 + d]`: each run of 32 cells is one velocity class.
    VelocityMajor,
}

impl SpectrumOrder {
    fn flat_index(self, diameter: usize, velocity: usize) -> usize {
        match self {
            SpectrumOrder::DiameterMajor => diameter * NUM_CLASSES + velocity,
            SpectrumOrder::VelocityMajor => velocity * NUM_CLASSES + diameter,
        }
    }
}

/// Droplet counts indexed `[diameter class][velocity class]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spectrogram {
    counts: Box<[[u32; NUM_CLASSES]; NUM_CLASSES]>,
}

impl Default for Spectrogram {
    fn default() -> Self {
        Self {
            counts: Box::new([[0; NUM_CLASSES]; NUM_CLASSES]),
        }
    }
}

impl Spectrogram {
    /// Reshape a flat spectrum into a 32×32 matrix.
    pub fn from_flat(values: &[u32], order: SpectrumOrder) -> Result<Self> {
        if values.len() != SPECTRUM_LEN {
            return Err(ReductionError::Shape {
                expected: SPECTRUM_LEN,
                actual: values.len(),
            });
        }
        let mut spec = Spectrogram::default();
        for (d, row) in spec.counts.iter_mut().enumerate() {
            for (v, cell) in row.iter_mut().enumerate() {
                *cell = values[order.flat_index(d, v)];
            }
        }
        Ok(spec)
    }

    /// Inverse of [`Spectrogram::from_flat`] for the same `order`.
    pub fn flatten(&self, order: SpectrumOrder) -> Vec<u32> {
        let mut flat = vec![0; SPECTRUM_LEN];
        for (d, row) in self.counts.iter().enumerate() {
            for (v, &cell) in row.iter().enumerate() {
                flat[order.flat_index(d, v)] = cell;
            }
        }
        flat
    }

    /// Count in diameter class `diameter`, velocity class `velocity`.
    pub fn get(&self, diameter: usize, velocity: usize) -> u32 {
        self.counts[diameter][velocity]
    }

    /// Rows of the matrix, one per diameter class.
    pub fn rows(&self) -> impl Iterator<Item = &[u32; NUM_CLASSES]> {
        self.counts.iter()
    }

    /// Droplets per diameter class (sum over the velocity axis).
    pub fn counts_by_diameter(&self) -> [f64; NUM_CLASSES] {
        let mut out = [0.0; NUM_CLASSES];
        for (slot, row) in out.iter_mut().zip(self.counts.iter()) {
            *slot = row.iter().map(|&c| c as f64).sum();
        }
        out
    }

    /// Total droplets in the interval.
    pub fn total(&self) -> u64 {
        self.counts
            .iter()
            .flat_map(|row| row.iter())
            .map(|&c| c as u64)
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Measurement – one instrument interval
// ---------------------------------------------------------------------------

/// One instrument interval: the eight scalar fields plus its spectrogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Date and time fields joined by a space, kept verbatim.
    pub timestamp: String,
    pub intensity_mm_per_hr: f64,
    pub total_precip_mm: f64,
    /// Radar reflectivity (dBZ).
    pub reflectivity: f64,
    /// MOR visibility (m).
    pub visibility: f64,
    pub num_particles: u64,
    pub kinetic_energy: f64,
    pub spectrogram: Spectrogram,
}

// ---------------------------------------------------------------------------
// Batch – every interval of one input file
// ---------------------------------------------------------------------------

/// Ordered intervals of one input file; order is temporal order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub measurements: Vec<Measurement>,
}

impl Batch {
    pub fn from_measurements(measurements: Vec<Measurement>) -> Self {
        Batch { measurements }
    }

    /// Number of intervals.
    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Whether the batch holds no intervals.
    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }
}

// ---------------------------------------------------------------------------
// CalibrationTable – class centres for both axes
// ---------------------------------------------------------------------------

/// OTT Parsivel diameter class centres (mm).
const PARSIVEL_SIZES_MM: [f64; NUM_CLASSES] = [
    0.062, 0.187, 0.312, 0.437, 0.562, 0.687, 0.812, 0.937, 1.062, 1.187, 1.375, 1.625, 1.875,
    2.125, 2.375, 2.75, 3.25, 3.75, 4.25, 4.75, 5.5, 6.5, 7.5, 8.5, 9.5, 11.0, 13.0, 15.0, 17.0,
    19.0, 21.5, 24.5,
];

/// OTT Parsivel velocity class centres (m/s).
const PARSIVEL_VELOCITIES_M_S: [f64; NUM_CLASSES] = [
    0.05, 0.15, 0.25, 0.35, 0.45, 0.55, 0.65, 0.75, 0.85, 0.95, 1.1, 1.3, 1.5, 1.7, 1.9, 2.2, 2.6,
    3.0, 3.4, 3.8, 4.4, 5.2, 6.0, 6.8, 7.6, 8.8, 10.4, 12.0, 13.6, 15.2, 17.6, 20.8,
];

/// Diameter and velocity class centres, validated on construction.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    particle_sizes_mm: Vec<f64>,
    velocity_bins_m_per_s: Vec<f64>,
}

impl CalibrationTable {
    /// Both tables must hold 32 strictly positive, strictly ascending values.
    pub fn new(particle_sizes_mm: Vec<f64>, velocity_bins_m_per_s: Vec<f64>) -> Result<Self> {
        check_table("particle sizes", &particle_sizes_mm)?;
        check_table("velocity bins", &velocity_bins_m_per_s)?;
        Ok(CalibrationTable {
            particle_sizes_mm,
            velocity_bins_m_per_s,
        })
    }

    /// The class centres published for the OTT Parsivel.
    pub fn parsivel() -> Self {
        CalibrationTable {
            particle_sizes_mm: PARSIVEL_SIZES_MM.to_vec(),
            velocity_bins_m_per_s: PARSIVEL_VELOCITIES_M_S.to_vec(),
        }
    }

    pub fn particle_sizes_mm(&self) -> &[f64] {
        &self.particle_sizes_mm
    }

    pub fn velocity_bins_m_per_s(&self) -> &[f64] {
        &self.velocity_bins_m_per_s
    }
}

fn check_table(name: &str, values: &[f64]) -> Result<()> {
    if values.len() != NUM_CLASSES {
        return Err(ReductionError::Configuration(format!(
            "{name}: expected {NUM_CLASSES} values, got {}",
            values.len()
        )));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v <= 0.0) {
        return Err(ReductionError::Configuration(format!(
            "{name}: {bad} is not a positive number"
        )));
    }
    if let Some(i) = values.windows(2).position(|w| w[0] >= w[1]) {
        return Err(ReductionError::Configuration(format!(
            "{name}: not ascending at index {}",
            i + 1
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<u32> {
        (0..SPECTRUM_LEN as u32).collect()
    }

    #[test]
    fn reshape_then_flatten_round_trips() {
        for order in [SpectrumOrder::DiameterMajor, SpectrumOrder::VelocityMajor] {
            let flat = ramp();
            let spec = Spectrogram::from_flat(&flat, order).unwrap();
            assert_eq!(spec.flatten(order), flat);
        }
    }

    #[test]
    fn diameter_major_rows_are_diameter_classes() {
        let spec = Spectrogram::from_flat(&ramp(), SpectrumOrder::DiameterMajor).unwrap();
        assert_eq!(spec.get(0, 1), 1);
        assert_eq!(spec.get(1, 0), 32);
    }

    #[test]
    fn velocity_major_is_transposed() {
        let spec = Spectrogram::from_flat(&ramp(), SpectrumOrder::VelocityMajor).unwrap();
        assert_eq!(spec.get(0, 1), 32);
        assert_eq!(spec.get(1, 0), 1);
    }

    #[test]
    fn wrong_length_is_a_shape_error() {
        let err = Spectrogram::from_flat(&[0; 1023], SpectrumOrder::default()).unwrap_err();
        assert!(matches!(
            err,
            ReductionError::Shape {
                expected: 1024,
                actual: 1023
            }
        ));
    }

    #[test]
    fn counts_by_diameter_sums_velocity_axis() {
        let mut flat = vec![0; SPECTRUM_LEN];
        flat[2 * NUM_CLASSES] = 3;
        flat[2 * NUM_CLASSES + 5] = 4;
        let spec = Spectrogram::from_flat(&flat, SpectrumOrder::DiameterMajor).unwrap();
        let by_diam = spec.counts_by_diameter();
        assert_eq!(by_diam[2], 7.0);
        assert_eq!(spec.total(), 7);
    }

    #[test]
    fn parsivel_tables_are_valid() {
        let table = CalibrationTable::parsivel();
        assert!(CalibrationTable::new(
            table.particle_sizes_mm().to_vec(),
            table.velocity_bins_m_per_s().to_vec()
        )
        .is_ok());
    }

    #[test]
    fn calibration_rejects_bad_tables() {
        let good = PARSIVEL_VELOCITIES_M_S.to_vec();
        assert!(CalibrationTable::new(vec![1.0; 31], good.clone()).is_err());

        let mut descending = PARSIVEL_SIZES_MM.to_vec();
        descending.swap(3, 4);
        assert!(CalibrationTable::new(descending, good.clone()).is_err());

        let mut negative = PARSIVEL_SIZES_MM.to_vec();
        negative[0] = -0.1;
        assert!(matches!(
            CalibrationTable::new(negative, good),
            Err(ReductionError::Configuration(_))
        ));
    }
}
