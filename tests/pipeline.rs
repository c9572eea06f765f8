use rusty_drop::config::{CollectionGeometry, ReductionConfig};
use rusty_drop::data::model::{NUM_CLASSES, SPECTRUM_LEN};
use rusty_drop::data::summary::{Metric, MM_TO_IN};
use rusty_drop::report::{write_report_file, REPORT_FILE_NAME};
use rusty_drop::{reduce, CalibrationTable, ReductionError, SpectrumOrder};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Row {
    intensity: f64,
    particles: u64,
    kinetic_energy: f64,
    /// `(diameter class, velocity class, count)`
    cells: Vec<(usize, usize, u32)>,
}

impl Row {
    fn new(intensity: f64, particles: u64, cells: &[(usize, usize, u32)]) -> Self {
        Row {
            intensity,
            particles,
            kinetic_energy: intensity * 10.0,
            cells: cells.to_vec(),
        }
    }

    fn render(&self, order: SpectrumOrder) -> String {
        let mut flat = vec![String::new(); SPECTRUM_LEN];
        for &(d, v, c) in &self.cells {
            let idx = match order {
                SpectrumOrder::DiameterMajor => d * NUM_CLASSES + v,
                SpectrumOrder::VelocityMajor => v * NUM_CLASSES + d,
            };
            assert_ne!(idx, 0, "cell 0 is the spectrum marker");
            flat[idx] = c.to_string();
        }
        flat[0] = "<SPECTRUM>".into();
        format!(
            "01.06.2021,12:00:00,{},0.00,20.0,9999,{},{},{},</SPECTRUM>",
            self.intensity,
            self.particles,
            self.kinetic_energy,
            flat.join(",")
        )
    }
}

fn file(rows: &[Row], order: SpectrumOrder) -> String {
    let mut lines = vec!["#device,OTT Parsivel2,serial,123456".to_string()];
    lines.extend(rows.iter().map(|r| r.render(order)));
    lines.push(String::new());
    lines.join("\n")
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn shower() -> Vec<Row> {
    vec![
        Row::new(2.0, 10, &[(8, 10, 6), (12, 14, 4)]),
        Row::new(3.0, 11, &[(8, 10, 5), (12, 14, 6)]),
        Row::new(4.0, 9, &[(10, 12, 9)]),
        // glitch: particle count far outside the rest
        Row::new(50.0, 500, &[(20, 20, 1)]),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn outliers_only_affect_scalar_statistics() {
    let table = CalibrationTable::parsivel();
    let cfg = ReductionConfig {
        zscore_tolerance: 1.0,
        ..ReductionConfig::default()
    };
    let reduction = reduce(&file(&shower(), SpectrumOrder::DiameterMajor), &table, &cfg).unwrap();

    assert_eq!(reduction.intervals_parsed, 4);
    assert_eq!(reduction.summary.intervals_used, 3);

    let mm = reduction.summary.get(Metric::IntensityMmPerHr).unwrap();
    assert!(close(mm.mean, 3.0));
    assert!(close(mm.std_dev, 1.0));
    let inch = reduction.summary.get(Metric::IntensityInPerHr).unwrap();
    assert!(close(inch.mean, 3.0 * MM_TO_IN));
    assert!(close(reduction.summary.get(Metric::NumParticles).unwrap().mean, 10.0));

    // the glitch interval still contributes its drop to the spectra
    let sizes = table.particle_sizes_mm();
    assert!(reduction.spectral.size.bins().contains(&sizes[20]));
    assert_eq!(reduction.spectral.interval_mean_diameters.len(), 4);
}

#[test]
fn volume_distribution_is_normalised() {
    let table = CalibrationTable::parsivel();
    let reduction = reduce(
        &file(&shower(), SpectrumOrder::DiameterMajor),
        &table,
        &ReductionConfig::default(),
    )
    .unwrap();

    let volume = &reduction.spectral.volume;
    assert!(close(volume.fractions.iter().sum::<f64>(), 1.0));
    assert_eq!(volume.sizes_mm, reduction.spectral.size.bins());
    let sizes = table.particle_sizes_mm();
    assert!(volume.vmd_mm >= sizes[0] && volume.vmd_mm <= sizes[NUM_CLASSES - 1]);
    // the single 21.5 mm class outweighs everything else combined
    assert_eq!(volume.vmd_mm, sizes[20]);
}

#[test]
fn both_spectrum_orders_give_the_same_reduction() {
    let table = CalibrationTable::parsivel();
    let diameter_major = reduce(
        &file(&shower(), SpectrumOrder::DiameterMajor),
        &table,
        &ReductionConfig::default(),
    )
    .unwrap();
    let velocity_major = reduce(
        &file(&shower(), SpectrumOrder::VelocityMajor),
        &table,
        &ReductionConfig {
            spectrum_order: SpectrumOrder::VelocityMajor,
            ..ReductionConfig::default()
        },
    )
    .unwrap();
    assert_eq!(diameter_major.spectral.size, velocity_major.spectral.size);
    assert_eq!(diameter_major.spectral.velocity, velocity_major.spectral.velocity);
}

#[test]
fn top_and_bottom_skips_trim_intervals() {
    let table = CalibrationTable::parsivel();
    let cfg = ReductionConfig {
        top_skip: 2,
        bottom_skip: 1,
        zscore_tolerance: 0.0,
        ..ReductionConfig::default()
    };
    let reduction = reduce(&file(&shower(), SpectrumOrder::DiameterMajor), &table, &cfg).unwrap();
    // header and first interval skipped at the top, glitch at the bottom
    assert_eq!(reduction.intervals_parsed, 2);
    assert!(close(
        reduction.summary.get(Metric::IntensityMmPerHr).unwrap().mean,
        3.5
    ));
}

#[test]
fn empty_spectra_are_degenerate() {
    let rows = vec![Row::new(1.0, 0, &[]), Row::new(1.0, 0, &[])];
    let err = reduce(
        &file(&rows, SpectrumOrder::DiameterMajor),
        &CalibrationTable::parsivel(),
        &ReductionConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, ReductionError::DegenerateInput(_)));
}

#[test]
fn invalid_configuration_fails_before_parsing() {
    let cfg = ReductionConfig {
        zscore_tolerance: f64::NAN,
        ..ReductionConfig::default()
    };
    let err = reduce("not,a,valid,file", &CalibrationTable::parsivel(), &cfg).unwrap_err();
    assert!(matches!(err, ReductionError::Configuration(_)));
}

#[test]
fn report_with_collected_water_comparison() {
    let dir = tempfile::tempdir().unwrap();
    let table = CalibrationTable::parsivel();
    let cfg = ReductionConfig {
        zscore_tolerance: 1.0,
        collected_volume_ml: 500.0,
        collection_geometry: CollectionGeometry::AreaIn2(117.0),
        collection_duration_min: 10.0,
        ..ReductionConfig::default()
    };
    let reduction = reduce(&file(&shower(), SpectrumOrder::DiameterMajor), &table, &cfg).unwrap();

    let cmp = reduction.summary.comparison.unwrap();
    let collected = 500.0 * 0.0610237 * 60.0 / (10.0 * 117.0);
    assert!(close(cmp.collected_intensity_in_per_hr, collected));
    let expected_error = (1.0 - collected / (3.0 * MM_TO_IN)).abs();
    assert!(close(cmp.percent_error, expected_error));

    let path = dir.path().join(REPORT_FILE_NAME);
    write_report_file(&path, &reduction.summary).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("Parsivel Statistics\n"));
    assert!(text.contains("Collected Water Statistics"));
    assert!(text.contains(&format!("Percent Error,{:.2}%", expected_error * 100.0)));
}
