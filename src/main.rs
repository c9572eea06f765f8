use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use rusty_drop::config::{CollectionGeometry, ReductionConfig};
use rusty_drop::data::loader::load_calibration;
use rusty_drop::{plot, reduce, report};

#[derive(Parser, Debug)]
#[command(
    name = "rusty-drop",
    version,
    about = "Reduce optical disdrometer spectra into rainfall statistics and distribution plots"
)]
struct Cli {
    /// Raw instrument file (.MIS)
    input: PathBuf,

    /// JSON configuration file; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Particle-size class centres, 32 values in mm (default: Parsivel classes)
    #[arg(long)]
    sizes: Option<PathBuf>,

    /// Velocity class centres, 32 values in m/s (default: Parsivel classes)
    #[arg(long)]
    velocities: Option<PathBuf>,

    /// Rows to discard from the top of the file
    #[arg(long)]
    top_skip: Option<usize>,

    /// Rows to discard from the bottom of the file
    #[arg(long)]
    bottom_skip: Option<usize>,

    /// Outlier tolerance in standard deviations (0 disables)
    #[arg(long)]
    zscore_tol: Option<f64>,

    /// Hand-collected water volume in mL (0 disables the comparison)
    #[arg(long)]
    collected_volume: Option<f64>,

    /// Footprint of the collection bin in square inches
    #[arg(long)]
    collection_area: Option<f64>,

    /// Collection time in minutes
    #[arg(long)]
    collection_duration: Option<f64>,

    /// Draw maximum deviation error bars on the distribution plots
    #[arg(long)]
    errorbars: bool,

    /// Prefix of the figure file names (default: input file stem)
    #[arg(long)]
    label: Option<String>,

    /// TrueType font used for figure labels
    #[arg(long)]
    font: Option<PathBuf>,

    /// Directory receiving the report and the figures
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Skip figure rendering
    #[arg(long)]
    no_plots: bool,

    /// Also print the full reduction as JSON on stdout
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn reduction_config(&self) -> Result<ReductionConfig> {
        let mut cfg = match &self.config {
            Some(path) => ReductionConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => ReductionConfig::default(),
        };
        if let Some(n) = self.top_skip {
            cfg.top_skip = n;
        }
        if let Some(n) = self.bottom_skip {
            cfg.bottom_skip = n;
        }
        if let Some(tol) = self.zscore_tol {
            cfg.zscore_tolerance = tol;
        }
        if let Some(v) = self.collected_volume {
            cfg.collected_volume_ml = v;
        }
        if let Some(a) = self.collection_area {
            cfg.collection_geometry = CollectionGeometry::AreaIn2(a);
        }
        if let Some(d) = self.collection_duration {
            cfg.collection_duration_min = d;
        }
        if self.errorbars {
            cfg.plot.errorbars = true;
        }
        if self.label.is_some() {
            cfg.plot.label = self.label.clone();
        }
        if self.font.is_some() {
            cfg.plot.font = self.font.clone();
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let cfg = cli.reduction_config()?;
    let calibration = load_calibration(cli.sizes.as_deref(), cli.velocities.as_deref())
        .context("loading calibration tables")?;

    let raw = std::fs::read_to_string(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let reduction = reduce(&raw, &calibration, &cfg)
        .with_context(|| format!("reducing {}", cli.input.display()))?;

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;
    let report_path = cli.output_dir.join(report::REPORT_FILE_NAME);
    report::write_report_file(&report_path, &reduction.summary)
        .with_context(|| format!("writing {}", report_path.display()))?;
    info!("wrote {}", report_path.display());

    if !cli.no_plots {
        let stem = cli
            .input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("disdrometer")
            .to_string();
        let label = cfg.plot.label.clone().unwrap_or_else(|| stem.clone());
        plot::render_all(&cli.output_dir, &label, &stem, &reduction.spectral, &cfg.plot)?;
    }

    if cli.json {
        serde_json::to_writer_pretty(std::io::stdout().lock(), &reduction)
            .context("writing JSON summary")?;
        println!();
    }
    Ok(())
}
