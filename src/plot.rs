use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::color::SeriesColors;
use crate::config::PlotConfig;
use crate::data::aggregate::{Distribution, SpectralSummary, VolumeDistribution};

const FIGURE_SIZE: (u32, u32) = (800, 600);
const MARKER_SIZE: i32 = 4;
const FONT_FAMILY: &str = "sans-serif";

/// Fonts tried, in order, when no font is configured.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Subdirectory of the output directory holding the figures.
pub const FIGURES_DIR: &str = "figures";

/// Paths of the images written by [`render_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct Figures {
    pub size: PathBuf,
    pub velocity: PathBuf,
    pub volume: PathBuf,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Render the size, velocity and volume figures into `<out_dir>/figures`.
pub fn render_all(
    out_dir: &Path,
    label: &str,
    title: &str,
    spectral: &SpectralSummary,
    cfg: &PlotConfig,
) -> Result<Figures> {
    load_font(cfg.font.as_deref())?;

    let dir = out_dir.join(FIGURES_DIR);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }

    let colors = SeriesColors::default();
    let figures = Figures {
        size: dir.join(format!("{label}_size_dist.png")),
        velocity: dir.join(format!("{label}_velocity_dist.png")),
        volume: dir.join(format!("{label}_volume.png")),
    };

    distribution_plot(
        &figures.size,
        title,
        &spectral.size,
        DistributionAxes {
            x_desc: "log of droplet diameter (mm)",
            y_range: cfg.size_count_range,
        },
        colors.size,
        cfg.errorbars,
    )
    .context("rendering size distribution")?;

    distribution_plot(
        &figures.velocity,
        title,
        &spectral.velocity,
        DistributionAxes {
            x_desc: "log of particle velocity (m/s)",
            y_range: cfg.velocity_count_range,
        },
        colors.velocity,
        cfg.errorbars,
    )
    .context("rendering velocity distribution")?;

    volume_plot(&figures.volume, title, &spectral.volume, cfg, colors.volume)
        .context("rendering volume distribution")?;

    info!("wrote figures to {}", dir.display());
    Ok(figures)
}

// ---------------------------------------------------------------------------
// Figures
// ---------------------------------------------------------------------------

struct DistributionAxes {
    x_desc: &'static str,
    y_range: (f64, f64),
}

/// Droplet count against class centre on a log x axis, optionally with the
/// maximum deviation over time as error bars.
fn distribution_plot(
    path: &Path,
    title: &str,
    dist: &Distribution,
    axes: DistributionAxes,
    color: RGBColor,
    errorbars: bool,
) -> Result<()> {
    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_lo, x_hi) = log_span(&dist.bins());
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), axes.y_range.0..axes.y_range.1)?;

    chart
        .configure_mesh()
        .x_desc(axes.x_desc)
        .y_desc("number of droplets")
        .draw()?;

    if errorbars {
        chart.draw_series(dist.entries.iter().map(|e| {
            let dev = e.max_std.unwrap_or(0.0);
            ErrorBar::new_vertical(e.bin, e.count - dev, e.count, e.count + dev, color.filled(), 8)
        }))?;
    }
    chart.draw_series(
        dist.entries
            .iter()
            .map(|e| Circle::new((e.bin, e.count), MARKER_SIZE, color.filled())),
    )?;

    root.present()?;
    Ok(())
}

/// Volume fraction against droplet diameter, annotated with the VMD.
fn volume_plot(
    path: &Path,
    title: &str,
    volume: &VolumeDistribution,
    cfg: &PlotConfig,
    color: RGBColor,
) -> Result<()> {
    let root = BitMapBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_lo, x_hi) = cfg.volume_size_range;
    let (y_lo, y_hi) = cfg.volume_fraction_range;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, (FONT_FAMILY, 24))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("log of droplet diameter (mm)")
        .y_desc("fraction of total rainfall volume")
        .draw()?;

    chart.draw_series(
        volume
            .sizes_mm
            .iter()
            .zip(&volume.fractions)
            .map(|(&d, &f)| Circle::new((d, f), MARKER_SIZE, color.filled())),
    )?;

    let anchor = (x_lo * 1.2, y_hi - (y_hi - y_lo) * 0.15);
    chart.draw_series(std::iter::once(Text::new(
        format!("VMD = {} mm", volume.vmd_mm),
        anchor,
        (FONT_FAMILY, 20).into_font(),
    )))?;

    root.present()?;
    Ok(())
}

/// Register the label font with plotters.
fn load_font(configured: Option<&Path>) -> Result<()> {
    let path = match configured {
        Some(p) => p.to_path_buf(),
        None => FONT_CANDIDATES
            .iter()
            .map(PathBuf::from)
            .find(|p| p.exists())
            .context("no TrueType font found; set plot.font or pass --font")?,
    };
    let bytes = std::fs::read(&path).with_context(|| format!("reading font {}", path.display()))?;
    // plotters keeps registered fonts for the life of the process
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    for style in [FontStyle::Normal, FontStyle::Bold] {
        register_font(FONT_FAMILY, style, bytes)
            .map_err(|_| anyhow!("{} is not a usable font", path.display()))?;
    }
    debug!("using font {}", path.display());
    Ok(())
}

/// A log-axis span that leaves some room around the outermost bins.
fn log_span(bins: &[f64]) -> (f64, f64) {
    let lo = bins.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = bins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !lo.is_finite() || !hi.is_finite() || lo <= 0.0 {
        return (0.01, 100.0);
    }
    (lo / 1.5, hi * 1.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_span_pads_outer_bins() {
        let (lo, hi) = log_span(&[0.3, 1.0, 6.0]);
        assert!((lo - 0.2).abs() < 1e-12);
        assert!((hi - 9.0).abs() < 1e-12);
    }

    #[test]
    fn log_span_falls_back_when_empty() {
        assert_eq!(log_span(&[]), (0.01, 100.0));
    }
}
