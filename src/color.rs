use palette::{Hsl, IntoColor, Srgb};
use plotters::style::RGBColor;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<RGBColor> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            RGBColor(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Figure colours
// ---------------------------------------------------------------------------

/// Marker colours of the three distribution figures.
#[derive(Debug, Clone, Copy)]
pub struct SeriesColors {
    pub size: RGBColor,
    pub velocity: RGBColor,
    pub volume: RGBColor,
}

impl Default for SeriesColors {
    fn default() -> Self {
        // red, green, blue
        let p = generate_palette(3);
        SeriesColors {
            size: p[2],
            velocity: p[0],
            volume: p[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_hues_are_distinct() {
        let p = generate_palette(3);
        assert_eq!(p.len(), 3);
        assert!(p[0].0 > p[0].2, "first hue should be red");
        assert!(p[2].2 > p[2].0, "last hue should be blue");
        assert!(generate_palette(0).is_empty());
    }
}
