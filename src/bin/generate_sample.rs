//! Writes a synthetic disdrometer file for trying out `rusty-drop`.
//!
//! Usage: `generate_sample [OUTPUT]` (default `sample_data.MIS`).

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};

use rusty_drop::data::loader::SPECTRUM_MARKER;
use rusty_drop::data::model::{CalibrationTable, NUM_CLASSES, SPECTRUM_LEN};

const INTERVALS: usize = 60;
/// Interval that gets an instrument glitch with a huge particle count.
const GLITCH_INTERVAL: usize = 37;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }

    /// Exponential variate with rate `lambda`.
    fn exponential(&mut self, lambda: f64) -> f64 {
        -self.next_f64().max(1e-15).ln() / lambda
    }
}

/// Index of the class whose centre is closest to `value`.
fn class_of(centres: &[f64], value: f64) -> usize {
    let upper = centres.partition_point(|&c| c < value);
    match upper {
        0 => 0,
        n if n >= centres.len() => centres.len() - 1,
        n if value - centres[n - 1] < centres[n] - value => n - 1,
        n => n,
    }
}

/// Atlas et al. (1973) terminal fall velocity of a rain drop (m/s).
fn terminal_velocity(diameter_mm: f64) -> f64 {
    (9.65 - 10.3 * (-0.6 * diameter_mm).exp()).max(0.1)
}

struct Interval {
    counts: Vec<u32>,
    particles: u64,
    intensity_mm_h: f64,
    kinetic_energy: f64,
}

/// Draw one interval of drops from a Marshall-Palmer style distribution.
fn simulate_interval(rng: &mut SimpleRng, table: &CalibrationTable, mean_drops: f64, lambda: f64) -> Interval {
    let sizes = table.particle_sizes_mm();
    let velocities = table.velocity_bins_m_per_s();
    let drops = rng.gauss(mean_drops, mean_drops.sqrt()).max(0.0).round() as usize;

    let mut counts = vec![0u32; SPECTRUM_LEN];
    let mut volume_mm3 = 0.0;
    let mut energy = 0.0;
    for _ in 0..drops {
        let d = rng.exponential(lambda).clamp(0.25, 8.0);
        let v = rng.gauss(terminal_velocity(d), 0.3).max(0.05);
        let (di, vi) = (class_of(sizes, d), class_of(velocities, v));
        counts[di * NUM_CLASSES + vi] += 1;

        let drop_volume = std::f64::consts::PI / 6.0 * d.powi(3);
        volume_mm3 += drop_volume;
        // mass in kg from mm³ of water
        energy += 0.5 * drop_volume * 1e-6 * v * v;
    }

    // 54 cm² sampling area, 60 s interval
    let depth_mm = volume_mm3 / 5400.0;
    Interval {
        counts,
        particles: drops as u64,
        intensity_mm_h: depth_mm * 60.0,
        kinetic_energy: energy * 1e3,
    }
}

fn main() -> Result<()> {
    let output_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_data.MIS".to_string());
    let table = CalibrationTable::parsivel();
    let mut rng = SimpleRng::new(42);

    let file = File::create(&output_path).with_context(|| format!("creating {output_path}"))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "Date,Time,Intensity,Precip,Z,MOR,Particles,KE,Spectrum")?;

    let mut total_precip = 0.0;
    for i in 0..INTERVALS {
        // a shower that builds up and dies away
        let phase = i as f64 / INTERVALS as f64 * std::f64::consts::PI;
        let mean_drops = 150.0 + 400.0 * phase.sin();
        let lambda = 2.2 - 0.6 * phase.sin();
        let mut interval = simulate_interval(&mut rng, &table, mean_drops, lambda);
        if i == GLITCH_INTERVAL {
            interval.particles *= 40;
        }
        total_precip += interval.intensity_mm_h / 60.0;

        let reflectivity = 10.0 * (200.0 * interval.intensity_mm_h.max(0.01).powf(1.6)).log10();
        let visibility = (20_000.0 / (1.0 + interval.intensity_mm_h)).min(9_999.0);

        write!(
            out,
            "01.06.2021,{:02}:{:02}:00,{:.3},{:.2},{:.1},{:.0},{},{:.3},{SPECTRUM_MARKER}",
            12 + i / 60,
            i % 60,
            interval.intensity_mm_h,
            total_precip,
            reflectivity,
            visibility,
            interval.particles,
            interval.kinetic_energy,
        )?;
        // the marker occupies the first spectrum cell
        for &c in &interval.counts[1..] {
            if c == 0 {
                write!(out, ",")?;
            } else {
                write!(out, ",{c}")?;
            }
        }
        writeln!(out, ",</SPECTRUM>")?;
    }
    out.flush()?;

    println!("Wrote {INTERVALS} intervals ({} spectrum cells each) to {output_path}", SPECTRUM_LEN);
    Ok(())
}
