use serde::Serialize;

/// A mean with its standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanStd {
    pub mean: f64,
    pub std_dev: f64,
}

/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Standard deviation with `ddof` delta degrees of freedom
/// (0 = population, 1 = sample). NaN when `len <= ddof`.
pub fn std_dev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return f64::NAN;
    }
    let mu = mean(values);
    let ss: f64 = values.iter().map(|v| (v - mu).powi(2)).sum();
    (ss / (values.len() - ddof) as f64).sqrt()
}

/// Mean and sample (ddof = 1) standard deviation.
pub fn sample_mean_std(values: &[f64]) -> MeanStd {
    MeanStd {
        mean: mean(values),
        std_dev: std_dev(values, 1),
    }
}
