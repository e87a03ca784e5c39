use serde::Serialize;

/// Arithmetic mean, `NaN` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n), `NaN` for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Sample standard deviation (divides by n - 1), `NaN` for fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Quantile of sorted data with linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Summary statistics of a feature column. `NaN` values are ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

impl Describe {
    pub fn of(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(f64::total_cmp);

        Self {
            count: sorted.len(),
            mean: mean(&sorted),
            std: sample_std(&sorted),
            min: sorted.first().copied().unwrap_or(f64::NAN),
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }
}

impl std::fmt::Display for Describe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "count={} mean={:.4} std={:.4} min={:.4} 25%={:.4} 50%={:.4} 75%={:.4} max={:.4}",
            self.count, self.mean, self.std, self.min, self.p25, self.p50, self.p75, self.max
        )
    }
}

/// One histogram bin, `[lower, upper)` except the last which includes `upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram over the non-NaN values.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![Bin {
            lower: min,
            upper: max,
            count: finite.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in finite {
        let index = (((v - min) / width) as usize).min(bins - 1);
        out[index].count += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_variants() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert_eq!(population_std(&values), 2.0);
        assert!((sample_std(&values) - 2.138089935).abs() < 1e-6);
        assert!(sample_std(&[3.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_describe_ignores_nan() {
        let d = Describe::of(&[1.0, f64::NAN, 2.0, 3.0, 4.0]);
        assert_eq!(d.count, 4);
        assert_eq!(d.mean, 2.5);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.p25, 1.75);
        assert_eq!(d.p50, 2.5);
        assert_eq!(d.max, 4.0);
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram(&[0.0, 1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].count, 2);
        assert_eq!(bins[1].count, 3);
        assert_eq!(bins[1].upper, 4.0);

        assert_eq!(histogram(&[5.0, 5.0], 10)[0].count, 2);
        assert!(histogram(&[f64::NAN], 3).is_empty());
    }
}
