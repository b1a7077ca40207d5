use serde::{Deserialize, Serialize};

/// Descriptive statistics over the present values of one axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Summary {
    pub mean: f64,
    /// Population standard deviation; 0 with fewer than 2 values
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

impl Summary {
    /// Variance is only meaningful with at least two observations
    pub fn has_spread(&self) -> bool {
        self.count >= 2
    }
}

pub fn summarize(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary::default();
    }

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = if count < 2 {
        0.0
    } else {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64).sqrt()
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Summary { mean, std, min, max, count }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std() {
        let s = summarize(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.mean, 5.0);
        assert_eq!(s.std, 2.0);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
    }

    #[test]
    fn test_single_value_has_no_spread() {
        let s = summarize(&[42.0]);
        assert_eq!(s.std, 0.0);
        assert!(!s.has_spread());
        assert_eq!(summarize(&[]).count, 0);
    }
}
