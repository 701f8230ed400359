use serde::{Deserialize, Serialize};

use crate::error::GuardplotError;

/// Max and mean of a request-rate series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RateStats {
    pub max: f64,
    pub mean: f64,
}

/// Mean-split classification of a delay series.
///
/// `blue` holds the indices at or below the mean, `red` those above it, each
/// in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Summary {
    pub count: usize,
    pub mean_ms: f64,
    pub max_ms: f64,
    pub blue: Vec<usize>,
    pub blue_values: Vec<f64>,
    pub red: Vec<usize>,
    pub red_values: Vec<f64>,
    /// `blue.len() / red.len()`, or exactly 1 when nothing is above the mean.
    pub ratio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateStats>,
}

/// Classify `delays` around their mean.
///
/// Fails with [`GuardplotError::EmptyInput`] for an empty series. An empty
/// `rates` series yields no rate statistics.
pub fn summarize(delays: &[f64], rates: Option<&[f64]>) -> Result<Summary, GuardplotError> {
    let mean_ms = mean(delays)
        .ok_or_else(|| GuardplotError::EmptyInput("delay series is empty".to_string()))?;

    let mut blue = Vec::new();
    let mut blue_values = Vec::new();
    let mut red = Vec::new();
    let mut red_values = Vec::new();
    for (i, &delay) in delays.iter().enumerate() {
        if delay <= mean_ms {
            blue.push(i);
            blue_values.push(delay);
        } else {
            red.push(i);
            red_values.push(delay);
        }
    }

    let ratio = if red.is_empty() {
        1.0
    } else {
        blue.len() as f64 / red.len() as f64
    };

    let rate = rates.and_then(|rates| {
        mean(rates).map(|mean| RateStats {
            max: rates.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean,
        })
    });

    Ok(Summary {
        count: delays.len(),
        mean_ms,
        max_ms: delays.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        blue,
        blue_values,
        red,
        red_values,
        ratio,
        rate,
    })
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_around_the_mean() {
        let summary = summarize(&[10.0, 20.0, 30.0, 100.0], None).expect("non-empty");
        assert_eq!(summary.mean_ms, 40.0);
        assert_eq!(summary.blue_values, vec![10.0, 20.0, 30.0]);
        assert_eq!(summary.red_values, vec![100.0]);
        assert_eq!(summary.blue, vec![0, 1, 2]);
        assert_eq!(summary.red, vec![3]);
        assert_eq!(summary.ratio, 3.0);
        assert_eq!(summary.max_ms, 100.0);
        assert!(summary.rate.is_none());
    }

    #[test]
    fn value_equal_to_mean_is_blue() {
        let summary = summarize(&[5.0, 5.0, 5.0], None).expect("non-empty");
        assert_eq!(summary.blue, vec![0, 1, 2]);
        assert!(summary.red.is_empty());
    }

    #[test]
    fn ratio_is_one_when_nothing_above_mean() {
        let summary = summarize(&[7.0], None).expect("non-empty");
        assert_eq!(summary.ratio, 1.0);

        let summary = summarize(&[0.0; 50], None).expect("non-empty");
        assert_eq!(summary.blue.len(), 50);
        assert_eq!(summary.ratio, 1.0);
    }

    #[test]
    fn partition_is_exhaustive_and_exclusive() {
        let delays = [3.0, 90.0, 1.0, 44.0, 12.0, 12.0, 300.0, 0.0, 41.5];
        let summary = summarize(&delays, None).expect("non-empty");

        let mut indices: Vec<usize> = summary.blue.iter().chain(&summary.red).copied().collect();
        indices.sort_unstable();
        assert_eq!(indices, (0..delays.len()).collect::<Vec<_>>());
        assert!(summary.blue.iter().all(|i| !summary.red.contains(i)));
        assert!(summary.blue.windows(2).all(|w| w[0] < w[1]));
        assert!(summary.red.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_series_is_an_error() {
        let err = summarize(&[], None).unwrap_err();
        assert!(matches!(err, GuardplotError::EmptyInput(_)));
    }

    #[test]
    fn rate_series_reports_max_and_mean() {
        let summary =
            summarize(&[1.0, 2.0], Some(&[60.0, 120.0, 90.0])).expect("non-empty");
        let rate = summary.rate.expect("rate stats present");
        assert_eq!(rate.max, 120.0);
        assert_eq!(rate.mean, 90.0);
    }

    #[test]
    fn empty_rate_series_has_no_stats() {
        let summary = summarize(&[1.0], Some(&[])).expect("non-empty");
        assert!(summary.rate.is_none());
    }
}
