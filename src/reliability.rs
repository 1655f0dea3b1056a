use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Structure-level reliability obtained by weakest-link summation of
/// per-element log-reliabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilitySummary {
    pub log_reliability: f64,
    pub reliability: f64,
    pub probability_of_failure: f64,
}

impl ReliabilitySummary {
    pub fn from_log_reliability(log_reliability: f64) -> Self {
        let reliability = log_reliability.exp();
        Self {
            log_reliability,
            reliability,
            probability_of_failure: 1.0 - reliability,
        }
    }
}

/// Sum log-reliabilities across independent elements (and failure modes) and
/// convert to a reliability and probability of failure.
///
/// Very large negative sums underflow to `R = 0`, `Pf = 1`; that is the
/// correct physical answer, not an error, and `-inf` inputs propagate the
/// same way.
pub fn aggregate(log_reliabilities: &[ArrayView1<'_, f64>]) -> ReliabilitySummary {
    let log_reliability: f64 = log_reliabilities
        .iter()
        .map(|arr| arr.iter().sum::<f64>())
        .sum();
    ReliabilitySummary::from_log_reliability(log_reliability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_aggregate_zeros_is_certain_survival() {
        let lr = array![0.0, 0.0, 0.0];
        let summary = aggregate(&[lr.view()]);
        assert_eq!(summary.reliability, 1.0);
        assert_eq!(summary.probability_of_failure, 0.0);
    }

    #[test]
    fn test_aggregate_sums_modes() {
        let surface = array![-0.5, -1.0];
        let volume = array![-0.25];
        let summary = aggregate(&[surface.view(), volume.view()]);
        assert!((summary.log_reliability + 1.75).abs() < 1e-12);
        assert!((summary.reliability - (-1.75_f64).exp()).abs() < 1e-12);
        assert!(summary.probability_of_failure > 0.0 && summary.probability_of_failure < 1.0);
    }

    #[test]
    fn test_aggregate_certain_failure_saturates() {
        let lr = array![f64::NEG_INFINITY, -1.0];
        let summary = aggregate(&[lr.view()]);
        assert_eq!(summary.reliability, 0.0);
        assert_eq!(summary.probability_of_failure, 1.0);
        assert!(summary.log_reliability.is_infinite());
    }

    #[test]
    fn test_aggregate_underflow_saturates() {
        let lr = array![-1.0e6];
        let summary = aggregate(&[lr.view()]);
        assert_eq!(summary.reliability, 0.0);
        assert_eq!(summary.probability_of_failure, 1.0);
    }
}
