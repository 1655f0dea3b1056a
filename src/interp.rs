use serde::{Deserialize, Serialize};

use crate::error::{DamageError, Result};

/// What to do when a query point falls outside the tabulated grid.
///
/// The policy is explicit; there is no silent extrapolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RangePolicy {
    /// Reject the query with `DamageError::MaterialRange`.
    #[default]
    Fail,
    /// Clamp the query to the nearest grid endpoint.
    Clamp,
}

/// Piecewise-linear interpolation of `values` over the strictly increasing
/// grid `xs` at the query point `x`.
///
/// Both slices must have the same length >= 1. A single-point grid returns
/// that point's value for any in-range (or clamped) query.
pub fn interp1d(xs: &[f64], values: &[f64], x: f64, policy: RangePolicy) -> Result<f64> {
    debug_assert_eq!(xs.len(), values.len());
    debug_assert!(!xs.is_empty());

    let (lo, hi) = (xs[0], xs[xs.len() - 1]);
    let x = if x < lo || x > hi {
        match policy {
            RangePolicy::Fail => {
                return Err(DamageError::MaterialRange {
                    temperature: x,
                    low: lo,
                    high: hi,
                })
            }
            RangePolicy::Clamp => x.clamp(lo, hi),
        }
    } else {
        x
    };

    if xs.len() == 1 {
        return Ok(values[0]);
    }

    // partition_point gives the first index with xs[i] > x, so the cell is
    // [i-1, i] after clamping to the interior
    let i = xs.partition_point(|&g| g <= x).clamp(1, xs.len() - 1);
    let (x0, x1) = (xs[i - 1], xs[i]);
    let frac = (x - x0) / (x1 - x0);
    Ok(values[i - 1] * (1.0 - frac) + values[i] * frac)
}

/// Check that a grid is strictly increasing; used by the constructors that
/// own tabulated data.
pub fn check_strictly_increasing(name: &'static str, xs: &[f64]) -> Result<()> {
    for w in xs.windows(2) {
        if w[1] <= w[0] {
            return Err(DamageError::InvalidParameter {
                name,
                reason: format!("grid must be strictly increasing, got {} then {}", w[0], w[1]),
            });
        }
    }
    Ok(())
}
