use log::warn;
use num::Float;

use crate::errors::{MethylNormError, Result};
use crate::utils::{median_inplace, to_num};

/// Winsorizing multiplier: values are clipped at `k` scale units around the
/// current location estimate.
pub const DEFAULT_WINSOR_K: f64 = 1.5;
/// Convergence tolerance relative to the scale estimate.
pub const DEFAULT_TOL: f64 = 1e-6;
/// Makes the MAD a consistent estimator of the standard deviation under
/// normality.
pub const MAD_CONSISTENCY: f64 = 1.4826;

const MAX_ITERATIONS: usize = 100;

/// Robust location/scale pair from Huber M-estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HuberEstimate<N: Float> {
    pub location: N,
    pub scale:    N,
}

/// Huber's M-estimator of location with MAD scale.
///
/// NaN values are discarded before computation. The location starts at the
/// median and is refined by a winsorized-mean fixed point; the scale is the
/// 1.4826-scaled MAD and is not re-estimated during iteration. A zero MAD is
/// a degenerate-scale error since the winsorizing window would collapse to a
/// point.
///
/// # Arguments
///
/// * `values` - Sample values.
/// * `k` - Winsorizes at `k` scale units. Default is 1.5.
/// * `tol` - Convergence tolerance relative to the scale. Default is 1e-6.
///
/// # Returns
///
/// The `(location, scale)` estimate.
pub fn huber<N: Float>(
    values: &[N],
    k: N,
    tol: N,
) -> Result<HuberEstimate<N>> {
    let y: Vec<N> = values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    if y.is_empty() {
        return Err(MethylNormError::InvalidInput(
            "cannot estimate location of an empty sample".to_string(),
        ));
    }

    let mut location = median_inplace(&mut y.clone());
    let scale = {
        let mut deviations: Vec<N> = y
            .iter()
            .map(|v| (*v - location).abs())
            .collect();
        median_inplace(&mut deviations) * to_num(MAD_CONSISTENCY)
    };
    if scale == N::zero() {
        return Err(MethylNormError::DegenerateScale);
    }

    let n: N = to_num(y.len());
    for _ in 0..MAX_ITERATIONS {
        let lo = location - k * scale;
        let hi = location + k * scale;
        let winsorized_mean = y
            .iter()
            .fold(N::zero(), |acc, v| acc + v.min(hi).max(lo))
            / n;
        if (location - winsorized_mean).abs() < tol * scale {
            return Ok(HuberEstimate { location, scale });
        }
        location = winsorized_mean;
    }

    warn!(
        "Huber location estimate did not converge within {} iterations",
        MAX_ITERATIONS
    );
    Ok(HuberEstimate { location, scale })
}

/// [`huber`] with the default winsorizing multiplier and tolerance.
pub fn huber_default<N: Float>(values: &[N]) -> Result<HuberEstimate<N>> {
    huber(values, to_num(DEFAULT_WINSOR_K), to_num(DEFAULT_TOL))
}
