use std::f64::consts::SQRT_2;

use log::{debug, warn};
use ndarray::{Array2, ArrayView2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use crate::errors::{MethylNormError, Result};
use crate::tools::huber::huber_default;

/// Fixed offset added after background adjustment so downstream ratios never
/// see a zero denominator.
pub const DEFAULT_OFFSET: f64 = 50.0;
/// Lower bound on the exponential signal mean; keeps the rate parameter away
/// from a degenerate near-zero scale.
pub const ALPHA_MIN: f64 = 10.0;

const SIGNAL_FLOOR: f64 = 1e-6;
// 0.5 * ln(2 * pi)
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;
// Below this standardized tail the erfc underflows, switch to the
// asymptotic expansion of the normal log-CDF
const LOG_CDF_ASYMPTOTIC: f64 = -37.0;

/// Normal+Exponential convolution parameters for one probe.
///
/// Sigma and alpha are stored on the log scale, matching how the fit
/// produces them and keeping cached tables strictly positive on reload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormExpParams {
    pub mu:        f64,
    pub log_sigma: f64,
    pub log_alpha: f64,
}

impl NormExpParams {
    pub fn sigma(&self) -> f64 {
        self.log_sigma.exp()
    }

    pub fn alpha(&self) -> f64 {
        self.log_alpha.exp()
    }
}

/// Adjusted intensities together with the parameter table that produced
/// them, so repeated application can skip the fit.
#[derive(Debug, Clone)]
pub struct NoobResult {
    pub adjusted: Array2<f64>,
    pub params:   Vec<NormExpParams>,
}

/// Fits Normal+Exponential parameters per probe row.
///
/// `observed` and `controls` are `[probes, samples]`; each probe row is fit
/// independently: the background mean and scale come from a Huber fit of the
/// control values, and the exponential mean is the excess of the observed
/// location over the background, floored at [`ALPHA_MIN`].
pub fn fit(
    observed: ArrayView2<f64>,
    controls: ArrayView2<f64>,
) -> Result<Vec<NormExpParams>> {
    if observed.nrows() != controls.nrows() {
        return Err(MethylNormError::InvalidInput(format!(
            "observed and control probe counts differ: {} vs {}",
            observed.nrows(),
            controls.nrows()
        )));
    }

    debug!(
        "fitting normexp parameters for {} probes over {} samples",
        observed.nrows(),
        observed.ncols()
    );
    observed
        .axis_iter(Axis(0))
        .into_par_iter()
        .zip(controls.axis_iter(Axis(0)).into_par_iter())
        .map(|(observed_row, control_row)| {
            let background = huber_default(&control_row.to_vec())?;
            let foreground = huber_default(&observed_row.to_vec())?;
            let alpha = (foreground.location - background.location).max(ALPHA_MIN);
            Ok(NormExpParams {
                mu:        background.location,
                log_sigma: background.scale.ln(),
                log_alpha: alpha.ln(),
            })
        })
        .collect()
}

/// Expected true signal given the observed foreground under the
/// Normal+Exponential model.
///
/// For each observation `x`, the closed-form posterior mean of the signal is
/// `mu_sf + sigma^2 * exp(log_dnorm - log_pnorm)` with `mu_sf = x - mu -
/// sigma^2 / alpha` and the normal log-density/log-survival evaluated at
/// zero. NaN observations propagate. When numerical accuracy runs out at
/// very low intensity or very high background the adjusted values are
/// floored to a small positive constant and the event is logged, never
/// raised.
pub fn signal(
    params: &NormExpParams,
    x: &[f64],
) -> Result<Vec<f64>> {
    let sigma = params.sigma();
    let alpha = params.alpha();
    if !(alpha > 0.0) {
        return Err(MethylNormError::NonPositiveParameter {
            name:  "alpha",
            value: alpha,
        });
    }
    if !(sigma > 0.0) {
        return Err(MethylNormError::NonPositiveParameter {
            name:  "sigma",
            value: sigma,
        });
    }

    let sigma2 = sigma * sigma;
    let mut adjusted: Vec<f64> = x
        .iter()
        .map(|&xi| {
            if xi.is_nan() {
                return f64::NAN;
            }
            let mu_sf = xi - params.mu - sigma2 / alpha;
            let standardized = mu_sf / sigma;
            let log_dnorm = -sigma.ln() - LN_SQRT_2PI - 0.5 * standardized * standardized;
            let log_pnorm = std_norm_log_cdf(standardized);
            mu_sf + sigma2 * (log_dnorm - log_pnorm).exp()
        })
        .collect();

    if adjusted.iter().any(|v| *v < 0.0) {
        let floored = adjusted.iter().filter(|v| **v < 0.0).count();
        warn!(
            "limit of numerical accuracy reached with very low intensity or very high \
             background: flooring {} adjusted intensities to {:e}",
            floored, SIGNAL_FLOOR
        );
        for value in adjusted.iter_mut() {
            if !value.is_nan() {
                *value = value.max(SIGNAL_FLOOR);
            }
        }
    }
    Ok(adjusted)
}

/// Applies a fitted parameter table to observed intensities.
///
/// `observed` is `[probes, samples]` with one parameter triple per row; the
/// returned matrix has the same shape, shifted by `offset` so every output
/// stays strictly positive.
pub fn adjust(
    observed: ArrayView2<f64>,
    params: &[NormExpParams],
    offset: f64,
) -> Result<Array2<f64>> {
    if params.len() != observed.nrows() {
        return Err(MethylNormError::InvalidInput(format!(
            "parameter table covers {} probes but {} were observed",
            params.len(),
            observed.nrows()
        )));
    }

    let mut adjusted = Array2::zeros(observed.raw_dim());
    adjusted
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(observed.axis_iter(Axis(0)).into_par_iter())
        .zip(params.par_iter())
        .try_for_each(|((mut out_row, observed_row), probe_params)| {
            let row = signal(probe_params, &observed_row.to_vec())?;
            for (out, value) in out_row.iter_mut().zip(row) {
                *out = value + offset;
            }
            Ok::<(), MethylNormError>(())
        })?;
    Ok(adjusted)
}

/// Background-corrects observed intensities, fitting parameters from control
/// probes unless a previously fitted table is supplied.
///
/// Exactly one of `controls` and `params` drives the model: a given table is
/// reused as-is, otherwise parameters are fit from `controls`. The fitted
/// table is returned alongside the adjusted matrix so it can be cached.
pub fn background_correct(
    observed: ArrayView2<f64>,
    controls: Option<ArrayView2<f64>>,
    params: Option<Vec<NormExpParams>>,
    offset: f64,
) -> Result<NoobResult> {
    let params = match (params, controls) {
        (Some(params), _) => params,
        (None, Some(controls)) => fit(observed, controls)?,
        (None, None) => {
            return Err(MethylNormError::InvalidInput(
                "either 'controls' or 'params' must be given".to_string(),
            ));
        },
    };
    let adjusted = adjust(observed, &params, offset)?;
    Ok(NoobResult { adjusted, params })
}

/// Log-CDF of the standard normal, stable far into the lower tail.
fn std_norm_log_cdf(t: f64) -> f64 {
    if t > LOG_CDF_ASYMPTOTIC {
        let cdf = 0.5 * erfc(-t / SQRT_2);
        if cdf > 0.0 {
            return cdf.ln();
        }
    }
    // Mills-ratio expansion; erfc underflows here
    let a = -t;
    let a2 = a * a;
    -0.5 * a2 - a.ln() - LN_SQRT_2PI + (-1.0 / a2 + 3.0 / (a2 * a2)).ln_1p()
}
