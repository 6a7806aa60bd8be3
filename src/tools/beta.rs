use ndarray::{Array2, ArrayView2, Zip};

use crate::errors::{MethylNormError, Result};

/// Options for the methylated / (methylated + unmethylated + offset) ratio.
#[derive(Debug, Clone, Copy)]
pub struct BetaConfig {
    /// Non-negative stabilizer added to the denominator.
    pub offset:    f64,
    /// When positive, clips beta into [threshold, 1 - threshold]. Must lie in
    /// [0, 0.5].
    pub threshold: f64,
    /// Floor both channels at zero before the ratio; corrected intensities
    /// below zero are non-physical.
    pub min_zero:  bool,
}

impl Default for BetaConfig {
    fn default() -> Self {
        Self {
            offset:    0.0,
            threshold: 0.0,
            min_zero:  true,
        }
    }
}

/// Elementwise beta values from paired methylated/unmethylated intensities.
///
/// A zero denominator yields NaN rather than an error, and NaN inputs
/// propagate untouched through flooring and clipping. Configuration is
/// validated before any computation.
pub fn beta_values(
    methylated: ArrayView2<f64>,
    unmethylated: ArrayView2<f64>,
    config: &BetaConfig,
) -> Result<Array2<f64>> {
    if config.offset < 0.0 {
        return Err(MethylNormError::InvalidInput(format!(
            "'offset' must be non-negative, got {}",
            config.offset
        )));
    }
    if !(0.0..=0.5).contains(&config.threshold) {
        return Err(MethylNormError::InvalidInput(format!(
            "'threshold' must be between 0 and 0.5, got {}",
            config.threshold
        )));
    }
    if methylated.dim() != unmethylated.dim() {
        return Err(MethylNormError::InvalidInput(format!(
            "methylated and unmethylated shapes differ: {:?} vs {:?}",
            methylated.dim(),
            unmethylated.dim()
        )));
    }

    let betas = Zip::from(&methylated)
        .and(&unmethylated)
        .par_map_collect(|&methylated, &unmethylated| {
            // NaN-preserving floor: NaN < 0.0 is false
            let (meth, unmeth) = if config.min_zero {
                (
                    if methylated < 0.0 { 0.0 } else { methylated },
                    if unmethylated < 0.0 { 0.0 } else { unmethylated },
                )
            }
            else {
                (methylated, unmethylated)
            };

            let mut beta = meth / (meth + unmeth + config.offset);
            if config.threshold > 0.0 {
                if beta < config.threshold {
                    beta = config.threshold;
                }
                else if beta > 1.0 - config.threshold {
                    beta = 1.0 - config.threshold;
                }
            }
            beta
        });
    Ok(betas)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use ndarray::arr2;

    use super::*;

    #[test]
    fn test_basic_ratio() {
        let betas = beta_values(
            arr2(&[[3.0]]).view(),
            arr2(&[[1.0]]).view(),
            &BetaConfig::default(),
        )
        .unwrap();
        assert_approx_eq!(betas[[0, 0]], 0.75);
    }

    #[test]
    fn test_zero_denominator_is_nan() {
        let betas = beta_values(
            arr2(&[[0.0]]).view(),
            arr2(&[[0.0]]).view(),
            &BetaConfig::default(),
        )
        .unwrap();
        assert!(betas[[0, 0]].is_nan());
    }

    #[test]
    fn test_threshold_clips_both_tails() {
        let config = BetaConfig {
            threshold: 0.1,
            ..Default::default()
        };
        let betas = beta_values(
            arr2(&[[2.0, 98.0]]).view(),
            arr2(&[[98.0, 2.0]]).view(),
            &config,
        )
        .unwrap();
        assert_approx_eq!(betas[[0, 0]], 0.1);
        assert_approx_eq!(betas[[0, 1]], 0.9);
    }

    #[test]
    fn test_min_zero_floors_negative_intensities() {
        let betas = beta_values(
            arr2(&[[-5.0]]).view(),
            arr2(&[[10.0]]).view(),
            &BetaConfig::default(),
        )
        .unwrap();
        assert_approx_eq!(betas[[0, 0]], 0.0);

        let config = BetaConfig {
            min_zero: false,
            ..Default::default()
        };
        let betas = beta_values(
            arr2(&[[-5.0]]).view(),
            arr2(&[[10.0]]).view(),
            &config,
        )
        .unwrap();
        assert_approx_eq!(betas[[0, 0]], -1.0);
    }

    #[test]
    fn test_nan_inputs_stay_nan_under_clipping() {
        let config = BetaConfig {
            threshold: 0.1,
            ..Default::default()
        };
        let betas = beta_values(
            arr2(&[[f64::NAN]]).view(),
            arr2(&[[1.0]]).view(),
            &config,
        )
        .unwrap();
        assert!(betas[[0, 0]].is_nan());
    }

    #[test]
    fn test_offset_in_denominator() {
        let config = BetaConfig {
            offset: 100.0,
            ..Default::default()
        };
        let betas = beta_values(
            arr2(&[[100.0]]).view(),
            arr2(&[[0.0]]).view(),
            &config,
        )
        .unwrap();
        assert_approx_eq!(betas[[0, 0]], 0.5);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let matrix = arr2(&[[1.0]]);
        let negative_offset = BetaConfig {
            offset: -1.0,
            ..Default::default()
        };
        assert!(beta_values(matrix.view(), matrix.view(), &negative_offset).is_err());

        let bad_threshold = BetaConfig {
            threshold: 0.6,
            ..Default::default()
        };
        assert!(beta_values(matrix.view(), matrix.view(), &bad_threshold).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = beta_values(
            arr2(&[[1.0, 2.0]]).view(),
            arr2(&[[1.0]]).view(),
            &BetaConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, MethylNormError::InvalidInput(_)));
    }
}
