use std::cmp::Ordering::Equal;

use log::debug;
use ndarray::{Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::data_structs::probes::SubtypeIndices;
use crate::errors::{MethylNormError, Result};
use crate::utils::{interp, rankdata};

/// Equal-size random subsets of the two chemistry subtypes, as positions
/// within each subtype's own intensity vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwanSelection {
    pub one: Vec<usize>,
    pub two: Vec<usize>,
}

/// Draws the matched subsets used to build the reference curve.
///
/// The draw size defaults to the smaller subtype population (optionally
/// capped by `size`) and is deterministic for a given seed, so repeated runs
/// reproduce identical output.
pub fn select_subsets(
    n_one: usize,
    n_two: usize,
    size: Option<usize>,
    seed: u64,
) -> Result<SwanSelection> {
    let limit = n_one.min(n_two);
    let amount = size.map(|s| s.min(limit)).unwrap_or(limit);
    if amount == 0 {
        return Err(MethylNormError::InvalidInput(
            "cannot draw an empty subtype subset".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut one = rand::seq::index::sample(&mut rng, n_one, amount).into_vec();
    let mut two = rand::seq::index::sample(&mut rng, n_two, amount).into_vec();
    one.sort_unstable();
    two.sort_unstable();
    Ok(SwanSelection { one, two })
}

/// Subset-quantile bias correction of one intensity matrix.
///
/// `intensity` is `[samples, probes]`; `indices` partitions the probe axis
/// into the two chemistry subtypes and `selection` holds the matched
/// subsets. Per sample, a reference curve is built by averaging the sorted
/// subset intensities of the two subtypes, then each subtype's full vector
/// is rank-normalized and mapped onto the curve by linear interpolation over
/// the subset ranks. Ranks beyond the calibrated range keep their raw offset
/// from the subset extreme instead of being extrapolated, and anything
/// non-positive after correction is replaced by the sample's background
/// estimate. Probes outside both subtypes stay NaN.
pub fn normalize(
    intensity: ArrayView2<f64>,
    background: &[f64],
    indices: &SubtypeIndices,
    selection: &SwanSelection,
) -> Result<Array2<f64>> {
    if selection.one.len() != selection.two.len() {
        return Err(MethylNormError::InvalidInput(format!(
            "subtype subsets must have equal sizes, got {} and {}",
            selection.one.len(),
            selection.two.len()
        )));
    }
    if selection.one.is_empty() {
        return Err(MethylNormError::InvalidInput(
            "subtype subsets must be non-empty".to_string(),
        ));
    }
    if background.len() != intensity.nrows() {
        return Err(MethylNormError::InvalidInput(format!(
            "expected one background estimate per sample, got {} for {} samples",
            background.len(),
            intensity.nrows()
        )));
    }
    for (subtype, positions, subset) in [
        ("I", &indices.one, &selection.one),
        ("II", &indices.two, &selection.two),
    ] {
        if let Some(&bad) = positions.iter().find(|&&c| c >= intensity.ncols()) {
            return Err(MethylNormError::InvalidInput(format!(
                "subtype {} probe index {} out of bounds for {} probes",
                subtype,
                bad,
                intensity.ncols()
            )));
        }
        if let Some(&bad) = subset.iter().find(|&&j| j >= positions.len()) {
            return Err(MethylNormError::InvalidInput(format!(
                "subtype {} subset position {} out of bounds for {} probes",
                subtype,
                bad,
                positions.len()
            )));
        }
    }

    let subset_cols_one: Vec<usize> = selection.one.iter().map(|&j| indices.one[j]).collect();
    let subset_cols_two: Vec<usize> = selection.two.iter().map(|&j| indices.two[j]).collect();

    debug!(
        "swan: {} samples, {}+{} probes, subset size {}",
        intensity.nrows(),
        indices.one.len(),
        indices.two.len(),
        selection.one.len()
    );

    let mut corrected = Array2::from_elem(intensity.raw_dim(), f64::NAN);
    corrected
        .axis_iter_mut(Axis(0))
        .into_par_iter()
        .zip(intensity.axis_iter(Axis(0)).into_par_iter())
        .zip(background.par_iter())
        .for_each(|((mut out_row, row), &bg)| {
            let reference = {
                let mut one: Vec<f64> = subset_cols_one.iter().map(|&c| row[c]).collect();
                let mut two: Vec<f64> = subset_cols_two.iter().map(|&c| row[c]).collect();
                one.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Equal));
                two.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Equal));
                one.iter()
                    .zip(&two)
                    .map(|(a, b)| (a + b) / 2.0)
                    .collect::<Vec<f64>>()
            };

            for (positions, subset) in [
                (&indices.one, &selection.one),
                (&indices.two, &selection.two),
            ] {
                let current: Vec<f64> = positions.iter().map(|&c| row[c]).collect();
                let n = current.len() as f64;
                let ranks: Vec<f64> = rankdata(&current)
                    .iter()
                    .map(|r| r / n)
                    .collect();

                let mut grid: Vec<f64> = subset.iter().map(|&j| ranks[j]).collect();
                grid.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Equal));
                let (grid_lo, grid_hi) = (grid[0], grid[grid.len() - 1]);

                let (subset_lo, subset_hi) = subset
                    .iter()
                    .map(|&j| current[j])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    });

                let mut mapped = interp(&ranks, &grid, &reference);
                for (position, value) in mapped.iter_mut().enumerate() {
                    if ranks[position] > grid_hi {
                        *value += current[position] - subset_hi;
                    }
                    else if ranks[position] < grid_lo {
                        *value += current[position] - subset_lo;
                    }
                    if *value <= 0.0 {
                        *value = bg;
                    }
                }

                for (&col, value) in positions.iter().zip(mapped) {
                    out_row[col] = value;
                }
            }
        });

    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;
    use ndarray::arr2;

    use super::*;

    fn indices() -> SubtypeIndices {
        SubtypeIndices {
            one: vec![0, 1, 2, 3],
            two: vec![4, 5, 6, 7],
        }
    }

    #[test]
    fn test_select_subsets_deterministic() {
        let a = select_subsets(1000, 800, None, 42).unwrap();
        let b = select_subsets(1000, 800, None, 42).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.one.len(), 800);
        assert_eq!(a.two.len(), 800);

        let c = select_subsets(1000, 800, None, 43).unwrap();
        assert_ne!(a, c);

        let capped = select_subsets(1000, 800, Some(100), 42).unwrap();
        assert_eq!(capped.one.len(), 100);
        assert_eq!(capped.two.len(), 100);

        assert!(select_subsets(0, 800, None, 42).is_err());
    }

    #[test]
    fn test_mismatched_subset_sizes_rejected() {
        let intensity = arr2(&[[1.0; 8]]);
        let selection = SwanSelection {
            one: vec![0, 1],
            two: vec![0],
        };
        let err = normalize(intensity.view(), &[1.0], &indices(), &selection).unwrap_err();
        assert!(matches!(err, MethylNormError::InvalidInput(_)));
    }

    #[test]
    fn test_edge_extension_beyond_subset_range() {
        // Subsets cover the middle ranks only; the extremes keep their raw
        // offset from the subset boundary values
        let intensity = arr2(&[[10.0, 20.0, 30.0, 40.0, 15.0, 25.0, 35.0, 45.0]]);
        let selection = SwanSelection {
            one: vec![1, 2],
            two: vec![1, 2],
        };
        let out = normalize(intensity.view(), &[1.0], &indices(), &selection).unwrap();

        // Reference curve: (sort[20, 30] + sort[25, 35]) / 2 = [22.5, 32.5]
        let expected = [12.5, 22.5, 32.5, 42.5, 12.5, 22.5, 32.5, 42.5];
        for (col, &value) in expected.iter().enumerate() {
            assert_approx_eq!(out[[0, col]], value, 1e-12);
        }
    }

    #[test]
    fn test_idempotent_on_aligned_data() {
        let intensity = arr2(&[
            [100.0, 220.0, 310.0, 455.0, 130.0, 205.0, 380.0, 490.0],
            [90.0, 180.0, 320.0, 410.0, 140.0, 260.0, 300.0, 480.0],
        ]);
        let selection = SwanSelection {
            one: vec![0, 1, 2, 3],
            two: vec![0, 1, 2, 3],
        };
        let background = [50.0, 50.0];

        let first = normalize(intensity.view(), &background, &indices(), &selection).unwrap();
        let second = normalize(first.view(), &background, &indices(), &selection).unwrap();

        for (a, b) in first.iter().zip(second.iter()) {
            assert_approx_eq!(a, b, 1e-9);
        }
    }

    #[test]
    fn test_non_positive_corrected_values_take_background() {
        let intensity = arr2(&[[-5.0, -4.0, -3.0, -2.0, -8.0, -6.0, -4.5, -1.0]]);
        let selection = SwanSelection {
            one: vec![0, 1, 2, 3],
            two: vec![0, 1, 2, 3],
        };
        let out = normalize(intensity.view(), &[7.5], &indices(), &selection).unwrap();
        for &col in indices().one.iter().chain(indices().two.iter()) {
            assert_approx_eq!(out[[0, col]], 7.5);
        }
    }

    #[test]
    fn test_probes_outside_subtypes_stay_nan() {
        let intensity = arr2(&[[10.0, 20.0, 30.0, 40.0, 15.0, 25.0, 35.0, 45.0, 999.0]]);
        let partition = SubtypeIndices {
            one: vec![0, 1, 2, 3],
            two: vec![4, 5, 6, 7],
        };
        let selection = SwanSelection {
            one: vec![0, 1, 2, 3],
            two: vec![0, 1, 2, 3],
        };
        let out = normalize(intensity.view(), &[1.0], &partition, &selection).unwrap();
        assert!(out[[0, 8]].is_nan());
        assert!(!out[[0, 0]].is_nan());
    }

    #[test]
    fn test_equalizes_subtype_distributions() {
        // With full-population subsets both subtypes end up on the shared
        // reference curve, so their sorted values coincide
        let intensity = arr2(&[[100.0, 400.0, 200.0, 300.0, 55.0, 350.0, 150.0, 250.0]]);
        let selection = SwanSelection {
            one: vec![0, 1, 2, 3],
            two: vec![0, 1, 2, 3],
        };
        let out = normalize(intensity.view(), &[1.0], &indices(), &selection).unwrap();

        let mut one: Vec<f64> = indices().one.iter().map(|&c| out[[0, c]]).collect();
        let mut two: Vec<f64> = indices().two.iter().map(|&c| out[[0, c]]).collect();
        one.sort_by(|a, b| a.partial_cmp(b).unwrap());
        two.sort_by(|a, b| a.partial_cmp(b).unwrap());
        for (a, b) in one.iter().zip(&two) {
            assert_approx_eq!(a, b, 1e-12);
        }
    }
}
