use std::cmp::Ordering::Equal;

use num::{Float, NumCast};

pub(crate) fn to_num<T: num::ToPrimitive, N: NumCast>(value: T) -> N {
    N::from(value).unwrap()
}

/// Median via quickselect, modifying the slice. Even lengths average the two
/// middle order statistics.
pub(crate) fn median_inplace<N: Float>(vals: &mut [N]) -> N {
    let n = vals.len();
    if n == 0 {
        return N::nan();
    }
    let mid = n / 2;
    vals.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(Equal));
    let upper = vals[mid];
    if n % 2 == 1 {
        upper
    }
    else {
        let lower = vals[..mid]
            .iter()
            .cloned()
            .fold(N::neg_infinity(), N::max);
        (lower + upper) / to_num(2)
    }
}

/// One-based ranks with ties resolved to their average rank.
pub fn rankdata(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Equal));

    let mut ranks = vec![0.0; n];
    let mut start = 0;
    while start < n {
        let mut stop = start;
        while stop + 1 < n && values[order[stop + 1]] == values[order[start]] {
            stop += 1;
        }
        // Ranks are 1-based, so a tie run over positions start..=stop
        // averages to (start + stop + 2) / 2
        let rank = (start + stop + 2) as f64 / 2.0;
        for &idx in &order[start..=stop] {
            ranks[idx] = rank;
        }
        start = stop + 1;
    }
    ranks
}

/// Piecewise-linear interpolation over a sorted grid `xp` -> `fp`. Query
/// points outside the grid clamp to the boundary values, they are never
/// extrapolated.
pub fn interp(x: &[f64], xp: &[f64], fp: &[f64]) -> Vec<f64> {
    assert!(!xp.is_empty(), "interpolation grid must be non-empty");
    assert_eq!(xp.len(), fp.len(), "grid and value lengths must match");

    let last = xp.len() - 1;
    x.iter()
        .map(|&xi| {
            if xi <= xp[0] {
                return fp[0];
            }
            if xi >= xp[last] {
                return fp[last];
            }
            let j = xp.partition_point(|&v| v < xi);
            if xp[j] == xi {
                return fp[j];
            }
            let slope = (fp[j] - fp[j - 1]) / (xp[j] - xp[j - 1]);
            fp[j - 1] + slope * (xi - xp[j - 1])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    #[test]
    fn test_median_odd_even() {
        let mut odd = [3.0, 1.0, 2.0];
        assert_approx_eq!(median_inplace(&mut odd), 2.0);

        let mut even = [4.0, 1.0, 3.0, 2.0];
        assert_approx_eq!(median_inplace(&mut even), 2.5);

        let mut single = [7.5];
        assert_approx_eq!(median_inplace(&mut single), 7.5);
    }

    #[test]
    fn test_rankdata_no_ties() {
        let ranks = rankdata(&[10.0, 30.0, 20.0]);
        assert_eq!(ranks, vec![1.0, 3.0, 2.0]);
    }

    #[test]
    fn test_rankdata_average_ties() {
        // Two-way tie occupies ranks 2 and 3, averaging to 2.5
        let ranks = rankdata(&[1.0, 2.0, 2.0, 3.0]);
        assert_eq!(ranks, vec![1.0, 2.5, 2.5, 4.0]);

        let ranks = rankdata(&[5.0, 5.0, 5.0]);
        assert_eq!(ranks, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_interp_inside_grid() {
        let xp = [0.0, 1.0, 2.0];
        let fp = [0.0, 10.0, 40.0];
        let out = interp(&[0.5, 1.0, 1.5], &xp, &fp);
        assert_approx_eq!(out[0], 5.0);
        assert_approx_eq!(out[1], 10.0);
        assert_approx_eq!(out[2], 25.0);
    }

    #[test]
    fn test_interp_clamps_outside_grid() {
        let xp = [1.0, 2.0];
        let fp = [10.0, 20.0];
        let out = interp(&[0.0, 3.0], &xp, &fp);
        assert_approx_eq!(out[0], 10.0);
        assert_approx_eq!(out[1], 20.0);
    }

    #[test]
    fn test_interp_duplicate_grid_points() {
        let xp = [0.0, 1.0, 1.0, 2.0];
        let fp = [0.0, 5.0, 7.0, 10.0];
        let out = interp(&[1.0], &xp, &fp);
        assert_approx_eq!(out[0], 5.0);
    }
}
