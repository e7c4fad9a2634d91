//! Z-score standardization measured on training data.
//!
//! Stats are fit once on the training partition and then applied unchanged to
//! training, test and query data, so nothing about held-out rows leaks into
//! the transform.
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use serde::{Deserialize, Serialize};

/// Per-column mean and population standard deviation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardizationStats {
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
}

impl StandardizationStats {
    pub fn columns(&self) -> usize {
        self.means.len()
    }
}

/// Column means of `x`.
pub fn column_means(x: &Matrix) -> Result<Vec<f64>> {
    if x.is_empty() {
        return Err(Error::EmptyDataset("cannot compute column means of zero rows"));
    }
    let n = x.rows() as f64;
    let mut sums = vec![0.0; x.cols()];
    for row in x.iter_rows() {
        for (s, &v) in sums.iter_mut().zip(row) {
            *s += v;
        }
    }
    Ok(sums.into_iter().map(|s| s / n).collect())
}

/// Fit means and population standard deviations (divisor `n`).
///
/// Fails with [`Error::DegenerateColumn`] if any column is constant, including
/// columns whose std is only rounding noise left over from the mean.
pub fn fit(x: &Matrix) -> Result<StandardizationStats> {
    let means = column_means(x)?;
    let n = x.rows() as f64;
    let mut sq = vec![0.0; x.cols()];
    let mut lo = vec![f64::INFINITY; x.cols()];
    let mut hi = vec![f64::NEG_INFINITY; x.cols()];
    for row in x.iter_rows() {
        for (c, (&v, &m)) in row.iter().zip(&means).enumerate() {
            sq[c] += (v - m).powi(2);
            lo[c] = lo[c].min(v);
            hi[c] = hi[c].max(v);
        }
    }
    let stds: Vec<f64> = sq.into_iter().map(|s| (s / n).sqrt()).collect();
    for (column, &std) in stds.iter().enumerate() {
        let noise = NOISE_ULPS * f64::EPSILON * means[column].abs().max(1.0);
        if lo[column] == hi[column] || !std.is_finite() || std <= noise {
            return Err(Error::DegenerateColumn { column });
        }
    }
    Ok(StandardizationStats { means, stds })
}

/// A std within this many ulps of the column's magnitude is treated as zero.
const NOISE_ULPS: f64 = 8.0;

/// `(x - mean) / std` per column, optionally behind a leading bias column of 1.0.
pub fn transform(x: &Matrix, stats: &StandardizationStats, add_bias: bool) -> Result<Matrix> {
    check_columns("transform", x, stats)?;
    let scaled = x.map_columns(|c, v| (v - stats.means[c]) / stats.stds[c]);
    Ok(if add_bias { scaled.prepend_ones() } else { scaled })
}

/// `y * std + mean` per column.
pub fn inverse_transform(y: &Matrix, stats: &StandardizationStats) -> Result<Matrix> {
    check_columns("inverse_transform", y, stats)?;
    Ok(y.map_columns(|c, v| v * stats.stds[c] + stats.means[c]))
}

/// Shapes must agree and every std must be usable as a divisor; stats built by
/// hand or deserialized get the same check `fit` applies.
fn check_columns(op: &'static str, x: &Matrix, stats: &StandardizationStats) -> Result<()> {
    if x.cols() != stats.columns() || stats.stds.len() != stats.columns() {
        return Err(Error::mismatch(op, x.shape(), (stats.means.len(), stats.stds.len())));
    }
    if let Some(column) = stats.stds.iter().position(|&s| s == 0.0 || !s.is_finite()) {
        return Err(Error::DegenerateColumn { column });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn sample() -> Matrix {
        Matrix::from_rows(vec![
            vec![1.0, 10.0, -3.0],
            vec![2.0, 30.0, -1.0],
            vec![4.0, 20.0, 0.5],
            vec![7.0, 60.0, 2.0],
        ])
        .unwrap()
    }

    #[test]
    fn uses_population_std() {
        let x = Matrix::column_vector(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let stats = fit(&x).unwrap();
        assert_abs_diff_eq!(stats.means[0], 5.0);
        assert_abs_diff_eq!(stats.stds[0], 2.0);
    }

    #[test]
    fn standardized_columns_have_zero_mean_unit_std() {
        let x = sample();
        let stats = fit(&x).unwrap();
        let z = transform(&x, &stats, false).unwrap();
        let again = fit(&z).unwrap();
        for c in 0..z.cols() {
            assert_abs_diff_eq!(again.means[c], 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(again.stds[c], 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn bias_column_is_prepended() {
        let x = sample();
        let stats = fit(&x).unwrap();
        let z = transform(&x, &stats, true).unwrap();
        assert_eq!(z.shape(), (4, 4));
        assert!(z.column(0).iter().all(|&v| v == 1.0));
    }

    #[test]
    fn constant_column_is_degenerate() {
        let x = Matrix::from_rows(vec![vec![1.0, 3.0], vec![2.0, 3.0]]).unwrap();
        match fit(&x) {
            Err(Error::DegenerateColumn { column }) => assert_eq!(column, 1),
            other => panic!("expected DegenerateColumn, got {other:?}"),
        }
    }

    #[test]
    fn constant_column_with_rounding_noise_is_degenerate() {
        for (value, n) in [(0.1, 3), (0.7, 7), (1e6 + 0.1, 5)] {
            let x = Matrix::column_vector(&vec![value; n]);
            assert!(
                matches!(fit(&x), Err(Error::DegenerateColumn { column: 0 })),
                "[{value}; {n}] should be degenerate"
            );
        }
        // small but genuine spread still fits
        let tiny = Matrix::column_vector(&[1e-6, 2e-6, 3e-6]);
        assert!(fit(&tiny).is_ok());
    }

    #[test]
    fn hand_built_stats_with_unusable_std_are_rejected() {
        let x = Matrix::column_vector(&[1.0, 0.0]);
        for std in [0.0, f64::NAN, f64::INFINITY] {
            let stats = StandardizationStats {
                means: vec![0.0, 0.0],
                stds: vec![1.0, std],
            };
            let wide = Matrix::from_rows(vec![vec![1.0, 1.0], vec![0.0, 0.0]]).unwrap();
            assert!(matches!(
                transform(&wide, &stats, false),
                Err(Error::DegenerateColumn { column: 1 })
            ));
            assert!(matches!(
                inverse_transform(&wide, &stats),
                Err(Error::DegenerateColumn { column: 1 })
            ));
        }
        let zero = StandardizationStats {
            means: vec![0.0],
            stds: vec![0.0],
        };
        assert!(matches!(transform(&x, &zero, false), Err(Error::DegenerateColumn { column: 0 })));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(fit(&Matrix::zeros(0, 3)), Err(Error::EmptyDataset(_))));
    }

    #[test]
    fn column_count_must_match_stats() {
        let stats = fit(&sample()).unwrap();
        let narrow = Matrix::zeros(2, 2);
        assert!(matches!(
            transform(&narrow, &stats, true),
            Err(Error::DimensionMismatch { .. })
        ));
        assert!(inverse_transform(&narrow, &stats).is_err());
    }

    proptest! {
        #[test]
        fn inverse_undoes_transform(
            data in prop::collection::vec(-1e3f64..1e3, 12),
            means in prop::collection::vec(-50.0f64..50.0, 3),
            stds in prop::collection::vec(0.01f64..100.0, 3),
        ) {
            let x = Matrix::from_vec(4, 3, data).unwrap();
            let stats = StandardizationStats { means, stds };
            let back = inverse_transform(&transform(&x, &stats, false).unwrap(), &stats).unwrap();
            for (a, b) in back.as_slice().iter().zip(x.as_slice()) {
                prop_assert!((a - b).abs() <= 1e-9 * (1.0 + b.abs()));
            }
        }
    }
}
