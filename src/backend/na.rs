//! nalgebra-backed storage adapter.
//!
//! This is the full-featured engine: every decomposition in the contract maps
//! onto a native `nalgebra` routine. nalgebra's factorizations consume the
//! matrix they factor, so each decomposition works on a defensive clone and
//! the original storage stays observably unchanged.

use nalgebra::DMatrix;

use super::Engine;
use crate::error::{MatrixError, Result};

/// Flat index order for this adapter is column-major, matching nalgebra's
/// native linear indexing.
#[derive(Debug, Clone)]
pub(crate) struct NaDense(pub(crate) DMatrix<f64>);

impl Engine for NaDense {
    fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        NaDense(DMatrix::from_fn(rows, cols, f))
    }

    fn from_row_major(rows: usize, cols: usize, data: &[f64]) -> Self {
        NaDense(DMatrix::from_row_slice(rows, cols, data))
    }

    fn rows(&self) -> usize {
        self.0.nrows()
    }

    fn cols(&self) -> usize {
        self.0.ncols()
    }

    fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.0.get((row, col)).copied()
    }

    fn get_flat(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.0.get_mut((row, col)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn set_flat(&mut self, index: usize, value: f64) -> bool {
        match self.0.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        NaDense(self.0.map(f))
    }

    fn add(&self, other: &Self) -> Self {
        NaDense(&self.0 + &other.0)
    }

    fn sub(&self, other: &Self) -> Self {
        NaDense(&self.0 - &other.0)
    }

    fn elem_mul(&self, other: &Self) -> Self {
        NaDense(self.0.component_mul(&other.0))
    }

    fn elem_div(&self, other: &Self) -> Self {
        NaDense(self.0.component_div(&other.0))
    }

    fn rem_elem(&self, other: &Self) -> Self {
        NaDense(self.0.zip_map(&other.0, |a, b| a % b))
    }

    fn matmul(&self, other: &Self) -> Self {
        NaDense(&self.0 * &other.0)
    }

    fn transpose(&self) -> Self {
        NaDense(self.0.transpose())
    }

    fn sum(&self) -> f64 {
        self.0.sum()
    }

    fn min(&self) -> f64 {
        self.0.min()
    }

    fn max(&self) -> f64 {
        self.0.max()
    }

    fn mean(&self) -> f64 {
        self.0.mean()
    }

    fn trace(&self) -> f64 {
        self.0.trace()
    }

    fn diag(&self) -> Self {
        let n = self.0.nrows().min(self.0.ncols());
        NaDense(DMatrix::from_fn(n, 1, |i, _| self.0[(i, i)]))
    }

    fn norm_f(&self) -> f64 {
        self.0.norm()
    }

    fn norm_ind_p1(&self) -> f64 {
        let mut worst = 0.0f64;
        for col in self.0.column_iter() {
            let total: f64 = col.iter().map(|v| v.abs()).sum();
            worst = worst.max(total);
        }
        worst
    }

    fn det(&self) -> f64 {
        self.0.determinant()
    }

    fn inv(&self) -> Result<Self> {
        self.0
            .clone()
            .try_inverse()
            .map(NaDense)
            .ok_or_else(|| MatrixError::DecompositionFailed("matrix is not invertible".into()))
    }

    fn pinv(&self) -> Result<Self> {
        self.0
            .clone()
            .pseudo_inverse(f64::EPSILON)
            .map(NaDense)
            .map_err(|e| MatrixError::DecompositionFailed(e.to_string()))
    }

    fn solve(&self, rhs: &Self) -> Result<Self> {
        self.0
            .clone()
            .lu()
            .solve(&rhs.0)
            .map(NaDense)
            .ok_or_else(|| MatrixError::DecompositionFailed("system is singular".into()))
    }

    fn chol(&self) -> Result<Self> {
        match self.0.clone().cholesky() {
            // The contract hands back the upper factor U with U^T * U = A.
            Some(chol) => Ok(NaDense(chol.l().transpose())),
            None => Err(MatrixError::DecompositionFailed(
                "matrix is not positive-definite".into(),
            )),
        }
    }

    fn lu(&self) -> Result<(Self, Self, Self)> {
        let n = self.0.nrows();
        let (p, l, u) = self.0.clone().lu().unpack();
        let mut perm = DMatrix::<f64>::identity(n, n);
        p.permute_rows(&mut perm);
        Ok((NaDense(perm), NaDense(l), NaDense(u)))
    }

    fn qr(&self) -> Result<(Self, Self)> {
        let qr = self.0.clone().qr();
        Ok((NaDense(qr.q()), NaDense(qr.r())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> NaDense {
        NaDense::from_row_major(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
    }

    #[test]
    fn flat_order_is_column_major() {
        let m = sample();
        assert_eq!(m.get_flat(0), Some(1.0));
        assert_eq!(m.get_flat(1), Some(4.0));
        assert_eq!(m.get_flat(2), Some(2.0));
        assert_eq!(m.get_flat(6), None);
    }

    #[test]
    fn induced_one_norm_is_max_column_abs_sum() {
        let m = NaDense::from_row_major(2, 2, &[1.0, -7.0, -2.0, 3.0]);
        assert_relative_eq!(m.norm_ind_p1(), 10.0);
    }

    #[test]
    fn decomposition_leaves_input_unchanged() {
        let m = NaDense::from_row_major(2, 2, &[4.0, 2.0, 2.0, 5.0]);
        let before = m.0.clone();
        let _ = m.chol().unwrap();
        let _ = m.lu().unwrap();
        assert_eq!(m.0, before);
    }

    #[test]
    fn chol_returns_upper_factor() {
        let m = NaDense::from_row_major(2, 2, &[4.0, 2.0, 2.0, 5.0]);
        let u = m.chol().unwrap();
        // Strictly-lower part of the upper factor is zero.
        assert_eq!(u.0[(1, 0)], 0.0);
        let rebuilt = u.transpose().matmul(&u);
        assert_relative_eq!(rebuilt.0[(0, 0)], 4.0, epsilon = 1e-12);
        assert_relative_eq!(rebuilt.0[(0, 1)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(rebuilt.0[(1, 1)], 5.0, epsilon = 1e-12);
    }
}
