//! ndarray-backed storage adapter.
//!
//! Elementwise arithmetic and matrix multiplication map onto native `ndarray`
//! routines. The engine carries no factorizations of its own, so the
//! decomposition primitives for this backend live here as dense kernels
//! (partial-pivot LU, Householder QR, Cholesky-Banachiewicz) operating on a
//! defensive copy of the storage. The pseudo-inverse is not provided; per the
//! contract the adapter reports it as unsupported rather than approximating.

use ndarray::{s, Array2, Zip};

use super::Engine;
use crate::error::{MatrixError, Result};

/// Flat index order for this adapter is row-major, matching ndarray's
/// standard layout.
#[derive(Debug, Clone)]
pub(crate) struct NdDense(pub(crate) Array2<f64>);

impl Engine for NdDense {
    fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        NdDense(Array2::from_shape_fn((rows, cols), |(i, j)| f(i, j)))
    }

    fn from_row_major(rows: usize, cols: usize, data: &[f64]) -> Self {
        NdDense(Array2::from_shape_fn((rows, cols), |(i, j)| {
            data[i * cols + j]
        }))
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
        let cols = self.0.ncols();
        if cols == 0 || index >= self.0.len() {
            return None;
        }
        self.get(index / cols, index % cols)
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
        let cols = self.0.ncols();
        if cols == 0 || index >= self.0.len() {
            return false;
        }
        self.set(index / cols, index % cols, value)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        NdDense(self.0.mapv(&f))
    }

    fn add(&self, other: &Self) -> Self {
        NdDense(&self.0 + &other.0)
    }

    fn sub(&self, other: &Self) -> Self {
        NdDense(&self.0 - &other.0)
    }

    fn elem_mul(&self, other: &Self) -> Self {
        NdDense(&self.0 * &other.0)
    }

    fn elem_div(&self, other: &Self) -> Self {
        NdDense(&self.0 / &other.0)
    }

    fn rem_elem(&self, other: &Self) -> Self {
        NdDense(Zip::from(&self.0).and(&other.0).map_collect(|&a, &b| a % b))
    }

    fn matmul(&self, other: &Self) -> Self {
        NdDense(self.0.dot(&other.0))
    }

    fn transpose(&self) -> Self {
        NdDense(Array2::from_shape_fn(
            (self.0.ncols(), self.0.nrows()),
            |(i, j)| self.0[[j, i]],
        ))
    }

    fn sum(&self) -> f64 {
        self.0.sum()
    }

    fn min(&self) -> f64 {
        self.0.iter().copied().fold(f64::INFINITY, f64::min)
    }

    fn max(&self) -> f64 {
        self.0.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn mean(&self) -> f64 {
        self.0.mean().unwrap_or(f64::NAN)
    }

    fn trace(&self) -> f64 {
        self.0.diag().sum()
    }

    fn diag(&self) -> Self {
        let n = self.0.nrows().min(self.0.ncols());
        NdDense(Array2::from_shape_fn((n, 1), |(i, _)| self.0[[i, i]]))
    }

    fn norm_f(&self) -> f64 {
        self.0.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    fn norm_ind_p1(&self) -> f64 {
        let mut worst = 0.0f64;
        for col in self.0.columns() {
            let total: f64 = col.iter().map(|v| v.abs()).sum();
            worst = worst.max(total);
        }
        worst
    }

    fn det(&self) -> f64 {
        let (_, lu, sign) = lu_factor(&self.0);
        let mut det = sign;
        for i in 0..lu.nrows() {
            det *= lu[[i, i]];
        }
        det
    }

    fn inv(&self) -> Result<Self> {
        let eye = Array2::eye(self.0.nrows());
        lu_solve(&self.0, &eye)
            .map(NdDense)
            .map_err(|_| MatrixError::DecompositionFailed("matrix is not invertible".into()))
    }

    fn pinv(&self) -> Result<Self> {
        Err(MatrixError::UnsupportedOperation(
            "pseudo-inverse is not available on the ndarray backend",
        ))
    }

    fn solve(&self, rhs: &Self) -> Result<Self> {
        lu_solve(&self.0, &rhs.0).map(NdDense)
    }

    fn chol(&self) -> Result<Self> {
        cholesky_upper(&self.0).map(NdDense)
    }

    fn lu(&self) -> Result<(Self, Self, Self)> {
        let n = self.0.nrows();
        let (perm, lu, _) = lu_factor(&self.0);
        let mut p = Array2::zeros((n, n));
        for (i, &src) in perm.iter().enumerate() {
            p[[i, src]] = 1.0;
        }
        let mut l = Array2::eye(n);
        let mut u = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                if i > j {
                    l[[i, j]] = lu[[i, j]];
                } else {
                    u[[i, j]] = lu[[i, j]];
                }
            }
        }
        Ok((NdDense(p), NdDense(l), NdDense(u)))
    }

    fn qr(&self) -> Result<(Self, Self)> {
        let (q, r) = householder_qr(&self.0);
        Ok((NdDense(q), NdDense(r)))
    }
}

/// Partial-pivot LU of a square matrix. Returns the row permutation (row `i`
/// of the factored matrix is row `perm[i]` of the input), the combined factor
/// with L strictly below the diagonal, and the permutation sign.
fn lu_factor(a: &Array2<f64>) -> (Vec<usize>, Array2<f64>, f64) {
    let n = a.nrows();
    let mut lu = a.clone();
    let mut perm: Vec<usize> = (0..n).collect();
    let mut sign = 1.0;

    for k in 0..n {
        let mut pivot_row = k;
        for i in k + 1..n {
            if lu[[i, k]].abs() > lu[[pivot_row, k]].abs() {
                pivot_row = i;
            }
        }
        if pivot_row != k {
            for j in 0..n {
                let tmp = lu[[k, j]];
                lu[[k, j]] = lu[[pivot_row, j]];
                lu[[pivot_row, j]] = tmp;
            }
            perm.swap(k, pivot_row);
            sign = -sign;
        }
        let pivot = lu[[k, k]];
        if pivot == 0.0 {
            continue;
        }
        for i in k + 1..n {
            let factor = lu[[i, k]] / pivot;
            lu[[i, k]] = factor;
            for j in k + 1..n {
                lu[[i, j]] -= factor * lu[[k, j]];
            }
        }
    }

    (perm, lu, sign)
}

/// Solves `A x = B` for square `A` through the LU factor, one RHS column at a
/// time.
fn lu_solve(a: &Array2<f64>, b: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let (perm, lu, _) = lu_factor(a);
    for i in 0..n {
        if lu[[i, i]] == 0.0 {
            return Err(MatrixError::DecompositionFailed(
                "system is singular".into(),
            ));
        }
    }

    let k = b.ncols();
    let mut x = Array2::zeros((n, k));
    for col in 0..k {
        // Forward substitution against unit-lower L on the permuted RHS.
        let mut y = vec![0.0f64; n];
        for i in 0..n {
            let mut acc = b[[perm[i], col]];
            for j in 0..i {
                acc -= lu[[i, j]] * y[j];
            }
            y[i] = acc;
        }
        // Back substitution against U.
        for i in (0..n).rev() {
            let mut acc = y[i];
            for j in i + 1..n {
                acc -= lu[[i, j]] * x[[j, col]];
            }
            x[[i, col]] = acc / lu[[i, i]];
        }
    }
    Ok(x)
}

/// Cholesky-Banachiewicz factorization returning the upper factor `U` with
/// `U^T * U = A`. Fails when the matrix is not positive-definite.
fn cholesky_upper(a: &Array2<f64>) -> Result<Array2<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut acc = a[[i, j]];
            for k in 0..j {
                acc -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if acc.is_nan() || acc <= 0.0 || !acc.is_finite() {
                    return Err(MatrixError::DecompositionFailed(
                        "matrix is not positive-definite".into(),
                    ));
                }
                l[[i, j]] = acc.sqrt();
            } else {
                l[[i, j]] = acc / l[[j, j]];
            }
        }
    }

    Ok(Array2::from_shape_fn((n, n), |(i, j)| l[[j, i]]))
}

/// Thin Householder QR of an `m x n` matrix: `m x min(m, n)` Q and
/// `min(m, n) x n` R, the same factor shapes the nalgebra adapter yields.
fn householder_qr(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    let (m, n) = (a.nrows(), a.ncols());
    let mut r = a.clone();
    let mut q = Array2::eye(m);

    let steps = if m > 1 { n.min(m - 1) } else { 0 };
    for k in 0..steps {
        let norm_x: f64 = (k..m).map(|i| r[[i, k]] * r[[i, k]]).sum::<f64>().sqrt();
        if norm_x == 0.0 {
            continue;
        }
        let alpha = if r[[k, k]] >= 0.0 { -norm_x } else { norm_x };
        let mut v = vec![0.0f64; m];
        v[k] = r[[k, k]] - alpha;
        for i in k + 1..m {
            v[i] = r[[i, k]];
        }
        let vnorm2: f64 = v[k..].iter().map(|x| x * x).sum();
        if vnorm2 == 0.0 {
            continue;
        }

        // r <- H r with H = I - 2 v v^T / (v^T v)
        for j in 0..n {
            let dot: f64 = (k..m).map(|i| v[i] * r[[i, j]]).sum();
            let scale = 2.0 * dot / vnorm2;
            for i in k..m {
                r[[i, j]] -= scale * v[i];
            }
        }
        // q <- q H, accumulating Q = H_1 ... H_s
        for i in 0..m {
            let dot: f64 = (k..m).map(|j| q[[i, j]] * v[j]).sum();
            let scale = 2.0 * dot / vnorm2;
            for j in k..m {
                q[[i, j]] -= scale * v[j];
            }
        }
    }

    let k = m.min(n);
    let q = q.slice(s![.., ..k]).to_owned();
    let mut r = r.slice(s![..k, ..]).to_owned();
    // Zero out the round-off below the diagonal so R is cleanly triangular.
    for j in 0..n {
        for i in j + 1..k {
            r[[i, j]] = 0.0;
        }
    }

    (q, r)
}
