//! The uniform dense-matrix facade.
//!
//! [`Matrix`] is the one type callers program against, regardless of which
//! engine holds the data. Storage is a closed tagged variant over the two
//! backends; every binary operation matches exhaustively on the operand pair
//! and refuses mixed-backend pairs, so adding an engine means extending the
//! variant set rather than sprinkling dynamic type inspection around.
//!
//! Accessors read and write `f64` only. There are no integer or
//! single-precision accessor variants, so a narrowing conversion has to be
//! written explicitly at the call site instead of failing at runtime.

use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::backend::na::NaDense;
use crate::backend::nd::NdDense;
use crate::backend::Engine;
use crate::error::{MatrixError, Result};
use crate::factory::Backend;

/// Engine-native storage, tagged by backend identity.
#[derive(Debug, Clone)]
pub(crate) enum Storage {
    Na(NaDense),
    Nd(NdDense),
}

/// A dense, mutable, rectangular matrix of `f64` elements.
///
/// The shape is fixed for the lifetime of the storage; operations that change
/// shape allocate new storage. Flat index order is backend-defined
/// (column-major on the nalgebra backend, row-major on the ndarray backend)
/// but always self-consistent between `get_flat`, iteration, and the byte
/// codec.
#[derive(Debug, Clone)]
pub struct Matrix {
    pub(crate) storage: Storage,
}

macro_rules! with_backend {
    ($m:expr, |$s:ident| $body:expr) => {
        match &$m.storage {
            Storage::Na($s) => $body,
            Storage::Nd($s) => $body,
        }
    };
}

macro_rules! with_backend_mut {
    ($m:expr, |$s:ident| $body:expr) => {
        match &mut $m.storage {
            Storage::Na($s) => $body,
            Storage::Nd($s) => $body,
        }
    };
}

macro_rules! per_backend {
    ($m:expr, |$s:ident| $body:expr) => {
        match &$m.storage {
            Storage::Na($s) => Storage::Na($body),
            Storage::Nd($s) => Storage::Nd($body),
        }
    };
}

macro_rules! same_backend {
    ($a:expr, $b:expr, |$x:ident, $y:ident| $body:expr) => {
        match (&$a.storage, &$b.storage) {
            (Storage::Na($x), Storage::Na($y)) => Ok(Storage::Na($body)),
            (Storage::Nd($x), Storage::Nd($y)) => Ok(Storage::Nd($body)),
            _ => Err(MatrixError::UnsupportedBackendMix),
        }
    };
}

impl Matrix {
    pub(crate) fn from_storage(storage: Storage) -> Self {
        Matrix { storage }
    }

    /// The factory singleton this matrix came from. Derived matrices built
    /// through it stay on the same backend.
    pub fn backend(&self) -> Backend {
        match &self.storage {
            Storage::Na(_) => Backend::Nalgebra,
            Storage::Nd(_) => Backend::Ndarray,
        }
    }

    pub fn nrows(&self) -> usize {
        with_backend!(self, |s| s.rows())
    }

    pub fn ncols(&self) -> usize {
        with_backend!(self, |s| s.cols())
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    /// Number of elements; bounds the flat index space.
    pub fn element_count(&self) -> usize {
        self.nrows() * self.ncols()
    }

    /// Borrows the raw nalgebra storage, if this matrix lives on that
    /// backend.
    pub fn as_dmatrix(&self) -> Option<&DMatrix<f64>> {
        match &self.storage {
            Storage::Na(s) => Some(&s.0),
            Storage::Nd(_) => None,
        }
    }

    /// Borrows the raw ndarray storage, if this matrix lives on that backend.
    pub fn as_array2(&self) -> Option<&Array2<f64>> {
        match &self.storage {
            Storage::Nd(s) => Some(&s.0),
            Storage::Na(_) => None,
        }
    }

    // ---- element access -------------------------------------------------

    pub fn get(&self, row: usize, col: usize) -> Result<f64> {
        with_backend!(self, |s| s.get(row, col))
            .ok_or_else(|| MatrixError::out_of_range(row, col, self.nrows(), self.ncols()))
    }

    /// Element at a flat index, in this backend's flat order.
    pub fn get_flat(&self, index: usize) -> Result<f64> {
        with_backend!(self, |s| s.get_flat(index))
            .ok_or_else(|| MatrixError::out_of_range_flat(index, self.nrows(), self.ncols()))
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<()> {
        let (rows, cols) = (self.nrows(), self.ncols());
        if with_backend_mut!(self, |s| s.set(row, col, value)) {
            Ok(())
        } else {
            Err(MatrixError::out_of_range(row, col, rows, cols))
        }
    }

    pub fn set_flat(&mut self, index: usize, value: f64) -> Result<()> {
        let (rows, cols) = (self.nrows(), self.ncols());
        if with_backend_mut!(self, |s| s.set_flat(index, value)) {
            Ok(())
        } else {
            Err(MatrixError::out_of_range_flat(index, rows, cols))
        }
    }

    /// Overwrites every element with `f(row, col)`.
    pub fn fill_with(&mut self, f: impl Fn(usize, usize) -> f64) {
        for r in 0..self.nrows() {
            for c in 0..self.ncols() {
                let v = f(r, c);
                with_backend_mut!(self, |s| s.set(r, c, v));
            }
        }
    }

    // ---- elementwise and matrix arithmetic ------------------------------

    fn check_backend(&self, other: &Matrix) -> Result<()> {
        if self.backend() == other.backend() {
            Ok(())
        } else {
            Err(MatrixError::UnsupportedBackendMix)
        }
    }

    fn check_same_shape(&self, other: &Matrix, context: &'static str) -> Result<()> {
        if self.nrows() == other.nrows() && self.ncols() == other.ncols() {
            Ok(())
        } else {
            Err(self.shape_mismatch(other, context))
        }
    }

    fn shape_mismatch(&self, other: &Matrix, context: &'static str) -> MatrixError {
        MatrixError::ShapeMismatch {
            context,
            left_rows: self.nrows(),
            left_cols: self.ncols(),
            right_rows: other.nrows(),
            right_cols: other.ncols(),
        }
    }

    fn require_square(&self, context: &'static str) -> Result<()> {
        if self.is_square() {
            Ok(())
        } else {
            Err(self.shape_mismatch(self, context))
        }
    }

    pub fn add(&self, other: &Matrix) -> Result<Matrix> {
        self.check_backend(other)?;
        self.check_same_shape(other, "elementwise add")?;
        Ok(Matrix::from_storage(same_backend!(self, other, |a, b| a
            .add(b))?))
    }

    pub fn sub(&self, other: &Matrix) -> Result<Matrix> {
        self.check_backend(other)?;
        self.check_same_shape(other, "elementwise subtract")?;
        Ok(Matrix::from_storage(same_backend!(self, other, |a, b| a
            .sub(b))?))
    }

    pub fn elem_mul(&self, other: &Matrix) -> Result<Matrix> {
        self.check_backend(other)?;
        self.check_same_shape(other, "elementwise multiply")?;
        Ok(Matrix::from_storage(same_backend!(self, other, |a, b| a
            .elem_mul(b))?))
    }

    pub fn elem_div(&self, other: &Matrix) -> Result<Matrix> {
        self.check_backend(other)?;
        self.check_same_shape(other, "elementwise divide")?;
        Ok(Matrix::from_storage(same_backend!(self, other, |a, b| a
            .elem_div(b))?))
    }

    /// Elementwise remainder, the backend analog of `mod`.
    pub fn rem(&self, other: &Matrix) -> Result<Matrix> {
        self.check_backend(other)?;
        self.check_same_shape(other, "elementwise remainder")?;
        Ok(Matrix::from_storage(same_backend!(self, other, |a, b| a
            .rem_elem(b))?))
    }

    /// Matrix product.
    pub fn matmul(&self, other: &Matrix) -> Result<Matrix> {
        self.check_backend(other)?;
        if self.ncols() != other.nrows() {
            return Err(self.shape_mismatch(other, "matrix multiply"));
        }
        Ok(Matrix::from_storage(same_backend!(self, other, |a, b| a
            .matmul(b))?))
    }

    /// Elementwise power.
    pub fn epow(&self, exponent: f64) -> Matrix {
        Matrix::from_storage(per_backend!(self, |s| s.map(|x| x.powf(exponent))))
    }

    /// Matrix power by repeated multiplication: the input is copied and
    /// multiplied `exponent - 1` times. For any `exponent <= 1` this
    /// degenerates to returning an unmultiplied copy, which mirrors the
    /// historical behavior of this contract; it is deliberate, not a bug.
    pub fn pow(&self, exponent: i32) -> Result<Matrix> {
        let mut out = self.clone();
        for _ in 1..exponent {
            out = out.matmul(self)?;
        }
        Ok(out)
    }

    pub fn transpose(&self) -> Matrix {
        Matrix::from_storage(per_backend!(self, |s| s.transpose()))
    }

    /// Short alias for [`Matrix::transpose`].
    pub fn t(&self) -> Matrix {
        self.transpose()
    }

    // ---- reductions -----------------------------------------------------

    pub fn min(&self) -> f64 {
        with_backend!(self, |s| s.min())
    }

    pub fn max(&self) -> f64 {
        with_backend!(self, |s| s.max())
    }

    pub fn mean(&self) -> f64 {
        with_backend!(self, |s| s.mean())
    }

    pub fn element_sum(&self) -> f64 {
        with_backend!(self, |s| s.sum())
    }

    pub fn trace(&self) -> Result<f64> {
        self.require_square("trace")?;
        Ok(with_backend!(self, |s| s.trace()))
    }

    /// First flat index holding the maximum; ties resolve to the lowest
    /// index. A matrix with no elements reports 0, which is outside its
    /// (empty) flat range.
    pub fn arg_max(&self) -> usize {
        let mut best = 0;
        let mut best_value = f64::NEG_INFINITY;
        for (i, v) in self.iter().enumerate() {
            if v > best_value {
                best = i;
                best_value = v;
            }
        }
        best
    }

    /// First flat index holding the minimum; ties resolve to the lowest
    /// index. A matrix with no elements reports 0, which is outside its
    /// (empty) flat range.
    pub fn arg_min(&self) -> usize {
        let mut best = 0;
        let mut best_value = f64::INFINITY;
        for (i, v) in self.iter().enumerate() {
            if v < best_value {
                best = i;
                best_value = v;
            }
        }
        best
    }

    // ---- linear algebra -------------------------------------------------

    pub fn det(&self) -> Result<f64> {
        self.require_square("determinant")?;
        Ok(with_backend!(self, |s| s.det()))
    }

    pub fn inv(&self) -> Result<Matrix> {
        self.require_square("inverse")?;
        let storage = match &self.storage {
            Storage::Na(s) => s.inv().map(Storage::Na),
            Storage::Nd(s) => s.inv().map(Storage::Nd),
        }?;
        Ok(Matrix::from_storage(storage))
    }

    /// Moore-Penrose pseudo-inverse. Not every backend provides one; the
    /// ndarray backend reports it as unsupported.
    pub fn pinv(&self) -> Result<Matrix> {
        let storage = match &self.storage {
            Storage::Na(s) => s.pinv().map(Storage::Na),
            Storage::Nd(s) => s.pinv().map(Storage::Nd),
        }?;
        Ok(Matrix::from_storage(storage))
    }

    /// Solves `self * x = b` for a square coefficient matrix and a column
    /// right-hand side, returning `x` sized `ncols x 1`.
    pub fn solve(&self, b: &Matrix) -> Result<Matrix> {
        self.check_backend(b)?;
        self.require_square("solve coefficient matrix")?;
        if b.nrows() != self.nrows() || b.ncols() != 1 {
            return Err(self.shape_mismatch(b, "solve right-hand side"));
        }
        let storage = match (&self.storage, &b.storage) {
            (Storage::Na(a), Storage::Na(rhs)) => a.solve(rhs).map(Storage::Na),
            (Storage::Nd(a), Storage::Nd(rhs)) => a.solve(rhs).map(Storage::Nd),
            _ => Err(MatrixError::UnsupportedBackendMix),
        }?;
        Ok(Matrix::from_storage(storage))
    }

    /// Cholesky factorization, returning the upper-triangular factor `U` with
    /// `U^T * U = self`. Fails with [`MatrixError::DecompositionFailed`] when
    /// the matrix is not positive-definite.
    pub fn chol(&self) -> Result<Matrix> {
        self.require_square("cholesky")?;
        let storage = match &self.storage {
            Storage::Na(s) => s.chol().map(Storage::Na),
            Storage::Nd(s) => s.chol().map(Storage::Nd),
        }?;
        Ok(Matrix::from_storage(storage))
    }

    /// LU factorization with partial pivoting of a square matrix, returning
    /// `(P, L, U)` with `P * self = L * U`. Each factor is freshly owned.
    pub fn lu(&self) -> Result<(Matrix, Matrix, Matrix)> {
        self.require_square("lu")?;
        let (p, l, u) = match &self.storage {
            Storage::Na(s) => {
                let (p, l, u) = s.lu()?;
                (Storage::Na(p), Storage::Na(l), Storage::Na(u))
            }
            Storage::Nd(s) => {
                let (p, l, u) = s.lu()?;
                (Storage::Nd(p), Storage::Nd(l), Storage::Nd(u))
            }
        };
        Ok((
            Matrix::from_storage(p),
            Matrix::from_storage(l),
            Matrix::from_storage(u),
        ))
    }

    /// Thin QR factorization, returning `(Q, R)` with `Q * R = self`, `Q`
    /// of shape `nrows x min(nrows, ncols)` with orthonormal columns, and a
    /// triangular `R` of shape `min(nrows, ncols) x ncols` on every backend.
    pub fn qr(&self) -> Result<(Matrix, Matrix)> {
        let (q, r) = match &self.storage {
            Storage::Na(s) => {
                let (q, r) = s.qr()?;
                (Storage::Na(q), Storage::Na(r))
            }
            Storage::Nd(s) => {
                let (q, r) = s.qr()?;
                (Storage::Nd(q), Storage::Nd(r))
            }
        };
        Ok((Matrix::from_storage(q), Matrix::from_storage(r)))
    }

    /// Frobenius norm; `norm()` is its alias per the contract.
    pub fn norm_f(&self) -> f64 {
        with_backend!(self, |s| s.norm_f())
    }

    pub fn norm(&self) -> f64 {
        self.norm_f()
    }

    /// Induced 1-norm (maximum absolute column sum).
    pub fn norm_ind_p1(&self) -> f64 {
        with_backend!(self, |s| s.norm_ind_p1())
    }

    /// Matrix exponential via the shared backend-independent algorithm.
    pub fn expm(&self) -> Result<Matrix> {
        crate::expm::expm(self)
    }

    // ---- structural -----------------------------------------------------

    /// Main diagonal, extracted as a fresh column vector.
    pub fn diag(&self) -> Matrix {
        Matrix::from_storage(per_backend!(self, |s| s.diag()))
    }

    /// Copy of row `row` as a `1 x ncols` matrix.
    pub fn row(&self, row: usize) -> Result<Matrix> {
        if row >= self.nrows() {
            return Err(MatrixError::IndexOutOfRange {
                index: format!("row {row}"),
                rows: self.nrows(),
                cols: self.ncols(),
            });
        }
        let cols = self.ncols();
        Ok(Matrix::from_storage(per_backend!(self, |s| s
            .like(1, cols, |_, j| s.get(row, j).unwrap_or(0.0)))))
    }

    /// Copy of column `col` as an `nrows x 1` matrix.
    pub fn col(&self, col: usize) -> Result<Matrix> {
        if col >= self.ncols() {
            return Err(MatrixError::IndexOutOfRange {
                index: format!("column {col}"),
                rows: self.nrows(),
                cols: self.ncols(),
            });
        }
        let rows = self.nrows();
        Ok(Matrix::from_storage(per_backend!(self, |s| s
            .like(rows, 1, |i, _| s.get(i, col).unwrap_or(0.0)))))
    }

    /// Overwrites row `row` with the elements of `src`, read in `src`'s flat
    /// index order. `src` may live on any backend since the copy goes through
    /// the uniform accessor contract.
    pub fn set_row(&mut self, row: usize, src: &Matrix) -> Result<()> {
        if src.element_count() != self.ncols() {
            return Err(self.shape_mismatch(src, "set_row source length"));
        }
        for j in 0..self.ncols() {
            let v = src.get_flat(j)?;
            self.set(row, j, v)?;
        }
        Ok(())
    }

    /// Overwrites column `col` with the elements of `src`, read in `src`'s
    /// flat index order.
    pub fn set_col(&mut self, col: usize, src: &Matrix) -> Result<()> {
        if src.element_count() != self.nrows() {
            return Err(self.shape_mismatch(src, "set_col source length"));
        }
        for i in 0..self.nrows() {
            let v = src.get_flat(i)?;
            self.set(i, col, v)?;
        }
        Ok(())
    }

    /// Forward, restartable iteration over elements in flat index order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            matrix: self,
            cursor: 0,
            len: self.element_count(),
        }
    }
}

/// Iterator over matrix elements in flat index order.
pub struct Iter<'a> {
    matrix: &'a Matrix,
    cursor: usize,
    len: usize,
}

impl Iterator for Iter<'_> {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.cursor >= self.len {
            return None;
        }
        let v = with_backend!(self.matrix, |s| s.get_flat(self.cursor));
        self.cursor += 1;
        v
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.cursor;
        (remaining, Some(remaining))
    }
}

impl<'a> IntoIterator for &'a Matrix {
    type Item = f64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

/// Value equality: same shape and identical elements position by position,
/// regardless of which backend holds either side.
impl PartialEq for Matrix {
    fn eq(&self, other: &Matrix) -> bool {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return false;
        }
        for r in 0..self.nrows() {
            for c in 0..self.ncols() {
                let a = with_backend!(self, |s| s.get(r, c));
                let b = with_backend!(other, |s| s.get(r, c));
                if a != b {
                    return false;
                }
            }
        }
        true
    }
}

impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}x{} matrix ({} backend)",
            self.nrows(),
            self.ncols(),
            self.backend()
        )?;
        for r in 0..self.nrows() {
            for c in 0..self.ncols() {
                let v = with_backend!(self, |s| s.get(r, c)).unwrap_or(f64::NAN);
                write!(f, " {v:>12.6}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Wraps raw nalgebra storage into a facade matrix on that backend.
impl From<DMatrix<f64>> for Matrix {
    fn from(raw: DMatrix<f64>) -> Matrix {
        Matrix::from_storage(Storage::Na(NaDense(raw)))
    }
}

/// Wraps raw ndarray storage into a facade matrix on that backend.
impl From<Array2<f64>> for Matrix {
    fn from(raw: Array2<f64>) -> Matrix {
        Matrix::from_storage(Storage::Nd(NdDense(raw)))
    }
}

// Scalar operators live on `&Matrix` only: a by-value impl would shadow the
// inherent `add`/`sub` methods in method-call position.
macro_rules! scalar_op {
    ($trait:ident, $method:ident, |$x:ident, $rhs:ident| $body:expr) => {
        impl $trait<f64> for &Matrix {
            type Output = Matrix;
            fn $method(self, $rhs: f64) -> Matrix {
                Matrix::from_storage(per_backend!(self, |s| s.map(|$x| $body)))
            }
        }
    };
}

scalar_op!(Add, add, |x, rhs| x + rhs);
scalar_op!(Sub, sub, |x, rhs| x - rhs);
scalar_op!(Mul, mul, |x, rhs| x * rhs);
scalar_op!(Div, div, |x, rhs| x / rhs);

impl Neg for &Matrix {
    type Output = Matrix;
    fn neg(self) -> Matrix {
        Matrix::from_storage(per_backend!(self, |s| s.map(|x| -x)))
    }
}

impl Neg for Matrix {
    type Output = Matrix;
    fn neg(self) -> Matrix {
        -&self
    }
}
