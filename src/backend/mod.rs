//! Backend storage adapters.
//!
//! Each adapter owns exactly one engine-native dense matrix and translates
//! the uniform facade contract into native calls. The facade never touches
//! engine types directly; everything goes through [`Engine`].

pub(crate) mod na;
pub(crate) mod nd;

use crate::error::Result;

/// Minimal capability interface a native numeric engine has to supply.
///
/// Shape preconditions (matching operand shapes, squareness) are validated by
/// the facade before these methods are called, so the adapters only deal with
/// translation and with failures native to the engine itself. Flat index
/// order is engine-defined but must agree between `get_flat`, `set_flat`, and
/// the facade iterator.
pub(crate) trait Engine: Clone {
    fn from_fn(rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self;
    fn from_row_major(rows: usize, cols: usize, data: &[f64]) -> Self;

    /// Builds a fresh matrix on the same engine as `self`.
    fn like(&self, rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        Self::from_fn(rows, cols, f)
    }

    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    fn get(&self, row: usize, col: usize) -> Option<f64>;
    fn get_flat(&self, index: usize) -> Option<f64>;
    /// Returns false when the position is out of bounds.
    fn set(&mut self, row: usize, col: usize, value: f64) -> bool;
    fn set_flat(&mut self, index: usize, value: f64) -> bool;

    fn map(&self, f: impl Fn(f64) -> f64) -> Self;
    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn elem_mul(&self, other: &Self) -> Self;
    fn elem_div(&self, other: &Self) -> Self;
    fn rem_elem(&self, other: &Self) -> Self;
    fn matmul(&self, other: &Self) -> Self;
    fn transpose(&self) -> Self;

    fn sum(&self) -> f64;
    fn min(&self) -> f64;
    fn max(&self) -> f64;
    fn mean(&self) -> f64;
    fn trace(&self) -> f64;
    fn diag(&self) -> Self;
    fn norm_f(&self) -> f64;
    fn norm_ind_p1(&self) -> f64;

    fn det(&self) -> f64;
    fn inv(&self) -> Result<Self>;
    fn pinv(&self) -> Result<Self>;
    fn solve(&self, rhs: &Self) -> Result<Self>;
    fn chol(&self) -> Result<Self>;
    fn lu(&self) -> Result<(Self, Self, Self)>;
    fn qr(&self) -> Result<(Self, Self)>;
}
