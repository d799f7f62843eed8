//! Per-backend matrix factories.
//!
//! [`Backend`] is a stateless singleton per engine: it owns no matrix data,
//! only construction logic. Matrices report their own factory through
//! [`Matrix::backend`](crate::Matrix::backend), which keeps derived
//! construction (identity inside a solver, fresh factors inside a
//! decomposition) on the backend of the inputs.

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::backend::na::NaDense;
use crate::backend::nd::NdDense;
use crate::backend::Engine;
use crate::error::{MatrixError, Result};
use crate::matrix::{Matrix, Storage};

/// The closed set of available numerical engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    /// nalgebra `DMatrix<f64>`, column-major flat order, native
    /// decompositions and pseudo-inverse.
    Nalgebra,
    /// ndarray `Array2<f64>`, row-major flat order, adapter-provided
    /// decomposition kernels, no pseudo-inverse.
    Ndarray,
}

impl Backend {
    /// Both backends, in a fixed order; test harnesses iterate this to run
    /// every property against every engine.
    pub const ALL: [Backend; 2] = [Backend::Nalgebra, Backend::Ndarray];

    fn build(self, rows: usize, cols: usize, f: impl Fn(usize, usize) -> f64) -> Matrix {
        let storage = match self {
            Backend::Nalgebra => Storage::Na(NaDense::from_fn(rows, cols, f)),
            Backend::Ndarray => Storage::Nd(NdDense::from_fn(rows, cols, f)),
        };
        Matrix::from_storage(storage)
    }

    pub fn zeros(self, rows: usize, cols: usize) -> Matrix {
        self.filled(rows, cols, 0.0)
    }

    pub fn ones(self, rows: usize, cols: usize) -> Matrix {
        self.filled(rows, cols, 1.0)
    }

    pub fn filled(self, rows: usize, cols: usize, value: f64) -> Matrix {
        self.build(rows, cols, |_, _| value)
    }

    /// The `n x n` identity.
    pub fn eye(self, n: usize) -> Matrix {
        self.build(n, n, |i, j| if i == j { 1.0 } else { 0.0 })
    }

    /// Uniform random elements in `[0, 1)`.
    pub fn rand(self, rows: usize, cols: usize) -> Matrix {
        let mut rng = rand::rng();
        self.rand_from(rows, cols, &mut rng)
    }

    /// Uniform random elements in `[0, 1)` from a deterministic seed.
    pub fn rand_seeded(self, rows: usize, cols: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        self.rand_from(rows, cols, &mut rng)
    }

    /// Standard-normal random elements.
    pub fn randn(self, rows: usize, cols: usize) -> Matrix {
        let mut rng = rand::rng();
        self.randn_from(rows, cols, &mut rng)
    }

    /// Standard-normal random elements from a deterministic seed.
    pub fn randn_seeded(self, rows: usize, cols: usize, seed: u64) -> Matrix {
        let mut rng = StdRng::seed_from_u64(seed);
        self.randn_from(rows, cols, &mut rng)
    }

    fn rand_from(self, rows: usize, cols: usize, rng: &mut impl Rng) -> Matrix {
        let data: Vec<f64> = (0..rows * cols).map(|_| rng.random::<f64>()).collect();
        self.from_row_major_unchecked(rows, cols, &data)
    }

    fn randn_from(self, rows: usize, cols: usize, rng: &mut impl Rng) -> Matrix {
        let data: Vec<f64> = (0..rows * cols)
            .map(|_| StandardNormal.sample(rng))
            .collect();
        self.from_row_major_unchecked(rows, cols, &data)
    }

    /// Builds a matrix from rows of literal values. Every row must have the
    /// same length.
    pub fn from_rows(self, rows: &[Vec<f64>]) -> Result<Matrix> {
        let nrows = rows.len();
        let ncols = rows.first().map(Vec::len).unwrap_or(0);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(MatrixError::ShapeMismatch {
                    context: "literal rows must have equal lengths",
                    left_rows: 1,
                    left_cols: ncols,
                    right_rows: 1,
                    right_cols: rows[i].len(),
                });
            }
        }
        Ok(self.build(nrows, ncols, |i, j| rows[i][j]))
    }

    /// Builds a matrix of the given shape from `rows * cols` values laid out
    /// row by row.
    pub fn from_row_major(self, rows: usize, cols: usize, data: &[f64]) -> Result<Matrix> {
        if data.len() != rows * cols {
            return Err(MatrixError::ShapeMismatch {
                context: "row-major data length must equal rows * cols",
                left_rows: rows,
                left_cols: cols,
                right_rows: 1,
                right_cols: data.len(),
            });
        }
        Ok(self.from_row_major_unchecked(rows, cols, data))
    }

    fn from_row_major_unchecked(self, rows: usize, cols: usize, data: &[f64]) -> Matrix {
        let storage = match self {
            Backend::Nalgebra => Storage::Na(NaDense::from_row_major(rows, cols, data)),
            Backend::Ndarray => Storage::Nd(NdDense::from_row_major(rows, cols, data)),
        };
        Matrix::from_storage(storage)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Nalgebra => write!(f, "nalgebra"),
            Backend::Ndarray => write!(f, "ndarray"),
        }
    }
}
