//! Dense `f64` matrices over interchangeable numerical engines.
//!
//! [`Matrix`] is a facade: the same operation surface regardless of which
//! engine holds the data. Two backends are available, selected at
//! construction time through the [`Backend`] factory:
//!
//! - [`Backend::Nalgebra`]: nalgebra `DMatrix<f64>`, native decompositions
//!   and pseudo-inverse, column-major flat order.
//! - [`Backend::Ndarray`]: ndarray `Array2<f64>`, adapter-provided
//!   decomposition kernels, row-major flat order.
//!
//! Binary operations require both operands on the same backend and fail with
//! [`MatrixError::UnsupportedBackendMix`] otherwise. Fallible operations
//! return [`Result`] rather than panicking.
//!
//! ```
//! use dualmat::Backend;
//!
//! let a = Backend::Nalgebra.from_rows(&[vec![4.0, 1.0], vec![1.0, 3.0]])?;
//! let b = Backend::Nalgebra.from_rows(&[vec![1.0], vec![2.0]])?;
//! let x = a.solve(&b)?;
//! assert!(a.matmul(&x)?.sub(&b)?.norm_f() < 1e-12);
//! # Ok::<(), dualmat::MatrixError>(())
//! ```

mod backend;
mod codec;
mod error;
mod expm;
mod factory;
mod matrix;

pub use error::{MatrixError, Result};
pub use factory::Backend;
pub use matrix::{Iter, Matrix};
