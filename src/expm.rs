//! Backend-independent matrix exponential.
//!
//! Scaling-and-squaring with Padé approximants, driven by the induced
//! 1-norm. This is the one routine written once against the uniform facade
//! contract and shared by every backend: it only ever touches the input
//! through facade operations, so the result lands on the input's backend
//! automatically.

use log::debug;

use crate::error::{MatrixError, Result};
use crate::matrix::Matrix;

// Padé numerator coefficients b_0..b_m for degrees 3, 5, 7, 9, 13.
const B3: [f64; 4] = [120.0, 60.0, 12.0, 1.0];
const B5: [f64; 6] = [30240.0, 15120.0, 3360.0, 420.0, 30.0, 1.0];
const B7: [f64; 8] = [
    17297280.0, 8648640.0, 1995840.0, 277200.0, 25200.0, 1512.0, 56.0, 1.0,
];
const B9: [f64; 10] = [
    17643225600.0,
    8821612800.0,
    2075673600.0,
    302702400.0,
    30270240.0,
    2162160.0,
    110880.0,
    3960.0,
    90.0,
    1.0,
];
const B13: [f64; 14] = [
    64764752532480000.0,
    32382376266240000.0,
    7771770303897600.0,
    1187353796428800.0,
    129060195264000.0,
    10559470521600.0,
    670442572800.0,
    33522128640.0,
    1323241920.0,
    40840800.0,
    960960.0,
    16380.0,
    182.0,
    1.0,
];

// 1-norm thresholds below which the corresponding Padé degree is accurate to
// double precision (Higham 2005).
const THETA_3: f64 = 1.495585217958292e-2;
const THETA_5: f64 = 2.539398330063230e-1;
const THETA_7: f64 = 9.504178996162932e-1;
const THETA_9: f64 = 2.097847961257068;
const THETA_13: f64 = 5.371920351148152;

pub(crate) fn expm(a: &Matrix) -> Result<Matrix> {
    let n = a.nrows();
    if !a.is_square() {
        return Err(MatrixError::ShapeMismatch {
            context: "matrix exponential",
            left_rows: n,
            left_cols: a.ncols(),
            right_rows: n,
            right_cols: a.ncols(),
        });
    }

    let norm = a.norm_ind_p1();
    for (b, theta) in [
        (&B3[..], THETA_3),
        (&B5[..], THETA_5),
        (&B7[..], THETA_7),
        (&B9[..], THETA_9),
    ] {
        if norm <= theta {
            debug!("expm: {n}x{n}, 1-norm {norm:.3e}, pade degree {}", b.len() - 1);
            return pade(a, b);
        }
    }

    // Scale A down by a power of two until the degree-13 approximant holds,
    // evaluate, then undo the scaling by repeated squaring.
    let squarings = if norm > THETA_13 {
        ((norm / THETA_13).log2().ceil()) as i32
    } else {
        0
    };
    debug!("expm: {n}x{n}, 1-norm {norm:.3e}, pade degree 13, {squarings} squarings");
    let scaled = a * 2f64.powi(-squarings);
    let mut result = pade(&scaled, &B13)?;
    for _ in 0..squarings {
        result = result.matmul(&result)?;
    }
    Ok(result)
}

/// Evaluates the degree-m diagonal Padé approximant r_m(A) = (V - U)^-1 (V + U)
/// where U collects the odd and V the even terms of the numerator polynomial.
fn pade(a: &Matrix, b: &[f64]) -> Result<Matrix> {
    let eye = a.backend().eye(a.nrows());
    let a2 = a.matmul(a)?;

    // Even powers A^0, A^2, ..., A^(m-1).
    let mut powers = vec![eye];
    for _ in 1..b.len() / 2 {
        let next = powers[powers.len() - 1].matmul(&a2)?;
        powers.push(next);
    }

    let mut u_inner = &powers[0] * b[1];
    let mut v = &powers[0] * b[0];
    for (k, power) in powers.iter().enumerate().skip(1) {
        u_inner = u_inner.add(&(power * b[2 * k + 1]))?;
        v = v.add(&(power * b[2 * k]))?;
    }
    let u = a.matmul(&u_inner)?;

    let numerator = v.add(&u)?;
    v.sub(&u)?.inv()?.matmul(&numerator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatrixError;
    use crate::factory::Backend;
    use approx::assert_relative_eq;

    // RUST_LOG=debug shows the degree and squaring choices during test runs.
    fn init_logs() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn expm_of_zero_is_identity() {
        init_logs();
        for backend in Backend::ALL {
            let z = backend.zeros(3, 3);
            let e = z.expm().unwrap();
            let eye = backend.eye(3);
            for i in 0..3 {
                for j in 0..3 {
                    assert_relative_eq!(
                        e.get(i, j).unwrap(),
                        eye.get(i, j).unwrap(),
                        epsilon = 1e-14
                    );
                }
            }
        }
    }

    #[test]
    fn expm_of_diagonal_exponentiates_the_diagonal() {
        init_logs();
        for backend in Backend::ALL {
            let a = backend
                .from_rows(&[vec![1.0, 0.0], vec![0.0, -2.0]])
                .unwrap();
            let e = a.expm().unwrap();
            assert_relative_eq!(e.get(0, 0).unwrap(), 1f64.exp(), epsilon = 1e-12);
            assert_relative_eq!(e.get(1, 1).unwrap(), (-2f64).exp(), epsilon = 1e-12);
            assert_relative_eq!(e.get(0, 1).unwrap(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(e.get(1, 0).unwrap(), 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn expm_of_nilpotent_matrix() {
        init_logs();
        for backend in Backend::ALL {
            let a = backend
                .from_rows(&[vec![0.0, 1.0], vec![0.0, 0.0]])
                .unwrap();
            let e = a.expm().unwrap();
            assert_relative_eq!(e.get(0, 0).unwrap(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(e.get(0, 1).unwrap(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(e.get(1, 0).unwrap(), 0.0, epsilon = 1e-12);
            assert_relative_eq!(e.get(1, 1).unwrap(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn expm_scaling_path_for_large_norms() {
        init_logs();
        for backend in Backend::ALL {
            // 1-norm is 10, well past the degree-13 threshold.
            let a = backend
                .from_rows(&[vec![10.0, 0.0], vec![0.0, 10.0]])
                .unwrap();
            let e = a.expm().unwrap();
            assert_relative_eq!(
                e.get(0, 0).unwrap(),
                10f64.exp(),
                max_relative = 1e-10
            );
            assert_relative_eq!(e.get(0, 1).unwrap(), 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn expm_requires_square_input() {
        init_logs();
        for backend in Backend::ALL {
            let a = backend.zeros(2, 3);
            assert!(matches!(
                a.expm(),
                Err(MatrixError::ShapeMismatch { .. })
            ));
        }
    }

    #[test]
    fn expm_result_stays_on_the_input_backend() {
        init_logs();
        for backend in Backend::ALL {
            let a = backend.rand_seeded(4, 4, 11);
            assert_eq!(a.expm().unwrap().backend(), backend);
        }
    }
}
