//! Small linear-algebra helpers shared by the sensor models.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use crate::error::{FilterError, Result};

/// Skew-symmetric ("tilde") matrix such that `skew(v) * u == v × u`.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y, //
        v.z, 0.0, -v.x, //
        -v.y, v.x, 0.0,
    )
}

/// First-order Jacobian of the cross product `f(qd) = (A·qd) × (L·qd)`
/// about `qd0`:
///
/// `J = skew(A·qd0) · L − skew(L·qd0) · A`
///
/// `angular` (A) and `linear` (L) are 3×N blocks of a geometric Jacobian.
pub fn cross_product_jacobian(
    angular: &DMatrix<f64>,
    linear: &DMatrix<f64>,
    qd0: &DVector<f64>,
) -> Result<DMatrix<f64>> {
    let n = qd0.len();
    check_matrix_shape(angular, 3, n)?;
    check_matrix_shape(linear, 3, n)?;
    let mut jacobian = DMatrix::zeros(3, n);
    cross_product_jacobian_into(angular, linear, qd0, &mut jacobian)?;
    Ok(jacobian)
}

/// Allocation-free variant of [`cross_product_jacobian`] writing into a
/// caller-owned 3×N buffer.
pub fn cross_product_jacobian_into(
    angular: &DMatrix<f64>,
    linear: &DMatrix<f64>,
    qd0: &DVector<f64>,
    jacobian: &mut DMatrix<f64>,
) -> Result<()> {
    let n = qd0.len();
    check_matrix_shape(angular, 3, n)?;
    check_matrix_shape(linear, 3, n)?;
    check_matrix_shape(jacobian, 3, n)?;

    let mut omega = Vector3::zeros();
    let mut velocity = Vector3::zeros();
    for r in 0..3 {
        let mut omega_r = 0.0;
        let mut velocity_r = 0.0;
        for c in 0..n {
            omega_r += angular[(r, c)] * qd0[c];
            velocity_r += linear[(r, c)] * qd0[c];
        }
        omega[r] = omega_r;
        velocity[r] = velocity_r;
    }

    let skew_omega = skew(&omega);
    let skew_velocity = skew(&velocity);
    for r in 0..3 {
        for c in 0..n {
            let mut value = 0.0;
            for k in 0..3 {
                value += skew_omega[(r, k)] * linear[(k, c)];
                value -= skew_velocity[(r, k)] * angular[(k, c)];
            }
            jacobian[(r, c)] = value;
        }
    }
    Ok(())
}

/// Shape check for caller-supplied matrix buffers.
pub(crate) fn check_matrix_shape(matrix: &DMatrix<f64>, rows: usize, cols: usize) -> Result<()> {
    if matrix.nrows() != rows || matrix.ncols() != cols {
        return Err(FilterError::DimensionMismatch {
            expected_rows: rows,
            expected_cols: cols,
            actual_rows: matrix.nrows(),
            actual_cols: matrix.ncols(),
        });
    }
    Ok(())
}

/// Length check for caller-supplied vector buffers.
pub(crate) fn check_vector_len(vector: &DVector<f64>, len: usize) -> Result<()> {
    if vector.len() != len {
        return Err(FilterError::DimensionMismatch {
            expected_rows: len,
            expected_cols: 1,
            actual_rows: vector.len(),
            actual_cols: 1,
        });
    }
    Ok(())
}
