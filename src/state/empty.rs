use nalgebra::{DMatrix, DVector};

use super::State;
use crate::error::Result;
use crate::math::{check_matrix_shape, check_vector_len};

/// Zero-size state for sensors with no augmentable internal state (exact
/// joint encoders, IMU axes without bias estimation).
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyState;

impl State for EmptyState {
    fn size(&self) -> usize {
        0
    }

    fn state_vector(&self, vector: &mut DVector<f64>) -> Result<()> {
        check_vector_len(vector, 0)
    }

    fn set_state_vector(&mut self, vector: &DVector<f64>) -> Result<()> {
        check_vector_len(vector, 0)
    }

    fn predict(&mut self) {}

    fn transition_matrix(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(matrix, 0, 0)
    }

    fn process_noise(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(matrix, 0, 0)
    }
}
