use nalgebra::{DMatrix, DVector, Vector3};

use super::State;
use crate::config::BiasConfig;
use crate::error::Result;
use crate::math::{check_matrix_shape, check_vector_len};

/// Size of a bias block (one scalar per measurement axis).
pub const BIAS_SIZE: usize = 3;

/// Additive sensor bias modeled as a random walk.
///
/// The transition is the identity; all adaptation comes from the correction
/// step, paced by the small process-noise variance.
#[derive(Clone, Debug)]
pub struct BiasState {
    bias: Vector3<f64>,
    variance: f64,
}

impl BiasState {
    pub fn new(config: BiasConfig) -> Self {
        Self {
            bias: Vector3::zeros(),
            variance: config.variance,
        }
    }

    /// Current bias estimate along one measurement axis.
    pub fn bias(&self, axis: usize) -> f64 {
        self.bias[axis]
    }

    pub fn vector(&self) -> &Vector3<f64> {
        &self.bias
    }

    /// Clear the bias estimate (e.g. after a sensor swap).
    pub fn reset(&mut self) {
        self.bias.fill(0.0);
    }
}

impl State for BiasState {
    fn size(&self) -> usize {
        BIAS_SIZE
    }

    fn state_vector(&self, vector: &mut DVector<f64>) -> Result<()> {
        check_vector_len(vector, BIAS_SIZE)?;
        for i in 0..BIAS_SIZE {
            vector[i] = self.bias[i];
        }
        Ok(())
    }

    fn set_state_vector(&mut self, vector: &DVector<f64>) -> Result<()> {
        check_vector_len(vector, BIAS_SIZE)?;
        for i in 0..BIAS_SIZE {
            self.bias[i] = vector[i];
        }
        Ok(())
    }

    // Random walk: the bias only moves through corrections.
    fn predict(&mut self) {}

    fn transition_matrix(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(matrix, BIAS_SIZE, BIAS_SIZE)?;
        matrix.fill(0.0);
        matrix.fill_diagonal(1.0);
        Ok(())
    }

    fn process_noise(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(matrix, BIAS_SIZE, BIAS_SIZE)?;
        matrix.fill(0.0);
        matrix.fill_diagonal(self.variance);
        Ok(())
    }
}
