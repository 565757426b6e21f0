use nalgebra::{DMatrix, DVector};

use super::State;
use crate::config::JointStateConfig;
use crate::error::Result;
use crate::math::{check_matrix_shape, check_vector_len};

/// Position, velocity and (optionally) acceleration of one named joint.
///
/// Layout is `{q, qd}` or `{q, qd, qdd}` depending on whether acceleration is
/// tracked; the flag is fixed at construction. Without acceleration the
/// velocity is a random walk.
#[derive(Clone, Debug)]
pub struct JointState {
    name: String,
    q: f64,
    qd: f64,
    qdd: f64,
    track_acceleration: bool,
    dt: f64,
    config: JointStateConfig,
}

impl JointState {
    pub fn new(
        name: impl Into<String>,
        track_acceleration: bool,
        dt: f64,
        config: JointStateConfig,
    ) -> Self {
        Self {
            name: name.into(),
            q: 0.0,
            qd: 0.0,
            qdd: 0.0,
            track_acceleration,
            dt,
            config,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> f64 {
        self.q
    }

    pub fn velocity(&self) -> f64 {
        self.qd
    }

    pub fn acceleration(&self) -> f64 {
        self.qdd
    }

    /// Seed the estimate, e.g. from the first encoder reading.
    pub fn set_position(&mut self, q: f64) {
        self.q = q;
    }

    pub fn set_velocity(&mut self, qd: f64) {
        self.qd = qd;
    }

    pub fn set_acceleration(&mut self, qdd: f64) {
        self.qdd = qdd;
    }

    pub(crate) fn config(&self) -> &JointStateConfig {
        &self.config
    }
}

impl State for JointState {
    fn size(&self) -> usize {
        if self.track_acceleration {
            3
        } else {
            2
        }
    }

    fn state_vector(&self, vector: &mut DVector<f64>) -> Result<()> {
        check_vector_len(vector, self.size())?;
        vector[0] = self.q;
        vector[1] = self.qd;
        if self.track_acceleration {
            vector[2] = self.qdd;
        }
        Ok(())
    }

    fn set_state_vector(&mut self, vector: &DVector<f64>) -> Result<()> {
        check_vector_len(vector, self.size())?;
        self.q = vector[0];
        self.qd = vector[1];
        if self.track_acceleration {
            self.qdd = vector[2];
        }
        Ok(())
    }

    fn predict(&mut self) {
        let dt = self.dt;
        if self.track_acceleration {
            self.q += self.qd * dt + 0.5 * self.qdd * dt * dt;
            self.qd += self.qdd * dt;
        } else {
            // Velocity is a random walk when acceleration is not tracked.
            self.q += self.qd * dt;
        }
    }

    fn transition_matrix(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        let size = self.size();
        check_matrix_shape(matrix, size, size)?;
        let dt = self.dt;
        matrix.fill(0.0);
        matrix.fill_diagonal(1.0);
        matrix[(0, 1)] = dt;
        if self.track_acceleration {
            matrix[(0, 2)] = 0.5 * dt * dt;
            matrix[(1, 2)] = dt;
        }
        Ok(())
    }

    fn process_noise(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        let size = self.size();
        check_matrix_shape(matrix, size, size)?;
        matrix.fill(0.0);
        matrix[(0, 0)] = self.config.position_variance;
        matrix[(1, 1)] = self.config.velocity_variance;
        if self.track_acceleration {
            matrix[(2, 2)] = self.config.acceleration_variance;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn joint(track_acceleration: bool, dt: f64) -> JointState {
        JointState::new("knee", track_acceleration, dt, JointStateConfig::default())
    }

    #[test]
    fn test_predict_without_acceleration_is_exact() {
        let mut state = joint(false, 0.01);
        state.set_position(1.0);
        state.set_velocity(2.0);
        state.predict();
        // q_{k+1} = q_k + qd_k * dt exactly, qd unchanged
        assert_eq!(state.position(), 1.0 + 2.0 * 0.01);
        assert_eq!(state.velocity(), 2.0);
    }

    #[test]
    fn test_predict_with_constant_acceleration() {
        let dt = 0.005;
        let mut state = joint(true, dt);
        state.set_position(0.5);
        state.set_velocity(-1.0);
        state.set_acceleration(3.0);
        state.predict();
        assert_relative_eq!(
            state.position(),
            0.5 - 1.0 * dt + 0.5 * 3.0 * dt * dt,
            epsilon = 1e-15
        );
        assert_relative_eq!(state.velocity(), -1.0 + 3.0 * dt, epsilon = 1e-15);
        assert_eq!(state.acceleration(), 3.0);
    }

    #[test]
    fn test_flatten_unflatten_roundtrip() {
        let mut state = joint(true, 0.001);
        let input = DVector::from_column_slice(&[0.2, -0.4, 1.5]);
        state.set_state_vector(&input).unwrap();
        let mut output = DVector::zeros(3);
        state.state_vector(&mut output).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_transition_matrix_matches_predict() {
        let dt = 0.02;
        let mut state = joint(true, dt);
        let x = DVector::from_column_slice(&[0.3, 1.1, -0.7]);
        state.set_state_vector(&x).unwrap();

        let mut a = DMatrix::zeros(3, 3);
        state.transition_matrix(&mut a).unwrap();
        let predicted = &a * &x;

        state.predict();
        let mut actual = DVector::zeros(3);
        state.state_vector(&mut actual).unwrap();
        assert_relative_eq!(actual, predicted, epsilon = 1e-14);
    }

    #[test]
    fn test_size_follows_acceleration_flag() {
        assert_eq!(joint(false, 0.01).size(), 2);
        assert_eq!(joint(true, 0.01).size(), 3);
    }

    #[test]
    fn test_wrong_buffer_size_is_rejected() {
        let state = joint(false, 0.01);
        let mut vector = DVector::zeros(3);
        assert!(state.state_vector(&mut vector).is_err());
    }
}
