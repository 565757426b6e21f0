//! Composite robot state and its authoritative index layout.
//!
//! The concatenation order is fixed: an optional floating-base block of six
//! 3-vectors (orientation error, position, angular velocity, linear velocity,
//! angular acceleration, linear acceleration), followed by one
//! `{q, qd, qdd}` triple per actuated joint in topology order. The index map
//! is computed once at construction as a pure function of the topology, not
//! of the current estimate, and every sensor relies on it to place its
//! partial Jacobian columns. Sensors never hard-code offsets.

use std::collections::HashMap;

use log::debug;
use nalgebra::{DMatrix, DVector, Vector3};

use super::{JointState, State};
use crate::config::{FloatingBaseConfig, JointStateConfig, Parameters};
use crate::error::{FilterError, Result};
use crate::kinematics::RobotDescription;
use crate::math::{check_matrix_shape, check_vector_len};

/// Width of each floating-base sub-vector.
const BLOCK: usize = 3;
/// Scalars per joint in the composite layout ({q, qd, qdd}).
const JOINT_BLOCK: usize = 3;
/// Total width of the floating-base block.
pub const FLOATING_BASE_SIZE: usize = 6 * BLOCK;

// Sub-block offsets inside the floating-base block.
const ORIENTATION: usize = 0;
const POSITION: usize = 3;
const ANGULAR_VELOCITY: usize = 6;
const LINEAR_VELOCITY: usize = 9;
const ANGULAR_ACCELERATION: usize = 12;
const LINEAR_ACCELERATION: usize = 15;

#[derive(Clone, Copy, Debug)]
struct JointIndices {
    position: usize,
    velocity: usize,
    acceleration: usize,
}

/// Floating-base sub-state: two triple-integrator chains (rotational and
/// translational), accelerations modeled as random walks.
#[derive(Clone, Debug)]
struct FloatingBase {
    orientation: Vector3<f64>,
    position: Vector3<f64>,
    angular_velocity: Vector3<f64>,
    linear_velocity: Vector3<f64>,
    angular_acceleration: Vector3<f64>,
    linear_acceleration: Vector3<f64>,
    config: FloatingBaseConfig,
}

impl FloatingBase {
    fn new(config: FloatingBaseConfig) -> Self {
        Self {
            orientation: Vector3::zeros(),
            position: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            linear_velocity: Vector3::zeros(),
            angular_acceleration: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            config,
        }
    }

    fn predict(&mut self, dt: f64) {
        self.orientation += self.angular_velocity * dt + self.angular_acceleration * (0.5 * dt * dt);
        self.position += self.linear_velocity * dt + self.linear_acceleration * (0.5 * dt * dt);
        self.angular_velocity += self.angular_acceleration * dt;
        self.linear_velocity += self.linear_acceleration * dt;
    }

    fn write(&self, vector: &mut DVector<f64>) {
        for i in 0..BLOCK {
            vector[ORIENTATION + i] = self.orientation[i];
            vector[POSITION + i] = self.position[i];
            vector[ANGULAR_VELOCITY + i] = self.angular_velocity[i];
            vector[LINEAR_VELOCITY + i] = self.linear_velocity[i];
            vector[ANGULAR_ACCELERATION + i] = self.angular_acceleration[i];
            vector[LINEAR_ACCELERATION + i] = self.linear_acceleration[i];
        }
    }

    fn read(&mut self, vector: &DVector<f64>) {
        for i in 0..BLOCK {
            self.orientation[i] = vector[ORIENTATION + i];
            self.position[i] = vector[POSITION + i];
            self.angular_velocity[i] = vector[ANGULAR_VELOCITY + i];
            self.linear_velocity[i] = vector[LINEAR_VELOCITY + i];
            self.angular_acceleration[i] = vector[ANGULAR_ACCELERATION + i];
            self.linear_acceleration[i] = vector[LINEAR_ACCELERATION + i];
        }
    }
}

/// Composite state of the whole robot: optional floating base plus one
/// [`JointState`] per actuated degree of freedom.
///
/// Owns the single source of truth for the state-vector layout; all `find_*`
/// lookups are pure reads of the map built at construction and stay stable
/// for the lifetime of the instance.
pub struct RobotState {
    floating: Option<FloatingBase>,
    joints: Vec<JointState>,
    index_map: HashMap<String, JointIndices>,
    size: usize,
    gravity: f64,
    dt: f64,
}

impl RobotState {
    pub fn new(description: &RobotDescription, dt: f64, parameters: &dyn Parameters) -> Self {
        let floating = description
            .floating
            .then(|| FloatingBase::new(FloatingBaseConfig::from_parameters(parameters)));
        let mut offset = if floating.is_some() {
            FLOATING_BASE_SIZE
        } else {
            0
        };

        let mut joints = Vec::with_capacity(description.joint_names.len());
        let mut index_map = HashMap::with_capacity(description.joint_names.len());
        for name in &description.joint_names {
            index_map.insert(
                name.clone(),
                JointIndices {
                    position: offset,
                    velocity: offset + 1,
                    acceleration: offset + 2,
                },
            );
            joints.push(JointState::new(
                name.clone(),
                true,
                dt,
                JointStateConfig::from_parameters(name, parameters),
            ));
            offset += JOINT_BLOCK;
        }

        debug!(
            "robot state layout: {} joints, floating = {}, size = {}",
            joints.len(),
            description.floating,
            offset
        );

        Self {
            floating,
            joints,
            index_map,
            size: offset,
            gravity: description.gravity,
            dt,
        }
    }

    pub fn is_floating(&self) -> bool {
        self.floating.is_some()
    }

    /// Signed gravitational acceleration constant used by the sensor models.
    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    /// Time step fixed at construction, shared with every sensor model that
    /// needs a finite-difference horizon.
    pub fn time_step(&self) -> f64 {
        self.dt
    }

    pub fn joint(&self, name: &str) -> Result<&JointState> {
        self.joints
            .iter()
            .find(|joint| joint.name() == name)
            .ok_or_else(|| FilterError::UnknownJoint(name.to_string()))
    }

    pub fn joint_mut(&mut self, name: &str) -> Result<&mut JointState> {
        self.joints
            .iter_mut()
            .find(|joint| joint.name() == name)
            .ok_or_else(|| FilterError::UnknownJoint(name.to_string()))
    }

    fn require_floating(&self) -> Result<()> {
        if self.floating.is_some() {
            Ok(())
        } else {
            Err(FilterError::NotFloating)
        }
    }

    pub fn find_orientation_index(&self) -> Result<usize> {
        self.require_floating()?;
        Ok(ORIENTATION)
    }

    pub fn find_position_index(&self) -> Result<usize> {
        self.require_floating()?;
        Ok(POSITION)
    }

    pub fn find_angular_velocity_index(&self) -> Result<usize> {
        self.require_floating()?;
        Ok(ANGULAR_VELOCITY)
    }

    pub fn find_linear_velocity_index(&self) -> Result<usize> {
        self.require_floating()?;
        Ok(LINEAR_VELOCITY)
    }

    pub fn find_angular_acceleration_index(&self) -> Result<usize> {
        self.require_floating()?;
        Ok(ANGULAR_ACCELERATION)
    }

    pub fn find_linear_acceleration_index(&self) -> Result<usize> {
        self.require_floating()?;
        Ok(LINEAR_ACCELERATION)
    }

    fn joint_indices(&self, name: &str) -> Result<JointIndices> {
        self.index_map
            .get(name)
            .copied()
            .ok_or_else(|| FilterError::UnknownJoint(name.to_string()))
    }

    pub fn find_joint_position_index(&self, name: &str) -> Result<usize> {
        self.joint_indices(name).map(|indices| indices.position)
    }

    pub fn find_joint_velocity_index(&self, name: &str) -> Result<usize> {
        self.joint_indices(name).map(|indices| indices.velocity)
    }

    pub fn find_joint_acceleration_index(&self, name: &str) -> Result<usize> {
        self.joint_indices(name).map(|indices| indices.acceleration)
    }
}

impl State for RobotState {
    fn size(&self) -> usize {
        self.size
    }

    fn state_vector(&self, vector: &mut DVector<f64>) -> Result<()> {
        check_vector_len(vector, self.size)?;
        let mut offset = 0;
        if let Some(base) = &self.floating {
            base.write(vector);
            offset = FLOATING_BASE_SIZE;
        }
        for joint in &self.joints {
            vector[offset] = joint.position();
            vector[offset + 1] = joint.velocity();
            vector[offset + 2] = joint.acceleration();
            offset += JOINT_BLOCK;
        }
        Ok(())
    }

    fn set_state_vector(&mut self, vector: &DVector<f64>) -> Result<()> {
        check_vector_len(vector, self.size)?;
        let mut offset = 0;
        if let Some(base) = &mut self.floating {
            base.read(vector);
            offset = FLOATING_BASE_SIZE;
        }
        for joint in &mut self.joints {
            joint.set_position(vector[offset]);
            joint.set_velocity(vector[offset + 1]);
            joint.set_acceleration(vector[offset + 2]);
            offset += JOINT_BLOCK;
        }
        Ok(())
    }

    fn predict(&mut self) {
        if let Some(base) = &mut self.floating {
            base.predict(self.dt);
        }
        for joint in &mut self.joints {
            joint.predict();
        }
    }

    fn transition_matrix(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(matrix, self.size, self.size)?;
        let dt = self.dt;
        matrix.fill(0.0);
        matrix.fill_diagonal(1.0);

        let mut offset = 0;
        if self.floating.is_some() {
            for i in 0..BLOCK {
                matrix[(ORIENTATION + i, ANGULAR_VELOCITY + i)] = dt;
                matrix[(ORIENTATION + i, ANGULAR_ACCELERATION + i)] = 0.5 * dt * dt;
                matrix[(POSITION + i, LINEAR_VELOCITY + i)] = dt;
                matrix[(POSITION + i, LINEAR_ACCELERATION + i)] = 0.5 * dt * dt;
                matrix[(ANGULAR_VELOCITY + i, ANGULAR_ACCELERATION + i)] = dt;
                matrix[(LINEAR_VELOCITY + i, LINEAR_ACCELERATION + i)] = dt;
            }
            offset = FLOATING_BASE_SIZE;
        }
        for _ in &self.joints {
            matrix[(offset, offset + 1)] = dt;
            matrix[(offset, offset + 2)] = 0.5 * dt * dt;
            matrix[(offset + 1, offset + 2)] = dt;
            offset += JOINT_BLOCK;
        }
        Ok(())
    }

    fn process_noise(&self, matrix: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(matrix, self.size, self.size)?;
        matrix.fill(0.0);

        let mut offset = 0;
        if let Some(base) = &self.floating {
            for i in 0..BLOCK {
                matrix[(ORIENTATION + i, ORIENTATION + i)] = base.config.orientation_variance;
                matrix[(POSITION + i, POSITION + i)] = base.config.position_variance;
                matrix[(ANGULAR_VELOCITY + i, ANGULAR_VELOCITY + i)] =
                    base.config.angular_velocity_variance;
                matrix[(LINEAR_VELOCITY + i, LINEAR_VELOCITY + i)] =
                    base.config.linear_velocity_variance;
                matrix[(ANGULAR_ACCELERATION + i, ANGULAR_ACCELERATION + i)] =
                    base.config.angular_acceleration_variance;
                matrix[(LINEAR_ACCELERATION + i, LINEAR_ACCELERATION + i)] =
                    base.config.linear_acceleration_variance;
            }
            offset = FLOATING_BASE_SIZE;
        }
        for joint in &self.joints {
            let config = joint.config();
            matrix[(offset, offset)] = config.position_variance;
            matrix[(offset + 1, offset + 1)] = config.velocity_variance;
            matrix[(offset + 2, offset + 2)] = config.acceleration_variance;
            offset += JOINT_BLOCK;
        }
        Ok(())
    }
}
