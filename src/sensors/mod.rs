//! Measurement sources and their linearizations.
//!
//! Every sensor turns a raw reading plus the current robot state into a
//! residual/Jacobian pair the generic correction step can stack. Sensors
//! locate their columns in the shared Jacobian exclusively through the
//! `RobotState` index map; the layout is resolved once at construction and
//! cached, never hard-coded.
//!
//! Per-cycle discipline: `predict()` must have run on every state before a
//! sensor is polled, and each sensor is polled exactly once per cycle. The
//! accelerometer keeps a finite-difference cache across cycles and therefore
//! depends on this ordering.

pub mod angular_velocity;
pub mod joint_position;
pub mod linear_acceleration;
#[cfg(test)]
pub mod test_utils;

pub use angular_velocity::AngularVelocitySensor;
pub use joint_position::JointPositionSensor;
pub use linear_acceleration::LinearAccelerationSensor;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::math::check_matrix_shape;
use crate::state::{RobotState, State};

/// A measurement source usable by the generic EKF correction step.
pub trait Sensor {
    /// Number of scalars in one raw measurement.
    fn measurement_size(&self) -> usize;

    /// The sensor's private state block (a bias, or nothing).
    fn sensor_state(&self) -> &dyn State;

    fn sensor_state_mut(&mut self) -> &mut dyn State;

    /// Write the linearized measurement Jacobian against the robot state
    /// (`measurement_size` × `robot_state.size()`) and the residual
    /// (measurement minus model prediction).
    ///
    /// Takes `&mut self`: some sensors carry legitimate cross-cycle state
    /// (the accelerometer's previous-Jacobian cache).
    fn robot_jacobian_and_residual(
        &mut self,
        jacobian: &mut DMatrix<f64>,
        residual: &mut DVector<f64>,
        robot_state: &RobotState,
    ) -> Result<()>;

    /// Jacobian w.r.t. the sensor's own state; identity sized to the own
    /// state unless the sensor overrides it.
    fn sensor_jacobian(&self, jacobian: &mut DMatrix<f64>) -> Result<()> {
        let size = self.sensor_state().size();
        check_matrix_shape(jacobian, size, size)?;
        jacobian.fill(0.0);
        jacobian.fill_diagonal(1.0);
        Ok(())
    }

    /// Measurement-noise covariance R (`measurement_size` square, symmetric
    /// positive-definite).
    fn noise_covariance(&self, covariance: &mut DMatrix<f64>) -> Result<()>;
}

/// Pre-resolved robot-state columns of one kinematic chain, either the
/// velocity or the acceleration layer.
///
/// Built once at sensor construction from the `RobotState` index map; the
/// per-cycle path only walks cached offsets.
#[derive(Clone, Debug)]
pub(crate) struct ChainColumns {
    base_angular: Option<usize>,
    base_linear: Option<usize>,
    joints: Vec<usize>,
}

impl ChainColumns {
    /// Resolve the velocity-layer columns for a chain.
    pub(crate) fn velocities(robot_state: &RobotState, joint_names: &[String]) -> Result<Self> {
        let (base_angular, base_linear) = if robot_state.is_floating() {
            (
                Some(robot_state.find_angular_velocity_index()?),
                Some(robot_state.find_linear_velocity_index()?),
            )
        } else {
            (None, None)
        };
        let joints = joint_names
            .iter()
            .map(|name| robot_state.find_joint_velocity_index(name))
            .collect::<Result<_>>()?;
        Ok(Self {
            base_angular,
            base_linear,
            joints,
        })
    }

    /// Resolve the acceleration-layer columns for a chain.
    pub(crate) fn accelerations(robot_state: &RobotState, joint_names: &[String]) -> Result<Self> {
        let (base_angular, base_linear) = if robot_state.is_floating() {
            (
                Some(robot_state.find_angular_acceleration_index()?),
                Some(robot_state.find_linear_acceleration_index()?),
            )
        } else {
            (None, None)
        };
        let joints = joint_names
            .iter()
            .map(|name| robot_state.find_joint_acceleration_index(name))
            .collect::<Result<_>>()?;
        Ok(Self {
            base_angular,
            base_linear,
            joints,
        })
    }

    /// Number of chain columns (6·floating + joints).
    pub(crate) fn dof(&self) -> usize {
        let base = if self.base_angular.is_some() { 6 } else { 0 };
        base + self.joints.len()
    }

    /// Add three rows of a chain-space block (starting at `first_row`) into
    /// the mapped robot-state columns of `destination`.
    ///
    /// `destination` is expected to be zeroed or partially accumulated by the
    /// caller; overlapping terms sum.
    pub(crate) fn accumulate_into(
        &self,
        block: &DMatrix<f64>,
        first_row: usize,
        destination: &mut DMatrix<f64>,
    ) {
        let mut source = 0;
        if let Some(index) = self.base_angular {
            for k in 0..3 {
                for r in 0..3 {
                    destination[(r, index + k)] += block[(first_row + r, source + k)];
                }
            }
            source += 3;
        }
        if let Some(index) = self.base_linear {
            for k in 0..3 {
                for r in 0..3 {
                    destination[(r, index + k)] += block[(first_row + r, source + k)];
                }
            }
            source += 3;
        }
        for &index in &self.joints {
            for r in 0..3 {
                destination[(r, index)] += block[(first_row + r, source)];
            }
            source += 1;
        }
    }

    /// Gather the mapped robot-state entries into a chain-ordered vector
    /// (e.g. the generalized velocity qd₀ a chain Jacobian multiplies).
    pub(crate) fn gather_from(&self, state: &DVector<f64>, out: &mut DVector<f64>) {
        let mut i = 0;
        if let Some(index) = self.base_angular {
            for k in 0..3 {
                out[i] = state[index + k];
                i += 1;
            }
        }
        if let Some(index) = self.base_linear {
            for k in 0..3 {
                out[i] = state[index + k];
                i += 1;
            }
        }
        for &index in &self.joints {
            out[i] = state[index];
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterMap;
    use crate::kinematics::RobotDescription;

    fn floating_robot() -> RobotState {
        RobotState::new(
            &RobotDescription::floating_base(vec!["hip".to_string(), "knee".to_string()]),
            0.001,
            &ParameterMap::new(),
        )
    }

    #[test]
    fn test_velocity_columns_resolve_base_and_joints() {
        let robot = floating_robot();
        let names = vec!["hip".to_string(), "knee".to_string()];
        let columns = ChainColumns::velocities(&robot, &names).unwrap();
        assert_eq!(columns.dof(), 8);

        // A block with a recognizable value per chain column lands in the
        // mapped state columns.
        let mut block = DMatrix::zeros(3, 8);
        for c in 0..8 {
            block[(0, c)] = (c + 1) as f64;
        }
        let mut destination = DMatrix::zeros(3, robot.size());
        columns.accumulate_into(&block, 0, &mut destination);

        let angular = robot.find_angular_velocity_index().unwrap();
        let linear = robot.find_linear_velocity_index().unwrap();
        assert_eq!(destination[(0, angular)], 1.0);
        assert_eq!(destination[(0, linear)], 4.0);
        let hip = robot.find_joint_velocity_index("hip").unwrap();
        let knee = robot.find_joint_velocity_index("knee").unwrap();
        assert_eq!(destination[(0, hip)], 7.0);
        assert_eq!(destination[(0, knee)], 8.0);
    }

    #[test]
    fn test_gather_is_inverse_of_accumulate_layout() {
        let robot = floating_robot();
        let names = vec!["hip".to_string(), "knee".to_string()];
        let columns = ChainColumns::velocities(&robot, &names).unwrap();

        let mut state = DVector::zeros(robot.size());
        let angular = robot.find_angular_velocity_index().unwrap();
        state[angular] = 1.5;
        let knee = robot.find_joint_velocity_index("knee").unwrap();
        state[knee] = -2.5;

        let mut gathered = DVector::zeros(columns.dof());
        columns.gather_from(&state, &mut gathered);
        assert_eq!(gathered[0], 1.5);
        assert_eq!(gathered[7], -2.5);
    }

    #[test]
    fn test_unknown_chain_joint_fails() {
        let robot = floating_robot();
        let names = vec!["hip".to_string(), "toe".to_string()];
        assert!(ChainColumns::velocities(&robot, &names).is_err());
    }
}
