use log::warn;
use nalgebra::{DMatrix, DVector};

use super::Sensor;
use crate::config::SensorConfig;
use crate::error::{FilterError, Result};
use crate::math::{check_matrix_shape, check_vector_len};
use crate::state::{EmptyState, RobotState, State};

/// Joint encoder measuring a single joint's position directly.
///
/// The model is `h(x) = q_j`, so the Jacobian is a one-hot row at the
/// joint's position index. This is the baseline sensor used to validate the
/// framework.
pub struct JointPositionSensor {
    joint_name: String,
    position_index: usize,
    measurement: Option<f64>,
    variance: f64,
    empty_state: EmptyState,
}

impl JointPositionSensor {
    pub fn new(joint_name: &str, robot_state: &RobotState, config: SensorConfig) -> Result<Self> {
        let position_index = robot_state.find_joint_position_index(joint_name)?;
        Ok(Self {
            joint_name: joint_name.to_string(),
            position_index,
            measurement: None,
            variance: config.covariance,
            empty_state: EmptyState,
        })
    }

    /// Feed the latest encoder reading.
    pub fn set_measurement(&mut self, joint_position: f64) {
        self.measurement = Some(joint_position);
    }
}

impl Sensor for JointPositionSensor {
    fn measurement_size(&self) -> usize {
        1
    }

    fn sensor_state(&self) -> &dyn State {
        &self.empty_state
    }

    fn sensor_state_mut(&mut self) -> &mut dyn State {
        &mut self.empty_state
    }

    fn robot_jacobian_and_residual(
        &mut self,
        jacobian: &mut DMatrix<f64>,
        residual: &mut DVector<f64>,
        robot_state: &RobotState,
    ) -> Result<()> {
        check_matrix_shape(jacobian, 1, robot_state.size())?;
        check_vector_len(residual, 1)?;
        let Some(measurement) = self.measurement else {
            warn!(
                "joint position sensor '{}' polled before first measurement",
                self.joint_name
            );
            return Err(FilterError::UninitializedMeasurement(
                self.joint_name.clone(),
            ));
        };

        jacobian.fill(0.0);
        jacobian[(0, self.position_index)] = 1.0;

        let q = robot_state.joint(&self.joint_name)?.position();
        residual[0] = measurement - q;
        Ok(())
    }

    fn noise_covariance(&self, covariance: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(covariance, 1, 1)?;
        covariance[(0, 0)] = self.variance;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterMap;
    use crate::kinematics::RobotDescription;
    use approx::assert_relative_eq;

    fn robot() -> RobotState {
        RobotState::new(
            &RobotDescription::fixed_base(vec!["shoulder".to_string(), "elbow".to_string()]),
            0.001,
            &ParameterMap::new(),
        )
    }

    #[test]
    fn test_residual_and_one_hot_jacobian() {
        let mut robot = robot();
        robot.joint_mut("elbow").unwrap().set_position(1.2);

        let mut sensor =
            JointPositionSensor::new("elbow", &robot, SensorConfig { covariance: 1e-6 }).unwrap();
        sensor.set_measurement(1.5);

        let mut jacobian = DMatrix::zeros(1, robot.size());
        let mut residual = DVector::zeros(1);
        sensor
            .robot_jacobian_and_residual(&mut jacobian, &mut residual, &robot)
            .unwrap();

        assert_relative_eq!(residual[0], 0.3, epsilon = 1e-12);
        let position_index = robot.find_joint_position_index("elbow").unwrap();
        for c in 0..robot.size() {
            let expected = if c == position_index { 1.0 } else { 0.0 };
            assert_eq!(jacobian[(0, c)], expected);
        }
    }

    #[test]
    fn test_unknown_joint_at_construction() {
        let robot = robot();
        assert!(JointPositionSensor::new("wrist", &robot, SensorConfig::default()).is_err());
    }

    #[test]
    fn test_uninitialized_measurement_fails() {
        let robot = robot();
        let mut sensor =
            JointPositionSensor::new("elbow", &robot, SensorConfig::default()).unwrap();
        let mut jacobian = DMatrix::zeros(1, robot.size());
        let mut residual = DVector::zeros(1);
        assert!(matches!(
            sensor.robot_jacobian_and_residual(&mut jacobian, &mut residual, &robot),
            Err(FilterError::UninitializedMeasurement(_))
        ));
    }

    #[test]
    fn test_own_state_is_empty_and_r_is_scalar() {
        let robot = robot();
        let sensor =
            JointPositionSensor::new("shoulder", &robot, SensorConfig { covariance: 0.25 })
                .unwrap();
        assert_eq!(sensor.sensor_state().size(), 0);

        let mut own = DMatrix::zeros(0, 0);
        sensor.sensor_jacobian(&mut own).unwrap();

        let mut r = DMatrix::zeros(1, 1);
        sensor.noise_covariance(&mut r).unwrap();
        assert_eq!(r[(0, 0)], 0.25);
    }
}
