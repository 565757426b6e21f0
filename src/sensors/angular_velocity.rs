use log::warn;
use nalgebra::{DMatrix, DVector, Vector3};

use super::{ChainColumns, Sensor};
use crate::config::{BiasConfig, Parameters, SensorConfig};
use crate::error::{FilterError, Result};
use crate::kinematics::KinematicChain;
use crate::math::{check_matrix_shape, check_vector_len};
use crate::state::{BiasState, EmptyState, RobotState, State};

/// Rate gyroscope rigidly attached to a chain body.
///
/// The model is linear in the state: the measured rate is the angular rows of
/// the chain's geometric Jacobian applied to the generalized velocity, plus
/// an optional slowly-drifting bias. The residual is computed against F·x
/// with the same F that is handed to the correction step.
pub struct AngularVelocitySensor {
    name: String,
    chain: Box<dyn KinematicChain>,
    columns: ChainColumns,
    measurement: Option<Vector3<f64>>,
    bias: Option<BiasState>,
    empty_state: EmptyState,
    variance: f64,
    chain_jacobian: DMatrix<f64>,
    state_scratch: DVector<f64>,
}

impl AngularVelocitySensor {
    pub fn new(
        name: &str,
        chain: Box<dyn KinematicChain>,
        robot_state: &RobotState,
        estimate_bias: bool,
        parameters: &dyn Parameters,
    ) -> Result<Self> {
        let columns = ChainColumns::velocities(robot_state, chain.joint_names())?;
        let dof = chain.degrees_of_freedom();
        if dof != columns.dof() {
            return Err(FilterError::Kinematics(format!(
                "chain for '{name}' reports {dof} DoF but the state layout maps {}",
                columns.dof()
            )));
        }
        let bias = estimate_bias.then(|| BiasState::new(BiasConfig::from_parameters(name, parameters)));
        Ok(Self {
            name: name.to_string(),
            chain,
            columns,
            measurement: None,
            bias,
            empty_state: EmptyState,
            variance: SensorConfig::from_parameters(name, parameters).covariance,
            chain_jacobian: DMatrix::zeros(6, dof),
            state_scratch: DVector::zeros(robot_state.size()),
        })
    }

    /// Feed the latest gyro reading, expressed in the sensor frame.
    pub fn set_measurement(&mut self, angular_velocity: Vector3<f64>) {
        self.measurement = Some(angular_velocity);
    }

    /// Current bias estimate, if bias estimation is enabled.
    pub fn bias(&self) -> Option<&Vector3<f64>> {
        self.bias.as_ref().map(BiasState::vector)
    }
}

impl Sensor for AngularVelocitySensor {
    fn measurement_size(&self) -> usize {
        3
    }

    fn sensor_state(&self) -> &dyn State {
        match &self.bias {
            Some(bias) => bias,
            None => &self.empty_state,
        }
    }

    fn sensor_state_mut(&mut self) -> &mut dyn State {
        match &mut self.bias {
            Some(bias) => bias,
            None => &mut self.empty_state,
        }
    }

    fn robot_jacobian_and_residual(
        &mut self,
        jacobian: &mut DMatrix<f64>,
        residual: &mut DVector<f64>,
        robot_state: &RobotState,
    ) -> Result<()> {
        check_matrix_shape(jacobian, 3, robot_state.size())?;
        check_vector_len(residual, 3)?;
        let Some(measurement) = self.measurement else {
            warn!("angular velocity sensor '{}' polled before first measurement", self.name);
            return Err(FilterError::UninitializedMeasurement(self.name.clone()));
        };

        self.chain.compute_jacobian(&mut self.chain_jacobian)?;
        jacobian.fill(0.0);
        self.columns.accumulate_into(&self.chain_jacobian, 0, jacobian);

        // residual = z - F x - bias, with the already-linearized F.
        robot_state.state_vector(&mut self.state_scratch)?;
        residual.gemv(1.0, jacobian, &self.state_scratch, 0.0);
        for axis in 0..3 {
            residual[axis] = measurement[axis] - residual[axis];
            if let Some(bias) = &self.bias {
                residual[axis] -= bias.bias(axis);
            }
        }
        Ok(())
    }

    fn noise_covariance(&self, covariance: &mut DMatrix<f64>) -> Result<()> {
        check_matrix_shape(covariance, 3, 3)?;
        covariance.fill(0.0);
        covariance.fill_diagonal(self.variance);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParameterMap;
    use crate::kinematics::RobotDescription;
    use crate::sensors::test_utils::ScriptedChain;
    use approx::assert_relative_eq;

    fn fixed_robot() -> RobotState {
        RobotState::new(
            &RobotDescription::fixed_base(vec!["knee".to_string()]),
            0.001,
            &ParameterMap::new(),
        )
    }

    #[test]
    fn test_residual_against_jacobian_times_velocity() {
        let mut robot = fixed_robot();
        robot.joint_mut("knee").unwrap().set_velocity(2.0);

        // Revolute joint about the sensor z axis.
        let mut chain = ScriptedChain::fixed(&["knee"]);
        chain.jacobian[(2, 0)] = 1.0;

        let mut sensor = AngularVelocitySensor::new(
            "gyro",
            Box::new(chain),
            &robot,
            false,
            &ParameterMap::new(),
        )
        .unwrap();
        sensor.set_measurement(Vector3::new(0.3, -0.2, 2.5));

        let mut jacobian = DMatrix::zeros(3, robot.size());
        let mut residual = DVector::zeros(3);
        sensor
            .robot_jacobian_and_residual(&mut jacobian, &mut residual, &robot)
            .unwrap();

        assert_relative_eq!(residual[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(residual[1], -0.2, epsilon = 1e-12);
        assert_relative_eq!(residual[2], 2.5 - 2.0, epsilon = 1e-12);

        let velocity_index = robot.find_joint_velocity_index("knee").unwrap();
        assert_eq!(jacobian[(2, velocity_index)], 1.0);
        assert_eq!(jacobian[(0, velocity_index)], 0.0);
    }

    #[test]
    fn test_floating_base_columns_land_at_velocity_indices() {
        let robot = RobotState::new(
            &RobotDescription::floating_base(vec!["hip".to_string()]),
            0.001,
            &ParameterMap::new(),
        );

        let mut chain = ScriptedChain::floating(&["hip"]);
        for c in 0..7 {
            chain.jacobian[(0, c)] = (c + 1) as f64;
        }

        let mut sensor = AngularVelocitySensor::new(
            "gyro",
            Box::new(chain),
            &robot,
            false,
            &ParameterMap::new(),
        )
        .unwrap();
        sensor.set_measurement(Vector3::zeros());

        let mut jacobian = DMatrix::zeros(3, robot.size());
        let mut residual = DVector::zeros(3);
        sensor
            .robot_jacobian_and_residual(&mut jacobian, &mut residual, &robot)
            .unwrap();

        let angular = robot.find_angular_velocity_index().unwrap();
        let linear = robot.find_linear_velocity_index().unwrap();
        let hip = robot.find_joint_velocity_index("hip").unwrap();
        assert_eq!(jacobian[(0, angular)], 1.0);
        assert_eq!(jacobian[(0, linear)], 4.0);
        assert_eq!(jacobian[(0, hip)], 7.0);
    }

    #[test]
    fn test_bias_is_subtracted_from_residual() {
        let robot = fixed_robot();
        let chain = ScriptedChain::fixed(&["knee"]);
        let mut sensor = AngularVelocitySensor::new(
            "gyro",
            Box::new(chain),
            &robot,
            true,
            &ParameterMap::new(),
        )
        .unwrap();
        assert_eq!(sensor.sensor_state().size(), 3);
        sensor
            .sensor_state_mut()
            .set_state_vector(&DVector::from_column_slice(&[0.1, 0.2, -0.3]))
            .unwrap();
        sensor.set_measurement(Vector3::new(1.0, 1.0, 1.0));

        let mut jacobian = DMatrix::zeros(3, robot.size());
        let mut residual = DVector::zeros(3);
        sensor
            .robot_jacobian_and_residual(&mut jacobian, &mut residual, &robot)
            .unwrap();

        assert_relative_eq!(residual[0], 0.9, epsilon = 1e-12);
        assert_relative_eq!(residual[1], 0.8, epsilon = 1e-12);
        assert_relative_eq!(residual[2], 1.3, epsilon = 1e-12);
    }

    #[test]
    fn test_chain_dof_mismatch_rejected() {
        let robot = fixed_robot();
        // Chain claims a floating base the state does not have.
        let chain = ScriptedChain::floating(&["knee"]);
        assert!(AngularVelocitySensor::new(
            "gyro",
            Box::new(chain),
            &robot,
            false,
            &ParameterMap::new()
        )
        .is_err());
    }

    #[test]
    fn test_uninitialized_measurement_fails() {
        let robot = fixed_robot();
        let chain = ScriptedChain::fixed(&["knee"]);
        let mut sensor = AngularVelocitySensor::new(
            "gyro",
            Box::new(chain),
            &robot,
            false,
            &ParameterMap::new(),
        )
        .unwrap();
        let mut jacobian = DMatrix::zeros(3, robot.size());
        let mut residual = DVector::zeros(3);
        assert!(matches!(
            sensor.robot_jacobian_and_residual(&mut jacobian, &mut residual, &robot),
            Err(FilterError::UninitializedMeasurement(_))
        ));
    }

    #[test]
    fn test_noise_covariance_from_parameters() {
        let robot = fixed_robot();
        let chain = ScriptedChain::fixed(&["knee"]);
        let params = ParameterMap::new().with("gyro_covariance", 0.04);
        let sensor =
            AngularVelocitySensor::new("gyro", Box::new(chain), &robot, false, &params).unwrap();

        let mut r = DMatrix::zeros(3, 3);
        sensor.noise_covariance(&mut r).unwrap();
        for i in 0..3 {
            assert_eq!(r[(i, i)], 0.04);
        }
        assert_eq!(r[(0, 1)], 0.0);
    }
}
