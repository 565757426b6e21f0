use log::warn;
use nalgebra::{DMatrix, DVector, Vector3, Vector6};

use super::{ChainColumns, Sensor};
use crate::config::{BiasConfig, Parameters, SensorConfig};
use crate::error::{FilterError, Result};
use crate::kinematics::KinematicChain;
use crate::math::{check_matrix_shape, check_vector_len, cross_product_jacobian_into, skew};
use crate::state::{BiasState, EmptyState, RobotState, State};

/// Accelerometer rigidly attached to a chain body.
///
/// The measurement, expressed in the sensor frame, is the sum of four terms:
///
/// 1. `J_lin · qdd`: the linear rows of the chain Jacobian applied to the
///    generalized acceleration;
/// 2. `Jd_lin · qd`: the convective contribution, linearized through a
///    finite difference of the linear Jacobian rows against the previous
///    filter cycle;
/// 3. `ω × v`: the centrifugal term from the sensor-frame twist, linearized
///    as `skew(J_ang·qd₀)·J_lin − skew(J_lin·qd₀)·J_ang`;
/// 4. `R_ws · g_world`: gravity rotated into the sensor frame, contributing
///    orientation columns (floating base only) through `skew(g_sensor)·R_ws`.
///
/// An optional additive bias is subtracted from the residual like the gyro's.
pub struct LinearAccelerationSensor {
    name: String,
    chain: Box<dyn KinematicChain>,
    velocity_columns: ChainColumns,
    acceleration_columns: ChainColumns,
    orientation_index: Option<usize>,
    measurement: Option<Vector3<f64>>,
    bias: Option<BiasState>,
    empty_state: EmptyState,
    variance: f64,
    dt: f64,
    // Finite-difference cache: linear Jacobian rows from the previous cycle.
    previous_linear: DMatrix<f64>,
    has_previous: bool,
    // Per-cycle scratch, sized once at construction.
    chain_jacobian: DMatrix<f64>,
    angular_block: DMatrix<f64>,
    linear_block: DMatrix<f64>,
    jacobian_rate: DMatrix<f64>,
    centrifugal_jacobian: DMatrix<f64>,
    qd0: DVector<f64>,
    qdd0: DVector<f64>,
    state_scratch: DVector<f64>,
}

impl LinearAccelerationSensor {
    pub fn new(
        name: &str,
        chain: Box<dyn KinematicChain>,
        robot_state: &RobotState,
        estimate_bias: bool,
        parameters: &dyn Parameters,
    ) -> Result<Self> {
        let velocity_columns = ChainColumns::velocities(robot_state, chain.joint_names())?;
        let acceleration_columns = ChainColumns::accelerations(robot_state, chain.joint_names())?;
        let dof = chain.degrees_of_freedom();
        if dof != velocity_columns.dof() {
            return Err(FilterError::Kinematics(format!(
                "chain for '{name}' reports {dof} DoF but the state layout maps {}",
                velocity_columns.dof()
            )));
        }
        let orientation_index = if robot_state.is_floating() {
            Some(robot_state.find_orientation_index()?)
        } else {
            None
        };
        let bias =
            estimate_bias.then(|| BiasState::new(BiasConfig::from_parameters(name, parameters)));
        Ok(Self {
            name: name.to_string(),
            chain,
            velocity_columns,
            acceleration_columns,
            orientation_index,
            measurement: None,
            bias,
            empty_state: EmptyState,
            variance: SensorConfig::from_parameters(name, parameters).covariance,
            dt: robot_state.time_step(),
            previous_linear: DMatrix::zeros(3, dof),
            has_previous: false,
            chain_jacobian: DMatrix::zeros(6, dof),
            angular_block: DMatrix::zeros(3, dof),
            linear_block: DMatrix::zeros(3, dof),
            jacobian_rate: DMatrix::zeros(3, dof),
            centrifugal_jacobian: DMatrix::zeros(3, dof),
            qd0: DVector::zeros(dof),
            qdd0: DVector::zeros(dof),
            state_scratch: DVector::zeros(robot_state.size()),
        })
    }

    /// Feed the latest accelerometer reading, expressed in the sensor frame.
    pub fn set_measurement(&mut self, linear_acceleration: Vector3<f64>) {
        self.measurement = Some(linear_acceleration);
    }

    /// Current bias estimate, if bias estimation is enabled.
    pub fn bias(&self) -> Option<&Vector3<f64>> {
        self.bias.as_ref().map(BiasState::vector)
    }
}

impl Sensor for LinearAccelerationSensor {
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
            warn!(
                "linear acceleration sensor '{}' polled before first measurement",
                self.name
            );
            return Err(FilterError::UninitializedMeasurement(self.name.clone()));
        };

        let n = self.qd0.len();
        robot_state.state_vector(&mut self.state_scratch)?;
        self.velocity_columns.gather_from(&self.state_scratch, &mut self.qd0);
        self.acceleration_columns.gather_from(&self.state_scratch, &mut self.qdd0);

        self.chain.compute_jacobian(&mut self.chain_jacobian)?;
        for c in 0..n {
            for r in 0..3 {
                self.angular_block[(r, c)] = self.chain_jacobian[(r, c)];
                self.linear_block[(r, c)] = self.chain_jacobian[(r + 3, c)];
            }
        }

        // Convective linearization by finite difference; zero until a
        // previous Jacobian exists.
        if self.has_previous {
            for c in 0..n {
                for r in 0..3 {
                    self.jacobian_rate[(r, c)] =
                        (self.linear_block[(r, c)] - self.previous_linear[(r, c)]) / self.dt;
                }
            }
        } else {
            self.jacobian_rate.fill(0.0);
        }
        self.previous_linear.copy_from(&self.linear_block);
        self.has_previous = true;

        cross_product_jacobian_into(
            &self.angular_block,
            &self.linear_block,
            &self.qd0,
            &mut self.centrifugal_jacobian,
        )?;

        jacobian.fill(0.0);
        self.acceleration_columns
            .accumulate_into(&self.chain_jacobian, 3, jacobian);
        self.velocity_columns
            .accumulate_into(&self.jacobian_rate, 0, jacobian);
        self.velocity_columns
            .accumulate_into(&self.centrifugal_jacobian, 0, jacobian);

        let transform = self.chain.world_to_sensor()?;
        let g_sensor = transform.rotation * Vector3::new(0.0, 0.0, robot_state.gravity());
        if let Some(orientation) = self.orientation_index {
            let gravity_jacobian = skew(&g_sensor) * transform.rotation;
            for c in 0..3 {
                for r in 0..3 {
                    jacobian[(r, orientation + c)] += gravity_jacobian[(r, c)];
                }
            }
        }

        // Model prediction at the linearization point: J_lin·qdd plus the
        // exact convective, centrifugal and gravity terms from the chain.
        let mut convective = Vector6::zeros();
        self.chain.compute_convective_term(&mut convective)?;
        let twist = self.chain.twist()?;
        let omega = Vector3::new(twist[0], twist[1], twist[2]);
        let v = Vector3::new(twist[3], twist[4], twist[5]);
        let centrifugal = omega.cross(&v);

        for axis in 0..3 {
            let mut predicted = g_sensor[axis] + convective[3 + axis] + centrifugal[axis];
            for c in 0..n {
                predicted += self.linear_block[(axis, c)] * self.qdd0[c];
            }
            residual[axis] = measurement[axis] - predicted;
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
