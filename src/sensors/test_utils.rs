//! Scripted kinematic chains for sensor unit tests.

use std::collections::VecDeque;

use nalgebra::{DMatrix, Vector6};

use crate::error::Result;
use crate::kinematics::{FrameTransform, KinematicChain};
use crate::math::check_matrix_shape;

/// A [`KinematicChain`] whose outputs are set directly by the test.
///
/// `compute_jacobian` serves the current `jacobian`, consuming one entry of
/// `queued_jacobians` first if any are scripted; that is how tests drive the
/// accelerometer's finite-difference cache across cycles.
pub struct ScriptedChain {
    joint_names: Vec<String>,
    pub jacobian: DMatrix<f64>,
    pub queued_jacobians: VecDeque<DMatrix<f64>>,
    pub convective_term: Vector6<f64>,
    pub twist: Vector6<f64>,
    pub world_to_sensor: FrameTransform,
}

impl ScriptedChain {
    /// Chain rooted at a fixed base: one column per joint.
    pub fn fixed(joint_names: &[&str]) -> Self {
        Self::with_dof(joint_names, joint_names.len())
    }

    /// Chain rooted at a floating base: six base columns then the joints.
    pub fn floating(joint_names: &[&str]) -> Self {
        Self::with_dof(joint_names, 6 + joint_names.len())
    }

    fn with_dof(joint_names: &[&str], dof: usize) -> Self {
        Self {
            joint_names: joint_names.iter().map(|name| name.to_string()).collect(),
            jacobian: DMatrix::zeros(6, dof),
            queued_jacobians: VecDeque::new(),
            convective_term: Vector6::zeros(),
            twist: Vector6::zeros(),
            world_to_sensor: FrameTransform::identity(),
        }
    }
}

impl KinematicChain for ScriptedChain {
    fn degrees_of_freedom(&self) -> usize {
        self.jacobian.ncols()
    }

    fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    fn compute_jacobian(&mut self, jacobian: &mut DMatrix<f64>) -> Result<()> {
        if let Some(next) = self.queued_jacobians.pop_front() {
            self.jacobian = next;
        }
        check_matrix_shape(jacobian, 6, self.jacobian.ncols())?;
        jacobian.copy_from(&self.jacobian);
        Ok(())
    }

    fn compute_convective_term(&mut self, term: &mut Vector6<f64>) -> Result<()> {
        *term = self.convective_term;
        Ok(())
    }

    fn twist(&mut self) -> Result<Vector6<f64>> {
        Ok(self.twist)
    }

    fn world_to_sensor(&mut self) -> Result<FrameTransform> {
        Ok(self.world_to_sensor)
    }
}
