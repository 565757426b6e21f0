//! Interfaces to the forward-kinematics collaborator and the robot topology
//! description.
//!
//! The filter core never computes kinematics itself. Each IMU sensor owns one
//! pre-configured [`KinematicChain`] (base body → sensor body, expressed in
//! the sensor frame) and consumes its Jacobian, convective term, twist and
//! frame transform. Implementations are supplied by the hosting estimator.

use nalgebra::{DMatrix, Matrix3, Vector3, Vector6};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default gravitational acceleration constant (m/s²), the magnitude of the
/// rest reading of an accelerometer along +z world.
pub const DEFAULT_GRAVITY: f64 = 9.81;

/// Rigid transform between two frames.
#[derive(Clone, Copy, Debug)]
pub struct FrameTransform {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl FrameTransform {
    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

/// Geometric-Jacobian provider for one kinematic chain.
///
/// Conventions, fixed for the lifetime of a chain:
/// - the Jacobian is 6×N with angular rows 0–2 and linear rows 3–5,
///   expressed in the sensor frame;
/// - when the chain root is a floating base its six columns come first
///   (angular 0–2, linear 3–5), followed by one column per one-DoF joint in
///   [`joint_names`](Self::joint_names) order, so
///   N = 6·floating + joint count.
///
/// Methods take `&mut self` so implementations may keep scratch buffers.
pub trait KinematicChain {
    /// Number of Jacobian columns N.
    fn degrees_of_freedom(&self) -> usize;

    /// One-DoF joints from the chain root to the sensor body, in Jacobian
    /// column order.
    fn joint_names(&self) -> &[String];

    /// Write the 6×N geometric Jacobian into `jacobian`.
    fn compute_jacobian(&mut self, jacobian: &mut DMatrix<f64>) -> Result<()>;

    /// Write the convective term (Jacobian-time-derivative × velocity
    /// contribution to acceleration) into `term`, angular then linear.
    fn compute_convective_term(&mut self, term: &mut Vector6<f64>) -> Result<()>;

    /// Current twist of the sensor frame, angular then linear.
    fn twist(&mut self) -> Result<Vector6<f64>>;

    /// Transform from the root/world frame to the sensor frame.
    fn world_to_sensor(&mut self) -> Result<FrameTransform>;
}

/// Robot topology input consumed by `RobotState` construction: the actuated
/// joint set in a stable traversal order, the floating/fixed-base flag and
/// the signed gravity constant used by the sensor models.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RobotDescription {
    pub joint_names: Vec<String>,
    pub floating: bool,
    pub gravity: f64,
}

impl RobotDescription {
    pub fn fixed_base(joint_names: Vec<String>) -> Self {
        Self {
            joint_names,
            floating: false,
            gravity: DEFAULT_GRAVITY,
        }
    }

    pub fn floating_base(joint_names: Vec<String>) -> Self {
        Self {
            joint_names,
            floating: true,
            gravity: DEFAULT_GRAVITY,
        }
    }
}
