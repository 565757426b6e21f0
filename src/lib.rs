//! State composition and measurement models for an extended Kalman filter
//! estimating the whole-body state of a legged robot.
//!
//! Two small hierarchies make up the crate:
//!
//! - [`state`]: estimated quantities that know their own size, flattening,
//!   prediction and noise. [`state::RobotState`] composes an optional
//!   floating-base block with per-joint `{q, qd, qdd}` blocks and owns the
//!   name-to-index map every sensor resolves its columns through.
//! - [`sensors`]: measurement sources that turn a raw reading plus the
//!   current robot state into a residual/Jacobian pair. Joint encoders are
//!   linear; the gyro and accelerometer linearize rigid-body kinematics
//!   through a [`kinematics::KinematicChain`] supplied by the host.
//!
//! The generic correction step stacks these blocks; nothing here hard-codes
//! a robot topology. Per cycle: `predict()` every state, poll every sensor
//! once, correct.

pub mod config;
pub mod error;
pub mod kinematics;
pub mod math;
pub mod sensors;
pub mod state;

pub use config::{ParameterMap, Parameters};
pub use error::{FilterError, Result};
pub use kinematics::{FrameTransform, KinematicChain, RobotDescription};
pub use sensors::{
    AngularVelocitySensor, JointPositionSensor, LinearAccelerationSensor, Sensor,
};
pub use state::{BiasState, EmptyState, JointState, RobotState, State};
