//! Additively-composed state blocks of the estimator.
//!
//! Every block, whether the composite robot state, a per-sensor bias, or
//! nothing at all, satisfies the same [`State`] contract: it knows its size,
//! how to flatten/unflatten itself, how to time-propagate itself, and its own
//! linearized transition and process-noise models. The generic correction
//! step stacks blocks without knowing what they are.

pub mod bias;
pub mod empty;
pub mod joint;
pub mod robot;

pub use bias::BiasState;
pub use empty::EmptyState;
pub use joint::JointState;
pub use robot::RobotState;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;

/// One additively-composed block of the estimator state vector.
///
/// `predict` is pure state-to-state: it reads nothing external besides the
/// elapsed time fixed at construction, so flattening before predicting is
/// equivalent to predicting directly. All matrix operations write into
/// caller-supplied buffers of exactly the advertised size; a wrong shape is a
/// `DimensionMismatch` error, never a silent resize.
pub trait State {
    /// Number of scalars in this block.
    fn size(&self) -> usize;

    /// Write the flattened state into `vector` (length `size`).
    fn state_vector(&self, vector: &mut DVector<f64>) -> Result<()>;

    /// Absorb a corrected flattened state (length `size`).
    fn set_state_vector(&mut self, vector: &DVector<f64>) -> Result<()>;

    /// Advance this block to the next-time-step estimate in place.
    fn predict(&mut self);

    /// Linearized state evolution A with x(k+1) ≈ A·x(k); `size`×`size`.
    fn transition_matrix(&self, matrix: &mut DMatrix<f64>) -> Result<()>;

    /// Process-noise covariance Q; `size`×`size`.
    fn process_noise(&self, matrix: &mut DMatrix<f64>) -> Result<()>;
}
