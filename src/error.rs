//! Error types for the filter core.
//!
//! Every failure here is a hard, synchronous failure of the current filter
//! cycle. The core has no notion of a transient error: all computation is
//! deterministic algebra over already-validated inputs, so nothing is retried
//! internally. A malformed cycle should abort its correction rather than
//! apply a partially computed update.

use thiserror::Error;

/// Filter core error type
#[derive(Error, Debug)]
pub enum FilterError {
    /// Lookup by name on a joint that is not part of the robot topology.
    /// A configuration-time or logic error, never expected in steady state.
    #[error("unknown joint: {0}")]
    UnknownJoint(String),

    /// A floating-base index was requested on a fixed-base robot.
    #[error("robot base is fixed, floating-base indices are undefined")]
    NotFloating,

    /// A caller-supplied buffer has the wrong shape. Indicates a collaborator
    /// or orchestration bug, not a runtime condition.
    #[error("dimension mismatch: expected {expected_rows}x{expected_cols}, got {actual_rows}x{actual_cols}")]
    DimensionMismatch {
        expected_rows: usize,
        expected_cols: usize,
        actual_rows: usize,
        actual_cols: usize,
    },

    /// A sensor residual was requested before the first `set_measurement`
    /// call. Callers must seed every active sensor before the first
    /// correction cycle.
    #[error("sensor '{0}' polled before its first measurement")]
    UninitializedMeasurement(String),

    /// Failure reported by the forward-kinematics collaborator.
    #[error("kinematics error: {0}")]
    Kinematics(String),
}

pub type Result<T> = std::result::Result<T, FilterError>;
