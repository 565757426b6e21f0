//! Tunable noise parameters for states and sensors.
//!
//! Two access styles are supported. Plain config structs with `Default`
//! carry the variances each state or sensor needs at construction. The
//! [`Parameters`] trait layers a pull-based, name-keyed lookup on top so a
//! deployment can override individual tunables (per joint, per sensor)
//! without new config types; `from_parameters` constructors fall back to the
//! defaults for every name that is absent.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Pull-based access to named tunable scalars.
///
/// Values are read once per state/sensor construction; re-reading live is
/// allowed but the core never does it inside the per-cycle path.
pub trait Parameters {
    fn value(&self, name: &str) -> Option<f64>;
}

/// In-memory [`Parameters`] store.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ParameterMap {
    values: HashMap<String, f64>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Builder-style variant of [`set`](Self::set).
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.values.insert(name.into(), value);
        self
    }
}

impl Parameters for ParameterMap {
    fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }
}

/// Process-noise variances for a single joint state.
///
/// The largest variance sits on the highest-order tracked derivative: the
/// acceleration absorbs the unmodeled actuation, position and velocity only
/// the integration slack.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct JointStateConfig {
    /// Position process variance (rad²)
    pub position_variance: f64,
    /// Velocity process variance (rad²/s²)
    pub velocity_variance: f64,
    /// Acceleration process variance (rad²/s⁴)
    pub acceleration_variance: f64,
}

impl Default for JointStateConfig {
    fn default() -> Self {
        Self {
            position_variance: 1e-5,
            velocity_variance: 1e-3,
            acceleration_variance: 1.0,
        }
    }
}

impl JointStateConfig {
    /// Look up `<joint>_position_variance`, `<joint>_velocity_variance` and
    /// `<joint>_acceleration_variance`, defaulting each missing name.
    pub fn from_parameters(joint_name: &str, parameters: &dyn Parameters) -> Self {
        let defaults = Self::default();
        Self {
            position_variance: parameters
                .value(&format!("{joint_name}_position_variance"))
                .unwrap_or(defaults.position_variance),
            velocity_variance: parameters
                .value(&format!("{joint_name}_velocity_variance"))
                .unwrap_or(defaults.velocity_variance),
            acceleration_variance: parameters
                .value(&format!("{joint_name}_acceleration_variance"))
                .unwrap_or(defaults.acceleration_variance),
        }
    }
}

/// Process-noise variances for the floating-base block, one per sub-vector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FloatingBaseConfig {
    pub orientation_variance: f64,
    pub position_variance: f64,
    pub angular_velocity_variance: f64,
    pub linear_velocity_variance: f64,
    pub angular_acceleration_variance: f64,
    pub linear_acceleration_variance: f64,
}

impl Default for FloatingBaseConfig {
    fn default() -> Self {
        Self {
            orientation_variance: 1e-5,
            position_variance: 1e-5,
            angular_velocity_variance: 1e-3,
            linear_velocity_variance: 1e-3,
            angular_acceleration_variance: 1.0,
            linear_acceleration_variance: 1.0,
        }
    }
}

impl FloatingBaseConfig {
    /// Look up `base_orientation_variance` etc., defaulting missing names.
    pub fn from_parameters(parameters: &dyn Parameters) -> Self {
        let defaults = Self::default();
        let get = |name: &str, default: f64| parameters.value(name).unwrap_or(default);
        Self {
            orientation_variance: get("base_orientation_variance", defaults.orientation_variance),
            position_variance: get("base_position_variance", defaults.position_variance),
            angular_velocity_variance: get(
                "base_angular_velocity_variance",
                defaults.angular_velocity_variance,
            ),
            linear_velocity_variance: get(
                "base_linear_velocity_variance",
                defaults.linear_velocity_variance,
            ),
            angular_acceleration_variance: get(
                "base_angular_acceleration_variance",
                defaults.angular_acceleration_variance,
            ),
            linear_acceleration_variance: get(
                "base_linear_acceleration_variance",
                defaults.linear_acceleration_variance,
            ),
        }
    }
}

/// Random-walk process variance of a sensor bias state.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BiasConfig {
    /// Per-axis bias drift variance
    pub variance: f64,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self { variance: 1e-6 }
    }
}

impl BiasConfig {
    /// Look up `<sensor>_bias_variance`, defaulting when absent.
    pub fn from_parameters(sensor_name: &str, parameters: &dyn Parameters) -> Self {
        Self {
            variance: parameters
                .value(&format!("{sensor_name}_bias_variance"))
                .unwrap_or(Self::default().variance),
        }
    }
}

/// Isotropic measurement-noise variance of one sensor.
///
/// A single scalar scaled onto the identity; a full per-axis diagonal stays
/// possible at the assembly site, isotropic is the default.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SensorConfig {
    pub covariance: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self { covariance: 1.0 }
    }
}

impl SensorConfig {
    /// Look up `<sensor>_covariance`, defaulting when absent.
    pub fn from_parameters(sensor_name: &str, parameters: &dyn Parameters) -> Self {
        Self {
            covariance: parameters
                .value(&format!("{sensor_name}_covariance"))
                .unwrap_or(Self::default().covariance),
        }
    }
}
