//! Actuator model variants and their default gain profiles.
//!
//! Each simulated actuator belongs to a model class (torque/size variant).
//! The model is resolved once at joint creation — by probing the physics
//! world for a `"<joint>/<MODEL>"` handle — and maps to a [`GainProfile`]:
//! per-axis PID gains, a feed-forward scale, and output force clamp bounds.
//!
//! Clamp bounds are a safety backstop sized from each model's peak torque,
//! not a tuning parameter; tuning is carried entirely in the gain values.

use servosim_types::{AxisSettings, JointSettings};

// ────────────────────────────────────────────────────────────────────────────
// Actuator models
// ────────────────────────────────────────────────────────────────────────────

/// Known actuator model classes, plus a [`Generic`][Self::Generic] fallback
/// for unrecognised variants so a new model still participates in control
/// (degraded but non-fatal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum ActuatorModel {
    X5_1,
    X5_4,
    X5_9,
    X8_3,
    X8_9,
    X8_16,
    /// Fallback profile for unrecognised model identifiers.
    Generic,
}

impl ActuatorModel {
    /// Probe order used when resolving which model variant a joint carries.
    pub const PROBE_ORDER: [ActuatorModel; 6] = [
        Self::X5_1,
        Self::X5_4,
        Self::X5_9,
        Self::X8_3,
        Self::X8_9,
        Self::X8_16,
    ];

    /// Parse a model identifier token. Returns `None` for unknown tokens;
    /// the caller decides whether to fall back to [`Self::Generic`].
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "X5_1" => Some(Self::X5_1),
            "X5_4" => Some(Self::X5_4),
            "X5_9" => Some(Self::X5_9),
            "X8_3" => Some(Self::X8_3),
            "X8_9" => Some(Self::X8_9),
            "X8_16" => Some(Self::X8_16),
            _ => None,
        }
    }

    /// The identifier token used in physics joint keys.
    pub fn token(&self) -> &'static str {
        match self {
            Self::X5_1 => "X5_1",
            Self::X5_4 => "X5_4",
            Self::X5_9 => "X5_9",
            Self::X8_3 => "X8_3",
            Self::X8_9 => "X8_9",
            Self::X8_16 => "X8_16",
            Self::Generic => "GENERIC",
        }
    }

    /// True for the geared X8 family, which uses a reduced feed-forward
    /// scale.
    pub fn is_x8(&self) -> bool {
        matches!(self, Self::X8_3 | Self::X8_9 | Self::X8_16)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Gain profiles
// ────────────────────────────────────────────────────────────────────────────

/// PID gains and feed-forward gain for one control axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub feed_forward: f64,
}

impl AxisGains {
    const fn p_only(kp: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
            feed_forward: 0.0,
        }
    }

    const fn with_feed_forward(kp: f64, feed_forward: f64) -> Self {
        Self {
            kp,
            ki: 0.0,
            kd: 0.0,
            feed_forward,
        }
    }
}

/// Effective control parameters for one joint: per-axis gains, feed-forward
/// scale, and the output force clamp `[force_min, force_max]`.
///
/// Profiles are plain values; joints of the same model start from the same
/// default profile and diverge only through explicit settings changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainProfile {
    pub position: AxisGains,
    pub velocity: AxisGains,
    pub effort: AxisGains,
    /// Multiplier applied to every axis' feed-forward term.
    pub feed_forward_scale: f64,
    /// Lower output clamp bound, N·m.
    pub force_min: f64,
    /// Upper output clamp bound, N·m.
    pub force_max: f64,
}

impl GainProfile {
    /// Resolve the default profile for `model`. Pure lookup, no side
    /// effects.
    ///
    /// Clamp bounds are the model's peak torque; the generic fallback is
    /// deliberately conservative (unit gain, ±1 N·m).
    pub fn for_model(model: ActuatorModel) -> Self {
        let (position_kp, peak_torque) = match model {
            ActuatorModel::X5_1 => (5.0, 2.5),
            ActuatorModel::X5_4 => (10.0, 4.5),
            ActuatorModel::X5_9 => (15.0, 9.0),
            ActuatorModel::X8_3 => (15.0, 20.0),
            ActuatorModel::X8_9 => (20.0, 20.0),
            ActuatorModel::X8_16 => (25.0, 38.0),
            ActuatorModel::Generic => (1.0, 1.0),
        };
        Self {
            position: AxisGains::p_only(position_kp),
            velocity: AxisGains::with_feed_forward(0.1, 1.0),
            effort: AxisGains::with_feed_forward(0.25, 1.0),
            feed_forward_scale: if model.is_x8() { 0.25 } else { 1.0 },
            force_min: -peak_torque,
            force_max: peak_torque,
        }
    }

    /// Overwrite the fields named by `settings`, leaving the rest intact.
    ///
    /// Controller state is untouched by design: a gain change must be
    /// bumpless, so the integral term carries across it.
    pub fn apply(&mut self, settings: &JointSettings) {
        apply_axis(&mut self.position, &settings.position);
        apply_axis(&mut self.velocity, &settings.velocity);
        apply_axis(&mut self.effort, &settings.effort);
        if let Some((low, high)) = settings.force_limits {
            self.force_min = low;
            self.force_max = high;
        }
    }

    /// Clamp a summed multi-axis force to this profile's bounds.
    pub fn clamp(&self, force: f64) -> f64 {
        force.clamp(self.force_min, self.force_max)
    }
}

fn apply_axis(gains: &mut AxisGains, settings: &AxisSettings) {
    if let Some(kp) = settings.kp {
        gains.kp = kp;
    }
    if let Some(ki) = settings.ki {
        gains.ki = ki;
    }
    if let Some(kd) = settings.kd {
        gains.kd = kd;
    }
    if let Some(feed_forward) = settings.feed_forward {
        gains.feed_forward = feed_forward;
    }
}
