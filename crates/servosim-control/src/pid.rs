//! Per-axis PID law with feed-forward.
//!
//! Numeric behavior is kept deliberately simple: the integral accumulates
//! by raw summation of the error once per call (no time weighting, no leak,
//! no anti-windup), and the derivative is forced to zero when `dt <= 0` to
//! guard the first tick and a paused simulation. The feed-forward term
//! scales with the commanded target, not the measurement, so it tracks
//! intent.
//!
//! An unset target disables the axis: the call returns zero and leaves the
//! error history untouched. Safety gating (command expiry) lives in the
//! watchdog, not here.

use crate::gains::AxisGains;

/// Mutable error history for one control axis. Owned exclusively by one
/// joint.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    prev_error: f64,
    elapsed_error: f64,
}

impl PidState {
    /// Fresh state with zeroed error history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute this axis' force contribution.
    ///
    /// - `target` – the commanded value, or `None` when the axis is unset
    ///   (never commanded, omitted, or expired). Unset returns `0.0`
    ///   without touching state.
    /// - `feedback` – the measured value of the same quantity.
    /// - `dt` – elapsed time since the previous tick, in seconds.
    /// - `ff_scale` – the profile's feed-forward scale.
    ///
    /// The result is NOT clamped here; the caller clamps once over the sum
    /// of all axis contributions.
    pub fn update(
        &mut self,
        target: Option<f64>,
        feedback: f64,
        dt: f64,
        gains: &AxisGains,
        ff_scale: f64,
    ) -> f64 {
        let Some(target) = target else {
            return 0.0;
        };

        let error = target - feedback;
        let integral = self.elapsed_error + error;
        let derivative = if dt <= 0.0 {
            0.0
        } else {
            (error - self.prev_error) / dt
        };
        self.prev_error = error;
        self.elapsed_error = integral;

        gains.kp * error
            + gains.ki * integral
            + gains.kd * derivative
            + gains.feed_forward * ff_scale * target
    }

    /// Clear the error history. Never called implicitly — command expiry
    /// and gain changes both keep the integral term (bumpless resume).
    pub fn reset(&mut self) {
        self.prev_error = 0.0;
        self.elapsed_error = 0.0;
    }
}
