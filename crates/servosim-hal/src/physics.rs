//! Traits a physics backend implements so the control engine can close the
//! loop against it.
//!
//! Joints are addressed by a stable string key. For modelled actuators the
//! key is `"<family>/<name>/<MODEL>"` (the convention the simulated robot
//! description uses); joints with no recognised model variant are addressed
//! by their bare `"<family>/<name>"`.

/// One simulated servo as seen by the control loop: read-only kinematics
/// plus a single scalar force input for the next integration step.
pub trait PhysicsJoint {
    /// Current position in radians.
    fn position(&self) -> f64;

    /// Current velocity in rad/s.
    fn velocity(&self) -> f64;

    /// Currently sensed torque in N·m.
    fn effort(&self) -> f64;

    /// Apply `force` (N·m) for the next integration step.
    fn apply_force(&mut self, force: f64);
}

/// A name-addressed collection of physics joints.
///
/// The control loop looks a joint up every tick; a missing handle is a
/// per-tick skip, never a fatal condition, so lookups return `Option`
/// instead of an error.
pub trait PhysicsWorld {
    /// Resolve `key` to a mutable joint handle, if the world knows it.
    fn joint_mut(&mut self, key: &str) -> Option<&mut dyn PhysicsJoint>;

    /// True when the world knows a joint under `key`. Used to probe which
    /// actuator model variant a roster entry maps to.
    fn has_joint(&self, key: &str) -> bool;
}
