//! In-process physics stubs for headless tests and demos.
//!
//! [`SimWorld`] holds a set of [`SimJoint`]s keyed the same way a real
//! backend would key them. A `SimJoint` performs no integration — it simply
//! records the most recently applied force and reports whatever kinematic
//! state the test (or a demo-side integrator) has set.
//!
//! # Example
//!
//! ```rust
//! use servosim_hal::{PhysicsWorld, SimWorld};
//!
//! let mut world = SimWorld::new().with_joint("arm/base/X5_1");
//! let handle = world.joint_mut("arm/base/X5_1").expect("registered joint");
//! handle.apply_force(0.5);
//! assert_eq!(world.joint("arm/base/X5_1").unwrap().last_force(), Some(0.5));
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::physics::{PhysicsJoint, PhysicsWorld};

/// A stub joint with settable kinematic state and a record of the most
/// recently applied force.
#[derive(Debug, Default)]
pub struct SimJoint {
    position: f64,
    velocity: f64,
    effort: f64,
    last_force: Option<f64>,
}

impl SimJoint {
    /// Create a joint at rest at the zero position.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the kinematic state reported to the control loop.
    pub fn set_state(&mut self, position: f64, velocity: f64, effort: f64) {
        self.position = position;
        self.velocity = velocity;
        self.effort = effort;
    }

    /// The most recently applied force, or `None` if the control loop has
    /// never driven this joint.
    pub fn last_force(&self) -> Option<f64> {
        self.last_force
    }
}

impl PhysicsJoint for SimJoint {
    fn position(&self) -> f64 {
        self.position
    }

    fn velocity(&self) -> f64 {
        self.velocity
    }

    fn effort(&self) -> f64 {
        self.effort
    }

    fn apply_force(&mut self, force: f64) {
        self.last_force = Some(force);
    }
}

/// A name-addressed set of [`SimJoint`]s implementing [`PhysicsWorld`].
#[derive(Debug, Default)]
pub struct SimWorld {
    joints: HashMap<String, SimJoint>,
}

impl SimWorld {
    /// Create an empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a joint under `key` (builder form).
    pub fn with_joint(mut self, key: impl Into<String>) -> Self {
        self.add_joint(key);
        self
    }

    /// Register a joint under `key`. An existing joint with the same key is
    /// replaced.
    pub fn add_joint(&mut self, key: impl Into<String>) {
        let key = key.into();
        debug!(joint = %key, "registered sim joint");
        self.joints.insert(key, SimJoint::new());
    }

    /// Shared access to a registered joint, for assertions and demo-side
    /// integration.
    pub fn joint(&self, key: &str) -> Option<&SimJoint> {
        self.joints.get(key)
    }

    /// Exclusive access to a registered joint.
    pub fn joint_state_mut(&mut self, key: &str) -> Option<&mut SimJoint> {
        self.joints.get_mut(key)
    }
}

impl PhysicsWorld for SimWorld {
    fn joint_mut(&mut self, key: &str) -> Option<&mut dyn PhysicsJoint> {
        self.joints.get_mut(key).map(|j| j as &mut dyn PhysicsJoint)
    }

    fn has_joint(&self, key: &str) -> bool {
        self.joints.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_joint_records_last_force() {
        let mut joint = SimJoint::new();
        assert_eq!(joint.last_force(), None);
        joint.apply_force(1.25);
        assert_eq!(joint.last_force(), Some(1.25));
        joint.apply_force(-0.5);
        assert_eq!(joint.last_force(), Some(-0.5));
    }

    #[test]
    fn sim_joint_reports_set_state() {
        let mut joint = SimJoint::new();
        joint.set_state(1.0, -0.25, 0.1);
        assert!((joint.position() - 1.0).abs() < f64::EPSILON);
        assert!((joint.velocity() + 0.25).abs() < f64::EPSILON);
        assert!((joint.effort() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn world_probes_and_resolves_joints() {
        let mut world = SimWorld::new().with_joint("arm/base/X5_1");
        assert!(world.has_joint("arm/base/X5_1"));
        assert!(!world.has_joint("arm/base/X5_4"));
        assert!(world.joint_mut("arm/base/X5_1").is_some());
        assert!(world.joint_mut("arm/elbow/X5_1").is_none());
    }

    #[test]
    fn world_force_visible_after_handle_dropped() {
        let mut world = SimWorld::new().with_joint("arm/base/X5_1");
        world
            .joint_mut("arm/base/X5_1")
            .unwrap()
            .apply_force(2.0);
        assert_eq!(world.joint("arm/base/X5_1").unwrap().last_force(), Some(2.0));
    }
}
