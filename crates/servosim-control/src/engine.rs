//! Top-level engine: the name-addressed group registry and the per-tick
//! entry point the physics callback drives.
//!
//! Groups are created before traffic flows and live until process shutdown.
//! The engine owns the previous-tick timestamp; the very first tick only
//! records the clock and returns, since dt is undefined until two ticks
//! have been observed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use servosim_hal::PhysicsWorld;
use servosim_types::SimError;
use tracing::{info, warn};

use crate::gains::ActuatorModel;
use crate::group::{FeedbackSink, Group};
use crate::joint::Joint;

/// Owns every group and drives them once per simulation tick.
#[derive(Default)]
pub struct Engine {
    groups: HashMap<String, Arc<Group>>,
    prev_time: Option<Duration>,
}

impl Engine {
    /// Create an engine with no groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a group named `name` over `roster` (fully qualified joint
    /// names, in order).
    ///
    /// Each roster entry's actuator model is resolved by probing `world`
    /// for a `"<joint>/<MODEL>"` handle; an entry with no recognised
    /// variant falls back to the generic profile with a diagnostic and is
    /// addressed by its bare name.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::GroupExists`] when `name` is already taken.
    pub fn add_group(
        &mut self,
        name: &str,
        roster: &[String],
        world: &dyn PhysicsWorld,
    ) -> Result<Arc<Group>, SimError> {
        if self.groups.contains_key(name) {
            warn!(group = %name, "group already exists");
            return Err(SimError::GroupExists(name.to_string()));
        }

        let joints = roster
            .iter()
            .enumerate()
            .map(|(index, joint_name)| {
                let model = probe_model(world, joint_name);
                Joint::new(joint_name.clone(), model, index)
            })
            .collect();

        let group = Arc::new(Group::new(name, joints));
        info!(group = %name, joints = group.len(), "added group");
        self.groups.insert(name.to_string(), Arc::clone(&group));
        Ok(group)
    }

    /// Handle to a group, shareable with the network-facing path.
    pub fn group(&self, name: &str) -> Option<&Arc<Group>> {
        self.groups.get(name)
    }

    /// Groups currently registered.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// True when no group has been added yet.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Advance every group by one tick at simulation time `now`.
    ///
    /// The first call only records the clock: dt is undefined, so no force
    /// is computed anywhere.
    pub fn step(
        &mut self,
        world: &mut dyn PhysicsWorld,
        mut sink: Option<&mut dyn FeedbackSink>,
        now: Duration,
    ) {
        let Some(prev) = self.prev_time.replace(now) else {
            return;
        };
        let dt = now.saturating_sub(prev);

        for group in self.groups.values() {
            let sink = sink.as_mut().map(|s| &mut **s as &mut dyn FeedbackSink);
            group.step(world, sink, dt, now);
        }
    }
}

/// Probe which model variant `joint_name` carries in the physics world.
fn probe_model(world: &dyn PhysicsWorld, joint_name: &str) -> ActuatorModel {
    for model in ActuatorModel::PROBE_ORDER {
        if world.has_joint(&format!("{}/{}", joint_name, model.token())) {
            return model;
        }
    }
    warn!(joint = %joint_name, "no known actuator model variant, using generic profile");
    ActuatorModel::Generic
}

#[cfg(test)]
mod tests {
    use super::*;
    use servosim_hal::SimWorld;
    use servosim_types::GroupCommand;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn roster(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_group_resolves_models_by_probing() {
        let world = SimWorld::new()
            .with_joint("arm/base/X5_1")
            .with_joint("arm/shoulder/X8_9");
        let mut engine = Engine::new();
        let group = engine
            .add_group("arm", &roster(&["arm/base", "arm/shoulder"]), &world)
            .unwrap();

        assert_eq!(group.joint("arm/base").unwrap().model(), ActuatorModel::X5_1);
        assert_eq!(
            group.joint("arm/shoulder").unwrap().model(),
            ActuatorModel::X8_9
        );
    }

    #[test]
    fn duplicate_group_name_is_rejected() {
        let world = SimWorld::new().with_joint("arm/base/X5_1");
        let mut engine = Engine::new();
        engine.add_group("arm", &roster(&["arm/base"]), &world).unwrap();
        let err = engine
            .add_group("arm", &roster(&["arm/base"]), &world)
            .unwrap_err();
        assert_eq!(err, SimError::GroupExists("arm".to_string()));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn first_tick_records_clock_without_driving_joints() {
        let mut world = SimWorld::new().with_joint("arm/base/X5_1");
        let mut engine = Engine::new();
        let group = engine
            .add_group("arm", &roster(&["arm/base"]), &world)
            .unwrap();
        group.ingest_command(
            &GroupCommand {
                position: vec![1.0],
                velocity: vec![],
                effort: vec![],
            },
            ms(0),
        );

        engine.step(&mut world, None, ms(5));
        assert_eq!(world.joint("arm/base/X5_1").unwrap().last_force(), None);

        // Second tick has a defined dt and drives the joint.
        engine.step(&mut world, None, ms(6));
        assert!(world.joint("arm/base/X5_1").unwrap().last_force().is_some());
    }

    #[test]
    fn unknown_model_still_produces_finite_clamped_force() {
        // The world knows this joint only by its bare name: no model
        // variant resolves, so the generic profile applies.
        let mut world = SimWorld::new().with_joint("arm/mystery");
        let mut engine = Engine::new();
        let group = engine
            .add_group("arm", &roster(&["arm/mystery"]), &world)
            .unwrap();
        assert_eq!(
            group.joint("arm/mystery").unwrap().model(),
            ActuatorModel::Generic
        );

        group.ingest_command(
            &GroupCommand {
                position: vec![1e9],
                velocity: vec![],
                effort: vec![],
            },
            ms(0),
        );
        engine.step(&mut world, None, ms(0));
        engine.step(&mut world, None, ms(1));

        let force = world.joint("arm/mystery").unwrap().last_force().unwrap();
        assert!(force.is_finite());
        // Generic clamp is ±1 N·m.
        assert!((force - 1.0).abs() < f64::EPSILON);
    }
}
