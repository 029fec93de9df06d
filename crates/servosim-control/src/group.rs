//! Group aggregation and the per-tick update loop.
//!
//! A [`Group`] owns an ordered roster of joints, fans inbound commands out
//! to them, and assembles the outward feedback record each tick. Control
//! runs every physics tick; feedback publication is throttled to the
//! configured frequency, independently of the control cadence.
//!
//! A group starts `Idle`: joints report feedback but are not force-driven.
//! The first ingested command flips it `Active` for the rest of its life.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use servosim_hal::PhysicsWorld;
use servosim_types::{GroupCommand, GroupFeedback, JointSettings, SimError};
use tracing::{debug, warn};

use crate::joint::{Joint, lock};
use crate::watchdog::CommandTarget;

/// Maximum command age before the watchdog fails safe, unless configured
/// otherwise.
pub const DEFAULT_COMMAND_LIFETIME: Duration = Duration::from_millis(100);

/// Feedback publication frequency applied to new groups, in Hz.
pub const DEFAULT_FEEDBACK_HZ: f64 = 100.0;

/// Outward publication seam: whatever transport the embedder uses, it
/// receives the aggregated record through this trait.
pub trait FeedbackSink {
    /// Emit one aggregated feedback record for `group`.
    fn publish(&mut self, group: &str, feedback: &GroupFeedback);
}

/// Publish throttle state plus the aggregated record it emits.
#[derive(Debug)]
struct PublishState {
    last: Option<Duration>,
    feedback: GroupFeedback,
}

/// A named, ordered collection of joints sharing one command-lifetime and
/// feedback-publish policy.
///
/// Joints are appended before the group serves traffic and never removed;
/// each keeps a stable index into the aggregated feedback record for the
/// group's whole life.
#[derive(Debug)]
pub struct Group {
    name: String,
    joints: Vec<Joint>,
    index_by_name: HashMap<String, usize>,
    command_lifetime: Mutex<Duration>,
    feedback_period: Mutex<Duration>,
    command_received: AtomicBool,
    publish: Mutex<PublishState>,
}

impl Group {
    /// Create a group over a fixed roster of joints (already carrying their
    /// stable indices, in roster order).
    pub fn new(name: impl Into<String>, joints: Vec<Joint>) -> Self {
        let index_by_name = joints
            .iter()
            .map(|j| (j.name().to_string(), j.index()))
            .collect();
        let names = joints.iter().map(|j| j.name().to_string()).collect();
        Self {
            name: name.into(),
            joints,
            index_by_name,
            command_lifetime: Mutex::new(DEFAULT_COMMAND_LIFETIME),
            feedback_period: Mutex::new(Duration::from_secs_f64(1.0 / DEFAULT_FEEDBACK_HZ)),
            command_received: AtomicBool::new(false),
            publish: Mutex::new(PublishState {
                last: None,
                feedback: GroupFeedback::sized(names),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of joints in the roster.
    pub fn len(&self) -> usize {
        self.joints.len()
    }

    /// True when the roster is empty.
    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Joints in roster order.
    pub fn joints(&self) -> impl Iterator<Item = &Joint> {
        self.joints.iter()
    }

    /// Look a joint up by its fully qualified name.
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.index_by_name.get(name).map(|&i| &self.joints[i])
    }

    /// True once at least one command has ever been ingested.
    pub fn is_active(&self) -> bool {
        self.command_received.load(Ordering::Acquire)
    }

    // ────────────────────────────────────────────────────────────────────
    // Command / configuration path (network thread)
    // ────────────────────────────────────────────────────────────────────

    /// Fan a group command out to the roster, stamped `now`.
    ///
    /// Axis entries that are missing (vector shorter than the roster) or
    /// non-finite leave that axis unset for the joint rather than rejecting
    /// the whole command. Flips the group `Active`.
    pub fn ingest_command(&self, command: &GroupCommand, now: Duration) {
        let lifetime = *lock(&self.command_lifetime);
        for (i, joint) in self.joints.iter().enumerate() {
            let target = CommandTarget::from_axes(
                command.position.get(i).copied(),
                command.velocity.get(i).copied(),
                command.effort.get(i).copied(),
            );
            joint.ingest_command(target, now, lifetime);
        }
        self.command_received.store(true, Ordering::Release);
    }

    /// Ingest a command for a single named joint. Flips the group `Active`.
    pub fn ingest_joint_command(
        &self,
        joint: &str,
        target: CommandTarget,
        now: Duration,
    ) -> Result<(), SimError> {
        let Some(joint) = self.joint(joint) else {
            return Err(SimError::UnknownJoint(joint.to_string()));
        };
        let lifetime = *lock(&self.command_lifetime);
        joint.ingest_command(target, now, lifetime);
        self.command_received.store(true, Ordering::Release);
        Ok(())
    }

    /// Set the lifetime applied to commands ingested from now on. Commands
    /// already in flight keep the lifetime they were stamped with.
    pub fn set_command_lifetime(&self, lifetime: Duration) {
        *lock(&self.command_lifetime) = lifetime;
    }

    /// Set the feedback publication frequency in Hz. Non-positive or
    /// non-finite values are rejected with a diagnostic.
    pub fn set_feedback_frequency(&self, hz: f64) {
        if !hz.is_finite() || hz <= 0.0 {
            warn!(group = %self.name, hz, "ignoring invalid feedback frequency");
            return;
        }
        *lock(&self.feedback_period) = Duration::from_secs_f64(1.0 / hz);
    }

    /// Overwrite parts of one joint's effective gain profile at runtime.
    /// Controller state is not reset (bumpless gain change).
    pub fn change_joint_settings(
        &self,
        joint: &str,
        settings: &JointSettings,
    ) -> Result<(), SimError> {
        match self.joint(joint) {
            Some(joint) => {
                debug!(group = %self.name, joint = %joint.name(), "applying settings override");
                joint.apply_settings(settings);
                Ok(())
            }
            None => Err(SimError::UnknownJoint(joint.to_string())),
        }
    }

    // ────────────────────────────────────────────────────────────────────
    // Simulation-thread update
    // ────────────────────────────────────────────────────────────────────

    /// Run one tick: per joint in roster order, read kinematics from the
    /// physics collaborator, run the control step, apply the force (when
    /// `Active`), and refresh the aggregated feedback record. Publishes
    /// through `sink` when the configured interval has elapsed.
    ///
    /// A joint whose physics handle cannot be resolved is skipped for this
    /// tick with a diagnostic; the rest of the group still updates.
    pub fn step(
        &self,
        world: &mut dyn PhysicsWorld,
        sink: Option<&mut dyn FeedbackSink>,
        dt: Duration,
        now: Duration,
    ) {
        let active = self.is_active();
        let dt_secs = dt.as_secs_f64();
        let mut publish = lock(&self.publish);

        for joint in &self.joints {
            let Some(handle) = world.joint_mut(joint.physics_key()) else {
                warn!(group = %self.name, joint = %joint.name(), key = %joint.physics_key(),
                    "physics joint not found, skipping this tick");
                continue;
            };
            let position = handle.position();
            let velocity = handle.velocity();
            let effort = handle.effort();

            // The control step always runs so error history stays
            // continuous; only force application waits for Active.
            let force = joint.step(position, velocity, effort, dt_secs, now);
            if active {
                handle.apply_force(force);
            }

            let i = joint.index();
            let record = &mut publish.feedback;
            record.position[i] = position;
            record.velocity[i] = velocity;
            record.effort[i] = effort;

            let imu = joint.imu();
            record.accelerometer[i] = imu.accel;
            record.gyro[i] = imu.gyro;

            let temps = joint.temperatures();
            record.motor_winding_temperature[i] = temps.motor_winding;
            record.motor_housing_temperature[i] = temps.motor_housing;
            record.board_temperature[i] = temps.board;

            if active {
                let (p, v, e) = joint.command_echo();
                record.position_command[i] = p;
                record.velocity_command[i] = v;
                record.effort_command[i] = e;
            }
        }

        if let Some(sink) = sink {
            let period = *lock(&self.feedback_period);
            let due = match publish.last {
                None => true,
                Some(prev) => now.saturating_sub(prev) >= period,
            };
            if due {
                sink.publish(&self.name, &publish.feedback);
                publish.last = Some(now);
            }
        }
    }

    /// Clone of the current aggregated feedback record.
    pub fn current_feedback(&self) -> GroupFeedback {
        lock(&self.publish).feedback.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gains::ActuatorModel;
    use servosim_hal::SimWorld;
    use servosim_types::{AMBIENT_CELSIUS, AxisSettings, ImuSample, Temperatures};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn arm_group() -> Group {
        Group::new(
            "arm",
            vec![
                Joint::new("arm/base", ActuatorModel::X5_1, 0),
                Joint::new("arm/shoulder", ActuatorModel::X5_4, 1),
            ],
        )
    }

    fn arm_world() -> SimWorld {
        SimWorld::new()
            .with_joint("arm/base/X5_1")
            .with_joint("arm/shoulder/X5_4")
    }

    /// Sink that records every published record.
    #[derive(Default)]
    struct RecordingSink {
        published: Vec<(Duration, GroupFeedback)>,
        now: Duration,
    }

    impl FeedbackSink for RecordingSink {
        fn publish(&mut self, _group: &str, feedback: &GroupFeedback) {
            self.published.push((self.now, feedback.clone()));
        }
    }

    #[test]
    fn idle_group_reports_feedback_but_applies_no_force() {
        let group = arm_group();
        let mut world = arm_world();
        world
            .joint_state_mut("arm/base/X5_1")
            .unwrap()
            .set_state(0.7, 0.0, 0.0);

        group.step(&mut world, None, ms(1), ms(1));

        assert!(!group.is_active());
        assert_eq!(world.joint("arm/base/X5_1").unwrap().last_force(), None);
        let fb = group.current_feedback();
        assert!((fb.position[0] - 0.7).abs() < f64::EPSILON);
        // Command echo stays NaN while idle.
        assert!(fb.position_command[0].is_nan());
    }

    #[test]
    fn two_joint_scenario_command_expiry() {
        // Roster "base", "shoulder"; lifetime 50 ms; position target 1.0
        // for base only at t=0.
        let group = arm_group();
        group.set_command_lifetime(ms(50));
        let mut world = arm_world();

        group.ingest_command(
            &GroupCommand {
                position: vec![1.0],
                velocity: vec![],
                effort: vec![],
            },
            ms(0),
        );

        // t=10ms: base force = kp * (1.0 - 0.0) = 5.0 clamped to 2.5;
        // shoulder was never commanded and stays at zero force.
        group.step(&mut world, None, ms(10), ms(10));
        assert_eq!(world.joint("arm/base/X5_1").unwrap().last_force(), Some(2.5));
        assert_eq!(
            world.joint("arm/shoulder/X5_4").unwrap().last_force(),
            Some(0.0)
        );

        // t=70ms (> 50ms since ingest): base fails safe to zero.
        group.step(&mut world, None, ms(60), ms(70));
        assert_eq!(world.joint("arm/base/X5_1").unwrap().last_force(), Some(0.0));
    }

    #[test]
    fn feedback_indices_stable_across_ticks() {
        let group = arm_group();
        let mut world = arm_world();
        world
            .joint_state_mut("arm/base/X5_1")
            .unwrap()
            .set_state(0.25, 0.0, 0.0);
        world
            .joint_state_mut("arm/shoulder/X5_4")
            .unwrap()
            .set_state(-0.5, 0.0, 0.0);

        for tick in 1..=20u64 {
            group.step(&mut world, None, ms(1), ms(tick));
            let fb = group.current_feedback();
            assert_eq!(fb.names[0], "arm/base");
            assert_eq!(fb.names[1], "arm/shoulder");
            assert!((fb.position[0] - 0.25).abs() < f64::EPSILON);
            assert!((fb.position[1] + 0.5).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn publish_throttled_to_configured_frequency() {
        let group = arm_group();
        group.set_feedback_frequency(10.0); // 100 ms period
        let mut world = arm_world();
        let mut sink = RecordingSink::default();

        // Control ticks every 10 ms for one simulated second.
        for tick in 0..=100u64 {
            let now = ms(tick * 10);
            sink.now = now;
            group.step(&mut world, Some(&mut sink), ms(10), now);
        }

        // First publish fires immediately, then every >= 100 ms.
        assert_eq!(sink.published.len(), 11);
        for pair in sink.published.windows(2) {
            assert!(pair[1].0 - pair[0].0 >= ms(100));
        }
    }

    #[test]
    fn invalid_feedback_frequency_is_ignored() {
        let group = arm_group();
        group.set_feedback_frequency(10.0);
        group.set_feedback_frequency(0.0);
        group.set_feedback_frequency(f64::NAN);
        // Still the 100 ms period from the only valid call.
        assert_eq!(*lock(&group.feedback_period), ms(100));
    }

    #[test]
    fn short_command_vectors_leave_trailing_joints_unset() {
        let group = arm_group();
        let mut world = arm_world();
        group.ingest_command(
            &GroupCommand {
                position: vec![1.0], // no entry for shoulder
                velocity: vec![],
                effort: vec![],
            },
            ms(0),
        );
        group.step(&mut world, None, ms(1), ms(1));

        let fb = group.current_feedback();
        assert!((fb.position_command[0] - 1.0).abs() < f64::EPSILON);
        assert!(fb.position_command[1].is_nan());
        assert_eq!(
            world.joint("arm/shoulder/X5_4").unwrap().last_force(),
            Some(0.0)
        );
    }

    #[test]
    fn missing_physics_handle_skips_joint_but_group_continues() {
        let group = arm_group();
        // World only knows the shoulder.
        let mut world = SimWorld::new().with_joint("arm/shoulder/X5_4");
        world
            .joint_state_mut("arm/shoulder/X5_4")
            .unwrap()
            .set_state(0.4, 0.0, 0.0);

        group.ingest_command(
            &GroupCommand {
                position: vec![1.0, 1.0],
                velocity: vec![],
                effort: vec![],
            },
            ms(0),
        );
        group.step(&mut world, None, ms(1), ms(1));

        let fb = group.current_feedback();
        // Base slot untouched, shoulder updated and driven.
        assert!((fb.position[0] - 0.0).abs() < f64::EPSILON);
        assert!((fb.position[1] - 0.4).abs() < f64::EPSILON);
        assert!(world.joint("arm/shoulder/X5_4").unwrap().last_force().is_some());
    }

    #[test]
    fn sensor_samples_land_at_the_joint_slot() {
        let group = arm_group();
        let mut world = arm_world();

        let shoulder = group.joint("arm/shoulder").unwrap();
        shoulder.update_imu(ImuSample {
            accel: [0.1, 0.2, 9.8],
            gyro: [0.0, 0.3, 0.0],
        });
        shoulder.update_temperatures(Temperatures {
            motor_winding: 55.0,
            motor_housing: 48.0,
            board: 41.0,
        });

        group.step(&mut world, None, ms(1), ms(1));

        let fb = group.current_feedback();
        // Slot 1 carries the shoulder's samples; slot 0 keeps defaults.
        assert_eq!(fb.accelerometer[1], [0.1, 0.2, 9.8]);
        assert_eq!(fb.gyro[1], [0.0, 0.3, 0.0]);
        assert!((fb.motor_winding_temperature[1] - 55.0).abs() < f64::EPSILON);
        assert!((fb.motor_housing_temperature[1] - 48.0).abs() < f64::EPSILON);
        assert!((fb.board_temperature[1] - 41.0).abs() < f64::EPSILON);
        assert_eq!(fb.accelerometer[0], [0.0; 3]);
        assert!((fb.board_temperature[0] - AMBIENT_CELSIUS).abs() < f64::EPSILON);
    }

    #[test]
    fn lifetime_change_only_affects_future_commands() {
        let group = arm_group();
        let mut world = arm_world();

        group.set_command_lifetime(ms(1_000));
        group.ingest_command(
            &GroupCommand {
                position: vec![1.0, 1.0],
                velocity: vec![],
                effort: vec![],
            },
            ms(0),
        );
        // Shorten the lifetime afterwards; the in-flight command keeps its
        // 1 s budget.
        group.set_command_lifetime(ms(10));

        group.step(&mut world, None, ms(1), ms(500));
        assert!(world.joint("arm/base/X5_1").unwrap().last_force().unwrap() > 0.0);
    }

    #[test]
    fn change_settings_for_unknown_joint_errors() {
        let group = arm_group();
        let err = group
            .change_joint_settings("arm/elbow", &JointSettings::default())
            .unwrap_err();
        assert_eq!(err, SimError::UnknownJoint("arm/elbow".to_string()));
    }

    #[test]
    fn change_settings_applies_to_named_joint() {
        let group = arm_group();
        group
            .change_joint_settings(
                "arm/base",
                &JointSettings {
                    position: AxisSettings {
                        kp: Some(7.0),
                        ..Default::default()
                    },
                    ..Default::default()
                },
            )
            .unwrap();
        let profile = group.joint("arm/base").unwrap().profile();
        assert!((profile.position.kp - 7.0).abs() < f64::EPSILON);
        // The other joint keeps its model default.
        let other = group.joint("arm/shoulder").unwrap().profile();
        assert!((other.position.kp - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_joint_command_flips_group_active() {
        let group = arm_group();
        assert!(!group.is_active());
        group
            .ingest_joint_command(
                "arm/base",
                CommandTarget::from_axes(Some(0.5), None, None),
                ms(0),
            )
            .unwrap();
        assert!(group.is_active());

        let err = group
            .ingest_joint_command("arm/elbow", CommandTarget::unset(), ms(0))
            .unwrap_err();
        assert_eq!(err, SimError::UnknownJoint("arm/elbow".to_string()));
    }
}
