//! One simulated servo joint: feedback snapshot, command slot, watchdog
//! bookkeeping, and per-axis controller state.
//!
//! A joint is shared between two execution contexts. The simulation thread
//! runs [`Joint::step`] once per physics tick; the network path calls
//! [`Joint::ingest_command`] and the sensor path calls
//! [`Joint::update_imu`] / [`Joint::update_temperatures`] at their own
//! cadence. Each cross-thread field sits behind its own mutex and is
//! swapped as a whole snapshot, so a control step can never observe a
//! half-written target.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use servosim_types::{ImuSample, JointSettings, Temperatures};

use crate::gains::{ActuatorModel, GainProfile};
use crate::pid::PidState;
use crate::watchdog::{CommandSnapshot, CommandState, CommandTarget};

// Locks guard small snapshots only. A poisoned lock still holds usable
// state, and the control loop must never stall the physics step.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Latest kinematic readings for one joint, refreshed every control step.
#[derive(Debug, Clone, Copy, Default)]
pub struct JointFeedback {
    pub position: f64,
    pub velocity: f64,
    pub effort: f64,
}

/// Sim-thread-only controller state: per-axis error history and the
/// feedback snapshot.
#[derive(Debug, Default)]
struct ControlState {
    position_pid: PidState,
    velocity_pid: PidState,
    effort_pid: PidState,
    feedback: JointFeedback,
}

/// One joint of a group. Created when the group's roster is established;
/// its feedback-record slot never changes afterwards.
#[derive(Debug)]
pub struct Joint {
    name: String,
    model: ActuatorModel,
    physics_key: String,
    index: usize,
    profile: Mutex<GainProfile>,
    command: Mutex<Option<CommandSnapshot>>,
    imu: Mutex<ImuSample>,
    temperatures: Mutex<Temperatures>,
    control: Mutex<ControlState>,
}

impl Joint {
    /// Create a joint with the default profile for `model`.
    ///
    /// `index` is the joint's stable slot in the owning group's feedback
    /// record. Modelled joints are addressed in the physics world as
    /// `"<name>/<MODEL>"`; a generic joint is addressed by its bare name.
    pub fn new(name: impl Into<String>, model: ActuatorModel, index: usize) -> Self {
        let name = name.into();
        let physics_key = match model {
            ActuatorModel::Generic => name.clone(),
            _ => format!("{}/{}", name, model.token()),
        };
        Self {
            name,
            model,
            physics_key,
            index,
            profile: Mutex::new(GainProfile::for_model(model)),
            command: Mutex::new(None),
            imu: Mutex::new(ImuSample::default()),
            temperatures: Mutex::new(Temperatures::default()),
            control: Mutex::new(ControlState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> ActuatorModel {
        self.model
    }

    /// Key under which the physics collaborator knows this joint.
    pub fn physics_key(&self) -> &str {
        &self.physics_key
    }

    /// Stable slot in the group's aggregated feedback record.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Copy of the joint's effective gain profile.
    pub fn profile(&self) -> GainProfile {
        *lock(&self.profile)
    }

    /// Overwrite parts of the effective profile ("change settings").
    ///
    /// Controller state is deliberately left alone so the integral term
    /// carries across the change.
    pub fn apply_settings(&self, settings: &JointSettings) {
        lock(&self.profile).apply(settings);
    }

    // ────────────────────────────────────────────────────────────────────
    // Network-thread entry points
    // ────────────────────────────────────────────────────────────────────

    /// Store a new command target, stamped with `now` and the lifetime in
    /// force at this moment. Replaces any previous target wholesale.
    pub fn ingest_command(&self, target: CommandTarget, now: Duration, lifetime: Duration) {
        *lock(&self.command) = Some(CommandSnapshot {
            target,
            received_at: now,
            lifetime,
        });
    }

    /// Merge the latest inertial sample (latest-sample-wins).
    pub fn update_imu(&self, sample: ImuSample) {
        *lock(&self.imu) = sample;
    }

    /// Merge the latest temperature readings.
    pub fn update_temperatures(&self, temperatures: Temperatures) {
        *lock(&self.temperatures) = temperatures;
    }

    // ────────────────────────────────────────────────────────────────────
    // Sim-thread entry points
    // ────────────────────────────────────────────────────────────────────

    /// Resolve the fail-safe command state at `now`.
    pub fn command_state(&self, now: Duration) -> CommandState {
        CommandState::resolve(lock(&self.command).as_ref(), now)
    }

    /// The most recently stored target per axis, for the feedback echo.
    /// Unset axes (and a never-commanded joint) report `NaN`. Not gated by
    /// freshness: the echo reports what was last asked for.
    pub fn command_echo(&self) -> (f64, f64, f64) {
        match *lock(&self.command) {
            Some(snapshot) => (
                snapshot.target.position.unwrap_or(f64::NAN),
                snapshot.target.velocity.unwrap_or(f64::NAN),
                snapshot.target.effort.unwrap_or(f64::NAN),
            ),
            None => (f64::NAN, f64::NAN, f64::NAN),
        }
    }

    /// Run one control step and return the commanded force.
    ///
    /// Measured values are recorded into the feedback snapshot regardless
    /// of command validity. An expired command drives the law with every
    /// axis unset, so the output decays to zero instead of chasing a stale
    /// target; the clamp still applies on that path for defense in depth.
    pub fn step(&self, position: f64, velocity: f64, effort: f64, dt: f64, now: Duration) -> f64 {
        let profile = self.profile();
        let target = self.command_state(now).effective_target();

        let mut control = lock(&self.control);
        control.feedback = JointFeedback {
            position,
            velocity,
            effort,
        };

        let ff_scale = profile.feed_forward_scale;
        let force = control
            .position_pid
            .update(target.position, position, dt, &profile.position, ff_scale)
            + control
                .velocity_pid
                .update(target.velocity, velocity, dt, &profile.velocity, ff_scale)
            + control
                .effort_pid
                .update(target.effort, effort, dt, &profile.effort, ff_scale);

        profile.clamp(force)
    }

    /// Latest recorded kinematic feedback.
    pub fn feedback(&self) -> JointFeedback {
        lock(&self.control).feedback
    }

    /// Latest inertial sample.
    pub fn imu(&self) -> ImuSample {
        *lock(&self.imu)
    }

    /// Latest temperature readings.
    pub fn temperatures(&self) -> Temperatures {
        *lock(&self.temperatures)
    }
}
