//! `servosim-control` – Actuator Control & Feedback Engine
//!
//! Closes a position/velocity/effort control loop for groups of simulated
//! servo actuators once per physics tick. Commands arrive asynchronously
//! from a network-facing path; the control step runs synchronously on the
//! simulation thread and fails safe to zero force when a command goes stale.
//!
//! # Modules
//!
//! - [`gains`] – [`ActuatorModel`][gains::ActuatorModel] and
//!   [`GainProfile`][gains::GainProfile]: per-model default PID gains,
//!   feed-forward scale, and force clamp bounds.
//! - [`pid`] – [`PidState`][pid::PidState]: the per-axis PID law with
//!   feed-forward; disabled by an unset target.
//! - [`watchdog`] – [`CommandSnapshot`][watchdog::CommandSnapshot] and
//!   [`CommandState`][watchdog::CommandState]: command age tracking and the
//!   `Unset | Fresh | Expired` fail-safe state machine.
//! - [`joint`] – [`Joint`][joint::Joint]: feedback snapshot, per-axis
//!   controller state, and the per-tick control step.
//! - [`group`] – [`Group`][group::Group]: ordered joint collection,
//!   aggregated feedback record, and the throttled publish path.
//! - [`engine`] – [`Engine`][engine::Engine]: name-addressed group registry
//!   and the top-level per-tick update with the first-tick guard.

pub mod engine;
pub mod gains;
pub mod group;
pub mod joint;
pub mod pid;
pub mod watchdog;

pub use engine::Engine;
pub use gains::{ActuatorModel, AxisGains, GainProfile};
pub use group::{FeedbackSink, Group};
pub use joint::Joint;
pub use pid::PidState;
pub use watchdog::{CommandSnapshot, CommandState, CommandTarget};
