//! Command freshness tracking.
//!
//! A command target is only trusted while it is younger than the lifetime
//! that was in force when it was ingested. Once it expires the control step
//! must treat every axis as unset — failing safe to zero force — rather
//! than keep chasing a target the peer has stopped refreshing.
//!
//! Freshness is modelled as an explicit state machine
//! ([`CommandState`]: `Unset | Fresh | Expired`) instead of a not-a-number
//! sentinel, so a stale numeric value can never leak into the control law
//! by accident.

use std::time::Duration;

/// One value per control axis, each either commanded or unset.
///
/// A new inbound command fully replaces the previous target; an axis the
/// command omits (or carries as a non-finite number) is unset.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommandTarget {
    pub position: Option<f64>,
    pub velocity: Option<f64>,
    pub effort: Option<f64>,
}

impl CommandTarget {
    /// A target with every axis unset.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Build a target from raw wire values, discarding non-finite entries.
    pub fn from_axes(position: Option<f64>, velocity: Option<f64>, effort: Option<f64>) -> Self {
        Self {
            position: position.filter(|v| v.is_finite()),
            velocity: velocity.filter(|v| v.is_finite()),
            effort: effort.filter(|v| v.is_finite()),
        }
    }
}

/// A stored command plus its watchdog bookkeeping: when it was accepted and
/// the lifetime captured at that moment.
///
/// Capturing the lifetime at ingest means a later lifetime change affects
/// only future commands, never ones already in flight.
#[derive(Debug, Clone, Copy)]
pub struct CommandSnapshot {
    pub target: CommandTarget,
    pub received_at: Duration,
    pub lifetime: Duration,
}

impl CommandSnapshot {
    /// True iff the command's age at `now` is within its lifetime.
    ///
    /// `now` earlier than `received_at` (a rewound sim clock) saturates to
    /// zero age and counts as fresh.
    pub fn is_fresh(&self, now: Duration) -> bool {
        now.saturating_sub(self.received_at) <= self.lifetime
    }
}

/// Fail-safe command state resolved for one control step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CommandState {
    /// No command has ever been stored for this joint.
    Unset,
    /// The stored target is within its lifetime and may drive the law.
    Fresh(CommandTarget),
    /// The stored target outlived its lifetime; every axis must be treated
    /// as unset.
    Expired,
}

impl CommandState {
    /// Resolve the state of an optional stored snapshot at `now`.
    pub fn resolve(slot: Option<&CommandSnapshot>, now: Duration) -> Self {
        match slot {
            None => Self::Unset,
            Some(snapshot) if snapshot.is_fresh(now) => Self::Fresh(snapshot.target),
            Some(_) => Self::Expired,
        }
    }

    /// The target the control law should see: the stored target when fresh,
    /// all axes unset otherwise.
    pub fn effective_target(&self) -> CommandTarget {
        match self {
            Self::Fresh(target) => *target,
            Self::Unset | Self::Expired => CommandTarget::unset(),
        }
    }
}
