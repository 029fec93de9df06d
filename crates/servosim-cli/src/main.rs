//! `servosim-cli` – headless demo of the actuator control engine.
//!
//! Builds an in-process world with a two-joint arm, creates a control group
//! over it, ingests a position command, and runs the control loop for a few
//! simulated seconds with a naive demo-side integrator standing in for a
//! physics engine. Feedback records are published at 10 Hz and the final
//! one is dumped as JSON.

use std::time::Duration;

use tracing::info;

use servosim_control::{Engine, FeedbackSink};
use servosim_hal::{PhysicsJoint, SimWorld};
use servosim_types::{GroupCommand, GroupFeedback, expand_roster};

/// Sink that logs a one-line summary per published record.
#[derive(Default)]
struct LogSink {
    count: usize,
}

impl FeedbackSink for LogSink {
    fn publish(&mut self, group: &str, feedback: &GroupFeedback) {
        self.count += 1;
        info!(
            group,
            publish = self.count,
            position = ?feedback.position,
            "feedback"
        );
    }
}

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set SERVOSIM_LOG_FORMAT=json to emit newline-delimited JSON logs.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("SERVOSIM_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    let mut world = SimWorld::new()
        .with_joint("arm/base/X5_1")
        .with_joint("arm/shoulder/X5_4");

    let mut engine = Engine::new();
    let roster = expand_roster(
        &["arm".to_string()],
        &["base".to_string(), "shoulder".to_string()],
    );
    let group = match engine.add_group("arm", &roster, &world) {
        Ok(group) => group,
        Err(err) => {
            eprintln!("failed to create group: {err}");
            std::process::exit(1);
        }
    };
    group.set_feedback_frequency(10.0);

    // Hold both joints at fixed position targets. The command is
    // re-ingested every 50 ms so the watchdog keeps trusting it.
    let command = GroupCommand {
        position: vec![1.0, -0.5],
        velocity: vec![],
        effort: vec![],
    };

    let mut sink = LogSink::default();
    let tick = Duration::from_millis(1);
    let dt = tick.as_secs_f64();

    info!("running 3 simulated seconds at 1 kHz");
    for n in 0..3_000u64 {
        let now = tick * n as u32;

        if n % 50 == 0 {
            group.ingest_command(&command, now);
        }

        engine.step(&mut world, Some(&mut sink), now);

        // Demo-side stand-in for the physics engine: integrate the applied
        // force as acceleration on a unit-inertia joint.
        for key in ["arm/base/X5_1", "arm/shoulder/X5_4"] {
            if let Some(joint) = world.joint_state_mut(key) {
                let force = joint.last_force().unwrap_or(0.0);
                let velocity = joint.velocity() + force * dt;
                let position = joint.position() + velocity * dt;
                joint.set_state(position, velocity, force);
            }
        }
    }

    let feedback = group.current_feedback();
    match serde_json::to_string_pretty(&feedback) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("failed to serialise feedback: {err}"),
    }
}
