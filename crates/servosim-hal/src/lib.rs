//! `servosim-hal` – the physics-collaborator seam.
//!
//! The control engine never talks to a physics engine directly; it reads
//! joint kinematics and writes forces through the traits in this crate.
//!
//! # Modules
//!
//! - [`physics`] – [`PhysicsJoint`][physics::PhysicsJoint] and
//!   [`PhysicsWorld`][physics::PhysicsWorld]: the read/actuate contract a
//!   simulator backend must satisfy.
//! - [`sim`] – [`SimWorld`][sim::SimWorld] and [`SimJoint`][sim::SimJoint]:
//!   in-process stubs that record applied forces and return settable
//!   kinematic state, so the full control stack runs in headless tests
//!   without a physics engine.

pub mod physics;
pub mod sim;

pub use physics::{PhysicsJoint, PhysicsWorld};
pub use sim::{SimJoint, SimWorld};
