//! rover_link_core - Pure no_std control logic for the rover_link server
//!
//! This crate contains platform-agnostic algorithms and types
//! that can be tested on host without any I/O or async runtime.
//!
//! # Design Principles
//!
//! - **Zero cfg**: No `#[cfg(feature = ...)]` directives allowed
//! - **Pure no_std**: No std library dependencies, fixed-capacity buffers only
//! - **Trait abstractions**: Pin I/O injected via traits
//!
//! # Modules
//!
//! - [`motor`]: Drive state, differential mixing and H-bridge driver
//! - [`servo`]: Pan/tilt axis limits, stepping and PWM conversion
//! - [`led`]: LED strip state and brightness scaling
//! - [`animation`]: Deterministic rainbow and chase frame rendering
//! - [`command`]: Validated client commands
//! - [`error`]: Command validation errors

#![no_std]

pub mod animation;
pub mod command;
pub mod error;
pub mod led;
pub mod motor;
pub mod servo;

pub use smart_leds::RGB8;
