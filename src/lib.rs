//! rover_link - Real-time control server for a WebSocket-driven rover
//!
//! Owns the rover's actuators (two drive motors behind an H-bridge, a pan/tilt
//! servo pair and an RGB LED strip), serializes commands from any number of
//! connected sessions and streams status back to all of them.
//!
//! Domain logic (motor mixing, servo limits, LED rendering, command
//! validation) lives in the `no_std` crate `rover_link_core`; this crate adds
//! the async runtime around it.

pub mod logging;

pub mod animation;
pub mod config;
pub mod dispatcher;
pub mod drivers;
pub mod error;
pub mod failsafe;
pub mod hub;
pub mod protocol;
pub mod server;
pub mod state;
pub mod transport;

pub use config::ServerConfig;
pub use dispatcher::{ControlHandle, Request};
pub use drivers::{Actuators, SimActuators};
pub use error::{ConfigError, ControlError, DriverError, ServerError};
pub use hub::{EventHub, SessionId};
pub use protocol::ServerEvent;
pub use server::Server;
