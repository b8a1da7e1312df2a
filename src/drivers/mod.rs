//! Actuator driver seam
//!
//! The dispatcher talks to hardware only through [`Actuators`]. Every call is
//! an idempotent set-state operation: repeating it with the same argument
//! leaves the hardware where it was.
//!
//! The trait is async so a backend can await I/O. Implementations that block
//! (GPIO sysfs, SPI) should wrap the blocking part in
//! `tokio::task::spawn_blocking`.

pub mod sim;

use async_trait::async_trait;
use rover_link_core::motor::MotorState;
use rover_link_core::servo::ServoAxis;
use rover_link_core::RGB8;

use crate::error::DriverError;

pub use sim::SimActuators;

/// Pluggable actuator backend.
///
/// Implementations must be `Send + 'static` so the dispatcher task can own
/// them.
#[async_trait]
pub trait Actuators: Send {
    /// Backend name for logs (e.g., "sim").
    fn name(&self) -> &str;

    /// Whether the link to the hardware is up (reported as `connected` in
    /// `get_status`). Backends without a separate link are always connected.
    fn is_connected(&self) -> bool {
        true
    }

    /// Drive both motors according to `state`.
    async fn drive(&mut self, state: &MotorState) -> Result<(), DriverError>;

    /// Move one servo to `angle_deg` (already clamped to its limits).
    async fn aim(&mut self, axis: ServoAxis, angle_deg: u8) -> Result<(), DriverError>;

    /// Push a brightness-scaled frame to the LED strip.
    async fn show(&mut self, frame: &[RGB8]) -> Result<(), DriverError>;
}
