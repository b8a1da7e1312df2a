//! Typed control commands
//!
//! The wire protocol hands us loosely typed values (strings and JSON numbers).
//! The constructors here are the single place where those values are range
//! checked and turned into commands that can be applied without further
//! validation, except for checks that depend on live state (LED strip length).

use smart_leds::RGB8;

use crate::animation::Pattern;
use crate::error::ValidationError;
use crate::led::MAX_BRIGHTNESS;
use crate::motor::{DriveDuration, MotorAction, MotorState, MAX_SPEED};
use crate::servo::{ServoAxis, ServoDirection};

/// One validated client command
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// `motor_control`
    Motor(MotorCommand),
    /// `servo_control`: relative step or re-center
    ServoStep {
        axis: ServoAxis,
        direction: ServoDirection,
    },
    /// `servo_angle`: absolute set (clamped when applied)
    ServoAngle { axis: ServoAxis, angle: i64 },
    /// `led_control`
    Led(LedCommand),
    /// `get_status`
    GetStatus,
}

/// Drive request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub state: MotorState,
    pub duration: DriveDuration,
}

impl MotorCommand {
    /// Validate a `motor_control` payload
    ///
    /// # Errors
    ///
    /// Unknown action, speed outside [0, 100], or a negative / oversized duration.
    pub fn parse(action: &str, speed: i64, duration_ms: i64) -> Result<Self, ValidationError> {
        let action = MotorAction::parse(action).ok_or(ValidationError::UnknownMotorAction)?;
        if !(0..=MAX_SPEED as i64).contains(&speed) {
            return Err(ValidationError::SpeedOutOfRange(speed));
        }
        let duration_ms = u32::try_from(duration_ms)
            .map_err(|_| ValidationError::DurationOutOfRange(duration_ms))?;

        Ok(Self {
            state: MotorState::new(action, speed as u8),
            duration: DriveDuration::from_millis(duration_ms),
        })
    }

    /// Explicit stop, as issued by the failsafe
    pub fn stop() -> Self {
        Self {
            state: MotorState::stopped(),
            duration: DriveDuration::Unbounded,
        }
    }
}

/// LED request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedCommand {
    /// Static colour; the index is resolved against the strip when applied
    SetColor { led_index: i64, color: RGB8 },
    SetBrightness(u8),
    Animate(Pattern),
    Off,
}

impl LedCommand {
    /// Validate a `set_color` payload
    ///
    /// Only the colour is checked here; `led_index` is resolved against the
    /// strip with [`crate::led::LedState::target`].
    pub fn set_color(led_index: i64, r: i64, g: i64, b: i64) -> Result<Self, ValidationError> {
        Ok(Self::SetColor {
            led_index,
            color: rgb(r, g, b)?,
        })
    }

    /// Validate a `set_brightness` payload
    pub fn set_brightness(brightness: i64) -> Result<Self, ValidationError> {
        if !(0..=MAX_BRIGHTNESS as i64).contains(&brightness) {
            return Err(ValidationError::BrightnessOutOfRange(brightness));
        }
        Ok(Self::SetBrightness(brightness as u8))
    }

    /// Validate an `animation_chase` payload
    pub fn chase(r: i64, g: i64, b: i64) -> Result<Self, ValidationError> {
        Ok(Self::Animate(Pattern::Chase(rgb(r, g, b)?)))
    }
}

/// Validate a colour triple
pub fn rgb(r: i64, g: i64, b: i64) -> Result<RGB8, ValidationError> {
    Ok(RGB8::new(channel("r", r)?, channel("g", g)?, channel("b", b)?))
}

fn channel(name: &'static str, value: i64) -> Result<u8, ValidationError> {
    u8::try_from(value).map_err(|_| ValidationError::ChannelOutOfRange {
        channel: name,
        value,
    })
}
