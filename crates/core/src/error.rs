//! Command validation errors
//!
//! Every client command is validated before it touches vehicle state. A
//! `ValidationError` means the command was rejected as a whole and nothing was
//! applied.

use core::fmt;

use crate::servo::{ServoAxis, ServoDirection};

/// Reasons a control command is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// `motor_control.action` is not one of forward/backward/left/right/stop
    UnknownMotorAction,
    /// `type` is not `pitch` or `yaw`
    UnknownServoAxis,
    /// `direction` is not one of up/down/left/right/center
    UnknownServoDirection,
    /// `led_control.action` is not a known LED action
    UnknownLedAction,
    /// Direction is not meaningful for the axis (e.g. pitch + left)
    DirectionNotValidForAxis {
        axis: ServoAxis,
        direction: ServoDirection,
    },
    /// Speed outside [0, 100]
    SpeedOutOfRange(i64),
    /// Duration negative or too large
    DurationOutOfRange(i64),
    /// Colour channel outside [0, 255]
    ChannelOutOfRange {
        /// Channel name (`r`, `g` or `b`)
        channel: &'static str,
        value: i64,
    },
    /// Brightness outside [0, 100]
    BrightnessOutOfRange(i64),
    /// LED index is neither -1 (all) nor a valid pixel index
    LedIndexOutOfRange {
        index: i64,
        led_count: usize,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownMotorAction => write!(f, "Unknown motor action"),
            ValidationError::UnknownServoAxis => write!(f, "Unknown servo type"),
            ValidationError::UnknownServoDirection => write!(f, "Unknown servo direction"),
            ValidationError::UnknownLedAction => write!(f, "Unknown LED action"),
            ValidationError::DirectionNotValidForAxis { axis, direction } => write!(
                f,
                "Direction '{}' is not valid for {} servo",
                direction.as_str(),
                axis.as_str()
            ),
            ValidationError::SpeedOutOfRange(speed) => {
                write!(f, "Speed {} out of range (0-100)", speed)
            }
            ValidationError::DurationOutOfRange(duration) => {
                write!(f, "Duration {} ms out of range", duration)
            }
            ValidationError::ChannelOutOfRange { channel, value } => {
                write!(f, "Color channel {}={} out of range (0-255)", channel, value)
            }
            ValidationError::BrightnessOutOfRange(brightness) => {
                write!(f, "Brightness {} out of range (0-100)", brightness)
            }
            ValidationError::LedIndexOutOfRange { index, led_count } => write!(
                f,
                "LED index {} out of range (-1 or 0-{})",
                index,
                led_count.saturating_sub(1)
            ),
        }
    }
}

impl core::error::Error for ValidationError {}
