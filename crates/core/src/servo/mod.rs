//! Pan/tilt servo abstraction
//!
//! This module provides platform-agnostic types and functions for the camera
//! mount's two hobby servos:
//! - Axis and direction vocabulary (`pitch`/`yaw`, `up`/`down`/`left`/`right`/`center`)
//! - Safe angle limits with clamping and fixed-step nudging
//! - PWM conversion (angle → pulse width → duty cycle)
//!
//! # Design
//!
//! This module is pure `no_std` with no feature gates. Drivers that actually emit
//! PWM belong in the server crate.
//!
//! ## Safety
//!
//! A `ServoState` can never hold an angle outside its `ServoLimits`. Every setter
//! clamps, so the physical end stops of the mount are never driven into.

use crate::error::ValidationError;

/// Servo axis of the pan/tilt mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServoAxis {
    /// Tilt (up/down)
    Pitch,
    /// Pan (left/right)
    Yaw,
}

impl ServoAxis {
    /// Parse the wire name (`pitch` or `yaw`)
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name {
            "pitch" => Ok(Self::Pitch),
            "yaw" => Ok(Self::Yaw),
            _ => Err(ValidationError::UnknownServoAxis),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pitch => "pitch",
            Self::Yaw => "yaw",
        }
    }
}

/// Relative servo command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoDirection {
    Up,
    Down,
    Left,
    Right,
    Center,
}

impl ServoDirection {
    /// Parse the wire name
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name {
            "up" => Ok(Self::Up),
            "down" => Ok(Self::Down),
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            _ => Err(ValidationError::UnknownServoDirection),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }

    /// Step sign for this direction on `axis`
    ///
    /// Returns `Ok(None)` for `Center`, `Ok(Some(+1/-1))` for a step, and an
    /// error for directions that do not belong to the axis.
    pub fn step_sign(&self, axis: ServoAxis) -> Result<Option<i16>, ValidationError> {
        match (axis, self) {
            (_, Self::Center) => Ok(None),
            (ServoAxis::Pitch, Self::Up) | (ServoAxis::Yaw, Self::Right) => Ok(Some(1)),
            (ServoAxis::Pitch, Self::Down) | (ServoAxis::Yaw, Self::Left) => Ok(Some(-1)),
            (axis, direction) => Err(ValidationError::DirectionNotValidForAxis {
                axis,
                direction: *direction,
            }),
        }
    }
}

/// Safe angle range and stepping for one axis (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoLimits {
    pub min_deg: u8,  // Default: 0
    pub max_deg: u8,  // Default: 180
    pub center_deg: u8, // Default: 90
    pub step_deg: u8, // Default: 5 (per servo_control nudge)
}

impl Default for ServoLimits {
    fn default() -> Self {
        Self {
            min_deg: 0,
            max_deg: 180,
            center_deg: 90,
            step_deg: 5,
        }
    }
}

impl ServoLimits {
    /// Check that `min <= center <= max <= 180` and the step is non-zero
    pub fn is_valid(&self) -> bool {
        self.min_deg <= self.center_deg
            && self.center_deg <= self.max_deg
            && self.max_deg <= 180
            && self.step_deg > 0
    }

    /// Clamp an arbitrary requested angle into the safe range
    pub fn clamp(&self, angle: i64) -> u8 {
        angle.clamp(self.min_deg as i64, self.max_deg as i64) as u8
    }
}

/// Commanded angle of one servo axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoState {
    axis: ServoAxis,
    angle: u8,
    limits: ServoLimits,
}

impl ServoState {
    /// Create a servo state resting at the center angle
    pub fn new(axis: ServoAxis, limits: ServoLimits) -> Self {
        Self {
            axis,
            angle: limits.clamp(limits.center_deg as i64),
            limits,
        }
    }

    pub fn axis(&self) -> ServoAxis {
        self.axis
    }

    pub fn angle(&self) -> u8 {
        self.angle
    }

    pub fn limits(&self) -> &ServoLimits {
        &self.limits
    }

    /// Angle an absolute set would produce, without applying it
    pub fn angle_for_set(&self, angle: i64) -> u8 {
        self.limits.clamp(angle)
    }

    /// Angle a relative command would produce, without applying it
    ///
    /// # Errors
    ///
    /// Returns `DirectionNotValidForAxis` if the direction belongs to the other axis.
    pub fn angle_for_nudge(&self, direction: ServoDirection) -> Result<u8, ValidationError> {
        let angle = match direction.step_sign(self.axis)? {
            None => self.limits.center_deg as i64,
            Some(sign) => self.angle as i64 + (sign * self.limits.step_deg as i16) as i64,
        };
        Ok(self.limits.clamp(angle))
    }

    /// Absolute set, clamped to the safe range
    pub fn set_angle(&mut self, angle: i64) -> u8 {
        self.angle = self.angle_for_set(angle);
        self.angle
    }

    /// Relative step or re-center, clamped to the safe range
    pub fn nudge(&mut self, direction: ServoDirection) -> Result<u8, ValidationError> {
        self.angle = self.angle_for_nudge(direction)?;
        Ok(self.angle)
    }
}

/// Servo pulse calibration (microseconds at 0° and 180°)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoCalibration {
    pub min_pulse_us: u16, // Default: 500 (0°)
    pub max_pulse_us: u16, // Default: 2500 (180°)
}

impl Default for ServoCalibration {
    fn default() -> Self {
        Self {
            min_pulse_us: 500,
            max_pulse_us: 2500,
        }
    }
}

/// Convert an angle (0-180°) to a pulse width using the calibration
pub fn angle_to_pulse(angle_deg: u8, calibration: &ServoCalibration) -> u16 {
    let neutral = calibration.min_pulse_us + (calibration.max_pulse_us - calibration.min_pulse_us) / 2;
    let normalized = (angle_deg as f32 - 90.0) / 90.0;
    normalized_to_pulse(
        normalized,
        calibration.min_pulse_us,
        neutral,
        calibration.max_pulse_us,
    )
}

/// Convert normalized value to PWM pulse width (microseconds)
///
/// # Arguments
///
/// * `normalized` - Normalized value (-1.0 to +1.0)
/// * `min` - Minimum pulse width (μs)
/// * `neutral` - Neutral pulse width (μs)
/// * `max` - Maximum pulse width (μs)
pub fn normalized_to_pulse(normalized: f32, min: u16, neutral: u16, max: u16) -> u16 {
    let clamped = normalized.clamp(-1.0, 1.0);

    if clamped < 0.0 {
        let range = (neutral - min) as f32;
        let offset = range * (-clamped);
        neutral - offset as u16
    } else {
        let range = (max - neutral) as f32;
        let offset = range * clamped;
        neutral + offset as u16
    }
}

/// Convert pulse width to PWM duty cycle
///
/// For 50 Hz PWM (20 ms period):
/// - 500 μs = 2.5% duty cycle
/// - 1500 μs = 7.5% duty cycle
/// - 2500 μs = 12.5% duty cycle
pub fn pulse_to_duty_cycle(pulse_us: u16) -> f32 {
    // 50 Hz = 20,000 μs period
    const PERIOD_US: f32 = 20_000.0;
    pulse_us as f32 / PERIOD_US
}
