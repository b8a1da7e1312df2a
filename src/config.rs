//! Server configuration
//!
//! Every field has a default matching the reference rover (two-channel H-bridge
//! on BCM pins 10/26/16 and 9/7/8, six-pixel LED strip, server on port 5000), so
//! a config file only needs the values that differ.
//!
//! ```json
//! {
//!   "bind": "0.0.0.0:8080",
//!   "led_count": 12,
//!   "pitch": { "min_deg": 30, "max_deg": 150 },
//!   "failsafe": { "policy": "active_controller", "command_timeout_ms": 2000 }
//! }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use rover_link_core::led::MAX_LEDS;
use rover_link_core::servo::{ServoCalibration, ServoLimits};
use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level server configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// WebSocket listen address.
    pub bind: SocketAddr,
    /// Number of addressable pixels on the strip (1..=64).
    pub led_count: usize,
    /// Animation frame interval in milliseconds.
    pub animation_interval_ms: u64,
    /// Depth of the command queue feeding the dispatcher.
    pub queue_depth: usize,
    /// Per-session event buffer; slower sessions skip events.
    pub broadcast_capacity: usize,
    pub pitch: ServoConfig,
    pub yaw: ServoConfig,
    pub drive: DriveConfig,
    pub failsafe: FailsafeConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 5000)),
            led_count: 6,
            animation_interval_ms: 50,
            queue_depth: 64,
            broadcast_capacity: 128,
            pitch: ServoConfig::with_pin(12),
            yaw: ServoConfig::with_pin(13),
            drive: DriveConfig::default(),
            failsafe: FailsafeConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from a JSON file, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                Self::from_json(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document (missing fields take defaults).
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.led_count == 0 || self.led_count > MAX_LEDS {
            return Err(ConfigError::Invalid(format!(
                "led_count must be 1..={MAX_LEDS}, got {}",
                self.led_count
            )));
        }
        if self.animation_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "animation_interval_ms must be > 0".to_string(),
            ));
        }
        if self.queue_depth == 0 || self.broadcast_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_depth and broadcast_capacity must be > 0".to_string(),
            ));
        }
        for (name, servo) in [("pitch", &self.pitch), ("yaw", &self.yaw)] {
            if !servo.limits().is_valid() {
                return Err(ConfigError::Invalid(format!(
                    "{name}: servo limits must satisfy min <= center <= max <= 180 and step > 0"
                )));
            }
            if servo.min_pulse_us >= servo.max_pulse_us {
                return Err(ConfigError::Invalid(format!(
                    "{name}: min_pulse_us must be below max_pulse_us"
                )));
            }
        }
        Ok(())
    }
}

/// One pan/tilt servo.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServoConfig {
    pub pin: u8,
    pub min_deg: u8,
    pub max_deg: u8,
    pub center_deg: u8,
    /// Degrees moved per `servo_control` nudge.
    pub step_deg: u8,
    pub min_pulse_us: u16,
    pub max_pulse_us: u16,
}

impl ServoConfig {
    fn with_pin(pin: u8) -> Self {
        let limits = ServoLimits::default();
        let calibration = ServoCalibration::default();
        Self {
            pin,
            min_deg: limits.min_deg,
            max_deg: limits.max_deg,
            center_deg: limits.center_deg,
            step_deg: limits.step_deg,
            min_pulse_us: calibration.min_pulse_us,
            max_pulse_us: calibration.max_pulse_us,
        }
    }

    pub fn limits(&self) -> ServoLimits {
        ServoLimits {
            min_deg: self.min_deg,
            max_deg: self.max_deg,
            center_deg: self.center_deg,
            step_deg: self.step_deg,
        }
    }

    pub fn calibration(&self) -> ServoCalibration {
        ServoCalibration {
            min_pulse_us: self.min_pulse_us,
            max_pulse_us: self.max_pulse_us,
        }
    }
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self::with_pin(12)
    }
}

/// H-bridge wiring for one drive motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MotorPins {
    /// PWM enable pin (ENA/ENB).
    pub enable: u8,
    pub in1: u8,
    pub in2: u8,
    /// Swap IN1/IN2 (motor mounted mirror-image).
    #[serde(default)]
    pub inverted: bool,
}

/// Drive motor wiring.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DriveConfig {
    pub left: MotorPins,
    pub right: MotorPins,
    pub pwm_frequency_hz: u32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            // Motor A: forward is IN1 low / IN2 high
            left: MotorPins {
                enable: 10,
                in1: 26,
                in2: 16,
                inverted: true,
            },
            // Motor B: forward is IN3 high / IN4 low
            right: MotorPins {
                enable: 9,
                in1: 7,
                in2: 8,
                inverted: false,
            },
            pwm_frequency_hz: 100,
        }
    }
}

/// Which disconnects force the motors to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailsafePolicy {
    /// Stop whenever any session disconnects while the motors are running.
    #[default]
    AnySession,
    /// Stop only when the session that issued the current drive command
    /// disconnects.
    #[serde(alias = "last_controller")]
    ActiveController,
}

/// Failsafe settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FailsafeConfig {
    pub policy: FailsafePolicy,
    /// Stop the motors if no command arrives for this long while driving
    /// (milliseconds, 0 = disabled).
    pub command_timeout_ms: u64,
}

impl Default for FailsafeConfig {
    fn default() -> Self {
        Self {
            policy: FailsafePolicy::AnySession,
            command_timeout_ms: 0,
        }
    }
}
