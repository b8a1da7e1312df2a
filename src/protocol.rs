//! JSON event protocol
//!
//! Every WebSocket text frame carries one event:
//!
//! ```json
//! {"event": "motor_control", "data": {"action": "forward", "speed": 60, "duration": 0}}
//! ```
//!
//! Inbound frames are decoded into validated [`Command`]s; outbound
//! [`ServerEvent`]s serialize to the same `{event, data}` shape.

use rover_link_core::command::{Command, LedCommand, MotorCommand};
use rover_link_core::motor::DEFAULT_SPEED;
use rover_link_core::servo::{ServoAxis, ServoDirection};
use rover_link_core::animation::Pattern;
use rover_link_core::RGB8;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ControlError;

/// Raw inbound frame before the payload is interpreted.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
struct MotorControlPayload {
    action: String,
    #[serde(default = "default_speed")]
    speed: i64,
    #[serde(default)]
    duration: i64,
}

fn default_speed() -> i64 {
    DEFAULT_SPEED as i64
}

#[derive(Debug, Deserialize)]
struct ServoControlPayload {
    #[serde(rename = "type")]
    axis: String,
    direction: String,
}

#[derive(Debug, Deserialize)]
struct ServoAnglePayload {
    #[serde(rename = "type")]
    axis: String,
    angle: i64,
}

#[derive(Debug, Deserialize)]
struct LedControlPayload {
    action: String,
    #[serde(default = "all_leds")]
    led_index: i64,
    r: Option<i64>,
    g: Option<i64>,
    b: Option<i64>,
    brightness: Option<i64>,
}

fn all_leds() -> i64 {
    -1
}

impl LedControlPayload {
    fn rgb(&self) -> Result<(i64, i64, i64), ControlError> {
        Ok((
            self.r.ok_or(ControlError::MissingField("r"))?,
            self.g.ok_or(ControlError::MissingField("g"))?,
            self.b.ok_or(ControlError::MissingField("b"))?,
        ))
    }

    fn into_command(self) -> Result<LedCommand, ControlError> {
        let command = match self.action.as_str() {
            "set_color" => {
                let (r, g, b) = self.rgb()?;
                LedCommand::set_color(self.led_index, r, g, b)?
            }
            "set_brightness" => {
                let brightness = self
                    .brightness
                    .ok_or(ControlError::MissingField("brightness"))?;
                LedCommand::set_brightness(brightness)?
            }
            "animation_rainbow" => LedCommand::Animate(Pattern::Rainbow),
            "animation_chase" => {
                let (r, g, b) = self.rgb()?;
                LedCommand::chase(r, g, b)?
            }
            "off" => LedCommand::Off,
            _ => return Err(rover_link_core::error::ValidationError::UnknownLedAction.into()),
        };
        Ok(command)
    }
}

fn payload<T: for<'de> Deserialize<'de>>(data: Value) -> Result<T, ControlError> {
    serde_json::from_value(data).map_err(|e| ControlError::Malformed(e.to_string()))
}

/// Decode and validate one inbound text frame.
pub fn decode(text: &str) -> Result<Command, ControlError> {
    let frame: InboundFrame =
        serde_json::from_str(text).map_err(|e| ControlError::Malformed(e.to_string()))?;

    match frame.event.as_str() {
        "motor_control" => {
            let p: MotorControlPayload = payload(frame.data)?;
            Ok(Command::Motor(MotorCommand::parse(
                &p.action, p.speed, p.duration,
            )?))
        }
        "servo_control" => {
            let p: ServoControlPayload = payload(frame.data)?;
            let axis = ServoAxis::parse(&p.axis)?;
            let direction = ServoDirection::parse(&p.direction)?;
            // Reject e.g. pitch + left before it reaches the dispatcher
            direction.step_sign(axis)?;
            Ok(Command::ServoStep { axis, direction })
        }
        "servo_angle" => {
            let p: ServoAnglePayload = payload(frame.data)?;
            Ok(Command::ServoAngle {
                axis: ServoAxis::parse(&p.axis)?,
                angle: p.angle,
            })
        }
        "led_control" => {
            let p: LedControlPayload = payload(frame.data)?;
            Ok(Command::Led(p.into_command()?))
        }
        "get_status" => Ok(Command::GetStatus),
        other => Err(ControlError::UnknownEvent(other.to_string())),
    }
}

/// Server → client event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Status(StatusPayload),
    ServoStatus(ServoStatusPayload),
    LedStatus(LedStatusPayload),
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Serialize to a text frame.
    pub fn to_json(&self) -> String {
        // Serialization of these plain structs cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::ServoStatus(_) => "servo_status",
            Self::LedStatus(_) => "led_status",
            Self::Error(_) => "error",
        }
    }
}

/// `status` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusPayload {
    pub action: &'static str,
    pub speed: u8,
    /// Only present in `get_status` replies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected: Option<bool>,
}

/// `servo_status` payload: one axis after a change, or both in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServoStatusPayload {
    Axis {
        #[serde(rename = "type")]
        axis: &'static str,
        angle: u8,
    },
    Snapshot {
        pitch: u8,
        yaw: u8,
    },
}

/// `led_status` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedStatusPayload {
    pub action: &'static str,
    pub led_index: i64,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'static str>,
    /// Stored colour of every pixel as `[r, g, b]` (snapshot only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pixels: Option<Vec<[u8; 3]>>,
}

impl LedStatusPayload {
    pub fn new(action: &'static str, led_index: i64, color: RGB8) -> Self {
        Self {
            action,
            led_index,
            r: color.r,
            g: color.g,
            b: color.b,
            brightness: None,
            mode: None,
            pixels: None,
        }
    }
}

/// `error` payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub message: String,
}
