//! Vehicle state store
//!
//! [`VehicleState`] is owned by the dispatcher task and never shared; other
//! tasks observe it through events or a [`Snapshot`].

use rover_link_core::led::LedState;
use rover_link_core::motor::MotorState;
use rover_link_core::servo::{ServoAxis, ServoState};

use crate::config::ServerConfig;
use crate::protocol::{
    LedStatusPayload, ServerEvent, ServoStatusPayload, StatusPayload,
};

/// Aggregate of every actuator's commanded state
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub motor: MotorState,
    pub pitch: ServoState,
    pub yaw: ServoState,
    pub leds: LedState,
}

impl VehicleState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            motor: MotorState::stopped(),
            pitch: ServoState::new(ServoAxis::Pitch, config.pitch.limits()),
            yaw: ServoState::new(ServoAxis::Yaw, config.yaw.limits()),
            leds: LedState::new(config.led_count),
        }
    }

    pub fn servo(&self, axis: ServoAxis) -> &ServoState {
        match axis {
            ServoAxis::Pitch => &self.pitch,
            ServoAxis::Yaw => &self.yaw,
        }
    }

    pub fn servo_mut(&mut self, axis: ServoAxis) -> &mut ServoState {
        match axis {
            ServoAxis::Pitch => &mut self.pitch,
            ServoAxis::Yaw => &mut self.yaw,
        }
    }

    pub fn snapshot(&self, sessions: usize, hardware_connected: bool) -> Snapshot {
        Snapshot {
            state: self.clone(),
            sessions,
            hardware_connected,
        }
    }

    /// `status` event for the current motor state
    pub fn motor_status(&self) -> ServerEvent {
        ServerEvent::Status(StatusPayload {
            action: self.motor.action().as_str(),
            speed: self.motor.speed(),
            connected: None,
        })
    }

    /// `servo_status` event for one axis
    pub fn servo_status(&self, axis: ServoAxis) -> ServerEvent {
        ServerEvent::ServoStatus(ServoStatusPayload::Axis {
            axis: axis.as_str(),
            angle: self.servo(axis).angle(),
        })
    }
}

/// Point-in-time copy of the vehicle state
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: VehicleState,
    /// Live sessions when the snapshot was taken
    pub sessions: usize,
    /// Actuator backend link status
    pub hardware_connected: bool,
}

impl Snapshot {
    /// The three events sent in reply to `get_status`
    pub fn status_events(&self) -> [ServerEvent; 3] {
        let state = &self.state;
        let leds = &state.leds;

        let status = ServerEvent::Status(StatusPayload {
            action: state.motor.action().as_str(),
            speed: state.motor.speed(),
            connected: Some(self.hardware_connected),
        });
        let servos = ServerEvent::ServoStatus(ServoStatusPayload::Snapshot {
            pitch: state.pitch.angle(),
            yaw: state.yaw.angle(),
        });
        let led = ServerEvent::LedStatus(LedStatusPayload {
            brightness: Some(leds.brightness()),
            mode: Some(leds.mode().as_str()),
            pixels: Some(leds.pixels().iter().map(|p| [p.r, p.g, p.b]).collect()),
            ..LedStatusPayload::new("snapshot", -1, leds.color())
        });

        [status, servos, led]
    }
}
