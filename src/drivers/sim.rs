//! Simulated actuator backend
//!
//! Runs the real H-bridge and servo conversion logic from `rover_link_core`
//! against in-memory pins, so the server can be exercised on any host. Pin
//! levels, duty cycles and the last LED frame can be inspected afterwards.

use async_trait::async_trait;
use rover_link_core::motor::{
    Drivetrain, HBridgeMotor, MotorError, MotorState, OutputPin, PwmPin,
};
use rover_link_core::servo::{angle_to_pulse, pulse_to_duty_cycle, ServoAxis, ServoCalibration};
use rover_link_core::RGB8;

use super::Actuators;
use crate::config::{MotorPins, ServerConfig, ServoConfig};
use crate::error::DriverError;

/// Servo PWM frame rate
const SERVO_PWM_HZ: u32 = 50;

/// Simulated PWM channel with duty cycle tracking.
#[derive(Debug, Clone)]
pub struct SimPwm {
    pin: u8,
    frequency: u32,
    duty_cycle: f32,
}

impl SimPwm {
    pub fn new(pin: u8, frequency: u32) -> Self {
        Self {
            pin,
            frequency,
            duty_cycle: 0.0,
        }
    }

    pub fn duty_cycle(&self) -> f32 {
        self.duty_cycle
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl PwmPin for SimPwm {
    fn set_duty(&mut self, duty: f32) -> Result<(), MotorError> {
        if !(0.0..=1.0).contains(&duty) {
            return Err(MotorError::InvalidSpeed);
        }
        self.duty_cycle = duty;
        Ok(())
    }
}

/// Simulated digital output (default low).
#[derive(Debug, Clone)]
pub struct SimPin {
    pin: u8,
    high: bool,
}

impl SimPin {
    pub fn new(pin: u8) -> Self {
        Self { pin, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn pin(&self) -> u8 {
        self.pin
    }
}

impl OutputPin for SimPin {
    fn set_level(&mut self, high: bool) -> Result<(), MotorError> {
        self.high = high;
        Ok(())
    }
}

type SimMotor = HBridgeMotor<SimPwm, SimPin, SimPin>;

fn motor(pins: &MotorPins, frequency: u32) -> SimMotor {
    HBridgeMotor::new(
        SimPwm::new(pins.enable, frequency),
        SimPin::new(pins.in1),
        SimPin::new(pins.in2),
        pins.inverted,
    )
}

/// One servo output: PWM channel plus its pulse calibration.
#[derive(Debug, Clone)]
struct SimServo {
    pwm: SimPwm,
    calibration: ServoCalibration,
    pulse_us: u16,
}

impl SimServo {
    fn new(config: &ServoConfig) -> Self {
        Self {
            pwm: SimPwm::new(config.pin, SERVO_PWM_HZ),
            calibration: config.calibration(),
            pulse_us: 0,
        }
    }

    fn write(&mut self, angle_deg: u8) -> Result<u16, MotorError> {
        let pulse = angle_to_pulse(angle_deg, &self.calibration);
        self.pwm.set_duty(pulse_to_duty_cycle(pulse))?;
        self.pulse_us = pulse;
        Ok(pulse)
    }
}

/// Host-side actuator backend
pub struct SimActuators {
    drivetrain: Drivetrain<SimMotor>,
    pitch: SimServo,
    yaw: SimServo,
    strip: Vec<RGB8>,
    frames_shown: u64,
}

impl SimActuators {
    pub fn new(config: &ServerConfig) -> Self {
        let frequency = config.drive.pwm_frequency_hz;
        Self {
            drivetrain: Drivetrain::new(
                motor(&config.drive.left, frequency),
                motor(&config.drive.right, frequency),
            ),
            pitch: SimServo::new(&config.pitch),
            yaw: SimServo::new(&config.yaw),
            strip: vec![RGB8::default(); config.led_count],
            frames_shown: 0,
        }
    }

    /// Enable duty of the (left, right) motors
    pub fn motor_duties(&self) -> (f32, f32) {
        (
            self.drivetrain.left().enable_pin().duty_cycle(),
            self.drivetrain.right().enable_pin().duty_cycle(),
        )
    }

    /// IN1/IN2 levels of the (left, right) motors
    pub fn direction_levels(&self) -> ((bool, bool), (bool, bool)) {
        let levels = |m: &SimMotor| {
            let (in1, in2) = m.direction_pins();
            (in1.is_high(), in2.is_high())
        };
        (levels(self.drivetrain.left()), levels(self.drivetrain.right()))
    }

    /// Last pulse width written to a servo, in microseconds
    pub fn servo_pulse(&self, axis: ServoAxis) -> u16 {
        match axis {
            ServoAxis::Pitch => self.pitch.pulse_us,
            ServoAxis::Yaw => self.yaw.pulse_us,
        }
    }

    /// Last frame pushed to the strip
    pub fn strip(&self) -> &[RGB8] {
        &self.strip
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

#[async_trait]
impl Actuators for SimActuators {
    fn name(&self) -> &str {
        "sim"
    }

    async fn drive(&mut self, state: &MotorState) -> Result<(), DriverError> {
        self.drivetrain.apply(state)?;
        let (left, right) = self.motor_duties();
        crate::log_debug!(
            "drive {} {}: left duty {:.2}, right duty {:.2}",
            state.action().as_str(),
            state.speed(),
            left,
            right
        );
        Ok(())
    }

    async fn aim(&mut self, axis: ServoAxis, angle_deg: u8) -> Result<(), DriverError> {
        let servo = match axis {
            ServoAxis::Pitch => &mut self.pitch,
            ServoAxis::Yaw => &mut self.yaw,
        };
        let pulse = servo.write(angle_deg).map_err(|_| DriverError::Servo {
            axis: axis.as_str(),
        })?;
        crate::log_debug!(
            "{} servo on pin {} -> {} deg ({} us)",
            axis.as_str(),
            servo.pwm.pin(),
            angle_deg,
            pulse
        );
        Ok(())
    }

    async fn show(&mut self, frame: &[RGB8]) -> Result<(), DriverError> {
        if frame.len() != self.strip.len() {
            return Err(DriverError::Led(format!(
                "frame has {} pixels, strip has {}",
                frame.len(),
                self.strip.len()
            )));
        }
        self.strip.copy_from_slice(frame);
        self.frames_shown += 1;
        crate::log_trace!("led frame {}: {:?}", self.frames_shown, frame);
        Ok(())
    }
}
