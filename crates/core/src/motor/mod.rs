//! Drive motor abstraction
//!
//! This module provides a zero-cost abstraction for the rover's two drive motors,
//! each wired to one channel of an L298N-style dual H-bridge (one PWM enable pin
//! plus two direction inputs per channel).
//!
//! # Features
//!
//! - Platform-independent `Motor` trait for generic motor control
//! - H-bridge motor driver implementation (enable PWM + IN1/IN2 direction pins)
//! - `Drivetrain` pairing left/right motors for differential (skid) steering
//! - Commanded drive state (`MotorAction`, `MotorState`, `DriveDuration`)
//!
//! # Design
//!
//! This module is pure `no_std` with no feature gates. Simulated or real pin
//! implementations belong in the server crate. Deciding *whether* the motors may
//! run (failsafe, auto-stop) is the responsibility of the caller.

mod state;

pub use state::{DriveDuration, MotorAction, MotorState, DEFAULT_SPEED, MAX_SPEED};

/// Motor control error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// Speed value outside [-1.0, +1.0] range
    InvalidSpeed,
    /// Hardware PWM or GPIO channel unavailable or write failed
    HardwareFault,
}

impl core::fmt::Display for MotorError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MotorError::InvalidSpeed => write!(f, "Motor speed outside [-1.0, +1.0]"),
            MotorError::HardwareFault => write!(f, "Motor hardware fault"),
        }
    }
}

impl core::error::Error for MotorError {}

/// PWM pin abstraction for the H-bridge enable input
pub trait PwmPin {
    /// Set PWM duty cycle as a fraction [0.0, 1.0]
    ///
    /// # Errors
    ///
    /// Returns `MotorError::HardwareFault` if PWM hardware fails.
    fn set_duty(&mut self, duty: f32) -> Result<(), MotorError>;
}

/// Digital output abstraction for the H-bridge direction inputs
pub trait OutputPin {
    /// Drive the pin high (`true`) or low (`false`)
    ///
    /// # Errors
    ///
    /// Returns `MotorError::HardwareFault` if the GPIO write fails.
    fn set_level(&mut self, high: bool) -> Result<(), MotorError>;
}

/// Motor control trait (platform-independent)
///
/// Speed values are normalized to [-1.0, +1.0]:
/// - `+1.0` = full forward
/// - `0.0` = stopped
/// - `-1.0` = full reverse
pub trait Motor {
    /// Set motor speed and direction
    ///
    /// # Errors
    ///
    /// Returns `MotorError::InvalidSpeed` if speed is outside [-1.0, +1.0] range.
    /// Returns `MotorError::HardwareFault` if pin hardware fails.
    fn set_speed(&mut self, speed: f32) -> Result<(), MotorError>;

    /// Stop motor (coast: enable at 0%, both direction pins LOW)
    fn stop(&mut self) -> Result<(), MotorError>;
}

/// L298N-style H-bridge channel
///
/// # Truth Table
///
/// | EN  | IN1 | IN2 | Motor State                     |
/// |-----|-----|-----|---------------------------------|
/// | 0   | x   | x   | Coast                           |
/// | PWM | 1   | 0   | Forward (speed = EN duty cycle) |
/// | PWM | 0   | 1   | Reverse (speed = EN duty cycle) |
///
/// `inverted` swaps IN1/IN2 for motors mounted (or wired) mirror-image, which is
/// the usual case for one side of a skid-steer chassis.
pub struct HBridgeMotor<EN, IN1, IN2>
where
    EN: PwmPin,
    IN1: OutputPin,
    IN2: OutputPin,
{
    enable: EN,
    in1: IN1,
    in2: IN2,
    inverted: bool,
}

impl<EN, IN1, IN2> HBridgeMotor<EN, IN1, IN2>
where
    EN: PwmPin,
    IN1: OutputPin,
    IN2: OutputPin,
{
    /// Create new H-bridge motor from initialized pins
    ///
    /// The motor is not driven until the first call; callers that need a known
    /// output state should call [`Motor::stop`] right after construction.
    pub fn new(enable: EN, in1: IN1, in2: IN2, inverted: bool) -> Self {
        Self {
            enable,
            in1,
            in2,
            inverted,
        }
    }

    /// Get reference to the enable pin
    pub fn enable_pin(&self) -> &EN {
        &self.enable
    }

    /// Get references to the direction pins (IN1, IN2)
    pub fn direction_pins(&self) -> (&IN1, &IN2) {
        (&self.in1, &self.in2)
    }

    fn set_direction(&mut self, forward: bool) -> Result<(), MotorError> {
        let in1_high = forward != self.inverted;
        self.in1.set_level(in1_high)?;
        self.in2.set_level(!in1_high)?;
        Ok(())
    }
}

impl<EN, IN1, IN2> Motor for HBridgeMotor<EN, IN1, IN2>
where
    EN: PwmPin,
    IN1: OutputPin,
    IN2: OutputPin,
{
    #[inline]
    fn set_speed(&mut self, speed: f32) -> Result<(), MotorError> {
        if !(-1.0..=1.0).contains(&speed) {
            return Err(MotorError::InvalidSpeed);
        }

        if speed == 0.0 {
            return self.stop();
        }

        // Direction first so the enable edge never drives the old direction
        self.set_direction(speed > 0.0)?;
        self.enable.set_duty(speed.abs())?;
        Ok(())
    }

    #[inline]
    fn stop(&mut self) -> Result<(), MotorError> {
        self.enable.set_duty(0.0)?;
        self.in1.set_level(false)?;
        self.in2.set_level(false)?;
        Ok(())
    }
}

/// Left/right motor pair for differential drive
pub struct Drivetrain<M: Motor> {
    left: M,
    right: M,
}

impl<M: Motor> Drivetrain<M> {
    /// Create a drivetrain from the left and right motors
    pub fn new(left: M, right: M) -> Self {
        Self { left, right }
    }

    /// Drive both motors according to a commanded state
    ///
    /// `Stop` coasts both motors rather than braking, matching an unpowered
    /// H-bridge.
    #[inline]
    pub fn apply(&mut self, state: &MotorState) -> Result<(), MotorError> {
        if state.action() == MotorAction::Stop {
            return self.stop_all();
        }
        let (left, right) = state.wheel_speeds();
        self.left.set_speed(left)?;
        self.right.set_speed(right)?;
        Ok(())
    }

    /// Stop both motors (coast mode)
    #[inline]
    pub fn stop_all(&mut self) -> Result<(), MotorError> {
        // Attempt both sides even if the first fails
        let left = self.left.stop();
        let right = self.right.stop();
        left.and(right)
    }

    /// Get immutable reference to the left motor
    pub fn left(&self) -> &M {
        &self.left
    }

    /// Get immutable reference to the right motor
    pub fn right(&self) -> &M {
        &self.right
    }
}
