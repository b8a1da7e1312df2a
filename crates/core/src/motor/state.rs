//! Commanded drive state

/// Maximum commanded speed (percent)
pub const MAX_SPEED: u8 = 100;

/// Speed used when a drive command omits one (percent)
pub const DEFAULT_SPEED: u8 = 50;

/// Drive action requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorAction {
    Forward,
    Backward,
    /// Pivot left in place
    Left,
    /// Pivot right in place
    Right,
    Stop,
}

impl MotorAction {
    /// Parse the wire name (`forward`, `backward`, `left`, `right`, `stop`)
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "forward" => Some(Self::Forward),
            "backward" => Some(Self::Backward),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }

    /// Wire name of this action
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::Left => "left",
            Self::Right => "right",
            Self::Stop => "stop",
        }
    }
}

/// Vehicle-wide commanded motor state
///
/// Invariant: `action == Stop` implies `speed == 0`. The fields are private so
/// the invariant can only be established through the constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorState {
    action: MotorAction,
    speed: u8,
}

impl MotorState {
    /// Create a motor state; speed is clamped to 100 and forced to 0 for `Stop`
    pub fn new(action: MotorAction, speed: u8) -> Self {
        let speed = match action {
            MotorAction::Stop => 0,
            _ => speed.min(MAX_SPEED),
        };
        Self { action, speed }
    }

    /// The stopped state
    pub const fn stopped() -> Self {
        Self {
            action: MotorAction::Stop,
            speed: 0,
        }
    }

    pub fn action(&self) -> MotorAction {
        self.action
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Whether a drive action other than `Stop` is commanded
    ///
    /// `Forward` at speed 0 counts: the action is still engaged and must be
    /// stopped explicitly.
    pub fn is_running(&self) -> bool {
        self.action != MotorAction::Stop
    }

    /// Normalized (left, right) wheel speeds in [-1.0, +1.0]
    pub fn wheel_speeds(&self) -> (f32, f32) {
        let s = self.speed as f32 / MAX_SPEED as f32;
        match self.action {
            MotorAction::Forward => (s, s),
            MotorAction::Backward => (-s, -s),
            MotorAction::Left => (-s, s),
            MotorAction::Right => (s, -s),
            MotorAction::Stop => (0.0, 0.0),
        }
    }
}

impl Default for MotorState {
    fn default() -> Self {
        Self::stopped()
    }
}

/// How long a drive command holds before the server stops it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveDuration {
    /// Hold until an explicit stop (wire `duration: 0`)
    Unbounded,
    /// Stop automatically after this many milliseconds
    Bounded(u32),
}

impl DriveDuration {
    /// Map the wire value (milliseconds, 0 = unbounded)
    pub fn from_millis(ms: u32) -> Self {
        match ms {
            0 => Self::Unbounded,
            ms => Self::Bounded(ms),
        }
    }

    pub fn as_millis(&self) -> Option<u32> {
        match self {
            Self::Unbounded => None,
            Self::Bounded(ms) => Some(*ms),
        }
    }
}
