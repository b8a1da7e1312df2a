use rover_link_core::error::ValidationError;
use rover_link_core::motor::MotorError;

/// Errors that can occur while handling a client command.
///
/// Every variant is reported to the client as an `error` event; none of them is
/// fatal to the server.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Hardware error: {0}")]
    Hardware(#[from] DriverError),

    #[error("Dispatcher is not running")]
    Unavailable,
}

/// Errors reported by actuator drivers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DriverError {
    #[error("motor driver: {0}")]
    Motor(#[from] MotorError),

    #[error("{axis} servo driver fault")]
    Servo { axis: &'static str },

    #[error("LED strip: {0}")]
    Led(String),
}

/// Errors that can occur while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Fatal errors while starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Cannot bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Dispatcher task failed: {0}")]
    Dispatcher(String),
}
