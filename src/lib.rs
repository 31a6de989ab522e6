pub mod app;
pub mod bus;
pub mod cli;
pub mod config;
pub mod display;
pub mod hardware;
pub mod lcd_driver;
pub mod stats;
pub mod touch;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    InvalidArgs(String),
    Io(std::io::Error),
    /// Hardware missing or not accessible; fatal at startup.
    BusUnavailable(String),
    /// A single failed transaction during steady-state operation.
    TransientBus(String),
    TouchRead(String),
    /// Caller asked for something outside the panel's addressable bounds.
    ProtocolViolation(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidArgs(msg) => write!(f, "invalid arguments: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
            Error::BusUnavailable(msg) => write!(f, "bus unavailable: {msg}"),
            Error::TransientBus(msg) => write!(f, "bus error: {msg}"),
            Error::TouchRead(msg) => write!(f, "touch read failed: {msg}"),
            Error::ProtocolViolation(msg) => write!(f, "protocol violation: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io(value)
    }
}
