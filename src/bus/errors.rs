use crate::Error;
use std::fmt;
use std::io::ErrorKind;

/// High-level reason a bus could not be opened or a transaction failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFailureKind {
    PermissionDenied,
    DeviceMissing,
    Busy,
    Timeout,
    Disconnected,
    Config,
    Unknown,
}

impl BusFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusFailureKind::PermissionDenied => "permission_denied",
            BusFailureKind::DeviceMissing => "device_missing",
            BusFailureKind::Busy => "busy",
            BusFailureKind::Timeout => "timeout",
            BusFailureKind::Disconnected => "disconnected",
            BusFailureKind::Config => "config",
            BusFailureKind::Unknown => "unknown",
        }
    }

    /// Operator-facing hint appended to startup diagnostics.
    pub fn hint(&self) -> &'static str {
        match self {
            BusFailureKind::PermissionDenied => {
                "run as root or add the user to the spi, i2c and gpio groups"
            }
            BusFailureKind::DeviceMissing => {
                "enable SPI and I2C (dtparam=spi=on, dtparam=i2c_arm=on) and check the HAT is seated"
            }
            BusFailureKind::Busy => {
                "another process holds the pins; stop any other display service and retry"
            }
            BusFailureKind::Timeout | BusFailureKind::Disconnected => {
                "check the wiring and that the panel is powered"
            }
            BusFailureKind::Config => "check the pin and bus numbers in the config file",
            BusFailureKind::Unknown => "see the error above",
        }
    }
}

impl fmt::Display for BusFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an std::io::Error into a bus failure reason.
pub fn classify_io_error(err: &std::io::Error) -> BusFailureKind {
    match err.kind() {
        ErrorKind::PermissionDenied => BusFailureKind::PermissionDenied,
        ErrorKind::NotFound => BusFailureKind::DeviceMissing,
        ErrorKind::TimedOut | ErrorKind::WouldBlock => BusFailureKind::Timeout,
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            BusFailureKind::Disconnected
        }
        ErrorKind::InvalidInput => BusFailureKind::Config,
        _ => {
            if let Some(code) = err.raw_os_error() {
                match code {
                    // 1 = EPERM, 13 = EACCES, 16 = EBUSY, 19 = ENODEV, 6 = ENXIO, 5 = EIO, 110 = ETIMEDOUT
                    1 | 13 => BusFailureKind::PermissionDenied,
                    16 => BusFailureKind::Busy,
                    19 | 6 => BusFailureKind::DeviceMissing,
                    5 => BusFailureKind::Disconnected,
                    110 => BusFailureKind::Timeout,
                    _ => BusFailureKind::Unknown,
                }
            } else {
                BusFailureKind::Unknown
            }
        }
    }
}

/// Build the fatal startup error for a bus that could not be opened.
pub fn unavailable(what: &str, kind: BusFailureKind, detail: impl fmt::Display) -> Error {
    Error::BusUnavailable(format!("{what}: {detail} ({kind}; {})", kind.hint()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_permission_denied() {
        let err = std::io::Error::new(ErrorKind::PermissionDenied, "denied");
        assert_eq!(classify_io_error(&err), BusFailureKind::PermissionDenied);
    }

    #[test]
    fn classify_busy_from_errno() {
        let err = std::io::Error::from_raw_os_error(16);
        assert_eq!(classify_io_error(&err), BusFailureKind::Busy);
    }

    #[test]
    fn classify_missing_device_from_errno() {
        let err = std::io::Error::from_raw_os_error(19);
        let kind = classify_io_error(&err);
        assert_eq!(kind, BusFailureKind::DeviceMissing);
        let msg = format!("{}", unavailable("i2c1", kind, err));
        assert!(msg.contains("(device_missing; enable SPI and I2C"), "{msg}");
    }

    #[test]
    fn unavailable_message_carries_hint() {
        let err = unavailable("spi0", BusFailureKind::PermissionDenied, "open failed");
        let msg = format!("{err}");
        assert!(msg.starts_with("bus unavailable: spi0"));
        assert!(msg.contains("gpio groups"));
    }
}
