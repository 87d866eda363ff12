/// Errors that can occur while locating or driving a serial port.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The platform refused to enumerate serial interfaces.
    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(serialport::Error),

    /// No enumerated interface matched the requested pattern.
    #[error("no serial port matches '{pattern}' (available: {})", format_available(.available))]
    NoMatchingPort {
        pattern: String,
        available: Vec<String>,
    },

    /// The port exists but could not be opened.
    #[error("failed to open {port} at {baud} baud: {source}")]
    Open {
        port: String,
        baud: u32,
        source: serialport::Error,
    },

    /// A port-level setting could not be applied.
    #[error("failed to configure {port}: {source}")]
    Configure {
        port: String,
        source: serialport::Error,
    },

    /// An I/O error occurred on the serial stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the session cannot be established at all.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransportError::NoMatchingPort { .. }
                | TransportError::Open { .. }
                | TransportError::Enumerate(_)
        )
    }

    /// True when the OS refused access to the device node.
    pub fn is_permission_denied(&self) -> bool {
        match self {
            TransportError::Open { source, .. } | TransportError::Configure { source, .. } => {
                source.kind() == serialport::ErrorKind::Io(std::io::ErrorKind::PermissionDenied)
            }
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_port_lists_candidates() {
        let err = TransportError::NoMatchingPort {
            pattern: "USB".to_string(),
            available: vec!["/dev/ttyS0".to_string(), "/dev/ttyS1".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "no serial port matches 'USB' (available: /dev/ttyS0, /dev/ttyS1)"
        );
        assert!(!err.is_permission_denied());
        assert!(err.is_connection_error());
    }

    #[test]
    fn no_matching_port_with_empty_system() {
        let err = TransportError::NoMatchingPort {
            pattern: "USB".to_string(),
            available: Vec::new(),
        };
        assert!(err.to_string().ends_with("(available: none)"));
    }

    #[test]
    fn io_error_is_not_a_connection_error() {
        let err = TransportError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!err.is_connection_error());
    }
}
