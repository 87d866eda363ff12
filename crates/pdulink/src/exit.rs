use std::fmt;
use std::io;

use pdulink_frame::FrameError;
use pdulink_link::LinkError;
use pdulink_transport::TransportError;

// Exit codes follow the sysexits-style ranges used across our tooling.
pub const SUCCESS: i32 = 0;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset => TRANSPORT_ERROR,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Io(source) => io_error(context, source),
        ref denied if denied.is_permission_denied() => {
            CliError::new(PERMISSION_DENIED, format!("{context}: {err}"))
        }
        other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
        FrameError::Corrupt(_) | FrameError::FrameTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn link_error(context: &str, err: LinkError) -> CliError {
    match err {
        LinkError::Transport(err) => transport_error(context, err),
        ref lost if lost.is_channel_lost() => {
            CliError::new(TRANSPORT_ERROR, format!("{context}: {err}"))
        }
        LinkError::Frame(err) => frame_error(context, err),
        LinkError::Write(source) => match source {
            FrameError::FrameTooLarge { .. } => {
                CliError::new(DATA_INVALID, format!("{context}: {source}"))
            }
            other => CliError::new(TRANSPORT_ERROR, format!("{context}: {other}")),
        },
        LinkError::Schema(err) => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        LinkError::InvalidRail { .. } => CliError::new(USAGE, format!("{context}: {err}")),
        other => CliError::new(INTERNAL, format!("{context}: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use pdulink_frame::Corruption;

    use super::*;

    #[test]
    fn missing_port_is_a_transport_error() {
        let err = TransportError::NoMatchingPort {
            pattern: "USB".to_string(),
            available: vec!["/dev/ttyS0".to_string()],
        };
        assert_eq!(transport_error("open", err).code, TRANSPORT_ERROR);
    }

    #[test]
    fn link_errors_map_to_documented_codes() {
        let lost = LinkError::Frame(FrameError::ConnectionClosed);
        assert_eq!(link_error("read", lost).code, TRANSPORT_ERROR);

        let broken = LinkError::Frame(FrameError::Io(io::ErrorKind::BrokenPipe.into()));
        assert_eq!(link_error("read", broken).code, TRANSPORT_ERROR);

        let corrupt = LinkError::Frame(FrameError::Corrupt(Corruption::Empty));
        assert_eq!(link_error("read", corrupt).code, DATA_INVALID);

        let rail = LinkError::InvalidRail { rail: 12, max: 8 };
        let mapped = link_error("send", rail);
        assert_eq!(mapped.code, USAGE);
        assert!(mapped.message.contains("invalid rail 12"));

        assert_eq!(link_error("send", LinkError::WriterPoisoned).code, INTERNAL);
    }

    #[test]
    fn io_error_codes() {
        assert_eq!(
            io_error("x", io::ErrorKind::PermissionDenied.into()).code,
            PERMISSION_DENIED
        );
        assert_eq!(io_error("x", io::ErrorKind::TimedOut.into()).code, TIMEOUT);
        assert_eq!(io_error("x", io::ErrorKind::Other.into()).code, INTERNAL);
    }
}
