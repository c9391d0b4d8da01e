use bclidar_protocol::ProtocolError;
use bclidar_transport::TransportError;

pub const RESULT_OK: u32 = 0;
pub const RESULT_ALREADY_DONE: u32 = 0x20;
pub const RESULT_INVALID_DATA: u32 = 0x8000_8000;
pub const RESULT_OPERATION_FAIL: u32 = 0x8000_8001;
pub const RESULT_OPERATION_TIMEOUT: u32 = 0x8000_8002;
pub const RESULT_OPERATION_STOP: u32 = 0x8000_8003;
pub const RESULT_OPERATION_NOT_SUPPORT: u32 = 0x8000_8004;
pub const RESULT_FORMAT_NOT_SUPPORT: u32 = 0x8000_8005;
pub const RESULT_INSUFFICIENT_MEMORY: u32 = 0x8000_8006;

/// Errors reported by a lidar driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// Serial transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Wire protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The driver has no open channel.
    #[error("driver is not connected")]
    NotConnected,

    /// No complete rotation arrived in time.
    #[error("operation timed out")]
    Timeout,

    /// The operation ran but could not produce a result.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The device does not support the operation.
    #[error("operation not supported: {0}")]
    NotSupported(String),

    /// The selected scan mode streams an answer format this driver cannot decode.
    #[error("scan answer format {0:#04x} not supported")]
    FormatNotSupported(u8),

    /// The device answered with data that failed validation.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// The scan thread could not be started.
    #[error("failed to spawn scan thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl DriverError {
    /// SDK-compatible result code.
    pub fn result_code(&self) -> u32 {
        match self {
            DriverError::Transport(err) if err.is_timeout() => RESULT_OPERATION_TIMEOUT,
            DriverError::Transport(_) => RESULT_OPERATION_FAIL,
            DriverError::Protocol(err) => match err {
                ProtocolError::Timeout => RESULT_OPERATION_TIMEOUT,
                ProtocolError::ChannelClosed | ProtocolError::Io(_) => RESULT_OPERATION_FAIL,
                ProtocolError::PayloadTooLarge { .. }
                | ProtocolError::UnexpectedAnswer { .. }
                | ProtocolError::PayloadTooShort { .. }
                | ProtocolError::UnexpectedConfKey { .. }
                | ProtocolError::MalformedSentence(_)
                | ProtocolError::ChecksumMismatch { .. } => RESULT_INVALID_DATA,
            },
            DriverError::NotConnected
            | DriverError::OperationFailed(_)
            | DriverError::Spawn(_) => RESULT_OPERATION_FAIL,
            DriverError::Timeout => RESULT_OPERATION_TIMEOUT,
            DriverError::NotSupported(_) => RESULT_OPERATION_NOT_SUPPORT,
            DriverError::FormatNotSupported(_) => RESULT_FORMAT_NOT_SUPPORT,
            DriverError::InvalidData(_) => RESULT_INVALID_DATA,
        }
    }

    /// Result code reinterpreted as the signed status returned across the C ABI.
    pub fn status_code(&self) -> i32 {
        self.result_code() as i32
    }
}

pub type Result<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_map_to_timeout_code() {
        assert_eq!(
            DriverError::Protocol(ProtocolError::Timeout).result_code(),
            RESULT_OPERATION_TIMEOUT
        );
        assert_eq!(DriverError::Timeout.result_code(), RESULT_OPERATION_TIMEOUT);
    }

    #[test]
    fn decode_failures_are_invalid_data() {
        let err = DriverError::Protocol(ProtocolError::UnexpectedAnswer {
            expected: 0x06,
            actual: 0x04,
        });
        assert_eq!(err.result_code(), RESULT_INVALID_DATA);
    }

    #[test]
    fn status_code_is_negative_for_failures() {
        let err = DriverError::NotSupported("spin speed".into());
        assert_eq!(err.result_code(), RESULT_OPERATION_NOT_SUPPORT);
        assert!(err.status_code() < 0);
        assert_eq!(
            DriverError::FormatNotSupported(0x84).status_code(),
            RESULT_FORMAT_NOT_SUPPORT as i32
        );
    }
}
