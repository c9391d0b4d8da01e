/// Errors that can occur in serial transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the specified port.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// The serial driver rejected a port operation.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// An I/O error occurred on the channel.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// True when the error is a read/write timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Io(err) => err.kind() == std::io::ErrorKind::TimedOut,
            TransportError::Serial(err) | TransportError::Open { source: err, .. } => {
                matches!(err.kind(), serialport::ErrorKind::Io(std::io::ErrorKind::TimedOut))
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
