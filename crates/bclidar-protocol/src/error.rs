/// Errors that can occur while encoding requests or decoding answers.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The request payload does not fit the one-byte size field.
    #[error("command payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The device answered with a different answer type than requested.
    #[error("unexpected answer type {actual:#04x} (expected {expected:#04x})")]
    UnexpectedAnswer { expected: u8, actual: u8 },

    /// The answer payload is shorter than its fixed layout.
    #[error("answer payload too short ({actual} bytes, need {expected})")]
    PayloadTooShort { expected: usize, actual: usize },

    /// A configuration answer carried a different key than requested.
    #[error("configuration answer for key {actual:#x} (expected {expected:#x})")]
    UnexpectedConfKey { expected: u32, actual: u32 },

    /// A sentence could not be parsed.
    #[error("malformed sentence: {0}")]
    MalformedSentence(String),

    /// A sentence checksum did not match its payload.
    #[error("sentence checksum mismatch (carried {carried:02X}, computed {computed:02X})")]
    ChecksumMismatch { carried: u8, computed: u8 },

    /// No complete answer arrived before the deadline.
    #[error("timed out waiting for device answer")]
    Timeout,

    /// The channel reported end of stream.
    #[error("channel closed")]
    ChannelClosed,

    /// An I/O error occurred while reading or writing.
    #[error("protocol I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
