/// Status returned when a required pointer is null.
pub const STATUS_NULL_ARGUMENT: i32 = -99;

/// Status returned when a panic is caught at the boundary.
pub const STATUS_PANIC: i32 = -1;

#[derive(Debug, thiserror::Error)]
pub enum MarshalError {
    #[error("{0} cannot be null")]
    NullArgument(&'static str),

    #[error("row {0} cannot be null")]
    NullRow(usize),
}

impl MarshalError {
    pub fn status_code(&self) -> i32 {
        match self {
            MarshalError::NullArgument(_) | MarshalError::NullRow(_) => STATUS_NULL_ARGUMENT,
        }
    }
}

pub type Result<T> = std::result::Result<T, MarshalError>;
