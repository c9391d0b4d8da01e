use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A connected byte channel to a sensor.
///
/// Reads return `ErrorKind::TimedOut` when no byte arrives within the
/// configured timeout; callers poll against their own deadline.
pub trait Channel: Read + Write + Send + 'static {
    /// Set the per-read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Discard bytes received but not yet read.
    fn clear_input(&mut self) -> Result<()>;

    /// Drive the DTR line. On A-series USB adapters a low DTR spins the motor.
    fn set_dtr(&mut self, level: bool) -> Result<()>;

    /// Open a second handle onto the same device for a reader thread.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Port name for diagnostics.
    fn name(&self) -> String;
}
