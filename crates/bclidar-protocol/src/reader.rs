use std::io::{ErrorKind, Read};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::codec::{decode_descriptor, ResponseDescriptor};
use crate::command::answer_name;
use crate::error::{ProtocolError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads answers from any `Read` stream.
///
/// The underlying stream is expected to return `TimedOut` or `WouldBlock`
/// when no data is available; those are treated as "nothing yet" and the
/// caller's deadline decides when to give up.
pub struct ResponseReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> ResponseReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read a single chunk into the internal buffer.
    ///
    /// Returns `Ok(0)` when the stream timed out without data and
    /// `Err(ProtocolError::ChannelClosed)` at end of stream.
    pub fn fill_once(&mut self) -> Result<usize> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(ProtocolError::ChannelClosed),
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return Ok(0)
                }
                Err(err) => return Err(ProtocolError::Io(err)),
            }
        }
    }

    /// Wait for the next answer descriptor and check its type.
    pub fn read_descriptor(
        &mut self,
        expected_type: u8,
        timeout: Duration,
    ) -> Result<ResponseDescriptor> {
        let deadline = Instant::now() + timeout;
        let descriptor = loop {
            if let Some(descriptor) = decode_descriptor(&mut self.buf)? {
                break descriptor;
            }
            self.fill_before(deadline)?;
        };

        trace!(
            answer = answer_name(descriptor.answer_type),
            len = descriptor.len,
            "answer descriptor"
        );
        if descriptor.answer_type != expected_type {
            return Err(ProtocolError::UnexpectedAnswer {
                expected: expected_type,
                actual: descriptor.answer_type,
            });
        }
        Ok(descriptor)
    }

    /// Read a single-shot answer and return its payload.
    ///
    /// The descriptor and payload share one deadline.
    pub fn read_response(&mut self, expected_type: u8, timeout: Duration) -> Result<Bytes> {
        let deadline = Instant::now() + timeout;
        let descriptor = self.read_descriptor(expected_type, timeout)?;
        let len = descriptor.len as usize;
        while self.buf.len() < len {
            self.fill_before(deadline)?;
        }
        Ok(self.buf.split_to(len).freeze())
    }

    fn fill_before(&mut self, deadline: Instant) -> Result<()> {
        if Instant::now() >= deadline {
            return Err(ProtocolError::Timeout);
        }
        self.fill_once()?;
        Ok(())
    }

    /// Bytes received but not yet consumed.
    pub fn buffer_mut(&mut self) -> &mut BytesMut {
        &mut self.buf
    }

    /// Discard any buffered bytes.
    pub fn clear_buffer(&mut self) {
        self.buf.clear();
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
