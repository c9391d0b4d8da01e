use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::command::CMDFLAG_HAS_PAYLOAD;
use crate::error::{ProtocolError, Result};

/// Request start byte.
pub const SYNC_BYTE: u8 = 0xA5;

/// Second byte of every answer descriptor.
pub const SYNC_BYTE2: u8 = 0x5A;

/// Answer descriptor: sync (2) + length/mode (4) + type (1) = 7 bytes.
pub const DESCRIPTOR_SIZE: usize = 7;

/// Largest payload expressible by the request size byte.
pub const MAX_COMMAND_PAYLOAD: usize = u8::MAX as usize;

const LENGTH_MASK: u32 = 0x3FFF_FFFF;
const MODE_SHIFT: u32 = 30;

/// How the device delivers an answer body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMode {
    /// A single payload of `len` bytes.
    Single,
    /// A continuous stream of `len`-byte packets until stopped.
    Multiple,
    /// Reserved mode bits.
    Other(u8),
}

impl From<u8> for SendMode {
    fn from(bits: u8) -> Self {
        match bits {
            0 => SendMode::Single,
            1 => SendMode::Multiple,
            other => SendMode::Other(other),
        }
    }
}

/// Header preceding every answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseDescriptor {
    /// Payload (or per-packet) length in bytes.
    pub len: u32,
    /// Delivery mode.
    pub mode: SendMode,
    /// Answer type (`ANS_TYPE_*`).
    pub answer_type: u8,
}

/// Encode a request into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬──────┬───────────┬──────────────┬────────────┐
/// │ 0xA5 │ cmd  │ size (1B) │ payload      │ checksum   │
/// │      │      │ optional  │ (size bytes) │ XOR (1B)   │
/// └──────┴──────┴───────────┴──────────────┴────────────┘
/// ```
/// The size, payload and checksum are present only when `payload` is
/// non-empty; the payload flag is then set on the opcode.
pub fn encode_command(cmd: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_COMMAND_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_COMMAND_PAYLOAD,
        });
    }

    if payload.is_empty() {
        dst.reserve(2);
        dst.put_u8(SYNC_BYTE);
        dst.put_u8(cmd);
        return Ok(());
    }

    let cmd = cmd | CMDFLAG_HAS_PAYLOAD;
    let size = payload.len() as u8;
    let checksum = payload
        .iter()
        .fold(SYNC_BYTE ^ cmd ^ size, |acc, byte| acc ^ byte);

    dst.reserve(4 + payload.len());
    dst.put_u8(SYNC_BYTE);
    dst.put_u8(cmd);
    dst.put_u8(size);
    dst.put_slice(payload);
    dst.put_u8(checksum);
    Ok(())
}

/// Decode an answer descriptor from a buffer.
///
/// Bytes preceding the `0xA5 0x5A` sync pair are discarded. Returns
/// `Ok(None)` if the buffer doesn't contain a complete descriptor yet.
pub fn decode_descriptor(src: &mut BytesMut) -> Result<Option<ResponseDescriptor>> {
    let skipped = resync(src);
    if skipped > 0 {
        trace!(skipped, "discarded bytes before answer descriptor");
    }

    if src.len() < DESCRIPTOR_SIZE {
        return Ok(None);
    }

    src.advance(2);
    let size_mode = src.get_u32_le();
    let answer_type = src.get_u8();

    Ok(Some(ResponseDescriptor {
        len: size_mode & LENGTH_MASK,
        mode: SendMode::from((size_mode >> MODE_SHIFT) as u8),
        answer_type,
    }))
}

/// Drop leading bytes until the buffer starts with a (possibly partial)
/// sync pair. Returns the number of discarded bytes.
fn resync(src: &mut BytesMut) -> usize {
    let mut skipped = 0;
    loop {
        match src.first() {
            None => return skipped,
            Some(&SYNC_BYTE) => match src.get(1) {
                None | Some(&SYNC_BYTE2) => return skipped,
                Some(_) => {}
            },
            Some(_) => {}
        }
        src.advance(1);
        skipped += 1;
    }
}

/// Encode a descriptor (device side). Used by test fixtures and simulators.
pub fn encode_descriptor(descriptor: &ResponseDescriptor, dst: &mut BytesMut) {
    let mode_bits: u32 = match descriptor.mode {
        SendMode::Single => 0,
        SendMode::Multiple => 1,
        SendMode::Other(bits) => u32::from(bits & 0x3),
    };
    dst.reserve(DESCRIPTOR_SIZE);
    dst.put_u8(SYNC_BYTE);
    dst.put_u8(SYNC_BYTE2);
    dst.put_u32_le((descriptor.len & LENGTH_MASK) | (mode_bits << MODE_SHIFT));
    dst.put_u8(descriptor.answer_type);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{
        ANS_TYPE_DEVHEALTH, ANS_TYPE_MEASUREMENT, CMD_GET_DEVICE_HEALTH, CMD_SET_MOTOR_PWM,
    };

    #[test]
    fn encode_command_without_payload() {
        let mut buf = BytesMut::new();
        encode_command(CMD_GET_DEVICE_HEALTH, &[], &mut buf).unwrap();
        assert_eq!(buf.as_ref(), &[0xA5, 0x52]);
    }

    #[test]
    fn encode_command_with_payload_appends_checksum() {
        let mut buf = BytesMut::new();
        encode_command(CMD_SET_MOTOR_PWM, &660u16.to_le_bytes(), &mut buf).unwrap();

        let expected_checksum = 0xA5 ^ 0xF0 ^ 0x02 ^ 0x94 ^ 0x02;
        assert_eq!(buf.as_ref(), &[0xA5, 0xF0, 0x02, 0x94, 0x02, expected_checksum]);
    }

    #[test]
    fn encode_sets_payload_flag() {
        let mut buf = BytesMut::new();
        encode_command(0x04, &[1], &mut buf).unwrap();
        assert_eq!(buf[1], 0x84);
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let mut buf = BytesMut::new();
        let payload = vec![0u8; 256];
        let err = encode_command(0x84, &payload, &mut buf).unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { size: 256, .. }));
    }

    #[test]
    fn decode_descriptor_single() {
        let mut buf = BytesMut::from(&[0xA5, 0x5A, 0x03, 0x00, 0x00, 0x00, 0x06][..]);
        let desc = decode_descriptor(&mut buf).unwrap().unwrap();
        assert_eq!(desc.len, 3);
        assert_eq!(desc.mode, SendMode::Single);
        assert_eq!(desc.answer_type, ANS_TYPE_DEVHEALTH);
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_descriptor_multiple_mode() {
        let mut buf = BytesMut::from(&[0xA5, 0x5A, 0x05, 0x00, 0x00, 0x40, 0x81][..]);
        let desc = decode_descriptor(&mut buf).unwrap().unwrap();
        assert_eq!(desc.len, 5);
        assert_eq!(desc.mode, SendMode::Multiple);
        assert_eq!(desc.answer_type, ANS_TYPE_MEASUREMENT);
    }

    #[test]
    fn decode_descriptor_incomplete() {
        let mut buf = BytesMut::from(&[0xA5, 0x5A, 0x03][..]);
        assert!(decode_descriptor(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn decode_descriptor_skips_garbage() {
        let mut buf = BytesMut::from(&[0x00, 0xA5, 0x13, 0xA5, 0x5A, 0x14, 0, 0, 0, 0x04][..]);
        let desc = decode_descriptor(&mut buf).unwrap().unwrap();
        assert_eq!(desc.len, 20);
        assert_eq!(desc.answer_type, 0x04);
    }

    #[test]
    fn decode_descriptor_keeps_trailing_sync_byte() {
        let mut buf = BytesMut::from(&[0x11, 0x22, 0xA5][..]);
        assert!(decode_descriptor(&mut buf).unwrap().is_none());
        assert_eq!(buf.as_ref(), &[0xA5]);
    }

    #[test]
    fn descriptor_encoder_matches_decoder() {
        let desc = ResponseDescriptor {
            len: 84,
            mode: SendMode::Multiple,
            answer_type: 0x82,
        };
        let mut buf = BytesMut::new();
        encode_descriptor(&desc, &mut buf);
        assert_eq!(decode_descriptor(&mut buf).unwrap(), Some(desc));
    }
}
