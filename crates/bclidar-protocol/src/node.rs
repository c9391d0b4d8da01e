use bytes::{Buf, BytesMut};
use serde::Serialize;

/// Size of one standard-scan measurement packet.
pub const STANDARD_NODE_SIZE: usize = 5;

/// Flag bit set on the first node of a new revolution.
pub const NODE_SYNC_FLAG: u8 = 0x1;

const CHECK_BIT: u16 = 0x1;
const ANGLE_SHIFT: u16 = 1;

/// One measurement in the fixed-point HQ layout.
///
/// `angle_z_q14` is degrees scaled so that 90° equals `1 << 14`;
/// `dist_mm_q2` is millimetres scaled by 4. A zero distance marks an
/// invalid measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MeasurementNode {
    pub angle_z_q14: u16,
    pub dist_mm_q2: u32,
    pub quality: u8,
    pub flag: u8,
}

impl MeasurementNode {
    /// Angle in degrees.
    pub fn angle_degrees(&self) -> f32 {
        f32::from(self.angle_z_q14) * 90.0 / 16384.0
    }

    /// Distance in millimetres.
    pub fn distance_mm(&self) -> f32 {
        self.dist_mm_q2 as f32 / 4.0
    }

    pub fn is_sync(&self) -> bool {
        self.flag & NODE_SYNC_FLAG != 0
    }

    pub fn is_valid(&self) -> bool {
        self.dist_mm_q2 != 0
    }

    /// Store an angle given in degrees. Values outside the raw range
    /// saturate.
    pub fn set_angle_degrees(&mut self, degrees: f32) {
        self.angle_z_q14 = (degrees * 16384.0 / 90.0) as u16;
    }

    /// Convert a 5-byte standard packet. The caller checks validity first.
    fn from_standard(sync_quality: u8, angle_q6_checkbit: u16, distance_q2: u16) -> Self {
        let angle_q6 = u32::from(angle_q6_checkbit >> ANGLE_SHIFT);
        Self {
            angle_z_q14: ((angle_q6 << 8) / 90) as u16,
            dist_mm_q2: u32::from(distance_q2),
            quality: (sync_quality >> 2) << 2,
            flag: sync_quality & NODE_SYNC_FLAG,
        }
    }
}

/// A standard packet is valid when the sync bit and its inverse disagree
/// and the angle check bit is set.
fn is_valid_standard(head: &[u8]) -> bool {
    let sync = head[0] & 0x1;
    let inverse = (head[0] >> 1) & 0x1;
    sync ^ inverse == 1 && u16::from(head[1]) & CHECK_BIT == CHECK_BIT
}

/// Decode every complete standard packet in `src` into `out`.
///
/// Invalid packets are skipped one byte at a time until the stream is back
/// in phase. A trailing partial packet is left in the buffer. Returns the
/// number of nodes appended.
pub fn decode_standard_nodes(src: &mut BytesMut, out: &mut Vec<MeasurementNode>) -> usize {
    let before = out.len();
    while src.len() >= STANDARD_NODE_SIZE {
        if !is_valid_standard(&src[..STANDARD_NODE_SIZE]) {
            src.advance(1);
            continue;
        }
        let sync_quality = src.get_u8();
        let angle = src.get_u16_le();
        let distance = src.get_u16_le();
        out.push(MeasurementNode::from_standard(sync_quality, angle, distance));
    }
    out.len() - before
}
