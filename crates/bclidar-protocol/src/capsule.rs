//! Express-scan capsule decoding.
//!
//! Express modes stream fixed-size capsules: a 2-byte sync/checksum
//! header, a start angle and a run of cabins. Cabin angles are spread
//! between a capsule's start angle and the *next* capsule's start angle,
//! so nodes are only produced for the previous capsule once the current
//! one arrives.
//!
//! Three cabin layouts exist:
//! - [`CapsuleKind::Express`]: 16 cabins of two distances plus angle offsets.
//! - [`CapsuleKind::Ultra`]: 32 packed words of one base distance and two
//!   predicted deltas, with variable bit scaling.
//! - [`CapsuleKind::Dense`]: 40 plain distances at even angle steps.

use bytes::{Buf, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::command::{
    ANS_TYPE_MEASUREMENT_CAPSULED, ANS_TYPE_MEASUREMENT_CAPSULED_ULTRA,
    ANS_TYPE_MEASUREMENT_DENSE_CAPSULED,
};
use crate::node::{MeasurementNode, NODE_SYNC_FLAG};

/// Size of one express (or dense) capsule on the wire.
pub const CAPSULE_SIZE: usize = 84;

/// Size of one ultra capsule on the wire.
pub const ULTRA_CAPSULE_SIZE: usize = 132;

const SYNC_NIBBLE_1: u8 = 0xA;
const SYNC_NIBBLE_2: u8 = 0x5;
const NEW_SCAN_BIT: u16 = 0x8000;
const FULL_CIRCLE_Q6: i64 = 360 << 6;
const FULL_CIRCLE_Q8: i64 = 360 << 8;
const FULL_CIRCLE_Q16: i64 = 360 << 16;
const CAPSULE_QUALITY: u8 = 0x2F << 2;

const EXPRESS_CABIN_SIZE: usize = 5;
const ULTRA_CABIN_SIZE: usize = 4;
const ULTRA_CABIN_COUNT: usize = 32;
const DENSE_CABIN_SIZE: usize = 2;

/// Ultra predictions carrying these values mark a dropped measurement.
const ULTRA_PREDICT_INVALID: [i32; 2] = [-512, 0x1FF];

/// Variable bit scale bands: (scaled base, scale level, decoded base).
const VARBITSCALE_BANDS: [(u32, u32, u32); 5] = [
    (3328, 4, 1 << 14),
    (1792, 3, 1 << 12),
    (1280, 2, 1 << 11),
    (512, 1, 1 << 9),
    (0, 0, 0),
];

/// Cabin layout of a capsule stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CapsuleKind {
    #[default]
    Express,
    Ultra,
    Dense,
}

impl CapsuleKind {
    /// Capsule layout streamed under `answer_type`, if it is a capsule type.
    pub fn for_answer(answer_type: u8) -> Option<Self> {
        match answer_type {
            ANS_TYPE_MEASUREMENT_CAPSULED => Some(Self::Express),
            ANS_TYPE_MEASUREMENT_CAPSULED_ULTRA => Some(Self::Ultra),
            ANS_TYPE_MEASUREMENT_DENSE_CAPSULED => Some(Self::Dense),
            _ => None,
        }
    }

    /// Wire size of one capsule.
    pub fn size(self) -> usize {
        match self {
            Self::Express | Self::Dense => CAPSULE_SIZE,
            Self::Ultra => ULTRA_CAPSULE_SIZE,
        }
    }

    /// Measurements carried by one capsule.
    pub fn samples(self) -> usize {
        match self {
            Self::Express => 32,
            Self::Ultra => ULTRA_CABIN_COUNT * 3,
            Self::Dense => 40,
        }
    }
}

#[derive(Debug, Clone)]
struct Capsule {
    start_angle_sync_q6: u16,
    cabins: Bytes,
}

impl Capsule {
    fn start_angle_q8(&self) -> i64 {
        i64::from(self.start_angle_sync_q6 & !NEW_SCAN_BIT) << 2
    }

    fn is_new_scan(&self) -> bool {
        self.start_angle_sync_q6 & NEW_SCAN_BIT != 0
    }
}

/// Stateful decoder for a stream of capsules of one kind.
#[derive(Debug, Default)]
pub struct CapsuleDecoder {
    kind: CapsuleKind,
    previous: Option<Capsule>,
}

impl CapsuleDecoder {
    pub fn new(kind: CapsuleKind) -> Self {
        Self {
            kind,
            previous: None,
        }
    }

    pub fn kind(&self) -> CapsuleKind {
        self.kind
    }

    /// Forget the stored capsule. Call when a new scan is started.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    /// Decode every complete capsule in `src`, appending nodes to `out`.
    ///
    /// Returns the number of nodes appended. A trailing partial capsule is
    /// left in the buffer.
    pub fn decode(&mut self, src: &mut BytesMut, out: &mut Vec<MeasurementNode>) -> usize {
        let before = out.len();
        let size = self.kind.size();
        while src.len() >= size {
            if src[0] >> 4 != SYNC_NIBBLE_1 || src[1] >> 4 != SYNC_NIBBLE_2 {
                src.advance(1);
                continue;
            }

            let carried = (src[0] & 0xF) | ((src[1] & 0xF) << 4);
            let computed = src[2..size].iter().fold(0u8, |acc, b| acc ^ b);
            if carried != computed {
                debug!(kind = ?self.kind, carried, computed, "capsule checksum mismatch");
                src.advance(size);
                self.previous = None;
                continue;
            }

            let capsule = parse_capsule(src.split_to(size).freeze());
            if capsule.is_new_scan() {
                trace!("capsule starts a new scan");
                self.previous = None;
            }
            if let Some(previous) = self.previous.take() {
                match self.kind {
                    CapsuleKind::Express => emit_express(&previous, &capsule, out),
                    CapsuleKind::Ultra => emit_ultra(&previous, &capsule, out),
                    CapsuleKind::Dense => emit_dense(&previous, &capsule, out),
                }
            }
            self.previous = Some(capsule);
        }
        out.len() - before
    }
}

fn parse_capsule(mut raw: Bytes) -> Capsule {
    raw.advance(2);
    let start_angle_sync_q6 = raw.get_u16_le();
    Capsule {
        start_angle_sync_q6,
        cabins: raw,
    }
}

/// Even angular steps from one capsule's start angle to the next one's.
struct AngleSweep {
    raw_q16: i64,
    inc_q16: i64,
}

impl AngleSweep {
    fn between(previous: &Capsule, current: &Capsule, samples: usize) -> Self {
        let current_q8 = current.start_angle_q8();
        let previous_q8 = previous.start_angle_q8();

        let mut diff_q8 = current_q8 - previous_q8;
        if previous_q8 > current_q8 {
            diff_q8 += FULL_CIRCLE_Q8;
        }
        Self {
            raw_q16: previous_q8 << 8,
            inc_q16: (diff_q8 << 8) / samples as i64,
        }
    }

    /// Angle of the next sample, corrected by `offset_q16` degrees, and
    /// whether the sweep crosses zero right after it.
    fn step(&mut self, offset_q16: i64) -> (i64, bool) {
        let sync = (self.raw_q16 + self.inc_q16) % FULL_CIRCLE_Q16 < self.inc_q16;
        let mut angle_q6 = (self.raw_q16 - offset_q16) >> 10;
        self.raw_q16 += self.inc_q16;

        if angle_q6 < 0 {
            angle_q6 += FULL_CIRCLE_Q6;
        }
        if angle_q6 >= FULL_CIRCLE_Q6 {
            angle_q6 -= FULL_CIRCLE_Q6;
        }
        (angle_q6, sync)
    }
}

fn node(angle_q6: i64, sync: bool, dist_mm_q2: u32) -> MeasurementNode {
    MeasurementNode {
        angle_z_q14: ((angle_q6 << 8) / 90) as u16,
        dist_mm_q2,
        quality: if dist_mm_q2 != 0 { CAPSULE_QUALITY } else { 0 },
        flag: if sync { NODE_SYNC_FLAG } else { 0 },
    }
}

/// 32 measurements, each with its own angle offset in q3 degrees.
fn emit_express(previous: &Capsule, current: &Capsule, out: &mut Vec<MeasurementNode>) {
    let mut sweep = AngleSweep::between(previous, current, CapsuleKind::Express.samples());

    for mut cabin in previous.cabins.chunks_exact(EXPRESS_CABIN_SIZE) {
        let distance_angle_1 = cabin.get_u16_le();
        let distance_angle_2 = cabin.get_u16_le();
        let offset_angles_q3 = cabin.get_u8();

        let distances = [
            u32::from(distance_angle_1 & 0xFFFC),
            u32::from(distance_angle_2 & 0xFFFC),
        ];
        let offsets_q3 = [
            i64::from(offset_angles_q3 & 0xF) | (i64::from(distance_angle_1 & 0x3) << 4),
            i64::from(offset_angles_q3 >> 4) | (i64::from(distance_angle_2 & 0x3) << 4),
        ];

        for (distance, offset_q3) in distances.into_iter().zip(offsets_q3) {
            let (angle_q6, sync) = sweep.step(offset_q3 << 13);
            out.push(node(angle_q6, sync, distance));
        }
    }
}

/// Expand a 12-bit scaled distance. Returns the distance and the scale
/// level applied to predictions based on it.
fn varbitscale_decode(scaled: u32) -> (u32, u32) {
    for (base, level, target) in VARBITSCALE_BANDS {
        if scaled >= base {
            return (target + ((scaled - base) << level), level);
        }
    }
    (0, 0)
}

fn ultra_word(cabins: &[u8], index: usize) -> u32 {
    let start = index * ULTRA_CABIN_SIZE;
    cabins
        .get(start..start + ULTRA_CABIN_SIZE)
        .map_or(0, |mut word| word.get_u32_le())
}

/// Mean angular offset, in q16 degrees, of a measurement at `dist_q2`.
fn ultra_offset_q16(dist_q2: i64) -> i64 {
    let mean_q16 = if dist_q2 >= 50 * 4 {
        let k2 = 98_361 / dist_q2;
        (8f64.to_radians() * 65536.0) as i64 - (k2 << 6) - (k2 * k2 * k2) / 98_304
    } else {
        (7.5f64.to_radians() * 65536.0) as i64
    };
    (mean_q16 as f64).to_degrees() as i64
}

/// 32 words of a base distance and two signed predictions, 96 measurements.
fn emit_ultra(previous: &Capsule, current: &Capsule, out: &mut Vec<MeasurementNode>) {
    let mut sweep = AngleSweep::between(previous, current, CapsuleKind::Ultra.samples());

    for pos in 0..ULTRA_CABIN_COUNT {
        let combined = ultra_word(&previous.cabins, pos);
        let next = if pos + 1 == ULTRA_CABIN_COUNT {
            ultra_word(&current.cabins, 0)
        } else {
            ultra_word(&previous.cabins, pos + 1)
        };

        let (major, level) = varbitscale_decode(combined & 0xFFF);
        let (major_next, level_next) = varbitscale_decode(next & 0xFFF);
        let (base, level) = if major == 0 && major_next != 0 {
            (major_next, level_next)
        } else {
            (major, level)
        };

        // Signed 10-bit fields at bits 12..22 and 22..32.
        let predicts = [((combined << 10) as i32) >> 22, (combined as i32) >> 22];
        let predicted = |predict: i32, base: u32, level: u32| -> u32 {
            if ULTRA_PREDICT_INVALID.contains(&predict) {
                return 0;
            }
            let value = (i64::from(predict) << level) + i64::from(base);
            u32::try_from(value << 2).unwrap_or(0)
        };
        let distances = [
            major << 2,
            predicted(predicts[0], base, level),
            predicted(predicts[1], major_next, level_next),
        ];

        for distance in distances {
            let (angle_q6, sync) = sweep.step(ultra_offset_q16(i64::from(distance)));
            out.push(node(angle_q6, sync, distance));
        }
    }
}

/// 40 plain distances at even angle steps.
fn emit_dense(previous: &Capsule, current: &Capsule, out: &mut Vec<MeasurementNode>) {
    let mut sweep = AngleSweep::between(previous, current, CapsuleKind::Dense.samples());

    for mut cabin in previous.cabins.chunks_exact(DENSE_CABIN_SIZE) {
        let distance = u32::from(cabin.get_u16_le()) << 2;
        let (angle_q6, sync) = sweep.step(0);
        out.push(node(angle_q6, sync, distance));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(start_angle_q6: u16, new_scan: bool, cabins: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(cabins.len() + 2);
        let start = start_angle_q6 | if new_scan { NEW_SCAN_BIT } else { 0 };
        body.extend_from_slice(&start.to_le_bytes());
        body.extend_from_slice(cabins);
        let checksum = body.iter().fold(0u8, |acc, b| acc ^ b);
        let mut raw = vec![
            (SYNC_NIBBLE_1 << 4) | (checksum & 0xF),
            (SYNC_NIBBLE_2 << 4) | (checksum >> 4),
        ];
        raw.extend_from_slice(&body);
        raw
    }

    fn capsule_bytes(start_angle_q6: u16, new_scan: bool, distance_q2: u16) -> Vec<u8> {
        let mut cabins = Vec::new();
        for _ in 0..16 {
            cabins.extend_from_slice(&distance_q2.to_le_bytes());
            cabins.extend_from_slice(&distance_q2.to_le_bytes());
            cabins.push(0);
        }
        framed(start_angle_q6, new_scan, &cabins)
    }

    fn ultra_bytes(start_angle_q6: u16, word: u32) -> Vec<u8> {
        let cabins: Vec<u8> = (0..ULTRA_CABIN_COUNT).flat_map(|_| word.to_le_bytes()).collect();
        framed(start_angle_q6, false, &cabins)
    }

    fn dense_bytes(start_angle_q6: u16, distance_mm: u16) -> Vec<u8> {
        let cabins: Vec<u8> = (0..40).flat_map(|_| distance_mm.to_le_bytes()).collect();
        framed(start_angle_q6, false, &cabins)
    }

    fn decode_all(kind: CapsuleKind, raw: &[u8]) -> Vec<MeasurementNode> {
        let mut decoder = CapsuleDecoder::new(kind);
        let mut buf = BytesMut::from(raw);
        let mut out = Vec::new();
        decoder.decode(&mut buf, &mut out);
        out
    }

    #[test]
    fn answer_types_map_to_kinds() {
        assert_eq!(CapsuleKind::for_answer(0x82), Some(CapsuleKind::Express));
        assert_eq!(CapsuleKind::for_answer(0x84), Some(CapsuleKind::Ultra));
        assert_eq!(CapsuleKind::for_answer(0x85), Some(CapsuleKind::Dense));
        assert_eq!(CapsuleKind::for_answer(0x81), None);
        assert_eq!(CapsuleKind::Ultra.size(), 132);
    }

    #[test]
    fn first_capsule_produces_no_nodes() {
        let mut decoder = CapsuleDecoder::new(CapsuleKind::Express);
        let mut buf = BytesMut::from(&capsule_bytes(0, true, 4000)[..]);
        let mut out = Vec::new();
        assert_eq!(decoder.decode(&mut buf, &mut out), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn second_capsule_emits_interpolated_nodes() {
        let mut raw = capsule_bytes(0, true, 4000);
        // 32 nodes spread over 32 degrees.
        raw.extend(capsule_bytes(32 << 6, false, 4000));
        let out = decode_all(CapsuleKind::Express, &raw);

        assert_eq!(out.len(), 32);
        assert_eq!(out[0].angle_degrees(), 0.0);
        assert!((out[1].angle_degrees() - 1.0).abs() < 0.01);
        assert!((out[31].angle_degrees() - 31.0).abs() < 0.01);
        assert_eq!(out[0].distance_mm(), 1000.0);
        assert_eq!(out[0].quality, CAPSULE_QUALITY);
        assert!(out.iter().all(|n| n.flag == 0));
    }

    #[test]
    fn crossing_zero_sets_sync_flag() {
        let mut raw = capsule_bytes(350 << 6, false, 4000);
        raw.extend(capsule_bytes(10 << 6, false, 4000));
        let out = decode_all(CapsuleKind::Express, &raw);

        assert_eq!(out.len(), 32);
        assert_eq!(out.iter().filter(|n| n.is_sync()).count(), 1);
        assert!(out.iter().all(|n| n.flag <= NODE_SYNC_FLAG));
        assert!(out.iter().all(|n| n.angle_degrees() < 360.0));
    }

    #[test]
    fn zero_distance_has_zero_quality() {
        let mut raw = capsule_bytes(0, false, 0);
        raw.extend(capsule_bytes(32 << 6, false, 0));
        let out = decode_all(CapsuleKind::Express, &raw);
        assert!(out.iter().all(|n| n.quality == 0 && !n.is_valid()));
    }

    #[test]
    fn bad_checksum_drops_capsule_and_history() {
        let mut raw = capsule_bytes(0, false, 4000);
        let mut corrupt = capsule_bytes(32 << 6, false, 4000);
        corrupt[10] ^= 0xFF;
        raw.extend(corrupt);
        raw.extend(capsule_bytes(64 << 6, false, 4000));
        assert!(decode_all(CapsuleKind::Express, &raw).is_empty());
    }

    #[test]
    fn resyncs_after_garbage() {
        let mut raw = vec![0x01, 0x02, 0x03];
        raw.extend(capsule_bytes(0, false, 4000));
        raw.extend(capsule_bytes(32 << 6, false, 4000));
        assert_eq!(decode_all(CapsuleKind::Express, &raw).len(), 32);
    }

    #[test]
    fn varbitscale_bands() {
        assert_eq!(varbitscale_decode(100), (100, 0));
        assert_eq!(varbitscale_decode(1000), (512 + (488 << 1), 1));
        assert_eq!(varbitscale_decode(1792), (4096, 3));
        assert_eq!(varbitscale_decode(3328), (16384, 4));
    }

    #[test]
    fn ultra_capsule_emits_three_nodes_per_word() {
        // Base 400 mm, both predictions zero.
        let mut raw = ultra_bytes(0, 400);
        raw.extend(ultra_bytes(96 << 6, 400));
        let out = decode_all(CapsuleKind::Ultra, &raw);

        assert_eq!(out.len(), 96);
        assert!(out.iter().all(|n| n.distance_mm() == 400.0));
        assert!(out.iter().all(|n| n.quality == CAPSULE_QUALITY && n.flag == 0));
        assert!(out.iter().all(|n| n.angle_degrees() < 360.0));
        // One degree per sample, shifted back by the same mean offset.
        let step = out[2].angle_degrees() - out[1].angle_degrees();
        assert!((step - 1.0).abs() < 0.01);
    }

    #[test]
    fn ultra_predictions_scale_from_base() {
        // Base 400, first prediction +3, second prediction -2.
        let word = 400 | (3 << 12) | ((-2i32 as u32 & 0x3FF) << 22);
        let mut raw = ultra_bytes(0, word);
        raw.extend(ultra_bytes(96 << 6, word));
        let out = decode_all(CapsuleKind::Ultra, &raw);

        assert_eq!(out[0].distance_mm(), 400.0);
        assert_eq!(out[1].distance_mm(), 403.0);
        assert_eq!(out[2].distance_mm(), 398.0);
    }

    #[test]
    fn ultra_invalid_prediction_is_dropped() {
        let word = 400 | (0x1FF << 12) | (0x200 << 22);
        let mut raw = ultra_bytes(0, word);
        raw.extend(ultra_bytes(96 << 6, word));
        let out = decode_all(CapsuleKind::Ultra, &raw);

        assert_eq!(out[0].distance_mm(), 400.0);
        assert!(!out[1].is_valid());
        assert!(!out[2].is_valid());
        assert_eq!(out[1].quality, 0);
    }

    #[test]
    fn dense_capsule_spreads_forty_nodes() {
        let mut raw = dense_bytes(0, 1500);
        raw.extend(dense_bytes(40 << 6, 1500));
        let out = decode_all(CapsuleKind::Dense, &raw);

        assert_eq!(out.len(), 40);
        assert_eq!(out[0].angle_degrees(), 0.0);
        assert!((out[39].angle_degrees() - 39.0).abs() < 0.01);
        assert!(out.iter().all(|n| n.distance_mm() == 1500.0 && n.flag == 0));
    }

    #[test]
    fn dense_crossing_zero_sets_one_sync() {
        let mut raw = dense_bytes(340 << 6, 1500);
        raw.extend(dense_bytes(20 << 6, 1500));
        let out = decode_all(CapsuleKind::Dense, &raw);

        let syncs: Vec<usize> = (0..out.len()).filter(|&i| out[i].is_sync()).collect();
        assert_eq!(syncs, vec![19]);
    }
}
