//! Text encodings of measurements.
//!
//! Sentences look like `$bclidar,<id>,<S|N>,<angle>,<distance>,<quality>*<XX>`
//! where `XX` is the XOR of every byte before the `*`, ignoring `$`.

use serde::Serialize;

use crate::error::{ProtocolError, Result};
use crate::node::MeasurementNode;

/// Talker tag following the `$`.
pub const SENTENCE_TAG: &str = "bclidar";

/// XOR checksum of a sentence.
///
/// `$` characters are skipped; the first `*` ends the checksummed region.
pub fn nmea_checksum(sentence: &str) -> u8 {
    sentence
        .bytes()
        .take_while(|&b| b != b'*')
        .filter(|&b| b != b'$')
        .fold(0, |acc, b| acc ^ b)
}

/// Format a node as a checksummed sentence.
pub fn format_sentence(sensor_id: u32, node: &MeasurementNode) -> String {
    let mut sentence = format!(
        "${SENTENCE_TAG},{sensor_id},{},{:.2},{:.2},{}*",
        if node.is_sync() { 'S' } else { 'N' },
        node.angle_degrees(),
        node.distance_mm(),
        node.quality,
    );
    let checksum = nmea_checksum(&sentence);
    sentence.push_str(&format!("{checksum:02X}"));
    sentence
}

/// Format a node as `angle;distance`.
pub fn format_string_line(node: &MeasurementNode) -> String {
    format!("{:.2};{:.2}", node.angle_degrees(), node.distance_mm())
}

/// A parsed sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sentence {
    pub sensor_id: u32,
    pub sync: bool,
    pub angle: f32,
    pub distance: f32,
    pub quality: u8,
}

/// Parse and verify a sentence produced by [`format_sentence`].
pub fn parse_sentence(line: &str) -> Result<Sentence> {
    let malformed = |what: &str| ProtocolError::MalformedSentence(format!("{what}: {line:?}"));

    let body = line
        .trim_end()
        .strip_prefix('$')
        .ok_or_else(|| malformed("missing '$'"))?;
    let (fields, checksum) = body
        .split_once('*')
        .ok_or_else(|| malformed("missing '*'"))?;
    let carried =
        u8::from_str_radix(checksum, 16).map_err(|_| malformed("invalid checksum digits"))?;
    let computed = nmea_checksum(fields);
    if carried != computed {
        return Err(ProtocolError::ChecksumMismatch { carried, computed });
    }

    let parts: Vec<&str> = fields.split(',').collect();
    let [tag, id, sync, angle, distance, quality] = parts.as_slice() else {
        return Err(malformed("expected 6 fields"));
    };
    if *tag != SENTENCE_TAG {
        return Err(malformed("unknown tag"));
    }

    Ok(Sentence {
        sensor_id: id.parse().map_err(|_| malformed("invalid sensor id"))?,
        sync: match *sync {
            "S" => true,
            "N" => false,
            _ => return Err(malformed("invalid sync marker")),
        },
        angle: angle.parse().map_err(|_| malformed("invalid angle"))?,
        distance: distance.parse().map_err(|_| malformed("invalid distance"))?,
        quality: quality.parse().map_err(|_| malformed("invalid quality"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor(s: &str) -> u8 {
        s.bytes().fold(0, |acc, b| acc ^ b)
    }

    #[test]
    fn checksum_covers_bytes_between_dollar_and_star() {
        let payload = "bclidar,1,S,045.00,1000.00,15";
        let sentence = format!("${payload}*");
        assert_eq!(nmea_checksum(&sentence), xor(payload));
        assert_eq!(nmea_checksum(payload), xor(payload));
    }

    #[test]
    fn checksum_skips_embedded_dollar() {
        assert_eq!(nmea_checksum("$a$b*zz"), b'a' ^ b'b');
    }

    #[test]
    fn formats_sync_sentence() {
        let node = MeasurementNode {
            angle_z_q14: 8192,
            dist_mm_q2: 4000,
            quality: 15,
            flag: 1,
        };
        let sentence = format_sentence(1, &node);
        let expected_checksum = xor("bclidar,1,S,45.00,1000.00,15");
        assert_eq!(
            sentence,
            format!("$bclidar,1,S,45.00,1000.00,15*{expected_checksum:02X}")
        );
    }

    #[test]
    fn checksum_is_zero_padded() {
        let node = MeasurementNode {
            flag: 1,
            ..Default::default()
        };
        assert_eq!(format_sentence(1, &node), "$bclidar,1,S,0.00,0.00,0*0D");
    }

    #[test]
    fn formats_string_line() {
        let node = MeasurementNode {
            angle_z_q14: 16384,
            dist_mm_q2: 6,
            quality: 0,
            flag: 0,
        };
        assert_eq!(format_string_line(&node), "90.00;1.50");
    }

    #[test]
    fn parses_formatted_sentence() {
        let node = MeasurementNode {
            angle_z_q14: 4096,
            dist_mm_q2: 10,
            quality: 188,
            flag: 2,
        };
        let parsed = parse_sentence(&format_sentence(7, &node)).unwrap();
        assert_eq!(parsed.sensor_id, 7);
        assert!(!parsed.sync);
        assert_eq!(parsed.angle, 22.5);
        assert_eq!(parsed.distance, 2.5);
        assert_eq!(parsed.quality, 188);
    }

    #[test]
    fn rejects_bad_checksum() {
        let err = parse_sentence("$bclidar,1,S,1.00,2.00,3*00").unwrap_err();
        assert!(matches!(err, ProtocolError::ChecksumMismatch { carried: 0, .. }));
    }

    #[test]
    fn rejects_missing_fields() {
        let line = "$bclidar,1,S*";
        let with_checksum = format!("{line}{:02X}", nmea_checksum(line));
        let err = parse_sentence(&with_checksum).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedSentence(_)));
    }
}
