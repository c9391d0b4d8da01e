//! RPLIDAR serial wire codec, measurement decoding and sentence formatting.
//!
//! Requests are framed as `0xA5 cmd [size payload checksum]`; answers start
//! with a 7-byte descriptor (`0xA5 0x5A`, length/mode, answer type) followed
//! by a single payload or a continuous stream of measurement packets.
//!
//! Measurements from every scan format are normalised to
//! [`MeasurementNode`], the fixed-point HQ layout, before they leave this
//! crate.

pub mod capsule;
pub mod codec;
pub mod command;
pub mod error;
pub mod node;
pub mod reader;
pub mod sentence;
pub mod types;
pub mod writer;

pub use capsule::{CapsuleDecoder, CapsuleKind, CAPSULE_SIZE, ULTRA_CAPSULE_SIZE};
pub use codec::{
    decode_descriptor, encode_command, ResponseDescriptor, SendMode, DESCRIPTOR_SIZE,
    MAX_COMMAND_PAYLOAD,
};
pub use error::{ProtocolError, Result};
pub use node::{decode_standard_nodes, MeasurementNode, STANDARD_NODE_SIZE};
pub use reader::ResponseReader;
pub use sentence::{
    format_sentence, format_string_line, nmea_checksum, parse_sentence, Sentence, SENTENCE_TAG,
};
pub use types::{
    DeviceHealth, DeviceInfo, HealthStatus, SampleRate, ScanMode, SCAN_MODE_NAME_CAPACITY,
};
pub use writer::CommandWriter;
