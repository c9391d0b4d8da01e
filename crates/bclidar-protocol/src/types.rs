//! Fixed-layout answer payloads and lidar configuration entries.

use std::fmt;

use bytes::Buf;
use serde::Serialize;

use crate::command::TOF_MIN_MAJOR_ID;
use crate::error::{ProtocolError, Result};

/// Maximum length of a scan mode name, including the terminator.
pub const SCAN_MODE_NAME_CAPACITY: usize = 64;

fn require(payload: &[u8], expected: usize) -> Result<()> {
    if payload.len() < expected {
        return Err(ProtocolError::PayloadTooShort {
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// Device identification returned by `GET_INFO`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub model: u8,
    pub firmware_version: u16,
    pub hardware_version: u8,
    pub serial_number: [u8; 16],
}

impl DeviceInfo {
    pub const WIRE_SIZE: usize = 20;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(payload, Self::WIRE_SIZE)?;
        let model = payload.get_u8();
        let firmware_version = payload.get_u16_le();
        let hardware_version = payload.get_u8();
        let mut serial_number = [0u8; 16];
        payload.copy_to_slice(&mut serial_number);
        Ok(Self {
            model,
            firmware_version,
            hardware_version,
            serial_number,
        })
    }

    /// Model family; ToF devices report 5 or above.
    pub fn major_model(&self) -> u8 {
        self.model >> 4
    }

    pub fn is_tof(&self) -> bool {
        self.major_model() >= TOF_MIN_MAJOR_ID
    }

    /// Firmware version as `major.minor`.
    pub fn firmware_string(&self) -> String {
        format!(
            "{}.{:02}",
            self.firmware_version >> 8,
            self.firmware_version & 0xFF
        )
    }

    /// Serial number as 32 uppercase hex digits.
    pub fn serial_hex(&self) -> String {
        self.serial_number
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect()
    }
}

/// Health status reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Good,
    Warning,
    Error,
    Unknown(u8),
}

impl From<u8> for HealthStatus {
    fn from(raw: u8) -> Self {
        match raw {
            0 => HealthStatus::Good,
            1 => HealthStatus::Warning,
            2 => HealthStatus::Error,
            other => HealthStatus::Unknown(other),
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Good => f.write_str("good"),
            HealthStatus::Warning => f.write_str("warning"),
            HealthStatus::Error => f.write_str("error"),
            HealthStatus::Unknown(raw) => write!(f, "unknown({raw})"),
        }
    }
}

/// Health answer returned by `GET_HEALTH`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceHealth {
    pub status: u8,
    pub error_code: u16,
}

impl DeviceHealth {
    pub const WIRE_SIZE: usize = 3;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(payload, Self::WIRE_SIZE)?;
        Ok(Self {
            status: payload.get_u8(),
            error_code: payload.get_u16_le(),
        })
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from(self.status)
    }
}

/// Sample durations returned by `GET_SAMPLERATE`, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SampleRate {
    pub standard_us: u16,
    pub express_us: u16,
}

impl SampleRate {
    pub const WIRE_SIZE: usize = 4;

    pub fn decode(mut payload: &[u8]) -> Result<Self> {
        require(payload, Self::WIRE_SIZE)?;
        Ok(Self {
            standard_us: payload.get_u16_le(),
            express_us: payload.get_u16_le(),
        })
    }
}

/// A scan mode the device supports.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanMode {
    pub id: u16,
    /// Microseconds per sample.
    pub us_per_sample: f32,
    /// Maximum distance in metres.
    pub max_distance: f32,
    /// Answer type the mode streams (`ANS_TYPE_MEASUREMENT*`).
    pub ans_type: u8,
    pub name: String,
}

impl ScanMode {
    /// Copy the name into a fixed, NUL-terminated buffer, truncating if
    /// needed.
    pub fn name_bytes(&self) -> [u8; SCAN_MODE_NAME_CAPACITY] {
        let mut out = [0u8; SCAN_MODE_NAME_CAPACITY];
        let bytes = self.name.as_bytes();
        let len = bytes.len().min(SCAN_MODE_NAME_CAPACITY - 1);
        out[..len].copy_from_slice(&bytes[..len]);
        out
    }
}

/// Build a `GET_LIDAR_CONF` request payload.
pub fn encode_conf_request(key: u32, mode_id: Option<u16>) -> Vec<u8> {
    let mut payload = key.to_le_bytes().to_vec();
    if let Some(id) = mode_id {
        payload.extend_from_slice(&id.to_le_bytes());
    }
    payload
}

/// Strip the key echoed at the start of a `GET_LIDAR_CONF` answer.
pub fn conf_value(expected_key: u32, mut payload: &[u8]) -> Result<&[u8]> {
    require(payload, 4)?;
    let key = payload.get_u32_le();
    if key != expected_key {
        return Err(ProtocolError::UnexpectedConfKey {
            expected: expected_key,
            actual: key,
        });
    }
    Ok(payload)
}

pub fn conf_u8(value: &[u8]) -> Result<u8> {
    require(value, 1)?;
    Ok(value[0])
}

pub fn conf_u16(mut value: &[u8]) -> Result<u16> {
    require(value, 2)?;
    Ok(value.get_u16_le())
}

pub fn conf_u32(mut value: &[u8]) -> Result<u32> {
    require(value, 4)?;
    Ok(value.get_u32_le())
}

/// Q8 fixed-point value as a float.
pub fn conf_q8(value: &[u8]) -> Result<f32> {
    Ok(conf_u32(value)? as f32 / 256.0)
}

/// NUL-terminated string value.
pub fn conf_string(value: &[u8]) -> String {
    let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
    String::from_utf8_lossy(&value[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_device_info() {
        let mut raw = vec![0x18, 0x1D, 0x01, 0x07];
        raw.extend(0u8..16);
        let info = DeviceInfo::decode(&raw).unwrap();
        assert_eq!(info.model, 0x18);
        assert_eq!(info.firmware_version, 0x011D);
        assert_eq!(info.firmware_string(), "1.29");
        assert_eq!(info.hardware_version, 7);
        assert_eq!(info.serial_number[15], 15);
        assert_eq!(&info.serial_hex()[..4], "0001");
        assert!(!info.is_tof());
    }

    #[test]
    fn tof_models_are_detected() {
        let info = DeviceInfo {
            model: 0x61,
            ..Default::default()
        };
        assert!(info.is_tof());
    }

    #[test]
    fn short_payload_is_rejected() {
        let err = DeviceInfo::decode(&[0; 10]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::PayloadTooShort {
                expected: 20,
                actual: 10
            }
        ));
    }

    #[test]
    fn decodes_health() {
        let health = DeviceHealth::decode(&[2, 0x34, 0x12]).unwrap();
        assert_eq!(health.status(), HealthStatus::Error);
        assert_eq!(health.error_code, 0x1234);
        assert_eq!(HealthStatus::from(9).to_string(), "unknown(9)");
    }

    #[test]
    fn decodes_sample_rate() {
        let rate = SampleRate::decode(&[0xF4, 0x01, 0x7D, 0x00]).unwrap();
        assert_eq!(rate.standard_us, 500);
        assert_eq!(rate.express_us, 125);
    }

    #[test]
    fn conf_request_appends_mode_id() {
        assert_eq!(encode_conf_request(0x70, None), vec![0x70, 0, 0, 0]);
        assert_eq!(encode_conf_request(0x71, Some(2)), vec![0x71, 0, 0, 0, 2, 0]);
    }

    #[test]
    fn conf_value_checks_key() {
        let answer = [0x71, 0, 0, 0, 0x00, 0x80, 0, 0];
        let value = conf_value(0x71, &answer).unwrap();
        assert_eq!(conf_q8(value).unwrap(), 128.0);

        let err = conf_value(0x70, &answer).unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedConfKey { .. }));
    }

    #[test]
    fn conf_string_stops_at_nul() {
        assert_eq!(conf_string(b"Sensitivity\0junk"), "Sensitivity");
        assert_eq!(conf_string(b"Boost"), "Boost");
    }

    #[test]
    fn scan_mode_name_is_truncated() {
        let mode = ScanMode {
            name: "x".repeat(100),
            ..Default::default()
        };
        let bytes = mode.name_bytes();
        assert_eq!(bytes[62], b'x');
        assert_eq!(bytes[63], 0);
    }
}
