use std::ffi::c_void;
use std::os::raw::c_char;

use bclidar_driver::{
    DeviceHealth, DeviceInfo, DriverConfig, LidarDevice, MeasurementNode, ScanMode,
    SerialLidarDriver, STATUS_NULL_ARGUMENT, STATUS_OK, STATUS_UNEXPECTED,
};
use bclidar_protocol::SCAN_MODE_NAME_CAPACITY;

pub const BCLIDAR_OK: i32 = STATUS_OK;
pub const BCLIDAR_ERR_UNEXPECTED: i32 = STATUS_UNEXPECTED;
pub const BCLIDAR_ERR_NULL_ARGUMENT: i32 = STATUS_NULL_ARGUMENT;

/// Measurement record in the HQ layout.
///
/// 10 bytes with 2-byte alignment: `angle_z_q14` at offset 0, two reserved
/// bytes, `dist_mm_q2` at 4, `quality` at 8 and `flag` at 9. Hosts marshal
/// arrays of it with a 10-byte stride.
#[repr(C, packed(2))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BclidarNode {
    pub angle_z_q14: u16,
    pub reserved: u16,
    pub dist_mm_q2: u32,
    pub quality: u8,
    pub flag: u8,
}

impl From<MeasurementNode> for BclidarNode {
    fn from(node: MeasurementNode) -> Self {
        Self {
            angle_z_q14: node.angle_z_q14,
            reserved: 0,
            dist_mm_q2: node.dist_mm_q2,
            quality: node.quality,
            flag: node.flag,
        }
    }
}

impl From<BclidarNode> for MeasurementNode {
    fn from(node: BclidarNode) -> Self {
        Self {
            angle_z_q14: node.angle_z_q14,
            dist_mm_q2: node.dist_mm_q2,
            quality: node.quality,
            flag: node.flag,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BclidarHealth {
    pub status: u8,
    pub error_code: u16,
}

impl From<DeviceHealth> for BclidarHealth {
    fn from(health: DeviceHealth) -> Self {
        Self {
            status: health.status,
            error_code: health.error_code,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BclidarDeviceInfo {
    pub model: u8,
    pub firmware_version: u16,
    pub hardware_version: u8,
    pub serial_number: [u8; 16],
}

impl From<DeviceInfo> for BclidarDeviceInfo {
    fn from(info: DeviceInfo) -> Self {
        Self {
            model: info.model,
            firmware_version: info.firmware_version,
            hardware_version: info.hardware_version,
            serial_number: info.serial_number,
        }
    }
}

/// Scan mode description with a NUL-terminated name.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct BclidarScanMode {
    pub id: u16,
    pub us_per_sample: f32,
    pub max_distance: f32,
    pub ans_type: u8,
    pub scan_mode: [c_char; SCAN_MODE_NAME_CAPACITY],
}

impl Default for BclidarScanMode {
    fn default() -> Self {
        Self {
            id: 0,
            us_per_sample: 0.0,
            max_distance: 0.0,
            ans_type: 0,
            scan_mode: [0; SCAN_MODE_NAME_CAPACITY],
        }
    }
}

impl From<&ScanMode> for BclidarScanMode {
    fn from(mode: &ScanMode) -> Self {
        Self {
            id: mode.id,
            us_per_sample: mode.us_per_sample,
            max_distance: mode.max_distance,
            ans_type: mode.ans_type,
            scan_mode: mode.name_bytes().map(|byte| byte as c_char),
        }
    }
}

impl From<&BclidarScanMode> for ScanMode {
    fn from(mode: &BclidarScanMode) -> Self {
        let name: Vec<u8> = mode
            .scan_mode
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        Self {
            id: mode.id,
            us_per_sample: mode.us_per_sample,
            max_distance: mode.max_distance,
            ans_type: mode.ans_type,
            name: String::from_utf8_lossy(&name).into_owned(),
        }
    }
}

/// Owned array of C strings returned by the sentence exports. Release it
/// with `bclidar_string_list_free`.
#[repr(C)]
#[derive(Debug)]
pub struct BclidarStringList {
    pub items: *mut *mut c_char,
    pub len: usize,
}

impl Default for BclidarStringList {
    fn default() -> Self {
        Self {
            items: std::ptr::null_mut(),
            len: 0,
        }
    }
}

pub type BclidarHandle = *mut c_void;

pub(crate) struct DeviceHandle {
    pub(crate) device: LidarDevice<SerialLidarDriver>,
}

impl DeviceHandle {
    pub(crate) fn new() -> Self {
        Self {
            device: LidarDevice::new(|| Ok(SerialLidarDriver::new(DriverConfig::default()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_mode_name_survives_conversion() {
        let mode = ScanMode {
            id: 2,
            us_per_sample: 63.5,
            max_distance: 12.0,
            ans_type: 0x82,
            name: "Boost".into(),
        };
        let c_mode = BclidarScanMode::from(&mode);
        assert_eq!(c_mode.scan_mode[5], 0);
        assert_eq!(ScanMode::from(&c_mode), mode);
    }

    #[test]
    fn node_fields_are_copied() {
        let node = MeasurementNode {
            angle_z_q14: 16384,
            dist_mm_q2: 4,
            quality: 47,
            flag: 1,
        };
        let c_node = BclidarNode::from(node);
        assert_eq!({ c_node.angle_z_q14 }, 16384);
        assert_eq!({ c_node.dist_mm_q2 }, 4);
        assert_eq!(MeasurementNode::from(c_node), node);
    }

    #[test]
    fn node_layout_matches_host_marshalling() {
        assert_eq!(std::mem::size_of::<BclidarNode>(), 10);
        assert_eq!(std::mem::align_of::<BclidarNode>(), 2);
        assert_eq!(std::mem::offset_of!(BclidarNode, angle_z_q14), 0);
        assert_eq!(std::mem::offset_of!(BclidarNode, dist_mm_q2), 4);
        assert_eq!(std::mem::offset_of!(BclidarNode, quality), 8);
        assert_eq!(std::mem::offset_of!(BclidarNode, flag), 9);
        assert_eq!(std::mem::size_of::<[BclidarNode; 3]>(), 30);
    }

    #[test]
    fn health_and_info_layouts() {
        assert_eq!(std::mem::size_of::<BclidarHealth>(), 4);
        assert_eq!(std::mem::offset_of!(BclidarDeviceInfo, firmware_version), 2);
        assert_eq!(std::mem::offset_of!(BclidarDeviceInfo, serial_number), 5);
        assert_eq!(std::mem::size_of::<BclidarDeviceInfo>(), 22);
    }
}
