//! Request opcodes, answer types and configuration keys.

/// Set on every opcode that carries a payload.
pub const CMDFLAG_HAS_PAYLOAD: u8 = 0x80;

pub const CMD_STOP: u8 = 0x25;
pub const CMD_SCAN: u8 = 0x20;
pub const CMD_FORCE_SCAN: u8 = 0x21;
pub const CMD_RESET: u8 = 0x40;
pub const CMD_GET_DEVICE_INFO: u8 = 0x50;
pub const CMD_GET_DEVICE_HEALTH: u8 = 0x52;
pub const CMD_GET_SAMPLERATE: u8 = 0x59;
pub const CMD_HQ_MOTOR_SPEED_CTRL: u8 = 0xA8;
pub const CMD_EXPRESS_SCAN: u8 = 0x82;
pub const CMD_GET_LIDAR_CONF: u8 = 0x84;
pub const CMD_SET_MOTOR_PWM: u8 = 0xF0;
pub const CMD_GET_ACC_BOARD_FLAG: u8 = 0xFF;

pub const ANS_TYPE_DEVINFO: u8 = 0x04;
pub const ANS_TYPE_DEVHEALTH: u8 = 0x06;
pub const ANS_TYPE_SAMPLE_RATE: u8 = 0x15;
pub const ANS_TYPE_GET_LIDAR_CONF: u8 = 0x20;
pub const ANS_TYPE_MEASUREMENT: u8 = 0x81;
pub const ANS_TYPE_MEASUREMENT_CAPSULED: u8 = 0x82;
pub const ANS_TYPE_MEASUREMENT_HQ: u8 = 0x83;
pub const ANS_TYPE_MEASUREMENT_CAPSULED_ULTRA: u8 = 0x84;
pub const ANS_TYPE_MEASUREMENT_DENSE_CAPSULED: u8 = 0x85;
pub const ANS_TYPE_ACC_BOARD_FLAG: u8 = 0xFF;

pub const CONF_SCAN_MODE_COUNT: u32 = 0x70;
pub const CONF_SCAN_MODE_US_PER_SAMPLE: u32 = 0x71;
pub const CONF_SCAN_MODE_MAX_DISTANCE: u32 = 0x74;
pub const CONF_SCAN_MODE_ANS_TYPE: u32 = 0x75;
pub const CONF_SCAN_MODE_TYPICAL: u32 = 0x7C;
pub const CONF_SCAN_MODE_NAME: u32 = 0x7F;

/// Accessory board flag: the adapter drives the motor by PWM.
pub const ACC_BOARD_FLAG_MOTOR_CTRL: u32 = 0x1;

/// Lowest firmware (`major << 8 | minor`) answering lidar configuration queries.
pub const FIRMWARE_LIDAR_CONF: u16 = (1 << 8) | 24;

/// Model major ids at or above this are time-of-flight devices.
pub const TOF_MIN_MAJOR_ID: u8 = 5;

/// Returns a human-readable name for an answer type.
pub fn answer_name(answer_type: u8) -> &'static str {
    match answer_type {
        ANS_TYPE_DEVINFO => "DEVINFO",
        ANS_TYPE_DEVHEALTH => "DEVHEALTH",
        ANS_TYPE_SAMPLE_RATE => "SAMPLE_RATE",
        ANS_TYPE_GET_LIDAR_CONF => "LIDAR_CONF",
        ANS_TYPE_MEASUREMENT => "MEASUREMENT",
        ANS_TYPE_MEASUREMENT_CAPSULED => "CAPSULED",
        ANS_TYPE_MEASUREMENT_HQ => "HQ",
        ANS_TYPE_MEASUREMENT_CAPSULED_ULTRA => "ULTRA_CAPSULED",
        ANS_TYPE_MEASUREMENT_DENSE_CAPSULED => "DENSE_CAPSULED",
        ANS_TYPE_ACC_BOARD_FLAG => "ACC_BOARD_FLAG",
        _ => "UNKNOWN",
    }
}
