//! bclidar-ffi: C-ABI exports for driving RPLIDAR sensors.
//!
//! Every device export takes a handle from [`bclidar_create`] and returns
//! an `int32_t` status: `0` on success or when the device is not in the
//! state the call needs, an SDK result code for driver failures, `-1` for
//! a caught panic and `-99` for a null required argument. The message for
//! the last failure on the calling thread is available from
//! [`bclidar_last_error`].

mod args;
mod device;
mod error;
mod scan;
mod strings;
mod types;

use std::any::Any;
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;

use bclidar_driver::DeviceError;
use tracing::level_filters::LevelFilter;

pub use device::{
    bclidar_check_is_tof_device, bclidar_check_motor_ctrl_support, bclidar_clear_serial_cache,
    bclidar_connect, bclidar_create, bclidar_disconnect, bclidar_dispose, bclidar_free,
    bclidar_get_device_info, bclidar_get_frequency, bclidar_get_health, bclidar_initialize,
    bclidar_is_connected, bclidar_reset, bclidar_set_motor_pwm, bclidar_set_spin_speed,
    bclidar_start_motor, bclidar_start_normal_scan, bclidar_start_scan, bclidar_stop,
    bclidar_stop_motor,
};
pub use scan::{
    bclidar_get_nmea, bclidar_get_scan_data_with_interval, bclidar_get_string_data,
    bclidar_grab_scan_data, bclidar_sort_scan_data_ascend,
};
pub use strings::bclidar_string_list_free;
pub use types::{
    BclidarDeviceInfo, BclidarHandle, BclidarHealth, BclidarNode, BclidarScanMode,
    BclidarStringList, BCLIDAR_ERR_NULL_ARGUMENT, BCLIDAR_ERR_UNEXPECTED, BCLIDAR_OK,
};

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic across FFI boundary".to_string()
    }
}

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(payload) => {
            let err = DeviceError::Unexpected(panic_message(payload.as_ref()));
            tracing::error!(error = %err, "panic caught at C boundary");
            error::set_error_message(err.to_string());
            on_panic
        }
    }
}

/// Install a stdout log subscriber at `log_level` (`error`, `warn`,
/// `info`, `debug`, `trace` or `off`). A null level means `info`. Calling
/// it again keeps the first subscriber.
///
/// # Safety
/// `log_level` must be null or a NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn bclidar_init(log_level: *const c_char) -> i32 {
    ffi_boundary(BCLIDAR_ERR_UNEXPECTED, || {
        error::clear_error_state();

        let level = if log_level.is_null() {
            LevelFilter::INFO
        } else {
            // SAFETY: We validate null and UTF-8 in helper.
            let Some(text) = (unsafe { args::required_str_arg(log_level, "log_level") }) else {
                return BCLIDAR_ERR_NULL_ARGUMENT;
            };
            match text.parse::<LevelFilter>() {
                Ok(level) => level,
                Err(err) => {
                    error::set_error_message(format!("log_level: {err}"));
                    return BCLIDAR_ERR_NULL_ARGUMENT;
                }
            }
        };

        let _ = tracing_subscriber::fmt()
            .with_writer(std::io::stdout)
            .with_max_level(level)
            .with_ansi(false)
            .with_target(false)
            .try_init();
        BCLIDAR_OK
    })
}

/// Message for the last failure on the calling thread, or an empty string.
/// The pointer stays valid until the next bclidar call on this thread.
#[no_mangle]
pub extern "C" fn bclidar_last_error() -> *const c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
