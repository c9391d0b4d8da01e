use std::os::raw::c_char;
use std::time::Duration;

use bclidar_driver::{LidarDevice, ScanMode, SerialLidarDriver};
use tracing::debug;

use crate::args;
use crate::error;
use crate::types::{
    BclidarDeviceInfo, BclidarHandle, BclidarHealth, BclidarScanMode, DeviceHandle,
    BCLIDAR_ERR_NULL_ARGUMENT, BCLIDAR_ERR_UNEXPECTED, BCLIDAR_OK,
};

pub(crate) fn millis(timeout: u32) -> Duration {
    Duration::from_millis(u64::from(timeout))
}

/// Run `f` against the device behind `handle`. A null handle has no
/// driver, so the call is a no-op reporting success.
fn with_device(
    handle: BclidarHandle,
    operation: &'static str,
    f: impl FnOnce(&mut LidarDevice<SerialLidarDriver>) -> i32,
) -> i32 {
    if handle.is_null() {
        debug!(operation, "null device handle, nothing to do");
        return BCLIDAR_OK;
    }

    let device_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut DeviceHandle) }
    };

    f(&mut device_handle.device)
}

pub(crate) fn guarded(
    handle: BclidarHandle,
    operation: &'static str,
    f: impl FnOnce(&mut LidarDevice<SerialLidarDriver>) -> i32,
) -> i32 {
    crate::ffi_boundary(BCLIDAR_ERR_UNEXPECTED, || {
        error::clear_error_state();
        with_device(handle, operation, f)
    })
}

/// Allocate a device handle. The driver is created by `bclidar_initialize`.
#[no_mangle]
pub extern "C" fn bclidar_create() -> BclidarHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        Box::into_raw(Box::new(DeviceHandle::new())) as BclidarHandle
    })
}

/// Free a device handle, closing its serial port.
///
/// # Safety
/// `handle` must be null or a handle returned by `bclidar_create` that has
/// not been freed.
#[no_mangle]
pub unsafe extern "C" fn bclidar_free(handle: BclidarHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }
        // SAFETY: `handle` was created by `Box::into_raw` in `bclidar_create`.
        unsafe {
            drop(Box::from_raw(handle as *mut DeviceHandle));
        }
    });
}

/// Create the driver if the handle has none.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_initialize(handle: BclidarHandle) -> i32 {
    guarded(handle, "initialize", |device| match device.initialize() {
        Ok(()) => BCLIDAR_OK,
        Err(err) => error::map_device_error("initialize", &err),
    })
}

/// Stop scanning and the motor, disconnect and release the driver.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_dispose(handle: BclidarHandle) -> i32 {
    guarded(handle, "dispose", |device| {
        error::report("dispose", device.dispose(), |()| {})
    })
}

/// Open `port` at `baud_rate`.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. `port`
/// must be null or a NUL-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn bclidar_connect(
    handle: BclidarHandle,
    port: *const c_char,
    baud_rate: u32,
    flags: u32,
) -> i32 {
    guarded(handle, "connect", |device| {
        // SAFETY: We validate null and UTF-8 in helper.
        let Some(port) = (unsafe { args::required_str_arg(port, "port") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report("connect", device.connect(port, baud_rate, flags), |()| {})
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_disconnect(handle: BclidarHandle) -> i32 {
    guarded(handle, "disconnect", |device| {
        error::report("disconnect", device.disconnect(), |()| {})
    })
}

/// Returns 1 when connected, 0 otherwise.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_is_connected(handle: BclidarHandle) -> i32 {
    guarded(handle, "is_connected", |device| i32::from(device.is_connected()))
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_reset(handle: BclidarHandle, timeout_ms: u32) -> i32 {
    guarded(handle, "reset", |device| {
        error::report("reset", device.reset(millis(timeout_ms)), |()| {})
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_clear_serial_cache(handle: BclidarHandle) -> i32 {
    guarded(handle, "clear_serial_cache", |device| {
        error::report("clear_serial_cache", device.clear_rx_cache(), |()| {})
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. `out`
/// must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_get_health(
    handle: BclidarHandle,
    out: *mut BclidarHealth,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "get_health", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out) = (unsafe { args::out_arg(out, "out") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report("get_health", device.health(millis(timeout_ms)), |health| {
            *out = health.into();
        })
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. `out`
/// must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_get_device_info(
    handle: BclidarHandle,
    out: *mut BclidarDeviceInfo,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "get_device_info", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out) = (unsafe { args::out_arg(out, "out") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report(
            "get_device_info",
            device.device_info(millis(timeout_ms)),
            |info| *out = info.into(),
        )
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_set_motor_pwm(handle: BclidarHandle, pwm: u16) -> i32 {
    guarded(handle, "set_motor_pwm", |device| {
        error::report("set_motor_pwm", device.set_motor_pwm(pwm), |()| {})
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_set_spin_speed(
    handle: BclidarHandle,
    rpm: u16,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "set_spin_speed", |device| {
        error::report(
            "set_spin_speed",
            device.set_spin_speed(rpm, millis(timeout_ms)),
            |()| {},
        )
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_start_motor(handle: BclidarHandle) -> i32 {
    guarded(handle, "start_motor", |device| {
        error::report("start_motor", device.start_motor(), |()| {})
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_stop_motor(handle: BclidarHandle) -> i32 {
    guarded(handle, "stop_motor", |device| {
        error::report("stop_motor", device.stop_motor(), |()| {})
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. `out`
/// must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_check_motor_ctrl_support(
    handle: BclidarHandle,
    out: *mut bool,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "check_motor_ctrl_support", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out) = (unsafe { args::out_arg(out, "out") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report(
            "check_motor_ctrl_support",
            device.check_motor_ctrl_support(millis(timeout_ms)),
            |supported| *out = supported,
        )
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. `out`
/// must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_check_is_tof_device(
    handle: BclidarHandle,
    out: *mut bool,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "check_is_tof_device", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out) = (unsafe { args::out_arg(out, "out") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report(
            "check_is_tof_device",
            device.check_is_tof(millis(timeout_ms)),
            |is_tof| *out = is_tof,
        )
    })
}

/// Scan frequency in Hz for `count` samples per rotation in `mode`.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. `mode`
/// must be null or point to a readable `BclidarScanMode`; `out` must be
/// null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_get_frequency(
    handle: BclidarHandle,
    mode: *const BclidarScanMode,
    count: u64,
    out: *mut f32,
) -> i32 {
    guarded(handle, "get_frequency", |device| {
        if mode.is_null() {
            return error::set_null_argument("mode");
        }
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out) = (unsafe { args::out_arg(out, "out") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        // SAFETY: Non-null checked above; readability is guaranteed by the caller.
        let mode = ScanMode::from(unsafe { &*mode });
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        error::report(
            "get_frequency",
            device.frequency(&mode, count),
            |frequency| *out = frequency,
        )
    })
}

/// Start a legacy standard scan.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_start_normal_scan(
    handle: BclidarHandle,
    force: bool,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "start_normal_scan", |device| {
        error::report(
            "start_normal_scan",
            device.start_scan_normal(force, millis(timeout_ms)),
            |()| {},
        )
    })
}

/// Start scanning in scan mode `mode`. The selected mode is written to
/// `out_mode` when it is non-null.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
/// `out_mode` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_start_scan(
    handle: BclidarHandle,
    force: bool,
    mode: u16,
    out_mode: *mut BclidarScanMode,
    options: u32,
) -> i32 {
    guarded(handle, "start_scan", |device| {
        error::report(
            "start_scan",
            device.start_scan(force, mode, options),
            |selected| {
                if !out_mode.is_null() {
                    // SAFETY: Non-null checked above; validity is guaranteed by the caller.
                    unsafe { *out_mode = BclidarScanMode::from(&selected) };
                }
            },
        )
    })
}

/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_stop(handle: BclidarHandle, timeout_ms: u32) -> i32 {
    guarded(handle, "stop", |device| {
        error::report("stop", device.stop(millis(timeout_ms)), |()| {})
    })
}
