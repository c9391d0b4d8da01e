use bclidar_driver::{DeviceError, MeasurementNode, Outcome};

use crate::args;
use crate::device::{guarded, millis};
use crate::error;
use crate::strings::fill_string_list;
use crate::types::{
    BclidarHandle, BclidarNode, BclidarStringList, BCLIDAR_ERR_NULL_ARGUMENT, BCLIDAR_OK,
};

fn to_nodes(buffer: &[BclidarNode]) -> Vec<MeasurementNode> {
    buffer.iter().copied().map(MeasurementNode::from).collect()
}

fn copy_back(nodes: &[MeasurementNode], buffer: &mut [BclidarNode]) {
    for (slot, node) in buffer.iter_mut().zip(nodes) {
        *slot = BclidarNode::from(*node);
    }
}

/// Fill invalid angles and sort `count` nodes by angle, in place.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. If
/// `count > 0`, `buffer` must be valid for reads and writes of `count`
/// nodes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_sort_scan_data_ascend(
    handle: BclidarHandle,
    buffer: *mut BclidarNode,
    count: u64,
) -> i32 {
    guarded(handle, "sort_scan_data_ascend", |device| {
        // SAFETY: Null and length are checked in helper.
        let Some(buffer) = (unsafe { args::buffer_arg(buffer, count, "buffer") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        let mut nodes = to_nodes(buffer);
        error::report(
            "sort_scan_data_ascend",
            device.sort_scan_data_ascend(&mut nodes),
            |()| copy_back(&nodes, buffer),
        )
    })
}

/// Drain nodes received since the last call. The number copied is written
/// to `out_count` when it is non-null.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. If
/// `count > 0`, `buffer` must be valid for writes of `count` nodes.
/// `out_count` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_get_scan_data_with_interval(
    handle: BclidarHandle,
    buffer: *mut BclidarNode,
    count: u64,
    out_count: *mut u64,
) -> i32 {
    guarded(handle, "get_scan_data_with_interval", |device| {
        // SAFETY: Null and length are checked in helper.
        let Some(buffer) = (unsafe { args::buffer_arg(buffer, count, "buffer") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        let mut nodes = vec![MeasurementNode::default(); buffer.len()];
        error::report(
            "get_scan_data_with_interval",
            device.scan_data_with_interval(&mut nodes),
            |filled| {
                copy_back(&nodes[..filled], buffer);
                if !out_count.is_null() {
                    // SAFETY: Non-null checked above; validity is guaranteed by the caller.
                    unsafe { *out_count = filled as u64 };
                }
            },
        )
    })
}

/// Grab the latest full rotation into `buffer`, ordered by angle.
///
/// `out_count` receives the number of nodes copied, also when ordering
/// them fails.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`. If
/// `capacity > 0`, `buffer` must be valid for writes of `capacity` nodes.
/// `out_count` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn bclidar_grab_scan_data(
    handle: BclidarHandle,
    buffer: *mut BclidarNode,
    capacity: u64,
    out_count: *mut u64,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "grab_scan_data", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out_count) = (unsafe { args::out_arg(out_count, "out_count") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        // SAFETY: Null and length are checked in helper.
        let Some(buffer) = (unsafe { args::buffer_arg(buffer, capacity, "buffer") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };

        let mut nodes = vec![MeasurementNode::default(); buffer.len()];
        match device.grab_scan_data(&mut nodes, millis(timeout_ms)) {
            Ok(Outcome::Done(grabbed)) => {
                copy_back(&nodes[..grabbed.count], buffer);
                *out_count = grabbed.count as u64;
                match grabbed.ordered {
                    Ok(()) => BCLIDAR_OK,
                    Err(err) => error::map_device_error("grab_scan_data", &DeviceError::from(err)),
                }
            }
            other => error::report("grab_scan_data", other, |_| {}),
        }
    })
}

/// Grab one rotation and format it as checksummed sentences.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
/// `out_list` must be null or point to a zeroed or previously filled
/// `BclidarStringList`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_get_nmea(
    handle: BclidarHandle,
    out_list: *mut BclidarStringList,
    sensor_id: u32,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "get_nmea", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out_list) = (unsafe { args::out_arg(out_list, "out_list") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report(
            "get_nmea",
            device.nmea_sentences(sensor_id, millis(timeout_ms)),
            |sentences| fill_string_list(out_list, sentences),
        )
    })
}

/// Grab one rotation and format it as `angle;distance` lines.
///
/// # Safety
/// `handle` must be null or a live handle from `bclidar_create`.
/// `out_list` must be null or point to a zeroed or previously filled
/// `BclidarStringList`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_get_string_data(
    handle: BclidarHandle,
    out_list: *mut BclidarStringList,
    timeout_ms: u32,
) -> i32 {
    guarded(handle, "get_string_data", |device| {
        // SAFETY: Null is checked in helper; validity is guaranteed by the caller.
        let Some(out_list) = (unsafe { args::out_arg(out_list, "out_list") }) else {
            return BCLIDAR_ERR_NULL_ARGUMENT;
        };
        error::report(
            "get_string_data",
            device.string_data(millis(timeout_ms)),
            |lines| fill_string_list(out_list, lines),
        )
    })
}
