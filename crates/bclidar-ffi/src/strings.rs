use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

use crate::types::BclidarStringList;

fn release(list: &mut BclidarStringList) {
    if !list.items.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(list.items, list.len);
        // SAFETY: `items` was allocated as a `Box<[*mut c_char]>` by `fill_string_list`.
        let items = unsafe { Box::from_raw(slice_ptr) };
        for &item in items.iter() {
            if !item.is_null() {
                // SAFETY: every item came from `CString::into_raw`.
                drop(unsafe { CString::from_raw(item) });
            }
        }
    }
    *list = BclidarStringList::default();
}

/// Replace the contents of `list` with `lines`, releasing what it held.
pub(crate) fn fill_string_list(list: &mut BclidarStringList, lines: Vec<String>) {
    release(list);
    if lines.is_empty() {
        return;
    }

    let items: Box<[*mut c_char]> = lines
        .into_iter()
        .map(|line| {
            CString::new(line.replace('\0', "?"))
                .unwrap_or_default()
                .into_raw()
        })
        .collect();
    list.len = items.len();
    list.items = Box::into_raw(items) as *mut *mut c_char;
}

/// Free strings held by a [`BclidarStringList`] filled by this library.
///
/// # Safety
/// `list` must be null or point to a `BclidarStringList` that is either
/// zeroed or was filled by `bclidar_get_nmea` / `bclidar_get_string_data`.
#[no_mangle]
pub unsafe extern "C" fn bclidar_string_list_free(list: *mut BclidarStringList) {
    crate::ffi_boundary((), || {
        if list.is_null() {
            return;
        }
        // SAFETY: Pointer validity is guaranteed by the caller.
        release(unsafe { &mut *list });
    });
}
