use std::ffi::CStr;
use std::os::raw::c_char;

use crate::error;

/// Convert a required C string argument into UTF-8 `&str`.
///
/// # Safety
/// `value` must be null or point to a valid NUL-terminated C string.
pub(crate) unsafe fn required_str_arg<'a>(value: *const c_char, name: &str) -> Option<&'a str> {
    if value.is_null() {
        let _ = error::set_null_argument(name);
        return None;
    }

    let as_cstr = {
        // SAFETY: The caller guarantees `value` points to a valid NUL-terminated C string.
        unsafe { CStr::from_ptr(value) }
    };

    match as_cstr.to_str() {
        Ok(v) => Some(v),
        Err(err) => {
            error::set_error_message(format!(
                "{name}: invalid argument, not valid UTF-8 after {} bytes",
                err.valid_up_to()
            ));
            None
        }
    }
}

/// Borrow a required output argument.
///
/// # Safety
/// `value` must be null or valid for writes of `T`.
pub(crate) unsafe fn out_arg<'a, T>(value: *mut T, name: &str) -> Option<&'a mut T> {
    if value.is_null() {
        let _ = error::set_null_argument(name);
        return None;
    }
    // SAFETY: Non-null checked above; validity is guaranteed by the caller.
    Some(unsafe { &mut *value })
}

/// Borrow a caller buffer of `len` elements.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and valid for reads and writes of
/// `len` elements.
pub(crate) unsafe fn buffer_arg<'a, T>(data: *mut T, len: u64, name: &str) -> Option<&'a mut [T]> {
    if len == 0 {
        return Some(&mut []);
    }
    if data.is_null() {
        let _ = error::set_null_argument(name);
        return None;
    }
    let Ok(len) = usize::try_from(len) else {
        error::set_error_message(format!("{name} length {len} exceeds address space"));
        return None;
    };
    // SAFETY: Pointer and length are validated above and owned by the caller for the call.
    Some(unsafe { std::slice::from_raw_parts_mut(data, len) })
}
