use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use bclidar_driver::{DeviceError, DeviceResult, Outcome};
use tracing::warn;

use crate::types::BCLIDAR_OK;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let sanitized = message.into().replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

/// Record a null or otherwise unusable argument and return its status.
pub(crate) fn set_null_argument(name: &str) -> i32 {
    let err = DeviceError::NullArgument;
    set_error_message(format!("{name}: {err}"));
    err.status_code()
}

/// Record `err` and return the status it maps to.
pub(crate) fn map_device_error(operation: &str, err: &DeviceError) -> i32 {
    let status = err.status_code();
    warn!(operation, status, error = %err, "lidar call failed");
    set_error_message(err.to_string());
    status
}

/// Translate a device result into a status, handing a completed value to
/// `on_done`. Skipped operations report success.
pub(crate) fn report<T>(operation: &str, result: DeviceResult<T>, on_done: impl FnOnce(T)) -> i32 {
    match result {
        Ok(Outcome::Done(value)) => {
            on_done(value);
            BCLIDAR_OK
        }
        Ok(Outcome::Skipped) => BCLIDAR_OK,
        Err(err) => map_device_error(operation, &err),
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use bclidar_driver::DriverError;

    use super::*;

    fn last_error() -> String {
        // SAFETY: the pointer refers to this thread's stored CString.
        unsafe { CStr::from_ptr(last_error_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn embedded_nul_is_replaced() {
        set_error_message("bad\0port");
        assert_eq!(last_error(), "bad?port");
        clear_error_state();
        assert!(last_error().is_empty());
    }

    #[test]
    fn skipped_reports_ok_without_value() {
        let mut seen = None;
        let status = report("health", Ok(Outcome::<u8>::Skipped), |v| seen = Some(v));
        assert_eq!(status, BCLIDAR_OK);
        assert!(seen.is_none());
    }

    #[test]
    fn driver_failure_passes_status_through() {
        let err = DeviceError::from(DriverError::Timeout);
        let expected = err.status_code();
        let status = report::<()>("stop", Err(err), |_| {});
        assert_eq!(status, expected);
        assert!(!last_error().is_empty());
    }

    #[test]
    fn null_argument_is_minus_ninety_nine() {
        assert_eq!(set_null_argument("out"), -99);
        assert!(last_error().starts_with("out"));
    }
}
