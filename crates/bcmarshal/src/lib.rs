//! bcmarshal: C-ABI probes for checking how a host marshals `double`
//! arrays into native code.
//!
//! Both exports return the number of values written per row, `-99` when a
//! required pointer is null and `-1` when a panic is caught.

mod error;
mod fill;

use std::panic::AssertUnwindSafe;

use tracing::{debug, warn};

pub use error::{MarshalError, Result, STATUS_NULL_ARGUMENT, STATUS_PANIC};
pub use fill::{fill_indexed_matrix, fill_sequence, MATRIX_STEP, SEQUENCE_STEP};

fn ffi_boundary(f: impl FnOnce() -> Result<i32>) -> i32 {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(written)) => written,
        Ok(Err(err)) => {
            warn!(error = %err, "rejected marshalling request");
            err.status_code()
        }
        Err(_) => {
            tracing::error!("panic caught at C boundary");
            STATUS_PANIC
        }
    }
}

fn length(size: i32) -> usize {
    usize::try_from(size).unwrap_or(0)
}

/// Fill `dest[0..size]` with `i * 0.0002`.
///
/// # Safety
/// `dest` must be null or valid for writes of `size` doubles.
#[no_mangle]
pub unsafe extern "C" fn bcmarshal_fill_sequence(dest: *mut f64, size: i32) -> i32 {
    ffi_boundary(|| {
        if dest.is_null() {
            return Err(MarshalError::NullArgument("dest"));
        }
        let len = length(size);
        debug!(size = len, "fill_sequence");
        // SAFETY: Non-null checked above; the caller guarantees `size` writable doubles.
        let dest = unsafe { std::slice::from_raw_parts_mut(dest, len) };
        fill_sequence(dest);
        Ok(len as i32)
    })
}

/// Fill each of the `row_count` rows with `size` values `n + i * 0.0001`.
///
/// Nothing is written when any row pointer is null.
///
/// # Safety
/// `rows` must be null or valid for reads of `row_count` pointers, each of
/// which must be null or valid for writes of `size` doubles.
#[no_mangle]
pub unsafe extern "C" fn bcmarshal_fill_indexed_matrix(
    rows: *const *mut f64,
    row_count: i32,
    size: i32,
) -> i32 {
    ffi_boundary(|| {
        if rows.is_null() {
            return Err(MarshalError::NullArgument("rows"));
        }
        let row_count = length(row_count);
        let len = length(size);
        debug!(rows = row_count, size = len, "fill_indexed_matrix");

        // SAFETY: Non-null checked above; the caller guarantees `row_count` readable pointers.
        let row_ptrs = unsafe { std::slice::from_raw_parts(rows, row_count) };
        let mut slices = Vec::with_capacity(row_count);
        for (n, &row) in row_ptrs.iter().enumerate() {
            if row.is_null() {
                return Err(MarshalError::NullRow(n));
            }
            // SAFETY: Non-null checked above; the caller guarantees `size` writable doubles.
            slices.push(unsafe { std::slice::from_raw_parts_mut(row, len) });
        }
        fill_indexed_matrix(&mut slices);
        Ok(len as i32)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_export_returns_size() {
        let mut dest = vec![0.0; 4];
        // SAFETY: `dest` holds four doubles.
        let written = unsafe { bcmarshal_fill_sequence(dest.as_mut_ptr(), 4) };
        assert_eq!(written, 4);
        assert_eq!(dest[1], 0.0002);
    }

    #[test]
    fn sequence_export_rejects_null() {
        // SAFETY: null is checked before any access.
        assert_eq!(unsafe { bcmarshal_fill_sequence(std::ptr::null_mut(), 4) }, -99);
    }

    #[test]
    fn negative_size_writes_nothing() {
        let mut dest = vec![7.0; 2];
        // SAFETY: a negative size never touches `dest`.
        let written = unsafe { bcmarshal_fill_sequence(dest.as_mut_ptr(), -3) };
        assert_eq!(written, 0);
        assert_eq!(dest, vec![7.0, 7.0]);
    }

    #[test]
    fn matrix_export_fills_every_row() {
        let mut first = vec![0.0; 3];
        let mut second = vec![0.0; 3];
        let rows = [first.as_mut_ptr(), second.as_mut_ptr()];
        // SAFETY: two rows of three doubles each.
        let written = unsafe { bcmarshal_fill_indexed_matrix(rows.as_ptr(), 2, 3) };
        assert_eq!(written, 3);
        assert_eq!(first[1], 0.0001);
        assert_eq!(second[0], 1.0);
    }

    #[test]
    fn matrix_export_rejects_null_rows() {
        let mut first = vec![5.0; 2];
        let rows = [first.as_mut_ptr(), std::ptr::null_mut()];
        // SAFETY: null pointers are checked before any write.
        unsafe {
            assert_eq!(bcmarshal_fill_indexed_matrix(std::ptr::null(), 2, 2), -99);
            assert_eq!(bcmarshal_fill_indexed_matrix(rows.as_ptr(), 2, 2), -99);
        }
        assert_eq!(first, vec![5.0, 5.0]);
    }

    #[test]
    fn panic_maps_to_minus_one() {
        assert_eq!(ffi_boundary(|| panic!("boom")), -1);
    }
}
