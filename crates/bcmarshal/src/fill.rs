/// Step between consecutive values of [`fill_sequence`].
pub const SEQUENCE_STEP: f64 = 0.0002;

/// Step between consecutive values within a row of
/// [`fill_indexed_matrix`].
pub const MATRIX_STEP: f64 = 0.0001;

/// Write `i * 0.0002` to each index `i` of `dest`.
pub fn fill_sequence(dest: &mut [f64]) {
    for (i, value) in dest.iter_mut().enumerate() {
        *value = i as f64 * SEQUENCE_STEP;
    }
}

/// Write `n + i * 0.0001` to column `i` of row `n`.
pub fn fill_indexed_matrix(rows: &mut [&mut [f64]]) {
    for (n, row) in rows.iter_mut().enumerate() {
        for (i, value) in row.iter_mut().enumerate() {
            *value = n as f64 + i as f64 * MATRIX_STEP;
        }
    }
}
