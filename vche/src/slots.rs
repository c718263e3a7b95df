//! Two-row slot layout shared by every track.
//!
//! A slot vector of even length `n` is viewed as two rows of `n / 2` columns.
//! Column rotation moves every row left by the same step; row rotation swaps
//! the rows.

/// `out[r][c] = in[r][(c + step) mod (n/2)]` for both rows.
pub fn rotate_columns<T: Copy>(values: &[T], step: usize) -> Vec<T> {
    let width = values.len() / 2;
    if width == 0 {
        return values.to_vec();
    }
    let step = step % width;
    let mut out = Vec::with_capacity(values.len());
    for row in values.chunks(width) {
        out.extend_from_slice(&row[step..]);
        out.extend_from_slice(&row[..step]);
    }
    out
}

/// Swap the two rows.
pub fn rotate_rows<T: Copy>(values: &[T]) -> Vec<T> {
    let width = values.len() / 2;
    let mut out = Vec::with_capacity(values.len());
    out.extend_from_slice(&values[width..]);
    out.extend_from_slice(&values[..width]);
    out
}

/// Zero-pad `values` to `width`.
pub fn pad(values: &[u64], width: usize) -> Vec<u64> {
    let mut out = values.to_vec();
    out.resize(width, 0);
    out
}
