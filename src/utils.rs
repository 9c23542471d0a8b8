//! Bit shuffling and bitstring helpers.

/// Extracts bits from a number in a particular order.
///
/// Bit `i` of the result is bit `indices[i]` of `num`.
///
/// # Example
///
/// ```
/// use qsearch::utils::extract_bits;
///
/// assert_eq!(extract_bits(0b1010, &[3, 0]), 0b01);
/// ```
#[inline]
pub fn extract_bits(num: usize, indices: &[usize]) -> usize {
    indices.iter().enumerate().fold(0, |acc, (i, index)| {
        let bit = (num >> index) & 1;
        acc | (bit << i)
    })
}

/// Places the low bits of `value` at the positions given by `indices`, the inverse of
/// [`extract_bits`].
///
/// # Example
///
/// ```
/// use qsearch::utils::{extract_bits, scatter_bits};
///
/// let x = scatter_bits(0b01, &[3, 0]);
/// assert_eq!(x, 0b1000);
/// assert_eq!(extract_bits(x, &[3, 0]), 0b01);
/// ```
#[inline]
pub fn scatter_bits(value: u64, indices: &[usize]) -> usize {
    indices.iter().enumerate().fold(0, |acc, (i, index)| {
        let bit = ((value >> i) & 1) as usize;
        acc | (bit << index)
    })
}

/// Format `value` as a bitstring of exactly `width` characters, most significant bit first.
///
/// ```
/// use qsearch::utils::bitstring;
///
/// assert_eq!(bitstring(5, 4), "0101");
/// ```
pub fn bitstring(value: u64, width: usize) -> String {
    (0..width)
        .rev()
        .map(|i| if (value >> i) & 1 == 1 { '1' } else { '0' })
        .collect()
}

/// Parse a most-significant-first bitstring as an unsigned integer. Returns `None` for empty or
/// non-binary input, or when the value does not fit.
///
/// ```
/// use qsearch::utils::parse_bitstring;
///
/// assert_eq!(parse_bitstring("0101"), Some(5));
/// assert_eq!(parse_bitstring("01x1"), None);
/// ```
pub fn parse_bitstring(bits: &str) -> Option<usize> {
    if bits.is_empty() || !bits.bytes().all(|b| b == b'0' || b == b'1') {
        return None;
    }
    usize::from_str_radix(bits, 2).ok()
}
