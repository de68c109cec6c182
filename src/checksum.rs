//! Compact integrity tag embedded next to the secret before it is split.
//!
//! The tag is the classic `hash * 31 + c` string hash over UTF-16 code units with signed
//! 32-bit wraparound, rendered as eight uppercase hex digits. It detects accidental
//! corruption and mismatched share sets; it offers no protection against tampering.

/// Number of hex digits in a checksum.
pub const CHECKSUM_LEN: usize = 8;

/// Computes the checksum of `data`.
///
/// # Examples
///
/// ```rust
/// use lastresort::checksum::checksum;
///
/// assert_eq!(checksum("hello world"), "6AEFE2C4");
/// assert_eq!(checksum(""), "00000000");
/// ```
pub fn checksum(data: &str) -> String {
    let hash = data
        .encode_utf16()
        .fold(0i32, |hash, unit| hash.wrapping_mul(31).wrapping_add(i32::from(unit)));

    // i32::MIN has no positive counterpart in 32 bits
    let magnitude = i64::from(hash).abs();
    let hex = format!("{:0>width$X}", magnitude, width = CHECKSUM_LEN);
    hex[hex.len() - CHECKSUM_LEN..].to_string()
}

/// Returns `true` if `expected` is the checksum of `data`.
pub fn verify(data: &str, expected: &str) -> bool {
    checksum(data) == expected
}
