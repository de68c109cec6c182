use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::{Result, ShareError};

const EVEN_FLAG: char = 'E';
const ODD_FLAG: char = 'O';

/// Encodes a hex share token as printable share text.
///
/// The text is a parity flag (`E` or `O`) followed by base64 over the hex characters. Odd
/// length tokens get one `0` nibble appended before encoding so the flag can drop it again.
///
/// ```rust
/// use lastresort::transcode::{decode, encode};
///
/// let encoded = encode("abc");
/// assert_eq!(encoded, "OYWJjMA==");
/// assert_eq!(decode(&encoded).unwrap(), "abc");
/// ```
pub fn encode(hex: &str) -> String {
    let (flag, padded) = if hex.len() % 2 == 1 {
        (ODD_FLAG, format!("{hex}0"))
    } else {
        (EVEN_FLAG, hex.to_string())
    };

    let mut encoded = String::with_capacity(1 + padded.len() * 4 / 3 + 4);
    encoded.push(flag);
    encoded.push_str(&BASE64.encode(padded.as_bytes()));
    encoded
}

/// Decodes share text produced by [`encode`] back into its hex token.
pub fn decode(encoded: &str) -> Result<String> {
    let mut chars = encoded.chars();
    let odd = match chars.next() {
        Some(EVEN_FLAG) => false,
        Some(ODD_FLAG) => true,
        Some(other) => {
            return Err(ShareError::MalformedShare(format!(
                "unknown parity flag {other:?}"
            )))
        }
        None => return Err(ShareError::MalformedShare("empty share".to_string())),
    };

    let bytes = BASE64
        .decode(chars.as_str().trim())
        .map_err(|e| ShareError::MalformedShare(e.to_string()))?;

    let mut hex =
        String::from_utf8(bytes).map_err(|e| ShareError::MalformedShare(e.to_string()))?;

    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ShareError::MalformedShare(
            "share does not carry a hex token".to_string(),
        ));
    }

    if odd && hex.pop().is_none() {
        return Err(ShareError::MalformedShare(
            "odd-flagged share is empty".to_string(),
        ));
    }

    Ok(hex)
}
