use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::constants::MAX_DECOMPRESSED_SIZE;
use crate::error::{Result, ShareError};

/// Compresses UTF-8 text into a zlib stream.
pub fn compress(text: &str) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| ShareError::CorruptPayload(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| ShareError::CorruptPayload(e.to_string()))
}

/// Decompresses a zlib stream back into text.
///
/// Output is capped at `MAX_DECOMPRESSED_SIZE` bytes; a stream that inflates past the cap, is
/// not valid zlib, or is not UTF-8 yields `CorruptPayload`.
pub fn decompress(data: &[u8]) -> Result<String> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = decoder
            .read(&mut buffer)
            .map_err(|e| ShareError::CorruptPayload(e.to_string()))?;

        if bytes_read == 0 {
            break;
        }

        if decompressed.len() + bytes_read > MAX_DECOMPRESSED_SIZE {
            return Err(ShareError::CorruptPayload(format!(
                "decompressed payload exceeds {} bytes",
                MAX_DECOMPRESSED_SIZE
            )));
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    String::from_utf8(decompressed).map_err(|e| ShareError::CorruptPayload(e.to_string()))
}

/// Compresses `text` and returns the stream as lowercase hex, the form handed to the
/// split primitive.
pub fn compress_hex(text: &str) -> Result<String> {
    Ok(hex::encode(compress(text)?))
}

/// Inverse of [`compress_hex`].
pub fn decompress_hex(data: &str) -> Result<String> {
    let bytes = hex::decode(data).map_err(|e| ShareError::CorruptPayload(e.to_string()))?;
    decompress(&bytes)
}
