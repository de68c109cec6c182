//! Splitting share text across several QR codes and putting it back together.
//!
//! Each QR code carries `SHARE_<pos>_OF_<total>|<data>`, with `pos` counted from 1 for the
//! people holding the printout. Internally chunks are indexed from 0.

use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{LINK_SCHEME, MAX_CHUNKS};
use crate::error::{Result, ShareError};

lazy_static! {
    static ref PAYLOAD_PATTERN: Regex =
        Regex::new(r"(?s)^SHARE_(\d+)_OF_(\d+)\|(.+)$").expect("payload pattern compiles");
}

/// One QR-sized fragment of a share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrChunk {
    /// 0-based position.
    pub index: usize,
    pub total: usize,
    pub data: String,
    /// `SHARE_<index+1>_OF_<total>`
    pub metadata: String,
}

impl QrChunk {
    pub fn new(index: usize, total: usize, data: String) -> Self {
        QrChunk {
            index,
            total,
            data,
            metadata: metadata(index, total),
        }
    }

    /// 1-based position shown to people.
    pub fn position(&self) -> usize {
        self.index + 1
    }

    /// Text encoded into the QR code.
    pub fn payload(&self) -> String {
        format!("{}|{}", self.metadata, self.data)
    }
}

fn metadata(index: usize, total: usize) -> String {
    format!("SHARE_{}_OF_{}", index + 1, total)
}

/// Cuts `text` into chunks of at most `max_size` characters.
///
/// Empty text produces no chunks.
///
/// # Errors
///
/// `InvalidParameters` if `max_size` is 0 or the text would need more than `MAX_CHUNKS`
/// codes.
///
/// ```rust
/// use lastresort::chunks::split_into_chunks;
///
/// let chunks = split_into_chunks("abcdefg", 3).unwrap();
/// assert_eq!(chunks.len(), 3);
/// assert_eq!(chunks[2].payload(), "SHARE_3_OF_3|g");
/// ```
pub fn split_into_chunks(text: &str, max_size: usize) -> Result<Vec<QrChunk>> {
    if max_size == 0 {
        return Err(ShareError::InvalidParameters(
            "chunk size must be at least 1".to_string(),
        ));
    }

    let chars: Vec<char> = text.chars().collect();
    let total = chars.len().div_ceil(max_size);
    if total > MAX_CHUNKS {
        return Err(ShareError::InvalidParameters(format!(
            "{} characters at {} per code need {} codes, more than {}",
            chars.len(),
            max_size,
            total,
            MAX_CHUNKS
        )));
    }

    Ok(chars
        .chunks(max_size)
        .enumerate()
        .map(|(index, piece)| QrChunk::new(index, total, piece.iter().collect()))
        .collect())
}

/// Parses a scanned QR payload.
///
/// Returns `None` when the text is not a valid chunk payload. Payloads whose position is 0
/// or beyond the total, or whose total exceeds `MAX_CHUNKS`, are rejected; use
/// [`looks_like_payload`] to tell those apart from a complete share.
pub fn parse_payload(text: &str) -> Option<QrChunk> {
    let caps = PAYLOAD_PATTERN.captures(text)?;
    let position: usize = caps[1].parse().ok()?;
    let total: usize = caps[2].parse().ok()?;

    if position == 0 || position > total || total > MAX_CHUNKS {
        return None;
    }

    Some(QrChunk::new(position - 1, total, caps[3].to_string()))
}

/// Returns `true` if `text` has the `SHARE_<pos>_OF_<total>|` shape, valid or not.
pub fn looks_like_payload(text: &str) -> bool {
    PAYLOAD_PATTERN.is_match(text)
}

/// Reassembles share text from chunk payloads in any order.
///
/// Repeated positions collapse to the first occurrence.
///
/// # Errors
///
/// `MalformedShare` if a payload is not a chunk, the payloads disagree on the total, or a
/// position is missing.
pub fn reconstruct<T: AsRef<str>>(payloads: &[T]) -> Result<String> {
    let mut collected: BTreeMap<usize, String> = BTreeMap::new();
    let mut expected_total = None;

    for payload in payloads {
        let chunk = parse_payload(payload.as_ref()).ok_or_else(|| {
            ShareError::MalformedShare("payload is not a SHARE_<n>_OF_<m> chunk".to_string())
        })?;

        match expected_total {
            Some(total) if total != chunk.total => {
                return Err(ShareError::MalformedShare(format!(
                    "chunks from different sets: {} and {} parts",
                    total, chunk.total
                )))
            }
            _ => expected_total = Some(chunk.total),
        }

        collected.entry(chunk.index).or_insert(chunk.data);
    }

    if let Some(total) = expected_total {
        if collected.len() != total {
            let missing: Vec<String> = (0..total)
                .filter(|i| !collected.contains_key(i))
                .map(|i| format!("#{}", i + 1))
                .collect();
            return Err(ShareError::MalformedShare(format!(
                "missing parts {}",
                missing.join(", ")
            )));
        }
    }

    Ok(collected.into_values().collect())
}

/// Single-QR form of a share: `mylastresort://SHARE-<n>:<data>`.
///
/// Display and transport only; the combine path never parses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub label: String,
    pub data: String,
}

impl ShareLink {
    /// Link for the share numbered `number` (from 1).
    pub fn for_share(number: usize, data: &str) -> Self {
        ShareLink {
            label: format!("SHARE-{number}"),
            data: data.to_string(),
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(LINK_SCHEME)?.strip_prefix("://")?;
        let (label, data) = rest.split_once(':')?;
        if label.is_empty() || data.is_empty() {
            return None;
        }
        Some(ShareLink {
            label: label.to_string(),
            data: data.to_string(),
        })
    }
}

impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LINK_SCHEME}://{}:{}", self.label, self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(text: &str, max_size: usize) -> Vec<String> {
        split_into_chunks(text, max_size)
            .unwrap()
            .iter()
            .map(QrChunk::payload)
            .collect()
    }

    #[test]
    fn test_2500_characters_in_three_chunks() {
        let share: String = (0..2500).map(|i| (b'A' + (i % 26) as u8) as char).collect();
        let chunks = split_into_chunks(&share, 1000).unwrap();

        let sizes: Vec<usize> = chunks.iter().map(|c| c.data.len()).collect();
        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert!(chunks.iter().all(|c| c.total == 3));
        assert_eq!(chunks[1].metadata, "SHARE_2_OF_3");

        let mut reversed = payloads(&share, 1000);
        reversed.reverse();
        assert_eq!(reconstruct(&reversed).unwrap(), share);
    }

    #[test]
    fn test_round_trip_over_lengths_and_sizes() {
        let text = "EYWJjZGVmMDEyMzQ1Njc4OWFiY2RlZg==";
        for len in 0..text.len() {
            for size in 1..=len + 2 {
                let mut chunked = payloads(&text[..len], size);
                let mid = (len / 3) % chunked.len().max(1);
                chunked.rotate_left(mid);
                assert_eq!(reconstruct(&chunked).unwrap(), &text[..len]);
            }
        }
    }

    #[test]
    fn test_duplicates_do_not_change_result() {
        let mut chunked = payloads("0123456789", 3);
        chunked.push(chunked[1].clone());
        chunked.insert(0, chunked[3].clone());
        assert_eq!(reconstruct(&chunked).unwrap(), "0123456789");
    }

    #[test]
    fn test_multibyte_text_splits_on_characters() {
        let chunks = split_into_chunks("ñandú🔑", 2).unwrap();
        let data: Vec<&str> = chunks.iter().map(|c| c.data.as_str()).collect();
        assert_eq!(data, vec!["ña", "nd", "ú🔑"]);
    }

    #[test]
    fn test_zero_chunk_size_is_rejected() {
        assert!(matches!(
            split_into_chunks("abc", 0),
            Err(ShareError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_parse_payload() {
        let chunk = parse_payload("SHARE_2_OF_3|abc|def").unwrap();
        assert_eq!(chunk.index, 1);
        assert_eq!(chunk.total, 3);
        assert_eq!(chunk.data, "abc|def");
        assert_eq!(chunk.position(), 2);
        assert_eq!(chunk.payload(), "SHARE_2_OF_3|abc|def");
    }

    #[test]
    fn test_parse_rejects_non_chunks() {
        for text in [
            "EYWJj",
            "SHARE_1_OF_2|",
            "SHARE_1_OF_2abc",
            "xSHARE_1_OF_2|abc",
            "SHARE_0_OF_2|abc",
            "SHARE_3_OF_2|abc",
            "SHARE_a_OF_2|abc",
            "mylastresort://SHARE-1:EYWJj",
            "SHARE_1_OF_200000000|x",
            "SHARE_1_OF_99999999999999999999999|x",
        ] {
            assert!(parse_payload(text).is_none(), "{text:?} parsed as a chunk");
        }
    }

    #[test]
    fn test_payload_shape_without_valid_position() {
        for text in ["SHARE_0_OF_2|abc", "SHARE_3_OF_2|abc", "SHARE_1_OF_200000000|x"] {
            assert!(looks_like_payload(text), "{text:?}");
            assert!(parse_payload(text).is_none(), "{text:?}");
        }
        assert!(!looks_like_payload("EYWJj"));
        assert!(!looks_like_payload("mylastresort://SHARE-1:EYWJj"));
    }

    #[test]
    fn test_chunk_count_is_bounded() {
        let text = "a".repeat(MAX_CHUNKS + 1);
        assert!(matches!(
            split_into_chunks(&text, 1),
            Err(ShareError::InvalidParameters(_))
        ));
        assert_eq!(split_into_chunks(&text, 2).unwrap().len(), MAX_CHUNKS / 2 + 1);

        let last = format!("SHARE_{MAX_CHUNKS}_OF_{MAX_CHUNKS}|z");
        assert_eq!(parse_payload(&last).unwrap().index, MAX_CHUNKS - 1);
    }

    #[test]
    fn test_reconstruct_with_huge_total_fails_fast() {
        assert!(matches!(
            reconstruct(&["SHARE_1_OF_200000000|x"]),
            Err(ShareError::MalformedShare(_))
        ));
    }

    #[test]
    fn test_reconstruct_errors() {
        assert!(matches!(
            reconstruct(&["SHARE_1_OF_2|ab", "plain"]),
            Err(ShareError::MalformedShare(_))
        ));
        assert!(matches!(
            reconstruct(&["SHARE_1_OF_2|ab", "SHARE_2_OF_3|cd"]),
            Err(ShareError::MalformedShare(_))
        ));
        assert!(matches!(
            reconstruct(&["SHARE_1_OF_3|ab", "SHARE_3_OF_3|cd"]),
            Err(ShareError::MalformedShare(_))
        ));
        assert_eq!(reconstruct::<&str>(&[]).unwrap(), "");
    }

    #[test]
    fn test_share_link() {
        let link = ShareLink::for_share(4, "EYWJj");
        assert_eq!(link.to_string(), "mylastresort://SHARE-4:EYWJj");
        assert_eq!(ShareLink::parse(&link.to_string()), Some(link));
        assert!(ShareLink::parse("EYWJj").is_none());
        assert!(ShareLink::parse("mylastresort://SHARE-4").is_none());
        assert!(ShareLink::parse("otherscheme://SHARE-4:EYWJj").is_none());
    }
}
