use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::checksum::checksum;
use crate::compression::{compress_hex, decompress_hex};
use crate::constants::{DELIMITER, MAX_SHARES, MIN_THRESHOLD};
use crate::error::{Result, ShareError};
use crate::sss::{ShamirScheme, ShareScheme};
use crate::transcode;

/// Outcome of recombining shares.
///
/// `is_valid` is `false` when the shares combined structurally but the recovered text does
/// not match its embedded checksum, e.g. a wrong subset that still happened to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recovered {
    pub secret: String,
    /// Checksum embedded at split time.
    pub checksum: String,
    pub is_valid: bool,
}

/// Wraps a [`ShareScheme`] with checksum tagging, compression and share transcoding.
#[derive(Debug, Default, Clone)]
pub struct SecretPipeline<S = ShamirScheme> {
    scheme: S,
}

impl<S: ShareScheme> SecretPipeline<S> {
    pub fn new(scheme: S) -> Self {
        SecretPipeline { scheme }
    }

    /// Splits `secret` into `shares` encoded shares, any `threshold` of which recover it.
    ///
    /// # Errors
    ///
    /// * `EmptySecret` if the secret is empty or whitespace only.
    /// * `InvalidParameters` unless `2 <= threshold <= shares <= 10`.
    pub fn split(&self, secret: &str, shares: usize, threshold: usize) -> Result<Vec<String>> {
        if secret.trim().is_empty() {
            return Err(ShareError::EmptySecret("nothing to split".to_string()));
        }
        validate_parameters(shares, threshold)?;

        let sum = checksum(secret);
        let tagged = format!("{sum}{DELIMITER}{secret}");
        let payload = compress_hex(&tagged)?;
        debug!(
            "tagged secret of {} bytes compressed to {} hex digits, checksum {}",
            tagged.len(),
            payload.len(),
            sum
        );

        let tokens = self.scheme.split(&payload, shares, threshold)?;
        Ok(tokens.iter().map(|t| transcode::encode(t)).collect())
    }

    /// Recovers the secret from encoded shares.
    ///
    /// The pipeline does not know the threshold the shares were made with; the scheme
    /// decides whether the set is sufficient. A checksum mismatch is reported through
    /// [`Recovered::is_valid`], not as an error.
    pub fn combine<T: AsRef<str>>(&self, shares: &[T]) -> Result<Recovered> {
        let tokens = shares
            .iter()
            .map(|s| transcode::decode(s.as_ref().trim()))
            .collect::<Result<Vec<_>>>()?;

        let payload = self.scheme.combine(&tokens)?;
        let tagged = decompress_hex(&payload)?;

        // only the first delimiter is structural; the secret may contain more
        let (embedded, secret) = tagged.split_once(DELIMITER).unwrap_or((tagged.as_str(), ""));

        if secret.trim().is_empty() {
            return Err(ShareError::EmptySecret(
                "combined payload holds no secret".to_string(),
            ));
        }

        let is_valid = checksum(secret) == embedded;
        if !is_valid {
            warn!("recovered secret does not match embedded checksum {embedded}");
        }

        Ok(Recovered {
            secret: secret.to_string(),
            checksum: embedded.to_string(),
            is_valid,
        })
    }
}

/// Checks share count and threshold against the allowed range.
pub fn validate_parameters(shares: usize, threshold: usize) -> Result<()> {
    if threshold < MIN_THRESHOLD || threshold > shares || shares > MAX_SHARES {
        return Err(ShareError::InvalidParameters(format!(
            "need {MIN_THRESHOLD} <= threshold ({threshold}) <= shares ({shares}) <= {MAX_SHARES}"
        )));
    }
    Ok(())
}

/// Splits `secret` with the default Shamir scheme.
///
/// ```rust
/// use lastresort::pipeline::{combine, split};
///
/// let shares = split("hello world", 5, 3).unwrap();
/// let recovered = combine(&shares[1..4]).unwrap();
/// assert_eq!(recovered.secret, "hello world");
/// assert!(recovered.is_valid);
/// ```
pub fn split(secret: &str, shares: usize, threshold: usize) -> Result<Vec<String>> {
    SecretPipeline::<ShamirScheme>::default().split(secret, shares, threshold)
}

/// Combines shares made by [`split`].
pub fn combine<T: AsRef<str>>(shares: &[T]) -> Result<Recovered> {
    SecretPipeline::<ShamirScheme>::default().combine(shares)
}
