use thiserror::Error;

/// Errors raised while splitting, transporting or recombining a secret.
///
/// A checksum mismatch is deliberately absent: a combine that succeeds structurally but
/// yields the wrong content is reported through [`crate::pipeline::Recovered::is_valid`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShareError {
    /// Nothing to split, or nothing recovered.
    #[error("empty secret: {0}")]
    EmptySecret(String),

    /// Share count, threshold or chunk size out of bounds.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A supplied share string could not be transcoded or parsed.
    #[error("malformed share: {0}")]
    MalformedShare(String),

    /// The split primitive rejected the share set.
    #[error("shares could not be combined: {0}")]
    CombineError(String),

    /// The combined payload is not a valid compressed stream.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),
}

impl ShareError {
    /// Operator guidance for this kind of failure.
    pub fn hint(&self) -> &'static str {
        match self {
            ShareError::EmptySecret(_) => {
                "No secret recovered. The pieces may be damaged or incorrect."
            }
            ShareError::InvalidParameters(_) => {
                "Choose between 2 and 10 pieces, and a threshold no larger than the number of pieces."
            }
            ShareError::MalformedShare(_) => {
                "One of the pieces is not readable. Re-enter or re-scan it."
            }
            ShareError::CombineError(_) => {
                "These pieces don't match. Gather more pieces from the same recovery plan."
            }
            ShareError::CorruptPayload(_) => {
                "The pieces combined into unreadable data. They may come from different plans or have been tampered with."
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ShareError>;
