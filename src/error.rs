use thiserror::Error;

/// Result alias for catalog operations.
pub type CorpusResult<T> = Result<T, CorpusError>;

/// Errors raised by metadata matching, corpus access and audio presentation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CorpusError {
    /// A match criterion names a field the sample metadata does not carry.
    #[error("unknown metadata field '{field}'")]
    UnknownField { field: String },

    #[error("sample index {index} out of range for corpus of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("sample range {start}..{end} out of range for corpus of length {len}")]
    SliceOutOfRange { start: usize, end: usize, len: usize },

    /// Audio payload shape is inconsistent (ragged frames, bad channel count).
    #[error("invalid audio payload: {0}")]
    InvalidPayload(String),

    /// No implementation was injected for an optional capability.
    #[error("{capability} is not available")]
    CapabilityUnavailable { capability: &'static str },

    /// The injected capability reported a failure.
    #[error("{capability} failed: {reason}")]
    CapabilityFailed {
        capability: &'static str,
        reason: String,
    },

    #[error("invalid plot options: {0}")]
    InvalidPlotOptions(String),
}

impl CorpusError {
    pub(crate) fn unknown_field(field: &str) -> Self {
        CorpusError::UnknownField {
            field: field.to_string(),
        }
    }
}
