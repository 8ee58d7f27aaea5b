//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. Integrity verification is
//! deliberately NOT an error path: a broken hash chain is reported as data
//! (see `chunks::ChainVerification`), while this enum covers rejected
//! writes, missing records and storage failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Append rejected: sequence must be strictly greater than the latest.
    #[error("out-of-order sequence {sequence} (latest is {latest})")]
    Sequence { sequence: u64, latest: u64 },

    /// Chunks must contain at least one event.
    #[error("cannot create a chunk from an empty event list")]
    EmptyChunk,

    /// Lookup for a record that must exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_error_display() {
        let err = LedgerError::Sequence {
            sequence: 3,
            latest: 7,
        };
        assert_eq!(err.to_string(), "out-of-order sequence 3 (latest is 7)");
    }

    #[test]
    fn test_not_found_display() {
        let err = LedgerError::not_found("chunk", "chunk_42");
        assert_eq!(err.to_string(), "chunk not found: chunk_42");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: LedgerError = io.into();
        assert!(matches!(err, LedgerError::Io(_)));
    }
}
