use thiserror::Error;

/// Protocol-wide error types for the Tessera treasury.
///
/// The variants fall into three classes (see [`TesseraError::is_fatal`]):
/// fatal errors abort the whole block, `Conversion` is skipped by the caller,
/// and `InvalidInput` is a rejected request that leaves state untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TesseraError {
    /// Storage layer error (RocksDB, write batch, iteration).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error, including corrupt decimal encodings.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Arithmetic overflow or underflow on amounts or decimals.
    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    /// Rejected input at the API boundary (negative weight, bad denom, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid state transition or violated invariant.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Currency conversion failed (no known exchange rate).
    #[error("Conversion error: {0}")]
    Conversion(String),

    /// An external collaborator (bank, issuance ledger) refused an operation.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl TesseraError {
    /// Whether this error must abort the block's state transition.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TesseraError::Storage(_)
                | TesseraError::Serialization(_)
                | TesseraError::Overflow(_)
                | TesseraError::InvalidState(_)
                | TesseraError::Collaborator(_)
        )
    }

    /// Convenience constructor for overflow errors.
    pub fn overflow(what: impl Into<String>) -> Self {
        TesseraError::Overflow(what.into())
    }
}

impl From<serde_json::Error> for TesseraError {
    fn from(e: serde_json::Error) -> Self {
        TesseraError::Serialization(e.to_string())
    }
}
