use std::io;

use thiserror::Error;

/// Rejected option combinations. Reported before any file is read.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("ngram_size must be >= 1")]
    ZeroNgramSize,
    #[error("bloom_bits must be >= 1")]
    ZeroBloomBits,
    #[error("batch_ratio must be >= 1")]
    ZeroBatchRatio,
    #[error("batch_ratio ({ratio}) must not exceed bloom_bits ({bits})")]
    BatchRatioTooLarge { ratio: usize, bits: usize },
    #[error("{name} must be a finite number in 0..1 (got {value})")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
}

impl From<ConfigError> for io::Error {
    fn from(err: ConfigError) -> Self {
        io::Error::new(io::ErrorKind::InvalidInput, err)
    }
}

/// Why a diff could not be turned into patch records.
///
/// These never abort a traversal; the affected unit is classified as ERROR.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    #[error("line {line}: diff content before any `@@` hunk header")]
    MissingHunkHeader { line: usize },
    #[error("line {line}: malformed hunk header `{header}`")]
    MalformedHunkHeader { line: usize, header: String },
    #[error("diff is not valid UTF-8")]
    InvalidEncoding,
    #[error("diff contains binary data")]
    Binary,
    #[error("diff could not be read: {0}")]
    Unreadable(String),
}
