//! Error types for dms-core.

use thiserror::Error;

/// Result type alias for collation and schedule operations.
pub type Result<T> = std::result::Result<T, DmsError>;

/// Main error type for dms-core.
#[derive(Error, Debug)]
pub enum DmsError {
    /// A collater or padding call received no examples.
    #[error("Empty batch")]
    EmptyBatch,

    /// An MSA with zero aligned positions.
    #[error("MSA {index} has no aligned positions")]
    EmptySequence { index: usize },

    /// A character outside the tokenizer alphabet.
    #[error("Unknown residue '{0}'")]
    UnknownResidue(char),

    /// Token id that cannot be one-hot encoded.
    #[error("Token id {id} out of range for {categories} categories")]
    TokenOutOfRange { id: u32, categories: usize },

    /// A schedule row that is not a probability distribution.
    #[error("Invalid transition matrix at t={timestep}: {reason}")]
    InvalidTransitionMatrix { timestep: usize, reason: String },

    /// Padding requested for a tensor rank the engine does not handle.
    #[error("Padding not supported for rank {0}")]
    UnsupportedRank(usize),

    /// Tensor shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// MSA with the wrong number of sequences.
    #[error("MSA {index} has {actual} sequences, expected {expected}")]
    MsaDepthMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// Rows of an MSA with different lengths.
    #[error("Unaligned MSA: row {row} has length {actual}, expected {expected}")]
    UnalignedMsa {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Timestep outside the precomputed schedule.
    #[error("Timestep {timestep} outside schedule of {timesteps} steps")]
    TimestepOutOfRange { timestep: usize, timesteps: usize },

    /// Tokenizer errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Substitution matrix parse errors.
    #[error("BLOSUM parse error: {0}")]
    Blosum(String),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Categorical sampling errors.
    #[error("Sampling error: {0}")]
    Sampling(#[from] rand::distributions::WeightedError),

    /// Tensor backend errors.
    #[error(transparent)]
    Candle(#[from] candle_core::Error),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
