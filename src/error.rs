//! Error Types
//!
//! Every failure in this crate is a programming or configuration defect on
//! the caller's side: a bad hyperparameter combination detected when a model
//! is built, or an input that violates the model's bounds. None of these are
//! retryable conditions, so they are surfaced immediately as [`ModelError`]
//! values and never recovered internally.
//!
//! Checkpoint I/O is the one exception and uses `std::io::Result`, since it
//! deals with the filesystem rather than with the numeric core.

use thiserror::Error;

/// Error type for model construction and forward-pass input validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Invalid hyperparameter combination, detected at construction.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A token id at or above the vocabulary size.
    #[error("Token id {id} out of range for vocabulary of size {vocab_size}")]
    TokenOutOfRange { id: usize, vocab_size: usize },

    /// A sequence longer than the model's context window was passed directly
    /// to the forward pass. Generation never produces this because it
    /// truncates to the trailing window before every step.
    #[error("Sequence length {len} exceeds context window of {seq_len}")]
    ContextOverflow { len: usize, seq_len: usize },

    /// An empty batch or empty token sequence where at least one token is
    /// required.
    #[error("Empty token sequence")]
    EmptySequence,

    /// A token stream shorter than the operation needs.
    #[error("Sequence of length {len} is too short; need at least {min} tokens")]
    SequenceTooShort { len: usize, min: usize },

    /// Sequences in one batch (or an input/target pair) with differing
    /// lengths or counts.
    #[error("Ragged batch: expected length {expected}, got {got}")]
    RaggedBatch { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
