//! Error types for block storage and tree operations.

use std::io;
use thiserror::Error;

/// Errors that can occur in storage and tree operations.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt metadata block: {0}")]
    CorruptMetadata(String),

    #[error("Corrupt block {block_id}: {reason}")]
    CorruptBlock { block_id: u64, reason: String },

    #[error("Block overflow: payload of {payload} bytes exceeds block size {block_size}")]
    BlockOverflow { payload: usize, block_size: usize },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

/// Result type for storage and tree operations.
pub type IndexResult<T> = Result<T, IndexError>;
