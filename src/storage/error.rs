//! Storage layer error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::storage::block::BlockId;

/// Errors that can occur in the storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Block out of range: {0}")]
    BlockOutOfRange(BlockId),

    #[error("Invalid page size: expected {expected}, got {actual}")]
    InvalidPageSize { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
