//! Error types for pool and cache operations

use thiserror::Error;

/// Result type for pool and cache operations
pub type Result<T> = core::result::Result<T, MemoryError>;

/// Memory operation errors
///
/// Per-call failures (`PoolExhausted`, `ForeignHandle`, `StaleHandle`) are
/// recoverable and leave the pool in a consistent state. Construction
/// failures (`OutOfMemory`, `InvalidSize`, `ConfigError`) mean no instance
/// was created.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// The arena request itself could not be satisfied
    #[error("out of memory: requested {requested} bytes")]
    OutOfMemory {
        /// Size of the failed request in bytes
        requested: usize,
    },

    /// The pool has no free block left
    #[error("pool exhausted (capacity: {capacity} blocks)")]
    PoolExhausted {
        /// Total number of blocks in the pool
        capacity: usize,
    },

    /// A size parameter is unusable
    #[error("invalid size {size}: {reason}")]
    InvalidSize {
        /// The offending size
        size: usize,
        /// Why it was rejected
        reason: String,
    },

    /// A handle that does not belong to this pool was released
    #[error("handle index {index} is outside this pool (capacity: {capacity} blocks)")]
    ForeignHandle {
        /// Index carried by the handle
        index: usize,
        /// Total number of blocks in the pool
        capacity: usize,
    },

    /// A handle whose block was already released was used again
    #[error("stale handle for block {index}: block was already released")]
    StaleHandle {
        /// Index carried by the handle
        index: usize,
    },

    /// Invalid configuration
    #[error("configuration error: {message}")]
    ConfigError {
        /// What was wrong
        message: String,
    },
}

impl MemoryError {
    /// Create an out of memory error
    pub fn out_of_memory(requested: usize) -> Self {
        Self::OutOfMemory { requested }
    }

    /// Create a pool exhausted error
    pub fn pool_exhausted(capacity: usize) -> Self {
        Self::PoolExhausted { capacity }
    }

    /// Create an invalid size error
    pub fn invalid_size(size: usize, reason: impl Into<String>) -> Self {
        Self::InvalidSize { size, reason: reason.into() }
    }

    /// Create a foreign handle error
    pub fn foreign_handle(index: usize, capacity: usize) -> Self {
        Self::ForeignHandle { index, capacity }
    }

    /// Create a stale handle error
    pub fn stale_handle(index: usize) -> Self {
        Self::StaleHandle { index }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }

    /// True for exhaustion, which callers commonly retry after releasing
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::PoolExhausted { .. })
    }

    /// True for a rejected release (foreign or stale handle)
    pub fn is_invalid_release(&self) -> bool {
        matches!(self, Self::ForeignHandle { .. } | Self::StaleHandle { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(MemoryError::pool_exhausted(16).is_exhausted());
        assert!(MemoryError::foreign_handle(99, 16).is_invalid_release());
        assert!(MemoryError::stale_handle(3).is_invalid_release());
        assert!(!MemoryError::out_of_memory(1024).is_invalid_release());
    }

    #[test]
    fn display_includes_context() {
        let err = MemoryError::pool_exhausted(100);
        assert!(err.to_string().contains("100"));

        let err = MemoryError::foreign_handle(7, 4);
        let msg = err.to_string();
        assert!(msg.contains('7') && msg.contains('4'));
    }
}
