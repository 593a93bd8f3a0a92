use crate::FrameId;

/// Replacement policy error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvictError<F: FrameId> {
    /// Trying to remove pinned frame.
    #[error("Trying to remove pinned frame: {0}")]
    PinnedFrameRemoval(F),
}

/// Replacement policy result type.
pub type EvictResult<T, F> = Result<T, EvictError<F>>;

/// Extendible hash table error.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    /// The directory cannot grow any further, yet the addressed bucket still
    /// refuses the entry. Every entry in the bucket shares its full hash
    /// prefix with the incoming key, so no amount of splitting separates
    /// them.
    #[error("Directory cannot grow beyond global depth {global_depth}")]
    DirectoryOverflow {
        /// Global depth at which growth was refused.
        global_depth: usize,
    },
}

/// Extendible hash table result type.
pub type TableResult<T> = Result<T, TableError>;
