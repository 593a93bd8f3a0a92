#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![deny(elided_lifetimes_in_paths)]

mod error;
mod replacer;
mod table;
mod util;

use std::{fmt, hash::Hash};

pub use {
    error::{EvictError, EvictResult, TableError, TableResult},
    replacer::LruKReplacer,
    table::{ExtendibleHashTable, MAX_GLOBAL_DEPTH},
};

/// Frame identifier type.
///
/// Conceptually, the replacement policy implementation is assumed to be a
/// fixed-size array of frames, where each frame represents a container that
/// holds some page of data. The frame identifier is an index into this array.
pub trait FrameId: Copy + Hash + Eq + fmt::Display + fmt::Debug {}

impl<T> FrameId for T where T: Copy + Hash + Eq + fmt::Display + fmt::Debug {}

/// Page replacement policy.
///
/// Defines an interface for interacting with different page replacement
/// strategies. At its core, it provides methods for logging data access,
/// managing the set of eviction candidates, and eventually locating the next
/// frame to evict.
pub trait ReplacementPolicy<F: FrameId> {
    /// Find the next frame to be evicted and evict it.
    ///
    /// Only frames marked evictable with
    /// [`set_evictable`](ReplacementPolicy::set_evictable) are candidates.
    /// Successful eviction drops the frame's access history and decreases
    /// [`size`](ReplacementPolicy::size); `None` is returned when no frame
    /// is evictable.
    fn evict(&self) -> Option<F>;

    /// Peek into the next frame to be evicted.
    ///
    /// Selects a victim under the same policy as
    /// [`evict`](ReplacementPolicy::evict), without removing it.
    fn peek(&self) -> Option<F>;

    /// Notifies the policy that the page held by the frame has been
    /// referenced/accessed.
    ///
    /// Appends the current clock value to the frame's access history,
    /// creating the history on the frame's first access. A newly tracked
    /// frame is not evictable until the caller marks it so.
    fn record_access(&self, id: F);

    /// Toggle whether a frame may be selected for eviction.
    ///
    /// Unknown frames are ignored. Toggling adjusts
    /// [`size`](ReplacementPolicy::size); repeating the current state has no
    /// effect.
    fn set_evictable(&self, id: F, evictable: bool);

    /// Removes an evictable frame, along with its access history.
    ///
    /// In contrast to [`evict`](ReplacementPolicy::evict), this function
    /// removes an arbitrary evictable frame, not necessarily the one with
    /// the highest priority. Removing a non-evictable frame is an error;
    /// removing an unknown frame has no effect.
    fn remove(&self, id: F) -> EvictResult<(), F>;

    /// Returns the maximum number of frames the policy was sized for.
    fn capacity(&self) -> usize;

    /// The number of frames that can be evicted.
    /// Essentially, this is the number of evictable frames.
    fn size(&self) -> usize;
}
