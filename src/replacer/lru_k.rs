//! LRU-K page replacement algorithm.
//!
//! The algorithm implemented here is based on the [LRU-K paper](https://dl.acm.org/doi/10.1145/170036.170081).

use {
    crate::{EvictError, EvictResult, FrameId, ReplacementPolicy, util::LogicalClock},
    parking_lot::Mutex,
    std::{
        collections::{HashMap, VecDeque},
        sync::Arc,
    },
};

/// Frame information.
#[derive(Debug)]
struct FrameInfo {
    /// Frame's access history. Timestamps of up to the `k` most recent
    /// frame references/accesses.
    ///
    /// The most recent reference is at the back of the list. While the frame
    /// has seen fewer than `k` accesses, the front of the list is its first
    /// access ever.
    history: VecDeque<u64>,

    /// Whether the frame may be selected for eviction.
    ///
    /// Frames enter the replacer pinned: a page being loaded into a frame
    /// must not be victimized before the caller releases it.
    evictable: bool,
}

impl FrameInfo {
    fn new(k: usize) -> Self {
        Self {
            history: VecDeque::with_capacity(k),
            evictable: false,
        }
    }

    /// Appends a reference timestamp, keeping the `k` most recent.
    fn record(&mut self, timestamp: u64, k: usize) {
        if self.history.len() == k {
            self.history.pop_front();
        }
        self.history.push_back(timestamp);
    }
}

/// Implements the LRU-K page replacement algorithm.
///
/// The replacer evicts the evictable frame whose backward K-distance -- the
/// difference between the current clock and the timestamp of its Kth
/// previous access -- is maximal. A frame with fewer than `k` recorded
/// accesses has an infinite backward K-distance and always takes precedence;
/// among such frames the one with the earliest first access is chosen
/// (classical LRU over cold frames).
pub struct LruKReplacer<F: FrameId> {
    inner: Arc<Mutex<Inner<F>>>,
}

struct Inner<F: FrameId> {
    /// Maximum number of frames the replacer was sized for. Advisory: the
    /// enclosing buffer pool never asks about more frames than it owns.
    capacity: usize,

    /// Number of most recent page accesses to keep track of.
    k: usize,

    /// Number of evictable frames in the replacer.
    size: usize,

    /// Mapping of frame IDs to contained frame information.
    ///
    /// Frame information includes the frame's access history.
    frames: HashMap<F, FrameInfo>,

    /// Monotonically increasing sequence of timestamps.
    /// Used to determine the order and time of page accesses.
    clock: LogicalClock,
}

impl<F: FrameId> Inner<F> {
    /// Selects the eviction victim among evictable frames.
    ///
    /// Frames with fewer than `k` accesses are preferred, earliest first
    /// access winning among them. Otherwise the largest backward K-distance
    /// wins, with ties broken by the earliest most recent access.
    fn victim(&self) -> Option<F> {
        let now = self.clock.now();

        let mut victim = None;
        let mut victim_is_cold = false;
        // Earliest first access among cold frames.
        let mut min_first_access = u64::MAX;
        // Largest backward K-distance among warm frames, and the earliest
        // most recent access for breaking ties on it.
        let mut max_k_dist = 0;
        let mut min_last_access = u64::MAX;

        for (id, frame) in &self.frames {
            if !frame.evictable {
                continue;
            }

            // A tracked frame has at least one recorded access.
            let Some(&first_access) = frame.history.front() else {
                continue;
            };
            let Some(&last_access) = frame.history.back() else {
                continue;
            };

            if frame.history.len() < self.k {
                // Cold frame: infinite backward K-distance. Falls back to
                // classical LRU on the first recorded access.
                if !victim_is_cold || first_access < min_first_access {
                    victim = Some(*id);
                    victim_is_cold = true;
                    min_first_access = first_access;
                }
            } else if !victim_is_cold {
                let kth_previous = frame.history[frame.history.len() - self.k];
                let k_dist = now - kth_previous;
                if victim.is_none()
                    || k_dist > max_k_dist
                    || (k_dist == max_k_dist && last_access < min_last_access)
                {
                    victim = Some(*id);
                    max_k_dist = k_dist;
                    min_last_access = last_access;
                }
            }
        }

        victim
    }
}

impl<F: FrameId> LruKReplacer<F> {
    /// Creates a new LRU-K replacer sized for `capacity` frames, tracking up
    /// to `k` most recent accesses per frame.
    ///
    /// # Panics
    ///
    /// Panics if `k` is zero.
    pub fn new(capacity: usize, k: usize) -> Self {
        assert!(k >= 1, "LRU-K requires k >= 1");
        Self {
            inner: Arc::new(Mutex::new(Inner {
                capacity,
                k,
                size: 0,
                frames: HashMap::with_capacity(capacity),
                clock: LogicalClock::new(),
            })),
        }
    }
}

impl<F: FrameId> ReplacementPolicy<F> for LruKReplacer<F> {
    fn evict(&self) -> Option<F> {
        let mut inner = self.inner.lock();
        inner.victim().inspect(|id| {
            // If victim is found, remove it from the replacer.
            inner.frames.remove(id);
            inner.size -= 1;
        })
    }

    fn peek(&self) -> Option<F> {
        self.inner.lock().victim()
    }

    fn record_access(&self, id: F) {
        let mut inner = self.inner.lock();

        let timestamp = inner.clock.tick();
        let k = inner.k;

        // Get frame's access history or create a new one. A frame seen for
        // the first time starts out pinned, so `size` is unaffected.
        inner
            .frames
            .entry(id)
            .or_insert_with(|| FrameInfo::new(k))
            .record(timestamp, k);
    }

    fn set_evictable(&self, id: F, evictable: bool) {
        let mut inner = self.inner.lock();

        // Frames the replacer has never seen are ignored.
        let Some(frame) = inner.frames.get_mut(&id) else {
            return;
        };

        // No-op if the frame is already in the desired state.
        if frame.evictable == evictable {
            return;
        }

        frame.evictable = evictable;
        if evictable {
            inner.size += 1;
        } else {
            inner.size -= 1;
        }
    }

    fn remove(&self, id: F) -> EvictResult<(), F> {
        let mut inner = self.inner.lock();

        if let Some(frame) = inner.frames.get(&id) {
            if !frame.evictable {
                return Err(EvictError::PinnedFrameRemoval(id));
            }
            inner.frames.remove(&id);
            inner.size -= 1;
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.inner.lock().capacity
    }

    fn size(&self) -> usize {
        self.inner.lock().size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_replacer_has_no_victim() {
        let replacer = LruKReplacer::<i32>::new(4, 2);
        assert_eq!(None, replacer.peek());
        assert_eq!(None, replacer.evict());
        assert_eq!(0, replacer.size());
    }

    #[test]
    fn pinned_frames_are_not_candidates() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(1);
        replacer.record_access(2);

        // Both frames are pinned on their first access.
        assert_eq!(0, replacer.size());
        assert_eq!(None, replacer.evict());

        replacer.set_evictable(2, true);
        assert_eq!(Some(2), replacer.evict());
        assert_eq!(None, replacer.evict());
    }

    #[test]
    fn cold_frame_takes_precedence_over_warm() {
        let replacer = LruKReplacer::new(4, 2);

        // Frame 1 is warm (two accesses), frame 2 is cold (one access).
        // Even though frame 2 was accessed later, its infinite backward
        // K-distance wins.
        replacer.record_access(1);
        replacer.record_access(1);
        replacer.record_access(2);
        replacer.set_evictable(1, true);
        replacer.set_evictable(2, true);

        assert_eq!(Some(2), replacer.evict());
        assert_eq!(Some(1), replacer.evict());
    }

    #[test]
    fn larger_backward_distance_wins() {
        let replacer = LruKReplacer::new(4, 2);

        replacer.record_access(1); // t=0
        replacer.record_access(2); // t=1
        replacer.record_access(1); // t=2
        replacer.record_access(2); // t=3
        replacer.set_evictable(1, true);
        replacer.set_evictable(2, true);

        // Backward distances at clock 4: frame 1 -> 4-0=4, frame 2 -> 4-1=3.
        assert_eq!(Some(1), replacer.evict());
        assert_eq!(Some(2), replacer.evict());
    }

    #[test]
    fn history_is_bounded_to_k_entries() {
        let replacer = LruKReplacer::new(4, 2);

        // Hammer frame 1, then touch frame 2 twice. Frame 1's Kth-previous
        // access must slide forward with the hammering, so frame 2's older
        // Kth-previous access makes it the victim.
        replacer.record_access(2); // t=0
        replacer.record_access(2); // t=1
        for _ in 0..10 {
            replacer.record_access(1); // t=2..=11
        }
        replacer.set_evictable(1, true);
        replacer.set_evictable(2, true);

        // Distances at clock 12: frame 1 -> 12-10=2, frame 2 -> 12-0=12.
        assert_eq!(Some(2), replacer.evict());
        assert_eq!(Some(1), replacer.evict());
    }

    #[test]
    fn peek_does_not_remove() {
        let replacer = LruKReplacer::new(4, 2);
        replacer.record_access(7);
        replacer.set_evictable(7, true);

        assert_eq!(Some(7), replacer.peek());
        assert_eq!(1, replacer.size());
        assert_eq!(Some(7), replacer.evict());
        assert_eq!(0, replacer.size());
    }
}
