//! Extendible hashing.
//!
//! The scheme implemented here follows the classical directory/bucket design:
//! a directory of `2^global_depth` slots routes each key, by the low
//! `global_depth` bits of its hash, to a bucket of bounded capacity. A full
//! bucket is split locally -- only its own entries are rehashed -- and the
//! directory doubles only when the splitting bucket is already referenced by
//! a single slot.

use {
    crate::{TableError, TableResult},
    parking_lot::Mutex,
    std::{
        hash::{BuildHasher, BuildHasherDefault, DefaultHasher, Hash},
        mem,
        sync::Arc,
    },
};

/// Upper bound on the directory's global depth.
///
/// A split of a bucket whose entries share their full hash prefix cannot
/// separate them no matter how often the directory doubles, so growth is
/// refused beyond this depth and [`ExtendibleHashTable::insert`] reports
/// [`TableError::DirectoryOverflow`] instead of spinning.
pub const MAX_GLOBAL_DEPTH: usize = 32;

/// A bounded bucket of key-value entries.
///
/// Buckets are passive: the table routes to them, splits them and rewires
/// directory slots around them. A bucket only knows its entries and how many
/// low hash bits identify it among its siblings.
#[derive(Debug)]
struct Bucket<K, V> {
    /// Number of low-order hash bits shared by every entry in this bucket.
    local_depth: usize,

    entries: Vec<(K, V)>,
}

impl<K: Eq, V> Bucket<K, V> {
    fn new(local_depth: usize) -> Self {
        Self {
            local_depth,
            entries: Vec::new(),
        }
    }

    /// Returns the value stored under `key`, if any.
    fn find(&self, key: &K) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Removes the entry stored under `key`. Entry order within a bucket is
    /// not observable, so the last entry is swapped into the hole.
    fn remove(&mut self, key: &K) -> bool {
        match self.entries.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                self.entries.swap_remove(pos);
                true
            }
            None => false,
        }
    }

    /// Inserts or overwrites `key`, unless the bucket is at `capacity`.
    ///
    /// On a full bucket the entry is handed back to the caller, which is
    /// expected to split the bucket and retry.
    fn insert(&mut self, key: K, value: V, capacity: usize) -> Result<(), (K, V)> {
        if let Some((_, v)) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            *v = value;
            return Ok(());
        }
        if self.entries.len() >= capacity {
            return Err((key, value));
        }
        self.entries.push((key, value));
        Ok(())
    }
}

/// A thread-safe dictionary backed by extendible hashing.
///
/// The table keeps a directory of `2^global_depth` slots, each resolving to
/// a bucket holding at most `bucket_size` entries. Several slots may resolve
/// to the same bucket; inserting into a full bucket splits it and, when the
/// bucket was referenced by a single slot, doubles the directory first.
/// Lookups and removals never move entries between buckets.
///
/// Every operation serializes on a single internal mutex, so any pair of
/// concurrent calls on one instance behaves as if executed in some serial
/// order. Keys and values are copied in and out; no references into the
/// table are ever handed to the caller.
///
/// The hasher defaults to the standard library's [`DefaultHasher`] with a
/// fixed initial state, which makes routing deterministic across instances.
/// A custom [`BuildHasher`] can be supplied through
/// [`with_hasher`](ExtendibleHashTable::with_hasher).
pub struct ExtendibleHashTable<K, V, S = BuildHasherDefault<DefaultHasher>> {
    inner: Arc<Mutex<Inner<K, V, S>>>,
}

struct Inner<K, V, S> {
    /// Number of low-order hash bits used to index the directory.
    global_depth: usize,

    /// Maximum number of entries per bucket. Immutable for the table's life.
    bucket_size: usize,

    /// The directory. Slot `i` routes keys whose low `global_depth` hash
    /// bits equal `i`; the slot holds an index into `buckets`.
    dir: Vec<usize>,

    /// Bucket arena. Buckets are created by splits and never destroyed, so
    /// the arena length is the live bucket count.
    buckets: Vec<Bucket<K, V>>,

    hash_builder: S,
}

impl<K: Hash + Eq, V, S: BuildHasher> Inner<K, V, S> {
    fn hash(&self, key: &K) -> u64 {
        self.hash_builder.hash_one(key)
    }

    /// Directory index of `key`: the low `global_depth` bits of its hash.
    fn index_of(&self, key: &K) -> usize {
        let mask = (1u64 << self.global_depth) - 1;
        (self.hash(key) & mask) as usize
    }

    /// Doubles the directory, with every new slot aliasing the bucket of the
    /// slot it mirrors. No bucket's referring-slot pattern changes, only its
    /// referring-slot count.
    fn grow(&mut self) {
        self.dir.extend_from_within(..);
        self.global_depth += 1;
    }

    /// Splits the bucket addressed by directory slot `dir_index`.
    ///
    /// The bucket's local depth rises to `d`; a fresh sibling takes over the
    /// directory slots whose `d`-th low hash bit is set, along with the
    /// entries that now route there. The caller has already ensured that
    /// `d <= global_depth`.
    fn split(&mut self, dir_index: usize) {
        let old = self.dir[dir_index];
        self.buckets[old].local_depth += 1;
        let d = self.buckets[old].local_depth;

        let mask = (1usize << d) - 1;
        let old_id = dir_index & (mask >> 1);
        let new_id = old_id | (1 << (d - 1));

        let new = self.buckets.len();
        self.buckets.push(Bucket::new(d));

        // Redistribute. The entry list is taken out of the bucket first so
        // that the container being iterated is never mutated.
        let entries = mem::take(&mut self.buckets[old].entries);
        for (key, value) in entries {
            let hash = self.hash(&key) as usize;
            let target = if hash & mask == new_id { new } else { old };
            self.buckets[target].entries.push((key, value));
        }

        // Rewire the directory: slots whose low `d` bits spell the old id
        // keep the old bucket, those spelling the sibling id move to it.
        // Slots of unrelated buckets are left untouched.
        for (i, slot) in self.dir.iter_mut().enumerate() {
            if i & mask == old_id {
                *slot = old;
            } else if i & mask == new_id {
                *slot = new;
            }
        }
    }
}

impl<K: Hash + Eq, V> ExtendibleHashTable<K, V> {
    /// Creates a table with a single empty bucket of capacity `bucket_size`
    /// at global depth 0, using the default deterministic hasher.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, BuildHasherDefault::default())
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> ExtendibleHashTable<K, V, S> {
    /// Creates a table hashing keys with `hash_builder`.
    ///
    /// The hash must be deterministic for the table's life; routing breaks
    /// down otherwise.
    ///
    /// # Panics
    ///
    /// Panics if `bucket_size` is zero.
    pub fn with_hasher(bucket_size: usize, hash_builder: S) -> Self {
        assert!(bucket_size >= 1, "bucket size must be at least 1");
        Self {
            inner: Arc::new(Mutex::new(Inner {
                global_depth: 0,
                bucket_size,
                dir: vec![0],
                buckets: vec![Bucket::new(0)],
                hash_builder,
            })),
        }
    }

    /// Inserts `value` under `key`, overwriting any previous value.
    ///
    /// Inserting into a full bucket splits it -- doubling the directory
    /// first when the bucket was referenced by a single slot -- and retries
    /// until the entry is placed. The only failure is
    /// [`TableError::DirectoryOverflow`]: more than `bucket_size` keys
    /// share a full [`MAX_GLOBAL_DEPTH`]-bit hash prefix, so no split can
    /// ever separate them.
    pub fn insert(&self, key: K, value: V) -> TableResult<()> {
        let mut inner = self.inner.lock();
        let bucket_size = inner.bucket_size;

        let mut entry = (key, value);
        loop {
            let index = inner.index_of(&entry.0);
            let bucket = inner.dir[index];

            entry = match inner.buckets[bucket].insert(entry.0, entry.1, bucket_size) {
                Ok(()) => return Ok(()),
                Err(entry) => entry,
            };

            // The addressed bucket is full. A bucket at full directory depth
            // is referenced by exactly one slot, so the directory must
            // double before the bucket can split.
            if inner.buckets[bucket].local_depth == inner.global_depth {
                if inner.global_depth == MAX_GLOBAL_DEPTH {
                    return Err(TableError::DirectoryOverflow {
                        global_depth: inner.global_depth,
                    });
                }
                inner.grow();
            }
            inner.split(index);
        }
    }

    /// Returns the value currently stored under `key`.
    pub fn find(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let inner = self.inner.lock();
        let bucket = inner.dir[inner.index_of(key)];
        inner.buckets[bucket].find(key).cloned()
    }

    /// Returns whether `key` is currently stored in the table.
    pub fn contains(&self, key: &K) -> bool {
        let inner = self.inner.lock();
        let bucket = inner.dir[inner.index_of(key)];
        inner.buckets[bucket].find(key).is_some()
    }

    /// Removes `key` from the table. Returns whether an entry was removed.
    pub fn remove(&self, key: &K) -> bool {
        let mut inner = self.inner.lock();
        let bucket = inner.dir[inner.index_of(key)];
        inner.buckets[bucket].remove(key)
    }

    /// Number of low-order hash bits currently used to index the directory.
    pub fn global_depth(&self) -> usize {
        self.inner.lock().global_depth
    }

    /// Local depth of the bucket referenced by directory slot `dir_index`.
    ///
    /// # Panics
    ///
    /// Panics if `dir_index` is not a valid directory slot, i.e. not below
    /// `2^global_depth`.
    pub fn local_depth(&self, dir_index: usize) -> usize {
        let inner = self.inner.lock();
        assert!(
            dir_index < inner.dir.len(),
            "directory index {dir_index} out of range at global depth {}",
            inner.global_depth,
        );
        inner.buckets[inner.dir[dir_index]].local_depth
    }

    /// Number of distinct buckets referenced by the directory.
    pub fn num_buckets(&self) -> usize {
        self.inner.lock().buckets.len()
    }

    /// Maximum number of entries a bucket holds before it splits.
    pub fn bucket_size(&self) -> usize {
        self.inner.lock().bucket_size
    }

    /// Number of entries currently stored in the table.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.buckets.iter().map(|b| b.entries.len()).sum()
    }

    /// Returns whether the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
