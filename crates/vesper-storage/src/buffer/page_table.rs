//! Extendible hashing for the buffer pool's page table.
//!
//! The buffer pool must map a `PageId` to the frame currently holding
//! it, or report that the page is not buffered. This module implements
//! that map as an extendible hash table: a directory indexed by the low
//! `global_depth` bits of a key's hash, pointing into a set of buckets
//! that each hold up to `bucket_size` entries. An overfull bucket splits
//! in place; when its local depth has caught up with the global depth,
//! the directory doubles first.
//!
//! The table is generic so it can be unit-tested at plain integer keys
//! with a deterministic hasher, while the pool instantiates it at
//! `(PageId, FrameId)`.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

use parking_lot::Mutex;
use vesper_common::constants::INITIAL_GLOBAL_DEPTH;

/// Hash bits usable for directory addressing. Buckets whose local depth
/// has consumed every bit hold entries with identical hashes, which no
/// further split can separate.
const MAX_DEPTH: u32 = 63;

/// One hash bucket: the entries whose hashes agree with `id` on the low
/// `local_depth` bits.
#[derive(Debug)]
struct Bucket<K, V> {
    local_depth: u32,
    id: usize,
    items: Vec<(K, V)>,
}

impl<K, V> Bucket<K, V> {
    fn new(local_depth: u32, id: usize) -> Self {
        Self {
            local_depth,
            id,
            items: Vec::new(),
        }
    }
}

/// Directory and bucket storage, guarded as one unit.
#[derive(Debug)]
struct TableState<K, V> {
    global_depth: u32,
    /// Indices into `buckets`, one per directory slot. Multiple slots
    /// may reference the same bucket.
    directory: Vec<usize>,
    /// Bucket arena. Buckets are never removed; splitting appends.
    buckets: Vec<Bucket<K, V>>,
    /// Total number of entries across all buckets.
    len: usize,
}

/// A concurrent associative map built on extendible hashing.
///
/// `get`, `insert`, and `remove` each run under a single internal mutex
/// guarding the directory and every bucket.
///
/// # Example
///
/// ```rust
/// use vesper_storage::buffer::ExtendibleHashTable;
///
/// let table: ExtendibleHashTable<u64, &str> = ExtendibleHashTable::new(4);
/// table.insert(1, "one");
/// assert_eq!(table.get(&1), Some("one"));
/// assert_eq!(table.remove(&2), None);
/// ```
pub struct ExtendibleHashTable<K, V, S = BuildHasherDefault<DefaultHasher>> {
    state: Mutex<TableState<K, V>>,
    bucket_size: usize,
    hasher: S,
}

impl<K, V> ExtendibleHashTable<K, V>
where
    K: Hash + Eq,
{
    /// Creates a table whose buckets split once they exceed
    /// `bucket_size` entries.
    pub fn new(bucket_size: usize) -> Self {
        Self::with_hasher(bucket_size, BuildHasherDefault::default())
    }
}

impl<K, V, S> ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Creates a table using the supplied hasher factory.
    pub fn with_hasher(bucket_size: usize, hasher: S) -> Self {
        assert!(bucket_size > 0, "bucket_size must be > 0");
        let state = TableState {
            global_depth: INITIAL_GLOBAL_DEPTH,
            directory: vec![0, 1],
            buckets: vec![
                Bucket::new(INITIAL_GLOBAL_DEPTH, 0),
                Bucket::new(INITIAL_GLOBAL_DEPTH, 1),
            ],
            len: 0,
        };
        Self {
            state: Mutex::new(state),
            bucket_size,
            hasher,
        }
    }

    /// Looks up the value for `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        let state = self.state.lock();
        let hash = self.hash(key);
        let bucket = &state.buckets[state.directory[low_bits(hash, state.global_depth)]];
        bucket
            .items
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    /// Inserts `key -> value`, returning the previous value if the key
    /// was already present. Splits overfull buckets, doubling the
    /// directory as needed.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        let mut state = self.state.lock();
        let hash = self.hash(&key);
        let bucket_idx = state.directory[low_bits(hash, state.global_depth)];
        let bucket = &mut state.buckets[bucket_idx];

        if let Some(slot) = bucket.items.iter_mut().find(|(k, _)| *k == key) {
            return Some(std::mem::replace(&mut slot.1, value));
        }

        bucket.items.push((key, value));
        state.len += 1;

        let mut overfull = VecDeque::new();
        overfull.push_back(bucket_idx);
        while let Some(idx) = overfull.pop_front() {
            if state.buckets[idx].items.len() <= self.bucket_size {
                continue;
            }
            if state.buckets[idx].local_depth >= MAX_DEPTH {
                // Identical hashes; unsplittable.
                continue;
            }
            if state.buckets[idx].local_depth == state.global_depth {
                double_directory(&mut state);
            }
            let sibling_idx = self.split_bucket(&mut state, idx);
            if state.buckets[idx].items.len() > self.bucket_size {
                overfull.push_back(idx);
            }
            if state.buckets[sibling_idx].items.len() > self.bucket_size {
                overfull.push_back(sibling_idx);
            }
        }
        None
    }

    /// Removes the entry for `key`, returning its value. Buckets are
    /// never merged when occupancy drops.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut state = self.state.lock();
        let hash = self.hash(key);
        let bucket_idx = state.directory[low_bits(hash, state.global_depth)];
        let bucket = &mut state.buckets[bucket_idx];
        let pos = bucket.items.iter().position(|(k, _)| k == key)?;
        let (_, value) = bucket.items.swap_remove(pos);
        state.len -= 1;
        Some(value)
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.state.lock().len
    }

    /// Returns true if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of low hash bits used to index the directory.
    pub fn global_depth(&self) -> u32 {
        self.state.lock().global_depth
    }

    /// Returns the local depth of the bucket referenced by directory
    /// slot `slot`, or `None` if the slot is out of range.
    pub fn local_depth(&self, slot: usize) -> Option<u32> {
        let state = self.state.lock();
        let bucket_idx = *state.directory.get(slot)?;
        Some(state.buckets[bucket_idx].local_depth)
    }

    /// Returns the number of distinct buckets.
    pub fn num_buckets(&self) -> usize {
        self.state.lock().buckets.len()
    }

    fn hash(&self, key: &K) -> u64 {
        let mut hasher = self.hasher.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Splits the bucket at `idx`, which must have
    /// `local_depth < global_depth`. Returns the arena index of the new
    /// sibling.
    ///
    /// The old bucket keeps the entries whose hash bit `local_depth` is
    /// clear; the sibling, created at id `old_id | (1 << local_depth)`,
    /// takes the rest. Every directory slot whose low `local_depth + 1`
    /// bits equal the sibling id is repointed.
    fn split_bucket(&self, state: &mut TableState<K, V>, idx: usize) -> usize {
        let old_depth = state.buckets[idx].local_depth;
        debug_assert!(old_depth < state.global_depth);

        let sibling_id = state.buckets[idx].id | (1usize << old_depth);
        let sibling_idx = state.buckets.len();
        state
            .buckets
            .push(Bucket::new(old_depth + 1, sibling_id));
        state.buckets[idx].local_depth = old_depth + 1;

        let items = std::mem::take(&mut state.buckets[idx].items);
        for (key, value) in items {
            let hash = self.hash(&key);
            let target = if (hash >> old_depth) & 1 == 1 {
                sibling_idx
            } else {
                idx
            };
            state.buckets[target].items.push((key, value));
        }

        let mask = (1usize << (old_depth + 1)) - 1;
        for slot in 0..state.directory.len() {
            if slot & mask == sibling_id {
                state.directory[slot] = sibling_idx;
            }
        }
        sibling_idx
    }
}

/// Doubles the directory: each new slot aliases the bucket of the slot
/// addressed by its low `global_depth` bits.
fn double_directory<K, V>(state: &mut TableState<K, V>) {
    let len = state.directory.len();
    state.directory.extend_from_within(0..len);
    state.global_depth += 1;
}

/// The low `bits` bits of `hash`, as a directory index.
#[inline]
fn low_bits(hash: u64, bits: u32) -> usize {
    (hash & ((1u64 << bits) - 1)) as usize
}

impl<K, V, S> std::fmt::Debug for ExtendibleHashTable<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ExtendibleHashTable")
            .field("global_depth", &state.global_depth)
            .field("directory_len", &state.directory.len())
            .field("num_buckets", &state.buckets.len())
            .field("len", &state.len)
            .finish()
    }
}

#[cfg(test)]
impl<K, V, S> ExtendibleHashTable<K, V, S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    /// Asserts every structural invariant of the table.
    fn check_invariants(&self) {
        let state = self.state.lock();
        assert!(state.global_depth >= 1);
        assert_eq!(state.directory.len(), 1usize << state.global_depth);

        for (slot, &bucket_idx) in state.directory.iter().enumerate() {
            let bucket = &state.buckets[bucket_idx];
            assert!(bucket.local_depth <= state.global_depth);
            let mask = (1usize << bucket.local_depth) - 1;
            assert_eq!(
                slot & mask,
                bucket.id,
                "slot {slot:#b} does not agree with bucket id {:#b}",
                bucket.id
            );
        }

        let mut total = 0;
        let mut seen_keys = std::collections::HashSet::new();
        for bucket in &state.buckets {
            assert!(bucket.items.len() <= self.bucket_size);
            total += bucket.items.len();
            for (key, _) in &bucket.items {
                let hash = self.hash(key);
                assert_eq!(low_bits(hash, bucket.local_depth), bucket.id);
                assert!(seen_keys.insert(key), "key appears in more than one bucket");
            }
        }
        assert_eq!(total, state.len);
    }
}
