use log::{debug, trace, warn};

use crate::bucket::{mask, Bucket, BucketId};
use crate::config::Config;
use crate::error::Error;
use crate::event::Event;

pub struct Directory {
    /// Bucket storage (owns buckets)
    buckets: Vec<Bucket>,

    /// Directory mapping low-order key bits to bucket indices
    slots: Vec<usize>,

    /// Global depth (slots.len() == 2^global_depth)
    global_depth: u8,

    /// Keys per bucket
    capacity: usize,

    /// Inserts needing a deeper directory are rejected
    max_global_depth: u8,

    /// Total keys across all buckets
    len: usize,

    /// Sequence number for the next bucket name
    next_id: u32,

    /// Event journal, only kept when recording is enabled
    events: Option<Vec<Event>>,
}

impl Directory {
    /// Create a directory with one empty bucket at depth 0
    ///
    /// `config` is expected to be validated already.
    pub fn new(config: &Config) -> Self {
        Self {
            buckets: vec![Bucket::new(BucketId::new(0), 0, config.bucket_capacity)],
            slots: vec![0],
            global_depth: 0,
            capacity: config.bucket_capacity,
            max_global_depth: config.max_global_depth,
            len: 0,
            next_id: 1,
            events: config.record_events.then(Vec::new),
        }
    }

    /// Number of keys stored
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct buckets
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn global_depth(&self) -> u8 {
        self.global_depth
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Raw slot table, each entry indexes into [`Directory::bucket_at`]
    #[inline]
    pub fn slots(&self) -> &[usize] {
        &self.slots
    }

    /// Bucket stored at an arena index taken from [`Directory::slots`]
    #[inline]
    pub fn bucket_at(&self, idx: usize) -> &Bucket {
        &self.buckets[idx]
    }

    /// Compute directory slot from key (uses LOW bits)
    #[inline]
    pub fn slot_index(&self, key: u64) -> usize {
        (key & mask(self.global_depth)) as usize
    }

    /// Bucket a key is routed to
    #[inline]
    pub fn bucket_for(&self, key: u64) -> &Bucket {
        &self.buckets[self.slots[self.slot_index(key)]]
    }

    pub fn contains(&self, key: u64) -> bool {
        self.bucket_for(key).contains(key)
    }

    /// Number of stored copies of `key`
    pub fn count(&self, key: u64) -> usize {
        self.bucket_for(key).count(key)
    }

    /// Swap in a fresh directory, keeping the event journal
    pub(crate) fn replace(&mut self, mut fresh: Directory) {
        fresh.events = self.events.take();
        *self = fresh;
    }

    /// Drain recorded events
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.as_mut().map(std::mem::take).unwrap_or_default()
    }

    #[inline]
    pub(crate) fn emit(&mut self, event: impl FnOnce() -> Event) {
        if let Some(events) = self.events.as_mut() {
            events.push(event());
        }
    }

    fn next_bucket_id(&mut self) -> BucketId {
        let id = BucketId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Double the directory size
    fn double_directory(&mut self) {
        // Low-bit addressing: the new half mirrors the old one,
        // [A, B] -> [A, B, A, B], so slot i and i + len share a bucket
        self.slots.extend_from_within(..);
        self.global_depth += 1;

        debug!(
            "Directory doubled to global depth {} ({} slots)",
            self.global_depth,
            self.slots.len()
        );
        let global_depth = self.global_depth;
        self.emit(|| Event::DirectoryDoubled { global_depth });
    }

    /// Halve the directory if every slot in the upper half mirrors the lower half
    ///
    /// Returns whether the directory shrank.
    fn halve_directory(&mut self) -> bool {
        if self.global_depth == 0 {
            return false;
        }

        let half = self.slots.len() / 2;
        if self.slots[..half] != self.slots[half..] {
            return false;
        }

        self.slots.truncate(half);
        self.global_depth -= 1;

        debug!(
            "Directory halved to global depth {} ({} slots)",
            self.global_depth,
            self.slots.len()
        );
        let global_depth = self.global_depth;
        self.emit(|| Event::DirectoryHalved { global_depth });
        true
    }

    /// Split a bucket and store the sibling, returning its arena index
    fn split_bucket(&mut self, bucket_idx: usize) -> usize {
        let sibling_id = self.next_bucket_id();
        let sibling = self.buckets[bucket_idx].split(sibling_id);

        let bucket = &self.buckets[bucket_idx];
        let bucket_id = bucket.id();
        let local_depth = bucket.local_depth();
        debug!(
            "Bucket {} split at local depth {}: kept {:?}, moved {:?} to {}",
            bucket_id,
            local_depth,
            bucket.keys(),
            sibling.keys(),
            sibling_id
        );
        self.emit(|| Event::BucketSplit {
            bucket: bucket_id,
            sibling: sibling_id,
            local_depth,
            moved: sibling.keys().to_vec(),
        });

        self.buckets.push(sibling);
        self.buckets.len() - 1
    }

    /// Point every slot whose low `local_depth` bits match the sibling's
    /// prefix at the sibling
    ///
    /// `slot` is any slot that referenced the bucket before it was split.
    /// Slots carrying the old prefix are re-affirmed to the old bucket.
    fn redistribute_pointers(&mut self, slot: usize, sibling_idx: usize) {
        let old_idx = self.slots[slot];
        let local_depth = self.buckets[sibling_idx].local_depth();
        debug_assert!(local_depth >= 1 && local_depth <= self.global_depth);

        let m = mask(local_depth) as usize;
        let split_bit = 1usize << (local_depth - 1);
        let old_bits = slot & (split_bit - 1);
        let new_bits = old_bits | split_bit;

        let mut changed = Vec::with_capacity(1 << (self.global_depth - local_depth));
        for (i, target) in self.slots.iter_mut().enumerate() {
            if i & m == old_bits {
                *target = old_idx;
            } else if i & m == new_bits {
                *target = sibling_idx;
                changed.push(i);
            }
        }
        debug_assert_eq!(changed.len(), 1 << (self.global_depth - local_depth));

        let sibling = self.buckets[sibling_idx].id();
        debug!("Slots {:?} now point to bucket {}", changed, sibling);
        self.emit(|| Event::PointersRedistributed {
            sibling,
            slots: changed,
        });
    }

    /// Insert a key, splitting buckets and doubling the directory as needed
    ///
    /// Duplicates are stored again. Fails without touching anything when the
    /// key can never fit (it already fills a bucket on its own) or when
    /// fitting it would need a directory deeper than the configured limit.
    pub fn insert(&mut self, key: u64) -> Result<(), Error> {
        let bucket = self.bucket_for(key);
        if bucket.is_full() {
            let Some(required) = bucket.required_depth(key) else {
                warn!(
                    "Rejected key {}: already stored {} times",
                    key, self.capacity
                );
                return Err(Error::DuplicateOverflow {
                    key,
                    capacity: self.capacity,
                });
            };

            if required > self.max_global_depth {
                warn!(
                    "Rejected key {}: needs global depth {}, limit is {}",
                    key, required, self.max_global_depth
                );
                return Err(Error::DepthLimit {
                    key,
                    required,
                    limit: self.max_global_depth,
                });
            }
        }

        // Every failed round raises the local depth of the key's bucket by
        // one, and it never needs to pass `required_depth`
        loop {
            let slot = self.slot_index(key);
            let bucket_idx = self.slots[slot];
            let bucket_id = self.buckets[bucket_idx].id();
            trace!("Key {} routed to slot {} (bucket {})", key, slot, bucket_id);
            self.emit(|| Event::Routed {
                key,
                slot,
                bucket: bucket_id,
            });

            if self.buckets[bucket_idx].insert(key).is_ok() {
                self.len += 1;
                trace!("Key {} stored in bucket {}", key, bucket_id);
                self.emit(|| Event::Stored {
                    key,
                    bucket: bucket_id,
                });
                return Ok(());
            }

            self.emit(|| Event::BucketFull { bucket: bucket_id });
            if self.buckets[bucket_idx].local_depth() == self.global_depth {
                self.double_directory();
            }

            // doubling mirrors slots, so `slot` still references the bucket
            let sibling_idx = self.split_bucket(bucket_idx);
            self.redistribute_pointers(slot, sibling_idx);
        }
    }

    /// Remove one copy of `key`, then merge buddies while possible
    ///
    /// Returns `Ok(false)` if the key was not stored.
    pub fn remove(&mut self, key: u64) -> Result<bool, Error> {
        let slot = self.slot_index(key);
        let bucket_idx = self.slots[slot];
        let bucket_id = self.buckets[bucket_idx].id();

        if !self.buckets[bucket_idx].remove(key) {
            trace!("Key {} not found in bucket {}", key, bucket_id);
            self.emit(|| Event::NotFound { key });
            return Ok(false);
        }

        self.len -= 1;
        trace!("Key {} removed from bucket {}", key, bucket_id);
        self.emit(|| Event::Removed {
            key,
            bucket: bucket_id,
        });

        self.merge(slot)?;
        Ok(true)
    }

    /// Fold the bucket at `slot` into its buddy, cascading upwards
    ///
    /// Each successful round lowers the surviving bucket's local depth by
    /// one, so the loop ends by depth 0 at the latest.
    fn merge(&mut self, slot: usize) -> Result<(), Error> {
        let mut slot = slot;

        loop {
            let current = self.slots[slot];
            let local_depth = self.buckets[current].local_depth();
            if local_depth == 0 {
                return Ok(());
            }

            // the buddy differs only in the most significant used bit
            let target_bits = (slot & mask(local_depth) as usize) ^ (1 << (local_depth - 1));
            let buddy = self.slots[target_bits];
            if buddy == current
                || self.buckets[buddy].local_depth() != local_depth
                || self.buckets[buddy].len() + self.buckets[current].len() > self.capacity
            {
                return Ok(());
            }

            for target in self.slots.iter_mut() {
                if *target == current {
                    *target = buddy;
                }
            }
            let absorbed = self.discard_bucket(current);

            // discarding may have moved the buddy within the arena
            let into = self.slots[target_bits];
            let absorbed_id = absorbed.id();
            let merged = &mut self.buckets[into];
            merged.absorb(absorbed);
            merged.set_local_depth(local_depth - 1);
            let into_id = merged.id();
            debug!(
                "Bucket {} merged into {} at local depth {}",
                absorbed_id,
                into_id,
                local_depth - 1
            );
            self.emit(|| Event::BucketsMerged {
                absorbed: absorbed_id,
                into: into_id,
                local_depth: local_depth - 1,
            });

            self.halve_directory();

            slot = self
                .slots
                .iter()
                .position(|&idx| idx == into)
                .ok_or_else(|| {
                    Error::Internal(format!("merged bucket {into_id} lost its directory slot"))
                })?;
        }
    }

    /// Remove an unreferenced bucket from the arena
    fn discard_bucket(&mut self, idx: usize) -> Bucket {
        debug_assert!(self.slots.iter().all(|&s| s != idx));

        let bucket = self.buckets.swap_remove(idx);
        let moved_from = self.buckets.len();
        if idx != moved_from {
            for target in self.slots.iter_mut() {
                if *target == moved_from {
                    *target = idx;
                }
            }
        }
        bucket
    }

    /// Check every structural invariant of the directory
    ///
    /// - directory length is `2^global_depth`
    /// - every bucket is referenced and `local_depth <= global_depth`
    /// - a bucket is referenced by exactly the `2^(global - local)` slots
    ///   sharing its low `local_depth` bits
    /// - every key carries its bucket's prefix
    /// - no bucket holds more than `capacity` keys
    pub fn verify_integrity(&self) -> Result<(), Error> {
        let fail = |msg: String| -> Result<(), Error> { Err(Error::Internal(msg)) };

        if self.slots.len() != 1usize << self.global_depth {
            return fail(format!(
                "directory has {} slots at global depth {}",
                self.slots.len(),
                self.global_depth
            ));
        }

        // first referencing slot and reference count per bucket
        let mut refs: Vec<Option<(usize, usize)>> = vec![None; self.buckets.len()];
        for (i, &idx) in self.slots.iter().enumerate() {
            let Some(entry) = refs.get_mut(idx) else {
                return fail(format!("slot {i} points past the bucket arena ({idx})"));
            };
            *entry = match *entry {
                Some((first, count)) => Some((first, count + 1)),
                None => Some((i, 1)),
            };
        }

        let mut total = 0;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            let id = bucket.id();
            let local_depth = bucket.local_depth();
            let Some((first, count)) = refs[idx] else {
                return fail(format!("bucket {id} is not referenced by any slot"));
            };

            if local_depth > self.global_depth {
                return fail(format!(
                    "bucket {id} has local depth {local_depth} above global depth {}",
                    self.global_depth
                ));
            }

            let m = mask(local_depth) as usize;
            let prefix = first & m;
            let expected = 1usize << (self.global_depth - local_depth);
            if count != expected {
                return fail(format!(
                    "bucket {id} is referenced by {count} slots, expected {expected}"
                ));
            }
            if let Some(key) = bucket
                .keys()
                .iter()
                .find(|&&key| key & mask(local_depth) != prefix as u64)
            {
                return fail(format!(
                    "key {key} in bucket {id} does not carry prefix {prefix:b}"
                ));
            }

            if bucket.len() > self.capacity {
                return fail(format!(
                    "bucket {id} holds {} keys, capacity is {}",
                    bucket.len(),
                    self.capacity
                ));
            }

            total += bucket.len();
        }

        // with the counts above, this makes each bucket's slots exactly its prefix class
        for (i, &idx) in self.slots.iter().enumerate() {
            let bucket = &self.buckets[idx];
            let m = mask(bucket.local_depth()) as usize;
            let prefix = refs[idx].map_or(i, |(first, _)| first) & m;
            if i & m != prefix {
                return fail(format!(
                    "slot {i} points to bucket {} outside its prefix {prefix:b}",
                    bucket.id()
                ));
            }
        }

        if total != self.len {
            return fail(format!("counted {total} keys, expected {}", self.len));
        }

        Ok(())
    }
}
