//! Iterators for `ExtendibleHash`

use std::collections::HashSet;

use crate::bucket::{Bucket, BucketId};
use crate::directory::Directory;

/// One directory slot as a renderer sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView<'a> {
    /// Position in the directory
    pub index: usize,

    /// Bucket the slot references; equal ids mean aliased slots
    pub bucket: BucketId,

    pub local_depth: u8,

    /// Bucket contents in insertion order
    pub keys: &'a [u64],
}

/// An iterator over the slots of an `ExtendibleHash`, in index order
pub struct Slots<'a> {
    directory: &'a Directory,
    next: usize,
}

impl<'a> Slots<'a> {
    pub(crate) fn new(directory: &'a Directory) -> Self {
        Self { directory, next: 0 }
    }
}

impl<'a> Iterator for Slots<'a> {
    type Item = SlotView<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next;
        let &bucket_idx = self.directory.slots().get(index)?;
        self.next += 1;

        let bucket = self.directory.bucket_at(bucket_idx);
        Some(SlotView {
            index,
            bucket: bucket.id(),
            local_depth: bucket.local_depth(),
            keys: bucket.keys(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.directory.slots().len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Slots<'_> {}

/// An iterator over distinct buckets, ordered by their first referencing slot
pub struct Buckets<'a> {
    slots: Slots<'a>,
    seen: HashSet<BucketId>,
}

impl<'a> Buckets<'a> {
    pub(crate) fn new(directory: &'a Directory) -> Self {
        Self {
            slots: Slots::new(directory),
            seen: HashSet::with_capacity(directory.bucket_count()),
        }
    }
}

impl<'a> Iterator for Buckets<'a> {
    type Item = &'a Bucket;

    fn next(&mut self) -> Option<Self::Item> {
        let directory = self.slots.directory;
        loop {
            let index = self.slots.next;
            let &bucket_idx = directory.slots().get(index)?;
            self.slots.next += 1;

            let bucket = directory.bucket_at(bucket_idx);
            if self.seen.insert(bucket.id()) {
                return Some(bucket);
            }
        }
    }
}

/// An iterator over every stored key, bucket by bucket
pub struct Keys<'a> {
    buckets: Buckets<'a>,
    current: std::slice::Iter<'a, u64>,
}

impl<'a> Keys<'a> {
    pub(crate) fn new(directory: &'a Directory) -> Self {
        Self {
            buckets: Buckets::new(directory),
            current: (&[] as &[u64]).iter(),
        }
    }
}

impl Iterator for Keys<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&key) = self.current.next() {
                return Some(key);
            }
            self.current = self.buckets.next()?.keys().iter();
        }
    }
}
