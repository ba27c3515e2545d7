//! Fixed-capacity bucket of keys sharing a low-order address prefix.
//!
//! - Keys stored inline in insertion order (order is only kept for display)
//! - Duplicates allowed, the bucket is a multiset
//! - Local depth: number of low bits every stored key agrees on
//! - Split partitions by the bit at `local_depth - 1` after incrementing

use std::fmt;

/// Largest depth a `u64` key can be addressed with
pub const KEY_BITS: u8 = u64::BITS as u8;

/// Keep the low `depth` bits of a key
#[inline]
pub const fn mask(depth: u8) -> u64 {
    if depth == 0 {
        0
    } else if depth >= KEY_BITS {
        u64::MAX
    } else {
        (1u64 << depth) - 1
    }
}

/// Stable, user-facing bucket name
///
/// Assigned in creation order and rendered as spreadsheet-style letters:
/// `A`, `B`, ..., `Z`, `AA`, `AB`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketId(u32);

impl BucketId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // bijective base-26
        let mut n = u64::from(self.0) + 1;
        let mut letters = Vec::new();
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        f.write_str(&String::from_utf8_lossy(&letters))
    }
}

/// Bucket holding up to `capacity` keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    id: BucketId,

    /// Number of low-order bits shared by every stored key
    local_depth: u8,

    capacity: usize,

    keys: Vec<u64>,
}

impl Bucket {
    /// Create an empty bucket
    pub fn new(id: BucketId, local_depth: u8, capacity: usize) -> Self {
        Self {
            id,
            local_depth,
            capacity,
            keys: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn id(&self) -> BucketId {
        self.id
    }

    #[inline]
    pub fn local_depth(&self) -> u8 {
        self.local_depth
    }

    #[inline]
    pub fn set_local_depth(&mut self, depth: u8) {
        self.local_depth = depth;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.keys.len() >= self.capacity
    }

    /// Stored keys in insertion order
    #[inline]
    pub fn keys(&self) -> &[u64] {
        &self.keys
    }

    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.keys.contains(&key)
    }

    /// Multiplicity of `key` in this bucket
    pub fn count(&self, key: u64) -> usize {
        self.keys.iter().filter(|&&k| k == key).count()
    }

    /// Append a key
    ///
    /// Returns `Err(key)` if the bucket is full (caller should split and retry)
    pub fn insert(&mut self, key: u64) -> Result<(), u64> {
        if self.is_full() {
            return Err(key);
        }
        self.keys.push(key);
        Ok(())
    }

    /// Remove the first occurrence of `key`, returns whether it was present
    pub fn remove(&mut self, key: u64) -> bool {
        match self.keys.iter().position(|&k| k == key) {
            Some(pos) => {
                self.keys.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Split this bucket, creating a sibling named `sibling_id`
    ///
    /// Both buckets end up with `local_depth + 1`. Keys whose bit
    /// `new_depth - 1` is set move to the sibling, the rest stay. The
    /// sibling may come out empty when every key shares that bit.
    pub fn split(&mut self, sibling_id: BucketId) -> Bucket {
        debug_assert!(self.local_depth < KEY_BITS);

        self.local_depth += 1;
        let bit = 1u64 << (self.local_depth - 1);

        let mut sibling = Bucket::new(sibling_id, self.local_depth, self.capacity);
        let (moved, kept): (Vec<u64>, Vec<u64>) =
            self.keys.iter().partition(|&&key| key & bit != 0);

        self.keys = kept;
        sibling.keys = moved;
        sibling
    }

    /// Take over all keys of a buddy bucket
    pub fn absorb(&mut self, other: Bucket) {
        debug_assert!(self.keys.len() + other.keys.len() <= self.capacity);
        self.keys.extend(other.keys);
    }

    /// Smallest local depth at which `key` would fit next to the keys that
    /// still share its low bits
    ///
    /// This is the depth the insert split loop converges to. `None` means no
    /// number of splits helps, because `key` already fills the bucket.
    pub fn required_depth(&self, key: u64) -> Option<u8> {
        (self.local_depth..=KEY_BITS).find(|&depth| {
            let m = mask(depth);
            let sharing = self.keys.iter().filter(|&&k| (k ^ key) & m == 0).count();
            sharing < self.capacity
        })
    }
}
