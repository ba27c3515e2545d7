use std::fmt;

use log::info;

use crate::config::Config;
use crate::directory::Directory;
use crate::error::Error;
use crate::event::Event;
use crate::iter::{Buckets, Keys, Slots};

/// Outcome of [`ExtendibleHash::delete`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    /// One copy of the key was removed
    Found,

    /// The key was not stored, nothing changed
    NotFound,
}

impl Deletion {
    #[inline]
    pub fn is_found(self) -> bool {
        self == Deletion::Found
    }
}

/// An extendible hash index over integer keys
///
/// Keys are routed by their own low-order bits (identity hash). Buckets hold
/// a fixed number of keys; an overflowing bucket splits, doubling the
/// directory when it has run out of address bits, and deletes fold buddy
/// buckets back together and halve the directory once its upper half is a
/// mirror of the lower half.
///
/// The index is a multiset: inserting a stored key stores it again.
pub struct ExtendibleHash {
    directory: Directory,
    config: Config,
}

impl ExtendibleHash {
    /// Create an empty index with the default configuration
    #[inline]
    pub fn new() -> Self {
        let config = Config::default();
        Self {
            directory: Directory::new(&config),
            config,
        }
    }

    /// Create an empty index storing `capacity` keys per bucket
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_config(Config::new(capacity))
    }

    /// Create an empty index with provided config
    pub fn with_config(config: Config) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            directory: Directory::new(&config),
            config,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the number of stored keys, counting duplicates
    #[inline]
    pub fn len(&self) -> usize {
        self.directory.len()
    }

    /// Returns `true` if no key is stored
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.directory.is_empty()
    }

    /// Keys per bucket
    #[inline]
    pub fn capacity(&self) -> usize {
        self.directory.capacity()
    }

    /// Returns the global depth of the directory
    #[inline]
    pub fn global_depth(&self) -> u8 {
        self.directory.global_depth()
    }

    /// Returns the number of distinct buckets
    #[inline]
    pub fn bucket_count(&self) -> usize {
        self.directory.bucket_count()
    }

    /// Discard everything and start over with a new bucket capacity
    ///
    /// On an invalid capacity the index is left untouched.
    pub fn configure(&mut self, capacity: usize) -> Result<(), Error> {
        let config = Config {
            bucket_capacity: capacity,
            ..self.config
        };
        config.validate()?;

        info!(
            "Reconfigured to {} keys per bucket, discarding {} keys",
            capacity,
            self.len()
        );
        self.config = config;
        self.directory.replace(Directory::new(&config));
        self.directory.emit(|| Event::Configured { capacity });
        Ok(())
    }

    /// Change the bucket capacity, keeping every stored key
    ///
    /// Keys are re-inserted into a fresh directory in slot order. If any of
    /// them cannot be placed under the new capacity, the index is unchanged.
    pub fn rebuild_with_capacity(&mut self, capacity: usize) -> Result<(), Error> {
        let config = Config {
            bucket_capacity: capacity,
            ..self.config
        };
        config.validate()?;

        let mut rebuilt = Directory::new(&config.with_events(false));
        for key in self.keys() {
            rebuilt.insert(key)?;
        }
        info!(
            "Rebuilt with {} keys per bucket: {} keys, global depth {}",
            capacity,
            rebuilt.len(),
            rebuilt.global_depth()
        );
        self.config = config;
        self.directory.replace(rebuilt);
        self.directory.emit(|| Event::Configured { capacity });
        Ok(())
    }

    /// Insert a key
    ///
    /// Duplicates are stored again. Fails, leaving the index unchanged, if
    /// the key is already stored `capacity` times or if placing it would push
    /// the global depth past `max_global_depth`.
    #[inline]
    pub fn insert(&mut self, key: u64) -> Result<(), Error> {
        self.directory.insert(key)
    }

    /// Remove one copy of a key
    #[inline]
    pub fn delete(&mut self, key: u64) -> Result<Deletion, Error> {
        if self.directory.remove(key)? {
            Ok(Deletion::Found)
        } else {
            Ok(Deletion::NotFound)
        }
    }

    /// Reset to a single empty bucket at global depth 0
    ///
    /// Bucket naming restarts as well, so the next inserts behave exactly
    /// like on a fresh index.
    pub fn clear(&mut self) {
        info!("Cleared {} keys", self.len());
        self.directory.replace(Directory::new(&self.config));
        self.directory.emit(|| Event::Cleared);
    }

    /// Return `true` if the key is stored at least once
    #[inline]
    pub fn contains(&self, key: u64) -> bool {
        self.directory.contains(key)
    }

    /// Number of stored copies of `key`
    #[inline]
    pub fn count(&self, key: u64) -> usize {
        self.directory.count(key)
    }

    /// Directory slots in index order
    pub fn slots(&self) -> Slots<'_> {
        Slots::new(&self.directory)
    }

    /// Distinct buckets, ordered by their first referencing slot
    pub fn buckets(&self) -> Buckets<'_> {
        Buckets::new(&self.directory)
    }

    /// Every stored key, bucket by bucket
    pub fn keys(&self) -> Keys<'_> {
        Keys::new(&self.directory)
    }

    /// Check the directory invariants, reporting the first violation
    pub fn verify_integrity(&self) -> Result<(), Error> {
        self.directory.verify_integrity()
    }

    /// Drain the events recorded since the last call
    ///
    /// Always empty unless `Config::record_events` is set.
    pub fn take_events(&mut self) -> Vec<Event> {
        self.directory.take_events()
    }
}

impl Default for ExtendibleHash {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExtendibleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let global_depth = self.global_depth();
        let width = usize::from(global_depth.max(1));

        writeln!(f, "Directory (Global Depth: {global_depth}):")?;
        for slot in self.slots() {
            let keys: Vec<String> = slot.keys.iter().map(u64::to_string).collect();
            writeln!(
                f,
                "Index {:0width$b}: Bucket {}, Local Depth {}, Data: [{}]",
                slot.index,
                slot.bucket,
                slot.local_depth,
                keys.join(", "),
            )?;
        }
        Ok(())
    }
}

impl fmt::Debug for ExtendibleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendibleHash")
            .field("config", &self.config)
            .field("global_depth", &self.global_depth())
            .field("len", &self.len())
            .field("bucket_count", &self.bucket_count())
            .finish()
    }
}
