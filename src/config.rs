//! Configuration for an extendible hash directory.

use crate::error::Error;

/// Smallest bucket capacity that guarantees splits eventually make progress
pub const MIN_BUCKET_CAPACITY: usize = 2;

/// Default bound on the directory size (`2^24` slots, 128 MiB on 64-bit targets)
pub const DEFAULT_MAX_GLOBAL_DEPTH: u8 = 24;

/// Settings fixed for the lifetime of one directory configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of keys per bucket
    pub bucket_capacity: usize,

    /// Inserts that would grow the directory past this depth are rejected
    pub max_global_depth: u8,

    /// Keep a journal of state-change events for a presentation layer
    pub record_events: bool,
}

impl Config {
    /// Create a config with the given bucket capacity and default limits
    pub fn new(bucket_capacity: usize) -> Self {
        Self {
            bucket_capacity,
            ..Self::default()
        }
    }

    pub fn with_max_global_depth(mut self, max_global_depth: u8) -> Self {
        self.max_global_depth = max_global_depth;
        self
    }

    pub fn with_events(mut self, record_events: bool) -> Self {
        self.record_events = record_events;
        self
    }

    /// Check that the settings describe a directory that can always terminate
    pub fn validate(&self) -> Result<(), Error> {
        if self.bucket_capacity < MIN_BUCKET_CAPACITY {
            return Err(Error::InvalidConfiguration {
                capacity: self.bucket_capacity,
            });
        }

        // slot indices are usize, so the directory length must fit
        if self.max_global_depth == 0 || u32::from(self.max_global_depth) >= usize::BITS {
            return Err(Error::InvalidDepthLimit {
                max_global_depth: self.max_global_depth,
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bucket_capacity: MIN_BUCKET_CAPACITY,
            max_global_depth: DEFAULT_MAX_GLOBAL_DEPTH,
            record_events: false,
        }
    }
}
