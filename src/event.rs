//! State-change events for presentation layers.
//!
//! The directory never draws anything. When journaling is enabled it records
//! one [`Event`] per observable step, in the order the steps happen, so a
//! renderer can replay an operation frame by frame.

use std::fmt;

use crate::bucket::BucketId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Structure reset to an empty directory with a new bucket capacity
    Configured { capacity: usize },

    /// Structure reset to an empty directory
    Cleared,

    /// Key addressed a directory slot
    Routed {
        key: u64,
        slot: usize,
        bucket: BucketId,
    },

    Stored { key: u64, bucket: BucketId },

    /// Addressed bucket has no room for the key
    BucketFull { bucket: BucketId },

    DirectoryDoubled { global_depth: u8 },

    /// `bucket` split by one more address bit, `moved` went to `sibling`
    BucketSplit {
        bucket: BucketId,
        sibling: BucketId,
        local_depth: u8,
        moved: Vec<u64>,
    },

    /// Directory slots now referencing the new sibling
    PointersRedistributed { sibling: BucketId, slots: Vec<usize> },

    Removed { key: u64, bucket: BucketId },

    NotFound { key: u64 },

    /// `absorbed` was folded into its buddy `into`
    BucketsMerged {
        absorbed: BucketId,
        into: BucketId,
        local_depth: u8,
    },

    DirectoryHalved { global_depth: u8 },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Configured { capacity } => {
                write!(f, "Now storing {capacity} entries per bucket")
            }
            Event::Cleared => f.write_str("Cleared"),
            Event::Routed { key, slot, bucket } => write!(
                f,
                "Inserting element: {key}. Binary {key:b}, slot {slot} -> bucket {bucket}"
            ),
            Event::Stored { key, bucket } => write!(f, "Stored {key} in bucket {bucket}"),
            Event::BucketFull { bucket } => write!(f, "Bucket {bucket} is full"),
            Event::DirectoryDoubled { global_depth } => {
                write!(f, "Double directory... d = {global_depth}")
            }
            Event::BucketSplit {
                bucket,
                sibling,
                local_depth,
                moved,
            } => write!(
                f,
                "Split bucket {bucket} into {bucket} and {sibling} (l = {local_depth}), moved {moved:?}"
            ),
            Event::PointersRedistributed { sibling, slots } => {
                write!(f, "Redistribute pointers... slots {slots:?} -> bucket {sibling}")
            }
            Event::Removed { key, bucket } => write!(f, "Deleting {key} from bucket {bucket}"),
            Event::NotFound { key } => write!(f, "Element {key} not found"),
            Event::BucketsMerged {
                absorbed,
                into,
                local_depth,
            } => write!(
                f,
                "Merge bucket {absorbed} into {into} (l = {local_depth})"
            ),
            Event::DirectoryHalved { global_depth } => {
                write!(f, "Halve directory... d = {global_depth}")
            }
        }
    }
}
