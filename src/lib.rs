//! Extendible hashing over integer keys.
//!
//! A directory of `2^global_depth` slots routes every key by its low-order
//! bits to a fixed-capacity bucket. Several slots may alias one bucket; a
//! bucket's local depth says how many low bits its keys share.
//!
//! - Overflow splits the bucket by one more bit, doubling the directory first
//!   when the bucket already uses every address bit, then retries
//! - Deletes merge a bucket with its buddy when both fit in one bucket,
//!   cascading upwards, and halve the directory when its halves mirror
//! - Optional event journal for visualising each step
//!
//! ```
//! use extendible::ExtendibleHash;
//!
//! let mut index = ExtendibleHash::with_capacity(2).unwrap();
//! for key in [0, 1, 2, 5, 4, 12, 8, 28, 13] {
//!     index.insert(key).unwrap();
//! }
//! assert_eq!(index.global_depth(), 4);
//! assert!(index.contains(28));
//! assert!(index.delete(28).unwrap().is_found());
//! ```

pub mod bucket;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;
pub mod iter;
pub mod table;

#[cfg(test)]
mod proptests;

pub use bucket::{Bucket, BucketId};
pub use config::Config;
pub use error::Error;
pub use event::Event;
pub use iter::SlotView;
pub use table::{Deletion, ExtendibleHash};
