//! In-memory query cache shared by every view.
//!
//! Reads are keyed by [`QueryKey`]. The cache:
//! - Serves loaded values until they go stale
//! - Shares one request between concurrent readers of a key
//! - Applies only the newest response per key
//! - Refetches keys with mounted consumers after a mutation invalidates them

mod layer;
mod storage;
#[cfg(test)]
pub mod testing;
mod traits;

pub use layer::{QueryCache, Subscription};
pub use storage::Snapshot;
pub use traits::{CacheEvent, CachedValue, Cacheable, QueryKey, QueryState, Transition};
