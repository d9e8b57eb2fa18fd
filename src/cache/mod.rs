//! Cache Module
//!
//! Request identities, immutable response snapshots, and the generation
//! storage they live in.

mod disk;
mod entry;
mod stats;
mod storage;

// Re-export public types
pub use disk::DiskCacheStorage;
pub use entry::{is_hop_by_hop, RequestKey, ResponseKind, ResponseSnapshot};
pub use stats::CacheStats;
pub use storage::{CacheStorage, MemoryCacheStorage};
