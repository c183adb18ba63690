//! Bounded, durable cache mapping domains to resolved icon URLs.
//!
//! The cache lives entirely in memory and mirrors itself into a single
//! durable key holding one JSON document (domain -> entry). It supports:
//!
//! - Tolerant loading: a missing or corrupt record yields an empty cache
//! - Size-bounded persistence: eviction keeps the newest entries by timestamp
//! - Pluggable storage backends behind the [`Storage`] trait

pub mod storage;
pub mod store;

pub use crate::Error;

pub use storage::{FileStorage, MemoryStorage, Storage};
pub use store::{CacheEntry, IconCache};
