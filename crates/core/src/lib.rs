//! Core types and shared functionality for favlink.
//!
//! This crate provides:
//! - Bounded, durable icon cache with pluggable storage
//! - Error types for the cache layer
//! - Configuration structures
//! - Resource accounting for session lifecycles

pub mod cache;
pub mod config;
pub mod error;
pub mod registry;

pub use cache::{CacheEntry, FileStorage, IconCache, MemoryStorage, Storage};
pub use config::AppConfig;
pub use error::Error;
pub use registry::{ResourceRegistry, ResourceStats};
