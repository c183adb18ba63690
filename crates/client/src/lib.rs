//! Network-facing code for favlink.
//!
//! This crate provides the domain resolver and the multi-source icon
//! fetcher used by the processing pipeline.

pub mod fetch;
pub mod resolve;

pub use fetch::{FetchError, HttpProbe, IconFetcher, IconFetcherConfig, Probe, ProbeError, source_urls};
pub use resolve::{DomainError, resolve_domain};
