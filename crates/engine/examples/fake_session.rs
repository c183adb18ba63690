//! Runs a full session against the in-memory document.
//!
//! Stands in for a host's plugin load/unload entry points: install via the
//! control surface, let the pipeline resolve a few links, print telemetry,
//! and tear down. Logging goes to stderr.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use favlink_client::HttpProbe;
use favlink_core::{AppConfig, FileStorage};
use favlink_engine::{ControlSurface, FakeDocument};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load().expect("configuration invalid");
    let storage = Arc::new(FileStorage::new(config.cache_path.clone()));
    let probe = Arc::new(HttpProbe::new(&config.user_agent).expect("http client"));

    let document = Arc::new(FakeDocument::new());
    document.add_link_silent("https://www.rust-lang.org/learn");
    document.add_link_silent("https://docs.rs/tokio");
    document.add_link_silent("example.com");

    let surface = ControlSurface::new(document.clone(), config, storage, probe);
    surface.start().await;

    // Let the debounced run and the fetches finish.
    tokio::time::sleep(std::time::Duration::from_secs(10)).await;

    let stats = surface.stats().await;
    println!("stats: {}", serde_json::to_string_pretty(&stats).expect("stats serialize"));
    println!("memory: {}", serde_json::to_string(&surface.inspect_memory()).expect("memory serialize"));
    println!("icons rendered: {}", document.rendered_icon_count());

    surface.stop().await;
    println!("resources after stop: {:?}", surface.stats().await.resources);
}
