//! Operator command and telemetry surface.
//!
//! The control surface is the piece a host hands to external operators:
//! start/stop/restart the installation, clear the cache, and read
//! telemetry. It holds only a reference to the current [`Session`];
//! session logic lives in the session itself, and a host's plugin
//! load/unload entry points are thin wrappers over [`start`] and [`stop`].
//!
//! [`start`]: ControlSurface::start
//! [`stop`]: ControlSurface::stop

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use favlink_client::Probe;
use favlink_core::{AppConfig, ResourceStats, Storage};

use crate::adapter::DocumentAdapter;
use crate::memory::{MemorySnapshot, inspect_memory};
use crate::processor::RunState;
use crate::session::Session;

/// Read-only telemetry snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    /// Whether a session is currently installed.
    pub session_live: bool,
    /// Entries in the in-memory cache (0 when no session is live).
    pub cache_entries: usize,
    /// Current phase of the processing state machine.
    pub run_state: RunState,
    /// Currently-held resources (all zero when no session is live).
    pub resources: ResourceStats,
    /// Effective configuration.
    pub config: AppConfig,
}

/// External command object layered over the session lifecycle.
pub struct ControlSurface {
    adapter: Arc<dyn DocumentAdapter>,
    config: AppConfig,
    storage: Arc<dyn Storage>,
    probe: Arc<dyn Probe>,
    current: Mutex<Option<Arc<Session>>>,
}

impl ControlSurface {
    pub fn new(
        adapter: Arc<dyn DocumentAdapter>,
        config: AppConfig,
        storage: Arc<dyn Storage>,
        probe: Arc<dyn Probe>,
    ) -> Self {
        Self { adapter, config, storage, probe, current: Mutex::new(None) }
    }

    /// Install a session if none is live. Returns whether a new session
    /// was installed.
    pub async fn start(&self) -> bool {
        let mut current = self.current.lock().await;
        if current.is_some() {
            return false;
        }

        let session = Session::install(
            self.adapter.clone(),
            self.config.clone(),
            self.storage.clone(),
            self.probe.clone(),
        )
        .await;
        *current = Some(session);
        true
    }

    /// Tear down the current session, if any.
    pub async fn stop(&self) {
        let session = self.current.lock().await.take();
        if let Some(session) = session {
            session.teardown().await;
        }
    }

    /// Tear down the current session (if any) and install a fresh one.
    pub async fn restart(&self) {
        let mut current = self.current.lock().await;
        if let Some(session) = current.take() {
            session.teardown().await;
        }

        let session = Session::install(
            self.adapter.clone(),
            self.config.clone(),
            self.storage.clone(),
            self.probe.clone(),
        )
        .await;
        *current = Some(session);
        tracing::info!("favlink session restarted");
    }

    /// Clear cached icons everywhere and reprocess the document.
    ///
    /// Without a live session only the durable record is removed.
    pub async fn clear_cache(&self) {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(session) => session.clear_cache().await,
            None => {
                if let Err(e) = self.storage.remove().await {
                    tracing::warn!(error = %e, "failed to remove durable cache record");
                }
            }
        }
    }

    /// Read-only snapshot of cache, state machine, and held resources.
    pub async fn stats(&self) -> Stats {
        let current = self.current.lock().await;
        match current.as_ref() {
            Some(session) => Stats {
                session_live: true,
                cache_entries: session.cache_entries().await,
                run_state: session.run_state(),
                resources: session.resources(),
                config: self.config.clone(),
            },
            None => Stats {
                session_live: false,
                cache_entries: 0,
                run_state: RunState::Idle,
                resources: ResourceStats::default(),
                config: self.config.clone(),
            },
        }
    }

    /// Best-effort host memory snapshot; never fails.
    pub fn inspect_memory(&self) -> MemorySnapshot {
        inspect_memory()
    }
}
