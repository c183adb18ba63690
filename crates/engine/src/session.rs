//! Session lifecycle: atomic install, idempotent teardown.
//!
//! A [`Session`] owns every side effect one installation creates: the
//! mutation observer, the edit listeners, the coordinator task and its
//! pipeline tasks, the injected stylesheet, and the replacement icons it
//! swapped in. It is an explicit value held by the caller; nothing here
//! assumes a process-wide singleton, and any live session can be torn
//! down independently.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio::task::{JoinHandle, JoinSet};

use favlink_client::{IconFetcher, IconFetcherConfig, Probe};
use favlink_core::registry::ResourceGuard;
use favlink_core::{AppConfig, IconCache, ResourceRegistry, ResourceStats, Storage};

use crate::adapter::{DocumentAdapter, DocumentEvent, EventKind, ListenerId, NodeId, ObserverId};
use crate::assets;
use crate::processor::{PipelineCtx, RunState, StateCell, coordinator};

/// One active installation and everything it owns.
pub struct Session {
    adapter: Arc<dyn DocumentAdapter>,
    config: Arc<AppConfig>,
    cache: Arc<Mutex<IconCache>>,
    registry: Arc<ResourceRegistry>,
    state: Arc<StateCell>,
    trigger: UnboundedSender<DocumentEvent>,
    coordinator: StdMutex<Option<JoinHandle<()>>>,
    tasks: Arc<Mutex<JoinSet<()>>>,
    observer: StdMutex<Option<(ObserverId, ResourceGuard)>>,
    listeners: StdMutex<Vec<(ListenerId, ResourceGuard)>>,
    stylesheet: StdMutex<Option<NodeId>>,
    /// Replacement icons this session swapped in.
    swapped: Arc<StdMutex<Vec<NodeId>>>,
    torn_down: AtomicBool,
}

impl Session {
    /// Install a fresh session: load the cache, inject the stylesheet,
    /// wire the observer and edit listeners, start the coordinator, and
    /// kick off one initial processing run.
    pub async fn install(
        adapter: Arc<dyn DocumentAdapter>,
        config: AppConfig,
        storage: Arc<dyn Storage>,
        probe: Arc<dyn Probe>,
    ) -> Arc<Self> {
        let config = Arc::new(config);
        let registry = ResourceRegistry::new();
        let cache = Arc::new(Mutex::new(IconCache::load(storage, config.max_cache_entries).await));
        let fetcher = Arc::new(IconFetcher::new(probe, IconFetcherConfig::from(&*config), registry.clone()));

        // Stylesheet first, so visual states exist before the first run.
        let stylesheet = adapter.inject_stylesheet(assets::STYLESHEET);

        let (trigger, events) = unbounded_channel();

        let observer = (adapter.observe_mutations(trigger.clone()), registry.observer());
        let listeners = [EventKind::Paste, EventKind::Input, EventKind::Drop]
            .into_iter()
            .map(|kind| (adapter.add_listener(kind, trigger.clone()), registry.listener()))
            .collect();

        let state = Arc::new(StateCell::new());
        let tasks = Arc::new(Mutex::new(JoinSet::new()));
        let swapped = Arc::new(StdMutex::new(Vec::new()));

        let ctx = PipelineCtx {
            adapter: adapter.clone(),
            cache: cache.clone(),
            fetcher,
            registry: registry.clone(),
            injected: swapped.clone(),
            tasks: tasks.clone(),
            config: config.clone(),
            state: state.clone(),
        };
        let handle = tokio::spawn(coordinator(events, ctx));

        // Initial run over links already present in the document.
        let _ = trigger.send(DocumentEvent::MutationAdded { element_nodes: true });

        tracing::info!("favlink session installed");

        Arc::new(Self {
            adapter,
            config,
            cache,
            registry,
            state,
            trigger,
            coordinator: StdMutex::new(Some(handle)),
            tasks,
            observer: StdMutex::new(Some(observer)),
            listeners: StdMutex::new(listeners),
            stylesheet: StdMutex::new(Some(stylesheet)),
            swapped,
            torn_down: AtomicBool::new(false),
        })
    }

    /// Release everything this session owns. Safe to call repeatedly;
    /// later calls are no-ops.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }

        let observer = self.observer.lock().expect("observer lock poisoned").take();
        if let Some((id, guard)) = observer {
            self.adapter.disconnect_observer(id);
            drop(guard);
        }

        let listeners: Vec<_> = self
            .listeners
            .lock()
            .expect("listener lock poisoned")
            .drain(..)
            .collect();
        for (id, guard) in listeners {
            self.adapter.remove_listener(id);
            drop(guard);
        }

        let handle = self.coordinator.lock().expect("coordinator lock poisoned").take();
        if let Some(handle) = handle {
            handle.abort();
            let _ = handle.await;
        }

        // Abort and await pipeline tasks: dropped futures release their
        // timer/image guards, so a network response arriving later cannot
        // touch this session or a dangling node.
        self.tasks.lock().await.shutdown().await;

        let mut nodes: Vec<NodeId> = self
            .swapped
            .lock()
            .expect("swapped lock poisoned")
            .drain(..)
            .collect();
        if let Some(style) = self.stylesheet.lock().expect("stylesheet lock poisoned").take() {
            nodes.push(style);
        }
        for node in nodes {
            self.adapter.remove_node(node);
        }

        tracing::info!("favlink session torn down");
    }

    /// Empty the cache (memory and durable), strip every rendered icon,
    /// clear all processed markers, and trigger a fresh run.
    pub async fn clear_cache(&self) {
        {
            let mut cache = self.cache.lock().await;
            if let Err(e) = cache.clear().await {
                tracing::warn!(error = %e, "failed to remove durable cache record");
            }
        }

        for node in self.adapter.rendered_icons() {
            self.adapter.remove_node(node);
        }
        self.swapped.lock().expect("swapped lock poisoned").clear();
        self.adapter.clear_processed();

        tracing::info!("icon cache cleared, reprocessing");
        self.trigger_run();
    }

    /// Queue a processing run, as a document mutation would.
    pub fn trigger_run(&self) {
        let _ = self.trigger.send(DocumentEvent::MutationAdded { element_nodes: true });
    }

    pub fn resources(&self) -> ResourceStats {
        self.registry.snapshot()
    }

    pub fn run_state(&self) -> RunState {
        self.state.get()
    }

    pub async fn cache_entries(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}
