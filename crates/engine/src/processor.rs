//! Debounced, batched processing of newly-appeared links.
//!
//! One coordinator task per session drives an explicit state machine:
//!
//! - **Idle** -> a trigger arrives -> **Pending**, debounce deadline armed;
//!   every further trigger pushes the deadline (trailing edge).
//! - **Pending** -> deadline fires -> **Running**: unprocessed links are
//!   chunked into batches processed strictly in sequence, links within a
//!   batch unordered-concurrent, with a fixed pause between batches.
//! - **Running** -> all batches complete -> **Idle**.
//!
//! The per-link pipeline is idempotent: the processed marker is taken
//! atomically before any suspension point, so overlapping triggers cannot
//! double-process a link. No error escapes the coordinator.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, sleep_until};

use favlink_client::{IconFetcher, resolve_domain};
use favlink_core::{AppConfig, Error, IconCache, ResourceRegistry};

use crate::adapter::{DocumentAdapter, DocumentEvent, LinkId, NodeId};
use crate::assets::FALLBACK_ICON;

/// Phase of the processing state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle = 0,
    Pending = 1,
    Running = 2,
}

/// Lock-free cell holding the current [`RunState`].
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, state: RunState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    pub fn get(&self) -> RunState {
        match self.0.load(Ordering::SeqCst) {
            1 => RunState::Pending,
            2 => RunState::Running,
            _ => RunState::Idle,
        }
    }
}

/// Outcome of one processing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Size of each batch, in execution order.
    pub batches: Vec<usize>,
    /// Total links driven through the pipeline.
    pub processed: usize,
}

/// Shared collaborators of one session's pipeline.
#[derive(Clone)]
pub(crate) struct PipelineCtx {
    pub adapter: Arc<dyn DocumentAdapter>,
    pub cache: Arc<Mutex<IconCache>>,
    pub fetcher: Arc<IconFetcher>,
    pub registry: Arc<ResourceRegistry>,
    /// Nodes this session injected, removed at teardown.
    pub injected: Arc<StdMutex<Vec<NodeId>>>,
    /// Session-owned pipeline tasks; teardown aborts and awaits them.
    pub tasks: Arc<Mutex<JoinSet<()>>>,
    pub config: Arc<AppConfig>,
    pub state: Arc<StateCell>,
}

/// Coordinator loop: debounce triggers, then drive a run.
///
/// Exits when the event channel closes or the owning session aborts it.
pub(crate) async fn coordinator(mut events: UnboundedReceiver<DocumentEvent>, ctx: PipelineCtx) {
    loop {
        // Idle: wait for the first trigger.
        let Some(event) = events.recv().await else { break };
        if !event.is_trigger() {
            continue;
        }

        ctx.state.set(RunState::Pending);

        // Pending: trailing-edge debounce. Each new trigger pushes the
        // deadline; non-trigger events never re-arm.
        let mut deadline = Instant::now() + ctx.config.debounce();
        let channel_open = loop {
            let _timer = ctx.registry.timer();
            tokio::select! {
                _ = sleep_until(deadline) => break true,
                event = events.recv() => match event {
                    Some(e) if e.is_trigger() => {
                        deadline = Instant::now() + ctx.config.debounce();
                    }
                    Some(_) => {}
                    None => break false,
                },
            }
        };

        if !channel_open {
            ctx.state.set(RunState::Idle);
            break;
        }

        ctx.state.set(RunState::Running);
        let report = run_links(&ctx).await;
        tracing::debug!(
            processed = report.processed,
            batches = ?report.batches,
            "processing run complete"
        );
        ctx.state.set(RunState::Idle);
    }
}

/// Select unprocessed links and process them in rate-limited batches.
pub(crate) async fn run_links(ctx: &PipelineCtx) -> RunReport {
    let links = ctx.adapter.unprocessed_links();
    tracing::debug!(count = links.len(), "selected unprocessed links");

    let mut report = RunReport::default();

    for (index, batch) in links.chunks(ctx.config.batch_size).enumerate() {
        if index > 0 {
            let _timer = ctx.registry.timer();
            sleep(ctx.config.batch_pause()).await;
        }

        let mut tasks = ctx.tasks.lock().await;
        for &link in batch {
            let ctx = ctx.clone();
            tasks.spawn(async move { process_link(ctx, link).await });
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined
                && !e.is_cancelled()
            {
                tracing::warn!(error = %e, "link task panicked");
            }
        }
        drop(tasks);

        report.batches.push(batch.len());
        report.processed += batch.len();
    }

    report
}

/// Clears the loading visual on every exit path, cancellation included.
struct LoadingGuard {
    adapter: Arc<dyn DocumentAdapter>,
    link: LinkId,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.adapter.set_loading(self.link, false);
    }
}

/// Drive one link through resolve -> cache -> fetch -> swap.
pub(crate) async fn process_link(ctx: PipelineCtx, link: LinkId) {
    // The marker is the sole guard against overlapping runs; take it
    // before the first suspension point.
    if !ctx.adapter.try_mark_processed(link) {
        return;
    }

    ctx.adapter.set_loading(link, true);
    let _loading = LoadingGuard { adapter: ctx.adapter.clone(), link };

    if let Err(e) = link_pipeline(&ctx, link).await {
        let target = ctx.adapter.link_target(link).unwrap_or_default();
        tracing::warn!(target = %target, error = %e, "link processing failed");
    }
}

async fn link_pipeline(ctx: &PipelineCtx, link: LinkId) -> Result<(), Error> {
    let Some(target) = ctx.adapter.link_target(link) else {
        return Ok(());
    };

    let domain = match resolve_domain(&target) {
        Ok(domain) => domain,
        Err(e) => {
            tracing::debug!(target = %target, error = %e, "skipping unresolvable link target");
            return Ok(());
        }
    };

    let cached = ctx.cache.lock().await.get(&domain).map(|entry| entry.url.clone());

    let icon_url = match cached {
        Some(url) => Some(url),
        None => match ctx.fetcher.fetch_icon(&domain).await {
            Ok(url) => {
                let mut cache = ctx.cache.lock().await;
                cache.put(&domain, &url, Utc::now().timestamp_millis());
                if let Err(e) = cache.persist().await {
                    // Non-fatal: the entry stays usable in memory and is
                    // written on the next successful persist.
                    tracing::warn!(domain = %domain, error = %e, "cache persist failed");
                }
                Some(url)
            }
            Err(e) => {
                tracing::debug!(domain = %domain, error = %e, "no icon resolved, using fallback");
                None
            }
        },
    };

    let (url, fallback) = match icon_url.as_deref() {
        Some(url) => (url, false),
        None => (FALLBACK_ICON, true),
    };

    let loaded = {
        let _image = ctx.registry.image();
        ctx.adapter.load_image(url).await
    };

    let (url, fallback) = if loaded { (url, fallback) } else { (FALLBACK_ICON, true) };

    if let Some(node) = ctx.adapter.swap_icon(link, url, fallback) {
        ctx.injected.lock().expect("injected lock poisoned").push(node);
    }

    Ok(())
}
