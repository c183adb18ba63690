//! In-memory document for tests and host-less operation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use super::{DocumentAdapter, DocumentEvent, EventKind, LinkId, ListenerId, NodeId, ObserverId};

#[derive(Debug)]
struct LinkState {
    target: String,
    processed: bool,
    loading: bool,
    icon: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Injected {
    Stylesheet,
    Icon(LinkId),
}

#[derive(Default)]
struct Inner {
    links: BTreeMap<LinkId, LinkState>,
    injected: HashMap<NodeId, Injected>,
    observers: HashMap<ObserverId, UnboundedSender<DocumentEvent>>,
    listeners: HashMap<ListenerId, (EventKind, UnboundedSender<DocumentEvent>)>,
    next_id: u64,
}

impl Inner {
    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Scriptable in-memory [`DocumentAdapter`].
///
/// Tracks counters for swaps and image loads so tests can assert on
/// pipeline behavior, and lets tests script image-load outcomes.
#[derive(Default)]
pub struct FakeDocument {
    inner: Mutex<Inner>,
    swaps: AtomicUsize,
    fallback_swaps: AtomicUsize,
    image_loads: AtomicUsize,
    loads_in_flight: AtomicUsize,
    loads_high_water: AtomicUsize,
    fail_image_loads: AtomicBool,
    image_load_delay_ms: AtomicUsize,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("fake document lock poisoned")
    }

    /// Add a link element and notify mutation observers, as a host tree
    /// would when an element node appears.
    pub fn add_link(&self, target: &str) -> LinkId {
        let link = {
            let mut inner = self.lock();
            let link = LinkId(inner.next());
            inner.links.insert(
                link,
                LinkState { target: target.to_string(), processed: false, loading: false, icon: None },
            );
            link
        };
        self.emit_mutation(true);
        link
    }

    /// Add a link without emitting a mutation event.
    pub fn add_link_silent(&self, target: &str) -> LinkId {
        let mut inner = self.lock();
        let link = LinkId(inner.next());
        inner.links.insert(
            link,
            LinkState { target: target.to_string(), processed: false, loading: false, icon: None },
        );
        link
    }

    /// Deliver a mutation event to every observer.
    pub fn emit_mutation(&self, element_nodes: bool) {
        let observers: Vec<_> = self.lock().observers.values().cloned().collect();
        for tx in observers {
            let _ = tx.send(DocumentEvent::MutationAdded { element_nodes });
        }
    }

    /// Deliver an edit event to every listener registered for `kind`.
    pub fn emit_edit(&self, kind: EventKind, in_editable: bool) {
        let listeners: Vec<_> = self
            .lock()
            .listeners
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, tx)| tx.clone())
            .collect();
        for tx in listeners {
            let _ = tx.send(DocumentEvent::Edit { kind, in_editable });
        }
    }

    /// Script every subsequent image load to fail.
    pub fn fail_image_loads(&self, fail: bool) {
        self.fail_image_loads.store(fail, Ordering::SeqCst);
    }

    /// Script a delay on every subsequent image load.
    pub fn set_image_load_delay(&self, delay: Duration) {
        self.image_load_delay_ms.store(delay.as_millis() as usize, Ordering::SeqCst);
    }

    pub fn swap_count(&self) -> usize {
        self.swaps.load(Ordering::SeqCst)
    }

    /// Swaps that rendered the degraded fallback asset.
    pub fn fallback_swap_count(&self) -> usize {
        self.fallback_swaps.load(Ordering::SeqCst)
    }

    pub fn image_load_count(&self) -> usize {
        self.image_loads.load(Ordering::SeqCst)
    }

    /// Highest number of image loads observed in flight at once.
    pub fn load_high_water(&self) -> usize {
        self.loads_high_water.load(Ordering::SeqCst)
    }

    pub fn processed_count(&self) -> usize {
        self.lock().links.values().filter(|l| l.processed).count()
    }

    pub fn rendered_icon_count(&self) -> usize {
        self.lock()
            .injected
            .values()
            .filter(|kind| matches!(kind, Injected::Icon(_)))
            .count()
    }

    pub fn stylesheet_count(&self) -> usize {
        self.lock()
            .injected
            .values()
            .filter(|kind| matches!(kind, Injected::Stylesheet))
            .count()
    }

    pub fn is_loading(&self, link: LinkId) -> bool {
        self.lock().links.get(&link).map(|l| l.loading).unwrap_or(false)
    }

    pub fn icon_of(&self, link: LinkId) -> Option<NodeId> {
        self.lock().links.get(&link).and_then(|l| l.icon)
    }

    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

#[async_trait]
impl DocumentAdapter for FakeDocument {
    fn unprocessed_links(&self) -> Vec<LinkId> {
        self.lock()
            .links
            .iter()
            .filter(|(_, state)| !state.processed)
            .map(|(id, _)| *id)
            .collect()
    }

    fn link_target(&self, link: LinkId) -> Option<String> {
        self.lock().links.get(&link).map(|state| state.target.clone())
    }

    fn try_mark_processed(&self, link: LinkId) -> bool {
        let mut inner = self.lock();
        match inner.links.get_mut(&link) {
            Some(state) if !state.processed => {
                state.processed = true;
                true
            }
            _ => false,
        }
    }

    fn is_processed(&self, link: LinkId) -> bool {
        self.lock().links.get(&link).map(|l| l.processed).unwrap_or(false)
    }

    fn clear_processed(&self) {
        for state in self.lock().links.values_mut() {
            state.processed = false;
        }
    }

    fn set_loading(&self, link: LinkId, loading: bool) {
        if let Some(state) = self.lock().links.get_mut(&link) {
            state.loading = loading;
        }
    }

    async fn load_image(&self, _url: &str) -> bool {
        self.image_loads.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.loads_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.loads_high_water.fetch_max(in_flight, Ordering::SeqCst);

        let delay = self.image_load_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
        }

        self.loads_in_flight.fetch_sub(1, Ordering::SeqCst);
        !self.fail_image_loads.load(Ordering::SeqCst)
    }

    fn swap_icon(&self, link: LinkId, _url: &str, fallback: bool) -> Option<NodeId> {
        let mut inner = self.lock();
        if !inner.links.contains_key(&link) {
            return None;
        }
        let node = NodeId(inner.next());
        let previous = inner.links.get_mut(&link).and_then(|state| state.icon.take());
        if let Some(previous) = previous {
            inner.injected.remove(&previous);
        }
        if let Some(state) = inner.links.get_mut(&link) {
            state.icon = Some(node);
        }
        inner.injected.insert(node, Injected::Icon(link));
        drop(inner);
        self.swaps.fetch_add(1, Ordering::SeqCst);
        if fallback {
            self.fallback_swaps.fetch_add(1, Ordering::SeqCst);
        }
        Some(node)
    }

    fn rendered_icons(&self) -> Vec<NodeId> {
        self.lock()
            .injected
            .iter()
            .filter(|(_, kind)| matches!(kind, Injected::Icon(_)))
            .map(|(node, _)| *node)
            .collect()
    }

    fn inject_stylesheet(&self, _css: &str) -> NodeId {
        let mut inner = self.lock();
        let node = NodeId(inner.next());
        inner.injected.insert(node, Injected::Stylesheet);
        node
    }

    fn remove_node(&self, node: NodeId) {
        let mut inner = self.lock();
        if let Some(Injected::Icon(link)) = inner.injected.remove(&node)
            && let Some(state) = inner.links.get_mut(&link)
        {
            state.icon = None;
        }
    }

    fn observe_mutations(&self, events: UnboundedSender<DocumentEvent>) -> ObserverId {
        let mut inner = self.lock();
        let id = ObserverId(inner.next());
        inner.observers.insert(id, events);
        id
    }

    fn disconnect_observer(&self, observer: ObserverId) {
        self.lock().observers.remove(&observer);
    }

    fn add_listener(&self, kind: EventKind, events: UnboundedSender<DocumentEvent>) -> ListenerId {
        let mut inner = self.lock();
        let id = ListenerId(inner.next());
        inner.listeners.insert(id, (kind, events));
        id
    }

    fn remove_listener(&self, listener: ListenerId) {
        self.lock().listeners.remove(&listener);
    }
}
