//! Document adapter: the capability seam between the pipeline and a host.
//!
//! The processing pipeline never touches a real rendering tree. Everything
//! it needs from the host document — querying link elements, toggling the
//! processed marker, swapping nodes, observing mutations — goes through
//! [`DocumentAdapter`], so the whole engine runs unchanged against the
//! in-memory [`FakeDocument`].

pub mod fake;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

pub use fake::FakeDocument;

/// Identifier for a link element owned by the host document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

/// Identifier for a node this system injected into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u64);

/// Handle for a registered subtree-mutation observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub u64);

/// Handle for a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Editing events the processor listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Paste,
    Input,
    Drop,
}

/// A signal delivered from the document to the processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// Subtree mutation. Only mutations that added element nodes matter.
    MutationAdded { element_nodes: bool },
    /// Paste, input, or drop. `in_editable` is true when the event target
    /// sits inside an editable region.
    Edit { kind: EventKind, in_editable: bool },
}

impl DocumentEvent {
    /// Whether this event (re)arms a processing run.
    pub fn is_trigger(&self) -> bool {
        match self {
            DocumentEvent::MutationAdded { element_nodes } => *element_nodes,
            DocumentEvent::Edit { in_editable, .. } => *in_editable,
        }
    }
}

/// Capabilities the pipeline needs from a host document.
///
/// Marker operations must be atomic with respect to concurrent callers:
/// [`try_mark_processed`](DocumentAdapter::try_mark_processed) is the only
/// concurrency guard between overlapping processing runs.
#[async_trait]
pub trait DocumentAdapter: Send + Sync {
    /// Link elements not yet carrying the processed marker, in document order.
    fn unprocessed_links(&self) -> Vec<LinkId>;

    /// The link's target URL, if the element still exists.
    fn link_target(&self, link: LinkId) -> Option<String>;

    /// Atomically set the processed marker. Returns false when the link
    /// was already marked (or no longer exists).
    fn try_mark_processed(&self, link: LinkId) -> bool;

    fn is_processed(&self, link: LinkId) -> bool;

    /// Clear the processed marker on every link.
    fn clear_processed(&self);

    /// Toggle the loading visual state on the link's placeholder glyph.
    fn set_loading(&self, link: LinkId, loading: bool);

    /// Drive an image load for `url`. Resolves true once the image decoded
    /// and false on load failure.
    async fn load_image(&self, url: &str) -> bool;

    /// Replace the link's placeholder glyph with the resolved image.
    /// `fallback` marks the degraded visual state. Returns the injected
    /// node, or `None` when the link no longer exists.
    fn swap_icon(&self, link: LinkId, url: &str, fallback: bool) -> Option<NodeId>;

    /// Every replacement icon currently rendered in the document.
    fn rendered_icons(&self) -> Vec<NodeId>;

    /// Inject a stylesheet node; returns its handle for later removal.
    fn inject_stylesheet(&self, css: &str) -> NodeId;

    /// Remove a node this system injected. Unknown nodes are ignored.
    fn remove_node(&self, node: NodeId);

    /// Observe subtree mutations, delivering events on `events`.
    fn observe_mutations(&self, events: UnboundedSender<DocumentEvent>) -> ObserverId;

    fn disconnect_observer(&self, observer: ObserverId);

    /// Register a listener for `kind`, delivering events on `events`.
    fn add_listener(&self, kind: EventKind, events: UnboundedSender<DocumentEvent>) -> ListenerId;

    fn remove_listener(&self, listener: ListenerId);
}
