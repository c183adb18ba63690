//! Live favicon resolution for inline links.
//!
//! The engine watches an editable document for newly-appeared link
//! elements, resolves each target's domain, fetches a favicon from ordered
//! remote sources, caches results durably, and swaps the placeholder glyph
//! for the resolved image. Every side effect belongs to a [`Session`]
//! installed and torn down atomically; operators drive the system through
//! the [`ControlSurface`].
//!
//! Hosts integrate by implementing [`adapter::DocumentAdapter`] over their
//! document tree; the in-memory [`adapter::FakeDocument`] runs the whole
//! engine without a rendering environment.

pub mod adapter;
pub mod assets;
pub mod control;
pub mod memory;
pub mod processor;
pub mod session;

pub use adapter::{DocumentAdapter, DocumentEvent, EventKind, FakeDocument, LinkId, NodeId};
pub use control::{ControlSurface, Stats};
pub use memory::MemorySnapshot;
pub use processor::{RunReport, RunState};
pub use session::Session;
