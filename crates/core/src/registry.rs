//! Resource accounting for one session's side effects.
//!
//! Every side-effecting handle a session creates (observers, event
//! listeners, pending timers, in-flight image loads) is counted here so
//! teardown completeness is observable. Counts are kept with RAII guards:
//! dropping the guard releases the count, whether the owning future
//! finished or was cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

/// Read-only snapshot of currently-held resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceStats {
    pub observers: usize,
    pub listeners: usize,
    pub timers: usize,
    pub images: usize,
}

impl ResourceStats {
    pub fn is_zero(&self) -> bool {
        self.observers == 0 && self.listeners == 0 && self.timers == 0 && self.images == 0
    }
}

/// Shared counters for one session's live resources.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    observers: AtomicUsize,
    listeners: AtomicUsize,
    timers: AtomicUsize,
    images: AtomicUsize,
}

impl ResourceRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count a live observer until the guard drops.
    pub fn observer(self: &Arc<Self>) -> ResourceGuard {
        ResourceGuard::new(self, Kind::Observer)
    }

    /// Count a registered event listener until the guard drops.
    pub fn listener(self: &Arc<Self>) -> ResourceGuard {
        ResourceGuard::new(self, Kind::Listener)
    }

    /// Count a pending timer until the guard drops.
    pub fn timer(self: &Arc<Self>) -> ResourceGuard {
        ResourceGuard::new(self, Kind::Timer)
    }

    /// Count an in-flight image load until the guard drops.
    pub fn image(self: &Arc<Self>) -> ResourceGuard {
        ResourceGuard::new(self, Kind::Image)
    }

    pub fn snapshot(&self) -> ResourceStats {
        ResourceStats {
            observers: self.observers.load(Ordering::SeqCst),
            listeners: self.listeners.load(Ordering::SeqCst),
            timers: self.timers.load(Ordering::SeqCst),
            images: self.images.load(Ordering::SeqCst),
        }
    }

    fn counter(&self, kind: Kind) -> &AtomicUsize {
        match kind {
            Kind::Observer => &self.observers,
            Kind::Listener => &self.listeners,
            Kind::Timer => &self.timers,
            Kind::Image => &self.images,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Observer,
    Listener,
    Timer,
    Image,
}

/// RAII count of one live resource.
#[derive(Debug)]
pub struct ResourceGuard {
    registry: Arc<ResourceRegistry>,
    kind: Kind,
}

impl ResourceGuard {
    fn new(registry: &Arc<ResourceRegistry>, kind: Kind) -> Self {
        registry.counter(kind).fetch_add(1, Ordering::SeqCst);
        Self { registry: registry.clone(), kind }
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.registry.counter(self.kind).fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_live_guards() {
        let registry = ResourceRegistry::new();
        let _observer = registry.observer();
        let _listener_a = registry.listener();
        let _listener_b = registry.listener();
        let _timer = registry.timer();

        let stats = registry.snapshot();
        assert_eq!(stats.observers, 1);
        assert_eq!(stats.listeners, 2);
        assert_eq!(stats.timers, 1);
        assert_eq!(stats.images, 0);
        assert!(!stats.is_zero());
    }

    #[test]
    fn test_drop_releases_counts() {
        let registry = ResourceRegistry::new();
        {
            let _timer = registry.timer();
            let _image = registry.image();
            assert_eq!(registry.snapshot().timers, 1);
        }
        assert!(registry.snapshot().is_zero());
    }

    #[test]
    fn test_stats_serialize() {
        let registry = ResourceRegistry::new();
        let _image = registry.image();
        let json = serde_json::to_string(&registry.snapshot()).unwrap();
        assert!(json.contains("\"images\":1"));
    }
}
