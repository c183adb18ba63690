//! Best-effort host memory snapshot.

use serde::Serialize;

/// Host memory usage, when the platform exposes it.
///
/// Reported as an explicit `Unavailable` value rather than an error when
/// the facility is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MemorySnapshot {
    Available { rss_mb: u64, vsize_mb: u64 },
    Unavailable,
}

/// Take a snapshot of this process's memory usage. Never fails.
pub fn inspect_memory() -> MemorySnapshot {
    read_statm().unwrap_or(MemorySnapshot::Unavailable)
}

#[cfg(target_os = "linux")]
fn read_statm() -> Option<MemorySnapshot> {
    // /proc/<pid>/statm reports sizes in pages; assume the common 4 KiB.
    const PAGE_BYTES: u64 = 4096;

    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let mut fields = statm.split_whitespace();
    let vsize_pages: u64 = fields.next()?.parse().ok()?;
    let rss_pages: u64 = fields.next()?.parse().ok()?;

    Some(MemorySnapshot::Available {
        rss_mb: rss_pages * PAGE_BYTES / 1024 / 1024,
        vsize_mb: vsize_pages * PAGE_BYTES / 1024 / 1024,
    })
}

#[cfg(not(target_os = "linux"))]
fn read_statm() -> Option<MemorySnapshot> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_memory_never_panics() {
        let snapshot = inspect_memory();
        if let MemorySnapshot::Available { vsize_mb, rss_mb } = snapshot {
            assert!(vsize_mb >= rss_mb);
        }
    }

    #[test]
    fn test_snapshot_serializes_status_tag() {
        let json = serde_json::to_string(&MemorySnapshot::Unavailable).unwrap();
        assert!(json.contains("unavailable"));
    }
}
