//! Least-recently-used eviction by total size
//!
//! Backends list their blobs and supply a delete callback; the policy lives
//! here so every backend bounds its size the same way.

use tracing::{debug, warn};

use super::BlobMeta;
use crate::Result;

/// Outcome of one eviction pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionReport {
    /// Keys removed, oldest first
    pub evicted: Vec<String>,
    /// Number of candidates whose removal failed
    pub failed: usize,
    /// Total size after the pass, counting the incoming blob
    pub total_after: u64,
}

/// Evict least-recently-used blobs until `incoming` more bytes fit under `max_size`
///
/// `protected` is the key about to be written: it is never evicted and its
/// current size is not counted, since the write replaces it. Candidates go
/// oldest access first, ties broken by key. A failed removal is logged and the
/// next candidate is tried. If every candidate is gone and the total still
/// exceeds `max_size`, the pass stops; an oversized blob is still written.
pub fn enforce_size_limit<F>(
    blobs: Vec<BlobMeta>,
    protected: &str,
    incoming: u64,
    max_size: u64,
    mut remove: F,
) -> EvictionReport
where
    F: FnMut(&BlobMeta) -> Result<()>,
{
    let mut candidates: Vec<BlobMeta> = blobs.into_iter().filter(|b| b.key != protected).collect();
    let mut total = candidates.iter().map(|b| b.size).sum::<u64>() + incoming;

    let mut report = EvictionReport::default();
    if total <= max_size {
        report.total_after = total;
        return report;
    }

    candidates.sort_by(|a, b| a.accessed.cmp(&b.accessed).then_with(|| a.key.cmp(&b.key)));

    for candidate in candidates {
        if total <= max_size {
            break;
        }
        match remove(&candidate) {
            Ok(()) => {
                debug!("Evicted {} ({} bytes)", candidate.key, candidate.size);
                total -= candidate.size;
                report.evicted.push(candidate.key);
            }
            Err(e) => {
                warn!("Eviction of {} failed: {}", candidate.key, e);
                report.failed += 1;
            }
        }
    }

    if total > max_size {
        debug!(
            "Cache holds {} bytes after eviction, above the {} byte bound",
            total, max_size
        );
    }

    report.total_after = total;
    report
}
