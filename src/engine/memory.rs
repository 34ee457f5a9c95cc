//! Explicit memory governance.
//!
//! The engine never probes a runtime allocator or asks for collection: the
//! budget is the sum of every live sketch's retained-bytes estimate plus the
//! chunk buffer. The manager is the single mutator of chunk size.

use tracing::{debug, warn};

use crate::config::ChunkPolicy;

/// Rough per-cell retained size used to cost the chunk buffer.
pub const ESTIMATED_BYTES_PER_CELL: usize = 48;

/// Memory fraction of the threshold below which chunks may grow.
const GROWTH_HEADROOM: f64 = 0.3;

/// What the manager did after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAction {
    /// Within budget; chunk size unchanged.
    Steady,
    /// Comfortably under budget; chunk size grew.
    Grew,
    /// Over budget; chunk size shrank and transient caches should drop.
    Shrank,
    /// Over the emergency multiple of the budget; hard brake.
    Emergency,
}

#[derive(Debug)]
pub struct MemoryManager {
    policy: ChunkPolicy,
    threshold_bytes: f64,
    current_chunk_size: usize,
    peak_bytes: usize,
    emergency_events: u64,
    shrink_events: u64,
}

impl MemoryManager {
    pub fn new(policy: ChunkPolicy, memory_threshold_mb: f64) -> Self {
        let current_chunk_size = policy.chunk_size;
        Self {
            policy,
            threshold_bytes: memory_threshold_mb * 1024.0 * 1024.0,
            current_chunk_size,
            peak_bytes: 0,
            emergency_events: 0,
            shrink_events: 0,
        }
    }

    pub fn current_chunk_size(&self) -> usize {
        self.current_chunk_size
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak_bytes
    }

    pub fn peak_mb(&self) -> f64 {
        self.peak_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn emergency_events(&self) -> u64 {
        self.emergency_events
    }

    /// Observe the current retained-bytes estimate and adapt the chunk size.
    pub fn observe(&mut self, estimated_bytes: usize) -> MemoryAction {
        self.peak_bytes = self.peak_bytes.max(estimated_bytes);
        if !self.policy.adaptive_chunk_sizing {
            return MemoryAction::Steady;
        }

        let estimate = estimated_bytes as f64;
        if estimate > self.threshold_bytes * self.policy.emergency_threshold_multiplier {
            self.shrink();
            self.emergency_events += 1;
            warn!(
                estimated_mb = estimate / (1024.0 * 1024.0),
                chunk_size = self.current_chunk_size,
                "memory emergency: estimate exceeds the emergency multiple of the budget"
            );
            return MemoryAction::Emergency;
        }
        if estimate > self.threshold_bytes {
            self.shrink();
            debug!(
                estimated_mb = estimate / (1024.0 * 1024.0),
                chunk_size = self.current_chunk_size,
                "memory over budget: shrinking chunk size"
            );
            return MemoryAction::Shrank;
        }
        if estimate < self.threshold_bytes * GROWTH_HEADROOM
            && self.current_chunk_size < self.policy.max_chunk_size
        {
            self.current_chunk_size = ((self.current_chunk_size as f64
                * self.policy.expansion_factor) as usize)
                .min(self.policy.max_chunk_size);
            return MemoryAction::Grew;
        }
        MemoryAction::Steady
    }

    fn shrink(&mut self) {
        self.shrink_events += 1;
        self.current_chunk_size = ((self.current_chunk_size as f64
            * self.policy.reduction_factor) as usize)
            .max(self.policy.min_chunk_size);
    }

    /// One-line efficiency summary for the report.
    pub fn efficiency_summary(&self, rows: u64) -> String {
        format!(
            "peak retained estimate {:.1} MB over {rows} rows ({} shrink events, {} emergencies); memory is bounded by sketch caps, not row count",
            self.peak_mb(),
            self.shrink_events,
            self.emergency_events
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(threshold_mb: f64) -> MemoryManager {
        MemoryManager::new(ChunkPolicy::default(), threshold_mb)
    }

    #[test]
    fn comfortable_memory_grows_chunks() {
        let mut m = manager(100.0);
        let action = m.observe(1024); // ~nothing
        assert_eq!(action, MemoryAction::Grew);
        assert!(m.current_chunk_size() > ChunkPolicy::default().chunk_size);
    }

    #[test]
    fn over_budget_shrinks_to_floor() {
        let mut m = manager(1.0); // 1 MB budget
        for _ in 0..20 {
            m.observe(1_500_000);
        }
        assert_eq!(m.current_chunk_size(), ChunkPolicy::default().min_chunk_size);
    }

    #[test]
    fn emergency_is_flagged() {
        let mut m = manager(1.0);
        let action = m.observe(3_000_000); // > 2x threshold
        assert_eq!(action, MemoryAction::Emergency);
        assert_eq!(m.emergency_events(), 1);
    }

    #[test]
    fn adaptive_off_means_steady() {
        let policy = ChunkPolicy {
            adaptive_chunk_sizing: false,
            ..ChunkPolicy::default()
        };
        let mut m = MemoryManager::new(policy, 1.0);
        assert_eq!(m.observe(100_000_000), MemoryAction::Steady);
        assert_eq!(m.current_chunk_size(), 1_000);
    }

    #[test]
    fn peak_tracks_maximum() {
        let mut m = manager(100.0);
        m.observe(5_000);
        m.observe(50_000);
        m.observe(10_000);
        assert_eq!(m.peak_bytes(), 50_000);
    }

    #[test]
    fn growth_respects_max() {
        let mut m = manager(10_000.0);
        for _ in 0..100 {
            m.observe(0);
        }
        assert_eq!(
            m.current_chunk_size(),
            ChunkPolicy::default().max_chunk_size
        );
    }
}
