// Protocol diagnostics - counters for malformed event sequences
// A bad adapter degrades report completeness, never the host test run

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Internal counters incremented whenever the runtime discards or repairs a
/// malformed message instead of applying it.
#[derive(Debug, Default)]
pub struct Diagnostics {
    stop_without_start: AtomicU64,
    double_start: AtomicU64,
    unbalanced_step: AtomicU64,
    orphan_attachment: AtomicU64,
    mismatched_target: AtomicU64,
    message_after_finalize: AtomicU64,
    interrupted_children: AtomicU64,
    listener_failures: AtomicU64,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_stop_without_start(&self) {
        self.stop_without_start.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_double_start(&self) {
        self.double_start.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unbalanced_step(&self) {
        self.unbalanced_step.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_orphan_attachment(&self) {
        self.orphan_attachment.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_mismatched_target(&self) {
        self.mismatched_target.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_message_after_finalize(&self) {
        self.message_after_finalize.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_interrupted_children(&self, count: u64) {
        self.interrupted_children.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_listener_failure(&self) {
        self.listener_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            stop_without_start: self.stop_without_start.load(Ordering::Relaxed),
            double_start: self.double_start.load(Ordering::Relaxed),
            unbalanced_step: self.unbalanced_step.load(Ordering::Relaxed),
            orphan_attachment: self.orphan_attachment.load(Ordering::Relaxed),
            mismatched_target: self.mismatched_target.load(Ordering::Relaxed),
            message_after_finalize: self.message_after_finalize.load(Ordering::Relaxed),
            interrupted_children: self.interrupted_children.load(Ordering::Relaxed),
            listener_failures: self.listener_failures.load(Ordering::Relaxed),
        }
    }
}

/// Serializable view of the diagnostics counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticsSnapshot {
    pub stop_without_start: u64,
    pub double_start: u64,
    pub unbalanced_step: u64,
    pub orphan_attachment: u64,
    pub mismatched_target: u64,
    pub message_after_finalize: u64,
    pub interrupted_children: u64,
    pub listener_failures: u64,
}

impl DiagnosticsSnapshot {
    /// True when every counter is zero, i.e. the run was well-formed.
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    pub fn total(&self) -> u64 {
        self.stop_without_start
            + self.double_start
            + self.unbalanced_step
            + self.orphan_attachment
            + self.mismatched_target
            + self.message_after_finalize
            + self.interrupted_children
            + self.listener_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_starts_clean() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.snapshot().is_clean());
        assert_eq!(diagnostics.snapshot().total(), 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let diagnostics = Diagnostics::new();
        diagnostics.record_stop_without_start();
        diagnostics.record_stop_without_start();
        diagnostics.record_interrupted_children(3);

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.stop_without_start, 2);
        assert_eq!(snapshot.interrupted_children, 3);
        assert_eq!(snapshot.total(), 5);
        assert!(!snapshot.is_clean());
    }
}
