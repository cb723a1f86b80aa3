//! Bounded ring buffer of completed request records.

use std::collections::VecDeque;
use std::sync::Mutex;

use textlens_models::RequestLogEntry;

/// Fixed capacity; the oldest entry is evicted on overflow.
pub const MAX_LOG_ENTRIES: usize = 100;

/// Thread-safe append-only log, mutated from arbitrary request contexts.
#[derive(Default)]
pub struct RequestLog {
    entries: Mutex<VecDeque<RequestLogEntry>>,
}

impl RequestLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES)),
        }
    }

    pub fn append(&self, entry: RequestLogEntry) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.push_back(entry);
        while entries.len() > MAX_LOG_ENTRIES {
            entries.pop_front();
        }
    }

    /// Independent copy, safe to iterate while the buffer keeps mutating.
    pub fn snapshot(&self) -> Vec<RequestLogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(n: usize) -> RequestLogEntry {
        RequestLogEntry::new("GET", format!("/r/{n}"), 200, 1, "127.0.0.1")
    }

    #[test]
    fn test_capacity_never_exceeded() {
        let log = RequestLog::new();
        for n in 0..150 {
            log.append(entry(n));
            assert!(log.len() <= MAX_LOG_ENTRIES);
        }

        let snapshot = log.snapshot();
        assert_eq!(snapshot.len(), MAX_LOG_ENTRIES);
        // Exactly the last 100, in original relative order.
        for (i, entry) in snapshot.iter().enumerate() {
            assert_eq!(entry.path, format!("/r/{}", i + 50));
        }
    }

    #[test]
    fn test_snapshot_is_independent() {
        let log = RequestLog::new();
        log.append(entry(0));
        let snapshot = log.snapshot();
        log.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(log.is_empty());
    }
}
