//! Tracking of commands whose results still need formatting.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::directive::FormatKind;
use super::results::{format_result, FormatError};
use crate::viewer::RawResult;

/// Default lifetime of an unresolved entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
/// Default number of unresolved entries kept.
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy)]
struct PendingEntry {
    kind: FormatKind,
    created: Instant,
}

/// Maps the raw input text of an issued command to the formatting its result needs.
///
/// Keys are the exact input text, so issuing the same command twice before the
/// first result arrives leaves one entry: the second registration wins and the
/// first result to come back consumes it. Callers needing stricter correlation
/// must make their keys unique.
///
/// Entries older than the TTL are dropped, and once `capacity` entries are held
/// the oldest is evicted to make room.
#[derive(Debug)]
pub struct PendingResultTracker {
    entries: Mutex<HashMap<String, PendingEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl PendingResultTracker {
    /// Create a tracker with the given entry lifetime and size bound.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Record that the result for `key` must be formatted as `kind`.
    pub fn mark_pending(&self, key: &str, kind: FormatKind) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, self.ttl, now);

        if !entries.contains_key(key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::warn!(key = %oldest, "pending result evicted to stay within capacity");
                entries.remove(&oldest);
            }
        }

        if entries.insert(key.to_string(), PendingEntry { kind, created: now }).is_some() {
            tracing::debug!(key, %kind, "pending result overwritten by a repeated command");
        }
    }

    /// Whether a live entry exists for `key`.
    pub fn is_pending(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, self.ttl, now);
        entries.contains_key(key)
    }

    /// Remove and return the entry for `key`, if it is still live.
    pub fn take(&self, key: &str) -> Option<FormatKind> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, self.ttl, now);
        entries.remove(key).map(|entry| entry.kind)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        Self::purge_expired(&mut entries, self.ttl, now);
        entries.len()
    }

    /// Whether no entries are live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Format `raw` for the command that was issued as `key`.
    ///
    /// Without a pending entry the raw text is returned unchanged. The entry is
    /// consumed, so a second call for the same key passes through.
    pub fn resolve(&self, key: &str, raw: impl Into<RawResult>) -> String {
        let raw = raw.into();
        let kind = match self.take(key) {
            Some(kind) => kind,
            None => return raw.to_text(),
        };

        tracing::debug!(key, %kind, "formatting deferred result");
        match format_result(kind, &raw) {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(key, %kind, error = %err, "error formatting command result");
                error_block(&err, &raw)
            }
        }
    }

    fn purge_expired(entries: &mut HashMap<String, PendingEntry>, ttl: Duration, now: Instant) {
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.created) < ttl);
        let expired = before - entries.len();
        if expired > 0 {
            tracing::debug!(expired, "expired pending results dropped");
        }
    }
}

impl Default for PendingResultTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_CAPACITY)
    }
}

fn error_block(err: &FormatError, raw: &RawResult) -> String {
    format!(
        "❌ **Error processing command result:** {}\n\n**Raw result:**\n\n```\n{}\n```",
        err,
        raw.to_text()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::directive::{PromptsView, TravelView};

    const LIST: FormatKind = FormatKind::Prompts(PromptsView::List);

    #[test]
    fn test_resolve_without_entry_passes_through() {
        let tracker = PendingResultTracker::default();
        assert_eq!(tracker.resolve("/prompts", "raw text"), "raw text");
    }

    #[test]
    fn test_resolve_is_exactly_once() {
        let tracker = PendingResultTracker::default();
        tracker.mark_pending("/prompts list", LIST);
        assert!(tracker.is_pending("/prompts list"));

        let raw = r#"[{"name": "a", "category": "travel"}]"#;
        let first = tracker.resolve("/prompts list", raw);
        assert!(first.starts_with("# Available Prompts"));
        assert!(!tracker.is_pending("/prompts list"));

        assert_eq!(tracker.resolve("/prompts list", raw), raw);
    }

    #[test]
    fn test_last_write_wins() {
        let tracker = PendingResultTracker::default();
        tracker.mark_pending("/p", LIST);
        tracker.mark_pending("/p", FormatKind::Prompts(PromptsView::Dashboard));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.take("/p"), Some(FormatKind::Prompts(PromptsView::Dashboard)));
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let tracker = PendingResultTracker::new(Duration::from_millis(0), 8);
        tracker.mark_pending("/p", LIST);
        assert!(!tracker.is_pending("/p"));
        assert_eq!(tracker.resolve("/p", "raw"), "raw");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let tracker = PendingResultTracker::new(Duration::from_secs(60), 2);
        tracker.mark_pending("/a", LIST);
        std::thread::sleep(Duration::from_millis(2));
        tracker.mark_pending("/b", LIST);
        std::thread::sleep(Duration::from_millis(2));
        tracker.mark_pending("/c", LIST);

        assert_eq!(tracker.len(), 2);
        assert!(!tracker.is_pending("/a"));
        assert!(tracker.is_pending("/b"));
        assert!(tracker.is_pending("/c"));
    }

    #[test]
    fn test_format_failure_becomes_error_block() {
        let tracker = PendingResultTracker::default();
        tracker.mark_pending("/travel db", FormatKind::Travel(TravelView::Init));
        let raw = r#"[{"content": ["not", "text"]}]"#;
        let out = tracker.resolve("/travel db", raw);
        assert!(out.starts_with("❌ **Error processing command result:**"));
        assert!(out.contains(raw));
    }

    #[test]
    fn test_concurrent_marks() {
        let tracker = std::sync::Arc::new(PendingResultTracker::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tracker = tracker.clone();
                std::thread::spawn(move || tracker.mark_pending(&format!("/p{}", i), LIST))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.len(), 8);
    }
}
