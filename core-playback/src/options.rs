//! Option store.
//!
//! Options are `(category, key, value)` triples for the native layer. Entries
//! set before the native handle exists are queued and applied by the prepare
//! worker before the session reports ready; entries set while a prepared
//! handle exists are applied at once. The store keeps every entry so a
//! `reset()` session re-applies the same options on its next prepare.

use bridge_traits::native::{NativePlayer, OptionCategory, OptionValue};
use tracing::{debug, warn};

/// One native option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub category: OptionCategory,
    pub key: String,
    pub value: OptionValue,
}

impl OptionEntry {
    pub fn new(category: OptionCategory, key: impl Into<String>, value: OptionValue) -> Self {
        Self {
            category,
            key: key.into(),
            value,
        }
    }

    fn same_slot(&self, other: &OptionEntry) -> bool {
        self.category == other.category && self.key == other.key
    }
}

#[derive(Debug, Default)]
pub struct OptionStore {
    entries: Vec<OptionEntry>,
    /// Entries before this index have been handed to the current native
    /// handle.
    applied: usize,
}

impl OptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `entry`, replacing an earlier value for the same category and
    /// key. A replaced entry that was already applied is queued again.
    pub fn push(&mut self, entry: OptionEntry) {
        if let Some(index) = self.entries.iter().position(|e| e.same_slot(&entry)) {
            self.entries.remove(index);
            if index < self.applied {
                self.applied -= 1;
            }
        }
        self.entries.push(entry);
    }

    /// Entries not yet applied to the current native handle, marking them
    /// applied.
    pub fn take_pending(&mut self) -> Vec<OptionEntry> {
        let pending = self.entries[self.applied..].to_vec();
        self.applied = self.entries.len();
        pending
    }

    pub fn pending_len(&self) -> usize {
        self.entries.len() - self.applied
    }

    /// Forget what was applied so the next native handle receives everything.
    pub fn rewind(&mut self) {
        self.applied = 0;
    }

    pub fn entries(&self) -> &[OptionEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Apply `entries` in order. Failures are logged and skipped; a single bad
/// option never blocks playback. Returns how many were accepted.
pub fn apply_all(native: &mut dyn NativePlayer, entries: &[OptionEntry]) -> usize {
    let mut accepted = 0;
    for entry in entries {
        match native.set_option(entry.category, &entry.key, &entry.value) {
            Ok(()) => {
                debug!(category = ?entry.category, key = %entry.key, value = %entry.value, "Applied option");
                accepted += 1;
            }
            Err(error) => {
                warn!(
                    category = ?entry.category,
                    key = %entry.key,
                    error = %error,
                    "Native rejected option; continuing"
                );
            }
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, value: i64) -> OptionEntry {
        OptionEntry::new(OptionCategory::Player, key, OptionValue::Int(value))
    }

    #[test]
    fn pending_entries_are_taken_once() {
        let mut store = OptionStore::new();
        store.push(entry("framedrop", 1));
        store.push(entry("start-on-prepared", 0));

        assert_eq!(store.take_pending().len(), 2);
        assert_eq!(store.pending_len(), 0);

        store.push(entry("mediacodec", 1));
        let late = store.take_pending();
        assert_eq!(late, vec![entry("mediacodec", 1)]);
    }

    #[test]
    fn replacing_an_applied_entry_requeues_it() {
        let mut store = OptionStore::new();
        store.push(entry("framedrop", 1));
        store.push(entry("mediacodec", 0));
        store.take_pending();

        store.push(entry("framedrop", 5));
        assert_eq!(store.take_pending(), vec![entry("framedrop", 5)]);
        assert_eq!(store.entries().len(), 2);
    }

    #[test]
    fn rewind_reapplies_everything() {
        let mut store = OptionStore::new();
        store.push(entry("framedrop", 1));
        store.take_pending();
        store.rewind();
        assert_eq!(store.pending_len(), 1);
    }

    #[test]
    fn same_key_in_different_categories_is_kept() {
        let mut store = OptionStore::new();
        store.push(OptionEntry::new(OptionCategory::Format, "threads", OptionValue::Int(2)));
        store.push(OptionEntry::new(OptionCategory::Codec, "threads", OptionValue::Int(4)));
        assert_eq!(store.entries().len(), 2);
        assert!(!store.is_empty());
    }
}
