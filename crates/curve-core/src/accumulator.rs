//! Per-file accumulated focus time.
//!
//! The [`Accumulator`] is the single owner of committed time. Totals are only
//! ever added to: negative deltas are clamped to zero and a restart loads the
//! durable record before anything is merged, so persisted totals are never
//! overwritten with smaller values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::store::{DurableStore, RECORD_KEY, StoreError};
use crate::types::FileId;

/// Mapping of file identifier to cumulative milliseconds.
///
/// Serializes as a flat JSON object, `{ "<file>": <ms>, ... }`, with no
/// envelope or version field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccumulatedTime(BTreeMap<FileId, u64>);

impl AccumulatedTime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total milliseconds recorded for `file`, if it has ever been focused.
    pub fn get(&self, file: &FileId) -> Option<u64> {
        self.0.get(file).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileId, u64)> {
        self.0.iter().map(|(file, ms)| (file, *ms))
    }

    /// Sum of all per-file totals.
    pub fn total_ms(&self) -> u64 {
        self.0.values().fold(0, |acc, ms| acc.saturating_add(*ms))
    }

    /// Entries ordered by descending time, ties broken by identifier.
    pub fn ranked(&self) -> Vec<(&FileId, u64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|(a_file, a_ms), (b_file, b_ms)| {
            b_ms.cmp(a_ms).then_with(|| a_file.cmp(b_file))
        });
        entries
    }
}

impl FromIterator<(FileId, u64)> for AccumulatedTime {
    fn from_iter<I: IntoIterator<Item = (FileId, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// In-memory owner of committed focus time.
#[derive(Debug, Default)]
pub struct Accumulator {
    totals: AccumulatedTime,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `delta_ms` to the total for `file` and returns the new total.
    ///
    /// Negative deltas (clock regressions) are clamped to zero. A zero delta
    /// still creates the key.
    pub fn merge_delta(&mut self, file: &FileId, delta_ms: i64) -> u64 {
        let delta = u64::try_from(delta_ms).unwrap_or(0);
        let total = self.totals.0.entry(file.clone()).or_insert(0);
        *total = total.saturating_add(delta);
        *total
    }

    /// Returns a point-in-time copy of every total.
    pub fn snapshot(&self) -> AccumulatedTime {
        self.totals.clone()
    }

    /// Replaces the in-memory mapping wholesale with a durable record.
    pub fn load_from(&mut self, record: AccumulatedTime) {
        self.totals = record;
    }

    /// Overwrites the durable record with the current mapping.
    ///
    /// The mapping is always a superset of what was loaded, so a full
    /// overwrite is equivalent to merge-and-save.
    pub fn persist_to(&self, store: &mut dyn DurableStore) -> Result<(), StoreError> {
        store.set(RECORD_KEY, &self.totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn file(name: &str) -> FileId {
        FileId::new(name).unwrap()
    }

    #[test]
    fn merge_delta_accumulates() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.merge_delta(&file("a.ts"), 1_000), 1_000);
        assert_eq!(acc.merge_delta(&file("a.ts"), 250), 1_250);
        assert_eq!(acc.merge_delta(&file("b.ts"), 10), 10);
    }

    #[test]
    fn zero_delta_creates_key_without_changing_total() {
        let mut acc = Accumulator::new();
        assert_eq!(acc.merge_delta(&file("a.ts"), 0), 0);
        assert_eq!(acc.snapshot().get(&file("a.ts")), Some(0));

        acc.merge_delta(&file("a.ts"), 500);
        assert_eq!(acc.merge_delta(&file("a.ts"), 0), 500);
    }

    #[test]
    fn negative_delta_is_clamped() {
        let mut acc = Accumulator::new();
        acc.merge_delta(&file("a.ts"), 1_000);
        assert_eq!(acc.merge_delta(&file("a.ts"), -50), 1_000);
        assert_eq!(acc.merge_delta(&file("b.ts"), -50), 0);
    }

    #[test]
    fn merge_after_load_is_additive() {
        let mut acc = Accumulator::new();
        acc.load_from([(file("a.ts"), 5_000)].into_iter().collect());
        assert_eq!(acc.merge_delta(&file("a.ts"), 2_000), 7_000);
    }

    #[test]
    fn snapshot_is_detached_from_live_mapping() {
        let mut acc = Accumulator::new();
        acc.merge_delta(&file("a.ts"), 100);
        let snapshot = acc.snapshot();
        acc.merge_delta(&file("a.ts"), 100);
        assert_eq!(snapshot.get(&file("a.ts")), Some(100));
        assert_eq!(acc.snapshot().get(&file("a.ts")), Some(200));
    }

    #[test]
    fn persist_overwrites_record() {
        let mut store = MemoryStore::new();
        let mut acc = Accumulator::new();
        acc.merge_delta(&file("a.ts"), 42);
        acc.persist_to(&mut store).unwrap();

        let stored = store.get(RECORD_KEY).unwrap().unwrap();
        assert_eq!(stored, acc.snapshot());
    }

    #[test]
    fn ranked_orders_by_time_then_name() {
        let totals: AccumulatedTime = [
            (file("c.ts"), 10),
            (file("a.ts"), 300),
            (file("b.ts"), 300),
        ]
        .into_iter()
        .collect();

        let ranked: Vec<_> = totals
            .ranked()
            .into_iter()
            .map(|(f, ms)| (f.as_str(), ms))
            .collect();
        assert_eq!(ranked, vec![("a.ts", 300), ("b.ts", 300), ("c.ts", 10)]);
        assert_eq!(totals.total_ms(), 610);
    }

    #[test]
    fn serializes_as_flat_object() {
        let totals: AccumulatedTime = [(file("a.ts"), 120_000), (file("b.ts"), 300_000)]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&totals).unwrap();
        insta::assert_snapshot!(json, @r#"{"a.ts":120000,"b.ts":300000}"#);

        let parsed: AccumulatedTime = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, totals);
    }
}
