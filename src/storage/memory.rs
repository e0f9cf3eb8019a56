//! In-process analysis store.

use super::{AnalysisStore, count_matching, select_recent};
use crate::core::errors::{SimpleError, SmearError, SmearResult};
use crate::domain::AnalysisRecord;
use chrono::{DateTime, Utc};
use std::sync::RwLock;

/// Keeps records in memory in append order. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryAnalysisStore {
    records: RwLock<Vec<AnalysisRecord>>,
}

impl MemoryAnalysisStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of records regardless of subject.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> SmearError {
    SmearError::store_unavailable("memory store", SimpleError::new("lock poisoned"))
}

impl AnalysisStore for MemoryAnalysisStore {
    fn append(&self, record: AnalysisRecord) -> SmearResult<()> {
        record.validate()?;
        let mut records = self.records.write().map_err(|_| poisoned())?;
        tracing::debug!(analysis_id = %record.analysis_id, "Appending analysis record");
        records.push(record);
        Ok(())
    }

    fn list(&self, subject_id: Option<&str>, limit: usize) -> SmearResult<Vec<AnalysisRecord>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(select_recent(records.iter(), subject_id, limit))
    }

    fn count(&self, subject_id: Option<&str>, since: Option<DateTime<Utc>>) -> SmearResult<usize> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(count_matching(records.iter(), subject_id, since))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PredictionResult;
    use crate::storage::test_support::{at, record};

    #[test]
    fn test_list_sorted_desc_and_capped() {
        let store = MemoryAnalysisStore::new();
        for day in 1..=20 {
            store.append(record(Some("u1"), at(2024, 1, day, 8))).unwrap();
        }
        store.append(record(Some("u2"), at(2024, 2, 1, 8))).unwrap();

        let listed = store.list(Some("u1"), 5).unwrap();
        assert_eq!(listed.len(), 5);
        assert_eq!(listed[0].created_at, at(2024, 1, 20, 8));
        assert!(listed.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert!(listed.iter().all(|r| r.subject_id.as_deref() == Some("u1")));
    }

    #[test]
    fn test_list_never_exceeds_limit() {
        let store = MemoryAnalysisStore::new();
        for hour in 0..24 {
            for day in 1..=5 {
                store.append(record(Some("u1"), at(2024, 3, day, hour))).unwrap();
            }
        }
        assert_eq!(store.len(), 120);
        assert_eq!(store.list(Some("u1"), 100).unwrap().len(), 100);
    }

    #[test]
    fn test_equal_timestamps_most_recent_append_first() {
        let store = MemoryAnalysisStore::new();
        let first = record(Some("u1"), at(2024, 3, 1, 0));
        let second = record(Some("u1"), at(2024, 3, 1, 0));
        let (first_id, second_id) = (first.analysis_id, second.analysis_id);
        store.append(first).unwrap();
        store.append(second).unwrap();

        let listed = store.list(Some("u1"), 10).unwrap();
        assert_eq!(listed[0].analysis_id, second_id);
        assert_eq!(listed[1].analysis_id, first_id);
    }

    #[test]
    fn test_count_since_is_inclusive() {
        let store = MemoryAnalysisStore::new();
        store.append(record(Some("u1"), at(2024, 3, 10, 23))).unwrap();
        store.append(record(Some("u1"), at(2024, 3, 11, 0))).unwrap();
        store.append(record(Some("u1"), at(2024, 3, 12, 5))).unwrap();

        assert_eq!(store.count(Some("u1"), None).unwrap(), 3);
        assert_eq!(store.count(Some("u1"), Some(at(2024, 3, 11, 0))).unwrap(), 2);
        assert_eq!(store.count(Some("u2"), None).unwrap(), 0);
    }

    #[test]
    fn test_unset_subject_matches_only_unset() {
        let store = MemoryAnalysisStore::new();
        store.append(record(None, at(2024, 3, 1, 0))).unwrap();
        store.append(record(Some("u1"), at(2024, 3, 1, 0))).unwrap();
        assert_eq!(store.count(None, None).unwrap(), 1);
        assert_eq!(store.list(None, 100).unwrap().len(), 1);
    }

    #[test]
    fn test_append_rejects_error_results() {
        let store = MemoryAnalysisStore::new();
        let mut bad = record(Some("u1"), at(2024, 3, 1, 0));
        bad.result = PredictionResult::failure("decode failed");
        assert!(matches!(
            store.append(bad),
            Err(SmearError::InvalidInput { .. })
        ));
        assert!(store.is_empty());
    }
}
