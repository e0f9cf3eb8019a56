//! Persistence of analysis records.
//!
//! [`AnalysisStore`] is the boundary between the pipeline and whatever keeps
//! the records. Two backends ship with the crate:
//!
//! - [`MemoryAnalysisStore`] keeps records in process memory.
//! - [`JsonlAnalysisStore`] appends one JSON document per line to a file.
//!
//! Records are validated on `append` and never modified afterwards.

pub mod jsonl;
pub mod memory;

pub use jsonl::JsonlAnalysisStore;
pub use memory::MemoryAnalysisStore;

use crate::core::errors::SmearResult;
use crate::domain::AnalysisRecord;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Append-only store of [`AnalysisRecord`]s.
///
/// `subject_id` filters use exact matching: `None` selects only records whose
/// subject is unset.
pub trait AnalysisStore: Send + Sync {
    /// Persists `record`.
    ///
    /// # Errors
    ///
    /// [`SmearError::InvalidInput`](crate::core::errors::SmearError::InvalidInput)
    /// for a record that fails validation and
    /// [`SmearError::StoreUnavailable`](crate::core::errors::SmearError::StoreUnavailable)
    /// when the backend cannot be reached.
    fn append(&self, record: AnalysisRecord) -> SmearResult<()>;

    /// Records of `subject_id`, newest first, at most `limit` of them.
    ///
    /// Records with equal `created_at` are ordered most recently appended first.
    fn list(&self, subject_id: Option<&str>, limit: usize) -> SmearResult<Vec<AnalysisRecord>>;

    /// Number of records of `subject_id` created at or after `since`, or all
    /// of them when `since` is `None`.
    fn count(&self, subject_id: Option<&str>, since: Option<DateTime<Utc>>) -> SmearResult<usize>;
}

impl<S: AnalysisStore + ?Sized> AnalysisStore for Arc<S> {
    fn append(&self, record: AnalysisRecord) -> SmearResult<()> {
        (**self).append(record)
    }

    fn list(&self, subject_id: Option<&str>, limit: usize) -> SmearResult<Vec<AnalysisRecord>> {
        (**self).list(subject_id, limit)
    }

    fn count(&self, subject_id: Option<&str>, since: Option<DateTime<Utc>>) -> SmearResult<usize> {
        (**self).count(subject_id, since)
    }
}

/// Selects the newest `limit` records of `subject_id` from records given in
/// append order.
pub(crate) fn select_recent<'a, I>(
    records: I,
    subject_id: Option<&str>,
    limit: usize,
) -> Vec<AnalysisRecord>
where
    I: DoubleEndedIterator<Item = &'a AnalysisRecord>,
{
    let mut selected: Vec<AnalysisRecord> = records
        .rev()
        .filter(|r| r.belongs_to(subject_id))
        .cloned()
        .collect();
    // Stable sort keeps the reversed append order among equal timestamps.
    selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    selected.truncate(limit);
    selected
}

pub(crate) fn count_matching<'a, I>(
    records: I,
    subject_id: Option<&str>,
    since: Option<DateTime<Utc>>,
) -> usize
where
    I: Iterator<Item = &'a AnalysisRecord>,
{
    records
        .filter(|r| r.belongs_to(subject_id))
        .filter(|r| since.is_none_or(|start| r.created_at >= start))
        .count()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{AnalysisRecord, DiseaseScore, PredictionResult};
    use chrono::{DateTime, TimeZone, Utc};

    pub fn result(top: &str) -> PredictionResult {
        PredictionResult::from_ranked(vec![
            DiseaseScore {
                disease: top.to_string(),
                confidence: 0.75,
            },
            DiseaseScore {
                disease: "other".to_string(),
                confidence: 0.25,
            },
        ])
        .unwrap()
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    pub fn record(subject: Option<&str>, created_at: DateTime<Utc>) -> AnalysisRecord {
        AnalysisRecord::new(subject.map(str::to_string), "", result("malaria_parasitized"))
            .with_created_at(created_at)
    }
}
