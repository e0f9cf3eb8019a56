//! The persisted form of one classification event.

use crate::core::errors::SmearResult;
use crate::domain::prediction::PredictionResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One successful classification tied to a subject and a timestamp.
///
/// Records are created when inference succeeds and are never mutated once
/// handed to a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub analysis_id: Uuid,
    /// Who requested the analysis; unset for anonymous requests.
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub notes: String,
    pub result: PredictionResult,
    /// Serialized as an ISO-8601 UTC timestamp.
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    /// Creates a record with a fresh identifier stamped with the current time.
    pub fn new(
        subject_id: Option<String>,
        notes: impl Into<String>,
        result: PredictionResult,
    ) -> Self {
        Self {
            analysis_id: Uuid::new_v4(),
            subject_id,
            notes: notes.into(),
            result,
            created_at: Utc::now(),
        }
    }

    /// Replaces the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Whether this record belongs to `subject_id` (an unset subject only
    /// matches unset subjects).
    pub fn belongs_to(&self, subject_id: Option<&str>) -> bool {
        self.subject_id.as_deref() == subject_id
    }

    /// Validation applied at the storage boundary.
    pub fn validate(&self) -> SmearResult<()> {
        self.result.validate()
    }
}
