//! Time-windowed counts over stored analyses.

use crate::core::errors::SmearResult;
use crate::storage::AnalysisStore;
use chrono::{DateTime, Datelike, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Analysis counts for one subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total: usize,
    pub this_month: usize,
    pub this_week: usize,
}

/// Midnight UTC on the first day of `now`'s month.
pub fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    (date - TimeDelta::days(i64::from(date.day0())))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Midnight UTC on the Monday of `now`'s ISO week.
pub fn week_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let since_monday = date.weekday().num_days_from_monday();
    (date - TimeDelta::days(i64::from(since_monday)))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Computes [`AnalysisStats`] from a store.
#[derive(Debug, Clone, Copy)]
pub struct StatsAggregator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AnalysisStore + ?Sized> StatsAggregator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Counts for `subject_id` as seen at `now`.
    ///
    /// Windows start at [`month_start`] and [`week_start`] and include their
    /// start instant.
    pub fn stats(&self, subject_id: Option<&str>, now: DateTime<Utc>) -> SmearResult<AnalysisStats> {
        Ok(AnalysisStats {
            total: self.store.count(subject_id, None)?,
            this_month: self.store.count(subject_id, Some(month_start(now)))?,
            this_week: self.store.count(subject_id, Some(week_start(now)))?,
        })
    }
}
