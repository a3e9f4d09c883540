//! Curriculum progress summaries and the aggregation that derives them.
//!
//! A [`ProgressSummary`] exists for a (teaching plan, sub-topic, group) key
//! exactly when at least one sub-topic coverage record for that key exists.
//! It is a projection: [`summarize`] rebuilds it from the observations alone,
//! so it can always be recomputed from the coverage ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::{
  coverage::CoverageStatus,
  ids::{GroupId, SessionId, SubTopicId, TeachingPlanId},
  validate::Percentage,
};

// ─── Overall status ──────────────────────────────────────────────────────────

/// Where a group stands on a sub-topic. Stored as its level `0..=4`.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OverallStatus {
  NotStarted = 0,
  Introduced = 1,
  InProgress = 2,
  Practiced  = 3,
  /// Representable, but never derived from coverage alone.
  Mastered   = 4,
}

impl OverallStatus {
  pub const fn level(self) -> u8 { self as u8 }

  pub fn from_level(level: u8) -> Option<Self> {
    Self::iter().find(|s| s.level() == level)
  }
}

impl From<CoverageStatus> for OverallStatus {
  fn from(status: CoverageStatus) -> Self {
    match status {
      CoverageStatus::NotCovered => OverallStatus::NotStarted,
      CoverageStatus::PartiallyCovered => OverallStatus::Introduced,
      CoverageStatus::MostlyCovered => OverallStatus::InProgress,
      CoverageStatus::FullyCovered => OverallStatus::Practiced,
    }
  }
}

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
  pub plan_id:      TeachingPlanId,
  pub sub_topic_id: SubTopicId,
  pub group_id:     GroupId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSummary {
  pub plan_id:                     TeachingPlanId,
  pub sub_topic_id:                SubTopicId,
  pub group_id:                    GroupId,
  pub overall_status:              OverallStatus,
  pub first_taught_date:           Option<NaiveDate>,
  pub last_taught_date:            Option<NaiveDate>,
  pub sessions_count:              u32,
  pub overall_progress_percentage: Percentage,
}

impl ProgressSummary {
  pub fn key(&self) -> ProgressKey {
    ProgressKey {
      plan_id:      self.plan_id,
      sub_topic_id: self.sub_topic_id,
      group_id:     self.group_id,
    }
  }
}

/// Filters for reading summaries of one plan. Omitted filters match all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressQuery {
  pub plan_id:      TeachingPlanId,
  pub sub_topic_id: Option<SubTopicId>,
  pub group_id:     Option<GroupId>,
}

impl ProgressQuery {
  pub fn plan(plan_id: TeachingPlanId) -> Self {
    Self { plan_id, sub_topic_id: None, group_id: None }
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

/// One stored sub-topic coverage record, joined with its session's date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageObservation {
  pub coverage_id:  i64,
  pub session_id:   SessionId,
  pub session_date: NaiveDate,
  pub created_at:   DateTime<Utc>,
  pub percentage:   Percentage,
  pub status:       CoverageStatus,
}

/// A coverage record skipped because its sub-topic no longer resolves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIntegrityWarning {
  pub coverage_id:  i64,
  pub session_id:   SessionId,
  pub sub_topic_id: SubTopicId,
}

impl std::fmt::Display for DataIntegrityWarning {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "coverage record {} in session {} references unknown sub-topic {}",
      self.coverage_id, self.session_id, self.sub_topic_id
    )
  }
}

/// The result of recomputing one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recomputed {
  pub key:      ProgressKey,
  /// `None` when no contributing record remains; the summary was removed.
  pub summary:  Option<ProgressSummary>,
  pub warnings: Vec<DataIntegrityWarning>,
}

/// Derive the summary for `key` from every matching observation.
///
/// Within a session only the most recent record (by `created_at`, then
/// `coverage_id`) counts. Across sessions the latest session (by date, then
/// id) decides the percentage and status; 100% reported as mostly covered is
/// promoted to fully covered. Returns `None` when there is nothing to
/// summarise.
pub fn summarize(
  key: ProgressKey,
  observations: &[CoverageObservation],
) -> Option<ProgressSummary> {
  let mut per_session: BTreeMap<SessionId, &CoverageObservation> = BTreeMap::new();
  for obs in observations {
    per_session
      .entry(obs.session_id)
      .and_modify(|current| {
        if (obs.created_at, obs.coverage_id) > (current.created_at, current.coverage_id) {
          *current = obs;
        }
      })
      .or_insert(obs);
  }

  let latest = per_session
    .values()
    .max_by_key(|obs| (obs.session_date, obs.session_id))?;
  let first_taught = per_session.values().map(|obs| obs.session_date).min();
  let last_taught = per_session.values().map(|obs| obs.session_date).max();

  let status = if latest.percentage.is_full()
    && latest.status == CoverageStatus::MostlyCovered
  {
    CoverageStatus::FullyCovered
  } else {
    latest.status
  };

  Some(ProgressSummary {
    plan_id:                     key.plan_id,
    sub_topic_id:                key.sub_topic_id,
    group_id:                    key.group_id,
    overall_status:              status.into(),
    first_taught_date:           first_taught,
    last_taught_date:            last_taught,
    sessions_count:              per_session.len() as u32,
    overall_progress_percentage: latest.percentage,
  })
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn key() -> ProgressKey {
    ProgressKey {
      plan_id:      TeachingPlanId(1),
      sub_topic_id: SubTopicId(10),
      group_id:     GroupId(100),
    }
  }

  fn date(day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2026, 3, day).unwrap() }

  fn obs(
    coverage_id: i64,
    session: i64,
    day: u32,
    pct: i64,
    status: CoverageStatus,
  ) -> CoverageObservation {
    CoverageObservation {
      coverage_id,
      session_id: SessionId(session),
      session_date: date(day),
      created_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
        + Duration::seconds(coverage_id),
      percentage: Percentage::new(pct).unwrap(),
      status,
    }
  }

  #[test]
  fn no_observations_means_no_summary() {
    assert!(summarize(key(), &[]).is_none());
  }

  #[test]
  fn latest_session_wins_and_full_mostly_is_promoted() {
    let observations = [
      obs(1, 1, 2, 40, CoverageStatus::PartiallyCovered),
      obs(2, 2, 9, 100, CoverageStatus::MostlyCovered),
    ];
    let s = summarize(key(), &observations).unwrap();
    assert_eq!(s.sessions_count, 2);
    assert_eq!(s.first_taught_date, Some(date(2)));
    assert_eq!(s.last_taught_date, Some(date(9)));
    assert_eq!(s.overall_progress_percentage.get(), 100);
    assert_eq!(s.overall_status, OverallStatus::from(CoverageStatus::FullyCovered));
  }

  #[test]
  fn input_order_does_not_matter() {
    let mut observations = vec![
      obs(5, 2, 9, 60, CoverageStatus::MostlyCovered),
      obs(1, 1, 2, 40, CoverageStatus::PartiallyCovered),
    ];
    let a = summarize(key(), &observations).unwrap();
    observations.reverse();
    let b = summarize(key(), &observations).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.overall_progress_percentage.get(), 60);
  }

  #[test]
  fn recent_low_coverage_is_not_averaged_away() {
    let observations = [
      obs(1, 1, 2, 100, CoverageStatus::FullyCovered),
      obs(2, 2, 9, 30, CoverageStatus::PartiallyCovered),
    ];
    let s = summarize(key(), &observations).unwrap();
    assert_eq!(s.overall_progress_percentage.get(), 30);
    assert_eq!(s.overall_status, OverallStatus::Introduced);
  }

  #[test]
  fn only_most_recent_record_per_session_counts() {
    let observations = [
      obs(1, 1, 2, 20, CoverageStatus::PartiallyCovered),
      obs(2, 1, 2, 90, CoverageStatus::MostlyCovered),
    ];
    let s = summarize(key(), &observations).unwrap();
    assert_eq!(s.sessions_count, 1);
    assert_eq!(s.overall_progress_percentage.get(), 90);
    assert_eq!(s.overall_status, OverallStatus::InProgress);
  }

  #[test]
  fn stored_status_is_kept_below_full_percentage() {
    let s = summarize(key(), &[obs(1, 1, 2, 99, CoverageStatus::MostlyCovered)]).unwrap();
    assert_eq!(s.overall_status, OverallStatus::InProgress);

    let s = summarize(key(), &[obs(1, 1, 2, 100, CoverageStatus::PartiallyCovered)]).unwrap();
    assert_eq!(s.overall_status, OverallStatus::Introduced);
  }

  #[test]
  fn same_day_sessions_break_ties_by_id() {
    let observations = [
      obs(1, 7, 4, 10, CoverageStatus::PartiallyCovered),
      obs(2, 3, 4, 80, CoverageStatus::MostlyCovered),
    ];
    let s = summarize(key(), &observations).unwrap();
    assert_eq!(s.overall_progress_percentage.get(), 10);
    assert_eq!(s.sessions_count, 2);
  }

  #[test]
  fn levels_round_trip() {
    for status in OverallStatus::iter() {
      assert_eq!(OverallStatus::from_level(status.level()), Some(status));
    }
    assert!(OverallStatus::from_level(5).is_none());
  }
}
