//! Topic coverage facts.
//!
//! Each [`TopicCoverageRecord`] states how one topic was treated for one
//! group in one session. Coverage percentage and coverage status are
//! supplied independently and each is only range-checked; a teacher may
//! report 80% and still call it partially covered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  ids::{GroupId, LessonId, SessionId, SubTopicId},
  validate::{Percentage, ValidationErrors, field, parse_enum, require_text},
};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
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
pub enum TopicKind {
  SubTopic,
  Lesson,
  /// An ad-hoc topic with no curriculum identity.
  Additional,
}

/// How thoroughly a topic was taught in one session.
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
pub enum CoverageStatus {
  NotCovered       = 0,
  PartiallyCovered = 1,
  MostlyCovered    = 2,
  FullyCovered     = 3,
}

impl CoverageStatus {
  pub const fn level(self) -> u8 { self as u8 }
}

// ─── Topic identity ──────────────────────────────────────────────────────────

/// The topic a coverage fact is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "topic_kind", rename_all = "snake_case")]
pub enum CoverageTopic {
  SubTopic { topic_id: SubTopicId },
  Lesson { topic_id: LessonId },
  Additional { topic_title: String },
}

impl CoverageTopic {
  pub fn kind(&self) -> TopicKind {
    match self {
      CoverageTopic::SubTopic { .. } => TopicKind::SubTopic,
      CoverageTopic::Lesson { .. } => TopicKind::Lesson,
      CoverageTopic::Additional { .. } => TopicKind::Additional,
    }
  }

  /// The curriculum reference; `None` for additional topics.
  pub fn topic_ref(&self) -> Option<i64> {
    match self {
      CoverageTopic::SubTopic { topic_id } => Some(topic_id.get()),
      CoverageTopic::Lesson { topic_id } => Some(topic_id.get()),
      CoverageTopic::Additional { .. } => None,
    }
  }

  pub fn title(&self) -> Option<&str> {
    match self {
      CoverageTopic::Additional { topic_title } => Some(topic_title),
      _ => None,
    }
  }

  /// Only sub-topic facts feed curriculum progress.
  pub fn sub_topic(&self) -> Option<SubTopicId> {
    match self {
      CoverageTopic::SubTopic { topic_id } => Some(*topic_id),
      _ => None,
    }
  }
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// A coverage entry as submitted. Enumerations arrive as their wire names so
/// an unknown value is reported against its field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEntry {
  pub topic_kind:          String,
  pub topic_id:            Option<i64>,
  pub topic_title:         Option<String>,
  #[serde(default)]
  pub was_planned:         bool,
  #[serde(default)]
  pub was_covered:         bool,
  pub coverage_percentage: i64,
  pub coverage_status:     String,
  pub teacher_notes:       Option<String>,
  pub challenges:          Option<String>,
}

impl CoverageEntry {
  pub fn sub_topic(id: SubTopicId, percentage: i64, status: CoverageStatus) -> Self {
    Self::with_topic(TopicKind::SubTopic, Some(id.get()), None, percentage, status)
  }

  pub fn lesson(id: LessonId, percentage: i64, status: CoverageStatus) -> Self {
    Self::with_topic(TopicKind::Lesson, Some(id.get()), None, percentage, status)
  }

  pub fn additional(
    title: impl Into<String>,
    percentage: i64,
    status: CoverageStatus,
  ) -> Self {
    Self::with_topic(TopicKind::Additional, None, Some(title.into()), percentage, status)
  }

  fn with_topic(
    kind: TopicKind,
    topic_id: Option<i64>,
    topic_title: Option<String>,
    percentage: i64,
    status: CoverageStatus,
  ) -> Self {
    Self {
      topic_kind: kind.to_string(),
      topic_id,
      topic_title,
      was_planned: false,
      was_covered: percentage > 0,
      coverage_percentage: percentage,
      coverage_status: status.to_string(),
      teacher_notes: None,
      challenges: None,
    }
  }

  /// Check every field and produce the typed fact. Errors are recorded
  /// under `prefix`.
  pub fn validate(
    &self,
    prefix: &str,
    errs: &mut ValidationErrors,
  ) -> Option<CoverageFact> {
    let kind =
      parse_enum::<TopicKind>(&self.topic_kind, field(prefix, "topic_kind"), errs);

    let topic = kind.and_then(|kind| match kind {
      TopicKind::SubTopic | TopicKind::Lesson => {
        let Some(raw) = self.topic_id else {
          errs.push(
            field(prefix, "topic_id"),
            format!("required for {kind} entries"),
          );
          return None;
        };
        Some(if kind == TopicKind::SubTopic {
          CoverageTopic::SubTopic { topic_id: SubTopicId(raw) }
        } else {
          CoverageTopic::Lesson { topic_id: LessonId(raw) }
        })
      }
      TopicKind::Additional => {
        if self.topic_id.is_some() {
          errs.push(
            field(prefix, "topic_id"),
            "must be empty for additional entries",
          );
          return None;
        }
        let title = require_text(
          self.topic_title.as_deref(),
          field(prefix, "topic_title"),
          errs,
        )?;
        Some(CoverageTopic::Additional { topic_title: title })
      }
    });

    let percentage = Percentage::check(
      self.coverage_percentage,
      field(prefix, "coverage_percentage"),
      errs,
    );
    let status = parse_enum::<CoverageStatus>(
      &self.coverage_status,
      field(prefix, "coverage_status"),
      errs,
    );

    Some(CoverageFact {
      topic:               topic?,
      was_planned:         self.was_planned,
      was_covered:         self.was_covered,
      coverage_percentage: percentage?,
      coverage_status:     status?,
      teacher_notes:       self.teacher_notes.clone(),
      challenges:          self.challenges.clone(),
    })
  }
}

/// One group's entries in the TopicCoverage step payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCoverage {
  pub group_id: GroupId,
  #[serde(default)]
  pub entries:  Vec<CoverageEntry>,
}

// ─── Stored fact ─────────────────────────────────────────────────────────────

/// The validated content of a coverage record, independent of where and
/// when it was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageFact {
  #[serde(flatten)]
  pub topic:               CoverageTopic,
  pub was_planned:         bool,
  pub was_covered:         bool,
  pub coverage_percentage: Percentage,
  pub coverage_status:     CoverageStatus,
  pub teacher_notes:       Option<String>,
  pub challenges:          Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCoverageRecord {
  pub coverage_id: i64,
  pub session_id:  SessionId,
  pub group_id:    GroupId,
  #[serde(flatten)]
  pub fact:        CoverageFact,
  pub created_at:  DateTime<Utc>,
}
