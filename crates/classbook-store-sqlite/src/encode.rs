//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates `YYYY-MM-DD`.
//! Enumerations use their snake_case wire names, except the overall progress
//! status which is stored as its numeric level. Ordered id lists are compact
//! JSON arrays of integers; nothing outside this module sees that text.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use classbook_core::{
  attendance::{AttendanceRecord, AttendanceStatus},
  coverage::{CoverageFact, CoverageStatus, CoverageTopic, TopicCoverageRecord, TopicKind},
  ids::{GroupId, LessonId, SessionId, StudentId, SubTopicId, TeacherId, TeachingPlanId},
  ledger::{GroupExecution, GroupPlan},
  progress::{OverallStatus, ProgressSummary},
  session::{DeliveryMode, SessionReport},
  validate::{ParticipationScore, Percentage, Rating},
  workflow::StepMarker,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a snake_case enumeration column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

pub fn encode_ids<T: Serialize>(ids: &[T]) -> Result<String> {
  Ok(serde_json::to_string(ids)?)
}

pub fn decode_ids<T: DeserializeOwned>(s: &str) -> Result<Vec<T>> {
  Ok(serde_json::from_str(s)?)
}

fn bounded<T>(column: &'static str, raw: i64, new: fn(i64) -> Option<T>) -> Result<T> {
  new(raw).ok_or_else(|| Error::Decode {
    column,
    value: raw.to_string(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `session_reports` row.
pub struct RawSession {
  pub session_id:   i64,
  pub plan_id:      i64,
  pub title:        String,
  pub session_date: String,
  pub mode:         String,
  pub location:     Option<String>,
  pub notes:        Option<String>,
  pub teacher_id:   i64,
  pub current_step: i64,
  pub is_completed: bool,
  pub created_at:   String,
  pub completed_at: Option<String>,
}

impl RawSession {
  pub const COLUMNS: &'static str = "session_id, plan_id, title, session_date, mode, \
     location, notes, teacher_id, current_step, is_completed, created_at, completed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:   row.get(0)?,
      plan_id:      row.get(1)?,
      title:        row.get(2)?,
      session_date: row.get(3)?,
      mode:         row.get(4)?,
      location:     row.get(5)?,
      notes:        row.get(6)?,
      teacher_id:   row.get(7)?,
      current_step: row.get(8)?,
      is_completed: row.get(9)?,
      created_at:   row.get(10)?,
      completed_at: row.get(11)?,
    })
  }

  pub fn into_session(self) -> Result<SessionReport> {
    Ok(SessionReport {
      session_id:   SessionId(self.session_id),
      plan_id:      TeachingPlanId(self.plan_id),
      title:        self.title,
      session_date: decode_date(&self.session_date)?,
      mode:         decode_enum::<DeliveryMode>("mode", &self.mode)?,
      location:     self.location,
      notes:        self.notes,
      teacher_id:   TeacherId(self.teacher_id),
      current_step: u32::try_from(self.current_step).map_err(|_| Error::Decode {
        column: "current_step",
        value:  self.current_step.to_string(),
      })?,
      is_completed: self.is_completed,
      created_at:   decode_dt(&self.created_at)?,
      completed_at: self.completed_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

pub struct RawStepMarker {
  pub step_number: i64,
  pub step_name:   String,
  pub saved_at:    String,
}

impl RawStepMarker {
  pub fn into_marker(self) -> Result<StepMarker> {
    Ok(StepMarker {
      step_number: u32::try_from(self.step_number).map_err(|_| Error::Decode {
        column: "step_number",
        value:  self.step_number.to_string(),
      })?,
      step_name:   self.step_name,
      saved_at:    decode_dt(&self.saved_at)?,
    })
  }
}

pub struct RawGroupPlan {
  pub session_id:         i64,
  pub group_id:           i64,
  pub planned_objectives: Option<String>,
  pub planned_sub_topics: String,
  pub planned_lessons:    String,
  pub additional_topics:  Option<String>,
  pub planned_at:         String,
}

impl RawGroupPlan {
  pub const COLUMNS: &'static str = "session_id, group_id, planned_objectives, \
     planned_sub_topics, planned_lessons, additional_topics, planned_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:         row.get(0)?,
      group_id:           row.get(1)?,
      planned_objectives: row.get(2)?,
      planned_sub_topics: row.get(3)?,
      planned_lessons:    row.get(4)?,
      additional_topics:  row.get(5)?,
      planned_at:         row.get(6)?,
    })
  }

  pub fn into_plan(self) -> Result<GroupPlan> {
    Ok(GroupPlan {
      session_id:         SessionId(self.session_id),
      group_id:           GroupId(self.group_id),
      planned_objectives: self.planned_objectives,
      planned_sub_topics: decode_ids::<SubTopicId>(&self.planned_sub_topics)?,
      planned_lessons:    decode_ids::<LessonId>(&self.planned_lessons)?,
      additional_topics:  self.additional_topics,
      planned_at:         decode_dt(&self.planned_at)?,
    })
  }
}

pub struct RawGroupExecution {
  pub session_id:                   i64,
  pub group_id:                     i64,
  pub achieved_objectives:          Option<String>,
  pub achieved_sub_topics:          String,
  pub achieved_lessons:             String,
  pub additional_topics_covered:    Option<String>,
  pub uncovered_topics:             Option<String>,
  pub uncovered_reasons:            Option<String>,
  pub group_feedback:               Option<String>,
  pub understanding_level:          i64,
  pub participation_level:          i64,
  pub teacher_satisfaction:         Option<i64>,
  pub challenges:                   Option<String>,
  pub next_session_recommendations: Option<String>,
  pub completed_at:                 String,
}

impl RawGroupExecution {
  pub const COLUMNS: &'static str = "session_id, group_id, achieved_objectives, \
     achieved_sub_topics, achieved_lessons, additional_topics_covered, \
     uncovered_topics, uncovered_reasons, group_feedback, understanding_level, \
     participation_level, teacher_satisfaction, challenges, \
     next_session_recommendations, completed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:                   row.get(0)?,
      group_id:                     row.get(1)?,
      achieved_objectives:          row.get(2)?,
      achieved_sub_topics:          row.get(3)?,
      achieved_lessons:             row.get(4)?,
      additional_topics_covered:    row.get(5)?,
      uncovered_topics:             row.get(6)?,
      uncovered_reasons:            row.get(7)?,
      group_feedback:               row.get(8)?,
      understanding_level:          row.get(9)?,
      participation_level:          row.get(10)?,
      teacher_satisfaction:         row.get(11)?,
      challenges:                   row.get(12)?,
      next_session_recommendations: row.get(13)?,
      completed_at:                 row.get(14)?,
    })
  }

  pub fn into_execution(self) -> Result<GroupExecution> {
    Ok(GroupExecution {
      session_id:                   SessionId(self.session_id),
      group_id:                     GroupId(self.group_id),
      achieved_objectives:          self.achieved_objectives,
      achieved_sub_topics:          decode_ids::<SubTopicId>(&self.achieved_sub_topics)?,
      achieved_lessons:             decode_ids::<LessonId>(&self.achieved_lessons)?,
      additional_topics_covered:    self.additional_topics_covered,
      uncovered_topics:             self.uncovered_topics,
      uncovered_reasons:            self.uncovered_reasons,
      group_feedback:               self.group_feedback,
      understanding_level:          bounded(
        "understanding_level",
        self.understanding_level,
        Rating::new,
      )?,
      participation_level:          bounded(
        "participation_level",
        self.participation_level,
        Rating::new,
      )?,
      teacher_satisfaction:         self
        .teacher_satisfaction
        .map(|raw| bounded("teacher_satisfaction", raw, Rating::new))
        .transpose()?,
      challenges:                   self.challenges,
      next_session_recommendations: self.next_session_recommendations,
      completed_at:                 decode_dt(&self.completed_at)?,
    })
  }
}

pub struct RawCoverage {
  pub coverage_id:         i64,
  pub session_id:          i64,
  pub group_id:            i64,
  pub topic_kind:          String,
  pub topic_ref:           Option<i64>,
  pub topic_title:         Option<String>,
  pub was_planned:         bool,
  pub was_covered:         bool,
  pub coverage_percentage: i64,
  pub coverage_status:     String,
  pub teacher_notes:       Option<String>,
  pub challenges:          Option<String>,
  pub created_at:          String,
}

impl RawCoverage {
  pub const COLUMNS: &'static str = "coverage_id, session_id, group_id, topic_kind, \
     topic_ref, topic_title, was_planned, was_covered, coverage_percentage, \
     coverage_status, teacher_notes, challenges, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      coverage_id:         row.get(0)?,
      session_id:          row.get(1)?,
      group_id:            row.get(2)?,
      topic_kind:          row.get(3)?,
      topic_ref:           row.get(4)?,
      topic_title:         row.get(5)?,
      was_planned:         row.get(6)?,
      was_covered:         row.get(7)?,
      coverage_percentage: row.get(8)?,
      coverage_status:     row.get(9)?,
      teacher_notes:       row.get(10)?,
      challenges:          row.get(11)?,
      created_at:          row.get(12)?,
    })
  }

  pub fn into_record(self) -> Result<TopicCoverageRecord> {
    let kind = decode_enum::<TopicKind>("topic_kind", &self.topic_kind)?;
    let missing = |column: &'static str| Error::Decode {
      column,
      value: format!("NULL for {kind} row {}", self.coverage_id),
    };
    let topic = match kind {
      TopicKind::SubTopic => CoverageTopic::SubTopic {
        topic_id: SubTopicId(self.topic_ref.ok_or_else(|| missing("topic_ref"))?),
      },
      TopicKind::Lesson => CoverageTopic::Lesson {
        topic_id: LessonId(self.topic_ref.ok_or_else(|| missing("topic_ref"))?),
      },
      TopicKind::Additional => CoverageTopic::Additional {
        topic_title: self.topic_title.clone().ok_or_else(|| missing("topic_title"))?,
      },
    };

    Ok(TopicCoverageRecord {
      coverage_id: self.coverage_id,
      session_id:  SessionId(self.session_id),
      group_id:    GroupId(self.group_id),
      fact:        CoverageFact {
        topic,
        was_planned: self.was_planned,
        was_covered: self.was_covered,
        coverage_percentage: bounded(
          "coverage_percentage",
          self.coverage_percentage,
          Percentage::new,
        )?,
        coverage_status: decode_enum::<CoverageStatus>(
          "coverage_status",
          &self.coverage_status,
        )?,
        teacher_notes: self.teacher_notes,
        challenges: self.challenges,
      },
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawAttendance {
  pub session_id:          i64,
  pub student_id:          i64,
  pub group_id:            Option<i64>,
  pub status:              String,
  pub participation_score: Option<i64>,
  pub comment:             Option<String>,
  pub recorded_at:         String,
}

impl RawAttendance {
  pub const COLUMNS: &'static str = "session_id, student_id, group_id, status, \
     participation_score, comment, recorded_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:          row.get(0)?,
      student_id:          row.get(1)?,
      group_id:            row.get(2)?,
      status:              row.get(3)?,
      participation_score: row.get(4)?,
      comment:             row.get(5)?,
      recorded_at:         row.get(6)?,
    })
  }

  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
      session_id:          SessionId(self.session_id),
      student_id:          StudentId(self.student_id),
      group_id:            self.group_id.map(GroupId),
      status:              decode_enum::<AttendanceStatus>("status", &self.status)?,
      participation_score: self
        .participation_score
        .map(|raw| bounded("participation_score", raw, ParticipationScore::new))
        .transpose()?,
      comment:             self.comment,
      recorded_at:         decode_dt(&self.recorded_at)?,
    })
  }
}

pub struct RawSummary {
  pub plan_id:                     i64,
  pub sub_topic_id:                i64,
  pub group_id:                    i64,
  pub overall_status:              i64,
  pub first_taught_date:           Option<String>,
  pub last_taught_date:            Option<String>,
  pub sessions_count:              i64,
  pub overall_progress_percentage: i64,
}

impl RawSummary {
  pub const COLUMNS: &'static str = "plan_id, sub_topic_id, group_id, overall_status, \
     first_taught_date, last_taught_date, sessions_count, overall_progress_percentage";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      plan_id:                     row.get(0)?,
      sub_topic_id:                row.get(1)?,
      group_id:                    row.get(2)?,
      overall_status:              row.get(3)?,
      first_taught_date:           row.get(4)?,
      last_taught_date:            row.get(5)?,
      sessions_count:              row.get(6)?,
      overall_progress_percentage: row.get(7)?,
    })
  }

  pub fn into_summary(self) -> Result<ProgressSummary> {
    let bad = |column: &'static str, raw: i64| Error::Decode {
      column,
      value: raw.to_string(),
    };
    Ok(ProgressSummary {
      plan_id:                     TeachingPlanId(self.plan_id),
      sub_topic_id:                SubTopicId(self.sub_topic_id),
      group_id:                    GroupId(self.group_id),
      overall_status:              u8::try_from(self.overall_status)
        .ok()
        .and_then(OverallStatus::from_level)
        .ok_or_else(|| bad("overall_status", self.overall_status))?,
      first_taught_date:           self.first_taught_date.as_deref().map(decode_date).transpose()?,
      last_taught_date:            self.last_taught_date.as_deref().map(decode_date).transpose()?,
      sessions_count:              u32::try_from(self.sessions_count)
        .map_err(|_| bad("sessions_count", self.sessions_count))?,
      overall_progress_percentage: bounded(
        "overall_progress_percentage",
        self.overall_progress_percentage,
        Percentage::new,
      )?,
    })
  }
}
