//! Per-session, per-student attendance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  ids::{GroupId, SessionId, StudentId},
  validate::{ParticipationScore, ValidationErrors, field, parse_enum},
};

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
pub enum AttendanceStatus {
  Present,
  Absent,
  Late,
  Excused,
}

/// One student's attendance as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
  pub student_id:          StudentId,
  pub status:              String,
  pub participation_score: Option<i64>,
  pub comment:             Option<String>,
}

impl AttendanceEntry {
  pub fn new(student_id: StudentId, status: AttendanceStatus) -> Self {
    Self {
      student_id,
      status: status.to_string(),
      participation_score: None,
      comment: None,
    }
  }

  pub fn validate(
    &self,
    prefix: &str,
    errs: &mut ValidationErrors,
  ) -> Option<(AttendanceStatus, Option<ParticipationScore>)> {
    let status =
      parse_enum::<AttendanceStatus>(&self.status, field(prefix, "status"), errs);
    let score = match self.participation_score {
      Some(raw) => Some(ParticipationScore::check(
        raw,
        field(prefix, "participation_score"),
        errs,
      )?),
      None => None,
    };
    Some((status?, score))
  }
}

/// One group's entries in the Attendance step payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupAttendance {
  pub group_id: GroupId,
  #[serde(default)]
  pub records:  Vec<AttendanceEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
  pub session_id:          SessionId,
  pub student_id:          StudentId,
  /// The group the student attended with: the group the record was
  /// submitted under, or the student's own group in the plan.
  pub group_id:            Option<GroupId>,
  pub status:              AttendanceStatus,
  pub participation_score: Option<ParticipationScore>,
  pub comment:             Option<String>,
  pub recorded_at:         DateTime<Utc>,
}
