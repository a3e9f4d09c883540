//! Attendance rows, keyed by (session, student).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use classbook_core::{
  attendance::{AttendanceEntry, AttendanceRecord},
  ids::{GroupId, SessionId, StudentId},
  session::SessionReport,
  validate::{ValidationErrors, field, indexed},
};
use rusqlite::{Connection, params};

use crate::{
  Result, catalog,
  encode::{RawAttendance, encode_dt},
};

/// A run of attendance entries, optionally submitted under one group.
pub struct AttendanceBatch {
  pub prefix:  String,
  pub group:   Option<GroupId>,
  pub entries: Vec<AttendanceEntry>,
}

/// Validate the whole batch, then upsert one row per student.
///
/// Every student must belong to some group of the session's teaching plan,
/// and may appear only once per call. Entries submitted under a group must
/// name members of that group; entries without one are stored under the
/// student's own group (the lowest id if they are in several).
pub fn record(
  conn: &Connection,
  report: &SessionReport,
  batches: Vec<AttendanceBatch>,
  now: DateTime<Utc>,
) -> Result<Vec<AttendanceRecord>> {
  let groups: Vec<(String, GroupId)> = batches
    .iter()
    .filter_map(|b| b.group.map(|g| (b.prefix.clone(), g)))
    .collect();
  catalog::check_batch_groups(conn, report.plan_id, &groups)?;

  let roster = catalog::plan_roster(conn, report.plan_id)?;
  let mut seen: BTreeSet<StudentId> = BTreeSet::new();
  let mut errs = ValidationErrors::new();
  let mut records = Vec::new();

  for batch in batches {
    for (i, entry) in batch.entries.into_iter().enumerate() {
      let path = indexed(&batch.prefix, "records", i);
      let student_id = field(&path, "student_id");
      let group_id = match (roster.get(&entry.student_id), batch.group) {
        (None, _) => {
          errs.push(
            student_id,
            format!(
              "student {} is not a member of any group of teaching plan {}",
              entry.student_id, report.plan_id
            ),
          );
          None
        }
        (Some(member_of), Some(group)) if !member_of.contains(&group) => {
          errs.push(
            student_id,
            format!("student {} is not a member of group {group}", entry.student_id),
          );
          None
        }
        (Some(_), Some(group)) => Some(group),
        (Some(member_of), None) => member_of.first().copied(),
      };
      if group_id.is_some() && !seen.insert(entry.student_id) {
        errs.push(
          field(&path, "student_id"),
          format!("student {} appears more than once", entry.student_id),
        );
      }
      if let Some((status, score)) = entry.validate(&path, &mut errs) {
        records.push(AttendanceRecord {
          session_id: report.session_id,
          student_id: entry.student_id,
          group_id,
          status,
          participation_score: score,
          comment: entry.comment,
          recorded_at: now,
        });
      }
    }
  }
  let records = errs.finish(records)?;

  for record in &records {
    conn.execute(
      "INSERT INTO attendance (
         session_id, student_id, group_id, status, participation_score,
         comment, recorded_at
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
       ON CONFLICT (session_id, student_id) DO UPDATE SET
         group_id            = excluded.group_id,
         status              = excluded.status,
         participation_score = excluded.participation_score,
         comment             = excluded.comment,
         recorded_at         = excluded.recorded_at",
      params![
        record.session_id.get(),
        record.student_id.get(),
        record.group_id.map(GroupId::get),
        record.status.to_string(),
        record.participation_score.map(|s| s.get()),
        record.comment,
        encode_dt(record.recorded_at),
      ],
    )?;
  }
  Ok(records)
}

pub fn list(conn: &Connection, session: SessionId) -> Result<Vec<AttendanceRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM attendance WHERE session_id = ?1 ORDER BY student_id",
    RawAttendance::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![session.get()], RawAttendance::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawAttendance::into_record).collect()
}
