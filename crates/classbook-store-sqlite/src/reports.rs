//! Session report rows and their step markers.

use chrono::{DateTime, Utc};
use classbook_core::{
  NotFound,
  ids::SessionId,
  session::{NewSession, SessionReport},
  workflow::{CompletionStep, StepMarker, Workflow, advance},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Result,
  encode::{RawSession, RawStepMarker, encode_date, encode_dt},
};

pub fn insert(conn: &Connection, input: &NewSession, now: DateTime<Utc>) -> Result<SessionId> {
  conn.execute(
    "INSERT INTO session_reports (
       plan_id, title, session_date, mode, location, notes, teacher_id,
       current_step, is_completed, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8)",
    params![
      input.plan_id.get(),
      input.title.trim(),
      encode_date(input.session_date),
      input.mode.to_string(),
      input.location,
      input.notes,
      input.teacher_id.get(),
      encode_dt(now),
    ],
  )?;
  Ok(SessionId(conn.last_insert_rowid()))
}

pub fn get(conn: &Connection, id: SessionId) -> Result<Option<SessionReport>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM session_reports WHERE session_id = ?1", RawSession::COLUMNS),
      params![id.get()],
      RawSession::from_row,
    )
    .optional()?;
  raw.map(RawSession::into_session).transpose()
}

/// Like [`get`], but a missing session is [`NotFound::Session`].
pub fn require(conn: &Connection, id: SessionId) -> Result<SessionReport> {
  get(conn, id)?.ok_or_else(|| NotFound::Session(id).into())
}

pub fn delete(conn: &Connection, id: SessionId) -> Result<bool> {
  let n = conn.execute(
    "DELETE FROM session_reports WHERE session_id = ?1",
    params![id.get()],
  )?;
  Ok(n > 0)
}

pub fn step_markers(conn: &Connection, id: SessionId) -> Result<Vec<StepMarker>> {
  let mut stmt = conn.prepare(
    "SELECT step_number, step_name, saved_at FROM session_steps
     WHERE session_id = ?1 ORDER BY step_number",
  )?;
  let raws = stmt
    .query_map(params![id.get()], |row| {
      Ok(RawStepMarker {
        step_number: row.get(0)?,
        step_name:   row.get(1)?,
        saved_at:    row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawStepMarker::into_marker).collect()
}

/// Bring the marker of `step` in line with the ledger rows behind it.
///
/// A step with at least one stored row is marked saved at `now` and moves
/// `current_step` forward to it. A step whose rows are all gone loses its
/// marker; `current_step` stays where it is.
pub fn sync_step(
  conn: &Connection,
  report: &SessionReport,
  step: CompletionStep,
  now: DateTime<Utc>,
) -> Result<()> {
  let id = report.session_id;
  if !step_has_rows(conn, id, step)? {
    conn.execute(
      "DELETE FROM session_steps WHERE session_id = ?1 AND step_number = ?2",
      params![id.get(), step.number()],
    )?;
    return Ok(());
  }

  conn.execute(
    "INSERT INTO session_steps (session_id, step_number, step_name, saved_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (session_id, step_number) DO UPDATE
     SET step_name = excluded.step_name, saved_at = excluded.saved_at",
    params![id.get(), step.number(), step.name(), encode_dt(now)],
  )?;
  conn.execute(
    "UPDATE session_reports SET current_step = ?2 WHERE session_id = ?1",
    params![id.get(), advance(report.current_step, step)],
  )?;
  Ok(())
}

fn step_has_rows(conn: &Connection, id: SessionId, step: CompletionStep) -> Result<bool> {
  let table = match step {
    CompletionStep::Attendance => "attendance",
    CompletionStep::Feedback => "group_executions",
    CompletionStep::TopicCoverage => "topic_coverage",
  };
  let exists: bool = conn.query_row(
    &format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE session_id = ?1)"),
    params![id.get()],
    |row| row.get(0),
  )?;
  Ok(exists)
}

/// Complete the session if every required step has data. Already-completed
/// sessions are left as they are.
pub fn complete(
  conn: &Connection,
  workflow: &Workflow,
  id: SessionId,
  now: DateTime<Utc>,
) -> Result<bool> {
  let report = require(conn, id)?;
  if report.is_completed {
    return Ok(false);
  }
  workflow.ensure_completable(&step_markers(conn, id)?)?;
  conn.execute(
    "UPDATE session_reports SET is_completed = 1, completed_at = ?2 WHERE session_id = ?1",
    params![id.get(), encode_dt(now)],
  )?;
  Ok(true)
}
