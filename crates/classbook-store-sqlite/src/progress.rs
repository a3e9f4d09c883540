//! Progress summary rows and their recomputation from the coverage ledger.

use std::collections::BTreeSet;

use classbook_core::{
  coverage::CoverageStatus,
  ids::{GroupId, SessionId, SubTopicId, TeachingPlanId},
  progress::{
    CoverageObservation, DataIntegrityWarning, ProgressKey, ProgressQuery, ProgressSummary,
    Recomputed, summarize,
  },
  validate::Percentage,
};
use rusqlite::{Connection, params};

use crate::{
  Error, Result, catalog,
  encode::{RawSummary, decode_date, decode_dt, decode_enum, encode_date},
};

/// Every sub-topic coverage row for `key` across the plan's sessions.
fn observations(conn: &Connection, key: ProgressKey) -> Result<Vec<CoverageObservation>> {
  let mut stmt = conn.prepare(
    "SELECT c.coverage_id, c.session_id, s.session_date, c.created_at,
            c.coverage_percentage, c.coverage_status
     FROM topic_coverage c
     JOIN session_reports s ON s.session_id = c.session_id
     WHERE s.plan_id = ?1
       AND c.topic_kind = 'sub_topic'
       AND c.topic_ref = ?2
       AND c.group_id = ?3",
  )?;
  let rows = stmt
    .query_map(
      params![key.plan_id.get(), key.sub_topic_id.get(), key.group_id.get()],
      |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, i64>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, String>(3)?,
          row.get::<_, i64>(4)?,
          row.get::<_, String>(5)?,
        ))
      },
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(coverage_id, session_id, date, created_at, pct, status)| {
      Ok(CoverageObservation {
        coverage_id,
        session_id: SessionId(session_id),
        session_date: decode_date(&date)?,
        created_at: decode_dt(&created_at)?,
        percentage: Percentage::new(pct).ok_or_else(|| Error::Decode {
          column: "coverage_percentage",
          value:  pct.to_string(),
        })?,
        status: decode_enum::<CoverageStatus>("coverage_status", &status)?,
      })
    })
    .collect()
}

/// Rebuild the summary for `key`: upsert it when contributing records
/// exist, delete it when none do.
///
/// Records whose sub-topic no longer resolves are skipped with a warning
/// rather than failing the surrounding write.
pub fn recompute(conn: &Connection, key: ProgressKey) -> Result<Recomputed> {
  let mut observations = observations(conn, key)?;
  let mut warnings = Vec::new();

  if !observations.is_empty() && catalog::resolve_sub_topic(conn, key.sub_topic_id)?.is_none() {
    for obs in observations.drain(..) {
      let warning = DataIntegrityWarning {
        coverage_id:  obs.coverage_id,
        session_id:   obs.session_id,
        sub_topic_id: key.sub_topic_id,
      };
      tracing::warn!(
        plan_id = %key.plan_id,
        group_id = %key.group_id,
        "data integrity: {warning}; skipping"
      );
      warnings.push(warning);
    }
  }

  let summary = summarize(key, &observations);
  match &summary {
    Some(summary) => upsert(conn, summary)?,
    None => delete(conn, key)?,
  }
  tracing::debug!(
    plan_id = %key.plan_id,
    sub_topic_id = %key.sub_topic_id,
    group_id = %key.group_id,
    present = summary.is_some(),
    "progress recomputed"
  );

  Ok(Recomputed { key, summary, warnings })
}

fn upsert(conn: &Connection, s: &ProgressSummary) -> Result<()> {
  conn.execute(
    "INSERT INTO progress_summaries (
       plan_id, sub_topic_id, group_id, overall_status, first_taught_date,
       last_taught_date, sessions_count, overall_progress_percentage
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
     ON CONFLICT (plan_id, sub_topic_id, group_id) DO UPDATE SET
       overall_status              = excluded.overall_status,
       first_taught_date           = excluded.first_taught_date,
       last_taught_date            = excluded.last_taught_date,
       sessions_count              = excluded.sessions_count,
       overall_progress_percentage = excluded.overall_progress_percentage",
    params![
      s.plan_id.get(),
      s.sub_topic_id.get(),
      s.group_id.get(),
      s.overall_status.level(),
      s.first_taught_date.map(encode_date),
      s.last_taught_date.map(encode_date),
      s.sessions_count,
      s.overall_progress_percentage.get(),
    ],
  )?;
  Ok(())
}

fn delete(conn: &Connection, key: ProgressKey) -> Result<()> {
  conn.execute(
    "DELETE FROM progress_summaries
     WHERE plan_id = ?1 AND sub_topic_id = ?2 AND group_id = ?3",
    params![key.plan_id.get(), key.sub_topic_id.get(), key.group_id.get()],
  )?;
  Ok(())
}

/// Keys fed by the coverage rows of one session.
pub fn keys_for_session(conn: &Connection, session: SessionId) -> Result<BTreeSet<ProgressKey>> {
  let mut stmt = conn.prepare(
    "SELECT DISTINCT s.plan_id, c.topic_ref, c.group_id
     FROM topic_coverage c
     JOIN session_reports s ON s.session_id = c.session_id
     WHERE c.session_id = ?1 AND c.topic_kind = 'sub_topic'",
  )?;
  collect_keys(stmt.query_map(params![session.get()], key_from_row)?)
}

/// Keys with either coverage rows or an existing summary in `plan`.
fn keys_for_plan(conn: &Connection, plan: TeachingPlanId) -> Result<BTreeSet<ProgressKey>> {
  let mut stmt = conn.prepare(
    "SELECT DISTINCT s.plan_id, c.topic_ref, c.group_id
     FROM topic_coverage c
     JOIN session_reports s ON s.session_id = c.session_id
     WHERE s.plan_id = ?1 AND c.topic_kind = 'sub_topic'
     UNION
     SELECT plan_id, sub_topic_id, group_id FROM progress_summaries WHERE plan_id = ?1",
  )?;
  collect_keys(stmt.query_map(params![plan.get()], key_from_row)?)
}

fn key_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProgressKey> {
  Ok(ProgressKey {
    plan_id:      TeachingPlanId(row.get(0)?),
    sub_topic_id: SubTopicId(row.get(1)?),
    group_id:     GroupId(row.get(2)?),
  })
}

fn collect_keys(
  rows: impl Iterator<Item = rusqlite::Result<ProgressKey>>,
) -> Result<BTreeSet<ProgressKey>> {
  Ok(rows.collect::<rusqlite::Result<BTreeSet<_>>>()?)
}

pub fn recompute_all(conn: &Connection, keys: BTreeSet<ProgressKey>) -> Result<Vec<Recomputed>> {
  keys.into_iter().map(|key| recompute(conn, key)).collect()
}

/// Recompute every key of `plan`. Returns the number of summaries left.
pub fn rebuild(conn: &Connection, plan: TeachingPlanId) -> Result<usize> {
  let outcomes = recompute_all(conn, keys_for_plan(conn, plan)?)?;
  Ok(outcomes.iter().filter(|o| o.summary.is_some()).count())
}

pub fn query(conn: &Connection, q: ProgressQuery) -> Result<Vec<ProgressSummary>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM progress_summaries
     WHERE plan_id = ?1
       AND (?2 IS NULL OR sub_topic_id = ?2)
       AND (?3 IS NULL OR group_id = ?3)
     ORDER BY sub_topic_id, group_id",
    RawSummary::COLUMNS
  ))?;
  let raws = stmt
    .query_map(
      params![
        q.plan_id.get(),
        q.sub_topic_id.map(SubTopicId::get),
        q.group_id.map(GroupId::get),
      ],
      RawSummary::from_row,
    )?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawSummary::into_summary).collect()
}
