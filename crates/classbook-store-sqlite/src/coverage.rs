//! Topic coverage rows.
//!
//! A write replaces all rows of one (session, group) pair. When the new
//! batch carries exactly the stored content the rows are left alone, so
//! re-submitting an unchanged step does not churn ids or timestamps.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use classbook_core::{
  NotFound,
  coverage::{CoverageEntry, CoverageFact, CoverageTopic, TopicCoverageRecord},
  ids::{GroupId, SessionId},
  progress::ProgressKey,
  session::SessionReport,
  validate::{ValidationErrors, indexed},
};
use rusqlite::{Connection, params};

use crate::{
  Result, catalog,
  encode::{RawCoverage, encode_dt},
  progress,
};

/// One group's entries within a batch; `prefix` locates the group in the
/// request for field errors.
pub struct CoverageBatch {
  pub prefix:  String,
  pub group:   GroupId,
  pub entries: Vec<CoverageEntry>,
}

/// Validate every entry of every group, replace each group's rows, then
/// recompute every progress key touched before or after the write.
pub fn record(
  conn: &Connection,
  report: &SessionReport,
  batches: Vec<CoverageBatch>,
  now: DateTime<Utc>,
) -> Result<Vec<TopicCoverageRecord>> {
  let groups: Vec<(String, GroupId)> =
    batches.iter().map(|b| (b.prefix.clone(), b.group)).collect();
  catalog::check_batch_groups(conn, report.plan_id, &groups)?;

  let mut errs = ValidationErrors::new();
  let validated: Vec<(GroupId, Vec<Option<CoverageFact>>)> = batches
    .iter()
    .map(|b| {
      let facts = b
        .entries
        .iter()
        .enumerate()
        .map(|(i, entry)| entry.validate(&indexed(&b.prefix, "entries", i), &mut errs))
        .collect();
      (b.group, facts)
    })
    .collect();
  let validated = errs.finish(validated)?;

  let mut touched: BTreeSet<ProgressKey> = BTreeSet::new();
  let mut records = Vec::new();

  for (group, facts) in validated {
    let facts: Vec<CoverageFact> = facts.into_iter().flatten().collect();
    for fact in &facts {
      ensure_resolves(conn, report, &fact.topic)?;
    }

    let existing = list(conn, report.session_id, Some(group))?;
    touched.extend(keys_of(report, group, existing.iter().map(|r| &r.fact)));
    touched.extend(keys_of(report, group, facts.iter()));

    let unchanged = existing.len() == facts.len()
      && existing.iter().zip(&facts).all(|(stored, new)| &stored.fact == new);
    if unchanged {
      records.extend(existing);
      continue;
    }

    conn.execute(
      "DELETE FROM topic_coverage WHERE session_id = ?1 AND group_id = ?2",
      params![report.session_id.get(), group.get()],
    )?;
    for fact in facts {
      records.push(insert(conn, report.session_id, group, fact, now)?);
    }
  }

  for key in touched {
    progress::recompute(conn, key)?;
  }
  Ok(records)
}

/// Sub-topics and lessons must belong to the course the session's plan
/// teaches.
fn ensure_resolves(
  conn: &Connection,
  report: &SessionReport,
  topic: &CoverageTopic,
) -> Result<()> {
  match topic {
    CoverageTopic::SubTopic { topic_id } => {
      if !catalog::sub_topic_in_plan(conn, *topic_id, report.plan_id)? {
        return Err(NotFound::SubTopic(*topic_id).into());
      }
    }
    CoverageTopic::Lesson { topic_id } => {
      if !catalog::lesson_in_plan(conn, *topic_id, report.plan_id)? {
        return Err(NotFound::Lesson(*topic_id).into());
      }
    }
    CoverageTopic::Additional { .. } => {}
  }
  Ok(())
}

/// Progress keys fed by `facts`. Lessons and additional topics have no
/// curriculum-progress identity and feed nothing.
fn keys_of<'a>(
  report: &'a SessionReport,
  group: GroupId,
  facts: impl Iterator<Item = &'a CoverageFact> + 'a,
) -> impl Iterator<Item = ProgressKey> + 'a {
  facts.filter_map(move |fact| {
    fact.topic.sub_topic().map(|sub_topic_id| ProgressKey {
      plan_id: report.plan_id,
      sub_topic_id,
      group_id: group,
    })
  })
}

fn insert(
  conn: &Connection,
  session: SessionId,
  group: GroupId,
  fact: CoverageFact,
  now: DateTime<Utc>,
) -> Result<TopicCoverageRecord> {
  conn.execute(
    "INSERT INTO topic_coverage (
       session_id, group_id, topic_kind, topic_ref, topic_title,
       was_planned, was_covered, coverage_percentage, coverage_status,
       teacher_notes, challenges, created_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    params![
      session.get(),
      group.get(),
      fact.topic.kind().to_string(),
      fact.topic.topic_ref(),
      fact.topic.title(),
      fact.was_planned,
      fact.was_covered,
      fact.coverage_percentage.get(),
      fact.coverage_status.to_string(),
      fact.teacher_notes,
      fact.challenges,
      encode_dt(now),
    ],
  )?;
  Ok(TopicCoverageRecord {
    coverage_id: conn.last_insert_rowid(),
    session_id: session,
    group_id: group,
    fact,
    created_at: now,
  })
}

pub fn list(
  conn: &Connection,
  session: SessionId,
  group: Option<GroupId>,
) -> Result<Vec<TopicCoverageRecord>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {} FROM topic_coverage
     WHERE session_id = ?1 AND (?2 IS NULL OR group_id = ?2)
     ORDER BY group_id, coverage_id",
    RawCoverage::COLUMNS
  ))?;
  let raws = stmt
    .query_map(params![session.get(), group.map(GroupId::get)], RawCoverage::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawCoverage::into_record).collect()
}
