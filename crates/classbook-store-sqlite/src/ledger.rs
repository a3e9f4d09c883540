//! Group plan and group execution rows. One of each per (session, group);
//! writes replace the row.

use chrono::{DateTime, Utc};
use classbook_core::{
  ids::{GroupId, SessionId},
  ledger::{GroupExecution, GroupExecutionInput, GroupPlan, GroupPlanInput},
  session::SessionReport,
  validate::ValidationErrors,
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::{
  Result, catalog,
  encode::{RawGroupExecution, RawGroupPlan, encode_dt, encode_ids},
};

// ─── Plans ───────────────────────────────────────────────────────────────────

pub fn record_plan(
  conn: &Connection,
  report: &SessionReport,
  group: GroupId,
  input: GroupPlanInput,
  now: DateTime<Utc>,
) -> Result<GroupPlan> {
  catalog::ensure_group_in_plan(conn, group, report.plan_id)?;
  catalog::ensure_topics_resolve(
    conn,
    report.plan_id,
    &input.planned_sub_topics,
    &input.planned_lessons,
  )?;

  let plan = GroupPlan::from_input(report.session_id, group, input, now);
  conn.execute(
    "INSERT INTO group_plans (
       session_id, group_id, planned_objectives, planned_sub_topics,
       planned_lessons, additional_topics, planned_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
     ON CONFLICT (session_id, group_id) DO UPDATE SET
       planned_objectives = excluded.planned_objectives,
       planned_sub_topics = excluded.planned_sub_topics,
       planned_lessons    = excluded.planned_lessons,
       additional_topics  = excluded.additional_topics,
       planned_at         = excluded.planned_at",
    params![
      plan.session_id.get(),
      plan.group_id.get(),
      plan.planned_objectives,
      encode_ids(&plan.planned_sub_topics)?,
      encode_ids(&plan.planned_lessons)?,
      plan.additional_topics,
      encode_dt(plan.planned_at),
    ],
  )?;
  Ok(plan)
}

pub fn get_plan(conn: &Connection, id: SessionId, group: GroupId) -> Result<Option<GroupPlan>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM group_plans WHERE session_id = ?1 AND group_id = ?2",
        RawGroupPlan::COLUMNS
      ),
      params![id.get(), group.get()],
      RawGroupPlan::from_row,
    )
    .optional()?;
  raw.map(RawGroupPlan::into_plan).transpose()
}

// ─── Executions ──────────────────────────────────────────────────────────────

/// One group's execution within a batch; `prefix` locates it in the request
/// for field errors.
pub struct ExecutionBatch {
  pub prefix: String,
  pub group:  GroupId,
  pub input:  GroupExecutionInput,
}

/// Validate every execution of the batch, then replace each group's row.
/// Nothing is written unless the whole batch is valid.
pub fn record_executions(
  conn: &Connection,
  report: &SessionReport,
  batches: Vec<ExecutionBatch>,
  now: DateTime<Utc>,
) -> Result<Vec<GroupExecution>> {
  let groups: Vec<(String, GroupId)> =
    batches.iter().map(|b| (b.prefix.clone(), b.group)).collect();
  catalog::check_batch_groups(conn, report.plan_id, &groups)?;

  let mut errs = ValidationErrors::new();
  let validated: Vec<Option<GroupExecution>> = batches
    .into_iter()
    .map(|b| b.input.into_execution(report.session_id, b.group, now, &b.prefix, &mut errs))
    .collect();
  let executions: Vec<GroupExecution> = errs.finish(validated)?.into_iter().flatten().collect();

  for exec in &executions {
    catalog::ensure_topics_resolve(
      conn,
      report.plan_id,
      &exec.achieved_sub_topics,
      &exec.achieved_lessons,
    )?;
  }
  for exec in &executions {
    upsert_execution(conn, exec)?;
  }
  Ok(executions)
}

fn upsert_execution(conn: &Connection, exec: &GroupExecution) -> Result<()> {
  conn.execute(
    "INSERT INTO group_executions (
       session_id, group_id, achieved_objectives, achieved_sub_topics,
       achieved_lessons, additional_topics_covered, uncovered_topics,
       uncovered_reasons, group_feedback, understanding_level,
       participation_level, teacher_satisfaction, challenges,
       next_session_recommendations, completed_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
     ON CONFLICT (session_id, group_id) DO UPDATE SET
       achieved_objectives          = excluded.achieved_objectives,
       achieved_sub_topics          = excluded.achieved_sub_topics,
       achieved_lessons             = excluded.achieved_lessons,
       additional_topics_covered    = excluded.additional_topics_covered,
       uncovered_topics             = excluded.uncovered_topics,
       uncovered_reasons            = excluded.uncovered_reasons,
       group_feedback               = excluded.group_feedback,
       understanding_level          = excluded.understanding_level,
       participation_level          = excluded.participation_level,
       teacher_satisfaction         = excluded.teacher_satisfaction,
       challenges                   = excluded.challenges,
       next_session_recommendations = excluded.next_session_recommendations,
       completed_at                 = excluded.completed_at",
    params![
      exec.session_id.get(),
      exec.group_id.get(),
      exec.achieved_objectives,
      encode_ids(&exec.achieved_sub_topics)?,
      encode_ids(&exec.achieved_lessons)?,
      exec.additional_topics_covered,
      exec.uncovered_topics,
      exec.uncovered_reasons,
      exec.group_feedback,
      exec.understanding_level.get(),
      exec.participation_level.get(),
      exec.teacher_satisfaction.map(|r| r.get()),
      exec.challenges,
      exec.next_session_recommendations,
      encode_dt(exec.completed_at),
    ],
  )?;
  Ok(())
}

pub fn get_execution(
  conn: &Connection,
  id: SessionId,
  group: GroupId,
) -> Result<Option<GroupExecution>> {
  let raw = conn
    .query_row(
      &format!(
        "SELECT {} FROM group_executions WHERE session_id = ?1 AND group_id = ?2",
        RawGroupExecution::COLUMNS
      ),
      params![id.get(), group.get()],
      RawGroupExecution::from_row,
    )
    .optional()?;
  raw.map(RawGroupExecution::into_execution).transpose()
}
