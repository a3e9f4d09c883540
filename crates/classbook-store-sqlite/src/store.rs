//! [`SqliteStore`], the SQLite implementation of [`SessionStore`],
//! [`TopicCatalog`] and [`GroupRoster`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use classbook_core::{
  NotFound,
  attendance::{AttendanceEntry, AttendanceRecord},
  coverage::{CoverageEntry, TopicCoverageRecord},
  ids::{GroupId, LessonId, SessionId, StudentId, SubTopicId, TeachingPlanId},
  ledger::{GroupExecution, GroupExecutionInput, GroupPlan, GroupPlanInput},
  progress::{ProgressKey, ProgressQuery, ProgressSummary, Recomputed},
  reference::{GroupRoster, ImportCounts, LessonRef, ReferenceData, SubTopicRef, TopicCatalog},
  session::{NewSession, SessionReport},
  store::SessionStore,
  validate::indexed,
  workflow::{CompletionProgress, CompletionStep, StepPayload, Workflow},
};
use rusqlite::{Connection, TransactionBehavior};

use crate::{
  Result,
  attendance::{self, AttendanceBatch},
  catalog,
  coverage::{self, CoverageBatch},
  ledger::{self, ExecutionBatch},
  progress, reports,
  schema::{SCHEMA, SCHEMA_VERSION},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Classbook session ledger backed by a single SQLite file.
///
/// Cloning is cheap; the connection and workflow are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  workflow: Arc<Workflow>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` in WAL mode and run schema
  /// initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    conn
      .call(|conn| {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
          row.get::<_, String>(0)
        })?;
        Ok(())
      })
      .await?;
    Self::init(conn).await
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::init(tokio_rusqlite::Connection::open_in_memory().await?).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self {
      conn,
      workflow: Arc::new(Workflow::default()),
    };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the required-step set used by completion checks.
  pub fn with_workflow(mut self, workflow: Workflow) -> Self {
    self.workflow = Arc::new(workflow);
    self
  }

  pub fn workflow(&self) -> &Workflow { &self.workflow }

  async fn init_schema(&self) -> Result<()> {
    let version: i64 = self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
      })
      .await?;
    tracing::debug!(version, expected = SCHEMA_VERSION, "schema initialised");
    Ok(())
  }

  /// Load teaching plans, groups, memberships, sub-topics and lessons.
  /// Existing entries are updated in place.
  pub async fn import_reference(&self, data: ReferenceData) -> Result<ImportCounts> {
    let counts = self.write(move |conn| catalog::import(conn, &data)).await?;
    tracing::info!(
      teaching_plans = counts.teaching_plans,
      groups = counts.groups,
      members = counts.members,
      sub_topics = counts.sub_topics,
      lessons = counts.lessons,
      "reference data imported"
    );
    Ok(counts)
  }

  /// Run `f` inside one `IMMEDIATE` transaction. Any error rolls back
  /// everything `f` wrote.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(in_transaction(conn, f))).await?
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(&*conn))).await?
  }

  #[cfg(test)]
  pub(crate) async fn raw<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.read(f).await
  }
}

fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  let out = f(&*tx)?;
  tx.commit()?;
  Ok(out)
}

/// Write one step's payload. Group entries are addressed as `groups[i]` in
/// field errors.
fn save_payload(
  conn: &Connection,
  report: &SessionReport,
  payload: StepPayload,
  now: chrono::DateTime<Utc>,
) -> Result<()> {
  let prefix = |i: usize| indexed("", "groups", i);
  match payload {
    StepPayload::Attendance(groups) => {
      let batches = groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| AttendanceBatch {
          prefix:  prefix(i),
          group:   Some(g.group_id),
          entries: g.records,
        })
        .collect();
      attendance::record(conn, report, batches, now)?;
    }
    StepPayload::Feedback(groups) => {
      let batches = groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| ExecutionBatch {
          prefix: prefix(i),
          group:  g.group_id,
          input:  g.execution,
        })
        .collect();
      ledger::record_executions(conn, report, batches, now)?;
    }
    StepPayload::TopicCoverage(groups) => {
      let batches = groups
        .into_iter()
        .enumerate()
        .map(|(i, g)| CoverageBatch {
          prefix:  prefix(i),
          group:   g.group_id,
          entries: g.entries,
        })
        .collect();
      coverage::record(conn, report, batches, now)?;
    }
  }
  Ok(())
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = crate::Error;

  // ── Session reports ───────────────────────────────────────────────────────

  async fn create_session(&self, input: NewSession) -> Result<SessionReport> {
    input.validate()?;
    let report = self
      .write(move |conn| {
        if !catalog::plan_exists(conn, input.plan_id)? {
          return Err(NotFound::TeachingPlan(input.plan_id).into());
        }
        let id = reports::insert(conn, &input, Utc::now())?;
        reports::require(conn, id)
      })
      .await?;
    tracing::info!(session_id = %report.session_id, plan_id = %report.plan_id, "session created");
    Ok(report)
  }

  async fn get_session(&self, id: SessionId) -> Result<Option<SessionReport>> {
    self.read(move |conn| reports::get(conn, id)).await
  }

  async fn delete_session(&self, id: SessionId) -> Result<bool> {
    let recomputed = self
      .write(move |conn| {
        let keys = progress::keys_for_session(conn, id)?;
        if !reports::delete(conn, id)? {
          return Ok(None);
        }
        progress::recompute_all(conn, keys).map(Some)
      })
      .await?;
    match recomputed {
      Some(outcomes) => {
        tracing::info!(session_id = %id, summaries = outcomes.len(), "session deleted");
        Ok(true)
      }
      None => Ok(false),
    }
  }

  // ── Completion workflow ───────────────────────────────────────────────────

  async fn save_step(
    &self,
    id: SessionId,
    payload: StepPayload,
    mark_completed: bool,
  ) -> Result<SessionReport> {
    payload.ensure_not_empty()?;
    let step = payload.step();
    let workflow = Arc::clone(&self.workflow);

    let report = self
      .write(move |conn| {
        let report = reports::require(conn, id)?;
        let now = Utc::now();
        save_payload(conn, &report, payload, now)?;
        reports::sync_step(conn, &report, step, now)?;
        if mark_completed {
          reports::complete(conn, &workflow, id, now)?;
        }
        reports::require(conn, id)
      })
      .await?;
    tracing::info!(
      session_id = %id,
      step = %step,
      current_step = report.current_step,
      completed = report.is_completed,
      "step saved"
    );
    Ok(report)
  }

  async fn mark_completed(&self, id: SessionId) -> Result<SessionReport> {
    let workflow = Arc::clone(&self.workflow);
    let (report, changed) = self
      .write(move |conn| {
        let changed = reports::complete(conn, &workflow, id, Utc::now())?;
        Ok((reports::require(conn, id)?, changed))
      })
      .await?;
    if changed {
      tracing::info!(session_id = %id, "session completed");
    }
    Ok(report)
  }

  async fn completion_progress(&self, id: SessionId) -> Result<CompletionProgress> {
    let workflow = Arc::clone(&self.workflow);
    self
      .read(move |conn| {
        let report = reports::require(conn, id)?;
        let markers = reports::step_markers(conn, id)?;
        Ok(workflow.progress(&report, &markers))
      })
      .await
  }

  // ── Plan / execution ledger ───────────────────────────────────────────────

  async fn upsert_plan(
    &self,
    id: SessionId,
    group: GroupId,
    plan: GroupPlanInput,
  ) -> Result<GroupPlan> {
    self
      .write(move |conn| {
        let report = reports::require(conn, id)?;
        ledger::record_plan(conn, &report, group, plan, Utc::now())
      })
      .await
  }

  async fn get_plan(&self, id: SessionId, group: GroupId) -> Result<Option<GroupPlan>> {
    self.read(move |conn| ledger::get_plan(conn, id, group)).await
  }

  async fn upsert_execution(
    &self,
    id: SessionId,
    group: GroupId,
    execution: GroupExecutionInput,
  ) -> Result<GroupExecution> {
    let mut saved = self
      .write(move |conn| {
        let report = reports::require(conn, id)?;
        let now = Utc::now();
        let batch = ExecutionBatch {
          prefix: String::new(),
          group,
          input: execution,
        };
        let saved = ledger::record_executions(conn, &report, vec![batch], now)?;
        reports::sync_step(conn, &report, CompletionStep::Feedback, now)?;
        Ok(saved)
      })
      .await?;
    saved.pop().ok_or_else(|| NotFound::Session(id).into())
  }

  async fn get_execution(
    &self,
    id: SessionId,
    group: GroupId,
  ) -> Result<Option<GroupExecution>> {
    self.read(move |conn| ledger::get_execution(conn, id, group)).await
  }

  // ── Topic coverage ledger ─────────────────────────────────────────────────

  async fn record_coverage(
    &self,
    id: SessionId,
    group: GroupId,
    entries: Vec<CoverageEntry>,
  ) -> Result<Vec<TopicCoverageRecord>> {
    let records = self
      .write(move |conn| {
        let report = reports::require(conn, id)?;
        let now = Utc::now();
        let batch = CoverageBatch {
          prefix: String::new(),
          group,
          entries,
        };
        let records = coverage::record(conn, &report, vec![batch], now)?;
        reports::sync_step(conn, &report, CompletionStep::TopicCoverage, now)?;
        Ok(records)
      })
      .await?;
    tracing::debug!(session_id = %id, group_id = %group, rows = records.len(), "coverage recorded");
    Ok(records)
  }

  async fn list_coverage(
    &self,
    id: SessionId,
    group: Option<GroupId>,
  ) -> Result<Vec<TopicCoverageRecord>> {
    self
      .read(move |conn| {
        reports::require(conn, id)?;
        coverage::list(conn, id, group)
      })
      .await
  }

  // ── Attendance ledger ─────────────────────────────────────────────────────

  async fn record_attendance(
    &self,
    id: SessionId,
    entries: Vec<AttendanceEntry>,
  ) -> Result<Vec<AttendanceRecord>> {
    self
      .write(move |conn| {
        let report = reports::require(conn, id)?;
        let now = Utc::now();
        let batch = AttendanceBatch {
          prefix: String::new(),
          group: None,
          entries,
        };
        let records = attendance::record(conn, &report, vec![batch], now)?;
        reports::sync_step(conn, &report, CompletionStep::Attendance, now)?;
        Ok(records)
      })
      .await
  }

  async fn list_attendance(&self, id: SessionId) -> Result<Vec<AttendanceRecord>> {
    self
      .read(move |conn| {
        reports::require(conn, id)?;
        attendance::list(conn, id)
      })
      .await
  }

  // ── Curriculum progress ───────────────────────────────────────────────────

  async fn recompute_progress(&self, key: ProgressKey) -> Result<Recomputed> {
    self.write(move |conn| progress::recompute(conn, key)).await
  }

  async fn progress_summaries(&self, query: ProgressQuery) -> Result<Vec<ProgressSummary>> {
    self
      .read(move |conn| {
        if !catalog::plan_exists(conn, query.plan_id)? {
          return Err(NotFound::TeachingPlan(query.plan_id).into());
        }
        progress::query(conn, query)
      })
      .await
  }

  async fn rebuild_progress(&self, plan: TeachingPlanId) -> Result<usize> {
    let count = self
      .write(move |conn| {
        if !catalog::plan_exists(conn, plan)? {
          return Err(NotFound::TeachingPlan(plan).into());
        }
        progress::rebuild(conn, plan)
      })
      .await?;
    tracing::info!(plan_id = %plan, summaries = count, "progress rebuilt");
    Ok(count)
  }
}

// ─── Reference lookups ───────────────────────────────────────────────────────

impl TopicCatalog for SqliteStore {
  type Error = crate::Error;

  async fn resolve_sub_topic(&self, id: SubTopicId) -> Result<Option<SubTopicRef>> {
    self.read(move |conn| catalog::resolve_sub_topic(conn, id)).await
  }

  async fn resolve_lesson(&self, id: LessonId) -> Result<Option<LessonRef>> {
    self.read(move |conn| catalog::resolve_lesson(conn, id)).await
  }
}

impl GroupRoster for SqliteStore {
  type Error = crate::Error;

  async fn group_members(&self, group: GroupId) -> Result<Vec<StudentId>> {
    self.read(move |conn| catalog::group_members(conn, group)).await
  }

  async fn group_belongs_to_plan(&self, group: GroupId, plan: TeachingPlanId) -> Result<bool> {
    self.read(move |conn| catalog::group_belongs_to_plan(conn, group, plan)).await
  }

  async fn plan_groups(&self, plan: TeachingPlanId) -> Result<Vec<GroupId>> {
    self.read(move |conn| catalog::plan_groups(conn, plan)).await
  }
}
