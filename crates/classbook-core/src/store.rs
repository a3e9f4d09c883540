//! The `SessionStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `classbook-store-sqlite`). Higher layers (`classbook-api`) depend on this
//! abstraction, not on any concrete backend.
//!
//! Every write is all-or-nothing: if any entry of a batch is rejected the
//! whole call fails and stored state is unchanged. Writes that touch
//! sub-topic coverage recompute the affected progress summaries before they
//! commit.

use std::future::Future;

use crate::{
  attendance::{AttendanceEntry, AttendanceRecord, GroupAttendance},
  coverage::{CoverageEntry, GroupCoverage, TopicCoverageRecord},
  ids::{GroupId, SessionId, TeachingPlanId},
  ledger::{GroupExecution, GroupExecutionInput, GroupFeedback, GroupPlan, GroupPlanInput},
  progress::{ProgressKey, ProgressQuery, ProgressSummary, Recomputed},
  session::{NewSession, SessionReport},
  workflow::{CompletionProgress, StepPayload},
  Error,
};

/// A backend error that may carry a domain-level [`Error`] (validation,
/// not-found, precondition) behind it.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&Error>;
}

/// Abstraction over a session ledger backend.
pub trait SessionStore: Send + Sync {
  type Error: StoreError;

  // ── Session reports ───────────────────────────────────────────────────

  /// Create a session report against an existing teaching plan.
  fn create_session(
    &self,
    input: NewSession,
  ) -> impl Future<Output = Result<SessionReport, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<SessionReport>, Self::Error>> + Send + '_;

  /// Delete a session and everything recorded under it, recomputing the
  /// progress summaries its coverage fed. Returns `false` if it did not
  /// exist.
  fn delete_session(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Completion workflow ───────────────────────────────────────────────

  /// Save one step's data, replacing what that step saved before, and
  /// advance `current_step` to at least the step's number. With
  /// `mark_completed` the session is also completed in the same
  /// transaction.
  fn save_step(
    &self,
    id: SessionId,
    payload: StepPayload,
    mark_completed: bool,
  ) -> impl Future<Output = Result<SessionReport, Self::Error>> + Send + '_;

  fn save_attendance_step(
    &self,
    id: SessionId,
    groups: Vec<GroupAttendance>,
  ) -> impl Future<Output = Result<SessionReport, Self::Error>> + Send + '_ {
    self.save_step(id, StepPayload::Attendance(groups), false)
  }

  fn save_feedback_step(
    &self,
    id: SessionId,
    groups: Vec<GroupFeedback>,
  ) -> impl Future<Output = Result<SessionReport, Self::Error>> + Send + '_ {
    self.save_step(id, StepPayload::Feedback(groups), false)
  }

  fn save_topic_coverage_step(
    &self,
    id: SessionId,
    groups: Vec<GroupCoverage>,
  ) -> impl Future<Output = Result<SessionReport, Self::Error>> + Send + '_ {
    self.save_step(id, StepPayload::TopicCoverage(groups), false)
  }

  /// Mark the session completed. Fails with
  /// [`Error::PreconditionFailed`] naming the first required step without
  /// data; a no-op if already completed.
  fn mark_completed(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<SessionReport, Self::Error>> + Send + '_;

  fn completion_progress(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<CompletionProgress, Self::Error>> + Send + '_;

  // ── Plan / execution ledger ───────────────────────────────────────────

  fn upsert_plan(
    &self,
    id: SessionId,
    group: GroupId,
    plan: GroupPlanInput,
  ) -> impl Future<Output = Result<GroupPlan, Self::Error>> + Send + '_;

  fn get_plan(
    &self,
    id: SessionId,
    group: GroupId,
  ) -> impl Future<Output = Result<Option<GroupPlan>, Self::Error>> + Send + '_;

  fn upsert_execution(
    &self,
    id: SessionId,
    group: GroupId,
    execution: GroupExecutionInput,
  ) -> impl Future<Output = Result<GroupExecution, Self::Error>> + Send + '_;

  fn get_execution(
    &self,
    id: SessionId,
    group: GroupId,
  ) -> impl Future<Output = Result<Option<GroupExecution>, Self::Error>> + Send + '_;

  // ── Topic coverage ledger ─────────────────────────────────────────────

  /// Replace the coverage entries of one (session, group) pair and
  /// recompute every progress key they touched before or after. The
  /// TopicCoverage step marker follows whether any coverage remains.
  fn record_coverage(
    &self,
    id: SessionId,
    group: GroupId,
    entries: Vec<CoverageEntry>,
  ) -> impl Future<Output = Result<Vec<TopicCoverageRecord>, Self::Error>> + Send + '_;

  fn list_coverage(
    &self,
    id: SessionId,
    group: Option<GroupId>,
  ) -> impl Future<Output = Result<Vec<TopicCoverageRecord>, Self::Error>> + Send + '_;

  // ── Attendance ledger ─────────────────────────────────────────────────

  /// Upsert attendance keyed by (session, student) and mark the
  /// Attendance step saved.
  fn record_attendance(
    &self,
    id: SessionId,
    entries: Vec<AttendanceEntry>,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  fn list_attendance(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  // ── Curriculum progress ───────────────────────────────────────────────

  /// Recompute one summary from the coverage ledger, creating, updating or
  /// deleting it.
  fn recompute_progress(
    &self,
    key: ProgressKey,
  ) -> impl Future<Output = Result<Recomputed, Self::Error>> + Send + '_;

  fn progress_summaries(
    &self,
    query: ProgressQuery,
  ) -> impl Future<Output = Result<Vec<ProgressSummary>, Self::Error>> + Send + '_;

  /// Drop and replay every summary of a plan. Returns how many exist
  /// afterwards.
  fn rebuild_progress(
    &self,
    plan: TeachingPlanId,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}
