//! The session completion workflow.
//!
//! A session report moves through an ordered list of steps. The state is a
//! plain `current_step` integer plus an `is_completed` flag on the session;
//! which steps actually hold data is recorded as [`StepMarker`]s keyed by
//! step number. Markers for step numbers this build does not know are kept
//! and reported, never reinterpreted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
  attendance::GroupAttendance,
  coverage::GroupCoverage,
  ids::SessionId,
  ledger::GroupFeedback,
  session::SessionReport,
  validate::ValidationErrors,
  Error, Result,
};

// ─── Steps ───────────────────────────────────────────────────────────────────

/// A named, numbered completion step.
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
  IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum CompletionStep {
  Attendance    = 1,
  Feedback      = 2,
  #[strum(to_string = "TopicCoverage", serialize = "topic_coverage")]
  TopicCoverage = 3,
}

impl CompletionStep {
  pub const fn number(self) -> u32 { self as u32 }

  pub fn name(self) -> &'static str { self.into() }

  pub fn from_number(number: u32) -> Option<Self> {
    Self::iter().find(|s| s.number() == number)
  }
}

/// `current_step` after saving `step`: it never moves backwards.
pub fn advance(current_step: u32, step: CompletionStep) -> u32 {
  current_step.max(step.number())
}

// ─── Progress records ────────────────────────────────────────────────────────

/// Evidence that a step has at least one saved payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepMarker {
  pub step_number: u32,
  pub step_name:   String,
  pub saved_at:    DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepStatus {
  pub step_number: u32,
  pub step_name:   String,
  pub required:    bool,
  pub saved:       bool,
  pub saved_at:    Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionProgress {
  pub session_id:         SessionId,
  pub current_step:       u32,
  pub total_steps:        u32,
  pub is_completed:       bool,
  /// Whether every required step has a saved payload.
  pub all_required_saved: bool,
  pub per_step_status:    Vec<StepStatus>,
}

// ─── Workflow ────────────────────────────────────────────────────────────────

/// The ordered set of steps a session must have saved before it can be
/// marked completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
  required: Vec<CompletionStep>,
}

impl Default for Workflow {
  fn default() -> Self { Self::new(CompletionStep::iter()) }
}

impl Workflow {
  pub fn new(steps: impl IntoIterator<Item = CompletionStep>) -> Self {
    let mut required: Vec<CompletionStep> = steps.into_iter().collect();
    required.sort();
    required.dedup();
    Self { required }
  }

  pub fn required(&self) -> &[CompletionStep] { &self.required }

  pub fn total_steps(&self) -> u32 { self.required.len() as u32 }

  /// The lowest-numbered required step with no marker.
  pub fn first_missing(&self, saved: &[StepMarker]) -> Option<CompletionStep> {
    self
      .required
      .iter()
      .copied()
      .find(|step| !saved.iter().any(|m| m.step_number == step.number()))
  }

  pub fn ensure_completable(&self, saved: &[StepMarker]) -> Result<()> {
    match self.first_missing(saved) {
      Some(missing) => Err(Error::PreconditionFailed { missing }),
      None => Ok(()),
    }
  }

  pub fn progress(
    &self,
    session: &SessionReport,
    saved: &[StepMarker],
  ) -> CompletionProgress {
    let mut per_step_status: Vec<StepStatus> = self
      .required
      .iter()
      .map(|step| {
        let marker = saved.iter().find(|m| m.step_number == step.number());
        StepStatus {
          step_number: step.number(),
          step_name:   step.name().to_owned(),
          required:    true,
          saved:       marker.is_some(),
          saved_at:    marker.map(|m| m.saved_at),
        }
      })
      .collect();

    // Saved steps outside the required set (e.g. from a newer workflow).
    for marker in saved {
      if !per_step_status.iter().any(|s| s.step_number == marker.step_number) {
        per_step_status.push(StepStatus {
          step_number: marker.step_number,
          step_name:   marker.step_name.clone(),
          required:    false,
          saved:       true,
          saved_at:    Some(marker.saved_at),
        });
      }
    }
    per_step_status.sort_by_key(|s| s.step_number);

    CompletionProgress {
      session_id: session.session_id,
      current_step: session.current_step,
      total_steps: self.total_steps(),
      is_completed: session.is_completed,
      all_required_saved: self.first_missing(saved).is_none(),
      per_step_status,
    }
  }
}

// ─── Submissions ─────────────────────────────────────────────────────────────

/// The typed data of one step.
#[derive(Debug, Clone)]
pub enum StepPayload {
  Attendance(Vec<GroupAttendance>),
  Feedback(Vec<GroupFeedback>),
  TopicCoverage(Vec<GroupCoverage>),
}

impl StepPayload {
  pub fn step(&self) -> CompletionStep {
    match self {
      StepPayload::Attendance(_) => CompletionStep::Attendance,
      StepPayload::Feedback(_) => CompletionStep::Feedback,
      StepPayload::TopicCoverage(_) => CompletionStep::TopicCoverage,
    }
  }

  pub fn group_count(&self) -> usize {
    match self {
      StepPayload::Attendance(g) => g.len(),
      StepPayload::Feedback(g) => g.len(),
      StepPayload::TopicCoverage(g) => g.len(),
    }
  }

  /// Rows the payload writes: attendance records, one execution per group,
  /// or coverage entries.
  pub fn entry_count(&self) -> usize {
    match self {
      StepPayload::Attendance(g) => g.iter().map(|g| g.records.len()).sum(),
      StepPayload::Feedback(g) => g.len(),
      StepPayload::TopicCoverage(g) => g.iter().map(|g| g.entries.len()).sum(),
    }
  }

  /// A step payload must carry at least one record, not just group headers.
  pub fn ensure_not_empty(&self) -> Result<()> {
    if self.entry_count() == 0 {
      return Err(Error::Validation(ValidationErrors::single(
        "payload",
        format!("{} step must contain at least one entry", self.step()),
      )));
    }
    Ok(())
  }
}

/// An untyped step submission as received from a client.
///
/// `step_number` and `step_name` must name the same step; `payload` is
/// decoded according to that step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSubmission {
  pub step_number:    u32,
  pub step_name:      String,
  pub payload:        serde_json::Value,
  #[serde(default)]
  pub mark_completed: bool,
}

impl StepSubmission {
  /// Check the step header and decode the payload.
  pub fn into_payload(self) -> Result<StepPayload> {
    let mut errs = ValidationErrors::new();

    let by_number = CompletionStep::from_number(self.step_number);
    if by_number.is_none() {
      errs.push("step_number", format!("unknown step number {}", self.step_number));
    }
    let by_name = self.step_name.parse::<CompletionStep>().ok();
    if by_name.is_none() {
      errs.push("step_name", format!("unknown step name {:?}", self.step_name));
    }

    let step = match (by_number, by_name) {
      (Some(n), Some(m)) if n == m => n,
      (Some(n), Some(m)) => {
        errs.push(
          "step_name",
          format!("step {} is {n}, not {m}", self.step_number),
        );
        return Err(Error::Validation(errs));
      }
      _ => return Err(Error::Validation(errs)),
    };

    let decoded = match step {
      CompletionStep::Attendance => {
        serde_json::from_value(self.payload).map(StepPayload::Attendance)
      }
      CompletionStep::Feedback => {
        serde_json::from_value(self.payload).map(StepPayload::Feedback)
      }
      CompletionStep::TopicCoverage => {
        serde_json::from_value(self.payload).map(StepPayload::TopicCoverage)
      }
    };

    decoded.map_err(|e| {
      Error::Validation(ValidationErrors::single("payload", e.to_string()))
    })
  }
}
