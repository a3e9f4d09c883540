//! Session reports, the root entity of the ledger.
//!
//! A session report is created against a teaching plan and afterwards only
//! changes through step submissions. Everything else recorded about the
//! session (plans, executions, coverage, attendance) hangs off it and is
//! removed with it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::{
  ids::{SessionId, TeacherId, TeachingPlanId},
  validate::{ValidationErrors, require_text},
  Result,
};

/// How the class was delivered.
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
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
pub enum DeliveryMode {
  #[default]
  InPerson,
  Online,
  Hybrid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionReport {
  pub session_id:   SessionId,
  pub plan_id:      TeachingPlanId,
  pub title:        String,
  pub session_date: NaiveDate,
  pub mode:         DeliveryMode,
  pub location:     Option<String>,
  pub notes:        Option<String>,
  pub teacher_id:   TeacherId,
  /// Highest step number saved so far; `0` before any step.
  pub current_step: u32,
  pub is_completed: bool,
  pub created_at:   DateTime<Utc>,
  pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a session report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSession {
  pub plan_id:      TeachingPlanId,
  pub title:        String,
  pub session_date: NaiveDate,
  #[serde(default)]
  pub mode:         DeliveryMode,
  pub location:     Option<String>,
  pub notes:        Option<String>,
  pub teacher_id:   TeacherId,
}

impl NewSession {
  pub fn new(
    plan_id: TeachingPlanId,
    title: impl Into<String>,
    session_date: NaiveDate,
    teacher_id: TeacherId,
  ) -> Self {
    Self {
      plan_id,
      title: title.into(),
      session_date,
      mode: DeliveryMode::default(),
      location: None,
      notes: None,
      teacher_id,
    }
  }

  pub fn validate(&self) -> Result<()> {
    let mut errs = ValidationErrors::new();
    require_text(Some(self.title.as_str()), "title", &mut errs);
    errs.finish(())
  }
}
