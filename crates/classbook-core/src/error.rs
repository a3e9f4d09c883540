//! Error types for `classbook-core`.

use thiserror::Error;

use crate::{
  ids::{GroupId, LessonId, SessionId, SubTopicId, TeachingPlanId},
  validate::ValidationErrors,
  workflow::CompletionStep,
};

#[derive(Debug, Error)]
pub enum Error {
  /// One or more request fields were rejected.
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("not found: {0}")]
  NotFound(NotFound),

  /// A session cannot be marked completed while a required step is empty.
  #[error("step {missing} has no saved data")]
  PreconditionFailed { missing: CompletionStep },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

/// What could not be found, relative to its expected parent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFound {
  #[error("session {0}")]
  Session(SessionId),

  #[error("teaching plan {0}")]
  TeachingPlan(TeachingPlanId),

  #[error("group {group} in teaching plan {plan}")]
  GroupInPlan {
    group: GroupId,
    plan:  TeachingPlanId,
  },

  #[error("sub-topic {0}")]
  SubTopic(SubTopicId),

  #[error("lesson {0}")]
  Lesson(LessonId),
}

impl From<NotFound> for Error {
  fn from(nf: NotFound) -> Self { Error::NotFound(nf) }
}

impl From<ValidationErrors> for Error {
  fn from(errs: ValidationErrors) -> Self { Error::Validation(errs) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
