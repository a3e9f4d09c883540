//! Per-group plan and execution records.
//!
//! For every (session, student group) pair there is at most one
//! [`GroupPlan`] (intent before the session) and at most one
//! [`GroupExecution`] (outcome after it). Writes replace the whole row.
//!
//! The free-text `uncovered_topics` / `uncovered_reasons` fields are advisory
//! narrative. They are not checked against the topic coverage ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  ids::{GroupId, LessonId, SessionId, SubTopicId},
  validate::{Rating, ValidationErrors, field},
};

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Planned intent for one group, as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlanInput {
  pub planned_objectives: Option<String>,
  /// Ordered; caller order is preserved.
  #[serde(default)]
  pub planned_sub_topics: Vec<SubTopicId>,
  #[serde(default)]
  pub planned_lessons:    Vec<LessonId>,
  /// Topics that may be covered if time allows.
  pub additional_topics:  Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlan {
  pub session_id:         SessionId,
  pub group_id:           GroupId,
  pub planned_objectives: Option<String>,
  pub planned_sub_topics: Vec<SubTopicId>,
  pub planned_lessons:    Vec<LessonId>,
  pub additional_topics:  Option<String>,
  pub planned_at:         DateTime<Utc>,
}

impl GroupPlan {
  pub fn from_input(
    session_id: SessionId,
    group_id: GroupId,
    input: GroupPlanInput,
    planned_at: DateTime<Utc>,
  ) -> Self {
    Self {
      session_id,
      group_id,
      planned_objectives: input.planned_objectives,
      planned_sub_topics: input.planned_sub_topics,
      planned_lessons: input.planned_lessons,
      additional_topics: input.additional_topics,
      planned_at,
    }
  }
}

// ─── Execution ───────────────────────────────────────────────────────────────

/// Realised outcome for one group, as submitted. Ratings arrive as raw
/// integers and are range-checked by [`GroupExecutionInput::into_execution`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExecutionInput {
  pub achieved_objectives:          Option<String>,
  #[serde(default)]
  pub achieved_sub_topics:          Vec<SubTopicId>,
  #[serde(default)]
  pub achieved_lessons:             Vec<LessonId>,
  pub additional_topics_covered:    Option<String>,
  pub uncovered_topics:             Option<String>,
  pub uncovered_reasons:            Option<String>,
  pub group_feedback:               Option<String>,
  pub understanding_level:          i64,
  pub participation_level:          i64,
  pub teacher_satisfaction:         Option<i64>,
  pub challenges:                   Option<String>,
  pub next_session_recommendations: Option<String>,
}

impl GroupExecutionInput {
  /// Validate the ratings and build the stored record. Every out-of-range
  /// rating is reported under `prefix`; nothing is clamped.
  pub fn into_execution(
    self,
    session_id: SessionId,
    group_id: GroupId,
    completed_at: DateTime<Utc>,
    prefix: &str,
    errs: &mut ValidationErrors,
  ) -> Option<GroupExecution> {
    let understanding = Rating::check(
      self.understanding_level,
      field(prefix, "understanding_level"),
      errs,
    );
    let participation = Rating::check(
      self.participation_level,
      field(prefix, "participation_level"),
      errs,
    );
    let satisfaction = match self.teacher_satisfaction {
      Some(raw) => {
        Some(Rating::check(raw, field(prefix, "teacher_satisfaction"), errs)?)
      }
      None => None,
    };

    Some(GroupExecution {
      session_id,
      group_id,
      achieved_objectives: self.achieved_objectives,
      achieved_sub_topics: self.achieved_sub_topics,
      achieved_lessons: self.achieved_lessons,
      additional_topics_covered: self.additional_topics_covered,
      uncovered_topics: self.uncovered_topics,
      uncovered_reasons: self.uncovered_reasons,
      group_feedback: self.group_feedback,
      understanding_level: understanding?,
      participation_level: participation?,
      teacher_satisfaction: satisfaction,
      challenges: self.challenges,
      next_session_recommendations: self.next_session_recommendations,
      completed_at,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupExecution {
  pub session_id:                   SessionId,
  pub group_id:                     GroupId,
  pub achieved_objectives:          Option<String>,
  pub achieved_sub_topics:          Vec<SubTopicId>,
  pub achieved_lessons:             Vec<LessonId>,
  pub additional_topics_covered:    Option<String>,
  pub uncovered_topics:             Option<String>,
  pub uncovered_reasons:            Option<String>,
  pub group_feedback:               Option<String>,
  pub understanding_level:          Rating,
  pub participation_level:          Rating,
  pub teacher_satisfaction:         Option<Rating>,
  pub challenges:                   Option<String>,
  pub next_session_recommendations: Option<String>,
  pub completed_at:                 DateTime<Utc>,
}

/// One group's entry in the Feedback step payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFeedback {
  pub group_id:  GroupId,
  #[serde(flatten)]
  pub execution: GroupExecutionInput,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn input(understanding: i64, participation: i64) -> GroupExecutionInput {
    GroupExecutionInput {
      understanding_level: understanding,
      participation_level: participation,
      ..Default::default()
    }
  }

  #[test]
  fn valid_ratings_are_kept_exactly() {
    let mut errs = ValidationErrors::new();
    let exec = input(3, 5)
      .into_execution(SessionId(1), GroupId(2), Utc::now(), "", &mut errs)
      .unwrap();
    assert!(errs.is_empty());
    assert_eq!(exec.understanding_level.get(), 3);
    assert_eq!(exec.participation_level.get(), 5);
  }

  #[test]
  fn every_bad_rating_is_reported() {
    let mut errs = ValidationErrors::new();
    let mut bad = input(6, 0);
    bad.teacher_satisfaction = Some(9);
    let exec =
      bad.into_execution(SessionId(1), GroupId(2), Utc::now(), "groups[0]", &mut errs);
    assert!(exec.is_none());
    assert_eq!(errs.len(), 3);
    assert!(errs.has("groups[0].understanding_level"));
    assert!(errs.has("groups[0].participation_level"));
    assert!(errs.has("groups[0].teacher_satisfaction"));
  }

  #[test]
  fn feedback_entry_flattens_execution_fields() {
    let entry: GroupFeedback = serde_json::from_value(serde_json::json!({
      "group_id": 5,
      "understanding_level": 4,
      "participation_level": 2,
      "achieved_sub_topics": [3, 1]
    }))
    .unwrap();
    assert_eq!(entry.group_id, GroupId(5));
    assert_eq!(entry.execution.achieved_sub_topics, vec![SubTopicId(3), SubTopicId(1)]);
  }
}
