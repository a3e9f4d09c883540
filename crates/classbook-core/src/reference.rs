//! Reference data owned by other parts of the system: curriculum topics and
//! group membership.
//!
//! The ledger only reads this data. [`TopicCatalog`] and [`GroupRoster`] are
//! the lookups it needs; [`ReferenceData`] is the bulk document a backend
//! can be loaded from.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::ids::{CourseId, GroupId, LessonId, StudentId, SubTopicId, TeachingPlanId};

// ─── Resolved references ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTopicRef {
  pub id:            SubTopicId,
  pub title:         String,
  pub chapter_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRef {
  pub id:           LessonId,
  pub title:        String,
  pub module_title: String,
}

// ─── Lookups ─────────────────────────────────────────────────────────────────

/// Read-only lookup of curriculum sub-topics and lessons.
pub trait TopicCatalog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn resolve_sub_topic(
    &self,
    id: SubTopicId,
  ) -> impl Future<Output = Result<Option<SubTopicRef>, Self::Error>> + Send + '_;

  fn resolve_lesson(
    &self,
    id: LessonId,
  ) -> impl Future<Output = Result<Option<LessonRef>, Self::Error>> + Send + '_;
}

/// Read-only lookup of which students belong to which groups, and which
/// groups belong to which teaching plan.
pub trait GroupRoster: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn group_members(
    &self,
    group: GroupId,
  ) -> impl Future<Output = Result<Vec<StudentId>, Self::Error>> + Send + '_;

  fn group_belongs_to_plan(
    &self,
    group: GroupId,
    plan: TeachingPlanId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Every group assigned to `plan`.
  fn plan_groups(
    &self,
    plan: TeachingPlanId,
  ) -> impl Future<Output = Result<Vec<GroupId>, Self::Error>> + Send + '_;
}

// ─── Bulk document ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeachingPlanEntry {
  pub id:        TeachingPlanId,
  pub course_id: CourseId,
  pub title:     String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentGroupEntry {
  pub id:      GroupId,
  pub plan_id: TeachingPlanId,
  pub name:    String,
  #[serde(default)]
  pub members: Vec<StudentId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTopicEntry {
  pub id:            SubTopicId,
  pub course_id:     CourseId,
  pub title:         String,
  pub chapter_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonEntry {
  pub id:           LessonId,
  pub course_id:    CourseId,
  pub title:        String,
  pub module_title: String,
}

/// Teaching plans, groups with their members, and the curriculum topics a
/// store resolves against. Importing a document upserts every entry; a
/// group's member list is replaced wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceData {
  #[serde(default)]
  pub teaching_plans: Vec<TeachingPlanEntry>,
  #[serde(default)]
  pub groups:         Vec<StudentGroupEntry>,
  #[serde(default)]
  pub sub_topics:     Vec<SubTopicEntry>,
  #[serde(default)]
  pub lessons:        Vec<LessonEntry>,
}

/// Counts of entries written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportCounts {
  pub teaching_plans: usize,
  pub groups:         usize,
  pub members:        usize,
  pub sub_topics:     usize,
  pub lessons:        usize,
}
