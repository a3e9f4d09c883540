//! Reference-data lookups: teaching plans, groups, members, sub-topics and
//! lessons.
//!
//! These are synchronous helpers over a borrowed connection so write
//! transactions can run them without leaving the transaction.

use std::collections::{BTreeMap, BTreeSet};

use classbook_core::{
  NotFound,
  ids::{GroupId, LessonId, StudentId, SubTopicId, TeachingPlanId},
  reference::{ImportCounts, LessonRef, ReferenceData, SubTopicRef},
  validate::{ValidationErrors, field},
};
use rusqlite::{Connection, OptionalExtension as _, params};

use crate::Result;

pub fn plan_exists(conn: &Connection, plan: TeachingPlanId) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM teaching_plans WHERE plan_id = ?1",
        params![plan.get()],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

pub fn resolve_sub_topic(conn: &Connection, id: SubTopicId) -> Result<Option<SubTopicRef>> {
  Ok(
    conn
      .query_row(
        "SELECT sub_topic_id, title, chapter_title FROM sub_topics WHERE sub_topic_id = ?1",
        params![id.get()],
        |row| {
          Ok(SubTopicRef {
            id:            SubTopicId(row.get(0)?),
            title:         row.get(1)?,
            chapter_title: row.get(2)?,
          })
        },
      )
      .optional()?,
  )
}

pub fn resolve_lesson(conn: &Connection, id: LessonId) -> Result<Option<LessonRef>> {
  Ok(
    conn
      .query_row(
        "SELECT lesson_id, title, module_title FROM lessons WHERE lesson_id = ?1",
        params![id.get()],
        |row| {
          Ok(LessonRef {
            id:           LessonId(row.get(0)?),
            title:        row.get(1)?,
            module_title: row.get(2)?,
          })
        },
      )
      .optional()?,
  )
}

/// Whether sub-topic `id` belongs to the course `plan` teaches.
pub fn sub_topic_in_plan(conn: &Connection, id: SubTopicId, plan: TeachingPlanId) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM sub_topics s
         JOIN teaching_plans p ON p.course_id = s.course_id
         WHERE s.sub_topic_id = ?1 AND p.plan_id = ?2",
        params![id.get(), plan.get()],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

/// Whether lesson `id` belongs to the course `plan` teaches.
pub fn lesson_in_plan(conn: &Connection, id: LessonId, plan: TeachingPlanId) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM lessons l
         JOIN teaching_plans p ON p.course_id = l.course_id
         WHERE l.lesson_id = ?1 AND p.plan_id = ?2",
        params![id.get(), plan.get()],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

pub fn group_members(conn: &Connection, group: GroupId) -> Result<Vec<StudentId>> {
  let mut stmt = conn.prepare(
    "SELECT student_id FROM group_members WHERE group_id = ?1 ORDER BY student_id",
  )?;
  let members = stmt
    .query_map(params![group.get()], |row| Ok(StudentId(row.get(0)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(members)
}

pub fn group_belongs_to_plan(
  conn: &Connection,
  group: GroupId,
  plan: TeachingPlanId,
) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM student_groups WHERE group_id = ?1 AND plan_id = ?2",
        params![group.get(), plan.get()],
        |_| Ok(true),
      )
      .optional()?
      .unwrap_or(false),
  )
}

pub fn plan_groups(conn: &Connection, plan: TeachingPlanId) -> Result<Vec<GroupId>> {
  let mut stmt = conn
    .prepare("SELECT group_id FROM student_groups WHERE plan_id = ?1 ORDER BY group_id")?;
  let groups = stmt
    .query_map(params![plan.get()], |row| Ok(GroupId(row.get(0)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(groups)
}

/// The groups of `plan` each enrolled student belongs to.
pub fn plan_roster(
  conn: &Connection,
  plan: TeachingPlanId,
) -> Result<BTreeMap<StudentId, BTreeSet<GroupId>>> {
  let mut stmt = conn.prepare(
    "SELECT m.student_id, m.group_id FROM group_members m
     JOIN student_groups g ON g.group_id = m.group_id
     WHERE g.plan_id = ?1",
  )?;
  let pairs = stmt
    .query_map(params![plan.get()], |row| {
      Ok((StudentId(row.get(0)?), GroupId(row.get(1)?)))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut roster: BTreeMap<StudentId, BTreeSet<GroupId>> = BTreeMap::new();
  for (student, group) in pairs {
    roster.entry(student).or_default().insert(group);
  }
  Ok(roster)
}

/// Fail with [`NotFound::GroupInPlan`] unless `group` is assigned to `plan`.
pub fn ensure_group_in_plan(
  conn: &Connection,
  group: GroupId,
  plan: TeachingPlanId,
) -> Result<()> {
  if group_belongs_to_plan(conn, group, plan)? {
    Ok(())
  } else {
    Err(NotFound::GroupInPlan { group, plan }.into())
  }
}

/// Upsert every entry of `data`. Group member lists are replaced.
pub fn import(conn: &Connection, data: &ReferenceData) -> Result<ImportCounts> {
  let mut counts = ImportCounts::default();

  for plan in &data.teaching_plans {
    conn.execute(
      "INSERT INTO teaching_plans (plan_id, course_id, title) VALUES (?1, ?2, ?3)
       ON CONFLICT (plan_id) DO UPDATE
       SET course_id = excluded.course_id, title = excluded.title",
      params![plan.id.get(), plan.course_id.get(), plan.title],
    )?;
    counts.teaching_plans += 1;
  }

  for group in &data.groups {
    conn.execute(
      "INSERT INTO student_groups (group_id, plan_id, name) VALUES (?1, ?2, ?3)
       ON CONFLICT (group_id) DO UPDATE
       SET plan_id = excluded.plan_id, name = excluded.name",
      params![group.id.get(), group.plan_id.get(), group.name],
    )?;
    conn.execute(
      "DELETE FROM group_members WHERE group_id = ?1",
      params![group.id.get()],
    )?;
    for student in &group.members {
      conn.execute(
        "INSERT OR IGNORE INTO group_members (group_id, student_id) VALUES (?1, ?2)",
        params![group.id.get(), student.get()],
      )?;
      counts.members += 1;
    }
    counts.groups += 1;
  }

  for topic in &data.sub_topics {
    conn.execute(
      "INSERT INTO sub_topics (sub_topic_id, course_id, title, chapter_title)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (sub_topic_id) DO UPDATE
       SET course_id = excluded.course_id, title = excluded.title,
           chapter_title = excluded.chapter_title",
      params![topic.id.get(), topic.course_id.get(), topic.title, topic.chapter_title],
    )?;
    counts.sub_topics += 1;
  }

  for lesson in &data.lessons {
    conn.execute(
      "INSERT INTO lessons (lesson_id, course_id, title, module_title)
       VALUES (?1, ?2, ?3, ?4)
       ON CONFLICT (lesson_id) DO UPDATE
       SET course_id = excluded.course_id, title = excluded.title,
           module_title = excluded.module_title",
      params![lesson.id.get(), lesson.course_id.get(), lesson.title, lesson.module_title],
    )?;
    counts.lessons += 1;
  }

  Ok(counts)
}

/// Check a batch's groups: each may appear once (field error on the
/// repeated `group_id`), and each must be assigned to `plan`.
pub fn check_batch_groups(
  conn: &Connection,
  plan: TeachingPlanId,
  groups: &[(String, GroupId)],
) -> Result<()> {
  let mut seen = BTreeSet::new();
  let mut errs = ValidationErrors::new();
  for (prefix, group) in groups {
    if !seen.insert(*group) {
      errs.push(field(prefix, "group_id"), format!("group {group} appears more than once"));
    }
  }
  errs.finish(())?;

  for (_, group) in groups {
    ensure_group_in_plan(conn, *group, plan)?;
  }
  Ok(())
}

/// Fail with [`NotFound`] on the first sub-topic or lesson id that does
/// not resolve within the course of `plan`.
pub fn ensure_topics_resolve(
  conn: &Connection,
  plan: TeachingPlanId,
  sub_topics: &[SubTopicId],
  lessons: &[LessonId],
) -> Result<()> {
  for id in sub_topics {
    if !sub_topic_in_plan(conn, *id, plan)? {
      return Err(NotFound::SubTopic(*id).into());
    }
  }
  for id in lessons {
    if !lesson_in_plan(conn, *id, plan)? {
      return Err(NotFound::Lesson(*id).into());
    }
  }
  Ok(())
}
