//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use classbook_core::{
  Error as DomainError, NotFound,
  attendance::{AttendanceEntry, AttendanceStatus, GroupAttendance},
  coverage::{CoverageEntry, CoverageStatus, GroupCoverage},
  ids::{CourseId, GroupId, LessonId, SessionId, StudentId, SubTopicId, TeacherId, TeachingPlanId},
  ledger::{GroupExecutionInput, GroupFeedback, GroupPlanInput},
  progress::{OverallStatus, ProgressKey, ProgressQuery},
  reference::{
    GroupRoster, LessonEntry, ReferenceData, StudentGroupEntry, SubTopicEntry, TeachingPlanEntry,
    TopicCatalog,
  },
  session::{NewSession, SessionReport},
  store::{SessionStore, StoreError},
  workflow::{CompletionStep, StepPayload, Workflow},
};
use rusqlite::params;

use crate::{Error, SqliteStore};

const PLAN: TeachingPlanId = TeachingPlanId(1);
const OTHER_PLAN: TeachingPlanId = TeachingPlanId(2);
const GROUP_A: GroupId = GroupId(100);
const GROUP_B: GroupId = GroupId(200);
const FOREIGN_GROUP: GroupId = GroupId(300);
const LOOPS: SubTopicId = SubTopicId(10);
const RECURSION: SubTopicId = SubTopicId(11);
const INTRO: LessonId = LessonId(20);

fn reference() -> ReferenceData {
  ReferenceData {
    teaching_plans: vec![
      TeachingPlanEntry { id: PLAN, course_id: CourseId(1), title: "Programming I".into() },
      TeachingPlanEntry { id: OTHER_PLAN, course_id: CourseId(1), title: "Evening".into() },
    ],
    groups:         vec![
      StudentGroupEntry {
        id:      GROUP_A,
        plan_id: PLAN,
        name:    "A".into(),
        members: vec![StudentId(1), StudentId(2), StudentId(3)],
      },
      StudentGroupEntry {
        id:      GROUP_B,
        plan_id: PLAN,
        name:    "B".into(),
        members: vec![StudentId(4), StudentId(5)],
      },
      StudentGroupEntry {
        id:      FOREIGN_GROUP,
        plan_id: OTHER_PLAN,
        name:    "C".into(),
        members: vec![StudentId(9)],
      },
    ],
    sub_topics:     vec![
      SubTopicEntry {
        id:            LOOPS,
        course_id:     CourseId(1),
        title:         "Loops".into(),
        chapter_title: "Control flow".into(),
      },
      SubTopicEntry {
        id:            RECURSION,
        course_id:     CourseId(1),
        title:         "Recursion".into(),
        chapter_title: "Functions".into(),
      },
    ],
    lessons:        vec![LessonEntry {
      id:           INTRO,
      course_id:    CourseId(1),
      title:        "Introduction".into(),
      module_title: "Basics".into(),
    }],
  }
}

async fn store() -> SqliteStore {
  let s = SqliteStore::open_in_memory().await.expect("in-memory store");
  s.import_reference(reference()).await.expect("reference data");
  s
}

fn date(day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(2026, 3, day).unwrap() }

async fn session(s: &SqliteStore, day: u32) -> SessionReport {
  s.create_session(NewSession::new(PLAN, format!("Session {day}"), date(day), TeacherId(7)))
    .await
    .unwrap()
}

fn execution(understanding: i64, participation: i64) -> GroupExecutionInput {
  GroupExecutionInput {
    understanding_level: understanding,
    participation_level: participation,
    ..Default::default()
  }
}

fn domain(err: &Error) -> &DomainError { err.domain().expect("domain error") }

fn key(sub_topic: SubTopicId, group: GroupId) -> ProgressKey {
  ProgressKey { plan_id: PLAN, sub_topic_id: sub_topic, group_id: group }
}

async fn summary_count(s: &SqliteStore) -> usize {
  s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap().len()
}

// ─── Reference data ──────────────────────────────────────────────────────────

#[tokio::test]
async fn import_counts_and_lookups() {
  let s = SqliteStore::open_in_memory().await.unwrap();
  let counts = s.import_reference(reference()).await.unwrap();
  assert_eq!(counts.teaching_plans, 2);
  assert_eq!(counts.groups, 3);
  assert_eq!(counts.members, 6);
  assert_eq!(counts.sub_topics, 2);
  assert_eq!(counts.lessons, 1);

  let loops = s.resolve_sub_topic(LOOPS).await.unwrap().unwrap();
  assert_eq!(loops.title, "Loops");
  assert!(s.resolve_lesson(LessonId(99)).await.unwrap().is_none());

  assert!(s.group_belongs_to_plan(GROUP_A, PLAN).await.unwrap());
  assert!(!s.group_belongs_to_plan(FOREIGN_GROUP, PLAN).await.unwrap());
  assert_eq!(s.plan_groups(PLAN).await.unwrap(), vec![GROUP_A, GROUP_B]);
  assert_eq!(s.group_members(GROUP_B).await.unwrap(), vec![StudentId(4), StudentId(5)]);
}

#[tokio::test]
async fn reimport_replaces_group_members() {
  let s = store().await;
  let mut data = reference();
  data.groups[0].members = vec![StudentId(1)];
  s.import_reference(data).await.unwrap();
  assert_eq!(s.group_members(GROUP_A).await.unwrap(), vec![StudentId(1)]);
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_session() {
  let s = store().await;
  let created = session(&s, 2).await;
  assert_eq!(created.current_step, 0);
  assert!(!created.is_completed);
  assert!(created.completed_at.is_none());

  let fetched = s.get_session(created.session_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn create_session_requires_known_plan_and_title() {
  let s = store().await;
  let err = s
    .create_session(NewSession::new(TeachingPlanId(42), "x", date(1), TeacherId(7)))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::TeachingPlan(_))));

  let err = s
    .create_session(NewSession::new(PLAN, "   ", date(1), TeacherId(7)))
    .await
    .unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("title")),
    other => panic!("expected validation error, got {other:?}"),
  }
}

#[tokio::test]
async fn get_session_missing_returns_none() {
  let s = store().await;
  assert!(s.get_session(SessionId(999)).await.unwrap().is_none());
  assert!(!s.delete_session(SessionId(999)).await.unwrap());
}

// ─── Workflow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn current_step_never_decreases() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let report = s
    .save_topic_coverage_step(id, vec![GroupCoverage {
      group_id: GROUP_A,
      entries:  vec![CoverageEntry::sub_topic(LOOPS, 50, CoverageStatus::PartiallyCovered)],
    }])
    .await
    .unwrap();
  assert_eq!(report.current_step, 3);

  let report = s
    .save_attendance_step(id, vec![GroupAttendance {
      group_id: GROUP_A,
      records:  vec![AttendanceEntry::new(StudentId(1), AttendanceStatus::Present)],
    }])
    .await
    .unwrap();
  assert_eq!(report.current_step, 3);
}

#[tokio::test]
async fn completion_requires_every_step() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  s.save_attendance_step(id, vec![GroupAttendance {
    group_id: GROUP_A,
    records:  vec![AttendanceEntry::new(StudentId(1), AttendanceStatus::Present)],
  }])
  .await
  .unwrap();
  s.save_feedback_step(id, vec![GroupFeedback { group_id: GROUP_A, execution: execution(3, 4) }])
    .await
    .unwrap();

  let err = s.mark_completed(id).await.unwrap_err();
  assert!(matches!(
    domain(&err),
    DomainError::PreconditionFailed { missing: CompletionStep::TopicCoverage }
  ));
  assert!(!s.get_session(id).await.unwrap().unwrap().is_completed);

  let progress = s.completion_progress(id).await.unwrap();
  assert_eq!(progress.current_step, 2);
  assert_eq!(progress.total_steps, 3);
  assert!(!progress.all_required_saved);
  assert_eq!(progress.per_step_status.iter().filter(|st| st.saved).count(), 2);

  let report = s
    .save_step(
      id,
      StepPayload::TopicCoverage(vec![GroupCoverage {
        group_id: GROUP_A,
        entries:  vec![CoverageEntry::additional("Warm-up quiz", 100, CoverageStatus::FullyCovered)],
      }]),
      true,
    )
    .await
    .unwrap();
  assert!(report.is_completed);
  let completed_at = report.completed_at.unwrap();

  // Completing again is a no-op.
  let again = s.mark_completed(id).await.unwrap();
  assert_eq!(again.completed_at, Some(completed_at));
}

#[tokio::test]
async fn failed_completion_rolls_back_the_save() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let err = s
    .save_step(
      id,
      StepPayload::Attendance(vec![GroupAttendance {
        group_id: GROUP_A,
        records:  vec![AttendanceEntry::new(StudentId(1), AttendanceStatus::Late)],
      }]),
      true,
    )
    .await
    .unwrap_err();
  assert!(matches!(
    domain(&err),
    DomainError::PreconditionFailed { missing: CompletionStep::Feedback }
  ));

  let report = s.get_session(id).await.unwrap().unwrap();
  assert_eq!(report.current_step, 0);
  assert!(s.list_attendance(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn custom_workflow_only_requires_its_steps() {
  let s = store().await.with_workflow(Workflow::new([CompletionStep::Attendance]));
  let id = session(&s, 2).await.session_id;

  s.save_attendance_step(id, vec![GroupAttendance {
    group_id: GROUP_B,
    records:  vec![AttendanceEntry::new(StudentId(4), AttendanceStatus::Present)],
  }])
  .await
  .unwrap();
  assert!(s.mark_completed(id).await.unwrap().is_completed);
}

#[tokio::test]
async fn empty_step_payload_is_rejected() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  let err = s.save_feedback_step(id, vec![]).await.unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("payload")),
    other => panic!("expected validation error, got {other:?}"),
  }
}

#[tokio::test]
async fn groups_without_entries_do_not_count_as_saved() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  s.save_attendance_step(id, vec![GroupAttendance {
    group_id: GROUP_A,
    records:  vec![AttendanceEntry::new(StudentId(1), AttendanceStatus::Present)],
  }])
  .await
  .unwrap();
  s.save_feedback_step(id, vec![GroupFeedback { group_id: GROUP_A, execution: execution(3, 4) }])
    .await
    .unwrap();

  let err = s
    .save_topic_coverage_step(id, vec![GroupCoverage { group_id: GROUP_A, entries: vec![] }])
    .await
    .unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("payload")),
    other => panic!("expected validation error, got {other:?}"),
  }
  let err = s
    .save_attendance_step(id, vec![GroupAttendance { group_id: GROUP_B, records: vec![] }])
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), DomainError::Validation(_)));

  assert!(s.list_coverage(id, None).await.unwrap().is_empty());
  let err = s.mark_completed(id).await.unwrap_err();
  assert!(matches!(
    domain(&err),
    DomainError::PreconditionFailed { missing: CompletionStep::TopicCoverage }
  ));
}

#[tokio::test]
async fn direct_ledger_writes_mark_their_steps() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  s.record_attendance(id, vec![AttendanceEntry::new(StudentId(1), AttendanceStatus::Present)])
    .await
    .unwrap();
  s.upsert_execution(id, GROUP_A, execution(4, 4)).await.unwrap();
  s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
    LOOPS,
    80,
    CoverageStatus::MostlyCovered,
  )])
  .await
  .unwrap();

  let progress = s.completion_progress(id).await.unwrap();
  assert_eq!(progress.current_step, 3);
  assert!(progress.all_required_saved);
  assert!(s.mark_completed(id).await.unwrap().is_completed);
}

#[tokio::test]
async fn clearing_coverage_unmarks_the_step() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  s.save_attendance_step(id, vec![GroupAttendance {
    group_id: GROUP_A,
    records:  vec![AttendanceEntry::new(StudentId(2), AttendanceStatus::Present)],
  }])
  .await
  .unwrap();
  s.save_feedback_step(id, vec![GroupFeedback { group_id: GROUP_A, execution: execution(3, 3) }])
    .await
    .unwrap();
  s.save_topic_coverage_step(id, vec![GroupCoverage {
    group_id: GROUP_A,
    entries:  vec![CoverageEntry::sub_topic(LOOPS, 50, CoverageStatus::PartiallyCovered)],
  }])
  .await
  .unwrap();

  s.record_coverage(id, GROUP_A, vec![]).await.unwrap();

  let progress = s.completion_progress(id).await.unwrap();
  assert_eq!(progress.current_step, 3);
  assert!(!progress.all_required_saved);
  let coverage = progress
    .per_step_status
    .iter()
    .find(|st| st.step_number == CompletionStep::TopicCoverage.number())
    .unwrap();
  assert!(!coverage.saved);
  assert!(coverage.saved_at.is_none());

  let err = s.mark_completed(id).await.unwrap_err();
  assert!(matches!(
    domain(&err),
    DomainError::PreconditionFailed { missing: CompletionStep::TopicCoverage }
  ));
}

#[tokio::test]
async fn save_step_on_missing_session_is_not_found() {
  let s = store().await;
  let err = s
    .save_feedback_step(SessionId(999), vec![GroupFeedback {
      group_id:  GROUP_A,
      execution: execution(3, 3),
    }])
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::Session(_))));
}

// ─── Plan / execution ledger ─────────────────────────────────────────────────

#[tokio::test]
async fn execution_ratings_round_trip() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  s.upsert_execution(id, GROUP_A, execution(3, 5)).await.unwrap();
  let stored = s.get_execution(id, GROUP_A).await.unwrap().unwrap();
  assert_eq!(stored.understanding_level.get(), 3);
  assert_eq!(stored.participation_level.get(), 5);
  assert!(stored.teacher_satisfaction.is_none());
}

#[tokio::test]
async fn out_of_range_rating_leaves_prior_row() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  s.upsert_execution(id, GROUP_A, execution(3, 5)).await.unwrap();

  let err = s.upsert_execution(id, GROUP_A, execution(6, 0)).await.unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => {
      assert!(errs.has("understanding_level"));
      assert!(errs.has("participation_level"));
    }
    other => panic!("expected validation error, got {other:?}"),
  }

  let stored = s.get_execution(id, GROUP_A).await.unwrap().unwrap();
  assert_eq!(stored.understanding_level.get(), 3);
}

#[tokio::test]
async fn executions_of_one_group_leave_others_untouched() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  s.upsert_execution(id, GROUP_A, execution(2, 2)).await.unwrap();
  s.upsert_execution(id, GROUP_B, execution(5, 4)).await.unwrap();
  let group_b = s.get_execution(id, GROUP_B).await.unwrap().unwrap();

  s.upsert_execution(id, GROUP_A, execution(4, 3)).await.unwrap();
  assert!(s.upsert_execution(id, GROUP_A, execution(7, 3)).await.is_err());
  s.save_feedback_step(id, vec![GroupFeedback { group_id: GROUP_A, execution: execution(1, 1) }])
    .await
    .unwrap();

  assert_eq!(s.get_execution(id, GROUP_B).await.unwrap().unwrap(), group_b);
  let group_a = s.get_execution(id, GROUP_A).await.unwrap().unwrap();
  assert_eq!(group_a.understanding_level.get(), 1);
}

#[tokio::test]
async fn plan_rejects_group_outside_plan_and_unknown_topics() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let err = s.upsert_plan(id, FOREIGN_GROUP, GroupPlanInput::default()).await.unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::GroupInPlan { .. })));

  let input = GroupPlanInput {
    planned_sub_topics: vec![SubTopicId(404)],
    ..Default::default()
  };
  let err = s.upsert_plan(id, GROUP_A, input).await.unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::SubTopic(SubTopicId(404)))));

  let input = GroupPlanInput {
    planned_objectives: Some("Write a for loop".into()),
    planned_sub_topics: vec![LOOPS],
    planned_lessons: vec![INTRO],
    ..Default::default()
  };
  s.upsert_plan(id, GROUP_A, input).await.unwrap();
  let plan = s.get_plan(id, GROUP_A).await.unwrap().unwrap();
  assert_eq!(plan.planned_sub_topics, vec![LOOPS]);
  assert_eq!(plan.planned_lessons, vec![INTRO]);
}

#[tokio::test]
async fn feedback_batch_is_all_or_nothing() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let err = s
    .save_feedback_step(id, vec![
      GroupFeedback { group_id: GROUP_A, execution: execution(4, 4) },
      GroupFeedback { group_id: GROUP_B, execution: execution(9, 4) },
    ])
    .await
    .unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("groups[1].understanding_level")),
    other => panic!("expected validation error, got {other:?}"),
  }
  assert!(s.get_execution(id, GROUP_A).await.unwrap().is_none());
  assert_eq!(s.get_session(id).await.unwrap().unwrap().current_step, 0);
}

#[tokio::test]
async fn duplicate_group_in_step_is_rejected() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  let err = s
    .save_feedback_step(id, vec![
      GroupFeedback { group_id: GROUP_A, execution: execution(4, 4) },
      GroupFeedback { group_id: GROUP_A, execution: execution(4, 4) },
    ])
    .await
    .unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("groups[1].group_id")),
    other => panic!("expected validation error, got {other:?}"),
  }
}

// ─── Coverage ledger ─────────────────────────────────────────────────────────

#[tokio::test]
async fn coverage_percentage_bounds() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  for pct in [0, 100] {
    s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
      LOOPS,
      pct,
      CoverageStatus::PartiallyCovered,
    )])
    .await
    .unwrap();
  }
  for pct in [-1, 101] {
    let err = s
      .record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
        LOOPS,
        pct,
        CoverageStatus::PartiallyCovered,
      )])
      .await
      .unwrap_err();
    match domain(&err) {
      DomainError::Validation(errs) => assert!(errs.has("entries[0].coverage_percentage")),
      other => panic!("expected validation error, got {other:?}"),
    }
  }
  let rows = s.list_coverage(id, Some(GROUP_A)).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].fact.coverage_percentage.get(), 100);
}

#[tokio::test]
async fn identical_coverage_is_idempotent() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  let entries = vec![
    CoverageEntry::sub_topic(LOOPS, 60, CoverageStatus::MostlyCovered),
    CoverageEntry::lesson(INTRO, 100, CoverageStatus::FullyCovered),
  ];

  let first = s.record_coverage(id, GROUP_A, entries.clone()).await.unwrap();
  let before = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();
  let second = s.record_coverage(id, GROUP_A, entries).await.unwrap();
  let after = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();

  assert_eq!(first, second);
  assert_eq!(before, after);
  assert_eq!(after.len(), 1);
}

#[tokio::test]
async fn unknown_topic_reference_is_not_found() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  let err = s
    .record_coverage(id, GROUP_A, vec![CoverageEntry::lesson(
      LessonId(404),
      10,
      CoverageStatus::PartiallyCovered,
    )])
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::Lesson(_))));
}

#[tokio::test]
async fn topics_of_another_course_are_not_found() {
  let s = store().await;
  s.import_reference(ReferenceData {
    sub_topics: vec![SubTopicEntry {
      id:            SubTopicId(77),
      course_id:     CourseId(99),
      title:         "Pointers".into(),
      chapter_title: "Memory".into(),
    }],
    lessons: vec![LessonEntry {
      id:           LessonId(78),
      course_id:    CourseId(99),
      title:        "Heap".into(),
      module_title: "Memory".into(),
    }],
    ..Default::default()
  })
  .await
  .unwrap();
  let id = session(&s, 2).await.session_id;

  let err = s
    .record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
      SubTopicId(77),
      100,
      CoverageStatus::FullyCovered,
    )])
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::SubTopic(SubTopicId(77)))));

  let input = GroupPlanInput { planned_lessons: vec![LessonId(78)], ..Default::default() };
  let err = s.upsert_plan(id, GROUP_A, input).await.unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::Lesson(LessonId(78)))));

  let mut foreign = execution(3, 3);
  foreign.achieved_sub_topics = vec![SubTopicId(77)];
  assert!(s.upsert_execution(id, GROUP_A, foreign).await.is_err());

  assert!(s.list_coverage(id, None).await.unwrap().is_empty());
  assert_eq!(summary_count(&s).await, 0);
}

#[tokio::test]
async fn lessons_and_additional_topics_feed_no_progress() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;
  s.record_coverage(id, GROUP_A, vec![
    CoverageEntry::lesson(INTRO, 100, CoverageStatus::FullyCovered),
    CoverageEntry::additional("Guest talk", 100, CoverageStatus::FullyCovered),
  ])
  .await
  .unwrap();
  assert_eq!(summary_count(&s).await, 0);
}

// ─── Progress aggregation ────────────────────────────────────────────────────

#[tokio::test]
async fn progress_follows_latest_session() {
  let s = store().await;
  let d1 = session(&s, 1).await.session_id;
  let d2 = session(&s, 2).await.session_id;

  s.record_coverage(d1, GROUP_A, vec![CoverageEntry::sub_topic(
    LOOPS,
    40,
    CoverageStatus::PartiallyCovered,
  )])
  .await
  .unwrap();
  s.record_coverage(d2, GROUP_A, vec![CoverageEntry::sub_topic(
    LOOPS,
    100,
    CoverageStatus::MostlyCovered,
  )])
  .await
  .unwrap();

  let summaries = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();
  assert_eq!(summaries.len(), 1);
  let summary = &summaries[0];
  assert_eq!(summary.key(), key(LOOPS, GROUP_A));
  assert_eq!(summary.sessions_count, 2);
  assert_eq!(summary.first_taught_date, Some(date(1)));
  assert_eq!(summary.last_taught_date, Some(date(2)));
  assert_eq!(summary.overall_progress_percentage.get(), 100);
  assert_eq!(summary.overall_status, OverallStatus::Practiced);
}

#[tokio::test]
async fn deleting_coverage_removes_or_rewinds_summary() {
  let s = store().await;
  let d1 = session(&s, 1).await.session_id;
  let d2 = session(&s, 2).await.session_id;
  for (id, pct, status) in [
    (d1, 40, CoverageStatus::PartiallyCovered),
    (d2, 80, CoverageStatus::MostlyCovered),
  ] {
    s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(LOOPS, pct, status)])
      .await
      .unwrap();
  }

  s.record_coverage(d2, GROUP_A, vec![]).await.unwrap();
  let summaries = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();
  assert_eq!(summaries.len(), 1);
  assert_eq!(summaries[0].sessions_count, 1);
  assert_eq!(summaries[0].overall_progress_percentage.get(), 40);
  assert_eq!(summaries[0].overall_status, OverallStatus::Introduced);
  assert_eq!(summaries[0].last_taught_date, Some(date(1)));

  s.record_coverage(d1, GROUP_A, vec![]).await.unwrap();
  assert_eq!(summary_count(&s).await, 0);
}

#[tokio::test]
async fn replacing_a_sub_topic_recomputes_the_old_key() {
  let s = store().await;
  let id = session(&s, 1).await.session_id;
  s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
    LOOPS,
    40,
    CoverageStatus::PartiallyCovered,
  )])
  .await
  .unwrap();
  s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
    RECURSION,
    20,
    CoverageStatus::PartiallyCovered,
  )])
  .await
  .unwrap();

  let summaries = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();
  assert_eq!(summaries.len(), 1);
  assert_eq!(summaries[0].sub_topic_id, RECURSION);
}

#[tokio::test]
async fn groups_progress_independently() {
  let s = store().await;
  let id = session(&s, 3).await.session_id;
  s.save_topic_coverage_step(id, vec![
    GroupCoverage {
      group_id: GROUP_A,
      entries:  vec![CoverageEntry::sub_topic(LOOPS, 100, CoverageStatus::FullyCovered)],
    },
    GroupCoverage {
      group_id: GROUP_B,
      entries:  vec![CoverageEntry::sub_topic(LOOPS, 0, CoverageStatus::NotCovered)],
    },
  ])
  .await
  .unwrap();

  let a = s
    .progress_summaries(ProgressQuery { group_id: Some(GROUP_A), ..ProgressQuery::plan(PLAN) })
    .await
    .unwrap();
  let b = s
    .progress_summaries(ProgressQuery { group_id: Some(GROUP_B), ..ProgressQuery::plan(PLAN) })
    .await
    .unwrap();
  assert_eq!(a.len(), 1);
  assert_eq!(b.len(), 1);
  assert_eq!(a[0].overall_status, OverallStatus::Practiced);
  assert_eq!(b[0].overall_status, OverallStatus::NotStarted);

  // Clearing group B leaves group A untouched.
  s.record_coverage(id, GROUP_B, vec![]).await.unwrap();
  assert_eq!(summary_count(&s).await, 1);
}

#[tokio::test]
async fn progress_for_unknown_plan_is_not_found() {
  let s = store().await;
  let err = s
    .progress_summaries(ProgressQuery::plan(TeachingPlanId(404)))
    .await
    .unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::TeachingPlan(_))));
}

#[tokio::test]
async fn dangling_sub_topic_is_skipped_with_warning() {
  let s = store().await;
  let id = session(&s, 1).await.session_id;
  s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
    RECURSION,
    50,
    CoverageStatus::PartiallyCovered,
  )])
  .await
  .unwrap();
  assert_eq!(summary_count(&s).await, 1);

  s.raw(|conn| {
    conn.execute("DELETE FROM sub_topics WHERE sub_topic_id = ?1", params![RECURSION.get()])?;
    Ok(())
  })
  .await
  .unwrap();

  let outcome = s.recompute_progress(key(RECURSION, GROUP_A)).await.unwrap();
  assert!(outcome.summary.is_none());
  assert_eq!(outcome.warnings.len(), 1);
  assert_eq!(outcome.warnings[0].session_id, id);
  assert_eq!(summary_count(&s).await, 0);
}

#[tokio::test]
async fn rebuild_replays_every_summary() {
  let s = store().await;
  let id = session(&s, 1).await.session_id;
  s.record_coverage(id, GROUP_A, vec![
    CoverageEntry::sub_topic(LOOPS, 30, CoverageStatus::PartiallyCovered),
    CoverageEntry::sub_topic(RECURSION, 70, CoverageStatus::MostlyCovered),
  ])
  .await
  .unwrap();

  // Corrupt one summary and plant an orphan; a rebuild repairs both.
  s.raw(|conn| {
    conn.execute(
      "UPDATE progress_summaries SET overall_progress_percentage = 5 WHERE sub_topic_id = ?1",
      params![LOOPS.get()],
    )?;
    conn.execute(
      "INSERT INTO progress_summaries (plan_id, sub_topic_id, group_id, overall_status,
         sessions_count, overall_progress_percentage)
       VALUES (?1, ?2, ?3, 1, 1, 10)",
      params![PLAN.get(), LOOPS.get(), GROUP_B.get()],
    )?;
    Ok(())
  })
  .await
  .unwrap();

  assert_eq!(s.rebuild_progress(PLAN).await.unwrap(), 2);
  let summaries = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();
  assert_eq!(summaries.len(), 2);
  let loops = summaries.iter().find(|p| p.sub_topic_id == LOOPS).unwrap();
  assert_eq!(loops.overall_progress_percentage.get(), 30);
  assert_eq!(loops.group_id, GROUP_A);
}

#[tokio::test]
async fn deleting_session_recomputes_its_keys() {
  let s = store().await;
  let d1 = session(&s, 1).await.session_id;
  let d2 = session(&s, 2).await.session_id;
  for (id, pct) in [(d1, 40), (d2, 90)] {
    s.record_coverage(id, GROUP_A, vec![CoverageEntry::sub_topic(
      LOOPS,
      pct,
      CoverageStatus::MostlyCovered,
    )])
    .await
    .unwrap();
  }

  assert!(s.delete_session(d2).await.unwrap());
  assert!(s.get_session(d2).await.unwrap().is_none());
  let summaries = s.progress_summaries(ProgressQuery::plan(PLAN)).await.unwrap();
  assert_eq!(summaries[0].overall_progress_percentage.get(), 40);
  assert_eq!(summaries[0].sessions_count, 1);

  let err = s.list_coverage(d2, None).await.unwrap_err();
  assert!(matches!(domain(&err), DomainError::NotFound(NotFound::Session(_))));

  assert!(s.delete_session(d1).await.unwrap());
  assert_eq!(summary_count(&s).await, 0);
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn attendance_upserts_per_student() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let mut late = AttendanceEntry::new(StudentId(2), AttendanceStatus::Late);
  late.participation_score = Some(70);
  s.record_attendance(id, vec![
    AttendanceEntry::new(StudentId(1), AttendanceStatus::Present),
    late,
  ])
  .await
  .unwrap();
  s.record_attendance(id, vec![AttendanceEntry::new(StudentId(1), AttendanceStatus::Excused)])
    .await
    .unwrap();

  let rows = s.list_attendance(id).await.unwrap();
  assert_eq!(rows.len(), 2);
  assert_eq!(rows[0].student_id, StudentId(1));
  assert_eq!(rows[0].status, AttendanceStatus::Excused);
  assert_eq!(rows[1].participation_score.map(|p| p.get()), Some(70));
}

#[tokio::test]
async fn attendance_rejects_students_outside_the_plan() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let err = s
    .record_attendance(id, vec![
      AttendanceEntry::new(StudentId(1), AttendanceStatus::Present),
      AttendanceEntry::new(StudentId(9), AttendanceStatus::Present),
    ])
    .await
    .unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("records[1].student_id")),
    other => panic!("expected validation error, got {other:?}"),
  }
  assert!(s.list_attendance(id).await.unwrap().is_empty());
}

#[tokio::test]
async fn attendance_checks_the_named_group() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let err = s
    .save_attendance_step(id, vec![GroupAttendance {
      group_id: GROUP_A,
      records:  vec![
        AttendanceEntry::new(StudentId(1), AttendanceStatus::Present),
        AttendanceEntry::new(StudentId(4), AttendanceStatus::Present),
      ],
    }])
    .await
    .unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => assert!(errs.has("groups[0].records[1].student_id")),
    other => panic!("expected validation error, got {other:?}"),
  }
  assert!(s.list_attendance(id).await.unwrap().is_empty());

  s.record_attendance(id, vec![AttendanceEntry::new(StudentId(4), AttendanceStatus::Late)])
    .await
    .unwrap();
  let rows = s.list_attendance(id).await.unwrap();
  assert_eq!(rows[0].group_id, Some(GROUP_B));
}

#[tokio::test]
async fn attendance_rejects_bad_status_and_score() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let mut entry = AttendanceEntry::new(StudentId(1), AttendanceStatus::Present);
  entry.status = "sleeping".into();
  entry.participation_score = Some(101);
  let err = s.record_attendance(id, vec![entry]).await.unwrap_err();
  match domain(&err) {
    DomainError::Validation(errs) => {
      assert!(errs.has("records[0].status"));
      assert!(errs.has("records[0].participation_score"));
    }
    other => panic!("expected validation error, got {other:?}"),
  }
}

// ─── Schema ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn schema_rejects_out_of_range_values() {
  let s = store().await;
  let id = session(&s, 2).await.session_id;

  let result = s
    .raw(move |conn| {
      conn.execute(
        "INSERT INTO group_executions (session_id, group_id, understanding_level,
           participation_level, completed_at)
         VALUES (?1, ?2, 6, 3, '2026-03-02T00:00:00Z')",
        params![id.get(), GROUP_A.get()],
      )?;
      Ok(())
    })
    .await;
  assert!(matches!(result, Err(Error::Sqlite(_))));

  let result = s
    .raw(move |conn| {
      conn.execute(
        "INSERT INTO topic_coverage (session_id, group_id, topic_kind, topic_ref,
           coverage_percentage, coverage_status, created_at)
         VALUES (?1, ?2, 'sub_topic', 10, 101, 'mostly_covered', '2026-03-02T00:00:00Z')",
        params![id.get(), GROUP_A.get()],
      )?;
      Ok(())
    })
    .await;
  assert!(matches!(result, Err(Error::Sqlite(_))));
}
