//! SQL schema for the Classbook SQLite store.
//!
//! Executed at connection startup. Every closed enumeration and numeric
//! range of the domain is repeated here as a CHECK constraint, so rows
//! written by any other tool are held to the same rules.

/// Version recorded in `PRAGMA user_version` once [`SCHEMA`] is applied.
pub const SCHEMA_VERSION: i64 = 1;

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

-- ─── Reference data (read-only to the ledger) ───────────────────────────────

CREATE TABLE IF NOT EXISTS teaching_plans (
    plan_id    INTEGER PRIMARY KEY,
    course_id  INTEGER NOT NULL,
    title      TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS student_groups (
    group_id   INTEGER PRIMARY KEY,
    plan_id    INTEGER NOT NULL REFERENCES teaching_plans(plan_id) ON DELETE CASCADE,
    name       TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS group_members (
    group_id   INTEGER NOT NULL REFERENCES student_groups(group_id) ON DELETE CASCADE,
    student_id INTEGER NOT NULL,
    PRIMARY KEY (group_id, student_id)
);

CREATE TABLE IF NOT EXISTS sub_topics (
    sub_topic_id  INTEGER PRIMARY KEY,
    course_id     INTEGER NOT NULL,
    title         TEXT    NOT NULL,
    chapter_title TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS lessons (
    lesson_id    INTEGER PRIMARY KEY,
    course_id    INTEGER NOT NULL,
    title        TEXT    NOT NULL,
    module_title TEXT    NOT NULL
);

-- ─── Session reports ────────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS session_reports (
    session_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    plan_id      INTEGER NOT NULL REFERENCES teaching_plans(plan_id),
    title        TEXT    NOT NULL,
    session_date TEXT    NOT NULL,   -- YYYY-MM-DD
    mode         TEXT    NOT NULL
                 CHECK (mode IN ('in_person', 'online', 'hybrid')),
    location     TEXT,
    notes        TEXT,
    teacher_id   INTEGER NOT NULL,
    current_step INTEGER NOT NULL DEFAULT 0 CHECK (current_step >= 0),
    is_completed INTEGER NOT NULL DEFAULT 0 CHECK (is_completed IN (0, 1)),
    created_at   TEXT    NOT NULL,
    completed_at TEXT
);

-- One marker per step that has saved data. Keyed by number so steps can be
-- added without reinterpreting stored progress.
CREATE TABLE IF NOT EXISTS session_steps (
    session_id  INTEGER NOT NULL REFERENCES session_reports(session_id) ON DELETE CASCADE,
    step_number INTEGER NOT NULL CHECK (step_number >= 1),
    step_name   TEXT    NOT NULL,
    saved_at    TEXT    NOT NULL,
    PRIMARY KEY (session_id, step_number)
);

-- ─── Plan / execution ledger ────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS group_plans (
    session_id         INTEGER NOT NULL REFERENCES session_reports(session_id) ON DELETE CASCADE,
    group_id           INTEGER NOT NULL REFERENCES student_groups(group_id) ON DELETE CASCADE,
    planned_objectives TEXT,
    planned_sub_topics TEXT    NOT NULL DEFAULT '[]' CHECK (json_valid(planned_sub_topics)),
    planned_lessons    TEXT    NOT NULL DEFAULT '[]' CHECK (json_valid(planned_lessons)),
    additional_topics  TEXT,
    planned_at         TEXT    NOT NULL,
    PRIMARY KEY (session_id, group_id)
);

CREATE TABLE IF NOT EXISTS group_executions (
    session_id                   INTEGER NOT NULL REFERENCES session_reports(session_id) ON DELETE CASCADE,
    group_id                     INTEGER NOT NULL REFERENCES student_groups(group_id) ON DELETE CASCADE,
    achieved_objectives          TEXT,
    achieved_sub_topics          TEXT    NOT NULL DEFAULT '[]' CHECK (json_valid(achieved_sub_topics)),
    achieved_lessons             TEXT    NOT NULL DEFAULT '[]' CHECK (json_valid(achieved_lessons)),
    additional_topics_covered    TEXT,
    uncovered_topics             TEXT,
    uncovered_reasons            TEXT,
    group_feedback               TEXT,
    understanding_level          INTEGER NOT NULL CHECK (understanding_level BETWEEN 1 AND 5),
    participation_level          INTEGER NOT NULL CHECK (participation_level BETWEEN 1 AND 5),
    teacher_satisfaction         INTEGER
                                 CHECK (teacher_satisfaction IS NULL
                                        OR teacher_satisfaction BETWEEN 1 AND 5),
    challenges                   TEXT,
    next_session_recommendations TEXT,
    completed_at                 TEXT    NOT NULL,
    PRIMARY KEY (session_id, group_id)
);

-- ─── Topic coverage ledger ──────────────────────────────────────────────────

-- Several rows may share (session, group, topic); readers take the latest.
CREATE TABLE IF NOT EXISTS topic_coverage (
    coverage_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id          INTEGER NOT NULL REFERENCES session_reports(session_id) ON DELETE CASCADE,
    group_id            INTEGER NOT NULL REFERENCES student_groups(group_id) ON DELETE CASCADE,
    topic_kind          TEXT    NOT NULL
                        CHECK (topic_kind IN ('sub_topic', 'lesson', 'additional')),
    topic_ref           INTEGER,
    topic_title         TEXT,
    was_planned         INTEGER NOT NULL DEFAULT 0 CHECK (was_planned IN (0, 1)),
    was_covered         INTEGER NOT NULL DEFAULT 0 CHECK (was_covered IN (0, 1)),
    coverage_percentage INTEGER NOT NULL CHECK (coverage_percentage BETWEEN 0 AND 100),
    coverage_status     TEXT    NOT NULL
                        CHECK (coverage_status IN ('not_covered', 'partially_covered',
                                                   'mostly_covered', 'fully_covered')),
    teacher_notes       TEXT,
    challenges          TEXT,
    created_at          TEXT    NOT NULL,
    CHECK ((topic_kind = 'additional' AND topic_ref IS NULL AND topic_title IS NOT NULL)
        OR (topic_kind <> 'additional' AND topic_ref IS NOT NULL))
);

-- ─── Attendance ledger ──────────────────────────────────────────────────────

CREATE TABLE IF NOT EXISTS attendance (
    session_id          INTEGER NOT NULL REFERENCES session_reports(session_id) ON DELETE CASCADE,
    student_id          INTEGER NOT NULL,
    group_id            INTEGER REFERENCES student_groups(group_id) ON DELETE SET NULL,
    status              TEXT    NOT NULL
                        CHECK (status IN ('present', 'absent', 'late', 'excused')),
    participation_score INTEGER
                        CHECK (participation_score IS NULL
                               OR participation_score BETWEEN 0 AND 100),
    comment             TEXT,
    recorded_at         TEXT    NOT NULL,
    PRIMARY KEY (session_id, student_id)
);

-- ─── Curriculum progress (derived) ──────────────────────────────────────────

CREATE TABLE IF NOT EXISTS progress_summaries (
    plan_id                     INTEGER NOT NULL REFERENCES teaching_plans(plan_id) ON DELETE CASCADE,
    sub_topic_id                INTEGER NOT NULL,
    group_id                    INTEGER NOT NULL REFERENCES student_groups(group_id) ON DELETE CASCADE,
    overall_status              INTEGER NOT NULL CHECK (overall_status BETWEEN 0 AND 4),
    first_taught_date           TEXT,
    last_taught_date            TEXT,
    sessions_count              INTEGER NOT NULL DEFAULT 0 CHECK (sessions_count >= 0),
    overall_progress_percentage INTEGER NOT NULL
                                CHECK (overall_progress_percentage BETWEEN 0 AND 100),
    PRIMARY KEY (plan_id, sub_topic_id, group_id)
);

CREATE INDEX IF NOT EXISTS session_reports_plan_idx ON session_reports(plan_id);
CREATE INDEX IF NOT EXISTS topic_coverage_pair_idx  ON topic_coverage(session_id, group_id);
CREATE INDEX IF NOT EXISTS topic_coverage_topic_idx ON topic_coverage(topic_kind, topic_ref, group_id);
CREATE INDEX IF NOT EXISTS group_members_student_idx ON group_members(student_id);

PRAGMA user_version = 1;
";
