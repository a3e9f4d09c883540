//! Integer identifiers for every entity the ledger refers to.
//!
//! Each id is a distinct newtype so a group id can never be passed where a
//! student id is expected. On the wire and in the database they are plain
//! integers.

use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl $name {
      pub const fn get(self) -> i64 { self.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }
  };
}

id_type!(
  /// A recorded class meeting.
  SessionId
);
id_type!(
  /// A teacher's instructional plan for one course offering.
  TeachingPlanId
);
id_type!(
  /// A named subset of students within a teaching plan.
  GroupId
);
id_type!(StudentId);
id_type!(TeacherId);
id_type!(CourseId);
id_type!(
  /// A curriculum unit (child of a chapter) that coverage is tracked against.
  SubTopicId
);
id_type!(LessonId);
