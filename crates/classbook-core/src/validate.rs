//! Field-level validation primitives.
//!
//! Validation never stops at the first problem: every offending field of a
//! request is collected into [`ValidationErrors`] so a client can highlight
//! all of them at once. Out-of-range values are rejected, never clamped.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Field errors ────────────────────────────────────────────────────────────

/// One rejected field. `field` is a path such as
/// `groups[1].entries[0].coverage_percentage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

impl fmt::Display for FieldError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}: {}", self.field, self.message)
  }
}

/// An accumulator of [`FieldError`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  /// A single-field failure.
  pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
    let mut errs = Self::new();
    errs.push(field, message);
    errs
  }

  pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
    self.0.push(FieldError {
      field:   field.into(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn fields(&self) -> &[FieldError] { &self.0 }

  /// Whether any error was recorded against `field`.
  pub fn has(&self, field: &str) -> bool {
    self.0.iter().any(|e| e.field == field)
  }

  /// `Ok(value)` if nothing was recorded, otherwise [`Error::Validation`].
  pub fn finish<T>(self, value: T) -> Result<T> {
    if self.is_empty() {
      Ok(value)
    } else {
      Err(Error::Validation(self))
    }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, e) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("; ")?;
      }
      write!(f, "{e}")?;
    }
    Ok(())
  }
}

/// Join a parent path and a child field name.
pub fn field(prefix: &str, name: &str) -> String {
  if prefix.is_empty() {
    name.to_owned()
  } else {
    format!("{prefix}.{name}")
  }
}

/// Path of the `index`-th element of the list field `name`.
pub fn indexed(prefix: &str, name: &str, index: usize) -> String {
  format!("{}[{index}]", field(prefix, name))
}

// ─── Bounded integers ────────────────────────────────────────────────────────

macro_rules! bounded {
  ($(#[$meta:meta])* $name:ident, $min:expr, $max:expr) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
      Deserialize,
    )]
    #[serde(try_from = "i64", into = "i64")]
    pub struct $name(u8);

    impl $name {
      pub const MIN: u8 = $min;
      pub const MAX: u8 = $max;

      /// `None` if `raw` lies outside the closed range.
      pub fn new(raw: i64) -> Option<Self> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&raw) {
          Some(Self(raw as u8))
        } else {
          None
        }
      }

      pub const fn get(self) -> u8 { self.0 }

      /// Validate `raw`, recording a field error when it is out of range.
      pub fn check(
        raw: i64,
        field: impl Into<String>,
        errs: &mut ValidationErrors,
      ) -> Option<Self> {
        let value = Self::new(raw);
        if value.is_none() {
          errs.push(
            field,
            format!("{raw} is outside the allowed range [{}, {}]", Self::MIN, Self::MAX),
          );
        }
        value
      }
    }

    impl TryFrom<i64> for $name {
      type Error = String;

      fn try_from(raw: i64) -> std::result::Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| {
          format!("{raw} is outside the allowed range [{}, {}]", Self::MIN, Self::MAX)
        })
      }
    }

    impl From<$name> for i64 {
      fn from(value: $name) -> Self { i64::from(value.0) }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }
  };
}

bounded!(
  /// An ordinal rating in `[1, 5]` (understanding, participation,
  /// satisfaction).
  Rating, 1, 5
);
bounded!(
  /// A percentage in `[0, 100]`.
  Percentage, 0, 100
);
bounded!(
  /// A per-student participation score in `[0, 100]`.
  ParticipationScore, 0, 100
);

impl Percentage {
  pub const FULL: Percentage = Percentage(100);

  pub fn is_full(self) -> bool { self == Self::FULL }
}

/// Parse a closed-enumeration value from its wire name, recording a field
/// error that lists the accepted values on failure.
pub fn parse_enum<T>(
  raw: &str,
  field: impl Into<String>,
  errs: &mut ValidationErrors,
) -> Option<T>
where
  T: std::str::FromStr + strum::IntoEnumIterator + AsRef<str>,
{
  match raw.parse::<T>() {
    Ok(v) => Some(v),
    Err(_) => {
      let accepted = T::iter()
        .map(|v| v.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(", ");
      errs.push(field, format!("unknown value {raw:?}; expected one of {accepted}"));
      None
    }
  }
}

/// Record an error if `value` is absent or blank.
pub fn require_text(
  value: Option<&str>,
  field: impl Into<String>,
  errs: &mut ValidationErrors,
) -> Option<String> {
  match value.map(str::trim) {
    Some(v) if !v.is_empty() => Some(v.to_owned()),
    _ => {
      errs.push(field, "must not be empty");
      None
    }
  }
}
