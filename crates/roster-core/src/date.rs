//! Partial calendar dates.
//!
//! Contact stores hold event dates as free text. Birthdays frequently omit the
//! year, and imported data mixes ISO, slash and dash forms, so the canonical
//! representation is a set of independently optional components plus the raw
//! string it came from.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ─── DateComponents ──────────────────────────────────────────────────────────

/// A partial calendar date. Any component may be missing.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub struct DateComponents {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub year:  Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub month: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub day:   Option<i32>,
}

impl DateComponents {
  pub fn ymd(year: i32, month: i32, day: i32) -> Self {
    Self {
      year:  Some(year),
      month: Some(month),
      day:   Some(day),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.year.is_none() && self.month.is_none() && self.day.is_none()
  }

  /// Render the present components joined by `-`, each zero-padded to two
  /// digits. `{year: 2020, month: 3, day: 5}` becomes `2020-03-05`.
  pub fn format(&self) -> String {
    [self.year, self.month, self.day]
      .into_iter()
      .flatten()
      .map(|part| format!("{part:02}"))
      .collect::<Vec<_>>()
      .join("-")
  }

  /// Recover components from a free-text date.
  ///
  /// Tries a full ISO 8601 parse first, then falls back to splitting on `-`
  /// and `/`. Returns `None` when neither strategy yields anything; this is
  /// never an error, and callers keep the raw string regardless.
  pub fn try_parse(raw: &str) -> Option<Self> {
    let raw = raw.trim();
    if raw.is_empty() {
      return None;
    }
    parse_iso(raw).or_else(|| parse_segments(raw))
  }
}

impl From<NaiveDate> for DateComponents {
  fn from(d: NaiveDate) -> Self {
    Self::ymd(d.year(), d.month() as i32, d.day() as i32)
  }
}

// ─── LabeledDate ─────────────────────────────────────────────────────────────

/// A labelled event date. `value` is the raw text exactly as stored; `date`
/// holds whatever components could be recovered from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledDate {
  pub label: Option<String>,
  pub value: String,
  pub date:  Option<DateComponents>,
}

impl LabeledDate {
  /// Build from raw text, parsing components where possible.
  pub fn new(label: Option<String>, value: impl Into<String>) -> Self {
    let value = value.into();
    let date = DateComponents::try_parse(&value);
    Self { label, value, date }
  }

  /// Build from components; the stored text is the formatted form.
  pub fn from_components(label: Option<String>, date: DateComponents) -> Self {
    Self {
      label,
      value: date.format(),
      date: Some(date),
    }
  }
}

// ─── Parsing strategies ──────────────────────────────────────────────────────

fn parse_iso(raw: &str) -> Option<DateComponents> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Some(dt.date_naive().into());
  }
  for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
      return Some(dt.date().into());
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(Into::into)
}

/// Split on `-` and `/` and interpret the integer segments positionally.
///
/// - 3 segments: year, month, day
/// - 2 segments: a value above 1000 is the year and the other the month;
///   otherwise month, day
/// - 1 segment: year
fn parse_segments(raw: &str) -> Option<DateComponents> {
  let parts = raw
    .split(['-', '/'])
    .filter(|s| !s.trim().is_empty())
    .map(parse_segment)
    .collect::<Option<Vec<i32>>>()?;

  let components = match parts.as_slice() {
    [year] => DateComponents {
      year: Some(*year),
      ..Default::default()
    },
    [a, b] if *a > 1000 => DateComponents {
      year: Some(*a),
      month: Some(*b),
      ..Default::default()
    },
    [a, b] if *b > 1000 => DateComponents {
      year: Some(*b),
      month: Some(*a),
      ..Default::default()
    },
    [month, day] => DateComponents {
      month: Some(*month),
      day: Some(*day),
      ..Default::default()
    },
    [year, month, day] => DateComponents::ymd(*year, *month, *day),
    _ => return None,
  };
  Some(components)
}

/// Parse one segment after stripping leading zeros (`"05"` → 5, `"00"` → 0).
fn parse_segment(segment: &str) -> Option<i32> {
  let digits = segment.trim().trim_start_matches('0');
  if digits.is_empty() {
    return Some(0);
  }
  digits.parse().ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
