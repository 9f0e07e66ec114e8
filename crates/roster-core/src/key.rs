//! Contact identity.
//!
//! A contact is addressed either as one raw (per-account) record or as the
//! unified aggregate the store builds over linked raw records. Which id is
//! "the" identifier depends on the [`ContactMode`] the caller works in; the
//! lookup key is a stable alternative that survives re-aggregation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  native::{DataRow, Selection, column},
};

// ─── ContactMode ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ContactMode {
  /// Address raw contacts by `raw_contact_id`.
  #[default]
  Single,
  /// Address aggregate contacts by `contact_id`.
  Unified,
}

impl ContactMode {
  pub fn id_column(self) -> &'static str {
    match self {
      ContactMode::Single => column::RAW_CONTACT_ID,
      ContactMode::Unified => column::CONTACT_ID,
    }
  }

  /// The row's id under this mode.
  pub fn id_of(self, row: &DataRow) -> Option<i64> {
    match self {
      ContactMode::Single => row.raw_contact_id,
      ContactMode::Unified => row.contact_id,
    }
  }

  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "single" => Some(ContactMode::Single),
      "unified" => Some(ContactMode::Unified),
      _ => None,
    }
  }
}

impl fmt::Display for ContactMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      ContactMode::Single => "single",
      ContactMode::Unified => "unified",
    })
  }
}

// ─── ContactKey ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactKey {
  pub mode:               ContactMode,
  pub single_contact_id:  Option<i64>,
  pub unified_contact_id: Option<i64>,
  pub lookup_key:         Option<String>,
}

impl ContactKey {
  pub fn new(mode: ContactMode) -> Self {
    Self {
      mode,
      single_contact_id: None,
      unified_contact_id: None,
      lookup_key: None,
    }
  }

  /// Build a key from the id columns of a row.
  pub fn from_row(mode: ContactMode, row: &DataRow) -> Self {
    Self {
      mode,
      single_contact_id: row.raw_contact_id,
      unified_contact_id: row.contact_id,
      lookup_key: row.lookup_key.clone(),
    }
  }

  /// The id slot selected by the mode.
  pub fn identifier(&self) -> Option<i64> {
    match self.mode {
      ContactMode::Single => self.single_contact_id,
      ContactMode::Unified => self.unified_contact_id,
    }
  }

  /// Set the id slot selected by the mode, leaving the other untouched.
  pub fn with_identifier(mut self, id: i64) -> Self {
    match self.mode {
      ContactMode::Single => self.single_contact_id = Some(id),
      ContactMode::Unified => self.unified_contact_id = Some(id),
    }
    self
  }

  pub fn with_lookup_key(mut self, lookup_key: impl Into<String>) -> Self {
    self.lookup_key = Some(lookup_key.into());
    self
  }

  /// Record a lookup key discovered after the key was built. An existing
  /// lookup key is never replaced.
  pub fn attach_lookup_key(&mut self, lookup_key: Option<&str>) {
    if self.lookup_key.is_none() {
      self.lookup_key = lookup_key
        .filter(|lk| !lk.is_empty())
        .map(str::to_owned);
    }
  }

  pub fn is_valid(&self) -> bool {
    self.identifier().is_some() || self.lookup_key.is_some()
  }

  pub fn check_valid(&self) -> Result<()> {
    if self.is_valid() {
      Ok(())
    } else {
      Err(Error::invalid_parameter(
        "identifier",
        format!("{} contact key has neither an id nor a lookup key", self.mode),
      ))
    }
  }

  /// A selection matching the rows of this contact.
  pub fn to_selection(&self) -> Result<Selection> {
    self.check_valid()?;
    let by_id = self
      .identifier()
      .map(|id| Selection::column_eq(self.mode.id_column(), id))
      .unwrap_or_default();
    let by_lookup = self
      .lookup_key
      .as_deref()
      .map(|lk| Selection::column_eq(column::LOOKUP_KEY, lk))
      .unwrap_or_default();
    Ok(by_id.or(by_lookup))
  }
}

impl fmt::Display for ContactKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match (self.identifier(), &self.lookup_key) {
      (Some(id), _) => write!(f, "{}:{id}", self.mode),
      (None, Some(lk)) => write!(f, "{}:lookup={lk}", self.mode),
      (None, None) => write!(f, "{}:<none>", self.mode),
    }
  }
}

// ─── Resolution from caller input ────────────────────────────────────────────

/// Build a key from caller-supplied input.
///
/// Accepts a bare number, a numeric string, or an object with any of
/// `identifier`, `singleContactId`, `unifiedContactId`, `lookupKey` and
/// `otherKeys.lookupKey`. Explicit id slots win over `identifier`.
pub fn key_of(mode: ContactMode, value: &Value) -> Result<ContactKey> {
  let key = match value {
    Value::Object(map) => {
      let mut key = ContactKey::new(mode);
      if let Some(id) = map.get("identifier").and_then(as_id) {
        key = key.with_identifier(id);
      }
      if let Some(id) = map.get("singleContactId").and_then(as_id) {
        key.single_contact_id = Some(id);
      }
      if let Some(id) = map.get("unifiedContactId").and_then(as_id) {
        key.unified_contact_id = Some(id);
      }
      let lookup = map.get("lookupKey").or_else(|| {
        map
          .get("otherKeys")
          .and_then(|other| other.get("lookupKey"))
      });
      key.attach_lookup_key(lookup.and_then(Value::as_str));
      key
    }
    other => match as_id(other) {
      Some(id) => ContactKey::new(mode).with_identifier(id),
      None => return Err(Error::InvalidIdentifier(other.to_string())),
    },
  };
  if key.is_valid() {
    Ok(key)
  } else {
    Err(Error::InvalidIdentifier(value.to_string()))
  }
}

fn as_id(value: &Value) -> Option<i64> {
  match value {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}
