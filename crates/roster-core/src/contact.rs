//! The canonical, denormalized contact.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  date::LabeledDate,
  key::ContactKey,
  label,
};

// ─── Field types ─────────────────────────────────────────────────────────────

/// A phone number, email address, website or IM handle with its label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledValue {
  pub label: Option<String>,
  pub value: String,
}

impl LabeledValue {
  pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      label: Some(label.into()),
      value: value.into(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
  pub label:    Option<String>,
  pub street:   Option<String>,
  pub city:     Option<String>,
  pub region:   Option<String>,
  pub postcode: Option<String>,
  pub country:  Option<String>,
}

impl PostalAddress {
  /// Single-line rendering of the present parts.
  pub fn formatted(&self) -> Option<String> {
    join_present(
      [
        &self.street,
        &self.city,
        &self.region,
        &self.postcode,
        &self.country,
      ],
      ", ",
    )
  }
}

// ─── Contact ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  /// Present once the contact has been persisted.
  pub key:                Option<ContactKey>,
  pub display_name:       Option<String>,
  pub given_name:         Option<String>,
  pub middle_name:        Option<String>,
  pub family_name:        Option<String>,
  pub prefix:             Option<String>,
  pub suffix:             Option<String>,
  pub company:            Option<String>,
  pub job_title:          Option<String>,
  pub note:               Option<String>,
  /// Store-provided; ignored on writes.
  pub last_modified:      Option<DateTime<Utc>>,
  /// Member of the favorites group.
  pub starred:            bool,
  pub phones:             Vec<LabeledValue>,
  pub emails:             Vec<LabeledValue>,
  pub social_profiles:    Vec<LabeledValue>,
  pub urls:               Vec<LabeledValue>,
  pub dates:              Vec<LabeledDate>,
  pub postal_addresses:   Vec<PostalAddress>,
  /// Group source ids.
  pub groups:             BTreeSet<String>,
  /// Raw contacts aggregated into this one; only filled in unified mode.
  pub linked_contact_ids: Vec<i64>,
  pub avatar:             Option<Vec<u8>>,
}

impl Contact {
  /// Present name parts joined in reading order: prefix, given, middle,
  /// family, suffix.
  pub fn computed_display_name(&self) -> Option<String> {
    join_present(
      [
        &self.prefix,
        &self.given_name,
        &self.middle_name,
        &self.family_name,
        &self.suffix,
      ],
      " ",
    )
  }

  /// Display name written on update: given and family name when either is
  /// present, otherwise the stored display name.
  pub fn update_display_name(&self) -> Option<String> {
    join_present([&self.given_name, &self.family_name], " ")
      .or_else(|| self.display_name.clone())
  }

  pub fn birthday(&self) -> Option<&LabeledDate> {
    self
      .dates
      .iter()
      .find(|d| d.label.as_deref() == Some(label::BIRTHDAY))
  }

  /// The key, provided it can address a stored contact.
  pub fn require_key(&self) -> Result<&ContactKey> {
    let key = self.key.as_ref().ok_or_else(|| {
      Error::invalid_parameter("identifier", "contact has no key")
    })?;
    key.check_valid()?;
    Ok(key)
  }
}

fn join_present<const N: usize>(
  parts: [&Option<String>; N],
  sep: &str,
) -> Option<String> {
  let joined = parts
    .into_iter()
    .filter_map(|p| p.as_deref().map(str::trim))
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(sep);
  (!joined.is_empty()).then_some(joined)
}

// ─── Group ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
  pub identifier:  String,
  pub name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  /// Member contact identifiers.
  pub contacts:    BTreeSet<String>,
}
