//! JSON wire form of contacts and groups.
//!
//! Keys are camelCase, absent scalars are omitted and list fields are always
//! present. Ids travel as strings; input accepts numbers too.

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use chrono::{DateTime, Utc};
use roster_adapter::contact_identifier;
use roster_core::{
  contact::{Contact, LabeledValue, PostalAddress},
  date::{DateComponents, LabeledDate},
  key::{ContactMode, key_of},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, Result};

// ─── Field shapes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireItem {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireDate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date:  Option<DateComponents>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WireAddress {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label:    Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub street:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub city:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub postcode: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub region:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub country:  Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OtherKeys {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub lookup_key: Option<String>,
}

// ─── Contact ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireContact {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub identifier:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub single_contact_id:  Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub unified_contact_id: Option<String>,
  pub other_keys:         OtherKeys,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub display_name:       Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub given_name:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub middle_name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub family_name:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub prefix:             Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub suffix:             Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company:            Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub job_title:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub note:               Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub last_modified:      Option<String>,
  #[serde(skip_serializing_if = "std::ops::Not::not")]
  pub starred:            bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub avatar:             Option<String>,
  pub phones:             Vec<WireItem>,
  pub emails:             Vec<WireItem>,
  pub social_profiles:    Vec<WireItem>,
  pub urls:               Vec<WireItem>,
  pub dates:              Vec<WireDate>,
  pub postal_addresses:   Vec<WireAddress>,
  pub groups:             Vec<String>,
  pub linked_contact_ids: Vec<String>,
}

fn items(values: &[LabeledValue]) -> Vec<WireItem> {
  values
    .iter()
    .map(|v| WireItem {
      label: v.label.clone(),
      value: Some(v.value.clone()),
    })
    .collect()
}

fn from_items(items: Vec<WireItem>) -> Vec<LabeledValue> {
  items
    .into_iter()
    .filter_map(|i| {
      Some(LabeledValue {
        label: i.label,
        value: i.value?,
      })
    })
    .collect()
}

/// Encode a contact for the caller.
pub fn to_wire(contact: &Contact) -> WireContact {
  let key = contact.key.as_ref();
  WireContact {
    identifier: key.and_then(contact_identifier),
    single_contact_id: key
      .and_then(|k| k.single_contact_id)
      .map(|id| id.to_string()),
    unified_contact_id: key
      .and_then(|k| k.unified_contact_id)
      .map(|id| id.to_string()),
    other_keys: OtherKeys {
      lookup_key: key.and_then(|k| k.lookup_key.clone()),
    },
    display_name: contact.display_name.clone(),
    given_name: contact.given_name.clone(),
    middle_name: contact.middle_name.clone(),
    family_name: contact.family_name.clone(),
    prefix: contact.prefix.clone(),
    suffix: contact.suffix.clone(),
    company: contact.company.clone(),
    job_title: contact.job_title.clone(),
    note: contact.note.clone(),
    last_modified: contact.last_modified.map(|t| t.to_rfc3339()),
    starred: contact.starred,
    avatar: contact.avatar.as_ref().map(|bytes| B64.encode(bytes)),
    phones: items(&contact.phones),
    emails: items(&contact.emails),
    social_profiles: items(&contact.social_profiles),
    urls: items(&contact.urls),
    dates: contact
      .dates
      .iter()
      .map(|d| WireDate {
        label: d.label.clone(),
        value: Some(d.value.clone()),
        date:  d.date,
      })
      .collect(),
    postal_addresses: contact
      .postal_addresses
      .iter()
      .map(|a| WireAddress {
        label:    a.label.clone(),
        street:   a.street.clone(),
        city:     a.city.clone(),
        postcode: a.postcode.clone(),
        region:   a.region.clone(),
        country:  a.country.clone(),
      })
      .collect(),
    groups: contact.groups.iter().cloned().collect(),
    linked_contact_ids: contact
      .linked_contact_ids
      .iter()
      .map(|id| id.to_string())
      .collect(),
  }
}

/// Decode a caller-supplied contact map.
///
/// A map carrying no usable id or lookup key yields a contact without a key.
pub fn from_wire(mode: ContactMode, value: Value) -> Result<Contact> {
  let value = match value {
    Value::Null => Value::Object(Default::default()),
    other => other,
  };
  let key = key_of(mode, &value).ok();
  let wire: WireContact = serde_json::from_value(value)
    .map_err(|e| BridgeError::InvalidParameter(format!("contact: {e}")))?;

  let avatar = wire
    .avatar
    .map(|encoded| B64.decode(encoded.as_bytes()))
    .transpose()
    .map_err(|e| BridgeError::InvalidParameter(format!("avatar: {e}")))?;
  // Read-only on writes; kept so a round-tripped map stays intact.
  let last_modified = wire
    .last_modified
    .as_deref()
    .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
    .map(|t| t.with_timezone(&Utc));
  let dates = wire
    .dates
    .into_iter()
    .map(date_from_wire)
    .collect::<Result<Vec<_>>>()?;

  Ok(Contact {
    key,
    display_name: wire.display_name,
    given_name: wire.given_name,
    middle_name: wire.middle_name,
    family_name: wire.family_name,
    prefix: wire.prefix,
    suffix: wire.suffix,
    company: wire.company,
    job_title: wire.job_title,
    note: wire.note,
    last_modified,
    starred: wire.starred,
    phones: from_items(wire.phones),
    emails: from_items(wire.emails),
    social_profiles: from_items(wire.social_profiles),
    urls: from_items(wire.urls),
    dates,
    postal_addresses: wire
      .postal_addresses
      .into_iter()
      .map(|a| PostalAddress {
        label:    a.label,
        street:   a.street,
        city:     a.city,
        region:   a.region,
        postcode: a.postcode,
        country:  a.country,
      })
      .collect(),
    groups: wire.groups.into_iter().collect(),
    linked_contact_ids: wire
      .linked_contact_ids
      .iter()
      .filter_map(|id| id.parse().ok())
      .collect(),
    avatar,
  })
}

/// Components win over text; text alone is parsed.
fn date_from_wire(date: WireDate) -> Result<LabeledDate> {
  match (date.date, date.value) {
    (Some(components), _) if !components.is_empty() => {
      Ok(LabeledDate::from_components(date.label, components))
    }
    (_, Some(value)) => Ok(LabeledDate::new(date.label, value)),
    _ => Err(BridgeError::InvalidParameter(
      "dates: each entry needs `date` or `value`".to_owned(),
    )),
  }
}

#[cfg(test)]
mod tests {
  use roster_core::key::ContactKey;
  use serde_json::json;

  use super::*;

  #[test]
  fn absent_fields_are_omitted_and_lists_present() {
    let json = serde_json::to_value(to_wire(&Contact::default())).unwrap();
    let map = json.as_object().unwrap();
    assert!(!map.contains_key("identifier"));
    assert!(!map.contains_key("displayName"));
    assert!(!map.contains_key("starred"));
    assert_eq!(map["phones"], json!([]));
    assert_eq!(map["linkedContactIds"], json!([]));
    assert_eq!(map["otherKeys"], json!({}));
  }

  #[test]
  fn ids_are_strings_and_avatar_is_base64() {
    let contact = Contact {
      key: Some(
        ContactKey::new(ContactMode::Unified)
          .with_identifier(4)
          .with_lookup_key("lk-4"),
      ),
      avatar: Some(vec![0xde, 0xad]),
      linked_contact_ids: vec![7, 8],
      ..Default::default()
    };
    let json = serde_json::to_value(to_wire(&contact)).unwrap();
    assert_eq!(json["identifier"], "4");
    assert_eq!(json["unifiedContactId"], "4");
    assert_eq!(json["otherKeys"]["lookupKey"], "lk-4");
    assert_eq!(json["avatar"], "3q0=");
    assert_eq!(json["linkedContactIds"], json!(["7", "8"]));
  }

  #[test]
  fn decodes_caller_map() {
    let contact = from_wire(
      ContactMode::Single,
      json!({
        "identifier": 12,
        "givenName": "Ada",
        "phones": [{ "label": "mobile", "value": "555" }],
        "dates": [
          { "label": "birthday", "date": { "year": 1815, "month": 12, "day": 10 } },
          { "label": "anniversary", "value": "12-28" }
        ],
        "groups": ["g-1"],
        "avatar": "3q0=",
        "unknownKey": true
      }),
    )
    .unwrap();
    assert_eq!(contact.key.unwrap().single_contact_id, Some(12));
    assert_eq!(contact.given_name.as_deref(), Some("Ada"));
    assert_eq!(contact.phones, vec![LabeledValue::new("mobile", "555")]);
    assert_eq!(contact.dates[0].value, "1815-12-10");
    assert_eq!(
      contact.dates[1].date,
      Some(DateComponents {
        year:  None,
        month: Some(12),
        day:   Some(28),
      })
    );
    assert!(contact.groups.contains("g-1"));
    assert_eq!(contact.avatar, Some(vec![0xde, 0xad]));
  }

  #[test]
  fn map_without_ids_has_no_key() {
    let contact =
      from_wire(ContactMode::Single, json!({ "givenName": "New" })).unwrap();
    assert!(contact.key.is_none());
    assert!(from_wire(ContactMode::Single, Value::Null).unwrap().key.is_none());
  }

  #[test]
  fn date_without_value_or_components_is_rejected() {
    let err = from_wire(
      ContactMode::Single,
      json!({ "dates": [{ "label": "birthday" }] }),
    )
    .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidParameter(_)));
  }

  #[test]
  fn malformed_avatar_is_rejected() {
    let err =
      from_wire(ContactMode::Single, json!({ "avatar": "***" })).unwrap_err();
    assert!(matches!(err, BridgeError::InvalidParameter(_)));
  }
}
