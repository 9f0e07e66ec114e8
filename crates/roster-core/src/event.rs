//! Change events pushed to observers.

use serde::{Deserialize, Serialize};

use crate::native::{AUTHORITY_URI, CONTACTS_URI};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ContactEvent {
  /// Something in the store changed; re-read what you need.
  ContactsChanged,
  /// One contact changed.
  ContactChanged {
    #[serde(rename = "contactId")]
    contact_id: String,
  },
}

impl ContactEvent {
  /// Classify a native change notification by its URI.
  ///
  /// No URI, or a URI naming the whole store or the contacts table, is a
  /// store-wide change. Anything else names one contact by its final path
  /// segment.
  pub fn classify(uri: Option<&str>) -> Self {
    let Some(uri) = uri else {
      return ContactEvent::ContactsChanged;
    };
    let trimmed = uri.trim_end_matches('/');
    if trimmed == AUTHORITY_URI || trimmed == CONTACTS_URI {
      return ContactEvent::ContactsChanged;
    }
    match trimmed.rsplit('/').next() {
      Some(segment) if !segment.is_empty() => ContactEvent::ContactChanged {
        contact_id: segment.to_owned(),
      },
      _ => ContactEvent::ContactsChanged,
    }
  }
}
