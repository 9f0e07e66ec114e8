//! Type-code tables for labelled multi-valued fields.
//!
//! The native store tags each phone, email, address, event, website and IM
//! row with an integer type code. One code per family is reserved for
//! "custom", in which case a free-text label sits in a sibling column.

use serde::{Deserialize, Serialize};

use crate::native::{self, columns};

/// Label used when a row carries no usable type information.
pub const OTHER: &str = "other";

/// Reserved label for the birthday event type.
pub const BIRTHDAY: &str = "birthday";

// ─── Tables ──────────────────────────────────────────────────────────────────

const PHONE: &[(i32, &str)] = &[
  (1, "home"),
  (2, "mobile"),
  (3, "work"),
  (4, "fax work"),
  (5, "fax home"),
  (6, "pager"),
  (7, "other"),
  (8, "callback"),
  (9, "car"),
  (10, "company"),
  (11, "isdn"),
  (12, "main"),
  (13, "fax other"),
  (14, "radio"),
  (15, "telex"),
  (16, "tty"),
  (17, "work mobile"),
  (18, "work pager"),
  (19, "assistant"),
  (20, "mms"),
];

const EMAIL: &[(i32, &str)] =
  &[(1, "home"), (2, "work"), (3, "other"), (4, "mobile")];

const ADDRESS: &[(i32, &str)] = &[(1, "home"), (2, "work"), (3, "other")];

const EVENT: &[(i32, &str)] =
  &[(1, "anniversary"), (2, "other"), (3, BIRTHDAY)];

const URL: &[(i32, &str)] = &[
  (1, "homepage"),
  (2, "blog"),
  (3, "profile"),
  (4, "home"),
  (5, "work"),
  (6, "ftp"),
  (7, "other"),
];

const SOCIAL: &[(i32, &str)] = &[
  (0, "aim"),
  (1, "msn"),
  (2, "yahoo"),
  (3, "skype"),
  (4, "qq"),
  (5, "google talk"),
  (6, "icq"),
  (7, "jabber"),
  (8, "netmeeting"),
];

// ─── ItemType ────────────────────────────────────────────────────────────────

/// A labelled field family.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
  Phone,
  Email,
  Address,
  Event,
  Url,
  /// Instant-messaging handles; the type code is the protocol.
  Social,
}

impl ItemType {
  pub const ALL: [ItemType; 6] = [
    ItemType::Phone,
    ItemType::Email,
    ItemType::Address,
    ItemType::Event,
    ItemType::Url,
    ItemType::Social,
  ];

  pub fn mimetype(self) -> &'static str {
    match self {
      ItemType::Phone => native::mime::PHONE,
      ItemType::Email => native::mime::EMAIL,
      ItemType::Address => native::mime::POSTAL,
      ItemType::Event => native::mime::EVENT,
      ItemType::Url => native::mime::WEBSITE,
      ItemType::Social => native::mime::IM,
    }
  }

  /// The code meaning "see the label column".
  pub fn custom_code(self) -> i32 {
    match self {
      ItemType::Social => -1,
      _ => 0,
    }
  }

  /// Data column (1-based) holding the type code.
  pub fn type_column(self) -> usize {
    match self {
      ItemType::Social => columns::im::PROTOCOL,
      _ => columns::TYPE,
    }
  }

  /// Data column (1-based) holding the free-text label.
  pub fn label_column(self) -> usize {
    match self {
      ItemType::Social => columns::im::CUSTOM_PROTOCOL,
      _ => columns::LABEL,
    }
  }

  pub fn table(self) -> &'static [(i32, &'static str)] {
    match self {
      ItemType::Phone => PHONE,
      ItemType::Email => EMAIL,
      ItemType::Address => ADDRESS,
      ItemType::Event => EVENT,
      ItemType::Url => URL,
      ItemType::Social => SOCIAL,
    }
  }

  /// Turn a stored (code, label) pair into a canonical label.
  ///
  /// A missing code is treated like the custom code. Custom labels are
  /// lower-cased but otherwise kept as stored; a blank or absent custom
  /// label and any unknown code both decode to `"other"`.
  pub fn decode_label(self, code: Option<i32>, custom: Option<&str>) -> String {
    let code = code.unwrap_or(self.custom_code());
    if code == self.custom_code() {
      return match custom {
        Some(text) if !text.trim().is_empty() => text.to_lowercase(),
        _ => OTHER.to_owned(),
      };
    }
    self
      .table()
      .iter()
      .find(|(c, _)| *c == code)
      .map(|(_, name)| (*name).to_owned())
      .unwrap_or_else(|| OTHER.to_owned())
  }

  /// Reverse lookup: a table label becomes its code; anything else becomes
  /// the custom code with the literal text.
  pub fn encode_label(self, label: Option<&str>) -> (i32, Option<String>) {
    let Some(label) = label else {
      return (self.custom_code(), None);
    };
    match self
      .table()
      .iter()
      .find(|(_, name)| name.eq_ignore_ascii_case(label.trim()))
    {
      Some((code, _)) => (*code, None),
      None => (self.custom_code(), Some(label.to_owned())),
    }
  }
}
