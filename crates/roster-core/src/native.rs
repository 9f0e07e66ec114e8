//! Vocabulary of the native contacts store.
//!
//! The store is row-oriented: each raw contact owns any number of data rows,
//! every data row is tagged with a MIME type, and the meaning of the generic
//! `data1..data10` columns depends on that type. Reads return [`DataRow`]s
//! through a [`Cursor`]; writes are expressed as a batch of [`Operation`]s that
//! the store applies atomically.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Notification URI meaning "something in the store changed".
pub const AUTHORITY_URI: &str = "content://com.android.contacts";
/// Notification URI for the aggregate contacts table.
pub const CONTACTS_URI: &str = "content://com.android.contacts/contacts";

/// Notification URI for a single contact.
pub fn contact_uri(id: i64) -> String { format!("{CONTACTS_URI}/{id}") }

pub mod mime {
  pub const NAME: &str = "vnd.android.cursor.item/name";
  pub const PHONE: &str = "vnd.android.cursor.item/phone_v2";
  pub const EMAIL: &str = "vnd.android.cursor.item/email_v2";
  pub const POSTAL: &str = "vnd.android.cursor.item/postal-address_v2";
  pub const EVENT: &str = "vnd.android.cursor.item/contact_event";
  pub const WEBSITE: &str = "vnd.android.cursor.item/website";
  pub const IM: &str = "vnd.android.cursor.item/im";
  pub const ORGANIZATION: &str = "vnd.android.cursor.item/organization";
  pub const NOTE: &str = "vnd.android.cursor.item/note";
  pub const GROUP_MEMBERSHIP: &str =
    "vnd.android.cursor.item/group_membership";
  pub const PHOTO: &str = "vnd.android.cursor.item/photo";
}

/// Column names usable inside a [`Selection`].
pub mod column {
  pub const RAW_CONTACT_ID: &str = "raw_contact_id";
  pub const CONTACT_ID: &str = "contact_id";
  pub const LOOKUP_KEY: &str = "lookup_key";
  /// Display name of the aggregate the row belongs to.
  pub const CONTACT_DISPLAY_NAME: &str = "contact_display_name";
  pub const MIMETYPE: &str = "mimetype";
}

/// 1-based indices into the generic data columns, per MIME type.
pub mod columns {
  /// Type code for labelled families.
  pub const TYPE: usize = 2;
  /// Free-text label when the type code is custom.
  pub const LABEL: usize = 3;
  /// Primary value for phone, email, website, event, note and IM rows.
  pub const VALUE: usize = 1;

  pub mod name {
    pub const DISPLAY: usize = 1;
    pub const GIVEN: usize = 2;
    pub const FAMILY: usize = 3;
    pub const PREFIX: usize = 4;
    pub const MIDDLE: usize = 5;
    pub const SUFFIX: usize = 6;
  }

  pub mod postal {
    pub const FORMATTED: usize = 1;
    pub const STREET: usize = 4;
    pub const CITY: usize = 7;
    pub const REGION: usize = 8;
    pub const POSTCODE: usize = 9;
    pub const COUNTRY: usize = 10;
  }

  pub mod organization {
    pub const COMPANY: usize = 1;
    pub const TITLE: usize = 4;
  }

  pub mod im {
    pub const PROTOCOL: usize = 5;
    pub const CUSTOM_PROTOCOL: usize = 6;
  }

  pub mod group_membership {
    pub const SOURCE_ID: usize = 1;
  }
}

/// Number of generic text data columns.
pub const DATA_COLUMNS: usize = 10;

// ─── Rows ────────────────────────────────────────────────────────────────────

/// One data row joined with its raw contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRow {
  pub raw_contact_id: Option<i64>,
  pub contact_id:     Option<i64>,
  pub lookup_key:     Option<String>,
  /// Store-computed display name of the raw contact.
  pub display_name:   Option<String>,
  /// Epoch milliseconds.
  pub last_updated:   Option<i64>,
  pub starred:        bool,
  pub mimetype:       Option<String>,
  pub data:           [Option<String>; DATA_COLUMNS],
  /// `data15`, used for photo bytes.
  pub blob:           Option<Vec<u8>>,
}

impl DataRow {
  /// Text of data column `col` (1-based). Out-of-range columns are `None`.
  pub fn get(&self, col: usize) -> Option<&str> {
    col
      .checked_sub(1)
      .and_then(|i| self.data.get(i))
      .and_then(|v| v.as_deref())
  }

  /// Like [`get`](Self::get) but parsed as an integer type code.
  pub fn get_int(&self, col: usize) -> Option<i32> {
    self.get(col).and_then(|v| v.trim().parse().ok())
  }

  pub fn is(&self, mimetype: &str) -> bool {
    self.mimetype.as_deref() == Some(mimetype)
  }
}

/// A row of the groups table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupRow {
  pub source_id: String,
  pub title:     Option<String>,
  pub notes:     Option<String>,
  /// Set on the group that backs the starred flag.
  pub favorites: bool,
  pub deleted:   bool,
}

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Forward-only row cursor.
///
/// A store may attach a close hook; it runs exactly once, when the cursor is
/// dropped, whether or not it was read to the end.
pub struct Cursor {
  rows:     std::vec::IntoIter<DataRow>,
  on_close: Option<Box<dyn FnOnce() + Send>>,
}

impl Cursor {
  pub fn new(rows: Vec<DataRow>) -> Self {
    Self {
      rows:     rows.into_iter(),
      on_close: None,
    }
  }

  pub fn with_close_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
    self.on_close = Some(Box::new(hook));
    self
  }

  /// Look at the next row without consuming it.
  pub fn peek(&self) -> Option<&DataRow> { self.rows.as_slice().first() }
}

impl Iterator for Cursor {
  type Item = DataRow;

  fn next(&mut self) -> Option<DataRow> { self.rows.next() }
}

impl Drop for Cursor {
  fn drop(&mut self) {
    if let Some(hook) = self.on_close.take() {
      hook();
    }
  }
}

impl fmt::Debug for Cursor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Cursor")
      .field("remaining", &self.rows.len())
      .field("has_close_hook", &self.on_close.is_some())
      .finish()
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// A bound argument of a [`Selection`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
  Int(i64),
  Text(String),
}

impl From<i64> for Arg {
  fn from(v: i64) -> Self { Arg::Int(v) }
}

impl From<String> for Arg {
  fn from(v: String) -> Self { Arg::Text(v) }
}

impl From<&str> for Arg {
  fn from(v: &str) -> Self { Arg::Text(v.to_owned()) }
}

/// A `WHERE` fragment with positional `?` placeholders over the
/// [`column`] names. An empty selection matches every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
  pub sql:  String,
  pub args: Vec<Arg>,
}

impl Selection {
  pub fn new(sql: impl Into<String>, args: Vec<Arg>) -> Self {
    Self {
      sql: sql.into(),
      args,
    }
  }

  pub fn all() -> Self { Self::default() }

  pub fn is_all(&self) -> bool { self.sql.trim().is_empty() }

  pub fn column_eq(column: &str, value: impl Into<Arg>) -> Self {
    Self::new(format!("{column} = ?"), vec![value.into()])
  }

  pub fn mimetype_in(mimetypes: &[&str]) -> Self {
    Self::new(
      format!("{} IN ({})", column::MIMETYPE, placeholders(mimetypes.len())),
      mimetypes.iter().map(|m| Arg::from(*m)).collect(),
    )
  }

  pub fn raw_contact_in(ids: &[i64]) -> Self {
    Self::new(
      format!("{} IN ({})", column::RAW_CONTACT_ID, placeholders(ids.len())),
      ids.iter().map(|id| Arg::Int(*id)).collect(),
    )
  }

  /// Rows of every contact whose aggregate display name starts with
  /// `prefix`, so linked raw contacts are matched as a whole. `%` and `_` in
  /// the prefix match literally.
  pub fn display_name_prefix(prefix: &str) -> Self {
    let escaped = prefix
      .replace('\\', "\\\\")
      .replace('%', "\\%")
      .replace('_', "\\_");
    Self::new(
      format!("{} LIKE ? ESCAPE '\\'", column::CONTACT_DISPLAY_NAME),
      vec![Arg::Text(format!("{escaped}%"))],
    )
  }

  pub fn and(self, other: Selection) -> Self { self.combine("AND", other) }

  pub fn or(self, other: Selection) -> Self { self.combine("OR", other) }

  fn combine(mut self, op: &str, other: Selection) -> Self {
    if other.is_all() {
      return self;
    }
    if self.is_all() {
      return other;
    }
    self.sql = format!("({}) {op} ({})", self.sql, other.sql);
    self.args.extend(other.args);
    self
  }
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

// ─── Queries ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Projection {
  /// Every column.
  #[default]
  Full,
  /// Only the id columns; used for counting.
  IdsOnly,
}

/// Ordering of contacts in a listing.
#[derive(
  Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
  #[default]
  FirstName,
  LastName,
  DisplayName,
}

impl SortOrder {
  /// Parse a wire name. Unknown names fall back to [`SortOrder::FirstName`].
  pub fn from_name(name: &str) -> Self {
    match name {
      "lastName" => SortOrder::LastName,
      "displayName" => SortOrder::DisplayName,
      _ => SortOrder::FirstName,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataQuery {
  pub selection:  Selection,
  pub projection: Projection,
  pub sort:       Option<SortOrder>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoResolution {
  High,
  Thumbnail,
}

// ─── Batch operations ────────────────────────────────────────────────────────

/// Column values for a data row insert or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataValues {
  pub columns: BTreeMap<usize, Option<String>>,
  pub blob:    Option<Vec<u8>>,
}

impl DataValues {
  pub fn new() -> Self { Self::default() }

  /// Set data column `col`. `None` writes NULL.
  pub fn set(mut self, col: usize, value: Option<impl Into<String>>) -> Self {
    self.columns.insert(col, value.map(Into::into));
    self
  }

  pub fn set_int(self, col: usize, value: i32) -> Self {
    self.set(col, Some(value.to_string()))
  }

  pub fn with_blob(mut self, bytes: Vec<u8>) -> Self {
    self.blob = Some(bytes);
    self
  }

  pub fn get(&self, col: usize) -> Option<&str> {
    self.columns.get(&col).and_then(|v| v.as_deref())
  }
}

/// The raw contact a data-row insert attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawContactRef {
  /// The id produced by an earlier operation in the same batch.
  BackReference(usize),
  Id(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  InsertRawContact {
    account_type: Option<String>,
    account_name: Option<String>,
    starred:      bool,
  },
  InsertData {
    raw_contact: RawContactRef,
    mimetype:    &'static str,
    values:      DataValues,
  },
  UpdateData {
    selection: Selection,
    values:    DataValues,
  },
  DeleteData {
    selection: Selection,
  },
  /// Remove whole raw contacts (and their data) matching the selection.
  DeleteContact {
    selection: Selection,
  },
}

impl Operation {
  pub fn insert_data(
    raw_contact: RawContactRef,
    mimetype: &'static str,
    values: DataValues,
  ) -> Self {
    Operation::InsertData {
      raw_contact,
      mimetype,
      values,
    }
  }

  pub fn mimetype(&self) -> Option<&'static str> {
    match self {
      Operation::InsertData { mimetype, .. } => Some(mimetype),
      _ => None,
    }
  }
}

/// Outcome of one [`Operation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpResult {
  /// Row id for inserts.
  pub id:    Option<i64>,
  /// Rows affected for updates and deletes.
  pub count: usize,
}
