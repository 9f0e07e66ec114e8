//! Native rows → [`Contact`]s.
//!
//! Pipeline:
//!   Cursor / rows
//!     └─ group by mode id (first-seen order)
//!          └─ ContactAccum::absorb(row)  → per-MIME column mapping
//!               └─ ContactAccum::finish() → display-name fallback

use std::collections::{HashMap, HashSet};

use chrono::DateTime;
use roster_core::{
  contact::{Contact, LabeledValue, PostalAddress},
  date::LabeledDate,
  key::{ContactKey, ContactMode},
  label::{self, ItemType},
  native::{Cursor, DataRow, columns, mime},
};

// ─── Accumulator ─────────────────────────────────────────────────────────────

struct ContactAccum {
  mode:         ContactMode,
  contact:      Contact,
  has_birthday: bool,
}

impl ContactAccum {
  fn new(mode: ContactMode, first: &DataRow) -> Self {
    let contact = Contact {
      key: Some(ContactKey::from_row(mode, first)),
      ..Default::default()
    };
    Self {
      mode,
      contact,
      has_birthday: false,
    }
  }

  fn absorb(&mut self, row: DataRow) {
    let c = &mut self.contact;

    if let Some(key) = c.key.as_mut() {
      key.attach_lookup_key(row.lookup_key.as_deref());
    }
    if self.mode == ContactMode::Unified {
      if let Some(raw) = row.raw_contact_id {
        if !c.linked_contact_ids.contains(&raw) {
          c.linked_contact_ids.push(raw);
        }
      }
    }
    if c.last_modified.is_none() {
      c.last_modified = row.last_updated.and_then(DateTime::from_timestamp_millis);
    }
    c.starred |= row.starred;
    first_wins(&mut c.display_name, row.display_name.as_deref());

    let Some(mimetype) = row.mimetype.as_deref() else {
      return;
    };
    match mimetype {
      mime::NAME => {
        use columns::name::*;
        first_wins(&mut c.given_name, row.get(GIVEN));
        first_wins(&mut c.family_name, row.get(FAMILY));
        first_wins(&mut c.prefix, row.get(PREFIX));
        first_wins(&mut c.middle_name, row.get(MIDDLE));
        first_wins(&mut c.suffix, row.get(SUFFIX));
        first_wins(&mut c.display_name, row.get(DISPLAY));
      }
      mime::PHONE => push_labeled(&mut c.phones, ItemType::Phone, &row),
      mime::EMAIL => push_labeled(&mut c.emails, ItemType::Email, &row),
      mime::WEBSITE => push_labeled(&mut c.urls, ItemType::Url, &row),
      mime::IM => push_labeled(&mut c.social_profiles, ItemType::Social, &row),
      mime::POSTAL => {
        use columns::postal::*;
        c.postal_addresses.push(PostalAddress {
          label:    Some(decode_label(ItemType::Address, &row)),
          street:   non_empty(row.get(STREET)),
          city:     non_empty(row.get(CITY)),
          region:   non_empty(row.get(REGION)),
          postcode: non_empty(row.get(POSTCODE)),
          country:  non_empty(row.get(COUNTRY)),
        });
      }
      mime::EVENT => {
        let Some(value) = non_empty(row.get(columns::VALUE)) else {
          return;
        };
        let label = decode_label(ItemType::Event, &row);
        if label == label::BIRTHDAY {
          if self.has_birthday {
            return;
          }
          self.has_birthday = true;
        }
        c.dates.push(LabeledDate::new(Some(label), value));
      }
      mime::ORGANIZATION => {
        use columns::organization::*;
        first_wins(&mut c.company, row.get(COMPANY));
        first_wins(&mut c.job_title, row.get(TITLE));
      }
      mime::NOTE => first_wins(&mut c.note, row.get(columns::VALUE)),
      mime::GROUP_MEMBERSHIP => {
        if let Some(group) =
          non_empty(row.get(columns::group_membership::SOURCE_ID))
        {
          c.groups.insert(group);
        }
      }
      mime::PHOTO => {
        if c.avatar.is_none() {
          c.avatar = row.blob.filter(|b| !b.is_empty());
        }
      }
      other => tracing::trace!(mimetype = other, "ignoring unknown data row"),
    }
  }

  fn finish(mut self) -> Contact {
    if self.contact.display_name.is_none() {
      self.contact.display_name = self.contact.computed_display_name();
    }
    self.contact
  }
}

// ─── Column helpers ──────────────────────────────────────────────────────────

fn non_empty(v: Option<&str>) -> Option<String> {
  v.filter(|s| !s.trim().is_empty()).map(str::to_owned)
}

/// Set `slot` only if nothing has been seen yet.
fn first_wins(slot: &mut Option<String>, v: Option<&str>) {
  if slot.is_none() {
    *slot = non_empty(v);
  }
}

fn decode_label(item: ItemType, row: &DataRow) -> String {
  item.decode_label(
    row.get_int(item.type_column()),
    row.get(item.label_column()),
  )
}

fn push_labeled(out: &mut Vec<LabeledValue>, item: ItemType, row: &DataRow) {
  if let Some(value) = non_empty(row.get(columns::VALUE)) {
    out.push(LabeledValue {
      label: Some(decode_label(item, row)),
      value,
    });
  }
}

// ─── Grouping ────────────────────────────────────────────────────────────────

/// Rows with the same mode id are merged into one contact; contacts come out
/// in the order their first row was seen.
#[derive(Default)]
struct Grouper {
  order: Vec<ContactAccum>,
  index: HashMap<i64, usize>,
}

impl Grouper {
  fn contains(&self, id: i64) -> bool { self.index.contains_key(&id) }

  fn len(&self) -> usize { self.order.len() }

  fn absorb(&mut self, mode: ContactMode, id: i64, row: DataRow) {
    let slot = match self.index.get(&id) {
      Some(slot) => *slot,
      None => {
        self.order.push(ContactAccum::new(mode, &row));
        self.index.insert(id, self.order.len() - 1);
        self.order.len() - 1
      }
    };
    self.order[slot].absorb(row);
  }

  fn finish(self) -> Vec<Contact> {
    self.order.into_iter().map(ContactAccum::finish).collect()
  }
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Merge every row into contacts.
pub fn decode(
  mode: ContactMode,
  rows: impl IntoIterator<Item = DataRow>,
) -> Vec<Contact> {
  let mut grouper = Grouper::default();
  for row in rows {
    match mode.id_of(&row) {
      Some(id) => grouper.absorb(mode, id, row),
      None => tracing::trace!(%mode, "skipping row without a contact id"),
    }
  }
  grouper.finish()
}

/// Decode one page of contacts from `cursor`.
///
/// The first `offset` distinct contacts are skipped (all of their rows are
/// discarded) and at most `limit` contacts are materialized. Reading stops at
/// the first row of the contact after the page, and the cursor is dropped on
/// return either way.
pub fn decode_page(
  mode: ContactMode,
  mut cursor: Cursor,
  offset: usize,
  limit: Option<usize>,
) -> Vec<Contact> {
  let mut skipped = HashSet::new();
  let mut grouper = Grouper::default();

  while let Some(next) = cursor.peek() {
    let Some(id) = mode.id_of(next) else {
      cursor.next();
      continue;
    };
    if skipped.contains(&id) {
      cursor.next();
      continue;
    }
    if !grouper.contains(id) {
      if skipped.len() < offset {
        skipped.insert(id);
        cursor.next();
        continue;
      }
      if limit.is_some_and(|limit| grouper.len() >= limit) {
        break;
      }
    }
    if let Some(row) = cursor.next() {
      grouper.absorb(mode, id, row);
    }
  }

  grouper.finish()
}
