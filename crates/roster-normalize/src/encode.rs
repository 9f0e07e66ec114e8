//! [`Contact`] → native batch operations.

use roster_core::{
  contact::{Contact, LabeledValue},
  label::ItemType,
  native::{
    DataValues, Operation, RawContactRef, Selection, columns, mime,
  },
};

/// Families that an update clears and rewrites from the in-memory contact.
/// Name rows are updated in place and photos are left alone.
pub const MUTABLE_FAMILIES: [&str; 9] = [
  mime::ORGANIZATION,
  mime::PHONE,
  mime::EMAIL,
  mime::NOTE,
  mime::POSTAL,
  mime::EVENT,
  mime::WEBSITE,
  mime::IM,
  mime::GROUP_MEMBERSHIP,
];

/// Raw contacts an update writes to, as resolved from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateTarget {
  /// Every raw contact behind the key; the first one receives new rows.
  pub raw_contact_ids:  Vec<i64>,
  /// Whether the first raw contact already has a name row.
  pub primary_has_name: bool,
}

// ─── Row builders ────────────────────────────────────────────────────────────

fn name_values(contact: &Contact, display_name: Option<String>) -> DataValues {
  use columns::name::*;
  DataValues::new()
    .set(DISPLAY, display_name)
    .set(GIVEN, contact.given_name.clone())
    .set(FAMILY, contact.family_name.clone())
    .set(PREFIX, contact.prefix.clone())
    .set(MIDDLE, contact.middle_name.clone())
    .set(SUFFIX, contact.suffix.clone())
}

fn labeled_values(
  item: ItemType,
  label: Option<&str>,
  value: &str,
) -> DataValues {
  let (code, custom) = item.encode_label(label);
  DataValues::new()
    .set(columns::VALUE, Some(value))
    .set_int(item.type_column(), code)
    .set(item.label_column(), custom)
}

fn push_labeled(
  ops: &mut Vec<Operation>,
  target: RawContactRef,
  item: ItemType,
  entries: &[LabeledValue],
) {
  for entry in entries {
    ops.push(Operation::insert_data(
      target,
      item.mimetype(),
      labeled_values(item, entry.label.as_deref(), &entry.value),
    ));
  }
}

/// Insert ops for every non-name family of `contact`, attached to `target`.
fn field_ops(contact: &Contact, target: RawContactRef) -> Vec<Operation> {
  let mut ops = Vec::new();

  if let Some(note) = &contact.note {
    ops.push(Operation::insert_data(
      target,
      mime::NOTE,
      DataValues::new().set(columns::VALUE, Some(note.as_str())),
    ));
  }

  if contact.company.is_some() || contact.job_title.is_some() {
    use columns::organization::*;
    ops.push(Operation::insert_data(
      target,
      mime::ORGANIZATION,
      DataValues::new()
        .set(COMPANY, contact.company.clone())
        .set(TITLE, contact.job_title.clone()),
    ));
  }

  push_labeled(&mut ops, target, ItemType::Phone, &contact.phones);
  push_labeled(&mut ops, target, ItemType::Email, &contact.emails);
  push_labeled(&mut ops, target, ItemType::Url, &contact.urls);
  push_labeled(&mut ops, target, ItemType::Social, &contact.social_profiles);

  for address in &contact.postal_addresses {
    use columns::postal::*;
    let (code, custom) =
      ItemType::Address.encode_label(address.label.as_deref());
    ops.push(Operation::insert_data(
      target,
      mime::POSTAL,
      DataValues::new()
        .set(FORMATTED, address.formatted())
        .set_int(columns::TYPE, code)
        .set(columns::LABEL, custom)
        .set(STREET, address.street.clone())
        .set(CITY, address.city.clone())
        .set(REGION, address.region.clone())
        .set(POSTCODE, address.postcode.clone())
        .set(COUNTRY, address.country.clone()),
    ));
  }

  for date in &contact.dates {
    ops.push(Operation::insert_data(
      target,
      mime::EVENT,
      labeled_values(ItemType::Event, date.label.as_deref(), &date.value),
    ));
  }

  for group in &contact.groups {
    ops.push(Operation::insert_data(
      target,
      mime::GROUP_MEMBERSHIP,
      DataValues::new().set(
        columns::group_membership::SOURCE_ID,
        Some(group.as_str()),
      ),
    ));
  }

  ops
}

// ─── Public API ──────────────────────────────────────────────────────────────

/// Batch creating `contact` as a new raw contact.
///
/// Op 0 inserts the raw contact; every data row back-references it. A name
/// row is always written so the store can compute a display name.
pub fn encode_insert(contact: &Contact) -> Vec<Operation> {
  let raw = RawContactRef::BackReference(0);
  let display_name = contact
    .display_name
    .clone()
    .or_else(|| contact.computed_display_name());

  let mut ops = vec![
    Operation::InsertRawContact {
      account_type: None,
      account_name: None,
      starred:      contact.starred,
    },
    Operation::insert_data(raw, mime::NAME, name_values(contact, display_name)),
  ];
  ops.extend(field_ops(contact, raw));

  if let Some(avatar) = &contact.avatar {
    ops.push(Operation::insert_data(
      raw,
      mime::PHOTO,
      DataValues::new().with_blob(avatar.clone()),
    ));
  }
  ops
}

/// Batch replacing the stored rows of an existing contact.
///
/// Rows of [`MUTABLE_FAMILIES`] are deleted across all raw contacts, the name
/// row of the primary raw contact is rewritten, and the in-memory families are
/// reinserted into the primary raw contact. Returns an empty batch when the
/// target has no raw contacts.
pub fn encode_update(contact: &Contact, target: &UpdateTarget) -> Vec<Operation> {
  let Some(&primary) = target.raw_contact_ids.first() else {
    return Vec::new();
  };
  let name = name_values(contact, contact.update_display_name());

  let mut ops = vec![Operation::DeleteData {
    selection: Selection::raw_contact_in(&target.raw_contact_ids)
      .and(Selection::mimetype_in(&MUTABLE_FAMILIES)),
  }];
  if target.primary_has_name {
    ops.push(Operation::UpdateData {
      selection: Selection::raw_contact_in(&[primary])
        .and(Selection::mimetype_in(&[mime::NAME])),
      values:    name,
    });
  } else {
    ops.push(Operation::insert_data(
      RawContactRef::Id(primary),
      mime::NAME,
      name,
    ));
  }
  ops.extend(field_ops(contact, RawContactRef::Id(primary)));
  ops
}
