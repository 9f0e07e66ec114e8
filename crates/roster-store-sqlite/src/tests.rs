//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use parking_lot::Mutex;
use roster_core::{
  contact::{Contact, LabeledValue},
  key::ContactMode,
  native::{
    AUTHORITY_URI, DataQuery, DataValues, GroupRow, Operation, PhotoResolution,
    Projection, RawContactRef, Selection, SortOrder, column, columns, contact_uri,
    mime,
  },
  store::{ChangeSource, NativeStore},
};
use roster_normalize::{decode, encode_insert};

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn person(given: &str, family: &str) -> Contact {
  Contact {
    given_name: Some(given.into()),
    family_name: Some(family.into()),
    phones: vec![LabeledValue::new("mobile", "555-0100")],
    ..Default::default()
  }
}

/// Insert a contact and return its raw contact id.
async fn add(s: &SqliteStore, contact: &Contact) -> i64 {
  let results = s.apply_batch(encode_insert(contact)).await.unwrap();
  results[0].id.expect("raw contact id")
}

async fn all_rows(s: &SqliteStore, sort: Option<SortOrder>) -> Vec<Contact> {
  let cursor = s
    .query(DataQuery {
      sort,
      ..Default::default()
    })
    .await
    .unwrap();
  decode(ContactMode::Single, cursor)
}

// ─── Batches ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_batch_assigns_ids_and_display_name() {
  let s = store().await;
  let raw = add(&s, &person("Alice", "Liddell")).await;

  let contacts = all_rows(&s, None).await;
  assert_eq!(contacts.len(), 1);
  let c = &contacts[0];
  let key = c.key.as_ref().unwrap();
  assert_eq!(key.single_contact_id, Some(raw));
  assert_eq!(key.unified_contact_id, Some(raw));
  assert!(key.lookup_key.is_some());
  assert_eq!(c.display_name.as_deref(), Some("Alice Liddell"));
  assert_eq!(c.phones.len(), 1);
  assert!(c.last_modified.is_some());
}

#[tokio::test]
async fn display_name_falls_back_to_email() {
  let s = store().await;
  let contact = Contact {
    emails: vec![LabeledValue::new("home", "nobody@example.org")],
    ..Default::default()
  };
  add(&s, &contact).await;
  let contacts = all_rows(&s, None).await;
  assert_eq!(
    contacts[0].display_name.as_deref(),
    Some("nobody@example.org")
  );
}

#[tokio::test]
async fn bad_back_reference_is_rejected_before_writing() {
  let s = store().await;
  let ops = vec![Operation::insert_data(
    RawContactRef::BackReference(0),
    mime::NOTE,
    DataValues::new().set(columns::VALUE, Some("orphan")),
  )];
  let err = s.apply_batch(ops).await.unwrap_err();
  assert!(matches!(
    err,
    Error::InvalidBackReference { op: 0, target: 0 }
  ));
  assert!(all_rows(&s, None).await.is_empty());
}

#[tokio::test]
async fn failed_batch_leaves_no_partial_writes() {
  let s = store().await;
  let ops = vec![
    Operation::InsertRawContact {
      account_type: None,
      account_name: None,
      starred:      false,
    },
    Operation::insert_data(
      RawContactRef::BackReference(0),
      mime::NAME,
      DataValues::new().set(columns::name::GIVEN, Some("Ghost")),
    ),
    // no such raw contact: the foreign key fails and the whole batch rolls back
    Operation::insert_data(
      RawContactRef::Id(9_999),
      mime::NOTE,
      DataValues::new().set(columns::VALUE, Some("x")),
    ),
  ];
  assert!(matches!(
    s.apply_batch(ops).await.unwrap_err(),
    Error::Database(_)
  ));
  assert!(all_rows(&s, None).await.is_empty());
}

#[tokio::test]
async fn delete_data_by_mimetype() {
  let s = store().await;
  let raw = add(&s, &person("Bob", "Dylan")).await;
  let results = s
    .apply_batch(vec![Operation::DeleteData {
      selection: Selection::raw_contact_in(&[raw])
        .and(Selection::mimetype_in(&[mime::PHONE])),
    }])
    .await
    .unwrap();
  assert_eq!(results[0].count, 1);
  let contacts = all_rows(&s, None).await;
  assert!(contacts[0].phones.is_empty());
  assert_eq!(contacts[0].given_name.as_deref(), Some("Bob"));
}

#[tokio::test]
async fn update_data_rewrites_columns_and_display_name() {
  let s = store().await;
  let raw = add(&s, &person("Carol", "Danvers")).await;
  s.apply_batch(vec![Operation::UpdateData {
    selection: Selection::raw_contact_in(&[raw])
      .and(Selection::mimetype_in(&[mime::NAME])),
    values:    DataValues::new()
      .set(columns::name::DISPLAY, Some("Captain Marvel"))
      .set(columns::name::GIVEN, Some("Carol")),
  }])
  .await
  .unwrap();
  let contacts = all_rows(&s, None).await;
  assert_eq!(contacts[0].display_name.as_deref(), Some("Captain Marvel"));
}

#[tokio::test]
async fn delete_contact_removes_data_rows() {
  let s = store().await;
  let raw = add(&s, &person("Dan", "Brown")).await;
  add(&s, &person("Eve", "Moneypenny")).await;

  let results = s
    .apply_batch(vec![Operation::DeleteContact {
      selection: Selection::column_eq(column::RAW_CONTACT_ID, raw),
    }])
    .await
    .unwrap();
  assert_eq!(results[0].count, 1);
  let contacts = all_rows(&s, None).await;
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].given_name.as_deref(), Some("Eve"));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sort_orders() {
  let s = store().await;
  add(&s, &person("Zed", "Adams")).await;
  add(&s, &person("Amy", "Young")).await;
  add(&s, &person("Mia", "Moss")).await;

  let given = |cs: Vec<Contact>| -> Vec<String> {
    cs.into_iter().filter_map(|c| c.given_name).collect()
  };
  assert_eq!(
    given(all_rows(&s, Some(SortOrder::FirstName)).await),
    ["Amy", "Mia", "Zed"]
  );
  assert_eq!(
    given(all_rows(&s, Some(SortOrder::LastName)).await),
    ["Zed", "Mia", "Amy"]
  );
  assert_eq!(
    given(all_rows(&s, Some(SortOrder::DisplayName)).await),
    ["Amy", "Mia", "Zed"]
  );
}

#[tokio::test]
async fn display_name_prefix_filter() {
  let s = store().await;
  add(&s, &person("Anna", "Karenina")).await;
  add(&s, &person("Boris", "Godunov")).await;
  let cursor = s
    .query(DataQuery {
      selection: Selection::display_name_prefix("an"),
      ..Default::default()
    })
    .await
    .unwrap();
  let contacts = decode(ContactMode::Single, cursor);
  assert_eq!(contacts.len(), 1);
  assert_eq!(contacts[0].given_name.as_deref(), Some("Anna"));
}

#[tokio::test]
async fn prefix_filter_matches_the_whole_aggregate() {
  let s = store().await;
  let a = add(&s, &person("Ann", "Lee")).await;
  let b = add(
    &s,
    &Contact {
      emails: vec![LabeledValue::new("work", "zed@example.com")],
      ..person("Zed", "Roe")
    },
  )
  .await;
  s.link(a, b).await.unwrap();

  let query = |prefix: &str| DataQuery {
    selection: Selection::display_name_prefix(prefix),
    ..Default::default()
  };
  let found = decode(ContactMode::Unified, s.query(query("ann")).await.unwrap());
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].linked_contact_ids, vec![a, b]);
  assert_eq!(found[0].emails.len(), 1);

  let none = s.query(query("zed")).await.unwrap().count();
  assert_eq!(none, 0);
}

#[tokio::test]
async fn ids_only_projection() {
  let s = store().await;
  add(&s, &person("Ivy", "Ids")).await;
  let rows: Vec<_> = s
    .query(DataQuery {
      projection: Projection::IdsOnly,
      ..Default::default()
    })
    .await
    .unwrap()
    .collect();
  assert_eq!(rows.len(), 1);
  assert!(rows[0].mimetype.is_none());
  assert!(rows[0].raw_contact_id.is_some());
}

#[tokio::test]
async fn cursors_are_tracked_until_dropped() {
  let s = store().await;
  add(&s, &person("Cy", "Cursor")).await;
  let cursor = s.query(DataQuery::default()).await.unwrap();
  assert_eq!(s.open_cursors(), 1);
  drop(cursor);
  assert_eq!(s.open_cursors(), 0);
}

#[tokio::test]
async fn linked_raw_contacts_share_an_aggregate() {
  let s = store().await;
  let a = add(&s, &person("Lin", "Ked")).await;
  let b = add(&s, &Contact {
    emails: vec![LabeledValue::new("work", "lin@example.org")],
    ..Default::default()
  })
  .await;
  s.link(a, b).await.unwrap();

  let cursor = s.query(DataQuery::default()).await.unwrap();
  let unified = decode(ContactMode::Unified, cursor);
  assert_eq!(unified.len(), 1);
  assert_eq!(unified[0].linked_contact_ids, vec![a, b]);
  assert_eq!(unified[0].emails.len(), 1);
  assert_eq!(unified[0].phones.len(), 1);

  let cursor = s.query(DataQuery::default()).await.unwrap();
  assert_eq!(decode(ContactMode::Single, cursor).len(), 2);
}

#[tokio::test]
async fn link_unknown_raw_contact_fails() {
  let s = store().await;
  let a = add(&s, &person("Solo", "Han")).await;
  assert!(matches!(
    s.link(a, 404).await.unwrap_err(),
    Error::RawContactNotFound(404)
  ));
}

// ─── Photos and groups ───────────────────────────────────────────────────────

#[tokio::test]
async fn photo_resolutions() {
  let s = store().await;
  let raw = add(&s, &Contact {
    given_name: Some("Pic".into()),
    avatar: Some(vec![1, 2, 3]),
    ..Default::default()
  })
  .await;
  let sel = Selection::column_eq(column::RAW_CONTACT_ID, raw);

  let thumb = s
    .open_photo(sel.clone(), PhotoResolution::Thumbnail)
    .await
    .unwrap();
  assert_eq!(thumb, Some(vec![1, 2, 3]));

  s.set_display_photo(raw, vec![9, 9, 9, 9]).await.unwrap();
  let high = s.open_photo(sel, PhotoResolution::High).await.unwrap();
  assert_eq!(high, Some(vec![9, 9, 9, 9]));
}

#[tokio::test]
async fn missing_photo_is_none() {
  let s = store().await;
  let raw = add(&s, &person("No", "Photo")).await;
  let sel = Selection::column_eq(column::RAW_CONTACT_ID, raw);
  assert_eq!(
    s.open_photo(sel.clone(), PhotoResolution::High).await.unwrap(),
    None
  );
  assert_eq!(
    s.open_photo(sel, PhotoResolution::Thumbnail).await.unwrap(),
    None
  );
}

#[tokio::test]
async fn groups_round_trip() {
  let s = store().await;
  s.insert_group(GroupRow {
    source_id: "g-1".into(),
    title: Some("Climbing".into()),
    ..Default::default()
  })
  .await
  .unwrap();
  s.insert_group(GroupRow {
    source_id: "g-fav".into(),
    favorites: true,
    ..Default::default()
  })
  .await
  .unwrap();
  let groups = s.query_groups().await.unwrap();
  assert_eq!(groups.len(), 2);
  assert_eq!(groups[0].title.as_deref(), Some("Climbing"));
  assert!(groups[1].favorites);
}

// ─── Notifications ───────────────────────────────────────────────────────────

fn recorder(s: &SqliteStore) -> Arc<Mutex<Vec<Option<String>>>> {
  let seen = Arc::new(Mutex::new(Vec::new()));
  let sink = seen.clone();
  s.register(Arc::new(move |uri: Option<&str>| {
    sink.lock().push(uri.map(str::to_owned));
  }))
  .unwrap();
  seen
}

#[tokio::test]
async fn writes_notify_after_commit() {
  let s = store().await;
  let seen = recorder(&s);

  let raw = add(&s, &person("Nat", "Notify")).await;
  assert_eq!(seen.lock().clone(), vec![Some(contact_uri(raw))]);

  s.apply_batch(vec![Operation::DeleteContact {
    selection: Selection::column_eq(column::RAW_CONTACT_ID, raw),
  }])
  .await
  .unwrap();
  assert_eq!(
    seen.lock().last().cloned().flatten().as_deref(),
    Some(AUTHORITY_URI)
  );
}

#[tokio::test]
async fn unregistered_callbacks_are_not_called() {
  let s = store().await;
  let seen = Arc::new(Mutex::new(0usize));
  let sink = seen.clone();
  let registration = s
    .register(Arc::new(move |_: Option<&str>| *sink.lock() += 1))
    .unwrap();
  s.unregister(registration);
  add(&s, &person("Quiet", "Store")).await;
  assert_eq!(*seen.lock(), 0);
  assert_eq!(s.observer_count(), 0);
}

#[tokio::test]
async fn register_without_permission_fails() {
  let s = store().await;
  s.set_permission(false);
  let err = s.register(Arc::new(|_: Option<&str>| {})).unwrap_err();
  assert!(matches!(err, roster_core::Error::PermissionDenied));
}
