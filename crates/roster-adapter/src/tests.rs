//! Adapter and observer tests, against both an in-memory SQLite store and a
//! scripted fake.

use std::sync::Arc;

use parking_lot::Mutex;
use roster_core::{
  contact::{Contact, LabeledValue},
  event::ContactEvent,
  key::{ContactKey, ContactMode},
  native::{
    Cursor, DataQuery, DataRow, GroupRow, OpResult, Operation,
    PhotoResolution, Projection, Selection, SortOrder, mime,
  },
  store::NativeStore,
};
use roster_store_sqlite::SqliteStore;
use tokio::sync::mpsc;

use crate::{
  ChangeObserver, ContactAdapter, Error, FAVORITES_ID, ListRequest,
  contact_identifier,
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

async fn sqlite() -> Arc<SqliteStore> {
  Arc::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

fn person(given: &str, family: &str) -> Contact {
  Contact {
    given_name: Some(given.into()),
    family_name: Some(family.into()),
    phones: vec![LabeledValue::new("mobile", "555-0100")],
    ..Default::default()
  }
}

#[derive(Debug, thiserror::Error)]
#[error("scripted store failure")]
struct FakeError;

/// Serves canned rows and records every batch; batches fail when `fail` is
/// set.
#[derive(Default)]
struct FakeStore {
  rows:    Vec<DataRow>,
  fail:    bool,
  batches: Mutex<Vec<Vec<Operation>>>,
}

impl NativeStore for FakeStore {
  type Error = FakeError;

  async fn query(&self, _query: DataQuery) -> Result<Cursor, FakeError> {
    Ok(Cursor::new(self.rows.clone()))
  }

  async fn query_groups(&self) -> Result<Vec<GroupRow>, FakeError> {
    Ok(Vec::new())
  }

  async fn open_photo(
    &self,
    _selection: Selection,
    resolution: PhotoResolution,
  ) -> Result<Option<Vec<u8>>, FakeError> {
    match resolution {
      PhotoResolution::High => Err(FakeError),
      PhotoResolution::Thumbnail => Ok(Some(vec![7])),
    }
  }

  async fn apply_batch(
    &self,
    ops: Vec<Operation>,
  ) -> Result<Vec<OpResult>, FakeError> {
    self.batches.lock().push(ops);
    if self.fail {
      Err(FakeError)
    } else {
      Ok(Vec::new())
    }
  }
}

fn row(raw: i64, contact: i64, mimetype: &str, data1: &str) -> DataRow {
  let mut row = DataRow {
    raw_contact_id: Some(raw),
    contact_id: Some(contact),
    mimetype: Some(mimetype.to_owned()),
    ..Default::default()
  };
  row.data[0] = Some(data1.to_owned());
  row
}

fn keyed(mode: ContactMode, id: i64) -> Contact {
  Contact {
    key: Some(ContactKey::new(mode).with_identifier(id)),
    ..Default::default()
  }
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn list_pages_over_distinct_contacts() {
  let store = sqlite().await;
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  for given in ["Eve", "Bob", "Dan", "Ann", "Cat"] {
    adapter.add(&person(given, "Smith")).await.unwrap();
  }

  let page = adapter
    .list(ListRequest {
      sort: SortOrder::FirstName,
      offset: 2,
      limit: Some(2),
      ..Default::default()
    })
    .await
    .unwrap();
  let names: Vec<_> =
    page.iter().filter_map(|c| c.given_name.as_deref()).collect();
  assert_eq!(names, ["Cat", "Dan"]);
  assert_eq!(store.open_cursors(), 0);

  let everyone = adapter
    .list(ListRequest {
      limit: None,
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(everyone.len(), 5);
}

#[tokio::test]
async fn list_filters_by_display_name_prefix() {
  let store = sqlite().await;
  let adapter = ContactAdapter::new(store, ContactMode::Single);
  adapter.add(&person("Ann", "Lee")).await.unwrap();
  adapter.add(&person("Andy", "Roe")).await.unwrap();
  adapter.add(&person("Bea", "Ng")).await.unwrap();

  let found = adapter
    .list(ListRequest {
      query: Some("an".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(found.len(), 2);
  assert_eq!(adapter.count(Some("an")).await.unwrap(), 2);
  assert_eq!(adapter.count(None).await.unwrap(), 3);
}

#[tokio::test]
async fn unified_query_returns_whole_linked_contacts() {
  let store = sqlite().await;
  let single = ContactAdapter::new(store.clone(), ContactMode::Single);
  let ann = single.add(&person("Ann", "Lee")).await.unwrap();
  let zed = single
    .add(&Contact {
      emails: vec![LabeledValue::new("work", "zed@example.com")],
      ..person("Zed", "Roe")
    })
    .await
    .unwrap();
  let id = |c: &Contact| c.key.as_ref().and_then(|k| k.identifier()).unwrap();
  store.link(id(&ann), id(&zed)).await.unwrap();
  single.add(&person("Bea", "Ng")).await.unwrap();

  let unified = single.with_mode(ContactMode::Unified);
  let full = unified
    .list(ListRequest {
      query: Some("Ann".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(full.len(), 1);
  let merged = &full[0];
  assert_eq!(merged.linked_contact_ids, vec![id(&ann), id(&zed)]);
  assert_eq!(merged.emails.len(), 1);
  assert_eq!(merged.phones.len(), 2);

  let key = merged.key.clone().unwrap();
  let fetched = unified.fetch(&key, false, false).await.unwrap();
  assert_eq!(merged.display_name, fetched.display_name);

  assert_eq!(unified.count(Some("Ann")).await.unwrap(), 1);
  assert_eq!(unified.count(Some("Zed")).await.unwrap(), 0);
  assert_eq!(unified.count(None).await.unwrap(), 2);
}

#[tokio::test]
async fn count_uses_mode_ids() {
  let store = sqlite().await;
  let single = ContactAdapter::new(store.clone(), ContactMode::Single);
  let a = single.add(&person("Ann", "Lee")).await.unwrap();
  let b = single.add(&person("Ann", "Lee")).await.unwrap();
  let id = |c: &Contact| c.key.as_ref().and_then(|k| k.identifier()).unwrap();
  store.link(id(&a), id(&b)).await.unwrap();

  let unified = single.with_mode(ContactMode::Unified);
  assert_eq!(single.count(None).await.unwrap(), 2);
  assert_eq!(unified.count(None).await.unwrap(), 1);

  let merged = unified.list(ListRequest::default()).await.unwrap();
  assert_eq!(merged.len(), 1);
  assert_eq!(merged[0].linked_contact_ids, vec![id(&a), id(&b)]);
}

#[tokio::test]
async fn fetch_unknown_contact_is_not_found() {
  let adapter = ContactAdapter::new(sqlite().await, ContactMode::Single);
  let key = ContactKey::new(ContactMode::Single).with_identifier(999);
  let err = adapter.fetch(&key, false, false).await.unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn fetch_matching_two_contacts_is_ambiguous() {
  let store = Arc::new(FakeStore {
    rows: vec![row(1, 1, mime::NAME, "One"), row(2, 2, mime::NAME, "Two")],
    ..Default::default()
  });
  let adapter = ContactAdapter::new(store, ContactMode::Single);
  let key = ContactKey::new(ContactMode::Single).with_lookup_key("shared");
  let err = adapter.fetch(&key, false, false).await.unwrap_err();
  assert!(matches!(err, Error::Ambiguous { count: 2, .. }));
}

#[tokio::test]
async fn fetch_with_invalid_key_never_queries() {
  let adapter =
    ContactAdapter::new(Arc::new(FakeStore::default()), ContactMode::Single);
  let err = adapter
    .fetch(&ContactKey::new(ContactMode::Single), false, false)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(_)));
}

#[tokio::test]
async fn avatars_follow_the_request() {
  let store = sqlite().await;
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  let added = adapter
    .add(&Contact {
      given_name: Some("Pic".into()),
      avatar: Some(vec![1, 2, 3]),
      ..Default::default()
    })
    .await
    .unwrap();
  let key = added.key.clone().unwrap();
  assert_eq!(added.avatar, Some(vec![1, 2, 3]));

  let bare = adapter.fetch(&key, false, false).await.unwrap();
  assert_eq!(bare.avatar, None);

  // The inserted photo doubles as the full-size one until replaced.
  let fallback = adapter.fetch(&key, true, true).await.unwrap();
  assert_eq!(fallback.avatar, Some(vec![1, 2, 3]));

  store
    .set_display_photo(key.identifier().unwrap(), vec![9, 9])
    .await
    .unwrap();
  let high = adapter.fetch(&key, true, true).await.unwrap();
  assert_eq!(high.avatar, Some(vec![9, 9]));
  assert_eq!(adapter.avatar(&key, false).await.unwrap(), Some(vec![1, 2, 3]));
}

#[tokio::test]
async fn high_resolution_failure_falls_back_to_thumbnail() {
  let adapter =
    ContactAdapter::new(Arc::new(FakeStore::default()), ContactMode::Single);
  let key = ContactKey::new(ContactMode::Single).with_identifier(1);
  assert_eq!(adapter.avatar(&key, true).await.unwrap(), Some(vec![7]));
}

// ─── Groups ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn groups_collect_members_and_drop_empty_groups() {
  let store = sqlite().await;
  for (id, title) in [("g-1", "Climbing"), ("g-2", "Chess")] {
    store
      .insert_group(GroupRow {
        source_id: id.into(),
        title: Some(title.into()),
        ..Default::default()
      })
      .await
      .unwrap();
  }
  let adapter = ContactAdapter::new(store, ContactMode::Single);
  let mut climber = person("Alex", "Honnold");
  climber.groups.insert("g-1".into());
  let climber = adapter.add(&climber).await.unwrap();

  let groups = adapter.groups().await.unwrap();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].identifier, "g-1");
  assert_eq!(groups[0].name.as_deref(), Some("Climbing"));
  let member = contact_identifier(climber.key.as_ref().unwrap()).unwrap();
  assert!(groups[0].contacts.contains(&member));
}

#[tokio::test]
async fn starred_contacts_form_a_favorites_group() {
  let store = sqlite().await;
  let adapter = ContactAdapter::new(store, ContactMode::Single);
  adapter
    .add(&Contact {
      starred: true,
      ..person("Star", "Gazer")
    })
    .await
    .unwrap();
  adapter.add(&person("Plain", "Jane")).await.unwrap();

  let groups = adapter.groups().await.unwrap();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].identifier, FAVORITES_ID);
  assert_eq!(groups[0].contacts.len(), 1);
}

#[tokio::test]
async fn starred_contacts_join_the_stores_favorites_group() {
  let store = sqlite().await;
  store
    .insert_group(GroupRow {
      source_id: "starred".into(),
      favorites: true,
      ..Default::default()
    })
    .await
    .unwrap();
  let adapter = ContactAdapter::new(store, ContactMode::Single);
  adapter
    .add(&Contact {
      starred: true,
      ..person("Star", "Gazer")
    })
    .await
    .unwrap();

  let groups = adapter.groups().await.unwrap();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].identifier, "starred");
  assert_eq!(groups[0].name.as_deref(), Some("Favorites"));
}

// ─── Writes ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_returns_the_stored_contact() {
  let adapter = ContactAdapter::new(sqlite().await, ContactMode::Single);
  let stored = adapter.add(&person("Ada", "Lovelace")).await.unwrap();
  let key = stored.key.as_ref().unwrap();
  assert!(key.identifier().is_some());
  assert!(key.lookup_key.is_some());
  assert_eq!(stored.display_name.as_deref(), Some("Ada Lovelace"));
  assert_eq!(stored.phones, vec![LabeledValue::new("mobile", "555-0100")]);
}

#[tokio::test]
async fn add_in_unified_mode_keys_by_aggregate() {
  let adapter = ContactAdapter::new(sqlite().await, ContactMode::Unified);
  let stored = adapter.add(&person("Ada", "Lovelace")).await.unwrap();
  let key = stored.key.as_ref().unwrap();
  assert_eq!(key.mode, ContactMode::Unified);
  assert!(key.unified_contact_id.is_some());
  assert_eq!(stored.linked_contact_ids.len(), 1);
}

#[tokio::test]
async fn update_replaces_fields() {
  let store = sqlite().await;
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  let mut contact = adapter.add(&person("Ada", "Byron")).await.unwrap();

  contact.family_name = Some("Lovelace".into());
  contact.phones.clear();
  contact.emails = vec![LabeledValue::new("work", "ada@example.com")];
  let updated = adapter.update(&contact).await.unwrap();

  assert_eq!(updated.display_name.as_deref(), Some("Ada Lovelace"));
  assert!(updated.phones.is_empty());
  assert_eq!(updated.emails.len(), 1);

  let phone_rows = store
    .query(DataQuery {
      selection: Selection::mimetype_in(&[mime::PHONE]),
      projection: Projection::Full,
      sort: None,
    })
    .await
    .unwrap()
    .count();
  assert_eq!(phone_rows, 0);
}

#[tokio::test]
async fn update_of_missing_contact_is_not_found() {
  let adapter = ContactAdapter::new(sqlite().await, ContactMode::Single);
  let err = adapter
    .update(&keyed(ContactMode::Single, 41))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn update_surfaces_store_failures() {
  let store = Arc::new(FakeStore {
    rows: vec![row(3, 3, mime::NAME, "Three")],
    fail: true,
    ..Default::default()
  });
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  let err = adapter
    .update(&keyed(ContactMode::Single, 3))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::StoreOperation(_)));
  assert_eq!(store.batches.lock().len(), 1);
}

#[tokio::test]
async fn delete_removes_the_contact() {
  let adapter = ContactAdapter::new(sqlite().await, ContactMode::Single);
  let stored = adapter.add(&person("Gone", "Soon")).await.unwrap();
  assert!(adapter.delete(&stored).await.unwrap());
  assert_eq!(adapter.count(None).await.unwrap(), 0);
}

#[tokio::test]
async fn delete_reports_store_failure_as_false() {
  let store = Arc::new(FakeStore {
    fail: true,
    ..Default::default()
  });
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  assert!(!adapter.delete(&keyed(ContactMode::Single, 5)).await.unwrap());
  assert!(matches!(
    store.batches.lock()[0].as_slice(),
    [Operation::DeleteContact { .. }]
  ));
}

#[tokio::test]
async fn delete_without_key_is_an_error() {
  let store = Arc::new(FakeStore::default());
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  let err = adapter.delete(&Contact::default()).await.unwrap_err();
  assert!(matches!(err, Error::Core(_)));
  assert!(store.batches.lock().is_empty());
}

// ─── Observer ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn observer_forwards_changes_until_stopped() {
  let store = sqlite().await;
  let adapter = ContactAdapter::new(store.clone(), ContactMode::Single);
  let observer = ChangeObserver::new(store.clone());
  let (tx, mut rx) = mpsc::unbounded_channel();
  observer.start(tx).unwrap();
  assert!(observer.is_observing());

  let added = adapter.add(&person("Obs", "Erver")).await.unwrap();
  let id = contact_identifier(added.key.as_ref().unwrap()).unwrap();
  let event = rx.recv().await.unwrap().unwrap();
  assert_eq!(event, ContactEvent::ContactChanged { contact_id: id });

  observer.stop();
  observer.stop();
  assert_eq!(store.observer_count(), 0);
  adapter.add(&person("After", "Stop")).await.unwrap();
  assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn observer_rejects_second_start() {
  let observer = ChangeObserver::new(sqlite().await);
  let (tx, _rx) = mpsc::unbounded_channel();
  observer.start(tx.clone()).unwrap();
  assert!(matches!(observer.start(tx), Err(Error::Core(_))));
}

#[tokio::test]
async fn observer_without_permission_reports_once() {
  let store = sqlite().await;
  store.set_permission(false);
  let observer = ChangeObserver::new(store.clone());
  let (tx, mut rx) = mpsc::unbounded_channel();
  observer.start(tx).unwrap();

  assert!(matches!(
    rx.recv().await,
    Some(Err(roster_core::Error::PermissionDenied))
  ));
  assert!(rx.recv().await.is_none());
  assert!(!observer.is_observing());
}

#[tokio::test]
async fn dropping_the_observer_unregisters() {
  let store = sqlite().await;
  {
    let observer = ChangeObserver::new(store.clone());
    let (tx, _rx) = mpsc::unbounded_channel();
    observer.start(tx).unwrap();
    assert_eq!(store.observer_count(), 1);
  }
  assert_eq!(store.observer_count(), 0);
}
