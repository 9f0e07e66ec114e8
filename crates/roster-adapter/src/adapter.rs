//! Contact-level reads and writes over a [`NativeStore`].

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use roster_core::{
  contact::{Contact, Group},
  key::{ContactKey, ContactMode},
  native::{
    DataQuery, Operation, PhotoResolution, Projection, Selection, SortOrder,
    mime,
  },
  store::NativeStore,
};
use roster_normalize::{
  UpdateTarget, decode, decode_page, encode_insert, encode_update,
};

use crate::{Error, Result};

/// Page size when the caller does not give one.
pub const DEFAULT_LIMIT: usize = 30;

/// Identifier of the group synthesized for starred contacts when the store
/// has no favorites group of its own.
pub const FAVORITES_ID: &str = "favorites";
pub const FAVORITES_NAME: &str = "Favorites";

// ─── Requests ────────────────────────────────────────────────────────────────

/// Parameters for [`ContactAdapter::list`].
#[derive(Debug, Clone)]
pub struct ListRequest {
  /// Display-name prefix.
  pub query:                 Option<String>,
  pub sort:                  SortOrder,
  /// Distinct contacts to skip.
  pub offset:                usize,
  /// Distinct contacts to return; `None` means all.
  pub limit:                 Option<usize>,
  pub with_thumbnails:       bool,
  pub photo_high_resolution: bool,
}

impl Default for ListRequest {
  fn default() -> Self {
    Self {
      query:                 None,
      sort:                  SortOrder::default(),
      offset:                0,
      limit:                 Some(DEFAULT_LIMIT),
      with_thumbnails:       false,
      photo_high_resolution: false,
    }
  }
}

// ─── Adapter ─────────────────────────────────────────────────────────────────

/// Contact operations in one addressing mode.
///
/// Cloning is cheap; clones share the store.
pub struct ContactAdapter<S> {
  store: Arc<S>,
  mode:  ContactMode,
}

impl<S> Clone for ContactAdapter<S> {
  fn clone(&self) -> Self {
    Self {
      store: self.store.clone(),
      mode:  self.mode,
    }
  }
}

impl<S: NativeStore> ContactAdapter<S> {
  pub fn new(store: Arc<S>, mode: ContactMode) -> Self { Self { store, mode } }

  /// The same store addressed in another mode.
  pub fn with_mode(&self, mode: ContactMode) -> Self {
    Self {
      store: self.store.clone(),
      mode,
    }
  }

  pub fn mode(&self) -> ContactMode { self.mode }

  pub fn store(&self) -> &Arc<S> { &self.store }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub async fn list(&self, request: ListRequest) -> Result<Vec<Contact>> {
    let selection = request
      .query
      .as_deref()
      .filter(|q| !q.is_empty())
      .map(Selection::display_name_prefix)
      .unwrap_or_default();
    let cursor = self
      .store
      .query(DataQuery {
        selection,
        projection: Projection::Full,
        sort: Some(request.sort),
      })
      .await
      .map_err(Error::store)?;

    let mut contacts =
      decode_page(self.mode, cursor, request.offset, request.limit);
    for contact in &mut contacts {
      self
        .resolve_avatar(
          contact,
          request.with_thumbnails,
          request.photo_high_resolution,
        )
        .await;
    }
    Ok(contacts)
  }

  /// Number of distinct contacts whose display name starts with `query`.
  pub async fn count(&self, query: Option<&str>) -> Result<usize> {
    let selection = query
      .filter(|q| !q.is_empty())
      .map(Selection::display_name_prefix)
      .unwrap_or_default();
    let cursor = self
      .store
      .query(DataQuery {
        selection,
        projection: Projection::IdsOnly,
        sort: None,
      })
      .await
      .map_err(Error::store)?;
    let ids: HashSet<i64> =
      cursor.filter_map(|row| self.mode.id_of(&row)).collect();
    Ok(ids.len())
  }

  /// Exactly the contact `key` names.
  pub async fn fetch(
    &self,
    key: &ContactKey,
    with_thumbnails: bool,
    photo_high_resolution: bool,
  ) -> Result<Contact> {
    let selection = key.to_selection()?;
    let cursor = self
      .store
      .query(DataQuery {
        selection,
        projection: Projection::Full,
        sort: None,
      })
      .await
      .map_err(Error::store)?;

    let mut contacts = decode(key.mode, cursor);
    let mut contact = match contacts.len() {
      0 => return Err(Error::NotFound(key.to_string())),
      1 => contacts.remove(0),
      count => {
        return Err(Error::Ambiguous {
          key: key.to_string(),
          count,
        });
      }
    };
    self
      .resolve_avatar(&mut contact, with_thumbnails, photo_high_resolution)
      .await;
    Ok(contact)
  }

  /// Photo bytes: the high-resolution photo if asked for and present, else
  /// the thumbnail, else `None`.
  pub async fn avatar(
    &self,
    key: &ContactKey,
    high_resolution: bool,
  ) -> Result<Option<Vec<u8>>> {
    let selection = key.to_selection()?;
    if high_resolution {
      match self
        .store
        .open_photo(selection.clone(), PhotoResolution::High)
        .await
      {
        Ok(Some(photo)) => return Ok(Some(photo)),
        Ok(None) => {}
        Err(e) => {
          tracing::warn!(%key, error = %e, "high-resolution photo unavailable");
        }
      }
    }
    self
      .store
      .open_photo(selection, PhotoResolution::Thumbnail)
      .await
      .map_err(Error::store)
  }

  /// Decoding leaves the thumbnail in `avatar`; drop it unless a photo was
  /// asked for, upgrade it when the full-size one was. Photo failures never
  /// fail the surrounding read.
  async fn resolve_avatar(
    &self,
    contact: &mut Contact,
    with_thumbnails: bool,
    photo_high_resolution: bool,
  ) {
    if !photo_high_resolution {
      if !with_thumbnails {
        contact.avatar = None;
      }
      return;
    }
    let Some(key) = contact.key.clone() else {
      return;
    };
    match self.avatar(&key, true).await {
      Ok(Some(photo)) => contact.avatar = Some(photo),
      Ok(None) => {}
      Err(e) => tracing::warn!(%key, error = %e, "could not load photo"),
    }
  }

  pub async fn groups(&self) -> Result<Vec<Group>> {
    let rows = self.store.query_groups().await.map_err(Error::store)?;
    let cursor = self
      .store
      .query(DataQuery::default())
      .await
      .map_err(Error::store)?;
    let contacts = decode(self.mode, cursor);

    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut favorites: Option<usize> = None;

    for row in rows.into_iter().filter(|r| !r.deleted) {
      let name = row
        .title
        .clone()
        .or_else(|| row.favorites.then(|| FAVORITES_NAME.to_owned()));
      if row.favorites && favorites.is_none() {
        favorites = Some(groups.len());
      }
      index.insert(row.source_id.clone(), groups.len());
      groups.push(Group {
        identifier: row.source_id,
        name,
        description: row.notes,
        contacts: Default::default(),
      });
    }

    for contact in &contacts {
      let Some(id) = contact.key.as_ref().and_then(contact_identifier) else {
        continue;
      };
      for source_id in &contact.groups {
        if let Some(&slot) = index.get(source_id) {
          groups[slot].contacts.insert(id.clone());
        }
      }
      if contact.starred {
        let slot = *favorites.get_or_insert_with(|| {
          groups.push(Group {
            identifier: FAVORITES_ID.to_owned(),
            name: Some(FAVORITES_NAME.to_owned()),
            ..Default::default()
          });
          groups.len() - 1
        });
        groups[slot].contacts.insert(id);
      }
    }

    groups.retain(|g| !g.contacts.is_empty());
    Ok(groups)
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// Insert `contact` as a new raw contact and return it as stored.
  pub async fn add(&self, contact: &Contact) -> Result<Contact> {
    let ops = encode_insert(contact);
    let results = self
      .store
      .apply_batch(ops)
      .await
      .map_err(Error::store)?;
    let raw_id = results.first().and_then(|r| r.id).ok_or_else(|| {
      Error::StoreOperation("store returned no id for the new contact".into())
    })?;
    tracing::debug!(raw_id, "added contact");

    let single = ContactKey::new(ContactMode::Single).with_identifier(raw_id);
    let stored = self.fetch(&single, true, false).await?;
    match (self.mode, stored.key.clone()) {
      (ContactMode::Unified, Some(key)) => {
        let unified = ContactKey {
          mode: ContactMode::Unified,
          ..key
        };
        self.fetch(&unified, true, false).await
      }
      _ => Ok(stored),
    }
  }

  /// Replace the stored fields of `contact` with its in-memory state.
  pub async fn update(&self, contact: &Contact) -> Result<Contact> {
    let key = contact.require_key()?.clone();
    let cursor = self
      .store
      .query(DataQuery {
        selection:  key.to_selection()?,
        projection: Projection::Full,
        sort:       None,
      })
      .await
      .map_err(Error::store)?;

    let mut raw_contact_ids: Vec<i64> = Vec::new();
    let mut named: HashSet<i64> = HashSet::new();
    for row in cursor {
      let Some(raw) = row.raw_contact_id else {
        continue;
      };
      if !raw_contact_ids.contains(&raw) {
        raw_contact_ids.push(raw);
      }
      if row.is(mime::NAME) {
        named.insert(raw);
      }
    }
    let Some(&primary) = raw_contact_ids.first() else {
      return Err(Error::NotFound(key.to_string()));
    };

    let target = UpdateTarget {
      primary_has_name: named.contains(&primary),
      raw_contact_ids,
    };
    let ops = encode_update(contact, &target);
    self
      .store
      .apply_batch(ops)
      .await
      .map_err(Error::store)?;
    tracing::debug!(%key, raw_contacts = target.raw_contact_ids.len(), "updated contact");

    self.fetch(&key, true, false).await
  }

  /// Delete the contact `contact.key` names.
  ///
  /// Returns `false` instead of an error when the store fails; an unusable
  /// key is still an error.
  pub async fn delete(&self, contact: &Contact) -> Result<bool> {
    let key = contact.require_key()?;
    let selection = key.to_selection()?;
    match self
      .store
      .apply_batch(vec![Operation::DeleteContact { selection }])
      .await
    {
      Ok(_) => Ok(true),
      Err(e) => {
        tracing::warn!(%key, error = %e, "delete failed");
        Ok(false)
      }
    }
  }
}

/// The wire identifier of a contact: its mode id, else its lookup key.
pub fn contact_identifier(key: &ContactKey) -> Option<String> {
  key
    .identifier()
    .map(|id| id.to_string())
    .or_else(|| key.lookup_key.clone())
}
