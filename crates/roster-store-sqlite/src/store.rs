//! [`SqliteStore`]: the SQLite implementation of [`NativeStore`].

use std::{
  collections::BTreeSet,
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
  },
};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, params, params_from_iter, types::Value};
use uuid::Uuid;

use roster_core::{
  native::{
    AUTHORITY_URI, Cursor, DataQuery, DataRow, GroupRow, OpResult, Operation,
    PhotoResolution, Projection, RawContactRef, Selection, contact_uri, mime,
  },
  store::{ChangeCallback, ChangeSource, NativeStore, Registration},
};

use crate::{
  Error, Result,
  encode::{
    data_assignments, query_sql, read_full_row, read_group_row, read_id_row,
    selection_params, where_clause,
  },
  notify::Notifier,
  schema::SCHEMA,
};

// ─── Batch planning ──────────────────────────────────────────────────────────

/// An [`Operation`] checked and lowered to SQL-ready values.
enum Planned {
  InsertRaw {
    account_type: Option<String>,
    account_name: Option<String>,
    starred:      bool,
  },
  InsertData {
    raw:         RawContactRef,
    mimetype:    &'static str,
    assignments: Vec<(String, Value)>,
    photo:       Option<Vec<u8>>,
  },
  UpdateData {
    selection:   Selection,
    assignments: Vec<(String, Value)>,
  },
  DeleteData {
    selection: Selection,
  },
  DeleteContact {
    selection: Selection,
  },
}

fn plan(ops: Vec<Operation>) -> Result<Vec<Planned>> {
  let mut planned = Vec::with_capacity(ops.len());
  for (i, op) in ops.into_iter().enumerate() {
    planned.push(match op {
      Operation::InsertRawContact {
        account_type,
        account_name,
        starred,
      } => Planned::InsertRaw {
        account_type,
        account_name,
        starred,
      },
      Operation::InsertData {
        raw_contact,
        mimetype,
        values,
      } => {
        if let RawContactRef::BackReference(target) = raw_contact {
          let valid = target < i
            && matches!(planned.get(target), Some(Planned::InsertRaw { .. }));
          if !valid {
            return Err(Error::InvalidBackReference { op: i, target });
          }
        }
        let photo = if mimetype == mime::PHOTO {
          values.blob.clone()
        } else {
          None
        };
        Planned::InsertData {
          raw: raw_contact,
          mimetype,
          assignments: data_assignments(&values)?,
          photo,
        }
      }
      Operation::UpdateData { selection, values } => Planned::UpdateData {
        selection,
        assignments: data_assignments(&values)?,
      },
      Operation::DeleteData { selection } => Planned::DeleteData { selection },
      Operation::DeleteContact { selection } => {
        Planned::DeleteContact { selection }
      }
    });
  }
  Ok(planned)
}

// ─── Transaction helpers ─────────────────────────────────────────────────────

fn affected_raw_ids(
  tx: &rusqlite::Transaction<'_>,
  selection: &Selection,
) -> rusqlite::Result<Vec<i64>> {
  let sql = format!(
    "SELECT DISTINCT raw_contact_id FROM data_view {}",
    where_clause(selection)
  );
  let mut stmt = tx.prepare(&sql)?;
  let ids = stmt
    .query_map(params_from_iter(selection_params(selection)), |r| r.get(0))?
    .collect::<rusqlite::Result<Vec<i64>>>()?;
  Ok(ids)
}

/// Recompute the display name and modification time of a raw contact.
/// Returns its aggregate id, or `None` if the raw contact no longer exists.
fn refresh_raw_contact(
  tx: &rusqlite::Transaction<'_>,
  raw_id: i64,
  now: i64,
) -> rusqlite::Result<Option<i64>> {
  type NameParts = (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
  );
  let name: Option<NameParts> = tx
    .query_row(
      "SELECT data1, data4, data2, data5, data3, data6 FROM data
       WHERE raw_contact_id = ?1 AND mimetype = ?2
       ORDER BY data_id LIMIT 1",
      params![raw_id, mime::NAME],
      |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?)),
    )
    .optional()?;

  let from_name = name.and_then(|(display, prefix, given, middle, family, suffix)| {
    let display = display.filter(|d| !d.trim().is_empty());
    display.or_else(|| {
      let joined = [prefix, given, middle, family, suffix]
        .into_iter()
        .flatten()
        .filter(|p| !p.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");
      (!joined.is_empty()).then_some(joined)
    })
  });

  let display_name = match from_name {
    Some(name) => Some(name),
    None => tx
      .query_row(
        "SELECT data1 FROM data
         WHERE raw_contact_id = ?1 AND mimetype IN (?2, ?3, ?4)
           AND data1 IS NOT NULL AND data1 != ''
         ORDER BY CASE mimetype WHEN ?2 THEN 0 WHEN ?3 THEN 1 ELSE 2 END, data_id
         LIMIT 1",
        params![raw_id, mime::ORGANIZATION, mime::EMAIL, mime::PHONE],
        |r| r.get(0),
      )
      .optional()?,
  };

  let changed = tx.execute(
    "UPDATE raw_contacts SET display_name = ?2, last_updated = ?3
     WHERE raw_contact_id = ?1",
    params![raw_id, display_name, now],
  )?;
  if changed == 0 {
    return Ok(None);
  }
  tx.query_row(
    "SELECT contact_id FROM raw_contacts WHERE raw_contact_id = ?1",
    params![raw_id],
    |r| r.get(0),
  )
  .optional()
}

fn apply_planned(
  conn: &mut rusqlite::Connection,
  planned: Vec<Planned>,
) -> rusqlite::Result<(Vec<OpResult>, Vec<Option<String>>)> {
  let tx = conn.transaction()?;
  let now = Utc::now().timestamp_millis();
  let mut results: Vec<OpResult> = Vec::with_capacity(planned.len());
  let mut touched = BTreeSet::new();
  let mut store_wide = false;

  for op in planned {
    let result = match op {
      Planned::InsertRaw {
        account_type,
        account_name,
        starred,
      } => {
        tx.execute(
          "INSERT INTO raw_contacts
             (lookup_key, starred, account_type, account_name, last_updated)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            Uuid::new_v4().to_string(),
            starred,
            account_type,
            account_name,
            now
          ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
          "UPDATE raw_contacts SET contact_id = ?1 WHERE raw_contact_id = ?1",
          params![id],
        )?;
        touched.insert(id);
        OpResult {
          id:    Some(id),
          count: 1,
        }
      }

      Planned::InsertData {
        raw,
        mimetype,
        assignments,
        photo,
      } => {
        let raw_id = match raw {
          RawContactRef::Id(id) => id,
          RawContactRef::BackReference(target) => results
            .get(target)
            .and_then(|r| r.id)
            .ok_or(rusqlite::Error::QueryReturnedNoRows)?,
        };
        let (columns, values): (Vec<String>, Vec<Value>) =
          assignments.into_iter().unzip();
        let sql = format!(
          "INSERT INTO data (raw_contact_id, mimetype{}) VALUES (?, ?{})",
          columns.iter().map(|c| format!(", {c}")).collect::<String>(),
          ", ?".repeat(columns.len()),
        );
        let mut bound = vec![Value::Integer(raw_id), Value::Text(mimetype.into())];
        bound.extend(values);
        tx.execute(&sql, params_from_iter(bound))?;
        let id = tx.last_insert_rowid();
        if let Some(photo) = photo {
          tx.execute(
            "INSERT OR REPLACE INTO display_photos (raw_contact_id, photo)
             VALUES (?1, ?2)",
            params![raw_id, photo],
          )?;
        }
        touched.insert(raw_id);
        OpResult {
          id:    Some(id),
          count: 1,
        }
      }

      Planned::UpdateData {
        selection,
        assignments,
      } => {
        let raws = affected_raw_ids(&tx, &selection)?;
        let count = if assignments.is_empty() || raws.is_empty() {
          0
        } else {
          let (columns, mut bound): (Vec<String>, Vec<Value>) =
            assignments.into_iter().unzip();
          let set = columns
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
          let sql = format!(
            "UPDATE data SET {set}
             WHERE data_id IN (SELECT data_id FROM data_view {})",
            where_clause(&selection)
          );
          bound.extend(selection_params(&selection));
          tx.execute(&sql, params_from_iter(bound))?
        };
        touched.extend(raws);
        OpResult { id: None, count }
      }

      Planned::DeleteData { selection } => {
        let raws = affected_raw_ids(&tx, &selection)?;
        let sql = format!(
          "DELETE FROM data
           WHERE data_id IN (SELECT data_id FROM data_view {})",
          where_clause(&selection)
        );
        let count =
          tx.execute(&sql, params_from_iter(selection_params(&selection)))?;
        touched.extend(raws);
        OpResult { id: None, count }
      }

      Planned::DeleteContact { selection } => {
        let sql = format!(
          "DELETE FROM raw_contacts WHERE raw_contact_id IN
             (SELECT raw_contact_id FROM raw_contacts {})",
          where_clause(&selection)
        );
        let count =
          tx.execute(&sql, params_from_iter(selection_params(&selection)))?;
        store_wide |= count > 0;
        OpResult { id: None, count }
      }
    };
    results.push(result);
  }

  let mut changed_contacts = BTreeSet::new();
  for raw_id in touched {
    if let Some(contact_id) = refresh_raw_contact(&tx, raw_id, now)? {
      changed_contacts.insert(contact_id);
    }
  }
  tx.commit()?;

  let mut uris: Vec<Option<String>> = changed_contacts
    .into_iter()
    .map(|id| Some(contact_uri(id)))
    .collect();
  if store_wide {
    uris.push(Some(AUTHORITY_URI.to_owned()));
  }
  Ok((results, uris))
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An emulated contacts provider backed by a single SQLite file.
///
/// Cloning is cheap; the connection and the callback registry are shared.
#[derive(Clone)]
pub struct SqliteStore {
  conn:         tokio_rusqlite::Connection,
  notifier:     Arc<Notifier>,
  permission:   Arc<AtomicBool>,
  open_cursors: Arc<AtomicUsize>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn).await
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self {
      conn,
      notifier: Arc::new(Notifier::default()),
      permission: Arc::new(AtomicBool::new(true)),
      open_cursors: Arc::new(AtomicUsize::new(0)),
    })
  }

  /// Grant or revoke permission to observe the store.
  pub fn set_permission(&self, granted: bool) {
    self.permission.store(granted, Ordering::SeqCst);
  }

  /// Cursors handed out by [`NativeStore::query`] and not yet dropped.
  pub fn open_cursors(&self) -> usize {
    self.open_cursors.load(Ordering::SeqCst)
  }

  /// Number of registered change callbacks.
  pub fn observer_count(&self) -> usize { self.notifier.len() }

  pub async fn insert_group(&self, group: GroupRow) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO groups (source_id, title, notes, favorites, deleted)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          params![
            group.source_id,
            group.title,
            group.notes,
            group.favorites,
            group.deleted
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Aggregate raw contact `merge` (and anything already aggregated with it)
  /// into the contact that `keep` belongs to.
  pub async fn link(&self, keep: i64, merge: i64) -> Result<()> {
    let contact_id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let target: Option<i64> = tx
          .query_row(
            "SELECT contact_id FROM raw_contacts WHERE raw_contact_id = ?1",
            params![keep],
            |r| r.get(0),
          )
          .optional()?;
        let Some(target) = target else {
          return Ok(None);
        };
        let moved = tx.execute(
          "UPDATE raw_contacts SET contact_id = ?1
           WHERE contact_id =
             (SELECT contact_id FROM raw_contacts WHERE raw_contact_id = ?2)",
          params![target, merge],
        )?;
        tx.commit()?;
        Ok((moved > 0).then_some(target))
      })
      .await?;

    let contact_id = contact_id.ok_or(Error::RawContactNotFound(merge))?;
    tracing::debug!(keep, merge, contact_id, "linked raw contacts");
    self.notifier.notify(&[
      Some(contact_uri(contact_id)),
      Some(AUTHORITY_URI.to_owned()),
    ]);
    Ok(())
  }

  /// Store a full-size photo for a raw contact, independent of its thumbnail.
  pub async fn set_display_photo(&self, raw_contact_id: i64, photo: Vec<u8>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO display_photos (raw_contact_id, photo)
           VALUES (?1, ?2)",
          params![raw_contact_id, photo],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── NativeStore impl ────────────────────────────────────────────────────────

impl NativeStore for SqliteStore {
  type Error = Error;

  async fn query(&self, query: DataQuery) -> Result<Cursor> {
    let sql = query_sql(&query);
    let bound = selection_params(&query.selection);
    let reader: fn(&rusqlite::Row<'_>) -> rusqlite::Result<DataRow> =
      match query.projection {
        Projection::Full => read_full_row,
        Projection::IdsOnly => read_id_row,
      };

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(params_from_iter(bound), reader)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    self.open_cursors.fetch_add(1, Ordering::SeqCst);
    let open = self.open_cursors.clone();
    Ok(Cursor::new(rows).with_close_hook(move || {
      open.fetch_sub(1, Ordering::SeqCst);
    }))
  }

  async fn query_groups(&self) -> Result<Vec<GroupRow>> {
    let groups = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT source_id, title, notes, favorites, deleted
           FROM groups ORDER BY group_id",
        )?;
        let rows = stmt
          .query_map([], read_group_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(groups)
  }

  async fn open_photo(
    &self,
    selection: Selection,
    resolution: PhotoResolution,
  ) -> Result<Option<Vec<u8>>> {
    let (sql, bound) = match resolution {
      PhotoResolution::High => (
        format!(
          "SELECT photo FROM display_photos WHERE raw_contact_id IN
             (SELECT raw_contact_id FROM data_view {})
           ORDER BY raw_contact_id LIMIT 1",
          where_clause(&selection)
        ),
        selection_params(&selection),
      ),
      PhotoResolution::Thumbnail => {
        let selection = selection
          .and(Selection::mimetype_in(&[mime::PHOTO]))
          .and(Selection::new("data15 IS NOT NULL", Vec::new()));
        (
          format!(
            "SELECT data15 FROM data_view {}
             ORDER BY raw_contact_id, data_id LIMIT 1",
            where_clause(&selection)
          ),
          selection_params(&selection),
        )
      }
    };

    let photo = self
      .conn
      .call(move |conn| {
        let photo: Option<Vec<u8>> = conn
          .query_row(&sql, params_from_iter(bound), |r| r.get(0))
          .optional()?;
        Ok(photo)
      })
      .await?;
    Ok(photo.filter(|p| !p.is_empty()))
  }

  async fn apply_batch(&self, ops: Vec<Operation>) -> Result<Vec<OpResult>> {
    let op_count = ops.len();
    let planned = plan(ops)?;
    let (results, uris) = self
      .conn
      .call(move |conn| Ok(apply_planned(conn, planned)?))
      .await?;
    tracing::debug!(ops = op_count, notifications = uris.len(), "applied batch");
    self.notifier.notify(&uris);
    Ok(results)
  }
}

// ─── ChangeSource impl ───────────────────────────────────────────────────────

impl ChangeSource for SqliteStore {
  fn register(&self, callback: ChangeCallback) -> roster_core::Result<Registration> {
    if !self.permission.load(Ordering::SeqCst) {
      return Err(roster_core::Error::PermissionDenied);
    }
    Ok(self.notifier.register(callback))
  }

  fn unregister(&self, registration: Registration) {
    self.notifier.unregister(registration);
  }
}
