//! Conversions between [`roster_core::native`] values and SQLite rows and
//! parameters.

use rusqlite::types::Value;
use roster_core::native::{
  Arg, DATA_COLUMNS, DataQuery, DataRow, DataValues, GroupRow, Projection,
  Selection, SortOrder,
};

use crate::{Error, Result};

// ─── Selection ───────────────────────────────────────────────────────────────

pub fn encode_arg(arg: &Arg) -> Value {
  match arg {
    Arg::Int(v) => Value::Integer(*v),
    Arg::Text(v) => Value::Text(v.clone()),
  }
}

/// `WHERE …` for `selection`, or nothing when it matches everything.
pub fn where_clause(selection: &Selection) -> String {
  if selection.is_all() {
    String::new()
  } else {
    format!("WHERE ({})", selection.sql)
  }
}

pub fn selection_params(selection: &Selection) -> Vec<Value> {
  selection.args.iter().map(encode_arg).collect()
}

// ─── Queries ─────────────────────────────────────────────────────────────────

const FULL_COLUMNS: &str = "raw_contact_id, contact_id, lookup_key, \
  display_name, last_updated, starred, mimetype, data1, data2, data3, data4, \
  data5, data6, data7, data8, data9, data10, data15";

fn order_by(sort: Option<SortOrder>) -> &'static str {
  match sort {
    None => "ORDER BY contact_id, raw_contact_id, data_id",
    Some(SortOrder::FirstName) => {
      "ORDER BY UPPER(COALESCE(sort_given, contact_display_name)) IS NULL, \
       UPPER(COALESCE(sort_given, contact_display_name)), \
       contact_id, raw_contact_id, data_id"
    }
    Some(SortOrder::LastName) => {
      "ORDER BY UPPER(sort_family) IS NULL, UPPER(sort_family), \
       contact_id, raw_contact_id, data_id"
    }
    Some(SortOrder::DisplayName) => {
      "ORDER BY UPPER(contact_display_name) IS NULL, \
       UPPER(contact_display_name), contact_id, raw_contact_id, data_id"
    }
  }
}

/// SQL text for a [`DataQuery`] over `data_view`.
pub fn query_sql(query: &DataQuery) -> String {
  let filter = where_clause(&query.selection);
  match query.projection {
    Projection::Full => format!(
      "SELECT {FULL_COLUMNS} FROM data_view {filter} {}",
      order_by(query.sort)
    ),
    Projection::IdsOnly => format!(
      "SELECT DISTINCT raw_contact_id, contact_id, lookup_key
       FROM data_view {filter} ORDER BY contact_id, raw_contact_id"
    ),
  }
}

// ─── Rows ────────────────────────────────────────────────────────────────────

pub fn read_full_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DataRow> {
  let mut data: [Option<String>; DATA_COLUMNS] = Default::default();
  for (i, slot) in data.iter_mut().enumerate() {
    *slot = row.get(7 + i)?;
  }
  Ok(DataRow {
    raw_contact_id: row.get(0)?,
    contact_id: row.get(1)?,
    lookup_key: row.get(2)?,
    display_name: row.get(3)?,
    last_updated: row.get(4)?,
    starred: row.get(5)?,
    mimetype: row.get(6)?,
    data,
    blob: row.get(7 + DATA_COLUMNS)?,
  })
}

pub fn read_id_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<DataRow> {
  Ok(DataRow {
    raw_contact_id: row.get(0)?,
    contact_id: row.get(1)?,
    lookup_key: row.get(2)?,
    ..Default::default()
  })
}

pub fn read_group_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GroupRow> {
  Ok(GroupRow {
    source_id: row.get(0)?,
    title:     row.get(1)?,
    notes:     row.get(2)?,
    favorites: row.get(3)?,
    deleted:   row.get(4)?,
  })
}

// ─── Data values ─────────────────────────────────────────────────────────────

/// Column names and parameter values for an insert or update. Columns are
/// checked against the table before any SQL runs.
pub fn data_assignments(values: &DataValues) -> Result<Vec<(String, Value)>> {
  let mut out = Vec::with_capacity(values.columns.len() + 1);
  for (col, value) in &values.columns {
    if !(1..=DATA_COLUMNS).contains(col) {
      return Err(Error::InvalidColumn(*col));
    }
    let value = value.clone().map_or(Value::Null, Value::Text);
    out.push((format!("data{col}"), value));
  }
  if let Some(blob) = &values.blob {
    out.push(("data15".to_owned(), Value::Blob(blob.clone())));
  }
  Ok(out)
}
