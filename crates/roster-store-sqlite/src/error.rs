//! Error type for `roster-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] roster_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// An insert referenced an operation that does not create a raw contact.
  #[error("operation {op} back-references operation {target}, which is not an earlier raw contact insert")]
  InvalidBackReference { op: usize, target: usize },

  #[error("data column {0} does not exist")]
  InvalidColumn(usize),

  #[error("raw contact not found: {0}")]
  RawContactNotFound(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
