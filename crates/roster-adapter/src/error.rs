//! Error type for `roster-adapter`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Bad input, rejected before the store was touched.
  #[error(transparent)]
  Core(#[from] roster_core::Error),

  #[error("contact not found: {0}")]
  NotFound(String),

  /// A key that should name one contact matched several.
  #[error("{count} contacts matched {key}")]
  Ambiguous { key: String, count: usize },

  #[error("store operation failed")]
  StoreOperation(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(
    err: impl std::error::Error + Send + Sync + 'static,
  ) -> Self {
    Self::StoreOperation(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
