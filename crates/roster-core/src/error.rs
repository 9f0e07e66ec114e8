//! Error types for `roster-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Nothing in the supplied value yields a usable identifier or lookup key.
  #[error("invalid identifier: {0}")]
  InvalidIdentifier(String),

  #[error("invalid parameter {name}: {reason}")]
  InvalidParameter { name: String, reason: String },

  #[error("no permission to access the contact store")]
  PermissionDenied,
}

impl Error {
  pub fn invalid_parameter(
    name: impl Into<String>,
    reason: impl Into<String>,
  ) -> Self {
    Self::InvalidParameter {
      name:   name.into(),
      reason: reason.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
