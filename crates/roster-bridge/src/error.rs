//! Bridge error type, its stable wire codes and its
//! [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
  #[error("{0}")]
  InvalidParameter(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  StoreOperation(String),

  #[error("no permission to access contacts")]
  InvalidPermissions,

  #[error("method not implemented: {0}")]
  NotImplemented(String),

  #[error("{0}")]
  Unknown(String),
}

impl BridgeError {
  pub fn code(&self) -> &'static str {
    match self {
      BridgeError::InvalidParameter(_) => "invalidParameter",
      BridgeError::NotFound(_) => "notFound",
      BridgeError::StoreOperation(_) => "storeOperationFailed",
      BridgeError::InvalidPermissions => "invalidPermissions",
      BridgeError::NotImplemented(_) => "notImplemented",
      BridgeError::Unknown(_) => "unknownError",
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      BridgeError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
      BridgeError::NotFound(_) | BridgeError::NotImplemented(_) => {
        StatusCode::NOT_FOUND
      }
      BridgeError::InvalidPermissions => StatusCode::FORBIDDEN,
      BridgeError::StoreOperation(_) | BridgeError::Unknown(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  /// `{"code", "message"}` as sent on the wire.
  pub fn to_json(&self) -> serde_json::Value {
    json!({ "code": self.code(), "message": self.to_string() })
  }
}

impl From<roster_core::Error> for BridgeError {
  fn from(err: roster_core::Error) -> Self {
    match err {
      roster_core::Error::PermissionDenied => BridgeError::InvalidPermissions,
      other => BridgeError::InvalidParameter(other.to_string()),
    }
  }
}

impl From<roster_adapter::Error> for BridgeError {
  fn from(err: roster_adapter::Error) -> Self {
    match err {
      roster_adapter::Error::Core(e) => e.into(),
      roster_adapter::Error::NotFound(key) => {
        BridgeError::NotFound(format!("no contact for {key}"))
      }
      e @ roster_adapter::Error::Ambiguous { .. } => {
        tracing::error!(error = %e, "fetch matched more than one contact");
        BridgeError::Unknown(e.to_string())
      }
      e @ roster_adapter::Error::StoreOperation(_) => {
        BridgeError::StoreOperation(error_chain(&e))
      }
    }
  }
}

/// `err` followed by each of its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
  let mut message = err.to_string();
  let mut source = err.source();
  while let Some(cause) = source {
    message.push_str(": ");
    message.push_str(&cause.to_string());
    source = cause.source();
  }
  message
}

impl IntoResponse for BridgeError {
  fn into_response(self) -> Response {
    (self.status(), Json(self.to_json())).into_response()
  }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn core_errors_map_to_codes() {
    let e: BridgeError = roster_core::Error::InvalidIdentifier("x".into()).into();
    assert_eq!(e.code(), "invalidParameter");
    assert_eq!(e.status(), StatusCode::BAD_REQUEST);

    let e: BridgeError = roster_core::Error::PermissionDenied.into();
    assert_eq!(e.code(), "invalidPermissions");
    assert_eq!(e.status(), StatusCode::FORBIDDEN);
  }

  #[test]
  fn adapter_errors_map_to_codes() {
    let e: BridgeError = roster_adapter::Error::NotFound("single:3".into()).into();
    assert_eq!(e.code(), "notFound");

    let e: BridgeError = roster_adapter::Error::Ambiguous {
      key:   "single:3".into(),
      count: 2,
    }
    .into();
    assert_eq!(e.code(), "unknownError");

    let e: BridgeError =
      roster_adapter::Error::StoreOperation("disk full".into()).into();
    assert_eq!(e.code(), "storeOperationFailed");
    assert!(e.to_string().contains("disk full"));
  }
}
