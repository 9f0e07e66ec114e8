//! JSON-over-HTTP bridge for Roster.
//!
//! Exposes the contact methods as `POST /{mode}/{method}` and change events
//! as a server-sent event stream at `GET /events`, backed by any store that
//! implements both [`NativeStore`] and [`ChangeSource`].

pub mod dispatch;
pub mod error;
pub mod forms;
pub mod wire;

pub use dispatch::Dispatcher;
pub use error::BridgeError;

use std::{convert::Infallible, path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  body::Bytes,
  extract::{Path, State},
  response::sse::{Event, KeepAlive, Sse},
  routing::{get, post},
};
use roster_adapter::{ChangeObserver, ContactAdapter, DEFAULT_LIMIT, EventItem};
use roster_core::{
  key::ContactMode,
  store::{ChangeSource, NativeStore},
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt as _, wrappers::UnboundedReceiverStream};
use tower_http::trace::TraceLayer;

use forms::{FormDelegate, UnsupportedForms};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `roster.toml` and
/// `ROSTER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                String,
  pub port:                u16,
  pub store_path:          PathBuf,
  /// Whether callers may observe the store.
  pub contacts_permission: bool,
  pub default_limit:       usize,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                "127.0.0.1".to_owned(),
      port:                8085,
      store_path:          PathBuf::from("roster.db"),
      contacts_permission: true,
      default_limit:       DEFAULT_LIMIT,
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, F = UnsupportedForms> {
  pub store:   Arc<S>,
  pub single:  Arc<Dispatcher<S, F>>,
  pub unified: Arc<Dispatcher<S, F>>,
}

impl<S, F> Clone for AppState<S, F> {
  fn clone(&self) -> Self {
    Self {
      store:   self.store.clone(),
      single:  self.single.clone(),
      unified: self.unified.clone(),
    }
  }
}

impl<S: NativeStore, F: FormDelegate> AppState<S, F> {
  pub fn new(store: Arc<S>, forms: Arc<F>, default_limit: usize) -> Self {
    let dispatcher = |mode| {
      Arc::new(
        Dispatcher::new(ContactAdapter::new(store.clone(), mode), forms.clone())
          .with_default_limit(default_limit),
      )
    };
    Self {
      single: dispatcher(ContactMode::Single),
      unified: dispatcher(ContactMode::Unified),
      store,
    }
  }

  pub fn dispatcher(&self, mode: ContactMode) -> &Dispatcher<S, F> {
    match mode {
      ContactMode::Single => &self.single,
      ContactMode::Unified => &self.unified,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the bridge [`Router`].
pub fn router<S, F>(state: AppState<S, F>) -> Router
where
  S: NativeStore + ChangeSource + 'static,
  F: FormDelegate + 'static,
{
  Router::new()
    .route("/events", get(events_handler::<S, F>))
    .route("/{mode}/{method}", post(call_handler::<S, F>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn call_handler<S, F>(
  State(state): State<AppState<S, F>>,
  Path((mode, method)): Path<(String, String)>,
  body: Bytes,
) -> Result<Json<Value>, BridgeError>
where
  S: NativeStore + ChangeSource + 'static,
  F: FormDelegate + 'static,
{
  let mode = ContactMode::from_name(&mode)
    .ok_or_else(|| BridgeError::NotImplemented(format!("{mode}/{method}")))?;
  let args = if body.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| BridgeError::InvalidParameter(format!("body: {e}")))?
  };

  match state.dispatcher(mode).call(&method, args).await {
    Ok(result) => Ok(Json(result)),
    Err(e) => {
      tracing::info!(%mode, %method, code = e.code(), error = %e, "call failed");
      Err(e)
    }
  }
}

/// One SSE stream per connection, each with its own observer. The observer
/// lives inside the stream, so a disconnect drops it and unregisters.
async fn events_handler<S, F>(
  State(state): State<AppState<S, F>>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, BridgeError>
where
  S: NativeStore + ChangeSource + 'static,
  F: FormDelegate + 'static,
{
  let observer = ChangeObserver::new(state.store.clone());
  let (tx, rx) = mpsc::unbounded_channel();
  observer.start(tx)?;

  let stream = UnboundedReceiverStream::new(rx).map(move |item| {
    let _observer = &observer;
    Ok(sse_event(item))
  });
  Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn sse_event(item: EventItem) -> Event {
  match item {
    Ok(event) => match serde_json::to_string(&event) {
      Ok(data) => Event::default().data(data),
      Err(e) => Event::default()
        .event("error")
        .data(BridgeError::Unknown(e.to_string()).to_json().to_string()),
    },
    Err(e) => Event::default()
      .event("error")
      .data(BridgeError::from(e).to_json().to_string()),
  }
}

// ─── Integration tests ───────────────────────────────────────────────────────
