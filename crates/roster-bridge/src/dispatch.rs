//! Named bridge methods routed to a [`ContactAdapter`].

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use roster_adapter::{ContactAdapter, DEFAULT_LIMIT, ListRequest};
use roster_core::{
  key::{ContactMode, key_of},
  native::SortOrder,
  store::NativeStore,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
  error::{BridgeError, Result},
  forms::{FormDelegate, FormOutcome, UnsupportedForms},
  wire::{from_wire, to_wire},
};

// ─── Arguments ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ListArgs {
  query:                 Option<String>,
  with_thumbnails:       Option<bool>,
  photo_high_resolution: Option<bool>,
  sort_by:               Option<String>,
  limit:                 Option<usize>,
  offset:                Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QueryArgs {
  query: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContactArgs {
  identifier:            Value,
  with_thumbnails:       Option<bool>,
  photo_high_resolution: Option<bool>,
}

/// Missing arguments are the same as an empty map.
fn parse_args<T: DeserializeOwned + Default>(args: Value) -> Result<T> {
  if args.is_null() {
    return Ok(T::default());
  }
  serde_json::from_value(args)
    .map_err(|e| BridgeError::InvalidParameter(format!("arguments: {e}")))
}

fn to_json(value: impl Serialize) -> Result<Value> {
  serde_json::to_value(value).map_err(|e| BridgeError::Unknown(e.to_string()))
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Routes method calls for one contact mode.
pub struct Dispatcher<S, F = UnsupportedForms> {
  adapter:       ContactAdapter<S>,
  forms:         Arc<F>,
  default_limit: usize,
}

impl<S: NativeStore, F: FormDelegate> Dispatcher<S, F> {
  pub fn new(adapter: ContactAdapter<S>, forms: Arc<F>) -> Self {
    Self {
      adapter,
      forms,
      default_limit: DEFAULT_LIMIT,
    }
  }

  /// Page size for `getContacts` calls that give no `limit`.
  pub fn with_default_limit(mut self, limit: usize) -> Self {
    self.default_limit = limit;
    self
  }

  pub fn mode(&self) -> ContactMode { self.adapter.mode() }

  pub fn adapter(&self) -> &ContactAdapter<S> { &self.adapter }

  /// Run `method` with JSON `args` and return its JSON result.
  pub async fn call(&self, method: &str, args: Value) -> Result<Value> {
    tracing::debug!(mode = %self.mode(), method, "dispatching");
    match method {
      "getContacts" => self.get_contacts(args).await,
      "getTotalContacts" => {
        let args: QueryArgs = parse_args(args)?;
        let total = self.adapter.count(args.query.as_deref()).await?;
        Ok(Value::from(total))
      }
      "getContact" => {
        let args: ContactArgs = parse_args(args)?;
        let key = key_of(self.mode(), &args.identifier)?;
        let contact = self
          .adapter
          .fetch(
            &key,
            args.with_thumbnails.unwrap_or(false),
            args.photo_high_resolution.unwrap_or(false),
          )
          .await?;
        to_json(to_wire(&contact))
      }
      "getContactImage" => self.get_contact_image(args).await,
      "getGroups" => to_json(self.adapter.groups().await?),
      "addContact" => {
        let contact = from_wire(self.mode(), args)?;
        to_json(to_wire(&self.adapter.add(&contact).await?))
      }
      "updateContact" => {
        let contact = from_wire(self.mode(), args)?;
        to_json(to_wire(&self.adapter.update(&contact).await?))
      }
      "deleteContact" => {
        let contact = from_wire(self.mode(), args)?;
        Ok(Value::Bool(self.adapter.delete(&contact).await?))
      }
      "openContactEditForm" => {
        let args: ContactArgs = parse_args(args)?;
        if args.identifier.is_null() {
          return Err(BridgeError::InvalidParameter(
            "Missing parameter: identifier".to_owned(),
          ));
        }
        let key = key_of(self.mode(), &args.identifier)?;
        let outcome = self.forms.open_edit_form(self.mode(), key).await;
        Ok(outcome_json(&outcome))
      }
      "openContactInsertForm" => {
        let contact = from_wire(self.mode(), args)?;
        let outcome = self.forms.open_insert_form(self.mode(), contact).await;
        Ok(outcome_json(&outcome))
      }
      "openContactPicker" => {
        let outcome = self.forms.open_picker(self.mode()).await;
        Ok(outcome_json(&outcome))
      }
      other => Err(BridgeError::NotImplemented(other.to_owned())),
    }
  }

  async fn get_contacts(&self, args: Value) -> Result<Value> {
    let args: ListArgs = parse_args(args)?;
    let request = ListRequest {
      query:                 args.query,
      sort:                  args
        .sort_by
        .as_deref()
        .map(SortOrder::from_name)
        .unwrap_or_default(),
      offset:                args.offset.unwrap_or(0),
      limit:                 Some(args.limit.unwrap_or(self.default_limit)),
      with_thumbnails:       args.with_thumbnails.unwrap_or(false),
      photo_high_resolution: args.photo_high_resolution.unwrap_or(false),
    };
    let contacts = self.adapter.list(request).await?;
    to_json(contacts.iter().map(to_wire).collect::<Vec<_>>())
  }

  /// Full-size photo, else thumbnail, else `null`. An identifier that names
  /// nothing resolvable is `null` as well.
  async fn get_contact_image(&self, args: Value) -> Result<Value> {
    let args: ContactArgs = parse_args(args)?;
    let Ok(key) = key_of(self.mode(), &args.identifier) else {
      return Ok(Value::Null);
    };
    let photo = self.adapter.avatar(&key, true).await?;
    Ok(photo.map_or(Value::Null, |bytes| Value::String(B64.encode(bytes))))
  }
}

fn outcome_json(outcome: &FormOutcome) -> Value {
  let mut map = Map::new();
  map.insert("success".to_owned(), Value::Bool(outcome.success));
  if let Some(contact) = &outcome.contact {
    if let Ok(encoded) = serde_json::to_value(to_wire(contact)) {
      map.insert("contact".to_owned(), encoded);
    }
  }
  if let Some(code) = outcome.code {
    map.insert("code".to_owned(), Value::from(code));
  }
  Value::Object(map)
}
