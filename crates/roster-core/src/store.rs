//! The `NativeStore` and `ChangeSource` traits.
//!
//! These are the only seams between the bridge and a concrete contacts
//! provider (e.g. `roster-store-sqlite`). Everything above them works in
//! terms of [`DataRow`](crate::native::DataRow)s and
//! [`Operation`](crate::native::Operation)s.

use std::{future::Future, sync::Arc};

use crate::native::{
  Cursor, DataQuery, GroupRow, OpResult, Operation, PhotoResolution,
  Selection,
};

// ─── NativeStore ─────────────────────────────────────────────────────────────

/// A row-oriented contacts provider.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait NativeStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Data rows joined with their raw contact, grouped so that all rows of one
  /// contact are adjacent.
  fn query(
    &self,
    query: DataQuery,
  ) -> impl Future<Output = Result<Cursor, Self::Error>> + Send + '_;

  fn query_groups(
    &self,
  ) -> impl Future<Output = Result<Vec<GroupRow>, Self::Error>> + Send + '_;

  /// Photo bytes of the contact matched by `selection`, or `None` when it has
  /// no photo at that resolution.
  fn open_photo(
    &self,
    selection: Selection,
    resolution: PhotoResolution,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + '_;

  /// Apply all operations atomically. Results are positional.
  fn apply_batch(
    &self,
    ops: Vec<Operation>,
  ) -> impl Future<Output = Result<Vec<OpResult>, Self::Error>> + Send + '_;
}

// ─── ChangeSource ────────────────────────────────────────────────────────────

/// Invoked with the URI of whatever changed, if the store knows it.
pub type ChangeCallback = Arc<dyn Fn(Option<&str>) + Send + Sync>;

/// Handle returned by [`ChangeSource::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration(pub u64);

/// Something that can notify about store changes.
pub trait ChangeSource: Send + Sync {
  /// Fails with [`Error::PermissionDenied`](crate::Error::PermissionDenied)
  /// when the caller may not observe the store.
  fn register(&self, callback: ChangeCallback) -> crate::Result<Registration>;

  /// Unknown registrations are ignored.
  fn unregister(&self, registration: Registration);
}
