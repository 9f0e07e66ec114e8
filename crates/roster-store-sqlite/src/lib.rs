//! SQLite emulation of a native contacts provider.
//!
//! Models the raw-contact / data-row / group tables of a device contacts
//! database and implements [`roster_core::store::NativeStore`] and
//! [`roster_core::store::ChangeSource`] over them. Wraps [`tokio_rusqlite`] so
//! all database access runs on a dedicated thread without blocking the async
//! runtime.

mod encode;
mod notify;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
