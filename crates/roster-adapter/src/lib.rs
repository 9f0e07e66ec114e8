//! Contact-level operations over a [`roster_core::store::NativeStore`].
//!
//! [`ContactAdapter`] turns list/fetch/add/update/delete requests into store
//! queries and batches, and [`ChangeObserver`] turns the store's change
//! notifications into [`roster_core::event::ContactEvent`]s.

mod adapter;
pub mod error;
mod observer;

pub use adapter::{
  ContactAdapter, DEFAULT_LIMIT, FAVORITES_ID, FAVORITES_NAME, ListRequest,
  contact_identifier,
};
pub use error::{Error, Result};
pub use observer::{ChangeObserver, EventItem, EventSink};

#[cfg(test)]
mod tests;
