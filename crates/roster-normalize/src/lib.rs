//! Conversion between native contact rows and [`roster_core`] contacts.
//!
//! Pure synchronous; no store access. Decoding folds the rows of a cursor into
//! [`Contact`](roster_core::contact::Contact)s, encoding turns a contact into
//! the batch of [`Operation`](roster_core::native::Operation)s that persists
//! it.

mod decode;
mod encode;

pub use decode::{decode, decode_page};
pub use encode::{MUTABLE_FAMILIES, UpdateTarget, encode_insert, encode_update};

// ─── Round-trip tests ────────────────────────────────────────────────────────
