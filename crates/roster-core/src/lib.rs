//! Core types and trait definitions for the Roster contacts bridge.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the canonical [`contact::Contact`] model, the identity/key resolver,
//! the native row and batch-operation vocabulary, and the [`store`] traits
//! that concrete contact-store backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod contact;
pub mod date;
pub mod error;
pub mod event;
pub mod key;
pub mod label;
pub mod native;
pub mod store;

pub use error::{Error, Result};
