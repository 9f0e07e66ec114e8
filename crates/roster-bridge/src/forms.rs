//! Hand-off to native contact forms (editor, inserter, picker).
//!
//! The bridge never presents UI. A [`FormDelegate`] does, and resolves with
//! what the form returned once the user is done with it.

use std::future::Future;

use roster_core::{
  contact::Contact,
  key::{ContactKey, ContactMode},
};

pub const FORM_COULD_NOT_BE_OPENED: &str = "formCouldNotBeOpened";
pub const FORM_OPERATION_CANCELED: &str = "formOperationCancelled";

/// How a form ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormOutcome {
  pub success: bool,
  pub contact: Option<Contact>,
  pub code:    Option<&'static str>,
}

impl FormOutcome {
  pub fn completed(contact: Contact) -> Self {
    Self {
      success: true,
      contact: Some(contact),
      code:    None,
    }
  }

  pub fn failed(code: &'static str) -> Self {
    Self {
      success: false,
      contact: None,
      code:    Some(code),
    }
  }
}

pub trait FormDelegate: Send + Sync {
  fn open_edit_form(
    &self,
    mode: ContactMode,
    key: ContactKey,
  ) -> impl Future<Output = FormOutcome> + Send + '_;

  fn open_insert_form(
    &self,
    mode: ContactMode,
    contact: Contact,
  ) -> impl Future<Output = FormOutcome> + Send + '_;

  fn open_picker(
    &self,
    mode: ContactMode,
  ) -> impl Future<Output = FormOutcome> + Send + '_;
}

/// For hosts without native forms: every form fails to open.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedForms;

impl FormDelegate for UnsupportedForms {
  async fn open_edit_form(
    &self,
    _mode: ContactMode,
    _key: ContactKey,
  ) -> FormOutcome {
    FormOutcome::failed(FORM_COULD_NOT_BE_OPENED)
  }

  async fn open_insert_form(
    &self,
    _mode: ContactMode,
    _contact: Contact,
  ) -> FormOutcome {
    FormOutcome::failed(FORM_COULD_NOT_BE_OPENED)
  }

  async fn open_picker(&self, _mode: ContactMode) -> FormOutcome {
    FormOutcome::failed(FORM_COULD_NOT_BE_OPENED)
  }
}
