//! Registered change callbacks.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use roster_core::store::{ChangeCallback, Registration};

#[derive(Default)]
pub struct Notifier {
  next_id:   AtomicU64,
  callbacks: Mutex<Vec<(Registration, ChangeCallback)>>,
}

impl Notifier {
  pub fn register(&self, callback: ChangeCallback) -> Registration {
    let registration =
      Registration(self.next_id.fetch_add(1, Ordering::Relaxed));
    self.callbacks.lock().push((registration, callback));
    registration
  }

  pub fn unregister(&self, registration: Registration) {
    self.callbacks.lock().retain(|(r, _)| *r != registration);
  }

  pub fn len(&self) -> usize { self.callbacks.lock().len() }

  /// Invoke every callback once per URI. The lock is not held while
  /// callbacks run, so a callback may unregister itself.
  pub fn notify(&self, uris: &[Option<String>]) {
    if uris.is_empty() {
      return;
    }
    let callbacks: Vec<ChangeCallback> =
      self.callbacks.lock().iter().map(|(_, cb)| cb.clone()).collect();
    for uri in uris {
      for callback in &callbacks {
        callback(uri.as_deref());
      }
    }
  }
}
