//! Forwards native change notifications to one event sink.

use std::sync::Arc;

use parking_lot::Mutex;
use roster_core::{
  event::ContactEvent,
  store::{ChangeCallback, ChangeSource, Registration},
};
use tokio::sync::mpsc;

use crate::Result;

/// What the sink receives: an event, or the one error that ended the stream.
pub type EventItem = std::result::Result<ContactEvent, roster_core::Error>;

pub type EventSink = mpsc::UnboundedSender<EventItem>;

type SharedSink = Arc<Mutex<Option<EventSink>>>;

enum State {
  Idle,
  Observing {
    registration: Registration,
    sink:         SharedSink,
  },
}

/// At most one active registration at a time.
///
/// Dropping the observer stops it.
pub struct ChangeObserver<C: ChangeSource> {
  source: Arc<C>,
  state:  Mutex<State>,
}

impl<C: ChangeSource> ChangeObserver<C> {
  pub fn new(source: Arc<C>) -> Self {
    Self {
      source,
      state: Mutex::new(State::Idle),
    }
  }

  pub fn is_observing(&self) -> bool {
    matches!(*self.state.lock(), State::Observing { .. })
  }

  /// Register with the source and forward every change to `sink`.
  ///
  /// Starting twice is an error. If the source refuses the registration, the
  /// refusal is delivered to `sink` as its only item, the sink is closed, and
  /// this still returns `Ok`.
  pub fn start(&self, sink: EventSink) -> Result<()> {
    let mut state = self.state.lock();
    if matches!(*state, State::Observing { .. }) {
      return Err(
        roster_core::Error::invalid_parameter("observer", "already observing")
          .into(),
      );
    }

    let shared: SharedSink = Arc::new(Mutex::new(Some(sink)));
    let forward = shared.clone();
    let callback: ChangeCallback = Arc::new(move |uri: Option<&str>| {
      let event = ContactEvent::classify(uri);
      let mut slot = forward.lock();
      let closed = match slot.as_ref() {
        Some(sink) => sink.send(Ok(event)).is_err(),
        None => false,
      };
      if closed {
        // Receiver went away; stop holding the sender.
        slot.take();
      }
    });

    match self.source.register(callback) {
      Ok(registration) => {
        tracing::debug!(registration = registration.0, "observing changes");
        *state = State::Observing {
          registration,
          sink: shared,
        };
      }
      Err(e) => {
        tracing::warn!(error = %e, "change observation refused");
        if let Some(sink) = shared.lock().take() {
          let _ = sink.send(Err(e));
        }
      }
    }
    Ok(())
  }

  /// Unregister and close the sink. Stopping an idle observer does nothing.
  pub fn stop(&self) {
    let previous = std::mem::replace(&mut *self.state.lock(), State::Idle);
    if let State::Observing { registration, sink } = previous {
      self.source.unregister(registration);
      sink.lock().take();
      tracing::debug!(registration = registration.0, "stopped observing");
    }
  }
}

impl<C: ChangeSource> Drop for ChangeObserver<C> {
  fn drop(&mut self) { self.stop(); }
}
