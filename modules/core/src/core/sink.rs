use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use super::{hooks, Observer, SignalError, StoppedNotification, Subscription, Teardown, TeardownKey, UnsubscribeError};

/// Operator-internal observer that forwards to a downstream sink by default.
mod operator_observer;

#[cfg(test)]
mod tests;

pub use operator_observer::OperatorObserver;

/// Write-only notification endpoint enforcing the active → stopped machine.
///
/// A sink wraps a destination observer and guarantees: values are dropped
/// after stop (routed to the stopped-notification hook, never to the
/// destination); `error`/`done` each fire at most once and always tear the
/// subscription down afterwards; a handler failure is caught here and routed
/// onward instead of unwinding into the producer. Cancelling via
/// [`Sink::unsubscribe`] stops the sink without invoking the destination's
/// done handler, so cancellation and completion stay observably different.
///
/// Handles are cheap to clone and share one sink.
pub struct Sink<T> {
  stopped:      Rc<Cell<bool>>,
  destination:  Rc<RefCell<dyn Observer<T>>>,
  subscription: Subscription,
}

impl<T> Clone for Sink<T> {
  fn clone(&self) -> Self {
    Self { stopped: self.stopped.clone(), destination: self.destination.clone(), subscription: self.subscription.clone() }
  }
}

impl<T: 'static> Sink<T> {
  /// Wraps a destination observer in a fresh sink.
  ///
  /// The sink's subscription carries a construction-time action flipping the
  /// stopped flag, so releasing the subscription through any path (a parent
  /// teardown included) stops delivery as well.
  #[must_use]
  pub fn new(destination: impl Observer<T> + 'static) -> Self {
    let destination: Rc<RefCell<dyn Observer<T>>> = Rc::new(RefCell::new(destination));
    let stopped = Rc::new(Cell::new(false));
    let flag = Rc::clone(&stopped);
    let subscription = Subscription::with_action(move || {
      flag.set(true);
      Ok(())
    });
    Self { stopped, destination, subscription }
  }

  /// Wraps a destination observer and registers the new sink's subscription
  /// as a child of `parent`, so tearing the parent down tears this sink down
  /// with it.
  #[must_use]
  pub fn chained(destination: impl Observer<T> + 'static, parent: &Subscription) -> Self {
    let sink = Self::new(destination);
    if let Err(error) = parent.add(Teardown::from(sink.subscription.clone())) {
      hooks::report_unhandled_error(&error);
    }
    sink
  }

  /// Delivers a value. Dropped (and reported to the stopped-notification
  /// hook) once the sink has stopped; a destination failure is routed to
  /// this sink's error channel.
  pub fn value(&self, value: T) {
    if self.stopped.get() {
      hooks::report_stopped_notification(&StoppedNotification::Value);
      return;
    }
    let result = self.destination.borrow_mut().value(value);
    if let Err(error) = result {
      self.error(error);
    }
  }

  /// Delivers the terminal error, then tears the subscription down
  /// regardless of whether the destination's handler failed.
  pub fn error(&self, error: SignalError) {
    if self.stopped.get() {
      hooks::report_stopped_notification(&StoppedNotification::Error(error));
      return;
    }
    self.stopped.set(true);
    let result = self.destination.borrow_mut().error(error);
    let teardown = self.subscription.unsubscribe();
    if let Err(unhandled) = result {
      hooks::report_unhandled_error(&unhandled);
    }
    if let Err(failure) = teardown {
      hooks::report_unhandled_error(&SignalError::from(failure));
    }
  }

  /// Delivers completion, then tears the subscription down regardless of
  /// whether the destination's handler failed.
  pub fn done(&self) {
    if self.stopped.get() {
      hooks::report_stopped_notification(&StoppedNotification::Done);
      return;
    }
    self.stopped.set(true);
    let result = self.destination.borrow_mut().done();
    let teardown = self.subscription.unsubscribe();
    if let Err(unhandled) = result {
      hooks::report_unhandled_error(&unhandled);
    }
    if let Err(failure) = teardown {
      hooks::report_unhandled_error(&SignalError::from(failure));
    }
  }

  /// Cancels the sink: stops it and releases its resources without invoking
  /// the destination's done handler.
  ///
  /// # Errors
  ///
  /// Returns the aggregate of teardown failures.
  pub fn unsubscribe(&self) -> Result<(), UnsubscribeError> {
    self.stopped.set(true);
    self.subscription.unsubscribe()
  }

  /// Returns true once the sink is stopped (terminated or cancelled).
  #[must_use]
  pub fn is_stopped(&self) -> bool {
    self.stopped.get()
  }

  /// Borrows the sink's resource node.
  #[must_use]
  pub fn subscription(&self) -> &Subscription {
    &self.subscription
  }

  /// Registers a teardown on the sink's resource node.
  ///
  /// # Errors
  ///
  /// Returns the failure of a teardown that had to run immediately because
  /// the sink was already released.
  pub fn add(&self, teardown: Teardown) -> Result<TeardownKey, SignalError> {
    self.subscription.add(teardown)
  }
}
