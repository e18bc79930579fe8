use std::rc::Rc;

use super::{hooks, FnObserver, Observer, SchedulerLike, SignalError, Sink, Stage, Subscription, Teardown};


/// Producer callback: the sole way base sequences are defined.
///
/// Receives the sink as a write-only endpoint and may return a teardown to
/// release whatever the producer acquired. A synchronous `Err` is the
/// producer failing to start; errors after the producer has begun emitting
/// are the producer's own responsibility to route through the sink.
pub type Producer<T> = dyn Fn(Sink<T>) -> Result<Option<Teardown>, SignalError>;

/// Lazily-connected source of ordered value/error/done notifications.
///
/// A sequence is an immutable description: nothing runs until a sink is
/// connected, and every connection builds an independent notification and
/// resource tree, so one descriptor may be connected any number of times,
/// concurrently or sequentially. Composed sequences own their upstream and
/// stage logic as captured state inside the producer.
///
/// Handles are cheap to clone and share one descriptor.
pub struct Sequence<T> {
  producer: Rc<Producer<T>>,
}

impl<T> Clone for Sequence<T> {
  fn clone(&self) -> Self {
    Self { producer: self.producer.clone() }
  }
}

impl<T: 'static> Sequence<T> {
  /// Defines a sequence from a producer callback.
  #[must_use]
  pub fn new(producer: impl Fn(Sink<T>) -> Result<Option<Teardown>, SignalError> + 'static) -> Self {
    Self { producer: Rc::new(producer) }
  }

  /// Connects a sink: runs the producer, wiring its teardown into the sink's
  /// subscription and routing a synchronous start failure to the sink's
  /// error channel.
  pub fn connect(&self, sink: &Sink<T>) {
    match (self.producer)(sink.clone()) {
      | Ok(Some(teardown)) => {
        if let Err(error) = sink.add(teardown) {
          hooks::report_unhandled_error(&error);
        }
      },
      | Ok(None) => {},
      | Err(error) => sink.error(error),
    }
  }

  /// Compatibility-mode connect: a synchronous start failure is returned to
  /// the caller (after tearing the partial subscription down) instead of
  /// being routed to the sink's error channel.
  ///
  /// # Errors
  ///
  /// Returns the producer's synchronous start failure, or the failure of a
  /// teardown that had to run immediately.
  pub fn try_connect(&self, sink: &Sink<T>) -> Result<(), SignalError> {
    match (self.producer)(sink.clone()) {
      | Ok(Some(teardown)) => sink.add(teardown).map(|_| ()),
      | Ok(None) => Ok(()),
      | Err(error) => {
        if let Err(failure) = sink.unsubscribe() {
          hooks::report_unhandled_error(&SignalError::from(failure));
        }
        Err(error)
      },
    }
  }

  /// Subscribes with a bare value handler.
  pub fn subscribe(&self, on_value: impl FnMut(T) + 'static) -> Subscription {
    self.subscribe_observer(FnObserver::new().value_fn(on_value))
  }

  /// Subscribes with a full or partial observer.
  pub fn subscribe_observer(&self, observer: impl Observer<T> + 'static) -> Subscription {
    let sink = Sink::new(observer);
    self.connect(&sink);
    sink.subscription().clone()
  }

  /// Compatibility-mode subscribe: see [`Sequence::try_connect`].
  ///
  /// # Errors
  ///
  /// Returns the producer's synchronous start failure.
  pub fn try_subscribe_observer(&self, observer: impl Observer<T> + 'static) -> Result<Subscription, SignalError> {
    let sink = Sink::new(observer);
    self.try_connect(&sink)?;
    Ok(sink.subscription().clone())
  }

  /// Applies a transformation stage, yielding the composed sequence.
  #[must_use]
  pub fn pipe<B: 'static>(&self, stage: impl Stage<T, B>) -> Sequence<B> {
    stage.apply(self.clone())
  }

  /// Sequence that completes immediately without emitting.
  #[must_use]
  pub fn empty() -> Self {
    Self::new(|sink| {
      sink.done();
      Ok(None)
    })
  }

  /// Sequence that never emits and never completes.
  #[must_use]
  pub fn never() -> Self {
    Self::new(|_| Ok(None))
  }

  /// Sequence that fails immediately with `error`.
  #[must_use]
  pub fn fail(error: SignalError) -> Self {
    Self::new(move |sink| {
      sink.error(error.clone());
      Ok(None)
    })
  }

  /// Sequence emitting each item of `values` synchronously, then completing.
  #[must_use]
  pub fn from_iter<I>(values: I) -> Self
  where
    I: IntoIterator<Item = T> + Clone + 'static, {
    Self::new(move |sink| {
      for value in values.clone() {
        if sink.is_stopped() {
          break;
        }
        sink.value(value);
      }
      sink.done();
      Ok(None)
    })
  }
}

impl Sequence<u64> {
  /// Sequence emitting `0` after `delay` scheduler units, then completing.
  ///
  /// This is the timeout building block: combined with cancellation it
  /// expresses every timer-shaped behavior the kernel needs.
  #[must_use]
  pub fn timer(delay: u64, scheduler: Rc<dyn SchedulerLike>) -> Self {
    Sequence::new(move |sink| {
      let handle = scheduler.schedule(
        delay,
        Box::new(move |_| {
          sink.value(0);
          sink.done();
          Ok(())
        }),
      )?;
      Ok(Some(Teardown::from(handle)))
    })
  }
}
