use super::SignalError;


/// Observer capability set: the three channels a consumer may implement.
///
/// Every channel returns a `Result`; an `Err` means the handler itself
/// failed, and the sink delivering the notification decides where that
/// failure goes (the error channel for value/done handlers, the
/// unhandled-error hook for error handlers).
pub trait Observer<T> {
  /// Receives the next value.
  ///
  /// # Errors
  ///
  /// Returns the handler's own failure, which the delivering sink routes to
  /// its error channel.
  fn value(&mut self, value: T) -> Result<(), SignalError>;

  /// Receives the terminal error.
  ///
  /// # Errors
  ///
  /// Returns the handler's own failure (or, for observers without an error
  /// handler, the undelivered error itself), which the delivering sink
  /// escalates to the unhandled-error hook.
  fn error(&mut self, error: SignalError) -> Result<(), SignalError>;

  /// Receives the completion notification.
  ///
  /// # Errors
  ///
  /// Returns the handler's own failure, escalated like [`Observer::error`]
  /// failures.
  fn done(&mut self) -> Result<(), SignalError>;
}

type ValueFn<T> = Box<dyn FnMut(T) -> Result<(), SignalError>>;
type ErrorFn = Box<dyn FnMut(SignalError)>;
type DoneFn = Box<dyn FnMut()>;

/// Observer assembled from any subset of the three handlers.
///
/// Missing value/done handlers are no-ops. A missing error handler hands the
/// error back to the delivering sink instead of swallowing it, so errors are
/// never silently dropped by default.
#[derive(Default)]
pub struct FnObserver<T> {
  value_fn: Option<ValueFn<T>>,
  error_fn: Option<ErrorFn>,
  done_fn:  Option<DoneFn>,
}

impl<T> FnObserver<T> {
  /// Creates an observer with no handlers.
  #[must_use]
  pub fn new() -> Self {
    Self { value_fn: None, error_fn: None, done_fn: None }
  }

  /// Sets an infallible value handler.
  #[must_use]
  pub fn value_fn(mut self, mut handler: impl FnMut(T) + 'static) -> Self {
    self.value_fn = Some(Box::new(move |value| {
      handler(value);
      Ok(())
    }));
    self
  }

  /// Sets a fallible value handler.
  #[must_use]
  pub fn try_value_fn(mut self, handler: impl FnMut(T) -> Result<(), SignalError> + 'static) -> Self {
    self.value_fn = Some(Box::new(handler));
    self
  }

  /// Sets the error handler.
  #[must_use]
  pub fn error_fn(mut self, handler: impl FnMut(SignalError) + 'static) -> Self {
    self.error_fn = Some(Box::new(handler));
    self
  }

  /// Sets the done handler.
  #[must_use]
  pub fn done_fn(mut self, handler: impl FnMut() + 'static) -> Self {
    self.done_fn = Some(Box::new(handler));
    self
  }
}

impl<T> Observer<T> for FnObserver<T> {
  fn value(&mut self, value: T) -> Result<(), SignalError> {
    match &mut self.value_fn {
      | Some(handler) => handler(value),
      | None => Ok(()),
    }
  }

  fn error(&mut self, error: SignalError) -> Result<(), SignalError> {
    match &mut self.error_fn {
      | Some(handler) => {
        handler(error);
        Ok(())
      },
      | None => Err(error),
    }
  }

  fn done(&mut self) -> Result<(), SignalError> {
    if let Some(handler) = &mut self.done_fn {
      handler();
    }
    Ok(())
  }
}
