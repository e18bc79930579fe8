use crate::core::{Observer, SignalError, Sink};

type ValueFn<A, B> = Box<dyn FnMut(&Sink<B>, A) -> Result<(), SignalError>>;
type ErrorFn<B> = Box<dyn FnMut(&Sink<B>, SignalError) -> Result<(), SignalError>>;
type DoneFn<B> = Box<dyn FnMut(&Sink<B>) -> Result<(), SignalError>>;

/// Observer used inside operators: values go through the stage's own
/// handler, while error/done default to plain forwarding into the downstream
/// sink. Stages override only the channels they participate in.
pub struct OperatorObserver<A, B> {
  downstream: Sink<B>,
  on_value:   ValueFn<A, B>,
  on_error:   Option<ErrorFn<B>>,
  on_done:    Option<DoneFn<B>>,
}

impl<A, B: 'static> OperatorObserver<A, B> {
  /// Creates an observer forwarding error/done to `downstream` and routing
  /// values through `on_value`.
  #[must_use]
  pub fn new(downstream: &Sink<B>, on_value: impl FnMut(&Sink<B>, A) -> Result<(), SignalError> + 'static) -> Self {
    Self { downstream: downstream.clone(), on_value: Box::new(on_value), on_error: None, on_done: None }
  }

  /// Overrides the error channel.
  #[must_use]
  pub fn error_fn(mut self, handler: impl FnMut(&Sink<B>, SignalError) -> Result<(), SignalError> + 'static) -> Self {
    self.on_error = Some(Box::new(handler));
    self
  }

  /// Overrides the done channel.
  #[must_use]
  pub fn done_fn(mut self, handler: impl FnMut(&Sink<B>) -> Result<(), SignalError> + 'static) -> Self {
    self.on_done = Some(Box::new(handler));
    self
  }
}

impl<A, B: 'static> Observer<A> for OperatorObserver<A, B> {
  fn value(&mut self, value: A) -> Result<(), SignalError> {
    (self.on_value)(&self.downstream, value)
  }

  fn error(&mut self, error: SignalError) -> Result<(), SignalError> {
    match &mut self.on_error {
      | Some(handler) => handler(&self.downstream, error),
      | None => {
        self.downstream.error(error);
        Ok(())
      },
    }
  }

  fn done(&mut self) -> Result<(), SignalError> {
    match &mut self.on_done {
      | Some(handler) => handler(&self.downstream),
      | None => {
        self.downstream.done();
        Ok(())
      },
    }
  }
}
