use std::{error::Error as StdError, fmt, sync::Arc};


/// Cheap-clone error value carried on the error channel of a sequence.
///
/// One failure instance typically traverses several sinks (every stage
/// between the producer and the consumer sees it), so the payload is shared
/// rather than copied. Arbitrary failure payloads are accepted through
/// [`anyhow::Error`].
#[derive(Clone)]
pub struct SignalError {
  inner: Arc<anyhow::Error>,
}

impl SignalError {
  /// Wraps an open-ended error payload.
  #[must_use]
  pub fn new(error: anyhow::Error) -> Self {
    Self { inner: Arc::new(error) }
  }

  /// Builds an error from a plain message.
  #[must_use]
  pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
    Self::new(anyhow::Error::msg(message))
  }

  /// Wraps a typed error value.
  #[must_use]
  pub fn from_error(error: impl StdError + Send + Sync + 'static) -> Self {
    Self::new(anyhow::Error::new(error))
  }

  /// Borrows the underlying payload.
  #[must_use]
  pub fn inner(&self) -> &anyhow::Error {
    &self.inner
  }
}

impl fmt::Debug for SignalError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Debug::fmt(&self.inner, f)
  }
}

impl fmt::Display for SignalError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Display::fmt(&self.inner, f)
  }
}

impl From<anyhow::Error> for SignalError {
  fn from(error: anyhow::Error) -> Self {
    Self::new(error)
  }
}

impl From<UnsubscribeError> for SignalError {
  fn from(error: UnsubscribeError) -> Self {
    Self::new(anyhow::Error::new(error))
  }
}

/// Aggregate of every teardown failure raised during one unsubscribe pass.
///
/// A failing teardown never prevents its siblings from running; all failures
/// are collected and surfaced together once the pass has completed.
#[derive(Debug, thiserror::Error)]
#[error("one or more teardown actions failed during unsubscribe")]
pub struct UnsubscribeError {
  errors: Vec<SignalError>,
}

impl UnsubscribeError {
  /// Builds an aggregate from the collected failures.
  #[must_use]
  pub fn new(errors: Vec<SignalError>) -> Self {
    Self { errors }
  }

  /// Borrows the collected failures in the order they were raised.
  #[must_use]
  pub fn errors(&self) -> &[SignalError] {
    &self.errors
  }

  /// Consumes the aggregate, yielding the collected failures.
  #[must_use]
  pub fn into_errors(self) -> Vec<SignalError> {
    self.errors
  }
}
