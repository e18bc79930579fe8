use crate::core::{SignalError, Subscription};

/// Resource-release value: a one-shot closure or a child subscription.
///
/// Both forms are accepted anywhere a teardown is required; a closure is the
/// cheap case, a subscription participates in the ownership tree (it detaches
/// itself from the parent when released independently).
pub enum Teardown {
  /// One-shot release action.
  Action(Box<dyn FnOnce() -> Result<(), SignalError>>),
  /// Child subscription released together with the parent.
  Subscription(Subscription),
}

impl Teardown {
  /// Wraps a fallible release action.
  #[must_use]
  pub fn action(action: impl FnOnce() -> Result<(), SignalError> + 'static) -> Self {
    Self::Action(Box::new(action))
  }

  /// Wraps an infallible release action.
  #[must_use]
  pub fn action_infallible(action: impl FnOnce() + 'static) -> Self {
    Self::Action(Box::new(move || {
      action();
      Ok(())
    }))
  }
}

impl From<Subscription> for Teardown {
  fn from(subscription: Subscription) -> Self {
    Self::Subscription(subscription)
  }
}
