use std::rc::Rc;

use super::{Sequence, SignalError, Sink, Teardown};


/// Composable transformation from one sequence to another.
///
/// A stage must be referentially transparent: applying it builds a new
/// immutable sequence descriptor and must be safe to repeat. Any
/// `Fn(Sequence<A>) -> Sequence<B>` is a stage.
pub trait Stage<A, B> {
  /// Applies the stage to an upstream sequence.
  fn apply(&self, upstream: Sequence<A>) -> Sequence<B>;
}

impl<A, B, F> Stage<A, B> for F
where
  F: Fn(Sequence<A>) -> Sequence<B>,
{
  fn apply(&self, upstream: Sequence<A>) -> Sequence<B> {
    self(upstream)
  }
}

/// Builds a stage from a connection callback.
///
/// `init` runs once per connection with the upstream sequence and the
/// downstream sink; it typically wraps the sink and connects the wrapper to
/// the upstream, returning an optional extra finalizer. An `Err` raised by
/// `init` is routed to the downstream sink's error channel, which is what
/// lets stages chain freely without each one carrying its own error
/// plumbing.
pub fn operate<A, B, F>(init: F) -> impl Fn(Sequence<A>) -> Sequence<B>
where
  A: 'static,
  B: 'static,
  F: Fn(&Sequence<A>, &Sink<B>) -> Result<Option<Teardown>, SignalError> + 'static, {
  let init = Rc::new(init);
  move |upstream: Sequence<A>| {
    let init = Rc::clone(&init);
    Sequence::new(move |sink| init(&upstream, &sink))
  }
}
