use std::{
  cell::RefCell,
  fmt, mem,
  rc::{Rc, Weak},
};

use super::{SignalError, UnsubscribeError};

/// Teardown value accepted by [`Subscription::add`].
mod teardown;

#[cfg(test)]
mod tests;

pub use teardown::Teardown;

/// Key identifying one registered teardown, for later removal.
///
/// Closures have no identity of their own, so `add` issues a key instead of
/// comparing values on `remove`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TeardownKey(u64);

impl TeardownKey {
  /// Key returned when nothing was stored (`add` on a closed node, self-add).
  /// Removing it is a no-op.
  pub const NOOP: TeardownKey = TeardownKey(0);
}

struct SubscriptionState {
  closed:   bool,
  initial:  Option<Box<dyn FnOnce() -> Result<(), SignalError>>>,
  entries:  Vec<(TeardownKey, Teardown)>,
  parents:  Vec<Weak<RefCell<SubscriptionState>>>,
  next_key: u64,
}

impl SubscriptionState {
  fn new(initial: Option<Box<dyn FnOnce() -> Result<(), SignalError>>>, closed: bool) -> Self {
    Self { closed, initial, entries: Vec::new(), parents: Vec::new(), next_key: 1 }
  }
}

/// Node of the resource-ownership tree.
///
/// A subscription owns an optional construction-time teardown action plus an
/// ordered list of registered teardowns (closures or child subscriptions).
/// Unsubscribing is idempotent: the node detaches itself from every parent,
/// runs each teardown exactly once in registration order, and aggregates all
/// failures without letting one failing teardown skip its siblings.
///
/// Handles are cheap to clone and share one node.
pub struct Subscription {
  state: Rc<RefCell<SubscriptionState>>,
}

impl Clone for Subscription {
  fn clone(&self) -> Self {
    Self { state: self.state.clone() }
  }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription").field("closed", &self.is_closed()).finish_non_exhaustive()
  }
}

impl Subscription {
  /// Creates an open subscription with no teardown.
  #[must_use]
  pub fn new() -> Self {
    Self { state: Rc::new(RefCell::new(SubscriptionState::new(None, false))) }
  }

  /// Creates an open subscription whose construction-time action runs first
  /// on unsubscribe.
  #[must_use]
  pub fn with_action(action: impl FnOnce() -> Result<(), SignalError> + 'static) -> Self {
    Self { state: Rc::new(RefCell::new(SubscriptionState::new(Some(Box::new(action)), false))) }
  }

  /// Creates an already-closed subscription.
  #[must_use]
  pub fn closed() -> Self {
    Self { state: Rc::new(RefCell::new(SubscriptionState::new(None, true))) }
  }

  /// Returns true once the node has been unsubscribed.
  #[must_use]
  pub fn is_closed(&self) -> bool {
    self.state.borrow().closed
  }

  /// Returns true when both handles share one node.
  #[must_use]
  pub fn ptr_eq(&self, other: &Subscription) -> bool {
    Rc::ptr_eq(&self.state, &other.state)
  }

  /// Registers a teardown to run on unsubscribe.
  ///
  /// On a closed node the teardown runs immediately instead of being stored,
  /// so no teardown is ever silently dropped. Adding the node to itself, or
  /// adding an already-closed child subscription, is a no-op.
  ///
  /// # Errors
  ///
  /// Returns the failure of a teardown that had to run immediately.
  pub fn add(&self, teardown: Teardown) -> Result<TeardownKey, SignalError> {
    if let Teardown::Subscription(child) = &teardown {
      if child.ptr_eq(self) || child.is_closed() {
        return Ok(TeardownKey::NOOP);
      }
    }
    if self.is_closed() {
      return match teardown {
        | Teardown::Action(action) => action().map(|()| TeardownKey::NOOP),
        | Teardown::Subscription(child) => child.unsubscribe().map(|()| TeardownKey::NOOP).map_err(SignalError::from),
      };
    }
    if let Teardown::Subscription(child) = &teardown {
      child.push_parent(self);
    }
    let mut state = self.state.borrow_mut();
    let key = TeardownKey(state.next_key);
    state.next_key += 1;
    state.entries.push((key, teardown));
    Ok(key)
  }

  /// Removes a previously registered teardown without running it.
  pub fn remove(&self, key: TeardownKey) {
    let removed = {
      let mut state = self.state.borrow_mut();
      match state.entries.iter().position(|(entry_key, _)| *entry_key == key) {
        | Some(position) => Some(state.entries.remove(position).1),
        | None => None,
      }
    };
    if let Some(Teardown::Subscription(child)) = removed {
      child.remove_parent(self);
    }
  }

  /// Releases the node: detaches it from every parent, runs the
  /// construction-time action and every registered teardown in order, and
  /// aggregates failures. Idempotent: a second call is a no-op.
  ///
  /// # Errors
  ///
  /// Returns every teardown failure raised during this pass, in order.
  pub fn unsubscribe(&self) -> Result<(), UnsubscribeError> {
    let (initial, entries, parents) = {
      let mut state = self.state.borrow_mut();
      if state.closed {
        return Ok(());
      }
      state.closed = true;
      (state.initial.take(), mem::take(&mut state.entries), mem::take(&mut state.parents))
    };

    // Detach before running teardowns so a parent disposed through another
    // path cannot re-enter this node.
    for parent in parents {
      if let Some(parent_state) = parent.upgrade() {
        Subscription { state: parent_state }.remove_child_entry(self);
      }
    }

    let mut errors = Vec::new();
    if let Some(action) = initial {
      if let Err(error) = action() {
        errors.push(error);
      }
    }
    for (_, teardown) in entries {
      match teardown {
        | Teardown::Action(action) => {
          if let Err(error) = action() {
            errors.push(error);
          }
        },
        | Teardown::Subscription(child) => {
          if let Err(error) = child.unsubscribe() {
            errors.extend(error.into_errors());
          }
        },
      }
    }

    if errors.is_empty() {
      Ok(())
    } else {
      tracing::warn!(failures = errors.len(), "teardown failures during unsubscribe");
      Err(UnsubscribeError::new(errors))
    }
  }

  fn push_parent(&self, parent: &Subscription) {
    self.state.borrow_mut().parents.push(Rc::downgrade(&parent.state));
  }

  fn remove_parent(&self, parent: &Subscription) {
    let parent_ptr = Rc::as_ptr(&parent.state);
    self.state.borrow_mut().parents.retain(|candidate| candidate.as_ptr() != parent_ptr);
  }

  fn remove_child_entry(&self, child: &Subscription) {
    let mut state = self.state.borrow_mut();
    state
      .entries
      .retain(|(_, teardown)| !matches!(teardown, Teardown::Subscription(entry) if entry.ptr_eq(child)));
  }
}

impl Default for Subscription {
  fn default() -> Self {
    Self::new()
  }
}
