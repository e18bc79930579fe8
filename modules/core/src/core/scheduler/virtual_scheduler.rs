use std::{
  cell::RefCell,
  cmp::Reverse,
  collections::BinaryHeap,
  rc::Rc,
};

use super::{Action, SchedulerLike, Work};
use crate::core::{SignalError, Subscription};


struct VirtualState {
  frame:      u64,
  next_index: u64,
  queue:      BinaryHeap<Reverse<Rc<Action>>>,
}

/// Deterministic virtual-time scheduler.
///
/// The clock (`frame`) advances only when an action is drained, never
/// between drains, and actions with equal due frames execute in scheduling
/// order, so any time-dependent logic replays identically on every run.
/// This is the test harness for everything built on [`SchedulerLike`].
///
/// Handles are cheap to clone and share one queue.
pub struct VirtualScheduler {
  state: Rc<RefCell<VirtualState>>,
}

impl Clone for VirtualScheduler {
  fn clone(&self) -> Self {
    Self { state: self.state.clone() }
  }
}

impl VirtualScheduler {
  /// Creates a scheduler at frame zero with an empty queue.
  #[must_use]
  pub fn new() -> Self {
    Self { state: Rc::new(RefCell::new(VirtualState { frame: 0, next_index: 0, queue: BinaryHeap::new() })) }
  }

  /// Current virtual frame.
  #[must_use]
  pub fn frame(&self) -> u64 {
    self.state.borrow().frame
  }

  /// Drains every queued action, advancing the frame to each action's due
  /// frame as it runs.
  ///
  /// # Errors
  ///
  /// Returns the failure of the action that aborted the drain; the rest of
  /// the queue is disposed (not executed) first.
  pub fn flush(&self) -> Result<(), SignalError> {
    self.flush_to(u64::MAX)
  }

  /// Drains queued actions due at or before `max_frame`.
  ///
  /// # Errors
  ///
  /// See [`VirtualScheduler::flush`].
  pub fn flush_to(&self, max_frame: u64) -> Result<(), SignalError> {
    loop {
      let action = {
        let mut state = self.state.borrow_mut();
        let within = matches!(state.queue.peek(), Some(Reverse(action)) if action.due() <= max_frame);
        if within {
          state.queue.pop().map(|Reverse(action)| action)
        } else {
          None
        }
      };
      let Some(action) = action else {
        return Ok(());
      };
      if action.is_cancelled() {
        continue;
      }
      self.state.borrow_mut().frame = action.due();
      tracing::trace!(frame = action.due(), index = action.index(), "virtual scheduler drains action");
      if let Err(error) = action.execute(self) {
        self.dispose_pending();
        return Err(error);
      }
    }
  }

  fn dispose_pending(&self) {
    let drained: Vec<Rc<Action>> = {
      let mut state = self.state.borrow_mut();
      state.queue.drain().map(|Reverse(action)| action).collect()
    };
    for action in drained {
      action.dispose();
    }
  }
}

impl Default for VirtualScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl SchedulerLike for VirtualScheduler {
  fn now(&self) -> u64 {
    self.frame()
  }

  fn schedule(&self, delay: u64, work: Work) -> Result<Subscription, SignalError> {
    let mut state = self.state.borrow_mut();
    let due = state.frame.saturating_add(delay);
    let action = Action::new(due, state.next_index, work);
    state.next_index += 1;
    let handle = action.handle().clone();
    state.queue.push(Reverse(action));
    Ok(handle)
  }
}
