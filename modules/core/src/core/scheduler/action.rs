use std::{cell::RefCell, cmp::Ordering, rc::Rc};

use super::{SchedulerLike, Work};
use crate::core::{hooks, SignalError, Subscription};

/// One queued, cancellable unit of work plus its ordering data.
///
/// Records are immutable after creation (the work closure is consumed on
/// execution); rescheduling allocates a fresh record. Ordering is by
/// `(due, index)`, the index being a per-scheduler monotonic counter that
/// keeps equal-delay actions in insertion order.
pub struct Action {
  due:    u64,
  index:  u64,
  work:   RefCell<Option<Work>>,
  handle: Subscription,
}

impl Action {
  pub(crate) fn new(due: u64, index: u64, work: Work) -> Rc<Self> {
    Rc::new(Self { due, index, work: RefCell::new(Some(work)), handle: Subscription::new() })
  }

  /// Due time in the owning scheduler's unit.
  #[must_use]
  pub fn due(&self) -> u64 {
    self.due
  }

  /// Insertion index within the owning scheduler.
  #[must_use]
  pub fn index(&self) -> u64 {
    self.index
  }

  /// Borrows the cancellation handle.
  #[must_use]
  pub fn handle(&self) -> &Subscription {
    &self.handle
  }

  /// Returns true once the action has been cancelled.
  #[must_use]
  pub fn is_cancelled(&self) -> bool {
    self.handle.is_closed()
  }

  /// Runs the work, once, then closes the cancellation handle so parked
  /// copies of it drop out of their subscription trees. Cancelled or
  /// already-executed actions are no-ops.
  pub(crate) fn execute(&self, scheduler: &dyn SchedulerLike) -> Result<(), SignalError> {
    if self.handle.is_closed() {
      return Ok(());
    }
    let work = self.work.borrow_mut().take();
    let result = match work {
      | Some(work) => work(scheduler),
      | None => Ok(()),
    };
    if let Err(failure) = self.handle.unsubscribe() {
      hooks::report_unhandled_error(&SignalError::from(failure));
    }
    result
  }

  /// Disposes the action without executing it: drops the work and releases
  /// the cancellation handle's resources.
  pub(crate) fn dispose(&self) {
    self.work.borrow_mut().take();
    if let Err(failure) = self.handle.unsubscribe() {
      hooks::report_unhandled_error(&SignalError::from(failure));
    }
  }
}

impl PartialEq for Action {
  fn eq(&self, other: &Self) -> bool {
    self.due == other.due && self.index == other.index
  }
}

impl Eq for Action {}

impl PartialOrd for Action {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Action {
  fn cmp(&self, other: &Self) -> Ordering {
    self.due.cmp(&other.due).then(self.index.cmp(&other.index))
  }
}
