use crate::core::{SignalError, Subscription};

/// One scheduled unit of work.
///
/// Receives the scheduler it runs on, so work may schedule follow-up work
/// (each follow-up is a fresh queue entry, never a nested call). State
/// travels in the closure's captured environment.
pub type Work = Box<dyn FnOnce(&dyn SchedulerLike) -> Result<(), SignalError>>;

/// Capability over "when does this run".
///
/// Time values are in the scheduler's own unit: wall-clock milliseconds for
/// real schedulers, frames for virtual ones. Scheduling is the kernel's only
/// deferral mechanism; everything else runs synchronously on the caller's
/// stack.
pub trait SchedulerLike {
  /// Current time in the scheduler's own unit.
  fn now(&self) -> u64;

  /// Queues `work` to run after `delay` units, returning a cancellation
  /// handle. Queue order is by `(delay, insertion index)`, stable for equal
  /// delays.
  ///
  /// # Errors
  ///
  /// Returns the failure of an action executed while draining the queue on
  /// behalf of this call (trampolining schedulers drain inline).
  fn schedule(&self, delay: u64, work: Work) -> Result<Subscription, SignalError>;
}
