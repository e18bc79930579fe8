use std::{
  cell::RefCell,
  cmp::Reverse,
  collections::BinaryHeap,
  rc::Rc,
  thread,
  time::{Duration, Instant},
};

use crate::core::{Action, SchedulerLike, SignalError, Subscription, Work};


struct TrampolineState {
  active:     bool,
  next_index: u64,
  queue:      BinaryHeap<Reverse<Rc<Action>>>,
}

/// Wall-clock scheduler that trampolines re-entrant scheduling.
///
/// The first `schedule` call on an idle scheduler drains the queue before
/// returning; any `schedule` call made from inside running work only pushes
/// a new queue entry, which the already-draining call picks up. Recursive
/// scheduling therefore runs iteratively at a single stack depth instead of
/// nesting. Time is in milliseconds since the scheduler was created; a
/// drained action whose due time is still ahead makes the drain sleep until
/// then.
///
/// Handles are cheap to clone and share one queue.
pub struct TrampolineScheduler {
  state: Rc<RefCell<TrampolineState>>,
  epoch: Instant,
}

impl Clone for TrampolineScheduler {
  fn clone(&self) -> Self {
    Self { state: self.state.clone(), epoch: self.epoch }
  }
}

impl TrampolineScheduler {
  /// Creates an idle scheduler with an empty queue.
  #[must_use]
  pub fn new() -> Self {
    Self {
      state: Rc::new(RefCell::new(TrampolineState { active: false, next_index: 0, queue: BinaryHeap::new() })),
      epoch: Instant::now(),
    }
  }

  fn drain(&self) -> Result<(), SignalError> {
    loop {
      let action = {
        let mut state = self.state.borrow_mut();
        match state.queue.pop() {
          | Some(Reverse(action)) => action,
          | None => return Ok(()),
        }
      };
      if action.is_cancelled() {
        continue;
      }
      let now = self.now();
      if action.due() > now {
        thread::sleep(Duration::from_millis(action.due() - now));
      }
      tracing::trace!(due = action.due(), index = action.index(), "trampoline drains action");
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

impl Default for TrampolineScheduler {
  fn default() -> Self {
    Self::new()
  }
}

impl SchedulerLike for TrampolineScheduler {
  fn now(&self) -> u64 {
    u64::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
  }

  fn schedule(&self, delay: u64, work: Work) -> Result<Subscription, SignalError> {
    let (handle, reentrant) = {
      let mut state = self.state.borrow_mut();
      let due = self.now().saturating_add(delay);
      let action = Action::new(due, state.next_index, work);
      state.next_index += 1;
      let handle = action.handle().clone();
      state.queue.push(Reverse(action));
      let reentrant = state.active;
      if !reentrant {
        state.active = true;
      }
      (handle, reentrant)
    };
    if reentrant {
      return Ok(handle);
    }
    let drained = self.drain();
    self.state.borrow_mut().active = false;
    drained?;
    Ok(handle)
  }
}
