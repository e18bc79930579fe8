use std::{cell::RefCell, collections::VecDeque, rc::Rc};

use super::{
  hooks, operate, OperatorObserver, SchedulerLike, Sequence, SignalError, Sink, Subscription, Teardown,
};


/// What to do with an outer value that arrives while `breadth` inner
/// connections are already running.
pub(crate) enum BusyPolicy {
  /// Buffer it and start it when a slot frees up.
  Enqueue,
  /// Discard it.
  DropNewest,
  /// Cancel the longest-running inner connection and start it now.
  CancelOldest,
}

type EmitFn<A, B> = Box<dyn FnMut(&Sink<B>, &A)>;
type FeedbackFn<A, B> = Box<dyn FnMut(B) -> A>;

/// How inner values relate to outer values.
pub(crate) enum FlattenKind<A, B> {
  /// Inner values flow straight downstream.
  Merge,
  /// Recursive mode: each outer value is emitted downstream before being
  /// projected, and each inner value is fed back in as a new outer value.
  Expand {
    emit:     RefCell<EmitFn<A, B>>,
    feedback: RefCell<FeedbackFn<A, B>>,
  },
}

struct FlattenState<A> {
  active:     usize,
  buffer:     VecDeque<A>,
  index:      usize,
  outer_done: bool,
  inners:     VecDeque<Subscription>,
}

/// Shared engine behind every flattening operator. One context per
/// connection; outer and inner observers hold it through an `Rc`.
struct FlattenCtx<A, B> {
  sink:    Sink<B>,
  project: Rc<RefCell<dyn FnMut(A, usize) -> Sequence<B>>>,
  breadth: usize,
  policy:  BusyPolicy,
  kind:    FlattenKind<A, B>,
  stagger: Option<Rc<dyn SchedulerLike>>,
  state:   RefCell<FlattenState<A>>,
}

fn outer_value<A: 'static, B: 'static>(ctx: &Rc<FlattenCtx<A, B>>, value: A) {
  enum Decision<A> {
    Start(A),
    Parked,
    Cancel(Subscription, A),
  }
  // Decide under the borrow, act after releasing it: cancellation and inner
  // connection both re-enter this state.
  let decision = {
    let mut state = ctx.state.borrow_mut();
    if state.active < ctx.breadth {
      Decision::Start(value)
    } else {
      match ctx.policy {
        | BusyPolicy::Enqueue => {
          state.buffer.push_back(value);
          tracing::trace!(buffered = state.buffer.len(), active = state.active, "outer value buffered");
          Decision::Parked
        },
        | BusyPolicy::DropNewest => Decision::Parked,
        | BusyPolicy::CancelOldest => match state.inners.pop_front() {
          | Some(oldest) => {
            // The cancelled inner never fires done, so its slot is freed here.
            state.active -= 1;
            Decision::Cancel(oldest, value)
          },
          | None => Decision::Start(value),
        },
      }
    }
  };
  match decision {
    | Decision::Start(value) => do_inner_sub(ctx, value),
    | Decision::Cancel(oldest, value) => {
      if let Err(failure) = oldest.unsubscribe() {
        hooks::report_unhandled_error(&SignalError::from(failure));
      }
      do_inner_sub(ctx, value);
    },
    | Decision::Parked => {},
  }
}

fn do_inner_sub<A: 'static, B: 'static>(ctx: &Rc<FlattenCtx<A, B>>, value: A) {
  ctx.state.borrow_mut().active += 1;
  start_inner(ctx, value);
}

/// Connects the projection of `value`. The concurrency slot is already
/// reserved, so a start deferred through the stagger scheduler still counts
/// against `breadth` (and keeps completion back) while it waits in the
/// scheduler queue.
fn start_inner<A: 'static, B: 'static>(ctx: &Rc<FlattenCtx<A, B>>, value: A) {
  if let FlattenKind::Expand { emit, .. } = &ctx.kind {
    (emit.borrow_mut())(&ctx.sink, &value);
    if ctx.sink.is_stopped() {
      ctx.state.borrow_mut().active -= 1;
      return;
    }
  }
  let index = {
    let mut state = ctx.state.borrow_mut();
    let index = state.index;
    state.index += 1;
    index
  };
  let inner = (ctx.project.borrow_mut())(value, index);

  // The done handler needs the inner sink's own subscription to drop it
  // from the registry; the slot is filled before connect can fire anything.
  let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
  let inner_sink = Sink::chained(
    OperatorObserver::new(&ctx.sink, {
      let ctx = Rc::clone(ctx);
      move |downstream: &Sink<B>, inner_value: B| {
        match &ctx.kind {
          | FlattenKind::Merge => downstream.value(inner_value),
          | FlattenKind::Expand { feedback, .. } => {
            let next = (feedback.borrow_mut())(inner_value);
            outer_value(&ctx, next);
          },
        }
        Ok(())
      }
    })
    .done_fn({
      let ctx = Rc::clone(ctx);
      let slot = Rc::clone(&slot);
      move |_| {
        let finished = slot.borrow().clone();
        inner_complete(&ctx, finished.as_ref());
        Ok(())
      }
    }),
    ctx.sink.subscription(),
  );
  *slot.borrow_mut() = Some(inner_sink.subscription().clone());
  ctx.state.borrow_mut().inners.push_back(inner_sink.subscription().clone());
  inner.connect(&inner_sink);
}

fn inner_complete<A: 'static, B: 'static>(ctx: &Rc<FlattenCtx<A, B>>, finished: Option<&Subscription>) {
  {
    let mut state = ctx.state.borrow_mut();
    state.active -= 1;
    if let Some(finished) = finished {
      state.inners.retain(|sub| !sub.ptr_eq(finished));
    }
  }
  drain(ctx);
  check_done(ctx);
}

/// Starts buffered outer values while slots are free. With a stagger
/// scheduler, at most one buffered start is queued per inner completion,
/// which keeps deep recursive expansion off the call stack.
fn drain<A: 'static, B: 'static>(ctx: &Rc<FlattenCtx<A, B>>) {
  loop {
    let next = {
      let mut state = ctx.state.borrow_mut();
      if state.active < ctx.breadth {
        state.buffer.pop_front()
      } else {
        None
      }
    };
    let Some(value) = next else {
      return;
    };
    match &ctx.stagger {
      | Some(scheduler) => {
        ctx.state.borrow_mut().active += 1;
        tracing::trace!("buffered start handed to the stagger scheduler");
        let deferred = Rc::clone(ctx);
        match scheduler.schedule(
          0,
          Box::new(move |_| {
            start_inner(&deferred, value);
            Ok(())
          }),
        ) {
          | Ok(handle) => {
            if let Err(error) = ctx.sink.add(Teardown::from(handle)) {
              hooks::report_unhandled_error(&error);
            }
          },
          | Err(error) => ctx.sink.error(error),
        }
        return;
      },
      | None => do_inner_sub(ctx, value),
    }
  }
}

fn check_done<A, B: 'static>(ctx: &FlattenCtx<A, B>) {
  if ctx.sink.is_stopped() {
    return;
  }
  let finished = {
    let state = ctx.state.borrow();
    state.outer_done && state.active == 0 && state.buffer.is_empty()
  };
  if finished {
    ctx.sink.done();
  }
}

/// Connects `upstream` through the flattening engine into `sink`.
///
/// Completion requires both the outer connection and every inner connection
/// (buffered values included) to have finished. Any error, outer or inner,
/// goes straight downstream, which tears every live connection down.
pub(crate) fn flatten_into<A: 'static, B: 'static>(
  upstream: &Sequence<A>,
  sink: &Sink<B>,
  project: impl FnMut(A, usize) -> Sequence<B> + 'static,
  breadth: usize,
  policy: BusyPolicy,
  kind: FlattenKind<A, B>,
  stagger: Option<Rc<dyn SchedulerLike>>,
) -> Result<Option<Teardown>, SignalError> {
  let project: Rc<RefCell<dyn FnMut(A, usize) -> Sequence<B>>> = Rc::new(RefCell::new(project));
  let ctx = Rc::new(FlattenCtx {
    sink: sink.clone(),
    project,
    breadth,
    policy,
    kind,
    stagger,
    state: RefCell::new(FlattenState {
      active:     0,
      buffer:     VecDeque::new(),
      index:      0,
      outer_done: false,
      inners:     VecDeque::new(),
    }),
  });
  let outer = Sink::chained(
    OperatorObserver::new(sink, {
      let ctx = Rc::clone(&ctx);
      move |_: &Sink<B>, value: A| {
        outer_value(&ctx, value);
        Ok(())
      }
    })
    .done_fn({
      let ctx = Rc::clone(&ctx);
      move |_| {
        ctx.state.borrow_mut().outer_done = true;
        check_done(&ctx);
        Ok(())
      }
    }),
    sink.subscription(),
  );
  upstream.connect(&outer);
  Ok(None)
}

/// Stage projecting each value into a sequence and merging up to `breadth`
/// of them concurrently; excess outer values wait in arrival order.
///
/// # Panics
///
/// Panics if `breadth` is zero.
pub fn merge_map<A, B, F>(breadth: usize, project: F) -> impl Fn(Sequence<A>) -> Sequence<B>
where
  A: 'static,
  B: 'static,
  F: FnMut(A, usize) -> Sequence<B> + Clone + 'static, {
  assert!(breadth > 0, "breadth must be greater than zero");
  operate(move |upstream, sink| {
    flatten_into(upstream, sink, project.clone(), breadth, BusyPolicy::Enqueue, FlattenKind::Merge, None)
  })
}

/// Stage keeping only the most recent projection: a new outer value cancels
/// the inner connection still running.
pub fn switch_map<A, B, F>(project: F) -> impl Fn(Sequence<A>) -> Sequence<B>
where
  A: 'static,
  B: 'static,
  F: FnMut(A, usize) -> Sequence<B> + Clone + 'static, {
  operate(move |upstream, sink| {
    flatten_into(upstream, sink, project.clone(), 1, BusyPolicy::CancelOldest, FlattenKind::Merge, None)
  })
}

/// Stage keeping only the first projection: outer values arriving while an
/// inner connection runs are discarded.
pub fn exhaust_map<A, B, F>(project: F) -> impl Fn(Sequence<A>) -> Sequence<B>
where
  A: 'static,
  B: 'static,
  F: FnMut(A, usize) -> Sequence<B> + Clone + 'static, {
  operate(move |upstream, sink| {
    flatten_into(upstream, sink, project.clone(), 1, BusyPolicy::DropNewest, FlattenKind::Merge, None)
  })
}

/// Stage emitting every value and recursively projecting each one, up to
/// `breadth` projections at a time. A stagger scheduler moves buffered
/// starts onto its queue, bounding stack depth for deep recursions.
///
/// # Panics
///
/// Panics if `breadth` is zero.
pub fn expand<T, F>(
  breadth: usize,
  stagger: Option<Rc<dyn SchedulerLike>>,
  project: F,
) -> impl Fn(Sequence<T>) -> Sequence<T>
where
  T: Clone + 'static,
  F: FnMut(T, usize) -> Sequence<T> + Clone + 'static, {
  assert!(breadth > 0, "breadth must be greater than zero");
  operate(move |upstream, sink| {
    flatten_into(
      upstream,
      sink,
      project.clone(),
      breadth,
      BusyPolicy::Enqueue,
      FlattenKind::Expand {
        emit:     RefCell::new(Box::new(|sink: &Sink<T>, value: &T| sink.value(value.clone()))),
        feedback: RefCell::new(Box::new(|value: T| value)),
      },
      stagger.clone(),
    )
  })
}

impl<T: 'static> Sequence<T> {
  /// See [`merge_map`].
  #[must_use]
  pub fn merge_map<B: 'static>(
    &self,
    breadth: usize,
    project: impl FnMut(T, usize) -> Sequence<B> + Clone + 'static,
  ) -> Sequence<B> {
    self.pipe(merge_map(breadth, project))
  }

  /// See [`switch_map`].
  #[must_use]
  pub fn switch_map<B: 'static>(&self, project: impl FnMut(T, usize) -> Sequence<B> + Clone + 'static) -> Sequence<B> {
    self.pipe(switch_map(project))
  }

  /// See [`exhaust_map`].
  #[must_use]
  pub fn exhaust_map<B: 'static>(&self, project: impl FnMut(T, usize) -> Sequence<B> + Clone + 'static) -> Sequence<B> {
    self.pipe(exhaust_map(project))
  }
}

impl<T: Clone + 'static> Sequence<T> {
  /// See [`expand`].
  #[must_use]
  pub fn expand(
    &self,
    breadth: usize,
    stagger: Option<Rc<dyn SchedulerLike>>,
    project: impl FnMut(T, usize) -> Sequence<T> + Clone + 'static,
  ) -> Sequence<T> {
    self.pipe(expand(breadth, stagger, project))
  }
}
