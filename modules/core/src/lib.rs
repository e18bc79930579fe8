//! strom-core-rs is a reactive-sequence runtime kernel.
//!
//! The crate provides a small kernel for composing lazily-connected,
//! push-based sequences of values over time:
//!
//! - [`core::Subscription`]: the resource-ownership tree that releases every
//!   acquired resource exactly once, aggregating teardown failures.
//! - [`core::Sink`]: the notification state machine that turns arbitrary
//!   consumer callbacks into a safe, idempotent endpoint.
//! - [`core::Sequence`]: the lazy sequence and its composition mechanism
//!   ([`core::Stage`], [`core::operate`]).
//! - [`core::SchedulerLike`]: pluggable ordering and timing of work, with a
//!   deterministic [`core::VirtualScheduler`] and a wall-clock
//!   [`std::TrampolineScheduler`].
//! - a concurrency-bounded flattening engine behind `merge_map`,
//!   `switch_map`, `exhaust_map`, and `expand`.
//!
//! The kernel is single-threaded and cooperative: all delivery and teardown
//! run synchronously on the caller's stack, and the only deferral mechanism
//! is a scheduler.
//!
//! ```
//! use std::{cell::RefCell, rc::Rc};
//!
//! use strom_core_rs::core::Sequence;
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = seen.clone();
//! let _sub = Sequence::from_iter(vec![1_u32, 2, 3])
//!   .merge_map(1, |n, _| Sequence::from_iter(vec![n, n * 10]))
//!   .subscribe(move |n| log.borrow_mut().push(n));
//! assert_eq!(seen.borrow().as_slice(), &[1, 10, 2, 20, 3, 30]);
//! ```

/// Platform-independent kernel: subscriptions, sinks, sequences, stages,
/// the virtual-time scheduler, and the flattening engine.
pub mod core;
/// Wall-clock scheduling support.
pub mod std;
