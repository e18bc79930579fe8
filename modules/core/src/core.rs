/// Error definitions.
mod error;
/// Concurrency-bounded flattening engine and its operator faces.
mod flatten;
/// Diagnostic hooks for unhandled errors and post-stop notifications.
pub mod hooks;
/// Observer capability set.
mod observer;
/// Scheduler abstraction, unit of work, and the virtual-time scheduler.
mod scheduler;
/// Lazy sequence and base producers.
mod sequence;
/// Notification sink state machine.
mod sink;
/// Stage composition helpers.
mod stage;
/// Resource-ownership tree.
mod subscription;

pub use error::{SignalError, UnsubscribeError};
pub use flatten::{exhaust_map, expand, merge_map, switch_map};
pub use hooks::StoppedNotification;
pub use observer::{FnObserver, Observer};
pub use scheduler::{Action, SchedulerLike, VirtualScheduler, Work};
pub use sequence::Sequence;
pub use sink::{OperatorObserver, Sink};
pub use stage::{operate, Stage};
pub use subscription::{Subscription, Teardown, TeardownKey};
