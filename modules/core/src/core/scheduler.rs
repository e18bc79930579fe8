/// Unit of work queued on a scheduler.
mod action;
/// Scheduler capability.
mod scheduler_like;
/// Deterministic virtual-time scheduler.
mod virtual_scheduler;

pub use action::Action;
pub use scheduler_like::{SchedulerLike, Work};
pub use virtual_scheduler::VirtualScheduler;
