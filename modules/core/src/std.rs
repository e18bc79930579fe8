//! Wall-clock scheduling on top of `std`.

mod trampoline_scheduler;

pub use trampoline_scheduler::TrampolineScheduler;
