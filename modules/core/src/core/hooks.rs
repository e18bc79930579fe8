//! Diagnostic hooks for notifications the kernel cannot deliver.
//!
//! Two situations produce out-of-band diagnostics: an error with no handler
//! left to receive it, and a notification arriving after its sink has already
//! stopped. Both default to `tracing` reports; tests (or embedders) can
//! install thread-local hooks to observe them instead.

use std::cell::RefCell;

use super::SignalError;


/// Notification that arrived after its sink had already stopped.
///
/// Double delivery is not an error, but silently discarding it hides
/// producer bugs; the kernel routes it here instead.
#[derive(Clone, Debug)]
pub enum StoppedNotification {
  /// A value notification was dropped.
  Value,
  /// An error notification was dropped.
  Error(SignalError),
  /// A done notification was dropped.
  Done,
}

/// Hook receiving errors with no remaining handler.
pub type UnhandledErrorHook = Box<dyn Fn(&SignalError)>;
/// Hook receiving notifications delivered after stop.
pub type StoppedNotificationHook = Box<dyn Fn(&StoppedNotification)>;

thread_local! {
  static UNHANDLED_ERROR_HOOK: RefCell<Option<UnhandledErrorHook>> = const { RefCell::new(None) };
  static STOPPED_NOTIFICATION_HOOK: RefCell<Option<StoppedNotificationHook>> = const { RefCell::new(None) };
}

/// Installs (or clears, with `None`) the unhandled-error hook for this thread.
pub fn set_unhandled_error_hook(hook: Option<UnhandledErrorHook>) {
  UNHANDLED_ERROR_HOOK.with(|cell| *cell.borrow_mut() = hook);
}

/// Installs (or clears, with `None`) the stopped-notification hook for this thread.
pub fn set_stopped_notification_hook(hook: Option<StoppedNotificationHook>) {
  STOPPED_NOTIFICATION_HOOK.with(|cell| *cell.borrow_mut() = hook);
}

/// Reports an error that reached the top of a sink chain with no handler.
pub fn report_unhandled_error(error: &SignalError) {
  UNHANDLED_ERROR_HOOK.with(|cell| match cell.borrow().as_ref() {
    | Some(hook) => hook(error),
    | None => tracing::error!(error = %error, "unhandled sequence error"),
  });
}

/// Reports a notification that arrived after its sink stopped.
pub fn report_stopped_notification(notification: &StoppedNotification) {
  STOPPED_NOTIFICATION_HOOK.with(|cell| match cell.borrow().as_ref() {
    | Some(hook) => hook(notification),
    | None => tracing::warn!(notification = ?notification, "notification delivered after stop"),
  });
}
