use std::{cell::RefCell, rc::Rc};

use crate::core::{
  hooks::{self, StoppedNotification},
  FnObserver, OperatorObserver, SignalError, Sink, Subscription, Teardown,
};

fn collecting_sink(log: &Rc<RefCell<Vec<String>>>) -> Sink<u32> {
  let values = log.clone();
  let errors = log.clone();
  let dones = log.clone();
  Sink::new(
    FnObserver::new()
      .value_fn(move |value: u32| values.borrow_mut().push(format!("value {value}")))
      .error_fn(move |error| errors.borrow_mut().push(format!("error {error}")))
      .done_fn(move || dones.borrow_mut().push("done".into())),
  )
}

#[test]
fn values_stop_reaching_the_destination_after_done() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let sink = collecting_sink(&log);

  sink.value(1);
  sink.done();
  sink.value(2);

  assert_eq!(log.borrow().as_slice(), &["value 1", "done"]);
  assert!(sink.is_stopped());
}

#[test]
fn error_stops_the_sink_and_runs_registered_teardowns() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let sink = collecting_sink(&log);
  let teardowns = log.clone();
  sink.add(Teardown::action_infallible(move || teardowns.borrow_mut().push("teardown".into()))).expect("add");

  sink.error(SignalError::msg("boom"));
  sink.value(3);

  assert_eq!(log.borrow().as_slice(), &["error boom", "teardown"]);
}

#[test]
fn unsubscribe_releases_resources_without_invoking_done() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let sink = collecting_sink(&log);
  let teardowns = log.clone();
  sink.add(Teardown::action_infallible(move || teardowns.borrow_mut().push("teardown".into()))).expect("add");

  sink.unsubscribe().expect("unsubscribe");
  sink.done();

  // Cancellation ran the teardown but the destination never saw done.
  assert_eq!(log.borrow().as_slice(), &["teardown"]);
}

#[test]
fn value_handler_failure_is_routed_to_the_error_channel() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let values = log.clone();
  let errors = log.clone();
  let sink = Sink::new(
    FnObserver::new()
      .try_value_fn(move |value: u32| {
        values.borrow_mut().push(format!("value {value}"));
        Err(SignalError::msg("handler failed"))
      })
      .error_fn(move |error| errors.borrow_mut().push(format!("error {error}"))),
  );

  sink.value(1);
  sink.value(2);

  assert_eq!(log.borrow().as_slice(), &["value 1", "error handler failed"]);
}

#[test]
fn error_without_handler_reaches_the_unhandled_hook() {
  let seen = Rc::new(RefCell::new(Vec::new()));
  let hook_log = seen.clone();
  hooks::set_unhandled_error_hook(Some(Box::new(move |error| hook_log.borrow_mut().push(error.to_string()))));

  let sink = Sink::new(FnObserver::<u32>::new());
  sink.error(SignalError::msg("nobody listening"));
  hooks::set_unhandled_error_hook(None);

  assert_eq!(seen.borrow().as_slice(), &["nobody listening".to_string()]);
}

#[test]
fn notifications_after_stop_reach_the_stopped_hook() {
  let seen = Rc::new(RefCell::new(Vec::new()));
  let hook_log = seen.clone();
  hooks::set_stopped_notification_hook(Some(Box::new(move |notification| {
    hook_log.borrow_mut().push(match notification {
      | StoppedNotification::Value => "value",
      | StoppedNotification::Error(_) => "error",
      | StoppedNotification::Done => "done",
    });
  })));

  let log = Rc::new(RefCell::new(Vec::new()));
  let sink = collecting_sink(&log);
  sink.done();
  sink.value(1);
  sink.error(SignalError::msg("late"));
  sink.done();
  hooks::set_stopped_notification_hook(None);

  assert_eq!(seen.borrow().as_slice(), &["value", "error", "done"]);
  assert_eq!(log.borrow().as_slice(), &["done"]);
}

#[test]
fn chained_sink_is_torn_down_with_its_parent() {
  let parent = Subscription::new();
  let log = Rc::new(RefCell::new(Vec::new()));
  let values = log.clone();
  let sink: Sink<u32> = Sink::chained(FnObserver::new().value_fn(move |v| values.borrow_mut().push(v)), &parent);

  parent.unsubscribe().expect("parent unsubscribe");
  assert!(sink.subscription().is_closed());
  assert!(sink.is_stopped());

  sink.value(7);
  assert!(log.borrow().is_empty());
}

#[test]
fn operator_observer_forwards_error_and_done_downstream_by_default() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let downstream = collecting_sink(&log);
  let upstream: Sink<u32> = Sink::new(OperatorObserver::new(&downstream, |sink, value: u32| {
    sink.value(value * 2);
    Ok(())
  }));

  upstream.value(4);
  upstream.done();

  assert_eq!(log.borrow().as_slice(), &["value 8", "done"]);
}
