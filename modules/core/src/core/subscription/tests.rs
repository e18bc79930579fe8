use std::{cell::RefCell, rc::Rc};

use crate::core::{SignalError, Subscription, Teardown};

fn log_action(log: &Rc<RefCell<Vec<&'static str>>>, label: &'static str) -> Teardown {
  let log = log.clone();
  Teardown::action_infallible(move || log.borrow_mut().push(label))
}

#[test]
fn unsubscribe_runs_teardowns_in_registration_order() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let subscription = Subscription::with_action({
    let log = log.clone();
    move || {
      log.borrow_mut().push("initial");
      Ok(())
    }
  });
  subscription.add(log_action(&log, "first")).expect("add");
  subscription.add(log_action(&log, "second")).expect("add");

  subscription.unsubscribe().expect("unsubscribe");
  assert_eq!(log.borrow().as_slice(), &["initial", "first", "second"]);
}

#[test]
fn unsubscribe_is_idempotent() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let subscription = Subscription::new();
  subscription.add(log_action(&log, "once")).expect("add");

  subscription.unsubscribe().expect("first unsubscribe");
  subscription.unsubscribe().expect("second unsubscribe");
  assert!(subscription.is_closed());
  assert_eq!(log.borrow().as_slice(), &["once"]);
}

#[test]
fn add_on_closed_node_runs_teardown_immediately() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let subscription = Subscription::new();
  subscription.unsubscribe().expect("unsubscribe");

  subscription.add(log_action(&log, "late")).expect("add on closed");
  assert_eq!(log.borrow().as_slice(), &["late"]);
}

#[test]
fn add_on_closed_node_surfaces_immediate_failure() {
  let subscription = Subscription::closed();
  let result = subscription.add(Teardown::action(|| Err(SignalError::msg("late failure"))));
  assert_eq!(result.unwrap_err().to_string(), "late failure");
}

#[test]
fn remove_prevents_a_registered_teardown_from_running() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let subscription = Subscription::new();
  let key = subscription.add(log_action(&log, "removed")).expect("add");
  subscription.add(log_action(&log, "kept")).expect("add");

  subscription.remove(key);
  subscription.unsubscribe().expect("unsubscribe");
  assert_eq!(log.borrow().as_slice(), &["kept"]);
}

#[test]
fn failing_teardown_does_not_skip_siblings_and_both_errors_are_aggregated() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let subscription = Subscription::new();
  subscription.add(Teardown::action(|| Err(SignalError::msg("error a")))).expect("add");
  subscription.add(log_action(&log, "sibling ran")).expect("add");
  subscription.add(Teardown::action(|| Err(SignalError::msg("error b")))).expect("add");

  let aggregate = subscription.unsubscribe().unwrap_err();
  let messages: Vec<_> = aggregate.errors().iter().map(ToString::to_string).collect();
  assert_eq!(messages, vec!["error a", "error b"]);
  assert_eq!(log.borrow().as_slice(), &["sibling ran"]);
}

#[test]
fn child_errors_are_flattened_into_the_parent_aggregate() {
  let parent = Subscription::new();
  let child = Subscription::with_action(|| Err(SignalError::msg("child failure")));
  parent.add(Teardown::from(child)).expect("add child");

  let aggregate = parent.unsubscribe().unwrap_err();
  assert_eq!(aggregate.errors().len(), 1);
  assert_eq!(aggregate.errors()[0].to_string(), "child failure");
}

#[test]
fn independently_unsubscribed_child_detaches_from_its_parent() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let parent = Subscription::new();
  let child = Subscription::new();
  child.add(log_action(&log, "child")).expect("add");
  parent.add(Teardown::from(child.clone())).expect("add child");

  child.unsubscribe().expect("child unsubscribe");
  parent.unsubscribe().expect("parent unsubscribe");

  // The child ran once, through its own unsubscribe only.
  assert_eq!(log.borrow().as_slice(), &["child"]);
}

#[test]
fn child_shared_by_two_parents_is_torn_down_exactly_once() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let first = Subscription::new();
  let second = Subscription::new();
  let child = Subscription::new();
  child.add(log_action(&log, "shared child")).expect("add");
  first.add(Teardown::from(child.clone())).expect("add");
  second.add(Teardown::from(child)).expect("add");

  first.unsubscribe().expect("first parent");
  second.unsubscribe().expect("second parent");
  assert_eq!(log.borrow().as_slice(), &["shared child"]);
}

#[test]
fn adding_a_node_to_itself_is_a_no_op() {
  let subscription = Subscription::new();
  subscription.add(Teardown::from(subscription.clone())).expect("self add");
  subscription.unsubscribe().expect("unsubscribe");
}

#[test]
fn adding_an_already_closed_child_is_a_no_op() {
  let parent = Subscription::new();
  let child = Subscription::closed();
  parent.add(Teardown::from(child)).expect("add closed child");
  parent.unsubscribe().expect("unsubscribe");
}

#[test]
fn debug_output_reports_the_closed_state() {
  let subscription = Subscription::new();
  assert!(format!("{subscription:?}").contains("closed: false"));
  subscription.unsubscribe().expect("unsubscribe");
  assert!(format!("{subscription:?}").contains("closed: true"));
}

#[test]
fn reentrant_unsubscribe_from_a_teardown_is_safe() {
  let log = Rc::new(RefCell::new(Vec::new()));
  let subscription = Subscription::new();
  subscription
    .add(Teardown::action_infallible({
      let log = log.clone();
      let reentrant = subscription.clone();
      move || {
        let _ = reentrant.unsubscribe();
        log.borrow_mut().push("reentrant");
      }
    }))
    .expect("add");
  subscription.add(log_action(&log, "after")).expect("add");

  subscription.unsubscribe().expect("unsubscribe");
  assert_eq!(log.borrow().as_slice(), &["reentrant", "after"]);
}
