use std::{cell::RefCell, rc::Rc};

use strom_core_rs::{
  core::{FnObserver, SchedulerLike, Sequence, VirtualScheduler},
  std::TrampolineScheduler,
};

struct Recorder {
  entries: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
  fn new() -> Self {
    Self { entries: Rc::new(RefCell::new(Vec::new())) }
  }

  fn observer(&self, scheduler: &Rc<VirtualScheduler>) -> FnObserver<u64> {
    let entries = self.entries.clone();
    let frames = scheduler.clone();
    let done_entries = self.entries.clone();
    let done_frames = scheduler.clone();
    FnObserver::new()
      .value_fn(move |value| entries.borrow_mut().push(format!("value {value} at {}", frames.frame())))
      .done_fn(move || done_entries.borrow_mut().push(format!("done at {}", done_frames.frame())))
  }

  fn entries(&self) -> Vec<String> {
    self.entries.borrow().clone()
  }
}

#[test]
fn timers_merged_with_bounded_breadth_fire_in_virtual_time_order() {
  let scheduler = Rc::new(VirtualScheduler::new());
  let recorder = Recorder::new();

  // Three equal timers through two slots: the third waits for a completion
  // and therefore lands one period later.
  let timers = scheduler.clone();
  let _sub = Sequence::from_iter([0_u64, 1, 2])
    .merge_map(2, move |_, _| Sequence::timer(10, timers.clone() as Rc<dyn SchedulerLike>))
    .subscribe_observer(recorder.observer(&scheduler));

  scheduler.flush().expect("flush");
  assert_eq!(
    recorder.entries(),
    vec![
      "value 0 at 10".to_string(),
      "value 0 at 10".to_string(),
      "value 0 at 20".to_string(),
      "done at 20".to_string(),
    ]
  );
}

#[test]
fn switching_to_a_newer_timer_silences_the_older_one() {
  let scheduler = Rc::new(VirtualScheduler::new());
  let recorder = Recorder::new();

  // Outer values at frames 0 and 5, each projecting a 10-frame timer: the
  // first projection is cancelled at frame 5, so only the second fires.
  let outer_sched = scheduler.clone();
  let outer = Sequence::<u64>::new(move |sink| {
    sink.value(0);
    let fire = sink.clone();
    let handle = outer_sched.schedule(
      5,
      Box::new(move |_| {
        fire.value(1);
        fire.done();
        Ok(())
      }),
    )?;
    Ok(Some(handle.into()))
  });

  let timers = scheduler.clone();
  let _sub = outer
    .switch_map(move |_, _| Sequence::timer(10, timers.clone() as Rc<dyn SchedulerLike>))
    .subscribe_observer(recorder.observer(&scheduler));

  scheduler.flush().expect("flush");
  assert_eq!(recorder.entries(), vec!["value 0 at 15".to_string(), "done at 15".to_string()]);
}

#[test]
fn recursive_expansion_over_the_trampoline_stays_on_a_flat_stack() {
  let scheduler = Rc::new(TrampolineScheduler::new());
  let count = Rc::new(RefCell::new(0_u32));
  let seen = count.clone();
  let done = Rc::new(RefCell::new(false));
  let finished = done.clone();

  let _sub = Sequence::from_iter([0_u32])
    .expand(1, Some(scheduler as Rc<dyn SchedulerLike>), |n, _| {
      if n < 30_000 {
        Sequence::from_iter([n + 1])
      } else {
        Sequence::empty()
      }
    })
    .subscribe_observer(
      FnObserver::new()
        .value_fn(move |_| *seen.borrow_mut() += 1)
        .done_fn(move || *finished.borrow_mut() = true),
    );

  assert_eq!(*count.borrow(), 30_001);
  assert!(*done.borrow());
}
