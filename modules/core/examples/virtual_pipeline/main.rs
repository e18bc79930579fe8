//! Pipeline demo: timers flattened with bounded breadth over virtual time.

use std::rc::Rc;

use strom_core_rs::core::{FnObserver, SchedulerLike, Sequence, VirtualScheduler};

fn main() {
  tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

  let scheduler = Rc::new(VirtualScheduler::new());

  // Five requests, each taking 10 virtual frames, through two slots.
  let timers = scheduler.clone();
  let frames = scheduler.clone();
  let done_frames = scheduler.clone();
  let _sub = Sequence::from_iter(1_u64..=5)
    .merge_map(2, move |request, _| {
      let timers = timers.clone();
      Sequence::timer(10, timers as Rc<dyn SchedulerLike>).merge_map(1, move |_, _| Sequence::from_iter([request]))
    })
    .subscribe_observer(
      FnObserver::new()
        .value_fn(move |request| println!("request {request} finished at frame {}", frames.frame()))
        .done_fn(move || println!("all requests finished at frame {}", done_frames.frame())),
    );

  if let Err(error) = scheduler.flush() {
    eprintln!("pipeline failed: {error}");
  }
}
