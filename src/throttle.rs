use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::scheduler::{Scheduler, TaskHandle};

struct ThrottleState<T> {
    latest: Option<T>,
    frame: Option<TaskHandle>,
}

/// Runs a callback at most once per display frame with the most recent
/// arguments requested during that frame. Older requests are dropped, and
/// dropping the throttle cancels the pending frame.
pub struct FrameThrottle<T: 'static> {
    scheduler: Rc<dyn Scheduler>,
    state: Rc<RefCell<ThrottleState<T>>>,
    callback: Rc<dyn Fn(T)>,
}

impl<T: 'static> FrameThrottle<T> {
    pub fn new(scheduler: Rc<dyn Scheduler>, callback: impl Fn(T) + 'static) -> Self {
        Self {
            scheduler,
            state: Rc::new(RefCell::new(ThrottleState {
                latest: None,
                frame: None,
            })),
            callback: Rc::new(callback),
        }
    }

    pub fn request(&self, args: T) {
        {
            let mut state = self.state.borrow_mut();
            state.latest = Some(args);
            if state.frame.is_some() {
                trace!("throttle: coalesced request into pending frame");
                return;
            }
        }

        let state = Rc::downgrade(&self.state);
        let callback = Rc::downgrade(&self.callback);
        let handle = self
            .scheduler
            .next_frame(Box::new(move || flush(&state, &callback)));
        self.state.borrow_mut().frame = Some(handle);
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().frame.is_some()
    }

    pub fn cancel(&self) {
        let frame = {
            let mut state = self.state.borrow_mut();
            state.latest = None;
            state.frame.take()
        };
        if let Some(handle) = frame {
            self.scheduler.cancel(handle);
        }
    }
}

impl<T: 'static> Drop for FrameThrottle<T> {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn flush<T: 'static>(state: &Weak<RefCell<ThrottleState<T>>>, callback: &Weak<dyn Fn(T)>) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let latest = {
        let mut state = state.borrow_mut();
        state.frame = None;
        state.latest.take()
    };
    if let (Some(args), Some(callback)) = (latest, callback.upgrade()) {
        callback(args);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::testing::ManualScheduler;

    fn recording_throttle(
        scheduler: &Rc<ManualScheduler>,
    ) -> (FrameThrottle<u32>, Rc<RefCell<Vec<u32>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let throttle = FrameThrottle::new(scheduler.clone(), move |value: u32| {
            sink.borrow_mut().push(value)
        });
        (throttle, calls)
    }

    #[test]
    fn burst_within_a_frame_runs_once_with_latest_arguments() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (throttle, calls) = recording_throttle(&scheduler);

        for value in 1..=10 {
            throttle.request(value);
        }
        assert_eq!(scheduler.pending(), 1);

        scheduler.run_frame();
        assert_eq!(*calls.borrow(), vec![10]);
        assert!(!throttle.is_pending());
    }

    #[test]
    fn no_request_means_no_call() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (_throttle, calls) = recording_throttle(&scheduler);

        scheduler.run_frame();
        scheduler.run_frame();
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn each_frame_gets_its_own_call() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (throttle, calls) = recording_throttle(&scheduler);

        throttle.request(1);
        throttle.request(2);
        scheduler.run_frame();
        throttle.request(3);
        scheduler.run_frame();
        assert_eq!(*calls.borrow(), vec![2, 3]);
    }

    #[test]
    fn drop_cancels_pending_frame() {
        let scheduler = Rc::new(ManualScheduler::new());
        let called = Rc::new(Cell::new(false));
        let flag = called.clone();
        let throttle = FrameThrottle::new(scheduler.clone(), move |_: ()| flag.set(true));

        throttle.request(());
        drop(throttle);
        assert_eq!(scheduler.pending(), 0);

        scheduler.run_frame();
        assert!(!called.get());
    }

    #[test]
    fn callback_may_request_the_next_frame() {
        let scheduler = Rc::new(ManualScheduler::new());
        let calls = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<Rc<FrameThrottle<u32>>>>> = Rc::new(RefCell::new(None));

        let sink = calls.clone();
        let reentry = Rc::downgrade(&slot);
        let throttle = Rc::new(FrameThrottle::new(scheduler.clone(), move |value: u32| {
            sink.borrow_mut().push(value);
            if value == 1 {
                if let Some(slot) = reentry.upgrade() {
                    if let Some(throttle) = slot.borrow().as_ref() {
                        throttle.request(2);
                    }
                }
            }
        }));
        *slot.borrow_mut() = Some(throttle.clone());

        throttle.request(1);
        scheduler.run_frame();
        scheduler.run_frame();
        assert_eq!(*calls.borrow(), vec![1, 2]);

        slot.borrow_mut().take();
    }
}
