//! Deterministic [`Scheduler`] driven by an explicit clock.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use slotmap::{new_key_type, Key, KeyData, SlotMap};

use crate::scheduler::{Prop, Props, Scheduler, TargetId, Task, TaskHandle, Tween};

new_key_type! {
    struct EntryKey;
}

enum Work {
    Timer(Task),
    Frame(Task),
    Animation(Option<Task>),
}

struct Entry {
    due: Option<Duration>,
    order: u64,
    work: Work,
}

enum Record {
    Set {
        target: TargetId,
        props: Props,
    },
    Tween {
        handle: TaskHandle,
        started: Duration,
        tween: Tween,
        stopped_at: Option<Duration>,
    },
}

#[derive(Clone, Debug)]
pub struct StartedTween {
    pub handle: TaskHandle,
    pub at: Duration,
    pub tween: Tween,
}

#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    order: Cell<u64>,
    entries: RefCell<SlotMap<EntryKey, Entry>>,
    records: RefCell<Vec<Record>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Outstanding timers, frame requests and animations.
    pub fn pending(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Moves the clock forward, firing due timers and animation completions
    /// in due-time order. Work scheduled by a callback fires within the same
    /// call if it falls due before the new time.
    pub fn advance(&self, by: Duration) {
        let target = self.now.get() + by;
        while let Some((due, work)) = self.take_next_due(target) {
            self.now.set(due);
            match work {
                Work::Timer(task) => task(),
                Work::Animation(on_complete) => {
                    if let Some(task) = on_complete {
                        task();
                    }
                }
                Work::Frame(_) => unreachable!("frames have no due time"),
            }
        }
        self.now.set(target);
    }

    pub fn advance_ms(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Runs every frame callback requested before this call.
    pub fn run_frame(&self) {
        let mut ready: Vec<(u64, EntryKey)> = self
            .entries
            .borrow()
            .iter()
            .filter(|(_, entry)| matches!(entry.work, Work::Frame(_)))
            .map(|(key, entry)| (entry.order, key))
            .collect();
        ready.sort_unstable_by_key(|(order, _)| *order);

        for (_, key) in ready {
            let removed = self.entries.borrow_mut().remove(key);
            if let Some(Entry {
                work: Work::Frame(task),
                ..
            }) = removed
            {
                task();
            }
        }
    }

    pub fn started_tweens(&self) -> Vec<StartedTween> {
        self.records
            .borrow()
            .iter()
            .filter_map(|record| match record {
                Record::Tween {
                    handle,
                    started,
                    tween,
                    ..
                } => Some(StartedTween {
                    handle: *handle,
                    at: *started,
                    tween: tween.clone(),
                }),
                Record::Set { .. } => None,
            })
            .collect()
    }

    pub fn tweens_for(&self, target: TargetId) -> Vec<StartedTween> {
        self.started_tweens()
            .into_iter()
            .filter(|started| started.tween.targets.contains(&target))
            .collect()
    }

    pub fn set_calls(&self, target: TargetId) -> Vec<Props> {
        self.records
            .borrow()
            .iter()
            .filter_map(|record| match record {
                Record::Set { target: id, props } if *id == target => Some(props.clone()),
                _ => None,
            })
            .collect()
    }

    /// Current value of `prop` on `target`, taking the most recent `set` or
    /// tween that touched it. Cancelled tweens freeze where they stopped.
    pub fn value(&self, target: TargetId, prop: Prop) -> Option<f64> {
        let now = self.now.get();
        self.records.borrow().iter().rev().find_map(|record| match record {
            Record::Set { target: id, props } if *id == target => {
                crate::scheduler::prop_value(props, prop)
            }
            Record::Tween {
                started,
                tween,
                stopped_at,
                ..
            } if tween.targets.contains(&target) => {
                let elapsed = stopped_at.unwrap_or(now).saturating_sub(*started);
                crate::scheduler::prop_value(&tween.sample(elapsed), prop)
            }
            _ => None,
        })
    }

    fn take_next_due(&self, limit: Duration) -> Option<(Duration, Work)> {
        let mut entries = self.entries.borrow_mut();
        let key = entries
            .iter()
            .filter_map(|(key, entry)| entry.due.map(|due| (due, entry.order, key)))
            .filter(|(due, _, _)| *due <= limit)
            .min_by_key(|(due, order, _)| (*due, *order))
            .map(|(_, _, key)| key)?;
        let entry = entries.remove(key)?;
        drop(entries);

        if matches!(entry.work, Work::Animation(_)) {
            self.stop_record(handle_for(key), entry.due.unwrap_or_default());
        }
        entry.due.map(|due| (due, entry.work))
    }

    fn insert(&self, due: Option<Duration>, work: Work) -> TaskHandle {
        let order = self.order.get();
        self.order.set(order + 1);
        let key = self.entries.borrow_mut().insert(Entry { due, order, work });
        handle_for(key)
    }

    fn stop_record(&self, handle: TaskHandle, at: Duration) {
        for record in self.records.borrow_mut().iter_mut() {
            if let Record::Tween {
                handle: recorded,
                stopped_at,
                ..
            } = record
            {
                if *recorded == handle && stopped_at.is_none() {
                    *stopped_at = Some(at);
                }
            }
        }
    }
}

fn handle_for(key: EntryKey) -> TaskHandle {
    TaskHandle(key.data().as_ffi())
}

impl Scheduler for ManualScheduler {
    fn after(&self, delay: Duration, task: Task) -> TaskHandle {
        self.insert(Some(self.now.get() + delay), Work::Timer(task))
    }

    fn next_frame(&self, task: Task) -> TaskHandle {
        self.insert(None, Work::Frame(task))
    }

    fn animate(&self, tween: Tween, on_complete: Option<Task>) -> TaskHandle {
        let started = self.now.get();
        let due = tween.total().map(|total| started + total);
        let handle = self.insert(due, Work::Animation(on_complete));
        self.records.borrow_mut().push(Record::Tween {
            handle,
            started,
            tween,
            stopped_at: None,
        });
        handle
    }

    fn set(&self, target: TargetId, props: &[(Prop, f64)]) {
        self.records.borrow_mut().push(Record::Set {
            target,
            props: props.to_vec(),
        });
    }

    fn cancel(&self, handle: TaskHandle) {
        let key = EntryKey::from(KeyData::from_ffi(handle.0));
        let removed = self.entries.borrow_mut().remove(key);
        if let Some(entry) = removed {
            if matches!(entry.work, Work::Animation(_)) {
                self.stop_record(handle, self.now.get());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn timers_fire_in_due_order() {
        let scheduler = ManualScheduler::new();
        let fired = Rc::new(RefCell::new(Vec::new()));

        for (label, delay) in [("late", 300), ("early", 100), ("middle", 200)] {
            let fired = fired.clone();
            scheduler.after(
                Duration::from_millis(delay),
                Box::new(move || fired.borrow_mut().push(label)),
            );
        }

        scheduler.advance_ms(250);
        assert_eq!(*fired.borrow(), vec!["early", "middle"]);
        scheduler.advance_ms(100);
        assert_eq!(*fired.borrow(), vec!["early", "middle", "late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let scheduler = ManualScheduler::new();
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        let handle = scheduler.after(Duration::from_millis(10), Box::new(move || flag.set(true)));

        scheduler.cancel(handle);
        scheduler.cancel(handle);
        scheduler.advance_ms(50);
        assert!(!fired.get());
    }

    #[test]
    fn frames_requested_during_a_frame_wait_for_the_next_one() {
        let scheduler = Rc::new(ManualScheduler::new());
        let count = Rc::new(Cell::new(0));

        let inner_scheduler = scheduler.clone();
        let inner_count = count.clone();
        scheduler.next_frame(Box::new(move || {
            inner_count.set(inner_count.get() + 1);
            let again = inner_count.clone();
            inner_scheduler.next_frame(Box::new(move || again.set(again.get() + 1)));
        }));

        scheduler.run_frame();
        assert_eq!(count.get(), 1);
        scheduler.run_frame();
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn cancelled_tween_freezes_in_place() {
        let scheduler = ManualScheduler::new();
        let handle = scheduler.animate(
            Tween::new(vec![TargetId(3)])
                .from(vec![(Prop::Opacity, 0.0)])
                .to(vec![(Prop::Opacity, 1.0)])
                .duration(Duration::from_millis(100)),
            None,
        );

        scheduler.advance_ms(50);
        scheduler.cancel(handle);
        scheduler.advance_ms(500);
        let opacity = scheduler.value(TargetId(3), Prop::Opacity).expect("opacity");
        assert!((opacity - 0.5).abs() < 1e-9);
    }
}
