//! Page-wide scroll position fan-out. Dropping a [`Subscription`]
//! unsubscribes.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use slotmap::{new_key_type, SlotMap};
use tracing::trace;

/// Element bounds in viewport coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ElementRect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollSample {
    pub scroll_y: f64,
    pub viewport_height: f64,
}

new_key_type! {
    pub struct SubscriberId;
}

type Listener = Rc<dyn Fn(ScrollSample)>;

struct Subscriber {
    order: u64,
    listener: Listener,
}

#[derive(Default)]
struct PublisherState {
    subscribers: SlotMap<SubscriberId, Subscriber>,
    next_order: u64,
}

#[derive(Clone, Default)]
pub struct ScrollPublisher {
    state: Rc<RefCell<PublisherState>>,
    latest: Rc<Cell<Option<ScrollSample>>>,
}

impl ScrollPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe(&self, listener: impl Fn(ScrollSample) + 'static) -> Subscription {
        let mut state = self.state.borrow_mut();
        let order = state.next_order;
        state.next_order += 1;
        let id = state.subscribers.insert(Subscriber {
            order,
            listener: Rc::new(listener),
        });
        Subscription {
            id,
            state: Rc::downgrade(&self.state),
        }
    }

    /// Delivers `sample` in subscription order. A subscriber removed by an
    /// earlier listener is skipped; one added during delivery starts with
    /// the next sample.
    pub fn publish(&self, sample: ScrollSample) {
        self.latest.set(Some(sample));
        let mut snapshot: Vec<(u64, SubscriberId, Listener)> = self
            .state
            .borrow()
            .subscribers
            .iter()
            .map(|(id, subscriber)| (subscriber.order, id, subscriber.listener.clone()))
            .collect();
        snapshot.sort_unstable_by_key(|(order, _, _)| *order);
        trace!(
            scroll_y = sample.scroll_y,
            subscribers = snapshot.len(),
            "scroll: publish"
        );

        for (_, id, listener) in snapshot {
            if self.state.borrow().subscribers.contains_key(id) {
                listener(sample);
            }
        }
    }

    pub fn latest(&self) -> Option<ScrollSample> {
        self.latest.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.borrow().subscribers.len()
    }
}

/// Live registration with a [`ScrollPublisher`].
pub struct Subscription {
    id: SubscriberId,
    state: Weak<RefCell<PublisherState>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            state.borrow_mut().subscribers.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(scroll_y: f64) -> ScrollSample {
        ScrollSample {
            scroll_y,
            viewport_height: 800.0,
        }
    }

    #[test]
    fn delivers_in_subscription_order() {
        let publisher = ScrollPublisher::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let first_seen = seen.clone();
        let _first = publisher.subscribe(move |s| first_seen.borrow_mut().push(("first", s.scroll_y)));
        let second_seen = seen.clone();
        let _second =
            publisher.subscribe(move |s| second_seen.borrow_mut().push(("second", s.scroll_y)));

        publisher.publish(sample(120.0));
        assert_eq!(*seen.borrow(), vec![("first", 120.0), ("second", 120.0)]);
        assert_eq!(publisher.latest(), Some(sample(120.0)));
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let publisher = ScrollPublisher::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        let subscription = publisher.subscribe(move |_| counter.set(counter.get() + 1));

        publisher.publish(sample(1.0));
        drop(subscription);
        publisher.publish(sample(2.0));

        assert_eq!(count.get(), 1);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn subscriber_removed_mid_publish_is_not_called() {
        let publisher = ScrollPublisher::new();
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let victim_calls = Rc::new(Cell::new(0));

        let slot = victim_slot.clone();
        let _killer = publisher.subscribe(move |_| {
            slot.borrow_mut().take();
        });
        let calls = victim_calls.clone();
        *victim_slot.borrow_mut() = Some(publisher.subscribe(move |_| calls.set(calls.get() + 1)));

        publisher.publish(sample(10.0));
        assert_eq!(victim_calls.get(), 0);
    }

    #[test]
    fn subscriber_added_mid_publish_starts_with_the_next_sample() {
        let publisher = ScrollPublisher::new();
        let late_seen = Rc::new(RefCell::new(Vec::new()));
        let late_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let source = publisher.clone();
        let slot = late_slot.clone();
        let seen = late_seen.clone();
        let _recruiter = publisher.subscribe(move |_| {
            if slot.borrow().is_some() {
                return;
            }
            let seen = seen.clone();
            *slot.borrow_mut() =
                Some(source.subscribe(move |s| seen.borrow_mut().push(s.scroll_y)));
        });

        publisher.publish(sample(10.0));
        assert_eq!(publisher.subscriber_count(), 2);
        assert!(late_seen.borrow().is_empty());

        publisher.publish(sample(20.0));
        assert_eq!(*late_seen.borrow(), vec![20.0]);
    }

    #[test]
    fn subscription_outliving_publisher_is_harmless() {
        let publisher = ScrollPublisher::new();
        let subscription = publisher.subscribe(|_| {});
        drop(publisher);
        drop(subscription);
    }

    #[test]
    fn rect_edges() {
        let rect = ElementRect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(rect.bottom(), 60.0);
        assert_eq!(ElementRect::default().bottom(), 0.0);
    }
}
