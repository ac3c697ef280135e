use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::config::MotionConfig;
use crate::scheduler::Scheduler;
use crate::scroll::ElementRect;
use crate::throttle::FrameThrottle;

pub const DEFAULT_SPOTLIGHT_COLOR: &str = "rgba(183, 4, 126, 0.37)";

/// Raw pointer position in client coordinates with the card's bounds at the
/// time of the event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerSample {
    pub client_x: f64,
    pub client_y: f64,
    pub bounds: ElementRect,
}

/// What the card should render.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SpotlightView {
    /// Pointer position relative to the card's top-left corner, in px.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    pub focused: bool,
}

impl SpotlightView {
    /// Position as fractions of the card size, clamped to `0..=1`. A card
    /// with no measured size reports its centre.
    pub fn normalized(&self) -> (f64, f64) {
        fn axis(offset: f64, extent: f64) -> f64 {
            if extent > 0.0 {
                (offset / extent).clamp(0.0, 1.0)
            } else {
                0.5
            }
        }
        (axis(self.x, self.width), axis(self.y, self.height))
    }

    pub fn gradient_css(&self, color: &str) -> String {
        format!(
            "radial-gradient(circle at {}px {}px, {color}, transparent 80%)",
            self.x, self.y
        )
    }
}

pub type SpotlightObserver = Rc<dyn Fn(SpotlightView)>;

struct Inner {
    view: SpotlightView,
    observer: Option<SpotlightObserver>,
}

pub struct SpotlightTracker {
    inner: Rc<RefCell<Inner>>,
    throttle: FrameThrottle<PointerSample>,
    active_opacity: f64,
}

impl SpotlightTracker {
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        config: &MotionConfig,
        observer: Option<SpotlightObserver>,
    ) -> Self {
        let inner = Rc::new(RefCell::new(Inner {
            view: SpotlightView::default(),
            observer,
        }));
        let weak = Rc::downgrade(&inner);
        let throttle = FrameThrottle::new(scheduler, move |sample: PointerSample| {
            track(&weak, sample)
        });
        Self {
            inner,
            throttle,
            active_opacity: config.spotlight_opacity,
        }
    }

    pub fn view(&self) -> SpotlightView {
        self.inner.borrow().view
    }

    /// Queues a position update for the next frame. Ignored while the card
    /// holds keyboard focus.
    pub fn pointer_move(&self, client_x: f64, client_y: f64, bounds: ElementRect) {
        if self.inner.borrow().view.focused {
            return;
        }
        self.throttle.request(PointerSample {
            client_x,
            client_y,
            bounds,
        });
    }

    pub fn pointer_enter(&self) {
        self.update(|view| view.opacity = self.active_opacity);
    }

    pub fn pointer_leave(&self) {
        self.throttle.cancel();
        self.update(reset);
    }

    pub fn focus(&self) {
        self.throttle.cancel();
        self.update(|view| {
            view.focused = true;
            view.opacity = self.active_opacity;
        });
    }

    pub fn blur(&self) {
        self.update(|view| {
            view.focused = false;
            reset(view);
        });
    }

    pub fn teardown(&self) {
        self.throttle.cancel();
    }

    fn update(&self, change: impl FnOnce(&mut SpotlightView)) {
        let (view, observer) = {
            let mut inner = self.inner.borrow_mut();
            change(&mut inner.view);
            (inner.view, inner.observer.clone())
        };
        if let Some(observer) = observer {
            observer(view);
        }
    }
}

/// Back to the card's origin, fully transparent.
fn reset(view: &mut SpotlightView) {
    view.x = 0.0;
    view.y = 0.0;
    view.opacity = 0.0;
}

fn track(inner: &Weak<RefCell<Inner>>, sample: PointerSample) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let (view, observer) = {
        let mut inner = inner.borrow_mut();
        if inner.view.focused {
            return;
        }
        inner.view.x = sample.client_x - sample.bounds.left;
        inner.view.y = sample.client_y - sample.bounds.top;
        inner.view.width = sample.bounds.width;
        inner.view.height = sample.bounds.height;
        (inner.view, inner.observer.clone())
    };
    trace!(x = view.x, y = view.y, "spotlight: pointer tracked");
    if let Some(observer) = observer {
        observer(view);
    }
}
