//! Sticky carousel driven by scroll position within a pinned region.
//!
//! The region is `N` viewports tall. While it spans the whole viewport the
//! active panel is `floor(scroll_top / viewport_height)`, clamped to the
//! panel range; outside that window the last index is kept.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::config::MotionConfig;
use crate::ease::Ease;
use crate::error::{MotionError, MotionResult};
use crate::scheduler::{Prop, Props, Scheduler, TargetId, TaskHandle, Tween};
use crate::scroll::{ElementRect, ScrollPublisher, Subscription};

/// Panel index for a scroll offset into the region. Exact multiples of the
/// viewport height belong to the later panel.
pub fn index_for_offset(scroll_top: f64, viewport_height: f64, panel_count: usize) -> usize {
    if panel_count == 0 || !(viewport_height > 0.0) || !scroll_top.is_finite() {
        return 0;
    }
    let raw = (scroll_top / viewport_height).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(panel_count - 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelPose {
    /// Not yet shown: scaled to nothing, in place.
    Neutral,
    Active,
    /// Shown before, now scaled out and pushed down.
    Dismissed,
}

pub type IndexObserver = Rc<dyn Fn(usize)>;

pub struct CarouselController {
    scheduler: Rc<dyn Scheduler>,
    panels: Vec<TargetId>,
    poses: Vec<PanelPose>,
    in_flight: Vec<Option<TaskHandle>>,
    active: usize,
    duration: Duration,
    dismiss_offset: f64,
    observer: Option<IndexObserver>,
}

impl CarouselController {
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        panels: Vec<TargetId>,
        config: &MotionConfig,
        observer: Option<IndexObserver>,
    ) -> MotionResult<Self> {
        if panels.is_empty() {
            return Err(MotionError::EmptyCarousel);
        }
        let count = panels.len();
        let controller = Self {
            scheduler,
            panels,
            poses: (0..count)
                .map(|index| {
                    if index == 0 {
                        PanelPose::Active
                    } else {
                        PanelPose::Neutral
                    }
                })
                .collect(),
            in_flight: vec![None; count],
            active: 0,
            duration: config.panel_duration,
            dismiss_offset: config.panel_dismiss_offset,
            observer,
        };
        for (index, target) in controller.panels.iter().enumerate() {
            controller
                .scheduler
                .set(*target, &controller.props_for(controller.poses[index]));
        }
        Ok(controller)
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn pose(&self, index: usize) -> Option<PanelPose> {
        self.poses.get(index).copied()
    }

    pub fn region_height(&self, viewport_height: f64) -> f64 {
        self.panels.len() as f64 * viewport_height
    }

    /// Recomputes the active panel from an offset into the region.
    pub fn sample_offset(&mut self, scroll_top: f64, viewport_height: f64) -> usize {
        let next = index_for_offset(scroll_top, viewport_height, self.panels.len());
        if next != self.active {
            self.activate(next);
        }
        self.active
    }

    /// Samples the region's bounds. Only while the region covers the whole
    /// viewport does the index move; missing geometry keeps it unchanged.
    pub fn on_scroll(&mut self, region: Option<ElementRect>, viewport_height: f64) -> usize {
        let Some(region) = region else {
            return self.active;
        };
        let pinned = region.top <= 0.0 && region.bottom() >= viewport_height;
        if !pinned {
            return self.active;
        }
        self.sample_offset(-region.top, viewport_height)
    }

    pub fn teardown(&mut self) {
        for handle in self.in_flight.iter_mut().filter_map(Option::take) {
            self.scheduler.cancel(handle);
        }
    }

    fn activate(&mut self, next: usize) {
        let previous = self.active;
        debug!(previous, next, "carousel: active panel changed");
        self.active = next;
        self.animate_to(previous, PanelPose::Dismissed);
        self.animate_to(next, PanelPose::Active);
        if let Some(observer) = &self.observer {
            observer(next);
        }
    }

    fn animate_to(&mut self, index: usize, pose: PanelPose) {
        if let Some(handle) = self.in_flight[index].take() {
            self.scheduler.cancel(handle);
        }
        self.poses[index] = pose;

        let target = self.panels[index];
        let tween = Tween::new(vec![target])
            .to(self.props_for(pose))
            .duration(self.duration)
            .ease(Ease::OutQuart);
        let handle = self.scheduler.animate(tween, None);
        self.in_flight[index] = Some(handle);
    }

    fn props_for(&self, pose: PanelPose) -> Props {
        match pose {
            PanelPose::Neutral => vec![
                (Prop::Scale, 0.0),
                (Prop::Opacity, 0.0),
                (Prop::TranslateY, 0.0),
            ],
            PanelPose::Active => vec![
                (Prop::Scale, 1.0),
                (Prop::Opacity, 1.0),
                (Prop::TranslateY, 0.0),
            ],
            PanelPose::Dismissed => vec![
                (Prop::Scale, 0.0),
                (Prop::Opacity, 0.0),
                (Prop::TranslateY, self.dismiss_offset),
            ],
        }
    }
}

impl Drop for CarouselController {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Drives `carousel` from the shared scroll publisher using the pinned
/// region's live bounds.
pub fn bind_carousel(
    carousel: &Rc<RefCell<CarouselController>>,
    publisher: &ScrollPublisher,
    region: impl Fn() -> Option<ElementRect> + 'static,
) -> Subscription {
    let carousel = Rc::downgrade(carousel);
    publisher.subscribe(move |sample| {
        if let Some(carousel) = carousel.upgrade() {
            carousel
                .borrow_mut()
                .on_scroll(region(), sample.viewport_height);
        }
    })
}
