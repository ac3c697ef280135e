//! Scroll-scrubbed entrance for content blocks.
//!
//! Progress runs from 0 when the element crosses the start line to 1 when
//! it crosses the end line, and the pose follows progress in both
//! directions. Leaving the band past the end releases the `will-change`
//! hint; scrolling back into the band restores it.

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;

use tracing::debug;

use crate::config::MotionConfig;
use crate::ease::Ease;
use crate::error::{MotionError, MotionResult};
use crate::scheduler::{lerp_props, Prop, Props, Scheduler, TargetId};
use crate::scroll::{ElementRect, ScrollPublisher, Subscription};

/// A position along an element or the viewport: a fraction of its extent
/// plus a pixel offset.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub fraction: f64,
    pub offset: f64,
}

impl Anchor {
    pub fn resolve(&self, extent: f64) -> f64 {
        self.fraction * extent + self.offset
    }
}

impl FromStr for Anchor {
    type Err = MotionError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (base, offset) = match token.find(|c: char| c == '+' || c == '-') {
            Some(split) => {
                let (base, rest) = token.split_at(split);
                let (sign, amount) = match rest {
                    _ if rest.starts_with("+=") => (1.0, &rest[2..]),
                    _ if rest.starts_with("-=") => (-1.0, &rest[2..]),
                    _ => return Err(MotionError::trigger_point(token)),
                };
                let amount: f64 = amount
                    .trim_end_matches("px")
                    .parse()
                    .map_err(|_| MotionError::trigger_point(token))?;
                (base, sign * amount)
            }
            None => (token, 0.0),
        };

        let fraction = match base {
            "top" => 0.0,
            "center" => 0.5,
            "bottom" => 1.0,
            percent if percent.ends_with('%') => {
                percent
                    .trim_end_matches('%')
                    .parse::<f64>()
                    .map_err(|_| MotionError::trigger_point(token))?
                    / 100.0
            }
            _ => return Err(MotionError::trigger_point(token)),
        };
        Ok(Self { fraction, offset })
    }
}

/// `"<element anchor> <viewport anchor>"`, e.g. `"top bottom-=100"`: the
/// point is reached when the element's top meets the line 100px above the
/// viewport's bottom.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerPoint {
    pub element: Anchor,
    pub viewport: Anchor,
}

impl TriggerPoint {
    /// How far the element's anchor has travelled above the viewport line.
    /// Zero exactly at the trigger point, growing as the page scrolls down.
    fn gap(&self, rect: &ElementRect, viewport_height: f64) -> f64 {
        self.viewport.resolve(viewport_height) - (rect.top + self.element.resolve(rect.height))
    }
}

impl FromStr for TriggerPoint {
    type Err = MotionError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut tokens = input.split_whitespace();
        let (Some(element), Some(viewport), None) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(MotionError::trigger_point(input));
        };
        Ok(Self {
            element: element.parse()?,
            viewport: viewport.parse()?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BandPosition {
    Before,
    Within,
    After,
}

pub struct ViewportReveal {
    scheduler: Rc<dyn Scheduler>,
    target: TargetId,
    start: TriggerPoint,
    end: TriggerPoint,
    ease: Ease,
    hidden: Props,
    settled: Props,
    progress: f64,
    position: Option<BandPosition>,
    has_fired: bool,
}

impl ViewportReveal {
    pub fn new(
        scheduler: Rc<dyn Scheduler>,
        target: TargetId,
        config: &MotionConfig,
    ) -> MotionResult<Self> {
        Ok(Self::with_points(
            scheduler,
            target,
            config.reveal_start.parse()?,
            config.reveal_end.parse()?,
            config.reveal_offset,
            Ease::BackOut(config.reveal_overshoot),
        ))
    }

    /// Places the element in its hidden pose right away, before any scroll
    /// sample arrives.
    pub fn with_points(
        scheduler: Rc<dyn Scheduler>,
        target: TargetId,
        start: TriggerPoint,
        end: TriggerPoint,
        offset: f64,
        ease: Ease,
    ) -> Self {
        let hidden = vec![(Prop::Opacity, 0.0), (Prop::TranslateY, offset)];
        let settled = vec![(Prop::Opacity, 1.0), (Prop::TranslateY, 0.0)];

        let mut initial = hidden.clone();
        initial.push((Prop::WillChange, 1.0));
        scheduler.set(target, &initial);

        Self {
            scheduler,
            target,
            start,
            end,
            ease,
            hidden,
            settled,
            progress: 0.0,
            position: None,
            has_fired: false,
        }
    }

    pub fn progress_for(&self, rect: &ElementRect, viewport_height: f64) -> f64 {
        let from_start = self.start.gap(rect, viewport_height);
        let span = from_start - self.end.gap(rect, viewport_height);
        if span <= 0.0 {
            return if from_start > 0.0 { 1.0 } else { 0.0 };
        }
        (from_start / span).clamp(0.0, 1.0)
    }

    /// Recomputes the pose for one scroll sample. Missing geometry skips the
    /// sample.
    pub fn on_scroll(&mut self, rect: Option<ElementRect>, viewport_height: f64) {
        let Some(rect) = rect else {
            return;
        };
        if viewport_height <= 0.0 {
            return;
        }

        let progress = self.progress_for(&rect, viewport_height);
        let position = if progress <= 0.0 {
            BandPosition::Before
        } else if progress >= 1.0 {
            BandPosition::After
        } else {
            BandPosition::Within
        };

        let previous = self.position.replace(position);
        if previous == Some(position) && progress == self.progress {
            return;
        }
        self.progress = progress;
        if progress > 0.0 {
            self.has_fired = true;
        }

        let mut props = self.pose();
        match (previous, position) {
            (Some(previous), BandPosition::After) if previous != BandPosition::After => {
                debug!(target_id = self.target.0, "reveal: left band past end");
                props.push((Prop::WillChange, 0.0));
            }
            (None, BandPosition::After) => props.push((Prop::WillChange, 0.0)),
            (Some(BandPosition::After), _) => {
                debug!(target_id = self.target.0, "reveal: re-entered band");
                props.push((Prop::WillChange, 1.0));
            }
            _ => {}
        }
        self.scheduler.set(self.target, &props);
    }

    pub fn pose(&self) -> Props {
        lerp_props(&self.hidden, &self.settled, self.ease.apply(self.progress))
            .into_iter()
            .map(|(prop, value)| match prop {
                Prop::Opacity => (prop, value.clamp(0.0, 1.0)),
                _ => (prop, value),
            })
            .collect()
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn position(&self) -> Option<BandPosition> {
        self.position
    }

    pub fn has_fired(&self) -> bool {
        self.has_fired
    }
}

/// Drives `reveal` from the shared scroll publisher, querying fresh element
/// geometry on every sample.
pub fn bind_reveal(
    reveal: &Rc<RefCell<ViewportReveal>>,
    publisher: &ScrollPublisher,
    geometry: impl Fn() -> Option<ElementRect> + 'static,
) -> Subscription {
    let reveal = Rc::downgrade(reveal);
    publisher.subscribe(move |sample| {
        if let Some(reveal) = reveal.upgrade() {
            reveal
                .borrow_mut()
                .on_scroll(geometry(), sample.viewport_height);
        }
    })
}
