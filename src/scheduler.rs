//! Timer and timeline boundary.
//!
//! The motion core never touches wall-clock timers or elements directly. It
//! schedules work through a [`Scheduler`], which the browser frontend backs
//! with `setTimeout`, `requestAnimationFrame` and CSS transitions, and which
//! tests back with a manual clock.

use std::time::Duration;

use crate::ease::Ease;

/// Opaque handle to a renderable element, handed out by the render layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Handle to a pending timer, frame request or animation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskHandle(pub u64);

pub type Task = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Prop {
    Opacity,
    TranslateY,
    TranslateYPercent,
    Scale,
    WidthPercent,
    Glow,
    WillChange,
}

pub type Props = Vec<(Prop, f64)>;

pub fn prop_value(props: &[(Prop, f64)], prop: Prop) -> Option<f64> {
    props
        .iter()
        .find(|(candidate, _)| *candidate == prop)
        .map(|(_, value)| *value)
}

/// Interpolates every property of `to`, starting from the matching value
/// in `from` (or from `to` itself when `from` does not mention it).
pub fn lerp_props(from: &[(Prop, f64)], to: &[(Prop, f64)], t: f64) -> Props {
    to.iter()
        .map(|&(prop, end)| {
            let start = prop_value(from, prop).unwrap_or(end);
            (prop, start + (end - start) * t)
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Repeat {
    Once,
    /// Forward pass followed by `n` alternating passes.
    Yoyo(u32),
    Forever,
}

impl Repeat {
    fn passes(self) -> Option<u32> {
        match self {
            Self::Once => Some(1),
            Self::Yoyo(extra) => Some(extra.saturating_add(1)),
            Self::Forever => None,
        }
    }

    fn alternates(self) -> bool {
        !matches!(self, Self::Once)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tween {
    pub targets: Vec<TargetId>,
    pub from: Props,
    pub to: Props,
    pub duration: Duration,
    pub delay: Duration,
    pub ease: Ease,
    pub repeat: Repeat,
}

impl Tween {
    pub fn new(targets: impl Into<Vec<TargetId>>) -> Self {
        Self {
            targets: targets.into(),
            from: Vec::new(),
            to: Vec::new(),
            duration: Duration::ZERO,
            delay: Duration::ZERO,
            ease: Ease::Linear,
            repeat: Repeat::Once,
        }
    }

    pub fn from(mut self, props: Props) -> Self {
        self.from = props;
        self
    }

    pub fn to(mut self, props: Props) -> Self {
        self.to = props;
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn ease(mut self, ease: Ease) -> Self {
        self.ease = ease;
        self
    }

    pub fn repeat(mut self, repeat: Repeat) -> Self {
        self.repeat = repeat;
        self
    }

    /// Time from scheduling until the last pass ends, `None` for endless tweens.
    pub fn total(&self) -> Option<Duration> {
        let passes = self.repeat.passes()?;
        let active = self.duration.checked_mul(passes).unwrap_or(Duration::MAX);
        Some(self.delay.saturating_add(active))
    }

    /// Property values `elapsed` after the tween was scheduled.
    pub fn sample(&self, elapsed: Duration) -> Props {
        if elapsed < self.delay {
            return lerp_props(&self.from, &self.to, 0.0);
        }
        let local = elapsed - self.delay;

        if self.duration.is_zero() {
            return lerp_props(&self.from, &self.to, self.settled_progress());
        }

        let position = local.as_secs_f64() / self.duration.as_secs_f64();
        if let Some(passes) = self.repeat.passes() {
            if position >= f64::from(passes) {
                return lerp_props(&self.from, &self.to, self.settled_progress());
            }
        }

        let pass = position.floor();
        let mut t = position - pass;
        if self.repeat.alternates() && (pass as u64) % 2 == 1 {
            t = 1.0 - t;
        }
        lerp_props(&self.from, &self.to, self.ease.apply(t))
    }

    fn settled_progress(&self) -> f64 {
        match self.repeat.passes() {
            Some(passes) if self.repeat.alternates() && passes % 2 == 0 => 0.0,
            _ => 1.0,
        }
    }
}

pub trait Scheduler {
    fn after(&self, delay: Duration, task: Task) -> TaskHandle;

    fn next_frame(&self, task: Task) -> TaskHandle;

    /// Starts `tween`; `on_complete` runs once when the final pass ends and
    /// never runs if the handle is cancelled first.
    fn animate(&self, tween: Tween, on_complete: Option<Task>) -> TaskHandle;

    fn set(&self, target: TargetId, props: &[(Prop, f64)]);

    /// Cancelling an unknown or already finished handle does nothing.
    fn cancel(&self, handle: TaskHandle);
}

/// Handles owned by one component instance, cancelled together on teardown.
#[derive(Debug, Default)]
pub struct TaskSet {
    handles: Vec<TaskHandle>,
}

impl TaskSet {
    pub fn push(&mut self, handle: TaskHandle) {
        self.handles.push(handle);
    }

    pub fn cancel_all(&mut self, scheduler: &dyn Scheduler) {
        for handle in self.handles.drain(..) {
            scheduler.cancel(handle);
        }
    }

    pub fn count(&self) -> usize {
        self.handles.len()
    }
}
