//! Per-glyph staggered text entrance followed by a decorative glow pulse.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::MotionConfig;
use crate::ease::Ease;
use crate::scheduler::{Prop, Repeat, Scheduler, TargetId, Task, TaskSet, Tween};

/// Whitespace is rendered as a non-breaking space so inline-block glyph
/// spans keep their width.
pub const NBSP: char = '\u{00A0}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GlyphUnit {
    pub index: usize,
    pub character: char,
    pub revealed: bool,
}

pub fn split_glyphs(text: &str) -> Vec<GlyphUnit> {
    text.chars()
        .enumerate()
        .map(|(index, character)| GlyphUnit {
            index,
            character: if character.is_whitespace() {
                NBSP
            } else {
                character
            },
            revealed: false,
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaggerTiming {
    pub delay: Duration,
    pub stagger: Duration,
    pub duration: Duration,
    pub rise: f64,
    pub glow_duration: Duration,
}

impl StaggerTiming {
    pub fn from_config(config: &MotionConfig, delay: Duration) -> Self {
        Self {
            delay,
            stagger: config.stagger,
            duration: config.glyph_duration,
            rise: config.glyph_rise,
            glow_duration: config.glow_duration,
        }
    }

    /// Offset of unit `index` from the end of the entrance delay.
    pub fn unit_offset(&self, index: usize) -> Duration {
        self.stagger
            .checked_mul(u32::try_from(index).unwrap_or(u32::MAX))
            .unwrap_or(Duration::MAX)
    }

    /// When unit `index` starts moving, measured from `play`.
    pub fn unit_start(&self, index: usize) -> Duration {
        self.delay.saturating_add(self.unit_offset(index))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealStage {
    Idle,
    Waiting,
    Entering,
    Pulsing,
    Done,
    Cancelled,
}

struct StaggerState {
    units: Vec<GlyphUnit>,
    targets: Vec<TargetId>,
    stage: RevealStage,
    tasks: TaskSet,
    on_entered: Option<Task>,
}

pub struct StaggerReveal {
    scheduler: Rc<dyn Scheduler>,
    timing: StaggerTiming,
    state: Rc<RefCell<StaggerState>>,
}

impl StaggerReveal {
    pub fn new(scheduler: Rc<dyn Scheduler>, text: &str, timing: StaggerTiming) -> Self {
        Self {
            scheduler,
            timing,
            state: Rc::new(RefCell::new(StaggerState {
                units: split_glyphs(text),
                targets: Vec::new(),
                stage: RevealStage::Idle,
                tasks: TaskSet::default(),
                on_entered: None,
            })),
        }
    }

    pub fn units(&self) -> Vec<GlyphUnit> {
        self.state.borrow().units.clone()
    }

    pub fn stage(&self) -> RevealStage {
        self.state.borrow().stage
    }

    pub fn timing(&self) -> StaggerTiming {
        self.timing
    }

    /// Starts the entrance on the glyph elements the render layer created
    /// for [`units`](Self::units), one target per unit in order.
    /// `on_entered` runs once every unit is fully visible, or immediately
    /// for empty text.
    pub fn play(&self, targets: Vec<TargetId>, on_entered: Option<Task>) {
        let immediate = {
            let mut state = self.state.borrow_mut();
            if state.stage != RevealStage::Idle {
                warn!(stage = ?state.stage, "stagger: play called twice");
                return;
            }
            if targets.len() != state.units.len() {
                warn!(
                    units = state.units.len(),
                    targets = targets.len(),
                    "stagger: glyph target count mismatch"
                );
            }
            for unit in state.units.iter_mut().skip(targets.len()) {
                unit.revealed = true;
            }
            let unit_count = state.units.len();
            state.targets = targets;
            state.targets.truncate(unit_count);

            if state.targets.is_empty() {
                state.stage = RevealStage::Done;
                on_entered
            } else {
                state.on_entered = on_entered;
                state.stage = RevealStage::Waiting;
                None
            }
        };
        if let Some(task) = immediate {
            task();
            return;
        }

        if self.timing.delay.is_zero() {
            begin_entrance(&self.state, &self.scheduler, self.timing);
            return;
        }

        let weak = Rc::downgrade(&self.state);
        let scheduler = self.scheduler.clone();
        let timing = self.timing;
        let handle = self.scheduler.after(
            self.timing.delay,
            Box::new(move || {
                if let Some(state) = weak.upgrade() {
                    begin_entrance(&state, &scheduler, timing);
                }
            }),
        );
        self.state.borrow_mut().tasks.push(handle);
    }

    /// Cancels the pending delay and every in-flight unit animation.
    pub fn cancel(&self) {
        let mut state = self.state.borrow_mut();
        state.tasks.cancel_all(self.scheduler.as_ref());
        state.on_entered = None;
        if !matches!(state.stage, RevealStage::Done | RevealStage::Idle) {
            debug!(stage = ?state.stage, "stagger: cancelled");
            state.stage = RevealStage::Cancelled;
        }
    }
}

impl Drop for StaggerReveal {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn begin_entrance(
    state: &Rc<RefCell<StaggerState>>,
    scheduler: &Rc<dyn Scheduler>,
    timing: StaggerTiming,
) {
    let weak = Rc::downgrade(state);
    let mut guard = state.borrow_mut();
    if guard.stage != RevealStage::Waiting {
        return;
    }
    guard.stage = RevealStage::Entering;

    let targets = guard.targets.clone();
    for (index, target) in targets.into_iter().enumerate() {
        scheduler.set(target, &[(Prop::WillChange, 1.0)]);
        let tween = Tween::new(vec![target])
            .from(vec![(Prop::Opacity, 0.0), (Prop::TranslateY, timing.rise)])
            .to(vec![(Prop::Opacity, 1.0), (Prop::TranslateY, 0.0)])
            .duration(timing.duration)
            .delay(timing.unit_offset(index))
            .ease(Ease::OutQuart);

        let weak = weak.clone();
        let completion_scheduler = scheduler.clone();
        let handle = scheduler.animate(
            tween,
            Some(Box::new(move || {
                unit_entered(&weak, &completion_scheduler, timing, index)
            })),
        );
        guard.tasks.push(handle);
    }
}

fn unit_entered(
    state: &Weak<RefCell<StaggerState>>,
    scheduler: &Rc<dyn Scheduler>,
    timing: StaggerTiming,
    index: usize,
) {
    let Some(state) = state.upgrade() else {
        return;
    };
    let all_entered = {
        let mut guard = state.borrow_mut();
        if let Some(unit) = guard.units.get_mut(index) {
            unit.revealed = true;
        }
        guard.units.iter().all(|unit| unit.revealed)
    };
    if all_entered {
        start_pulse(&state, scheduler, timing);
    }
}

fn start_pulse(
    state: &Rc<RefCell<StaggerState>>,
    scheduler: &Rc<dyn Scheduler>,
    timing: StaggerTiming,
) {
    let on_entered = {
        let mut guard = state.borrow_mut();
        if guard.stage != RevealStage::Entering {
            return;
        }
        guard.stage = RevealStage::Pulsing;

        let targets = guard.targets.clone();
        let last = targets.len().saturating_sub(1);
        for (index, target) in targets.into_iter().enumerate() {
            scheduler.set(target, &[(Prop::WillChange, 0.0)]);
            let tween = Tween::new(vec![target])
                .from(vec![(Prop::Glow, 0.0)])
                .to(vec![(Prop::Glow, 1.0)])
                .duration(timing.glow_duration)
                .delay(timing.unit_offset(index))
                .ease(Ease::InOutQuad)
                .repeat(Repeat::Yoyo(1));

            let on_complete: Option<Task> = (index == last).then(|| {
                let weak = Rc::downgrade(state);
                Box::new(move || {
                    if let Some(state) = weak.upgrade() {
                        let mut state = state.borrow_mut();
                        if state.stage == RevealStage::Pulsing {
                            state.stage = RevealStage::Done;
                        }
                    }
                }) as Task
            });
            let handle = scheduler.animate(tween, on_complete);
            guard.tasks.push(handle);
        }
        guard.on_entered.take()
    };

    debug!("stagger: entrance complete, glow pulse started");
    if let Some(task) = on_entered {
        task();
    }
}
