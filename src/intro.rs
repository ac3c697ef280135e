//! One-shot intro: loading bar, headline reveal, image entrance.
//!
//! ```text
//! Loading ──(bar done + grace)──► ContentEligible ──(settle)──► HeadlineRevealing
//!                                                                   │
//!            Settled ◄──(image duration)── ImageEntering ◄──(image delay)
//! ```
//!
//! Each phase is entered only from its predecessor. The image delay is
//! measured from `ContentEligible` but its timer is armed when the
//! headlines start, so the image can never overtake them.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::config::MotionConfig;
use crate::ease::Ease;
use crate::scheduler::{Prop, Scheduler, TargetId, TaskSet, Tween};
use crate::stagger::{StaggerReveal, StaggerTiming};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnimationPhase {
    Loading,
    ContentEligible,
    HeadlineRevealing,
    ImageEntering,
    Settled,
}

impl AnimationPhase {
    pub fn successor(self) -> Option<Self> {
        match self {
            Self::Loading => Some(Self::ContentEligible),
            Self::ContentEligible => Some(Self::HeadlineRevealing),
            Self::HeadlineRevealing => Some(Self::ImageEntering),
            Self::ImageEntering => Some(Self::Settled),
            Self::Settled => None,
        }
    }

    /// Whether the host should still render the loading overlay.
    pub fn shows_loading(self) -> bool {
        self == Self::Loading
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeadlineLine {
    pub text: String,
    pub glyphs: Vec<TargetId>,
}

/// Elements the intro animates, allocated by the render layer up front.
#[derive(Clone, Debug, PartialEq)]
pub struct IntroTargets {
    pub progress: Vec<TargetId>,
    pub headlines: Vec<HeadlineLine>,
    pub image: TargetId,
}

pub type PhaseObserver = Rc<dyn Fn(AnimationPhase)>;

struct IntroState {
    phase: AnimationPhase,
    tasks: TaskSet,
    headlines: Vec<StaggerReveal>,
    torn_down: bool,
}

struct Intro {
    scheduler: Rc<dyn Scheduler>,
    config: MotionConfig,
    targets: IntroTargets,
    observer: Option<PhaseObserver>,
    state: RefCell<IntroState>,
}

pub struct IntroSequencer {
    intro: Rc<Intro>,
}

impl IntroSequencer {
    /// Starts a fresh intro in [`AnimationPhase::Loading`].
    pub fn mount(
        scheduler: Rc<dyn Scheduler>,
        config: MotionConfig,
        targets: IntroTargets,
        observer: Option<PhaseObserver>,
    ) -> Self {
        let intro = Rc::new(Intro {
            scheduler,
            config,
            targets,
            observer,
            state: RefCell::new(IntroState {
                phase: AnimationPhase::Loading,
                tasks: TaskSet::default(),
                headlines: Vec::new(),
                torn_down: false,
            }),
        });
        start_loading(&intro);
        Self { intro }
    }

    pub fn phase(&self) -> AnimationPhase {
        self.intro.state.borrow().phase
    }

    pub fn is_torn_down(&self) -> bool {
        self.intro.state.borrow().torn_down
    }

    /// Cancels every pending timer and in-flight animation, including the
    /// headline reveals. Safe to call more than once.
    pub fn teardown(&self) {
        let headlines = {
            let mut state = self.intro.state.borrow_mut();
            if state.torn_down {
                return;
            }
            state.torn_down = true;
            state.tasks.cancel_all(self.intro.scheduler.as_ref());
            std::mem::take(&mut state.headlines)
        };
        debug!(phase = ?self.phase(), "intro: teardown");
        for headline in &headlines {
            headline.cancel();
        }
    }
}

impl Drop for IntroSequencer {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn start_loading(intro: &Rc<Intro>) {
    let scheduler = &intro.scheduler;
    let config = &intro.config;

    scheduler.set(
        intro.targets.image,
        &[(Prop::TranslateYPercent, 100.0), (Prop::Opacity, 0.0)],
    );

    let weak = Rc::downgrade(intro);
    let bar = Tween::new(intro.targets.progress.clone())
        .from(vec![(Prop::WidthPercent, 0.0)])
        .to(vec![(Prop::WidthPercent, 100.0)])
        .duration(config.loading_duration)
        .ease(Ease::InOutCubic);
    let handle = scheduler.animate(
        bar,
        Some(Box::new(move || {
            if let Some(intro) = weak.upgrade() {
                loading_finished(&intro);
            }
        })),
    );
    intro.state.borrow_mut().tasks.push(handle);
}

fn loading_finished(intro: &Rc<Intro>) {
    let weak = Rc::downgrade(intro);
    schedule(intro, intro.config.loading_grace, move || {
        if let Some(intro) = weak.upgrade() {
            content_eligible(&intro);
        }
    });
}

fn content_eligible(intro: &Rc<Intro>) {
    if !advance(intro, AnimationPhase::ContentEligible) {
        return;
    }
    let weak = Rc::downgrade(intro);
    schedule(intro, intro.config.content_settle, move || {
        if let Some(intro) = weak.upgrade() {
            headlines_revealing(&intro);
        }
    });
}

fn headlines_revealing(intro: &Rc<Intro>) {
    if !advance(intro, AnimationPhase::HeadlineRevealing) {
        return;
    }
    let config = &intro.config;

    let reveals: Vec<StaggerReveal> = intro
        .targets
        .headlines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            let delay = config
                .headline_delays
                .get(index)
                .or(config.headline_delays.last())
                .copied()
                .unwrap_or_default();
            let reveal = StaggerReveal::new(
                intro.scheduler.clone(),
                &line.text,
                StaggerTiming::from_config(config, delay),
            );
            reveal.play(line.glyphs.clone(), None);
            reveal
        })
        .collect();
    intro.state.borrow_mut().headlines = reveals;

    let weak = Rc::downgrade(intro);
    // Measured from ContentEligible, so the image starts `content_settle`
    // before `image_delay` has elapsed since the headlines began.
    let image_delay = config.image_delay.saturating_sub(config.content_settle);
    schedule(intro, image_delay, move || {
        if let Some(intro) = weak.upgrade() {
            image_entering(&intro);
        }
    });
}

fn image_entering(intro: &Rc<Intro>) {
    if !advance(intro, AnimationPhase::ImageEntering) {
        return;
    }
    let entrance = Tween::new(vec![intro.targets.image])
        .from(vec![(Prop::TranslateYPercent, 100.0), (Prop::Opacity, 0.0)])
        .to(vec![(Prop::TranslateYPercent, 0.0), (Prop::Opacity, 1.0)])
        .duration(intro.config.image_duration)
        .ease(Ease::OutQuart);

    let weak: Weak<Intro> = Rc::downgrade(intro);
    let handle = intro.scheduler.animate(
        entrance,
        Some(Box::new(move || {
            if let Some(intro) = weak.upgrade() {
                advance(&intro, AnimationPhase::Settled);
            }
        })),
    );
    intro.state.borrow_mut().tasks.push(handle);
}

/// Moves to `next` if it directly follows the current phase and the intro
/// is still mounted, then notifies the observer. Returns whether the intro
/// is still live afterwards.
fn advance(intro: &Rc<Intro>, next: AnimationPhase) -> bool {
    {
        let mut state = intro.state.borrow_mut();
        if state.torn_down || state.phase.successor() != Some(next) {
            debug!(current = ?state.phase, ?next, "intro: transition ignored");
            return false;
        }
        state.phase = next;
    }
    debug!(phase = ?next, "intro: phase");
    if let Some(observer) = &intro.observer {
        observer(next);
    }
    !intro.state.borrow().torn_down
}

fn schedule(intro: &Rc<Intro>, delay: std::time::Duration, task: impl FnOnce() + 'static) {
    let mut state = intro.state.borrow_mut();
    if state.torn_down {
        return;
    }
    let handle = intro.scheduler.after(delay, Box::new(task));
    state.tasks.push(handle);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::stagger::split_glyphs;
    use crate::testing::ManualScheduler;

    const LINES: [&str; 3] = ["Hi, I am", "Victor Hugo", "Full Stack developer"];
    const IMAGE: TargetId = TargetId(900);

    fn targets() -> IntroTargets {
        let mut next = 0;
        let headlines = LINES
            .iter()
            .map(|text| {
                let glyphs = split_glyphs(text)
                    .iter()
                    .map(|_| {
                        next += 1;
                        TargetId(next)
                    })
                    .collect();
                HeadlineLine {
                    text: text.to_string(),
                    glyphs,
                }
            })
            .collect();
        IntroTargets {
            progress: vec![TargetId(800), TargetId(801)],
            headlines,
            image: IMAGE,
        }
    }

    fn mount(
        scheduler: &Rc<ManualScheduler>,
        config: MotionConfig,
    ) -> (IntroSequencer, Rc<RefCell<Vec<(AnimationPhase, Duration)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let clock = Rc::downgrade(scheduler);
        let observer: PhaseObserver = Rc::new(move |phase| {
            let now = clock.upgrade().map(|s| s.now()).unwrap_or_default();
            sink.borrow_mut().push((phase, now));
        });
        let sequencer = IntroSequencer::mount(scheduler.clone(), config, targets(), Some(observer));
        (sequencer, seen)
    }

    #[test]
    fn phases_follow_the_timeline() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (sequencer, seen) = mount(&scheduler, MotionConfig::default());
        assert_eq!(sequencer.phase(), AnimationPhase::Loading);

        scheduler.advance_ms(10_000);

        assert_eq!(
            *seen.borrow(),
            vec![
                (AnimationPhase::ContentEligible, Duration::from_millis(3_200)),
                (AnimationPhase::HeadlineRevealing, Duration::from_millis(3_300)),
                (AnimationPhase::ImageEntering, Duration::from_millis(5_400)),
                (AnimationPhase::Settled, Duration::from_millis(6_900)),
            ]
        );
        assert_eq!(sequencer.phase(), AnimationPhase::Settled);
        assert_eq!(scheduler.value(IMAGE, Prop::Opacity), Some(1.0));
        assert_eq!(scheduler.value(IMAGE, Prop::TranslateYPercent), Some(0.0));
    }

    #[test]
    fn loading_overlay_stays_until_grace_elapses() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (sequencer, _seen) = mount(&scheduler, MotionConfig::default());

        scheduler.advance_ms(3_000);
        assert!(sequencer.phase().shows_loading());
        assert_eq!(scheduler.value(TargetId(800), Prop::WidthPercent), Some(100.0));
        assert_eq!(scheduler.value(TargetId(801), Prop::WidthPercent), Some(100.0));

        scheduler.advance_ms(200);
        assert!(!sequencer.phase().shows_loading());
    }

    #[test]
    fn image_stays_hidden_until_its_phase() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (_sequencer, _seen) = mount(&scheduler, MotionConfig::default());

        scheduler.advance_ms(5_399);
        assert_eq!(scheduler.value(IMAGE, Prop::Opacity), Some(0.0));
        assert_eq!(scheduler.value(IMAGE, Prop::TranslateYPercent), Some(100.0));
    }

    #[test]
    fn second_line_starts_before_first_finishes() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (_sequencer, _seen) = mount(&scheduler, MotionConfig::default());
        scheduler.advance_ms(10_000);

        let targets = targets();
        let start_of = |target: TargetId| {
            let tween = scheduler.tweens_for(target).remove(0);
            tween.at + tween.tween.delay
        };
        let first_line_last = *targets.headlines[0].glyphs.last().expect("glyphs");
        let second_line_first = targets.headlines[1].glyphs[0];

        let first_line_finish = start_of(first_line_last) + Duration::from_secs(1);
        assert_eq!(start_of(targets.headlines[0].glyphs[0]), Duration::from_millis(3_600));
        assert_eq!(start_of(second_line_first), Duration::from_millis(4_200));
        assert!(start_of(second_line_first) < first_line_finish);
    }

    #[test]
    fn teardown_in_any_phase_leaves_nothing_pending() {
        for cut_ms in [0, 1_500, 3_100, 3_250, 3_700, 5_000, 5_600, 7_000] {
            let scheduler = Rc::new(ManualScheduler::new());
            let (sequencer, seen) = mount(&scheduler, MotionConfig::default());

            scheduler.advance_ms(cut_ms);
            let phase_at_cut = sequencer.phase();
            let transitions_at_cut = seen.borrow().len();
            drop(sequencer);

            assert_eq!(scheduler.pending(), 0, "pending work after teardown at {cut_ms}ms");
            scheduler.advance_ms(20_000);
            assert_eq!(seen.borrow().len(), transitions_at_cut, "phase changed after teardown at {cut_ms}ms ({phase_at_cut:?})");
        }
    }

    #[test]
    fn observer_tearing_down_stops_the_sequence() {
        let scheduler = Rc::new(ManualScheduler::new());
        let slot: Rc<RefCell<Option<IntroSequencer>>> = Rc::new(RefCell::new(None));
        let reentry = Rc::downgrade(&slot);
        let observer: PhaseObserver = Rc::new(move |phase| {
            if phase == AnimationPhase::ContentEligible {
                if let Some(slot) = reentry.upgrade() {
                    if let Some(sequencer) = slot.borrow().as_ref() {
                        sequencer.teardown();
                    }
                }
            }
        });
        let sequencer = IntroSequencer::mount(
            scheduler.clone(),
            MotionConfig::default(),
            targets(),
            Some(observer),
        );
        *slot.borrow_mut() = Some(sequencer);

        scheduler.advance_ms(10_000);
        let slot = slot.borrow();
        let sequencer = slot.as_ref().expect("sequencer");
        assert!(sequencer.is_torn_down());
        assert_eq!(sequencer.phase(), AnimationPhase::ContentEligible);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn remount_starts_over_in_loading() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (first, _) = mount(&scheduler, MotionConfig::default());
        scheduler.advance_ms(4_000);
        assert_eq!(first.phase(), AnimationPhase::HeadlineRevealing);
        drop(first);

        let (second, seen) = mount(&scheduler, MotionConfig::default());
        assert_eq!(second.phase(), AnimationPhase::Loading);
        scheduler.advance_ms(3_199);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn short_image_delay_cannot_overtake_headlines() {
        let scheduler = Rc::new(ManualScheduler::new());
        let config = MotionConfig {
            image_delay: Duration::from_millis(20),
            ..MotionConfig::default()
        };
        let (_sequencer, seen) = mount(&scheduler, config);
        scheduler.advance_ms(10_000);

        let phases: Vec<AnimationPhase> = seen.borrow().iter().map(|(phase, _)| *phase).collect();
        assert_eq!(
            phases,
            vec![
                AnimationPhase::ContentEligible,
                AnimationPhase::HeadlineRevealing,
                AnimationPhase::ImageEntering,
                AnimationPhase::Settled,
            ]
        );
    }

    #[test]
    fn reduced_motion_settles_almost_immediately() {
        let scheduler = Rc::new(ManualScheduler::new());
        let (sequencer, _seen) = mount(&scheduler, MotionConfig::default().reduced());

        scheduler.advance_ms(100);
        assert_eq!(sequencer.phase(), AnimationPhase::Settled);
        assert!(scheduler
            .started_tweens()
            .iter()
            .all(|started| !started.tween.duration.is_zero()));
    }
}
