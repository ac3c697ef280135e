use std::rc::Rc;
use std::time::Duration;

use tracing::debug;

use crate::ease::Ease;
use crate::scheduler::{Prop, Repeat, Scheduler, TargetId, TaskSet, Tween};
use crate::scroll::{ScrollPublisher, Subscription};

const IMAGE_ZOOM_PER_PX: f64 = 0.0005;
const IMAGE_ZOOM_MAX: f64 = 1.3;
const ICON_TRAVEL: f64 = 12.0;

/// Portrait scale for a page scroll offset. Overscroll above the top is
/// treated as zero.
pub fn image_scale_for_scroll(scroll_y: f64) -> f64 {
    (1.0 + scroll_y.max(0.0) * IMAGE_ZOOM_PER_PX).min(IMAGE_ZOOM_MAX)
}

/// Keeps `target` scaled to the current page scroll.
pub fn bind_image_zoom(
    scheduler: Rc<dyn Scheduler>,
    target: TargetId,
    publisher: &ScrollPublisher,
) -> Subscription {
    publisher.subscribe(move |sample| {
        scheduler.set(target, &[(Prop::Scale, image_scale_for_scroll(sample.scroll_y))]);
    })
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatingIcon {
    pub label: &'static str,
    pub asset: &'static str,
    /// Placement inside the icon field, in percent of its size.
    pub left: f64,
    pub top: f64,
    pub rotation: f64,
    pub delay: Duration,
    /// One full down-and-up cycle.
    pub period: Duration,
}

pub const SKILL_ICONS: [FloatingIcon; 7] = [
    FloatingIcon {
        label: "Figma",
        asset: "/figma-icon.png",
        left: 23.0,
        top: 15.0,
        rotation: -8.0,
        delay: Duration::ZERO,
        period: Duration::from_millis(4_000),
    },
    FloatingIcon {
        label: "PostgreSQL",
        asset: "/postgresql-icon.png",
        left: 70.0,
        top: 10.0,
        rotation: 5.0,
        delay: Duration::from_millis(500),
        period: Duration::from_millis(3_500),
    },
    FloatingIcon {
        label: "React",
        asset: "/react-icon.png",
        left: 50.0,
        top: 25.0,
        rotation: -5.0,
        delay: Duration::from_millis(1_000),
        period: Duration::from_millis(4_200),
    },
    FloatingIcon {
        label: "NestJS",
        asset: "/nestjs-icon.png",
        left: 15.0,
        top: 50.0,
        rotation: 8.0,
        delay: Duration::from_millis(1_500),
        period: Duration::from_millis(3_800),
    },
    FloatingIcon {
        label: "Photoshop",
        asset: "/photoshop-icon.png",
        left: 35.0,
        top: 40.0,
        rotation: -12.0,
        delay: Duration::from_millis(2_000),
        period: Duration::from_millis(4_500),
    },
    FloatingIcon {
        label: "TypeScript",
        asset: "/ts-icon.png",
        left: 80.0,
        top: 42.0,
        rotation: 6.0,
        delay: Duration::from_millis(800),
        period: Duration::from_millis(3_200),
    },
    FloatingIcon {
        label: "Flutter",
        asset: "/flutter-icon.png",
        left: 60.0,
        top: 55.0,
        rotation: -3.0,
        delay: Duration::from_millis(1_200),
        period: Duration::from_millis(4_000),
    },
];

/// Endless bobbing for a set of icons. Dropping it stops every icon.
pub struct FloatingIcons {
    scheduler: Rc<dyn Scheduler>,
    tasks: TaskSet,
}

impl FloatingIcons {
    /// Pairs `icons` with `targets` by position. With reduced motion the
    /// icons are placed at rest and never animated.
    pub fn start(
        scheduler: Rc<dyn Scheduler>,
        icons: &[FloatingIcon],
        targets: &[TargetId],
        reduce_motion: bool,
    ) -> Self {
        let mut tasks = TaskSet::default();
        for (icon, target) in icons.iter().zip(targets) {
            scheduler.set(*target, &[(Prop::TranslateY, 0.0)]);
            if reduce_motion {
                continue;
            }
            let tween = Tween::new(vec![*target])
                .from(vec![(Prop::TranslateY, -ICON_TRAVEL)])
                .to(vec![(Prop::TranslateY, ICON_TRAVEL)])
                .duration(icon.period / 2)
                .delay(icon.delay)
                .ease(Ease::InOutSine)
                .repeat(Repeat::Forever);
            tasks.push(scheduler.animate(tween, None));
        }
        debug!(icons = tasks.count(), "ambient: floating icons started");
        Self { scheduler, tasks }
    }

    pub fn running(&self) -> usize {
        self.tasks.count()
    }

    pub fn stop(&mut self) {
        self.tasks.cancel_all(self.scheduler.as_ref());
    }
}

impl Drop for FloatingIcons {
    fn drop(&mut self) {
        self.stop();
    }
}
