use std::cell::RefCell;
use std::rc::Rc;

use tracing::warn;
use wasm_bindgen::{closure::Closure, JsCast};
use web_sys::{window, Element, FocusEvent, HtmlElement, MouseEvent, Window};
use yew::prelude::*;

use crate::ambient::{bind_image_zoom, FloatingIcons, SKILL_ICONS};
use crate::browser::{
    device_profile, element_rect, prefers_reduced_motion, scroll_y, viewport_size, WebScheduler,
};
use crate::carousel::{bind_carousel, CarouselController, IndexObserver};
use crate::config::{BackgroundConfig, MotionConfig};
use crate::intro::{AnimationPhase, HeadlineLine, IntroSequencer, IntroTargets, PhaseObserver};
use crate::reveal::{bind_reveal, ViewportReveal};
use crate::scheduler::{Scheduler, TargetId};
use crate::scroll::{ScrollPublisher, ScrollSample};
use crate::spotlight::{SpotlightObserver, SpotlightTracker, SpotlightView, DEFAULT_SPOTLIGHT_COLOR};
use crate::stagger::split_glyphs;
use crate::throttle::FrameThrottle;

const LOADING_TITLE: &str = "VICTOR HUGO";
const HEADLINES: [(&str, &str); 3] = [
    ("Hi, I am", "headline headline-greeting"),
    ("Victor Hugo", "headline headline-name"),
    ("Full Stack developer / UI & UX Designer", "headline headline-role"),
];

struct Specialty {
    title: &'static str,
    body: &'static str,
}

const SPECIALTIES: [Specialty; 3] = [
    Specialty {
        title: "Frontend Developer",
        body: "Modern interfaces with Flutter, React and Next.js, built around accessibility, responsiveness and a shared design system.",
    },
    Specialty {
        title: "Backend Developer",
        body: "APIs and services with NestJS and PostgreSQL, focused on clear data models and predictable performance.",
    },
    Specialty {
        title: "UI & UX Designer",
        body: "Product flows and visual systems in Figma and Photoshop, validated with real users before a line of code ships.",
    },
];

struct Project {
    title: &'static str,
    description: &'static str,
    background: &'static str,
}

const PROJECTS: [Project; 4] = [
    Project {
        title: "Plasma Studio",
        description: "Shader playground for tuning animated backgrounds in the browser.",
        background: "#2000e6",
    },
    Project {
        title: "Fleet Board",
        description: "Realtime logistics dashboard with offline-first mobile companion.",
        background: "#b7047e",
    },
    Project {
        title: "Tempo",
        description: "Habit tracker with a calm, motion-driven onboarding flow.",
        background: "#0f766e",
    },
    Project {
        title: "Atlas CMS",
        description: "Headless content platform powering a network of marketing sites.",
        background: "#1f2937",
    },
];

/// Page-wide motion services shared with every animated component.
#[derive(Clone)]
struct Motion {
    web: WebScheduler,
    publisher: ScrollPublisher,
    config: Rc<MotionConfig>,
    reduce_motion: bool,
}

impl PartialEq for Motion {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.config, &other.config)
    }
}

impl Motion {
    fn new() -> Option<Self> {
        let web = WebScheduler::new()?;
        let reduce_motion = prefers_reduced_motion();
        let config = MotionConfig::for_motion_preference(reduce_motion);
        let config = match config.validate() {
            Ok(()) => config,
            Err(error) => {
                warn!(%error, "motion config rejected, using defaults");
                MotionConfig::default()
            }
        };
        Some(Self {
            web,
            publisher: ScrollPublisher::new(),
            config: Rc::new(config),
            reduce_motion,
        })
    }

    fn scheduler(&self) -> Rc<dyn Scheduler> {
        Rc::new(self.web.clone())
    }
}

/// Elements bound to scheduler targets for the lifetime of a component.
struct Registered {
    web: WebScheduler,
    targets: Vec<TargetId>,
}

impl Registered {
    fn bind<'a>(motion: &Motion, nodes: impl IntoIterator<Item = &'a NodeRef>) -> Option<Self> {
        let elements = nodes
            .into_iter()
            .map(|node| node.cast::<HtmlElement>())
            .collect::<Option<Vec<_>>>()?;
        let targets = motion.web.allocate(elements.len());
        for (target, element) in targets.iter().zip(elements) {
            motion.web.register(*target, element);
        }
        Some(Self {
            web: motion.web.clone(),
            targets,
        })
    }
}

impl Drop for Registered {
    fn drop(&mut self) {
        for target in &self.targets {
            self.web.unregister(*target);
        }
    }
}

fn current_sample() -> ScrollSample {
    ScrollSample {
        scroll_y: scroll_y(),
        viewport_height: viewport_size().1,
    }
}

/// The page's only scroll and resize listeners, feeding the publisher at
/// most once per frame.
struct ScrollWiring {
    window: Window,
    listener: Closure<dyn FnMut()>,
    _throttle: Rc<FrameThrottle<()>>,
}

impl ScrollWiring {
    const EVENTS: [&'static str; 2] = ["scroll", "resize"];

    fn install(motion: &Motion) -> Option<Self> {
        let window = window()?;
        let publisher = motion.publisher.clone();
        let throttle = Rc::new(FrameThrottle::new(motion.scheduler(), move |()| {
            publisher.publish(current_sample())
        }));

        let requester = Rc::downgrade(&throttle);
        let listener = Closure::<dyn FnMut()>::new(move || {
            if let Some(throttle) = requester.upgrade() {
                throttle.request(());
            }
        });
        for event in Self::EVENTS {
            window
                .add_event_listener_with_callback(event, listener.as_ref().unchecked_ref())
                .ok()?;
        }
        throttle.request(());

        Some(Self {
            window,
            listener,
            _throttle: throttle,
        })
    }
}

impl Drop for ScrollWiring {
    fn drop(&mut self) {
        for event in Self::EVENTS {
            let _ = self
                .window
                .remove_event_listener_with_callback(event, self.listener.as_ref().unchecked_ref());
        }
    }
}

#[derive(Properties, PartialEq)]
struct ScrollRevealProps {
    #[prop_or_default]
    class: Classes,
    #[prop_or_default]
    children: Html,
}

#[function_component(ScrollReveal)]
fn scroll_reveal(props: &ScrollRevealProps) -> Html {
    let motion = use_context::<Motion>();
    let node = use_node_ref();

    {
        let node = node.clone();
        use_effect_with((), move |_| {
            let binding = motion.as_ref().and_then(|motion| {
                let registered = Registered::bind(motion, [&node])?;
                let reveal = ViewportReveal::new(motion.scheduler(), registered.targets[0], &motion.config)
                    .map_err(|error| warn!(%error, "scroll reveal disabled"))
                    .ok()?;
                let reveal = Rc::new(RefCell::new(reveal));
                let element = node.cast::<Element>()?;
                if let Some(sample) = motion.publisher.latest() {
                    reveal
                        .borrow_mut()
                        .on_scroll(Some(element_rect(&element)), sample.viewport_height);
                }
                let subscription = bind_reveal(&reveal, &motion.publisher, move || {
                    Some(element_rect(&element))
                });
                Some((subscription, reveal, registered))
            });
            move || drop(binding)
        });
    }

    html! {
        <div ref={node} class={classes!("scroll-reveal", props.class.clone())}>
            {props.children.clone()}
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct SpotlightCardProps {
    title: AttrValue,
    body: AttrValue,
    #[prop_or(AttrValue::Static(DEFAULT_SPOTLIGHT_COLOR))]
    color: AttrValue,
}

#[function_component(SpotlightCard)]
fn spotlight_card(props: &SpotlightCardProps) -> Html {
    let motion = use_context::<Motion>();
    let node = use_node_ref();
    let view = use_state(SpotlightView::default);
    let tracker = use_mut_ref(|| None::<SpotlightTracker>);

    {
        let view = view.clone();
        let tracker = tracker.clone();
        use_effect_with((), move |_| {
            if let Some(motion) = motion.as_ref() {
                let observer: SpotlightObserver = Rc::new(move |next| view.set(next));
                *tracker.borrow_mut() = Some(SpotlightTracker::new(
                    motion.scheduler(),
                    &motion.config,
                    Some(observer),
                ));
            }
            move || {
                tracker.borrow_mut().take();
            }
        });
    }

    let onmousemove = {
        let node = node.clone();
        let tracker = tracker.clone();
        Callback::from(move |event: MouseEvent| {
            let Some(element) = node.cast::<Element>() else {
                return;
            };
            if let Some(tracker) = tracker.borrow().as_ref() {
                tracker.pointer_move(
                    f64::from(event.client_x()),
                    f64::from(event.client_y()),
                    element_rect(&element),
                );
            }
        })
    };

    let onmouseenter = {
        let tracker = tracker.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(tracker) = tracker.borrow().as_ref() {
                tracker.pointer_enter();
            }
        })
    };

    let onmouseleave = {
        let tracker = tracker.clone();
        Callback::from(move |_: MouseEvent| {
            if let Some(tracker) = tracker.borrow().as_ref() {
                tracker.pointer_leave();
            }
        })
    };

    let onfocus = {
        let tracker = tracker.clone();
        Callback::from(move |_: FocusEvent| {
            if let Some(tracker) = tracker.borrow().as_ref() {
                tracker.focus();
            }
        })
    };

    let onblur = {
        let tracker = tracker.clone();
        Callback::from(move |_: FocusEvent| {
            if let Some(tracker) = tracker.borrow().as_ref() {
                tracker.blur();
            }
        })
    };

    let glow_style = format!(
        "opacity: {}; background: {};",
        view.opacity,
        view.gradient_css(&props.color)
    );

    html! {
        <div
            ref={node}
            class="spotlight-card"
            tabindex="0"
            onmousemove={onmousemove}
            onmouseenter={onmouseenter}
            onmouseleave={onmouseleave}
            onfocus={onfocus}
            onblur={onblur}
        >
            <div class="spotlight-glow" style={glow_style} aria-hidden="true" />
            <div class="spotlight-content">
                <h3>{props.title.clone()}</h3>
                <p>{props.body.clone()}</p>
            </div>
        </div>
    }
}

#[function_component(SkillIcons)]
fn skill_icons() -> Html {
    let motion = use_context::<Motion>();
    let nodes = use_memo((), |_| {
        SKILL_ICONS
            .iter()
            .map(|_| NodeRef::default())
            .collect::<Vec<_>>()
    });

    {
        let nodes = nodes.clone();
        use_effect_with((), move |_| {
            let running = motion.as_ref().and_then(|motion| {
                let registered = Registered::bind(motion, nodes.iter())?;
                let icons = FloatingIcons::start(
                    motion.scheduler(),
                    &SKILL_ICONS,
                    &registered.targets,
                    motion.reduce_motion,
                );
                Some((icons, registered))
            });
            move || drop(running)
        });
    }

    html! {
        <div class="skill-icons" aria-hidden="true">
            { for SKILL_ICONS.iter().zip(nodes.iter()).map(|(icon, node)| html! {
                <div
                    ref={node.clone()}
                    class="skill-icon"
                    style={format!("left: {}%; top: {}%;", icon.left, icon.top)}
                >
                    <div class="skill-icon-frame" style={format!("transform: rotate({}deg);", icon.rotation)}>
                        <img src={icon.asset} alt={icon.label} />
                    </div>
                </div>
            }) }
        </div>
    }
}

#[function_component(PersonalImage)]
fn personal_image() -> Html {
    let motion = use_context::<Motion>();
    let node = use_node_ref();

    {
        let node = node.clone();
        use_effect_with((), move |_| {
            let zoom = motion.as_ref().and_then(|motion| {
                let registered = Registered::bind(motion, [&node])?;
                let subscription =
                    bind_image_zoom(motion.scheduler(), registered.targets[0], &motion.publisher);
                Some((subscription, registered))
            });
            move || drop(zoom)
        });
    }

    html! {
        <div class="personal-image">
            <img ref={node} src="/personal-image.png" alt="Portrait of Victor Hugo" />
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct PlasmaProps {
    config: BackgroundConfig,
}

#[function_component(Plasma)]
fn plasma(props: &PlasmaProps) -> Html {
    let node = use_node_ref();

    {
        let node = node.clone();
        use_effect_with(props.config.clone(), move |config| {
            if let Some(host) = node.cast::<Element>() {
                for (name, value) in config.data_attributes() {
                    let _ = host.set_attribute(name, &value);
                }
            }
            || ()
        });
    }

    html! { <div ref={node} class="plasma-host" aria-hidden="true" /> }
}

#[function_component(ProjectCarousel)]
fn project_carousel() -> Html {
    let motion = use_context::<Motion>();
    let region = use_node_ref();
    let panels = use_memo((), |_| {
        PROJECTS
            .iter()
            .map(|_| NodeRef::default())
            .collect::<Vec<_>>()
    });
    let active = use_state(|| 0usize);

    {
        let region = region.clone();
        let panels = panels.clone();
        let active = active.clone();
        use_effect_with((), move |_| {
            let wiring = motion.as_ref().and_then(|motion| {
                let registered = Registered::bind(motion, panels.iter())?;
                let observer: IndexObserver = Rc::new(move |index| active.set(index));
                let carousel = CarouselController::new(
                    motion.scheduler(),
                    registered.targets.clone(),
                    &motion.config,
                    Some(observer),
                )
                .map_err(|error| warn!(%error, "carousel disabled"))
                .ok()?;
                let carousel = Rc::new(RefCell::new(carousel));
                let region = region.cast::<Element>()?;
                let subscription = bind_carousel(&carousel, &motion.publisher, move || {
                    Some(element_rect(&region))
                });
                Some((subscription, carousel, registered))
            });
            move || drop(wiring)
        });
    }

    let region_style = format!("height: {}vh;", PROJECTS.len() * 100);

    html! {
        <section ref={region} class="projects" style={region_style} aria-label="Projects">
            <div class="projects-sticky">
                { for PROJECTS.iter().zip(panels.iter()).enumerate().map(|(index, (project, node))| html! {
                    <article
                        ref={node.clone()}
                        class="project-panel"
                        style={format!("background: {};", project.background)}
                        aria-hidden={(index != *active).to_string()}
                    >
                        <h2>{project.title}</h2>
                        <p>{project.description}</p>
                    </article>
                }) }
                <ol class="project-dots" aria-hidden="true">
                    { for (0..PROJECTS.len()).map(|index| html! {
                        <li class={classes!("project-dot", (index == *active).then_some("is-active"))} />
                    }) }
                </ol>
            </div>
        </section>
    }
}

fn headline(text: &str, class: &str, nodes: &[NodeRef]) -> Html {
    html! {
        <h2 class={class.to_string()} aria-label={text.to_string()}>
            { for split_glyphs(text).into_iter().zip(nodes).map(|(unit, node)| html! {
                <span ref={node.clone()} class="glyph" aria-hidden="true" style="opacity: 0;">
                    {unit.character.to_string()}
                </span>
            }) }
        </h2>
    }
}

fn mount_intro(
    motion: &Motion,
    progress: [&NodeRef; 2],
    glyphs: &[Vec<NodeRef>],
    image: &NodeRef,
    observer: PhaseObserver,
) -> Option<(IntroSequencer, Vec<Registered>)> {
    let progress = Registered::bind(motion, progress)?;
    let image = Registered::bind(motion, [image])?;
    let mut headlines = Vec::with_capacity(HEADLINES.len());
    let mut registered = Vec::with_capacity(HEADLINES.len() + 2);
    for ((text, _), nodes) in HEADLINES.iter().zip(glyphs) {
        let line = Registered::bind(motion, nodes.iter())?;
        headlines.push(HeadlineLine {
            text: text.to_string(),
            glyphs: line.targets.clone(),
        });
        registered.push(line);
    }

    let targets = IntroTargets {
        progress: progress.targets.clone(),
        headlines,
        image: image.targets[0],
    };
    registered.push(progress);
    registered.push(image);

    let sequencer = IntroSequencer::mount(
        motion.scheduler(),
        (*motion.config).clone(),
        targets,
        Some(observer),
    );
    Some((sequencer, registered))
}

#[function_component(App)]
fn app() -> Html {
    let motion = use_memo((), |_| Motion::new());
    let phase = use_state(|| AnimationPhase::Loading);
    let bar = use_node_ref();
    let mask = use_node_ref();
    let image = use_node_ref();
    let glyphs = use_memo((), |_| {
        HEADLINES
            .iter()
            .map(|(text, _)| {
                split_glyphs(text)
                    .iter()
                    .map(|_| NodeRef::default())
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>()
    });
    let background = use_memo((), |_| BackgroundConfig::default().for_device(&device_profile()));

    {
        let motion = motion.clone();
        use_effect_with((), move |_| {
            let wiring = (*motion).as_ref().and_then(ScrollWiring::install);
            move || drop(wiring)
        });
    }

    {
        let motion = motion.clone();
        let phase = phase.clone();
        let bar = bar.clone();
        let mask = mask.clone();
        let image = image.clone();
        let glyphs = glyphs.clone();
        use_effect_with((), move |_| {
            let observer: PhaseObserver = Rc::new(move |next| phase.set(next));
            let intro = (*motion)
                .as_ref()
                .and_then(|motion| mount_intro(motion, [&bar, &mask], &glyphs, &image, observer));
            move || {
                if let Some((sequencer, _registered)) = intro {
                    sequencer.teardown();
                }
            }
        });
    }

    let loading = phase.shows_loading();
    let page = html! {
        <>
            <div class={classes!("loading-overlay", (!loading).then_some("is-hidden"))} aria-hidden={(!loading).to_string()}>
                <div class="loading-title">
                    <h1 class="loading-title-base">{LOADING_TITLE}</h1>
                    <h1 ref={mask} class="loading-title-mask" style="width: 0%;">{LOADING_TITLE}</h1>
                </div>
                <div class="loading-track">
                    <div ref={bar} class="loading-bar" style="width: 0%;" />
                </div>
            </div>
            <main class="page" aria-busy={loading.to_string()}>
                <section class="hero">
                    <Plasma config={(*background).clone()} />
                    <div class="hero-copy">
                        { for HEADLINES.iter().zip(glyphs.iter()).map(|((text, class), nodes)| headline(text, class, nodes)) }
                    </div>
                    <div ref={image} class="hero-image" style="transform: translateY(100%); opacity: 0;">
                        <PersonalImage />
                    </div>
                </section>
                <section class="skills">
                    <SkillIcons />
                    <div class="skills-copy">
                        <ScrollReveal><h2>{"I specialize in"}</h2></ScrollReveal>
                        { for SPECIALTIES.iter().map(|specialty| html! {
                            <ScrollReveal>
                                <SpotlightCard title={specialty.title} body={specialty.body} />
                            </ScrollReveal>
                        }) }
                    </div>
                </section>
                <ProjectCarousel />
            </main>
        </>
    };

    match (*motion).clone() {
        Some(motion) => html! {
            <ContextProvider<Motion> context={motion}>{page}</ContextProvider<Motion>>
        },
        None => page,
    }
}

pub fn run() {
    yew::Renderer::<App>::with_root(
        window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("app"))
            .expect("missing #app mount point"),
    )
    .render();
}
