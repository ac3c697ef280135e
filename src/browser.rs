use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

use js_sys::Reflect;
use slotmap::{new_key_type, Key, KeyData, SlotMap};
use tracing::warn;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use web_sys::{window, Element, HtmlElement, Window};

use crate::config::DeviceProfile;
use crate::scheduler::{Prop, Repeat, Scheduler, Task, TargetId, TaskHandle, Tween};
use crate::scroll::ElementRect;

const FROZEN_PROPERTIES: [&str; 4] = ["opacity", "transform", "width", "text-shadow"];

new_key_type! {
    struct JobKey;
}

#[derive(Clone, Copy)]
enum Armed {
    Timeout(i32),
    Frame(i32),
}

struct Animation {
    tween: Tween,
    passes_done: u32,
    on_complete: Option<Task>,
}

enum Work {
    Task(Task),
    Animation(Animation),
}

struct Job {
    armed: Option<Armed>,
    closure: Option<Closure<dyn FnMut()>>,
    work: Option<Work>,
}

#[derive(Clone, Copy)]
struct Transform {
    y: f64,
    y_percent: f64,
    scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            y: 0.0,
            y_percent: 0.0,
            scale: 1.0,
        }
    }
}

impl Transform {
    fn css(&self) -> String {
        format!(
            "translate3d(0, {}px, 0) translateY({}%) scale({})",
            self.y, self.y_percent, self.scale
        )
    }
}

#[derive(Default)]
struct Registry {
    elements: HashMap<TargetId, HtmlElement>,
    transforms: HashMap<TargetId, Transform>,
    next: u32,
}

struct Inner {
    window: Window,
    jobs: RefCell<SlotMap<JobKey, Job>>,
    registry: RefCell<Registry>,
}

#[derive(Clone)]
pub struct WebScheduler {
    inner: Rc<Inner>,
}

impl WebScheduler {
    pub fn new() -> Option<Self> {
        Some(Self {
            inner: Rc::new(Inner {
                window: window()?,
                jobs: RefCell::new(SlotMap::with_key()),
                registry: RefCell::new(Registry::default()),
            }),
        })
    }

    pub fn allocate(&self, count: usize) -> Vec<TargetId> {
        let mut registry = self.inner.registry.borrow_mut();
        (0..count)
            .map(|_| {
                let id = TargetId(registry.next);
                registry.next += 1;
                id
            })
            .collect()
    }

    /// Binds `target` to a rendered element. Work aimed at an unbound target
    /// is dropped silently.
    pub fn register(&self, target: TargetId, element: HtmlElement) {
        self.inner
            .registry
            .borrow_mut()
            .elements
            .insert(target, element);
    }

    pub fn unregister(&self, target: TargetId) {
        let mut registry = self.inner.registry.borrow_mut();
        registry.elements.remove(&target);
        registry.transforms.remove(&target);
    }

    fn insert(&self, work: Work) -> JobKey {
        self.inner.jobs.borrow_mut().insert(Job {
            armed: None,
            closure: None,
            work: Some(work),
        })
    }
}

impl Scheduler for WebScheduler {
    fn after(&self, delay: Duration, task: Task) -> TaskHandle {
        let key = self.insert(Work::Task(task));
        arm_timeout(&self.inner, key, delay);
        handle_for(key)
    }

    fn next_frame(&self, task: Task) -> TaskHandle {
        let key = self.insert(Work::Task(task));
        let weak = Rc::downgrade(&self.inner);
        let closure = Closure::<dyn FnMut()>::new(move || fire(&weak, key));
        let armed = self
            .inner
            .window
            .request_animation_frame(closure.as_ref().unchecked_ref())
            .map(Armed::Frame);
        store_armed(&self.inner, key, armed.ok(), closure);
        handle_for(key)
    }

    fn animate(&self, tween: Tween, on_complete: Option<Task>) -> TaskHandle {
        for target in &tween.targets {
            if !tween.from.is_empty() {
                self.inner.write(*target, &tween.from, None);
                self.inner.reflow(*target);
            }
            let transition = transition_css(&tween, tween.delay);
            self.inner.write(*target, &tween.to, Some(&transition));
        }

        let first_pass = tween.delay.saturating_add(tween.duration);
        let key = self.insert(Work::Animation(Animation {
            tween,
            passes_done: 0,
            on_complete,
        }));
        arm_timeout(&self.inner, key, first_pass);
        handle_for(key)
    }

    fn set(&self, target: TargetId, props: &[(Prop, f64)]) {
        self.inner.write(target, props, None);
    }

    fn cancel(&self, handle: TaskHandle) {
        let key = JobKey::from(KeyData::from_ffi(handle.0));
        let Some(job) = self.inner.jobs.borrow_mut().remove(key) else {
            return;
        };
        match job.armed {
            Some(Armed::Timeout(id)) => self.inner.window.clear_timeout_with_handle(id),
            Some(Armed::Frame(id)) => {
                let _ = self.inner.window.cancel_animation_frame(id);
            }
            None => {}
        }
        if let Some(Work::Animation(animation)) = job.work {
            for target in &animation.tween.targets {
                self.inner.freeze(*target);
            }
        }
    }
}

impl Inner {
    fn element(&self, target: TargetId) -> Option<HtmlElement> {
        self.registry.borrow().elements.get(&target).cloned()
    }

    fn write(&self, target: TargetId, props: &[(Prop, f64)], transition: Option<&str>) {
        let Some(element) = self.element(target) else {
            return;
        };
        let style = element.style();
        let _ = style.set_property("transition", transition.unwrap_or("none"));

        let mut registry = self.registry.borrow_mut();
        let transform = registry.transforms.entry(target).or_default();
        let mut transform_changed = false;
        for &(prop, value) in props {
            match prop {
                Prop::Opacity => {
                    let _ = style.set_property("opacity", &value.to_string());
                }
                Prop::TranslateY => {
                    transform.y = value;
                    transform_changed = true;
                }
                Prop::TranslateYPercent => {
                    transform.y_percent = value;
                    transform_changed = true;
                }
                Prop::Scale => {
                    transform.scale = value;
                    transform_changed = true;
                }
                Prop::WidthPercent => {
                    let _ = style.set_property("width", &format!("{value}%"));
                }
                Prop::Glow => {
                    let _ = style.set_property("text-shadow", &glow_shadow(value));
                }
                Prop::WillChange => {
                    let hint = if value > 0.0 { "transform, opacity" } else { "auto" };
                    let _ = style.set_property("will-change", hint);
                }
            }
        }
        if transform_changed {
            let _ = style.set_property("transform", &transform.css());
        }
    }

    fn reflow(&self, target: TargetId) {
        if let Some(element) = self.element(target) {
            let _ = element.offset_width();
        }
    }

    /// Pins a transitioning element at its current computed values.
    fn freeze(&self, target: TargetId) {
        let Some(element) = self.element(target) else {
            return;
        };
        let Ok(Some(computed)) = self.window.get_computed_style(&element) else {
            return;
        };
        let current: Vec<(&str, String)> = FROZEN_PROPERTIES
            .iter()
            .filter_map(|name| Some((*name, computed.get_property_value(name).ok()?)))
            .collect();

        let style = element.style();
        let _ = style.set_property("transition", "none");
        for (name, value) in current {
            let _ = style.set_property(name, &value);
        }
    }
}

fn handle_for(key: JobKey) -> TaskHandle {
    TaskHandle(key.data().as_ffi())
}

fn millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

fn transition_css(tween: &Tween, delay: Duration) -> String {
    format!(
        "all {}ms {} {}ms",
        tween.duration.as_millis(),
        tween.ease.css(),
        delay.as_millis()
    )
}

fn glow_shadow(intensity: f64) -> String {
    if intensity <= 0.0 {
        return "none".to_string();
    }
    format!(
        "0 0 20px rgba(255,255,255,{:.3}), 0 0 40px rgba(216,210,255,{:.3})",
        0.8 * intensity,
        0.6 * intensity
    )
}

fn arm_timeout(inner: &Rc<Inner>, key: JobKey, delay: Duration) {
    let weak = Rc::downgrade(inner);
    let closure = Closure::<dyn FnMut()>::new(move || fire(&weak, key));
    let armed = inner
        .window
        .set_timeout_with_callback_and_timeout_and_arguments_0(
            closure.as_ref().unchecked_ref(),
            millis(delay),
        )
        .map(Armed::Timeout);
    store_armed(inner, key, armed.ok(), closure);
}

fn store_armed(inner: &Inner, key: JobKey, armed: Option<Armed>, closure: Closure<dyn FnMut()>) {
    let mut jobs = inner.jobs.borrow_mut();
    let Some(job) = jobs.get_mut(key) else {
        return;
    };
    if armed.is_none() {
        warn!("browser: failed to arm callback, dropping job");
        jobs.remove(key);
        return;
    }
    job.armed = armed;
    job.closure = Some(closure);
}

fn fire(inner: &Weak<Inner>, key: JobKey) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let work = {
        let mut jobs = inner.jobs.borrow_mut();
        let Some(job) = jobs.get_mut(key) else {
            return;
        };
        job.armed = None;
        job.work.take()
    };

    match work {
        Some(Work::Task(task)) => {
            let retired = inner.jobs.borrow_mut().remove(key);
            task();
            drop(retired);
        }
        Some(Work::Animation(animation)) => finish_pass(&inner, key, animation),
        None => {}
    }
}

fn finish_pass(inner: &Rc<Inner>, key: JobKey, mut animation: Animation) {
    animation.passes_done += 1;
    let done = match animation.tween.repeat {
        Repeat::Once => true,
        Repeat::Yoyo(extra) => animation.passes_done > extra,
        Repeat::Forever => false,
    };

    if done {
        let retired = inner.jobs.borrow_mut().remove(key);
        if let Some(on_complete) = animation.on_complete.take() {
            on_complete();
        }
        drop(retired);
        return;
    }

    let backward = animation.passes_done % 2 == 1;
    let props = if backward {
        animation.tween.from.clone()
    } else {
        animation.tween.to.clone()
    };
    let transition = transition_css(&animation.tween, Duration::ZERO);
    for target in &animation.tween.targets {
        inner.write(*target, &props, Some(&transition));
    }

    let duration = animation.tween.duration;
    if let Some(job) = inner.jobs.borrow_mut().get_mut(key) {
        job.work = Some(Work::Animation(animation));
    }
    arm_timeout(inner, key, duration);
}

pub fn prefers_reduced_motion() -> bool {
    window()
        .and_then(|w| {
            w.match_media("(prefers-reduced-motion: reduce)")
                .ok()
                .flatten()
        })
        .map(|mq| mq.matches())
        .unwrap_or(false)
}

const MOBILE_AGENTS: [&str; 8] = [
    "android",
    "webos",
    "iphone",
    "ipad",
    "ipod",
    "blackberry",
    "iemobile",
    "opera mini",
];

fn lookup(object: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(object, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

pub fn device_profile() -> DeviceProfile {
    let Some(win) = window() else {
        return DeviceProfile {
            pixel_ratio: 1.0,
            ..DeviceProfile::default()
        };
    };
    let navigator = win.navigator();
    let cores = navigator.hardware_concurrency();
    let agent = navigator.user_agent().unwrap_or_default().to_ascii_lowercase();

    let navigator: JsValue = navigator.into();
    let memory_gb = lookup(&navigator, "deviceMemory").and_then(|value| value.as_f64());
    let connection = lookup(&navigator, "connection")
        .and_then(|connection| lookup(&connection, "effectiveType"))
        .and_then(|value| value.as_string());

    DeviceProfile {
        cores: (cores >= 1.0).then_some(cores as u32),
        memory_gb,
        mobile: MOBILE_AGENTS.iter().any(|name| agent.contains(name)),
        connection,
        pixel_ratio: win.device_pixel_ratio(),
    }
}

pub fn viewport_size() -> (f64, f64) {
    let Some(win) = window() else {
        return (1280.0, 720.0);
    };

    let width = win
        .inner_width()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(1280.0);
    let height = win
        .inner_height()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(720.0);

    (width, height)
}

pub fn scroll_y() -> f64 {
    window()
        .and_then(|w| w.scroll_y().ok())
        .unwrap_or(0.0)
}

pub fn element_rect(element: &Element) -> ElementRect {
    let rect = element.get_bounding_client_rect();
    ElementRect::new(rect.top(), rect.left(), rect.width(), rect.height())
}
