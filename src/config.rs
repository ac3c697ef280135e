use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MotionError, MotionResult};
use crate::reveal::TriggerPoint;

/// Duration every timing collapses to when the user prefers reduced motion.
/// Never zero, so elements still pass through their styled end state.
pub const REDUCED_MOTION_DURATION: Duration = Duration::from_millis(10);

const DEFAULT_LOADING_DURATION_MS: u64 = 3_000;
const DEFAULT_LOADING_GRACE_MS: u64 = 200;
const DEFAULT_CONTENT_SETTLE_MS: u64 = 100;
const DEFAULT_HEADLINE_DELAYS_MS: [u64; 3] = [300, 900, 1_500];
const DEFAULT_STAGGER_MS: u64 = 50;
const DEFAULT_GLYPH_DURATION_MS: u64 = 1_000;
const DEFAULT_GLYPH_RISE: f64 = 40.0;
const DEFAULT_GLOW_DURATION_MS: u64 = 500;
const DEFAULT_IMAGE_DELAY_MS: u64 = 2_200;
const DEFAULT_IMAGE_DURATION_MS: u64 = 1_500;
const DEFAULT_REVEAL_OFFSET: f64 = 100.0;
const DEFAULT_REVEAL_START: &str = "top bottom-=100";
const DEFAULT_REVEAL_END: &str = "top center";
const DEFAULT_REVEAL_OVERSHOOT: f64 = 1.7;
const DEFAULT_PANEL_DURATION_MS: u64 = 600;
const DEFAULT_PANEL_DISMISS_OFFSET: f64 = 120.0;
const DEFAULT_SPOTLIGHT_OPACITY: f64 = 0.6;

pub const MAX_PIXEL_RATIO: f64 = 1.5;
pub const LOW_END_PIXEL_RATIO: f64 = 0.5;
const LOW_END_MAX_CORES: u32 = 4;
const LOW_END_MEMORY_GB: f64 = 4.0;

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod millis_list {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[Duration], serializer: S) -> Result<S::Ok, S::Error> {
        values
            .iter()
            .map(|value| value.as_millis() as u64)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Duration>, D::Error> {
        Vec::<u64>::deserialize(deserializer)
            .map(|values| values.into_iter().map(Duration::from_millis).collect())
    }
}

/// Timing and pose constants for the intro, reveal, carousel and spotlight.
/// Durations are (de)serialized as whole milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MotionConfig {
    #[serde(with = "millis")]
    pub loading_duration: Duration,
    #[serde(with = "millis")]
    pub loading_grace: Duration,
    #[serde(with = "millis")]
    pub content_settle: Duration,
    #[serde(with = "millis_list")]
    pub headline_delays: Vec<Duration>,
    #[serde(with = "millis")]
    pub stagger: Duration,
    #[serde(with = "millis")]
    pub glyph_duration: Duration,
    pub glyph_rise: f64,
    #[serde(with = "millis")]
    pub glow_duration: Duration,
    #[serde(with = "millis")]
    pub image_delay: Duration,
    #[serde(with = "millis")]
    pub image_duration: Duration,
    pub reveal_offset: f64,
    pub reveal_start: String,
    pub reveal_end: String,
    pub reveal_overshoot: f64,
    #[serde(with = "millis")]
    pub panel_duration: Duration,
    pub panel_dismiss_offset: f64,
    pub spotlight_opacity: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            loading_duration: Duration::from_millis(DEFAULT_LOADING_DURATION_MS),
            loading_grace: Duration::from_millis(DEFAULT_LOADING_GRACE_MS),
            content_settle: Duration::from_millis(DEFAULT_CONTENT_SETTLE_MS),
            headline_delays: DEFAULT_HEADLINE_DELAYS_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
            stagger: Duration::from_millis(DEFAULT_STAGGER_MS),
            glyph_duration: Duration::from_millis(DEFAULT_GLYPH_DURATION_MS),
            glyph_rise: DEFAULT_GLYPH_RISE,
            glow_duration: Duration::from_millis(DEFAULT_GLOW_DURATION_MS),
            image_delay: Duration::from_millis(DEFAULT_IMAGE_DELAY_MS),
            image_duration: Duration::from_millis(DEFAULT_IMAGE_DURATION_MS),
            reveal_offset: DEFAULT_REVEAL_OFFSET,
            reveal_start: DEFAULT_REVEAL_START.to_string(),
            reveal_end: DEFAULT_REVEAL_END.to_string(),
            reveal_overshoot: DEFAULT_REVEAL_OVERSHOOT,
            panel_duration: Duration::from_millis(DEFAULT_PANEL_DURATION_MS),
            panel_dismiss_offset: DEFAULT_PANEL_DISMISS_OFFSET,
            spotlight_opacity: DEFAULT_SPOTLIGHT_OPACITY,
        }
    }
}

impl MotionConfig {
    /// Same sequence with every duration, delay and stagger interval
    /// collapsed to [`REDUCED_MOTION_DURATION`].
    pub fn reduced(&self) -> Self {
        let collapse = |_: Duration| REDUCED_MOTION_DURATION;
        Self {
            loading_duration: collapse(self.loading_duration),
            loading_grace: collapse(self.loading_grace),
            content_settle: collapse(self.content_settle),
            headline_delays: self.headline_delays.iter().copied().map(collapse).collect(),
            stagger: collapse(self.stagger),
            glyph_duration: collapse(self.glyph_duration),
            glow_duration: collapse(self.glow_duration),
            image_delay: collapse(self.image_delay),
            image_duration: collapse(self.image_duration),
            panel_duration: collapse(self.panel_duration),
            ..self.clone()
        }
    }

    pub fn for_motion_preference(reduce_motion: bool) -> Self {
        let config = Self::default();
        if reduce_motion {
            config.reduced()
        } else {
            config
        }
    }

    pub fn validate(&self) -> MotionResult<()> {
        for (name, value) in [
            ("glyphRise", self.glyph_rise),
            ("revealOffset", self.reveal_offset),
            ("revealOvershoot", self.reveal_overshoot),
            ("panelDismissOffset", self.panel_dismiss_offset),
        ] {
            if !value.is_finite() {
                return Err(MotionError::config(format!("{name} must be finite")));
            }
        }
        if !(0.0..=1.0).contains(&self.spotlight_opacity) {
            return Err(MotionError::config("spotlightOpacity must be within 0..=1"));
        }
        if self.reveal_overshoot < 0.0 {
            return Err(MotionError::config("revealOvershoot must not be negative"));
        }
        self.reveal_start.parse::<TriggerPoint>()?;
        self.reveal_end.parse::<TriggerPoint>()?;

        let last_line_start = self.content_settle.saturating_add(
            self.headline_delays
                .iter()
                .copied()
                .max()
                .unwrap_or_default(),
        );
        if self.image_delay < last_line_start {
            warn!(
                image_delay_ms = self.image_delay.as_millis() as u64,
                last_line_start_ms = last_line_start.as_millis() as u64,
                "image entrance starts before the last headline line"
            );
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowDirection {
    Forward,
    Reverse,
}

impl FlowDirection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Reverse => "reverse",
        }
    }
}

/// Rendering budget for the decorative background.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityTier {
    fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// What the host reports about the device. Unknown values stay `None`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DeviceProfile {
    pub cores: Option<u32>,
    pub memory_gb: Option<f64>,
    pub mobile: bool,
    /// Network Information `effectiveType`, e.g. `"4g"`.
    pub connection: Option<String>,
    pub pixel_ratio: f64,
}

impl DeviceProfile {
    pub fn is_low_end(&self) -> bool {
        self.cores.is_some_and(|cores| cores > 0 && cores <= LOW_END_MAX_CORES)
            || self
                .memory_gb
                .is_some_and(|memory| memory > 0.0 && memory < LOW_END_MEMORY_GB)
            || self.mobile
    }

    pub fn quality(&self) -> QualityTier {
        if self.is_low_end() {
            return QualityTier::Low;
        }
        match self.connection.as_deref() {
            Some("2g" | "slow-2g") => QualityTier::Low,
            Some("3g") => QualityTier::Medium,
            _ => QualityTier::High,
        }
    }
}

/// Device pixel ratio capped for `tier`. A missing or nonsensical ratio
/// counts as 1.
pub fn pixel_ratio_for(tier: QualityTier, device_ratio: f64) -> f64 {
    let base = if device_ratio.is_finite() && device_ratio > 0.0 {
        device_ratio
    } else {
        1.0
    };
    match tier {
        QualityTier::Low => base.min(LOW_END_PIXEL_RATIO),
        QualityTier::Medium | QualityTier::High => base.min(MAX_PIXEL_RATIO),
    }
}

/// Read-only parameters handed to the decorative plasma background.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundConfig {
    pub color: String,
    pub speed: f64,
    pub direction: FlowDirection,
    pub scale: f64,
    pub opacity: f64,
    pub mouse_interactive: bool,
    pub quality: QualityTier,
    pub max_pixel_ratio: f64,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            color: "#b7047e".to_string(),
            speed: 0.2,
            direction: FlowDirection::Forward,
            scale: 2.2,
            opacity: 1.0,
            mouse_interactive: false,
            quality: QualityTier::High,
            max_pixel_ratio: MAX_PIXEL_RATIO,
        }
    }
}

impl BackgroundConfig {
    /// Same parameters with quality and pixel ratio fitted to `device`.
    pub fn for_device(self, device: &DeviceProfile) -> Self {
        let quality = device.quality();
        Self {
            quality,
            max_pixel_ratio: pixel_ratio_for(quality, device.pixel_ratio),
            ..self
        }
    }

    /// Attribute pairs for the element hosting the effect.
    pub fn data_attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("data-color", self.color.clone()),
            ("data-speed", format!("{}", self.speed)),
            ("data-direction", self.direction.as_str().to_string()),
            ("data-scale", format!("{}", self.scale)),
            ("data-opacity", format!("{}", self.opacity)),
            ("data-interactive", self.mouse_interactive.to_string()),
            ("data-quality", self.quality.as_str().to_string()),
            ("data-max-pixel-ratio", format!("{}", self.max_pixel_ratio)),
        ]
    }
}
