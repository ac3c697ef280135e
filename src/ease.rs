use serde::{Deserialize, Serialize};

/// Easing curves used by the page's timelines.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    InOutQuad,
    InOutCubic,
    OutQuart,
    InOutSine,
    BackOut(f64),
}

impl Ease {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InOutSine => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
            Self::BackOut(overshoot) => {
                if t <= 0.0 || t >= 1.0 {
                    return t;
                }
                let c3 = overshoot + 1.0;
                let u = t - 1.0;
                1.0 + c3 * u.powi(3) + overshoot * u.powi(2)
            }
        }
    }

    /// CSS timing function with the same shape, for transitions driven by
    /// the browser.
    pub fn css(self) -> String {
        match self {
            Self::Linear => "linear".to_string(),
            Self::InOutQuad => "cubic-bezier(0.45, 0, 0.55, 1)".to_string(),
            Self::InOutCubic => "cubic-bezier(0.65, 0, 0.35, 1)".to_string(),
            Self::OutQuart => "cubic-bezier(0.25, 1, 0.5, 1)".to_string(),
            Self::InOutSine => "cubic-bezier(0.37, 0, 0.63, 1)".to_string(),
            Self::BackOut(overshoot) => {
                let y1 = 1.0 + overshoot * 0.32;
                format!("cubic-bezier(0.34, {y1:.2}, 0.64, 1)")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 6] = [
        Ease::Linear,
        Ease::InOutQuad,
        Ease::InOutCubic,
        Ease::OutQuart,
        Ease::InOutSine,
        Ease::BackOut(1.7),
    ];

    #[test]
    fn endpoints_are_stable() {
        for ease in ALL {
            assert_eq!(ease.apply(0.0), 0.0, "{ease:?} at 0");
            assert_eq!(ease.apply(1.0), 1.0, "{ease:?} at 1");
        }
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        for ease in ALL {
            assert_eq!(ease.apply(-3.0), 0.0);
            assert_eq!(ease.apply(7.5), 1.0);
        }
    }

    #[test]
    fn back_out_overshoots_before_settling() {
        let peak = (1..100)
            .map(|step| Ease::BackOut(1.7).apply(f64::from(step) / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn out_quart_decelerates() {
        let early = Ease::OutQuart.apply(0.25) - Ease::OutQuart.apply(0.0);
        let late = Ease::OutQuart.apply(1.0) - Ease::OutQuart.apply(0.75);
        assert!(early > late);
    }

    #[test]
    fn css_names_a_timing_function() {
        assert_eq!(Ease::Linear.css(), "linear");
        assert!(Ease::BackOut(1.7).css().starts_with("cubic-bezier("));
    }
}
