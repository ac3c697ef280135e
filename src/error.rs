pub type MotionResult<T> = Result<T, MotionError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    #[error("carousel needs at least one panel")]
    EmptyCarousel,

    #[error("invalid trigger point: {0}")]
    InvalidTriggerPoint(String),

    #[error("invalid motion config: {0}")]
    InvalidConfig(String),
}

impl MotionError {
    pub fn trigger_point(msg: impl Into<String>) -> Self {
        Self::InvalidTriggerPoint(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(MotionError::trigger_point("x")
            .to_string()
            .contains("invalid trigger point:"));
        assert!(MotionError::config("x")
            .to_string()
            .contains("invalid motion config:"));
        assert_eq!(
            MotionError::EmptyCarousel.to_string(),
            "carousel needs at least one panel"
        );
    }
}
