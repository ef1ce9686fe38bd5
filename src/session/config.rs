use std::time::Duration;

use crate::audio::CaptureConfig;

/// Configuration for an interview session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Pause between showing the assistant's reply and acting on the
    /// verdict, long enough to read the reply without stalling the session
    pub display_delay: Duration,

    /// Capture settings for answer recording
    pub capture: CaptureConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            display_delay: Duration::from_secs(2),
            capture: CaptureConfig::default(),
        }
    }
}
