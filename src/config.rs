use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::audio::CaptureConfig;
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Where the interview backend lives and how to authenticate against it.
/// The token is opaque to this service and attached to every call.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub base_url: String,
    pub auth_token: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    /// Pause before acting on a progression verdict, in milliseconds
    pub display_delay_ms: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            display_delay_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CaptureSettings {
    pub channels: u16,
    pub frame_duration_ms: u64,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        let defaults = CaptureConfig::default();
        Self {
            channels: defaults.channels,
            frame_duration_ms: defaults.frame_duration_ms,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            // PREPSTAGE__BACKEND__AUTH_TOKEN etc. override the file
            .add_source(config::Environment::with_prefix("PREPSTAGE").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            channels: self.capture.channels,
            frame_duration_ms: self.capture.frame_duration_ms,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            display_delay: Duration::from_millis(self.session.display_delay_ms),
            capture: self.capture_config(),
        }
    }
}
