//! # Player Configuration
//!
//! Per-session tuning for the playback engine. Every field has a serde
//! default so hosts can ship partial JSON documents:
//!
//! ```ignore
//! let config: PlayerConfig = serde_json::from_str(r#"{ "event_buffer": 128 }"#)?;
//! config.validate()?;
//! ```
//!
//! Use [`PlayerConfig::builder`] when constructing in code.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Shortest accepted position reporter tick.
pub const MIN_POSITION_INTERVAL: Duration = Duration::from_millis(50);
/// Longest accepted position reporter tick.
pub const MAX_POSITION_INTERVAL: Duration = Duration::from_millis(2_000);

/// What `start()` does when the session is `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoppedRestartPolicy {
    /// Always reject with an invalid-state error; the host must `reset()` and
    /// prepare again.
    Reject,
    /// Resume when the native layer reports it can restart after `stop()`,
    /// reject otherwise.
    #[default]
    NativeCapability,
}

/// How position samples publish negative (unknown) native values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegativePositionPolicy {
    /// Publish 0 and flag the duration as unknown.
    #[default]
    ClampToZero,
    /// Drop samples whose position is negative.
    Skip,
}

/// Playback session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Position reporter tick while playing.
    ///
    /// Default: 250 ms. Valid: 50 ms ..= 2 s.
    #[serde(default = "default_position_interval")]
    pub position_interval: Duration,

    /// Stopped → Started policy.
    ///
    /// Default: [`StoppedRestartPolicy::NativeCapability`].
    #[serde(default)]
    pub resume_from_stopped: StoppedRestartPolicy,

    /// Default: [`NegativePositionPolicy::ClampToZero`].
    #[serde(default)]
    pub negative_position: NegativePositionPolicy,

    /// Capacity of the broadcast event mirror. Slow subscribers lag beyond it.
    ///
    /// Default: 64.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,

    /// Name recorded on the prepare worker's tracing span.
    ///
    /// Default: `"player-prepare"`.
    #[serde(default = "default_prepare_thread_name")]
    pub prepare_thread_name: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position_interval: default_position_interval(),
            resume_from_stopped: StoppedRestartPolicy::default(),
            negative_position: NegativePositionPolicy::default(),
            event_buffer: default_event_buffer(),
            prepare_thread_name: default_prepare_thread_name(),
        }
    }
}

impl PlayerConfig {
    pub fn builder() -> PlayerConfigBuilder {
        PlayerConfigBuilder::default()
    }

    /// Tuned for progress bars that animate smoothly (100 ms ticks).
    pub fn smooth_progress() -> Self {
        Self {
            position_interval: Duration::from_millis(100),
            event_buffer: 256,
            ..Default::default()
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.position_interval < MIN_POSITION_INTERVAL
            || self.position_interval > MAX_POSITION_INTERVAL
        {
            return Err(Error::Config(format!(
                "position_interval must be between {}ms and {}ms, got {}ms",
                MIN_POSITION_INTERVAL.as_millis(),
                MAX_POSITION_INTERVAL.as_millis(),
                self.position_interval.as_millis()
            )));
        }

        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be > 0".to_string()));
        }

        if self.prepare_thread_name.trim().is_empty() {
            return Err(Error::Config(
                "prepare_thread_name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_position_interval() -> Duration {
    Duration::from_millis(250)
}

fn default_event_buffer() -> usize {
    64
}

fn default_prepare_thread_name() -> String {
    "player-prepare".to_string()
}

/// Builder for [`PlayerConfig`]. `build()` validates.
#[derive(Debug, Default)]
pub struct PlayerConfigBuilder {
    position_interval: Option<Duration>,
    resume_from_stopped: Option<StoppedRestartPolicy>,
    negative_position: Option<NegativePositionPolicy>,
    event_buffer: Option<usize>,
    prepare_thread_name: Option<String>,
}

impl PlayerConfigBuilder {
    pub fn position_interval(mut self, interval: Duration) -> Self {
        self.position_interval = Some(interval);
        self
    }

    pub fn resume_from_stopped(mut self, policy: StoppedRestartPolicy) -> Self {
        self.resume_from_stopped = Some(policy);
        self
    }

    pub fn negative_position(mut self, policy: NegativePositionPolicy) -> Self {
        self.negative_position = Some(policy);
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = Some(capacity);
        self
    }

    pub fn prepare_thread_name(mut self, name: impl Into<String>) -> Self {
        self.prepare_thread_name = Some(name.into());
        self
    }

    pub fn build(self) -> Result<PlayerConfig> {
        let defaults = PlayerConfig::default();
        let config = PlayerConfig {
            position_interval: self.position_interval.unwrap_or(defaults.position_interval),
            resume_from_stopped: self
                .resume_from_stopped
                .unwrap_or(defaults.resume_from_stopped),
            negative_position: self.negative_position.unwrap_or(defaults.negative_position),
            event_buffer: self.event_buffer.unwrap_or(defaults.event_buffer),
            prepare_thread_name: self
                .prepare_thread_name
                .unwrap_or(defaults.prepare_thread_name),
        };
        config.validate()?;
        Ok(config)
    }
}
