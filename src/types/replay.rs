//! Replay playback types

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
        }
    }
}

/// Allowed playback speeds, slowest to fastest. All values are exact binary
/// fractions, so equality lookup is safe.
pub const SPEED_LADDER: [f64; 6] = [0.25, 0.5, 1.0, 2.0, 4.0, 8.0];

/// Next ladder speed, wrapping from 8x back to 0.25x. Off-ladder input snaps
/// to 1x.
pub fn next_speed(current: f64) -> f64 {
    match SPEED_LADDER.iter().position(|&s| s == current) {
        Some(i) => SPEED_LADDER[(i + 1) % SPEED_LADDER.len()],
        None => 1.0,
    }
}

/// Previous ladder speed, wrapping from 0.25x up to 8x.
pub fn prev_speed(current: f64) -> f64 {
    match SPEED_LADDER.iter().position(|&s| s == current) {
        Some(i) => SPEED_LADDER[(i + SPEED_LADDER.len() - 1) % SPEED_LADDER.len()],
        None => 1.0,
    }
}

/// Usable speed for arbitrary input: ladder values pass through, anything
/// else (zero, negative, NaN, off-ladder) snaps to 1x. A zero or negative
/// speed would otherwise produce an unrepresentable tick interval.
pub fn snap_speed(speed: f64) -> f64 {
    if SPEED_LADDER.contains(&speed) {
        speed
    } else {
        1.0
    }
}

/// Playback tuning
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// Tick interval at 1x speed
    pub base_interval: Duration,

    /// Initial speed; off-ladder values snap to 1x at construction
    pub speed: f64,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(1000),
            speed: 1.0,
        }
    }
}

impl ReplayOptions {
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = snap_speed(speed);
        self
    }
}

/// Snapshot of a controller's playback position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayStatus {
    pub state: PlaybackState,

    #[serde(rename = "currentIndex")]
    pub current_index: usize,

    #[serde(rename = "totalEvents")]
    pub total_events: usize,

    pub speed: f64,

    /// Normalized position in [0, 1]; 0 when the timeline is empty
    pub progress: f64,
}
