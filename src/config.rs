//! Engine-wide constants and the overridable default settings record.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::easing::EaseMethod;

/// Length, in milliseconds, of a single frame at unit speed.
///
/// Every timing value fed into [`crate::timeline::adjust_duration`] is
/// quantized to a multiple of this constant.
pub const FRAME_MS: i64 = 16;

/// Default cap on [`Player`](crate::player::Player)'s internal duration
/// probe, in milliseconds.
pub const DEFAULT_MAX_DURATION_MS: i64 = 600_000;

/// Hard bound on `exhaust_async_pipe` iterations before giving up with
/// [`crate::error::EngineError::AsyncPipeExhausted`].
pub const MAX_ASYNC: u32 = 100;

/// The fixed default record every timeline's settings chain bottoms out
/// at. Individual timelines override fields of this record via
/// [`crate::settings::SettingsLayer`]; unspecified fields fall back here.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DefaultSettings {
    /// Default easing, applied when an `animate()` call doesn't specify one.
    pub easing: EaseMethod,
    /// Default tween duration in milliseconds.
    pub duration_ms: i64,
    /// Default entity delay in milliseconds.
    pub delay_ms: i64,
    /// Default entity release in milliseconds.
    pub release_ms: i64,
    /// Default elasticity factor passed to elastic easing functions.
    pub elasticity: f64,
    /// Default playback speed multiplier.
    pub speed: f64,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        DefaultSettings {
            easing: EaseMethod::EaseOutElastic,
            duration_ms: 1000,
            delay_ms: 0,
            release_ms: 0,
            elasticity: 0.5,
            speed: 1.0,
        }
    }
}

/// Top-level, overridable engine configuration.
///
/// A single [`EngineConfig`] is owned by a [`crate::player::Player`] and
/// shared (by value, it is `Copy`) down to every timeline it drives.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Frame quantization unit, in milliseconds. Defaults to [`FRAME_MS`].
    pub frame_ms: i64,
    /// Bound on async-pipe drain iterations. Defaults to [`MAX_ASYNC`].
    pub max_async_iterations: u32,
    /// Cap on `Player::duration`'s internal probing ticker, in
    /// milliseconds. Defaults to [`DEFAULT_MAX_DURATION_MS`].
    pub max_duration_ms: i64,
    /// Fallback settings record. Defaults to [`DefaultSettings::default`].
    pub defaults: DefaultSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            frame_ms: FRAME_MS,
            max_async_iterations: MAX_ASYNC,
            max_duration_ms: DEFAULT_MAX_DURATION_MS,
            defaults: DefaultSettings::default(),
        }
    }
}
