//! Scoped settings overrides.
//!
//! The source implements `defaults()` via a JS prototype chain: each
//! override object points at the previous one, and unset fields fall
//! through. Per the Design Notes' suggested replacement, this is modeled
//! here as an explicit parent-pointer chain of [`SettingsLayer`]s, with
//! every field optional; [`SettingsLayer::resolve`] walks the chain and
//! finally falls back to the fixed [`crate::config::DefaultSettings`]
//! record.

use std::rc::Rc;

use crate::config::DefaultSettings;
use crate::easing::EaseMethod;

/// One `defaults()` scope. Unspecified fields are `None` and fall
/// through to `parent`, and ultimately to the engine's default record.
#[derive(Clone)]
pub struct SettingsLayer {
    parent: Option<Rc<SettingsLayer>>,
    pub easing: Option<EaseMethod>,
    pub duration_ms: Option<i64>,
    pub delay_ms: Option<i64>,
    pub release_ms: Option<i64>,
    pub elasticity: Option<f64>,
    pub speed: Option<f64>,
}

impl SettingsLayer {
    /// The root of every chain: no overrides, no parent.
    pub fn root() -> Rc<SettingsLayer> {
        Rc::new(SettingsLayer {
            parent: None,
            easing: None,
            duration_ms: None,
            delay_ms: None,
            release_ms: None,
            elasticity: None,
            speed: None,
        })
    }

    /// Create a new scope, inheriting from `parent`, with the given
    /// overrides (any `None` field inherits).
    pub fn child(parent: &Rc<SettingsLayer>, overrides: SettingsOverrides) -> Rc<SettingsLayer> {
        Rc::new(SettingsLayer {
            parent: Some(Rc::clone(parent)),
            easing: overrides.easing,
            duration_ms: overrides.duration_ms,
            delay_ms: overrides.delay_ms,
            release_ms: overrides.release_ms,
            elasticity: overrides.elasticity,
            speed: overrides.speed,
        })
    }

    fn lookup<T: Copy>(&self, field: impl Fn(&SettingsLayer) -> Option<T> + Copy) -> Option<T> {
        if let Some(v) = field(self) {
            return Some(v);
        }
        self.parent.as_ref().and_then(|p| p.lookup(field))
    }

    pub fn resolved(&self, fallback: &DefaultSettings) -> ResolvedSettings {
        ResolvedSettings {
            easing: self.lookup(|s| s.easing).unwrap_or(fallback.easing),
            duration_ms: self.lookup(|s| s.duration_ms).unwrap_or(fallback.duration_ms),
            delay_ms: self.lookup(|s| s.delay_ms).unwrap_or(fallback.delay_ms),
            release_ms: self.lookup(|s| s.release_ms).unwrap_or(fallback.release_ms),
            elasticity: self.lookup(|s| s.elasticity).unwrap_or(fallback.elasticity),
            speed: self.lookup(|s| s.speed).unwrap_or(fallback.speed),
        }
    }
}

/// Overrides passed to `Anim::defaults()`; any field left `None` keeps
/// inheriting from the enclosing scope.
#[derive(Default, Clone, Copy)]
pub struct SettingsOverrides {
    pub easing: Option<EaseMethod>,
    pub duration_ms: Option<i64>,
    pub delay_ms: Option<i64>,
    pub release_ms: Option<i64>,
    pub elasticity: Option<f64>,
    pub speed: Option<f64>,
}

/// Fully resolved settings, as used by an individual `animate()` call.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedSettings {
    pub easing: EaseMethod,
    pub duration_ms: i64,
    pub delay_ms: i64,
    pub release_ms: i64,
    pub elasticity: f64,
    pub speed: f64,
}
