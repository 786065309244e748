#![deny(
    warnings,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! A recursive, bidirectional, marker-indexed timeline scheduler for
//! hierarchical DOM-oriented animations.
//!
//! This crate is the core engine behind a small timeline DSL — sequences,
//! parallel tracks, iterations, nested players — whose eventual effect is
//! to mutate attributes, styles, or transform components of DOM-like
//! targets (or invoke a plain callback) over time, driven by an external
//! tick source.
//!
//! The hard part, and the whole of this crate's scope, is the scheduler
//! itself: it *discovers* an animation's structure by executing user
//! instruction closures on demand, interleaves that discovery with frame
//! rendering so forward/backward seeking, variable speed, and cooperative
//! nesting all stay consistent, and composes nested alternating/looping
//! sub-players into one coherent timebase.
//!
//! Value interpolation, DOM read/write access and easing functions are
//! external collaborators, specified here as traits
//! ([`interpolate::Interpolator`], [`target::DomAdapter`],
//! [`easing::EaseMethod`]) with minimal built-in implementations so the
//! engine is runnable and testable headlessly; a real embedder (e.g. one
//! backed by `web-sys`) supplies its own [`target::DomAdapter`].
//!
//! # Example
//!
//! ```
//! use timeline_anim::{
//!     player::{ManualClock, Player, PlayArguments},
//!     config::EngineConfig,
//!     easing::EaseMethod,
//!     interpolate::default_chain,
//!     target::{ElementHandle, PropertyValue, Target, TestAdapter},
//!     timeline::Anim,
//!     tween::{AnimateParams, PropertySpec},
//! };
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let adapter = Rc::new(RefCell::new(TestAdapter::new()));
//! let el = ElementHandle(1);
//! adapter.borrow_mut().set_initial(
//!     el,
//!     "left",
//!     PropertyValue::NumberWithUnit(0.0, "px".into()),
//! );
//!
//! let player = Player::new(
//!     EngineConfig::default(),
//!     Some(adapter as Rc<RefCell<dyn timeline_anim::target::DomAdapter>>),
//!     default_chain(),
//!     Box::new(move |anim: Anim| {
//!         Box::pin(async move {
//!             anim.animate(AnimateParams {
//!                 target: Target::Element(el),
//!                 easing: Some(EaseMethod::Linear),
//!                 duration_ms: Some(16),
//!                 delay_ms: Some(0),
//!                 release_ms: Some(0),
//!                 elasticity: None,
//!                 properties: vec![PropertySpec::to(
//!                     "left",
//!                     PropertyValue::NumberWithUnit(16.0, "px".into()),
//!                 )],
//!             })
//!             .await;
//!         })
//!     }),
//! );
//!
//! let mut pool = futures::executor::LocalPool::new();
//! let fut = player.play(PlayArguments::new(Box::new(ManualClock::new())));
//! let final_time = pool.run_until(fut).unwrap();
//! assert_eq!(final_time, 16);
//! ```

pub mod async_pipe;
pub mod config;
pub mod delay;
pub mod easing;
pub mod entity;
pub mod error;
pub mod interpolate;
mod log;
pub mod marker;
pub mod player;
pub mod player_entity;
pub mod settings;
pub mod target;
#[cfg(any(test, doctest))]
pub mod test_utils;
pub mod timeline;
pub mod tween;

pub use config::EngineConfig;
pub use easing::EaseMethod;
pub use entity::{EntityCore, EntityNode};
pub use error::{EngineError, EngineResult};
pub use player::{ManualClock, PlayArguments, Player, TickSource};
pub use player_entity::PlayParams;
pub use settings::{ResolvedSettings, SettingsOverrides};
pub use target::{AnimationType, DomAdapter, ElementHandle, PropertyValue, Target};
pub use timeline::Anim;
pub use tween::{AnimateParams, PropertySpec};
