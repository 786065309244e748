//! The top-level driver (§4.5): converts an external tick source into
//! `Timeline::move_to` calls and exposes the public playback surface
//! (`play`/`pause`/`stop`/`move_to`/`duration`/`position`/`is_playing`).
//!
//! The source drives this off the browser's `requestAnimationFrame`; here
//! that external collaborator is a small [`TickSource`] trait so a caller
//! can supply a real frame clock, a fixed-step real-time clock, or (as
//! used throughout this crate's own test suite) [`ManualClock`], which
//! never actually waits.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::interpolate::Interpolator;
use crate::target::DomAdapter;
use crate::timeline::{EngineContext, InstructionFn, TimelineHandle, TimelineNode};

/// External tick source consumed by [`Player::play`]: the Rust analogue
/// of the source's `raf(cb)` callback, modeled as an async "wait for the
/// next frame" call so the paint loop can simply `.await` it instead of
/// juggling callback continuations.
pub trait TickSource {
    /// Resolve once the next frame should be rendered.
    fn next_tick(&mut self) -> LocalBoxFuture<'_, ()>;
}

/// A [`TickSource`] that resolves immediately, for driving a [`Player`]
/// to completion synchronously in tests without a real clock or event
/// loop. Also usable directly via [`ManualClock::tick`] wherever a test
/// wants to step a [`crate::timeline::TimelineNode`] by hand, one frame
/// at a time, without going through [`Player`] at all (see the
/// `timeline` and `player_entity` test modules).
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualClock {
    next: i64,
}

impl ManualClock {
    pub fn new() -> Self {
        ManualClock { next: 0 }
    }

    /// Return the next frame-aligned time (`0, FRAME_MS, 2*FRAME_MS, ...`)
    /// and advance.
    pub fn tick(&mut self) -> i64 {
        let t = self.next;
        self.next += crate::config::FRAME_MS;
        t
    }
}

impl TickSource for ManualClock {
    fn next_tick(&mut self) -> LocalBoxFuture<'_, ()> {
        futures::future::ready(()).boxed_local()
    }
}

/// §6 `PlayArguments`: configuration for one [`Player::play`] call.
pub struct PlayArguments {
    /// Invoked with the new position every frame the position actually
    /// changed.
    pub onupdate: Option<Box<dyn FnMut(i64)>>,
    /// Playback direction. Defaults to `true` (forward).
    pub forward: bool,
    /// Playback speed multiplier. Defaults to `1.0`.
    pub speed: f64,
    /// The frame source driving the paint loop.
    pub tick_source: Box<dyn TickSource>,
}

impl PlayArguments {
    /// `forward = true`, `speed = 1.0`, no `onupdate` callback.
    pub fn new(tick_source: Box<dyn TickSource>) -> Self {
        PlayArguments {
            onupdate: None,
            forward: true,
            speed: 1.0,
            tick_source,
        }
    }
}

/// §4.5 `Player`: the top-level driver wrapping a root
/// [`crate::timeline::TimelineNode`].
///
/// Cheaply [`Clone`]: every field is an `Rc`-backed handle or a `Copy`
/// value, so cloning a `Player` gives another handle to the same engine
/// instance (the same root timeline, async pipe, and play-token), not an
/// independent copy — matching the source, where `pause`/`stop` called
/// from anywhere must invalidate the one in-flight paint loop.
#[derive(Clone)]
pub struct Player {
    ctx: Rc<EngineContext>,
    timeline: TimelineHandle,
    play_id: Rc<Cell<u64>>,
    next_play_id: Rc<Cell<u64>>,
    length: Rc<Cell<Option<i64>>>,
    max_duration_ms: i64,
}

impl Player {
    /// Build a player driving a fresh root timeline running `instruction`.
    pub fn new(
        config: EngineConfig,
        adapter: Option<Rc<RefCell<dyn DomAdapter>>>,
        interpolators: Vec<Box<dyn Interpolator>>,
        instruction: InstructionFn,
    ) -> Self {
        let max_duration_ms = config.max_duration_ms;
        let pipe = Rc::new(crate::async_pipe::AsyncPipe::new(config.max_async_iterations));
        let ctx = Rc::new(EngineContext {
            config,
            pipe,
            adapter,
            interpolators: Rc::new(interpolators),
        });
        let timeline = TimelineNode::new_root(Rc::clone(&ctx), instruction);
        Player {
            ctx,
            timeline,
            play_id: Rc::new(Cell::new(0)),
            next_play_id: Rc::new(Cell::new(0)),
            length: Rc::new(Cell::new(None)),
            max_duration_ms,
        }
    }

    /// Current position on the root timeline's time axis, in milliseconds.
    pub fn position(&self) -> i64 {
        self.timeline.borrow().current_time()
    }

    /// Whether a `play()` loop is currently in flight (not `pause`d or
    /// `stop`ped since it started).
    pub fn is_playing(&self) -> bool {
        self.play_id.get() != 0
    }

    /// `move(t)`: seek the root timeline directly, bypassing any paint
    /// loop. Does not itself invalidate an in-flight `play()`; callers
    /// combining the two should `pause()` first.
    pub fn move_to(&self, time: i64) -> EngineResult<i64> {
        self.timeline.borrow_mut().move_to(time)?;
        Ok(self.position())
    }

    /// Invalidate the current play token, causing any in-flight paint
    /// loop to resolve on its next iteration without scheduling another.
    pub fn pause(&self) {
        self.play_id.set(0);
    }

    /// `pause()` then seek to `0`.
    pub fn stop(&self) -> EngineResult<i64> {
        self.pause();
        self.move_to(0)
    }

    /// Memoized total duration: runs an internal ticker from `0` in
    /// `FRAME_MS` steps (capped at `max_duration_ms`) until the timeline
    /// reports an `end_time`, then restores the original position.
    pub fn duration(&self) -> EngineResult<i64> {
        if let Some(length) = self.length.get() {
            return Ok(length);
        }

        let saved = self.position();
        let frame_ms = self.ctx.config.frame_ms;
        let max_ticks = (self.max_duration_ms / frame_ms).max(1);

        let mut tick = 0i64;
        let length = loop {
            let t = tick * frame_ms;
            self.timeline.borrow_mut().move_to(t)?;
            let current = self.timeline.borrow().current_time();
            if self.timeline.borrow().end_time() == Some(current) {
                break current;
            }
            tick += 1;
            if tick > max_ticks {
                break current;
            }
        };

        self.length.set(Some(length));
        self.timeline.borrow_mut().move_to(saved)?;
        Ok(length)
    }

    /// `play(args) -> Promise<finalTime>`: drive the root timeline one
    /// frame at a time until it completes (or `forward = false` and the
    /// position reaches `0`), awaiting `args.tick_source` between frames.
    /// Returns the position at which the loop stopped, including early
    /// exit from a concurrent `pause()`/`stop()`.
    pub fn play(&self, args: PlayArguments) -> impl std::future::Future<Output = EngineResult<i64>> {
        let my_id = self.next_play_id.get().wrapping_add(1).max(1);
        self.next_play_id.set(my_id);
        self.play_id.set(my_id);

        let timeline = Rc::clone(&self.timeline);
        let play_id = Rc::clone(&self.play_id);
        let frame_ms = self.ctx.config.frame_ms;

        let PlayArguments {
            mut onupdate,
            forward,
            speed,
            mut tick_source,
        } = args;

        async move {
            loop {
                let t1 = timeline.borrow().current_time();
                let delta = ((frame_ms as f64) * speed).round() as i64;
                // The source computes `t2 = t1 ± FRAME_MS*speed` directly;
                // `t1 < 0` (not yet started) is special-cased the same way
                // `Timeline::move_to` special-cases its own first step, so
                // the very first frame lands exactly on the timeline's own
                // start rather than one frame past it.
                let t2 = if t1 < 0 {
                    0
                } else if forward {
                    t1 + delta
                } else {
                    (t1 - delta).max(0)
                };

                timeline.borrow_mut().move_to(t2)?;

                if play_id.get() != my_id {
                    return Ok(timeline.borrow().current_time());
                }

                let now = timeline.borrow().current_time();
                if now != t1 {
                    if let Some(cb) = onupdate.as_mut() {
                        cb(now);
                    }
                }

                let end = timeline.borrow().end_time();
                if forward && end == Some(now) {
                    return Ok(now);
                }
                if !forward && now == 0 {
                    return Ok(now);
                }

                tick_source.next_tick().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::EaseMethod;
    use crate::target::{ElementHandle, PropertyValue, Target, TestAdapter};
    use crate::timeline::Anim;
    use crate::tween::{AnimateParams, PropertySpec};

    fn player_with_single_tween(duration_ms: i64) -> (Player, Rc<RefCell<TestAdapter>>, ElementHandle) {
        let adapter = Rc::new(RefCell::new(TestAdapter::new()));
        let el = ElementHandle(1);
        adapter
            .borrow_mut()
            .set_initial(el, "left", PropertyValue::NumberWithUnit(0.0, "px".into()));

        let player = Player::new(
            EngineConfig::default(),
            Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
            crate::interpolate::default_chain(),
            Box::new(move |anim: Anim| {
                async move {
                    anim.animate(AnimateParams {
                        target: Target::Element(el),
                        easing: Some(EaseMethod::Linear),
                        duration_ms: Some(duration_ms),
                        delay_ms: Some(0),
                        release_ms: Some(0),
                        elasticity: None,
                        properties: vec![PropertySpec::to(
                            "left",
                            PropertyValue::NumberWithUnit(16.0, "px".into()),
                        )],
                    })
                    .await;
                }
                .boxed_local()
            }),
        );
        (player, adapter, el)
    }

    #[test]
    fn move_to_drives_tween_to_completion() {
        let (player, adapter, el) = player_with_single_tween(16);
        player.move_to(16).unwrap();
        assert_eq!(
            adapter.borrow().get(el, "left"),
            Some(&PropertyValue::NumberWithUnit(16.0, "px".into()))
        );
    }

    #[test]
    fn duration_is_memoized_and_restores_position() {
        let (player, _adapter, _el) = player_with_single_tween(32);
        player.move_to(16).unwrap();
        let d = player.duration().unwrap();
        assert_eq!(d, 32);
        assert_eq!(player.position(), 16);
        // Memoized: calling again doesn't re-run the ticker (would still
        // return 32 even if it did, but this at least covers the cache
        // path not panicking or diverging).
        assert_eq!(player.duration().unwrap(), 32);
    }

    #[test]
    fn pause_invalidates_an_in_flight_play_loop() {
        let (player, _adapter, _el) = player_with_single_tween(64);
        let fut = player.play(PlayArguments::new(Box::new(ManualClock::new())));
        player.pause();
        let mut pool = futures::executor::LocalPool::new();
        let result = pool.run_until(fut).unwrap();
        // Paused before any frame elapsed in wall-clock terms, but the
        // token check happens only after the first move_to; either way
        // the loop must terminate rather than spin forever.
        let _ = result;
        assert!(!player.is_playing());
    }

    #[test]
    fn play_runs_to_completion_with_a_manual_clock() {
        let (player, adapter, el) = player_with_single_tween(16);
        let fut = player.play(PlayArguments::new(Box::new(ManualClock::new())));
        let mut pool = futures::executor::LocalPool::new();
        let final_time = pool.run_until(fut).unwrap();
        assert_eq!(final_time, 16);
        assert_eq!(
            adapter.borrow().get(el, "left"),
            Some(&PropertyValue::NumberWithUnit(16.0, "px".into()))
        );
    }

    #[test]
    fn stop_resets_position_to_zero() {
        let (player, _adapter, _el) = player_with_single_tween(16);
        player.move_to(16).unwrap();
        assert_eq!(player.stop().unwrap(), 0);
        assert_eq!(player.position(), 0);
        assert!(!player.is_playing());
    }
}
