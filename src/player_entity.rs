//! The container wrapper for a nested sub-timeline with playback
//! semantics: `times`/`alternate`/`speed`/`back_speed`/`delay`/`release`
//! (§4.4). A `PlayerEntityNode` is what `Anim::play` attaches; it owns a
//! fresh [`TimelineNode`] running on its own local time axis and maps the
//! parent's absolute time into that axis on every `display_frame`.

use std::cell::Cell;
use std::rc::Rc;

use crate::entity::{self, check_done_and_release, init, CheckOutcome, EntityCore, EntityNode};
use crate::timeline::{EngineContext, TimelineHandle};

/// Construction parameters for `Anim::play([params], instructions)` (§4.4
/// attributes). Distinct from [`crate::player::PlayArguments`], which
/// configures the *top-level* [`crate::player::Player`] driver instead.
#[derive(Debug, Clone, Copy)]
pub struct PlayParams {
    /// Number of forward(+backward) cycles. `0` degenerates this entity
    /// to a zero-duration [`crate::delay::Delay`] (§8 boundary behavior).
    pub times: u32,
    /// Whether each cycle plays a backward leg after the forward one.
    pub alternate: bool,
    /// Forward-leg speed multiplier of the wrapped timeline.
    pub speed: f64,
    /// Backward-leg speed multiplier of the wrapped timeline.
    pub back_speed: f64,
    /// Entity delay, in milliseconds, before the wrapper starts.
    pub delay_ms: i64,
    /// Entity release, in milliseconds, relative to this wrapper's
    /// `done_time`.
    pub release_ms: i64,
}

impl Default for PlayParams {
    fn default() -> Self {
        PlayParams {
            times: 1,
            alternate: false,
            speed: 1.0,
            back_speed: 1.0,
            delay_ms: 0,
            release_ms: 0,
        }
    }
}

/// §4.4 `PlayerEntity`: wraps a sub-[`TimelineNode`] with loop/alternate/
/// speed semantics. Its own `duration` starts at `-1` and is derived once
/// the wrapped timeline reports its first completion.
pub struct PlayerEntityNode {
    core: EntityCore,
    wrapped: TimelineHandle,
    params: PlayParams,
    ctx: Rc<EngineContext>,

    /// Forward-leg length in the wrapped timeline's own local time, once
    /// known (`trunc(tl_duration / speed)`).
    d1: i64,
    /// Backward-leg length, once known (`0` if not alternating).
    d2: i64,
    /// `d1 + d2`, once the wrapped timeline's duration is known.
    cycle_length: Option<i64>,
    last_forward: Cell<bool>,
}

impl PlayerEntityNode {
    pub fn new(params: PlayParams, wrapped: TimelineHandle, ctx: Rc<EngineContext>) -> Self {
        // §8 boundary behavior: times=0 is a zero-duration Delay.
        let duration = if params.times == 0 { 0 } else { -1 };
        PlayerEntityNode {
            core: EntityCore::new("play", params.delay_ms, params.release_ms, duration),
            wrapped,
            params,
            ctx,
            d1: 0,
            d2: 0,
            cycle_length: None,
            last_forward: Cell::new(true),
        }
    }

    /// Once the wrapped timeline reports its total duration, derive this
    /// entity's own duration and re-run `init` to finalize its time
    /// points (§4.4).
    fn maybe_finalize_duration(&mut self) {
        if self.core.duration >= 0 {
            return;
        }
        let Some(tl_duration) = self.wrapped.borrow().reported_duration() else {
            return;
        };

        let speed = if self.params.speed > 0.0 { self.params.speed } else { 1.0 };
        let d1 = (tl_duration as f64 / speed).trunc() as i64;
        let d2 = if self.params.alternate {
            let back_speed = if self.params.back_speed > 0.0 {
                self.params.back_speed
            } else {
                1.0
            };
            (tl_duration as f64 / back_speed).trunc() as i64
        } else {
            0
        };

        self.d1 = d1;
        self.d2 = d2;
        self.cycle_length = Some(d1 + d2);
        self.core.duration = (d1 + d2) * self.params.times as i64;

        let start_time = self.core.start_time;
        init(&mut self.core, start_time);
    }

    /// Split `time` into `(t, child_forward)`: `t` is the position within
    /// the current cycle (§4.4's `relTime mod cycleLength`, with the
    /// `t == 0` edge case folded in), and `child_forward` is the
    /// direction the *wrapped* timeline should be understood to move in
    /// — the backward leg inverts the outer direction.
    fn leg_position(&self, time: i64, outer_forward: bool) -> (i64, bool) {
        let rel = (time - self.core.delayed_start_time).max(0);
        match self.cycle_length {
            None => (rel, outer_forward),
            Some(cycle_length) if cycle_length > 0 => {
                let mut t = rel % cycle_length;
                if t == 0 && time != self.core.delayed_start_time {
                    t = cycle_length;
                }
                let forward = if t > self.d1 { !outer_forward } else { outer_forward };
                (t, forward)
            }
            Some(_) => (0, outer_forward),
        }
    }

    /// §4.4 child seek mapping: translate `time` (this entity's position
    /// on the parent's time axis) into the wrapped timeline's own local
    /// seek target.
    fn map_to_child_seek(&self, time: i64) -> i64 {
        let (t, _) = self.leg_position(time, true);
        // Before the wrapped timeline's duration is known there is only
        // one indefinite forward leg; `d1`/`cycle_length` aren't
        // meaningful yet, so the leg test below must not apply.
        if self.cycle_length.is_none() || t <= self.d1 {
            (t as f64 * self.params.speed).round() as i64
        } else {
            let cycle_length = self.cycle_length.unwrap_or(t);
            ((cycle_length - t) as f64 * self.params.back_speed).round() as i64
        }
    }

    /// Inverse of [`Self::map_to_child_seek`] for one particular leg,
    /// used to translate a marker position reported by the wrapped
    /// timeline back onto the parent's time axis, for
    /// `get_next_marker_position`'s reconciliation step (§4.4).
    fn unmap_from_child(&self, child_time: i64, time: i64) -> i64 {
        let (t, _) = self.leg_position(time, true);
        let cycle_base = time - t;
        if self.cycle_length.is_none() || t <= self.d1 {
            let speed = if self.params.speed > 0.0 { self.params.speed } else { 1.0 };
            cycle_base + (child_time as f64 / speed).round() as i64
        } else {
            let back_speed = if self.params.back_speed > 0.0 {
                self.params.back_speed
            } else {
                1.0
            };
            let cycle_length = self.cycle_length.unwrap_or(t);
            cycle_base + cycle_length - (child_time as f64 / back_speed).round() as i64
        }
    }
}

impl EntityNode for PlayerEntityNode {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn display_frame(&mut self, time: i64, _target_time: i64, forward: bool) -> CheckOutcome {
        if self.params.times == 0 {
            return check_done_and_release(&mut self.core, time, forward);
        }

        // Direction reversal before the first cycle completes: re-load
        // the wrapped timeline's running list at its current position
        // (§4.4) instead of relying on its own forward-only bookkeeping.
        if forward != self.last_forward.get() && self.core.duration < 0 {
            self.wrapped.borrow_mut().reload_at_current_time();
        }
        self.last_forward.set(forward);

        let child_seek = self.map_to_child_seek(time);
        if let Err(err) = self.wrapped.borrow_mut().move_to(child_seek) {
            self.ctx.pipe.mark_error(err);
        }

        self.maybe_finalize_duration();

        check_done_and_release(&mut self.core, time, forward)
    }

    fn get_next_marker_position(&self, time: i64, forward: bool) -> Option<i64> {
        if self.params.times == 0 {
            return entity::get_next_marker_position(&self.core, time, forward);
        }

        let own = entity::get_next_marker_position(&self.core, time, forward);

        let (_t, child_forward) = self.leg_position(time, forward);
        let child_seek = self.map_to_child_seek(time);
        let child_candidate = self
            .wrapped
            .borrow()
            .get_next_marker_position(child_seek, child_forward)
            .map(|child_time| self.unmap_from_child(child_time, time));

        match (own, child_candidate) {
            (Some(a), Some(b)) => Some(if forward { a.min(b) } else { a.max(b) }),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}
