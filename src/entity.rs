//! The abstract time-bounded node shared by every participant in a
//! timeline: tween groups, delays, nested timelines and player wrappers.
//!
//! Rust has no implementation inheritance, so the "Entity" contract from
//! §4.1 is split into a plain data struct, [`EntityCore`], embedded by
//! every concrete entity type, plus a small set of free functions that
//! implement the shared behavior (`attach`, `init`,
//! `get_next_marker_position`, `check_done_and_release`). Concrete types
//! implement the [`EntityNode`] trait, delegating to these functions from
//! their `core`/`core_mut` accessors.

use futures::channel::oneshot;

/// Outcome of [`check_done_and_release`]: whether the caller (the parent
/// timeline) should remove this entity from its running list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckOutcome {
    /// The entity reached `done_time` on this call (may have already been
    /// done before; this only reports the transition).
    pub just_done: bool,
    /// The entity reached `delayed_end_time` on this call and its
    /// release callback fired.
    pub just_released: bool,
    /// The parent should remove this entity from its running list now.
    pub should_remove: bool,
}

/// Shared time-bookkeeping state for every entity in the tree.
pub struct EntityCore {
    pub name: String,
    attached: bool,
    /// Entity delay, in milliseconds. Clamped to `>= 0` by [`init`].
    pub delay: i64,
    /// Entity release, in milliseconds. May be negative (see invariants).
    pub release: i64,
    /// Entity duration in milliseconds, or `-1` if not yet known (the
    /// `PlayerEntity` case, before its wrapped timeline reports a
    /// duration).
    pub duration: i64,

    pub start_time: i64,
    pub delayed_start_time: i64,
    pub done_time: i64,
    pub delayed_end_time: i64,
    pub end_time: i64,

    pub is_running: bool,
    pub start_registered: bool,
    pub end_registered: bool,
    pub done: bool,
    pub released: bool,

    release_cb: Option<oneshot::Sender<()>>,
}

impl EntityCore {
    pub fn new(name: impl Into<String>, delay: i64, release: i64, duration: i64) -> Self {
        EntityCore {
            name: name.into(),
            attached: false,
            delay,
            release,
            duration,
            start_time: 0,
            delayed_start_time: 0,
            done_time: 0,
            delayed_end_time: 0,
            end_time: 0,
            is_running: false,
            start_registered: false,
            end_registered: false,
            done: false,
            released: false,
            release_cb: None,
        }
    }

    /// Register the one-shot sender fired when this entity releases. If
    /// the entity has already released, the sender is fulfilled
    /// immediately.
    pub fn set_release_sender(&mut self, tx: oneshot::Sender<()>) {
        if self.released {
            let _ = tx.send(());
        } else {
            self.release_cb = Some(tx);
        }
    }

    /// At-most-once bind, recorded so a second `attach` call is a no-op.
    /// The actual "append to parent" side effect happens in the caller
    /// (the Rust equivalent of `parent.addEntity(this)`, since the parent
    /// is not reachable from here without a back-pointer).
    pub fn mark_attached(&mut self) -> bool {
        if self.attached {
            false
        } else {
            self.attached = true;
            true
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

/// Clamp `delay` to `>= 0` and derive the four time points from
/// `start_time`, `delay`, `duration` and `release`. If `duration < 0`
/// (unknown), only `start_time`/`delayed_start_time` are meaningful; the
/// rest are recomputed once the duration becomes known (the
/// `PlayerEntity` path).
pub fn init(core: &mut EntityCore, start_time: i64) {
    if core.delay < 0 {
        core.delay = 0;
    }
    core.start_time = start_time;
    core.delayed_start_time = start_time + core.delay;

    if core.duration < 0 {
        return;
    }

    // Clamp release so delayed_end_time >= delayed_start_time.
    if core.release < -core.duration {
        core.release = -core.duration;
    }

    core.done_time = core.delayed_start_time + core.duration;
    core.delayed_end_time = core.done_time + core.release;
    core.end_time = core.done_time.max(core.delayed_end_time);
}

/// §4.1 `getNextMarkerPosition` policy for a leaf entity (no children):
/// the next interesting time strictly past `time` in the traversal
/// direction, chosen from this entity's own time points.
pub fn get_next_marker_position(core: &EntityCore, time: i64, forward: bool) -> Option<i64> {
    if !forward {
        return first_past(&[core.done_time, core.delayed_start_time], time, forward);
    }

    if core.released {
        return first_past(&[core.delayed_start_time, core.done_time], time, forward);
    }

    if core.release <= 0 {
        first_past(
            &[
                core.delayed_start_time,
                core.delayed_end_time,
                core.done_time,
            ],
            time,
            forward,
        )
    } else {
        first_past(
            &[
                core.delayed_start_time,
                core.done_time,
                core.delayed_end_time,
            ],
            time,
            forward,
        )
    }
}

fn first_past(candidates: &[i64], time: i64, forward: bool) -> Option<i64> {
    candidates
        .iter()
        .copied()
        .find(|&c| if forward { c > time } else { c < time })
}

/// §4.1 `checkDoneAndRelease`. Returns what happened so the caller (the
/// parent timeline, via its running list) can act on it.
pub fn check_done_and_release(core: &mut EntityCore, time: i64, forward: bool) -> CheckOutcome {
    let mut just_done = false;
    let mut just_released = false;

    if time == core.done_time && !core.done {
        core.done = true;
        just_done = true;
    }

    let mut should_remove = false;
    if core.done {
        if forward && time == core.end_time {
            should_remove = true;
        } else if !forward && time == core.start_time {
            should_remove = true;
        }
    }

    if time == core.delayed_end_time && !core.released {
        core.released = true;
        just_released = true;
        if let Some(tx) = core.release_cb.take() {
            let _ = tx.send(());
        }
    }

    CheckOutcome {
        just_done,
        just_released,
        should_remove,
    }
}

/// The behavior shared by every participant placed in a timeline's
/// running list: tween groups, delays, nested timelines, player
/// entities.
pub trait EntityNode {
    fn core(&self) -> &EntityCore;
    fn core_mut(&mut self) -> &mut EntityCore;

    /// §4.1 `init`: clamp delay, derive the four time points. The default
    /// forwards to the free [`init`] function; containers whose duration
    /// is discovered later (nested timelines, player entities) call this
    /// a second time once it becomes known.
    fn init_entity(&mut self, start_time: i64) {
        init(self.core_mut(), start_time);
    }

    /// Advance this entity to `time` as part of a seek whose ultimate
    /// target is `target_time`, in direction `forward`. Implementations
    /// must call [`check_done_and_release`] themselves (the default
    /// leaf behavior, for entities with nothing else to render, is
    /// exactly that call).
    fn display_frame(&mut self, time: i64, target_time: i64, forward: bool) -> CheckOutcome;

    /// The next time of interest at or past `time` in `forward`
    /// direction, or `None` if this entity has nothing left to report.
    /// Containers (timelines, player entities) override this to also
    /// consider their children and their own marker index; the default
    /// here is the leaf policy from §4.1.
    fn get_next_marker_position(&self, time: i64, forward: bool) -> Option<i64> {
        get_next_marker_position(self.core(), time, forward)
    }
}

/// Shared ownership handle for entities stored in a running list or a
/// marker's start/end lists. See SPEC_FULL.md §3 for why shared
/// ownership (rather than raw back-pointers) is used here.
pub type EntityHandle = std::rc::Rc<std::cell::RefCell<dyn EntityNode>>;
