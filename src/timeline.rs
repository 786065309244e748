//! The container entity that runs a user instruction closure, records a
//! marker index of child start/end events, and seeks forward/backward by
//! walking that index. This is the core of the scheduler (§4.3).

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use futures::FutureExt;

use crate::async_pipe::AsyncPipe;
use crate::config::EngineConfig;
use crate::delay::Delay;
use crate::entity::{CheckOutcome, EntityCore, EntityHandle, EntityNode};
use crate::error::{EngineError, EngineResult};
use crate::interpolate::Interpolator;
use crate::log::engine_warn;
use crate::marker::MarkerList;
use crate::player_entity::{PlayParams, PlayerEntityNode};
use crate::settings::{ResolvedSettings, SettingsLayer, SettingsOverrides};
use crate::target::{DomAdapter, ElementHandle, Target, TargetFn};
use crate::tween::{AnimateParams, PropertySpec, TweenGroup};

/// Shared, per-[`crate::player::Player`] context threaded down to every
/// timeline: the executor/async-pipe, engine configuration, and the
/// default DOM adapter plus interpolator chain every `animate()` call
/// resolves against unless overridden.
pub struct EngineContext {
    pub config: EngineConfig,
    pub pipe: Rc<AsyncPipe>,
    pub adapter: Option<Rc<RefCell<dyn DomAdapter>>>,
    pub interpolators: Rc<Vec<Box<dyn Interpolator>>>,
}

/// A user instruction closure: the body of a `group`/`play`/root
/// timeline. Receives an [`Anim`] handle as its DSL surface and may
/// itself be asynchronous (`await`ing nested `group`/`play` calls).
pub type InstructionFn = Box<dyn FnOnce(Anim) -> LocalBoxFuture<'static, ()>>;

pub type TimelineHandle = Rc<RefCell<TimelineNode>>;

/// §3.6: `adjustDuration(ms, speed) = round(ms / speed / FRAME_MS) * FRAME_MS`.
pub fn adjust_duration(ms: i64, speed: f64, frame_ms: i64) -> i64 {
    if speed <= 0.0 || frame_ms <= 0 {
        return ms;
    }
    let frames = (ms as f64 / speed / frame_ms as f64).round();
    (frames as i64) * frame_ms
}

pub struct TimelineNode {
    core: EntityCore,
    self_weak: Weak<RefCell<TimelineNode>>,
    ctx: Rc<EngineContext>,
    settings: Rc<SettingsLayer>,

    markers: MarkerList,
    running: Vec<EntityHandle>,

    current_time: i64,
    last_target_time: i64,
    last_target_forward: bool,
    move_target: i64,
    end_time: Option<i64>,

    instruction: Option<InstructionFn>,
    fn_called: bool,
    fn_complete: Rc<std::cell::Cell<bool>>,

    release_tx: Option<oneshot::Sender<()>>,
    reported_duration: Option<i64>,
}

impl TimelineNode {
    pub(crate) fn new(
        name: &str,
        ctx: Rc<EngineContext>,
        settings: Rc<SettingsLayer>,
        delay: i64,
        release: i64,
        instruction: InstructionFn,
    ) -> TimelineHandle {
        Rc::new_cyclic(|weak| {
            RefCell::new(TimelineNode {
                core: EntityCore::new(name, delay, release, -1),
                self_weak: weak.clone(),
                ctx,
                settings,
                markers: MarkerList::new(),
                running: Vec::new(),
                current_time: -1,
                last_target_time: 0,
                last_target_forward: true,
                move_target: -1,
                end_time: None,
                instruction: Some(instruction),
                fn_called: false,
                fn_complete: Rc::new(std::cell::Cell::new(false)),
                release_tx: None,
                reported_duration: None,
            })
        })
    }

    /// Construct the root timeline driving a [`crate::player::Player`].
    pub fn new_root(ctx: Rc<EngineContext>, instruction: InstructionFn) -> TimelineHandle {
        TimelineNode::new("root", ctx, SettingsLayer::root(), 0, 0, instruction)
    }

    pub fn current_time(&self) -> i64 {
        self.current_time
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    pub fn resolved_settings(&self) -> ResolvedSettings {
        self.settings.resolved(&self.ctx.config.defaults)
    }

    fn handle(&self) -> TimelineHandle {
        self.self_weak.upgrade().expect("timeline outlived its own handle")
    }

    fn take_release_receiver(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.core.released {
            let _ = tx.send(());
        } else {
            self.release_tx = Some(tx);
        }
        rx
    }

    pub fn reported_duration(&self) -> Option<i64> {
        self.reported_duration
    }

    /// Shared engine context of this timeline, for callers (namely
    /// [`PlayerEntityNode`](crate::player_entity::PlayerEntityNode)) that
    /// need the async pipe or configuration of a wrapped sub-timeline they
    /// do not otherwise hold a reference to.
    pub(crate) fn ctx_handle(&self) -> Rc<EngineContext> {
        Rc::clone(&self.ctx)
    }

    pub fn is_done(&self) -> bool {
        self.core.done
    }

    /// Force this timeline to re-populate its running list at its
    /// current time, used by [`PlayerEntityNode`] on a direction reversal
    /// before the wrapped timeline's duration is known (§4.4).
    pub fn reload_at_current_time(&mut self) {
        let time = self.current_time;
        self.load_entities(time, self.last_target_forward);
    }

    fn spawn_instruction(&mut self) {
        let Some(instruction) = self.instruction.take() else {
            engine_warn!(name = %self.core.name, "instruction closure spawned more than once");
            return;
        };
        let anim = Anim {
            timeline: self.handle(),
        };
        let fut = instruction(anim);
        let fn_complete = Rc::clone(&self.fn_complete);
        self.ctx.pipe.spawn(async move {
            fut.await;
            fn_complete.set(true);
        });
        self.ctx.pipe.bump();
    }

    fn add_entity(&mut self, entity: EntityHandle) {
        let time = self.current_time;
        // §4.1 `attach`: at-most-once bind. In this tree the "parent" side
        // effect (`parent.addEntity(this)`) is this very call, so binding
        // and registration happen together rather than as two separate
        // steps.
        entity.borrow_mut().core_mut().mark_attached();
        let already_registered = entity.borrow().core().start_registered;
        if !already_registered {
            entity.borrow_mut().init_entity(time);
            entity.borrow_mut().core_mut().start_registered = true;
            self.markers
                .get_or_create(time)
                .start_entities
                .push(Rc::clone(&entity));
            self.ctx.pipe.bump();
        }
        entity.borrow_mut().core_mut().is_running = true;
        self.running.push(Rc::clone(&entity));

        let (t, tt, f) = (self.current_time, self.last_target_time, self.last_target_forward);
        entity.borrow_mut().display_frame(t, tt, f);
    }

    fn remove_entity(&mut self, entity: &EntityHandle, forward: bool) {
        if forward {
            let end_registered = entity.borrow().core().end_registered;
            if !end_registered {
                entity.borrow_mut().core_mut().end_registered = true;
                self.markers
                    .get_or_create(self.current_time)
                    .end_entities
                    .push(Rc::clone(entity));
                self.ctx.pipe.bump();
            }
        }
        entity.borrow_mut().core_mut().is_running = false;
        self.running.retain(|e| !Rc::ptr_eq(e, entity));
    }

    fn load_entities(&mut self, time: i64, forward: bool) {
        let (starts, ends) = if forward {
            (self.markers.ordered_starts(time), self.markers.ordered_ends(time))
        } else {
            (self.markers.ordered_ends(time), self.markers.ordered_starts(time))
        };
        for e in starts {
            if !e.borrow().core().is_running {
                self.add_entity(e);
            }
        }
        for e in ends {
            let running = e.borrow().core().is_running;
            if running {
                self.remove_entity(&e, forward);
            }
        }
    }

    fn check_state(&mut self, time: i64) -> CheckOutcome {
        let mut just_done = false;
        let mut just_released = false;
        let mut should_remove = false;

        if self.fn_complete.get() && self.last_target_forward {
            let all_released = self.running.iter().all(|e| e.borrow().core().released);
            let count = self.running.len();

            if all_released && !self.core.released {
                self.core.released = true;
                just_released = true;
                if let Some(tx) = self.release_tx.take() {
                    let _ = tx.send(());
                }
                self.ctx.pipe.bump();
            }

            if count == 0 && !self.core.done {
                self.core.done = true;
                just_done = true;
                self.reported_duration = Some(time);
                self.ctx.pipe.bump();
            }

            if self.core.released && self.core.done {
                should_remove = true;
            }
        }

        CheckOutcome {
            just_done,
            just_released,
            should_remove,
        }
    }

    /// §4.3 `move`: seek the timeline to `time_target`, driving structural
    /// discovery (spawned instruction closures) and frame rendering to
    /// convergence via the async pipe.
    pub fn move_to(&mut self, time_target: i64) -> EngineResult<()> {
        if time_target == self.current_time {
            return Ok(());
        }
        let forward = time_target > self.current_time;
        self.move_target = time_target;

        loop {
            if self.current_time == self.move_target {
                break;
            }

            let next_target;
            if self.current_time < 0 {
                next_target = self.core.start_time.max(0);
            } else {
                if forward != self.last_target_forward && self.markers.get(self.current_time).is_some() {
                    self.display_frame_internal(self.current_time, self.last_target_time, self.last_target_forward);
                    self.ctx.pipe.exhaust()?;
                }
                match self.get_next_marker_position(self.current_time, forward) {
                    Some(nt) if nt != self.current_time => next_target = nt,
                    _ => {
                        self.end_time = Some(self.current_time);
                        self.move_target = self.current_time;
                        break;
                    }
                }
            }

            let clamped = if forward {
                next_target.min(time_target)
            } else {
                next_target.max(time_target)
            };
            self.display_frame_internal(clamped, time_target, forward);
            self.ctx.pipe.exhaust()?;
            if let Some(err) = self.ctx.pipe.take_error() {
                return Err(err);
            }
        }
        Ok(())
    }

    fn display_frame_internal(&mut self, time: i64, target_time: i64, forward: bool) -> CheckOutcome {
        self.current_time = time;
        self.last_target_time = target_time;
        self.last_target_forward = forward;

        if !self.fn_called {
            self.fn_called = true;
            self.spawn_instruction();
        } else {
            let children: Vec<_> = self.running.clone();
            let mut to_remove = Vec::new();
            for child in children {
                let outcome = child.borrow_mut().display_frame(time, target_time, forward);
                if outcome.should_remove {
                    to_remove.push(child);
                }
            }
            for child in to_remove {
                self.remove_entity(&child, forward);
            }
            self.load_entities(time, forward);
        }

        self.check_state(time)
    }
}

impl EntityNode for TimelineNode {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn display_frame(&mut self, time: i64, target_time: i64, forward: bool) -> CheckOutcome {
        self.display_frame_internal(time, target_time, forward)
    }

    fn get_next_marker_position(&self, time: i64, forward: bool) -> Option<i64> {
        if (time - self.current_time).abs() == self.ctx.config.frame_ms {
            return Some(time);
        }

        let mut candidates: Vec<i64> = self
            .running
            .iter()
            .filter_map(|c| c.borrow().get_next_marker_position(time, forward))
            .collect();
        if let Some(own) = self.markers.next_marker_time(time, forward) {
            candidates.push(own);
        }
        if candidates.is_empty() {
            return None;
        }
        Some(if forward {
            candidates.into_iter().min().unwrap()
        } else {
            candidates.into_iter().max().unwrap()
        })
    }
}

/// The DSL surface passed into every instruction closure: the Rust
/// equivalent of `this` inside the source's async instruction functions.
#[derive(Clone)]
pub struct Anim {
    timeline: TimelineHandle,
}

impl Anim {
    /// `animate(params)`: attach a [`TweenGroup`] built from the
    /// non-control keys of `params`, returning a future that resolves
    /// when the group releases.
    pub fn animate(&self, params: AnimateParams) -> impl std::future::Future<Output = ()> {
        let settings = self.timeline.borrow().resolved_settings();
        let (adapter, interpolators, frame_ms) = {
            let tl = self.timeline.borrow();
            (tl.ctx.adapter.clone(), Rc::clone(&tl.ctx.interpolators), tl.ctx.config.frame_ms)
        };

        let group = TweenGroup::new(params, &settings, adapter, &interpolators, frame_ms);
        let handle: EntityHandle = Rc::new(RefCell::new(group));
        let rx = {
            let mut tl = self.timeline.borrow_mut();
            tl.add_entity(Rc::clone(&handle));
            // Take a release receiver through the generic EntityCore
            // mechanism: TweenGroup fires its own release callback via
            // `check_done_and_release`, registered right after attach.
            let (tx, rx) = oneshot::channel();
            handle.borrow_mut().core_mut().set_release_sender(tx);
            rx
        };
        async move {
            let _ = rx.await;
        }
    }

    /// `set(params)`: `animate({ ...params, duration: 0 })`.
    pub fn set(&self, mut params: AnimateParams) -> impl std::future::Future<Output = ()> {
        params.duration_ms = Some(0);
        self.animate(params)
    }

    /// `delay(ms)`: attach a pure time-filler entity.
    pub fn delay(&self, ms: i64) -> impl std::future::Future<Output = ()> {
        let quantized = {
            let tl = self.timeline.borrow();
            adjust_duration(ms, tl.resolved_settings().speed, tl.ctx.config.frame_ms)
        };
        let delay = Delay::new(quantized);
        let handle: EntityHandle = Rc::new(RefCell::new(delay));
        let rx = {
            let mut tl = self.timeline.borrow_mut();
            tl.add_entity(Rc::clone(&handle));
            let (tx, rx) = oneshot::channel();
            handle.borrow_mut().core_mut().set_release_sender(tx);
            rx
        };
        async move {
            let _ = rx.await;
        }
    }

    /// `group([name], instructions)`: attach a sub-timeline sharing this
    /// timeline's absolute time axis, returning a future that resolves
    /// when every entity it transitively registered has released.
    pub fn group(
        &self,
        name: impl Into<String>,
        instruction: InstructionFn,
    ) -> impl std::future::Future<Output = ()> {
        let (ctx, settings) = {
            let tl = self.timeline.borrow();
            (Rc::clone(&tl.ctx), Rc::clone(&tl.settings))
        };
        let name = name.into();
        let child = TimelineNode::new(&name, ctx, settings, 0, 0, instruction);
        let rx = {
            let mut borrowed = child.borrow_mut();
            borrowed.take_release_receiver()
        };
        {
            let mut tl = self.timeline.borrow_mut();
            let handle: EntityHandle = child;
            tl.add_entity(handle);
        }
        async move {
            let _ = rx.await;
        }
    }

    /// `sequence(blocks...)`: run each block's instructions one after the
    /// other inside a single group, each awaiting the previous.
    pub fn sequence(&self, blocks: Vec<InstructionFn>) -> impl std::future::Future<Output = ()> {
        self.group("sequence", Box::new(move |anim: Anim| {
            async move {
                for block in blocks {
                    let fut = block(anim.clone());
                    fut.await;
                }
            }
            .boxed_local()
        }))
    }

    /// `parallelize(tracks...)`: run every track concurrently inside a
    /// single group, releasing once all tracks have released.
    pub fn parallelize(&self, tracks: Vec<InstructionFn>) -> impl std::future::Future<Output = ()> {
        self.group("parallelize", Box::new(move |anim: Anim| {
            async move {
                let futs: Vec<_> = tracks.into_iter().map(|t| t(anim.clone())).collect();
                futures::future::join_all(futs).await;
            }
            .boxed_local()
        }))
    }

    /// `repeat(times, body)`: run `body` sequentially `times` times.
    pub fn repeat(
        &self,
        times: u32,
        body: impl Fn() -> InstructionFn + 'static,
    ) -> impl std::future::Future<Output = ()> {
        let blocks = (0..times).map(|_| body()).collect();
        self.sequence(blocks)
    }

    /// `iterate(targets, body)`: run `body` sequentially once per target,
    /// with `body` receiving the target's selector name.
    pub fn iterate(
        &self,
        targets: Vec<String>,
        body: impl Fn(String) -> InstructionFn + 'static,
    ) -> impl std::future::Future<Output = ()> {
        let blocks = targets.into_iter().map(body).collect();
        self.sequence(blocks)
    }

    /// `play([params], instructions)`: attach a [`PlayerEntityNode`]
    /// wrapping a fresh sub-timeline with its own local time axis.
    pub fn play(
        &self,
        params: PlayParams,
        instruction: InstructionFn,
    ) -> impl std::future::Future<Output = ()> {
        let ctx = self.timeline.borrow().ctx_handle();
        let wrapped = TimelineNode::new("play", Rc::clone(&ctx), SettingsLayer::root(), 0, 0, instruction);
        let node = PlayerEntityNode::new(params, wrapped, Rc::clone(&ctx));
        let handle: EntityHandle = Rc::new(RefCell::new(node));
        let rx = {
            let mut tl = self.timeline.borrow_mut();
            tl.add_entity(Rc::clone(&handle));
            let (tx, rx) = oneshot::channel();
            handle.borrow_mut().core_mut().set_release_sender(tx);
            rx
        };
        async move {
            let _ = rx.await;
        }
    }

    /// `defaults(overrides)`: push a new settings scope; everything this
    /// closure subsequently attaches (directly; not retroactively)
    /// inherits from it.
    pub fn defaults(&self, overrides: SettingsOverrides) {
        let mut tl = self.timeline.borrow_mut();
        tl.settings = SettingsLayer::child(&tl.settings, overrides);
    }

    /// `select(name)`: resolve one element through the configured DOM
    /// adapter.
    pub fn select(&self, name: &str) -> Option<ElementHandle> {
        self.select_all(name).into_iter().next()
    }

    /// `select_all(name)`: resolve every element matching `name`.
    pub fn select_all(&self, name: &str) -> Vec<ElementHandle> {
        let tl = self.timeline.borrow();
        match &tl.ctx.adapter {
            Some(adapter) => adapter.borrow().resolve(name),
            None => Vec::new(),
        }
    }

    /// `random(min, max)`: a uniformly-distributed value in `[min, max)`.
    pub fn random(&self, min: f64, max: f64) -> f64 {
        use rand::Rng;
        rand::rng().random_range(min..max)
    }

    /// Build a function target from a plain closure, for callers driving
    /// non-DOM state (e.g. a test probe or a Rust-native widget).
    pub fn function_target(f: impl FnMut(&str, crate::target::PropertyValue) + 'static) -> Target {
        let cell: TargetFn = Rc::new(RefCell::new(f));
        Target::Function(cell)
    }

    pub fn current_time(&self) -> i64 {
        self.timeline.borrow().current_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::ManualClock;
    use crate::target::{PropertyValue, TestAdapter};

    fn root_ctx(adapter: Option<Rc<RefCell<dyn DomAdapter>>>) -> Rc<EngineContext> {
        Rc::new(EngineContext {
            config: EngineConfig::default(),
            pipe: Rc::new(AsyncPipe::new(EngineConfig::default().max_async_iterations)),
            adapter,
            interpolators: Rc::new(crate::interpolate::default_chain()),
        })
    }

    #[test]
    fn single_tween_reaches_completion() {
        let adapter = Rc::new(RefCell::new(TestAdapter::new()));
        let el = ElementHandle(1);
        adapter
            .borrow_mut()
            .set_initial(el, "left", PropertyValue::NumberWithUnit(0.0, "px".into()));
        let ctx = root_ctx(Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>));

        let root = TimelineNode::new_root(
            ctx,
            Box::new(move |anim: Anim| {
                async move {
                    anim.animate(AnimateParams {
                        target: Target::Element(el),
                        easing: Some(crate::easing::EaseMethod::Linear),
                        duration_ms: Some(16),
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

        let mut clock = ManualClock::new();
        for _ in 0..4 {
            root.borrow_mut().move_to(clock.tick()).unwrap();
        }

        assert_eq!(
            adapter.borrow().get(el, "left"),
            Some(&PropertyValue::NumberWithUnit(16.0, "px".into()))
        );
        assert!(root.borrow().is_done());
    }

    #[test]
    fn idempotent_move_to_same_time_is_a_no_op() {
        let ctx = root_ctx(None);
        let root = TimelineNode::new_root(ctx, Box::new(|_anim: Anim| async move {}.boxed_local()));
        root.borrow_mut().move_to(16).unwrap();
        let before = root.borrow().current_time();
        root.borrow_mut().move_to(16).unwrap();
        assert_eq!(root.borrow().current_time(), before);
    }

    #[test]
    fn quantization_rounds_to_frame_multiples() {
        assert_eq!(adjust_duration(100, 1.0, 16), 96);
        assert_eq!(adjust_duration(1000, 1.0, 16), 1008);
        assert_eq!(adjust_duration(100, 2.0, 16), 48);
    }
}
