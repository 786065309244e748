//! End-to-end scenarios exercising the whole `Player` -> `Timeline` ->
//! entity stack against a test `DomAdapter`, covering each numbered
//! scenario from spec §8 (`FRAME_MS = 16`).

use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;

use timeline_anim::easing::EaseMethod;
use timeline_anim::interpolate::default_chain;
use timeline_anim::player::{ManualClock, PlayArguments, Player};
use timeline_anim::player_entity::PlayParams;
use timeline_anim::target::{DomAdapter, ElementHandle, PropertyValue, Target, TestAdapter};
use timeline_anim::timeline::Anim;
use timeline_anim::tween::{AnimateParams, PropertySpec};
use timeline_anim::EngineConfig;

fn adapter_with(el: ElementHandle, prop: &str, value: f64, unit: &str) -> Rc<RefCell<TestAdapter>> {
    let adapter = Rc::new(RefCell::new(TestAdapter::new()));
    adapter
        .borrow_mut()
        .set_initial(el, prop, PropertyValue::NumberWithUnit(value, unit.into()));
    adapter
}

fn px(v: f64) -> PropertyValue {
    PropertyValue::NumberWithUnit(v, "px".into())
}

/// Scenario 1: a single 16ms tween from 0px to 16px commits two frames
/// (progression 0 then 1) and leaves the element at its final value.
#[test]
fn scenario_1_single_tween() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.animate(AnimateParams {
                    target: Target::Element(el),
                    easing: Some(EaseMethod::Linear),
                    duration_ms: Some(16),
                    delay_ms: Some(0),
                    release_ms: Some(0),
                    elasticity: None,
                    properties: vec![PropertySpec::to("left", px(16.0))],
                })
                .await;
            }
            .boxed_local()
        }),
    );

    player.move_to(16).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(16.0)));
    assert_eq!(player.duration().unwrap(), 16);
}

/// Scenario 2: sequence of two 16ms tweens totals 32ms; at t=16 the first
/// has released and the second has begun.
#[test]
fn scenario_2_sequence_totals_the_sum() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.sequence(vec![
                    Box::new(move |anim: Anim| {
                        async move {
                            anim.animate(AnimateParams {
                                target: Target::Element(el),
                                easing: Some(EaseMethod::Linear),
                                duration_ms: Some(16),
                                delay_ms: Some(0),
                                release_ms: Some(0),
                                elasticity: None,
                                properties: vec![PropertySpec::to("left", px(16.0))],
                            })
                            .await;
                        }
                        .boxed_local()
                    }),
                    Box::new(move |anim: Anim| {
                        async move {
                            anim.animate(AnimateParams {
                                target: Target::Element(el),
                                easing: Some(EaseMethod::Linear),
                                duration_ms: Some(16),
                                delay_ms: Some(0),
                                release_ms: Some(0),
                                elasticity: None,
                                properties: vec![PropertySpec::to("left", px(32.0))],
                            })
                            .await;
                        }
                        .boxed_local()
                    }),
                ])
                .await;
            }
            .boxed_local()
        }),
    );

    assert_eq!(player.duration().unwrap(), 32);
    player.move_to(16).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(16.0)));
    player.move_to(32).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(32.0)));
}

/// Scenario 3: two parallel tracks of 32ms and 16ms; duration is the max
/// (32), and at t=16 the shorter track is done but the group is not.
#[test]
fn scenario_3_parallel_takes_the_max() {
    let el_a = ElementHandle(1);
    let el_b = ElementHandle(2);
    let adapter = Rc::new(RefCell::new(TestAdapter::new()));
    adapter.borrow_mut().set_initial(el_a, "left", px(0.0));
    adapter.borrow_mut().set_initial(el_b, "top", px(0.0));

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.parallelize(vec![
                    Box::new(move |anim: Anim| {
                        async move {
                            anim.animate(AnimateParams {
                                target: Target::Element(el_a),
                                easing: Some(EaseMethod::Linear),
                                duration_ms: Some(32),
                                delay_ms: Some(0),
                                release_ms: Some(0),
                                elasticity: None,
                                properties: vec![PropertySpec::to("left", px(32.0))],
                            })
                            .await;
                        }
                        .boxed_local()
                    }),
                    Box::new(move |anim: Anim| {
                        async move {
                            anim.animate(AnimateParams {
                                target: Target::Element(el_b),
                                easing: Some(EaseMethod::Linear),
                                duration_ms: Some(16),
                                delay_ms: Some(0),
                                release_ms: Some(0),
                                elasticity: None,
                                properties: vec![PropertySpec::to("top", px(16.0))],
                            })
                            .await;
                        }
                        .boxed_local()
                    }),
                ])
                .await;
            }
            .boxed_local()
        }),
    );

    assert_eq!(player.duration().unwrap(), 32);
    player.move_to(16).unwrap();
    assert_eq!(adapter.borrow().get(el_b, "top"), Some(&px(16.0)));
    assert_eq!(adapter.borrow().get(el_a, "left"), Some(&px(16.0)));
}

/// Scenario 4: an alternating player wrapping a 32ms timeline with
/// `times=2, alternate=true, speed=1, back_speed=2` derives
/// `d1=32, d2=16, cycle_length=48, duration=96`, and running the wrapped
/// timeline's inner tween to completion drives the wrapped target all the
/// way to its `to` value on the forward leg.
#[test]
fn scenario_4_alternating_player_derives_duration() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.play(
                    PlayParams {
                        times: 2,
                        alternate: true,
                        speed: 1.0,
                        back_speed: 2.0,
                        delay_ms: 0,
                        release_ms: 0,
                    },
                    Box::new(move |anim: Anim| {
                        async move {
                            anim.animate(AnimateParams {
                                target: Target::Element(el),
                                easing: Some(EaseMethod::Linear),
                                duration_ms: Some(32),
                                delay_ms: Some(0),
                                release_ms: Some(0),
                                elasticity: None,
                                properties: vec![PropertySpec::to("left", px(32.0))],
                            })
                            .await;
                        }
                        .boxed_local()
                    }),
                )
                .await;
            }
            .boxed_local()
        }),
    );

    // `duration()` walks the whole timeline forward from 0 before
    // anything else has sought it: (d1 + d2) * times = (32 + 16) * 2 = 96.
    assert_eq!(player.duration().unwrap(), 96);

    // Drive to the end of the forward leg of the first cycle: the wrapped
    // tween should have reached its `to` value.
    player.move_to(32).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(32.0)));
}

/// Scenario 5: backward seek across a reversal renders the marker at the
/// reversal point exactly once on each pass, leaving the element at its
/// forward value for that time.
#[test]
fn scenario_5_backward_seek_across_reversal() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.animate(AnimateParams {
                    target: Target::Element(el),
                    easing: Some(EaseMethod::Linear),
                    duration_ms: Some(32),
                    delay_ms: Some(0),
                    release_ms: Some(0),
                    elasticity: None,
                    properties: vec![PropertySpec::to("left", px(32.0))],
                })
                .await;
            }
            .boxed_local()
        }),
    );

    player.move_to(32).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(32.0)));

    player.move_to(16).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(16.0)));

    player.move_to(32).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(32.0)));
}

/// Scenario 6: a `group` whose instruction body awaits a resolved
/// microtask before attaching a tween must still have that tween fire on
/// the very same `move_to` call, thanks to the async-pipe drain between
/// structural mutations and frame rendering.
#[test]
fn scenario_6_async_instruction_settles_within_one_move() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.group(
                    "delayed-attach",
                    Box::new(move |anim: Anim| {
                        async move {
                            // Yield once before attaching anything: the
                            // async pipe must drain this before the
                            // current frame is considered settled.
                            futures::future::ready(()).await;
                            anim.animate(AnimateParams {
                                target: Target::Element(el),
                                easing: Some(EaseMethod::Linear),
                                duration_ms: Some(16),
                                delay_ms: Some(0),
                                release_ms: Some(0),
                                elasticity: None,
                                properties: vec![PropertySpec::to("left", px(16.0))],
                            })
                            .await;
                        }
                        .boxed_local()
                    }),
                )
                .await;
            }
            .boxed_local()
        }),
    );

    player.move_to(16).unwrap();
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(16.0)));
    assert!(player.duration().is_ok());
}

/// Boundary: `move_to(t)` with `t == position()` is a no-op (idempotent).
#[test]
fn move_to_same_time_is_idempotent() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.animate(AnimateParams {
                    target: Target::Element(el),
                    easing: Some(EaseMethod::Linear),
                    duration_ms: Some(16),
                    delay_ms: Some(0),
                    release_ms: Some(0),
                    elasticity: None,
                    properties: vec![PropertySpec::to("left", px(16.0))],
                })
                .await;
            }
            .boxed_local()
        }),
    );

    player.move_to(16).unwrap();
    let pos = player.position();
    player.move_to(16).unwrap();
    assert_eq!(player.position(), pos);
}

/// Boundary: a `PlayParams { times: 0, .. }` player entity behaves like a
/// zero-duration delay -- it contributes nothing to the timeline and
/// releases/completes immediately.
#[test]
fn play_with_zero_times_is_a_zero_duration_delay() {
    let player = Player::new(
        EngineConfig::default(),
        None,
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.play(
                    PlayParams {
                        times: 0,
                        ..Default::default()
                    },
                    Box::new(|_anim: Anim| async move {}.boxed_local()),
                )
                .await;
            }
            .boxed_local()
        }),
    );

    assert_eq!(player.duration().unwrap(), 0);
}

/// `play(...)` with a `ManualClock` runs the whole root timeline to
/// completion and reports the final position through `onupdate`.
#[test]
fn play_runs_to_completion_and_reports_updates() {
    let el = ElementHandle(1);
    let adapter = adapter_with(el, "left", 0.0, "px");

    let player = Player::new(
        EngineConfig::default(),
        Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
        default_chain(),
        Box::new(move |anim: Anim| {
            async move {
                anim.animate(AnimateParams {
                    target: Target::Element(el),
                    easing: Some(EaseMethod::Linear),
                    duration_ms: Some(32),
                    delay_ms: Some(0),
                    release_ms: Some(0),
                    elasticity: None,
                    properties: vec![PropertySpec::to("left", px(32.0))],
                })
                .await;
            }
            .boxed_local()
        }),
    );

    let updates = Rc::new(RefCell::new(Vec::new()));
    let updates_clone = Rc::clone(&updates);
    let mut args = PlayArguments::new(Box::new(ManualClock::new()));
    args.onupdate = Some(Box::new(move |t| updates_clone.borrow_mut().push(t)));

    let mut pool = futures::executor::LocalPool::new();
    let final_time = pool.run_until(player.play(args)).unwrap();

    assert_eq!(final_time, 32);
    assert_eq!(updates.borrow().last(), Some(&32));
    assert_eq!(adapter.borrow().get(el, "left"), Some(&px(32.0)));
}
