//! Leaf entity binding a target to one or more properties: [`TweenGroup`]
//! (§4.2). A single `animate()` call becomes one `TweenGroup` batching
//! all of its property specs so they commit to the target in one pass.

use std::cell::RefCell;
use std::rc::Rc;

use crate::easing::EaseMethod;
use crate::entity::{check_done_and_release, init, CheckOutcome, EntityCore, EntityNode};
use crate::interpolate::{self, Interpolation, InterpolatorContext, Interpolator};
use crate::log::engine_warn;
use crate::settings::ResolvedSettings;
use crate::target::{AnimationType, DomAdapter, ElementHandle, PropertyValue, Target};
use crate::timeline::adjust_duration;

/// One property spec inside an `animate()` call: either a scalar target
/// value (origin read live from the target) or an explicit `[from, to]`
/// pair.
#[derive(Clone)]
pub struct PropertySpec {
    pub name: String,
    pub from: Option<PropertyValue>,
    pub to: PropertyValue,
}

impl PropertySpec {
    pub fn to(name: impl Into<String>, to: PropertyValue) -> Self {
        PropertySpec {
            name: name.into(),
            from: None,
            to,
        }
    }

    pub fn from_to(name: impl Into<String>, from: PropertyValue, to: PropertyValue) -> Self {
        PropertySpec {
            name: name.into(),
            from: Some(from),
            to,
        }
    }
}

/// The recognized control keys of an `animate()` call (§6
/// `AnimateParams`); anything else passed by the DSL becomes a
/// [`PropertySpec`].
pub struct AnimateParams {
    pub target: Target,
    pub easing: Option<EaseMethod>,
    pub duration_ms: Option<i64>,
    pub delay_ms: Option<i64>,
    pub release_ms: Option<i64>,
    pub elasticity: Option<f64>,
    pub properties: Vec<PropertySpec>,
}

struct TweenSlot {
    name: String,
    kind: AnimationType,
    interpolation: Option<Box<dyn Interpolation>>,
}

/// A batch of property tweens sharing one target and one active window,
/// as produced by a single `animate()` call.
pub struct TweenGroup {
    core: EntityCore,
    target: Target,
    adapter: Option<Rc<RefCell<dyn DomAdapter>>>,
    easing: EaseMethod,
    elasticity: f64,
    slots: Vec<TweenSlot>,
    /// Whether every property in this `animate()` call resolved to a
    /// renderable slot. A property that failed to resolve (no animation
    /// type, no readable origin, no matching interpolator) only drops its
    /// own slot (§7); this flag does not gate `commit` -- it is purely a
    /// diagnostic summary for callers that want to know if any sibling
    /// property was silently skipped.
    pub(crate) is_valid: bool,
}

impl TweenGroup {
    /// Build a tween group from `params`, resolved against `settings` for
    /// any control key left unspecified, using `adapter` (if the target
    /// is a DOM element) to resolve animation types and read live
    /// origins. `frame_ms` is the engine's frame quantization unit (§4.3
    /// `adjustDuration`); `duration`/`delay`/`release` are quantized to a
    /// multiple of it before being recorded on this entity's core.
    pub fn new(
        params: AnimateParams,
        settings: &ResolvedSettings,
        adapter: Option<Rc<RefCell<dyn DomAdapter>>>,
        interpolators: &[Box<dyn Interpolator>],
        frame_ms: i64,
    ) -> Self {
        let raw_duration = params.duration_ms.unwrap_or(settings.duration_ms).max(0);
        let raw_delay = params.delay_ms.unwrap_or(settings.delay_ms);
        let raw_release = params.release_ms.unwrap_or(settings.release_ms);
        let duration = adjust_duration(raw_duration, settings.speed, frame_ms);
        let delay = adjust_duration(raw_delay, settings.speed, frame_ms);
        let release = adjust_duration(raw_release, settings.speed, frame_ms);
        let easing = params.easing.unwrap_or(settings.easing);
        let elasticity = params.elasticity.unwrap_or(settings.elasticity);

        let mut slots = Vec::with_capacity(params.properties.len());
        let mut any_invalid = false;

        for spec in &params.properties {
            let kind = classify(&params.target, &spec.name, adapter.as_deref());
            if kind == AnimationType::Invalid {
                engine_warn!(prop = %spec.name, "no animation type resolved for property; tween invalid");
                any_invalid = true;
                continue;
            }

            let from = match &spec.from {
                Some(v) => v.clone(),
                None => match read_origin(&params.target, &spec.name, kind, adapter.as_deref()) {
                    Some(v) => v,
                    None => {
                        engine_warn!(prop = %spec.name, "could not read live origin; tween invalid");
                        any_invalid = true;
                        continue;
                    }
                },
            };

            let ctx = InterpolatorContext {
                prop_name: &spec.name,
                from_is_dom: spec.from.is_none(),
            };
            let interpolation = interpolate::resolve(interpolators, &from, &spec.to, ctx);
            if interpolation.is_none() {
                engine_warn!(prop = %spec.name, "no interpolator matched both endpoints; tween invalid");
                any_invalid = true;
            }

            slots.push(TweenSlot {
                name: spec.name.clone(),
                kind,
                interpolation,
            });
        }

        // §7: an invalid property silences only its own slot, not its
        // siblings. `is_valid` is a diagnostic summary -- "did every
        // property in this call resolve" -- not a commit gate; `commit`
        // below renders whichever slots did resolve regardless of it.
        let is_valid = !any_invalid && !slots.is_empty();

        TweenGroup {
            core: EntityCore::new("animate", delay, release, duration),
            target: params.target,
            adapter,
            easing,
            elasticity,
            slots,
            is_valid,
        }
    }

    pub fn init_at(&mut self, start_time: i64) {
        init(&mut self.core, start_time);
    }

    fn commit(&mut self, ratio: f64) {
        let eased = self.easing.sample(ratio, self.elasticity);
        for slot in &mut self.slots {
            let Some(interp) = &slot.interpolation else {
                continue;
            };
            let value = interp.value(eased);
            match &self.target {
                Target::Function(f) => {
                    f.borrow_mut()(&slot.name, value);
                }
                Target::Element(el) => {
                    if let Some(adapter) = &self.adapter {
                        let ok = adapter.borrow_mut().set_value(*el, &slot.name, slot.kind, value);
                        if !ok {
                            engine_warn!(prop = %slot.name, "unsupported dom write type");
                        }
                    }
                }
            }
        }
    }
}

fn classify(target: &Target, prop: &str, adapter: Option<&RefCell<dyn DomAdapter>>) -> AnimationType {
    match target {
        Target::Function(_) => AnimationType::Function,
        Target::Element(el) => {
            let Some(adapter) = adapter else {
                return AnimationType::Css;
            };
            let adapter = adapter.borrow();
            if adapter.has_attribute(*el, prop) {
                AnimationType::Attribute
            } else if adapter.is_transform_property(prop) {
                AnimationType::Transform
            } else {
                AnimationType::Css
            }
        }
    }
}

fn read_origin(
    target: &Target,
    prop: &str,
    kind: AnimationType,
    adapter: Option<&RefCell<dyn DomAdapter>>,
) -> Option<PropertyValue> {
    match target {
        Target::Function(_) => None,
        Target::Element(el) => adapter.and_then(|a| a.borrow().get_value(*el, prop, kind)),
    }
}

impl EntityNode for TweenGroup {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }

    fn display_frame(&mut self, time: i64, target_time: i64, forward: bool) -> CheckOutcome {
        let in_window = time >= self.core.delayed_start_time && time <= self.core.end_time;

        if in_window {
            let progression = if time == target_time && time <= self.core.done_time {
                Some(time - self.core.delayed_start_time)
            } else if forward && target_time >= self.core.done_time && time == self.core.done_time
            {
                Some(time - self.core.delayed_start_time)
            } else if !forward
                && target_time <= self.core.delayed_start_time
                && time == self.core.delayed_start_time
            {
                Some(0)
            } else {
                None
            };

            if let Some(progression) = progression {
                let ratio = if self.core.duration > 0 {
                    progression as f64 / self.core.duration as f64
                } else {
                    1.0
                };
                self.commit(ratio);
            }
        }

        check_done_and_release(&mut self.core, time, forward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::default_chain;
    use crate::settings::{DefaultSettings, SettingsLayer};
    use crate::target::TestAdapter;

    fn settings() -> ResolvedSettings {
        SettingsLayer::root().resolved(&DefaultSettings::default())
    }

    #[test]
    fn single_tween_commits_two_frames() {
        let adapter = Rc::new(RefCell::new(TestAdapter::new()));
        let el = ElementHandle(1);
        adapter
            .borrow_mut()
            .set_initial(el, "left", PropertyValue::NumberWithUnit(0.0, "px".into()));

        let params = AnimateParams {
            target: Target::Element(el),
            easing: Some(EaseMethod::Linear),
            duration_ms: Some(16),
            delay_ms: Some(0),
            release_ms: Some(0),
            elasticity: None,
            properties: vec![PropertySpec::from_to(
                "left",
                PropertyValue::NumberWithUnit(0.0, "px".into()),
                PropertyValue::NumberWithUnit(16.0, "px".into()),
            )],
        };

        let mut group = TweenGroup::new(
            params,
            &settings(),
            Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
            &default_chain(),
            crate::config::FRAME_MS,
        );
        assert!(group.is_valid);
        group.init_at(0);
        assert_eq!(group.core().delayed_start_time, 0);
        assert_eq!(group.core().done_time, 16);

        group.display_frame(0, 16, true);
        assert_eq!(
            adapter.borrow().get(el, "left"),
            Some(&PropertyValue::NumberWithUnit(0.0, "px".into()))
        );

        let outcome = group.display_frame(16, 16, true);
        assert!(outcome.just_done);
        assert_eq!(
            adapter.borrow().get(el, "left"),
            Some(&PropertyValue::NumberWithUnit(16.0, "px".into()))
        );
    }

    #[test]
    fn invalid_property_does_not_panic_and_contributes_no_frames() {
        let params = AnimateParams {
            target: Target::Element(ElementHandle(1)),
            easing: None,
            duration_ms: Some(16),
            delay_ms: None,
            release_ms: None,
            elasticity: None,
            properties: vec![PropertySpec::to("left", PropertyValue::Number(1.0))],
        };
        // No adapter at all: origin can't be read live, so it's invalid.
        let mut group = TweenGroup::new(params, &settings(), None, &default_chain(), crate::config::FRAME_MS);
        assert!(!group.is_valid);
        group.init_at(0);
        group.display_frame(0, 16, true);
    }

    #[test]
    fn one_invalid_property_does_not_silence_its_siblings() {
        let adapter = Rc::new(RefCell::new(TestAdapter::new()));
        let el = ElementHandle(1);
        adapter
            .borrow_mut()
            .set_initial(el, "left", PropertyValue::NumberWithUnit(0.0, "px".into()));
        // Deliberately omit "top"'s initial value: its origin can't be
        // read live, so only its own slot should be dropped.

        let params = AnimateParams {
            target: Target::Element(el),
            easing: Some(EaseMethod::Linear),
            duration_ms: Some(16),
            delay_ms: Some(0),
            release_ms: Some(0),
            elasticity: None,
            properties: vec![
                PropertySpec::to("left", PropertyValue::NumberWithUnit(16.0, "px".into())),
                PropertySpec::to("top", PropertyValue::NumberWithUnit(16.0, "px".into())),
            ],
        };

        let mut group = TweenGroup::new(
            params,
            &settings(),
            Some(adapter.clone() as Rc<RefCell<dyn DomAdapter>>),
            &default_chain(),
            crate::config::FRAME_MS,
        );
        assert!(!group.is_valid, "one unresolved sibling marks the group as not fully valid");
        group.init_at(0);

        group.display_frame(16, 16, true);
        assert_eq!(
            adapter.borrow().get(el, "left"),
            Some(&PropertyValue::NumberWithUnit(16.0, "px".into())),
            "the sibling that did resolve must still commit"
        );
        assert_eq!(adapter.borrow().get(el, "top"), None);
    }

    #[test]
    fn timing_inputs_are_quantized_to_frame_units() {
        let params = AnimateParams {
            target: Target::Element(ElementHandle(1)),
            easing: Some(EaseMethod::Linear),
            duration_ms: Some(100),
            delay_ms: Some(10),
            release_ms: Some(0),
            elasticity: None,
            properties: vec![PropertySpec::from_to(
                "left",
                PropertyValue::Number(0.0),
                PropertyValue::Number(1.0),
            )],
        };
        let group = TweenGroup::new(params, &settings(), None, &default_chain(), crate::config::FRAME_MS);
        assert_eq!(group.core().duration, adjust_duration(100, 1.0, crate::config::FRAME_MS));
        assert_eq!(group.core().delay, adjust_duration(10, 1.0, crate::config::FRAME_MS));
    }
}
