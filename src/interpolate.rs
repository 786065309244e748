//! Value interpolators.
//!
//! Per §1/§6, interpolators are an external collaborator specified only
//! by interface. This module defines that interface
//! ([`Interpolator`]/[`Interpolation`]) plus the built-in set the source
//! ships by default: numeric-with-unit, color, array-of-tokens, constant
//! and instant, tried most-specific-first with instant as the never-fails
//! last resort (§6).

use crate::target::PropertyValue;

/// Context passed to [`Interpolator::create`] so it can decide whether
/// it is a good match for this property.
#[derive(Debug, Clone, Copy)]
pub struct InterpolatorContext<'a> {
    pub prop_name: &'a str,
    /// Whether `from` was read live from the target (`true`) or supplied
    /// explicitly as the first half of a `[from, to]` pair (`false`).
    pub from_is_dom: bool,
}

/// A live interpolation between two already-matched endpoints.
pub trait Interpolation {
    /// Compute the property value at eased factor `eased` (already run
    /// through an easing function; not necessarily `0.0..=1.0` for
    /// overshoot-style easings).
    fn value(&self, eased: f64) -> PropertyValue;
}

/// The interpolator interface consumed by [`crate::tween::Tween`]. A
/// type implementing this may look at `from`/`to` and refuse the match
/// (return `None`) if it can't bridge both endpoints.
pub trait Interpolator {
    fn create(
        &self,
        from: &PropertyValue,
        to: &PropertyValue,
        ctx: InterpolatorContext<'_>,
    ) -> Option<Box<dyn Interpolation>>;
}

struct NumberInterpolation {
    from: f64,
    to: f64,
    unit: Option<String>,
}

impl Interpolation for NumberInterpolation {
    fn value(&self, eased: f64) -> PropertyValue {
        let v = self.from + (self.to - self.from) * eased;
        match &self.unit {
            Some(u) => PropertyValue::NumberWithUnit(v, u.clone()),
            None => PropertyValue::Number(v),
        }
    }
}

/// Matches `Number`/`NumberWithUnit` pairs with compatible units.
pub struct NumericInterpolator;

impl Interpolator for NumericInterpolator {
    fn create(
        &self,
        from: &PropertyValue,
        to: &PropertyValue,
        _ctx: InterpolatorContext<'_>,
    ) -> Option<Box<dyn Interpolation>> {
        match (from, to) {
            (PropertyValue::Number(a), PropertyValue::Number(b)) => {
                Some(Box::new(NumberInterpolation {
                    from: *a,
                    to: *b,
                    unit: None,
                }))
            }
            (PropertyValue::NumberWithUnit(a, ua), PropertyValue::NumberWithUnit(b, ub))
                if ua == ub =>
            {
                Some(Box::new(NumberInterpolation {
                    from: *a,
                    to: *b,
                    unit: Some(ua.clone()),
                }))
            }
            _ => None,
        }
    }
}

struct ColorInterpolation {
    from: [f64; 4],
    to: [f64; 4],
}

impl Interpolation for ColorInterpolation {
    fn value(&self, eased: f64) -> PropertyValue {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = self.from[i] + (self.to[i] - self.from[i]) * eased;
        }
        PropertyValue::Color(out)
    }
}

/// Matches `Color` pairs (already parsed from hex/rgb/hsl by the caller
/// into RGBA components — string parsing itself is out of scope).
pub struct ColorInterpolator;

impl Interpolator for ColorInterpolator {
    fn create(
        &self,
        from: &PropertyValue,
        to: &PropertyValue,
        _ctx: InterpolatorContext<'_>,
    ) -> Option<Box<dyn Interpolation>> {
        match (from, to) {
            (PropertyValue::Color(a), PropertyValue::Color(b)) => {
                Some(Box::new(ColorInterpolation { from: *a, to: *b }))
            }
            _ => None,
        }
    }
}

struct TokensInterpolation {
    from: Vec<(f64, String)>,
    to: Vec<(f64, String)>,
}

impl Interpolation for TokensInterpolation {
    fn value(&self, eased: f64) -> PropertyValue {
        let tokens = self
            .from
            .iter()
            .zip(self.to.iter())
            .map(|((fv, fu), (tv, _))| (fv + (tv - fv) * eased, fu.clone()))
            .collect();
        PropertyValue::Tokens(tokens)
    }
}

/// Matches `Tokens` pairs of equal length with matching units per slot
/// (e.g. a `translate` transform's `(x, y)` argument pair).
pub struct TokensInterpolator;

impl Interpolator for TokensInterpolator {
    fn create(
        &self,
        from: &PropertyValue,
        to: &PropertyValue,
        _ctx: InterpolatorContext<'_>,
    ) -> Option<Box<dyn Interpolation>> {
        match (from, to) {
            (PropertyValue::Tokens(a), PropertyValue::Tokens(b))
                if a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|((_, ua), (_, ub))| ua == ub) =>
            {
                Some(Box::new(TokensInterpolation {
                    from: a.clone(),
                    to: b.clone(),
                }))
            }
            _ => None,
        }
    }
}

struct ConstantInterpolation(PropertyValue);

impl Interpolation for ConstantInterpolation {
    fn value(&self, _eased: f64) -> PropertyValue {
        self.0.clone()
    }
}

/// Matches when both endpoints are equal: renders a constant value for
/// the whole tween. More specific than the instant fallback because it
/// still requires `from == to`.
pub struct ConstantInterpolator;

impl Interpolator for ConstantInterpolator {
    fn create(
        &self,
        from: &PropertyValue,
        to: &PropertyValue,
        _ctx: InterpolatorContext<'_>,
    ) -> Option<Box<dyn Interpolation>> {
        if from == to {
            Some(Box::new(ConstantInterpolation(to.clone())))
        } else {
            None
        }
    }
}

struct InstantInterpolation(PropertyValue);

impl Interpolation for InstantInterpolation {
    fn value(&self, eased: f64) -> PropertyValue {
        // Anything short of the fully-eased endpoint stays at `to`
        // regardless: this interpolator has no notion of "between".
        let _ = eased;
        self.0.clone()
    }
}

/// Last-resort interpolator: never refuses a match, always reports `to`.
/// Used for values none of the typed interpolators can bridge (e.g. a
/// `Raw` string), so a tween is never silently invalid just because its
/// value type lacks a dedicated interpolator.
pub struct InstantInterpolator;

impl Interpolator for InstantInterpolator {
    fn create(
        &self,
        _from: &PropertyValue,
        to: &PropertyValue,
        _ctx: InterpolatorContext<'_>,
    ) -> Option<Box<dyn Interpolation>> {
        Some(Box::new(InstantInterpolation(to.clone())))
    }
}

/// The default, most-specific-first interpolator chain used when a
/// [`crate::tween::Tween`] doesn't request a custom one.
pub fn default_chain() -> Vec<Box<dyn Interpolator>> {
    vec![
        Box::new(NumericInterpolator),
        Box::new(ColorInterpolator),
        Box::new(TokensInterpolator),
        Box::new(ConstantInterpolator),
        Box::new(InstantInterpolator),
    ]
}

/// Try each interpolator in `chain` in order, returning the first match.
/// Because [`InstantInterpolator`] never refuses, this always succeeds
/// when `chain` is [`default_chain`].
pub fn resolve(
    chain: &[Box<dyn Interpolator>],
    from: &PropertyValue,
    to: &PropertyValue,
    ctx: InterpolatorContext<'_>,
) -> Option<Box<dyn Interpolation>> {
    chain.iter().find_map(|i| i.create(from, to, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_approx_eq;

    fn ctx() -> InterpolatorContext<'static> {
        InterpolatorContext {
            prop_name: "left",
            from_is_dom: false,
        }
    }

    #[test]
    fn numeric_interpolates_linearly() {
        let from = PropertyValue::NumberWithUnit(0.0, "px".into());
        let to = PropertyValue::NumberWithUnit(16.0, "px".into());
        let interp = resolve(&default_chain(), &from, &to, ctx()).unwrap();
        match interp.value(0.5) {
            PropertyValue::NumberWithUnit(v, u) => {
                assert_approx_eq!(v, 8.0);
                assert_eq!(u, "px");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn mismatched_units_fall_through_to_instant() {
        let from = PropertyValue::NumberWithUnit(0.0, "px".into());
        let to = PropertyValue::NumberWithUnit(1.0, "em".into());
        let interp = resolve(&default_chain(), &from, &to, ctx()).unwrap();
        // Instant always reports `to`.
        assert_eq!(interp.value(0.0), to);
    }

    #[test]
    fn equal_endpoints_use_constant_interpolator() {
        let v = PropertyValue::Number(3.0);
        let interp = resolve(&default_chain(), &v, &v, ctx()).unwrap();
        assert_eq!(interp.value(0.0), v);
        assert_eq!(interp.value(1.0), v);
    }
}
