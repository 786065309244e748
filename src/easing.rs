//! Easing functions.
//!
//! Per the engine's scope, easing is an external collaborator: a pure
//! function of progression (`0.0..=1.0`) and an elasticity factor. This
//! module defines the interface ([`EaseMethod::sample`]) plus a small
//! built-in set so the engine is runnable without pulling in an external
//! easing crate. Callers needing a larger curve library can use
//! [`EaseMethod::Custom`] to plug one in.

/// How a tween's progression is mapped to an eased factor.
#[derive(Clone, Copy)]
pub enum EaseMethod {
    /// No easing: output equals input.
    Linear,
    /// Quadratic in-out.
    QuadraticInOut,
    /// Cubic in-out.
    CubicInOut,
    /// The engine's default: elastic ease-out, using the tween's
    /// elasticity factor.
    EaseOutElastic,
    /// Discrete step at the given threshold.
    Discrete(f64),
    /// A caller-supplied pure function of `(progression, elasticity)`.
    Custom(fn(f64, f64) -> f64),
}

impl std::fmt::Debug for EaseMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EaseMethod::Linear => write!(f, "Linear"),
            EaseMethod::QuadraticInOut => write!(f, "QuadraticInOut"),
            EaseMethod::CubicInOut => write!(f, "CubicInOut"),
            EaseMethod::EaseOutElastic => write!(f, "EaseOutElastic"),
            EaseMethod::Discrete(t) => write!(f, "Discrete({t})"),
            EaseMethod::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl PartialEq for EaseMethod {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (EaseMethod::Linear, EaseMethod::Linear)
            | (EaseMethod::QuadraticInOut, EaseMethod::QuadraticInOut)
            | (EaseMethod::CubicInOut, EaseMethod::CubicInOut)
            | (EaseMethod::EaseOutElastic, EaseMethod::EaseOutElastic) => true,
            (EaseMethod::Discrete(a), EaseMethod::Discrete(b)) => a == b,
            (EaseMethod::Custom(a), EaseMethod::Custom(b)) => std::ptr::eq(
                *a as *const (),
                *b as *const (),
            ),
            _ => false,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for EaseMethod {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // Custom functions cannot round-trip; serialize them as Linear.
        let tag = match self {
            EaseMethod::Linear => "linear",
            EaseMethod::QuadraticInOut => "quadratic_in_out",
            EaseMethod::CubicInOut => "cubic_in_out",
            EaseMethod::EaseOutElastic => "ease_out_elastic",
            EaseMethod::Discrete(_) => "discrete",
            EaseMethod::Custom(_) => "linear",
        };
        serializer.serialize_str(tag)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for EaseMethod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let tag = String::deserialize(deserializer)?;
        Ok(match tag.as_str() {
            "quadratic_in_out" => EaseMethod::QuadraticInOut,
            "cubic_in_out" => EaseMethod::CubicInOut,
            "ease_out_elastic" => EaseMethod::EaseOutElastic,
            "discrete" => EaseMethod::Discrete(0.5),
            _ => EaseMethod::Linear,
        })
    }
}

impl EaseMethod {
    /// Sample the eased factor at progression `x` (expected in
    /// `0.0..=1.0`), using `elasticity` for the elastic variant.
    pub fn sample(self, x: f64, elasticity: f64) -> f64 {
        match self {
            EaseMethod::Linear => x,
            EaseMethod::QuadraticInOut => {
                if x < 0.5 {
                    2.0 * x * x
                } else {
                    1.0 - (-2.0 * x + 2.0).powi(2) / 2.0
                }
            }
            EaseMethod::CubicInOut => {
                if x < 0.5 {
                    4.0 * x * x * x
                } else {
                    1.0 - (-2.0 * x + 2.0).powi(3) / 2.0
                }
            }
            EaseMethod::EaseOutElastic => ease_out_elastic(x, elasticity),
            EaseMethod::Discrete(threshold) => {
                if x >= threshold {
                    1.0
                } else {
                    0.0
                }
            }
            EaseMethod::Custom(f) => f(x, elasticity),
        }
    }
}

fn ease_out_elastic(x: f64, elasticity: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let elasticity = elasticity.max(0.001);
    let period = elasticity * 1.5;
    let s = period / 4.0;
    let p = x - 1.0;
    2f64.powf(-10.0 * x) * ((p - s) * (2.0 * std::f64::consts::PI) / period).sin() + 1.0
}
