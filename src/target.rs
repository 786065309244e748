//! Tween targets and the DOM adapter interface.
//!
//! Per §1/§6, real DOM read/write access is an external collaborator: the
//! engine only needs the [`DomAdapter`] trait to exist, plus a minimal
//! reference implementation ([`TestAdapter`]) so it is runnable headlessly.
//! Downstream users targeting a real DOM supply their own adapter (e.g.
//! backed by `web-sys`).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// An opaque, adapter-defined handle to a DOM-like element. The engine
/// never interprets this value; it only threads it through to
/// [`DomAdapter`] calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u64);

/// A property value as read from or written to a target.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Number(f64),
    /// A number with a unit suffix, e.g. `"16px"`.
    NumberWithUnit(f64, String),
    /// An RGBA color in `0.0..=1.0` components.
    Color([f64; 4]),
    /// A whitespace-separated list of numeric tokens (e.g. a transform
    /// function's argument list), each with an optional unit.
    Tokens(Vec<(f64, String)>),
    /// Anything the built-in interpolators don't model; carried through
    /// to a custom [`crate::interpolate::Interpolator`] untouched.
    Raw(String),
}

/// Classification of a property, decided once when a
/// [`crate::tween::Tween`] is constructed (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationType {
    /// The target is a function target; values are reported to it
    /// directly rather than through a [`DomAdapter`].
    Function,
    /// An element attribute.
    Attribute,
    /// One component of the element's CSS `transform` chain.
    Transform,
    /// A CSS style property.
    Css,
    /// No interpolator/adapter combination could handle this property;
    /// the tween contributes no frames.
    Invalid,
}

/// The interface a real DOM binding implements. The engine ships
/// [`TestAdapter`] as a reference implementation for headless use and
/// tests; it is not meant to back a production renderer.
pub trait DomAdapter {
    /// Read the current value of `prop` on `element`, as the given
    /// animation type. Returns `None` if the element or property is
    /// unknown to this adapter.
    fn get_value(
        &self,
        element: ElementHandle,
        prop: &str,
        kind: AnimationType,
    ) -> Option<PropertyValue>;

    /// Write `value` for `prop` on `element`, as the given animation
    /// type. Transform writes must preserve sibling transform functions
    /// (update one entry of the ordered name->arg map, re-serialize the
    /// rest untouched). Returns `false` if the write type is unsupported
    /// by this adapter (logged by the caller, never fatal).
    fn set_value(
        &mut self,
        element: ElementHandle,
        prop: &str,
        kind: AnimationType,
        value: PropertyValue,
    ) -> bool;

    /// Does `element` have an attribute named `prop` set (used by
    /// animation-type resolution to prefer `Attribute` over `Css`)?
    fn has_attribute(&self, element: ElementHandle, prop: &str) -> bool;

    /// Is `prop` one of the known transform function names (`translateX`,
    /// `rotate`, `scale`, ...) for this adapter?
    fn is_transform_property(&self, prop: &str) -> bool;

    /// Resolve a selector string to zero or more elements, backing
    /// `Anim::select`/`Anim::select_all`. Real selector syntax (CSS-like
    /// queries) is an adapter concern; the default implementation matches
    /// nothing, since a headless/function-target engine may never need
    /// selectors at all.
    fn resolve(&self, selector: &str) -> Vec<ElementHandle> {
        let _ = selector;
        Vec::new()
    }
}

/// A callback-style target: receives `(property, value)` pairs as they
/// are committed, instead of going through a [`DomAdapter`]. Used for
/// targets that are not DOM elements at all (e.g. driving a plain Rust
/// struct, or a test probe).
pub type TargetFn = Rc<RefCell<dyn FnMut(&str, PropertyValue)>>;

/// What a [`crate::tween::Tween`] is bound to.
#[derive(Clone)]
pub enum Target {
    Element(ElementHandle),
    Function(TargetFn),
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Element(e) => write!(f, "Target::Element({e:?})"),
            Target::Function(_) => write!(f, "Target::Function(..)"),
        }
    }
}

/// A minimal in-memory [`DomAdapter`]: a property bag per element, plus a
/// fixed set of "known transform" names. Sufficient for unit tests and
/// headless use; not a real DOM binding.
#[derive(Default)]
pub struct TestAdapter {
    elements: HashMap<ElementHandle, HashMap<String, PropertyValue>>,
    transform_props: Vec<&'static str>,
    names: HashMap<String, Vec<ElementHandle>>,
}

impl TestAdapter {
    pub fn new() -> Self {
        TestAdapter {
            elements: HashMap::new(),
            names: HashMap::new(),
            transform_props: vec![
                "translateX",
                "translateY",
                "translateZ",
                "rotate",
                "rotateX",
                "rotateY",
                "rotateZ",
                "scale",
                "scaleX",
                "scaleY",
                "scaleZ",
            ],
        }
    }

    /// Seed `element.prop` with an initial value, as a test fixture
    /// would populate a DOM element before animating it.
    pub fn set_initial(&mut self, element: ElementHandle, prop: &str, value: PropertyValue) {
        self.elements
            .entry(element)
            .or_default()
            .insert(prop.to_string(), value);
    }

    pub fn get(&self, element: ElementHandle, prop: &str) -> Option<&PropertyValue> {
        self.elements.get(&element).and_then(|m| m.get(prop))
    }

    /// Register `element` under `name` so `Anim::select("name")` finds it.
    pub fn register(&mut self, name: &str, element: ElementHandle) {
        self.names.entry(name.to_string()).or_default().push(element);
    }
}

impl DomAdapter for TestAdapter {
    fn get_value(
        &self,
        element: ElementHandle,
        prop: &str,
        _kind: AnimationType,
    ) -> Option<PropertyValue> {
        self.get(element, prop).cloned()
    }

    fn set_value(
        &mut self,
        element: ElementHandle,
        prop: &str,
        _kind: AnimationType,
        value: PropertyValue,
    ) -> bool {
        self.elements
            .entry(element)
            .or_default()
            .insert(prop.to_string(), value);
        true
    }

    fn has_attribute(&self, element: ElementHandle, prop: &str) -> bool {
        self.elements
            .get(&element)
            .map(|m| m.contains_key(prop))
            .unwrap_or(false)
    }

    fn is_transform_property(&self, prop: &str) -> bool {
        self.transform_props.contains(&prop)
    }

    fn resolve(&self, selector: &str) -> Vec<ElementHandle> {
        self.names.get(selector).cloned().unwrap_or_default()
    }
}
