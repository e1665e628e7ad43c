use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use super::pid_t;
use super::window_server::WindowServerId;

pub const SUBROLE_STANDARD_WINDOW: &str = "AXStandardWindow";

/// The native side of an accessibility element.
pub trait ElementHandle: fmt::Debug {
    fn same_element(&self, other: &dyn ElementHandle) -> bool;

    fn hash_code(&self) -> u64;

    fn as_any(&self) -> &dyn Any;
}

/// A reference-counted accessibility element. Equality and hashing defer to
/// the native element, so two handles fetched separately for the same
/// window compare equal.
#[derive(Clone)]
pub struct Element(Rc<dyn ElementHandle>);

impl Element {
    pub fn new(handle: impl ElementHandle + 'static) -> Self { Element(Rc::new(handle)) }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> { self.0.as_any().downcast_ref() }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool { self.0.same_element(&*other.0) }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) { self.0.hash_code().hash(state) }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolAttribute {
    Hidden,
    Minimized,
}

impl BoolAttribute {
    pub fn name(self) -> &'static str {
        match self {
            BoolAttribute::Hidden => "AXHidden",
            BoolAttribute::Minimized => "AXMinimized",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringAttribute {
    Subrole,
    Title,
}

impl StringAttribute {
    pub fn name(self) -> &'static str {
        match self {
            StringAttribute::Subrole => "AXSubrole",
            StringAttribute::Title => "AXTitle",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AxError {
    #[error("accessibility access is not granted")]
    NotTrusted,
    #[error("attribute is missing or has an unexpected type")]
    NoValue,
    #[error("element is no longer valid")]
    InvalidElement,
    #[error("accessibility call failed with code {0}")]
    Native(i32),
}

/// Accessibility attribute queries by opaque element.
pub trait Accessibility {
    fn application_element(&self, pid: pid_t) -> Element;

    /// Up to `max` window elements of an application element.
    fn windows(&self, app: &Element, max: usize) -> Result<Vec<Element>, AxError>;

    fn focused_window(&self, app: &Element) -> Result<Element, AxError>;

    fn bool_attribute(&self, element: &Element, attr: BoolAttribute) -> Result<bool, AxError>;

    fn string_attribute(
        &self,
        element: &Element,
        attr: StringAttribute,
    ) -> Result<String, AxError>;

    fn pid(&self, element: &Element) -> Result<pid_t, AxError>;

    fn window_server_id(&self, element: &Element) -> Option<WindowServerId>;

    fn raise(&self, element: &Element) -> bool;
}
