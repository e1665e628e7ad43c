use std::fmt;
use std::hash::{Hash, Hasher};

use serde::Deserialize;
use tracing::trace;

use super::app::ApplicationRef;
use super::space::SpaceRef;
use crate::sys::Platform;
use crate::sys::axuielement::{BoolAttribute, Element, StringAttribute, SUBROLE_STANDARD_WINDOW};
use crate::sys::window_server::WindowServerId;

/// Options accepted wherever a window list is returned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowFilter {
    /// Keep only standard, unminimized windows of applications that are not
    /// hidden.
    pub visible: bool,
}

impl WindowFilter {
    pub const VISIBLE: WindowFilter = WindowFilter { visible: true };
}

/// A window, identified by its accessibility element.
#[derive(Clone)]
pub struct WindowRef {
    element: Element,
    platform: Platform,
}

impl WindowRef {
    pub(crate) fn new(element: Element, platform: Platform) -> Self { WindowRef { element, platform } }

    /// Every window of every running application, in process-list order.
    pub fn all(platform: &Platform, filter: WindowFilter) -> Vec<Self> {
        ApplicationRef::all(platform).iter().flat_map(|app| app.windows(filter)).collect()
    }

    /// The focused window of the frontmost application.
    pub fn focused(platform: &Platform) -> Option<Self> {
        let app = ApplicationRef::focused(platform)?;
        match platform.accessibility.focused_window(app.element()) {
            Ok(element) => Some(WindowRef::new(element, platform.clone())),
            Err(err) => {
                trace!(pid = app.pid(), %err, "No focused window");
                None
            }
        }
    }

    /// The owning application, looked up from the element's pid.
    pub fn app(&self) -> Option<ApplicationRef> {
        let pid = self.platform.accessibility.pid(&self.element).ok()?;
        ApplicationRef::new(&self.platform, pid)
    }

    pub fn title(&self) -> String { self.string(StringAttribute::Title).unwrap_or_default() }

    pub fn id(&self) -> Option<WindowServerId> {
        self.platform.accessibility.window_server_id(&self.element)
    }

    pub fn is_standard(&self) -> bool {
        self.string(StringAttribute::Subrole).is_some_and(|subrole| subrole == SUBROLE_STANDARD_WINDOW)
    }

    pub fn is_minimized(&self) -> bool {
        self.platform
            .accessibility
            .bool_attribute(&self.element, BoolAttribute::Minimized)
            .unwrap_or(false)
    }

    pub fn is_visible(&self) -> bool {
        !self.app().is_some_and(|app| app.is_hidden()) && self.is_shown_when_app_visible()
    }

    /// The per-window half of the visibility filter.
    pub(super) fn is_shown_when_app_visible(&self) -> bool {
        self.is_standard() && !self.is_minimized()
    }

    pub fn spaces(&self) -> Vec<SpaceRef> { SpaceRef::spaces_for(&self.platform, self) }

    /// Raises the window and focuses its application.
    pub fn focus(&self) -> bool {
        if !self.platform.accessibility.raise(&self.element) {
            return false;
        }
        self.app().is_some_and(|app| app.focus())
    }

    fn string(&self, attr: StringAttribute) -> Option<String> {
        self.platform.accessibility.string_attribute(&self.element, attr).ok()
    }
}

impl PartialEq for WindowRef {
    fn eq(&self, other: &Self) -> bool { self.element == other.element }
}

impl Eq for WindowRef {}

impl Hash for WindowRef {
    fn hash<H: Hasher>(&self, state: &mut H) { self.element.hash(state) }
}

impl fmt::Debug for WindowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("WindowRef").field(&self.element).finish()
    }
}
