use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, trace};

use super::window::{WindowFilter, WindowRef};
use crate::sys::Platform;
use crate::sys::app::{Activation, AppInfo};
use crate::sys::axuielement::{BoolAttribute, Element};
use crate::sys::pid_t;

/// Upper bound on window elements fetched per application.
pub const MAX_WINDOWS: usize = 100;

/// A running application, identified by its process id.
#[derive(Clone)]
pub struct ApplicationRef {
    pid: pid_t,
    element: Element,
    platform: Platform,
}

impl ApplicationRef {
    /// Returns `None` if no running application has this pid.
    pub fn new(platform: &Platform, pid: pid_t) -> Option<Self> {
        platform.workspace.application(pid)?;
        Some(Self::from_pid(platform, pid))
    }

    pub(super) fn from_pid(platform: &Platform, pid: pid_t) -> Self {
        ApplicationRef {
            pid,
            element: platform.accessibility.application_element(pid),
            platform: platform.clone(),
        }
    }

    pub fn all(platform: &Platform) -> Vec<Self> {
        platform
            .workspace
            .running_applications()
            .into_iter()
            .map(|info| Self::from_pid(platform, info.pid))
            .collect()
    }

    /// First running application whose display name is exactly `name`.
    pub fn find(platform: &Platform, name: &str) -> Option<Self> {
        platform
            .workspace
            .running_applications()
            .into_iter()
            .find(|info| info.name.as_deref() == Some(name))
            .map(|info| Self::from_pid(platform, info.pid))
    }

    pub fn focused(platform: &Platform) -> Option<Self> {
        let pid = platform.workspace.frontmost_application()?;
        Some(Self::from_pid(platform, pid))
    }

    pub fn launch(platform: &Platform, name: &str) -> bool {
        debug!(name, "Launching application");
        platform.workspace.launch_application(name)
    }

    pub fn pid(&self) -> pid_t { self.pid }

    pub(crate) fn element(&self) -> &Element { &self.element }

    pub fn name(&self) -> Option<String> { self.info().and_then(|info| info.name) }

    pub fn bundle_id(&self) -> Option<String> { self.info().and_then(|info| info.bundle_id) }

    fn info(&self) -> Option<AppInfo> { self.platform.workspace.application(self.pid) }

    /// Window elements of this application, capped at [`MAX_WINDOWS`].
    ///
    /// Accessibility failures yield an empty list.
    pub fn windows(&self, filter: WindowFilter) -> Vec<WindowRef> {
        let elements = match self.platform.accessibility.windows(&self.element, MAX_WINDOWS) {
            Ok(elements) => elements,
            Err(err) => {
                debug!(pid = self.pid, %err, "Could not list windows");
                return Vec::new();
            }
        };
        if filter.visible && self.is_hidden() {
            return Vec::new();
        }
        elements
            .into_iter()
            .map(|element| WindowRef::new(element, self.platform.clone()))
            .filter(|window| !filter.visible || window.is_shown_when_app_visible())
            .collect()
    }

    /// Brings every window of the application forward.
    pub fn activate(&self) -> bool {
        self.platform.workspace.activate(self.pid, Activation::AllWindows)
    }

    /// Brings the application forward without pushing other applications back.
    pub fn focus(&self) -> bool {
        self.platform.workspace.activate(self.pid, Activation::IgnoringOtherApps)
    }

    pub fn show(&self) -> bool { self.platform.workspace.unhide(self.pid) }

    pub fn hide(&self) -> bool { self.platform.workspace.hide(self.pid) }

    pub fn is_active(&self) -> bool { self.platform.workspace.is_active(self.pid) }

    pub fn is_hidden(&self) -> bool {
        match self.platform.accessibility.bool_attribute(&self.element, BoolAttribute::Hidden) {
            Ok(hidden) => hidden,
            Err(err) => {
                trace!(pid = self.pid, %err, "Treating application as not hidden");
                false
            }
        }
    }

    pub fn is_terminated(&self) -> bool { self.platform.workspace.is_terminated(self.pid) }
}

impl PartialEq for ApplicationRef {
    fn eq(&self, other: &Self) -> bool { self.pid == other.pid }
}

impl Eq for ApplicationRef {}

impl Hash for ApplicationRef {
    fn hash<H: Hasher>(&self, state: &mut H) { self.pid.hash(state) }
}

impl fmt::Debug for ApplicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationRef").field("pid", &self.pid).finish_non_exhaustive()
    }
}
