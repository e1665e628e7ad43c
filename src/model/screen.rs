use std::fmt;

use super::space::SpaceRef;
use crate::sys::Platform;
use crate::sys::window_server::{Frame, ScreenInfo};

/// A connected display, identified by its UUID.
#[derive(Clone)]
pub struct ScreenRef {
    id: String,
    platform: Platform,
}

impl ScreenRef {
    pub fn all(platform: &Platform) -> Vec<Self> {
        platform
            .window_server
            .screens()
            .into_iter()
            .map(|info| ScreenRef { id: info.id, platform: platform.clone() })
            .collect()
    }

    pub fn main(platform: &Platform) -> Option<Self> {
        platform
            .window_server
            .screens()
            .into_iter()
            .find(|info| info.is_main)
            .map(|info| ScreenRef { id: info.id, platform: platform.clone() })
    }

    pub fn id(&self) -> &str { &self.id }

    /// Current bounds, or an empty frame once the screen is disconnected.
    pub fn frame(&self) -> Frame { self.info().map(|info| info.frame).unwrap_or_default() }

    pub fn is_main(&self) -> bool { self.info().is_some_and(|info| info.is_main) }

    fn info(&self) -> Option<ScreenInfo> {
        self.platform.window_server.screens().into_iter().find(|info| info.id == self.id)
    }

    pub fn current_space(&self) -> Option<SpaceRef> { SpaceRef::current_for(&self.platform, self) }

    /// Spaces this screen can show; all of them when spaces are mirrored.
    pub fn spaces(&self) -> Vec<SpaceRef> {
        if !self.platform.window_server.screens_have_separate_spaces() {
            return SpaceRef::all(&self.platform);
        }
        self.platform
            .window_server
            .managed_display_spaces()
            .into_iter()
            .filter(|display| display.display == self.id)
            .flat_map(|display| display.spaces)
            .map(|id| SpaceRef::new(&self.platform, id))
            .collect()
    }
}

impl PartialEq for ScreenRef {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for ScreenRef {}

impl fmt::Debug for ScreenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ScreenRef").field(&self.id).finish()
    }
}
