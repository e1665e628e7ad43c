use std::fmt;
use std::hash::{Hash, Hasher};

use super::screen::ScreenRef;
use super::window::{WindowFilter, WindowRef};
use crate::common::collections::HashSet;
use crate::sys::Platform;
use crate::sys::window_server::{SpaceId, SpaceType};

/// A virtual desktop, identified by its window-server space id.
#[derive(Clone)]
pub struct SpaceRef {
    id: SpaceId,
    platform: Platform,
}

impl SpaceRef {
    pub fn new(platform: &Platform, id: SpaceId) -> Self { SpaceRef { id, platform: platform.clone() } }

    pub fn id(&self) -> SpaceId { self.id }

    /// The space shown on the main display.
    pub fn active(platform: &Platform) -> Self { Self::new(platform, platform.window_server.active_space()) }

    /// Every managed space, in display order and then per-display order.
    pub fn all(platform: &Platform) -> Vec<Self> {
        platform
            .window_server
            .managed_display_spaces()
            .into_iter()
            .flat_map(|display| display.spaces)
            .map(|id| Self::new(platform, id))
            .collect()
    }

    /// The space `screen` currently shows. With mirrored spaces every screen
    /// shows the active space.
    pub fn current_for(platform: &Platform, screen: &ScreenRef) -> Option<Self> {
        if !platform.window_server.screens_have_separate_spaces() {
            return Some(Self::active(platform));
        }
        platform.window_server.current_space(screen.id()).map(|id| Self::new(platform, id))
    }

    /// The managed spaces `window` is on, in the order of [`SpaceRef::all`].
    pub fn spaces_for(platform: &Platform, window: &WindowRef) -> Vec<Self> {
        let Some(wsid) = window.id() else {
            return Vec::new();
        };
        let reported: HashSet<SpaceId> =
            platform.window_server.spaces_for_window(wsid).into_iter().collect();
        Self::all(platform).into_iter().filter(|space| reported.contains(&space.id)).collect()
    }

    pub fn is_normal(&self) -> bool { self.space_type() == SpaceType::User }

    pub fn is_fullscreen(&self) -> bool { self.space_type() == SpaceType::Fullscreen }

    fn space_type(&self) -> SpaceType { self.platform.window_server.space_type(self.id) }

    /// Screens showing this space: every screen when spaces are mirrored,
    /// otherwise the one whose managed list contains it.
    pub fn screens(&self) -> Vec<ScreenRef> {
        let screens = ScreenRef::all(&self.platform);
        if !self.platform.window_server.screens_have_separate_spaces() {
            return screens;
        }
        let Some(display) = self
            .platform
            .window_server
            .managed_display_spaces()
            .into_iter()
            .find(|display| display.spaces.contains(&self.id))
        else {
            return Vec::new();
        };
        screens.into_iter().filter(|screen| screen.id() == display.display).collect()
    }

    pub fn windows(&self, filter: WindowFilter) -> Vec<WindowRef> {
        WindowRef::all(&self.platform, filter)
            .into_iter()
            .filter(|window| window.spaces().contains(self))
            .collect()
    }
}

impl PartialEq for SpaceRef {
    fn eq(&self, other: &Self) -> bool { self.id == other.id }
}

impl Eq for SpaceRef {}

impl Hash for SpaceRef {
    fn hash<H: Hasher>(&self, state: &mut H) { self.id.hash(state) }
}

impl fmt::Debug for SpaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SpaceRef").field(&self.id.get()).finish()
    }
}
