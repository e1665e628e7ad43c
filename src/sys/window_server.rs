use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpaceId(u64);

impl SpaceId {
    pub const fn new(id: u64) -> Self { SpaceId(id) }

    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowServerId(u32);

impl WindowServerId {
    pub const fn new(id: u32) -> Self { WindowServerId(id) }

    pub fn as_u32(self) -> u32 { self.0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceType {
    User,
    Fullscreen,
    System,
    Unknown(i32),
}

impl SpaceType {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            0 => SpaceType::User,
            2 => SpaceType::System,
            4 => SpaceType::Fullscreen,
            other => SpaceType::Unknown(other),
        }
    }
}

/// The managed spaces of one display, in the window server's order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySpaces {
    pub display: String,
    pub spaces: Vec<SpaceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenInfo {
    /// Display UUID; the same string the window server uses in its space table.
    pub id: String,
    pub frame: Frame,
    pub is_main: bool,
}

/// Window-server space enumeration and membership queries.
pub trait WindowServer {
    fn active_space(&self) -> SpaceId;

    fn managed_display_spaces(&self) -> Vec<DisplaySpaces>;

    fn current_space(&self, display: &str) -> Option<SpaceId>;

    fn spaces_for_window(&self, window: WindowServerId) -> Vec<SpaceId>;

    fn space_type(&self, space: SpaceId) -> SpaceType;

    /// Connected screens, main screen first.
    fn screens(&self) -> Vec<ScreenInfo>;

    /// False when every display shows the same spaces.
    fn screens_have_separate_spaces(&self) -> bool;
}
