//! Native collaborators.
//!
//! Each OS service the bridge talks to is a trait here; [`Platform`] bundles
//! one implementation of each. The macOS backend lives in [`macos`].

pub mod app;
pub mod axuielement;
pub mod hotkey;
pub mod keycode;
pub mod process;
pub mod window_server;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(test)]
pub mod testing;

use std::rc::Rc;

use self::app::Workspace;
use self::axuielement::Accessibility;
use self::hotkey::HotkeyCenter;
use self::window_server::WindowServer;

#[allow(non_camel_case_types)]
pub type pid_t = i32;

#[derive(Clone)]
pub struct Platform {
    pub workspace: Rc<dyn Workspace>,
    pub accessibility: Rc<dyn Accessibility>,
    pub hotkeys: Rc<dyn HotkeyCenter>,
    pub window_server: Rc<dyn WindowServer>,
}

impl Platform {
    /// Builds a platform where one object provides every service.
    pub fn from_system<S>(system: Rc<S>) -> Self
    where S: Workspace + Accessibility + HotkeyCenter + WindowServer + 'static {
        Platform {
            workspace: system.clone(),
            accessibility: system.clone(),
            hotkeys: system.clone(),
            window_server: system,
        }
    }
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}
