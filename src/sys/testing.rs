//! In-memory stand-in for every native collaborator.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use super::Platform;
use super::app::{Activation, AppInfo, Workspace};
use super::axuielement::{
    Accessibility, AxError, BoolAttribute, Element, ElementHandle, StringAttribute,
    SUBROLE_STANDARD_WINDOW,
};
use super::hotkey::{BindingId, HotkeyCenter, HotkeyError, HotkeySink, NativeHotkey};
use super::keycode::{KeyCode, ModifierMask};
use super::pid_t;
use super::window_server::{
    DisplaySpaces, Frame, ScreenInfo, SpaceId, SpaceType, WindowServer, WindowServerId,
};
use crate::common::collections::HashMap;

/// `eventHotKeyExistsErr`
const HOTKEY_EXISTS: i32 = -9878;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeElement {
    App(pid_t),
    Window(u64),
}

impl ElementHandle for FakeElement {
    fn same_element(&self, other: &dyn ElementHandle) -> bool {
        other.as_any().downcast_ref::<FakeElement>() == Some(self)
    }

    fn hash_code(&self) -> u64 {
        match *self {
            FakeElement::App(pid) => pid as u64,
            FakeElement::Window(id) => id | (1 << 63),
        }
    }

    fn as_any(&self) -> &dyn Any { self }
}

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub title: String,
    pub subrole: String,
    pub minimized: bool,
    pub wsid: Option<u32>,
}

impl FakeWindow {
    pub fn standard(title: &str, wsid: u32) -> Self {
        FakeWindow {
            title: title.to_string(),
            subrole: SUBROLE_STANDARD_WINDOW.to_string(),
            minimized: false,
            wsid: Some(wsid),
        }
    }

    pub fn minimized(mut self) -> Self {
        self.minimized = true;
        self
    }

    pub fn subrole(mut self, subrole: &str) -> Self {
        self.subrole = subrole.to_string();
        self
    }
}

#[derive(Debug)]
struct FakeApp {
    pid: pid_t,
    name: String,
    bundle_id: String,
    hidden: bool,
    ax_denied: bool,
    windows: Vec<u64>,
}

struct FakeWindowEntry {
    pid: pid_t,
    window: FakeWindow,
}

#[derive(Default)]
struct State {
    apps: Vec<FakeApp>,
    windows: HashMap<u64, FakeWindowEntry>,
    frontmost: Option<pid_t>,
    focused_windows: HashMap<pid_t, u64>,
    activations: Vec<(pid_t, Activation)>,
    launched: Vec<String>,
    raised: Vec<u64>,

    displays: Vec<DisplaySpaces>,
    current_spaces: HashMap<String, SpaceId>,
    active_space: Option<SpaceId>,
    separate_spaces: bool,
    window_spaces: HashMap<u32, Vec<SpaceId>>,
    space_types: HashMap<SpaceId, SpaceType>,

    registrations: HashMap<usize, (KeyCode, ModifierMask, BindingId)>,
    next_handle: usize,
    subscribe_calls: usize,
    fail_unregister: bool,
}

pub struct FakeSystem {
    state: RefCell<State>,
    sink: RefCell<Option<HotkeySink>>,
}

impl FakeSystem {
    pub fn new() -> Rc<Self> {
        Rc::new(FakeSystem {
            state: RefCell::new(State {
                separate_spaces: true,
                next_handle: 1,
                ..State::default()
            }),
            sink: RefCell::new(None),
        })
    }

    pub fn platform(self: &Rc<Self>) -> Platform { Platform::from_system(self.clone()) }

    pub fn add_app(&self, pid: pid_t, name: &str) {
        self.state.borrow_mut().apps.push(FakeApp {
            pid,
            name: name.to_string(),
            bundle_id: format!("com.example.{}", name.to_lowercase()),
            hidden: false,
            ax_denied: false,
            windows: Vec::new(),
        });
    }

    pub fn terminate(&self, pid: pid_t) { self.state.borrow_mut().apps.retain(|app| app.pid != pid) }

    pub fn set_app_hidden(&self, pid: pid_t, hidden: bool) {
        if let Some(app) = self.state.borrow_mut().apps.iter_mut().find(|app| app.pid == pid) {
            app.hidden = hidden;
        }
    }

    pub fn deny_accessibility(&self, pid: pid_t) {
        if let Some(app) = self.state.borrow_mut().apps.iter_mut().find(|app| app.pid == pid) {
            app.ax_denied = true;
        }
    }

    pub fn add_window(&self, pid: pid_t, id: u64, window: FakeWindow) {
        let mut state = self.state.borrow_mut();
        if let Some(app) = state.apps.iter_mut().find(|app| app.pid == pid) {
            app.windows.push(id);
        }
        state.windows.insert(id, FakeWindowEntry { pid, window });
    }

    pub fn set_frontmost(&self, pid: Option<pid_t>) { self.state.borrow_mut().frontmost = pid }

    pub fn set_focused_window(&self, pid: pid_t, id: u64) {
        self.state.borrow_mut().focused_windows.insert(pid, id);
    }

    pub fn add_display(&self, display: &str, spaces: &[u64]) {
        let mut state = self.state.borrow_mut();
        let spaces: Vec<SpaceId> = spaces.iter().copied().map(SpaceId::new).collect();
        if let Some(&first) = spaces.first() {
            state.current_spaces.entry(display.to_string()).or_insert(first);
            state.active_space.get_or_insert(first);
        }
        state.displays.push(DisplaySpaces { display: display.to_string(), spaces });
    }

    pub fn set_current_space(&self, display: &str, space: u64) {
        self.state.borrow_mut().current_spaces.insert(display.to_string(), SpaceId::new(space));
    }

    pub fn set_active_space(&self, space: u64) {
        self.state.borrow_mut().active_space = Some(SpaceId::new(space));
    }

    pub fn set_separate_spaces(&self, separate: bool) {
        self.state.borrow_mut().separate_spaces = separate;
    }

    pub fn set_window_spaces(&self, wsid: u32, spaces: &[u64]) {
        self.state
            .borrow_mut()
            .window_spaces
            .insert(wsid, spaces.iter().copied().map(SpaceId::new).collect());
    }

    pub fn set_space_type(&self, space: u64, ty: SpaceType) {
        self.state.borrow_mut().space_types.insert(SpaceId::new(space), ty);
    }

    pub fn fail_unregister(&self, fail: bool) { self.state.borrow_mut().fail_unregister = fail }

    /// Delivers a "hotkey pressed" notification through the installed sink.
    pub fn fire(&self, id: BindingId) -> bool {
        match &*self.sink.borrow() {
            Some(sink) => {
                sink(id);
                true
            }
            None => false,
        }
    }

    pub fn registered_ids(&self) -> Vec<BindingId> {
        let mut ids: Vec<_> =
            self.state.borrow().registrations.values().map(|&(_, _, id)| id).collect();
        ids.sort();
        ids
    }

    pub fn registration_count(&self) -> usize { self.state.borrow().registrations.len() }

    pub fn subscribe_calls(&self) -> usize { self.state.borrow().subscribe_calls }

    pub fn activations(&self) -> Vec<(pid_t, Activation)> { self.state.borrow().activations.clone() }

    pub fn launched(&self) -> Vec<String> { self.state.borrow().launched.clone() }

    pub fn raised(&self) -> Vec<u64> { self.state.borrow().raised.clone() }

    fn with_app<R>(&self, pid: pid_t, f: impl FnOnce(&FakeApp) -> R) -> Option<R> {
        self.state.borrow().apps.iter().find(|app| app.pid == pid).map(f)
    }

    fn with_window<R>(
        &self,
        element: &Element,
        f: impl FnOnce(&FakeWindowEntry) -> R,
    ) -> Result<R, AxError> {
        let Some(&FakeElement::Window(id)) = element.downcast_ref::<FakeElement>() else {
            return Err(AxError::NoValue);
        };
        self.state.borrow().windows.get(&id).map(f).ok_or(AxError::InvalidElement)
    }
}

impl Workspace for FakeSystem {
    fn running_applications(&self) -> Vec<AppInfo> {
        self.state
            .borrow()
            .apps
            .iter()
            .map(|app| AppInfo {
                pid: app.pid,
                name: Some(app.name.clone()),
                bundle_id: Some(app.bundle_id.clone()),
            })
            .collect()
    }

    fn application(&self, pid: pid_t) -> Option<AppInfo> {
        self.running_applications().into_iter().find(|app| app.pid == pid)
    }

    fn frontmost_application(&self) -> Option<pid_t> { self.state.borrow().frontmost }

    fn launch_application(&self, name: &str) -> bool {
        self.state.borrow_mut().launched.push(name.to_string());
        true
    }

    fn activate(&self, pid: pid_t, activation: Activation) -> bool {
        if self.with_app(pid, |_| ()).is_none() {
            return false;
        }
        self.state.borrow_mut().activations.push((pid, activation));
        true
    }

    fn hide(&self, pid: pid_t) -> bool {
        let exists = self.with_app(pid, |_| ()).is_some();
        self.set_app_hidden(pid, true);
        exists
    }

    fn unhide(&self, pid: pid_t) -> bool {
        let exists = self.with_app(pid, |_| ()).is_some();
        self.set_app_hidden(pid, false);
        exists
    }

    fn is_active(&self, pid: pid_t) -> bool { self.state.borrow().frontmost == Some(pid) }

    fn is_terminated(&self, pid: pid_t) -> bool { self.with_app(pid, |_| ()).is_none() }
}

impl Accessibility for FakeSystem {
    fn application_element(&self, pid: pid_t) -> Element { Element::new(FakeElement::App(pid)) }

    fn windows(&self, app: &Element, max: usize) -> Result<Vec<Element>, AxError> {
        let Some(&FakeElement::App(pid)) = app.downcast_ref::<FakeElement>() else {
            return Err(AxError::NoValue);
        };
        self.with_app(pid, |app| {
            if app.ax_denied {
                return Err(AxError::NotTrusted);
            }
            Ok(app
                .windows
                .iter()
                .take(max)
                .map(|&id| Element::new(FakeElement::Window(id)))
                .collect())
        })
        .unwrap_or(Err(AxError::InvalidElement))
    }

    fn focused_window(&self, app: &Element) -> Result<Element, AxError> {
        let Some(&FakeElement::App(pid)) = app.downcast_ref::<FakeElement>() else {
            return Err(AxError::NoValue);
        };
        self.state
            .borrow()
            .focused_windows
            .get(&pid)
            .map(|&id| Element::new(FakeElement::Window(id)))
            .ok_or(AxError::NoValue)
    }

    fn bool_attribute(&self, element: &Element, attr: BoolAttribute) -> Result<bool, AxError> {
        match (element.downcast_ref::<FakeElement>(), attr) {
            (Some(&FakeElement::App(pid)), BoolAttribute::Hidden) => self
                .with_app(pid, |app| {
                    if app.ax_denied { Err(AxError::NotTrusted) } else { Ok(app.hidden) }
                })
                .unwrap_or(Err(AxError::InvalidElement)),
            (Some(FakeElement::Window(_)), BoolAttribute::Minimized) => {
                self.with_window(element, |entry| entry.window.minimized)
            }
            _ => Err(AxError::NoValue),
        }
    }

    fn string_attribute(
        &self,
        element: &Element,
        attr: StringAttribute,
    ) -> Result<String, AxError> {
        self.with_window(element, |entry| match attr {
            StringAttribute::Subrole => entry.window.subrole.clone(),
            StringAttribute::Title => entry.window.title.clone(),
        })
    }

    fn pid(&self, element: &Element) -> Result<pid_t, AxError> {
        match element.downcast_ref::<FakeElement>() {
            Some(&FakeElement::App(pid)) => Ok(pid),
            _ => self.with_window(element, |entry| entry.pid),
        }
    }

    fn window_server_id(&self, element: &Element) -> Option<WindowServerId> {
        self.with_window(element, |entry| entry.window.wsid).ok().flatten().map(WindowServerId::new)
    }

    fn raise(&self, element: &Element) -> bool {
        let Some(&FakeElement::Window(id)) = element.downcast_ref::<FakeElement>() else {
            return false;
        };
        let mut state = self.state.borrow_mut();
        if !state.windows.contains_key(&id) {
            return false;
        }
        state.raised.push(id);
        true
    }
}

impl HotkeyCenter for FakeSystem {
    fn subscribe(&self, sink: HotkeySink) -> Result<(), HotkeyError> {
        self.state.borrow_mut().subscribe_calls += 1;
        let mut slot = self.sink.borrow_mut();
        if slot.is_some() {
            return Err(HotkeyError::AlreadySubscribed);
        }
        *slot = Some(sink);
        Ok(())
    }

    fn register(
        &self,
        key: KeyCode,
        modifiers: ModifierMask,
        id: BindingId,
    ) -> Result<NativeHotkey, HotkeyError> {
        let mut state = self.state.borrow_mut();
        if state.registrations.values().any(|&(k, m, _)| k == key && m == modifiers) {
            return Err(HotkeyError::Register {
                key,
                mods: modifiers.bits(),
                status: HOTKEY_EXISTS,
            });
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        state.registrations.insert(handle, (key, modifiers, id));
        Ok(NativeHotkey::from_raw(handle))
    }

    fn unregister(&self, hotkey: NativeHotkey) -> Result<(), HotkeyError> {
        let mut state = self.state.borrow_mut();
        if state.fail_unregister {
            return Err(HotkeyError::Unregister(-50));
        }
        state.registrations.remove(&hotkey.into_raw());
        Ok(())
    }
}

impl WindowServer for FakeSystem {
    fn active_space(&self) -> SpaceId {
        self.state.borrow().active_space.unwrap_or(SpaceId::new(0))
    }

    fn managed_display_spaces(&self) -> Vec<DisplaySpaces> { self.state.borrow().displays.clone() }

    fn current_space(&self, display: &str) -> Option<SpaceId> {
        self.state.borrow().current_spaces.get(display).copied()
    }

    fn spaces_for_window(&self, window: WindowServerId) -> Vec<SpaceId> {
        self.state.borrow().window_spaces.get(&window.as_u32()).cloned().unwrap_or_default()
    }

    fn space_type(&self, space: SpaceId) -> SpaceType {
        self.state.borrow().space_types.get(&space).copied().unwrap_or(SpaceType::User)
    }

    fn screens(&self) -> Vec<ScreenInfo> {
        self.state
            .borrow()
            .displays
            .iter()
            .enumerate()
            .map(|(idx, display)| ScreenInfo {
                id: display.display.clone(),
                frame: Frame {
                    x: 1920.0 * idx as f64,
                    y: 0.0,
                    width: 1920.0,
                    height: 1080.0,
                },
                is_main: idx == 0,
            })
            .collect()
    }

    fn screens_have_separate_spaces(&self) -> bool { self.state.borrow().separate_spaces }
}
