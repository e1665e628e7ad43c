use std::fmt;

use super::keycode::{KeyCode, ModifierMask};

/// Process-unique identity of a binding. It is the only thing the native
/// "hotkey pressed" notification carries back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u32);

impl BindingId {
    /// Never issued; carried by bindings created after the counter ran out.
    pub const NONE: BindingId = BindingId(0);

    pub const fn new(id: u32) -> Self { BindingId(id) }

    pub fn as_u32(self) -> u32 { self.0 }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// Opaque handle for one native hotkey registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHotkey(usize);

impl NativeHotkey {
    pub fn from_raw(raw: usize) -> Self { NativeHotkey(raw) }

    pub fn into_raw(self) -> usize { self.0 }
}

/// Receives the identity of every fired hotkey. Called on whatever thread
/// the OS delivers the event on.
pub type HotkeySink = Box<dyn Fn(BindingId) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey event handler could not be installed (status {0})")]
    Subscribe(i32),
    #[error("hotkey event handler is already installed")]
    AlreadySubscribed,
    #[error("registering key {key} with modifiers {mods:#x} failed (status {status})")]
    Register { key: KeyCode, mods: u32, status: i32 },
    #[error("unregistering hotkey failed (status {0})")]
    Unregister(i32),
}

pub trait HotkeyCenter {
    /// Installs the single "hotkey pressed" handler for the process.
    fn subscribe(&self, sink: HotkeySink) -> Result<(), HotkeyError>;

    fn register(
        &self,
        key: KeyCode,
        modifiers: ModifierMask,
        id: BindingId,
    ) -> Result<NativeHotkey, HotkeyError>;

    fn unregister(&self, hotkey: NativeHotkey) -> Result<(), HotkeyError>;
}
