use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, warn};

use super::registry::{Callback, Shared};
use crate::sys::hotkey::{BindingId, HotkeyCenter, NativeHotkey};
use crate::sys::keycode::{KeyCode, ModifierMask};

/// A registered global shortcut and its callback.
///
/// Cloning shares the registration. Dropping the last clone disables it and
/// removes it from the registry.
#[derive(Clone)]
pub struct Binding {
    pub(super) inner: Rc<BindingInner>,
}

pub(super) struct BindingInner {
    pub(super) id: BindingId,
    pub(super) key: String,
    pub(super) modifiers: Vec<String>,
    pub(super) key_code: KeyCode,
    pub(super) mask: ModifierMask,
    pub(super) epoch: u64,
    pub(super) callback: RefCell<Option<Callback>>,
    /// Present exactly while enabled.
    pub(super) native: Cell<Option<NativeHotkey>>,
    pub(super) hotkeys: Rc<dyn HotkeyCenter>,
    pub(super) registry: Weak<Shared>,
}

impl Binding {
    pub fn id(&self) -> BindingId { self.inner.id }

    pub fn key(&self) -> &str { &self.inner.key }

    pub fn modifiers(&self) -> &[String] { &self.inner.modifiers }

    pub fn is_enabled(&self) -> bool { self.inner.is_enabled() }

    /// `key[mod|mod]`, for diagnostics only.
    pub fn shortcut(&self) -> String { self.inner.shortcut() }

    pub fn enable(&self) -> bool { self.inner.enable() }

    pub fn disable(&self) -> bool { self.inner.disable() }

    /// Disables the binding, drops its callback and removes it from the
    /// registry, regardless of how many clones are still alive.
    pub fn release(&self) {
        self.inner.disable();
        self.inner.callback.borrow_mut().take();
        self.inner.forget();
    }

    pub(super) fn callback(&self) -> Option<Callback> { self.inner.callback.borrow().clone() }

    pub fn downgrade(&self) -> WeakBinding { WeakBinding(Rc::downgrade(&self.inner)) }
}

/// A handle that does not keep the binding alive.
#[derive(Clone)]
pub struct WeakBinding(Weak<BindingInner>);

impl WeakBinding {
    pub fn upgrade(&self) -> Option<Binding> { self.0.upgrade().map(|inner| Binding { inner }) }

    pub fn is_live(&self) -> bool { self.0.strong_count() > 0 }
}

impl BindingInner {
    pub(super) fn is_enabled(&self) -> bool { self.native.get().is_some() }

    pub(super) fn shortcut(&self) -> String {
        format!("{}[{}]", self.key, self.modifiers.join("|"))
    }

    fn is_stale(&self) -> bool {
        self.registry.upgrade().is_none_or(|shared| shared.epoch.get() != self.epoch)
    }

    fn enable(&self) -> bool {
        if self.is_enabled() {
            return true;
        }
        if self.id == BindingId::NONE {
            return false;
        }
        if self.is_stale() {
            warn!(id = %self.id, shortcut = %self.shortcut(), "Refusing to enable binding from before the last reset");
            return false;
        }
        match self.hotkeys.register(self.key_code, self.mask, self.id) {
            Ok(handle) => {
                self.native.set(Some(handle));
                debug!(id = %self.id, shortcut = %self.shortcut(), "Enabled");
                true
            }
            Err(err) => {
                warn!(id = %self.id, shortcut = %self.shortcut(), %err, "Could not enable binding");
                false
            }
        }
    }

    fn disable(&self) -> bool {
        let Some(handle) = self.native.get() else {
            return true;
        };
        match self.hotkeys.unregister(handle) {
            Ok(()) => {
                self.native.set(None);
                debug!(id = %self.id, shortcut = %self.shortcut(), "Disabled");
                true
            }
            Err(err) => {
                warn!(id = %self.id, shortcut = %self.shortcut(), %err, "Could not disable binding");
                false
            }
        }
    }

    fn forget(&self) {
        if let Some(shared) = self.registry.upgrade()
            && let Ok(mut bindings) = shared.bindings.try_borrow_mut()
        {
            bindings.remove(&self.id);
        }
    }
}

impl Drop for BindingInner {
    fn drop(&mut self) {
        self.disable();
        self.forget();
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool { self.inner.id == other.inner.id }
}

impl Eq for Binding {}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("shortcut", &self.inner.shortcut())
            .field("enabled", &self.inner.is_enabled())
            .finish_non_exhaustive()
    }
}
