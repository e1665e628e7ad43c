//! The process-wide table of live hotkey bindings.
//!
//! The native layer reports a fired hotkey by identity only. Identities come
//! from a process-wide counter and are never reused, so the table lookup is
//! the whole correlation story: two bindings may ask for the same physical
//! shortcut and the native registration call decides which one gets it.
//!
//! The table holds bindings weakly. A binding's own drop path is what
//! releases its native registration; [`HotkeyRegistry::reset`] only stops
//! the old identities from being dispatched.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{debug, debug_span, error, trace, warn};

use super::binding::{Binding, BindingInner};
use crate::common::collections::HashMap;
use crate::sys::hotkey::{BindingId, HotkeyCenter, HotkeySink};
use crate::sys::keycode;

/// Runs on dispatch with the identity of the binding that fired.
pub type Callback = Rc<dyn Fn(BindingId)>;

static NEXT_BINDING_ID: AtomicU32 = AtomicU32::new(1);

/// Takes the next identity from `counter`, or `None` once it would wrap.
fn take_id(counter: &AtomicU32) -> Option<BindingId> {
    counter
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |id| id.checked_add(1))
        .ok()
        .map(BindingId::new)
}

#[derive(Clone)]
pub struct HotkeyRegistry {
    shared: Rc<Shared>,
}

impl std::fmt::Debug for HotkeyRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotkeyRegistry")
            .field("epoch", &self.shared.epoch.get())
            .field("live", &self.len())
            .finish_non_exhaustive()
    }
}

pub(super) struct Shared {
    hotkeys: Rc<dyn HotkeyCenter>,
    /// Taken on first use; the native subscription is installed at most once.
    sink: RefCell<Option<HotkeySink>>,
    pub(super) epoch: Cell<u64>,
    pub(super) bindings: RefCell<HashMap<BindingId, Weak<BindingInner>>>,
}

impl HotkeyRegistry {
    /// `sink` receives fired identities from the native handler; it is
    /// installed lazily when the first binding is created.
    pub fn new(hotkeys: Rc<dyn HotkeyCenter>, sink: HotkeySink) -> Self {
        HotkeyRegistry {
            shared: Rc::new(Shared {
                hotkeys,
                sink: RefCell::new(Some(sink)),
                epoch: Cell::new(0),
                bindings: RefCell::new(HashMap::default()),
            }),
        }
    }

    /// Resolves the names, assigns the next identity and enables the binding.
    ///
    /// Unknown names are logged and leave the binding inert; the binding is
    /// returned even when enabling fails.
    pub fn create(&self, key: &str, modifiers: &[String], callback: Callback) -> Binding {
        self.create_with(take_id(&NEXT_BINDING_ID), key, modifiers, callback)
    }

    fn create_with(
        &self,
        id: Option<BindingId>,
        key: &str,
        modifiers: &[String],
        callback: Callback,
    ) -> Binding {
        self.ensure_subscribed();

        let key_code = keycode::key_code(key);
        if key_code.is_unknown() {
            warn!(key, "Unknown key name; binding will never fire");
        }
        let (mask, unknown) = keycode::modifier_mask(modifiers);
        if !unknown.is_empty() {
            warn!(key, ?unknown, "Ignoring unknown modifier names");
        }

        let inner = Rc::new(BindingInner {
            id: id.unwrap_or(BindingId::NONE),
            key: key.to_string(),
            modifiers: modifiers.to_vec(),
            key_code,
            mask,
            epoch: self.shared.epoch.get(),
            callback: RefCell::new(Some(callback)),
            native: Cell::new(None),
            hotkeys: self.shared.hotkeys.clone(),
            registry: Rc::downgrade(&self.shared),
        });
        if id.is_none() {
            error!(key, "Binding identities exhausted; binding will never fire");
            return Binding { inner };
        }
        self.shared.bindings.borrow_mut().insert(inner.id, Rc::downgrade(&inner));

        let binding = Binding { inner };
        binding.enable();
        binding
    }

    /// Runs the callback of the live, enabled binding with identity `id`.
    ///
    /// Returns false when nothing ran. The table is not borrowed while the
    /// callback runs, so callbacks may create, disable or drop bindings.
    pub fn dispatch(&self, id: BindingId) -> bool {
        let inner = self.shared.bindings.borrow().get(&id).and_then(Weak::upgrade);
        let Some(inner) = inner else {
            trace!(%id, "Dropping hotkey event for unknown binding");
            return false;
        };
        let binding = Binding { inner };
        if !binding.is_enabled() {
            trace!(%id, "Dropping hotkey event for disabled binding");
            return false;
        }
        let Some(callback) = binding.callback() else {
            return false;
        };

        let _span = debug_span!("dispatch", %id, shortcut = %binding.shortcut()).entered();
        callback(id);
        true
    }

    /// Forgets every identity issued so far.
    ///
    /// Live bindings keep their native registrations until they are dropped
    /// or released by whoever owns them, but they can no longer be
    /// dispatched or re-enabled.
    pub fn reset(&self) {
        let mut bindings = self.shared.bindings.borrow_mut();
        debug!(count = bindings.len(), "Resetting hotkey registry");
        bindings.clear();
        self.shared.epoch.set(self.shared.epoch.get() + 1);
    }

    pub fn contains(&self, id: BindingId) -> bool {
        self.shared.bindings.borrow().get(&id).is_some_and(|weak| weak.strong_count() > 0)
    }

    /// Number of live bindings in the table.
    pub fn len(&self) -> usize {
        self.shared.bindings.borrow().values().filter(|weak| weak.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn ensure_subscribed(&self) {
        let Some(sink) = self.shared.sink.borrow_mut().take() else {
            return;
        };
        match self.shared.hotkeys.subscribe(sink) {
            Ok(()) => debug!("Installed hotkey event handler"),
            Err(err) => error!(%err, "Hotkeys will not fire"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::sys::testing::FakeSystem;

    fn registry(system: &Rc<FakeSystem>) -> (HotkeyRegistry, crossbeam_channel::Receiver<BindingId>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let sink: HotkeySink = Box::new(move |id| {
            let _ = tx.send(id);
        });
        (HotkeyRegistry::new(system.platform().hotkeys, sink), rx)
    }

    fn mods(names: &[&str]) -> Vec<String> { names.iter().map(|s| s.to_string()).collect() }

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> Callback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let make = {
            let log = log.clone();
            move |tag: &'static str| -> Callback {
                let log = log.clone();
                Rc::new(move |_: BindingId| log.borrow_mut().push(tag))
            }
        };
        (log, make)
    }

    #[test]
    fn create_auto_enables() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();

        let binding = registry.create("a", &mods(&["cmd"]), cb("a"));

        assert!(binding.is_enabled());
        assert_eq!(system.registered_ids(), vec![binding.id()]);
        assert!(registry.contains(binding.id()));
    }

    #[test]
    fn enable_disable_round_trip_is_idempotent() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();
        let binding = registry.create("a", &mods(&["cmd"]), cb("a"));

        assert!(binding.enable());
        assert!(binding.enable());
        assert_eq!(system.registration_count(), 1);

        assert!(binding.disable());
        assert!(!binding.is_enabled());
        assert_eq!(system.registration_count(), 0);
        assert!(binding.disable());
        assert_eq!(system.registration_count(), 0);

        assert!(binding.enable());
        assert_eq!(system.registration_count(), 1);
    }

    #[test]
    fn identities_are_distinct_for_repeated_shortcuts() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();

        let bindings: Vec<Binding> =
            (0..5).map(|_| registry.create("space", &mods(&["ctrl", "alt"]), cb("x"))).collect();

        let mut ids: Vec<_> = bindings.iter().map(Binding::id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn conflicting_shortcut_fails_enable_without_state_change() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();

        let first = registry.create("k", &mods(&["cmd"]), cb("first"));
        let second = registry.create("k", &mods(&["command"]), cb("second"));

        assert!(first.is_enabled());
        assert!(!second.is_enabled());
        assert!(!second.enable());
        assert!(!second.is_enabled());

        assert!(first.disable());
        assert!(second.enable());
    }

    #[test]
    fn dispatch_runs_only_the_matching_callback() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (log, cb) = recorder();

        let a = registry.create("a", &mods(&["cmd"]), cb("a"));
        let b = registry.create("b", &mods(&["cmd"]), cb("b"));
        let _c = registry.create("c", &mods(&["cmd"]), cb("c"));

        assert!(registry.dispatch(b.id()));
        assert!(registry.dispatch(b.id()));
        assert!(registry.dispatch(a.id()));

        assert_eq!(*log.borrow(), vec!["b", "b", "a"]);
    }

    #[test]
    fn fired_hotkeys_arrive_through_the_sink() {
        let system = FakeSystem::new();
        let (registry, rx) = registry(&system);
        let (log, cb) = recorder();
        let binding = registry.create("f1", &[], cb("f1"));

        assert!(system.fire(binding.id()));
        let id = rx.try_recv().unwrap();
        assert!(registry.dispatch(id));
        assert_eq!(*log.borrow(), vec!["f1"]);
    }

    #[test]
    fn subscription_is_installed_lazily_once() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();
        assert_eq!(system.subscribe_calls(), 0);

        let _a = registry.create("a", &[], cb("a"));
        let _b = registry.create("b", &[], cb("b"));
        registry.reset();
        let _c = registry.create("c", &[], cb("c"));

        assert_eq!(system.subscribe_calls(), 1);
    }

    #[test]
    fn dispatch_to_disabled_or_dropped_binding_is_a_no_op() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (log, cb) = recorder();

        let disabled = registry.create("a", &[], cb("a"));
        disabled.disable();
        let dropped = registry.create("b", &[], cb("b"));
        let dropped_id = dropped.id();
        drop(dropped);

        assert!(!registry.dispatch(disabled.id()));
        assert!(!registry.dispatch(dropped_id));
        assert!(!registry.dispatch(BindingId::new(u32::MAX)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn dropping_the_last_clone_releases_the_native_hotkey() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();

        let binding = registry.create("a", &[], cb("a"));
        let clone = binding.clone();
        drop(binding);
        assert_eq!(system.registration_count(), 1);

        let id = clone.id();
        drop(clone);
        assert_eq!(system.registration_count(), 0);
        assert!(!registry.contains(id));
    }

    #[test]
    fn release_disables_even_with_live_clones() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (log, cb) = recorder();

        let binding = registry.create("a", &[], cb("a"));
        let clone = binding.clone();
        binding.release();

        assert!(!clone.is_enabled());
        assert_eq!(system.registration_count(), 0);
        assert!(!registry.dispatch(clone.id()));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failed_unregister_leaves_binding_enabled() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (_, cb) = recorder();
        let binding = registry.create("a", &[], cb("a"));

        system.fail_unregister(true);
        assert!(!binding.disable());
        assert!(binding.is_enabled());

        system.fail_unregister(false);
        assert!(binding.disable());
        assert!(!binding.is_enabled());
    }

    #[test]
    fn reset_invalidates_prior_identities_without_unregistering() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (log, cb) = recorder();

        let old = registry.create("a", &[], cb("old"));
        registry.reset();

        assert!(!registry.dispatch(old.id()));
        assert!(old.is_enabled());
        assert_eq!(system.registration_count(), 1);
        assert!(registry.is_empty());

        assert!(old.disable());
        assert!(!old.enable());

        let new = registry.create("a", &[], cb("new"));
        assert!(registry.dispatch(new.id()));
        assert_eq!(*log.borrow(), vec!["new"]);
    }

    #[test]
    fn callbacks_may_mutate_bindings() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let created: Rc<RefCell<Vec<Binding>>> = Rc::default();
        let slot: Rc<RefCell<Option<Binding>>> = Rc::default();

        let callback: Callback = {
            let registry = registry.clone();
            let created = created.clone();
            let slot = slot.clone();
            Rc::new(move |_: BindingId| {
                if let Some(me) = slot.borrow_mut().take() {
                    me.disable();
                }
                created.borrow_mut().push(registry.create("n", &[], Rc::new(|_: BindingId| {})));
            })
        };
        let binding = registry.create("m", &[], callback);
        let id = binding.id();
        *slot.borrow_mut() = Some(binding);

        assert!(registry.dispatch(id));
        assert_eq!(created.borrow().len(), 1);
        assert!(!registry.dispatch(id));
        assert!(registry.contains(created.borrow()[0].id()));
    }

    #[test_log::test]
    fn unknown_names_yield_an_inert_binding() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (log, cb) = recorder();

        let binding = registry.create("not-a-key", &mods(&["hyper"]), cb("x"));

        assert_eq!(binding.key(), "not-a-key");
        assert_eq!(binding.shortcut(), "not-a-key[hyper]");
        assert!(registry.contains(binding.id()));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn callback_receives_its_own_identity() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let seen: Rc<RefCell<Vec<BindingId>>> = Rc::default();
        let callback: Callback = {
            let seen = seen.clone();
            Rc::new(move |id: BindingId| seen.borrow_mut().push(id))
        };

        let binding = registry.create("a", &[], callback);
        assert!(registry.dispatch(binding.id()));
        assert_eq!(*seen.borrow(), vec![binding.id()]);
    }

    #[test]
    fn identity_counter_stops_instead_of_wrapping() {
        let counter = AtomicU32::new(u32::MAX - 1);
        assert_eq!(take_id(&counter), Some(BindingId::new(u32::MAX - 1)));
        assert_eq!(take_id(&counter), None);
        assert_eq!(take_id(&counter), None);
        assert_eq!(counter.load(Ordering::Relaxed), u32::MAX);
    }

    #[test_log::test]
    fn binding_without_identity_is_never_registered() {
        let system = FakeSystem::new();
        let (registry, _rx) = registry(&system);
        let (log, cb) = recorder();

        let binding = registry.create_with(None, "a", &mods(&["cmd"]), cb("a"));

        assert_eq!(binding.id(), BindingId::NONE);
        assert!(!binding.is_enabled());
        assert!(!binding.enable());
        assert_eq!(system.registration_count(), 0);
        assert!(!registry.contains(BindingId::NONE));
        assert!(!registry.dispatch(BindingId::NONE));
        assert!(log.borrow().is_empty());
    }
}
