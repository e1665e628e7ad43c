//! The rhai side: one runtime per load of the user script.
//!
//! A reload always runs the same sequence: reset the hotkey registry, the
//! timers and the application observers, drop the previous runtime, then
//! evaluate the bundled prelude, any extra
//! libraries and finally the user script in a fresh runtime.

mod api;
mod runtime;

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use tracing::{error, info, info_span};

pub use self::runtime::ScriptRuntime;
use crate::actor::controller;
use crate::common::config::Config;
use crate::model::{AppObservers, HotkeyRegistry, TimerQueue};
use crate::sys::Platform;
use crate::sys::hotkey::BindingId;

const PRELUDE_NAME: &str = "prelude.rhai";
const PRELUDE: &str = include_str!("prelude.rhai");

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] rhai::ParseError),
    #[error("{0}")]
    Runtime(#[from] Box<rhai::EvalAltResult>),
}

/// Everything a runtime needs from the host.
#[derive(Clone, Debug)]
pub struct Context {
    pub platform: Platform,
    pub registry: HotkeyRegistry,
    pub events: controller::Sender,
    pub timers: TimerQueue,
    pub app_events: AppObservers,
}

impl Context {
    pub fn new(platform: Platform, registry: HotkeyRegistry, events: controller::Sender) -> Self {
        let app_events = AppObservers::new(platform.clone());
        Context { platform, registry, events, timers: TimerQueue::new(), app_events }
    }
}

pub struct ScriptBridge {
    context: Context,
    config: Config,
    runtime: Option<Rc<ScriptRuntime>>,
}

impl ScriptBridge {
    pub fn new(context: Context, config: Config) -> Self {
        ScriptBridge { context, config, runtime: None }
    }

    pub fn config(&self) -> &Config { &self.config }

    /// Tears down the current runtime and loads everything again.
    ///
    /// Errors in any one script are logged and the remaining scripts still
    /// run.
    pub fn reload(&mut self) {
        let _span = info_span!("reload", script = %self.config.script.display()).entered();

        self.context.registry.reset();
        self.context.timers.reset();
        self.context.app_events.reset();
        self.runtime = None;

        let runtime = ScriptRuntime::new(&self.context);
        if let Err(err) = runtime.eval(PRELUDE_NAME, PRELUDE) {
            error!(%err, "Bundled prelude failed");
        }
        for library in &self.config.libraries {
            if let Err(err) = runtime.eval_file(library) {
                error!(path = %library.display(), %err, "Library script failed");
            }
        }
        if let Err(err) = runtime.eval_file(&self.config.script) {
            error!(path = %self.config.script.display(), %err, "User script failed");
        }
        info!(
            bindings = self.context.registry.len(),
            timers = self.context.timers.len(),
            observers = self.context.app_events.len(),
            "Loaded"
        );

        self.runtime = Some(runtime);
    }

    /// Runs the callback bound to `id`, if it is still live.
    pub fn dispatch(&self, id: BindingId) -> bool { self.context.registry.dispatch(id) }

    /// Fires due timers and reports application launches and terminations.
    pub fn tick(&self, now: Instant) {
        self.context.timers.fire_due(now);
        self.context.app_events.poll(now);
    }

    /// When [`tick`](Self::tick) next has work, if anything is scheduled.
    pub fn next_deadline(&self) -> Option<Instant> { self.context.timers.next_deadline() }

    pub fn registry(&self) -> &HotkeyRegistry { &self.context.registry }

    pub fn runtime(&self) -> Option<&Rc<ScriptRuntime>> { self.runtime.as_ref() }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actor;
    use crate::sys::testing::FakeSystem;

    struct Fixture {
        system: Rc<FakeSystem>,
        bridge: ScriptBridge,
        events: controller::Receiver,
        dir: tempfile::TempDir,
    }

    fn write(dir: &Path, name: &str, source: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, source).unwrap();
        path
    }

    fn fixture(libraries: &[(&str, &str)], script: &str) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let libraries = libraries.iter().map(|(name, src)| write(dir.path(), name, src)).collect();
        let script = write(dir.path(), "stark.rhai", script);

        let system = FakeSystem::new();
        let platform = system.platform();
        let (tx, events) = actor::channel();
        let registry =
            HotkeyRegistry::new(platform.hotkeys.clone(), controller::hotkey_sink(tx.clone()));
        let bridge = ScriptBridge::new(
            Context::new(platform, registry, tx),
            Config::new(Some(script), libraries, false),
        );
        Fixture { system, bridge, events, dir }
    }

    #[test]
    fn libraries_load_before_the_user_script() {
        let mut f = fixture(
            &[("a.rhai", "fn greet(name) { App.launch(`lib:${name}`) }")],
            r#"greet("user");"#,
        );
        f.bridge.reload();
        assert_eq!(f.system.launched(), vec!["lib:user".to_string()]);
    }

    #[test]
    fn library_variables_are_visible_to_the_user_script() {
        let mut f = fixture(&[("a.rhai", "const MODS = [\"cmd\", \"alt\", \"ctrl\", \"shift\"];")], r#"
            let b = Bind("x", MODS, || ());
            App.launch(b.shortcut);
        "#);
        f.bridge.reload();
        assert_eq!(f.system.launched(), vec!["x[cmd|alt|ctrl|shift]".to_string()]);
    }

    #[test]
    fn reload_invalidates_every_prior_identity() {
        let mut f = fixture(&[], r#"
            let a = Bind("a", ["cmd"], || App.launch("a"));
            let b = Bind("b", ["cmd"], || App.launch("b"));
        "#);
        f.bridge.reload();
        let old = f.system.registered_ids();
        assert_eq!(old.len(), 2);

        f.bridge.reload();
        for id in &old {
            assert!(!f.bridge.dispatch(*id));
        }
        let new = f.system.registered_ids();
        assert_eq!(new.len(), 2);
        assert!(new.iter().all(|id| !old.contains(id)));
        assert!(f.system.launched().is_empty());
    }

    #[test]
    fn teardown_releases_bindings_held_in_cycles() {
        let mut f = fixture(&[], r#"
            let slot = [];
            let b = Bind("a", [], || slot.len());
            slot.push(b);
        "#);
        f.bridge.reload();
        assert_eq!(f.system.registration_count(), 1);

        write(f.dir.path(), "stark.rhai", "");
        f.bridge.reload();
        assert_eq!(f.system.registration_count(), 0);
    }

    #[test_log::test]
    fn errors_are_contained() {
        let mut f = fixture(
            &[("broken.rhai", "let = ;"), ("throws.rhai", "throw \"boom\";")],
            r#"
                let b = Bind("e", [], || { throw "callback"; });
                App.launch("after");
                undefined_function();
            "#,
        );
        f.bridge.reload();
        assert_eq!(f.system.launched(), vec!["after".to_string()]);

        let id = f.system.registered_ids()[0];
        assert!(f.bridge.dispatch(id));
    }

    #[test_log::test]
    fn missing_user_script_is_logged() {
        let mut f = fixture(&[], "");
        fs::remove_file(&f.bridge.config().script).unwrap();
        f.bridge.reload();
        assert!(f.bridge.runtime().is_some());
        assert!(f.bridge.registry().is_empty());
    }

    #[test_log::test]
    fn run_with_missing_binary_does_not_raise() {
        let mut f = fixture(&[], r#"
            Stark.run("/nonexistent", []);
            Stark.run("/nonexistent");
            App.launch("still running");
        "#);
        f.bridge.reload();
        assert_eq!(f.system.launched(), vec!["still running".to_string()]);
    }

    #[test]
    fn bindings_dropped_by_the_script_are_released() {
        let mut f = fixture(&[], r#"
            fn temp() {
                let b = Bind("a", ["cmd"], || App.launch("fired"));
                b.id
            }
            App.launch(`${temp()}`);
            Bind("b", ["cmd"], || ());
        "#);
        f.bridge.reload();
        assert_eq!(f.system.registration_count(), 0);
        assert!(f.bridge.registry().is_empty());
        assert_eq!(f.bridge.runtime().map(|r| r.binding_count()), Some(0));

        let launched = f.system.launched();
        let id: u32 = launched[0].parse().unwrap();
        assert!(!f.bridge.dispatch(BindingId::new(id)));
        assert_eq!(f.system.launched(), launched);
    }

    #[test]
    fn tick_drives_timers_and_app_events() {
        let mut f = fixture(&[], r#"
            let t = Timer.after(1, |t| App.launch("timer"));
            let o = Event.on("appLaunched", |app| App.launch(`launched ${app.name}`));
        "#);
        f.bridge.reload();
        assert!(f.bridge.next_deadline().is_some());

        f.system.add_app(7, "Notes");
        f.bridge.tick(Instant::now() + Duration::from_secs(1));
        assert_eq!(f.system.launched(), vec!["timer", "launched Notes"]);
        assert_eq!(f.bridge.next_deadline(), None);
    }

    #[test]
    fn reload_cancels_timers_and_observers() {
        let mut f = fixture(&[], r#"
            let t = Timer.every(1, |t| App.launch("old timer"));
            let o = Event.on("appLaunched", |app| App.launch("old observer"));
        "#);
        f.bridge.reload();
        write(f.dir.path(), "stark.rhai", "");
        f.bridge.reload();

        f.system.add_app(7, "Notes");
        f.bridge.tick(Instant::now() + Duration::from_secs(1));
        assert!(f.system.launched().is_empty());
        assert_eq!(f.bridge.next_deadline(), None);
    }

    #[test]
    fn reload_from_a_script_is_queued() {
        let mut f = fixture(&[], "Stark.reload();");
        f.bridge.reload();
        let (_, event) = f.events.try_recv().unwrap();
        assert_eq!(event, controller::Event::ReloadRequested);
        assert!(f.events.try_recv().is_err());
    }
}
