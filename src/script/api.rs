//! Script-visible globals and types.
//!
//! `App`, `Window`, `Space`, `Screen`, `Timer`, `Event` and `Stark` are
//! namespace constants; `Bind(key, modifiers, callback)` creates a hotkey
//! binding. Lookups that may find nothing return `()`.

use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, INT, Map, Module, NativeCallContext};
use tracing::{debug, info, warn};

use super::Context;
use super::runtime::{Owned, ScriptRuntime};
use crate::actor::controller::{self, Event};
use crate::common::log::SCRIPT_TARGET;
use crate::model::{
    AppEvent, AppObservers, ApplicationRef, Binding, HotkeyRegistry, Observer, ScreenRef, SpaceRef,
    Timer, TimerQueue, WindowFilter, WindowRef,
};
use crate::sys::Platform;
use crate::sys::process::spawn_detached;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

#[derive(Clone)]
struct StarkNamespace {
    events: controller::Sender,
}

#[derive(Clone)]
struct AppNamespace(Platform);

#[derive(Clone)]
struct WindowNamespace(Platform);

#[derive(Clone)]
struct SpaceNamespace(Platform);

#[derive(Clone)]
struct ScreenNamespace(Platform);

#[derive(Clone)]
struct TimerNamespace {
    timers: TimerQueue,
    runtime: Weak<ScriptRuntime>,
}

#[derive(Clone)]
struct EventNamespace {
    observers: AppObservers,
    runtime: Weak<ScriptRuntime>,
}

pub(super) fn register(engine: &mut Engine, context: &Context, runtime: Weak<ScriptRuntime>) {
    register_output(engine);
    register_bind(engine, context.registry.clone(), runtime.clone());

    let mut globals = Module::new();
    register_stark(engine, &mut globals, context.events.clone());
    register_app(engine, &mut globals, &context.platform);
    register_window(engine, &mut globals, &context.platform);
    register_space(engine, &mut globals, &context.platform);
    register_screen(engine, &mut globals, &context.platform);
    let timers = TimerNamespace { timers: context.timers.clone(), runtime: runtime.clone() };
    register_timer(engine, &mut globals, timers);
    let events = EventNamespace { observers: context.app_events.clone(), runtime };
    register_event(engine, &mut globals, events);
    engine.register_global_module(globals.into());
}

fn optional<T: Clone + 'static>(value: Option<T>) -> Dynamic { value.map_or(Dynamic::UNIT, Dynamic::from) }

fn array<T: Clone + 'static>(values: Vec<T>) -> Array { values.into_iter().map(Dynamic::from).collect() }

fn window_filter(options: Map) -> RhaiResult<WindowFilter> { from_dynamic(&Dynamic::from_map(options)) }

fn runtime_error(ctx: &NativeCallContext, message: String) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(message.into(), ctx.call_position()).into()
}

fn live_runtime(ctx: &NativeCallContext, runtime: &Weak<ScriptRuntime>) -> RhaiResult<Rc<ScriptRuntime>> {
    runtime
        .upgrade()
        .ok_or_else(|| runtime_error(ctx, "script runtime is shutting down".to_string()))
}

/// `==`, `!=` and printing for a descriptor type.
fn register_identity<T>(engine: &mut Engine)
where T: Clone + PartialEq + fmt::Debug + 'static {
    engine
        .register_fn("==", |a: T, b: T| a == b)
        .register_fn("!=", |a: T, b: T| a != b)
        .register_fn("to_string", |a: &mut T| format!("{a:?}"))
        .register_fn("to_debug", |a: &mut T| format!("{a:?}"));
}

fn register_output(engine: &mut Engine) {
    engine.on_print(|text| info!(target: SCRIPT_TARGET, "{text}"));
    engine.on_debug(|text, source, pos| {
        debug!(target: SCRIPT_TARGET, source = source.unwrap_or(""), %pos, "{text}")
    });
}

fn register_stark(engine: &mut Engine, globals: &mut Module, events: controller::Sender) {
    engine
        .register_type_with_name::<StarkNamespace>("StarkNamespace")
        .register_fn("log", |_: StarkNamespace, message: Dynamic| {
            info!(target: SCRIPT_TARGET, "{message}")
        })
        .register_fn("reload", |ns: StarkNamespace| ns.events.send(Event::ReloadRequested))
        .register_fn("run", |_: StarkNamespace, path: &str| {
            spawn_detached(path, &[]);
        })
        .register_fn("run", |_: StarkNamespace, path: &str, args: Array| {
            let args: Vec<String> = args.iter().map(Dynamic::to_string).collect();
            spawn_detached(path, &args);
        });
    globals.set_var("Stark", StarkNamespace { events });
}

fn register_bind(engine: &mut Engine, registry: HotkeyRegistry, runtime: Weak<ScriptRuntime>) {
    let bind = move |ctx: &NativeCallContext,
                     key: &str,
                     modifiers: Array,
                     callback: FnPtr|
          -> RhaiResult<Binding> {
        let modifiers = modifiers
            .into_iter()
            .map(|value| {
                value.into_string().map_err(|ty| {
                    runtime_error(ctx, format!("modifier names must be strings, not {ty}"))
                })
            })
            .collect::<RhaiResult<Vec<String>>>()?;
        let runtime = live_runtime(ctx, &runtime)
            .inspect_err(|_| warn!(key, "Ignoring binding created during teardown"))?;
        let binding = registry.create(key, &modifiers, runtime.binding_callback(callback));
        runtime.adopt(Owned::Binding(binding.downgrade()));
        Ok(binding)
    };

    {
        let bind = bind.clone();
        engine.register_fn(
            "Bind",
            move |ctx: NativeCallContext, key: &str, modifiers: Array, callback: FnPtr| {
                bind(&ctx, key, modifiers, callback)
            },
        );
    }
    engine.register_fn("Bind", move |ctx: NativeCallContext, key: &str, callback: FnPtr| {
        bind(&ctx, key, Array::new(), callback)
    });

    engine
        .register_type_with_name::<Binding>("Binding")
        .register_get("id", |b: &mut Binding| b.id().as_u32() as INT)
        .register_get("key", |b: &mut Binding| b.key().to_string())
        .register_get("modifiers", |b: &mut Binding| {
            b.modifiers().iter().cloned().map(Dynamic::from).collect::<Array>()
        })
        .register_get("is_enabled", |b: &mut Binding| b.is_enabled())
        .register_get("shortcut", |b: &mut Binding| b.shortcut())
        .register_fn("enable", |b: &mut Binding| b.enable())
        .register_fn("disable", |b: &mut Binding| b.disable());
    register_identity::<Binding>(engine);
}

fn register_app(engine: &mut Engine, globals: &mut Module, platform: &Platform) {
    engine
        .register_type_with_name::<AppNamespace>("AppNamespace")
        .register_fn("all", |ns: AppNamespace| array(ApplicationRef::all(&ns.0)))
        .register_fn("find", |ns: AppNamespace, name: &str| {
            optional(ApplicationRef::find(&ns.0, name))
        })
        .register_fn("focused", |ns: AppNamespace| optional(ApplicationRef::focused(&ns.0)))
        .register_fn("launch", |ns: AppNamespace, name: &str| {
            ApplicationRef::launch(&ns.0, name);
        });
    globals.set_var("App", AppNamespace(platform.clone()));

    engine
        .register_type_with_name::<ApplicationRef>("Application")
        .register_get("pid", |a: &mut ApplicationRef| a.pid() as INT)
        .register_get("name", |a: &mut ApplicationRef| a.name().unwrap_or_default())
        .register_get("bundle_id", |a: &mut ApplicationRef| a.bundle_id().unwrap_or_default())
        .register_get("is_active", |a: &mut ApplicationRef| a.is_active())
        .register_get("is_hidden", |a: &mut ApplicationRef| a.is_hidden())
        .register_get("is_terminated", |a: &mut ApplicationRef| a.is_terminated())
        .register_fn("windows", |a: &mut ApplicationRef| array(a.windows(WindowFilter::default())))
        .register_fn("windows", |a: &mut ApplicationRef, options: Map| -> RhaiResult<Array> {
            Ok(array(a.windows(window_filter(options)?)))
        })
        .register_fn("activate", |a: &mut ApplicationRef| a.activate())
        .register_fn("focus", |a: &mut ApplicationRef| a.focus())
        .register_fn("show", |a: &mut ApplicationRef| a.show())
        .register_fn("hide", |a: &mut ApplicationRef| a.hide());
    register_identity::<ApplicationRef>(engine);
}

fn register_window(engine: &mut Engine, globals: &mut Module, platform: &Platform) {
    engine
        .register_type_with_name::<WindowNamespace>("WindowNamespace")
        .register_fn("all", |ns: WindowNamespace| array(WindowRef::all(&ns.0, WindowFilter::default())))
        .register_fn("all", |ns: WindowNamespace, options: Map| -> RhaiResult<Array> {
            Ok(array(WindowRef::all(&ns.0, window_filter(options)?)))
        })
        .register_fn("focused", |ns: WindowNamespace| optional(WindowRef::focused(&ns.0)));
    globals.set_var("Window", WindowNamespace(platform.clone()));

    engine
        .register_type_with_name::<WindowRef>("Window")
        .register_get("title", |w: &mut WindowRef| w.title())
        .register_get("id", |w: &mut WindowRef| optional(w.id().map(|id| id.as_u32() as INT)))
        .register_get("is_standard", |w: &mut WindowRef| w.is_standard())
        .register_get("is_minimized", |w: &mut WindowRef| w.is_minimized())
        .register_get("is_visible", |w: &mut WindowRef| w.is_visible())
        .register_fn("app", |w: &mut WindowRef| optional(w.app()))
        .register_fn("spaces", |w: &mut WindowRef| array(w.spaces()))
        .register_fn("focus", |w: &mut WindowRef| w.focus());
    register_identity::<WindowRef>(engine);
}

fn register_space(engine: &mut Engine, globals: &mut Module, platform: &Platform) {
    engine
        .register_type_with_name::<SpaceNamespace>("SpaceNamespace")
        .register_fn("active", |ns: SpaceNamespace| SpaceRef::active(&ns.0))
        .register_fn("all", |ns: SpaceNamespace| array(SpaceRef::all(&ns.0)))
        .register_fn("current_space", |ns: SpaceNamespace, screen: ScreenRef| {
            optional(SpaceRef::current_for(&ns.0, &screen))
        })
        .register_fn("spaces", |ns: SpaceNamespace, window: WindowRef| {
            array(SpaceRef::spaces_for(&ns.0, &window))
        });
    globals.set_var("Space", SpaceNamespace(platform.clone()));

    engine
        .register_type_with_name::<SpaceRef>("Space")
        .register_get("id", |s: &mut SpaceRef| s.id().get() as INT)
        .register_get("is_normal", |s: &mut SpaceRef| s.is_normal())
        .register_get("is_fullscreen", |s: &mut SpaceRef| s.is_fullscreen())
        .register_fn("screens", |s: &mut SpaceRef| array(s.screens()))
        .register_fn("windows", |s: &mut SpaceRef| array(s.windows(WindowFilter::default())))
        .register_fn("windows", |s: &mut SpaceRef, options: Map| -> RhaiResult<Array> {
            Ok(array(s.windows(window_filter(options)?)))
        });
    register_identity::<SpaceRef>(engine);
}

fn register_screen(engine: &mut Engine, globals: &mut Module, platform: &Platform) {
    engine
        .register_type_with_name::<ScreenNamespace>("ScreenNamespace")
        .register_fn("all", |ns: ScreenNamespace| array(ScreenRef::all(&ns.0)))
        .register_fn("main", |ns: ScreenNamespace| optional(ScreenRef::main(&ns.0)));
    globals.set_var("Screen", ScreenNamespace(platform.clone()));

    engine
        .register_type_with_name::<ScreenRef>("Screen")
        .register_get("id", |s: &mut ScreenRef| s.id().to_string())
        .register_get("frame", |s: &mut ScreenRef| to_dynamic(s.frame()))
        .register_get("is_main", |s: &mut ScreenRef| s.is_main())
        .register_fn("current_space", |s: &mut ScreenRef| optional(s.current_space()))
        .register_fn("spaces", |s: &mut ScreenRef| array(s.spaces()));
    register_identity::<ScreenRef>(engine);
}

fn register_timer(engine: &mut Engine, globals: &mut Module, namespace: TimerNamespace) {
    fn schedule(
        ctx: &NativeCallContext,
        ns: &TimerNamespace,
        ms: INT,
        repeats: bool,
        callback: FnPtr,
    ) -> RhaiResult<Timer> {
        let interval = u64::try_from(ms)
            .ok()
            .filter(|&ms| ms > 0 || !repeats)
            .map(Duration::from_millis)
            .ok_or_else(|| runtime_error(ctx, format!("invalid timer interval: {ms}ms")))?;
        let runtime = live_runtime(ctx, &ns.runtime)?;
        let timer =
            ns.timers.schedule(Instant::now(), interval, repeats, runtime.timer_callback(callback));
        runtime.adopt(Owned::Timer(timer.downgrade()));
        Ok(timer)
    }

    engine
        .register_type_with_name::<TimerNamespace>("TimerNamespace")
        .register_fn("after", |ctx: NativeCallContext, ns: TimerNamespace, ms: INT, f: FnPtr| {
            schedule(&ctx, &ns, ms, false, f)
        })
        .register_fn("every", |ctx: NativeCallContext, ns: TimerNamespace, ms: INT, f: FnPtr| {
            schedule(&ctx, &ns, ms, true, f)
        });
    globals.set_var("Timer", namespace);

    engine
        .register_type_with_name::<Timer>("Timer")
        .register_get("id", |t: &mut Timer| t.id().get() as INT)
        .register_get("interval", |t: &mut Timer| t.interval().as_millis() as INT)
        .register_get("repeats", |t: &mut Timer| t.repeats())
        .register_get("is_active", |t: &mut Timer| t.is_active())
        .register_fn("stop", |t: &mut Timer| t.stop());
    register_identity::<Timer>(engine);
}

fn register_event(engine: &mut Engine, globals: &mut Module, namespace: EventNamespace) {
    engine.register_type_with_name::<EventNamespace>("EventNamespace").register_fn(
        "on",
        |ctx: NativeCallContext,
         ns: EventNamespace,
         name: &str,
         callback: FnPtr|
         -> RhaiResult<Observer> {
            let event: AppEvent = name.parse().map_err(|_| {
                let expected = "expected appLaunched or appTerminated";
                runtime_error(&ctx, format!("unknown event {name:?}; {expected}"))
            })?;
            let runtime = live_runtime(&ctx, &ns.runtime)?;
            let observer = ns.observers.observe(event, runtime.observer_callback(callback));
            runtime.adopt(Owned::Observer(observer.downgrade()));
            Ok(observer)
        },
    );
    globals.set_var("Event", namespace);

    engine
        .register_type_with_name::<Observer>("Observer")
        .register_get("id", |o: &mut Observer| o.id().get() as INT)
        .register_get("event", |o: &mut Observer| o.event().to_string())
        .register_get("is_active", |o: &mut Observer| o.is_active())
        .register_fn("stop", |o: &mut Observer| o.stop());
    register_identity::<Observer>(engine);
}
