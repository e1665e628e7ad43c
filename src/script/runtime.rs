use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::rc::{Rc, Weak};

use rhai::{AST, Dynamic, Engine, EvalAltResult, FnPtr, FuncArgs, Scope};
use tracing::{debug, error};

use super::{Context, ScriptError, api};
use crate::model::observer::AppCallback;
use crate::model::timer::TimerCallback;
use crate::model::{
    ApplicationRef, Callback, Observer, Timer, WeakBinding, WeakObserver, WeakTimer,
};
use crate::sys::hotkey::BindingId;

/// Something a script created that must not outlive its runtime.
///
/// Only weak handles are kept; a handle the script drops is gone at once.
pub(super) enum Owned {
    Binding(WeakBinding),
    Timer(WeakTimer),
    Observer(WeakObserver),
}

impl Owned {
    fn is_live(&self) -> bool {
        match self {
            Owned::Binding(binding) => binding.is_live(),
            Owned::Timer(timer) => timer.is_live(),
            Owned::Observer(observer) => observer.is_live(),
        }
    }

    fn release(&self) {
        match self {
            Owned::Binding(binding) => {
                if let Some(binding) = binding.upgrade() {
                    binding.release();
                }
            }
            Owned::Timer(timer) => {
                if let Some(timer) = timer.upgrade() {
                    timer.stop();
                }
            }
            Owned::Observer(observer) => {
                if let Some(observer) = observer.upgrade() {
                    observer.stop();
                }
            }
        }
    }
}

/// One rhai engine plus everything evaluated into it so far.
///
/// Script functions and top-level variables accumulate across [`eval`]
/// calls, so later scripts see what earlier ones defined.
///
/// [`eval`]: ScriptRuntime::eval
pub struct ScriptRuntime {
    engine: Engine,
    functions: RefCell<AST>,
    scope: RefCell<Scope<'static>>,
    /// Handles created through this runtime; survivors are released on drop.
    owned: RefCell<Vec<Owned>>,
    this: Weak<ScriptRuntime>,
}

impl ScriptRuntime {
    pub fn new(context: &Context) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<ScriptRuntime>| {
            let mut engine = Engine::new();
            api::register(&mut engine, context, this.clone());
            ScriptRuntime {
                engine,
                functions: RefCell::new(AST::empty()),
                scope: RefCell::new(Scope::new()),
                owned: RefCell::new(Vec::new()),
                this: this.clone(),
            }
        })
    }

    pub fn eval(&self, name: &str, source: &str) -> Result<(), ScriptError> {
        let mut ast = self.engine.compile(source)?;
        ast.set_source(name);

        let merged = self.functions.borrow().merge(&ast);
        *self.functions.borrow_mut() = merged.clone_functions_only();

        debug!(name, "Evaluating");
        let mut scope = self.scope.borrow_mut();
        self.engine.run_ast_with_scope(&mut scope, &merged)?;
        Ok(())
    }

    pub fn eval_file(&self, path: &Path) -> Result<(), ScriptError> {
        let source = fs::read_to_string(path)
            .map_err(|source| ScriptError::Io { path: path.to_path_buf(), source })?;
        self.eval(&path.display().to_string(), &source)
    }

    /// Wraps a script function as a hotkey callback.
    ///
    /// Like every callback built here, it holds the runtime weakly and does
    /// nothing once the runtime is gone.
    pub(super) fn binding_callback(&self, function: FnPtr) -> Callback {
        let runtime = self.this.clone();
        Rc::new(move |id: BindingId| {
            if let Some(runtime) = runtime.upgrade()
                && let Err(err) = runtime.call(&function, ())
            {
                error!(%id, %err, "Hotkey callback failed");
            }
        })
    }

    /// Wraps a script function taking the timer that fired.
    pub(super) fn timer_callback(&self, function: FnPtr) -> TimerCallback {
        let runtime = self.this.clone();
        Rc::new(move |timer: &Timer| {
            if let Some(runtime) = runtime.upgrade()
                && let Err(err) = runtime.call(&function, (timer.clone(),))
            {
                error!(id = %timer.id(), %err, "Timer callback failed");
            }
        })
    }

    /// Wraps a script function taking the application an event is about.
    pub(super) fn observer_callback(&self, function: FnPtr) -> AppCallback {
        let runtime = self.this.clone();
        Rc::new(move |observer: &Observer, app: ApplicationRef| {
            if let Some(runtime) = runtime.upgrade()
                && let Err(err) = runtime.call(&function, (app,))
            {
                let (id, event) = (observer.id().get(), observer.event());
                error!(id, %event, %err, "Event callback failed");
            }
        })
    }

    fn call(&self, function: &FnPtr, args: impl FuncArgs) -> Result<(), Box<EvalAltResult>> {
        let functions = self.functions.borrow();
        function.call::<Dynamic>(&self.engine, &functions, args).map(drop)
    }

    /// Tracks `handle` for release on drop, forgetting handles that have
    /// already gone away.
    pub(super) fn adopt(&self, handle: Owned) {
        let mut owned = self.owned.borrow_mut();
        owned.retain(Owned::is_live);
        owned.push(handle);
    }

    /// Number of bindings created here that are still alive.
    pub fn binding_count(&self) -> usize {
        let owned = self.owned.borrow();
        owned.iter().filter(|h| matches!(h, Owned::Binding(_)) && h.is_live()).count()
    }
}

impl Drop for ScriptRuntime {
    fn drop(&mut self) {
        let owned: Vec<Owned> = self.owned.take().into_iter().filter(Owned::is_live).collect();
        debug!(count = owned.len(), "Releasing script handles");
        for handle in owned {
            handle.release();
        }
    }
}
