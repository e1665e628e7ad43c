//! Application launch and termination notifications.
//!
//! The running-process list is diffed against the previous snapshot each
//! time [`AppObservers::poll`] runs. The snapshot is taken when the first
//! observer is registered, so apps that were already running are never
//! reported as launched.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use strum::EnumString;
use tracing::{debug, debug_span, trace};

use super::app::ApplicationRef;
use crate::common::collections::{HashMap, HashSet};
use crate::sys::{Platform, pid_t};

/// Minimum spacing between two process-list snapshots.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, strum::Display)]
pub enum AppEvent {
    #[strum(serialize = "appLaunched")]
    Launched,
    #[strum(serialize = "appTerminated")]
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl ObserverId {
    pub fn get(self) -> u64 { self.0 }
}

/// Runs with the application the event is about. For terminations the
/// application is already gone; only its pid is meaningful.
pub type AppCallback = Rc<dyn Fn(&Observer, ApplicationRef)>;

#[derive(Clone)]
pub struct AppObservers {
    shared: Rc<ObserversShared>,
}

struct ObserversShared {
    platform: Platform,
    next_id: Cell<u64>,
    known: RefCell<Vec<pid_t>>,
    next_poll: Cell<Option<Instant>>,
    observers: RefCell<HashMap<ObserverId, Weak<ObserverInner>>>,
}

struct ObserverInner {
    id: ObserverId,
    event: AppEvent,
    callback: RefCell<Option<AppCallback>>,
    shared: Weak<ObserversShared>,
}

/// One registered observer. Dropping the last clone stops it.
#[derive(Clone)]
pub struct Observer {
    inner: Rc<ObserverInner>,
}

/// A handle that does not keep the observer alive.
#[derive(Clone)]
pub struct WeakObserver(Weak<ObserverInner>);

impl AppObservers {
    pub fn new(platform: Platform) -> Self {
        AppObservers {
            shared: Rc::new(ObserversShared {
                platform,
                next_id: Cell::new(1),
                known: RefCell::new(Vec::new()),
                next_poll: Cell::new(None),
                observers: RefCell::new(HashMap::default()),
            }),
        }
    }

    pub fn observe(&self, event: AppEvent, callback: AppCallback) -> Observer {
        if self.is_empty() {
            self.snapshot();
        }
        let id = ObserverId(self.shared.next_id.get());
        self.shared.next_id.set(id.0 + 1);

        let inner = Rc::new(ObserverInner {
            id,
            event,
            callback: RefCell::new(Some(callback)),
            shared: Rc::downgrade(&self.shared),
        });
        self.shared.observers.borrow_mut().insert(id, Rc::downgrade(&inner));
        debug!(id = id.0, %event, "Observing");
        Observer { inner }
    }

    /// Diffs the process list and runs the matching observers, at most once
    /// per [`POLL_INTERVAL`]. Returns how many callbacks ran.
    pub fn poll(&self, now: Instant) -> usize {
        if self.is_empty() {
            return 0;
        }
        if self.shared.next_poll.get().is_some_and(|next| now < next) {
            return 0;
        }
        self.shared.next_poll.set(Some(now + POLL_INTERVAL));

        let previous = self.shared.known.take();
        self.snapshot();
        let current = self.shared.known.borrow().clone();

        let before: HashSet<pid_t> = previous.iter().copied().collect();
        let after: HashSet<pid_t> = current.iter().copied().collect();
        let launched = current.iter().filter(|pid| !before.contains(pid));
        let terminated = previous.iter().filter(|pid| !after.contains(pid));
        let events: Vec<(AppEvent, pid_t)> = launched
            .map(|&pid| (AppEvent::Launched, pid))
            .chain(terminated.map(|&pid| (AppEvent::Terminated, pid)))
            .collect();

        let mut ran = 0;
        for (event, pid) in events {
            trace!(%event, pid, "Application event");
            for observer in self.matching(event) {
                let Some(callback) = observer.inner.callback.borrow().clone() else {
                    continue;
                };
                let app = ApplicationRef::from_pid(&self.shared.platform, pid);
                let _span = debug_span!("observer", id = observer.id().0, %event, pid).entered();
                callback(&observer, app);
                ran += 1;
            }
        }
        ran
    }

    /// Forgets every observer; none of them runs again.
    pub fn reset(&self) {
        let mut observers = self.shared.observers.borrow_mut();
        debug!(count = observers.len(), "Resetting application observers");
        observers.clear();
    }

    /// Number of live observers.
    pub fn len(&self) -> usize { self.live().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn snapshot(&self) {
        let pids =
            self.shared.platform.workspace.running_applications().into_iter().map(|info| info.pid);
        *self.shared.known.borrow_mut() = pids.collect();
    }

    fn matching(&self, event: AppEvent) -> Vec<Observer> {
        let mut observers: Vec<Observer> = self
            .live()
            .into_iter()
            .filter(|inner| inner.event == event)
            .map(|inner| Observer { inner })
            .collect();
        observers.sort_by_key(Observer::id);
        observers
    }

    fn live(&self) -> Vec<Rc<ObserverInner>> {
        self.shared.observers.borrow().values().filter_map(Weak::upgrade).collect()
    }
}

impl fmt::Debug for AppObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppObservers").field("live", &self.len()).finish_non_exhaustive()
    }
}

impl Observer {
    pub fn id(&self) -> ObserverId { self.inner.id }

    pub fn event(&self) -> AppEvent { self.inner.event }

    pub fn is_active(&self) -> bool {
        self.inner.callback.borrow().is_some()
            && self
                .inner
                .shared
                .upgrade()
                .is_some_and(|shared| shared.observers.borrow().contains_key(&self.inner.id))
    }

    /// Unregisters the observer and drops its callback. Idempotent.
    pub fn stop(&self) { self.inner.stop() }

    pub fn downgrade(&self) -> WeakObserver { WeakObserver(Rc::downgrade(&self.inner)) }
}

impl ObserverInner {
    fn stop(&self) {
        self.callback.borrow_mut().take();
        if let Some(shared) = self.shared.upgrade()
            && let Ok(mut observers) = shared.observers.try_borrow_mut()
        {
            observers.remove(&self.id);
        }
    }
}

impl Drop for ObserverInner {
    fn drop(&mut self) { self.stop() }
}

impl WeakObserver {
    pub fn upgrade(&self) -> Option<Observer> { self.0.upgrade().map(|inner| Observer { inner }) }

    pub fn is_live(&self) -> bool { self.0.strong_count() > 0 }
}

impl PartialEq for Observer {
    fn eq(&self, other: &Self) -> bool { self.inner.id == other.inner.id }
}

impl Eq for Observer {}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("id", &self.inner.id)
            .field("event", &self.inner.event)
            .finish_non_exhaustive()
    }
}
