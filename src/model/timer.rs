//! One-shot and repeating timers, fired from the owner loop.
//!
//! Nothing here reads the clock. The loop passes `now` to
//! [`TimerQueue::fire_due`] and sizes its native wait from
//! [`TimerQueue::next_deadline`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, debug_span, trace};

use crate::common::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub fn get(self) -> u64 { self.0 }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "timer#{}", self.0) }
}

/// Runs when the timer fires, with the timer itself.
pub type TimerCallback = Rc<dyn Fn(&Timer)>;

#[derive(Clone)]
pub struct TimerQueue {
    shared: Rc<QueueShared>,
}

struct QueueShared {
    next_id: Cell<u64>,
    timers: RefCell<HashMap<TimerId, Weak<TimerInner>>>,
}

struct TimerInner {
    id: TimerId,
    interval: Duration,
    repeats: bool,
    /// `None` once stopped or spent.
    deadline: Cell<Option<Instant>>,
    callback: RefCell<Option<TimerCallback>>,
    queue: Weak<QueueShared>,
}

/// A scheduled timer. Dropping the last clone stops it.
#[derive(Clone)]
pub struct Timer {
    inner: Rc<TimerInner>,
}

/// A handle that does not keep the timer alive.
#[derive(Clone)]
pub struct WeakTimer(Weak<TimerInner>);

impl TimerQueue {
    pub fn new() -> Self {
        TimerQueue {
            shared: Rc::new(QueueShared {
                next_id: Cell::new(1),
                timers: RefCell::new(HashMap::default()),
            }),
        }
    }

    /// Fires `callback` `interval` after `now`, and every `interval` after
    /// that when `repeats` is set.
    pub fn schedule(
        &self,
        now: Instant,
        interval: Duration,
        repeats: bool,
        callback: TimerCallback,
    ) -> Timer {
        let id = TimerId(self.shared.next_id.get());
        self.shared.next_id.set(id.0 + 1);

        let inner = Rc::new(TimerInner {
            id,
            interval,
            repeats,
            deadline: Cell::new(Some(now + interval)),
            callback: RefCell::new(Some(callback)),
            queue: Rc::downgrade(&self.shared),
        });
        self.shared.timers.borrow_mut().insert(id, Rc::downgrade(&inner));
        debug!(%id, ?interval, repeats, "Scheduled");
        Timer { inner }
    }

    /// Earliest deadline of any live timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.live().iter().filter_map(|timer| timer.deadline.get()).min()
    }

    /// Runs every timer whose deadline is at or before `now`, earliest
    /// first, and returns how many ran.
    ///
    /// Each timer fires at most once per call; a repeating timer that fell
    /// behind is rescheduled from `now` rather than replayed.
    pub fn fire_due(&self, now: Instant) -> usize {
        let mut due: Vec<_> = self
            .live()
            .into_iter()
            .filter(|timer| timer.deadline.get().is_some_and(|deadline| deadline <= now))
            .collect();
        due.sort_by_key(|timer| (timer.deadline.get(), timer.id));

        let mut fired = 0;
        for inner in due {
            // An earlier callback may have stopped this one.
            if !inner.deadline.get().is_some_and(|deadline| deadline <= now) {
                continue;
            }
            let Some(callback) = inner.callback.borrow().clone() else {
                continue;
            };
            if inner.repeats {
                inner.deadline.set(Some(now + inner.interval));
            } else {
                inner.deadline.set(None);
            }

            let timer = Timer { inner };
            let _span = debug_span!("timer", id = %timer.id()).entered();
            callback(&timer);
            if !timer.inner.repeats {
                timer.stop();
            }
            fired += 1;
        }
        fired
    }

    /// Forgets every timer; none of them fires again.
    pub fn reset(&self) {
        let mut timers = self.shared.timers.borrow_mut();
        debug!(count = timers.len(), "Resetting timers");
        for inner in timers.values().filter_map(Weak::upgrade) {
            inner.deadline.set(None);
        }
        timers.clear();
    }

    /// Number of timers still waiting to fire.
    pub fn len(&self) -> usize {
        self.live().iter().filter(|timer| timer.deadline.get().is_some()).count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn live(&self) -> Vec<Rc<TimerInner>> {
        self.shared.timers.borrow().values().filter_map(Weak::upgrade).collect()
    }
}

impl Default for TimerQueue {
    fn default() -> Self { Self::new() }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue").field("pending", &self.len()).finish_non_exhaustive()
    }
}

impl Timer {
    pub fn id(&self) -> TimerId { self.inner.id }

    pub fn interval(&self) -> Duration { self.inner.interval }

    pub fn repeats(&self) -> bool { self.inner.repeats }

    pub fn is_active(&self) -> bool { self.inner.deadline.get().is_some() }

    /// Cancels the timer and drops its callback. Idempotent.
    pub fn stop(&self) { self.inner.stop() }

    pub fn downgrade(&self) -> WeakTimer { WeakTimer(Rc::downgrade(&self.inner)) }
}

impl TimerInner {
    fn stop(&self) {
        if self.deadline.take().is_some() {
            trace!(id = %self.id, "Stopped");
        }
        self.callback.borrow_mut().take();
        if let Some(queue) = self.queue.upgrade()
            && let Ok(mut timers) = queue.timers.try_borrow_mut()
        {
            timers.remove(&self.id);
        }
    }
}

impl Drop for TimerInner {
    fn drop(&mut self) { self.stop() }
}

impl WeakTimer {
    pub fn upgrade(&self) -> Option<Timer> { self.0.upgrade().map(|inner| Timer { inner }) }

    pub fn is_live(&self) -> bool { self.0.strong_count() > 0 }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool { self.inner.id == other.inner.id }
}

impl Eq for Timer {}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.inner.id)
            .field("interval", &self.inner.interval)
            .field("repeats", &self.inner.repeats)
            .field("active", &self.is_active())
            .finish()
    }
}
