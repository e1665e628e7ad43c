//! The owner-thread loop.
//!
//! The controller owns the script bridge. Native hotkey handlers and the
//! script watcher only post events here; all registry and runtime state is
//! touched from this thread alone. Timers and application observers are
//! driven from the same loop after each drain.

use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span};

use crate::actor;
use crate::script::ScriptBridge;
use crate::sys::hotkey::{BindingId, HotkeySink};

/// How long one native event pump may block before the queue is drained.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    HotkeyPressed(BindingId),
    /// Posted by a script; handled once the current evaluation returns.
    ReloadRequested,
    /// The user script changed on disk.
    ScriptChanged,
    Exit,
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// Forwards fired hotkeys into the controller's queue.
pub fn hotkey_sink(events: Sender) -> HotkeySink {
    Box::new(move |id| events.send(Event::HotkeyPressed(id)))
}

pub struct Controller {
    bridge: ScriptBridge,
    events: Receiver,
}

impl Controller {
    pub fn new(bridge: ScriptBridge, events: Receiver) -> Self { Self { bridge, events } }

    /// Loads the script, then alternates between `pump` and the event queue
    /// until [`Event::Exit`] arrives.
    ///
    /// `pump` runs the native event loop for at most the given duration,
    /// which is cut short when a timer falls due sooner.
    pub fn run(mut self, mut pump: impl FnMut(Duration)) {
        self.bridge.reload();
        loop {
            pump(self.pump_timeout(Instant::now()));
            if self.drain().is_break() {
                info!("Exiting");
                return;
            }
            self.bridge.tick(Instant::now());
        }
    }

    fn pump_timeout(&self, now: Instant) -> Duration {
        self.bridge.next_deadline().map_or(POLL_INTERVAL, |deadline| {
            deadline.saturating_duration_since(now).min(POLL_INTERVAL)
        })
    }

    fn drain(&mut self) -> ControlFlow<()> {
        while let Ok((span, event)) = self.events.try_recv() {
            let _guard = span.enter();
            self.handle_event(event)?;
        }
        ControlFlow::Continue(())
    }

    pub fn handle_event(&mut self, event: Event) -> ControlFlow<()> {
        let _span = info_span!("controller::handle_event", ?event).entered();
        match event {
            Event::HotkeyPressed(id) => {
                self.bridge.dispatch(id);
            }
            Event::ReloadRequested => self.bridge.reload(),
            Event::ScriptChanged => {
                debug!(path = %self.bridge.config().script.display(), "Script changed");
                self.bridge.reload();
            }
            Event::Exit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    pub fn bridge(&self) -> &ScriptBridge { &self.bridge }
}
