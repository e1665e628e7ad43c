//! Event plumbing between threads.
//!
//! Every event carries the span it was sent from, so work done on the
//! receiving side is attributed to whatever caused it.

pub mod config_watcher;
pub mod controller;

use tracing::{Span, debug};

pub struct Sender<E>(crossbeam_channel::Sender<(Span, E)>);

pub type Receiver<E> = crossbeam_channel::Receiver<(Span, E)>;

pub fn channel<E>() -> (Sender<E>, Receiver<E>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (Sender(tx), rx)
}

impl<E> Sender<E> {
    /// Sends `event`, dropping it if the receiver is gone.
    pub fn send(&self, event: E) {
        if self.try_send(event).is_err() {
            debug!("Receiver dropped; discarding event");
        }
    }

    pub fn try_send(&self, event: E) -> Result<(), crossbeam_channel::SendError<(Span, E)>> {
        self.0.send((Span::current(), event))
    }
}

impl<E> Clone for Sender<E> {
    fn clone(&self) -> Self { Sender(self.0.clone()) }
}

impl<E> std::fmt::Debug for Sender<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Sender").finish_non_exhaustive()
    }
}
