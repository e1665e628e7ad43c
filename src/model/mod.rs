//! The hotkey registry, timers, application observers and the descriptor
//! model.
//!
//! Descriptors hold only a native handle plus the [`Platform`] they were
//! created from. Every attribute is queried from the OS on demand.
//!
//! [`Platform`]: crate::sys::Platform

mod binding;
mod registry;

pub mod app;
pub mod observer;
pub mod screen;
pub mod space;
pub mod timer;
pub mod window;

pub use app::ApplicationRef;
pub use binding::{Binding, WeakBinding};
pub use observer::{AppEvent, AppObservers, Observer, WeakObserver};
pub use registry::{Callback, HotkeyRegistry};
pub use screen::ScreenRef;
pub use space::SpaceRef;
pub use timer::{Timer, TimerQueue, WeakTimer};
pub use window::{WindowFilter, WindowRef};
