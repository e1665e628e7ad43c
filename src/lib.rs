//! Stark exposes global hotkeys and a live view of applications, windows and
//! spaces to a user script.
//!
//! The native side is split into collaborator traits under [`sys`]; the
//! hotkey registry and descriptor model under [`model`] are written purely
//! against those traits, and [`script`] binds both into a rhai runtime.

pub mod actor;
pub mod common;
pub mod model;
pub mod script;
pub mod sys;
