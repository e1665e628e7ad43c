//! The native backend: AppKit, Accessibility, Carbon hotkeys and SkyLight.

mod accessibility;
mod carbon;
mod skylight;
mod workspace;

use std::rc::Rc;
use std::time::Duration;

use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy, NSEventMask};
use objc2_foundation::{MainThreadMarker, NSDate, NSDefaultRunLoopMode};
use tracing::debug;

pub use self::accessibility::is_trusted;
use self::accessibility::AxAccessibility;
use self::carbon::CarbonHotkeys;
use self::skylight::SkyLight;
use self::workspace::AppKitWorkspace;
use super::Platform;

/// Turns this process into a menu-bar-less agent app and returns the
/// native services.
pub fn platform(mtm: MainThreadMarker) -> Platform {
    let app = NSApplication::sharedApplication(mtm);
    app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
    #[allow(unused_unsafe)]
    unsafe {
        app.finishLaunching()
    };
    debug!(trusted = is_trusted(), "Native backend ready");

    Platform {
        workspace: Rc::new(AppKitWorkspace),
        accessibility: Rc::new(AxAccessibility),
        hotkeys: Rc::new(CarbonHotkeys),
        window_server: Rc::new(SkyLight::new(mtm)),
    }
}

/// Dispatches native events for up to `timeout`, returning early once the
/// queue is empty after at least one event.
pub fn pump_events(mtm: MainThreadMarker, timeout: Duration) {
    let app = NSApplication::sharedApplication(mtm);
    let mut until = NSDate::dateWithTimeIntervalSinceNow(timeout.as_secs_f64());
    loop {
        // SAFETY: the run loop mode is an immutable framework constant.
        #[allow(unused_unsafe)]
        let event = unsafe {
            app.nextEventMatchingMask_untilDate_inMode_dequeue(
                NSEventMask::Any,
                Some(&until),
                NSDefaultRunLoopMode,
                true,
            )
        };
        let Some(event) = event else { return };
        app.sendEvent(&event);
        until = NSDate::distantPast();
    }
}
