use objc2::rc::Retained;
use objc2_app_kit::{NSApplicationActivationOptions, NSRunningApplication, NSWorkspace};
use tracing::trace;

use crate::sys::app::{Activation, AppInfo, Workspace};
use crate::sys::pid_t;
use crate::sys::process::spawn_detached;

const OPEN: &str = "/usr/bin/open";

#[derive(Debug, Default)]
pub struct AppKitWorkspace;

fn running(pid: pid_t) -> Option<Retained<NSRunningApplication>> {
    NSRunningApplication::runningApplicationWithProcessIdentifier(pid)
}

fn info(app: &NSRunningApplication) -> AppInfo {
    AppInfo {
        pid: app.processIdentifier(),
        name: app.localizedName().map(|s| s.to_string()),
        bundle_id: app.bundleIdentifier().map(|s| s.to_string()),
    }
}

impl Workspace for AppKitWorkspace {
    fn running_applications(&self) -> Vec<AppInfo> {
        let workspace = NSWorkspace::sharedWorkspace();
        workspace.runningApplications().iter().map(|app| info(&app)).collect()
    }

    fn application(&self, pid: pid_t) -> Option<AppInfo> {
        running(pid).filter(|app| !app.isTerminated()).map(|app| info(&app))
    }

    fn frontmost_application(&self) -> Option<pid_t> {
        NSWorkspace::sharedWorkspace().frontmostApplication().map(|app| app.processIdentifier())
    }

    fn launch_application(&self, name: &str) -> bool {
        spawn_detached(OPEN, &["-a".to_string(), name.to_string()])
    }

    fn activate(&self, pid: pid_t, activation: Activation) -> bool {
        let Some(app) = running(pid) else {
            trace!(pid, "No running application to activate");
            return false;
        };
        let options = match activation {
            Activation::AllWindows => NSApplicationActivationOptions::ActivateAllWindows,
            #[allow(deprecated)]
            Activation::IgnoringOtherApps => {
                NSApplicationActivationOptions::ActivateIgnoringOtherApps
            }
        };
        app.activateWithOptions(options)
    }

    fn hide(&self, pid: pid_t) -> bool { running(pid).is_some_and(|app| app.hide()) }

    fn unhide(&self, pid: pid_t) -> bool { running(pid).is_some_and(|app| app.unhide()) }

    fn is_active(&self, pid: pid_t) -> bool { running(pid).is_some_and(|app| app.isActive()) }

    fn is_terminated(&self, pid: pid_t) -> bool {
        running(pid).is_none_or(|app| app.isTerminated())
    }
}
