use super::pid_t;

/// One entry of the live process list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub pid: pid_t,
    pub name: Option<String>,
    pub bundle_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Bring every window of the application forward.
    AllWindows,
    /// Bring the application forward without pushing other apps behind.
    IgnoringOtherApps,
}

/// Process enumeration and control.
pub trait Workspace {
    fn running_applications(&self) -> Vec<AppInfo>;

    fn application(&self, pid: pid_t) -> Option<AppInfo>;

    fn frontmost_application(&self) -> Option<pid_t>;

    fn launch_application(&self, name: &str) -> bool;

    fn activate(&self, pid: pid_t, activation: Activation) -> bool;

    fn hide(&self, pid: pid_t) -> bool;

    fn unhide(&self, pid: pid_t) -> bool;

    fn is_active(&self, pid: pid_t) -> bool;

    /// True for processes that have exited or never existed.
    fn is_terminated(&self, pid: pid_t) -> bool;
}
