use std::path::{Path, PathBuf};
use std::{fs, io};

use tracing::info;

const DEFAULT_SCRIPT_NAME: &str = ".stark.rhai";
const SCRIPT_TEMPLATE: &str = include_str!("../script/template.rhai");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The user script, evaluated last on every reload.
    pub script: PathBuf,
    /// Extra library scripts evaluated after the bundled prelude, in order.
    pub libraries: Vec<PathBuf>,
    /// Reload whenever the user script changes on disk.
    pub watch: bool,
}

impl Config {
    pub fn new(script: Option<PathBuf>, libraries: Vec<PathBuf>, watch: bool) -> Self {
        Config {
            script: script.unwrap_or_else(default_script_path),
            libraries,
            watch,
        }
    }

    /// Writes the starter script if the user script is missing.
    ///
    /// Returns whether a file was created.
    pub fn create_script_unless_exists(&self) -> io::Result<bool> {
        create_unless_exists(&self.script, SCRIPT_TEMPLATE)
    }
}

pub fn default_script_path() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(DEFAULT_SCRIPT_NAME)
}

fn create_unless_exists(path: &Path, contents: &str) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    info!(path = %path.display(), "Created user script from template");
    Ok(true)
}
