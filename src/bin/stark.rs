use std::path::PathBuf;

use clap::Parser;
use stark::common::config::Config;
use stark::common::log;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// User script to load. Defaults to ~/.stark.rhai.
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Extra script evaluated before the user script. May be repeated.
    #[arg(long = "library", short = 'l')]
    libraries: Vec<PathBuf>,

    /// Reload automatically when the user script changes.
    #[arg(long, short)]
    watch: bool,

    /// Log filter, overridden by STARK_LOG.
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    log::init_logging(&cli.log);

    let config = Config::new(cli.config, cli.libraries, cli.watch);
    config.create_script_unless_exists()?;

    run(config)
}

#[cfg(target_os = "macos")]
fn run(config: Config) -> anyhow::Result<()> {
    use anyhow::Context as _;
    use objc2_foundation::MainThreadMarker;
    use stark::actor::{self, config_watcher::ConfigWatcher, controller};
    use stark::model::HotkeyRegistry;
    use stark::script::{Context, ScriptBridge};
    use stark::sys::macos;

    let mtm = MainThreadMarker::new().context("stark must be started on the main thread")?;
    let platform = macos::platform(mtm);

    let (events_tx, events_rx) = actor::channel();
    let registry =
        HotkeyRegistry::new(platform.hotkeys.clone(), controller::hotkey_sink(events_tx.clone()));

    let _watcher = if config.watch {
        Some(ConfigWatcher::spawn(&config.script, events_tx.clone())?)
    } else {
        None
    };

    let bridge = ScriptBridge::new(Context::new(platform, registry, events_tx), config);
    controller::Controller::new(bridge, events_rx).run(|timeout| macos::pump_events(mtm, timeout));
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("stark only runs on macOS")
}
