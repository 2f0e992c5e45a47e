//! keystick - turn attached keyboards into USB joysticks
//!
//! Discovers keyboards, brings up one composite HID gadget with a joystick
//! per keyboard and forwards key transitions as joystick reports until every
//! keyboard session ends or the process is interrupted.

use anyhow::{Context, Result};
use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use keystick::{
    config::Config, discover_keyboards, hid::ReportMultiplexer, ConfigFsProvider, Error,
    GadgetHandle, GadgetIdentity, KeyboardSession, ShutdownCoordinator,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().map_err(Error::from)?;
    if let Some(path) = Config::locate() {
        info!("configuration loaded from {}", path.display());
    }

    let keyboards = find_keyboards(&config)?;

    // The coordinator owns the gadget and handles signals before anything
    // exists kernel-side
    let provider = ConfigFsProvider::new(&config.gadget);
    let gadget = GadgetHandle::new(
        provider,
        GadgetIdentity::from_config(&config.gadget),
        config.gadget.max_devices,
    );
    let coordinator = Arc::new(ShutdownCoordinator::new(gadget));
    coordinator
        .install_signal_handler()
        .context("failed to install signal handler")?;

    let endpoint = match bring_up(&coordinator, &config, keyboards.len()) {
        Ok(endpoint) => Arc::new(endpoint),
        Err(e) => {
            coordinator.shutdown();
            return Err(e);
        }
    };

    let workers = match start_sessions(&coordinator, &endpoint, &keyboards) {
        Ok(workers) => workers,
        Err(e) => {
            coordinator.shutdown();
            return Err(e);
        }
    };

    for worker in workers {
        let name = worker.thread().name().unwrap_or("session").to_string();
        if worker.join().is_err() {
            warn!("{} panicked", name);
        }
    }

    info!(
        "all keyboard sessions ended after {} report(s)",
        endpoint.reports_written()
    );
    coordinator.shutdown();
    Ok(())
}

/// Classified keyboards in report ID order, capped at the device ceiling
fn find_keyboards(config: &Config) -> Result<Vec<PathBuf>> {
    let dir = &config.input.device_dir;
    let mut keyboards = discover_keyboards(dir)
        .with_context(|| format!("failed to classify input devices in {}", dir.display()))?;

    if keyboards.is_empty() {
        warn!("no keyboards found in {}", dir.display());
    }
    let max = config.gadget.max_devices;
    if keyboards.len() > max {
        warn!(
            "found {} keyboards, using the first {} (gadget.max_devices)",
            keyboards.len(),
            max
        );
        keyboards.truncate(max);
    }
    for (index, path) in keyboards.iter().enumerate() {
        info!("joystick {}: {}", index + 1, path.display());
    }
    Ok(keyboards)
}

fn bring_up(
    coordinator: &ShutdownCoordinator<ConfigFsProvider>,
    config: &Config,
    devices: usize,
) -> Result<ReportMultiplexer<std::fs::File>> {
    let endpoint = coordinator
        .with_gadget(|gadget| -> Result<_> {
            gadget
                .initialize(&config.gadget.name, devices)
                .context("failed to set up USB gadget")?;
            gadget
                .open_endpoint()
                .context("failed to open joystick report endpoint")
        })
        .context("interrupted during gadget setup")??;
    Ok(endpoint)
}

/// Open every keyboard, then start one thread per keyboard.
///
/// All devices are opened before the first thread starts, so a bad device
/// aborts setup instead of leaving a partial set of joysticks running.
fn start_sessions(
    coordinator: &Arc<ShutdownCoordinator<ConfigFsProvider>>,
    endpoint: &Arc<ReportMultiplexer<std::fs::File>>,
    keyboards: &[PathBuf],
) -> Result<Vec<thread::JoinHandle<()>>> {
    let mut sessions = Vec::with_capacity(keyboards.len());
    for (index, path) in keyboards.iter().enumerate() {
        let report_id = u8::try_from(index + 1).context("too many keyboards")?;
        let session = KeyboardSession::open(path, report_id, endpoint.callback())
            .with_context(|| format!("failed to open keyboard {}", path.display()))?;
        sessions.push(session);
    }

    let mut workers = Vec::with_capacity(sessions.len());
    for mut session in sessions {
        let cancel = coordinator.cancel_flag();
        let worker = thread::Builder::new()
            .name(format!("joystick-{}", session.report_id()))
            .spawn(move || {
                if let Err(e) = session.run(&cancel) {
                    warn!(
                        "{} (joystick {}) stopped: {}",
                        session.path().display(),
                        session.report_id(),
                        e
                    );
                }
            })
            .context("failed to spawn keyboard session thread")?;
        workers.push(worker);
    }
    Ok(workers)
}
