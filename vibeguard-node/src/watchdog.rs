//! Watchdog monitor
//!
//! The control loop feeds the watchdog once per iteration. If the loop hangs
//! anywhere (sensor bus, inference, network), feeds stop and the device is
//! reset once the window runs out.
//!
//! ## Backends
//!
//! | Backend              | When                                   | On expiry          |
//! |----------------------|----------------------------------------|--------------------|
//! | [`DeviceWatchdog`]   | `/dev/watchdog` (or configured) opens  | kernel resets SoC  |
//! | [`SoftwareWatchdog`] | no device and `software_fallback` set  | process aborts     |
//! | none                 | no device, no fallback                 | nothing (warning)  |
//!
//! A missing or unusable device is never fatal: the monitor logs a warning
//! and the loop runs unguarded.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use vibeguard_core::{LoopFault, Watchdog, WatchdogError};

/// Default watchdog character device
pub const DEFAULT_DEVICE: &str = "/dev/watchdog";

/// Watchdog selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    /// Watchdog character device
    pub device: PathBuf,
    /// Run a software supervisor when the device is unavailable
    pub software_fallback: bool,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            software_fallback: false,
        }
    }
}

/// Linux watchdog character device
///
/// Opening the device arms it; every write restarts the countdown. The
/// timeout is whatever the kernel driver is configured with, so the window
/// passed to [`open`](Self::open) is nominal.
pub struct DeviceWatchdog {
    file: File,
    window_ms: u32,
}

impl DeviceWatchdog {
    /// Open and arm the device at `path`
    pub fn open(path: &Path, window_ms: u32) -> Result<Self, WatchdogError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => WatchdogError::Unavailable {
                    reason: "no watchdog device",
                },
                ErrorKind::PermissionDenied => WatchdogError::Unavailable {
                    reason: "permission denied",
                },
                _ => WatchdogError::InstallFailed {
                    reason: "device could not be opened",
                },
            })?;
        Ok(Self { file, window_ms })
    }
}

impl Watchdog for DeviceWatchdog {
    fn feed(&mut self) -> Result<(), WatchdogError> {
        // Any byte but the magic-close 'V' restarts the countdown
        self.file
            .write_all(b"\0")
            .and_then(|_| self.file.flush())
            .map_err(|_| WatchdogError::FeedFailed)
    }

    fn window_ms(&self) -> u32 {
        self.window_ms
    }

    fn enforces_window(&self) -> bool {
        false
    }
}

/// Action taken when the software watchdog expires
pub type ExpiryAction = Box<dyn Fn() + Send + 'static>;

struct Shared {
    start: Instant,
    last_feed_us: AtomicU64,
    expired: AtomicBool,
    stop: AtomicBool,
}

impl Shared {
    fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// Supervisor thread standing in for a hardware watchdog
///
/// Checks four times per window; if no feed arrived within the window it
/// logs and runs the expiry action (by default, aborting the process so the
/// service manager restarts it).
pub struct SoftwareWatchdog {
    shared: Arc<Shared>,
    window_ms: u32,
    supervisor: Option<JoinHandle<()>>,
}

impl SoftwareWatchdog {
    /// Arm a supervisor that aborts the process on expiry
    pub fn arm(window_ms: u32) -> Result<Self, WatchdogError> {
        Self::with_action(window_ms, Box::new(|| std::process::abort()))
    }

    /// Arm a supervisor with a custom expiry action
    pub fn with_action(window_ms: u32, on_expiry: ExpiryAction) -> Result<Self, WatchdogError> {
        if window_ms == 0 {
            return Err(WatchdogError::InstallFailed {
                reason: "window must be positive",
            });
        }

        let shared = Arc::new(Shared {
            start: Instant::now(),
            last_feed_us: AtomicU64::new(0),
            expired: AtomicBool::new(false),
            stop: AtomicBool::new(false),
        });

        let window_us = u64::from(window_ms) * 1000;
        let check_every = Duration::from_micros((window_us / 4).max(1));
        let state = Arc::clone(&shared);

        let supervisor = std::thread::Builder::new()
            .name("watchdog".into())
            .spawn(move || {
                while !state.stop.load(Ordering::Acquire) {
                    std::thread::sleep(check_every);
                    let last = state.last_feed_us.load(Ordering::Acquire);
                    if state.elapsed_us().saturating_sub(last) > window_us {
                        state.expired.store(true, Ordering::Release);
                        error!(
                            "{}: no watchdog feed for more than {} us",
                            LoopFault::Liveness,
                            window_us
                        );
                        on_expiry();
                        return;
                    }
                }
            })
            .map_err(|_| WatchdogError::InstallFailed {
                reason: "supervisor thread could not be spawned",
            })?;

        Ok(Self {
            shared,
            window_ms,
            supervisor: Some(supervisor),
        })
    }

    /// Whether the window has ever been exceeded
    pub fn has_expired(&self) -> bool {
        self.shared.expired.load(Ordering::Acquire)
    }
}

impl Watchdog for SoftwareWatchdog {
    fn feed(&mut self) -> Result<(), WatchdogError> {
        if self.has_expired() {
            return Err(WatchdogError::FeedFailed);
        }
        self.shared
            .last_feed_us
            .store(self.shared.elapsed_us(), Ordering::Release);
        Ok(())
    }

    fn window_ms(&self) -> u32 {
        self.window_ms
    }
}

impl Drop for SoftwareWatchdog {
    fn drop(&mut self) {
        self.shared.stop.store(true, Ordering::Release);
        if let Some(supervisor) = self.supervisor.take() {
            let _ = supervisor.join();
        }
    }
}

/// The loop's view of the watchdog: feeds when one is present, otherwise no-op
pub struct WatchdogMonitor {
    watchdog: Option<Box<dyn Watchdog + Send>>,
    feeds: u64,
    feed_failures: u64,
}

impl WatchdogMonitor {
    /// Install the configured watchdog with a `window_ms` window
    ///
    /// Never fails: if nothing can be installed the monitor is unguarded and
    /// a warning is logged.
    pub fn install(config: &WatchdogConfig, window_ms: u32) -> Self {
        match DeviceWatchdog::open(&config.device, window_ms) {
            Ok(device) => {
                info!(
                    "Watchdog armed on {} ({} ms window)",
                    config.device.display(),
                    window_ms
                );
                return Self::with_device(Box::new(device));
            }
            Err(err) => warn!("Watchdog {}: {}", config.device.display(), err),
        }

        if config.software_fallback {
            match SoftwareWatchdog::arm(window_ms) {
                Ok(software) => {
                    info!("Software watchdog armed ({} ms window)", window_ms);
                    return Self::with_device(Box::new(software));
                }
                Err(err) => warn!("Software watchdog: {}", err),
            }
        }

        warn!("Running without watchdog");
        Self::unguarded()
    }

    /// Monitor around an already armed watchdog
    pub fn with_device(watchdog: Box<dyn Watchdog + Send>) -> Self {
        if !watchdog.enforces_window() {
            warn!(
                "Watchdog window of {} ms is not enforced; the device resets on its own timeout",
                watchdog.window_ms()
            );
        }
        Self {
            watchdog: Some(watchdog),
            feeds: 0,
            feed_failures: 0,
        }
    }

    /// Monitor with no watchdog; feeds are no-ops
    pub fn unguarded() -> Self {
        Self {
            watchdog: None,
            feeds: 0,
            feed_failures: 0,
        }
    }

    /// Feed the watchdog if one is installed
    pub fn feed(&mut self) {
        let Some(watchdog) = self.watchdog.as_mut() else {
            return;
        };
        match watchdog.feed() {
            Ok(()) => self.feeds += 1,
            Err(err) => {
                self.feed_failures += 1;
                if self.feed_failures == 1 {
                    warn!("Watchdog feed failed: {}", err);
                } else {
                    debug!("Watchdog feed failed ({} times): {}", self.feed_failures, err);
                }
            }
        }
    }

    /// A watchdog is installed
    pub fn is_guarding(&self) -> bool {
        self.watchdog.is_some()
    }

    /// A watchdog is installed and resets on the configured window
    pub fn enforces_window(&self) -> bool {
        self.watchdog.as_ref().map_or(false, |w| w.enforces_window())
    }

    /// Window of the installed watchdog
    pub fn window_ms(&self) -> Option<u32> {
        self.watchdog.as_ref().map(|w| w.window_ms())
    }

    /// Successful feeds so far
    pub fn feeds(&self) -> u64 {
        self.feeds
    }

    /// Failed feeds so far
    pub fn feed_failures(&self) -> u64 {
        self.feed_failures
    }
}
