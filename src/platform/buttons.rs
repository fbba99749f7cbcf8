//! Input boundary: four buttons reported as fresh presses.
//!
//! Backends that only see line levels feed them through [`PressTracker`],
//! which turns held buttons into a single press and drops contact chatter.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::config::{ButtonConfig, InputBackend};
use crate::events::Button;

pub trait ButtonSource {
    /// Buttons pressed since the previous poll, in legend order, each at
    /// most once.
    fn poll(&mut self) -> Result<Vec<Button>>;
}

impl<B: ButtonSource + ?Sized> ButtonSource for Box<B> {
    fn poll(&mut self) -> Result<Vec<Button>> {
        (**self).poll()
    }
}

/// Build the configured input backend.
pub fn open_buttons(cfg: &ButtonConfig) -> Result<Box<dyn ButtonSource + Send>> {
    match cfg.backend {
        InputBackend::Sysfs => Ok(Box::new(SysfsButtons::open(cfg)?)),
        #[cfg(target_os = "linux")]
        InputBackend::Evdev => Ok(Box::new(evdev_input::EvdevButtons::open(cfg)?)),
        #[cfg(not(target_os = "linux"))]
        InputBackend::Evdev => Err(crate::error::Error::Unsupported("evdev").into()),
    }
}

/// Edge detection and debounce for the four buttons.
#[derive(Debug, Clone)]
pub struct PressTracker {
    debounce: Duration,
    held: [bool; 4],
    last_press: [Option<Instant>; 4],
}

impl PressTracker {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            held: [false; 4],
            last_press: [None; 4],
        }
    }

    /// Record a transition of `button`; returns `true` for an accepted press.
    ///
    /// Releases always register. A press while already held, or within the
    /// debounce window of the previous press, is swallowed.
    pub fn on_key(&mut self, button: Button, down: bool, now: Instant) -> bool {
        let idx = button.index();
        if !down {
            self.held[idx] = false;
            return false;
        }
        if self.held[idx] {
            return false;
        }
        self.held[idx] = true;
        if let Some(last) = self.last_press[idx]
            && now.saturating_duration_since(last) < self.debounce
        {
            debug!(%button, "debounced press");
            return false;
        }
        self.last_press[idx] = Some(now);
        true
    }

    /// Feed one sample of all four line levels (`true` = pressed).
    pub fn on_levels(&mut self, levels: [bool; 4], now: Instant) -> Vec<Button> {
        Button::ALL
            .into_iter()
            .filter(|b| self.on_key(*b, levels[b.index()], now))
            .collect()
    }
}

/// Buttons wired to GPIO lines, sampled through the sysfs GPIO interface.
#[derive(Debug)]
pub struct SysfsButtons {
    values: [PathBuf; 4],
    active_low: bool,
    tracker: PressTracker,
}

impl SysfsButtons {
    /// Export the configured pins as inputs if needed and start tracking.
    pub fn open(cfg: &ButtonConfig) -> Result<Self> {
        let mut values: [PathBuf; 4] = Default::default();
        for (slot, pin) in values.iter_mut().zip(&cfg.gpio_pins) {
            *slot = export_input(&cfg.gpio_root, *pin)?;
        }
        info!(pins = ?cfg.gpio_pins, active_low = cfg.active_low, "sysfs buttons ready");
        Ok(Self {
            values,
            active_low: cfg.active_low,
            tracker: PressTracker::new(cfg.debounce),
        })
    }

    fn sample(&self) -> Result<[bool; 4]> {
        let mut levels = [false; 4];
        for (level, path) in levels.iter_mut().zip(&self.values) {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let high = match raw.trim() {
                "1" => true,
                "0" => false,
                other => bail!("unexpected value '{other}' in {}", path.display()),
            };
            *level = high != self.active_low;
        }
        Ok(levels)
    }
}

impl ButtonSource for SysfsButtons {
    fn poll(&mut self) -> Result<Vec<Button>> {
        let levels = self.sample()?;
        Ok(self.tracker.on_levels(levels, Instant::now()))
    }
}

fn export_input(root: &Path, pin: u32) -> Result<PathBuf> {
    let line = root.join(format!("gpio{pin}"));
    if !line.exists() {
        let export = root.join("export");
        match fs::write(&export, pin.to_string()) {
            Ok(()) => {}
            // Already exported by someone else between the check and the write.
            Err(err) if err.kind() == ErrorKind::ResourceBusy => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to export gpio{pin} via {}", export.display()));
            }
        }
        // udev needs a moment to fix permissions on freshly exported lines.
        for _ in 0..10 {
            if line.join("direction").exists() {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }
    }
    let direction = line.join("direction");
    fs::write(&direction, "in")
        .with_context(|| format!("failed to set {} to input", direction.display()))?;
    debug!(pin, "gpio exported as input");
    Ok(line.join("value"))
}

#[cfg(target_os = "linux")]
pub mod evdev_input {
    use std::io;
    use std::os::fd::AsFd;
    use std::path::PathBuf;
    use std::str::FromStr;
    use std::time::Instant;

    use anyhow::{Context, Result, anyhow};
    use evdev::{Device, EventSummary, KeyCode};
    use nix::fcntl::{FcntlArg, OFlag, fcntl};
    use tracing::info;

    use super::{ButtonSource, PressTracker};
    use crate::config::ButtonConfig;
    use crate::error::Error;
    use crate::events::Button;

    /// Buttons delivered as key events, e.g. by the `gpio-keys` overlay.
    pub struct EvdevButtons {
        device: Device,
        keys: [KeyCode; 4],
        tracker: PressTracker,
    }

    impl EvdevButtons {
        pub fn open(cfg: &ButtonConfig) -> Result<Self> {
            let mut keys = [KeyCode::KEY_RESERVED; 4];
            for (slot, name) in keys.iter_mut().zip(&cfg.keys) {
                *slot = parse_key(name)?;
            }
            let (device, path) = open_device(cfg.device.as_ref(), &keys)?;
            set_nonblocking(&device)
                .with_context(|| format!("failed to set {} non-blocking", path.display()))?;
            info!(device = %path.display(), keys = ?cfg.keys, "listening for button events");
            Ok(Self {
                device,
                keys,
                tracker: PressTracker::new(cfg.debounce),
            })
        }
    }

    impl ButtonSource for EvdevButtons {
        fn poll(&mut self) -> Result<Vec<Button>> {
            let mut pressed = Vec::new();
            match self.device.fetch_events() {
                Ok(events) => {
                    for event in events {
                        let EventSummary::Key(_, code, value) = event.destructure() else {
                            continue;
                        };
                        let Some(idx) = self.keys.iter().position(|k| *k == code) else {
                            continue;
                        };
                        // 2 is autorepeat; only edges matter.
                        let down = match value {
                            1 => true,
                            0 => false,
                            _ => continue,
                        };
                        let button = Button::ALL[idx];
                        if self.tracker.on_key(button, down, Instant::now()) {
                            pressed.push(button);
                        }
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {}
                Err(err) => return Err(err).context("failed reading input events"),
            }
            pressed.sort();
            pressed.dedup();
            Ok(pressed)
        }
    }

    fn parse_key(code: &str) -> Result<KeyCode> {
        KeyCode::from_str(code).map_err(|_| Error::UnknownKey(code.to_string()).into())
    }

    fn open_device(path: Option<&PathBuf>, keys: &[KeyCode; 4]) -> Result<(Device, PathBuf)> {
        if let Some(path) = path {
            let device =
                Device::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            return Ok((device, path.clone()));
        }

        for (path, device) in evdev::enumerate() {
            let supported = device
                .supported_keys()
                .is_some_and(|set| keys.iter().all(|k| set.contains(*k)));
            if supported {
                return Ok((device, path));
            }
        }
        Err(anyhow!("no input device advertising all four button keys found"))
    }

    fn set_nonblocking(device: &Device) -> Result<()> {
        let current = fcntl(device.as_fd(), FcntlArg::F_GETFL).context("F_GETFL failed")?;
        let mut flags = OFlag::from_bits_retain(current);
        flags.insert(OFlag::O_NONBLOCK);
        fcntl(device.as_fd(), FcntlArg::F_SETFL(flags)).context("F_SETFL failed")?;
        Ok(())
    }
}
