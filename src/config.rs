use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Top-level runtime configuration, read from YAML.
///
/// Every field has a default so an empty document yields the stock frame:
/// a 264x176 panel showing images from `/mnt/share1/epaper_art/`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    /// Root directory scanned recursively for images.
    pub share_path: PathBuf,
    /// Accepted file extensions, matched case-insensitively, without the dot.
    pub extensions: Vec<String>,
    /// Version string shown on the startup banner and the queue overview.
    pub version: String,
    /// TrueType font used for captions, messages and the overview.
    pub font_path: PathBuf,
    /// Pixel size of the caption/version font.
    pub caption_font_px: f32,
    /// Pixel size of the message/menu font.
    pub message_font_px: f32,
    /// Delay between control loop iterations.
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    /// How long status messages stay up before the loop continues.
    #[serde(with = "humantime_serde")]
    pub message_pause: Duration,
    /// Plain-text log appended to on unexpected faults.
    pub failure_log: PathBuf,
    /// Optional deterministic seed for queue shuffles.
    pub shuffle_seed: Option<u64>,
    /// Panel backend and geometry.
    pub panel: PanelConfig,
    /// Button input backend.
    pub buttons: ButtonConfig,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        // serde_yaml turns an empty document into unit, not an empty map.
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(mut self) -> Result<Self> {
        self.extensions = self
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        ensure!(
            !self.extensions.is_empty(),
            "extensions must list at least one file type"
        );
        ensure!(
            !self.poll_interval.is_zero(),
            "poll-interval must be greater than zero"
        );
        ensure!(
            self.caption_font_px > 0.0,
            "caption-font-px must be positive"
        );
        ensure!(
            self.message_font_px > 0.0,
            "message-font-px must be positive"
        );
        self.panel.validate()?;
        self.buttons.validate()?;
        Ok(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            share_path: PathBuf::from("/mnt/share1/epaper_art/"),
            extensions: ["bmp", "png", "jpg", "jpeg", "gif"]
                .into_iter()
                .map(String::from)
                .collect(),
            version: "1.0".to_string(),
            font_path: PathBuf::from("./fonts/04B_03__.TTF"),
            caption_font_px: 8.0,
            message_font_px: 16.0,
            poll_interval: Duration::from_millis(50),
            message_pause: Duration::from_secs(2),
            failure_log: PathBuf::from("logs/artdisplaylog.txt"),
            shuffle_seed: None,
            panel: PanelConfig::default(),
            buttons: ButtonConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PanelBackend {
    /// Linux framebuffer device exposed by the panel driver.
    Framebuffer,
    /// PNG snapshots on disk; for running without hardware.
    Snapshot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PixelFormat {
    /// 16-bit little-endian RGB565.
    Rgb565,
    /// Packed 1 bit per pixel, MSB first, 1 = white.
    Mono,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PanelConfig {
    pub backend: PanelBackend,
    /// Canvas width in pixels (the panel's long edge in landscape).
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Framebuffer device path.
    pub device: PathBuf,
    pub pixel_format: PixelFormat,
    /// Output directory for the snapshot backend.
    pub snapshot_dir: PathBuf,
}

impl PanelConfig {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.width > 0 && self.height > 0,
            "panel.width and panel.height must be greater than zero"
        );
        Ok(())
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            backend: PanelBackend::Framebuffer,
            width: 264,
            height: 176,
            device: PathBuf::from("/dev/fb1"),
            pixel_format: PixelFormat::Rgb565,
            snapshot_dir: PathBuf::from("snapshots"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputBackend {
    /// Level-polled GPIO lines under `/sys/class/gpio`.
    Sysfs,
    /// Key events from an input device, e.g. the `gpio-keys` overlay.
    Evdev,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ButtonConfig {
    pub backend: InputBackend,
    /// BCM pin numbers for buttons 1 through 4 (sysfs backend).
    pub gpio_pins: Vec<u32>,
    /// Sysfs GPIO class directory.
    pub gpio_root: PathBuf,
    /// Buttons pull the line low when pressed.
    pub active_low: bool,
    /// Input device path (evdev). Auto-detects when omitted.
    pub device: Option<PathBuf>,
    /// Key codes for buttons 1 through 4 (evdev backend).
    pub keys: Vec<String>,
    /// Presses closer together than this on the same button are dropped.
    #[serde(with = "humantime_serde")]
    pub debounce: Duration,
}

impl ButtonConfig {
    fn validate(&self) -> Result<()> {
        match self.backend {
            InputBackend::Sysfs => {
                ensure!(
                    self.gpio_pins.len() == 4,
                    "buttons.gpio-pins must list exactly four pins, got {}",
                    self.gpio_pins.len()
                );
                let distinct: HashSet<u32> = self.gpio_pins.iter().copied().collect();
                ensure!(distinct.len() == 4, "buttons.gpio-pins must be distinct");
            }
            InputBackend::Evdev => {
                ensure!(
                    self.keys.len() == 4,
                    "buttons.keys must list exactly four key codes, got {}",
                    self.keys.len()
                );
                let distinct: HashSet<&str> = self.keys.iter().map(String::as_str).collect();
                ensure!(distinct.len() == 4, "buttons.keys must be distinct");
            }
        }
        Ok(())
    }
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            backend: InputBackend::Sysfs,
            gpio_pins: vec![5, 6, 13, 19],
            gpio_root: PathBuf::from("/sys/class/gpio"),
            active_low: true,
            device: None,
            keys: ["KEY_1", "KEY_2", "KEY_3", "KEY_4"]
                .into_iter()
                .map(String::from)
                .collect(),
            debounce: Duration::from_millis(20),
        }
    }
}
