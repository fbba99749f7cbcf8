//! Panel boundary: the e-paper driver seen as init/clear/display/sleep.

use std::fs::{self, File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::{PanelBackend, PanelConfig, PixelFormat};
use crate::error::Error;
use crate::render::frame::{Color, DisplayFrame};

pub trait Panel {
    /// Canvas size as `(width, height)`.
    fn size(&self) -> (u32, u32);
    /// Wake the controller; called before every full refresh.
    fn init(&mut self) -> Result<()>;
    /// Flood the whole panel with one color.
    fn clear(&mut self, color: Color) -> Result<()>;
    fn display(&mut self, frame: &DisplayFrame) -> Result<()>;
    /// Enter low-power mode; the image stays on the glass.
    fn sleep(&mut self) -> Result<()>;
    /// Release the underlying device. The panel may be re-initialised later.
    fn release(&mut self) -> Result<()>;
}

impl<P: Panel + ?Sized> Panel for Box<P> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }
    fn init(&mut self) -> Result<()> {
        (**self).init()
    }
    fn clear(&mut self, color: Color) -> Result<()> {
        (**self).clear(color)
    }
    fn display(&mut self, frame: &DisplayFrame) -> Result<()> {
        (**self).display(frame)
    }
    fn sleep(&mut self) -> Result<()> {
        (**self).sleep()
    }
    fn release(&mut self) -> Result<()> {
        (**self).release()
    }
}

/// Build the configured panel backend.
pub fn open_panel(cfg: &PanelConfig) -> Result<Box<dyn Panel + Send>> {
    let panel: Box<dyn Panel + Send> = match cfg.backend {
        PanelBackend::Framebuffer => Box::new(FramebufferPanel::new(cfg)),
        PanelBackend::Snapshot => Box::new(SnapshotPanel::new(
            cfg.snapshot_dir.clone(),
            cfg.width,
            cfg.height,
        )),
    };
    info!(backend = ?cfg.backend, width = cfg.width, height = cfg.height, "panel configured");
    Ok(panel)
}

fn check_size(frame: &DisplayFrame, size: (u32, u32)) -> Result<(), Error> {
    if (frame.width(), frame.height()) == size {
        Ok(())
    } else {
        Err(Error::FrameSize {
            got_w: frame.width(),
            got_h: frame.height(),
            want_w: size.0,
            want_h: size.1,
        })
    }
}

/// A panel exposed through a Linux framebuffer device by its kernel driver.
#[derive(Debug)]
pub struct FramebufferPanel {
    device: PathBuf,
    format: PixelFormat,
    size: (u32, u32),
    file: Option<File>,
}

impl FramebufferPanel {
    pub fn new(cfg: &PanelConfig) -> Self {
        Self {
            device: cfg.device.clone(),
            format: cfg.pixel_format,
            size: (cfg.width, cfg.height),
            file: None,
        }
    }

    fn encode(&self, frame: &DisplayFrame) -> Vec<u8> {
        match self.format {
            PixelFormat::Mono => frame.to_packed(),
            PixelFormat::Rgb565 => {
                let mut buf = Vec::with_capacity(frame.as_image().len() * 2);
                for px in frame.as_image().pixels() {
                    let rgb565: u16 = if px[0] >= 128 { 0xFFFF } else { 0x0000 };
                    buf.extend(rgb565.to_le_bytes());
                }
                buf
            }
        }
    }

    fn write_buffer(&mut self, buf: &[u8]) -> Result<()> {
        let device = self.device.clone();
        let file = self
            .file
            .as_mut()
            .with_context(|| format!("{} written before init", device.display()))?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(buf)
            .and_then(|()| file.flush())
            .with_context(|| format!("failed to write frame to {}", device.display()))
    }
}

impl Panel for FramebufferPanel {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn init(&mut self) -> Result<()> {
        if self.file.is_none() {
            let file = OpenOptions::new()
                .write(true)
                .open(&self.device)
                .with_context(|| format!("failed to open {}", self.device.display()))?;
            debug!(device = %self.device.display(), "framebuffer opened");
            self.file = Some(file);
        }
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<()> {
        let mut blank = DisplayFrame::new(self.size.0, self.size.1);
        if color == Color::Black {
            blank.fill_rect(0, 0, i64::from(self.size.0), i64::from(self.size.1), color);
        }
        let buf = self.encode(&blank);
        self.write_buffer(&buf)
    }

    fn display(&mut self, frame: &DisplayFrame) -> Result<()> {
        check_size(frame, self.size)?;
        let buf = self.encode(frame);
        self.write_buffer(&buf)
    }

    fn sleep(&mut self) -> Result<()> {
        debug!(device = %self.device.display(), "panel idle");
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.file.take().is_some() {
            info!(device = %self.device.display(), "framebuffer released");
        }
        Ok(())
    }
}

/// Writes every displayed frame to a PNG file, for running without hardware.
#[derive(Debug)]
pub struct SnapshotPanel {
    dir: PathBuf,
    size: (u32, u32),
    frames: u64,
    awake: bool,
}

impl SnapshotPanel {
    pub fn new(dir: PathBuf, width: u32, height: u32) -> Self {
        Self {
            dir,
            size: (width, height),
            frames: 0,
            awake: false,
        }
    }

    /// Path of the most recently written frame.
    #[must_use]
    pub fn latest(&self) -> PathBuf {
        self.dir.join("latest.png")
    }

    #[must_use]
    pub const fn frames_written(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub const fn is_awake(&self) -> bool {
        self.awake
    }
}

impl Panel for SnapshotPanel {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn init(&mut self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;
        self.awake = true;
        Ok(())
    }

    fn clear(&mut self, _color: Color) -> Result<()> {
        Ok(())
    }

    fn display(&mut self, frame: &DisplayFrame) -> Result<()> {
        check_size(frame, self.size)?;
        self.frames += 1;
        let numbered = self.dir.join(format!("frame-{:06}.png", self.frames));
        frame
            .as_image()
            .save(&numbered)
            .with_context(|| format!("failed to write {}", numbered.display()))?;
        fs::copy(&numbered, self.latest())?;
        debug!(path = %numbered.display(), "snapshot written");
        Ok(())
    }

    fn sleep(&mut self) -> Result<()> {
        self.awake = false;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.awake = false;
        Ok(())
    }
}
