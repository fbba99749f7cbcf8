//! The control loop: hourly rotation plus the four button actions.

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chrono::Timelike;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::events::{Button, ImageOutcome};
use crate::platform::buttons::ButtonSource;
use crate::queue::{ImageQueue, QueueState};
use crate::render::Screen;

pub const NO_IMAGES: &str = "No images were found";
pub const MOST_RECENT_MISSING: &str = "Most recent image not found";

/// Source of the local hour of day (0-23).
pub trait Clock {
    fn hour(&self) -> u32;
}

/// Wall-clock hour in the system time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// Pacing knobs for the loop.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Sleep between iterations.
    pub poll_interval: Duration,
    /// How long the startup banner and the "most recent" failure stay up.
    pub message_pause: Duration,
    /// Shown on the startup banner.
    pub version: String,
}

/// Owns all mutable state of the frame and drives it one tick at a time.
pub struct Controller<S, B, C> {
    screen: S,
    buttons: B,
    clock: C,
    queue: ImageQueue,
    current_hour: Option<u32>,
    settings: LoopSettings,
}

impl<S: Screen, B: ButtonSource, C: Clock> Controller<S, B, C> {
    pub fn new(screen: S, buttons: B, clock: C, queue: ImageQueue, settings: LoopSettings) -> Self {
        Self {
            screen,
            buttons,
            clock,
            queue,
            current_hour: None,
            settings,
        }
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn queue(&self) -> &ImageQueue {
        &self.queue
    }

    /// Hour at which the last automatic advance fired.
    pub fn current_hour(&self) -> Option<u32> {
        self.current_hour
    }

    /// Show the startup banner and run until `cancel` fires or a fault escapes.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        self.startup()?;
        while !cancel.is_cancelled() {
            self.tick()?;
            thread::sleep(self.settings.poll_interval);
        }
        info!("control loop stopped");
        Ok(())
    }

    /// [`run`](Self::run), then release the hardware whether the loop ended
    /// cleanly, with a fault, or by panicking.
    pub fn run_and_release(&mut self, cancel: &CancellationToken) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run(cancel)))
            .unwrap_or_else(|_| Err(anyhow!("control loop panicked")));
        if let Err(err) = self.shutdown() {
            warn!("hardware cleanup failed: {err:#}");
        }
        outcome
    }

    pub fn startup(&mut self) -> Result<()> {
        let banner = format!("Art Display v{}", self.settings.version);
        self.screen.show_message(&banner)?;
        self.pause();
        Ok(())
    }

    /// One loop iteration: hour check first, then buttons in legend order.
    pub fn tick(&mut self) -> Result<()> {
        let hour = self.clock.hour();
        if self.current_hour != Some(hour) {
            info!(hour, previous = ?self.current_hour, "hour changed; rotating");
            self.current_hour = Some(hour);
            self.show_next()?;
        }

        let pressed = self.buttons.poll().context("failed to poll buttons")?;
        for button in pressed {
            info!(%button, action = button.label(), "button pressed");
            match button {
                Button::Queue => self.show_queue()?,
                Button::Next => self.show_next()?,
                Button::Latest => self.show_latest()?,
                Button::Reload => self.reload()?,
            }
        }
        Ok(())
    }

    /// Button 1: list the pending queue. Does not touch the queue.
    pub fn show_queue(&mut self) -> Result<()> {
        let entries: Vec<&Path> = self.queue.iter().collect();
        self.screen.show_queue(&entries)
    }

    /// Button 2 and the hourly trigger: drop the head and show the next
    /// image that still loads.
    ///
    /// An exhausted queue is refilled at most once per call; if that yields
    /// nothing displayable the "no images" message becomes the resting state.
    #[instrument(skip(self))]
    pub fn show_next(&mut self) -> Result<()> {
        self.queue.advance();
        let mut refilled = false;
        loop {
            let Some(head) = self.head() else {
                if refilled || self.queue.refill() == QueueState::Empty {
                    warn!(root = %self.queue.scanner().root().display(), "no images found");
                    return self.screen.show_message(NO_IMAGES);
                }
                refilled = true;
                continue;
            };
            if self.screen.show_image(&head)?.is_displayed() {
                return Ok(());
            }
            warn!(path = %head.display(), "queued image unavailable; skipping");
            self.queue.advance();
        }
    }

    /// Button 3: show the newest file on the share, falling back to the
    /// current head when it cannot be shown.
    pub fn show_latest(&mut self) -> Result<()> {
        let outcome = match self.queue.scanner().most_recent() {
            Some(latest) => self.screen.show_image(&latest)?,
            None => ImageOutcome::Unavailable,
        };
        if outcome.is_displayed() {
            return Ok(());
        }

        warn!("most recent image unavailable");
        self.screen.show_message(MOST_RECENT_MISSING)?;
        self.pause();
        match self.head() {
            Some(head) => {
                if !self.screen.show_image(&head)?.is_displayed() {
                    warn!(path = %head.display(), "current image unavailable");
                }
                Ok(())
            }
            None => self.screen.show_message(NO_IMAGES),
        }
    }

    /// Button 4: redraw the head without advancing. Nothing happens when
    /// the queue is empty.
    pub fn reload(&mut self) -> Result<()> {
        let Some(head) = self.head() else {
            debug!("reload with empty queue; nothing to show");
            return Ok(());
        };
        if !self.screen.show_image(&head)?.is_displayed() {
            warn!(path = %head.display(), "current image unavailable");
        }
        Ok(())
    }

    /// Release the hardware.
    pub fn shutdown(&mut self) -> Result<()> {
        self.screen.shutdown()
    }

    fn head(&self) -> Option<PathBuf> {
        self.queue.head().map(Path::to_path_buf)
    }

    fn pause(&self) {
        if !self.settings.message_pause.is_zero() {
            thread::sleep(self.settings.message_pause);
        }
    }
}
