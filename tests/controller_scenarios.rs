use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::{Result, bail};
use art_display::events::{Button, ImageOutcome};
use art_display::platform::buttons::ButtonSource;
use art_display::queue::ImageQueue;
use art_display::render::Screen;
use art_display::scan::Scanner;
use art_display::tasks::controller::{
    Clock, Controller, LoopSettings, MOST_RECENT_MISSING, NO_IMAGES,
};
use tempfile::tempdir;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Shown {
    Image(PathBuf),
    Missing(PathBuf),
    Message(String),
    Queue(Vec<PathBuf>),
}

#[derive(Default)]
struct RecordingScreen {
    events: Vec<Shown>,
    broken: HashSet<PathBuf>,
    faulty: HashSet<PathBuf>,
    fail_messages: bool,
    shut_down: bool,
}

impl Screen for RecordingScreen {
    fn show_image(&mut self, path: &Path) -> Result<ImageOutcome> {
        if self.faulty.contains(path) {
            bail!("failed to open {}: permission denied", path.display());
        }
        if !path.exists() || self.broken.contains(path) {
            self.events.push(Shown::Missing(path.to_path_buf()));
            return Ok(ImageOutcome::Unavailable);
        }
        self.events.push(Shown::Image(path.to_path_buf()));
        Ok(ImageOutcome::Displayed)
    }

    fn show_message(&mut self, text: &str) -> Result<()> {
        if self.fail_messages {
            bail!("panel refresh failed");
        }
        self.events.push(Shown::Message(text.to_string()));
        Ok(())
    }

    fn show_queue(&mut self, entries: &[&Path]) -> Result<()> {
        self.events
            .push(Shown::Queue(entries.iter().map(|p| p.to_path_buf()).collect()));
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.shut_down = true;
        Ok(())
    }
}

#[derive(Clone, Default)]
struct ScriptedButtons(Arc<Mutex<VecDeque<Button>>>);

impl ScriptedButtons {
    fn press(&self, button: Button) {
        self.0.lock().unwrap().push_back(button);
    }
}

impl ButtonSource for ScriptedButtons {
    fn poll(&mut self) -> Result<Vec<Button>> {
        Ok(self.0.lock().unwrap().drain(..).collect())
    }
}

#[derive(Clone)]
struct FixedClock(Arc<AtomicU32>);

impl FixedClock {
    fn at(hour: u32) -> Self {
        Self(Arc::new(AtomicU32::new(hour)))
    }

    fn set(&self, hour: u32) {
        self.0.store(hour, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn hour(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

type TestController = Controller<RecordingScreen, ScriptedButtons, FixedClock>;

fn controller(root: &Path) -> (TestController, ScriptedButtons, FixedClock) {
    let buttons = ScriptedButtons::default();
    let clock = FixedClock::at(9);
    let queue = ImageQueue::new(Scanner::with_default_extensions(root)).with_seed(Some(7));
    let ctrl = Controller::new(
        RecordingScreen::default(),
        buttons.clone(),
        clock.clone(),
        queue,
        settings(),
    );
    (ctrl, buttons, clock)
}

fn controller_with(screen: RecordingScreen, queue: ImageQueue) -> TestController {
    Controller::new(
        screen,
        ScriptedButtons::default(),
        FixedClock::at(9),
        queue,
        settings(),
    )
}

fn settings() -> LoopSettings {
    LoopSettings {
        poll_interval: Duration::from_millis(1),
        message_pause: Duration::ZERO,
        version: "1.0".to_string(),
    }
}

// Push the mtime an hour back so ordering holds without birth times.
fn backdate(path: &Path) -> Result<()> {
    let hour_ago = SystemTime::now() - Duration::from_secs(3600);
    fs::File::options()
        .write(true)
        .open(path)?
        .set_modified(hour_ago)?;
    Ok(())
}

fn last(ctrl: &TestController) -> Shown {
    ctrl.screen().events.last().cloned().expect("nothing shown")
}

#[test]
fn empty_share_rests_on_no_images_until_a_file_appears() -> Result<()> {
    let tmp = tempdir()?;
    let (mut ctrl, buttons, _clock) = controller(tmp.path());

    ctrl.startup()?;
    assert_eq!(
        ctrl.screen().events,
        vec![Shown::Message("Art Display v1.0".to_string())]
    );

    // First tick: hour marker is unset, so the rotation fires.
    ctrl.tick()?;
    assert_eq!(ctrl.current_hour(), Some(9));
    assert_eq!(last(&ctrl), Shown::Message(NO_IMAGES.to_string()));
    assert_eq!(ctrl.queue().refills(), 1);

    // Idle tick in the same hour does nothing.
    let before = ctrl.screen().events.len();
    ctrl.tick()?;
    assert_eq!(ctrl.screen().events.len(), before);

    buttons.press(Button::Next);
    ctrl.tick()?;
    assert_eq!(last(&ctrl), Shown::Message(NO_IMAGES.to_string()));
    assert_eq!(ctrl.queue().refills(), 2);

    let art = tmp.path().join("a.png");
    fs::write(&art, b"x")?;
    buttons.press(Button::Next);
    ctrl.tick()?;
    assert_eq!(last(&ctrl), Shown::Image(art));
    Ok(())
}

#[test]
fn every_action_on_an_empty_share_reports_no_images() -> Result<()> {
    let tmp = tempdir()?;
    let (mut ctrl, _buttons, _clock) = controller(&tmp.path().join("missing"));

    ctrl.show_next()?;
    assert_eq!(last(&ctrl), Shown::Message(NO_IMAGES.to_string()));

    ctrl.show_latest()?;
    let events = &ctrl.screen().events;
    assert_eq!(
        events[events.len() - 2..],
        [
            Shown::Message(MOST_RECENT_MISSING.to_string()),
            Shown::Message(NO_IMAGES.to_string()),
        ]
    );

    let before = ctrl.screen().events.len();
    ctrl.reload()?;
    assert_eq!(ctrl.screen().events.len(), before, "reload on empty queue is a no-op");

    ctrl.show_queue()?;
    assert_eq!(last(&ctrl), Shown::Queue(Vec::new()));
    Ok(())
}

#[test]
fn hour_change_advances_once_per_hour() -> Result<()> {
    let tmp = tempdir()?;
    for name in ["a.png", "b.jpg", "c.bmp"] {
        fs::write(tmp.path().join(name), b"x")?;
    }
    let (mut ctrl, _buttons, clock) = controller(tmp.path());

    ctrl.tick()?;
    let Shown::Image(first) = last(&ctrl) else {
        panic!("expected an image");
    };
    assert_eq!(ctrl.queue().len(), 3);

    ctrl.tick()?;
    ctrl.tick()?;
    assert_eq!(ctrl.screen().events.len(), 1);

    clock.set(10);
    ctrl.tick()?;
    let Shown::Image(second) = last(&ctrl) else {
        panic!("expected an image");
    };
    assert_ne!(first, second);
    assert_eq!(ctrl.queue().len(), 2);
    assert_eq!(ctrl.current_hour(), Some(10));
    Ok(())
}

#[test]
fn vanished_head_is_skipped_and_queue_refills() -> Result<()> {
    let tmp = tempdir()?;
    let a = tmp.path().join("a.png");
    let b = tmp.path().join("b.png");
    fs::write(&a, b"x")?;
    fs::write(&b, b"x")?;
    let (mut ctrl, buttons, _clock) = controller(tmp.path());

    ctrl.tick()?;
    let Shown::Image(shown) = last(&ctrl) else {
        panic!("expected an image");
    };
    let other = if shown == a { b.clone() } else { a.clone() };
    fs::remove_file(&other)?;

    buttons.press(Button::Next);
    ctrl.tick()?;
    let events = &ctrl.screen().events;
    assert_eq!(
        events[1..],
        [Shown::Missing(other), Shown::Image(shown.clone())]
    );
    assert_eq!(ctrl.queue().refills(), 2);
    assert_eq!(ctrl.queue().head(), Some(shown.as_path()));
    Ok(())
}

#[test]
fn undecodable_share_ends_in_no_images_instead_of_looping() -> Result<()> {
    let tmp = tempdir()?;
    let a = tmp.path().join("a.png");
    fs::write(&a, b"x")?;

    let mut screen = RecordingScreen::default();
    screen.broken.insert(a.clone());
    let queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    let mut ctrl = controller_with(screen, queue);

    ctrl.show_next()?;
    assert_eq!(
        ctrl.screen().events,
        vec![Shown::Missing(a), Shown::Message(NO_IMAGES.to_string())]
    );
    assert_eq!(ctrl.queue().refills(), 1);
    Ok(())
}

#[test]
fn latest_shows_newest_file_without_touching_queue() -> Result<()> {
    let tmp = tempdir()?;
    let old = tmp.path().join("old.png");
    fs::write(&old, b"x")?;
    backdate(&old)?;
    std::thread::sleep(Duration::from_millis(20));
    fs::create_dir_all(tmp.path().join("nested"))?;
    let new = tmp.path().join("nested").join("new.png");
    fs::write(&new, b"x")?;
    fs::write(tmp.path().join("notes.txt"), b"not an image")?;

    let (mut ctrl, buttons, _clock) = controller(tmp.path());
    ctrl.tick()?;
    let queued = ctrl.queue().len();

    buttons.press(Button::Latest);
    ctrl.tick()?;
    assert_eq!(last(&ctrl), Shown::Image(new));
    assert_eq!(ctrl.queue().len(), queued);
    Ok(())
}

#[test]
fn broken_latest_falls_back_to_current_head() -> Result<()> {
    let tmp = tempdir()?;
    let a = tmp.path().join("a.png");
    fs::write(&a, b"x")?;
    backdate(&a)?;
    std::thread::sleep(Duration::from_millis(20));
    let b = tmp.path().join("b.png");
    fs::write(&b, b"garbage")?;

    let mut screen = RecordingScreen::default();
    screen.broken.insert(b.clone());
    let mut queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    queue.refill();
    while queue.head() != Some(a.as_path()) {
        queue.advance();
    }
    let mut ctrl = controller_with(screen, queue);

    ctrl.show_latest()?;
    assert_eq!(
        ctrl.screen().events,
        vec![
            Shown::Missing(b),
            Shown::Message(MOST_RECENT_MISSING.to_string()),
            Shown::Image(a),
        ]
    );
    Ok(())
}

#[test]
fn reload_repeats_head_and_overview_leaves_queue_alone() -> Result<()> {
    let tmp = tempdir()?;
    for name in ["a.png", "b.jpg", "c.bmp"] {
        fs::write(tmp.path().join(name), b"x")?;
    }
    let (mut ctrl, buttons, _clock) = controller(tmp.path());
    ctrl.tick()?;
    let head = ctrl.queue().head().map(Path::to_path_buf).expect("head");

    buttons.press(Button::Reload);
    ctrl.tick()?;
    buttons.press(Button::Reload);
    ctrl.tick()?;
    let events = &ctrl.screen().events;
    assert_eq!(
        events[events.len() - 2..],
        [Shown::Image(head.clone()), Shown::Image(head.clone())]
    );

    let pending: Vec<PathBuf> = ctrl.queue().iter().map(Path::to_path_buf).collect();
    buttons.press(Button::Queue);
    ctrl.tick()?;
    assert_eq!(last(&ctrl), Shown::Queue(pending.clone()));
    let after: Vec<PathBuf> = ctrl.queue().iter().map(Path::to_path_buf).collect();
    assert_eq!(after, pending);
    assert_eq!(ctrl.queue().head(), Some(head.as_path()));
    Ok(())
}

#[test]
fn presses_from_one_poll_all_run_in_order() -> Result<()> {
    let tmp = tempdir()?;
    fs::write(tmp.path().join("a.png"), b"x")?;
    fs::write(tmp.path().join("b.png"), b"x")?;
    let (mut ctrl, buttons, _clock) = controller(tmp.path());
    ctrl.tick()?;
    let start = ctrl.screen().events.len();

    buttons.press(Button::Queue);
    buttons.press(Button::Reload);
    ctrl.tick()?;
    let events = &ctrl.screen().events[start..];
    assert!(matches!(events[0], Shown::Queue(_)));
    assert!(matches!(events[1], Shown::Image(_)));
    Ok(())
}

#[test]
fn run_exits_when_cancelled_and_shutdown_releases_screen() -> Result<()> {
    let tmp = tempdir()?;
    let (mut ctrl, _buttons, _clock) = controller(tmp.path());
    let cancel = tokio_util::sync::CancellationToken::new();
    cancel.cancel();
    ctrl.run(&cancel)?;
    assert_eq!(
        ctrl.screen().events,
        vec![Shown::Message("Art Display v1.0".to_string())]
    );
    ctrl.shutdown()?;
    assert!(ctrl.screen().shut_down);
    Ok(())
}

#[test]
fn image_fault_stops_tick_and_keeps_head() -> Result<()> {
    let tmp = tempdir()?;
    let a = tmp.path().join("a.png");
    fs::write(&a, b"x")?;

    let mut screen = RecordingScreen::default();
    screen.faulty.insert(a.clone());
    let queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    let mut ctrl = controller_with(screen, queue);

    let err = ctrl.tick().unwrap_err();
    assert!(err.to_string().contains("permission denied"));
    assert!(ctrl.screen().events.is_empty());
    assert_eq!(ctrl.queue().head(), Some(a.as_path()));
    assert_eq!(ctrl.queue().len(), 1);
    assert_eq!(ctrl.queue().refills(), 1);

    ctrl.shutdown()?;
    assert!(ctrl.screen().shut_down);
    Ok(())
}

#[test]
fn message_fault_ends_run_and_release_still_happens() -> Result<()> {
    let tmp = tempdir()?;
    let screen = RecordingScreen {
        fail_messages: true,
        ..RecordingScreen::default()
    };
    let queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    let mut ctrl = controller_with(screen, queue);

    let cancel = tokio_util::sync::CancellationToken::new();
    let err = ctrl.run_and_release(&cancel).unwrap_err();
    assert!(err.to_string().contains("panel refresh failed"));
    assert!(ctrl.screen().shut_down);
    assert!(!cancel.is_cancelled());
    Ok(())
}

struct PanickingButtons;

impl ButtonSource for PanickingButtons {
    fn poll(&mut self) -> Result<Vec<Button>> {
        panic!("input driver crashed");
    }
}

#[test]
fn panic_in_loop_still_releases_screen() -> Result<()> {
    let tmp = tempdir()?;
    let queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    let mut ctrl = Controller::new(
        RecordingScreen::default(),
        PanickingButtons,
        FixedClock::at(9),
        queue,
        settings(),
    );

    let cancel = tokio_util::sync::CancellationToken::new();
    let err = ctrl.run_and_release(&cancel).unwrap_err();
    assert!(err.to_string().contains("panicked"));
    assert!(ctrl.screen().shut_down);
    Ok(())
}
