use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use art_display::queue::{ImageQueue, QueueState};
use art_display::scan::Scanner;
use tempfile::tempdir;

fn touch(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, b"x")?;
    Ok(())
}

fn sorted(mut v: Vec<PathBuf>) -> Vec<PathBuf> {
    v.sort();
    v
}

#[test]
fn scan_recurses_and_filters_by_extension() -> Result<()> {
    let tmp = tempdir()?;
    let root = tmp.path();
    let wanted = [
        root.join("a.png"),
        root.join("b.JPG"),
        root.join("deep/er/c.bmp"),
        root.join("deep/d.gif"),
        root.join("e.jpeg"),
    ];
    for p in &wanted {
        touch(p)?;
    }
    touch(&root.join("notes.txt"))?;
    touch(&root.join("deep/raw.tiff"))?;
    touch(&root.join("noext"))?;
    fs::create_dir_all(root.join("folder.png"))?;

    let found = Scanner::with_default_extensions(root).scan();
    assert_eq!(sorted(found.clone()), sorted(wanted.to_vec()));
    assert!(found.iter().all(|p| p.is_absolute()));
    Ok(())
}

#[test]
fn custom_extensions_restrict_scan() -> Result<()> {
    let tmp = tempdir()?;
    touch(&tmp.path().join("a.png"))?;
    touch(&tmp.path().join("b.webp"))?;

    let scanner = Scanner::new(tmp.path(), &["WEBP".to_string()]);
    assert_eq!(scanner.scan(), vec![tmp.path().join("b.webp")]);
    Ok(())
}

#[test]
fn file_as_root_scans_empty() -> Result<()> {
    let tmp = tempdir()?;
    let file = tmp.path().join("a.png");
    touch(&file)?;
    assert!(Scanner::with_default_extensions(&file).scan().is_empty());
    Ok(())
}

#[test]
fn most_recent_ignores_unaccepted_files() -> Result<()> {
    let tmp = tempdir()?;
    touch(&tmp.path().join("only.png"))?;
    std::thread::sleep(std::time::Duration::from_millis(20));
    touch(&tmp.path().join("later.txt"))?;

    let scanner = Scanner::with_default_extensions(tmp.path());
    assert_eq!(scanner.most_recent(), Some(tmp.path().join("only.png")));
    Ok(())
}

#[test]
fn one_pass_visits_every_path_once() -> Result<()> {
    let tmp = tempdir()?;
    let mut expected = HashSet::new();
    for i in 0..12 {
        let p = tmp.path().join(format!("sub{}/img{i}.png", i % 3));
        touch(&p)?;
        expected.insert(p);
    }

    let mut queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    assert_eq!(queue.refill(), QueueState::Populated);

    let mut seen = HashSet::new();
    while let Some(head) = queue.head() {
        assert!(seen.insert(head.to_path_buf()), "{} visited twice", head.display());
        queue.advance();
    }
    assert_eq!(seen, expected);
    assert_eq!(queue.refills(), 1);
    Ok(())
}

#[test]
fn refill_happens_only_after_exhaustion() -> Result<()> {
    let tmp = tempdir()?;
    for name in ["a.png", "b.jpg", "c.bmp"] {
        touch(&tmp.path().join(name))?;
    }
    let mut queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));

    assert!(queue.head_or_refill().is_some());
    assert_eq!(queue.refills(), 1);
    for _ in 0..2 {
        queue.advance();
        assert!(queue.head_or_refill().is_some());
        assert_eq!(queue.refills(), 1);
    }
    assert_eq!(queue.advance(), QueueState::Empty);
    assert!(queue.head_or_refill().is_some());
    assert_eq!(queue.refills(), 2);
    assert_eq!(queue.len(), 3);
    Ok(())
}

#[test]
fn refill_picks_up_new_files() -> Result<()> {
    let tmp = tempdir()?;
    touch(&tmp.path().join("a.png"))?;
    let mut queue = ImageQueue::new(Scanner::with_default_extensions(tmp.path()));
    queue.refill();
    assert_eq!(queue.len(), 1);

    touch(&tmp.path().join("b.png"))?;
    queue.advance();
    queue.refill();
    let names: HashSet<PathBuf> = queue.iter().map(Path::to_path_buf).collect();
    assert_eq!(
        names,
        HashSet::from([tmp.path().join("a.png"), tmp.path().join("b.png")])
    );
    Ok(())
}

#[test]
fn seeded_queues_shuffle_identically() -> Result<()> {
    let tmp = tempdir()?;
    for i in 0..20 {
        touch(&tmp.path().join(format!("{i:02}.png")))?;
    }
    let order = |seed| {
        let mut q =
            ImageQueue::new(Scanner::with_default_extensions(tmp.path())).with_seed(Some(seed));
        q.refill();
        q.iter().map(Path::to_path_buf).collect::<Vec<_>>()
    };
    assert_eq!(order(42), order(42));
    assert_eq!(sorted(order(42)), sorted(order(43)));
    Ok(())
}
