//! Shuffled queue of pending image paths.
//!
//! The head of the queue is what the panel is showing (or about to show).
//! Advancing drops the head; once the queue runs dry it is rebuilt from a
//! fresh scan in a new random order.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::scan::Scanner;

/// Whether the queue currently holds anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Empty,
    Populated,
}

#[derive(Debug, Clone)]
pub struct ImageQueue {
    scanner: Scanner,
    entries: VecDeque<PathBuf>,
    seed: Option<u64>,
    refills: u64,
}

impl ImageQueue {
    /// An empty queue; nothing is scanned until the first refill.
    pub fn new(scanner: Scanner) -> Self {
        Self {
            scanner,
            entries: VecDeque::new(),
            seed: None,
            refills: 0,
        }
    }

    /// Use a deterministic shuffle. Each refill derives its own seed, so
    /// successive refills still produce different orders.
    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    #[must_use]
    pub fn state(&self) -> QueueState {
        if self.entries.is_empty() {
            QueueState::Empty
        } else {
            QueueState::Populated
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of refills performed so far.
    #[must_use]
    pub const fn refills(&self) -> u64 {
        self.refills
    }

    /// Replace the contents with a freshly scanned, shuffled list.
    pub fn refill(&mut self) -> QueueState {
        let mut found = self.scanner.scan();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(self.refills)),
            None => StdRng::from_os_rng(),
        };
        found.shuffle(&mut rng);
        self.refills += 1;
        info!(
            queued = found.len(),
            refill = self.refills,
            "queue refilled (shuffled)"
        );
        self.entries = found.into();
        self.state()
    }

    /// Drop the current head. Returns [`QueueState::Empty`] when nothing is
    /// left; the caller refills before reading again.
    pub fn advance(&mut self) -> QueueState {
        if let Some(dropped) = self.entries.pop_front() {
            debug!(path = %dropped.display(), remaining = self.entries.len(), "queue advanced");
        }
        self.state()
    }

    /// The current head, without side effects.
    #[must_use]
    pub fn head(&self) -> Option<&Path> {
        self.entries.front().map(PathBuf::as_path)
    }

    /// The current head, refilling once first if the queue is empty.
    pub fn head_or_refill(&mut self) -> Option<&Path> {
        if self.entries.is_empty() {
            self.refill();
        }
        self.head()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.entries.iter().map(PathBuf::as_path)
    }
}
