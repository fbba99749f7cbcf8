use std::fmt;

/// The four physical buttons on the frame, in legend order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Button {
    /// Show the pending queue.
    Queue,
    /// Advance to the next image.
    Next,
    /// Show the most recently added image.
    Latest,
    /// Redraw the current image.
    Reload,
}

impl Button {
    pub const ALL: [Self; 4] = [Self::Queue, Self::Next, Self::Latest, Self::Reload];

    /// Zero-based position of the button, matching the configured key order.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Queue => 0,
            Self::Next => 1,
            Self::Latest => 2,
            Self::Reload => 3,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Queue => "Queue",
            Self::Next => "Next",
            Self::Latest => "Latest",
            Self::Reload => "Reload",
        }
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BTN{}", self.index() + 1)
    }
}

/// Result of trying to put an image file on the panel.
///
/// A file that vanished or no longer decodes is an expected outcome, not an
/// error; faults from the panel itself travel separately as `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Displayed,
    Unavailable,
}

impl ImageOutcome {
    #[must_use]
    pub const fn is_displayed(self) -> bool {
        matches!(self, Self::Displayed)
    }
}
