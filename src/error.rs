use std::path::PathBuf;

use thiserror::Error;

/// Library error type for art display operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The font file could not be parsed as a TrueType/OpenType face.
    #[error("invalid font data in {0}")]
    BadFont(PathBuf),

    /// No usable font was found on disk or among the system fonts.
    #[error("no usable font found (looked for {0})")]
    NoFont(PathBuf),

    /// A frame handed to a panel does not match the panel geometry.
    #[error("frame is {got_w}x{got_h} but panel is {want_w}x{want_h}")]
    FrameSize {
        got_w: u32,
        got_h: u32,
        want_w: u32,
        want_h: u32,
    },

    /// A configured button key name is not a known input key code.
    #[error("unknown key code: {0}")]
    UnknownKey(String),

    /// The configured panel or input backend is not available on this platform.
    #[error("{0} backend is not supported on this platform")]
    Unsupported(&'static str),

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
