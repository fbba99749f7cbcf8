//! Plain-text record of faults that stopped the frame.

use std::backtrace::Backtrace;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Append a timestamp, the error message, its full chain and a backtrace of
/// the logging call to `path`, creating parent directories as needed.
///
/// The backtrace is captured regardless of `RUST_BACKTRACE`. It shows where
/// the fault was reported; the origin is in the chain.
pub fn append(path: &Path, err: &anyhow::Error) -> io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", chrono::Local::now().format("%c"))?;
    writeln!(file, "{err}")?;
    writeln!(file, "{err:?}")?;
    writeln!(file, "stack backtrace:\n{}", Backtrace::force_capture())?;
    writeln!(file)?;
    file.flush()
}
