//! Terminal driver backends
//!
//! A [`TtyDriver`] is the thin layer between a handle and the OS terminal
//! driver. The backend is selected at build time: termios on Unix, the
//! console API on Windows, and an always-unsupported fallback elsewhere.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use super::types::{RawFd, TtyMode, VTermState, WinSize};

#[cfg(unix)]
mod termios;
#[cfg(windows)]
mod console;

#[cfg(test)]
pub(crate) mod mock;

#[derive(Error, Debug)]
pub enum TtyError {
    #[error("File descriptor {0} is not a terminal")]
    NotATerminal(RawFd),

    #[error("Invalid file descriptor: {0}")]
    InvalidDescriptor(RawFd),

    #[error("File descriptor {0} is not readable")]
    NotReadable(RawFd),

    #[error("Handle has not been initialized")]
    NotInitialized,

    #[error("Operation not supported: {0}")]
    Unsupported(&'static str),

    #[error("Terminal state is busy")]
    Busy,

    #[error("Terminal driver error: {0}")]
    Os(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, TtyError>;

/// OS terminal-control operations used by [`TtyHandle`](super::TtyHandle).
///
/// All calls are synchronous and complete before returning.
pub trait TtyDriver: Send + Sync + fmt::Debug {
    /// Check that `fd` refers to a terminal and prepare it for use.
    fn init(&self, fd: RawFd, readable: bool) -> Result<()>;

    /// Switch the terminal behind `fd` to `mode`. Process-global.
    ///
    /// `readable` is the direction the handle was created for; backends
    /// whose modes only apply to input reject writable handles.
    fn set_mode(&self, fd: RawFd, readable: bool, mode: TtyMode) -> Result<()>;

    /// Restore the terminal settings saved before the first mode change.
    ///
    /// Must be idempotent and succeed when nothing was changed.
    fn reset_mode(&self) -> Result<()>;

    fn winsize(&self, fd: RawFd) -> Result<WinSize>;

    /// Silently ignored where the platform has no such concept.
    fn set_vterm_state(&self, state: VTermState);

    fn vterm_state(&self) -> Result<VTermState>;
}

/// The backend for the current target platform
pub fn default_driver() -> Arc<dyn TtyDriver> {
    #[cfg(unix)]
    return Arc::new(termios::TermiosDriver::new());

    #[cfg(windows)]
    return Arc::new(console::ConsoleDriver::new());

    #[cfg(not(any(unix, windows)))]
    return Arc::new(UnsupportedDriver);
}

/// Fallback for targets without a terminal driver
#[cfg(not(any(unix, windows)))]
#[derive(Debug)]
struct UnsupportedDriver;

#[cfg(not(any(unix, windows)))]
impl TtyDriver for UnsupportedDriver {
    fn init(&self, _fd: RawFd, _readable: bool) -> Result<()> {
        Err(TtyError::Unsupported("tty init"))
    }

    fn set_mode(&self, _fd: RawFd, _readable: bool, _mode: TtyMode) -> Result<()> {
        Err(TtyError::Unsupported("tty mode"))
    }

    fn reset_mode(&self) -> Result<()> {
        Ok(())
    }

    fn winsize(&self, _fd: RawFd) -> Result<WinSize> {
        Err(TtyError::Unsupported("window size"))
    }

    fn set_vterm_state(&self, _state: VTermState) {}

    fn vterm_state(&self) -> Result<VTermState> {
        Err(TtyError::Unsupported("vterm state"))
    }
}
