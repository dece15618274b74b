//! TTY handle
//!
//! A console stream endpoint bound to one file descriptor. Buffered reads
//! and writes belong to the surrounding stream layer; this type adds the
//! terminal-control operations.

use std::sync::Arc;

use tracing::{debug, warn};

use super::driver::{default_driver, Result, TtyDriver, TtyError};
use super::reset::{GuardLease, GuardRegistry};
use super::types::{RawFd, StreamFlags, TtyMode, VTermState, WinSize};

/// Console stream handle.
///
/// The descriptor is usually one of:
///
/// * `0` for stdin (readable)
/// * `1` for stdout
/// * `2` for stderr
///
/// `readable` states whether the stream will be read from. Remember that
/// stdin is readable and stdout is not.
///
/// Every handle holds a lease on the process-wide reset guard, so the
/// terminal mode is restored once the last handle is dropped.
#[derive(Debug)]
pub struct TtyHandle {
    fd: RawFd,
    flags: StreamFlags,
    initialized: bool,
    driver: Arc<dyn TtyDriver>,
    _lease: GuardLease,
}

impl TtyHandle {
    /// Create a handle using the platform driver
    pub fn new(fd: RawFd, readable: bool) -> Self {
        Self::with_driver(fd, readable, default_driver())
    }

    pub fn with_driver(fd: RawFd, readable: bool, driver: Arc<dyn TtyDriver>) -> Self {
        Self::with_registry(fd, readable, driver, GuardRegistry::global())
    }

    /// Create a handle whose reset guard lives in `registry`
    pub fn with_registry(
        fd: RawFd,
        readable: bool,
        driver: Arc<dyn TtyDriver>,
        registry: &'static GuardRegistry,
    ) -> Self {
        let lease = registry.acquire(&driver);
        debug!("Created tty handle for fd {} (readable: {})", fd, readable);
        Self {
            fd,
            flags: StreamFlags::for_readable(readable),
            initialized: false,
            driver,
            _lease: lease,
        }
    }

    /// Bind the handle to its descriptor.
    ///
    /// Fails if the descriptor is not a terminal. The handle stays
    /// uninitialized on failure.
    pub fn init(&mut self) -> Result<()> {
        self.driver.init(self.fd, self.is_readable())?;
        self.initialized = true;
        Ok(())
    }

    fn ensure_init(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(TtyError::NotInitialized)
        }
    }

    /// Set the terminal mode.
    ///
    /// The change is terminal-wide: every handle and process on the same
    /// terminal observes it.
    pub fn set_mode(&self, mode: TtyMode) -> Result<()> {
        self.ensure_init()?;
        self.driver.set_mode(self.fd, self.is_readable(), mode).map_err(|e| {
            warn!("Failed to set fd {} to {} mode: {}", self.fd, mode, e);
            e
        })?;
        debug!("fd {} switched to {} mode", self.fd, mode);
        Ok(())
    }

    /// Restore the default terminal settings now.
    ///
    /// Safe to call repeatedly or when no mode was changed.
    pub fn reset(&self) -> Result<()> {
        self.driver.reset_mode()
    }

    /// Current window size, or [`WinSize::ERROR`] if it can't be queried.
    pub fn winsize(&self) -> WinSize {
        if self.ensure_init().is_err() {
            return WinSize::ERROR;
        }
        match self.driver.winsize(self.fd) {
            Ok(size) => size,
            Err(e) => {
                debug!("Window size query on fd {} failed: {}", self.fd, e);
                WinSize::ERROR
            }
        }
    }

    /// Control whether virtual terminal sequences are processed by the console.
    ///
    /// Only meaningful on Windows; silently ignored elsewhere.
    pub fn set_vterm_state(&self, state: VTermState) {
        self.driver.set_vterm_state(state);
    }

    /// Read the virtual terminal state.
    ///
    /// Returns [`TtyError::Unsupported`] on platforms without the concept.
    pub fn vterm_state(&self) -> Result<VTermState> {
        self.driver.vterm_state()
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn flags(&self) -> StreamFlags {
        self.flags
    }

    pub fn is_readable(&self) -> bool {
        self.flags.contains(StreamFlags::READABLE)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
