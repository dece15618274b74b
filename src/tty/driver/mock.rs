//! In-memory driver for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Result, TtyDriver, TtyError};
use crate::tty::types::{RawFd, TtyMode, VTermState, WinSize};

#[derive(Debug)]
pub(crate) struct MockDriver {
    /// Descriptors that behave like terminals
    terminals: Vec<RawFd>,
    size: Option<WinSize>,
    /// Refuse mode changes through writable handles
    input_only: bool,
    pub(crate) resets: AtomicUsize,
    pub(crate) modes: Mutex<Vec<(RawFd, TtyMode)>>,
    pub(crate) vterm: Mutex<Option<VTermState>>,
}

impl MockDriver {
    pub(crate) fn new(terminals: &[RawFd]) -> Self {
        Self {
            terminals: terminals.to_vec(),
            size: Some(WinSize::new(80, 24)),
            input_only: false,
            resets: AtomicUsize::new(0),
            modes: Mutex::new(Vec::new()),
            vterm: Mutex::new(None),
        }
    }

    pub(crate) fn without_window(mut self) -> Self {
        self.size = None;
        self
    }

    pub(crate) fn input_only(mut self) -> Self {
        self.input_only = true;
        self
    }

    pub(crate) fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    fn check(&self, fd: RawFd) -> Result<()> {
        if fd < 0 {
            Err(TtyError::InvalidDescriptor(fd))
        } else if self.terminals.contains(&fd) {
            Ok(())
        } else {
            Err(TtyError::NotATerminal(fd))
        }
    }
}

impl TtyDriver for MockDriver {
    fn init(&self, fd: RawFd, _readable: bool) -> Result<()> {
        self.check(fd)
    }

    fn set_mode(&self, fd: RawFd, readable: bool, mode: TtyMode) -> Result<()> {
        self.check(fd)?;
        if self.input_only && !readable {
            return Err(TtyError::NotReadable(fd));
        }
        self.modes.lock().unwrap().push((fd, mode));
        Ok(())
    }

    fn reset_mode(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn winsize(&self, fd: RawFd) -> Result<WinSize> {
        self.check(fd)?;
        self.size.ok_or(TtyError::Unsupported("no window"))
    }

    fn set_vterm_state(&self, state: VTermState) {
        *self.vterm.lock().unwrap() = Some(state);
    }

    fn vterm_state(&self) -> Result<VTermState> {
        self.vterm
            .lock()
            .unwrap()
            .ok_or(TtyError::Unsupported("vterm state"))
    }
}
