//! termios backend for Unix
//!
//! The first non-normal mode change in the process records the original
//! termios of that descriptor. `reset_mode` puts it back.

use std::fmt;
use std::io;
use std::mem;
use std::sync::{Mutex, PoisonError, TryLockError};

use tracing::debug;

use super::{Result, TtyDriver, TtyError};
use crate::tty::types::{RawFd, TtyMode, VTermState, WinSize};

/// Original settings captured before the first mode change
pub(crate) struct SavedTermios {
    fd: RawFd,
    termios: libc::termios,
}

type SavedSlot = Mutex<Option<SavedTermios>>;

static SAVED: SavedSlot = Mutex::new(None);

pub struct TermiosDriver {
    saved: &'static SavedSlot,
}

impl Default for TermiosDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TermiosDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TermiosDriver").finish_non_exhaustive()
    }
}

impl TermiosDriver {
    /// Driver backed by the process-wide saved termios
    pub fn new() -> Self {
        Self::with_saved(&SAVED)
    }

    pub(crate) fn with_saved(saved: &'static SavedSlot) -> Self {
        Self { saved }
    }
}

fn os_error(fd: RawFd) -> TtyError {
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EBADF) => TtyError::InvalidDescriptor(fd),
        Some(libc::ENOTTY) => TtyError::NotATerminal(fd),
        _ => TtyError::Os(err),
    }
}

fn get_attr(fd: RawFd) -> Result<libc::termios> {
    unsafe {
        let mut termios: libc::termios = mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(os_error(fd));
        }
        Ok(termios)
    }
}

fn set_attr(fd: RawFd, action: libc::c_int, termios: &libc::termios) -> Result<()> {
    unsafe {
        if libc::tcsetattr(fd, action, termios) != 0 {
            return Err(os_error(fd));
        }
    }
    Ok(())
}

fn raw_attrs(mut t: libc::termios) -> libc::termios {
    t.c_iflag &= !(libc::BRKINT | libc::ICRNL | libc::INPCK | libc::ISTRIP | libc::IXON);
    t.c_oflag |= libc::ONLCR;
    t.c_cflag |= libc::CS8;
    t.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);
    t.c_cc[libc::VMIN] = 1;
    t.c_cc[libc::VTIME] = 0;
    t
}

fn io_attrs(mut t: libc::termios) -> libc::termios {
    unsafe { libc::cfmakeraw(&mut t) };
    t
}

fn cooked_attrs(mut t: libc::termios) -> libc::termios {
    t.c_iflag |= libc::ICRNL | libc::IXON;
    t.c_oflag |= libc::OPOST | libc::ONLCR;
    t.c_lflag |= libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG;
    t
}

impl TtyDriver for TermiosDriver {
    fn init(&self, fd: RawFd, _readable: bool) -> Result<()> {
        if fd < 0 {
            return Err(TtyError::InvalidDescriptor(fd));
        }
        if unsafe { libc::isatty(fd) } != 1 {
            return Err(os_error(fd));
        }
        Ok(())
    }

    fn set_mode(&self, fd: RawFd, _readable: bool, mode: TtyMode) -> Result<()> {
        let current = get_attr(fd)?;
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);

        if mode != TtyMode::Normal && saved.is_none() {
            debug!("Saving original termios of fd {}", fd);
            *saved = Some(SavedTermios { fd, termios: current });
        }

        let next = match mode {
            TtyMode::Normal => match saved.as_ref() {
                Some(orig) if orig.fd == fd => orig.termios,
                _ => cooked_attrs(current),
            },
            TtyMode::Raw => raw_attrs(current),
            TtyMode::Io => io_attrs(current),
        };

        set_attr(fd, libc::TCSADRAIN, &next)
    }

    fn reset_mode(&self) -> Result<()> {
        // try_lock: reset may run while a mode change on another thread holds the lock
        let saved = match self.saved.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(TtyError::Busy),
        };

        match saved.as_ref() {
            Some(orig) => set_attr(orig.fd, libc::TCSANOW, &orig.termios),
            None => Ok(()),
        }
    }

    fn winsize(&self, fd: RawFd) -> Result<WinSize> {
        unsafe {
            let mut ws: libc::winsize = mem::zeroed();
            if libc::ioctl(fd, libc::TIOCGWINSZ, &mut ws) != 0 {
                return Err(os_error(fd));
            }
            Ok(WinSize::new(i32::from(ws.ws_col), i32::from(ws.ws_row)))
        }
    }

    fn set_vterm_state(&self, _state: VTermState) {}

    fn vterm_state(&self) -> Result<VTermState> {
        Err(TtyError::Unsupported("vterm state is not available on unix"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::unix::io::{AsRawFd, FromRawFd};
    use std::ptr;

    fn dev_null() -> File {
        File::open("/dev/null").unwrap()
    }

    /// Returns (master, slave) ends of a fresh pseudo terminal
    fn open_pty() -> (File, File) {
        let mut master: libc::c_int = -1;
        let mut slave: libc::c_int = -1;
        let rc = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                ptr::null_mut(),
                ptr::null_mut::<libc::termios>(),
                ptr::null_mut::<libc::winsize>(),
            )
        };
        assert_eq!(rc, 0, "openpty failed: {}", io::Error::last_os_error());
        unsafe { (File::from_raw_fd(master), File::from_raw_fd(slave)) }
    }

    #[test]
    fn test_pty_modes_and_reset_restore_original() {
        static PTY_SAVED: SavedSlot = Mutex::new(None);
        let driver = TermiosDriver::with_saved(&PTY_SAVED);
        let (_master, slave) = open_pty();
        let fd = slave.as_raw_fd();

        driver.init(fd, true).unwrap();
        let original = get_attr(fd).unwrap();
        assert_ne!(original.c_lflag & libc::ICANON, 0);

        driver.set_mode(fd, true, TtyMode::Raw).unwrap();
        let raw = get_attr(fd).unwrap();
        assert_eq!(raw.c_lflag & libc::ICANON, 0);
        assert_eq!(raw.c_lflag & libc::ECHO, 0);
        assert_eq!(raw.c_iflag & libc::ICRNL, 0);

        // Normal goes back to the termios saved by the first raw switch
        driver.set_mode(fd, true, TtyMode::Normal).unwrap();
        let normal = get_attr(fd).unwrap();
        assert_eq!(normal.c_lflag, original.c_lflag);
        assert_eq!(normal.c_iflag, original.c_iflag);

        driver.set_mode(fd, true, TtyMode::Io).unwrap();
        let io_mode = get_attr(fd).unwrap();
        assert_eq!(io_mode.c_lflag & libc::ICANON, 0);
        assert_eq!(io_mode.c_lflag & libc::ISIG, 0);

        driver.reset_mode().unwrap();
        let restored = get_attr(fd).unwrap();
        assert_eq!(restored.c_lflag, original.c_lflag);
        assert_eq!(restored.c_iflag, original.c_iflag);

        driver.reset_mode().unwrap();
        assert_eq!(get_attr(fd).unwrap().c_lflag, original.c_lflag);
    }

    #[test]
    fn test_reset_without_saved_state_is_noop() {
        static EMPTY: SavedSlot = Mutex::new(None);
        let driver = TermiosDriver::with_saved(&EMPTY);
        assert!(driver.reset_mode().is_ok());
        assert!(driver.reset_mode().is_ok());
    }

    #[test]
    fn test_pty_winsize() {
        let (_master, slave) = open_pty();
        let driver = TermiosDriver::new();
        let size = driver.winsize(slave.as_raw_fd()).unwrap();
        assert!(!size.is_error());
        assert_eq!(size, WinSize::new(0, 0));
    }

    #[test]
    fn test_init_rejects_non_terminal() {
        let file = dev_null();
        let driver = TermiosDriver::new();
        assert!(matches!(
            driver.init(file.as_raw_fd(), true),
            Err(TtyError::NotATerminal(_))
        ));
    }

    #[test]
    fn test_init_rejects_negative_fd() {
        let driver = TermiosDriver::new();
        assert!(matches!(driver.init(-1, false), Err(TtyError::InvalidDescriptor(-1))));
    }

    #[test]
    fn test_mode_fails_consistently_on_non_terminal() {
        let file = dev_null();
        let driver = TermiosDriver::new();
        assert!(driver.set_mode(file.as_raw_fd(), true, TtyMode::Raw).is_err());
        assert!(driver.set_mode(file.as_raw_fd(), true, TtyMode::Normal).is_err());
        assert!(driver.set_mode(file.as_raw_fd(), true, TtyMode::Io).is_err());
    }

    #[test]
    fn test_winsize_fails_on_non_terminal() {
        let file = dev_null();
        assert!(TermiosDriver::new().winsize(file.as_raw_fd()).is_err());
    }

    #[test]
    fn test_vterm_is_noop() {
        let driver = TermiosDriver::new();
        driver.set_vterm_state(VTermState::Supported);
        driver.set_vterm_state(VTermState::Unsupported);
        assert!(matches!(driver.vterm_state(), Err(TtyError::Unsupported(_))));
    }

    #[test]
    fn test_raw_attrs_clear_canonical_flags() {
        let base = cooked_attrs(unsafe { mem::zeroed() });
        let raw = raw_attrs(base);
        assert_eq!(raw.c_lflag & libc::ICANON, 0);
        assert_eq!(raw.c_lflag & libc::ECHO, 0);
        assert_eq!(raw.c_lflag & libc::ISIG, 0);
        assert_eq!(raw.c_cc[libc::VMIN], 1);
        assert_ne!(raw.c_oflag & libc::ONLCR, 0);
    }
}
