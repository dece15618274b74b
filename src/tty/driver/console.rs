//! Console API backend for Windows
//!
//! Only the standard descriptors can be mapped to console handles.

use std::io;
use std::sync::{Mutex, PoisonError, TryLockError};

use tracing::debug;
use windows::Win32::Foundation::HANDLE;
use windows::Win32::System::Console::{
    GetConsoleMode, GetConsoleScreenBufferInfo, GetStdHandle, SetConsoleMode, CONSOLE_MODE,
    CONSOLE_SCREEN_BUFFER_INFO, ENABLE_ECHO_INPUT, ENABLE_LINE_INPUT, ENABLE_PROCESSED_INPUT,
    ENABLE_VIRTUAL_TERMINAL_PROCESSING, ENABLE_WINDOW_INPUT, STD_ERROR_HANDLE, STD_HANDLE,
    STD_INPUT_HANDLE, STD_OUTPUT_HANDLE,
};

use super::{Result, TtyDriver, TtyError};
use crate::tty::types::{RawFd, TtyMode, VTermState, WinSize};

/// Original input console mode captured before the first mode change
static SAVED_MODE: Mutex<Option<(RawFd, u32)>> = Mutex::new(None);

#[derive(Debug, Default)]
pub struct ConsoleDriver;

impl ConsoleDriver {
    pub fn new() -> Self {
        Self
    }
}

fn std_handle_id(fd: RawFd) -> Result<STD_HANDLE> {
    match fd {
        0 => Ok(STD_INPUT_HANDLE),
        1 => Ok(STD_OUTPUT_HANDLE),
        2 => Ok(STD_ERROR_HANDLE),
        _ => Err(TtyError::InvalidDescriptor(fd)),
    }
}

/// Console modes set through a handle are input modes; output handles are refused.
fn input_handle_id(fd: RawFd, readable: bool) -> Result<STD_HANDLE> {
    if !readable {
        return Err(TtyError::NotReadable(fd));
    }
    std_handle_id(fd)
}

fn console_handle(fd: RawFd) -> Result<HANDLE> {
    let id = std_handle_id(fd)?;
    unsafe { GetStdHandle(id) }.map_err(|_| TtyError::InvalidDescriptor(fd))
}

fn os_error(e: windows::core::Error) -> TtyError {
    TtyError::Os(io::Error::from_raw_os_error(e.code().0))
}

fn get_mode(fd: RawFd) -> Result<CONSOLE_MODE> {
    let handle = console_handle(fd)?;
    let mut mode = CONSOLE_MODE(0);
    unsafe { GetConsoleMode(handle, &mut mode) }.map_err(|_| TtyError::NotATerminal(fd))?;
    Ok(mode)
}

fn set_console_mode(fd: RawFd, mode: u32) -> Result<()> {
    let handle = console_handle(fd)?;
    unsafe { SetConsoleMode(handle, CONSOLE_MODE(mode)) }.map_err(os_error)
}

impl TtyDriver for ConsoleDriver {
    fn init(&self, fd: RawFd, _readable: bool) -> Result<()> {
        get_mode(fd).map(|_| ())
    }

    fn set_mode(&self, fd: RawFd, readable: bool, mode: TtyMode) -> Result<()> {
        input_handle_id(fd, readable)?;
        let current = get_mode(fd)?.0;
        let mut saved = SAVED_MODE.lock().unwrap_or_else(PoisonError::into_inner);

        let line_flags = ENABLE_ECHO_INPUT.0 | ENABLE_LINE_INPUT.0 | ENABLE_PROCESSED_INPUT.0;
        let next = match mode {
            TtyMode::Normal => match *saved {
                Some((saved_fd, orig)) if saved_fd == fd => orig,
                _ => (current & !ENABLE_WINDOW_INPUT.0) | line_flags,
            },
            TtyMode::Raw => (current & !line_flags) | ENABLE_WINDOW_INPUT.0,
            TtyMode::Io => return Err(TtyError::Unsupported("io mode on windows console")),
        };

        if mode != TtyMode::Normal && saved.is_none() {
            debug!("Saving original console mode of fd {}: 0x{:08X}", fd, current);
            *saved = Some((fd, current));
        }

        set_console_mode(fd, next)
    }

    fn reset_mode(&self) -> Result<()> {
        let saved = match SAVED_MODE.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return Err(TtyError::Busy),
        };

        match *saved {
            Some((fd, orig)) => set_console_mode(fd, orig),
            None => Ok(()),
        }
    }

    fn winsize(&self, fd: RawFd) -> Result<WinSize> {
        let handle = console_handle(fd)?;
        let mut info = CONSOLE_SCREEN_BUFFER_INFO::default();
        unsafe { GetConsoleScreenBufferInfo(handle, &mut info) }.map_err(os_error)?;
        let window = info.srWindow;
        Ok(WinSize::new(
            i32::from(window.Right) - i32::from(window.Left) + 1,
            i32::from(window.Bottom) - i32::from(window.Top) + 1,
        ))
    }

    fn set_vterm_state(&self, state: VTermState) {
        let Ok(current) = get_mode(1) else {
            return;
        };
        let next = match state {
            VTermState::Supported => current.0 | ENABLE_VIRTUAL_TERMINAL_PROCESSING.0,
            VTermState::Unsupported => current.0 & !ENABLE_VIRTUAL_TERMINAL_PROCESSING.0,
        };
        if let Err(e) = set_console_mode(1, next) {
            debug!("Failed to set vterm state {}: {}", state, e);
        }
    }

    fn vterm_state(&self) -> Result<VTermState> {
        let mode = get_mode(1)?;
        if mode.0 & ENABLE_VIRTUAL_TERMINAL_PROCESSING.0 != 0 {
            Ok(VTermState::Supported)
        } else {
            Ok(VTermState::Unsupported)
        }
    }
}
