//! Value types shared by handles and drivers.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// File descriptor number as seen by the C runtime.
///
/// `0`, `1` and `2` are conventionally stdin, stdout and stderr.
pub type RawFd = i32;

/// Terminal window dimensions in character cells.
///
/// Either both fields are valid (`>= 0`) or both are `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WinSize {
    pub width: i32,
    pub height: i32,
}

impl WinSize {
    /// Returned when the window size cannot be queried.
    pub const ERROR: WinSize = WinSize { width: -1, height: -1 };

    /// Build a size from driver-reported dimensions.
    ///
    /// Negative input on either axis collapses to [`WinSize::ERROR`].
    pub fn new(width: i32, height: i32) -> Self {
        if width < 0 || height < 0 {
            Self::ERROR
        } else {
            Self { width, height }
        }
    }

    pub fn is_error(&self) -> bool {
        *self == Self::ERROR
    }
}

impl Default for WinSize {
    fn default() -> Self {
        Self::ERROR
    }
}

impl fmt::Display for WinSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Terminal input/output processing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtyMode {
    /// Line-buffered, echoing input (cooked mode)
    #[serde(alias = "cooked")]
    Normal,
    /// Unbuffered, unechoed, one character at a time
    Raw,
    /// Raw mode with the device used as a plain I/O channel.
    /// Signal-generating keys are delivered as bytes.
    Io,
}

impl TtyMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "cooked" => Some(Self::Normal),
            "raw" => Some(Self::Raw),
            "io" => Some(Self::Io),
            _ => None,
        }
    }
}

impl fmt::Display for TtyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Normal => "normal",
            Self::Raw => "raw",
            Self::Io => "io",
        };
        f.write_str(name)
    }
}

/// Whether virtual-terminal escape sequences are handled by the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VTermState {
    Supported,
    Unsupported,
}

impl fmt::Display for VTermState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Supported => f.write_str("supported"),
            Self::Unsupported => f.write_str("unsupported"),
        }
    }
}

bitflags! {
    /// Stream direction a handle was created for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StreamFlags: u8 {
        const READABLE = 0b0000_0001;
        const WRITABLE = 0b0000_0010;
    }
}

impl StreamFlags {
    /// Console streams are one-directional: readable handles read, the rest write.
    pub fn for_readable(readable: bool) -> Self {
        if readable {
            Self::READABLE
        } else {
            Self::WRITABLE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winsize_never_partially_sentinel() {
        assert_eq!(WinSize::new(80, 24), WinSize { width: 80, height: 24 });
        assert_eq!(WinSize::new(-1, 24), WinSize::ERROR);
        assert_eq!(WinSize::new(80, -5), WinSize::ERROR);
        assert!(WinSize::new(0, 0).width == 0 && !WinSize::new(0, 0).is_error());
        assert!(WinSize::default().is_error());
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(TtyMode::parse("RAW"), Some(TtyMode::Raw));
        assert_eq!(TtyMode::parse("cooked"), Some(TtyMode::Normal));
        assert_eq!(TtyMode::parse("io"), Some(TtyMode::Io));
        assert_eq!(TtyMode::parse("weird"), None);
        assert_eq!(TtyMode::Io.to_string(), "io");
    }

    #[test]
    fn test_stream_flags() {
        assert_eq!(StreamFlags::for_readable(true), StreamFlags::READABLE);
        assert_eq!(StreamFlags::for_readable(false), StreamFlags::WRITABLE);
    }
}
