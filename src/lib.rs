//! ttyctl - console stream handles for an event-driven I/O runtime
//!
//! A [`TtyHandle`](tty::TtyHandle) binds a file descriptor to the terminal
//! driver and exposes the terminal-control surface on top of it:
//!
//! - **Mode switching**: normal (cooked), raw, and raw I/O channel modes
//! - **Window size**: query the terminal geometry in character cells
//! - **VTerm state**: toggle virtual-terminal escape processing where the
//!   platform has the concept
//!
//! Any mode change made through a handle is reverted exactly once, when the
//! last live handle goes away. See [`tty::ResetGuard`].
//!
//! ```no_run
//! use ttyctl::tty::{TtyHandle, TtyMode};
//!
//! let mut stdin = TtyHandle::new(0, true);
//! stdin.init()?;
//! stdin.set_mode(TtyMode::Raw)?;
//! let size = stdin.winsize();
//! println!("{}x{}", size.width, size.height);
//! // Dropping the last handle restores the original terminal mode.
//! drop(stdin);
//! # Ok::<(), ttyctl::tty::TtyError>(())
//! ```

pub mod config;
pub mod tty;
