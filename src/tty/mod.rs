//! Console stream handles.
//!
//! This module contains the terminal-control core:
//!
//! - **types**: value types (`WinSize`, `TtyMode`, `VTermState`, `StreamFlags`)
//! - **driver**: platform backends talking to the OS terminal driver
//! - **reset**: the process-wide reset guard shared by all live handles
//! - **handle**: `TtyHandle`, the public console-stream object
//!
//! # Architecture
//!
//! ```text
//! TtyHandle (fd, flags)
//! ├── TtyDriver (termios / console API)
//! └── GuardLease ──► ResetGuard (one per process while any handle lives)
//!                    └── reset_mode() on drop of the last lease
//! ```

pub mod driver;
pub mod handle;
pub mod reset;
pub mod types;

pub use driver::{default_driver, Result, TtyDriver, TtyError};
pub use handle::TtyHandle;
pub use reset::{GuardRegistry, ResetGuard};
pub use types::{RawFd, StreamFlags, TtyMode, VTermState, WinSize};
