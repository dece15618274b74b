//! ttyctl - inspect and drive the controlling terminal
//!
//! ```text
//! ttyctl size            # Print the window size of stdout
//! ttyctl info            # Describe stdin/stdout/stderr
//! ttyctl raw             # Echo key codes in raw mode until `q`
//! ttyctl raw --mode io   # Same, with signal keys delivered as bytes
//! ```
//!
//! Whatever mode `raw` leaves the terminal in is undone when its handles are
//! dropped.

use std::env;
use std::io::{self, Read, Write};

use anyhow::{anyhow, Context};
use crossterm::style::Stylize;
use crossterm::tty::IsTty;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ttyctl::config::Config;
use ttyctl::tty::{TtyHandle, TtyMode, VTermState};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

const CTRL_C: u8 = 0x03;

#[derive(Debug, PartialEq)]
enum Command {
    Size,
    Info,
    Raw { mode: Option<TtyMode> },
    Help,
    Version,
}

fn print_help() {
    eprintln!("ttyctl {} - terminal mode and geometry utility", VERSION);
    eprintln!();
    eprintln!("Usage: ttyctl <COMMAND> [OPTIONS]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  size                  Print stdout window size (WIDTHxHEIGHT)");
    eprintln!("  info                  Describe the standard descriptors");
    eprintln!("  raw                   Echo key codes until q or Ctrl+C");
    eprintln!();
    eprintln!("Options for raw:");
    eprintln!("  -m, --mode <MODE>     normal, raw or io (default: from config.toml)");
    eprintln!();
    eprintln!("Other options:");
    eprintln!("  -v, --version         Show version");
    eprintln!("  -h, --help            Show this help");
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut iter = args.iter();
    let command = match iter.next().map(String::as_str) {
        None | Some("-h") | Some("--help") => return Ok(Command::Help),
        Some("-v") | Some("--version") => return Ok(Command::Version),
        Some(cmd) => cmd,
    };

    match command {
        "size" => Ok(Command::Size),
        "info" => Ok(Command::Info),
        "raw" => {
            let mut mode = None;
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "-m" | "--mode" => {
                        let value = iter.next().ok_or("--mode requires a value")?;
                        mode = Some(
                            TtyMode::parse(value)
                                .ok_or_else(|| format!("Unknown mode: {}", value))?,
                        );
                    }
                    other => return Err(format!("Unknown option: {}", other)),
                }
            }
            Ok(Command::Raw { mode })
        }
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn init_logging(config: &Config) {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_new(&config.log_level)
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let config = Config::load();
    init_logging(&config);
    info!("ttyctl {} starting: {:?}", VERSION, command);

    match command {
        Command::Help => print_help(),
        Command::Version => eprintln!("ttyctl {}", VERSION),
        Command::Size => run_size(),
        Command::Info => run_info(),
        Command::Raw { mode } => run_raw(mode.unwrap_or(config.mode), config.vterm)?,
    }

    Ok(())
}

fn run_size() {
    let mut stdout = TtyHandle::new(1, false);
    if let Err(e) = stdout.init() {
        warn!("stdout is not a terminal: {}", e);
    }
    println!("{}", stdout.winsize());
}

fn run_info() {
    let names = ["stdin", "stdout", "stderr"];
    let ttys = [io::stdin().is_tty(), io::stdout().is_tty(), io::stderr().is_tty()];

    for (fd, (name, is_tty)) in names.iter().zip(ttys).enumerate() {
        let mut handle = TtyHandle::new(fd as i32, fd == 0);
        let status = match handle.init() {
            Ok(()) => "tty".green(),
            Err(_) if is_tty => "tty (driver refused)".yellow(),
            Err(_) => "not a tty".red(),
        };
        let vterm = match handle.vterm_state() {
            Ok(state) => state.to_string(),
            Err(_) => "unsupported".to_string(),
        };
        println!(
            "{} {:<6} {:<22} size={} vterm={}",
            fd,
            name,
            status,
            handle.winsize(),
            vterm
        );
    }
}

fn run_raw(mode: TtyMode, vterm: bool) -> anyhow::Result<()> {
    let mut stdin = TtyHandle::new(0, true);
    stdin.init().context("stdin is not a terminal")?;

    let stdout = TtyHandle::new(1, false);
    if vterm {
        stdout.set_vterm_state(VTermState::Supported);
    }

    stdin
        .set_mode(mode)
        .map_err(|e| anyhow!("Failed to enter {} mode: {}", mode, e))?;
    info!("Entered {} mode, window {}", mode, stdin.winsize());

    let mut out = io::stdout();
    write!(out, "{} mode, press {} to quit\r\n", mode, "q".bold())?;
    out.flush()?;

    let mut input = io::stdin().lock();
    let mut byte = [0u8; 1];
    loop {
        if input.read(&mut byte)? == 0 {
            break;
        }
        let b = byte[0];
        if b == b'q' || b == CTRL_C {
            break;
        }
        let shown = if b.is_ascii_graphic() {
            format!("{:?}", b as char)
        } else {
            "-".to_string()
        };
        write!(out, "{:>3} 0x{:02X} {}\r\n", b, b, shown)?;
        out.flush()?;
    }

    // Dropping the last handles releases the reset guard
    Ok(())
}
