//! HD44780 character LCD emulator frontend.
//!
//! Provides three execution modes:
//!
//! - **GUI mode** (default): minifb window with the dot-matrix panel and a
//!   pin status strip; pins are toggled from the keyboard while a console
//!   on stdin drives the same controller.
//! - **Console mode** (`--mode console`): the `#`-command console alone,
//!   with `#show` for a text rendering of the panel.
//! - **Headless mode** (`--mode headless`): run a command script, print the
//!   panel as half-block art and optionally save a PNG screenshot.

mod console;
mod gui;
mod panel;

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use charlcd_core::{BlinkClock, Controller, FontRom, Size};
use clap::{Parser, ValueEnum};
use log::{LevelFilter, Metadata, Record};

use console::{Console, Flow, BANNER};

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Gui,
    Console,
    Headless,
}

#[derive(Parser, Debug)]
#[command(name = "charlcd-emu", version, about = "Pin-level HD44780 character LCD emulator")]
struct Args {
    /// Frontend to run
    #[arg(long, value_enum, default_value_t = Mode::Gui)]
    mode: Mode,

    /// Visible geometry as <cols>x<lines> (at most 40 columns, 4 lines, 80 characters)
    #[arg(long, default_value = "16x2", value_parser = parse_size)]
    size: Size,

    /// Window pixels per dot
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u8).range(1..=8))]
    scale: u8,

    /// File of console commands to run before handing over (headless: the whole run)
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Headless: write a PNG of the final render grids
    #[arg(long, value_name = "FILE")]
    screenshot: Option<PathBuf>,

    /// Log mode changes and power transitions
    #[arg(long)]
    debug: bool,

    /// Log every bus cycle and instruction
    #[arg(long)]
    trace: bool,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (cols, lines) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected <cols>x<lines>, got \"{}\"", s))?;
    let cols: u8 = cols.trim().parse().map_err(|e| format!("columns: {}", e))?;
    let lines: u8 = lines.trim().parse().map_err(|e| format!("lines: {}", e))?;
    Size::new(cols, lines).map_err(|e| e.to_string())
}

// ─── Logging ────────────────────────────────────────────────────────────────

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(args: &Args) {
    let level = if args.trace {
        LevelFilter::Trace
    } else if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

// ─── Entry point ────────────────────────────────────────────────────────────

fn main() {
    let args = Args::parse();
    init_logging(&args);

    let result = match args.mode {
        Mode::Gui => {
            let mut lcd = Controller::new(FontRom::a00());
            power_up(&mut lcd);
            let mut console = Console::new(args.size);
            let ran = match &args.script {
                Some(path) => run_script(&mut console, &mut lcd, path),
                None => Ok(Flow::Continue),
            };
            match ran {
                Ok(Flow::Exit) => Ok(()),
                Ok(Flow::Continue) => {
                    let size = console.size();
                    gui::run_gui(Arc::new(Mutex::new(lcd)), size, args.scale as usize, Some(console))
                }
                Err(e) => Err(e),
            }
        }
        Mode::Console => run_console(&args),
        Mode::Headless => run_headless(&args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn power_up(lcd: &mut Controller) {
    if let Err(e) = lcd.set_power(true) {
        eprintln!("Warning: power on: {}", e);
    }
}

/// Feed every line of a command file to the console, echoing its output.
fn run_script(console: &mut Console, lcd: &mut Controller, path: &Path) -> Result<Flow, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for line in text.lines() {
        // blank lines and `//` comments are skipped in scripts
        if line.trim().is_empty() || line.trim_start().starts_with("//") {
            continue;
        }
        let flow = console.execute(lcd, line, &mut out).map_err(|e| e.to_string())?;
        if flow == Flow::Exit {
            return Ok(Flow::Exit);
        }
    }
    Ok(Flow::Continue)
}

// ─── Console Mode ───────────────────────────────────────────────────────────

fn run_console(args: &Args) -> Result<(), String> {
    let mut lcd = Controller::new(FontRom::a00());
    power_up(&mut lcd);
    let mut console = Console::new(args.size);
    if let Some(path) = &args.script {
        if run_script(&mut console, &mut lcd, path)? == Flow::Exit {
            return Ok(());
        }
    }

    println!("{}", BANNER);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    let mut input = String::new();
    loop {
        print!("> ");
        let _ = stdout.lock().flush();
        input.clear();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => return Err(format!("stdin: {}", e)),
        }
        let line = input.trim_end_matches(['\r', '\n']);
        let flow = console.execute(&mut lcd, line, &mut stdout.lock()).map_err(|e| e.to_string())?;
        if flow == Flow::Exit {
            break;
        }
    }
    Ok(())
}

// ─── Headless Mode ──────────────────────────────────────────────────────────

fn run_headless(args: &Args) -> Result<(), String> {
    // deterministic output: the cursor blink never fires
    let mut lcd = Controller::with_blink(FontRom::a00(), BlinkClock::manual());
    power_up(&mut lcd);
    let mut console = Console::new(args.size);
    if let Some(path) = &args.script {
        run_script(&mut console, &mut lcd, path)?;
    }

    println!("\n  === {}x{} panel ===", console.size().cols(), console.size().lines());
    print!("{}", panel::ascii_art(&lcd, console.size()));

    if let Some(path) = &args.screenshot {
        lcd.save_screenshot(path, args.scale as usize).map_err(|e| e.to_string())?;
        println!("Screenshot: {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("16x2").unwrap(), Size::new(16, 2).unwrap());
        assert_eq!(parse_size("20X4").unwrap(), Size::new(20, 4).unwrap());
        assert!(parse_size("40x4").is_err());
        assert!(parse_size("16").is_err());
        assert!(parse_size("ax2").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["charlcd-emu"]);
        assert_eq!(args.mode, Mode::Gui);
        assert_eq!(args.size, Size::default());
        assert_eq!(args.scale, 4);
        assert!(Args::try_parse_from(["charlcd-emu", "--scale", "9"]).is_err());
        let args = Args::parse_from(["charlcd-emu", "--mode", "headless", "--size", "20x4", "--trace"]);
        assert_eq!(args.mode, Mode::Headless);
        assert!(args.trace);
    }

    #[test]
    fn test_script_runs_commands() {
        let path = std::env::temp_dir().join(format!("charlcd-script-{}.txt", std::process::id()));
        fs::write(&path, "#init 2 8\n// comment\n\nAB\n#exit\nnot reached\n").unwrap();
        let mut lcd = Controller::with_blink(FontRom::a00(), BlinkClock::manual());
        lcd.set_power(true).unwrap();
        let mut console = Console::default();
        let flow = run_script(&mut console, &mut lcd, &path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(flow, Flow::Exit);
        assert_eq!(lcd.address_counter(), 2);
    }
}
