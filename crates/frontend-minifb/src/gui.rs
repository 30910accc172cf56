//! minifb window: the dot-matrix panel plus a pin status strip.
//!
//! Keys drive the pins directly:
//! `R`/`W` toggle RS and R/W, `0`–`7` toggle D0–D7, `E`/`Space` toggle
//! enable, `P` power, `B` backlight, `S` screenshot, `U` rewind, `Esc` quit.
//! `[` and `]` stage the previous or next character code on the data bus,
//! walking the font table.
//!
//! A console thread reading stdin may drive the same controller; both sides
//! share it through `Arc<Mutex<_>>`.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use charlcd_core::instruction::describe_bus;
use charlcd_core::{
    Controller, FontRom, PinState, RewindBuffer, Size, BLANK_CHARACTER, CGRAM_CHARACTER_CODE_END,
    EXTENDED_GLYPH_HEIGHT, GLYPH_HEIGHT, GLYPH_WIDTH,
};
use log::{debug, info};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use crate::console::{Console, Flow, BANNER};
use crate::panel::{self, CELL_PITCH};

const TITLE: &str = "HD44780 LCD Emulator";

/// Margin around the panel, in window pixels
const MARGIN: usize = 12;
/// Pixel size of one status-strip text dot
const STATUS_SCALE: usize = 2;
/// Character cells per pin indicator slot
const SLOT_CELLS: usize = 4;
const REWIND_CAPACITY: usize = 256;

const FRAME_COLOR: u32 = 0x00_20_20_20;
const BACKLIT_PANEL: u32 = 0x00_9C_C2_3C;
const BACKLIT_DOT: u32 = 0x00_1C_2A_12;
const BACKLIT_UNLIT_DOT: u32 = 0x00_8E_B3_37;
const DARK_PANEL: u32 = 0x00_3A_44_2C;
const DARK_DOT: u32 = 0x00_0E_14_0A;
const DARK_UNLIT_DOT: u32 = 0x00_35_3F_28;
const TEXT_COLOR: u32 = 0x00_E0_E0_E0;
const PIN_ON: u32 = 0x00_40_D0_40;
const PIN_OFF: u32 = 0x00_50_50_50;

pub fn lock(lcd: &Mutex<Controller>) -> MutexGuard<'_, Controller> {
    lcd.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Next selectable character code after `current`: CGRAM codes, the blank
/// and every code the ROM draws something for.
fn step_code(font: &FontRom, current: u8, forward: bool) -> u8 {
    let mut code = current;
    loop {
        code = if forward { code.wrapping_add(1) } else { code.wrapping_sub(1) };
        let selectable = code < CGRAM_CHARACTER_CODE_END
            || code == BLANK_CHARACTER
            || font.glyph(code).iter().any(|&row| row != 0);
        if selectable || code == current {
            return code;
        }
    }
}

// ─── Layout ─────────────────────────────────────────────────────────────────

struct Layout {
    width: usize,
    height: usize,
    scale: usize,
    panel_top: usize,
    status_top: usize,
}

impl Layout {
    fn new(size: Size, scale: usize) -> Self {
        let dots_wide = size.cols() as usize * CELL_PITCH - 1;
        // tall enough for 5x10 glyphs
        let dots_high = size.lines() as usize * (EXTENDED_GLYPH_HEIGHT + 1) - 1;
        let panel_w = dots_wide * scale;
        let panel_h = dots_high * scale;
        let status_w = pin_labels().len() * SLOT_CELLS * CELL_PITCH * STATUS_SCALE;
        // label row, indicator row, description row
        let status_h = (GLYPH_HEIGHT * 3 + 4) * STATUS_SCALE;
        Layout {
            width: panel_w.max(status_w) + 2 * MARGIN,
            height: MARGIN + panel_h + MARGIN + status_h + MARGIN,
            scale,
            panel_top: MARGIN,
            status_top: MARGIN + panel_h + MARGIN,
        }
    }
}

fn pin_labels() -> [&'static str; 14] {
    ["RS", "RW", "E", "D7", "D6", "D5", "D4", "D3", "D2", "D1", "D0", "PWR", "BL", "BSY"]
}

fn pin_levels(pins: &PinState) -> [bool; 14] {
    let bit = |n: u8| pins.data_bus & (1 << n) != 0;
    [
        pins.register_select,
        pins.read_write,
        pins.enable,
        bit(7), bit(6), bit(5), bit(4), bit(3), bit(2), bit(1), bit(0),
        pins.power,
        pins.backlight,
        pins.busy,
    ]
}

// ─── Drawing ────────────────────────────────────────────────────────────────

fn fill_rect(buf: &mut [u32], stride: usize, x: usize, y: usize, w: usize, h: usize, color: u32) {
    for row in y..y + h {
        let start = row * stride + x;
        if let Some(line) = buf.get_mut(start..start + w) {
            line.fill(color);
        }
    }
}

/// Draw ASCII text with the controller's own character ROM.
fn draw_text(buf: &mut [u32], stride: usize, font: &FontRom, x: usize, y: usize, text: &str, color: u32) {
    for (i, byte) in text.bytes().enumerate() {
        let glyph = font.glyph(byte);
        let left = x + i * CELL_PITCH * STATUS_SCALE;
        for (gy, row) in glyph.iter().take(GLYPH_HEIGHT).enumerate() {
            for gx in 0..GLYPH_WIDTH {
                if row & (0x10 >> gx) != 0 {
                    fill_rect(
                        buf,
                        stride,
                        left + gx * STATUS_SCALE,
                        y + gy * STATUS_SCALE,
                        STATUS_SCALE,
                        STATUS_SCALE,
                        color,
                    );
                }
            }
        }
    }
}

fn draw(buf: &mut [u32], layout: &Layout, lcd: &Controller, size: Size) {
    buf.fill(FRAME_COLOR);
    let stride = layout.width;
    let (panel, dot, unlit) = if lcd.backlight() {
        (BACKLIT_PANEL, BACKLIT_DOT, BACKLIT_UNLIT_DOT)
    } else {
        (DARK_PANEL, DARK_DOT, DARK_UNLIT_DOT)
    };

    let rows = panel::dot_rows(lcd, size);
    let panel_w = rows.first().map_or(0, Vec::len) * layout.scale;
    let panel_h = (size.lines() as usize * (EXTENDED_GLYPH_HEIGHT + 1) - 1) * layout.scale;
    fill_rect(buf, stride, MARGIN, layout.panel_top, panel_w, panel_h, panel);
    for (y, row) in rows.iter().enumerate() {
        for (x, &lit) in row.iter().enumerate() {
            // gutter columns carry no dot
            if x % CELL_PITCH == GLYPH_WIDTH {
                continue;
            }
            let color = if lit { dot } else { unlit };
            // leave a one-pixel seam between dots at larger scales
            let px = layout.scale.saturating_sub(1).max(1);
            fill_rect(
                buf,
                stride,
                MARGIN + x * layout.scale,
                layout.panel_top + y * layout.scale,
                px,
                px,
                color,
            );
        }
    }

    let pins = lcd.pins();
    let font = lcd.font();
    let slot = SLOT_CELLS * CELL_PITCH * STATUS_SCALE;
    let label_y = layout.status_top;
    let box_y = label_y + (GLYPH_HEIGHT + 1) * STATUS_SCALE;
    for (i, (label, level)) in pin_labels().iter().zip(pin_levels(&pins)).enumerate() {
        let x = MARGIN + i * slot;
        draw_text(buf, stride, font, x, label_y, label, TEXT_COLOR);
        let color = if level { PIN_ON } else { PIN_OFF };
        fill_rect(buf, stride, x, box_y, GLYPH_WIDTH * 2 * STATUS_SCALE, GLYPH_HEIGHT * STATUS_SCALE, color);
    }
    let text_y = box_y + (GLYPH_HEIGHT + 3) * STATUS_SCALE;
    let description = describe_bus(pins.register_select, pins.read_write, pins.data_bus);
    draw_text(buf, stride, font, MARGIN, text_y, description, TEXT_COLOR);
}

// ─── Console thread ─────────────────────────────────────────────────────────

fn spawn_console(lcd: Arc<Mutex<Controller>>, mut console: Console, quit: Arc<AtomicBool>) {
    thread::spawn(move || {
        println!("{}", BANNER);
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let mut out = Vec::new();
            let flow = {
                let mut guard = lock(&lcd);
                console.execute(&mut guard, line.trim_end(), &mut out)
            };
            let _ = std::io::stdout().write_all(&out);
            match flow {
                Ok(Flow::Exit) => {
                    quit.store(true, Ordering::Relaxed);
                    break;
                }
                Ok(Flow::Continue) => {}
                Err(e) => {
                    eprintln!("Warning: console output: {}", e);
                    break;
                }
            }
        }
    });
}

// ─── Main loop ──────────────────────────────────────────────────────────────

/// Run the window until it is closed, Esc is pressed or the console exits.
/// With a `console`, stdin commands drive the same controller.
pub fn run_gui(lcd: Arc<Mutex<Controller>>, size: Size, scale: usize, console: Option<Console>) -> Result<(), String> {
    let layout = Layout::new(size, scale);
    let mut window = Window::new(TITLE, layout.width, layout.height, WindowOptions::default())
        .map_err(|e| format!("failed to create window: {}", e))?;
    window.set_target_fps(60);

    let quit = Arc::new(AtomicBool::new(false));
    if let Some(console) = console {
        spawn_console(Arc::clone(&lcd), console, Arc::clone(&quit));
    }

    let mut buf = vec![0u32; layout.width * layout.height];
    let mut rewind = RewindBuffer::new(REWIND_CAPACITY);
    let mut screenshot_n = 0u32;
    let mut last_title = String::new();

    while window.is_open() && !window.is_key_down(Key::Escape) && !quit.load(Ordering::Relaxed) {
        let pressed = |key: Key| window.is_key_pressed(key, KeyRepeat::No);
        let data_keys = [Key::Key0, Key::Key1, Key::Key2, Key::Key3, Key::Key4, Key::Key5, Key::Key6, Key::Key7];
        let toggled_bit = data_keys.iter().position(|&k| pressed(k));
        let toggle_rs = pressed(Key::R);
        let toggle_rw = pressed(Key::W);
        let toggle_e = pressed(Key::E) || pressed(Key::Space);
        let toggle_power = pressed(Key::P);
        let toggle_backlight = pressed(Key::B);
        let screenshot = pressed(Key::S);
        let undo = pressed(Key::U);
        let next_code = pressed(Key::RightBracket);
        let previous_code = pressed(Key::LeftBracket);

        {
            let mut lcd = lock(&lcd);
            let pins = lcd.pins();
            let changes_state = toggle_e || toggle_power;
            if changes_state {
                if let Err(e) = rewind.push(&lcd.snapshot()) {
                    eprintln!("Warning: rewind snapshot: {}", e);
                }
            }
            if toggle_rs {
                lcd.set_register_select(!pins.register_select);
            }
            if toggle_rw {
                lcd.set_read_write(!pins.read_write);
            }
            if let Some(bit) = toggled_bit {
                lcd.set_data_bit(bit as u8, pins.data_bus & (1 << bit) == 0);
            }
            if toggle_backlight {
                lcd.set_backlight(!pins.backlight);
            }
            if next_code != previous_code {
                let code = step_code(lcd.font(), pins.data_bus, next_code);
                lcd.set_data_bus(code);
            }
            if toggle_e {
                if let Err(e) = lcd.set_enable(!pins.enable) {
                    eprintln!("Warning: bus cycle: {}", e);
                }
            }
            if toggle_power {
                if let Err(e) = lcd.set_power(!pins.power) {
                    eprintln!("Warning: power: {}", e);
                }
            }
            if undo {
                match rewind.pop() {
                    Some(Ok(snap)) => {
                        if let Err(e) = lcd.restore(&snap) {
                            eprintln!("Warning: rewind: {}", e);
                        }
                        debug!("rewound, {} snapshots left", rewind.len());
                    }
                    Some(Err(e)) => eprintln!("Warning: rewind: {}", e),
                    None => info!("nothing to rewind"),
                }
            }
            if screenshot {
                let path = PathBuf::from(format!("screenshot_{:04}.png", screenshot_n));
                match lcd.save_screenshot(&path, scale) {
                    Ok(()) => {
                        eprintln!("Screenshot: {}", path.display());
                        screenshot_n += 1;
                    }
                    Err(e) => eprintln!("Screenshot error: {}", e),
                }
            }

            // picks up the blink clock
            if let Err(e) = lcd.render() {
                eprintln!("Warning: render: {}", e);
            }
            draw(&mut buf, &layout, &lcd, size);

            let pins = lcd.pins();
            let title = format!(
                "{} - {}",
                TITLE,
                describe_bus(pins.register_select, pins.read_write, pins.data_bus)
            );
            if title != last_title {
                window.set_title(&title);
                last_title = title;
            }
        }

        if let Err(e) = window.update_with_buffer(&buf, layout.width, layout.height) {
            eprintln!("Warning: window update: {}", e);
            break;
        }
    }
    Ok(())
}
