//! Text console: `#`-commands and plain text driving the controller through
//! [`DisplayInterface`].

use std::io::Write;

use charlcd_core::{Controller, DisplayInterface, Position, Size};

use crate::panel;

/// What the caller should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub const BANNER: &str = "LCD emulator console. Commands start with #, i.e. \"#help\"";

pub struct Console {
    size: Size,
    /// Bus width negotiated by the last #init
    four_bit: bool,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(Size::default())
    }
}

impl Console {
    pub fn new(size: Size) -> Self {
        Console { size, four_bit: false }
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Run one input line. Problems with the input are reported on `out`;
    /// only a failing writer is returned as an error.
    pub fn execute(&mut self, lcd: &mut Controller, input: &str, out: &mut dyn Write) -> std::io::Result<Flow> {
        match self.dispatch(lcd, input, out) {
            Ok(flow) => Ok(flow),
            Err(msg) => {
                writeln!(out, "{}", msg)?;
                Ok(Flow::Continue)
            }
        }
    }

    fn dispatch(&mut self, lcd: &mut Controller, input: &str, out: &mut dyn Write) -> Result<Flow, String> {
        if input.is_empty() {
            return Err("You must enter either a command or text to write to the screen.".into());
        }
        if !input.starts_with('#') {
            let size = self.size;
            self.interface(lcd, |lcd| lcd.write(size, input))?;
            return Ok(Flow::Continue);
        }

        let mut words = input.split_whitespace();
        let command = words.next().unwrap_or_default();
        let args: Vec<&str> = words.collect();
        let size = self.size;

        match command {
            "#exit" => {
                expect_args(command, &args, 0)?;
                return Ok(Flow::Exit);
            }
            "#help" => {
                expect_args(command, &args, 0)?;
                write_out(out, &self.help())?;
            }
            "#set_size" => {
                expect_args(command, &args, 2)?;
                let lines: u8 = args[0].parse().map_err(|_| {
                    format!("The first argument to the #set_size command must be between 1 and {}.", Size::MAX_LINES)
                })?;
                let cols: u8 = args[1].parse().map_err(|_| {
                    format!("The second argument to the #set_size command must be between 1 and {}.", Size::MAX_COLS)
                })?;
                if !(1..=Size::MAX_LINES).contains(&lines) {
                    return Err(format!(
                        "The first argument to the #set_size command must be between 1 and {}.",
                        Size::MAX_LINES
                    ));
                }
                if !(1..=Size::MAX_COLS).contains(&cols) {
                    return Err(format!(
                        "The second argument to the #set_size command must be between 1 and {}.",
                        Size::MAX_COLS
                    ));
                }
                self.size = Size::new(cols, lines).map_err(|_| {
                    format!("The size of the screen cannot be greater than {} characters.", Size::MAX_CHARACTERS)
                })?;
            }
            "#init" => {
                if args.len() != 2 && args.len() != 3 {
                    return Err("The #init command requires two arguments.".into());
                }
                let two_line = match args[0] {
                    "1" => false,
                    "2" => true,
                    _ => return Err("The first argument to the #init command must be 1 or 2.".into()),
                };
                let extended = match args[1] {
                    "8" => false,
                    "11" => true,
                    _ => return Err("The second argument to the #init command must be 8 or 11.".into()),
                };
                let four_bit = match args.get(2).copied() {
                    None | Some("8") => false,
                    Some("4") => true,
                    Some(_) => return Err("The optional bus width for the #init command must be 4 or 8.".into()),
                };
                self.interface(lcd, |lcd| {
                    if four_bit {
                        lcd.initialise_four_bit(two_line, extended)
                    } else {
                        lcd.initialise(two_line, extended)
                    }
                })?;
            }
            "#set" => {
                expect_args(command, &args, 3)?;
                let display = parse_flag(command, "first", args[0])?;
                let cursor = parse_flag(command, "second", args[1])?;
                let blink = parse_flag(command, "third", args[2])?;
                self.interface(lcd, |lcd| lcd.display_set(display, cursor, blink))?;
            }
            "#clear" => {
                expect_args(command, &args, 0)?;
                self.interface(lcd, |lcd| lcd.clear())?;
            }
            "#home" => {
                expect_args(command, &args, 0)?;
                self.interface(lcd, |lcd| lcd.home())?;
            }
            "#scroll" => {
                expect_args(command, &args, 2)?;
                let screen = match args[0] {
                    "c" => false,
                    "s" => true,
                    _ => return Err("The first argument to the #scroll command must be c or s.".into()),
                };
                let right = match args[1] {
                    "l" => false,
                    "r" => true,
                    _ => return Err("The second argument to the #scroll command must be l or r.".into()),
                };
                self.interface(lcd, |lcd| lcd.scroll(screen, right))?;
            }
            "#backlight" => {
                expect_args(command, &args, 1)?;
                let on = parse_flag(command, "first", args[0])?;
                lcd.set_backlight(on);
            }
            "#power" => {
                expect_args(command, &args, 1)?;
                let on = parse_flag(command, "first", args[0])?;
                lcd.set_power(on).map_err(|e| e.to_string())?;
                if on {
                    self.four_bit = false;
                }
            }
            "#def_custom" => {
                if args.len() != 9 {
                    return Err("The #def_custom command requires nine arguments.".into());
                }
                let index = parse_custom_index(command, args[0])?;
                let mut rows = [0u8; 8];
                for (row, arg) in rows.iter_mut().zip(&args[1..]) {
                    if arg.len() != 5 {
                        return Err("Each binary argument to the #def_custom command must be five digits long.".into());
                    }
                    *row = u8::from_str_radix(arg, 2).map_err(|_| {
                        "Each binary digit to the #def_custom command must be either 0 or 1.".to_string()
                    })?;
                }
                self.interface(lcd, |lcd| lcd.define_custom_char(index, &rows))?;
            }
            "#write_custom" => {
                expect_args(command, &args, 1)?;
                let index = parse_custom_index(command, args[0])?;
                let text = char::from(index + 1).to_string();
                self.interface(lcd, |lcd| lcd.write(size, &text))?;
            }
            "#read_custom" => {
                expect_args(command, &args, 1)?;
                let index = parse_custom_index(command, args[0])?;
                let rows = self.interface(lcd, |lcd| lcd.custom_char(index))?;
                let line: Vec<String> = rows.iter().map(|r| format!("{:05b}", r)).collect();
                write_out(out, &line.join(" "))?;
            }
            "#newline" => {
                expect_args(command, &args, 0)?;
                self.interface(lcd, |lcd| lcd.write(size, "\n"))?;
            }
            "#setpos" => {
                expect_args(command, &args, 2)?;
                let line = args[0]
                    .parse::<u8>()
                    .ok()
                    .filter(|l| (1..=size.lines()).contains(l))
                    .ok_or_else(|| {
                        format!("The first argument to the #setpos command must be between 1 and {}.", size.lines())
                    })?;
                let offset = args[1]
                    .parse::<u8>()
                    .ok()
                    .filter(|&o| o < size.cols())
                    .ok_or_else(|| {
                        format!("The second argument to the #setpos command must be between 0 and {}.", size.cols() - 1)
                    })?;
                self.interface(lcd, |lcd| lcd.set_cursor_position(size, Position::new(line - 1, offset)))?;
            }
            "#getpos" => {
                expect_args(command, &args, 0)?;
                let position = self.interface(lcd, |lcd| lcd.cursor_position(size))?;
                write_out(out, &format!("line: {}, offset: {}", position.line + 1, position.offset))?;
            }
            "#read" => {
                expect_args(command, &args, 0)?;
                let text = self.interface(lcd, |lcd| lcd.read(size))?;
                let printable: String =
                    text.chars().map(|c| if ('\x01'..='\x08').contains(&c) { '#' } else { c }).collect();
                write_out(out, &printable)?;
            }
            "#raw_tx" => {
                expect_args(command, &args, 2)?;
                let rs = parse_flag(command, "first", args[0])?;
                if args[1].len() != 8 {
                    return Err("The second argument to the #raw_tx command must be eight digits long.".into());
                }
                let data = u8::from_str_radix(args[1], 2)
                    .map_err(|_| "Each binary digit to the #raw_tx command must be either 0 or 1.".to_string())?;
                self.interface(lcd, |lcd| lcd.transmit(rs, data))?;
            }
            "#raw_rx" => {
                expect_args(command, &args, 1)?;
                let rs = parse_flag(command, "first", args[0])?;
                let data = self.interface(lcd, |lcd| lcd.receive(rs, true))?;
                write_out(out, &format!("{:08b} (0x{:02x}) ({})", data, data, data))?;
            }
            "#show" => {
                expect_args(command, &args, 0)?;
                out.write_all(panel::ascii_art(lcd, size).as_bytes()).map_err(|e| e.to_string())?;
            }
            _ => {
                return Err(format!(
                    "\"{}\" is not a recognised command. Run #help to see all available commands.",
                    command
                ))
            }
        }
        Ok(Flow::Continue)
    }

    /// Run `f` against a short-lived interface, carrying the bus width
    /// across calls.
    fn interface<T>(
        &mut self,
        lcd: &mut Controller,
        f: impl FnOnce(&mut DisplayInterface) -> charlcd_core::Result<T>,
    ) -> Result<T, String> {
        if !lcd.is_powered() {
            return Err("The display is powered off. Use #power 1 first.".into());
        }
        let mut iface = DisplayInterface::with_bus_width(lcd, self.four_bit);
        let result = f(&mut iface);
        self.four_bit = iface.is_four_bit();
        result.map_err(|e| format!("Error: {}", e))
    }

    fn help(&self) -> String {
        let (cols, lines) = (self.size.cols(), self.size.lines());
        format!(
            "{BANNER}\n\
             Write any text not prefixed with # to write it to the display\n\
             \n\
             List of commands:\n\
             \x20   #exit - Quit the console\n\
             \x20   #set_size [1-{max_lines}] [1-{max_cols}] - Set the number of lines and columns the display has\n\
             \x20   #init 1/2 8/11 [4/8] - Initialise in (1)/(2) line mode with 5x(8) or 5x(11) font, optionally over a 4-bit bus\n\
             \x20   #set 0/1 0/1 0/1 - Set whether the display, cursor, and blinking are on (1) or off (0)\n\
             \x20   #clear - Clear the screen of all characters and return the cursor to the start position\n\
             \x20   #home - Return the cursor to the start position\n\
             \x20   #scroll c/s l/r - Scroll the (c)ursor/(s)creen (l)eft/(r)ight\n\
             \x20   #backlight 0/1 - Set the screen backlight on (1) or off (0)\n\
             \x20   #power 0/1 - Switch the module's supply off (0) or on (1)\n\
             \x20   #def_custom [0-7] <char> - Define a custom character at index 0-7\n\
             \x20       <char> is 8, 5-bit binary numbers separated by spaces\n\
             \x20   #write_custom [0-7] - Write the custom character at index 0-7\n\
             \x20   #read_custom [0-7] - Get the pixel data of the custom character at index 0-7\n\
             \x20   #newline - Move the cursor to the start of the next line\n\
             \x20   #setpos [1-{lines}] [0-{last_col}] - Set the cursor to a 1-based line and 0-based offset\n\
             \x20   #getpos - Get the position of the cursor\n\
             \x20   #read - Read the text currently on the screen\n\
             \x20   #show - Draw the dot matrix as text\n\
             \x20   #raw_tx 0/1 <data> - (ADVANCED) Transmit raw data with RS off (0) or on (1)\n\
             \x20       <data> is an 8-bit binary number, going from D7-D0\n\
             \x20   #raw_rx 0/1 - (ADVANCED) Receive raw data with RS off (0) or on (1)",
            max_lines = Size::MAX_LINES,
            max_cols = Size::MAX_COLS,
            last_col = cols.saturating_sub(1),
        )
    }
}

fn write_out(out: &mut dyn Write, text: &str) -> Result<(), String> {
    writeln!(out, "{}", text).map_err(|e| e.to_string())
}

fn expect_args(command: &str, args: &[&str], count: usize) -> Result<(), String> {
    if args.len() == count {
        return Ok(());
    }
    Err(match count {
        0 => format!("The {} command takes no arguments.", command),
        1 => format!("The {} command requires one argument.", command),
        2 => format!("The {} command requires two arguments.", command),
        3 => format!("The {} command requires three arguments.", command),
        n => format!("The {} command requires {} arguments.", command, n),
    })
}

fn parse_flag(command: &str, ordinal: &str, arg: &str) -> Result<bool, String> {
    match arg {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err(format!("The {} argument to the {} command must be 0 or 1.", ordinal, command)),
    }
}

fn parse_custom_index(command: &str, arg: &str) -> Result<u8, String> {
    if arg.len() != 1 {
        return Err(format!("The first argument to the {} command must be a single digit.", command));
    }
    arg.parse::<u8>()
        .ok()
        .filter(|&i| i <= 7)
        .ok_or_else(|| format!("The first argument to the {} command must be between 0 and 7.", command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use charlcd_core::{BlinkClock, FontRom};

    fn run(console: &mut Console, lcd: &mut Controller, input: &str) -> String {
        let mut out = Vec::new();
        console.execute(lcd, input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn setup() -> (Console, Controller) {
        let mut lcd = Controller::with_blink(FontRom::a00(), BlinkClock::manual());
        lcd.set_power(true).unwrap();
        (Console::default(), lcd)
    }

    #[test]
    fn test_write_and_read_back() {
        let (mut console, mut lcd) = setup();
        run(&mut console, &mut lcd, "#init 2 8");
        run(&mut console, &mut lcd, "Hello");
        assert_eq!(run(&mut console, &mut lcd, "#getpos"), "line: 1, offset: 5\n");
        run(&mut console, &mut lcd, "#newline");
        run(&mut console, &mut lcd, "#def_custom 0 11111 10001 10001 10001 10001 10001 11111 00000");
        run(&mut console, &mut lcd, "#write_custom 0");
        assert_eq!(
            run(&mut console, &mut lcd, "#read"),
            "Hello           \n#               \n\n"
        );
        assert_eq!(
            run(&mut console, &mut lcd, "#read_custom 0"),
            "11111 10001 10001 10001 10001 10001 11111 00000\n"
        );
    }

    #[test]
    fn test_four_bit_init_is_remembered() {
        let (mut console, mut lcd) = setup();
        run(&mut console, &mut lcd, "#init 2 8 4");
        assert!(lcd.is_four_bit());
        run(&mut console, &mut lcd, "#setpos 2 3");
        assert_eq!(run(&mut console, &mut lcd, "#getpos"), "line: 2, offset: 3\n");
        assert_eq!(lcd.address_counter(), 0x43);
    }

    #[test]
    fn test_raw_cycles() {
        let (mut console, mut lcd) = setup();
        run(&mut console, &mut lcd, "#raw_tx 0 00111000");
        run(&mut console, &mut lcd, "#raw_tx 0 11000101");
        assert_eq!(run(&mut console, &mut lcd, "#raw_rx 0"), "01000101 (0x45) (69)\n");
        run(&mut console, &mut lcd, "#raw_tx 1 01000001");
        assert_eq!(lcd.ddram().read(0x45, true).unwrap(), b'A');
    }

    #[test]
    fn test_argument_errors() {
        let (mut console, mut lcd) = setup();
        assert_eq!(
            run(&mut console, &mut lcd, "#set_size 3 40"),
            "The size of the screen cannot be greater than 80 characters.\n"
        );
        assert_eq!(
            run(&mut console, &mut lcd, "#scroll x r"),
            "The first argument to the #scroll command must be c or s.\n"
        );
        assert_eq!(run(&mut console, &mut lcd, "#clear now"), "The #clear command takes no arguments.\n");
        assert!(run(&mut console, &mut lcd, "#bogus").contains("not a recognised command"));
        assert!(run(&mut console, &mut lcd, "").starts_with("You must enter"));
        assert_eq!(console.size(), Size::default());
    }

    #[test]
    fn test_power_and_exit() {
        let (mut console, mut lcd) = setup();
        run(&mut console, &mut lcd, "#power 0");
        assert!(!lcd.is_powered());
        assert!(run(&mut console, &mut lcd, "hi").contains("powered off"));
        run(&mut console, &mut lcd, "#power 1");
        assert!(lcd.is_powered());
        let mut sink = Vec::new();
        assert_eq!(console.execute(&mut lcd, "#exit", &mut sink).unwrap(), Flow::Exit);
    }

    #[test]
    fn test_show_and_help() {
        let (mut console, mut lcd) = setup();
        run(&mut console, &mut lcd, "#set_size 4 20");
        assert_eq!(console.size(), Size::new(20, 4).unwrap());
        let art = run(&mut console, &mut lcd, "#show");
        assert!(art.starts_with("  (0 dots lit)"));
        assert!(run(&mut console, &mut lcd, "#help").contains("#setpos [1-4] [0-19]"));
    }
}
