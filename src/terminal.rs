//! Terminal interpreter: turns parser actions into screen operations
//! and host responses.
//!
//! [`Term`] couples the ANSI parser with the interpreter. The
//! interpreter also owns the two small state machines that sit outside
//! the parser proper: the incremental UTF-8 assembler feeding
//! [`Screen::putch`], and the VT52 grammar used while DECANM is off.

use crate::charset::Charset;
use crate::color::{Color, Palette, Rgb};
use crate::parser::{Dispatch, Intermediates, Params, Parser};
use crate::screen::{
    Attrs, Blink, Direction, Frame, Intensity, LineSize, Modes, Screen, Underline, GL,
};

/// Primary device attributes: VT100 with Advanced Video and Graphics
/// options.
const DEVICE_ATTRS: &[u8] = b"\x1b[?1;7c";
/// VT52 identification reply.
const VT52_IDENT: &[u8] = b"\x1b/Z";

/// Effects addressed to the window layer, queued by the interpreter and
/// drained by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    SetTitle(String),
    SetIconName(String),
    Bell,
    /// The grid was recreated (DECCOLM); the window and pty should
    /// follow.
    Resize { width: usize, height: usize },
}

/// Incremental UTF-8 assembler for the parser's print actions.
#[derive(Clone, Copy, Debug, Default)]
struct Utf8Decoder {
    code_point: u32,
    remaining: u8,
}

impl Utf8Decoder {
    /// Feed one byte. Returns a completed scalar, U+FFFD for malformed
    /// input, or `None` while a sequence is pending.
    fn push(&mut self, byte: u8) -> Option<char> {
        if self.remaining == 0 {
            return match byte {
                0x00..=0x7F => Some(byte as char),
                0xC0..=0xDF => {
                    self.code_point = (byte & 0x1F) as u32;
                    self.remaining = 1;
                    None
                }
                0xE0..=0xEF => {
                    self.code_point = (byte & 0x0F) as u32;
                    self.remaining = 2;
                    None
                }
                0xF0..=0xF7 => {
                    self.code_point = (byte & 0x07) as u32;
                    self.remaining = 3;
                    None
                }
                _ => Some(char::REPLACEMENT_CHARACTER),
            };
        }

        if (0x80..=0xBF).contains(&byte) {
            self.code_point = (self.code_point << 6) | (byte & 0x3F) as u32;
            self.remaining -= 1;
            if self.remaining == 0 {
                Some(char::from_u32(self.code_point).unwrap_or(char::REPLACEMENT_CHARACTER))
            } else {
                None
            }
        } else {
            // Callers resync truncated sequences before feeding a
            // non-continuation byte; treat a stray one as malformed.
            self.remaining = 0;
            Some(char::REPLACEMENT_CHARACTER)
        }
    }

    /// True while a multi-byte sequence is being assembled.
    fn pending(&self) -> bool {
        self.remaining > 0
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

/// VT52 sub-parser states. DCA is the two-byte direct cursor address
/// following `ESC Y`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Vt52State {
    #[default]
    Ground,
    Escape,
    Dca1,
    Dca2(u8),
}

/// The parser-action interpreter. Owns the screen and the outbound
/// queues.
pub struct Interp {
    pub screen: Screen,
    utf8: Utf8Decoder,
    vt52: Vt52State,
    answerback: String,
    responses: Vec<u8>,
    events: Vec<HostEvent>,
}

/// A complete terminal: ANSI parser plus interpreter over a screen.
pub struct Term {
    parser: Parser,
    interp: Interp,
}

impl Term {
    pub fn new(width: usize, height: usize, answerback: String) -> Self {
        Self {
            parser: Parser::new(),
            interp: Interp {
                screen: Screen::new(width, height),
                utf8: Utf8Decoder::default(),
                vt52: Vt52State::default(),
                answerback,
                responses: Vec::new(),
                events: Vec::new(),
            },
        }
    }

    /// The screen, for the renderer's read-only consumption.
    pub fn screen(&self) -> &Screen {
        &self.interp.screen
    }

    /// Feed a chunk of shell output. Side effects land on the screen
    /// and in the response/event queues, in byte order.
    pub fn feed(&mut self, bytes: &[u8]) {
        let Term { parser, interp } = self;
        for &byte in bytes {
            if interp.screen.mode(Modes::DECANM) {
                parser.advance(byte, interp);
            } else {
                interp.vt52_advance(byte);
            }
        }
    }

    /// Pending response bytes bound for the pty.
    pub fn take_responses(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.interp.responses)
    }

    /// Pending window-layer effects.
    pub fn take_events(&mut self) -> Vec<HostEvent> {
        std::mem::take(&mut self.interp.events)
    }
}

impl Dispatch for Interp {
    fn execute(&mut self, byte: u8) {
        match byte {
            // Enquiry: transmit the answerback string.
            0x05 => self.responses.extend_from_slice(self.answerback.as_bytes()),
            0x07 => self.events.push(HostEvent::Bell),
            0x08 => self.screen.move_cursor(Direction::Left, 1),
            0x09 => self.screen.tab(),
            0x0A | 0x0B | 0x0C => {
                self.screen.newline();
                if self.screen.mode(Modes::LNM) {
                    self.screen.carriage_return();
                }
            }
            0x0D => self.screen.carriage_return(),
            // Shift Out / Shift In: locking shifts of G1/G0 into GL.
            0x0E => {
                self.screen.set_mode(Modes::SHIFT_OUT, true);
                self.screen.cursor.shifts[GL] = 1;
            }
            0x0F => {
                self.screen.set_mode(Modes::SHIFT_OUT, false);
                self.screen.cursor.shifts[GL] = 0;
            }
            // XON/XOFF flow control from the host program.
            0x11 => self.screen.set_mode(Modes::TRANSMIT_DISABLED, false),
            0x13 => self.screen.set_mode(Modes::TRANSMIT_DISABLED, true),
            _ => {}
        }
    }

    fn print(&mut self, byte: u8) {
        // A truncated multi-byte sequence yields one replacement
        // character; the interrupting byte then starts over.
        if self.utf8.pending() && !(0x80..=0xBF).contains(&byte) {
            self.utf8.reset();
            self.screen.putch(char::REPLACEMENT_CHARACTER);
        }
        if let Some(ch) = self.utf8.push(byte) {
            self.screen.putch(ch);
        }
    }

    fn substitute(&mut self) {
        self.utf8.reset();
        self.screen.putch(char::REPLACEMENT_CHARACTER);
    }

    fn esc_dispatch(&mut self, intermediates: &Intermediates, byte: u8) {
        if intermediates.overflowed() {
            log::warn!("escape dropped: too many intermediates (final 0x{:02x})", byte);
            return;
        }
        match intermediates.first() {
            None => self.esc_plain(byte),
            Some(b'#') => self.esc_line_control(byte),
            Some(b'(') => self.designate_94(0, byte),
            Some(b')') => self.designate_94(1, byte),
            Some(b'*') => self.designate_94(2, byte),
            Some(b'+') => self.designate_94(3, byte),
            Some(b'-') => self.designate_96(1, byte),
            Some(b'.') => self.designate_96(2, byte),
            Some(b'/') => self.designate_96(3, byte),
            Some(other) => self.unrecognized_escape(Some(other), byte),
        }
    }

    fn csi_dispatch(&mut self, intermediates: &Intermediates, params: &Params, byte: u8) {
        if intermediates.overflowed() {
            log::warn!(
                "control sequence dropped: too many intermediates (final 0x{:02x})",
                byte
            );
            return;
        }
        match intermediates.first() {
            None => self.csi_plain(params, byte),
            Some(b'?') => self.csi_private(params, byte),
            Some(other) => log::debug!(
                "unrecognized control sequence intermediate {:?} (final {:?})",
                other as char,
                byte as char
            ),
        }
    }

    fn osc_dispatch(&mut self, data: &[u8]) {
        // The command identifier runs to the first semicolon.
        let (command, rest) = match data.iter().position(|&b| b == b';') {
            Some(i) => (&data[..i], &data[i + 1..]),
            None => (data, &data[data.len()..]),
        };
        let text = || String::from_utf8_lossy(rest).into_owned();

        match std::str::from_utf8(command).unwrap_or("") {
            "0" => {
                self.events.push(HostEvent::SetTitle(text()));
                self.events.push(HostEvent::SetIconName(text()));
            }
            "1" | "2L" => self.events.push(HostEvent::SetIconName(text())),
            "2" | "21" => self.events.push(HostEvent::SetTitle(text())),
            "3" => log::debug!("OSC 3 (window property) ignored: {:?}", text()),
            "4" => self.change_colors(rest),
            other => log::debug!("unrecognized OSC command {:?}", other),
        }
    }
}

impl Interp {
    fn esc_plain(&mut self, byte: u8) {
        match byte {
            // DECSC: a deep copy, character-set designations included.
            b'7' => self.screen.saved_cursor = self.screen.cursor.clone(),
            b'8' => self.restore_cursor(),
            b'=' => self.screen.set_mode(Modes::DECKPAM, true),
            b'>' => self.screen.set_mode(Modes::DECKPAM, false),
            b'D' => self.screen.newline(),
            b'E' => {
                self.screen.carriage_return();
                self.screen.newline();
            }
            // XTerm hpLowerleftBugCompat: home to the lower left.
            b'F' => {
                let bottom = self.screen.scroll_bottom;
                self.screen.warpto(0, bottom as i32);
            }
            b'H' => self.screen.set_tab(),
            b'M' => self.screen.revline(),
            b'Z' => self.responses.extend_from_slice(DEVICE_ATTRS),
            b'\\' => {} // ST: nothing to terminate here
            b'c' => self.reset(),
            b'x' | b'y' => log::debug!(
                "unimplemented escape {:?} (DECREQTPARM/DECTST)",
                byte as char
            ),
            _ => self.unrecognized_escape(None, byte),
        }
    }

    /// DECRC. The saved position may be stale after a resize; clamp it
    /// and drop the latch unless it is still meaningful.
    fn restore_cursor(&mut self) {
        let mut cursor = self.screen.saved_cursor.clone();
        cursor.x = cursor.x.min(self.screen.width - 1);
        cursor.y = cursor.y.min(self.screen.height - 1);
        if !(self.screen.mode(Modes::DECAWM) && cursor.x == self.screen.width - 1) {
            cursor.last_column = false;
        }
        self.screen.cursor = cursor;
    }

    /// RIS, and the shared tail of `ESC c`.
    fn reset(&mut self) {
        self.screen.reset();
        self.utf8.reset();
        self.vt52 = Vt52State::default();
    }

    fn esc_line_control(&mut self, byte: u8) {
        match byte {
            b'3' => self.screen.set_line_size(LineSize::DoubleHeightTop),
            b'4' => self.screen.set_line_size(LineSize::DoubleHeightBottom),
            b'5' => self.screen.set_line_size(LineSize::Single),
            b'6' => self.screen.set_line_size(LineSize::DoubleWidth),
            b'8' => self.screen.screen_align(),
            _ => self.unrecognized_escape(Some(b'#'), byte),
        }
    }

    /// SCS: designate a 94-character set into G0-G3.
    fn designate_94(&mut self, slot: usize, byte: u8) {
        let charset = match byte {
            b'0' => Charset::DecGraphics,
            b'A' => Charset::UnitedKingdom,
            b'B' => Charset::Ascii,
            // Alternate ROM standard/graphics: no translation.
            b'1' | b'2' => Charset::Ascii,
            other => {
                log::debug!(
                    "unknown 94-character set {:?} designated into G{}",
                    other as char,
                    slot
                );
                Charset::Ascii
            }
        };
        self.screen.cursor.charsets[slot] = charset;
    }

    /// SCS: designate a 96-character set into G1-G3. Recognized, but
    /// rendered without translation.
    fn designate_96(&mut self, slot: usize, byte: u8) {
        log::debug!(
            "96-character set {:?} designated into G{} (no translation)",
            byte as char,
            slot
        );
        self.screen.cursor.charsets[slot] = Charset::Ascii;
    }

    fn unrecognized_escape(&self, intermediate: Option<u8>, byte: u8) {
        let grammar = if self.screen.mode(Modes::DECANM) {
            "ANSI"
        } else {
            "VT52"
        };
        log::debug!(
            "unrecognized escape: grammar={} intermediate={:?} final={:?}/0x{:02x}",
            grammar,
            intermediate.map(|b| b as char),
            byte as char,
            byte
        );
    }

    fn csi_plain(&mut self, params: &Params, byte: u8) {
        match byte {
            b'A' => self
                .screen
                .move_cursor(Direction::Up, params.get(0, 1) as i32),
            b'B' => self
                .screen
                .move_cursor(Direction::Down, params.get(0, 1) as i32),
            b'C' => self
                .screen
                .move_cursor(Direction::Right, params.get(0, 1) as i32),
            b'D' => self
                .screen
                .move_cursor(Direction::Left, params.get(0, 1) as i32),
            b'H' | b'f' => {
                let origin = if self.screen.mode(Modes::DECOM) {
                    self.screen.scroll_top as i32
                } else {
                    0
                };
                let row = params.get(0, 1) as i32 - 1 + origin;
                let col = params.get(1, 1) as i32 - 1;
                self.screen.warpto(col, row);
            }
            b'J' => self.screen.erase_display(params.raw(0)),
            b'K' => self.screen.erase_line(params.raw(0)),
            b'P' => self.screen.delete_character(params.get(0, 1) as usize),
            b'c' => {
                if params.raw(0) == 0 {
                    self.responses.extend_from_slice(DEVICE_ATTRS);
                }
            }
            b'g' => match params.raw(0) {
                0 => self.screen.clear_tab(),
                3 => self.screen.clear_all_tabs(),
                other => log::debug!("unrecognized tab clear mode {}", other),
            },
            b'h' => self.set_ansi_modes(params, true),
            b'l' => self.set_ansi_modes(params, false),
            b'm' => self.select_graphic_rendition(params),
            b'n' => self.device_status_report(params),
            b'q' => log::debug!("DECLL ignored (no LEDs to load)"),
            b'r' => {
                let top = params.get(0, 1) as usize;
                let bottom = params
                    .get(1, self.screen.height as u16)
                    .min(self.screen.height as u16) as usize;
                if top < bottom {
                    self.screen.set_scroll_region(top - 1, bottom - 1);
                }
            }
            other => log::debug!(
                "unrecognized control sequence final {:?}/0x{:02x}",
                other as char,
                other
            ),
        }
    }

    fn csi_private(&mut self, params: &Params, byte: u8) {
        match byte {
            b'h' => self.set_dec_modes(params, true),
            b'l' => self.set_dec_modes(params, false),
            other => log::debug!(
                "unrecognized private control sequence final {:?}",
                other as char
            ),
        }
    }

    /// SM/RM without a private marker.
    fn set_ansi_modes(&mut self, params: &Params, value: bool) {
        for i in 0..params.len() {
            match params.raw(i) {
                20 => self.screen.set_mode(Modes::LNM, value),
                other => log::debug!("unrecognized ANSI mode {} = {}", other, value),
            }
        }
    }

    /// SM/RM with the `?` private marker.
    fn set_dec_modes(&mut self, params: &Params, value: bool) {
        for i in 0..params.len() {
            match params.raw(i) {
                1 => self.screen.set_mode(Modes::DECCKM, value),
                2 => {
                    self.screen.set_mode(Modes::DECANM, value);
                    if !value {
                        self.vt52 = Vt52State::default();
                    }
                }
                3 => {
                    // 132/80-column switch recreates (and clears) the
                    // grid.
                    self.screen.set_mode(Modes::DECCOLM, value);
                    let width = if value { 132 } else { 80 };
                    let height = self.screen.height;
                    self.screen.resize(width, height);
                    self.events.push(HostEvent::Resize { width, height });
                }
                4 => log::debug!("DECSCLM not implemented (smooth scroll)"),
                5 => self.screen.set_mode(Modes::DECSCNM, value),
                6 => {
                    self.screen.set_mode(Modes::DECOM, value);
                    let y = if value { self.screen.scroll_top } else { 0 };
                    self.screen.warpto(0, y as i32);
                }
                7 => {
                    self.screen.set_mode(Modes::DECAWM, value);
                    if !value {
                        self.screen.cursor.last_column = false;
                    }
                }
                8 => self.screen.set_mode(Modes::DECARM, value),
                9 => log::debug!("DECINLM not implemented (interlace)"),
                25 => self.screen.set_mode(Modes::DECTCEM, value),
                other => log::debug!("unrecognized DEC mode ?{} = {}", other, value),
            }
        }
    }

    /// SGR: fold the parameter list into a working copy of the cursor's
    /// attribute block, committed at the end. A malformed 38/48 aborts
    /// the whole rendition uncommitted.
    fn select_graphic_rendition(&mut self, params: &Params) {
        let mut attrs = self.screen.cursor.attrs;
        let values = params.as_slice();
        let mut i = 0;

        while i < values.len() {
            let parameter = values[i];
            match parameter {
                0 => {
                    attrs = Attrs::default();
                    self.screen.cursor.conceal = false;
                }
                1 => attrs.intensity = Intensity::Bold,
                2 => attrs.intensity = Intensity::Faint,
                3 => attrs.italic = true,
                4 => attrs.underline = Underline::Single,
                5 => attrs.blink = Blink::Slow,
                6 => attrs.blink = Blink::Fast,
                7 => attrs.negative = true,
                8 => self.screen.cursor.conceal = true,
                9 => attrs.crossed_out = true,
                10..=19 => attrs.font = (parameter - 10) as u8,
                20 => attrs.fraktur = true,
                21 => attrs.underline = Underline::Double,
                22 => attrs.intensity = Intensity::Normal,
                23 => {
                    attrs.italic = false;
                    attrs.fraktur = false;
                }
                24 => attrs.underline = Underline::None,
                25 => attrs.blink = Blink::None,
                27 => attrs.negative = false,
                28 => self.screen.cursor.conceal = false,
                29 => attrs.crossed_out = false,
                30..=37 => attrs.foreground = Color::Indexed((parameter - 30) as u8),
                38 | 48 => match extended_color(&values[i + 1..]) {
                    Some((color, consumed)) => {
                        if parameter == 38 {
                            attrs.foreground = color;
                        } else {
                            attrs.background = color;
                        }
                        i += consumed;
                    }
                    None => return,
                },
                39 => attrs.foreground = Attrs::default().foreground,
                40..=47 => attrs.background = Color::Indexed((parameter - 40) as u8),
                49 => attrs.background = Attrs::default().background,
                51 => attrs.frame = Frame::Framed,
                52 => attrs.frame = Frame::Encircled,
                53 => attrs.overline = true,
                54 => attrs.frame = Frame::None,
                55 => attrs.overline = false,
                90..=97 => attrs.foreground = Color::Indexed((parameter - 90 + 8) as u8),
                100..=107 => attrs.background = Color::Indexed((parameter - 100 + 8) as u8),
                other => log::debug!("unrecognized graphic rendition {}", other),
            }
            i += 1;
        }

        self.screen.cursor.attrs = attrs;
    }

    fn device_status_report(&mut self, params: &Params) {
        match params.raw(0) {
            // Ready, no malfunctions detected.
            5 => self.responses.extend_from_slice(b"\x1b[0n"),
            6 => {
                let row = if self.screen.mode(Modes::DECOM) {
                    self.screen.cursor.y.saturating_sub(self.screen.scroll_top)
                } else {
                    self.screen.cursor.y
                } + 1;
                let col = self.screen.cursor.x + 1;
                let report = format!("\x1b[{};{}R", row, col);
                self.responses.extend_from_slice(report.as_bytes());
            }
            other => log::debug!("unrecognized status report request {}", other),
        }
    }

    /// OSC 4: `index;spec` pairs, possibly repeated.
    fn change_colors(&mut self, data: &[u8]) {
        let data = String::from_utf8_lossy(data);
        let mut parts = data.split(';').filter(|part| !part.is_empty());

        while let (Some(index), Some(spec)) = (parts.next(), parts.next()) {
            let Ok(index) = index.trim().parse::<usize>() else {
                log::debug!("bad palette index {:?}", index);
                return;
            };
            if index > 255 {
                log::warn!("palette index {} out of range (0..255)", index);
                continue;
            }
            match Palette::parse_color_spec(spec) {
                Some(rgb) => self.screen.palette.set(index, rgb),
                None => log::debug!("unrecognized color specification {:?}", spec),
            }
        }
    }

    /// One byte of the VT52 grammar (DECANM off).
    fn vt52_advance(&mut self, byte: u8) {
        if byte == 0x1B {
            self.vt52 = Vt52State::Escape;
            return;
        }
        if byte <= 0x1F || byte == 0x7F {
            self.execute(byte);
            return;
        }

        match self.vt52 {
            Vt52State::Ground => self.print(byte),
            Vt52State::Dca1 => self.vt52 = Vt52State::Dca2(byte),
            Vt52State::Dca2(row) => {
                self.screen
                    .warpto(byte as i32 - 0x20, row as i32 - 0x20);
                self.vt52 = Vt52State::Ground;
            }
            Vt52State::Escape => {
                self.vt52 = Vt52State::Ground;
                match byte {
                    b'<' => self.screen.set_mode(Modes::DECANM, true),
                    b'=' => self.screen.set_mode(Modes::DECKPAM, true),
                    b'>' => self.screen.set_mode(Modes::DECKPAM, false),
                    b'A' => self.screen.move_cursor(Direction::Up, 1),
                    b'B' => self.screen.move_cursor(Direction::Down, 1),
                    b'C' => self.screen.move_cursor(Direction::Right, 1),
                    b'D' => self.screen.move_cursor(Direction::Left, 1),
                    b'F' => self.set_gl_charset(Charset::Vt52Graphics),
                    b'G' => self.set_gl_charset(Charset::Ascii),
                    b'H' => self.screen.warpto(0, 0),
                    b'I' => self.screen.revline(),
                    b'J' => self.screen.erase_display(0),
                    b'K' => self.screen.erase_line(0),
                    b'Y' => self.vt52 = Vt52State::Dca1,
                    b'Z' => self.responses.extend_from_slice(VT52_IDENT),
                    other => self.unrecognized_escape(None, other),
                }
            }
        }
    }

    /// VT52 graphics mode targets whichever logical set is shifted into
    /// GL.
    fn set_gl_charset(&mut self, charset: Charset) {
        let slot = self.screen.cursor.shifts[GL];
        self.screen.cursor.charsets[slot] = charset;
    }
}

/// Decode the tail of SGR 38/48. Returns the color and the number of
/// parameters consumed, or `None` when the form is malformed or
/// truncated.
fn extended_color(rest: &[u16]) -> Option<(Color, usize)> {
    match rest.first().copied()? {
        2 => {
            if rest.len() < 4 {
                return None;
            }
            let channel = |v: u16| v.min(255) as u8;
            Some((
                Color::Rgb(Rgb::new(channel(rest[1]), channel(rest[2]), channel(rest[3]))),
                4,
            ))
        }
        5 => {
            if rest.len() < 2 {
                return None;
            }
            Some((Color::Indexed(rest[1].min(255) as u8), 2))
        }
        other => {
            log::debug!("unrecognized extended color selector {}", other);
            None
        }
    }
}
