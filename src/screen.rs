//! Screen model: cell grid, cursor, mode flags, tab stops, scroll region.
//!
//! The screen owns all display state and exposes the mutation primitives
//! the interpreter drives. Every operation leaves the invariants intact:
//! the cursor stays inside the grid, the scroll region stays ordered, and
//! the deferred-wrap latch is only ever set by a write into the last
//! column under autowrap.

use crate::charset::Charset;
use crate::color::{Color, Palette};
use bitflags::bitflags;
use unicode_width::UnicodeWidthChar;

/// Index of the GL (left, 0x20-0x7E) half of the in-use code table.
pub const GL: usize = 0;
/// Index of the GR (right, 0xA0-0xFE) half of the in-use code table.
pub const GR: usize = 1;

/// Character intensity, SGR 1/2/22.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Intensity {
    #[default]
    Normal,
    Bold,
    Faint,
}

/// Blink rate, SGR 5/6/25.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Blink {
    #[default]
    None,
    Slow,
    Fast,
}

/// Underline style, SGR 4/21/24.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
}

/// Framing decoration, SGR 51/52/54.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Frame {
    #[default]
    None,
    Framed,
    Encircled,
}

/// Per-line rendering dimensions (DECSWL/DECDWL/DECDHL).
///
/// The ordering is part of the external contract: both double-height
/// values sort after `DoubleWidth` so a renderer can test
/// `size > LineSize::DoubleWidth` for "double height".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LineSize {
    #[default]
    Single,
    DoubleWidth,
    DoubleHeightTop,
    DoubleHeightBottom,
}

impl LineSize {
    /// True for any size whose glyphs occupy two columns.
    pub fn is_double(&self) -> bool {
        *self != LineSize::Single
    }
}

/// Rendering attributes carried by the cursor and stamped into every
/// cell it writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attrs {
    pub foreground: Color,
    pub background: Color,
    /// Font selected by SGR 10-19.
    pub font: u8,
    pub intensity: Intensity,
    pub blink: Blink,
    pub underline: Underline,
    pub frame: Frame,
    pub italic: bool,
    pub negative: bool,
    pub crossed_out: bool,
    pub fraktur: bool,
    pub overline: bool,
}

impl Default for Attrs {
    fn default() -> Self {
        Self {
            foreground: Color::Indexed(7),
            background: Color::Indexed(0),
            font: 0,
            intensity: Intensity::Normal,
            blink: Blink::None,
            underline: Underline::None,
            frame: Frame::None,
            italic: false,
            negative: false,
            crossed_out: false,
            fraktur: false,
            overline: false,
        }
    }
}

/// A single character cell. `'\0'` means empty; the renderer substitutes
/// a space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell {
    pub code_point: char,
    pub attrs: Attrs,
}

/// A screen row and its dimension attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub size: LineSize,
    pub cells: Vec<Cell>,
}

impl Line {
    fn filled(width: usize, cell: Cell) -> Self {
        Self {
            size: LineSize::Single,
            cells: vec![cell; width],
        }
    }
}

bitflags! {
    /// Terminal mode flags, ANSI and DEC private. Defaults are applied
    /// by [`Screen::reset`].
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Modes: u32 {
        /// Line Feed/New Line Mode: LF also performs CR.
        const LNM = 1 << 0;
        /// Cursor keys send SS3-prefixed sequences.
        const DECCKM = 1 << 1;
        /// ANSI mode; when clear the VT52 grammar is in effect.
        const DECANM = 1 << 2;
        /// 132-column mode.
        const DECCOLM = 1 << 3;
        /// Smooth-scroll hint.
        const DECSCLM = 1 << 4;
        /// Screen-wide reverse video.
        const DECSCNM = 1 << 5;
        /// Origin mode: cursor addressing bounded by the scroll region.
        const DECOM = 1 << 6;
        /// Autowrap.
        const DECAWM = 1 << 7;
        /// Auto key-repeat.
        const DECARM = 1 << 8;
        /// Interlace hint.
        const DECINLM = 1 << 9;
        /// Show cursor.
        const DECTCEM = 1 << 10;
        /// Keypad application mode.
        const DECKPAM = 1 << 11;
        /// Shift Out in effect: GL is mapped from G1.
        const SHIFT_OUT = 1 << 12;
        /// XOFF received; host keyboard input is withheld.
        const TRANSMIT_DISABLED = 1 << 13;
    }
}

impl Default for Modes {
    fn default() -> Self {
        Modes::DECANM | Modes::DECSCLM | Modes::DECARM | Modes::DECINLM | Modes::DECTCEM
    }
}

/// Cursor state: position, rendering attributes, conceal flag, the
/// deferred-wrap latch, and character-set designations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
    pub attrs: Attrs,
    /// SGR 8: write cells without a code point.
    pub conceal: bool,
    /// Deferred autowrap: the last write landed in the final column and
    /// the next one must CR+LF first.
    pub last_column: bool,
    /// G0-G3 character-set designations.
    pub charsets: [Charset; 4],
    /// Logical set currently shifted into GL and GR.
    pub shifts: [usize; 2],
}

/// Relative cursor motion direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// The terminal screen.
#[derive(Clone, Debug, PartialEq)]
pub struct Screen {
    pub width: usize,
    pub height: usize,
    pub lines: Vec<Line>,
    /// One flag per column.
    pub tabstops: Vec<bool>,
    /// Inclusive scroll region.
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    pub palette: Palette,
    pub modes: Modes,
    pub cursor: Cursor,
    pub saved_cursor: Cursor,
}

impl Screen {
    pub fn new(width: usize, height: usize) -> Self {
        let mut screen = Self {
            width: 0,
            height: 0,
            lines: Vec::new(),
            tabstops: Vec::new(),
            scroll_top: 0,
            scroll_bottom: 0,
            palette: Palette::default(),
            modes: Modes::default(),
            cursor: Cursor::default(),
            saved_cursor: Cursor::default(),
        };
        screen.resize(width, height);
        screen
    }

    /// Reallocate the grid at a new size. Content is discarded, tab
    /// stops return to every 8th column, the scroll region spans the
    /// full height, and the cursor homes.
    pub fn resize(&mut self, width: usize, height: usize) {
        let width = width.max(1);
        let height = height.max(2);
        log::debug!(
            "screen resize {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );

        self.width = width;
        self.height = height;
        self.lines = (0..height)
            .map(|_| Line::filled(width, Cell::default()))
            .collect();
        self.tabstops = default_tabstops(width);
        self.scroll_top = 0;
        self.scroll_bottom = height - 1;
        self.cursor.x = 0;
        self.cursor.y = 0;
        self.cursor.last_column = false;
    }

    /// Reinitialize everything: cells, tab stops, modes, palette, cursor
    /// and saved cursor (RIS).
    pub fn reset(&mut self) {
        self.cursor = Cursor::default();
        self.saved_cursor = Cursor::default();
        self.modes = Modes::default();
        self.palette = Palette::default();
        let (width, height) = (self.width, self.height);
        self.resize(width, height);
    }

    pub fn mode(&self, mode: Modes) -> bool {
        self.modes.contains(mode)
    }

    pub fn set_mode(&mut self, mode: Modes, value: bool) {
        self.modes.set(mode, value);
    }

    /// A cleared cell carrying the cursor's current attributes.
    fn blank_cell(&self) -> Cell {
        Cell {
            code_point: '\0',
            attrs: self.cursor.attrs,
        }
    }

    /// Clamp and move the cursor. Under DECOM the row is bounded by the
    /// scroll region. Clears the deferred-wrap latch.
    pub fn warpto(&mut self, x: i32, y: i32) {
        let (min_y, max_y) = if self.mode(Modes::DECOM) {
            (self.scroll_top as i32, self.scroll_bottom as i32)
        } else {
            (0, self.height as i32 - 1)
        };

        self.cursor.x = x.clamp(0, self.width as i32 - 1) as usize;
        self.cursor.y = y.clamp(min_y, max_y) as usize;
        self.cursor.last_column = false;
    }

    pub fn move_cursor(&mut self, direction: Direction, amount: i32) {
        let (x, y) = (self.cursor.x as i32, self.cursor.y as i32);
        match direction {
            Direction::Up => self.warpto(x, y - amount),
            Direction::Down => self.warpto(x, y + amount),
            Direction::Left => self.warpto(x - amount, y),
            Direction::Right => self.warpto(x + amount, y),
        }
    }

    /// CR: return to column zero.
    pub fn carriage_return(&mut self) {
        self.cursor.x = 0;
        self.cursor.last_column = false;
    }

    /// Line feed: advance the cursor, scrolling the region up when the
    /// cursor sits on the bottom margin. Column handling (LNM) is the
    /// caller's concern.
    pub fn newline(&mut self) {
        self.cursor.last_column = false;
        if self.cursor.y < self.scroll_bottom {
            self.cursor.y += 1;
        } else {
            self.scroll_up();
        }
    }

    /// Reverse line feed: move up, scrolling the region down at the top
    /// margin.
    pub fn revline(&mut self) {
        self.cursor.last_column = false;
        if self.cursor.y > self.scroll_top {
            self.cursor.y -= 1;
        } else {
            self.scroll_down();
        }
    }

    /// Scroll the region up one line. The vacated bottom row is blank
    /// with the cursor's current attributes.
    pub fn scroll_up(&mut self) {
        let blank = Line::filled(self.width, self.blank_cell());
        self.lines[self.scroll_top..=self.scroll_bottom].rotate_left(1);
        self.lines[self.scroll_bottom] = blank;
    }

    /// Scroll the region down one line; the vacated top row is blank.
    pub fn scroll_down(&mut self) {
        let blank = Line::filled(self.width, self.blank_cell());
        self.lines[self.scroll_top..=self.scroll_bottom].rotate_right(1);
        self.lines[self.scroll_top] = blank;
    }

    /// Write a code point at the cursor with the cursor's attributes,
    /// honoring GL translation, conceal, wide glyphs, double-width
    /// lines, and the DECAWM deferred-wrap latch.
    pub fn putch(&mut self, code_point: char) {
        if self.cursor.last_column {
            self.carriage_return();
            self.newline();
        }

        let ch = if (' '..='\x7e').contains(&code_point) {
            self.cursor.charsets[self.cursor.shifts[GL]].translate(code_point)
        } else {
            code_point
        };

        let (x, y) = (self.cursor.x, self.cursor.y);
        let cell = &mut self.lines[y].cells[x];
        cell.attrs = self.cursor.attrs;
        cell.code_point = if self.cursor.conceal { '\0' } else { ch };

        let glyph_width = ch.width().unwrap_or(1).max(1);
        let increment = if self.lines[y].size.is_double() {
            glyph_width * 2
        } else {
            glyph_width
        };

        if self.cursor.x + increment >= self.width {
            self.cursor.last_column = self.mode(Modes::DECAWM);
        } else {
            self.cursor.x += increment;
            self.cursor.last_column = false;
        }
    }

    /// HT: advance to the next tab stop, clamped to the right edge.
    pub fn tab(&mut self) {
        let mut x = self.cursor.x + 1;
        while x < self.width && !self.tabstops[x] {
            x += 1;
        }
        self.cursor.x = x.min(self.width - 1);
        self.cursor.last_column = false;
    }

    /// HTS: set a tab stop at the cursor column.
    pub fn set_tab(&mut self) {
        let x = self.cursor.x;
        self.tabstops[x] = true;
    }

    /// TBC 0: clear the tab stop at the cursor column.
    pub fn clear_tab(&mut self) {
        let x = self.cursor.x;
        self.tabstops[x] = false;
    }

    /// TBC 3: clear every tab stop.
    pub fn clear_all_tabs(&mut self) {
        self.tabstops.fill(false);
    }

    /// ED: erase part or all of the display. A line cleared end to end
    /// returns to single width.
    pub fn erase_display(&mut self, mode: u16) {
        match mode {
            0 => {
                self.erase_columns(self.cursor.y, self.cursor.x, self.width);
                for y in self.cursor.y + 1..self.height {
                    self.erase_columns(y, 0, self.width);
                }
            }
            1 => {
                for y in 0..self.cursor.y {
                    self.erase_columns(y, 0, self.width);
                }
                self.erase_columns(self.cursor.y, 0, self.cursor.x + 1);
            }
            2 => {
                for y in 0..self.height {
                    self.erase_columns(y, 0, self.width);
                }
            }
            other => log::debug!("unrecognized display erase mode {}", other),
        }
    }

    /// EL: erase within the current row.
    pub fn erase_line(&mut self, mode: u16) {
        match mode {
            0 => self.erase_columns(self.cursor.y, self.cursor.x, self.width),
            1 => self.erase_columns(self.cursor.y, 0, self.cursor.x + 1),
            2 => self.erase_columns(self.cursor.y, 0, self.width),
            other => log::debug!("unrecognized line erase mode {}", other),
        }
    }

    fn erase_columns(&mut self, y: usize, start: usize, end: usize) {
        let blank = self.blank_cell();
        let line = &mut self.lines[y];
        line.cells[start..end].fill(blank);
        if start == 0 && end == self.width {
            line.size = LineSize::Single;
        }
    }

    /// DCH: drop cells at the cursor, shift the remainder of the row
    /// left, and backfill the right edge with empty cells.
    pub fn delete_character(&mut self, count: usize) {
        let x = self.cursor.x;
        let count = count.min(self.width - x);
        let cells = &mut self.lines[self.cursor.y].cells;
        cells.copy_within(x + count.., x);
        let fill_from = self.width - count;
        cells[fill_from..].fill(Cell::default());
        self.cursor.last_column = false;
    }

    /// DECSTBM: install the region when `top < bottom`, then home the
    /// cursor (origin-relative under DECOM).
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let bottom = bottom.min(self.height - 1);
        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
            let y = if self.mode(Modes::DECOM) {
                self.scroll_top
            } else {
                0
            };
            self.warpto(0, y as i32);
        }
    }

    /// DECDHL/DECDWL/DECSWL: set the current line's dimensions.
    pub fn set_line_size(&mut self, size: LineSize) {
        self.lines[self.cursor.y].size = size;
    }

    /// DECALN: fill the grid with `E` for the screen-alignment display.
    pub fn screen_align(&mut self) {
        for line in &mut self.lines {
            for cell in &mut line.cells {
                cell.code_point = 'E';
            }
        }
    }
}

/// A tab stop on every 8th column, starting at column 8.
fn default_tabstops(width: usize) -> Vec<bool> {
    let mut stops = vec![false; width];
    for x in (8..width).step_by(8) {
        stops[x] = true;
    }
    stops
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen() -> Screen {
        Screen::new(80, 24)
    }

    fn glyph(screen: &Screen, x: usize, y: usize) -> char {
        screen.lines[y].cells[x].code_point
    }

    #[test]
    fn new_screen_defaults() {
        let screen = screen();
        assert_eq!((screen.width, screen.height), (80, 24));
        assert_eq!((screen.scroll_top, screen.scroll_bottom), (0, 23));
        assert_eq!((screen.cursor.x, screen.cursor.y), (0, 0));
        assert_eq!(screen.modes, Modes::default());
        assert!(screen.mode(Modes::DECANM));
        assert!(!screen.mode(Modes::DECAWM));
        let stops: Vec<usize> = (0..80).filter(|&x| screen.tabstops[x]).collect();
        assert_eq!(stops, vec![8, 16, 24, 32, 40, 48, 56, 64, 72]);
    }

    #[test]
    fn warpto_clamps_to_grid() {
        let mut screen = screen();
        screen.warpto(500, 500);
        assert_eq!((screen.cursor.x, screen.cursor.y), (79, 23));
        screen.warpto(-3, -3);
        assert_eq!((screen.cursor.x, screen.cursor.y), (0, 0));
    }

    #[test]
    fn warpto_respects_origin_mode() {
        let mut screen = screen();
        screen.set_scroll_region(5, 15);
        screen.set_mode(Modes::DECOM, true);
        screen.warpto(0, 0);
        assert_eq!(screen.cursor.y, 5);
        screen.warpto(0, 99);
        assert_eq!(screen.cursor.y, 15);
    }

    #[test]
    fn putch_writes_and_advances() {
        let mut screen = screen();
        for ch in "Hello".chars() {
            screen.putch(ch);
        }
        assert_eq!(glyph(&screen, 0, 0), 'H');
        assert_eq!(glyph(&screen, 4, 0), 'o');
        assert_eq!(screen.cursor.x, 5);
        assert!(!screen.cursor.last_column);
    }

    #[test]
    fn putch_at_last_column_without_autowrap() {
        let mut screen = screen();
        screen.warpto(79, 0);
        screen.putch('A');
        assert_eq!(screen.cursor.x, 79);
        assert!(!screen.cursor.last_column);
        screen.putch('B');
        assert_eq!(glyph(&screen, 79, 0), 'B');
        assert_eq!(screen.cursor.y, 0);
    }

    #[test]
    fn putch_defers_wrap_under_autowrap() {
        let mut screen = screen();
        screen.set_mode(Modes::DECAWM, true);
        screen.warpto(79, 0);
        screen.putch('A');
        assert_eq!(glyph(&screen, 79, 0), 'A');
        assert_eq!(screen.cursor.x, 79);
        assert!(screen.cursor.last_column);
        screen.putch('B');
        assert_eq!(glyph(&screen, 0, 1), 'B');
        assert_eq!((screen.cursor.x, screen.cursor.y), (1, 1));
        assert!(!screen.cursor.last_column);
    }

    #[test]
    fn cursor_motion_clears_wrap_latch() {
        let mut screen = screen();
        screen.set_mode(Modes::DECAWM, true);
        screen.warpto(79, 0);
        screen.putch('A');
        assert!(screen.cursor.last_column);
        screen.move_cursor(Direction::Left, 1);
        assert!(!screen.cursor.last_column);
    }

    #[test]
    fn putch_on_double_width_line_advances_twice() {
        let mut screen = screen();
        screen.set_line_size(LineSize::DoubleWidth);
        screen.putch('A');
        assert_eq!(screen.cursor.x, 2);
    }

    #[test]
    fn putch_honors_conceal() {
        let mut screen = screen();
        screen.cursor.conceal = true;
        screen.putch('S');
        assert_eq!(glyph(&screen, 0, 0), '\0');
        assert_eq!(screen.cursor.x, 1);
    }

    #[test]
    fn putch_translates_through_designated_charset() {
        let mut screen = screen();
        screen.cursor.charsets[1] = Charset::DecGraphics;
        screen.putch('q');
        assert_eq!(glyph(&screen, 0, 0), 'q');
        // Shift Out selects G1.
        screen.cursor.shifts[GL] = 1;
        screen.putch('q');
        assert_eq!(glyph(&screen, 1, 0), '\u{2500}');
    }

    #[test]
    fn newline_scrolls_only_at_bottom_margin() {
        let mut screen = screen();
        screen.putch('X');
        screen.warpto(0, 23);
        screen.newline();
        assert_eq!(screen.cursor.y, 23);
        // Row 0 content moved off the top.
        assert_eq!(glyph(&screen, 0, 0), '\0');
    }

    #[test]
    fn scroll_confined_to_region() {
        let mut screen = screen();
        screen.warpto(0, 0);
        screen.putch('T');
        screen.warpto(0, 5);
        screen.putch('M');
        screen.warpto(0, 23);
        screen.putch('B');
        screen.set_scroll_region(4, 10);
        screen.warpto(0, 10);
        screen.newline();
        // Inside the region line 5 moved up to line 4.
        assert_eq!(glyph(&screen, 0, 4), 'M');
        assert_eq!(glyph(&screen, 0, 10), '\0');
        // Outside the region nothing moved.
        assert_eq!(glyph(&screen, 0, 0), 'T');
        assert_eq!(glyph(&screen, 0, 23), 'B');
    }

    #[test]
    fn revline_scrolls_down_at_top_margin() {
        let mut screen = screen();
        screen.putch('A');
        screen.warpto(0, 0);
        screen.revline();
        assert_eq!(screen.cursor.y, 0);
        assert_eq!(glyph(&screen, 0, 1), 'A');
        assert_eq!(glyph(&screen, 0, 0), '\0');
    }

    #[test]
    fn erase_display_modes() {
        let mut screen = screen();
        for y in 0..24 {
            screen.warpto(0, y as i32);
            screen.putch('x');
            screen.putch('y');
        }
        screen.warpto(1, 10);
        screen.erase_display(0);
        assert_eq!(glyph(&screen, 0, 10), 'x');
        assert_eq!(glyph(&screen, 1, 10), '\0');
        assert_eq!(glyph(&screen, 0, 11), '\0');
        assert_eq!(glyph(&screen, 0, 9), 'x');

        screen.warpto(0, 5);
        screen.erase_display(1);
        assert_eq!(glyph(&screen, 0, 4), '\0');
        assert_eq!(glyph(&screen, 0, 5), '\0');
        assert_eq!(glyph(&screen, 1, 5), 'y');

        screen.erase_display(2);
        assert_eq!(glyph(&screen, 0, 9), '\0');
    }

    #[test]
    fn erased_cells_carry_cursor_attributes() {
        let mut screen = screen();
        screen.putch('A');
        screen.cursor.attrs.background = Color::Indexed(4);
        screen.warpto(0, 0);
        screen.erase_line(2);
        assert_eq!(screen.lines[0].cells[0].attrs.background, Color::Indexed(4));
        assert_eq!(glyph(&screen, 0, 0), '\0');
    }

    #[test]
    fn full_line_erase_resets_dimensions() {
        let mut screen = screen();
        screen.set_line_size(LineSize::DoubleWidth);
        screen.erase_line(0);
        assert_eq!(screen.lines[0].size, LineSize::Single);

        screen.warpto(0, 1);
        screen.set_line_size(LineSize::DoubleHeightTop);
        screen.warpto(5, 1);
        screen.erase_line(0);
        // Partial erase leaves the dimension alone.
        assert_eq!(screen.lines[1].size, LineSize::DoubleHeightTop);
        screen.warpto(79, 1);
        screen.erase_line(1);
        assert_eq!(screen.lines[1].size, LineSize::Single);
    }

    #[test]
    fn delete_character_shifts_left() {
        let mut screen = screen();
        for ch in "abcdef".chars() {
            screen.putch(ch);
        }
        screen.warpto(1, 0);
        screen.delete_character(2);
        assert_eq!(glyph(&screen, 0, 0), 'a');
        assert_eq!(glyph(&screen, 1, 0), 'd');
        assert_eq!(glyph(&screen, 2, 0), 'e');
        assert_eq!(glyph(&screen, 3, 0), 'f');
        assert_eq!(glyph(&screen, 4, 0), '\0');
    }

    #[test]
    fn delete_character_clamps_to_row_end() {
        let mut screen = screen();
        screen.putch('a');
        screen.warpto(79, 0);
        screen.delete_character(500);
        assert_eq!(glyph(&screen, 79, 0), '\0');
        assert_eq!(glyph(&screen, 0, 0), 'a');
    }

    #[test]
    fn tab_advances_to_next_stop() {
        let mut screen = screen();
        screen.tab();
        assert_eq!(screen.cursor.x, 8);
        screen.tab();
        assert_eq!(screen.cursor.x, 16);
        screen.warpto(73, 0);
        screen.tab();
        assert_eq!(screen.cursor.x, 79);
    }

    #[test]
    fn tab_stop_management() {
        let mut screen = screen();
        screen.warpto(3, 0);
        screen.set_tab();
        screen.warpto(0, 0);
        screen.tab();
        assert_eq!(screen.cursor.x, 3);
        screen.clear_tab();
        screen.warpto(0, 0);
        screen.tab();
        assert_eq!(screen.cursor.x, 8);
        screen.clear_all_tabs();
        screen.warpto(0, 0);
        screen.tab();
        assert_eq!(screen.cursor.x, 79);
    }

    #[test]
    fn scroll_region_rejects_inverted_bounds() {
        let mut screen = screen();
        screen.set_scroll_region(5, 15);
        screen.set_scroll_region(12, 12);
        assert_eq!((screen.scroll_top, screen.scroll_bottom), (5, 15));
    }

    #[test]
    fn scroll_region_clamps_bottom() {
        let mut screen = screen();
        screen.set_scroll_region(2, 500);
        assert_eq!((screen.scroll_top, screen.scroll_bottom), (2, 23));
    }

    #[test]
    fn screen_align_fills_grid() {
        let mut screen = screen();
        screen.screen_align();
        assert_eq!(glyph(&screen, 0, 0), 'E');
        assert_eq!(glyph(&screen, 79, 23), 'E');
    }

    #[test]
    fn reset_matches_fresh_screen() {
        let mut screen = screen();
        screen.set_mode(Modes::DECAWM, true);
        screen.set_mode(Modes::DECOM, true);
        screen.set_scroll_region(3, 9);
        screen.cursor.attrs.negative = true;
        for ch in "garbage".chars() {
            screen.putch(ch);
        }
        screen.set_tab();
        screen.saved_cursor = screen.cursor.clone();
        screen.palette.set(0, crate::color::Rgb::new(1, 2, 3));
        screen.reset();
        assert_eq!(screen, Screen::new(80, 24));
    }

    #[test]
    fn line_size_ordering_contract() {
        assert!(LineSize::Single < LineSize::DoubleWidth);
        assert!(LineSize::DoubleHeightTop > LineSize::DoubleWidth);
        assert!(LineSize::DoubleHeightBottom > LineSize::DoubleWidth);
        assert!(LineSize::DoubleHeightTop < LineSize::DoubleHeightBottom);
    }
}
