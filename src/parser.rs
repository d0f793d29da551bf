//! DEC ANSI parser state machine.
//!
//! The states and transitions follow Paul Flo Williams' VT500-series
//! parser flowchart. The parser owns nothing but the sequence being
//! collected (intermediates, numeric parameters, OSC buffer); every
//! classified byte is forwarded as an action to a [`Dispatch`]
//! implementation, which owns all terminal state.

/// Maximum number of numeric parameters retained per control sequence.
pub const MAX_PARAMETERS: usize = 16;
/// Ceiling applied to each numeric parameter.
pub const PARAMETER_MAX: u16 = 16383;
/// OSC strings longer than this are truncated.
const OSC_CAPACITY: usize = 510;

/// Parser states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum State {
    #[default]
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    OscString,
    SosString,
    PmString,
    ApcString,
}

/// Collected intermediate bytes. At most two are retained; further ones
/// poison the sequence so dispatchers reject it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Intermediates {
    bytes: [u8; 2],
    len: u8,
    overflowed: bool,
}

impl Intermediates {
    fn push(&mut self, byte: u8) {
        if (self.len as usize) < self.bytes.len() {
            self.bytes[self.len as usize] = byte;
            self.len += 1;
        } else {
            self.overflowed = true;
        }
    }

    /// The first collected byte, if any.
    pub fn first(&self) -> Option<u8> {
        (self.len > 0).then(|| self.bytes[0])
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True when more intermediates arrived than the parser retains.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

/// Collected numeric parameters. A missing or empty parameter reads as
/// zero; dispatchers substitute their documented defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Params {
    values: [u16; MAX_PARAMETERS],
    index: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            values: [0; MAX_PARAMETERS],
            index: 0,
        }
    }
}

impl Params {
    /// Accept a parameter byte: a digit or the `;` separator.
    fn accept(&mut self, byte: u8) {
        if byte == b';' {
            // Past the final slot, further parameters keep accumulating
            // into it.
            if self.index < MAX_PARAMETERS - 1 {
                self.index += 1;
            }
        } else {
            let slot = &mut self.values[self.index];
            let value = *slot as u32 * 10 + (byte - b'0') as u32;
            *slot = value.min(PARAMETER_MAX as u32) as u16;
        }
    }

    /// Number of parameter slots seen (at least one).
    pub fn len(&self) -> usize {
        self.index + 1
    }

    /// Raw parameter value; zero when absent.
    pub fn raw(&self, i: usize) -> u16 {
        if i < self.len() {
            self.values[i]
        } else {
            0
        }
    }

    /// Parameter `i` with `default` substituted when absent or zero.
    pub fn get(&self, i: usize, default: u16) -> u16 {
        match self.raw(i) {
            0 => default,
            value => value,
        }
    }

    /// The seen parameters as a slice.
    pub fn as_slice(&self) -> &[u16] {
        &self.values[..self.len()]
    }
}

/// Receiver of parser actions. The interpreter implements this; tests
/// substitute recorders.
pub trait Dispatch {
    /// A C0 control (or DEL), inside or outside a sequence.
    fn execute(&mut self, byte: u8);
    /// A printable byte in ground state. Raw: UTF-8 assembly is the
    /// receiver's concern.
    fn print(&mut self, byte: u8);
    /// CAN or SUB aborted a sequence; display a replacement character.
    fn substitute(&mut self);
    /// Final byte of an escape sequence.
    fn esc_dispatch(&mut self, intermediates: &Intermediates, byte: u8);
    /// Final byte of a control sequence.
    fn csi_dispatch(&mut self, intermediates: &Intermediates, params: &Params, byte: u8);
    /// A complete OSC string: command prefix and data, unsplit.
    fn osc_dispatch(&mut self, data: &[u8]);
}

/// The state machine.
#[derive(Clone, Debug, Default)]
pub struct Parser {
    state: State,
    intermediates: Intermediates,
    params: Params,
    osc: Vec<u8>,
}

impl Parser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state; exposed for inspection.
    pub fn state(&self) -> State {
        self.state
    }

    /// Feed a chunk of bytes.
    pub fn feed<D: Dispatch>(&mut self, bytes: &[u8], dispatch: &mut D) {
        for &byte in bytes {
            self.advance(byte, dispatch);
        }
    }

    /// Feed one byte through the state machine.
    pub fn advance<D: Dispatch>(&mut self, byte: u8, dispatch: &mut D) {
        // CAN and SUB abort any sequence in progress and display a
        // replacement character.
        if byte == 0x18 || byte == 0x1A {
            self.state = State::Ground;
            dispatch.substitute();
            return;
        }

        // ESC restarts sequence collection from any state. A running OSC
        // string is dispatched first, so that ST (ESC \) terminates it.
        if byte == 0x1B {
            if self.state == State::OscString {
                dispatch.osc_dispatch(&self.osc);
            }
            self.intermediates = Intermediates::default();
            self.params = Params::default();
            self.state = State::Escape;
            return;
        }

        match self.state {
            State::Ground => match byte {
                0x00..=0x1F | 0x7F => dispatch.execute(byte),
                _ => dispatch.print(byte),
            },

            State::Escape => match byte {
                0x00..=0x1F => dispatch.execute(byte),
                0x20..=0x2F => {
                    self.intermediates.push(byte);
                    self.state = State::EscapeIntermediate;
                }
                0x50 => self.state = State::DcsEntry,
                0x58 => self.state = State::SosString,
                0x5B => self.state = State::CsiEntry,
                0x5D => {
                    self.osc.clear();
                    self.state = State::OscString;
                }
                0x5E => self.state = State::PmString,
                0x5F => self.state = State::ApcString,
                0x30..=0x7E => {
                    self.state = State::Ground;
                    dispatch.esc_dispatch(&self.intermediates, byte);
                }
                _ => {}
            },

            State::EscapeIntermediate => match byte {
                0x00..=0x1F => dispatch.execute(byte),
                0x20..=0x2F => self.intermediates.push(byte),
                0x30..=0x7E => {
                    self.state = State::Ground;
                    dispatch.esc_dispatch(&self.intermediates, byte);
                }
                _ => {}
            },

            State::CsiEntry => match byte {
                0x00..=0x1F => dispatch.execute(byte),
                0x20..=0x2F => {
                    self.intermediates.push(byte);
                    self.state = State::CsiIntermediate;
                }
                0x3A => self.state = State::CsiIgnore,
                0x30..=0x39 | 0x3B => {
                    self.params.accept(byte);
                    self.state = State::CsiParam;
                }
                // Private markers collect as intermediates.
                0x3C..=0x3F => {
                    self.intermediates.push(byte);
                    self.state = State::CsiParam;
                }
                0x40..=0x7E => {
                    self.state = State::Ground;
                    dispatch.csi_dispatch(&self.intermediates, &self.params, byte);
                }
                _ => {}
            },

            State::CsiParam => match byte {
                0x00..=0x1F => dispatch.execute(byte),
                0x20..=0x2F => {
                    self.intermediates.push(byte);
                    self.state = State::CsiIntermediate;
                }
                0x3A => self.state = State::CsiIgnore,
                0x30..=0x39 | 0x3B => self.params.accept(byte),
                0x3C..=0x3F => self.state = State::CsiIgnore,
                0x40..=0x7E => {
                    self.state = State::Ground;
                    dispatch.csi_dispatch(&self.intermediates, &self.params, byte);
                }
                _ => {}
            },

            State::CsiIntermediate => match byte {
                0x00..=0x1F => dispatch.execute(byte),
                0x20..=0x2F => self.intermediates.push(byte),
                // A parameter byte after an intermediate is malformed.
                0x30..=0x3F => self.state = State::CsiIgnore,
                0x40..=0x7E => {
                    self.state = State::Ground;
                    dispatch.csi_dispatch(&self.intermediates, &self.params, byte);
                }
                _ => {}
            },

            State::CsiIgnore => match byte {
                0x00..=0x1F => dispatch.execute(byte),
                0x40..=0x7E => self.state = State::Ground,
                _ => {}
            },

            // DCS sequences are collected structurally but never
            // executed; the payload is discarded.
            State::DcsEntry => match byte {
                0x20..=0x2F => self.state = State::DcsIntermediate,
                0x3A => self.state = State::DcsIgnore,
                0x30..=0x3B => self.state = State::DcsParam,
                0x3C..=0x3F => self.state = State::DcsParam,
                0x40..=0x7E => self.state = State::DcsPassthrough,
                _ => {}
            },

            State::DcsParam => match byte {
                0x20..=0x2F => self.state = State::DcsIntermediate,
                0x30..=0x39 | 0x3B => {}
                0x3A | 0x3C..=0x3F => self.state = State::DcsIgnore,
                0x40..=0x7E => self.state = State::DcsPassthrough,
                _ => {}
            },

            State::DcsIntermediate => match byte {
                0x20..=0x2F => {}
                0x30..=0x3F => self.state = State::DcsIgnore,
                0x40..=0x7E => self.state = State::DcsPassthrough,
                _ => {}
            },

            State::DcsPassthrough | State::DcsIgnore => {}

            State::OscString => match byte {
                0x07 => {
                    self.state = State::Ground;
                    dispatch.osc_dispatch(&self.osc);
                }
                // High bytes are kept so UTF-8 titles survive.
                0x20..=0xFF => {
                    if self.osc.len() < OSC_CAPACITY {
                        self.osc.push(byte);
                    }
                }
                _ => {}
            },

            State::SosString | State::PmString | State::ApcString => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Action {
        Execute(u8),
        Print(u8),
        Substitute,
        Esc(Vec<u8>, u8),
        Csi(Vec<u8>, Vec<u16>, u8, bool),
        Osc(Vec<u8>),
    }

    #[derive(Default)]
    struct Recorder {
        actions: Vec<Action>,
    }

    impl Dispatch for Recorder {
        fn execute(&mut self, byte: u8) {
            self.actions.push(Action::Execute(byte));
        }

        fn print(&mut self, byte: u8) {
            self.actions.push(Action::Print(byte));
        }

        fn substitute(&mut self) {
            self.actions.push(Action::Substitute);
        }

        fn esc_dispatch(&mut self, intermediates: &Intermediates, byte: u8) {
            self.actions
                .push(Action::Esc(intermediates.as_slice().to_vec(), byte));
        }

        fn csi_dispatch(&mut self, intermediates: &Intermediates, params: &Params, byte: u8) {
            self.actions.push(Action::Csi(
                intermediates.as_slice().to_vec(),
                params.as_slice().to_vec(),
                byte,
                intermediates.overflowed(),
            ));
        }

        fn osc_dispatch(&mut self, data: &[u8]) {
            self.actions.push(Action::Osc(data.to_vec()));
        }
    }

    fn run(bytes: &[u8]) -> Vec<Action> {
        let mut parser = Parser::new();
        let mut recorder = Recorder::default();
        parser.feed(bytes, &mut recorder);
        recorder.actions
    }

    #[test]
    fn ground_prints_and_executes() {
        let actions = run(b"a\nb");
        assert_eq!(
            actions,
            vec![
                Action::Print(b'a'),
                Action::Execute(0x0A),
                Action::Print(b'b'),
            ]
        );
    }

    #[test]
    fn plain_escape_dispatches() {
        let actions = run(b"\x1bD");
        assert_eq!(actions, vec![Action::Esc(vec![], b'D')]);
    }

    #[test]
    fn escape_intermediate_collects() {
        let actions = run(b"\x1b#8\x1b(B");
        assert_eq!(
            actions,
            vec![
                Action::Esc(vec![b'#'], b'8'),
                Action::Esc(vec![b'('], b'B'),
            ]
        );
    }

    #[test]
    fn csi_collects_parameters() {
        let actions = run(b"\x1b[5;10H");
        assert_eq!(actions, vec![Action::Csi(vec![], vec![5, 10], b'H', false)]);
    }

    #[test]
    fn csi_without_parameters_reads_zero() {
        let actions = run(b"\x1b[m");
        assert_eq!(actions, vec![Action::Csi(vec![], vec![0], b'm', false)]);
    }

    #[test]
    fn csi_private_marker_is_collected() {
        let actions = run(b"\x1b[?25h");
        assert_eq!(actions, vec![Action::Csi(vec![b'?'], vec![25], b'h', false)]);
    }

    #[test]
    fn csi_parameters_clamp_at_ceiling() {
        let actions = run(b"\x1b[99999999A");
        assert_eq!(
            actions,
            vec![Action::Csi(vec![], vec![PARAMETER_MAX], b'A', false)]
        );
    }

    #[test]
    fn excess_parameters_accumulate_in_last_slot() {
        let mut sequence = b"\x1b[".to_vec();
        for n in 1..=18 {
            sequence.extend_from_slice(format!("{};", n).as_bytes());
        }
        sequence.push(b'm');
        let actions = run(&sequence);
        match &actions[0] {
            Action::Csi(_, params, b'm', _) => {
                assert_eq!(params.len(), MAX_PARAMETERS);
                assert_eq!(params[..15], (1..=15).collect::<Vec<u16>>()[..]);
                // 16, 17 and 18 all accumulated into the final slot;
                // the running value hit the ceiling along the way.
                assert_eq!(params[15], PARAMETER_MAX);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn colon_poisons_control_sequence() {
        let actions = run(b"\x1b[38:2:1:2:3mX");
        assert_eq!(actions, vec![Action::Print(b'X')]);
    }

    #[test]
    fn parameter_after_intermediate_poisons_sequence() {
        let actions = run(b"\x1b[1 5qX");
        assert_eq!(actions, vec![Action::Print(b'X')]);
    }

    #[test]
    fn too_many_intermediates_flagged() {
        let actions = run(b"\x1b[ !\"q");
        assert_eq!(
            actions,
            vec![Action::Csi(vec![b' ', b'!'], vec![0], b'q', true)]
        );
    }

    #[test]
    fn execute_passes_through_mid_sequence() {
        let actions = run(b"\x1b[1\n2H");
        assert_eq!(
            actions,
            vec![
                Action::Execute(0x0A),
                Action::Csi(vec![], vec![12], b'H', false),
            ]
        );
    }

    #[test]
    fn cancel_aborts_sequence() {
        let actions = run(b"\x1b[12\x18X");
        assert_eq!(actions, vec![Action::Substitute, Action::Print(b'X')]);
    }

    #[test]
    fn osc_terminated_by_bel() {
        let actions = run(b"\x1b]0;hello\x07");
        assert_eq!(actions, vec![Action::Osc(b"0;hello".to_vec())]);
    }

    #[test]
    fn osc_terminated_by_st() {
        let actions = run(b"\x1b]2;title\x1b\\");
        assert_eq!(
            actions,
            vec![Action::Osc(b"2;title".to_vec()), Action::Esc(vec![], b'\\')]
        );
    }

    #[test]
    fn escape_mid_osc_dispatches_before_restarting() {
        let actions = run(b"\x1b]0;partial\x1b[2J");
        assert_eq!(
            actions,
            vec![
                Action::Osc(b"0;partial".to_vec()),
                Action::Csi(vec![], vec![2], b'J', false),
            ]
        );
    }

    #[test]
    fn sos_pm_apc_consumed_silently() {
        let actions = run(b"\x1bXsecret\x1b\\\x1b^pm\x1b\\\x1b_apc\x1b\\x");
        assert_eq!(
            actions,
            vec![
                Action::Esc(vec![], b'\\'),
                Action::Esc(vec![], b'\\'),
                Action::Esc(vec![], b'\\'),
                Action::Print(b'x'),
            ]
        );
    }

    #[test]
    fn dcs_consumed_without_execution() {
        let actions = run(b"\x1bP1;2|data\x1b\\y");
        assert_eq!(
            actions,
            vec![Action::Esc(vec![], b'\\'), Action::Print(b'y')]
        );
    }

    #[test]
    fn parameters_reset_between_sequences() {
        let actions = run(b"\x1b[5A\x1b[B");
        assert_eq!(
            actions,
            vec![
                Action::Csi(vec![], vec![5], b'A', false),
                Action::Csi(vec![], vec![0], b'B', false),
            ]
        );
    }

    #[test]
    fn high_bytes_print_in_ground() {
        // UTF-8 for 'é'.
        let actions = run(&[0xC3, 0xA9]);
        assert_eq!(actions, vec![Action::Print(0xC3), Action::Print(0xA9)]);
    }
}
