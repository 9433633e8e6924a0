//! Module/digit state machine, frame application, and state classification
//!
//! [`Gen7Decoder`] is the single entry point for the byte stream: it owns the
//! primary descrambler, the framer, the per-pool digit grids and meet
//! metadata, and the subscriber channels events are delivered on. Processing
//! is strictly synchronous and in arrival order; nothing here blocks or
//! reorders.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::core::types::{
    Board, DecoderConfig, Meet, ScoreboardEvent, ScoreboardState, Sport,
};
use crate::core::{COMMAND_MODULE, DIGITS_PER_MODULE, MODULES_PER_BOARD};
use super::descrambler::Descrambler;
use super::framer::{Frame, Framer};

/// Extended-frame signature: a command-module marker followed by one of the
/// two sub-frame type bytes the console emits.
const EXTENDED_MARKER: u8 = 0x9F;
const EXTENDED_TYPES: [u8; 2] = [17, 19];

/// Per-pool decoded state
#[derive(Debug)]
pub(crate) struct PoolState {
    pub board: Board,
    pub event_number: u16,
    pub heat_number: u16,
    pub sport: Sport,
    pub state: ScoreboardState,
    pub meet: Meet,
}

impl PoolState {
    fn new() -> Self {
        PoolState {
            board: Board::default(),
            event_number: 0,
            heat_number: 0,
            sport: Sport::Loader,
            state: ScoreboardState::None,
            meet: Meet::default(),
        }
    }
}

/// Incremental decoder for the Gen7 console stream
pub struct Gen7Decoder {
    descrambler: Descrambler,
    framer: Framer,
    pub(crate) pools: Vec<PoolState>,
    // Module/digit machine state; shared across pools, as it is on the wire
    current_module: u8,
    current_digit: u8,
    first_of_pair: bool,
    skip_data: bool,
    in_module_command: bool,
    command_buf: Vec<u8>,
    // Start-list target set by command id 2, used by ids 3 and 4
    pub(crate) start_list_event: u16,
    pub(crate) start_list_heat: u16,
    subscribers: Vec<mpsc::UnboundedSender<ScoreboardEvent>>,
}

impl Gen7Decoder {
    /// Creates a decoder tracking the configured number of pools.
    pub fn new(config: DecoderConfig) -> Self {
        Gen7Decoder {
            descrambler: Descrambler::new(),
            framer: Framer::new(),
            pools: (0..config.pool_count()).map(|_| PoolState::new()).collect(),
            current_module: 0,
            current_digit: 0,
            first_of_pair: true,
            skip_data: false,
            in_module_command: false,
            command_buf: Vec::new(),
            start_list_event: 0,
            start_list_heat: 0,
            subscribers: Vec::new(),
        }
    }

    /// Registers an event subscriber. Subscribe before feeding bytes;
    /// events are delivered synchronously in parse order.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ScoreboardEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Processes one chunk of raw bytes from the transport, byte by byte,
    /// to completion. The digit grid is a consistent snapshot whenever this
    /// returns.
    pub fn feed(&mut self, chunk: &[u8]) {
        for &raw in chunk {
            let descrambled = self.descrambler.next(raw);
            if let Some(frame) = self.framer.feed(raw, descrambled) {
                self.apply_frame(frame);
            }
        }
    }

    /// Number of pools this decoder tracks.
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Digit grid for a pool.
    pub fn board(&self, pool: usize) -> Option<&Board> {
        self.pools.get(pool).map(|p| &p.board)
    }

    /// Meet metadata for a pool.
    pub fn meet(&self, pool: usize) -> Option<&Meet> {
        self.pools.get(pool).map(|p| &p.meet)
    }

    /// Current event number shown on a pool's board.
    pub fn event_number(&self, pool: usize) -> Option<u16> {
        self.pools.get(pool).map(|p| p.event_number)
    }

    /// Current heat number shown on a pool's board.
    pub fn heat_number(&self, pool: usize) -> Option<u16> {
        self.pools.get(pool).map(|p| p.heat_number)
    }

    /// Current coarse scoreboard state of a pool.
    pub fn state(&self, pool: usize) -> Option<ScoreboardState> {
        self.pools.get(pool).map(|p| p.state)
    }

    /// Sport the console is currently timing on a pool.
    pub fn sport(&self, pool: usize) -> Option<Sport> {
        self.pools.get(pool).map(|p| p.sport)
    }

    /// Applies a checksum-validated frame to the model.
    ///
    /// A frame opening with the extended marker carries a nested sub-frame:
    /// its pool number, a seed byte for a fresh descrambler, a payload, and
    /// its own additive checksum over every descrambled byte but the last.
    /// Only a validated sub-frame touches the grid, and it targets the pool
    /// named in the sub-frame rather than pool 0.
    fn apply_frame(&mut self, frame: Frame) {
        let bytes = frame.bytes;
        let n = frame.data_count;
        if bytes.len() >= 4
            && bytes.len() == n
            && bytes[0] == EXTENDED_MARKER
            && EXTENDED_TYPES.contains(&bytes[1])
        {
            let pool = bytes[2].wrapping_sub(1) as usize;
            let mut sub = Descrambler::new();
            let first = sub.next(bytes[3] | 0x80);
            let mut payload = vec![first];
            let mut sum = first;
            for idx in 1..n.saturating_sub(4) {
                let b = sub.next(bytes[3 + idx]);
                // Position 1 is the sub-frame's keystream stride byte; it
                // participates in the checksum but is not payload
                if idx != 1 {
                    payload.push(b);
                }
                sum = sum.wrapping_add(b);
            }
            let trailer = sub.next(bytes[n - 1]);
            if sum & 0x7F == trailer {
                trace!(pool, len = payload.len(), "applying extended frame");
                for b in payload {
                    self.parse_board_byte(b, pool);
                }
            } else {
                debug!(pool, "extended frame checksum mismatch, discarding");
            }
            return;
        }
        // Ordinary frame: every buffered byte, marker included, feeds the
        // module/digit machine at pool 0
        for &b in &bytes {
            self.parse_board_byte(b, 0);
        }
    }

    /// One step of the module/digit state machine.
    ///
    /// A byte with the high bit set selects a module (finalizing the effects
    /// of the previous one first); low bytes are either command-block data
    /// or digit index/value pairs.
    fn parse_board_byte(&mut self, byte: u8, pool: usize) {
        if byte & 0x80 != 0 {
            self.finish_module(pool);
            self.current_module = byte & 0x1F;
            if self.current_module == COMMAND_MODULE {
                self.in_module_command = true;
                self.command_buf.clear();
            } else {
                if let Some(ps) = self.pools.get_mut(pool) {
                    let module = &mut ps.board.modules[self.current_module as usize];
                    module.univ = byte & 0x40 != 0;
                    module.horn = byte & 0x20 != 0;
                }
                self.first_of_pair = true;
                self.skip_data = false;
                self.in_module_command = false;
            }
        } else if self.in_module_command {
            self.command_buf.push(byte);
        } else if self.skip_data {
            // Reserved digit-index-31 marker: discard data until the next
            // module selector. Purpose undocumented; behavior preserved.
        } else if self.first_of_pair {
            self.current_digit = byte & 0x1F;
            if let Some(digit) = self.current_digit_mut(pool) {
                digit.dec_point = byte & 0x40 != 0;
                digit.segment_mapped = byte & 0x20 != 0;
            }
            self.first_of_pair = false;
            if self.current_digit as usize >= DIGITS_PER_MODULE {
                self.skip_data = true;
            }
        } else {
            if let Some(digit) = self.current_digit_mut(pool) {
                // Zero is the wire's blank; normalize to the blank sentinel
                let value = if byte == 0 { 32 } else { byte };
                digit.value = value & 0x7F;
                digit.updated = true;
            }
            self.first_of_pair = true;
        }
    }

    /// Bounds-checked access to the digit addressed by the machine state.
    fn current_digit_mut(&mut self, pool: usize) -> Option<&mut crate::core::types::Digit> {
        let module = self.current_module as usize;
        let digit = self.current_digit as usize;
        if module >= MODULES_PER_BOARD || digit >= DIGITS_PER_MODULE {
            return None;
        }
        self.pools
            .get_mut(pool)
            .map(|ps| &mut ps.board.modules[module].digits[digit])
    }

    /// Finalizes the semantic effects of the module whose data just ended.
    fn finish_module(&mut self, pool: usize) {
        match self.current_module {
            // Module 15 closes a display refresh cycle: classify the board
            15 => self.classify(pool),
            1 => self.detect_sport(pool),
            // Lane modules 2..=10 carry no boundary semantics of their own
            2..=10 => {}
            12 => self.refresh_event_heat(pool),
            COMMAND_MODULE => {
                let cmd = std::mem::take(&mut self.command_buf);
                self.interpret_command(&cmd);
            }
            _ => {}
        }
    }

    /// Sport detection stub: the consoles seen so far always time swimming.
    fn detect_sport(&mut self, pool: usize) {
        if let Some(ps) = self.pools.get_mut(pool) {
            ps.sport = Sport::Swimming;
        }
    }

    /// True when the reset dots are lit: the decimal point on digit 1 of any
    /// of modules 1..=9, or of module 15.
    pub(crate) fn reset_dots_lit(&self, pool: usize) -> bool {
        let Some(ps) = self.pools.get(pool) else {
            return false;
        };
        (1..10).any(|m| ps.board.modules[m].digits[1].dec_point)
            || ps.board.modules[15].digits[1].dec_point
    }

    /// Bounds-checked decimal-point lookup.
    pub(crate) fn dec_point_lit(&self, pool: usize, module: usize, digit: usize) -> bool {
        self.pools
            .get(pool)
            .and_then(|ps| ps.board.modules.get(module))
            .and_then(|m| m.digits.get(digit))
            .map(|d| d.dec_point)
            .unwrap_or(false)
    }

    /// Derives the coarse state after a module-15 refresh and records it,
    /// emitting a notification when it changed.
    fn classify(&mut self, pool: usize) {
        let Some(ps) = self.pools.get(pool) else {
            return;
        };
        let sport = ps.sport;
        if self.reset_dots_lit(pool) && sport == Sport::Swimming {
            self.set_state(pool, ScoreboardState::Reset);
            return;
        }
        let blank = ps.board.blank_state();
        match blank {
            ScoreboardState::BlankWithTime | ScoreboardState::TotalBlank => {
                self.set_state(pool, blank);
            }
            _ if sport == Sport::Swimming => {
                self.set_state(pool, ScoreboardState::Running);
            }
            _ => {}
        }
    }

    /// Records a coarse state, emitting the matching notification only on an
    /// actual change. The very first transition into Running is suppressed
    /// so a session does not open with a spurious start event.
    fn set_state(&mut self, pool: usize, value: ScoreboardState) {
        let Some(ps) = self.pools.get_mut(pool) else {
            return;
        };
        let prev = ps.state;
        ps.state = value;
        if value == prev {
            return;
        }
        let event = match value {
            ScoreboardState::Reset => Some(ScoreboardEvent::Reset { pool }),
            ScoreboardState::Running if prev != ScoreboardState::None => {
                Some(ScoreboardEvent::Start { pool })
            }
            ScoreboardState::BlankWithTime => Some(ScoreboardEvent::BlankWithTime { pool }),
            ScoreboardState::TotalBlank => Some(ScoreboardEvent::Blank { pool }),
            _ => None,
        };
        if let Some(event) = event {
            self.emit(event);
        }
    }

    /// Re-reads the event and heat numbers from module 12 and emits a change
    /// notification when one of them moved.
    fn refresh_event_heat(&mut self, pool: usize) {
        let event = parse_number(&self.digit_string(pool, 12, 1, 3, None, None));
        let heat = parse_number(&self.digit_string(pool, 12, 7, 3, None, None));
        let Some(ps) = self.pools.get_mut(pool) else {
            return;
        };
        let notify = if ps.event_number != event {
            ps.event_number = event;
            ps.heat_number = heat;
            Some(ScoreboardEvent::EventChange { pool, event, heat })
        } else if ps.heat_number != heat {
            ps.event_number = event;
            ps.heat_number = heat;
            Some(ScoreboardEvent::HeatChange { pool, event, heat })
        } else {
            None
        };
        let sport = ps.sport;
        if let Some(notify) = notify {
            if event != 0 && heat != 0 && sport == Sport::Swimming {
                self.emit(notify);
            }
        }
    }

    /// Delivers an event to every live subscriber, pruning closed ones.
    fn emit(&mut self, event: ScoreboardEvent) {
        trace!(?event, "emitting");
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}

/// Parses the leading decimal digits of a trimmed display string, yielding
/// zero for anything unparseable (a blank or partially drawn field).
fn parse_number(s: &str) -> u16 {
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
