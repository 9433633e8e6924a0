use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    is_blank_value, DIGITS_PER_MODULE, LANES_PER_HEAT, MAX_POOLS, MODULES_PER_BOARD,
};

/// One character position on a display module
///
/// Values 15 and 32 both mean "blank"; anything else is the character code
/// shown at this position. Mutated in place as digit-value byte pairs arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Digit {
    /// Character code currently displayed (15/32 = blank)
    pub value: u8,
    /// Decimal point lit after this digit
    pub dec_point: bool,
    /// Digit is driven by the segment map rather than a character code
    pub segment_mapped: bool,
    /// Digit has been written at least once this session
    pub updated: bool,
}

impl Default for Digit {
    fn default() -> Self {
        Digit {
            value: super::BLANK_VALUE,
            dec_point: false,
            segment_mapped: false,
            updated: false,
        }
    }
}

impl Digit {
    /// Returns true if this digit shows a blank position.
    pub fn is_blank(&self) -> bool {
        is_blank_value(self.value)
    }
}

/// One addressable display segment on the physical board
#[derive(Debug, Clone, Default, Serialize)]
pub struct Module {
    /// Universal flag: digit reads may be redirected to module 0
    pub univ: bool,
    /// Horn flag from the module selector byte
    pub horn: bool,
    /// Digit positions, indexed 0..=30
    pub digits: [Digit; DIGITS_PER_MODULE],
}

impl Module {
    /// Returns true if any digit of this module has been written.
    pub fn updated(&self) -> bool {
        self.digits.iter().any(|d| d.updated)
    }
}

/// The full digit grid for one pool
#[derive(Debug, Clone, Default, Serialize)]
pub struct Board {
    /// Display modules, indexed 0..=30 (module 31 is the command block)
    pub modules: [Module; MODULES_PER_BOARD],
}

impl Board {
    /// True when module 22 carries a time-of-day readout (digits 5 and 6 lit).
    pub fn showing_time_of_day(&self) -> bool {
        !self.modules[22].digits[5].is_blank() && !self.modules[22].digits[6].is_blank()
    }

    /// True when the first digit of every lane module (1..=10) is blank.
    pub fn is_blanked(&self) -> bool {
        (1..=10).all(|m| self.modules[m].digits[1].is_blank())
    }

    /// Coarse blank classification derived from the grid.
    pub fn blank_state(&self) -> ScoreboardState {
        if !self.is_blanked() {
            ScoreboardState::NotBlank
        } else if self.showing_time_of_day() {
            ScoreboardState::BlankWithTime
        } else {
            ScoreboardState::TotalBlank
        }
    }
}

/// Coarse scoreboard state for one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardState {
    /// Nothing classified yet this session
    None,
    /// Live data on the board
    NotBlank,
    /// Board blanked but showing time of day
    BlankWithTime,
    /// Board fully blank
    TotalBlank,
    /// Reset dots lit
    Reset,
    /// Race clock running
    Running,
}

/// Timing mode reported by the console
///
/// Only swimming semantics are decoded; `Loader` is the idle mode the
/// console starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sport {
    Loader,
    Swimming,
}

/// A swimmer entry in a heat's start list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lane {
    /// Lane number, 1..=12
    pub number: u8,
    pub last_name: String,
    /// Carried for completeness; no known command populates it
    pub first_name: String,
    pub team: String,
}

impl Lane {
    fn new(number: u8) -> Self {
        Lane {
            number,
            last_name: String::new(),
            first_name: String::new(),
            team: String::new(),
        }
    }
}

/// One heat of an event, always holding exactly 12 lanes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heat {
    pub lanes: [Lane; LANES_PER_HEAT],
    /// True once any lane carries a non-blank last name
    pub has_data: bool,
}

impl Default for Heat {
    fn default() -> Self {
        Heat {
            lanes: std::array::from_fn(|i| Lane::new(i as u8 + 1)),
            has_data: false,
        }
    }
}

/// A swimming event with its heats and title
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SwimEvent {
    pub title: String,
    /// Record strings shown alongside the event
    pub records: [String; 4],
    /// Heats keyed by heat number, created lazily and never evicted
    pub heats: HashMap<u16, Heat>,
    /// True once any heat has start-list data
    pub has_data: bool,
}

/// Meet metadata for one pool
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Meet {
    pub title: String,
    /// Events keyed by event number, created lazily and never evicted
    pub events: HashMap<u16, SwimEvent>,
    /// Labels for the record slots
    pub record_tags: [String; 4],
    /// True once the console has sent any meet data
    pub has_data: bool,
}

/// A decoded state-change notification
///
/// Delivered to subscribers synchronously, in the exact order the bytes
/// producing them were parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreboardEvent {
    /// The current event number changed (both event and heat are non-zero)
    EventChange { pool: usize, event: u16, heat: u16 },
    /// The current heat number changed under the same event
    HeatChange { pool: usize, event: u16, heat: u16 },
    /// Reset dots lit while timing swimming
    Reset { pool: usize },
    /// Board transitioned into Running (suppressed for the very first
    /// classification of a session)
    Start { pool: usize },
    /// Board went fully blank
    Blank { pool: usize },
    /// Board blanked but still showing time of day
    BlankWithTime { pool: usize },
}

/// Decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Number of pools to track, 1..=4
    pub pools: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig { pools: 1 }
    }
}

impl DecoderConfig {
    /// Pool count clamped to the supported range.
    pub fn pool_count(&self) -> usize {
        self.pools.clamp(1, MAX_POOLS)
    }
}

/// Serial link configuration
///
/// The Gen7 console speaks 115200 8N1; only the device path normally needs
/// changing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial device path
    pub device: String,
    /// Baud rate
    pub baud_rate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        SerialConfig {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_defaults_blank() {
        let digit = Digit::default();
        assert!(digit.is_blank());
        assert!(!digit.updated);
    }

    #[test]
    fn test_blank_sentinels() {
        let mut digit = Digit::default();
        digit.value = 32;
        assert!(digit.is_blank());
        digit.value = b'5';
        assert!(!digit.is_blank());
    }

    #[test]
    fn test_board_blank_classification() {
        let mut board = Board::default();
        assert!(board.is_blanked());
        assert_eq!(board.blank_state(), ScoreboardState::TotalBlank);

        // Time of day on module 22 upgrades the classification
        board.modules[22].digits[5].value = b'1';
        board.modules[22].digits[6].value = b'2';
        assert_eq!(board.blank_state(), ScoreboardState::BlankWithTime);

        // Any lane module with a lit first digit means live data
        board.modules[3].digits[1].value = b'7';
        assert_eq!(board.blank_state(), ScoreboardState::NotBlank);
    }

    #[test]
    fn test_heat_preallocates_lanes() {
        let heat = Heat::default();
        assert_eq!(heat.lanes.len(), 12);
        assert_eq!(heat.lanes[0].number, 1);
        assert_eq!(heat.lanes[11].number, 12);
        assert!(!heat.has_data);
    }

    #[test]
    fn test_config_pool_clamp() {
        assert_eq!(DecoderConfig { pools: 0 }.pool_count(), 1);
        assert_eq!(DecoderConfig { pools: 2 }.pool_count(), 2);
        assert_eq!(DecoderConfig { pools: 9 }.pool_count(), 4);
    }

    #[test]
    fn test_event_serialization() {
        let event = ScoreboardEvent::HeatChange {
            pool: 0,
            event: 3,
            heat: 2,
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ScoreboardEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
