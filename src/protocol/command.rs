//! Command-block interpreter for meet metadata
//!
//! Module 31 carries no digits; its payload bytes accumulate into a command
//! buffer that is interpreted whenever the block ends. Commands populate the
//! meet/event/heat/lane metadata: titles, start lists, and data-ready flags.
//! Text arrives in an escaped form because the wire reserves the high bit:
//! 0x7F escapes the following byte, which is decoded with its high bit set.
//!
//! Malformed commands and lookups that miss are dropped without touching
//! existing state; a bad command must never stall the byte stream behind it.

use tracing::trace;

use crate::core::types::Heat;
use super::decoder::Gen7Decoder;

impl Gen7Decoder {
    /// Interprets one flushed command buffer.
    ///
    /// Byte 0 is the command id and byte 1 the 1-based pool number; the rest
    /// is per-command. Unknown ids are ignored.
    pub(crate) fn interpret_command(&mut self, cmd: &[u8]) {
        if cmd.len() <= 1 {
            return;
        }
        let pool = (cmd[1] as usize).wrapping_sub(1);
        match cmd[0] {
            1 => self.command_meet_title(pool, cmd),
            2 => self.command_start_list(pool, cmd),
            3 => self.command_lane_entry(pool, cmd),
            4 => self.command_event_ready(pool),
            id => trace!(id, "ignoring unknown command"),
        }
    }

    /// Command 1: meet title.
    fn command_meet_title(&mut self, pool: usize, cmd: &[u8]) {
        if cmd.len() < 3 {
            return;
        }
        let length = cmd[2] as usize;
        let title = decode_text(cmd, 3, length);
        if let Some(ps) = self.pools.get_mut(pool) {
            ps.meet.title = title;
            ps.meet.has_data = true;
        }
    }

    /// Command 2: start-list target and event title. The event and heat it
    /// names become the target for subsequent lane entries and are created
    /// on first reference.
    fn command_start_list(&mut self, pool: usize, cmd: &[u8]) {
        if cmd.len() < 7 {
            return;
        }
        let event = u16::from_be_bytes([cmd[2], cmd[3]]);
        let heat = u16::from_be_bytes([cmd[4], cmd[5]]);
        self.start_list_event = event;
        self.start_list_heat = heat;
        let length = cmd[6] as usize;
        let title = decode_text(cmd, 7, length);
        if let Some(ps) = self.pools.get_mut(pool) {
            let swim_event = ps.meet.events.entry(event).or_default();
            swim_event.heats.entry(heat).or_insert_with(Heat::default);
            swim_event.title = title;
        }
    }

    /// Command 3: one lane of the targeted heat's start list.
    fn command_lane_entry(&mut self, pool: usize, cmd: &[u8]) {
        if cmd.len() < 5 {
            return;
        }
        let lane = cmd[2] as usize;
        let last_len = cmd[3] as usize;
        let team_len = cmd[4] as usize;
        // One reserved byte sits between the lengths and the text
        let last_name = decode_text(cmd, 6, last_len);
        let team = decode_text(cmd, 6 + last_len, team_len);
        let (event, heat_number) = (self.start_list_event, self.start_list_heat);
        let Some(ps) = self.pools.get_mut(pool) else {
            return;
        };
        let Some(heat) = ps
            .meet
            .events
            .get_mut(&event)
            .and_then(|e| e.heats.get_mut(&heat_number))
        else {
            trace!(event, heat_number, "lane entry for unknown start list");
            return;
        };
        let Some(entry) = heat.lanes.get_mut(lane) else {
            trace!(lane, "lane index out of range");
            return;
        };
        entry.last_name = last_name;
        entry.team = team;
        heat.has_data = heat.lanes.iter().any(|l| !l.last_name.trim().is_empty());
    }

    /// Command 4: mark the targeted event ready once any heat has data.
    fn command_event_ready(&mut self, pool: usize) {
        let event = self.start_list_event;
        let Some(ps) = self.pools.get_mut(pool) else {
            return;
        };
        if let Some(swim_event) = ps.meet.events.get_mut(&event) {
            swim_event.has_data = swim_event.heats.values().any(|h| h.has_data);
        }
    }
}

/// Undoes the wire's 0x7F escaping over `len` bytes starting at `start`.
///
/// An 0x7F byte consumes the byte after it and substitutes that byte with
/// its high bit set; an escape at the very end of the window reads past it,
/// yielding 0x80 if nothing follows. Out-of-range windows decode to nothing.
pub fn unescape(data: &[u8], start: usize, len: usize) -> Vec<u8> {
    if start >= data.len() || start.saturating_add(len) > data.len() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(len);
    let mut i = start;
    let end = start + len;
    while i < end {
        let mut ch = data[i];
        i += 1;
        if ch == 0x7F {
            let next = data.get(i).copied().unwrap_or(0);
            i += 1;
            ch = next | 0x80;
        }
        out.push(ch);
    }
    out
}

/// Decodes an escaped text field as trimmed UTF-8.
pub fn decode_text(data: &[u8], start: usize, len: usize) -> String {
    String::from_utf8_lossy(&unescape(data, start, len))
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DecoderConfig;

    fn decoder() -> Gen7Decoder {
        Gen7Decoder::new(DecoderConfig::default())
    }

    #[test]
    fn test_unescape_literal_bytes() {
        let decoded = unescape(&[0x41, 0x7F, 0x01, 0x42], 0, 4);
        assert_eq!(decoded, vec![0x41, 0x81, 0x42]);
    }

    #[test]
    fn test_unescape_plain_window() {
        assert_eq!(unescape(b"HELLO", 1, 3), b"ELL".to_vec());
    }

    #[test]
    fn test_unescape_out_of_range() {
        assert!(unescape(b"AB", 2, 1).is_empty());
        assert!(unescape(b"AB", 0, 3).is_empty());
    }

    #[test]
    fn test_unescape_trailing_escape() {
        // Escape as the last byte of the window consumes the byte beyond it
        assert_eq!(unescape(&[0x41, 0x7F, 0x43], 0, 2), vec![0x41, 0xC3]);
    }

    #[test]
    fn test_decode_text_trims() {
        assert_eq!(decode_text(b"  100 FREE  ", 0, 12), "100 FREE");
    }

    #[test]
    fn test_meet_title_command() {
        let mut d = decoder();
        let mut cmd = vec![1u8, 1, 9];
        cmd.extend_from_slice(b"CITY MEET");
        d.interpret_command(&cmd);
        assert_eq!(d.meet(0).unwrap().title, "CITY MEET");
        assert!(d.meet(0).unwrap().has_data);
    }

    #[test]
    fn test_start_list_creates_event_and_heat() {
        let mut d = decoder();
        let mut cmd = vec![2u8, 1, 0, 3, 0, 2, 8];
        cmd.extend_from_slice(b"100 BACK");
        d.interpret_command(&cmd);

        let meet = d.meet(0).unwrap();
        let event = meet.events.get(&3).expect("event created");
        assert_eq!(event.title, "100 BACK");
        let heat = event.heats.get(&2).expect("heat created");
        assert_eq!(heat.lanes.len(), 12);
        assert!(!heat.has_data);
    }

    #[test]
    fn test_lane_entry_fills_roster() {
        let mut d = decoder();
        d.interpret_command(&[2, 1, 0, 3, 0, 2, 0]);
        // Lane 0: last name "DOE" (3), team "AAC" (3), one reserved byte
        let mut cmd = vec![3u8, 1, 0, 3, 3, 0];
        cmd.extend_from_slice(b"DOE");
        cmd.extend_from_slice(b"AAC");
        d.interpret_command(&cmd);

        let heat = &d.meet(0).unwrap().events[&3].heats[&2];
        assert_eq!(heat.lanes[0].last_name, "DOE");
        assert_eq!(heat.lanes[0].team, "AAC");
        assert!(heat.has_data);
    }

    #[test]
    fn test_event_ready_rollup() {
        let mut d = decoder();
        d.interpret_command(&[2, 1, 0, 3, 0, 2, 0]);
        d.interpret_command(&[4, 1]);
        assert!(!d.meet(0).unwrap().events[&3].has_data);

        let mut cmd = vec![3u8, 1, 2, 4, 0, 0];
        cmd.extend_from_slice(b"NGUY");
        d.interpret_command(&cmd);
        d.interpret_command(&[4, 1]);
        assert!(d.meet(0).unwrap().events[&3].has_data);
    }

    #[test]
    fn test_lane_entry_without_start_list_ignored() {
        let mut d = decoder();
        let mut cmd = vec![3u8, 1, 0, 3, 0, 0];
        cmd.extend_from_slice(b"DOE");
        d.interpret_command(&cmd);
        assert!(d.meet(0).unwrap().events.is_empty());
    }

    #[test]
    fn test_unknown_command_and_bad_pool_ignored() {
        let mut d = decoder();
        d.interpret_command(&[99, 1, 0, 0]);
        d.interpret_command(&[1, 9, 3, b'A', b'B', b'C']);
        d.interpret_command(&[1]);
        d.interpret_command(&[]);
        assert!(d.meet(0).unwrap().title.is_empty());
    }

    #[test]
    fn test_escaped_text_in_title() {
        let mut d = decoder();
        // Escaped window 0x41 0x7F 0x42 0x7F 0x29 decodes to 0x41 0xC2 0xA9,
        // the UTF-8 encoding of "A©"; the length field counts escaped bytes
        let cmd = [1u8, 1, 5, 0x41, 0x7F, 0x42, 0x7F, 0x29];
        d.interpret_command(&cmd);
        // 0x41, 0xC2, 0xA9 -> "A©"
        assert_eq!(d.meet(0).unwrap().title, "A\u{A9}");
    }
}
