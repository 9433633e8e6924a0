//! Read-only rendering of the digit grid into display strings
//!
//! The grid stores raw character codes; these helpers turn runs of digits
//! into the strings a scoreboard page shows, inserting the colon and decimal
//! point the way the physical board lights them. Module 0 is the running
//! race clock and always gets the full MM:SS.d punctuation; other modules
//! only show punctuation where the decimal-point flags say so. A module
//! whose universal flag is set can have its reads redirected to module 0.
//!
//! None of this mutates the grid.

use super::decoder::Gen7Decoder;

/// Maps a stored digit value to its display character. Zero and the blank
/// sentinel render as a space; everything else is a character code.
pub fn data_to_char(value: u8) -> char {
    if value == 0 || value == 15 {
        ' '
    } else {
        value as char
    }
}

impl Gen7Decoder {
    /// Display character at one grid position, blank for anything out of
    /// range.
    pub fn digit_char(&self, pool: usize, module: usize, digit: usize) -> char {
        self.pools
            .get(pool)
            .and_then(|ps| ps.board.modules.get(module))
            .and_then(|m| m.digits.get(digit))
            .map(|d| data_to_char(d.value))
            .unwrap_or(' ')
    }

    /// Renders `count` digits starting at `start` as a time string.
    ///
    /// A colon lands before the third position when its decimal flag is lit
    /// and the preceding character is not blank; a decimal point follows the
    /// fourth (or second) position when flagged. Module 0 gets the colon and
    /// decimal point unconditionally. With `fill_with_universal`, a module
    /// whose universal flag is set reads its characters from module 0.
    pub fn time_string(
        &self,
        pool: usize,
        module: usize,
        start: usize,
        count: usize,
        fill_with_universal: bool,
    ) -> String {
        if module > 30 {
            return String::new();
        }
        let univ = self
            .pools
            .get(pool)
            .map(|ps| ps.board.modules[module].univ)
            .unwrap_or(false);
        let source = if fill_with_universal && univ { 0 } else { module };
        let mut out = String::new();
        for digit in start..start + count {
            if digit == start + 2 {
                if module == 0
                    || (self.dec_point_lit(pool, module, digit)
                        && self.digit_char(pool, source, digit - 1) != ' ')
                {
                    out.push(':');
                }
                out.push(self.digit_char(pool, source, digit));
            } else if digit == start + 3
                && (self.dec_point_lit(pool, module, digit) || module == 0)
            {
                out.push(self.digit_char(pool, source, digit));
                out.push('.');
            } else if digit == start + 1 && self.dec_point_lit(pool, module, digit) {
                out.push(self.digit_char(pool, source, digit));
                out.push('.');
            } else {
                out.push(self.digit_char(pool, source, digit));
            }
        }
        out.trim().to_string()
    }

    /// Renders a run of digits as a plain numeric field, with optional
    /// decimal-point and colon positions honored when the matching flag is
    /// lit.
    ///
    /// This mirrors the board's own field addressing, quirks included: a run
    /// starting at digit 1 skips a position after the first character, and
    /// the place-summary modules (25..=30) suppress their leading columns.
    /// Universal redirection applies only to runs inside digits 4..=9.
    pub fn digit_string(
        &self,
        pool: usize,
        module: usize,
        start: usize,
        count: usize,
        dec_point_pos: Option<usize>,
        colon_pos: Option<usize>,
    ) -> String {
        if module > 30 || start + count > 30 {
            return String::new();
        }
        let univ = self
            .pools
            .get(pool)
            .map(|ps| ps.board.modules[module].univ)
            .unwrap_or(false);
        let source = if !univ || start <= 3 || start >= 10 { module } else { 0 };
        if (start == 0 || start == 2) && count == 1 {
            let pair = format!(
                "{}{}",
                self.digit_char(pool, source, start),
                self.digit_char(pool, source, start + 1)
            );
            return pair.trim().to_string();
        }
        let mut out = String::new();
        let mut digit = start;
        for index in start..start + count {
            if colon_pos == Some(index) && self.dec_point_lit(pool, module, digit) {
                out.push(':');
            }
            if source < 25 || source > 30 || start != 0 || (index != 0 && index != 2) {
                out.push(self.digit_char(pool, source, digit));
                if dec_point_pos == Some(index) && self.dec_point_lit(pool, module, digit) {
                    out.push('.');
                }
                if digit == 1 && start == 1 {
                    digit += 1;
                }
                digit += 1;
            }
        }
        let trimmed = out.trim();
        if trimmed == "." {
            String::new()
        } else {
            trimmed.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DecoderConfig;

    fn decoder() -> Gen7Decoder {
        Gen7Decoder::new(DecoderConfig::default())
    }

    /// Writes character values into consecutive digits of a module.
    fn set_digits(d: &mut Gen7Decoder, module: usize, start: usize, text: &[u8]) {
        for (i, &b) in text.iter().enumerate() {
            d.pools[0].board.modules[module].digits[start + i].value = b;
        }
    }

    #[test]
    fn test_data_to_char_blanks() {
        assert_eq!(data_to_char(0), ' ');
        assert_eq!(data_to_char(15), ' ');
        assert_eq!(data_to_char(32), ' ');
        assert_eq!(data_to_char(b'7'), '7');
    }

    #[test]
    fn test_time_string_module_0_unconditional() {
        let mut d = decoder();
        set_digits(&mut d, 0, 4, b"123456");
        assert_eq!(d.time_string(0, 0, 4, 6, true), "12:34.56");
    }

    #[test]
    fn test_time_string_flags_drive_punctuation() {
        let mut d = decoder();
        set_digits(&mut d, 2, 4, b"123456");
        // Without flags, a lane module renders bare digits
        assert_eq!(d.time_string(0, 2, 4, 6, true), "123456");
        // Flags at the colon and decimal positions produce MM:SS.dd
        d.pools[0].board.modules[2].digits[6].dec_point = true;
        d.pools[0].board.modules[2].digits[7].dec_point = true;
        assert_eq!(d.time_string(0, 2, 4, 6, true), "12:34.56");
    }

    #[test]
    fn test_time_string_colon_needs_preceding_digit() {
        let mut d = decoder();
        // Position before the colon is blank: colon suppressed
        set_digits(&mut d, 2, 4, b"1");
        set_digits(&mut d, 2, 6, b"3456");
        d.pools[0].board.modules[2].digits[6].dec_point = true;
        assert_eq!(d.time_string(0, 2, 4, 6, true), "1 3456");
    }

    #[test]
    fn test_time_string_universal_redirect() {
        let mut d = decoder();
        set_digits(&mut d, 0, 4, b"987654");
        d.pools[0].board.modules[4].univ = true;
        assert_eq!(d.time_string(0, 4, 4, 6, true), "987654");
        // Redirect disabled on request
        assert_eq!(d.time_string(0, 4, 4, 6, false), "");
    }

    #[test]
    fn test_time_string_out_of_range() {
        let d = decoder();
        assert_eq!(d.time_string(0, 31, 4, 6, true), "");
        assert_eq!(d.time_string(9, 2, 4, 6, true), "");
        // Reads past the grid render as blanks and trim away
        assert_eq!(d.time_string(0, 2, 28, 6, true), "");
    }

    #[test]
    fn test_digit_string_event_field() {
        let mut d = decoder();
        // The event field starts at digit 1; the reader takes 1, 3, 4
        d.pools[0].board.modules[12].digits[1].value = b'1';
        d.pools[0].board.modules[12].digits[3].value = b'2';
        d.pools[0].board.modules[12].digits[4].value = b'3';
        assert_eq!(d.digit_string(0, 12, 1, 3, None, None), "123");
    }

    #[test]
    fn test_digit_string_heat_field() {
        let mut d = decoder();
        d.pools[0].board.modules[12].digits[9].value = b'2';
        assert_eq!(d.digit_string(0, 12, 7, 3, None, None), "2");
    }

    #[test]
    fn test_digit_string_single_position_pair() {
        let mut d = decoder();
        d.pools[0].board.modules[5].digits[0].value = b'4';
        d.pools[0].board.modules[5].digits[1].value = b'2';
        assert_eq!(d.digit_string(0, 5, 0, 1, None, None), "42");
    }

    #[test]
    fn test_digit_string_punctuation_positions() {
        let mut d = decoder();
        set_digits(&mut d, 7, 2, b"1234");
        d.pools[0].board.modules[7].digits[3].value = b'2';
        d.pools[0].board.modules[7].digits[3].dec_point = true;
        assert_eq!(
            d.digit_string(0, 7, 2, 4, Some(3), None),
            "12.34"
        );
    }

    #[test]
    fn test_digit_string_lone_dot_collapses() {
        let mut d = decoder();
        d.pools[0].board.modules[7].digits[2].dec_point = true;
        assert_eq!(d.digit_string(0, 7, 2, 4, Some(2), None), "");
    }

    #[test]
    fn test_digit_string_out_of_range() {
        let d = decoder();
        assert_eq!(d.digit_string(0, 31, 0, 3, None, None), "");
        assert_eq!(d.digit_string(0, 12, 28, 3, None, None), "");
    }
}
