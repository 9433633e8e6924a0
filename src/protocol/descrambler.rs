//! Keyed byte transform undoing the console's on-wire scrambling
//!
//! Every byte the console sends below 0x80 is XORed with a keystream derived
//! from a 32-entry key table. A byte with the high bit set selects the table
//! entry and restarts the keystream, so the transform re-keys at every frame
//! boundary. The same transform, independently seeded, is applied again to
//! the payload of extended sub-frames.

use std::sync::OnceLock;

/// Key material as shipped in the console firmware. Odd table slots come
/// from the first 128 hex digits, even slots from the second 128; the
/// interleaving is part of the format and must not be reordered.
const KEY_HEX: &str = "F37C65B454BD061AC3E2161EEBB26E8EEC95883E5CAB118EF3D7D3ACC6DA3754\
178C9A44414B16BC351AE48C30EA2D3839F009BCBC7F3AE4DECACED82AA0D794\
7A02E6B088BA6B4EA63D2E4463E1780A574169B4D0258F42023E04D0D0D19CF6\
FB0805F6E18DC550B61F577EC4FAEF9C9395C310EF23508067C46C28843F4A36";

static KEY_TABLE: OnceLock<[u32; 32]> = OnceLock::new();

/// Returns the process-wide key table, parsed once from [`KEY_HEX`].
///
/// Both the primary stream descrambler and every per-sub-frame descrambler
/// read from this single immutable table.
pub fn key_table() -> &'static [u32; 32] {
    KEY_TABLE.get_or_init(|| {
        let word = |offset: usize| {
            u32::from_str_radix(&KEY_HEX[offset..offset + 8], 16).unwrap_or(0)
        };
        let mut table = [0u32; 32];
        for i in 0..16 {
            table[i * 2 + 1] = word(i * 8);
        }
        for i in 0..16 {
            table[i * 2] = word(128 + i * 8);
        }
        table
    })
}

/// Rolling descrambler state for one byte stream
///
/// One instance lives for the whole connection; extended sub-frames each get
/// a fresh instance seeded by their own marker byte.
#[derive(Debug, Clone)]
pub struct Descrambler {
    table: &'static [u32; 32],
    mapper: u32,
    map_length: u32,
    run_counter: u32,
    parity: bool,
}

impl Default for Descrambler {
    fn default() -> Self {
        Self::new()
    }
}

impl Descrambler {
    /// Creates a descrambler with no key selected yet. Until the first
    /// high-bit byte arrives the transform passes bytes through unchanged.
    pub fn new() -> Self {
        Descrambler {
            table: key_table(),
            mapper: 0,
            map_length: 0,
            run_counter: 0,
            parity: false,
        }
    }

    /// Descrambles one byte, advancing the keystream.
    pub fn next(&mut self, raw: u8) -> u8 {
        if raw & 0x80 != 0 {
            // Marker byte: re-key and pass through untouched
            self.run_counter = 0;
            self.mapper = self.table[(raw & 0x1F) as usize];
            self.parity = raw & 1 == 1;
            raw
        } else if self.run_counter == 0 {
            // First byte after a marker sets the rotation stride
            self.map_length = u32::from(raw) ^ (self.mapper & 0x7F);
            self.run_counter += 1;
            (self.map_length & 0xFF) as u8
        } else {
            let shift = self.map_length.wrapping_mul(self.run_counter);
            let rotated = if self.parity {
                self.mapper.rotate_right(shift)
            } else {
                self.mapper.rotate_left(shift)
            };
            self.run_counter += 1;
            raw ^ (rotated & 0x7F) as u8
        }
    }
}
