//! Opcode length table (spec.md §4.H "Opcode length").
//!
//! `op_len` looks the primary byte up in a compact per-opcode table, then
//! for the four prefix bytes consults a secondary table keyed on the byte
//! that follows. A `DD`/`FD` prefix that doesn't touch `H`, `L`, or `(HL)`
//! falls back to the unprefixed opcode's length (the prefix behaves like a
//! one-byte `NOP`); an undefined `ED` opcode does the same.

use z80_core::Image;

/// Unprefixed opcode lengths, including the opcode byte itself.
#[rustfmt::skip]
const BASE_LEN: [u8; 256] = [
    1,3,1,1,1,1,2,1, 1,1,1,1,1,1,2,1, // 00-0F
    2,3,1,1,1,1,2,1, 2,1,1,1,1,1,2,1, // 10-1F
    2,3,3,1,1,1,2,1, 2,1,3,1,1,1,2,1, // 20-2F
    2,3,3,1,1,1,2,1, 2,1,3,1,1,1,2,1, // 30-3F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // 40-4F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // 50-5F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // 60-6F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // 70-7F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // 80-8F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // 90-9F
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // A0-AF
    1,1,1,1,1,1,1,1, 1,1,1,1,1,1,1,1, // B0-BF
    1,1,3,3,3,1,2,1, 1,1,3,2,3,3,2,1, // C0-CF (CB's own entry is unused)
    1,1,3,2,3,1,2,1, 1,1,3,2,3,2,2,1, // D0-DF (DD's own entry is unused)
    1,1,3,1,3,1,2,1, 1,1,3,1,3,2,2,1, // E0-EF (ED's own entry is unused)
    1,1,3,1,3,1,2,1, 1,1,3,1,3,2,2,1, // F0-FF (FD's own entry is unused)
];

/// `(nn)`/`rp` `ED`-prefixed loads: the only `ED` opcodes with a 16-bit
/// immediate, four bytes total.
const ED_WORD_OPS: [u8; 8] = [0x43, 0x4B, 0x53, 0x5B, 0x63, 0x6B, 0x73, 0x7B];

/// `(HL)`-addressing opcodes that, under `DD`/`FD`, grow a displacement
/// byte (`LD (IX+d),n`, `INC (IX+d)`, ALU `A,(IX+d)`, ...).
#[rustfmt::skip]
const HL_INDIRECT_DISPLACED: [u8; 24] = [
    0x34, 0x35, 0x36,
    0x46, 0x4E, 0x56, 0x5E, 0x66, 0x6E, 0x7E,
    0x70, 0x71, 0x72, 0x73, 0x74, 0x75, 0x77,
    0x86, 0x8E, 0x96, 0x9E, 0xA6, 0xAE, 0xB6, 0xBE,
];

/// Length, in bytes, of the instruction at `addr` (1 to 4).
#[must_use]
pub fn op_len(image: &Image, addr: u16) -> u8 {
    let b0 = image.read(addr);
    match b0 {
        0xCB => 2,
        0xED => {
            let b1 = image.read(addr.wrapping_add(1));
            if ED_WORD_OPS.contains(&b1) { 4 } else { 2 }
        }
        0xDD | 0xFD => {
            let b1 = image.read(addr.wrapping_add(1));
            if b1 == 0xCB {
                4
            } else if HL_INDIRECT_DISPLACED.contains(&b1) {
                BASE_LEN[b1 as usize] + 2
            } else {
                BASE_LEN[b1 as usize] + 1
            }
        }
        _ => BASE_LEN[b0 as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_with(bytes: &[u8]) -> Image {
        let mut img = Image::new(0);
        img.load(0, bytes).unwrap();
        img
    }

    #[test]
    fn plain_opcodes() {
        let img = image_with(&[0x00, 0xC3, 0, 0, 0x06, 0]);
        assert_eq!(op_len(&img, 0), 1); // NOP
        assert_eq!(op_len(&img, 1), 3); // JP nn
        assert_eq!(op_len(&img, 4), 2); // LD B,n
    }

    #[test]
    fn cb_is_always_two() {
        let img = image_with(&[0xCB, 0x00]);
        assert_eq!(op_len(&img, 0), 2);
    }

    #[test]
    fn ed_word_op_is_four() {
        let img = image_with(&[0xED, 0x43, 0, 0]);
        assert_eq!(op_len(&img, 0), 4);
    }

    #[test]
    fn ed_undefined_falls_back_to_two() {
        let img = image_with(&[0xED, 0x00]);
        assert_eq!(op_len(&img, 0), 2);
    }

    #[test]
    fn dd_register_form_has_no_displacement() {
        let img = image_with(&[0xDD, 0x21, 0x00, 0x10]); // LD IX,nn
        assert_eq!(op_len(&img, 0), 4);
    }

    #[test]
    fn dd_indirect_form_adds_displacement() {
        let img = image_with(&[0xDD, 0x36, 0x05, 0x7F]); // LD (IX+5),7FH
        assert_eq!(op_len(&img, 0), 4);
    }

    #[test]
    fn dd_cb_is_always_four() {
        let img = image_with(&[0xDD, 0xCB, 0x05, 0x46]); // BIT 0,(IX+5)
        assert_eq!(op_len(&img, 0), 4);
    }

    #[test]
    fn dd_fallback_matches_unprefixed_nop() {
        let img = image_with(&[0xDD, 0x00]);
        assert_eq!(op_len(&img, 0), 2);
    }
}
