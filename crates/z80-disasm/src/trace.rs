//! Reachability scan (spec.md §4.H "Reachability scan").
//!
//! Walks control flow starting from a set of entry points, classifying
//! every address the scan visits as an opcode's first byte, one of its
//! operand bytes, or (by elimination, once the scan is done) leftover
//! data. Recursion follows [`ControlFlow::Recurse`] and
//! [`ControlFlow::TailJump`] the way a real CPU would chase `CALL` and
//! `JP`; it never walks off the end of what it's told to follow, and an
//! instruction whose operand bytes were already claimed by an earlier
//! pass is reported rather than silently overwritten.

use crate::format::{format, ControlFlow, LabelLookup};
use z80_core::Image;

/// Per-address classification left behind by the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Outside the loaded image; the scan never considers these addresses.
    Empty,
    /// First byte of a decoded instruction.
    Opcode,
    /// An operand byte belonging to the instruction at some earlier address.
    Operand,
    /// Inside the loaded image, not (yet) claimed by a decoded instruction.
    /// Whatever is left in this state once the scan finishes is rendered
    /// as `DEFB` (spec.md §4.H).
    Data,
}

/// A non-fatal problem found during the scan (spec.md §7, semantic
/// disassembler errors): traversal continues past these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub addr: u16,
    pub message: String,
}

/// Per-address mode plus label flags for the whole 64 KiB address space.
pub struct ModeMap {
    mode: Box<[Mode; 0x1_0000]>,
    label: Box<[bool; 0x1_0000]>,
}

impl ModeMap {
    fn new(image: &Image) -> Self {
        let mut mode = Box::new([Mode::Empty; 0x1_0000]);
        if let (Some(lo), Some(hi)) = (image.lo_pc(), image.hi_pc()) {
            for slot in &mut mode[usize::from(lo)..=usize::from(hi)] {
                *slot = Mode::Data;
            }
        }
        Self { mode, label: Box::new([false; 0x1_0000]) }
    }

    #[must_use]
    pub fn mode(&self, addr: u16) -> Mode {
        self.mode[addr as usize]
    }

    #[must_use]
    pub fn is_label(&self, addr: u16) -> bool {
        self.label[addr as usize]
    }

    fn mark_label(&mut self, addr: u16) {
        self.label[addr as usize] = true;
    }
}

impl LabelLookup for ModeMap {
    fn is_label(&self, addr: u16) -> bool {
        self.label[addr as usize]
    }
}

/// RST vector table plus the NMI entry point, seeded as extra entry
/// points when `-r` (reachability) asks for them (spec.md §6.2).
pub const RST_VECTORS: [u16; 8] = [0x00, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38];
pub const NMI_VECTOR: u16 = 0x66;

/// Walk control flow from `entry_points`, classifying every address the
/// walk visits. Diagnostics are non-fatal: an "illegal jump" report
/// doesn't stop the scan, it just marks that one target as already
/// claimed and moves on.
#[must_use]
pub fn trace(image: &Image, entry_points: &[u16]) -> (ModeMap, Vec<Diagnostic>) {
    let mut map = ModeMap::new(image);
    let mut diagnostics = Vec::new();
    for &entry in entry_points {
        walk(image, &mut map, entry, &mut diagnostics);
    }
    (map, diagnostics)
}

fn walk(image: &Image, map: &mut ModeMap, start: u16, diagnostics: &mut Vec<Diagnostic>) {
    let mut addr = start;
    loop {
        match map.mode(addr) {
            Mode::Opcode => return,
            Mode::Operand => {
                diagnostics.push(Diagnostic { addr, message: format!("Illegal jump at {addr:04X}") });
                return;
            }
            // Outside the loaded image: nothing decodable lives here.
            Mode::Empty => return,
            Mode::Data => {}
        }

        map.mark_label(addr);
        let decoded = format(addr, image, None);
        let len = decoded.len.max(1);
        map.mode[addr as usize] = Mode::Opcode;
        for offset in 1..len {
            let operand_addr = addr.wrapping_add(u16::from(offset));
            map.mode[operand_addr as usize] = Mode::Operand;
        }

        match decoded.flow {
            ControlFlow::FallThrough => {
                addr = addr.wrapping_add(u16::from(len));
            }
            ControlFlow::Recurse(target) => {
                walk(image, map, target, diagnostics);
                addr = addr.wrapping_add(u16::from(len));
            }
            ControlFlow::TailJump(target) => {
                map.mark_label(target);
                addr = target;
            }
            ControlFlow::Stop => return,
        }
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
    fn straight_line_code_marks_opcodes_only() {
        let img = image_with(&[0x00, 0x00, 0xC9]); // NOP; NOP; RET
        let (map, diags) = trace(&img, &[0]);
        assert_eq!(map.mode(0), Mode::Opcode);
        assert_eq!(map.mode(1), Mode::Opcode);
        assert_eq!(map.mode(2), Mode::Opcode);
        assert!(diags.is_empty());
    }

    #[test]
    fn call_recurses_then_falls_through() {
        // 0: CALL 4 ; 3: NOP ; 4: RET
        let img = image_with(&[0xCD, 0x04, 0x00, 0x00, 0xC9]);
        let (map, _) = trace(&img, &[0]);
        assert_eq!(map.mode(0), Mode::Opcode); // CALL
        assert_eq!(map.mode(1), Mode::Operand);
        assert_eq!(map.mode(2), Mode::Operand);
        assert_eq!(map.mode(3), Mode::Opcode); // NOP after the call
        assert_eq!(map.mode(4), Mode::Opcode); // RET, reached via recursion
        assert!(map.is_label(4));
    }

    #[test]
    fn indirect_jump_leaves_the_rest_unreached() {
        // spec.md §8 scenario 6: ORG 0; JP (HL); RST 38H
        let img = image_with(&[0xE9, 0xFF]);
        let (map, diags) = trace(&img, &[0]);
        assert_eq!(map.mode(0), Mode::Opcode);
        assert_eq!(map.mode(1), Mode::Data);
        assert!(diags.is_empty());
    }

    #[test]
    fn overlapping_decode_is_reported_not_overwritten() {
        // 0: LD B,n (2 bytes); entry at 1 lands inside the operand byte.
        let img = image_with(&[0x06, 0x00, 0x00]);
        let (map, diags) = trace(&img, &[0, 1]);
        assert_eq!(map.mode(0), Mode::Opcode);
        assert_eq!(map.mode(1), Mode::Operand);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].addr, 1);
    }

    #[test]
    fn jr_is_a_tail_jump_that_continues_scanning_at_the_target() {
        let img = image_with(&[0x18, 0x01, 0x00, 0xC9]); // JR +1 -> skips the NOP -> RET
        let (map, _) = trace(&img, &[0]);
        assert_eq!(map.mode(0), Mode::Opcode);
        assert_eq!(map.mode(1), Mode::Operand);
        assert_eq!(map.mode(2), Mode::Data); // never reached, not decoded
        assert_eq!(map.mode(3), Mode::Opcode);
        assert!(map.is_label(3));
    }
}
