//! Recursive reachability disassembler: opcode lengths, control-flow
//! trace, and the mnemonic formatter tied into one listing (spec.md §4.H).

pub mod format;
pub mod len;
pub mod trace;

pub use format::{ControlFlow, Formatted, LabelLookup};
pub use len::op_len;
pub use trace::{Diagnostic, Mode, ModeMap, NMI_VECTOR, RST_VECTORS};

use z80_core::Image;

/// How much of the scan machinery to run (`-p`/`-r`/`-x`, spec.md §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct DisassemblerOptions {
    /// `-p`: run the reachability scan instead of decoding linearly.
    pub reachability: bool,
    /// `-r`: also seed the RST vectors and the NMI vector as entry points.
    pub seed_vectors: bool,
    /// `-x`: prepend each line with the bytes it covers.
    pub hex_dump: bool,
    /// `-s`: first address to emit (defaults to the image's low-water mark).
    pub start: Option<u16>,
}

/// One line of the rendered listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub addr: u16,
    pub bytes: Vec<u8>,
    pub text: String,
    pub label: bool,
}

pub struct DisassembleOutput {
    pub lines: Vec<Line>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Disassemble `image` start to finish, honoring `options`.
#[must_use]
pub fn disassemble(image: &Image, options: &DisassemblerOptions) -> DisassembleOutput {
    let (Some(lo), Some(hi)) = (image.lo_pc(), image.hi_pc()) else {
        return DisassembleOutput { lines: Vec::new(), diagnostics: Vec::new() };
    };
    let start = options.start.unwrap_or(lo).max(lo);

    if !options.reachability {
        return DisassembleOutput { lines: linear_scan(image, start, hi), diagnostics: Vec::new() };
    }

    let mut entries = vec![lo];
    if options.seed_vectors {
        entries.extend_from_slice(&RST_VECTORS);
        entries.push(NMI_VECTOR);
    }
    let (map, diagnostics) = trace::trace(image, &entries);
    let lines = render_with_map(image, &map, start, hi);
    DisassembleOutput { lines, diagnostics }
}

/// No reachability information: decode every address start to finish as
/// an instruction, purely linearly.
fn linear_scan(image: &Image, start: u16, hi: u16) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut addr = start;
    loop {
        let decoded = format::format(addr, image, None);
        let len = decoded.len.max(1);
        lines.push(Line {
            addr,
            bytes: (0..len).map(|i| image.read(addr.wrapping_add(u16::from(i)))).collect(),
            text: decoded.text,
            label: false,
        });
        if addr >= hi || u32::from(addr) + u32::from(len) > u32::from(hi) {
            break;
        }
        addr = addr.wrapping_add(u16::from(len));
    }
    lines
}

/// Render the listing once the reachability scan has classified every
/// address: `Opcode` addresses go through the formatter, runs of `Data`
/// are collapsed into `DEFB` lines of up to 16 bytes.
fn render_with_map(image: &Image, map: &ModeMap, start: u16, hi: u16) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut addr = start;
    loop {
        match map.mode(addr) {
            Mode::Opcode => {
                let decoded = format::format(addr, image, Some(map));
                let len = decoded.len.max(1);
                lines.push(Line {
                    addr,
                    bytes: (0..len).map(|i| image.read(addr.wrapping_add(u16::from(i)))).collect(),
                    text: decoded.text,
                    label: map.is_label(addr),
                });
                if u32::from(addr) + u32::from(len) > u32::from(hi) {
                    break;
                }
                addr = addr.wrapping_add(u16::from(len));
            }
            Mode::Data | Mode::Empty | Mode::Operand => {
                let run_start = addr;
                let mut bytes = Vec::new();
                while bytes.len() < 16 && matches!(map.mode(addr), Mode::Data | Mode::Empty | Mode::Operand) {
                    bytes.push(image.read(addr));
                    if addr == hi {
                        addr = addr.wrapping_add(1);
                        break;
                    }
                    addr = addr.wrapping_add(1);
                }
                let text = format!("DEFB {}", bytes.iter().map(|b| format!("${b:02X}")).collect::<Vec<_>>().join(","));
                lines.push(Line { addr: run_start, bytes, text, label: map.is_label(run_start) });
                if run_start >= hi {
                    break;
                }
            }
        }
        if addr > hi {
            break;
        }
    }
    lines
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
    fn linear_mode_decodes_every_byte_as_code() {
        let img = image_with(&[0x00, 0xC9]); // NOP; RET
        let out = disassemble(&img, &DisassemblerOptions::default());
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[0].text, "NOP");
        assert_eq!(out.lines[1].text, "RET");
    }

    #[test]
    fn reachability_leaves_unreached_bytes_as_defb() {
        // ORG 0; JP (HL); RST 38H -- the indirect jump stops the scan cold.
        let img = image_with(&[0xE9, 0xFF]);
        let opts = DisassemblerOptions { reachability: true, ..Default::default() };
        let out = disassemble(&img, &opts);
        assert_eq!(out.lines.len(), 2);
        assert_eq!(out.lines[0].text, "JP (HL)");
        assert_eq!(out.lines[1].text, "DEFB $FF");
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn seeding_rst_vectors_reaches_code_placed_there() {
        let mut img = Image::new(0);
        img.write(0x38, 0xC9).unwrap(); // RET, reachable only via the RST 38H vector
        let opts = DisassemblerOptions { reachability: true, seed_vectors: true, ..Default::default() };
        let out = disassemble(&img, &opts);
        let rst_line = out.lines.iter().find(|l| l.addr == 0x38).expect("RST vector decoded");
        assert_eq!(rst_line.text, "RET");
    }

    #[test]
    fn overlapping_jump_is_reported_as_a_diagnostic() {
        let img = image_with(&[0x06, 0x00, 0x00, 0x18, 0xFC]); // LD B,0; NOP; JR back into the operand
        let opts = DisassemblerOptions { reachability: true, ..Default::default() };
        let out = disassemble(&img, &opts);
        assert!(!out.diagnostics.is_empty());
    }
}
