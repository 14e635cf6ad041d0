//! Mnemonic formatter (spec.md §4.H "Mnemonic formatter").
//!
//! A switch pyramid over the `(X,Y,Z)` bit-fields of the primary byte
//! (`X = bits 7-6`, `Y = bits 5-3`, `Z = bits 2-0`), with secondary decodes
//! for the `CB`/`ED` prefixes and a tertiary one for `DD/FD CB d op`. Pure:
//! given `(addr, &image)` it reads exactly the bytes the instruction at
//! `addr` occupies and never mutates anything.

use z80_core::Image;

/// Tells the formatter which addresses already carry a label, so it can
/// render `L<hex>` instead of `$<hex>` for jump/call targets.
pub trait LabelLookup {
    fn is_label(&self, addr: u16) -> bool;
}

/// What a decoded instruction does to control flow, for the tracer
/// (spec.md §4.H "Reachability scan").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    FallThrough,
    /// Recurse on the target, then continue scanning past this instruction.
    Recurse(u16),
    /// Unconditional transfer: the scan continues *at* the target instead
    /// of falling through.
    TailJump(u16),
    /// No successor (`RET`, `RETI`, `RETN`, `JP (HL)/(IX)/(IY)`).
    Stop,
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub len: u8,
    pub text: String,
    pub flow: ControlFlow,
}

const R8: [&str; 8] = ["B", "C", "D", "E", "H", "L", "(HL)", "A"];
const RP: [&str; 4] = ["BC", "DE", "HL", "SP"];
const RP2: [&str; 4] = ["BC", "DE", "HL", "AF"];
const CC: [&str; 8] = ["NZ", "Z", "NC", "C", "PO", "PE", "P", "M"];
const ALU: [&str; 8] = ["ADD A,", "ADC A,", "SUB ", "SBC A,", "AND ", "XOR ", "OR ", "CP "];
const ROT: [&str; 8] = ["RLC", "RRC", "RL", "RR", "SLA", "SRA", "SLL", "SRL"];
const IM: [&str; 8] = ["0", "0", "1", "2", "0", "0", "1", "2"];
const UN_OP_7: [&str; 8] = ["RLCA", "RRCA", "RLA", "RRA", "DAA", "CPL", "SCF", "CCF"];

fn hex16(v: u16) -> String {
    format!("${v:04X}")
}

fn hex8(v: u8) -> String {
    format!("${v:02X}")
}

fn addr_text(target: u16, labels: Option<&dyn LabelLookup>) -> String {
    if labels.is_some_and(|l| l.is_label(target)) {
        format!("L{target:04X}")
    } else {
        hex16(target)
    }
}

/// A cursor over `image`, reading the bytes after an opcode in order.
struct Cursor<'a> {
    image: &'a Image,
    pos: u16,
}

impl<'a> Cursor<'a> {
    fn new(image: &'a Image, pos: u16) -> Self {
        Self { image, pos }
    }

    fn u8(&mut self) -> u8 {
        let b = self.image.read(self.pos);
        self.pos = self.pos.wrapping_add(1);
        b
    }

    fn i8(&mut self) -> i8 {
        self.u8() as i8
    }

    fn u16(&mut self) -> u16 {
        let lo = self.u8();
        let hi = self.u8();
        u16::from(lo) | (u16::from(hi) << 8)
    }
}

/// Decode and format the instruction at `addr`.
#[must_use]
pub fn format(addr: u16, image: &Image, labels: Option<&dyn LabelLookup>) -> Formatted {
    match image.read(addr) {
        0xCB => format_cb(addr, image, "", labels),
        0xED => format_ed(addr, image, labels),
        0xDD => format_indexed(addr, image, labels, "IX", "HX", "LX"),
        0xFD => format_indexed(addr, image, labels, "IY", "HY", "LY"),
        _ => format_main(addr, image, labels),
    }
}

fn format_main(addr: u16, image: &Image, labels: Option<&dyn LabelLookup>) -> Formatted {
    let op = image.read(addr);
    let mut cur = Cursor::new(image, addr.wrapping_add(1));
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = (y >> 1) as usize;
    let q = y & 1;

    let (text, flow) = match x {
        0 => match z {
            0 => match y {
                0 => ("NOP".to_string(), ControlFlow::FallThrough),
                1 => ("EX AF,AF'".to_string(), ControlFlow::FallThrough),
                2 => {
                    let e = cur.i8();
                    let t = addr.wrapping_add(2).wrapping_add(e as i16 as u16);
                    (format!("DJNZ {}", addr_text(t, labels)), ControlFlow::Recurse(t))
                }
                3 => {
                    let e = cur.i8();
                    let t = addr.wrapping_add(2).wrapping_add(e as i16 as u16);
                    (format!("JR {}", addr_text(t, labels)), ControlFlow::TailJump(t))
                }
                _ => {
                    let e = cur.i8();
                    let t = addr.wrapping_add(2).wrapping_add(e as i16 as u16);
                    (
                        format!("JR {},{}", CC[(y - 4) as usize], addr_text(t, labels)),
                        ControlFlow::Recurse(t),
                    )
                }
            },
            1 if q == 0 => {
                let nn = cur.u16();
                (format!("LD {},{}", RP[p], hex16(nn)), ControlFlow::FallThrough)
            }
            1 => (format!("ADD HL,{}", RP[p]), ControlFlow::FallThrough),
            2 => {
                let text = match (q, p) {
                    (0, 0) => "LD (BC),A".to_string(),
                    (0, 1) => "LD (DE),A".to_string(),
                    (0, 2) => format!("LD ({}),HL", hex16(cur.u16())),
                    (0, _) => format!("LD ({}),A", hex16(cur.u16())),
                    (_, 0) => "LD A,(BC)".to_string(),
                    (_, 1) => "LD A,(DE)".to_string(),
                    (_, 2) => format!("LD HL,({})", hex16(cur.u16())),
                    _ => format!("LD A,({})", hex16(cur.u16())),
                };
                (text, ControlFlow::FallThrough)
            }
            3 if q == 0 => (format!("INC {}", RP[p]), ControlFlow::FallThrough),
            3 => (format!("DEC {}", RP[p]), ControlFlow::FallThrough),
            4 => (format!("INC {}", R8[y as usize]), ControlFlow::FallThrough),
            5 => (format!("DEC {}", R8[y as usize]), ControlFlow::FallThrough),
            6 => {
                let n = cur.u8();
                (format!("LD {},{}", R8[y as usize], hex8(n)), ControlFlow::FallThrough)
            }
            _ => (UN_OP_7[y as usize].to_string(), ControlFlow::FallThrough),
        },
        1 if z == 6 && y == 6 => ("HALT".to_string(), ControlFlow::Stop),
        1 => (
            format!("LD {},{}", R8[y as usize], R8[z as usize]),
            ControlFlow::FallThrough,
        ),
        2 => (format!("{}{}", ALU[y as usize], R8[z as usize]), ControlFlow::FallThrough),
        _ => match z {
            0 => (format!("RET {}", CC[y as usize]), ControlFlow::FallThrough),
            1 if q == 0 => (format!("POP {}", RP2[p]), ControlFlow::FallThrough),
            1 => match p {
                0 => ("RET".to_string(), ControlFlow::Stop),
                1 => ("EXX".to_string(), ControlFlow::FallThrough),
                2 => ("JP (HL)".to_string(), ControlFlow::Stop),
                _ => ("LD SP,HL".to_string(), ControlFlow::FallThrough),
            },
            2 => {
                let nn = cur.u16();
                (
                    format!("JP {},{}", CC[y as usize], addr_text(nn, labels)),
                    ControlFlow::Recurse(nn),
                )
            }
            3 => match y {
                0 => {
                    let nn = cur.u16();
                    (format!("JP {}", addr_text(nn, labels)), ControlFlow::TailJump(nn))
                }
                2 => {
                    let n = cur.u8();
                    (format!("OUT ({}),A", hex8(n)), ControlFlow::FallThrough)
                }
                3 => {
                    let n = cur.u8();
                    (format!("IN A,({})", hex8(n)), ControlFlow::FallThrough)
                }
                4 => ("EX (SP),HL".to_string(), ControlFlow::FallThrough),
                5 => ("EX DE,HL".to_string(), ControlFlow::FallThrough),
                6 => ("DI".to_string(), ControlFlow::FallThrough),
                _ => ("EI".to_string(), ControlFlow::FallThrough),
            },
            4 => {
                let nn = cur.u16();
                (
                    format!("CALL {},{}", CC[y as usize], addr_text(nn, labels)),
                    ControlFlow::Recurse(nn),
                )
            }
            5 if q == 0 => (format!("PUSH {}", RP2[p]), ControlFlow::FallThrough),
            5 => {
                let nn = cur.u16();
                (format!("CALL {}", addr_text(nn, labels)), ControlFlow::Recurse(nn))
            }
            6 => {
                let n = cur.u8();
                (format!("{}{}", ALU[y as usize], hex8(n)), ControlFlow::FallThrough)
            }
            _ => {
                let target = u16::from(y) * 8;
                (format!("RST {}", hex8(target as u8)), ControlFlow::Recurse(target))
            }
        },
    };
    Formatted { len: (cur.pos.wrapping_sub(addr)) as u8, text, flow }
}

/// `CB xx`: rotate/shift/`BIT`/`RES`/`SET` on a register or `(HL)`.
/// `target_text` overrides the `z`-selected operand (used by the `DD/FD
/// CB` tertiary decode, where the target is always `(IX+d)`/`(IY+d)`).
fn format_cb(addr: u16, image: &Image, target_override: &str, _labels: Option<&dyn LabelLookup>) -> Formatted {
    let op = image.read(addr.wrapping_add(1));
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let target = if target_override.is_empty() { R8[z as usize].to_string() } else { target_override.to_string() };
    let text = match x {
        0 => format!("{} {target}", ROT[y as usize]),
        1 => format!("BIT {y},{target}"),
        2 => format!("RES {y},{target}"),
        _ => format!("SET {y},{target}"),
    };
    Formatted { len: 2, text, flow: ControlFlow::FallThrough }
}

fn format_ed(addr: u16, image: &Image, labels: Option<&dyn LabelLookup>) -> Formatted {
    let op = image.read(addr.wrapping_add(1));
    let mut cur = Cursor::new(image, addr.wrapping_add(2));
    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = (y >> 1) as usize;
    let q = y & 1;

    let text = match x {
        1 => match z {
            0 if y == 6 => "IN (C)".to_string(),
            0 => format!("IN {},(C)", R8[y as usize]),
            1 if y == 6 => "OUT (C),0".to_string(),
            1 => format!("OUT (C),{}", R8[y as usize]),
            2 if q == 0 => format!("SBC HL,{}", RP[p]),
            2 => format!("ADC HL,{}", RP[p]),
            3 if q == 0 => format!("LD ({}),{}", hex16(cur.u16()), RP[p]),
            3 => format!("LD {},({})", RP[p], hex16(cur.u16())),
            4 => "NEG".to_string(),
            5 if y == 1 => "RETI".to_string(),
            5 => "RETN".to_string(),
            6 => format!("IM {}", IM[y as usize]),
            _ => match y {
                0 => "LD I,A".to_string(),
                1 => "LD R,A".to_string(),
                2 => "LD A,I".to_string(),
                3 => "LD A,R".to_string(),
                4 => "RRD".to_string(),
                5 => "RLD".to_string(),
                _ => "NOP".to_string(),
            },
        },
        2 if z < 4 && y >= 4 => {
            const BLOCK: [[&str; 4]; 4] =
                [["LDI", "LDD", "LDIR", "LDDR"], ["CPI", "CPD", "CPIR", "CPDR"], ["INI", "IND", "INIR", "INDR"], ["OUTI", "OUTD", "OTIR", "OTDR"]];
            BLOCK[z as usize][(y - 4) as usize].to_string()
        }
        _ => "NOP".to_string(),
    };

    let flow = if x == 1 && z == 5 { ControlFlow::Stop } else { ControlFlow::FallThrough };
    Formatted { len: (cur.pos.wrapping_sub(addr)) as u8, text, flow }
}

#[allow(clippy::too_many_arguments)]
fn format_indexed(
    addr: u16,
    image: &Image,
    labels: Option<&dyn LabelLookup>,
    idx: &str,
    half_hi: &str,
    half_lo: &str,
) -> Formatted {
    let op = image.read(addr.wrapping_add(1));

    if op == 0xCB {
        let d = image.read(addr.wrapping_add(2)) as i8;
        let target = format!("({idx}{:+})", d as i32);
        let inner = format_cb(addr.wrapping_add(2), image, &target, labels);
        return Formatted { len: 4, text: inner.text, flow: ControlFlow::FallThrough };
    }

    let x = op >> 6;
    let y = (op >> 3) & 7;
    let z = op & 7;
    let p = (y >> 1) as usize;
    let q = y & 1;
    let mut cur = Cursor::new(image, addr.wrapping_add(2));

    // 8-bit register names with H/L/(HL) substituted for the indexed forms.
    let r8 = |code: u8, cur: &mut Cursor| -> String {
        match code {
            4 => half_hi.to_string(),
            5 => half_lo.to_string(),
            6 => {
                let d = cur.i8();
                format!("({idx}{d:+})")
            }
            c => R8[c as usize].to_string(),
        }
    };
    let rp = |code: usize| -> &str {
        if code == 2 { idx } else { RP[code] }
    };

    let (text, flow) = match (x, z) {
        (0, 1) if q == 0 && p == 2 => {
            let nn = cur.u16();
            (format!("LD {idx},{}", hex16(nn)), ControlFlow::FallThrough)
        }
        (0, 1) if q == 1 => (format!("ADD {idx},{}", rp(p)), ControlFlow::FallThrough),
        (0, 2) if q == 0 && p == 2 => (format!("LD ({}),{idx}", hex16(cur.u16())), ControlFlow::FallThrough),
        (0, 2) if p == 2 => (format!("LD {idx},({})", hex16(cur.u16())), ControlFlow::FallThrough),
        (0, 3) if q == 0 && p == 2 => (format!("INC {idx}"), ControlFlow::FallThrough),
        (0, 3) if p == 2 => (format!("DEC {idx}"), ControlFlow::FallThrough),
        (0, 4) => (format!("INC {}", r8(y, &mut cur)), ControlFlow::FallThrough),
        (0, 5) => (format!("DEC {}", r8(y, &mut cur)), ControlFlow::FallThrough),
        (0, 6) => {
            let dest = r8(y, &mut cur);
            let n = cur.u8();
            (format!("LD {dest},{}", hex8(n)), ControlFlow::FallThrough)
        }
        (1, _) if z == 6 && y == 6 => ("HALT".to_string(), ControlFlow::Stop),
        (1, _) => {
            // Register-to-register moves never pick up the index register
            // unless they touch H/L/(HL); the lone `(IX+d)` exception is
            // when either side is slot 6.
            if z == 6 {
                let src = r8(z, &mut cur);
                (format!("LD {},{src}", R8[y as usize]), ControlFlow::FallThrough)
            } else if y == 6 {
                let dest = r8(y, &mut cur);
                (format!("LD {dest},{}", R8[z as usize]), ControlFlow::FallThrough)
            } else {
                let dest = r8(y, &mut cur);
                let src = r8(z, &mut cur);
                (format!("LD {dest},{src}"), ControlFlow::FallThrough)
            }
        }
        (2, _) => {
            let operand = r8(z, &mut cur);
            (format!("{}{operand}", ALU[y as usize]), ControlFlow::FallThrough)
        }
        (3, 1) if q == 0 => (format!("POP {}", if p == 2 { idx.to_string() } else { RP2[p].to_string() }), ControlFlow::FallThrough),
        (3, 1) if p == 2 => ("JP (".to_string() + idx + ")", ControlFlow::Stop),
        (3, 1) if p == 3 => (format!("LD SP,{idx}"), ControlFlow::FallThrough),
        (3, 3) if y == 4 => ("EX (SP),".to_string() + idx, ControlFlow::FallThrough),
        (3, 5) if q == 0 => (format!("PUSH {}", if p == 2 { idx.to_string() } else { RP2[p].to_string() }), ControlFlow::FallThrough),
        // Anything else (ALU immediate, conditional jumps, I/O, etc.) does
        // not reference H/L/HL at all: the prefix is inert, matching the
        // unprefixed decode one byte further along.
        _ => {
            let inner = format_main(addr.wrapping_add(1), image, labels);
            return Formatted { len: inner.len + 1, text: inner.text, flow: inner.flow };
        }
    };
    Formatted { len: (cur.pos.wrapping_sub(addr)) as u8, text, flow }
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
    fn nop() {
        let img = image_with(&[0x00]);
        let f = format(0, &img, None);
        assert_eq!(f.text, "NOP");
        assert_eq!(f.len, 1);
        assert_eq!(f.flow, ControlFlow::FallThrough);
    }

    #[test]
    fn jp_absolute_is_tail_jump() {
        let img = image_with(&[0xC3, 0x34, 0x12]);
        let f = format(0, &img, None);
        assert_eq!(f.text, "JP $1234");
        assert_eq!(f.flow, ControlFlow::TailJump(0x1234));
    }

    #[test]
    fn jr_uses_opcode_address_as_base() {
        let img = image_with(&[0x18, 0xFE]); // JR -2 -> back to itself
        let f = format(0, &img, None);
        assert_eq!(f.flow, ControlFlow::TailJump(0));
        assert_eq!(f.text, "JR $0000");
    }

    #[test]
    fn call_nn_recurses() {
        let img = image_with(&[0xCD, 0x00, 0x10]);
        let f = format(0, &img, None);
        assert_eq!(f.text, "CALL $1000");
        assert_eq!(f.flow, ControlFlow::Recurse(0x1000));
    }

    #[test]
    fn jp_hl_stops() {
        let img = image_with(&[0xE9]);
        let f = format(0, &img, None);
        assert_eq!(f.text, "JP (HL)");
        assert_eq!(f.flow, ControlFlow::Stop);
    }

    #[test]
    fn ix_displacement_load_immediate() {
        let img = image_with(&[0xDD, 0x36, 0x05, 0x7F]);
        let f = format(0, &img, None);
        assert_eq!(f.text, "LD (IX+5),$7F");
        assert_eq!(f.len, 4);
    }

    #[test]
    fn ix_undocumented_half() {
        let img = image_with(&[0xDD, 0x7C]); // LD A,HX
        let f = format(0, &img, None);
        assert_eq!(f.text, "LD A,HX");
        assert_eq!(f.len, 2);
    }

    #[test]
    fn dd_fallback_behaves_like_unprefixed() {
        let img = image_with(&[0xDD, 0x00]);
        let f = format(0, &img, None);
        assert_eq!(f.text, "NOP");
        assert_eq!(f.len, 2);
    }

    #[test]
    fn cb_bit_op() {
        let img = image_with(&[0xCB, 0x46]); // BIT 0,(HL)
        let f = format(0, &img, None);
        assert_eq!(f.text, "BIT 0,(HL)");
    }

    #[test]
    fn ddcb_bit_on_displaced_ix() {
        let img = image_with(&[0xDD, 0xCB, 0x05, 0x46]); // BIT 0,(IX+5)
        let f = format(0, &img, None);
        assert_eq!(f.text, "BIT 0,(IX+5)");
        assert_eq!(f.len, 4);
    }

    #[test]
    fn label_rendering() {
        struct AllLabels;
        impl LabelLookup for AllLabels {
            fn is_label(&self, _addr: u16) -> bool {
                true
            }
        }
        let img = image_with(&[0xC3, 0x00, 0x10]);
        let f = format(0, &img, Some(&AllLabels));
        assert_eq!(f.text, "JP L1000");
    }
}
