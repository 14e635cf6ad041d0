//! The token model shared by the lexer, the expression evaluator, and the
//! assembler (spec.md §3 "Token").
//!
//! Codes are partitioned exactly as spec.md §3 describes, so that
//! addressing-mode and class checks in the assembler reduce to cheap range
//! checks on a plain `i32`, while still exposing a typed, enum-shaped API
//! per the re-architecture note in spec.md §9 ("register codes as magic
//! integers become a tagged enum variant whose class can be recovered by a
//! cheap numeric predicate").

use crate::symtab::SymbolId;

/// A single token produced by the lexer (spec.md §3 "Token").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Sentinel terminating a tokenized line.
    Bad,
    /// A resolved numeric literal, or the current PC (`$`).
    Num(i32),
    /// Raw bytes between double quotes, original case preserved.
    Str(Vec<u8>),
    /// A handle into the symbol table for a user symbol.
    Sym(SymbolId),
    /// A reserved word or punctuation code (see the `op` module below).
    Op(i32),
}

impl Token {
    #[must_use]
    pub const fn is_bad(&self) -> bool {
        matches!(self, Token::Bad)
    }

    /// The raw code if this is an `Op` token.
    #[must_use]
    pub const fn op_code(&self) -> Option<i32> {
        match self {
            Token::Op(c) => Some(*c),
            _ => None,
        }
    }
}

/// Token code constants and the range layout from spec.md §3.
pub mod op {
    // --- 0x000-0x0FF: literal ASCII punctuation, plus two synthetic shifts.
    // The original CasDasZ80 source puns `>>`/`<<` onto the unused brace
    // characters; kept here for the same reason: it stays inside the 1-byte
    // punctuation range without a second reserved block.
    pub const SHR: i32 = b'}' as i32; // 0x7D, synthetic '>>'
    pub const SHL: i32 = b'{' as i32; // 0x7B, synthetic '<<'

    // --- 0x100-0x1FF: pseudo-ops.
    pub const DB: i32 = 0x100;
    pub const DM: i32 = 0x101;
    pub const DS: i32 = 0x102;
    pub const DW: i32 = 0x103;
    pub const END: i32 = 0x104;
    pub const EQU: i32 = 0x105;
    pub const ORG: i32 = 0x106;
    pub const IF: i32 = 0x107;
    pub const ENDIF: i32 = 0x108;
    pub const ELSE: i32 = 0x109;
    pub const PRINT: i32 = 0x10A;
    pub const FILL: i32 = 0x10B;

    pub const PSEUDO_LO: i32 = 0x100;
    pub const PSEUDO_HI: i32 = 0x1FF;

    // --- 0x200-0x2FF: mnemonic classes.
    pub const CLASS_UN_OP: i32 = 0x200;
    pub const CLASS_BIN_OP: i32 = 0x201;
    pub const CLASS_OP_HL: i32 = 0x202;
    pub const CLASS_A_OP: i32 = 0x203;
    pub const CLASS_BIT_OP: i32 = 0x204;
    pub const CLASS_IM: i32 = 0x205;
    pub const CLASS_P_OP: i32 = 0x206; // IN / OUT
    pub const CLASS_I_OP: i32 = 0x207; // INC / DEC
    pub const CLASS_REF_OP: i32 = 0x208; // JP / JR / CALL
    pub const CLASS_RET: i32 = 0x209;
    pub const CLASS_RST: i32 = 0x20A;
    pub const CLASS_DJNZ: i32 = 0x20B;
    pub const CLASS_EX: i32 = 0x20C;
    pub const CLASS_LD: i32 = 0x20D;
    pub const CLASS_ST_OP: i32 = 0x20E; // PUSH / POP
    pub const CLASS_SH_OP: i32 = 0x20F; // shifts / rotates

    pub const CLASS_LO: i32 = 0x200;
    pub const CLASS_HI: i32 = 0x2FF;

    // --- 0x300-0x3FF: registers, partitioned by nibble.
    pub const REG_B: i32 = 0x300;
    pub const REG_C: i32 = 0x301;
    pub const REG_D: i32 = 0x302;
    pub const REG_E: i32 = 0x303;
    pub const REG_H: i32 = 0x304;
    pub const REG_L: i32 = 0x305;
    pub const REG_HL_IND: i32 = 0x306; // (HL), folded into the 8-bit slot
    pub const REG_A: i32 = 0x307;

    pub const REG8_LO: i32 = 0x300;
    pub const REG8_HI: i32 = 0x307;

    pub const REG_BC: i32 = 0x310;
    pub const REG_DE: i32 = 0x311;
    pub const REG_HL: i32 = 0x312;
    pub const REG_SP: i32 = 0x313;
    pub const REG_AF: i32 = 0x314;
    pub const REG_AF_PRIME: i32 = REG_AF + 1; // 0x315

    pub const REG16_LO: i32 = 0x310;
    pub const REG16_HI: i32 = 0x313;

    pub const REG_IX: i32 = 0x330;
    pub const REG_IY: i32 = 0x331;

    pub const REG_I: i32 = 0x340;
    pub const REG_R: i32 = 0x341;

    // Undocumented halves of IX/IY.
    pub const REG_HX: i32 = 0x350;
    pub const REG_LX: i32 = 0x351;
    pub const REG_HY: i32 = 0x352;
    pub const REG_LY: i32 = 0x353;

    pub const REG_LO: i32 = 0x300;
    pub const REG_HI: i32 = 0x3FF;

    // Indirect-form offsets, added to the base register code.
    pub const IND_PAREN: i32 = 0x200; // (R)
    pub const IND_DISP: i32 = 0x300; // (R+d)

    // --- 0x400-0x4FF: branch conditions (C is the register C, positional).
    pub const COND_NZ: i32 = 0x400;
    pub const COND_Z: i32 = 0x401;
    pub const COND_NC: i32 = 0x402;
    pub const COND_PO: i32 = 0x403;
    pub const COND_PE: i32 = 0x404;
    pub const COND_P: i32 = 0x405;
    pub const COND_M: i32 = 0x406;

    pub const COND_LO: i32 = 0x400;
    pub const COND_HI: i32 = 0x406;

    // Sentinel operand codes from the original CasDasZ80 `GetOperand`:
    // `(expr)` indirect address, and bare `expr` direct/immediate.
    pub const OPERAND_INDIRECT_ADDR: i32 = 0x280;
    pub const OPERAND_DIRECT: i32 = 0x281;
}

/// An 8-bit register, including the folded `(HL)` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg8 {
    B,
    C,
    D,
    E,
    H,
    L,
    HlIndirect,
    A,
}

impl Reg8 {
    #[must_use]
    pub const fn code(self) -> i32 {
        op::REG8_LO + self as i32
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        if code < op::REG8_LO || code > op::REG8_HI {
            return None;
        }
        Some(match code - op::REG8_LO {
            0 => Self::B,
            1 => Self::C,
            2 => Self::D,
            3 => Self::E,
            4 => Self::H,
            5 => Self::L,
            6 => Self::HlIndirect,
            _ => Self::A,
        })
    }

    /// The 3-bit `r`/`r'` field used by most single-byte opcodes.
    #[must_use]
    pub const fn field(self) -> u8 {
        self as u8
    }
}

/// A 16-bit register pair, in `rp` encoding order (`BC,DE,HL,SP`), plus the
/// synthetic `AF`/`AF'` pair used only by `PUSH`/`POP`/`EX AF,AF'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg16 {
    Bc,
    De,
    Hl,
    Sp,
    Af,
    AfPrime,
}

impl Reg16 {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Bc => op::REG_BC,
            Self::De => op::REG_DE,
            Self::Hl => op::REG_HL,
            Self::Sp => op::REG_SP,
            Self::Af => op::REG_AF,
            Self::AfPrime => op::REG_AF_PRIME,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            op::REG_BC => Self::Bc,
            op::REG_DE => Self::De,
            op::REG_HL => Self::Hl,
            op::REG_SP => Self::Sp,
            op::REG_AF => Self::Af,
            op::REG_AF_PRIME => Self::AfPrime,
            _ => return None,
        })
    }

    /// The 2-bit `rp` field used by `LD rp,nn` / `ADD HL,rp` / `INC rp`.
    /// Only meaningful for `Bc`/`De`/`Hl`/`Sp`.
    #[must_use]
    pub const fn rp_field(self) -> u8 {
        match self {
            Self::Bc => 0,
            Self::De => 1,
            Self::Hl => 2,
            Self::Sp | Self::Af => 3,
            Self::AfPrime => 3,
        }
    }
}

/// An index register, `IX` or `IY`, with its `DD`/`FD` prefix byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexReg {
    Ix,
    Iy,
}

impl IndexReg {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Ix => op::REG_IX,
            Self::Iy => op::REG_IY,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            op::REG_IX => Self::Ix,
            op::REG_IY => Self::Iy,
            _ => return None,
        })
    }

    /// The prefix byte: `0xDD` for IX, `0xFD` for IY.
    #[must_use]
    pub const fn prefix(self) -> u8 {
        match self {
            Self::Ix => 0xDD,
            Self::Iy => 0xFD,
        }
    }
}

/// The undocumented high/low halves of `IX`/`IY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexHalf {
    Hx,
    Lx,
    Hy,
    Ly,
}

impl IndexHalf {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Hx => op::REG_HX,
            Self::Lx => op::REG_LX,
            Self::Hy => op::REG_HY,
            Self::Ly => op::REG_LY,
        }
    }

    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            op::REG_HX => Self::Hx,
            op::REG_LX => Self::Lx,
            op::REG_HY => Self::Hy,
            op::REG_LY => Self::Ly,
            _ => return None,
        })
    }

    #[must_use]
    pub const fn index(self) -> IndexReg {
        match self {
            Self::Hx | Self::Lx => IndexReg::Ix,
            Self::Hy | Self::Ly => IndexReg::Iy,
        }
    }

    /// The low 3-bit field used in place of H/L (6/5) when prefixed by
    /// `DD`/`FD`.
    #[must_use]
    pub const fn field(self) -> u8 {
        match self {
            Self::Hx | Self::Hy => 4,
            Self::Lx | Self::Ly => 5,
        }
    }
}

/// A branch condition. `C` is deliberately absent: it is the register `C`
/// (`op::REG_C`), disambiguated positionally by the caller (spec.md §4.F).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Nz,
    Z,
    Nc,
    C,
    Po,
    Pe,
    P,
    M,
}

impl Cond {
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Nz => op::COND_NZ,
            Self::Z => op::COND_Z,
            Self::Nc => op::COND_NC,
            Self::C => op::REG_C,
            Self::Po => op::COND_PO,
            Self::Pe => op::COND_PE,
            Self::P => op::COND_P,
            Self::M => op::COND_M,
        }
    }

    /// Parse a condition from a token code, treating the register `C` code
    /// as the condition `C` (valid only in condition position).
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            op::COND_NZ => Self::Nz,
            op::COND_Z => Self::Z,
            op::COND_NC => Self::Nc,
            op::REG_C => Self::C,
            op::COND_PO => Self::Po,
            op::COND_PE => Self::Pe,
            op::COND_P => Self::P,
            op::COND_M => Self::M,
            _ => return None,
        })
    }

    /// The 3-bit `cc` field used by `JP cc,nn` / `CALL cc,nn` / `RET cc`.
    #[must_use]
    pub const fn field(self) -> u8 {
        self as u8
    }

    /// The 2-bit field used by `JR cc,e`, which only has the first four.
    #[must_use]
    pub const fn jr_field(self) -> Option<u8> {
        match self {
            Self::Nz => Some(0),
            Self::Z => Some(1),
            Self::Nc => Some(2),
            Self::C => Some(3),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reg8_round_trips() {
        for r in [
            Reg8::B,
            Reg8::C,
            Reg8::D,
            Reg8::E,
            Reg8::H,
            Reg8::L,
            Reg8::HlIndirect,
            Reg8::A,
        ] {
            assert_eq!(Reg8::from_code(r.code()), Some(r));
        }
    }

    #[test]
    fn hl_indirect_is_0x306() {
        assert_eq!(Reg8::HlIndirect.code(), 0x306);
    }

    #[test]
    fn indexed_displacement_is_0x630_for_ix() {
        assert_eq!(IndexReg::Ix.code() + op::IND_DISP, 0x630);
    }

    #[test]
    fn cond_c_aliases_register_c() {
        assert_eq!(Cond::C.code(), op::REG_C);
        assert_eq!(Cond::from_code(op::REG_C), Some(Cond::C));
    }
}
