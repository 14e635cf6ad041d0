//! Reserved-word tables seeded into the symbol table at startup
//! (spec.md §4.C "Reserved words are interned at startup").
//!
//! Each mnemonic stores a small per-class parameter in its packed `value`
//! (see [`z80_core::symtab::SymbolTable::define_reserved`]): a single ALU
//! selector, a CB-prefixed operation base byte, a fixed two-byte `ED xx`
//! pair, or a direction flag, depending on the mnemonic's class. `z80-asm`
//! interprets that parameter; this module only seeds it.

use z80_core::token::op;
use z80_core::SymbolTable;

struct Entry {
    name: &'static str,
    kind: u16,
    encoding: i32,
}

const PSEUDO: &[Entry] = &[
    Entry { name: "DEFB", kind: op::DB as u16, encoding: 0 },
    Entry { name: "DB", kind: op::DB as u16, encoding: 0 },
    Entry { name: "DEFM", kind: op::DM as u16, encoding: 0 },
    Entry { name: "DM", kind: op::DM as u16, encoding: 0 },
    Entry { name: "DEFS", kind: op::DS as u16, encoding: 0 },
    Entry { name: "DS", kind: op::DS as u16, encoding: 0 },
    Entry { name: "DEFW", kind: op::DW as u16, encoding: 0 },
    Entry { name: "DW", kind: op::DW as u16, encoding: 0 },
    Entry { name: "END", kind: op::END as u16, encoding: 0 },
    Entry { name: "EQU", kind: op::EQU as u16, encoding: 0 },
    Entry { name: "ORG", kind: op::ORG as u16, encoding: 0 },
    Entry { name: "IF", kind: op::IF as u16, encoding: 0 },
    Entry { name: "ENDIF", kind: op::ENDIF as u16, encoding: 0 },
    Entry { name: "ELSE", kind: op::ELSE as u16, encoding: 0 },
    Entry { name: "PRINT", kind: op::PRINT as u16, encoding: 0 },
    Entry { name: "FILL", kind: op::FILL as u16, encoding: 0 },
];

/// `UnOp`: bare opcode byte, no operands.
const UN_OPS: &[Entry] = &[
    Entry { name: "CCF", kind: op::CLASS_UN_OP as u16, encoding: 0x3F }, // 0077
    Entry { name: "CPL", kind: op::CLASS_UN_OP as u16, encoding: 0x2F }, // 0057
    Entry { name: "DAA", kind: op::CLASS_UN_OP as u16, encoding: 0x27 }, // 0047
    Entry { name: "DI", kind: op::CLASS_UN_OP as u16, encoding: 0xF3 },  // 0363
    Entry { name: "EI", kind: op::CLASS_UN_OP as u16, encoding: 0xFB },  // 0373
    Entry { name: "EXX", kind: op::CLASS_UN_OP as u16, encoding: 0xD9 }, // 0331
    Entry { name: "HALT", kind: op::CLASS_UN_OP as u16, encoding: 0x76 }, // 0166
    Entry { name: "NOP", kind: op::CLASS_UN_OP as u16, encoding: 0x00 },
    Entry { name: "RLA", kind: op::CLASS_UN_OP as u16, encoding: 0x17 },  // 0027
    Entry { name: "RLCA", kind: op::CLASS_UN_OP as u16, encoding: 0x07 }, // 0007
    Entry { name: "RRA", kind: op::CLASS_UN_OP as u16, encoding: 0x1F },  // 0037
    Entry { name: "RRCA", kind: op::CLASS_UN_OP as u16, encoding: 0x0F }, // 0017
    Entry { name: "SCF", kind: op::CLASS_UN_OP as u16, encoding: 0x37 },  // 0067
];

/// `BinOp`: fixed two-byte `ED xx` opcode, no operands.
const BIN_OPS: &[Entry] = &[
    Entry { name: "CPD", kind: op::CLASS_BIN_OP as u16, encoding: 0xA9 },
    Entry { name: "CPDR", kind: op::CLASS_BIN_OP as u16, encoding: 0xB9 },
    Entry { name: "CPI", kind: op::CLASS_BIN_OP as u16, encoding: 0xA1 },
    Entry { name: "CPIR", kind: op::CLASS_BIN_OP as u16, encoding: 0xB1 },
    Entry { name: "IND", kind: op::CLASS_BIN_OP as u16, encoding: 0xAA },
    Entry { name: "INDR", kind: op::CLASS_BIN_OP as u16, encoding: 0xBA },
    Entry { name: "INI", kind: op::CLASS_BIN_OP as u16, encoding: 0xA2 },
    Entry { name: "INIR", kind: op::CLASS_BIN_OP as u16, encoding: 0xB2 },
    Entry { name: "LDD", kind: op::CLASS_BIN_OP as u16, encoding: 0xA8 },
    Entry { name: "LDDR", kind: op::CLASS_BIN_OP as u16, encoding: 0xB8 },
    Entry { name: "LDI", kind: op::CLASS_BIN_OP as u16, encoding: 0xA0 },
    Entry { name: "LDIR", kind: op::CLASS_BIN_OP as u16, encoding: 0xB0 },
    Entry { name: "NEG", kind: op::CLASS_BIN_OP as u16, encoding: 0x44 },
    Entry { name: "OTDR", kind: op::CLASS_BIN_OP as u16, encoding: 0xBB },
    Entry { name: "OTIR", kind: op::CLASS_BIN_OP as u16, encoding: 0xB3 },
    Entry { name: "OUTD", kind: op::CLASS_BIN_OP as u16, encoding: 0xAB },
    Entry { name: "OUTI", kind: op::CLASS_BIN_OP as u16, encoding: 0xA3 },
    Entry { name: "RETI", kind: op::CLASS_BIN_OP as u16, encoding: 0x4D },
    Entry { name: "RETN", kind: op::CLASS_BIN_OP as u16, encoding: 0x45 },
];

/// `OpHL`: fixed `ED xx`, operand absent or `(HL)` only.
const OP_HL: &[Entry] = &[
    Entry { name: "RLD", kind: op::CLASS_OP_HL as u16, encoding: 0x6F },
    Entry { name: "RRD", kind: op::CLASS_OP_HL as u16, encoding: 0x67 },
];

/// `AOp`: arithmetic/logical on `A`. Encoding is the 3-bit ALU selector
/// `y` such that `ADD A,r = 0x80|(y<<3)|r` and `ADD A,n = 0xC6|(y<<3)`.
const A_OPS: &[Entry] = &[
    Entry { name: "ADD", kind: op::CLASS_A_OP as u16, encoding: 0 },
    Entry { name: "ADC", kind: op::CLASS_A_OP as u16, encoding: 1 },
    Entry { name: "SUB", kind: op::CLASS_A_OP as u16, encoding: 2 },
    Entry { name: "SBC", kind: op::CLASS_A_OP as u16, encoding: 3 },
    Entry { name: "AND", kind: op::CLASS_A_OP as u16, encoding: 4 },
    Entry { name: "XOR", kind: op::CLASS_A_OP as u16, encoding: 5 },
    Entry { name: "OR", kind: op::CLASS_A_OP as u16, encoding: 6 },
    Entry { name: "CP", kind: op::CLASS_A_OP as u16, encoding: 7 },
];

/// `BitOp`: `BIT`/`RES`/`SET`, `CB`-prefixed; encoding is the base byte
/// that the bit number and register field are OR'd into.
const BIT_OPS: &[Entry] = &[
    Entry { name: "BIT", kind: op::CLASS_BIT_OP as u16, encoding: 0x40 },
    Entry { name: "RES", kind: op::CLASS_BIT_OP as u16, encoding: 0x80 },
    Entry { name: "SET", kind: op::CLASS_BIT_OP as u16, encoding: 0xC0 },
];

/// `ShOp`: shift/rotate family, `CB`-prefixed; encoding is the 3-bit `y`
/// selector (`RLC=0,RRC=1,RL=2,RR=3,SLA=4,SRA=5,SLL=6,SRL=7`).
const SH_OPS: &[Entry] = &[
    Entry { name: "RLC", kind: op::CLASS_SH_OP as u16, encoding: 0 },
    Entry { name: "RRC", kind: op::CLASS_SH_OP as u16, encoding: 1 },
    Entry { name: "RL", kind: op::CLASS_SH_OP as u16, encoding: 2 },
    Entry { name: "RR", kind: op::CLASS_SH_OP as u16, encoding: 3 },
    Entry { name: "SLA", kind: op::CLASS_SH_OP as u16, encoding: 4 },
    Entry { name: "SRA", kind: op::CLASS_SH_OP as u16, encoding: 5 },
    Entry { name: "SLL", kind: op::CLASS_SH_OP as u16, encoding: 6 }, // undocumented
    Entry { name: "SRL", kind: op::CLASS_SH_OP as u16, encoding: 7 },
];

/// `IOp`: `INC`/`DEC`. Encoding: 0 = INC, 1 = DEC.
const I_OPS: &[Entry] = &[
    Entry { name: "INC", kind: op::CLASS_I_OP as u16, encoding: 0 },
    Entry { name: "DEC", kind: op::CLASS_I_OP as u16, encoding: 1 },
];

/// `POp`: `IN`/`OUT`. Encoding: 0 = IN, 1 = OUT.
const P_OPS: &[Entry] = &[
    Entry { name: "IN", kind: op::CLASS_P_OP as u16, encoding: 0 },
    Entry { name: "OUT", kind: op::CLASS_P_OP as u16, encoding: 1 },
];

/// `StOp`: `PUSH`/`POP`. Encoding: 0 = POP, 1 = PUSH.
const ST_OPS: &[Entry] = &[
    Entry { name: "POP", kind: op::CLASS_ST_OP as u16, encoding: 0 },
    Entry { name: "PUSH", kind: op::CLASS_ST_OP as u16, encoding: 1 },
];

/// `RefOp`: `JP`/`JR`/`CALL`. Encoding: 0 = JP, 1 = JR, 2 = CALL.
const REF_OPS: &[Entry] = &[
    Entry { name: "JP", kind: op::CLASS_REF_OP as u16, encoding: 0 },
    Entry { name: "JR", kind: op::CLASS_REF_OP as u16, encoding: 1 },
    Entry { name: "CALL", kind: op::CLASS_REF_OP as u16, encoding: 2 },
];

const SINGLE_MNEMONIC_CLASSES: &[Entry] = &[
    Entry { name: "LD", kind: op::CLASS_LD as u16, encoding: 0 },
    Entry { name: "EX", kind: op::CLASS_EX as u16, encoding: 0 },
    Entry { name: "RET", kind: op::CLASS_RET as u16, encoding: 0 },
    Entry { name: "RST", kind: op::CLASS_RST as u16, encoding: 0 },
    Entry { name: "DJNZ", kind: op::CLASS_DJNZ as u16, encoding: 0 },
    Entry { name: "IM", kind: op::CLASS_IM as u16, encoding: 0 },
];

const REGISTERS_8: &[Entry] = &[
    Entry { name: "A", kind: op::REG_A as u16, encoding: 0 },
    Entry { name: "B", kind: op::REG_B as u16, encoding: 0 },
    Entry { name: "C", kind: op::REG_C as u16, encoding: 0 },
    Entry { name: "D", kind: op::REG_D as u16, encoding: 0 },
    Entry { name: "E", kind: op::REG_E as u16, encoding: 0 },
    Entry { name: "H", kind: op::REG_H as u16, encoding: 0 },
    Entry { name: "L", kind: op::REG_L as u16, encoding: 0 },
];

const REGISTERS_OTHER: &[Entry] = &[
    Entry { name: "AF", kind: op::REG_AF as u16, encoding: 0 },
    Entry { name: "BC", kind: op::REG_BC as u16, encoding: 0 },
    Entry { name: "DE", kind: op::REG_DE as u16, encoding: 0 },
    Entry { name: "HL", kind: op::REG_HL as u16, encoding: 0 },
    Entry { name: "SP", kind: op::REG_SP as u16, encoding: 0 },
    Entry { name: "IX", kind: op::REG_IX as u16, encoding: 0 },
    Entry { name: "IY", kind: op::REG_IY as u16, encoding: 0 },
    Entry { name: "I", kind: op::REG_I as u16, encoding: 0 },
    Entry { name: "R", kind: op::REG_R as u16, encoding: 0 },
    // Undocumented halves of IX/IY. "X"/"Y" are the common mnemonics for
    // IXL/IYL used by most Z80 assemblers and disassemblers.
    Entry { name: "HX", kind: op::REG_HX as u16, encoding: 0 },
    Entry { name: "LX", kind: op::REG_LX as u16, encoding: 0 },
    Entry { name: "X", kind: op::REG_LX as u16, encoding: 0 },
    Entry { name: "HY", kind: op::REG_HY as u16, encoding: 0 },
    Entry { name: "LY", kind: op::REG_LY as u16, encoding: 0 },
    Entry { name: "Y", kind: op::REG_LY as u16, encoding: 0 },
];

const CONDITIONS: &[Entry] = &[
    // `C` is deliberately absent: it is the register `C`, disambiguated
    // positionally (spec.md §4.F).
    Entry { name: "M", kind: op::COND_M as u16, encoding: 0 },
    Entry { name: "NC", kind: op::COND_NC as u16, encoding: 0 },
    Entry { name: "NZ", kind: op::COND_NZ as u16, encoding: 0 },
    Entry { name: "P", kind: op::COND_P as u16, encoding: 0 },
    Entry { name: "PE", kind: op::COND_PE as u16, encoding: 0 },
    Entry { name: "PO", kind: op::COND_PO as u16, encoding: 0 },
    Entry { name: "Z", kind: op::COND_Z as u16, encoding: 0 },
];

const TABLES: &[&[Entry]] = &[
    PSEUDO,
    UN_OPS,
    BIN_OPS,
    OP_HL,
    A_OPS,
    BIT_OPS,
    SH_OPS,
    I_OPS,
    P_OPS,
    ST_OPS,
    REF_OPS,
    SINGLE_MNEMONIC_CLASSES,
    REGISTERS_8,
    REGISTERS_OTHER,
    CONDITIONS,
];

/// Seed every reserved word into a fresh symbol table, matching
/// `InitSymTab` in the original source. Call exactly once per assembly.
pub fn seed(symtab: &mut SymbolTable) {
    for table in TABLES {
        for entry in *table {
            symtab.define_reserved(entry.name, entry.kind, entry.encoding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_is_idempotent_on_a_fresh_table() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let nop = t.lookup("NOP").expect("NOP seeded");
        assert_eq!(t.get(nop).kind, op::CLASS_UN_OP as u16);
    }

    #[test]
    fn condition_c_is_not_seeded_separately() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let c = t.lookup("C").expect("register C seeded");
        assert_eq!(t.get(c).kind, op::REG_C as u16);
    }
}
