//! Emission dispatch: map `(mnemonic class, operands)` to bytes, retrofitting
//! any involved patch's width/address (spec.md §4.F "Emission dispatch").

use z80_core::token::{op, Cond, IndexHalf, IndexReg, Reg16, Reg8};
use z80_core::PatchWidth;

use crate::context::AsmContext;
use crate::error::AsmError;
use crate::operand::Operand;

fn unknown(line: u32, name: &str) -> AsmError {
    AsmError::UnknownAddressingMode { line, mnemonic: name.to_string() }
}

fn as_index_disp(o: Operand) -> Option<IndexReg> {
    if o.code == op::REG_IX + op::IND_DISP {
        Some(IndexReg::Ix)
    } else if o.code == op::REG_IY + op::IND_DISP {
        Some(IndexReg::Iy)
    } else {
        None
    }
}

fn as_index_paren(o: Operand) -> Option<IndexReg> {
    if o.code == op::REG_IX + op::IND_PAREN {
        Some(IndexReg::Ix)
    } else if o.code == op::REG_IY + op::IND_PAREN {
        Some(IndexReg::Iy)
    } else {
        None
    }
}

/// Write a displacement byte (the `d` in `(IX+d)`/`(IY+d)`), patched as
/// `one_byte` per spec.md §4.F.
fn emit_displacement(ctx: &mut AsmContext, o: Operand, line: u32) -> Result<(), AsmError> {
    ctx.emit_byte_patched((o.literal & 0xFF) as u8, o.patch, PatchWidth::OneByte)
        .map_err(|e| AsmError::from_image(line, e))
}

fn emit_imm8(ctx: &mut AsmContext, o: Operand, line: u32) -> Result<(), AsmError> {
    ctx.emit_byte_patched((o.literal & 0xFF) as u8, o.patch, PatchWidth::OneByte)
        .map_err(|e| AsmError::from_image(line, e))
}

fn emit_imm16(ctx: &mut AsmContext, o: Operand, line: u32) -> Result<(), AsmError> {
    ctx.emit_word_patched(o.literal, o.patch).map_err(|e| AsmError::from_image(line, e))
}

fn byte(ctx: &mut AsmContext, b: u8, line: u32) -> Result<(), AsmError> {
    ctx.emit_byte(b).map_err(|e| AsmError::from_image(line, e))
}

/// Dispatch on a mnemonic's packed `(encoding << 16) | kind` value.
///
/// # Errors
/// Any [`AsmError`] variant describing why the operands don't fit the
/// mnemonic's class.
pub fn emit(
    mnemonic_value: i32,
    name: &str,
    op1: Option<Operand>,
    op2: Option<Operand>,
    ctx: &mut AsmContext,
    line: u32,
) -> Result<(), AsmError> {
    let kind = mnemonic_value & 0xFFFF;
    let encoding = (mnemonic_value >> 16) & 0xFFFF;
    ctx.log(3, || format!("emit({name}): kind={kind:X} encoding={encoding:X} op1={op1:?} op2={op2:?}"));

    match kind {
        op::CLASS_UN_OP => emit_un_op(encoding as u8, op1, ctx, line, name),
        op::CLASS_BIN_OP => emit_bin_op(encoding as u8, op1, ctx, line, name),
        op::CLASS_OP_HL => emit_op_hl(encoding as u8, op1, ctx, line, name),
        op::CLASS_A_OP => emit_a_op(encoding as u8, op1, op2, ctx, line, name),
        op::CLASS_BIT_OP => emit_bit_op(encoding as u8, op1, op2, ctx, line, name),
        op::CLASS_IM => emit_im(op1, ctx, line),
        op::CLASS_P_OP => emit_p_op(encoding != 0, op1, op2, ctx, line, name),
        op::CLASS_I_OP => emit_i_op(encoding != 0, op1, ctx, line, name),
        op::CLASS_REF_OP => emit_ref_op(encoding, op1, op2, ctx, line, name),
        op::CLASS_RET => emit_ret(op1, ctx, line),
        op::CLASS_RST => emit_rst(op1, ctx, line),
        op::CLASS_DJNZ => emit_djnz(op1, ctx, line),
        op::CLASS_EX => emit_ex(op1, op2, ctx, line, name),
        op::CLASS_LD => emit_ld(op1, op2, ctx, line),
        op::CLASS_ST_OP => emit_st_op(encoding != 0, op1, ctx, line, name),
        op::CLASS_SH_OP => emit_sh_op(encoding as u8, op1, ctx, line, name),
        _ => Err(unknown(line, name)),
    }
}

fn emit_un_op(opcode: u8, op1: Option<Operand>, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    if op1.is_some() {
        return Err(unknown(line, name));
    }
    byte(ctx, opcode, line)
}

fn emit_bin_op(second: u8, op1: Option<Operand>, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    if op1.is_some() {
        return Err(unknown(line, name));
    }
    byte(ctx, 0xED, line)?;
    byte(ctx, second, line)
}

fn emit_op_hl(second: u8, op1: Option<Operand>, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    if let Some(o) = op1 {
        if o.code != op::REG_HL_IND {
            return Err(unknown(line, name));
        }
    }
    byte(ctx, 0xED, line)?;
    byte(ctx, second, line)
}

fn emit_alu8(y: u8, src: Operand, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    // 0x80 = 0o200: ALU r base, `10yyyzzz`.
    if let Some(r) = Reg8::from_code(src.code) {
        return byte(ctx, 0x80 | (y << 3) | r.field(), line);
    }
    if let Some(ix) = as_index_disp(src) {
        byte(ctx, ix.prefix(), line)?;
        byte(ctx, 0x80 | (y << 3) | 6, line)?;
        return emit_displacement(ctx, src, line);
    }
    if let Some(h) = IndexHalf::from_code(src.code) {
        byte(ctx, h.index().prefix(), line)?;
        return byte(ctx, 0x80 | (y << 3) | h.field(), line);
    }
    if src.code == op::OPERAND_DIRECT {
        // 0xC6 = 0o306: ALU n base, `11yyy110`.
        byte(ctx, 0xC6 | (y << 3), line)?;
        return emit_imm8(ctx, src, line);
    }
    Err(unknown(line, name))
}

fn emit_a_op(
    y: u8,
    op1: Option<Operand>,
    op2: Option<Operand>,
    ctx: &mut AsmContext,
    line: u32,
    name: &str,
) -> Result<(), AsmError> {
    let (dest, src) = match (op1, op2) {
        (Some(d), Some(s)) => (Some(d), s),
        (Some(s), None) => (None, s),
        _ => return Err(unknown(line, name)),
    };
    let Some(d) = dest else {
        return emit_alu8(y, src, ctx, line, name);
    };
    if d.code == op::REG_A {
        return emit_alu8(y, src, ctx, line, name);
    }
    if d.code == op::REG_HL && matches!(y, 0 | 1 | 3) {
        let rp = Reg16::from_code(src.code).ok_or_else(|| unknown(line, name))?;
        if matches!(rp, Reg16::Af | Reg16::AfPrime) {
            return Err(unknown(line, name));
        }
        return if y == 0 {
            byte(ctx, 0x09 | (rp.rp_field() << 4), line)
        } else {
            let base = if y == 1 { 0x4A } else { 0x42 };
            byte(ctx, 0xED, line)?;
            byte(ctx, base | (rp.rp_field() << 4), line)
        };
    }
    if (d.code == op::REG_IX || d.code == op::REG_IY) && y == 0 {
        let prefix = if d.code == op::REG_IX { 0xDD } else { 0xFD };
        let field = if src.code == op::REG_BC {
            0
        } else if src.code == op::REG_DE {
            1
        } else if src.code == d.code {
            2
        } else if src.code == op::REG_SP {
            3
        } else {
            return Err(unknown(line, name));
        };
        byte(ctx, prefix, line)?;
        return byte(ctx, 0x09 | (field << 4), line);
    }
    Err(unknown(line, name))
}

fn emit_bit_op(
    base: u8,
    op1: Option<Operand>,
    op2: Option<Operand>,
    ctx: &mut AsmContext,
    line: u32,
    name: &str,
) -> Result<(), AsmError> {
    let bit_operand = op1.ok_or_else(|| unknown(line, name))?;
    if bit_operand.patch.is_some() || !(0..=7).contains(&bit_operand.literal) {
        return Err(AsmError::OperandOutOfRange {
            line,
            detail: format!("bit index {} not in 0..7", bit_operand.literal),
        });
    }
    let bit = bit_operand.literal as u8;
    let target = op2.ok_or_else(|| unknown(line, name))?;
    if let Some(r) = Reg8::from_code(target.code) {
        // 0xCB = 0o313: the bit-op prefix (BIT/RES/SET all live behind it).
        byte(ctx, 0xCB, line)?;
        return byte(ctx, base | (bit << 3) | r.field(), line);
    }
    if let Some(ix) = as_index_disp(target) {
        byte(ctx, ix.prefix(), line)?;
        byte(ctx, 0xCB, line)?;
        emit_displacement(ctx, target, line)?;
        return byte(ctx, base | (bit << 3) | 6, line);
    }
    Err(unknown(line, name))
}

fn emit_im(op1: Option<Operand>, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let o = op1.ok_or_else(|| unknown(line, "IM"))?;
    if o.patch.is_some() {
        return Err(AsmError::UnresolvedOperand { line, context: "IM" });
    }
    let mut v = o.literal;
    if !(0..=2).contains(&v) {
        return Err(AsmError::OperandOutOfRange { line, detail: format!("IM {v} not in 0..2") });
    }
    if v > 0 {
        v += 1;
    }
    byte(ctx, 0xED, line)?;
    byte(ctx, 0x46 | ((v as u8) << 3), line)
}

fn emit_p_op(
    is_out: bool,
    op1: Option<Operand>,
    op2: Option<Operand>,
    ctx: &mut AsmContext,
    line: u32,
    name: &str,
) -> Result<(), AsmError> {
    let c_paren = op::REG_C + op::IND_PAREN;
    if !is_out {
        match (op1, op2) {
            (Some(d), Some(s)) if d.code == op::REG_A && s.code == op::OPERAND_INDIRECT_ADDR => {
                byte(ctx, 0xDB, line)?;
                emit_imm8(ctx, s, line)
            }
            (Some(d), Some(s)) if s.code == c_paren => {
                let r = Reg8::from_code(d.code).ok_or_else(|| unknown(line, name))?;
                byte(ctx, 0xED, line)?;
                byte(ctx, 0x40 | (r.field() << 3), line)
            }
            (Some(single), None) if single.code == c_paren => {
                byte(ctx, 0xED, line)?;
                byte(ctx, 0x70, line)
            }
            _ => Err(unknown(line, name)),
        }
    } else {
        match (op1, op2) {
            (Some(d), Some(s)) if d.code == op::OPERAND_INDIRECT_ADDR && s.code == op::REG_A => {
                byte(ctx, 0xD3, line)?;
                emit_imm8(ctx, d, line)
            }
            (Some(d), Some(s)) if d.code == c_paren => {
                if let Some(r) = Reg8::from_code(s.code) {
                    byte(ctx, 0xED, line)?;
                    byte(ctx, 0x41 | (r.field() << 3), line)
                } else if s.code == op::OPERAND_DIRECT && s.literal == 0 && s.patch.is_none() {
                    byte(ctx, 0xED, line)?;
                    byte(ctx, 0x71, line)
                } else {
                    Err(unknown(line, name))
                }
            }
            _ => Err(unknown(line, name)),
        }
    }
}

fn emit_i_op(is_dec: bool, op1: Option<Operand>, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    let o = op1.ok_or_else(|| unknown(line, name))?;
    if let Some(r) = Reg8::from_code(o.code) {
        let base = if is_dec { 0x05 } else { 0x04 };
        return byte(ctx, base | (r.field() << 3), line);
    }
    if let Some(ix) = as_index_disp(o) {
        byte(ctx, ix.prefix(), line)?;
        let base = if is_dec { 0x05 } else { 0x04 };
        byte(ctx, base | (6 << 3), line)?;
        return emit_displacement(ctx, o, line);
    }
    if let Some(h) = IndexHalf::from_code(o.code) {
        byte(ctx, h.index().prefix(), line)?;
        let base = if is_dec { 0x05 } else { 0x04 };
        return byte(ctx, base | (h.field() << 3), line);
    }
    if o.code == op::REG_IX || o.code == op::REG_IY {
        byte(ctx, if o.code == op::REG_IX { 0xDD } else { 0xFD }, line)?;
        return byte(ctx, if is_dec { 0x2B } else { 0x23 }, line);
    }
    if let Some(rp) = Reg16::from_code(o.code) {
        if matches!(rp, Reg16::Af | Reg16::AfPrime) {
            return Err(unknown(line, name));
        }
        let base = if is_dec { 0x0B } else { 0x03 };
        return byte(ctx, base | (rp.rp_field() << 4), line);
    }
    Err(unknown(line, name))
}

fn emit_ref_op(
    disc: i32,
    op1: Option<Operand>,
    op2: Option<Operand>,
    ctx: &mut AsmContext,
    line: u32,
    name: &str,
) -> Result<(), AsmError> {
    match disc {
        0 => match (op1, op2) {
            (Some(o), None) => {
                if let Some(ix) = as_index_paren(o) {
                    byte(ctx, ix.prefix(), line)?;
                    return byte(ctx, 0xE9, line);
                }
                if o.code == op::REG_HL_IND {
                    return byte(ctx, 0xE9, line);
                }
                // 0xC3 = 0o303: JP nn.
                byte(ctx, 0xC3, line)?;
                emit_imm16(ctx, o, line)
            }
            (Some(c), Some(t)) => {
                let cond = Cond::from_code(c.code).ok_or_else(|| unknown(line, name))?;
                byte(ctx, 0xC2 | (cond.field() << 3), line)?;
                emit_imm16(ctx, t, line)
            }
            _ => Err(unknown(line, name)),
        },
        1 => match (op1, op2) {
            (Some(t), None) => {
                let instr_addr = ctx.pc;
                // 0x18 = 0o030: JR e.
                byte(ctx, 0x18, line)?;
                ctx.emit_relative(instr_addr, t.literal, t.patch, line)
            }
            (Some(c), Some(t)) => {
                let cond = Cond::from_code(c.code).ok_or_else(|| unknown(line, name))?;
                let f = cond.jr_field().ok_or_else(|| unknown(line, name))?;
                let instr_addr = ctx.pc;
                byte(ctx, 0x20 | (f << 3), line)?;
                ctx.emit_relative(instr_addr, t.literal, t.patch, line)
            }
            _ => Err(unknown(line, name)),
        },
        2 => match (op1, op2) {
            (Some(t), None) => {
                // 0xCD = 0o315: CALL nn.
                byte(ctx, 0xCD, line)?;
                emit_imm16(ctx, t, line)
            }
            (Some(c), Some(t)) => {
                let cond = Cond::from_code(c.code).ok_or_else(|| unknown(line, name))?;
                byte(ctx, 0xC4 | (cond.field() << 3), line)?;
                emit_imm16(ctx, t, line)
            }
            _ => Err(unknown(line, name)),
        },
        _ => Err(unknown(line, name)),
    }
}

fn emit_ret(op1: Option<Operand>, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    match op1 {
        None => byte(ctx, 0xC9, line), // 0xC9 = 0o311: RET.
        Some(c) => {
            let cond = Cond::from_code(c.code).ok_or_else(|| unknown(line, "RET"))?;
            byte(ctx, 0xC0 | (cond.field() << 3), line)
        }
    }
}

fn emit_rst(op1: Option<Operand>, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let o = op1.ok_or_else(|| unknown(line, "RST"))?;
    if o.patch.is_some() {
        return Err(AsmError::UnresolvedOperand { line, context: "RST" });
    }
    // Open question (spec.md §9): bare decimal 10/18/20/28/30/38 is
    // accepted as though it were the hex vector 0x10/0x18/.../0x38.
    // spec.md §4.F also accepts the vector by index 0..7 (index i -> i*8).
    let target: u8 = match o.literal {
        0x00 | 0x08 | 0x10 | 0x18 | 0x20 | 0x28 | 0x30 | 0x38 => o.literal as u8,
        10 => 0x10,
        18 => 0x18,
        20 => 0x20,
        28 => 0x28,
        30 => 0x30,
        38 => 0x38,
        1..=7 => (o.literal as u8) * 8,
        v => return Err(AsmError::OperandOutOfRange { line, detail: format!("RST {v} is not a valid vector") }),
    };
    byte(ctx, 0xC7 | target, line) // 0xC7 = 0o307: RST base, `11ttt111`.
}

fn emit_djnz(op1: Option<Operand>, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let t = op1.ok_or_else(|| unknown(line, "DJNZ"))?;
    let instr_addr = ctx.pc;
    byte(ctx, 0x10, line)?;
    ctx.emit_relative(instr_addr, t.literal, t.patch, line)
}

fn emit_ex(
    op1: Option<Operand>,
    op2: Option<Operand>,
    ctx: &mut AsmContext,
    line: u32,
    name: &str,
) -> Result<(), AsmError> {
    let a = op1.ok_or_else(|| unknown(line, name))?;
    let b = op2.ok_or_else(|| unknown(line, name))?;
    if a.code == op::REG_SP + op::IND_PAREN {
        if b.code == op::REG_HL {
            return byte(ctx, 0xE3, line);
        }
        if b.code == op::REG_IX {
            byte(ctx, 0xDD, line)?;
            return byte(ctx, 0xE3, line);
        }
        if b.code == op::REG_IY {
            byte(ctx, 0xFD, line)?;
            return byte(ctx, 0xE3, line);
        }
    }
    if a.code == op::REG_DE && b.code == op::REG_HL {
        return byte(ctx, 0xEB, line);
    }
    if a.code == op::REG_AF && b.code == op::REG_AF_PRIME {
        return byte(ctx, 0x08, line);
    }
    Err(unknown(line, name))
}

fn emit_st_op(is_push: bool, op1: Option<Operand>, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    let o = op1.ok_or_else(|| unknown(line, name))?;
    if o.code == op::REG_IX || o.code == op::REG_IY {
        byte(ctx, if o.code == op::REG_IX { 0xDD } else { 0xFD }, line)?;
        return byte(ctx, if is_push { 0xE5 } else { 0xE1 }, line);
    }
    let field = if o.code == op::REG_BC {
        0
    } else if o.code == op::REG_DE {
        1
    } else if o.code == op::REG_HL {
        2
    } else if o.code == op::REG_AF {
        3
    } else {
        return Err(unknown(line, name));
    };
    let base = if is_push { 0xC5 } else { 0xC1 }; // 0o305/0o301: PUSH/POP qq base.
    byte(ctx, base | (field << 4), line)
}

fn emit_sh_op(y: u8, op1: Option<Operand>, ctx: &mut AsmContext, line: u32, name: &str) -> Result<(), AsmError> {
    let o = op1.ok_or_else(|| unknown(line, name))?;
    if let Some(r) = Reg8::from_code(o.code) {
        byte(ctx, 0xCB, line)?;
        return byte(ctx, (y << 3) | r.field(), line);
    }
    if let Some(ix) = as_index_disp(o) {
        byte(ctx, ix.prefix(), line)?;
        byte(ctx, 0xCB, line)?;
        emit_displacement(ctx, o, line)?;
        return byte(ctx, (y << 3) | 6, line);
    }
    Err(unknown(line, name))
}

fn emit_ld(op1: Option<Operand>, op2: Option<Operand>, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let name = "LD";
    let dst = op1.ok_or_else(|| unknown(line, name))?;
    let src = op2.ok_or_else(|| unknown(line, name))?;

    if let Some(ix) = as_index_disp(dst) {
        if src.code == op::OPERAND_DIRECT {
            byte(ctx, ix.prefix(), line)?;
            byte(ctx, 0x36, line)?;
            emit_displacement(ctx, dst, line)?;
            return emit_imm8(ctx, src, line);
        }
        if let Some(r) = Reg8::from_code(src.code) {
            if matches!(r, Reg8::HlIndirect) {
                return Err(unknown(line, name));
            }
            byte(ctx, ix.prefix(), line)?;
            byte(ctx, 0x70 | r.field(), line)?;
            return emit_displacement(ctx, dst, line);
        }
        return Err(unknown(line, name));
    }
    if let Some(ix) = as_index_disp(src) {
        if let Some(r) = Reg8::from_code(dst.code) {
            if matches!(r, Reg8::HlIndirect) {
                return Err(unknown(line, name));
            }
            byte(ctx, ix.prefix(), line)?;
            byte(ctx, 0x46 | (r.field() << 3), line)?;
            return emit_displacement(ctx, src, line);
        }
        return Err(unknown(line, name));
    }

    if let (Some(d), Some(s)) = (Reg8::from_code(dst.code), Reg8::from_code(src.code)) {
        if matches!(d, Reg8::HlIndirect) && matches!(s, Reg8::HlIndirect) {
            return Err(unknown(line, name)); // that byte pattern is HALT
        }
        return byte(ctx, 0x40 | (d.field() << 3) | s.field(), line); // 0x40 = 0o100: LD r,r' base.
    }

    if let Some(dh) = IndexHalf::from_code(dst.code) {
        if let Some(sh) = IndexHalf::from_code(src.code) {
            if dh.index().prefix() != sh.index().prefix() {
                return Err(unknown(line, name));
            }
            byte(ctx, dh.index().prefix(), line)?;
            return byte(ctx, 0x40 | (dh.field() << 3) | sh.field(), line);
        }
        if let Some(r) = Reg8::from_code(src.code) {
            if matches!(r, Reg8::H | Reg8::L | Reg8::HlIndirect) {
                return Err(unknown(line, name));
            }
            byte(ctx, dh.index().prefix(), line)?;
            return byte(ctx, 0x40 | (dh.field() << 3) | r.field(), line);
        }
        if src.code == op::OPERAND_DIRECT {
            byte(ctx, dh.index().prefix(), line)?;
            byte(ctx, 0x06 | (dh.field() << 3), line)?;
            return emit_imm8(ctx, src, line);
        }
        return Err(unknown(line, name));
    }
    if let Some(sh) = IndexHalf::from_code(src.code) {
        if let Some(r) = Reg8::from_code(dst.code) {
            if matches!(r, Reg8::H | Reg8::L | Reg8::HlIndirect) {
                return Err(unknown(line, name));
            }
            byte(ctx, sh.index().prefix(), line)?;
            return byte(ctx, 0x40 | (r.field() << 3) | sh.field(), line);
        }
        return Err(unknown(line, name));
    }

    if let Some(d) = Reg8::from_code(dst.code) {
        if src.code == op::OPERAND_DIRECT {
            byte(ctx, 0x06 | (d.field() << 3), line)?;
            return emit_imm8(ctx, src, line);
        }
    }

    let bc_paren = op::REG_BC + op::IND_PAREN;
    let de_paren = op::REG_DE + op::IND_PAREN;
    if dst.code == op::REG_A && src.code == bc_paren {
        return byte(ctx, 0x0A, line);
    }
    if dst.code == op::REG_A && src.code == de_paren {
        return byte(ctx, 0x1A, line);
    }
    if dst.code == bc_paren && src.code == op::REG_A {
        return byte(ctx, 0x02, line);
    }
    if dst.code == de_paren && src.code == op::REG_A {
        return byte(ctx, 0x12, line);
    }

    if dst.code == op::REG_A && src.code == op::OPERAND_INDIRECT_ADDR {
        byte(ctx, 0x3A, line)?;
        return emit_imm16(ctx, src, line);
    }
    if dst.code == op::OPERAND_INDIRECT_ADDR && src.code == op::REG_A {
        byte(ctx, 0x32, line)?;
        return emit_imm16(ctx, dst, line);
    }
    if dst.code == op::REG_HL && src.code == op::OPERAND_INDIRECT_ADDR {
        byte(ctx, 0x2A, line)?;
        return emit_imm16(ctx, src, line);
    }
    if dst.code == op::OPERAND_INDIRECT_ADDR && src.code == op::REG_HL {
        byte(ctx, 0x22, line)?;
        return emit_imm16(ctx, dst, line);
    }

    if src.code == op::OPERAND_INDIRECT_ADDR {
        if let Some(rp) = Reg16::from_code(dst.code) {
            if matches!(rp, Reg16::Bc | Reg16::De | Reg16::Sp) {
                byte(ctx, 0xED, line)?;
                byte(ctx, 0x4B | (rp.rp_field() << 4), line)?;
                return emit_imm16(ctx, src, line);
            }
        }
        if dst.code == op::REG_IX || dst.code == op::REG_IY {
            byte(ctx, if dst.code == op::REG_IX { 0xDD } else { 0xFD }, line)?;
            byte(ctx, 0x2A, line)?;
            return emit_imm16(ctx, src, line);
        }
    }
    if dst.code == op::OPERAND_INDIRECT_ADDR {
        if let Some(rp) = Reg16::from_code(src.code) {
            if matches!(rp, Reg16::Bc | Reg16::De | Reg16::Sp) {
                byte(ctx, 0xED, line)?;
                byte(ctx, 0x43 | (rp.rp_field() << 4), line)?;
                return emit_imm16(ctx, dst, line);
            }
        }
        if src.code == op::REG_IX || src.code == op::REG_IY {
            byte(ctx, if src.code == op::REG_IX { 0xDD } else { 0xFD }, line)?;
            byte(ctx, 0x22, line)?;
            return emit_imm16(ctx, dst, line);
        }
    }

    if src.code == op::OPERAND_DIRECT {
        if let Some(rp) = Reg16::from_code(dst.code) {
            if matches!(rp, Reg16::Bc | Reg16::De | Reg16::Hl | Reg16::Sp) {
                byte(ctx, 0x01 | (rp.rp_field() << 4), line)?; // 0x01 = 0o001: LD rp,nn base.
                return emit_imm16(ctx, src, line);
            }
        }
        if dst.code == op::REG_IX || dst.code == op::REG_IY {
            byte(ctx, if dst.code == op::REG_IX { 0xDD } else { 0xFD }, line)?;
            byte(ctx, 0x21, line)?;
            return emit_imm16(ctx, src, line);
        }
    }

    if dst.code == op::REG_SP {
        if src.code == op::REG_HL {
            return byte(ctx, 0xF9, line);
        }
        if src.code == op::REG_IX {
            byte(ctx, 0xDD, line)?;
            return byte(ctx, 0xF9, line);
        }
        if src.code == op::REG_IY {
            byte(ctx, 0xFD, line)?;
            return byte(ctx, 0xF9, line);
        }
    }

    if dst.code == op::REG_A && src.code == op::REG_I {
        byte(ctx, 0xED, line)?;
        return byte(ctx, 0x57, line);
    }
    if dst.code == op::REG_A && src.code == op::REG_R {
        byte(ctx, 0xED, line)?;
        return byte(ctx, 0x5F, line);
    }
    if dst.code == op::REG_I && src.code == op::REG_A {
        byte(ctx, 0xED, line)?;
        return byte(ctx, 0x47, line);
    }
    if dst.code == op::REG_R && src.code == op::REG_A {
        byte(ctx, 0xED, line)?;
        return byte(ctx, 0x4F, line);
    }

    Err(unknown(line, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Verbosity;

    fn ctx() -> AsmContext<'static> {
        AsmContext::new(0, Verbosity(0))
    }

    fn bare(code: i32) -> Operand {
        Operand { code, literal: 0, patch: None }
    }

    fn imm(value: i32) -> Operand {
        Operand { code: op::OPERAND_DIRECT, literal: value, patch: None }
    }

    #[test]
    fn ld_ix_plus_5_comma_immediate() {
        let mut c = ctx();
        let dst = Operand { code: op::REG_IX + op::IND_DISP, literal: 5, patch: None };
        emit_ld(Some(dst), Some(imm(0x7F)), &mut c, 1).unwrap();
        assert_eq!(c.image.read_slice(0, 4), &[0xDD, 0x36, 0x05, 0x7F]);
    }

    #[test]
    fn ld_hx_comma_a_is_undocumented_half() {
        let mut c = ctx();
        let dst = bare(op::REG_HX);
        emit_ld(Some(dst), Some(bare(op::REG_A)), &mut c, 1).unwrap();
        assert_eq!(c.image.read_slice(0, 2), &[0xDD, 0x67]);
    }

    #[test]
    fn jp_unconditional_absolute() {
        let mut c = ctx();
        emit_ref_op(0, Some(imm(0x0104)), None, &mut c, 1, "JP").unwrap();
        assert_eq!(c.image.read_slice(0, 3), &[0xC3, 0x04, 0x01]);
    }

    #[test]
    fn jp_indirect_hl_and_ix() {
        let mut c = ctx();
        emit_ref_op(0, Some(bare(op::REG_HL_IND)), None, &mut c, 1, "JP").unwrap();
        assert_eq!(c.image.read_slice(0, 1), &[0xE9]);

        let mut c2 = ctx();
        emit_ref_op(0, Some(bare(op::REG_IX + op::IND_PAREN)), None, &mut c2, 1, "JP").unwrap();
        assert_eq!(c2.image.read_slice(0, 2), &[0xDD, 0xE9]);
    }

    #[test]
    fn rst_bare_decimal_coercion() {
        let mut c = ctx();
        emit_rst(Some(imm(10)), &mut c, 1).unwrap();
        assert_eq!(c.image.read(0), 0xC7 | 0x10);
    }

    #[test]
    fn rst_accepts_index_form() {
        let mut c = ctx();
        emit_rst(Some(imm(2)), &mut c, 1).unwrap();
        assert_eq!(c.image.read(0), 0xC7 | 0x10);
    }

    #[test]
    fn ex_af_af_prime() {
        let mut c = ctx();
        emit_ex(Some(bare(op::REG_AF)), Some(bare(op::REG_AF_PRIME)), &mut c, 1, "EX").unwrap();
        assert_eq!(c.image.read(0), 0x08);
    }

    #[test]
    fn bit_op_range_checks() {
        let mut c = ctx();
        let bad_bit = Operand { code: op::OPERAND_DIRECT, literal: 9, patch: None };
        assert!(emit_bit_op(0x40, Some(bad_bit), Some(bare(op::REG_A)), &mut c, 1, "BIT").is_err());
    }

    #[test]
    fn push_ix() {
        let mut c = ctx();
        emit_st_op(true, Some(bare(op::REG_IX)), &mut c, 1, "PUSH").unwrap();
        assert_eq!(c.image.read_slice(0, 2), &[0xDD, 0xE5]);
    }

    #[test]
    fn add_hl_bc() {
        let mut c = ctx();
        emit_a_op(0, Some(bare(op::REG_HL)), Some(bare(op::REG_BC)), &mut c, 1, "ADD").unwrap();
        assert_eq!(c.image.read(0), 0x09);
    }

    #[test]
    fn djnz_relative() {
        let mut c = ctx();
        c.pc = 0x10;
        emit_djnz(Some(imm(0x10)), &mut c, 1).unwrap();
        // target == instr addr: disp = 0x10 - 0x10 - 2 = -2
        assert_eq!(c.image.read(0x10), 0x10);
        assert_eq!(c.image.read(0x11), (-2i32) as u8);
    }
}
