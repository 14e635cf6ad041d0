//! One-pass Z80 assembler: tokenize, classify operands, emit, back-patch
//! (spec.md §4 end to end).

pub mod context;
pub mod emit;
pub mod error;
pub mod label;
pub mod operand;
pub mod pseudo;

use z80_core::token::op;
use z80_core::{Image, SymbolId, SymbolTable, Token};

pub use context::{AssemblerOptions, AsmContext, Gate, Verbosity};
pub use error::AsmError;

/// Everything produced by a successful [`assemble`] run.
pub struct AssembleOutput {
    pub image: Image,
    pub symtab: SymbolTable,
    /// Names of symbols still undefined at EOF (spec.md §4.F cross-reference).
    pub undefined_symbols: Vec<String>,
    /// Rendered `-l` listing, if [`AssemblerOptions::listing`] was set.
    pub listing: Option<String>,
}

/// Assemble `source` start to finish.
///
/// # Errors
/// The first [`AsmError`] encountered, with its 1-based source line.
pub fn assemble(source: &str, options: &AssemblerOptions) -> Result<AssembleOutput, AsmError> {
    let mut ctx = AsmContext::new(options.fill, options.verbosity);
    z80_lexer::seed(&mut ctx.symtab);
    ctx.pc = u32::from(options.load_offset);

    let mut listing_buf = options.listing.then(String::new);

    for raw_line in source.lines() {
        let starting_pc = ctx.pc;
        let keep_going = process_line(raw_line, &mut ctx)?;
        if let Some(buf) = listing_buf.as_mut() {
            use std::fmt::Write as _;
            let _ = writeln!(buf, "{starting_pc:04X}  {raw_line}");
        }
        if !keep_going {
            break;
        }
    }

    if ctx.gate.is_some() {
        return Err(AsmError::UnterminatedIf { line: ctx.line_no });
    }

    let undefined_symbols = label::report_undefined(&ctx.symtab);
    Ok(AssembleOutput { image: ctx.image, symtab: ctx.symtab, undefined_symbols, listing: listing_buf })
}

/// Process one source line. Returns `false` if `END` was reached.
fn process_line(raw: &str, ctx: &mut AsmContext) -> Result<bool, AsmError> {
    ctx.line_no += 1;
    let line = ctx.line_no;
    ctx.log(2, || format!("CompileLine({line})"));
    let pc_for_dollar = ctx.pc as i32;
    let tokens = z80_lexer::tokenize_line(raw, pc_for_dollar, &mut ctx.symtab).map_err(|e| AsmError::from_lex(line, e))?;

    if ctx.is_swallowing() {
        return match tokens.first() {
            Some(Token::Op(c)) if *c == op::ELSE => {
                pseudo::else_directive(ctx, line)?;
                Ok(true)
            }
            Some(Token::Op(c)) if *c == op::ENDIF => {
                pseudo::endif_directive(ctx, line)?;
                Ok(true)
            }
            Some(Token::Op(c)) if *c == op::END => {
                if ctx.gate.is_some() {
                    return Err(AsmError::UnterminatedIf { line });
                }
                Ok(false)
            }
            _ => Ok(true),
        };
    }

    let mut pos = 0usize;
    let mut label: Option<SymbolId> = None;
    let mut equ_target = false;
    if let Some(Token::Sym(id)) = tokens.first().cloned() {
        match tokens.get(1) {
            Some(Token::Op(c)) if *c == i32::from(b':') => {
                label = Some(id);
                pos = 2;
            }
            Some(Token::Op(c)) if *c == op::EQU => {
                label = Some(id);
                equ_target = true;
                pos = 2;
            }
            _ => {
                label = Some(id);
                pos = 1;
            }
        }
    }

    if equ_target {
        let id = label.expect("equ_target implies label");
        let value = pseudo::eval_resolved(&tokens, &mut pos, ctx, line, "EQU")?;
        pseudo::expect_end_of_statement(&tokens, pos, line, "trailing tokens after EQU operand")?;
        label::define_and_drain(ctx, id, value, line)?;
        return Ok(true);
    }

    if let Some(id) = label {
        label::define_and_drain(ctx, id, ctx.pc as i32, line)?;
    }

    match tokens.get(pos).cloned() {
        None | Some(Token::Bad) => Ok(true),
        Some(Token::Op(code)) => {
            let kind = code & 0xFFFF;
            if pseudo::is_pseudo(kind) {
                ctx.log(2, || format!("DoPseudo({kind:X})"));
                pos += 1;
                dispatch_pseudo(kind, &tokens, &mut pos, ctx, line)
            } else if (op::CLASS_LO..=op::CLASS_HI).contains(&kind) {
                ctx.log(2, || format!("DoOpcode({code:X})"));
                pos += 1;
                let (op1, op2) = parse_operands(&tokens, &mut pos, ctx, line)?;
                emit::emit(code, class_label(kind), op1, op2, ctx, line)?;
                pseudo::expect_end_of_statement(&tokens, pos, line, "trailing tokens after instruction operands")?;
                Ok(true)
            } else {
                Err(AsmError::UnknownAddressingMode { line, mnemonic: "?".to_string() })
            }
        }
        Some(Token::Sym(_)) => {
            Err(AsmError::MalformedOperands { line, detail: "expected a mnemonic or pseudo-op".to_string() })
        }
        _ => Err(AsmError::MalformedOperands { line, detail: "expected a mnemonic or pseudo-op".to_string() }),
    }
}

fn parse_operands(
    tokens: &[Token],
    pos: &mut usize,
    ctx: &mut AsmContext,
    line: u32,
) -> Result<(Option<operand::Operand>, Option<operand::Operand>), AsmError> {
    if tokens.get(*pos).is_some_and(Token::is_bad) {
        return Ok((None, None));
    }
    ctx.log(2, || format!("GetOperand(pos={pos})"));
    let op1 = operand::classify(tokens, pos, &mut ctx.symtab, line)?;
    if let Some(Token::Op(c)) = tokens.get(*pos) {
        if *c == i32::from(b',') {
            *pos += 1;
            ctx.log(2, || format!("GetOperand(pos={pos})"));
            let op2 = operand::classify(tokens, pos, &mut ctx.symtab, line)?;
            return Ok((Some(op1), Some(op2)));
        }
    }
    Ok((Some(op1), None))
}

fn dispatch_pseudo(kind: i32, tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<bool, AsmError> {
    match kind {
        op::ORG => {
            pseudo::org(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::DB | op::DM => {
            pseudo::db(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::DW => {
            pseudo::dw(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::DS => {
            pseudo::ds(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::FILL => {
            pseudo::fill(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::PRINT => {
            pseudo::print(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::IF => {
            pseudo::if_directive(tokens, pos, ctx, line)?;
            Ok(true)
        }
        op::ELSE => {
            pseudo::else_directive(ctx, line)?;
            Ok(true)
        }
        op::ENDIF => {
            pseudo::endif_directive(ctx, line)?;
            Ok(true)
        }
        op::END => {
            if ctx.gate.is_some() {
                return Err(AsmError::UnterminatedIf { line });
            }
            Ok(false)
        }
        op::EQU => Err(AsmError::MalformedOperands { line, detail: "EQU requires a preceding label".to_string() }),
        _ => Err(AsmError::MalformedOperands { line, detail: "unhandled pseudo-op".to_string() }),
    }
}

fn class_label(kind: i32) -> &'static str {
    match kind {
        op::CLASS_UN_OP => "implied-operand instruction",
        op::CLASS_BIN_OP => "ED-prefixed instruction",
        op::CLASS_OP_HL => "ED-prefixed (HL) instruction",
        op::CLASS_A_OP => "arithmetic instruction",
        op::CLASS_BIT_OP => "BIT/RES/SET",
        op::CLASS_IM => "IM",
        op::CLASS_P_OP => "IN/OUT",
        op::CLASS_I_OP => "INC/DEC",
        op::CLASS_REF_OP => "JP/JR/CALL",
        op::CLASS_RET => "RET",
        op::CLASS_RST => "RST",
        op::CLASS_DJNZ => "DJNZ",
        op::CLASS_EX => "EX",
        op::CLASS_LD => "LD",
        op::CLASS_ST_OP => "PUSH/POP",
        op::CLASS_SH_OP => "shift/rotate instruction",
        _ => "instruction",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_reference_jp_resolves() {
        let src = "    JP TARGET\nTARGET:\n    NOP\n";
        let out = assemble(src, &AssemblerOptions::default()).unwrap();
        assert_eq!(out.image.read_slice(0, 3), &[0xC3, 0x03, 0x00]);
        assert_eq!(out.image.read(3), 0x00);
        assert!(out.undefined_symbols.is_empty());
    }

    #[test]
    fn ix_displacement_and_undocumented_half() {
        let src = "    LD (IX+2),5\n    LD A,HX\n";
        let out = assemble(src, &AssemblerOptions::default()).unwrap();
        assert_eq!(out.image.read_slice(0, 4), &[0xDD, 0x36, 0x02, 0x05]);
        assert_eq!(out.image.read_slice(4, 2), &[0xDD, 0x7C]);
    }

    #[test]
    fn if_else_endif_gates_emission() {
        let src = "IF 0\n    DB 1\nELSE\n    DB 2\nENDIF\n    DB 3\n";
        let out = assemble(src, &AssemblerOptions::default()).unwrap();
        assert_eq!(out.image.read_slice(0, 2), &[2, 3]);
    }

    #[test]
    fn fill_and_ds_reserve_space() {
        let src = "    FILL 2,0xAA\n    DS 2\n";
        let mut opts = AssemblerOptions::default();
        opts.fill = 0x00;
        let out = assemble(src, &opts).unwrap();
        assert_eq!(out.image.read_slice(0, 4), &[0xAA, 0xAA, 0x00, 0x00]);
    }

    #[test]
    fn duplicate_label_is_fatal() {
        let src = "FOO:\n    NOP\nFOO:\n    NOP\n";
        let err = assemble(src, &AssemblerOptions::default()).unwrap_err();
        assert!(matches!(err, AsmError::DuplicateSymbol { .. }));
    }

    #[test]
    fn equ_defines_without_advancing_pc() {
        let src = "COUNT EQU 5\n    LD A,COUNT\n";
        let out = assemble(src, &AssemblerOptions::default()).unwrap();
        assert_eq!(out.image.read_slice(0, 2), &[0x3E, 0x05]);
    }
}
