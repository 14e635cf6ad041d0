//! Pseudo-op handlers (spec.md §4.F, the `ORG`/`EQU`/`DB`/`DM`/`DW`/`DS`/
//! `FILL`/`PRINT`/`IF`/`ELSE`/`ENDIF`/`END` family).

use z80_core::token::op;
use z80_core::{PatchWidth, Token};

use crate::context::{AsmContext, Gate};
use crate::error::AsmError;

pub(crate) fn eval_resolved(
    tokens: &[Token],
    pos: &mut usize,
    ctx: &mut AsmContext,
    line: u32,
    context: &'static str,
) -> Result<i32, AsmError> {
    let outcome = z80_expr::evaluate(tokens, *pos, &mut ctx.symtab).map_err(|e| AsmError::from_expr(line, e))?;
    *pos = outcome.next;
    if outcome.patch.is_some() {
        return Err(AsmError::UnresolvedOperand { line, context });
    }
    Ok(outcome.value)
}

pub(crate) fn expect_end_of_statement(tokens: &[Token], pos: usize, line: u32, detail: &str) -> Result<(), AsmError> {
    if tokens.get(pos).is_some_and(Token::is_bad) {
        Ok(())
    } else {
        Err(AsmError::MalformedOperands { line, detail: detail.to_string() })
    }
}

/// `ORG expr`: reposition the emission cursor (spec.md §4.F).
pub fn org(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let value = eval_resolved(tokens, pos, ctx, line, "ORG")?;
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after ORG operand")?;
    ctx.pc = (value as u32) & 0xFFFF;
    Ok(())
}

/// `DB`/`DM expr|"str", ...`: emit a comma-separated list of bytes.
pub fn db(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    loop {
        match tokens.get(*pos) {
            Some(Token::Str(bytes)) => {
                let bytes = bytes.clone();
                *pos += 1;
                for b in bytes {
                    ctx.emit_byte(b).map_err(|e| AsmError::from_image(line, e))?;
                }
            }
            _ => {
                let outcome = z80_expr::evaluate(tokens, *pos, &mut ctx.symtab).map_err(|e| AsmError::from_expr(line, e))?;
                *pos = outcome.next;
                ctx.emit_byte_patched((outcome.value & 0xFF) as u8, outcome.patch, PatchWidth::OneByte)
                    .map_err(|e| AsmError::from_image(line, e))?;
            }
        }
        match tokens.get(*pos) {
            Some(Token::Op(c)) if *c == i32::from(b',') => {
                *pos += 1;
            }
            _ => break,
        }
    }
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after DB/DM list")
}

/// `DW expr, ...`: emit a comma-separated list of little-endian words.
pub fn dw(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    loop {
        let outcome = z80_expr::evaluate(tokens, *pos, &mut ctx.symtab).map_err(|e| AsmError::from_expr(line, e))?;
        *pos = outcome.next;
        ctx.emit_word_patched(outcome.value, outcome.patch).map_err(|e| AsmError::from_image(line, e))?;
        match tokens.get(*pos) {
            Some(Token::Op(c)) if *c == i32::from(b',') => {
                *pos += 1;
            }
            _ => break,
        }
    }
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after DW list")
}

/// `DS n[,fill]`: reserve `n` bytes, either the image's background fill or
/// an explicit byte.
pub fn ds(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let count = eval_resolved(tokens, pos, ctx, line, "DS")?;
    let fill = match tokens.get(*pos) {
        Some(Token::Op(c)) if *c == i32::from(b',') => {
            *pos += 1;
            (eval_resolved(tokens, pos, ctx, line, "DS")? & 0xFF) as u8
        }
        _ => ctx.image.fill(),
    };
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after DS operand")?;
    if count < 0 {
        return Err(AsmError::OperandOutOfRange { line, detail: format!("DS count {count} is negative") });
    }
    for _ in 0..count {
        ctx.emit_byte(fill).map_err(|e| AsmError::from_image(line, e))?;
    }
    Ok(())
}

/// `FILL n[,v]`: reserve `n` bytes of the literal byte `v`, truncated to
/// 8 bits (spec.md §9 open question: truncate, don't range-check); `v`
/// defaults to 0 when omitted (spec.md §4.F).
pub fn fill(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let count = eval_resolved(tokens, pos, ctx, line, "FILL")?;
    let value = match tokens.get(*pos) {
        Some(Token::Op(c)) if *c == i32::from(b',') => {
            *pos += 1;
            eval_resolved(tokens, pos, ctx, line, "FILL")?
        }
        _ => 0,
    };
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after FILL operands")?;
    if count < 0 {
        return Err(AsmError::OperandOutOfRange { line, detail: format!("FILL count {count} is negative") });
    }
    let byte = (value & 0xFF) as u8;
    for _ in 0..count {
        ctx.emit_byte(byte).map_err(|e| AsmError::from_image(line, e))?;
    }
    Ok(())
}

/// `PRINT expr|"str"`: an assembly-time diagnostic, always shown regardless
/// of verbosity (that is the whole point of the directive).
pub fn print(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    match tokens.get(*pos) {
        Some(Token::Str(bytes)) => {
            println!("{}", String::from_utf8_lossy(bytes));
            *pos += 1;
        }
        _ => {
            let outcome = z80_expr::evaluate(tokens, *pos, &mut ctx.symtab).map_err(|e| AsmError::from_expr(line, e))?;
            *pos = outcome.next;
            println!("{}", outcome.value);
        }
    }
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after PRINT operand")
}

/// `IF expr`: opens a single-level gate (spec.md §9: nested `IF` is a
/// documented limitation, not handled here).
pub fn if_directive(tokens: &[Token], pos: &mut usize, ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    let value = eval_resolved(tokens, pos, ctx, line, "IF")?;
    expect_end_of_statement(tokens, *pos, line, "trailing tokens after IF operand")?;
    ctx.gate = Some(if value != 0 { Gate::Open } else { Gate::ClosedAwaitingElse });
    Ok(())
}

/// `ELSE`: flips the current gate.
pub fn else_directive(ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    ctx.gate = Some(match ctx.gate {
        Some(Gate::Open) => Gate::ClosedAfterElse,
        Some(Gate::ClosedAwaitingElse) => Gate::Open,
        Some(Gate::ClosedAfterElse) => {
            return Err(AsmError::MalformedOperands { line, detail: "ELSE without a matching IF".to_string() })
        }
        None => return Err(AsmError::MalformedOperands { line, detail: "ELSE without a matching IF".to_string() }),
    });
    Ok(())
}

/// `ENDIF`: closes the gate.
pub fn endif_directive(ctx: &mut AsmContext, line: u32) -> Result<(), AsmError> {
    if ctx.gate.take().is_none() {
        return Err(AsmError::MalformedOperands { line, detail: "ENDIF without a matching IF".to_string() });
    }
    Ok(())
}

pub const fn is_pseudo(code: i32) -> bool {
    (op::PSEUDO_LO..=op::PSEUDO_HI).contains(&code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Verbosity;

    fn ctx() -> AsmContext<'static> {
        AsmContext::new(0xFF, Verbosity(0))
    }

    #[test]
    fn ds_reserves_background_fill() {
        let mut c = ctx();
        let toks = vec![Token::Num(3), Token::Bad];
        let mut pos = 0;
        ds(&toks, &mut pos, &mut c, 1).unwrap();
        assert_eq!(c.image.read_slice(0, 3), &[0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn fill_truncates_to_a_byte() {
        let mut c = ctx();
        let toks = vec![Token::Num(2), Token::Op(i32::from(b',')), Token::Num(0x1FF), Token::Bad];
        let mut pos = 0;
        fill(&toks, &mut pos, &mut c, 1).unwrap();
        assert_eq!(c.image.read_slice(0, 2), &[0xFF, 0xFF]);
    }

    #[test]
    fn fill_without_a_value_defaults_to_zero() {
        let mut c = ctx();
        let toks = vec![Token::Num(3), Token::Bad];
        let mut pos = 0;
        fill(&toks, &mut pos, &mut c, 1).unwrap();
        assert_eq!(c.image.read_slice(0, 3), &[0, 0, 0]);
    }

    #[test]
    fn db_mixes_strings_and_numbers() {
        let mut c = ctx();
        let toks = vec![
            Token::Str(b"Hi".to_vec()),
            Token::Op(i32::from(b',')),
            Token::Num(0),
            Token::Bad,
        ];
        let mut pos = 0;
        db(&toks, &mut pos, &mut c, 1).unwrap();
        assert_eq!(c.image.read_slice(0, 3), &[b'H', b'i', 0]);
    }

    #[test]
    fn else_without_if_is_an_error() {
        let mut c = ctx();
        assert!(else_directive(&mut c, 1).is_err());
    }

    #[test]
    fn if_else_endif_flip() {
        let mut c = ctx();
        let toks = vec![Token::Num(0), Token::Bad];
        let mut pos = 0;
        if_directive(&toks, &mut pos, &mut c, 1).unwrap();
        assert!(c.is_swallowing());
        else_directive(&mut c, 2).unwrap();
        assert!(!c.is_swallowing());
        endif_directive(&mut c, 3).unwrap();
        assert!(c.gate.is_none());
    }
}
