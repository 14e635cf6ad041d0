//! Operand classification (spec.md §4.F "Operand classification").
//!
//! Reduces the tokens after a mnemonic into a small numeric code plus a
//! literal value, so that the emission dispatch in [`crate::emit`] can
//! test addressing modes with range checks instead of re-parsing tokens.

use z80_core::token::op;
use z80_core::{PatchId, SymbolTable, Token};

use crate::error::AsmError;

/// One classified operand.
#[derive(Debug, Clone, Copy)]
pub struct Operand {
    pub code: i32,
    pub literal: i32,
    pub patch: Option<PatchId>,
}

impl Operand {
    #[must_use]
    pub const fn is_register(self) -> bool {
        (op::REG_LO..=op::REG_HI).contains(&self.code)
    }
}

const INDIRECTABLE_16: [i32; 3] = [op::REG_BC, op::REG_DE, op::REG_SP];

/// Classify the operand starting at `tokens[*pos]`, advancing `*pos` past
/// it. `line` is only used to stamp errors.
///
/// # Errors
/// [`AsmError::UnknownAddressingMode`] on a malformed operand,
/// [`AsmError::MismatchedParens`] on an unclosed `(`, or any error the
/// expression evaluator raises.
pub fn classify(
    tokens: &[Token],
    pos: &mut usize,
    symtab: &mut SymbolTable,
    line: u32,
) -> Result<Operand, AsmError> {
    if let Some(Token::Op(c)) = tokens.get(*pos) {
        if *c == i32::from(b'(') {
            return classify_indirect(tokens, pos, symtab, line);
        }
        if (op::REG_LO..=op::REG_HI).contains(c) || (op::COND_LO..=op::COND_HI).contains(c) {
            let code = *c;
            *pos += 1;
            return Ok(Operand { code, literal: 0, patch: None });
        }
    }
    let outcome = z80_expr::evaluate(tokens, *pos, symtab).map_err(|e| AsmError::from_expr(line, e))?;
    *pos = outcome.next;
    Ok(Operand { code: op::OPERAND_DIRECT, literal: outcome.value, patch: outcome.patch })
}

fn classify_indirect(
    tokens: &[Token],
    pos: &mut usize,
    symtab: &mut SymbolTable,
    line: u32,
) -> Result<Operand, AsmError> {
    *pos += 1; // consume '('

    if let Some(Token::Op(reg)) = tokens.get(*pos).cloned() {
        if reg == op::REG_HL {
            *pos += 1;
            expect_close_paren(tokens, pos, line)?;
            return Ok(Operand { code: op::REG_HL_IND, literal: 0, patch: None });
        }
        if reg == op::REG_C || INDIRECTABLE_16.contains(&reg) {
            *pos += 1;
            expect_close_paren(tokens, pos, line)?;
            return Ok(Operand { code: reg + op::IND_PAREN, literal: 0, patch: None });
        }
        if reg == op::REG_IX || reg == op::REG_IY {
            *pos += 1;
            match tokens.get(*pos) {
                Some(Token::Op(c)) if *c == i32::from(b')') => {
                    *pos += 1;
                    return Ok(Operand { code: reg + op::IND_PAREN, literal: 0, patch: None });
                }
                Some(Token::Op(c)) if *c == i32::from(b'+') || *c == i32::from(b'-') => {
                    let outcome = z80_expr::evaluate(tokens, *pos, symtab).map_err(|e| AsmError::from_expr(line, e))?;
                    *pos = outcome.next;
                    expect_close_paren(tokens, pos, line)?;
                    return Ok(Operand {
                        code: reg + op::IND_DISP,
                        literal: outcome.value,
                        patch: outcome.patch,
                    });
                }
                _ => {
                    return Err(AsmError::UnknownAddressingMode {
                        line,
                        mnemonic: "(IX/IY...)".to_string(),
                    })
                }
            }
        }
    }

    // `(expr)` — indirect address.
    let outcome = z80_expr::evaluate(tokens, *pos, symtab).map_err(|e| AsmError::from_expr(line, e))?;
    *pos = outcome.next;
    expect_close_paren(tokens, pos, line)?;
    Ok(Operand { code: op::OPERAND_INDIRECT_ADDR, literal: outcome.value, patch: outcome.patch })
}

fn expect_close_paren(tokens: &[Token], pos: &mut usize, line: u32) -> Result<(), AsmError> {
    match tokens.get(*pos) {
        Some(Token::Op(c)) if *c == i32::from(b')') => {
            *pos += 1;
            Ok(())
        }
        _ => Err(AsmError::MismatchedParens { line }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hl_indirect_is_folded_slot() {
        let mut t = SymbolTable::new();
        let toks = vec![Token::Op(i32::from(b'(')), Token::Op(op::REG_HL), Token::Op(i32::from(b')')), Token::Bad];
        let mut pos = 0;
        let o = classify(&toks, &mut pos, &mut t, 1).unwrap();
        assert_eq!(o.code, op::REG_HL_IND);
    }

    #[test]
    fn bc_indirect_matches_spec_example() {
        let mut t = SymbolTable::new();
        let toks = vec![Token::Op(i32::from(b'(')), Token::Op(op::REG_BC), Token::Op(i32::from(b')')), Token::Bad];
        let mut pos = 0;
        let o = classify(&toks, &mut pos, &mut t, 1).unwrap();
        assert_eq!(o.code, 0x510);
    }

    #[test]
    fn ix_displacement_matches_spec_example() {
        let mut t = SymbolTable::new();
        let toks = vec![
            Token::Op(i32::from(b'(')),
            Token::Op(op::REG_IX),
            Token::Op(i32::from(b'+')),
            Token::Num(5),
            Token::Op(i32::from(b')')),
            Token::Bad,
        ];
        let mut pos = 0;
        let o = classify(&toks, &mut pos, &mut t, 1).unwrap();
        assert_eq!(o.code, 0x630);
        assert_eq!(o.literal, 5);
    }

    #[test]
    fn bare_register() {
        let mut t = SymbolTable::new();
        let toks = vec![Token::Op(op::REG_A), Token::Bad];
        let mut pos = 0;
        let o = classify(&toks, &mut pos, &mut t, 1).unwrap();
        assert_eq!(o.code, op::REG_A);
    }

    #[test]
    fn direct_expression() {
        let mut t = SymbolTable::new();
        let toks = vec![Token::Num(0x1234), Token::Bad];
        let mut pos = 0;
        let o = classify(&toks, &mut pos, &mut t, 1).unwrap();
        assert_eq!(o.code, op::OPERAND_DIRECT);
        assert_eq!(o.literal, 0x1234);
    }

    #[test]
    fn indirect_address_expression() {
        let mut t = SymbolTable::new();
        let toks = vec![Token::Op(i32::from(b'(')), Token::Num(0x4000), Token::Op(i32::from(b')')), Token::Bad];
        let mut pos = 0;
        let o = classify(&toks, &mut pos, &mut t, 1).unwrap();
        assert_eq!(o.code, op::OPERAND_INDIRECT_ADDR);
        assert_eq!(o.literal, 0x4000);
    }

    #[test]
    fn mismatched_parens_is_reported() {
        let mut t = SymbolTable::new();
        let toks = vec![Token::Op(i32::from(b'(')), Token::Op(op::REG_BC), Token::Bad];
        let mut pos = 0;
        assert!(classify(&toks, &mut pos, &mut t, 1).is_err());
    }
}
