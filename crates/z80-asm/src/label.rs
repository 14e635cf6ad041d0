//! Label definition and back-patch draining (spec.md §4.F "Label and
//! back-patch protocol").
//!
//! Defining a symbol (a label at the current PC, or the target of `EQU`)
//! drains its patch list. Each patch's expression is re-evaluated whole,
//! since it may reference more than one symbol; only once every symbol in
//! it is defined does it resolve to concrete bytes. Otherwise the patch
//! moves onto whichever symbol is still blocking it, without re-copying
//! its expression (spec.md §9, realized by [`z80_expr::evaluate_raw`] +
//! [`SymbolTable::attach_patch`]).

use z80_core::{SymbolId, SymbolTable};

use crate::context::{resolve_patch_bytes, AsmContext};
use crate::error::AsmError;

/// Define `id` to `value` and drain every patch that was blaming it.
///
/// # Errors
/// [`AsmError::DuplicateSymbol`] if `id` was already defined, or any error
/// surfaced while re-evaluating a drained patch's expression.
pub fn define_and_drain(ctx: &mut AsmContext, id: SymbolId, value: i32, line: u32) -> Result<(), AsmError> {
    ctx.symtab.define(id, value).map_err(|e| AsmError::DuplicateSymbol { line, name: e.0 })?;
    drain(ctx, id, line)
}

fn drain(ctx: &mut AsmContext, id: SymbolId, line: u32) -> Result<(), AsmError> {
    let patch_ids = ctx.symtab.take_patches(id);
    for pid in patch_ids {
        let patch = ctx.symtab.patch(pid).clone();
        let outcome =
            z80_expr::evaluate_raw(&patch.expr, 0, &mut ctx.symtab).map_err(|e| AsmError::from_expr(line, e))?;
        match outcome.err_symbol {
            None => match resolve_patch_bytes(patch.width, patch.addr, outcome.value) {
                Ok(writes) => {
                    for (addr, byte) in writes {
                        ctx.image.write(u32::from(addr), byte).map_err(|e| AsmError::from_image(line, e))?;
                    }
                }
                Err(disp) => return Err(AsmError::DisplacementOutOfRange { line, value: disp }),
            },
            Some(still_blocking) => {
                ctx.symtab.attach_patch(still_blocking, pid);
            }
        }
    }
    Ok(())
}

/// Every symbol still carrying an undrained patch list at end of assembly
/// (spec.md §4.F "report at EOF every symbol still undefined").
#[must_use]
pub fn report_undefined(symtab: &SymbolTable) -> Vec<String> {
    symtab.undefined_symbols().map(|(_, s)| s.name.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Verbosity;
    use z80_core::{Patch, PatchWidth, Token};

    #[test]
    fn single_symbol_patch_resolves_on_definition() {
        let mut ctx = AsmContext::new(0, Verbosity(0));
        let id = ctx.symtab.intern("TARGET");
        let expr = vec![Token::Sym(id), Token::Bad];
        let pid = ctx.symtab.add_patch(id, Patch { width: PatchWidth::TwoByteLoHi, addr: 0x10, expr });
        ctx.image.write(0x10, 0).unwrap();
        ctx.image.write(0x11, 0).unwrap();

        define_and_drain(&mut ctx, id, 0x1234, 1).unwrap();
        assert_eq!(ctx.image.read(0x10), 0x34);
        assert_eq!(ctx.image.read(0x11), 0x12);
        let _ = pid;
    }

    #[test]
    fn patch_moves_to_remaining_blocker_without_reallocating() {
        let mut ctx = AsmContext::new(0, Verbosity(0));
        let a = ctx.symtab.intern("A");
        let b = ctx.symtab.intern("B");
        let expr = vec![Token::Sym(a), Token::Op(i32::from(b'+')), Token::Sym(b), Token::Bad];
        let pid = ctx.symtab.add_patch(a, Patch { width: PatchWidth::OneByte, addr: 0, expr });

        define_and_drain(&mut ctx, a, 5, 1).unwrap();
        assert_eq!(ctx.symtab.get(b).patches, vec![pid]);

        ctx.image.write(0, 0).unwrap();
        define_and_drain(&mut ctx, b, 3, 1).unwrap();
        assert_eq!(ctx.image.read(0), 8);
    }

    #[test]
    fn duplicate_definition_is_rejected() {
        let mut ctx = AsmContext::new(0, Verbosity(0));
        let id = ctx.symtab.intern("X");
        define_and_drain(&mut ctx, id, 1, 1).unwrap();
        assert!(define_and_drain(&mut ctx, id, 2, 2).is_err());
    }
}
