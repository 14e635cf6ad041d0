//! Shared primitives for the Z80 cross-assembler and disassembler.
//!
//! This crate holds the pieces with no opinion about syntax: the 64 KiB
//! memory image both tools operate on, the interned symbol table shared by
//! the lexer and the assembler, and small numeric/string helpers used
//! across the workspace.

pub mod image;
pub mod numeric;
pub mod symtab;
pub mod token;

pub use image::{Image, ImageError};
pub use symtab::{DuplicateSymbol, Patch, PatchId, PatchWidth, SymKind, Symbol, SymbolId, SymbolTable};
pub use token::{Cond, IndexHalf, IndexReg, Reg16, Reg8, Token};

