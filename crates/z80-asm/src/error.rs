//! The assembler's error taxonomy (spec.md §7 "Semantic (assembler)").
//!
//! Every variant carries the 1-based source line number so the caller can
//! print a diagnostic alongside the offending source line, matching the
//! "surfaces the first error with line number" propagation policy.

use z80_core::ImageError;
use z80_expr::ExprError;
use z80_lexer::LexError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    /// No addressing-mode rule matched the operand(s) given to a mnemonic.
    UnknownAddressingMode { line: u32, mnemonic: String },
    /// An immediate or index fell outside its legal range (bit index,
    /// RST index, `IM` operand, etc.).
    OperandOutOfRange { line: u32, detail: String },
    /// A `(IX+d)`/`(IY+d)` displacement did not fit in `i8`.
    DisplacementOutOfRange { line: u32, value: i32 },
    /// A symbol was defined more than once.
    DuplicateSymbol { line: u32, name: String },
    /// A pseudo-op that requires an immediately resolvable operand
    /// (`ORG`, `EQU`, `DS`, `FILL n`, `IF`) saw a forward reference.
    UnresolvedOperand { line: u32, context: &'static str },
    /// `END` was reached with an `IF` still open.
    UnterminatedIf { line: u32 },
    /// A lexical failure from `z80-lexer`.
    LexError { line: u32, source: LexError },
    /// `/` or `%` by zero.
    DivisionByZero { line: u32 },
    /// The image overflowed 64 KiB.
    ImageOverflow { line: u32, source: ImageError },
    /// Mismatched parentheses in an operand.
    MismatchedParens { line: u32 },
    /// A pseudo-op (or mnemonic) saw the wrong shape/count of operands,
    /// e.g. `EQU` with trailing tokens after the expression.
    MalformedOperands { line: u32, detail: String },
}

impl AsmError {
    #[must_use]
    pub const fn line(&self) -> u32 {
        match self {
            Self::UnknownAddressingMode { line, .. }
            | Self::OperandOutOfRange { line, .. }
            | Self::DisplacementOutOfRange { line, .. }
            | Self::DuplicateSymbol { line, .. }
            | Self::UnresolvedOperand { line, .. }
            | Self::UnterminatedIf { line }
            | Self::LexError { line, .. }
            | Self::DivisionByZero { line }
            | Self::ImageOverflow { line, .. }
            | Self::MismatchedParens { line }
            | Self::MalformedOperands { line, .. } => *line,
        }
    }
}

impl std::fmt::Display for AsmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAddressingMode { line, mnemonic } => {
                write!(f, "line {line}: no addressing mode matches '{mnemonic}'")
            }
            Self::OperandOutOfRange { line, detail } => {
                write!(f, "line {line}: operand out of range: {detail}")
            }
            Self::DisplacementOutOfRange { line, value } => {
                write!(f, "line {line}: displacement {value} out of range [-128,127]")
            }
            Self::DuplicateSymbol { line, name } => {
                write!(f, "line {line}: symbol '{name}' already defined")
            }
            Self::UnresolvedOperand { line, context } => {
                write!(f, "line {line}: {context} requires a resolvable operand")
            }
            Self::UnterminatedIf { line } => write!(f, "line {line}: END inside an open IF"),
            Self::LexError { line, source } => write!(f, "line {line}: {source}"),
            Self::DivisionByZero { line } => write!(f, "line {line}: division by zero"),
            Self::ImageOverflow { line, source } => write!(f, "line {line}: {source}"),
            Self::MismatchedParens { line } => write!(f, "line {line}: mismatched parentheses"),
            Self::MalformedOperands { line, detail } => write!(f, "line {line}: {detail}"),
        }
    }
}

impl std::error::Error for AsmError {}

impl AsmError {
    pub(crate) fn from_expr(line: u32, e: ExprError) -> Self {
        match e {
            ExprError::DivisionByZero => Self::DivisionByZero { line },
        }
    }

    pub(crate) fn from_lex(line: u32, e: LexError) -> Self {
        Self::LexError { line, source: e }
    }

    pub(crate) fn from_image(line: u32, e: ImageError) -> Self {
        Self::ImageOverflow { line, source: e }
    }
}
