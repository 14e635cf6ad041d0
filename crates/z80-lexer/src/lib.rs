//! Line tokenizer for the Z80 assembler (spec.md §4.D).
//!
//! [`tokenize_line`] turns one source line into a bounded [`Token`] stream
//! terminated by [`Token::Bad`]. It owns no state across lines; the caller
//! passes in the current PC (for `$`) and the shared symbol table.

pub mod reserved;

use z80_core::numeric::{MAX_SYMBOL_NAME, MAX_TOKENS};
use z80_core::token::op;
use z80_core::{SymbolTable, Token};

pub use reserved::seed;

/// A lexical failure that is not one of the graceful degradations spec.md
/// §4.D calls out (unterminated quotes fall through as literal tokens
/// instead of erroring).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    /// A `.` prefix was applied to something other than a pseudo-op.
    DotPrefixNotPseudo(String),
    /// An identifier or numeric-literal run exceeded the compiled limit.
    SymbolTooLong(String),
    /// A `$`/`0x`-prefixed run contained a character invalid in base 16.
    InvalidNumericLiteral(String),
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DotPrefixNotPseudo(name) => {
                write!(f, "'.' prefix on non-pseudo-op '{name}'")
            }
            Self::SymbolTooLong(name) => write!(f, "symbol '{name}' exceeds maximum length"),
            Self::InvalidNumericLiteral(word) => write!(f, "symbols can't start with '$' or digits: '{word}'"),
        }
    }
}

impl std::error::Error for LexError {}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn digit_value_in_base(c: u8, base: u32) -> bool {
    match base {
        16 => c.is_ascii_hexdigit(),
        10 => c.is_ascii_digit(),
        8 => (b'0'..=b'7').contains(&c),
        2 => c == b'0' || c == b'1',
        _ => false,
    }
}

/// Validate that `word` is entirely base-16 digits (the greedy
/// alphanumeric-plus-underscore run already captured by the caller), then
/// parse it. Any non-hex character in the run invalidates the whole thing
/// rather than truncating at the first bad character (spec.md §4.D).
fn parse_hex_word(word: &str) -> Option<i32> {
    if word.is_empty() || !word.bytes().all(|c| digit_value_in_base(c, 16)) {
        return None;
    }
    i32::from_str_radix(word, 16).ok()
}

/// The spec.md §4.D suffix-then-decimal-fallback numeric decision, applied
/// to a word already captured by the greedy alphanumeric-plus-underscore
/// scan. Returns `None` if the word is not a valid numeric literal in any
/// base, in which case the caller re-interns it as an identifier.
fn parse_numeric_word(word: &str) -> Option<i32> {
    let bytes = word.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let last = bytes[bytes.len() - 1].to_ascii_uppercase();
    let base = match last {
        b'H' => Some(16u32),
        b'O' | b'Q' => Some(8),
        b'B' => Some(2),
        b'D' => Some(10),
        _ => None,
    };
    if let Some(base) = base {
        let digits = &word[..word.len() - 1];
        if !digits.is_empty() && digits.bytes().all(|c| digit_value_in_base(c, base)) {
            if let Ok(v) = i32::from_str_radix(digits, base) {
                return Some(v);
            }
        }
    }
    if bytes.iter().all(u8::is_ascii_digit) {
        if let Ok(v) = word.parse::<i32>() {
            return Some(v);
        }
    }
    None
}

/// Intern `word` (case-folded) and classify it as `Op` (reserved) or `Sym`
/// (user), setting `first_seen` on first reference (spec.md §4.D).
fn intern_identifier(symtab: &mut SymbolTable, word: &str) -> Result<Token, LexError> {
    if word.len() > MAX_SYMBOL_NAME {
        return Err(LexError::SymbolTooLong(word.to_string()));
    }
    let upper = word.to_ascii_uppercase();
    let id = symtab.intern(&upper);
    let kind = symtab.get(id).kind;
    if kind != 0 {
        Ok(Token::Op(symtab.get(id).value))
    } else {
        if !symtab.get(id).first_seen {
            symtab.get_mut(id).first_seen = true;
        }
        Ok(Token::Sym(id))
    }
}

/// Tokenize one source line (spec.md §4.D). `pc` resolves a lone `$`.
///
/// # Errors
/// See [`LexError`].
pub fn tokenize_line(line: &str, pc: i32, symtab: &mut SymbolTable) -> Result<Vec<Token>, LexError> {
    let bytes = line.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < len && tokens.len() + 1 < MAX_TOKENS {
        let c = bytes[i];
        if c == b' ' || c == b'\t' || c == b'\r' {
            i += 1;
            continue;
        }
        if c == b';' {
            break;
        }

        if c == b'$' {
            if i + 1 < len && bytes[i + 1].is_ascii_hexdigit() {
                let start = i + 1;
                let mut j = start;
                while j < len && is_ident_continue(bytes[j]) {
                    j += 1;
                }
                let word = &line[start..j];
                let value = parse_hex_word(word)
                    .ok_or_else(|| LexError::InvalidNumericLiteral(format!("${word}")))?;
                tokens.push(Token::Num(value));
                i = j;
            } else {
                tokens.push(Token::Num(pc));
                i += 1;
            }
            continue;
        }

        if c == b'0' && i + 2 < len && (bytes[i + 1] == b'x' || bytes[i + 1] == b'X') && bytes[i + 2].is_ascii_hexdigit() {
            let start = i + 2;
            let mut j = start;
            while j < len && is_ident_continue(bytes[j]) {
                j += 1;
            }
            let word = &line[start..j];
            let value = parse_hex_word(word)
                .ok_or_else(|| LexError::InvalidNumericLiteral(format!("0x{word}")))?;
            tokens.push(Token::Num(value));
            i = j;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            let mut j = i;
            while j < len && is_ident_continue(bytes[j]) {
                j += 1;
            }
            let word = &line[start..j];
            match parse_numeric_word(word) {
                Some(value) => tokens.push(Token::Num(value)),
                None => tokens.push(intern_identifier(symtab, word)?),
            }
            i = j;
            continue;
        }

        if c == b'.' {
            let start = i + 1;
            if start < len && is_ident_start(bytes[start]) {
                let mut j = start;
                while j < len && is_ident_continue(bytes[j]) {
                    j += 1;
                }
                let word = &line[start..j];
                let upper = word.to_ascii_uppercase();
                let id = symtab.intern(&upper);
                let kind = symtab.get(id).kind;
                if kind < op::PSEUDO_LO || kind > op::PSEUDO_HI {
                    return Err(LexError::DotPrefixNotPseudo(word.to_string()));
                }
                tokens.push(Token::Op(symtab.get(id).value));
                i = j;
                continue;
            }
            tokens.push(Token::Op(i32::from(c)));
            i += 1;
            continue;
        }

        if is_ident_start(c) {
            let start = i;
            let mut j = i;
            while j < len && is_ident_continue(bytes[j]) {
                j += 1;
            }
            let word = &line[start..j];
            let mut token = intern_identifier(symtab, word)?;
            i = j;
            // A trailing `'` immediately after `AF` promotes it to `AF'`
            // (spec.md §4.F, §8 "EX AF,AF' disambiguates").
            if token == Token::Op(op::REG_AF) && i < len && bytes[i] == b'\'' {
                token = Token::Op(op::REG_AF_PRIME);
                i += 1;
            }
            tokens.push(token);
            continue;
        }

        if c == b'\'' {
            if i + 2 < len && bytes[i + 2] == b'\'' {
                tokens.push(Token::Num(i32::from(bytes[i + 1])));
                i += 3;
            } else {
                // Unclosed quote degrades to a literal punctuation token
                // (spec.md §4.D failure model).
                tokens.push(Token::Op(i32::from(c)));
                i += 1;
            }
            continue;
        }

        if c == b'"' {
            let start = i + 1;
            let mut j = start;
            while j < len && bytes[j] != b'"' {
                j += 1;
            }
            tokens.push(Token::Str(bytes[start..j].to_vec()));
            i = if j < len { j + 1 } else { j };
            continue;
        }

        if c == b'>' {
            if i + 1 < len && bytes[i + 1] == b'>' {
                tokens.push(Token::Op(op::SHR));
                i += 2;
            } else {
                tokens.push(Token::Op(i32::from(c)));
                i += 1;
            }
            continue;
        }

        if c == b'<' {
            if i + 1 < len && bytes[i + 1] == b'<' {
                tokens.push(Token::Op(op::SHL));
                i += 2;
            } else {
                tokens.push(Token::Op(i32::from(c)));
                i += 1;
            }
            continue;
        }

        if c == b'=' {
            tokens.push(Token::Op(op::EQU));
            i += 1;
            continue;
        }

        // Any other single character passes through as literal punctuation
        // (spec.md §4.D: `,` `(` `)` `+` `-` `*` `/` `%` `&` `|` `^` `!`...).
        tokens.push(Token::Op(i32::from(c)));
        i += 1;
    }

    tokens.push(Token::Bad);
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(line: &str, symtab: &mut SymbolTable) -> Vec<Token> {
        tokenize_line(line, 0, symtab).unwrap()
    }

    #[test]
    fn ends_with_bad() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("NOP", &mut t);
        assert_eq!(*toks.last().unwrap(), Token::Bad);
    }

    #[test]
    fn hex_prefix_dollar() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("$1A", &mut t);
        assert_eq!(toks[0], Token::Num(0x1A));
    }

    #[test]
    fn dollar_prefixed_literal_with_a_bad_digit_is_an_error() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        // The whole alphanumeric run is scanned before validation, so this
        // errors outright instead of tokenizing as Num(0x12) then Sym("G").
        let err = tokenize_line("$12G", 0, &mut t).unwrap_err();
        assert!(matches!(err, LexError::InvalidNumericLiteral(_)));
    }

    #[test]
    fn zero_x_prefixed_literal_with_a_bad_digit_is_an_error() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let err = tokenize_line("0x1G", 0, &mut t).unwrap_err();
        assert!(matches!(err, LexError::InvalidNumericLiteral(_)));
    }

    #[test]
    fn lone_dollar_is_pc() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = tokenize_line("$+1", 0x8000, &mut t).unwrap();
        assert_eq!(toks[0], Token::Num(0x8000));
        assert_eq!(toks[1], Token::Op(i32::from(b'+')));
    }

    #[test]
    fn hex_suffix() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("1A2H", &mut t);
        assert_eq!(toks[0], Token::Num(0x1A2));
    }

    #[test]
    fn octal_suffix_rejects_invalid_digit() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        // '9' is not an octal digit, so this is not a valid octal literal;
        // it is also not all-decimal (trailing O), so it becomes a symbol.
        let toks = toks("19O", &mut t);
        assert!(matches!(toks[0], Token::Sym(_)));
    }

    #[test]
    fn binary_suffix() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("1011B", &mut t);
        assert_eq!(toks[0], Token::Num(0b1011));
    }

    #[test]
    fn plain_decimal() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("1234", &mut t);
        assert_eq!(toks[0], Token::Num(1234));
    }

    #[test]
    fn reserved_word_is_op() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("NOP", &mut t);
        // encoding 0x00 packed with the UnOp class code, per symtab::define_reserved.
        assert_eq!(toks[0], Token::Op(op::CLASS_UN_OP));
    }

    #[test]
    fn user_symbol_is_sym_and_first_seen() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("FOOBAR", &mut t);
        let Token::Sym(id) = toks[0] else { panic!("expected Sym") };
        assert!(t.get(id).first_seen);
    }

    #[test]
    fn af_prime_requires_immediate_quote() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("AF'", &mut t);
        assert_eq!(toks[0], Token::Op(op::REG_AF_PRIME));
        let toks2 = toks("AF ,", &mut t);
        assert_eq!(toks2[0], Token::Op(op::REG_AF));
    }

    #[test]
    fn char_literal() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("'A'", &mut t);
        assert_eq!(toks[0], Token::Num(b'A' as i32));
    }

    #[test]
    fn unclosed_char_literal_degrades() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("'A", &mut t);
        assert_eq!(toks[0], Token::Op(i32::from(b'\'')));
    }

    #[test]
    fn string_literal_preserves_case() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("\"Hello\"", &mut t);
        assert_eq!(toks[0], Token::Str(b"Hello".to_vec()));
    }

    #[test]
    fn shift_operators() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("1>>2<<3", &mut t);
        assert_eq!(toks[1], Token::Op(op::SHR));
        assert_eq!(toks[3], Token::Op(op::SHL));
    }

    #[test]
    fn equals_is_equ() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("FOO = 5", &mut t);
        assert_eq!(toks[1], Token::Op(op::EQU));
    }

    #[test]
    fn comment_truncates_line() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks("NOP ; trailing comment", &mut t);
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[0], Token::Op(op::CLASS_UN_OP));
        assert_eq!(toks[1], Token::Bad);
    }

    #[test]
    fn dot_prefix_accepts_pseudo_op() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        let toks = toks(".ORG", &mut t);
        assert_eq!(toks[0], Token::Op(op::ORG));
    }

    #[test]
    fn dot_prefix_rejects_mnemonic() {
        let mut t = SymbolTable::new();
        seed(&mut t);
        assert!(tokenize_line(".NOP", 0, &mut t).is_err());
    }
}
