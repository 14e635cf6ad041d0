//! The interned symbol table shared by reserved words and user symbols
//! (spec.md §4.C), plus the back-patch arena (spec.md §3 "Patch").
//!
//! Per the re-architecture note in spec.md §9, the original's raw
//! back-pointer linked lists become an arena addressed by stable handles:
//! [`SymbolId`] indexes the symbol arena, [`PatchId`] indexes the patch
//! arena. Transferring an unresolved patch to the symbol that blames it is
//! then just pushing an id, not an allocation.

use std::fmt;

use crate::token::Token;

const BUCKETS: usize = 256;

/// A stable handle into the symbol arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolId(u32);

/// A stable handle into the patch arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatchId(u32);

/// What a reserved-word symbol denotes, recovered from its `kind` field.
/// User symbols have `kind == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymKind {
    User,
    Reserved(u16),
}

/// How a deferred fix-up should be written into the image once its
/// expression resolves (spec.md "Patch width" glossary entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchWidth {
    /// Not yet known; overwritten once the enclosing instruction emits.
    Unknown,
    OneByte,
    TwoByteLoHi,
    PcRelByte,
}

/// A deferred fix-up: an expression that referenced an undefined symbol
/// when the enclosing instruction was emitted.
#[derive(Debug, Clone)]
pub struct Patch {
    pub width: PatchWidth,
    pub addr: u16,
    pub expr: Vec<Token>,
}

/// One entry in the symbol table: either a reserved word (seeded once at
/// startup and never mutated) or a user symbol (created lazily, mutated on
/// definition and while its patch list drains).
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    hash: u16,
    pub kind: u16,
    pub value: i32,
    pub defined: bool,
    pub first_seen: bool,
    pub patches: Vec<PatchId>,
}

impl Symbol {
    #[must_use]
    pub const fn sym_kind(&self) -> SymKind {
        if self.kind == 0 {
            SymKind::User
        } else {
            SymKind::Reserved(self.kind)
        }
    }

    #[must_use]
    pub const fn is_reserved(&self) -> bool {
        self.kind != 0
    }
}

/// Roll the spec.md §4.C hash: `h' = (h<<4)+c; if h'>>12 then h'^=h'>>12`.
#[must_use]
pub fn rolling_hash(name: &str) -> u16 {
    let mut h: u16 = 0;
    for &c in name.as_bytes() {
        h = h.wrapping_shl(4).wrapping_add(u16::from(c));
        let top = h >> 12;
        if top != 0 {
            h ^= top;
        }
    }
    h
}

/// A 256-bucket chaining hash table keyed on the low byte of
/// [`rolling_hash`], holding both reserved words and user symbols, plus the
/// arena of back-patches they own.
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    patches: Vec<Patch>,
    buckets: [Vec<u32>; BUCKETS],
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            patches: Vec::new(),
            buckets: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Find an existing symbol by (case-folded) name, or insert a fresh
    /// zeroed entry. Always succeeds.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        let hash = rolling_hash(name);
        let bucket = usize::from(hash as u8);
        for &idx in &self.buckets[bucket] {
            let sym = &self.symbols[idx as usize];
            if sym.hash == hash && sym.name == name {
                return SymbolId(idx);
            }
        }
        let idx = self.symbols.len() as u32;
        self.symbols.push(Symbol {
            name: name.to_string(),
            hash,
            kind: 0,
            value: 0,
            defined: false,
            first_seen: false,
            patches: Vec::new(),
        });
        self.buckets[bucket].push(idx);
        SymbolId(idx)
    }

    /// Look up a name without creating it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        let hash = rolling_hash(name);
        let bucket = usize::from(hash as u8);
        self.buckets[bucket].iter().find_map(|&idx| {
            let sym = &self.symbols[idx as usize];
            (sym.hash == hash && sym.name == name).then_some(SymbolId(idx))
        })
    }

    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0 as usize]
    }

    /// Seed a reserved word at startup: packs `(encoding << 16) | kind`
    /// into `value`, exactly as `InitSymTab` does in the original source,
    /// so a single lookup yields everything a parser needs. Reserved
    /// entries are never mutated again.
    pub fn define_reserved(&mut self, name: &str, kind: u16, encoding: i32) -> SymbolId {
        let id = self.intern(name);
        let sym = self.get_mut(id);
        debug_assert_eq!(sym.kind, 0, "reserved word defined twice: {name}");
        sym.kind = kind;
        sym.value = (encoding << 16) | i32::from(kind);
        sym.defined = true;
        id
    }

    /// Define a user symbol's value. Requires the symbol not already be
    /// defined; the caller is then responsible for draining its patches
    /// via [`SymbolTable::take_patches`].
    ///
    /// # Errors
    /// Returns the symbol's name if it is already defined (spec.md's
    /// "duplicate symbol" fatal error).
    pub fn define(&mut self, id: SymbolId, value: i32) -> Result<(), DuplicateSymbol> {
        let sym = self.get_mut(id);
        if sym.defined {
            return Err(DuplicateSymbol(sym.name.clone()));
        }
        sym.value = value;
        sym.defined = true;
        Ok(())
    }

    /// Append a freshly allocated patch to `id`'s list, returning its
    /// handle.
    pub fn add_patch(&mut self, id: SymbolId, patch: Patch) -> PatchId {
        let patch_id = PatchId(self.patches.len() as u32);
        self.patches.push(patch);
        self.get_mut(id).patches.push(patch_id);
        patch_id
    }

    /// Transfer ownership of an already-allocated patch onto `id`'s list
    /// (no allocation: spec.md §9's "index move").
    pub fn attach_patch(&mut self, id: SymbolId, patch_id: PatchId) {
        self.get_mut(id).patches.push(patch_id);
    }

    #[must_use]
    pub fn patch(&self, id: PatchId) -> &Patch {
        &self.patches[id.0 as usize]
    }

    pub fn patch_mut(&mut self, id: PatchId) -> &mut Patch {
        &mut self.patches[id.0 as usize]
    }

    /// Drain `id`'s patch list, returning ownership of the handles to the
    /// caller. The symbol's list is empty afterward; this is the "drained
    /// exactly once" step of spec.md's defined-symbol invariant.
    pub fn take_patches(&mut self, id: SymbolId) -> Vec<PatchId> {
        std::mem::take(&mut self.get_mut(id).patches)
    }

    /// All symbols whose patch list is still non-empty at EOF: the
    /// "undefined symbol" cross-reference (spec.md §4.F).
    pub fn undefined_symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_reserved() && !s.patches.is_empty())
            .map(|(i, s)| (SymbolId(i as u32), s))
    }

    /// All user symbols that were ultimately defined, for a cross-reference
    /// listing (spec.md §6).
    pub fn defined_user_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter().filter(|s| !s.is_reserved() && s.defined)
    }
}

/// A symbol was defined a second time (spec.md §7: fatal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateSymbol(pub String);

impl fmt::Display for DuplicateSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "symbol '{}' already defined", self.0)
    }
}

impl std::error::Error for DuplicateSymbol {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut t = SymbolTable::new();
        let a = t.intern("FOO");
        let b = t.intern("FOO");
        assert_eq!(a, b);
        assert_eq!(t.lookup("FOO"), Some(a));
        assert_eq!(t.lookup("BAR"), None);
    }

    #[test]
    fn define_rejects_redefinition() {
        let mut t = SymbolTable::new();
        let a = t.intern("FOO");
        t.define(a, 1).unwrap();
        assert!(t.define(a, 2).is_err());
    }

    #[test]
    fn patch_transfer_is_a_move_not_a_copy() {
        let mut t = SymbolTable::new();
        let a = t.intern("A");
        let b = t.intern("B");
        let p = t.add_patch(
            a,
            Patch {
                width: PatchWidth::Unknown,
                addr: 0,
                expr: vec![Token::Sym(b)],
            },
        );
        let drained = t.take_patches(a);
        assert_eq!(drained, vec![p]);
        assert!(t.get(a).patches.is_empty());
        t.attach_patch(b, p);
        assert_eq!(t.get(b).patches, vec![p]);
    }

    #[test]
    fn reserved_word_packs_kind_and_encoding() {
        let mut t = SymbolTable::new();
        let id = t.define_reserved("NOP", 0x200, 0x00);
        let sym = t.get(id);
        assert_eq!(sym.kind, 0x200);
        assert_eq!(sym.value, 0x200);
        assert!(sym.is_reserved());
    }
}
