//! The assembler's explicit state, replacing the global mutable state
//! (current PC, `IF` gate, listing flag, verbosity) the original program
//! kept in file-scope statics (spec.md §9).

use z80_core::{Image, ImageError, PatchId, PatchWidth, SymbolTable};

/// How much diagnostic chatter to produce, set by the `-v` CLI flag
/// (repeatable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Verbosity(pub u8);

impl Verbosity {
    #[must_use]
    pub const fn is_enabled(self, level: u8) -> bool {
        self.0 >= level
    }
}

/// Knobs that used to be command-line-parsed globals (spec.md §6).
pub struct AssemblerOptions {
    /// `-f`: fill byte for unwritten RAM.
    pub fill: u8,
    /// `-o`: load/base address. Only consulted by callers that need a base
    /// distinct from `ORG`; the assembler itself always starts at PC 0
    /// unless `ORG` sets it.
    pub load_offset: u16,
    /// `-v`: verbosity.
    pub verbosity: Verbosity,
    /// `-l`: emit a source-interleaved listing.
    pub listing: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self { fill: 0, load_offset: 0, verbosity: Verbosity(0), listing: false }
    }
}

/// One line's worth of `IF` gating. Single-level per spec.md §9: nesting
/// is a documented limitation, not a bug to fix here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Open,
    /// Swallowing lines because the controlling `IF` was false and no
    /// `ELSE` has flipped it yet.
    ClosedAwaitingElse,
    /// Swallowing lines because `ELSE` was taken (the `IF` was true, or an
    /// `ELSE` already flipped an initially-false gate back closed).
    ClosedAfterElse,
}

/// Threaded explicitly through every emission function instead of living
/// in statics (spec.md §9).
pub struct AsmContext<'sink> {
    pub image: Image,
    pub symtab: SymbolTable,
    pub pc: u32,
    pub gate: Option<Gate>,
    pub line_no: u32,
    pub verbosity: Verbosity,
    pub listing: Option<&'sink mut dyn std::fmt::Write>,
}

impl<'sink> AsmContext<'sink> {
    #[must_use]
    pub fn new(fill: u8, verbosity: Verbosity) -> Self {
        Self {
            image: Image::new(fill),
            symtab: SymbolTable::new(),
            pc: 0,
            gate: None,
            line_no: 0,
            verbosity,
            listing: None,
        }
    }

    /// `true` while a closed `IF`/`ELSE` gate is swallowing lines.
    #[must_use]
    pub const fn is_swallowing(&self) -> bool {
        matches!(self.gate, Some(Gate::ClosedAwaitingElse | Gate::ClosedAfterElse))
    }

    pub fn log(&self, level: u8, msg: impl FnOnce() -> String) {
        if self.verbosity.is_enabled(level) {
            eprintln!("{}", msg());
        }
    }

    /// Write one byte at the current PC and advance it.
    pub fn emit_byte(&mut self, b: u8) -> Result<(), ImageError> {
        self.image.write(self.pc, b)?;
        self.pc += 1;
        Ok(())
    }

    /// Write one byte that may be a deferred fix-up: if `patch` is set,
    /// stamp its width and image address onto the placeholder location
    /// (spec.md §4.F "the patch's `addr` is set to the image offset").
    pub fn emit_byte_patched(&mut self, b: u8, patch: Option<PatchId>, width: PatchWidth) -> Result<(), ImageError> {
        let addr = self.pc as u16;
        self.emit_byte(b)?;
        if let Some(id) = patch {
            let p = self.symtab.patch_mut(id);
            p.width = width;
            p.addr = addr;
        }
        Ok(())
    }

    /// Write a little-endian word, as `two_byte_lohi` patch slots do.
    pub fn emit_word_patched(&mut self, w: i32, patch: Option<PatchId>) -> Result<(), ImageError> {
        let addr = self.pc as u16;
        self.emit_byte((w & 0xFF) as u8)?;
        self.emit_byte(((w >> 8) & 0xFF) as u8)?;
        if let Some(id) = patch {
            let p = self.symtab.patch_mut(id);
            p.width = PatchWidth::TwoByteLoHi;
            p.addr = addr;
        }
        Ok(())
    }

    /// Write a PC-relative displacement byte for `JR`/`DJNZ`. `target` is
    /// the absolute destination address; `instr_addr` is the address of
    /// the opcode byte (spec.md §8: byte at `A+1` equals `T-A-2`).
    pub fn emit_relative(
        &mut self,
        instr_addr: u32,
        target: i32,
        patch: Option<PatchId>,
        line: u32,
    ) -> Result<(), crate::error::AsmError> {
        let addr = self.pc as u16;
        if let Some(id) = patch {
            self.emit_byte(0).map_err(|e| crate::error::AsmError::from_image(line, e))?;
            let p = self.symtab.patch_mut(id);
            p.width = PatchWidth::PcRelByte;
            p.addr = addr;
            return Ok(());
        }
        let disp = target - (instr_addr as i32) - 2;
        if !(-128..=127).contains(&disp) {
            return Err(crate::error::AsmError::DisplacementOutOfRange { line, value: disp });
        }
        self.emit_byte(disp as u8).map_err(|e| crate::error::AsmError::from_image(line, e))
    }
}

/// Convert a resolved value into the concrete byte writes a patch demands,
/// per its width (spec.md "Patch width" glossary entry).
///
/// # Errors
/// A `PcRelByte` patch whose resolved displacement is out of `[-128,127]`.
pub fn resolve_patch_bytes(width: PatchWidth, addr: u16, value: i32) -> Result<Vec<(u16, u8)>, i32> {
    match width {
        PatchWidth::OneByte => vec![(addr, (value & 0xFF) as u8)].into_iter().map(Ok).collect(),
        PatchWidth::TwoByteLoHi => Ok(vec![
            (addr, (value & 0xFF) as u8),
            (addr.wrapping_add(1), ((value >> 8) & 0xFF) as u8),
        ]),
        PatchWidth::PcRelByte => {
            let disp = value - i32::from(addr) - 1;
            if !(-128..=127).contains(&disp) {
                return Err(disp);
            }
            Ok(vec![(addr, disp as u8)])
        }
        PatchWidth::Unknown => Ok(Vec::new()),
    }
}
