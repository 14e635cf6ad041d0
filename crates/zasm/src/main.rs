//! Z80 assembler command-line front end (spec.md §6 "Assembler CLI").
//!
//! `zasm [-c] [-fXX] [-l] [-n] [-oXXXX] [-v...] infile`
//!
//! Flag parsing and filename derivation are deliberately simple manual
//! code, not a dependency: the CLI front end is an explicit non-goal of
//! the core's design (spec.md §1), so it stays a thin wrapper around
//! `z80-asm`/`z80-formats`.

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use z80_asm::{AssemblerOptions, Verbosity};

struct Args {
    com: bool,
    fill: u8,
    listing: bool,
    no_output: bool,
    offset: u16,
    verbosity: u8,
    infile: String,
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut com = false;
    let mut fill = 0u8;
    let mut listing = false;
    let mut no_output = false;
    let mut offset = 0u16;
    let mut verbosity = 0u8;
    let mut infile = None;

    for arg in raw {
        if arg == "-c" {
            com = true;
        } else if arg == "-l" {
            listing = true;
        } else if arg == "-n" {
            no_output = true;
        } else if arg == "-v" {
            verbosity += 1;
        } else if let Some(hex) = arg.strip_prefix("-f") {
            fill = u8::from_str_radix(hex, 16).map_err(|_| format!("bad -f value: {hex}"))?;
        } else if let Some(hex) = arg.strip_prefix("-o") {
            offset = u16::from_str_radix(hex, 16).map_err(|_| format!("bad -o value: {hex}"))?;
        } else if arg.starts_with('-') {
            return Err(format!("unknown flag: {arg}"));
        } else if infile.is_none() {
            infile = Some(arg.clone());
        } else {
            return Err(format!("unexpected argument: {arg}"));
        }
    }

    let infile = infile.ok_or_else(|| "missing input file".to_string())?;
    Ok(Args { com, fill, listing, no_output, offset, verbosity, infile })
}

fn usage(prog: &str) {
    eprintln!("Usage: {prog} [-c] [-fXX] [-l] [-n] [-oXXXX] [-v...] infile");
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().collect();
    let prog = raw.first().map_or("zasm", |s| s.as_str()).to_string();

    let args = match parse_args(&raw[1..]) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{prog}: {e}");
            usage(&prog);
            return ExitCode::FAILURE;
        }
    };

    let in_path = Path::new(&args.infile);
    if in_path.extension().and_then(|e| e.to_str()) != Some("asm") {
        eprintln!("{prog}: input file must have a .asm extension");
        return ExitCode::FAILURE;
    }

    let source = match fs::read_to_string(in_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{prog}: {}: {e}", args.infile);
            return ExitCode::FAILURE;
        }
    };

    let options = AssemblerOptions {
        fill: args.fill,
        load_offset: args.offset,
        verbosity: Verbosity(args.verbosity),
        listing: args.listing,
    };

    let output = match z80_asm::assemble(&source, &options) {
        Ok(o) => o,
        Err(e) => {
            eprintln!("{prog}: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(listing) = &output.listing {
        print!("{listing}");
        for sym in output.symtab.defined_user_symbols() {
            println!("{:04X}   {}", sym.value, sym.name);
        }
    }

    let mut ok = true;
    for name in &output.undefined_symbols {
        eprintln!("----    {name} is undefined!");
        ok = false;
    }

    if !args.no_output && ok {
        let stem = in_path.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
        if let Err(e) = write_outputs(stem, &output.image, args.com) {
            eprintln!("{prog}: {e}");
            return ExitCode::FAILURE;
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn write_outputs(stem: &str, image: &z80_core::Image, com: bool) -> Result<(), String> {
    let bin = if com {
        z80_formats::write_com(image).map_err(|e| e.to_string())?
    } else {
        let base = image.lo_pc().unwrap_or(0);
        z80_formats::write_raw(image, base).map_err(|e| e.to_string())?
    };
    let bin_ext = if com { "com" } else { "bin" };
    fs::write(format!("{stem}.{bin_ext}"), &bin).map_err(|e| e.to_string())?;

    let z80 = z80_formats::write_z80(image).map_err(|e| e.to_string())?;
    fs::write(format!("{stem}.z80"), &z80).map_err(|e| e.to_string())?;

    let hex = z80_formats::write_hex(image).map_err(|e| e.to_string())?;
    fs::write(format!("{stem}.hex"), &hex).map_err(|e| e.to_string())?;

    Ok(())
}
