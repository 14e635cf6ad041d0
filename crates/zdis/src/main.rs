//! Z80 disassembler command-line front end (spec.md §6 "Disassembler CLI").
//!
//! `zdis [-fXX] [-oXXXX] [-sXXXX] [-p] [-r] [-v...] [-x] infile [outfile]`
//!
//! Flag parsing, filename handling, and listing pretty-printing are kept
//! here rather than in `z80-disasm`: the core's design explicitly leaves
//! those to the front end (spec.md §1).

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use z80_core::Image;
use z80_disasm::{disassemble, DisassemblerOptions, Line};

struct Args {
    fill: u8,
    offset: u16,
    start: Option<u16>,
    reachability: bool,
    seed_vectors: bool,
    hex_dump: bool,
    verbosity: u8,
    infile: String,
    outfile: Option<String>,
}

fn parse_args(raw: &[String]) -> Result<Args, String> {
    let mut fill = 0u8;
    let mut offset = 0u16;
    let mut start = None;
    let mut reachability = false;
    let mut seed_vectors = false;
    let mut hex_dump = false;
    let mut verbosity = 0u8;
    let mut positional = Vec::new();

    for arg in raw {
        if arg == "-p" {
            reachability = true;
        } else if arg == "-r" {
            seed_vectors = true;
        } else if arg == "-x" {
            hex_dump = true;
        } else if arg == "-v" {
            verbosity += 1;
        } else if let Some(hex) = arg.strip_prefix("-f") {
            fill = u8::from_str_radix(hex, 16).map_err(|_| format!("bad -f value: {hex}"))?;
        } else if let Some(hex) = arg.strip_prefix("-o") {
            offset = u16::from_str_radix(hex, 16).map_err(|_| format!("bad -o value: {hex}"))?;
        } else if let Some(hex) = arg.strip_prefix("-s") {
            start = Some(u16::from_str_radix(hex, 16).map_err(|_| format!("bad -s value: {hex}"))?);
        } else if arg.starts_with('-') {
            return Err(format!("unknown flag: {arg}"));
        } else {
            positional.push(arg.clone());
        }
    }

    if positional.is_empty() || positional.len() > 2 {
        return Err("expected infile [outfile]".to_string());
    }
    let outfile = if positional.len() == 2 { Some(positional[1].clone()) } else { None };
    Ok(Args {
        fill,
        offset,
        start,
        reachability,
        seed_vectors,
        hex_dump,
        verbosity,
        infile: positional[0].clone(),
        outfile,
    })
}

fn usage(prog: &str) {
    eprintln!("Usage: {prog} [-fXX] [-oXXXX] [-sXXXX] [-p] [-r] [-v...] [-x] infile [outfile]");
}

fn main() -> ExitCode {
    let raw: Vec<String> = env::args().collect();
    let prog = raw.first().map_or("zdis", |s| s.as_str()).to_string();

    let args = match parse_args(&raw[1..]) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{prog}: {e}");
            usage(&prog);
            return ExitCode::FAILURE;
        }
    };

    let bytes = match fs::read(&args.infile) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("{prog}: {}: {e}", args.infile);
            return ExitCode::FAILURE;
        }
    };

    let mut image = Image::new(args.fill);
    let extension = Path::new(&args.infile).extension().and_then(|e| e.to_str()).unwrap_or("");
    if let Err(e) = z80_formats::load_by_extension(&mut image, extension, args.offset, &bytes) {
        eprintln!("{prog}: {e}");
        return ExitCode::FAILURE;
    }

    let options = DisassemblerOptions {
        reachability: args.reachability,
        seed_vectors: args.seed_vectors,
        hex_dump: args.hex_dump,
        start: args.start,
    };
    if args.verbosity > 0 {
        eprintln!("{prog}: disassembling {} ({} bytes loaded)", args.infile, bytes.len());
    }

    let result = disassemble(&image, &options);
    // `-vv`: per-instruction trace as each address is decoded, the same
    // level `original_source/Das.cpp` gates its `ShowOp` calls behind.
    if args.verbosity > 1 {
        for line in &result.lines {
            eprintln!("{prog}: ShowOp {:04X}: {}", line.addr, line.text);
        }
    }
    for diag in &result.diagnostics {
        eprintln!("{}", diag.message);
    }

    let rendered = render_listing(&result.lines, args.hex_dump);

    match &args.outfile {
        Some(path) => {
            if let Err(e) = fs::write(path, rendered) {
                eprintln!("{prog}: {path}: {e}");
                return ExitCode::FAILURE;
            }
        }
        None => print!("{rendered}"),
    }

    ExitCode::SUCCESS
}

/// `AAAA   BB BB BB BB     <source line>`, wrapping data beyond four bytes
/// onto address-only continuation lines, followed by the label
/// cross-reference (spec.md §6 "Listing format").
fn render_listing(lines: &[Line], hex_dump: bool) -> String {
    use std::fmt::Write as _;
    let mut out = String::new();

    for line in lines {
        let text = if line.label {
            format!("L{:04X}: {}", line.addr, line.text)
        } else {
            line.text.clone()
        };
        if !hex_dump {
            let _ = writeln!(out, "{:04X}   {text}", line.addr);
            continue;
        }
        let mut chunks = line.bytes.chunks(4);
        let first = chunks.next().unwrap_or(&[]);
        let _ = writeln!(out, "{:04X}   {:<11} {text}", line.addr, byte_columns(first));
        let mut addr = line.addr.wrapping_add(4);
        for rest in chunks {
            let _ = writeln!(out, "{:04X}   {}", addr, byte_columns(rest));
            addr = addr.wrapping_add(4);
        }
    }

    out.push('\n');
    for line in lines.iter().filter(|l| l.label) {
        let _ = writeln!(out, "{:04X}   L{:04X}", line.addr, line.addr);
    }
    out
}

fn byte_columns(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
}
