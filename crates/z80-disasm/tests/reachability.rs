use z80_core::Image;
use z80_disasm::{disassemble, DisassemblerOptions, Mode, ModeMap};

fn scan(image: &Image, seed_vectors: bool) -> (ModeMap, Vec<z80_disasm::Diagnostic>) {
    let mut entries = vec![image.lo_pc().unwrap()];
    if seed_vectors {
        entries.extend_from_slice(&z80_disasm::RST_VECTORS);
        entries.push(z80_disasm::NMI_VECTOR);
    }
    z80_disasm::trace::trace(image, &entries)
}

#[test]
fn indirect_jump_leaves_the_rest_as_data() {
    let mut image = Image::new(0);
    image.load(0, &[0xE9, 0xFF]).unwrap(); // JP (HL); RST 38H

    let (map, diagnostics) = scan(&image, true);

    assert_eq!(map.mode(0), Mode::Opcode);
    assert_eq!(map.mode(1), Mode::Data);
    assert!(diagnostics.is_empty());
}

#[test]
fn disassemble_with_reachability_renders_the_unreached_byte_as_defb() {
    let mut image = Image::new(0);
    image.load(0, &[0xE9, 0xFF]).unwrap();

    let options = DisassemblerOptions { reachability: true, seed_vectors: true, hex_dump: false, start: None };
    let output = disassemble(&image, &options);

    assert_eq!(output.lines.len(), 2);
    assert_eq!(output.lines[0].addr, 0);
    assert!(output.lines[0].text.contains("JP"));
    assert_eq!(output.lines[1].addr, 1);
    assert!(output.lines[1].text.starts_with("DEFB"));
    assert!(output.diagnostics.is_empty());
}
