//! Binary container readers and writers (spec.md §4.I "Format I/O Glue").
//!
//! Input format is chosen by the input file's extension; output format by
//! the output file's. Everything here is a pure transformation between
//! bytes and an [`Image`] -- no file-handle or path manipulation, which
//! stays with the binaries that call into this crate.

use z80_core::{Image, ImageError};

/// The leading-offset container's signature (`HdrSave`/`HdrLoad` in the
/// original sources): eight bytes, then a little-endian base address.
pub const Z80ASM_SIGNATURE: &[u8; 8] = b"Z80ASM\x1A\n";

/// CP/M programs always load at `0x100`.
pub const COM_BASE: u16 = 0x0100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The `.z80` container's signature didn't match.
    BadSignature,
    /// A `.z80` container was shorter than its header promised.
    Truncated,
    /// The image has nothing loaded, so there's nothing to write.
    EmptyImage,
    /// CP/M COM output requires the image to start at or after `0x100`
    /// and extend past it.
    ComRangeInvalid { lo_pc: u16, hi_pc: u16 },
    Image(ImageError),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadSignature => write!(f, "not a recognized Z80ASM container"),
            Self::Truncated => write!(f, "truncated Z80ASM container"),
            Self::EmptyImage => write!(f, "image is empty, nothing to write"),
            Self::ComRangeInvalid { lo_pc, hi_pc } => {
                write!(f, "image range {lo_pc:04X}..={hi_pc:04X} cannot be written as a CP/M COM file")
            }
            Self::Image(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<ImageError> for FormatError {
    fn from(e: ImageError) -> Self {
        Self::Image(e)
    }
}

/// Load `bytes` (an Intel HEX stream) into `image`.
pub fn load_hex(image: &mut Image, bytes: &[u8]) -> Result<(), FormatError> {
    struct Sink<'a> {
        image: &'a mut Image,
        error: Option<ImageError>,
    }
    impl z80_hex::HexSink for Sink<'_> {
        fn on_record(&mut self, rec_type: z80_hex::RecordType, address: u32, data: &[u8], _checksum_ok: bool) -> bool {
            if self.error.is_some() {
                return false;
            }
            if rec_type == z80_hex::RecordType::Data {
                for (i, &b) in data.iter().enumerate() {
                    if let Err(e) = self.image.write(address + i as u32, b) {
                        self.error = Some(e);
                        return false;
                    }
                }
            }
            true
        }
    }
    let mut sink = Sink { image, error: None };
    let mut reader = z80_hex::HexReader::new();
    reader.feed_all(bytes, &mut sink);
    match sink.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Load `bytes` as a leading-offset `.z80` container: an 8-byte signature
/// followed by a little-endian base address and the raw image bytes.
pub fn load_z80(image: &mut Image, bytes: &[u8]) -> Result<(), FormatError> {
    if bytes.len() < Z80ASM_SIGNATURE.len() + 2 {
        return Err(FormatError::Truncated);
    }
    let (sig, rest) = bytes.split_at(Z80ASM_SIGNATURE.len());
    if sig != Z80ASM_SIGNATURE {
        return Err(FormatError::BadSignature);
    }
    let base = u16::from(rest[0]) | (u16::from(rest[1]) << 8);
    image.load(base, &rest[2..])?;
    Ok(())
}

/// Load `bytes` as a raw binary, placed at `base`.
pub fn load_raw(image: &mut Image, base: u16, bytes: &[u8]) -> Result<(), FormatError> {
    image.load(base, bytes)?;
    Ok(())
}

/// Pick a loader by `extension` (without the leading dot, any case):
/// `hex` -> Intel HEX, `z80` -> the leading-offset container, anything
/// else -> raw binary at `base`.
pub fn load_by_extension(image: &mut Image, extension: &str, base: u16, bytes: &[u8]) -> Result<(), FormatError> {
    match extension.to_ascii_lowercase().as_str() {
        "hex" => load_hex(image, bytes),
        "z80" => load_z80(image, bytes),
        _ => load_raw(image, base, bytes),
    }
}

/// Raw bytes from `base..=hi_pc` of `image`, for `.bin` output.
pub fn write_raw(image: &Image, base: u16) -> Result<Vec<u8>, FormatError> {
    let hi = image.hi_pc().ok_or(FormatError::EmptyImage)?;
    if hi < base {
        return Ok(Vec::new());
    }
    Ok(image.read_slice(base, usize::from(hi - base) + 1).to_vec())
}

/// Raw bytes from `0x100..=hi_pc`, for CP/M `.com` output. Declined if the
/// image doesn't actually occupy that range.
pub fn write_com(image: &Image) -> Result<Vec<u8>, FormatError> {
    let lo = image.lo_pc().ok_or(FormatError::EmptyImage)?;
    let hi = image.hi_pc().ok_or(FormatError::EmptyImage)?;
    if lo < COM_BASE || hi <= COM_BASE {
        return Err(FormatError::ComRangeInvalid { lo_pc: lo, hi_pc: hi });
    }
    write_raw(image, COM_BASE)
}

/// The leading-offset `.z80` container: signature, `lo_pc`, then
/// `image[lo_pc..=hi_pc]`.
pub fn write_z80(image: &Image) -> Result<Vec<u8>, FormatError> {
    let lo = image.lo_pc().ok_or(FormatError::EmptyImage)?;
    let mut out = Vec::with_capacity(Z80ASM_SIGNATURE.len() + 2);
    out.extend_from_slice(Z80ASM_SIGNATURE);
    out.push(lo as u8);
    out.push((lo >> 8) as u8);
    out.extend_from_slice(&write_raw(image, lo)?);
    Ok(out)
}

/// `image[lo_pc..=hi_pc]` as an Intel HEX stream.
pub fn write_hex(image: &Image) -> Result<Vec<u8>, FormatError> {
    let lo = image.lo_pc().ok_or(FormatError::EmptyImage)?;
    let bytes = write_raw(image, lo)?;
    Ok(z80_hex::encode(lo, &bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_binary_round_trips_at_a_base_offset() {
        let mut image = Image::new(0);
        load_raw(&mut image, 0x8000, &[1, 2, 3]).unwrap();
        assert_eq!(write_raw(&image, 0x8000).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn z80_container_round_trips_through_its_signature() {
        let mut image = Image::new(0);
        image.load(0x4000, &[0xAA, 0xBB, 0xCC]).unwrap();
        let bytes = write_z80(&image).unwrap();
        assert_eq!(&bytes[..8], Z80ASM_SIGNATURE);
        assert_eq!(&bytes[8..10], &[0x00, 0x40]);

        let mut round_tripped = Image::new(0);
        load_z80(&mut round_tripped, &bytes).unwrap();
        assert_eq!(round_tripped.read_slice(0x4000, 3), &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn z80_container_rejects_a_bad_signature() {
        let mut image = Image::new(0);
        let err = load_z80(&mut image, b"NOTZ80!!\x00\x00").unwrap_err();
        assert_eq!(err, FormatError::BadSignature);
    }

    #[test]
    fn hex_round_trips() {
        let mut image = Image::new(0);
        image.load(0x1000, &[1, 2, 3, 4, 5]).unwrap();
        let hex = write_hex(&image).unwrap();

        let mut round_tripped = Image::new(0);
        load_hex(&mut round_tripped, &hex).unwrap();
        assert_eq!(round_tripped.read_slice(0x1000, 5), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn com_output_requires_the_0x100_base() {
        let mut image = Image::new(0);
        image.load(0x0000, &[1, 2, 3]).unwrap();
        assert!(matches!(write_com(&image), Err(FormatError::ComRangeInvalid { .. })));
    }

    #[test]
    fn com_output_succeeds_when_the_range_fits() {
        let mut image = Image::new(0);
        image.load(0x0100, &[0xC9]).unwrap();
        assert_eq!(write_com(&image).unwrap(), vec![0xC9]);
    }

    #[test]
    fn dispatch_by_extension_picks_the_right_loader() {
        let mut image = Image::new(0);
        load_by_extension(&mut image, "BIN", 0x2000, &[0x42]).unwrap();
        assert_eq!(image.read(0x2000), 0x42);
    }
}
