//! XML Encoding Detection and Conversion
//!
//! Handles detection of UTF-8, UTF-16 and UTF-32 (both byte orders) based on
//! BOM and byte patterns, plus Latin-1 named in the XML declaration.
//!
//! Two decode paths exist:
//! - `decode_lossy`: input side, malformed sequences become U+FFFD so the
//!   tree always holds valid UTF-8
//! - `decode_strict`: materialization side, fails with the byte offset of the
//!   first malformed sequence
//!
//! Output goes the other way through `encode_into`.

use memchr::memmem;

/// Character encoding of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding {
    /// Detect from BOM, null-byte pattern or declaration (input); UTF-8 (output)
    #[default]
    Auto,
    Utf8,
    Utf16Le,
    Utf16Be,
    /// UTF-16 in native byte order
    Utf16,
    Utf32Le,
    Utf32Be,
    /// UTF-32 in native byte order
    Utf32,
    /// Platform wide character: UTF-16 on Windows, UTF-32 elsewhere
    Wchar,
    /// ISO-8859-1
    Latin1,
}

impl Encoding {
    /// Detect encoding from byte order mark or initial bytes
    pub fn detect(input: &[u8]) -> Self {
        let d = |i: usize| input.get(i).copied();

        match (d(0), d(1), d(2), d(3)) {
            (Some(0x00), Some(0x00), Some(0xFE), Some(0xFF)) => return Encoding::Utf32Be,
            (Some(0xFF), Some(0xFE), Some(0x00), Some(0x00)) => return Encoding::Utf32Le,
            (Some(0x00), Some(0x00), Some(0x00), Some(b'<')) => return Encoding::Utf32Be,
            (Some(b'<'), Some(0x00), Some(0x00), Some(0x00)) => return Encoding::Utf32Le,
            _ => {}
        }

        match (d(0), d(1), d(2)) {
            (Some(0xFE), Some(0xFF), _) => Encoding::Utf16Be,
            (Some(0xFF), Some(0xFE), _) => Encoding::Utf16Le,
            (Some(0xEF), Some(0xBB), Some(0xBF)) => Encoding::Utf8,
            // No BOM - '<' next to a null byte
            (Some(0x00), Some(b'<'), _) => Encoding::Utf16Be,
            (Some(b'<'), Some(0x00), _) => Encoding::Utf16Le,
            _ => {
                if declares_latin1(input) {
                    Encoding::Latin1
                } else {
                    Encoding::Utf8
                }
            }
        }
    }

    /// Concrete encoding used to decode `input`
    pub fn resolve_input(self, input: &[u8]) -> Self {
        match self {
            Encoding::Auto => Encoding::detect(input),
            other => other.resolve_native(),
        }
    }

    /// Concrete encoding used to write output
    pub fn resolve_output(self) -> Self {
        match self {
            Encoding::Auto => Encoding::Utf8,
            other => other.resolve_native(),
        }
    }

    fn resolve_native(self) -> Self {
        match self {
            Encoding::Utf16 => {
                if cfg!(target_endian = "little") {
                    Encoding::Utf16Le
                } else {
                    Encoding::Utf16Be
                }
            }
            Encoding::Utf32 => {
                if cfg!(target_endian = "little") {
                    Encoding::Utf32Le
                } else {
                    Encoding::Utf32Be
                }
            }
            Encoding::Wchar => {
                if cfg!(windows) {
                    Encoding::Utf16.resolve_native()
                } else {
                    Encoding::Utf32.resolve_native()
                }
            }
            other => other,
        }
    }

    /// Byte order mark for a concrete encoding (empty for Latin-1)
    pub fn bom(self) -> &'static [u8] {
        match self.resolve_output() {
            Encoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            Encoding::Utf16Le => &[0xFF, 0xFE],
            Encoding::Utf16Be => &[0xFE, 0xFF],
            Encoding::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            Encoding::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
            _ => &[],
        }
    }
}

/// Look for `encoding="latin1"` or `encoding="iso-8859-1"` in a leading declaration
fn declares_latin1(input: &[u8]) -> bool {
    if !input.starts_with(b"<?xml") {
        return false;
    }
    let decl = match memmem::find(input, b"?>") {
        Some(end) => &input[..end],
        None => return false,
    };
    let Some(at) = memmem::find(decl, b"encoding") else {
        return false;
    };
    let mut rest = &decl[at + b"encoding".len()..];
    while let [b' ' | b'\t' | b'\r' | b'\n' | b'=', tail @ ..] = rest {
        rest = tail;
    }
    let Some((&quote, tail)) = rest.split_first() else {
        return false;
    };
    if quote != b'"' && quote != b'\'' {
        return false;
    }
    let Some(end) = tail.iter().position(|&b| b == quote) else {
        return false;
    };
    let name = &tail[..end];
    name.eq_ignore_ascii_case(b"latin1") || name.eq_ignore_ascii_case(b"iso-8859-1")
}

/// Decode a buffer into UTF-8, replacing malformed sequences with U+FFFD
///
/// Valid UTF-8 input is taken over without copying.
pub fn decode_lossy(input: Vec<u8>, encoding: Encoding) -> String {
    match encoding.resolve_native() {
        Encoding::Utf16Le => decode_utf16_lossy(strip(&input, &[0xFF, 0xFE]), u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16_lossy(strip(&input, &[0xFE, 0xFF]), u16::from_be_bytes),
        Encoding::Utf32Le => {
            decode_utf32_lossy(strip(&input, &[0xFF, 0xFE, 0x00, 0x00]), u32::from_le_bytes)
        }
        Encoding::Utf32Be => {
            decode_utf32_lossy(strip(&input, &[0x00, 0x00, 0xFE, 0xFF]), u32::from_be_bytes)
        }
        Encoding::Latin1 => input.iter().map(|&b| b as char).collect(),
        _ => {
            let mut input = input;
            if input.starts_with(&[0xEF, 0xBB, 0xBF]) {
                input.drain(..3);
            }
            match String::from_utf8(input) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            }
        }
    }
}

/// Decode a buffer into UTF-8, failing at the first malformed sequence
///
/// The error carries the byte offset of the offending sequence.
pub fn decode_strict(input: &[u8], encoding: Encoding) -> Result<String, usize> {
    match encoding.resolve_output() {
        Encoding::Utf16Le => decode_utf16_strict(input, u16::from_le_bytes),
        Encoding::Utf16Be => decode_utf16_strict(input, u16::from_be_bytes),
        Encoding::Utf32Le => decode_utf32_strict(input, u32::from_le_bytes),
        Encoding::Utf32Be => decode_utf32_strict(input, u32::from_be_bytes),
        Encoding::Latin1 => Ok(input.iter().map(|&b| b as char).collect()),
        _ => std::str::from_utf8(input)
            .map(str::to_owned)
            .map_err(|e| e.valid_up_to()),
    }
}

/// Append `text` to `out` in the given output encoding
///
/// Characters outside Latin-1 are written as `?` when encoding to Latin-1.
pub fn encode_into(text: &str, encoding: Encoding, out: &mut Vec<u8>) {
    match encoding.resolve_output() {
        Encoding::Utf16Le => {
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_le_bytes());
            }
        }
        Encoding::Utf16Be => {
            for unit in text.encode_utf16() {
                out.extend_from_slice(&unit.to_be_bytes());
            }
        }
        Encoding::Utf32Le => {
            for c in text.chars() {
                out.extend_from_slice(&(c as u32).to_le_bytes());
            }
        }
        Encoding::Utf32Be => {
            for c in text.chars() {
                out.extend_from_slice(&(c as u32).to_be_bytes());
            }
        }
        Encoding::Latin1 => {
            out.extend(text.chars().map(|c| u8::try_from(c as u32).unwrap_or(b'?')));
        }
        _ => out.extend_from_slice(text.as_bytes()),
    }
}

#[inline]
fn strip<'a>(input: &'a [u8], bom: &[u8]) -> &'a [u8] {
    input.strip_prefix(bom).unwrap_or(input)
}

fn decode_utf16_lossy(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    let mut text: String = char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if bytes.len() % 2 != 0 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn decode_utf32_lossy(bytes: &[u8], unit: fn([u8; 4]) -> u32) -> String {
    let mut text: String = bytes
        .chunks_exact(4)
        .map(|c| {
            char::from_u32(unit([c[0], c[1], c[2], c[3]])).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    if bytes.len() % 4 != 0 {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn decode_utf16_strict(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, usize> {
    let mut text = String::with_capacity(bytes.len() / 2);
    let mut pos = 0;
    while pos + 1 < bytes.len() {
        let lead = unit([bytes[pos], bytes[pos + 1]]);
        match lead {
            0xD800..=0xDBFF => {
                if pos + 3 >= bytes.len() {
                    return Err(pos);
                }
                let trail = unit([bytes[pos + 2], bytes[pos + 3]]);
                if !(0xDC00..=0xDFFF).contains(&trail) {
                    return Err(pos);
                }
                let cp = 0x10000 + (((lead as u32) - 0xD800) << 10) + ((trail as u32) - 0xDC00);
                text.push(char::from_u32(cp).ok_or(pos)?);
                pos += 4;
            }
            0xDC00..=0xDFFF => return Err(pos),
            _ => {
                text.push(char::from_u32(lead as u32).ok_or(pos)?);
                pos += 2;
            }
        }
    }
    if pos != bytes.len() {
        return Err(pos);
    }
    Ok(text)
}

fn decode_utf32_strict(bytes: &[u8], unit: fn([u8; 4]) -> u32) -> Result<String, usize> {
    let mut text = String::with_capacity(bytes.len() / 4);
    for (i, c) in bytes.chunks(4).enumerate() {
        let pos = i * 4;
        if c.len() != 4 {
            return Err(pos);
        }
        text.push(char::from_u32(unit([c[0], c[1], c[2], c[3]])).ok_or(pos)?);
    }
    Ok(text)
}
