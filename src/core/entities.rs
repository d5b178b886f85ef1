//! XML Text Conversion
//!
//! Handles the text transforms applied while parsing:
//! - Built-in entities: &lt; &gt; &amp; &quot; &apos;
//! - Numeric character references: &#123; &#x7B;
//! - End-of-line normalization (`\r\n` and `\r` to `\n`)
//! - Attribute whitespace conversion and normalization
//!
//! Uses Cow for zero-copy when the text needs no change, which is what lets
//! the parser keep borrowed ranges into the source buffer.

use memchr::{memchr, memchr2};
use std::borrow::Cow;

use super::options::ParseOptions;

#[inline]
fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// Decode a single entity body (without `&` and `;`)
fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let num = entity.strip_prefix('#')?;
            let codepoint = match num.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => num.parse::<u32>().ok()?,
            };
            // "+1" is accepted by from_str_radix but is not a reference
            if num.bytes().any(|b| b == b'+') {
                return None;
            }
            char::from_u32(codepoint)
        }
    }
}

/// Try to decode the reference starting at `input[0] == '&'`
///
/// Returns the character and the number of bytes consumed. Unknown or
/// malformed references return None and are kept verbatim.
#[inline]
fn decode_reference(input: &str) -> Option<(char, usize)> {
    // Longest reference body is "#x10FFFF"
    let window = &input.as_bytes()[1..input.len().min(12)];
    let semi = memchr(b';', window)?;
    let body = &input[1..1 + semi];
    decode_entity(body).map(|c| (c, semi + 2))
}

/// Decode entity references in text
///
/// Returns Borrowed if no reference was decoded.
pub fn decode_text(input: &str) -> Cow<'_, str> {
    if memchr(b'&', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(amp) = memchr(b'&', &input.as_bytes()[pos..]) {
        out.push_str(&input[pos..pos + amp]);
        pos += amp;
        match decode_reference(&input[pos..]) {
            Some((c, len)) => {
                out.push(c);
                pos += len;
            }
            None => {
                out.push('&');
                pos += 1;
            }
        }
    }
    out.push_str(&input[pos..]);
    Cow::Owned(out)
}

/// Normalize `\r\n` and lone `\r` to `\n`
pub fn normalize_eol(input: &str) -> Cow<'_, str> {
    if memchr(b'\r', input.as_bytes()).is_none() {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

/// Convert PCDATA according to ESCAPES, EOL and TRIM_PCDATA
pub fn convert_pcdata(input: &str, opts: ParseOptions) -> Cow<'_, str> {
    let escapes = opts.contains(ParseOptions::ESCAPES);
    let eol = opts.contains(ParseOptions::EOL);
    let trim = opts.contains(ParseOptions::TRIM_PCDATA);

    let input = if trim {
        input.trim_start_matches([' ', '\t', '\n', '\r'])
    } else {
        input
    };

    let bytes = input.as_bytes();
    let dirty = match (escapes, eol) {
        (true, true) => memchr2(b'&', b'\r', bytes).is_some(),
        (true, false) => memchr(b'&', bytes).is_some(),
        (false, true) => memchr(b'\r', bytes).is_some(),
        (false, false) => false,
    };

    if !dirty {
        return Cow::Borrowed(if trim { trim_end_space(input) } else { input });
    }

    let mut text = if eol { normalize_eol(input) } else { Cow::Borrowed(input) };
    let decoded = match escapes {
        true => match decode_text(&text) {
            Cow::Owned(decoded) => Some(decoded),
            Cow::Borrowed(_) => None,
        },
        false => None,
    };
    if let Some(decoded) = decoded {
        text = Cow::Owned(decoded);
    }
    let mut text = text.into_owned();
    if trim {
        let keep = trim_end_space(&text).len();
        text.truncate(keep);
    }
    Cow::Owned(text)
}

#[inline]
fn trim_end_space(s: &str) -> &str {
    s.trim_end_matches([' ', '\t', '\n', '\r'])
}

/// Convert an attribute value according to ESCAPES, EOL, WCONV and WNORM
pub fn convert_attribute(input: &str, opts: ParseOptions) -> Cow<'_, str> {
    let escapes = opts.contains(ParseOptions::ESCAPES);
    let eol = opts.contains(ParseOptions::EOL);
    let wconv = opts.contains(ParseOptions::WCONV_ATTRIBUTE);
    let wnorm = opts.contains(ParseOptions::WNORM_ATTRIBUTE);

    let bytes = input.as_bytes();
    let clean = bytes.iter().enumerate().all(|(i, &b)| match b {
        b'&' => !escapes,
        b'\r' => !(eol || wconv || wnorm),
        b'\t' | b'\n' => !(wconv || wnorm),
        b' ' if wnorm => i != 0 && i + 1 != bytes.len() && bytes[i + 1] != b' ',
        _ => true,
    });
    if clean {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    let mut pos = 0;
    // Set while a run of literal whitespace is pending under WNORM
    let mut pending_space = false;

    while pos < input.len() {
        let b = bytes[pos];
        if wnorm && is_space(b) {
            pending_space = true;
            pos += 1;
            continue;
        }
        if pending_space {
            if !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
        }
        match b {
            b'&' if escapes => match decode_reference(&input[pos..]) {
                Some((c, len)) => {
                    out.push(c);
                    pos += len;
                }
                None => {
                    out.push('&');
                    pos += 1;
                }
            },
            b'\r' if wconv => {
                out.push(' ');
                pos += 1;
                if eol && bytes.get(pos) == Some(&b'\n') {
                    pos += 1;
                }
            }
            b'\t' | b'\n' if wconv => {
                out.push(' ');
                pos += 1;
            }
            b'\r' if eol => {
                out.push('\n');
                pos += 1;
                if bytes.get(pos) == Some(&b'\n') {
                    pos += 1;
                }
            }
            _ => {
                // Copy the whole run of untouched characters
                let run = bytes[pos..]
                    .iter()
                    .position(|&c| c == b'&' || is_space(c))
                    .map_or(input.len(), |n| pos + n.max(1));
                out.push_str(&input[pos..run]);
                pos = run;
            }
        }
    }
    Cow::Owned(out)
}
