//! Cursor over the parse buffer with memchr-backed searches
//!
//! `memchr` picks SSE2/AVX2 on x86_64 and NEON on aarch64 at runtime, so
//! skipping text runs and comment bodies costs a vector scan rather than a
//! byte loop.
//!
//! The cursor only ever stops on ASCII delimiters, which keeps every
//! `slice` between two stops on a UTF-8 character boundary.

use memchr::{memchr, memmem};

pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    #[inline]
    pub fn new(text: &'a str) -> Self {
        Scanner { text, pos: 0 }
    }

    /// Unread part of the buffer
    #[inline]
    fn rest(&self) -> &'a [u8] {
        self.text.as_bytes().get(self.pos..).unwrap_or_default()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Buffer length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Text between two delimiter positions
    #[inline]
    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[start..end]
    }

    #[inline]
    pub fn peek(&self) -> Option<u8> {
        self.rest().first().copied()
    }

    #[inline]
    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    /// Step over `expected` when it is the next byte
    #[inline]
    pub fn eat(&mut self, expected: u8) -> bool {
        let hit = self.peek() == Some(expected);
        if hit {
            self.pos += 1;
        }
        hit
    }

    #[inline]
    pub fn skip_whitespace(&mut self) {
        self.pos += self.rest().iter().take_while(|&&b| is_space(b)).count();
    }

    /// Absolute offset of the next `<`
    #[inline]
    pub fn find_tag_start(&self) -> Option<usize> {
        self.find_byte(b'<')
    }

    /// Absolute offset of the next `byte`
    #[inline]
    pub fn find_byte(&self, byte: u8) -> Option<usize> {
        memchr(byte, self.rest()).map(|i| self.pos + i)
    }

    /// Absolute offset of the next `needle`, e.g. a `-->` or `]]>` terminator
    #[inline]
    pub fn find_seq(&self, needle: &[u8]) -> Option<usize> {
        memmem::find(self.rest(), needle).map(|i| self.pos + i)
    }

    #[inline]
    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.rest().starts_with(prefix)
    }

    /// Consume a tag or attribute name and return its byte range
    ///
    /// Leaves the cursor in place when the next byte cannot start a name.
    pub fn read_name(&mut self) -> Option<(usize, usize)> {
        let rest = self.rest();
        if !rest.first().copied().is_some_and(is_name_start_char) {
            return None;
        }
        let len = 1 + rest[1..].iter().take_while(|&&b| is_name_char(b)).count();
        let start = self.pos;
        self.pos += len;
        Some((start, self.pos))
    }
}

/// Space, tab, LF or CR
#[inline]
pub fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}

/// First byte of a name; any byte of a multi-byte UTF-8 sequence qualifies
#[inline]
pub fn is_name_start_char(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || !b.is_ascii()
}

#[inline]
pub fn is_name_char(b: u8) -> bool {
    is_name_start_char(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_start() {
        let mut scanner = Scanner::new("text <a>");
        assert_eq!(scanner.find_tag_start(), Some(5));
        scanner.advance(6);
        assert_eq!(scanner.find_tag_start(), None);
        assert_eq!(scanner.find_byte(b'>'), Some(7));
    }

    #[test]
    fn test_comment_terminator() {
        let mut scanner = Scanner::new("<!-- a -- b -->tail");
        scanner.advance(4);
        assert!(scanner.starts_with(b" a"));
        assert_eq!(scanner.find_seq(b"-->"), Some(12));
    }

    #[test]
    fn test_names() {
        let mut scanner = Scanner::new("ns:item-2.x='v'");
        assert_eq!(scanner.read_name(), Some((0, 11)));
        assert_eq!(scanner.slice(0, 11), "ns:item-2.x");
        assert!(scanner.eat(b'='));
        assert!(!scanner.eat(b'='));

        let mut scanner = Scanner::new("\u{e9}l\u{e8}ve/>");
        let (start, end) = scanner.read_name().unwrap();
        assert_eq!(scanner.slice(start, end), "\u{e9}l\u{e8}ve");

        let mut scanner = Scanner::new("9lives");
        assert_eq!(scanner.read_name(), None);
        assert_eq!(scanner.position(), 0);
    }

    #[test]
    fn test_whitespace_and_eof() {
        let mut scanner = Scanner::new(" \t\r\n");
        scanner.skip_whitespace();
        assert!(scanner.is_eof());
        assert_eq!(scanner.peek(), None);
        // Positions past the end read as empty
        scanner.set_position(10);
        assert!(!scanner.starts_with(b"x"));
        assert_eq!(scanner.find_byte(b'x'), None);
    }
}
