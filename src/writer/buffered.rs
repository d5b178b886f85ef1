//! Encoding output buffer
//!
//! Text is gathered as UTF-8 and converted to the target encoding one chunk
//! at a time. The first sink error is kept and later writes are dropped, so
//! the serializer never has to check results mid-tree.

use std::io;

use super::sink::XmlWriter;
use crate::core::encoding::{encode_into, Encoding};

/// Flush threshold in UTF-8 bytes
const DEFAULT_BUFFER_SIZE: usize = 8192;

pub struct BufferedWriter<'w, W: XmlWriter + ?Sized> {
    sink: &'w mut W,
    encoding: Encoding,
    text: String,
    scratch: Vec<u8>,
    capacity: usize,
    error: Option<io::Error>,
}

impl<'w, W: XmlWriter + ?Sized> BufferedWriter<'w, W> {
    /// Buffer for `encoding`; `Auto` writes UTF-8
    pub fn new(sink: &'w mut W, encoding: Encoding) -> Self {
        Self::with_capacity(sink, encoding, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(sink: &'w mut W, encoding: Encoding, capacity: usize) -> Self {
        BufferedWriter {
            sink,
            encoding: encoding.resolve_output(),
            text: String::with_capacity(capacity),
            scratch: Vec::new(),
            capacity: capacity.max(1),
            error: None,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.text.push_str(s);
        if self.text.len() >= self.capacity {
            self.drain();
        }
    }

    #[inline]
    pub fn write_char(&mut self, c: char) {
        self.text.push(c);
        if self.text.len() >= self.capacity {
            self.drain();
        }
    }

    /// Bytes passed through unconverted, e.g. a BOM
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.drain();
        self.emit(bytes);
    }

    /// Write out everything buffered and report the first sink failure
    pub fn flush(mut self) -> io::Result<()> {
        self.drain();
        match self.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn drain(&mut self) {
        if self.text.is_empty() {
            return;
        }
        self.scratch.clear();
        encode_into(&self.text, self.encoding, &mut self.scratch);
        self.text.clear();
        let chunk = std::mem::take(&mut self.scratch);
        self.emit(&chunk);
        self.scratch = chunk;
    }

    fn emit(&mut self, bytes: &[u8]) {
        if self.error.is_some() || bytes.is_empty() {
            return;
        }
        if let Err(err) = self.sink.write(bytes) {
            self.error = Some(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Chunks(Vec<Vec<u8>>);

    impl XmlWriter for Chunks {
        fn write(&mut self, data: &[u8]) -> io::Result<()> {
            self.0.push(data.to_vec());
            Ok(())
        }
    }

    struct Failing;

    impl XmlWriter for Failing {
        fn write(&mut self, _data: &[u8]) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }
    }

    #[test]
    fn test_chunks_follow_capacity() {
        let mut sink = Chunks(Vec::new());
        let mut w = BufferedWriter::with_capacity(&mut sink, Encoding::Utf8, 4);
        w.write_str("ab");
        w.write_str("cdef");
        w.write_char('g');
        w.flush().unwrap();
        assert_eq!(sink.0, vec![b"abcdef".to_vec(), b"g".to_vec()]);
    }

    #[test]
    fn test_encodes_output() {
        let mut out = Vec::new();
        let mut w = BufferedWriter::new(&mut out, Encoding::Utf16Le);
        w.write_str("a\u{e9}");
        w.flush().unwrap();
        assert_eq!(out, [b'a', 0, 0xE9, 0]);

        let mut out = Vec::new();
        let mut w = BufferedWriter::new(&mut out, Encoding::Latin1);
        w.write_str("\u{e9}\u{20ac}");
        w.flush().unwrap();
        assert_eq!(out, [0xE9, b'?']);
    }

    #[test]
    fn test_first_error_reported() {
        let mut sink = Failing;
        let mut w = BufferedWriter::with_capacity(&mut sink, Encoding::Utf8, 1);
        w.write_str("abc");
        w.write_str("def");
        let err = w.flush().unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
