//! Output sinks
//!
//! The serializer hands encoded byte chunks to an `XmlWriter`. Chunks always
//! end on a character boundary of the output encoding.

use std::io::{self, Write};

use crate::core::encoding::{decode_strict, Encoding};
use crate::error::{Error, Result};

/// Consumer of encoded output
pub trait XmlWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<()>;
}

impl<W: XmlWriter + ?Sized> XmlWriter for &mut W {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }
}

impl XmlWriter for Vec<u8> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.extend_from_slice(data);
        Ok(())
    }
}

/// Collects UTF-8 output
///
/// Bytes that are not UTF-8 fail with `InvalidData` and are not appended;
/// other encodings go through `StringSink`.
impl XmlWriter for String {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        let text = std::str::from_utf8(data)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;
        self.push_str(text);
        Ok(())
    }
}

/// Adapter for any `std::io::Write`
pub struct IoSink<W: Write> {
    inner: W,
}

impl<W: Write> IoSink<W> {
    pub fn new(inner: W) -> Self {
        IoSink { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flush and return the wrapped writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> XmlWriter for IoSink<W> {
    #[inline]
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(data)
    }
}

/// Byte collector that decodes to a `String` on demand
///
/// The decode is strict: bytes that are not valid in `encoding` fail with
/// the offset of the first bad sequence instead of being replaced.
#[derive(Debug, Default)]
pub struct StringSink {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl StringSink {
    pub fn new(encoding: Encoding) -> Self {
        StringSink {
            bytes: Vec::new(),
            encoding,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw bytes received so far
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decode everything received with the sink's encoding
    pub fn into_string(self) -> Result<String> {
        decode_strict(&self.bytes, self.encoding).map_err(|offset| Error::Decode {
            encoding: self.encoding,
            offset,
        })
    }
}

impl XmlWriter for StringSink {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.bytes.extend_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_and_ref_sinks() {
        let mut out = Vec::new();
        {
            let mut sink: &mut Vec<u8> = &mut out;
            XmlWriter::write(sink, b"ab").unwrap();
            XmlWriter::write(&mut sink, b"c").unwrap();
        }
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_string_rejects_non_utf8() {
        let mut out = String::new();
        out.write("<a>\u{e9}".as_bytes()).unwrap();
        let err = out.write(b"\xe9</a>").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(out, "<a>\u{e9}");
    }

    #[test]
    fn test_io_sink() {
        let mut sink = IoSink::new(io::Cursor::new(Vec::new()));
        sink.write(b"<a/>").unwrap();
        assert_eq!(sink.into_inner().unwrap().into_inner(), b"<a/>");
    }

    #[test]
    fn test_string_sink_strict_decode() {
        let mut sink = StringSink::new(Encoding::Utf16Be);
        sink.write(&[0x00, b'<', 0x00, b'a']).unwrap();
        assert_eq!(sink.len(), 4);
        assert_eq!(sink.into_string().unwrap(), "<a");

        let mut sink = StringSink::new(Encoding::Utf8);
        sink.write(b"ok\xFF").unwrap();
        match sink.into_string() {
            Err(Error::Decode { offset, .. }) => assert_eq!(offset, 2),
            other => panic!("expected decode error, got {:?}", other),
        }
    }
}
