//! Parse status and result

use std::fmt;

use crate::core::encoding::Encoding;

/// Outcome of a load or parse operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseStatus {
    Ok,
    FileNotFound,
    IoError,
    OutOfMemory,
    InternalError,
    UnrecognizedTag,
    BadPi,
    BadComment,
    BadCdata,
    BadDoctype,
    BadPcdata,
    BadStartElement,
    BadAttribute,
    BadEndElement,
    EndElementMismatch,
    AppendInvalidRoot,
    NoDocumentElement,
}

impl ParseStatus {
    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            ParseStatus::Ok => "No error",
            ParseStatus::FileNotFound => "File was not found",
            ParseStatus::IoError => "Error reading from file/stream",
            ParseStatus::OutOfMemory => "Could not allocate memory",
            ParseStatus::InternalError => "Internal error occurred",
            ParseStatus::UnrecognizedTag => "Could not determine tag type",
            ParseStatus::BadPi => "Error parsing document declaration/processing instruction",
            ParseStatus::BadComment => "Error parsing comment",
            ParseStatus::BadCdata => "Error parsing CDATA section",
            ParseStatus::BadDoctype => "Error parsing document type declaration",
            ParseStatus::BadPcdata => "Error parsing PCDATA section",
            ParseStatus::BadStartElement => "Error parsing start element tag",
            ParseStatus::BadAttribute => "Error parsing element attribute",
            ParseStatus::BadEndElement => "Error parsing end element tag",
            ParseStatus::EndElementMismatch => "Start-end tags mismatch",
            ParseStatus::AppendInvalidRoot => {
                "Unable to append nodes: root is not an element or document"
            }
            ParseStatus::NoDocumentElement => "No document element found",
        }
    }
}

impl fmt::Display for ParseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Status, failure offset and encoding of a load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct ParseResult {
    pub status: ParseStatus,
    /// Byte offset of the failure in the (transcoded) buffer
    pub offset: usize,
    /// Encoding the input was decoded from
    pub encoding: Encoding,
}

impl ParseResult {
    pub(crate) fn new(status: ParseStatus, offset: usize, encoding: Encoding) -> Self {
        ParseResult {
            status,
            offset,
            encoding,
        }
    }

    /// Check for `ParseStatus::Ok`
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == ParseStatus::Ok
    }

    pub fn description(&self) -> &'static str {
        self.status.description()
    }

    /// Turn a failed result into an error
    pub fn into_result(self) -> crate::Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(crate::Error::Parse {
                status: self.status,
                offset: self.offset,
            })
        }
    }
}

impl Default for ParseResult {
    /// A result nothing has written to yet
    fn default() -> Self {
        ParseResult::new(ParseStatus::InternalError, 0, Encoding::Auto)
    }
}

impl fmt::Display for ParseResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            f.write_str(self.description())
        } else {
            write!(f, "{} at offset {}", self.description(), self.offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_internal_error() {
        let result = ParseResult::default();
        assert!(!result.is_ok());
        assert_eq!(result.status, ParseStatus::InternalError);
        assert_eq!(result.description(), "Internal error occurred");
        assert_eq!(result.offset, 0);
    }

    #[test]
    fn test_into_result() {
        let ok = ParseResult::new(ParseStatus::Ok, 0, Encoding::Utf8);
        assert!(ok.into_result().is_ok());

        let bad = ParseResult::new(ParseStatus::EndElementMismatch, 10, Encoding::Utf8);
        let err = bad.into_result().unwrap_err();
        assert_eq!(err.to_string(), "Start-end tags mismatch at offset 10");
        assert_eq!(bad.to_string(), "Start-end tags mismatch at offset 10");
    }
}
