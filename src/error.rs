//! Error types for the boundary operations
//!
//! Tree navigation and mutation never produce these: they return `Option`
//! or `bool`. Errors come from I/O, strict output decoding, failed loads
//! turned into results, and XPath compile/evaluation at the API edge.

use thiserror::Error;

use crate::core::encoding::Encoding;
use crate::dom::result::ParseStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{status} at offset {offset}")]
    Parse { status: ParseStatus, offset: usize },

    #[error("Invalid {encoding:?} data at byte {offset}")]
    Decode { encoding: Encoding, offset: usize },

    #[error("XPath syntax error at offset {offset}: {message}")]
    XPathSyntax { message: String, offset: usize },

    #[error("XPath evaluation error: {0}")]
    XPathError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
