//! RustyDOM - Mutable XML DOM with XPath 1.0
//!
//! Layers:
//! - core: encodings, entity decoding, byte scanning, option flags
//! - dom: arena-backed tree, in-place parser, navigation and mutation
//! - writer: serialization to any byte sink in any supported encoding
//! - xpath: query compiler, evaluator, and per-thread query cache
//!
//! ```
//! use rustydom::{Document, FormatOptions, ParseOptions};
//!
//! let mut doc = Document::new();
//! let result = doc.load_string("<root><item id='1'/></root>", ParseOptions::DEFAULT);
//! assert!(result.is_ok());
//!
//! let item = doc.select_node(doc.root(), "//item[@id='1']", None).unwrap();
//! assert!(!item.is_null());
//!
//! let xml = doc.save_string("", FormatOptions::RAW | FormatOptions::NO_DECLARATION);
//! assert_eq!(xml, "<root><item id=\"1\"/></root>");
//! ```

#[macro_use]
mod tracing_macros;

pub mod core;
pub mod dom;
pub mod error;
pub mod writer;
pub mod xpath;

pub use crate::core::encoding::Encoding;
pub use crate::core::options::{FormatOptions, ParseOptions};
pub use dom::{AttrId, Document, NodeId, NodeKind, ParseResult, ParseStatus};
pub use error::{Error, Result};
pub use writer::{IoSink, StringSink, XmlWriter};
pub use xpath::{
    clear_query_cache, NodeSetOrder, QueryCache, XPathNode, XPathNodeSet, XPathParseResult,
    XPathQuery, XPathType, XPathValue, XPathVariable, XPathVariableSet,
};
