//! Writer Module - Tree to bytes
//!
//! Serialization walks the tree once, gathering UTF-8 text in a buffer that
//! is transcoded chunk by chunk into the requested output encoding and
//! handed to an `XmlWriter` sink.

pub mod buffered;
pub mod output;
pub mod sink;

pub use buffered::BufferedWriter;
pub use sink::{IoSink, StringSink, XmlWriter};
