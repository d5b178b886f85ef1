//! Typed access to attribute values and node text
//!
//! Reads are lenient: an empty or missing value gives the caller's default,
//! numbers parse from their longest valid prefix and integers clamp to the
//! target type. Writes format numbers the way C's `%g` does, so values
//! round-trip through other XML tools unchanged.

use super::document::Document;
use super::node::{AttrId, NodeId, NodeKind};
use crate::core::numbers::{
    format_general, parse_bool, parse_double, ParseInteger, DOUBLE_PRECISION, FLOAT_PRECISION,
};

/// Values stored as XML text
pub trait TextValue: Sized {
    /// Read from text; callers handle the empty case
    fn parse_text(text: &str) -> Self;
    /// Canonical text form
    fn format_text(&self) -> String;
}

macro_rules! integer_text_value {
    ($($ty:ty),*) => {
        $(
            impl TextValue for $ty {
                fn parse_text(text: &str) -> Self {
                    <$ty>::parse_clamped(text)
                }

                fn format_text(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

integer_text_value!(i32, u32, i64, u64);

impl TextValue for f64 {
    fn parse_text(text: &str) -> Self {
        parse_double(text)
    }

    fn format_text(&self) -> String {
        format_general(*self, DOUBLE_PRECISION)
    }
}

impl TextValue for f32 {
    fn parse_text(text: &str) -> Self {
        parse_double(text) as f32
    }

    fn format_text(&self) -> String {
        format_general(*self as f64, FLOAT_PRECISION)
    }
}

impl TextValue for bool {
    fn parse_text(text: &str) -> Self {
        parse_bool(text)
    }

    fn format_text(&self) -> String {
        if *self { "true" } else { "false" }.to_string()
    }
}

#[inline]
fn read_or<T: TextValue>(text: Option<&str>, default: T) -> T {
    match text {
        Some(t) if !t.is_empty() => T::parse_text(t),
        _ => default,
    }
}

impl Document {
    /// Attribute value converted to `T`, or `default` when empty or missing
    pub fn attr_as<T: TextValue>(&self, attr: AttrId, default: T) -> T {
        let text = self.contains_attr(attr).then(|| self.attr_value(attr));
        read_or(text, default)
    }

    /// Attribute value, or `default` when empty or missing
    pub fn attr_as_string<'d>(&'d self, attr: AttrId, default: &'d str) -> &'d str {
        match self.attr_value(attr) {
            "" => default,
            value => value,
        }
    }

    /// Store `value` in its canonical text form
    pub fn set_attr_value_as<T: TextValue>(&mut self, attr: AttrId, value: T) -> bool {
        self.set_attr_value(attr, &value.format_text())
    }

    /// Store a double with `precision` significant digits
    pub fn set_attr_value_precision(&mut self, attr: AttrId, value: f64, precision: usize) -> bool {
        self.set_attr_value(attr, &format_general(value, precision))
    }

    /// Text view of a node: the node itself when it is PCDATA/CDATA,
    /// otherwise its first PCDATA/CDATA child
    pub fn text(&self, node: NodeId) -> TextRef<'_> {
        TextRef {
            doc: self,
            data: self.text_data(node),
        }
    }

    /// Writable text view; `set` creates the PCDATA child on demand
    pub fn text_mut(&mut self, node: NodeId) -> TextMut<'_> {
        TextMut { doc: self, node }
    }

    fn text_data(&self, node: NodeId) -> Option<NodeId> {
        let record = self.node(node)?;
        if record.kind.is_text() {
            return Some(node);
        }
        // Element text embedded by EMBED_PCDATA
        if record.kind == NodeKind::Element && !record.value.is_null() {
            return Some(node);
        }
        self.children(node).find(|&c| self.kind(c).is_text())
    }
}

macro_rules! typed_getters {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&self, default: $ty) -> $ty {
                self.as_value(default)
            }
        )*
    };
}

/// Read-only text view of a node
#[derive(Clone, Copy)]
pub struct TextRef<'d> {
    doc: &'d Document,
    data: Option<NodeId>,
}

impl<'d> TextRef<'d> {
    /// Node holding the text, if any
    pub fn data(&self) -> Option<NodeId> {
        self.data
    }

    /// Check for missing text
    pub fn is_empty(&self) -> bool {
        self.data.is_none()
    }

    /// Text content, `""` when missing
    pub fn get(&self) -> &'d str {
        self.data.map_or("", |d| self.doc.value(d))
    }

    /// Text content, or `default` when empty or missing
    pub fn as_string(&self, default: &'d str) -> &'d str {
        match self.get() {
            "" => default,
            text => text,
        }
    }

    /// Text converted to `T`, or `default` when empty or missing
    pub fn as_value<T: TextValue>(&self, default: T) -> T {
        read_or(self.data.map(|d| self.doc.value(d)), default)
    }

    typed_getters!(
        as_int: i32,
        as_uint: u32,
        as_llong: i64,
        as_ullong: u64,
        as_double: f64,
        as_float: f32,
        as_bool: bool,
    );
}

/// Writable text view of a node
pub struct TextMut<'d> {
    doc: &'d mut Document,
    node: NodeId,
}

impl TextMut<'_> {
    /// Reborrow as a read-only view
    pub fn view(&self) -> TextRef<'_> {
        self.doc.text(self.node)
    }

    pub fn get(&self) -> &str {
        let data = self.doc.text_data(self.node);
        data.map_or("", |d| self.doc.value(d))
    }

    /// Node holding the text, creating a PCDATA child when there is none
    fn data_new(&mut self) -> Option<NodeId> {
        match self.doc.text_data(self.node) {
            Some(data) => Some(data),
            None => self.doc.append_child(self.node, NodeKind::Pcdata),
        }
    }

    /// Replace the text
    pub fn set(&mut self, text: &str) -> bool {
        let Some(data) = self.data_new() else {
            return false;
        };
        if self.doc.kind(data) == NodeKind::Element {
            // Embedded element text is the element's own value
            let Some(slot) = self.doc.strings.owned(text) else {
                return false;
            };
            if let Some(n) = self.doc.node_mut(data) {
                let old = std::mem::replace(&mut n.value, slot);
                self.doc.strings.release(old);
            }
            return true;
        }
        self.doc.set_value(data, text)
    }

    /// Replace the text with `value` in canonical form
    pub fn set_value<T: TextValue>(&mut self, value: T) -> bool {
        self.set(&value.format_text())
    }

    /// Replace the text with a double written with `precision` significant digits
    pub fn set_precision(&mut self, value: f64, precision: usize) -> bool {
        self.set(&format_general(value, precision))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ParseOptions;

    fn doc_with_attr(value: &str) -> (Document, AttrId) {
        let mut doc = Document::new();
        let node = doc.append_element(doc.root(), "node").unwrap();
        let attr = doc.append_attribute(node, "attr").unwrap();
        assert!(doc.set_attr_value(attr, value));
        (doc, attr)
    }

    #[test]
    fn test_attr_defaults() {
        let (doc, attr) = doc_with_attr("");
        assert_eq!(doc.attr_as(attr, 7i32), 7);
        assert_eq!(doc.attr_as_string(attr, "dflt"), "dflt");
        assert!(doc.attr_as(attr, true));

        let (doc, attr) = doc_with_attr("abc");
        assert_eq!(doc.attr_as(attr, 7i32), 0);
        assert!(!doc.attr_as(attr, true));
    }

    #[test]
    fn test_attr_double_text() {
        let (mut doc, attr) = doc_with_attr("");
        assert!(doc.set_attr_value_as(attr, 0.25f64));
        assert_eq!(doc.attr_value(attr), "0.25");

        assert!(doc.set_attr_value_as(attr, f64::MAX));
        assert_eq!(doc.attr_as(attr, 0.0f64), f64::MAX);

        assert!(doc.set_attr_value_as(attr, 0.1f32));
        assert_eq!(doc.attr_value(attr), "0.100000001");
        assert!(doc.set_attr_value_precision(attr, 0.1, 3));
        assert_eq!(doc.attr_value(attr), "0.1");
    }

    #[test]
    fn test_attr_integer_limits() {
        let (mut doc, attr) = doc_with_attr("");
        for v in [i32::MIN, i32::MAX] {
            doc.set_attr_value_as(attr, v);
            assert_eq!(doc.attr_as(attr, 0i32), v);
        }
        for v in [u32::MIN, u32::MAX] {
            doc.set_attr_value_as(attr, v);
            assert_eq!(doc.attr_as(attr, 1u32), v);
        }
        for v in [i64::MIN, i64::MAX] {
            doc.set_attr_value_as(attr, v);
            assert_eq!(doc.attr_as(attr, 0i64), v);
        }
        for v in [u64::MIN, u64::MAX] {
            doc.set_attr_value_as(attr, v);
            assert_eq!(doc.attr_as(attr, 1u64), v);
        }
        doc.set_attr_value_as(attr, true);
        assert_eq!(doc.attr_value(attr), "true");
    }

    #[test]
    fn test_text_view() {
        let mut doc = Document::new();
        doc.load_string("<a><!--c-->12<b/></a>", ParseOptions::FULL);
        let a = doc.document_element().unwrap();
        let text = doc.text(a);
        assert_eq!(text.get(), "12");
        assert_eq!(text.as_int(0), 12);
        assert_eq!(text.as_double(0.0), 12.0);
        assert!(doc.text(doc.child(a, "b").unwrap()).is_empty());
    }

    #[test]
    fn test_text_set_creates_child() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.root(), "node").unwrap();
        assert!(doc.text_mut(node).set("hello"));
        assert_eq!(doc.kind(doc.first_child(node).unwrap()), NodeKind::Pcdata);
        assert_eq!(doc.text(node).get(), "hello");

        assert!(doc.text_mut(node).set_value(-5i64));
        assert_eq!(doc.text(node).as_llong(0), -5);
        assert_eq!(doc.children(node).count(), 1);

        assert!(doc.text_mut(node).set_precision(1.0 / 3.0, 4));
        assert_eq!(doc.text_mut(node).get(), "0.3333");
    }

    #[test]
    fn test_text_embedded() {
        let mut doc = Document::new();
        doc.load_string(
            "<a>inline</a>",
            ParseOptions::DEFAULT | ParseOptions::EMBED_PCDATA,
        );
        let a = doc.document_element().unwrap();
        assert_eq!(doc.text(a).get(), "inline");
        assert!(doc.text_mut(a).set("changed"));
        assert_eq!(doc.value(a), "changed");
        assert!(doc.first_child(a).is_none());
    }
}
