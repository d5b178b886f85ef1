//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Conversions follow the XPath 1.0 rules; node-sets convert through the
//! string-value of their first node in document order.

use super::nodeset::{XPathNode, XPathNodeSet};
use crate::dom::{Document, NodeKind};

/// Static type of an expression or variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XPathType {
    /// Failed compilation or an unset variable slot
    #[default]
    None,
    NodeSet,
    Number,
    String,
    Boolean,
}

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// A set of nodes with its order tag
    NodeSet(XPathNodeSet),
    /// Boolean value
    Boolean(bool),
    /// Floating-point number
    Number(f64),
    /// String value
    String(String),
}

impl XPathValue {
    /// Create an empty node set
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(XPathNodeSet::new())
    }

    pub fn value_type(&self) -> XPathType {
        match self {
            XPathValue::NodeSet(_) => XPathType::NodeSet,
            XPathValue::Boolean(_) => XPathType::Boolean,
            XPathValue::Number(_) => XPathType::Number,
            XPathValue::String(_) => XPathType::String,
        }
    }

    /// Convert to boolean (XPath boolean() function semantics)
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// Convert to number (XPath number() function semantics)
    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            XPathValue::NodeSet(_) => parse_number(&self.to_string_value(doc)),
            XPathValue::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            XPathValue::Number(n) => *n,
            XPathValue::String(s) => parse_number(s),
        }
    }

    /// Convert to string (XPath string() function semantics)
    pub fn to_string_value(&self, doc: &Document) -> String {
        match self {
            XPathValue::NodeSet(nodes) => string_value(doc, nodes.first(doc)),
            XPathValue::Boolean(b) => {
                if *b {
                    "true".to_string()
                } else {
                    "false".to_string()
                }
            }
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    /// Take the node-set out of the value; other types give an empty set
    pub fn into_node_set(self) -> XPathNodeSet {
        match self {
            XPathValue::NodeSet(nodes) => nodes,
            _ => XPathNodeSet::new(),
        }
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

impl From<XPathNodeSet> for XPathValue {
    fn from(nodes: XPathNodeSet) -> Self {
        XPathValue::NodeSet(nodes)
    }
}

/// XPath whitespace: space, tab, CR, LF
#[inline]
pub(crate) fn is_xpath_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// String-value of a node
///
/// Elements and the document concatenate their own embedded text and the
/// PCDATA/CDATA of every descendant.
pub(crate) fn string_value(doc: &Document, node: XPathNode) -> String {
    match node {
        XPathNode::Null => String::new(),
        XPathNode::Attribute { attr, .. } => doc.attr_value(attr).to_string(),
        XPathNode::Node(id) => match doc.kind(id) {
            NodeKind::Pcdata | NodeKind::Cdata | NodeKind::Comment | NodeKind::Pi => {
                doc.value(id).to_string()
            }
            NodeKind::Element | NodeKind::Document => {
                let mut result = doc.value(id).to_string();
                for d in doc.descendants(id) {
                    if doc.kind(d).is_text() {
                        result.push_str(doc.value(d));
                    }
                }
                result
            }
            _ => String::new(),
        },
    }
}

/// String to number conversion
///
/// Accepts optional surrounding whitespace, an optional minus sign and a
/// decimal number with at least one digit. Anything else is NaN.
pub fn parse_number(s: &str) -> f64 {
    let trimmed = s.trim_matches(is_xpath_space);
    let body = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let bytes = body.as_bytes();

    let mut i = 0;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i;
    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
            frac_digits += 1;
        }
    }
    if i != bytes.len() || int_digits + frac_digits == 0 {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Number to string conversion
///
/// Integers print without a fraction, other values in plain decimal with
/// up to 16 significant digits and never in exponent form.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }

    // d.ddddddddddddddde[-]x
    let scientific = format!("{:.15e}", n.abs());
    let (mantissa, exp) = match scientific.split_once('e') {
        Some(parts) => parts,
        None => return scientific,
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_end_matches('0');
    // value = 0.<digits> * 10^exponent
    let mut exponent = exp.parse::<i32>().unwrap_or(0) + 1;

    let mut out = String::with_capacity(digits.len() + 8);
    if n < 0.0 {
        out.push('-');
    }

    let mut rest = digits.chars();
    if exponent <= 0 {
        out.push('0');
    } else {
        while exponent > 0 {
            out.push(rest.next().unwrap_or('0'));
            exponent -= 1;
        }
    }

    let fraction = rest.as_str();
    if !fraction.is_empty() {
        out.push('.');
        while exponent < 0 {
            out.push('0');
            exponent += 1;
        }
        out.push_str(fraction);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::ParseOptions;

    #[test]
    fn test_to_boolean() {
        assert!(XPathValue::Boolean(true).to_boolean());
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::Number(-2.0).to_boolean());
        assert!(!XPathValue::String(String::new()).to_boolean());
        assert!(XPathValue::from("false").to_boolean());
        assert!(!XPathValue::empty_nodeset().to_boolean());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), 42.0);
        assert_eq!(parse_number("  -3.5\n"), -3.5);
        assert_eq!(parse_number(".5"), 0.5);
        assert_eq!(parse_number("7."), 7.0);
        assert!(parse_number("").is_nan());
        assert!(parse_number("-").is_nan());
        assert!(parse_number(".").is_nan());
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("+1").is_nan());
        assert!(parse_number("12 3").is_nan());
        assert!(parse_number("Infinity").is_nan());
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.0), "1");
        assert_eq!(format_number(-42.0), "-42");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(0.001), "0.001");
        assert_eq!(format_number(1e20), "100000000000000000000");
        assert_eq!(format_number(123.456), "123.456");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_node_set_conversions() {
        let mut doc = Document::new();
        doc.load_string("<r><a>1<b>2</b></a><c>x</c></r>", ParseOptions::DEFAULT);
        let r = doc.document_element().unwrap();
        let a = doc.first_child(r).unwrap();
        let c = doc.next_sibling(a).unwrap();

        let set = XPathNodeSet::from_nodes(
            vec![XPathNode::Node(c), XPathNode::Node(a)],
            Default::default(),
        );
        let value = XPathValue::NodeSet(set);
        assert_eq!(value.to_string_value(&doc), "12");
        assert_eq!(value.to_number(&doc), 12.0);
        assert_eq!(string_value(&doc, XPathNode::Node(doc.root())), "12x");
    }
}
