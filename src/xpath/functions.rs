//! XPath 1.0 Core Function Library
//!
//! Names and arities are resolved while the query is compiled; evaluation
//! dispatches on the resolved `Function`.

use super::eval::{Context, Evaluator};
use super::nodeset::{XPathNode, XPathNodeSet};
use super::parser::Expr;
use super::value::{is_xpath_space, parse_number, string_value, XPathType, XPathValue};
use crate::dom::{Document, NodeId, NodeKind};

/// Core library functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    // Node set
    Last,
    Position,
    Count,
    Id,
    LocalName,
    NamespaceUri,
    Name,
    // String
    String,
    Concat,
    StartsWith,
    Contains,
    SubstringBefore,
    SubstringAfter,
    Substring,
    StringLength,
    NormalizeSpace,
    Translate,
    // Boolean
    Boolean,
    Not,
    True,
    False,
    Lang,
    // Number
    Number,
    Sum,
    Floor,
    Ceiling,
    Round,
}

impl Function {
    /// Look up a function by name and argument count
    pub fn resolve(name: &str, argc: usize) -> Option<Function> {
        let func = match (name, argc) {
            ("last", 0) => Function::Last,
            ("position", 0) => Function::Position,
            ("count", 1) => Function::Count,
            ("id", 1) => Function::Id,
            ("local-name", 0 | 1) => Function::LocalName,
            ("namespace-uri", 0 | 1) => Function::NamespaceUri,
            ("name", 0 | 1) => Function::Name,
            ("string", 0 | 1) => Function::String,
            ("concat", n) if n >= 2 => Function::Concat,
            ("starts-with", 2) => Function::StartsWith,
            ("contains", 2) => Function::Contains,
            ("substring-before", 2) => Function::SubstringBefore,
            ("substring-after", 2) => Function::SubstringAfter,
            ("substring", 2 | 3) => Function::Substring,
            ("string-length", 0 | 1) => Function::StringLength,
            ("normalize-space", 0 | 1) => Function::NormalizeSpace,
            ("translate", 3) => Function::Translate,
            ("boolean", 1) => Function::Boolean,
            ("not", 1) => Function::Not,
            ("true", 0) => Function::True,
            ("false", 0) => Function::False,
            ("lang", 1) => Function::Lang,
            ("number", 0 | 1) => Function::Number,
            ("sum", 1) => Function::Sum,
            ("floor", 1) => Function::Floor,
            ("ceiling", 1) => Function::Ceiling,
            ("round", 1) => Function::Round,
            _ => return None,
        };
        Some(func)
    }

    pub fn return_type(self) -> XPathType {
        match self {
            Function::Last
            | Function::Position
            | Function::Count
            | Function::StringLength
            | Function::Number
            | Function::Sum
            | Function::Floor
            | Function::Ceiling
            | Function::Round => XPathType::Number,
            Function::Id => XPathType::NodeSet,
            Function::Boolean
            | Function::Not
            | Function::True
            | Function::False
            | Function::Lang
            | Function::StartsWith
            | Function::Contains => XPathType::Boolean,
            _ => XPathType::String,
        }
    }

    /// Whether the arguments must be node-sets
    pub fn takes_node_set(self, argc: usize) -> bool {
        match self {
            Function::Count | Function::Sum => true,
            Function::LocalName | Function::NamespaceUri | Function::Name => argc == 1,
            _ => false,
        }
    }

    /// Whether constant arguments give a constant result
    pub(crate) fn is_foldable(self, argc: usize) -> bool {
        match self {
            Function::Last
            | Function::Position
            | Function::Id
            | Function::Lang
            | Function::LocalName
            | Function::NamespaceUri
            | Function::Name => false,
            // Without arguments these read the context node
            Function::String
            | Function::StringLength
            | Function::NormalizeSpace
            | Function::Number => argc > 0,
            _ => true,
        }
    }
}

/// Evaluate a function call
pub(crate) fn call(ev: &Evaluator<'_>, func: Function, args: &[Expr], ctx: &Context) -> XPathValue {
    let doc = ev.doc();
    let string_arg = |i: usize| ev.eval_string(&args[i], ctx);
    let number_arg = |i: usize| ev.eval_number(&args[i], ctx);
    // Optional node-set argument, defaulting to the context node
    let node_arg = || match args.first() {
        Some(arg) => ev.eval_node_set(arg, ctx).first(doc),
        None => ctx.node,
    };
    // Optional string argument, defaulting to the context string-value
    let text_arg = || match args.first() {
        Some(arg) => ev.eval_string(arg, ctx),
        None => string_value(doc, ctx.node),
    };

    match func {
        Function::Last => XPathValue::Number(ctx.size as f64),
        Function::Position => XPathValue::Number(ctx.position as f64),
        Function::Count => XPathValue::Number(ev.eval_node_set(&args[0], ctx).len() as f64),
        // No DTD-declared IDs are tracked
        Function::Id => XPathValue::NodeSet(XPathNodeSet::new()),
        Function::LocalName => XPathValue::String(local_name(doc, node_arg()).to_string()),
        Function::NamespaceUri => XPathValue::String(namespace_uri(doc, node_arg()).to_string()),
        Function::Name => XPathValue::String(qualified_name(doc, node_arg()).to_string()),

        Function::String => XPathValue::String(text_arg()),
        Function::Concat => {
            let mut out = String::new();
            for arg in args {
                out.push_str(&ev.eval_string(arg, ctx));
            }
            XPathValue::String(out)
        }
        Function::StartsWith => XPathValue::Boolean(string_arg(0).starts_with(&string_arg(1))),
        Function::Contains => XPathValue::Boolean(string_arg(0).contains(&string_arg(1))),
        Function::SubstringBefore => {
            let s = string_arg(0);
            let pat = string_arg(1);
            let out = s.find(&pat).map_or("", |pos| &s[..pos]);
            XPathValue::String(out.to_string())
        }
        Function::SubstringAfter => {
            let s = string_arg(0);
            let pat = string_arg(1);
            let out = s.find(&pat).map_or("", |pos| &s[pos + pat.len()..]);
            XPathValue::String(out.to_string())
        }
        Function::Substring => {
            let s = string_arg(0);
            let start = number_arg(1);
            let len = args.get(2).map(|arg| ev.eval_number(arg, ctx));
            XPathValue::String(substring(&s, start, len))
        }
        Function::StringLength => XPathValue::Number(text_arg().chars().count() as f64),
        Function::NormalizeSpace => XPathValue::String(normalize_space(&text_arg())),
        Function::Translate => {
            XPathValue::String(translate(&string_arg(0), &string_arg(1), &string_arg(2)))
        }

        Function::Boolean => XPathValue::Boolean(ev.eval_boolean(&args[0], ctx)),
        Function::Not => XPathValue::Boolean(!ev.eval_boolean(&args[0], ctx)),
        Function::True => XPathValue::Boolean(true),
        Function::False => XPathValue::Boolean(false),
        Function::Lang => XPathValue::Boolean(lang(doc, ctx.node, &string_arg(0))),

        Function::Number => {
            let n = match args.first() {
                Some(arg) => ev.eval_number(arg, ctx),
                None => parse_number(&string_value(doc, ctx.node)),
            };
            XPathValue::Number(n)
        }
        Function::Sum => {
            let set = ev.eval_node_set(&args[0], ctx);
            let total = set
                .iter()
                .map(|n| parse_number(&string_value(doc, *n)))
                .sum();
            XPathValue::Number(total)
        }
        Function::Floor => XPathValue::Number(number_arg(0).floor()),
        Function::Ceiling => XPathValue::Number(number_arg(0).ceil()),
        Function::Round => XPathValue::Number(round(number_arg(0))),
    }
}

/// XPath round(): halves go up, and -0.5..=-0 rounds to negative zero
pub(crate) fn round(n: f64) -> f64 {
    if (-0.5..=0.0).contains(&n) {
        n.ceil()
    } else {
        (n + 0.5).floor()
    }
}

#[inline]
fn round_nearest(n: f64) -> f64 {
    (n + 0.5).floor()
}

/// substring() with 1-based, rounded character positions
fn substring(s: &str, start: f64, len: Option<f64>) -> String {
    let length = s.chars().count() as f64;
    let first = round_nearest(start);
    let last = match len {
        Some(len) => first + round_nearest(len),
        None => length + 1.0,
    };

    if first.is_nan() || last.is_nan() || first >= length + 1.0 || first >= last || last < 1.0 {
        return String::new();
    }

    let from = if first < 1.0 { 1 } else { first as usize };
    let to = if last >= length + 1.0 {
        length as usize + 1
    } else {
        last as usize
    };
    s.chars().skip(from - 1).take(to - from).collect()
}

fn normalize_space(s: &str) -> String {
    s.split(is_xpath_space)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map characters of `from` to the same position in `to`; characters past
/// the end of `to` are deleted, and the first occurrence in `from` wins
fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

fn lang(doc: &Document, node: XPathNode, wanted: &str) -> bool {
    let XPathNode::Node(start) = node else {
        return false;
    };
    let mut current = Some(start);
    while let Some(n) = current {
        if let Some(value) = doc.attribute_value(n, "xml:lang") {
            let value = value.as_bytes();
            let wanted = wanted.as_bytes();
            if value.len() < wanted.len() || !value[..wanted.len()].eq_ignore_ascii_case(wanted) {
                return false;
            }
            return matches!(value.get(wanted.len()), None | Some(b'-'));
        }
        current = doc.parent(n);
    }
    false
}

fn qualified_name(doc: &Document, node: XPathNode) -> &str {
    match node {
        XPathNode::Null => "",
        XPathNode::Node(id) => doc.name(id),
        XPathNode::Attribute { attr, .. } => doc.attr_name(attr),
    }
}

fn local_name(doc: &Document, node: XPathNode) -> &str {
    let name = qualified_name(doc, node);
    name.split_once(':').map_or(name, |(_, local)| local)
}

/// Resolve a prefix against `xmlns` declarations from `start` upwards
fn lookup_namespace<'d>(doc: &'d Document, start: NodeId, prefix: Option<&str>) -> &'d str {
    let mut current = Some(start);
    while let Some(n) = current {
        let found = doc.attributes(n).find(|&a| {
            let name = doc.attr_name(a);
            match prefix {
                Some(p) => name.strip_prefix("xmlns:") == Some(p),
                None => name == "xmlns",
            }
        });
        if let Some(a) = found {
            return doc.attr_value(a);
        }
        current = doc.parent(n);
    }
    ""
}

fn namespace_uri(doc: &Document, node: XPathNode) -> &str {
    match node {
        XPathNode::Null => "",
        XPathNode::Node(id) => {
            if doc.kind(id) != NodeKind::Element {
                return "";
            }
            let prefix = doc.name(id).split_once(':').map(|(p, _)| p);
            lookup_namespace(doc, id, prefix)
        }
        // The default namespace does not apply to attributes
        XPathNode::Attribute { attr, parent } => match doc.attr_name(attr).split_once(':') {
            Some((prefix, _)) => lookup_namespace(doc, parent, Some(prefix)),
            None => "",
        },
    }
}
