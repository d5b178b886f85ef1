//! Single-pass XML parser building the tree in place
//!
//! The parser walks the document's source buffer once, left to right, and
//! links nodes straight into the arena as it meets them. Names, PI values,
//! the DOCTYPE value and any text that needs no conversion are recorded as
//! borrowed ranges of the buffer; converted text is copied into the string
//! pages.
//!
//! Open elements are tracked on an explicit stack. On a syntax error the
//! parser stops where it is and the nodes built so far stay in the tree;
//! the returned offset points into the buffer.

use std::borrow::Cow;

use super::document::Document;
use super::node::{NodeId, NodeKind};
use super::result::ParseStatus;
use super::strings::{TextSlot, TextStore};
use crate::core::entities::{convert_attribute, convert_pcdata, normalize_eol};
use crate::core::options::ParseOptions;
use crate::core::scanner::{is_name_start_char, is_space, Scanner};

/// Status and byte offset of a failure
type Failure = (ParseStatus, usize);
type Step<T = ()> = Result<T, Failure>;

/// Parse source buffer `buf` of `doc`, appending the nodes under `base`
///
/// Returns the status and the failure offset (0 on success). Offsets at
/// or past the end of input are reported as the last byte.
pub(crate) fn parse(
    doc: &mut Document,
    base: NodeId,
    buf: u32,
    options: ParseOptions,
) -> (ParseStatus, usize) {
    let Some(source) = doc.strings.source(buf) else {
        return (ParseStatus::InternalError, 0);
    };
    let text = source.as_str();
    if text.is_empty() {
        return (ParseStatus::Ok, 0);
    }
    let last = text.len() - 1;
    let before = doc.last_child(base);

    let mut parser = Parser {
        doc,
        base,
        buf,
        options,
        source: text,
        stack: Vec::new(),
    };
    let mut sc = Scanner::new(text);

    if let Err((status, offset)) = parser.run(&mut sc) {
        return (status, offset.min(last));
    }

    let doc = parser.doc;
    let mut added = match before {
        Some(node) => doc.next_sibling(node),
        None => doc.first_child(base),
    };
    if !options.contains(ParseOptions::FRAGMENT) {
        let mut found = false;
        while let Some(node) = added {
            if doc.kind(node) == NodeKind::Element {
                found = true;
                break;
            }
            added = doc.next_sibling(node);
        }
        if !found {
            return (ParseStatus::NoDocumentElement, last);
        }
    }
    (ParseStatus::Ok, 0)
}

struct Parser<'d, 's> {
    doc: &'d mut Document,
    /// Node receiving top-level results
    base: NodeId,
    buf: u32,
    options: ParseOptions,
    source: &'s str,
    /// Open elements, innermost last
    stack: Vec<NodeId>,
}

impl<'s> Parser<'_, 's> {
    #[inline]
    fn opt(&self, flag: ParseOptions) -> bool {
        self.options.contains(flag)
    }

    #[inline]
    fn cursor(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(self.base)
    }

    #[inline]
    fn at_document_level(&self) -> bool {
        self.doc.kind(self.cursor()) == NodeKind::Document
    }

    fn run(&mut self, sc: &mut Scanner<'s>) -> Step {
        while !sc.is_eof() {
            let start = sc.position();
            match sc.find_tag_start() {
                Some(lt) => {
                    if lt > start {
                        self.text(start, lt)?;
                    }
                    sc.set_position(lt + 1);
                    self.markup(sc)?;
                }
                None => {
                    self.text(start, sc.len())?;
                    sc.set_position(sc.len());
                }
            }
        }

        if !self.stack.is_empty() {
            return Err((ParseStatus::EndElementMismatch, sc.len()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Node helpers
    // ------------------------------------------------------------------

    fn push_node(&mut self, kind: NodeKind, at: usize) -> Step<NodeId> {
        let node = self
            .doc
            .alloc_node(kind)
            .ok_or((ParseStatus::OutOfMemory, at))?;
        self.doc.link_last(self.cursor(), node);
        Ok(node)
    }

    /// Slot for converted text: borrowed when the conversion left it untouched
    fn slot(&mut self, text: Cow<'s, str>, at: usize) -> Step<TextSlot> {
        match text {
            Cow::Borrowed(s) => {
                let start = (s.as_ptr() as usize).wrapping_sub(self.source.as_ptr() as usize);
                Ok(TextStore::borrowed(self.buf, start, start + s.len()))
            }
            Cow::Owned(s) => self
                .doc
                .strings
                .owned(&s)
                .ok_or((ParseStatus::OutOfMemory, at)),
        }
    }

    #[inline]
    fn range(&self, start: usize, end: usize) -> TextSlot {
        TextStore::borrowed(self.buf, start, end)
    }

    fn set_name(&mut self, node: NodeId, slot: TextSlot) {
        if let Some(n) = self.doc.node_mut(node) {
            n.name = slot;
        }
    }

    fn set_value(&mut self, node: NodeId, slot: TextSlot) {
        if let Some(n) = self.doc.node_mut(node) {
            n.value = slot;
        }
    }

    // ------------------------------------------------------------------
    // Character data
    // ------------------------------------------------------------------

    fn text(&mut self, start: usize, end: usize) -> Step {
        let raw = &self.source[start..end];
        let cursor = self.cursor();

        if raw.bytes().all(is_space) {
            if !self.options.intersects(ParseOptions::WS_PCDATA | ParseOptions::WS_PCDATA_SINGLE)
                || self.opt(ParseOptions::TRIM_PCDATA)
            {
                return Ok(());
            }
            if self.opt(ParseOptions::WS_PCDATA_SINGLE) {
                let closes = self.source.as_bytes().get(end..end + 2) == Some(&b"</"[..]);
                if !closes || self.doc.first_child(cursor).is_some() {
                    return Ok(());
                }
            }
        }

        // Text between top-level nodes is only kept for fragments
        if self.at_document_level() && !self.opt(ParseOptions::FRAGMENT) {
            return Ok(());
        }

        let converted = convert_pcdata(raw, self.options);

        if self.opt(ParseOptions::EMBED_PCDATA)
            && !self.at_document_level()
            && self
                .doc
                .node(cursor)
                .is_some_and(|n| n.first_child.is_none() && n.value.is_null())
        {
            let slot = self.slot(converted, start)?;
            self.set_value(cursor, slot);
            return Ok(());
        }

        if self.opt(ParseOptions::MERGE_PCDATA) {
            if let Some(prev) = self
                .doc
                .last_child(cursor)
                .filter(|&c| self.doc.kind(c) == NodeKind::Pcdata)
            {
                let mut merged = self.doc.value(prev).to_owned();
                merged.push_str(&converted);
                let slot = self.slot(Cow::Owned(merged), start)?;
                if let Some(old) = self.doc.node(prev).map(|n| n.value) {
                    self.doc.strings.release(old);
                }
                self.set_value(prev, slot);
                return Ok(());
            }
        }

        let slot = self.slot(converted, start)?;
        let node = self.push_node(NodeKind::Pcdata, start)?;
        self.set_value(node, slot);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Markup
    // ------------------------------------------------------------------

    /// Dispatch on the byte after `<`
    fn markup(&mut self, sc: &mut Scanner<'s>) -> Step {
        match sc.peek() {
            Some(b) if is_name_start_char(b) => self.start_tag(sc),
            Some(b'/') => self.end_tag(sc),
            Some(b'?') => self.question(sc),
            Some(b'!') => self.exclamation(sc),
            _ => Err((ParseStatus::UnrecognizedTag, sc.position())),
        }
    }

    fn start_tag(&mut self, sc: &mut Scanner<'s>) -> Step {
        let Some((name_start, name_end)) = sc.read_name() else {
            return Err((ParseStatus::UnrecognizedTag, sc.position()));
        };
        let element = self.push_node(NodeKind::Element, name_start)?;
        let name = self.range(name_start, name_end);
        self.set_name(element, name);
        self.stack.push(element);

        match sc.peek() {
            Some(b'>') => {
                sc.advance(1);
                Ok(())
            }
            Some(b'/') => {
                sc.advance(1);
                if sc.eat(b'>') {
                    self.stack.pop();
                    Ok(())
                } else {
                    Err((ParseStatus::BadStartElement, sc.position()))
                }
            }
            Some(b) if is_space(b) => self.attributes(sc, element, false),
            Some(_) => Err((ParseStatus::BadStartElement, sc.position() + 1)),
            None => Err((ParseStatus::BadStartElement, sc.position())),
        }
    }

    /// Attribute list up to `>`, `/>` or (for declarations) `?>`
    fn attributes(&mut self, sc: &mut Scanner<'s>, owner: NodeId, declaration: bool) -> Step {
        let bad = if declaration {
            ParseStatus::BadPi
        } else {
            ParseStatus::BadStartElement
        };
        loop {
            sc.skip_whitespace();
            match sc.peek() {
                Some(b) if is_name_start_char(b) => self.attribute(sc, owner)?,
                Some(b'/') if !declaration => {
                    sc.advance(1);
                    if sc.eat(b'>') {
                        self.stack.pop();
                        return Ok(());
                    }
                    return Err((bad, sc.position()));
                }
                Some(b'>') if !declaration => {
                    sc.advance(1);
                    return Ok(());
                }
                Some(b'?') if declaration => {
                    sc.advance(1);
                    if sc.eat(b'>') {
                        return Ok(());
                    }
                    return Err((bad, sc.position()));
                }
                _ => return Err((bad, sc.position())),
            }
        }
    }

    fn attribute(&mut self, sc: &mut Scanner<'s>, owner: NodeId) -> Step {
        let Some((name_start, name_end)) = sc.read_name() else {
            return Err((ParseStatus::BadAttribute, sc.position()));
        };
        let attr = self
            .doc
            .alloc_attr()
            .ok_or((ParseStatus::OutOfMemory, name_start))?;
        self.doc.link_attr_last(owner, attr);
        let name = self.range(name_start, name_end);
        if let Some(a) = self.doc.attr_mut(attr) {
            a.name = name;
        }

        sc.skip_whitespace();
        if !sc.eat(b'=') {
            return Err((ParseStatus::BadAttribute, sc.position()));
        }
        sc.skip_whitespace();
        let quote = match sc.peek() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err((ParseStatus::BadAttribute, sc.position())),
        };
        sc.advance(1);

        let value_start = sc.position();
        let value_end = sc
            .find_byte(quote)
            .ok_or((ParseStatus::BadAttribute, value_start))?;
        let raw = sc.slice(value_start, value_end);
        let value = self.slot(convert_attribute(raw, self.options), value_start)?;
        if let Some(a) = self.doc.attr_mut(attr) {
            a.value = value;
        }
        sc.set_position(value_end + 1);

        // `a="1"b="2"` needs whitespace between the two
        if sc.peek().is_some_and(is_name_start_char) {
            return Err((ParseStatus::BadAttribute, sc.position()));
        }
        Ok(())
    }

    fn end_tag(&mut self, sc: &mut Scanner<'s>) -> Step {
        sc.advance(1);
        let mark = sc.position();
        let Some(&open) = self.stack.last() else {
            return Err((ParseStatus::EndElementMismatch, mark));
        };

        let name_end = sc.read_name().map_or(mark, |(_, end)| end);
        let name = sc.slice(mark, name_end);
        let expected = self.doc.name(open);
        if name != expected {
            // `</na` cut off by the end of input
            if name_end == sc.len() && expected.starts_with(name) {
                return Err((ParseStatus::BadEndElement, name_end));
            }
            return Err((ParseStatus::EndElementMismatch, mark));
        }
        self.stack.pop();

        sc.skip_whitespace();
        if sc.eat(b'>') {
            Ok(())
        } else {
            Err((ParseStatus::BadEndElement, sc.position()))
        }
    }

    /// `<?target ...?>`: processing instruction or XML declaration
    fn question(&mut self, sc: &mut Scanner<'s>) -> Step {
        sc.advance(1);
        let Some((target_start, target_end)) = sc.read_name() else {
            return Err((ParseStatus::BadPi, sc.position()));
        };
        let declaration = sc.slice(target_start, target_end).eq_ignore_ascii_case("xml");
        let wanted = if declaration {
            ParseOptions::DECLARATION
        } else {
            ParseOptions::PI
        };

        if !self.opt(wanted) {
            let end = sc.find_seq(b"?>").ok_or((ParseStatus::BadPi, sc.len()))?;
            sc.set_position(end + 2);
            return Ok(());
        }
        if declaration && !self.at_document_level() {
            return Err((ParseStatus::BadPi, target_end));
        }

        let kind = if declaration {
            NodeKind::Declaration
        } else {
            NodeKind::Pi
        };
        let node = self.push_node(kind, target_start)?;
        let name = self.range(target_start, target_end);
        self.set_name(node, name);

        match sc.peek() {
            Some(b'?') => {
                sc.advance(1);
                if sc.eat(b'>') {
                    Ok(())
                } else {
                    Err((ParseStatus::BadPi, sc.position()))
                }
            }
            Some(b) if is_space(b) => {
                sc.skip_whitespace();
                if declaration {
                    return self.attributes(sc, node, true);
                }
                let value_start = sc.position();
                let value_end = sc.find_seq(b"?>").ok_or((ParseStatus::BadPi, sc.len()))?;
                let value = self.range(value_start, value_end);
                self.set_value(node, value);
                sc.set_position(value_end + 2);
                Ok(())
            }
            _ => Err((ParseStatus::BadPi, sc.position())),
        }
    }

    /// `<!`: comment, CDATA section or DOCTYPE
    fn exclamation(&mut self, sc: &mut Scanner<'s>) -> Step {
        sc.advance(1);
        if sc.starts_with(b"--") {
            sc.advance(2);
            self.delimited(sc, b"-->", NodeKind::Comment)
        } else if sc.starts_with(b"[CDATA[") {
            sc.advance(7);
            self.delimited(sc, b"]]>", NodeKind::Cdata)
        } else if sc.starts_with(b"DOCTYPE") {
            self.doctype(sc)
        } else if sc.peek() == Some(b'-') {
            Err((ParseStatus::BadComment, sc.position()))
        } else if sc.peek() == Some(b'[') {
            Err((ParseStatus::BadCdata, sc.position()))
        } else {
            Err((ParseStatus::UnrecognizedTag, sc.position()))
        }
    }

    /// Comment or CDATA body up to `terminator`
    fn delimited(&mut self, sc: &mut Scanner<'s>, terminator: &[u8], kind: NodeKind) -> Step {
        let (status, flag) = match kind {
            NodeKind::Comment => (ParseStatus::BadComment, ParseOptions::COMMENTS),
            _ => (ParseStatus::BadCdata, ParseOptions::CDATA),
        };
        let start = sc.position();
        let end = sc.find_seq(terminator).ok_or((status, start))?;

        if self.opt(flag) {
            let raw = sc.slice(start, end);
            let text = if self.opt(ParseOptions::EOL) {
                normalize_eol(raw)
            } else {
                Cow::Borrowed(raw)
            };
            let slot = self.slot(text, start)?;
            let node = self.push_node(kind, start)?;
            self.set_value(node, slot);
        }
        sc.set_position(end + terminator.len());
        Ok(())
    }

    fn doctype(&mut self, sc: &mut Scanner<'s>) -> Step {
        // Back at the `<` of `<!DOCTYPE`
        let tag_start = sc.position() - 2;
        if !self.at_document_level() {
            return Err((ParseStatus::BadDoctype, tag_start));
        }
        sc.advance(b"DOCTYPE".len());
        let mark = sc.position();
        let end = skip_doctype_body(sc)?;

        if self.opt(ParseOptions::DOCTYPE) {
            let bytes = self.source.as_bytes();
            let mut value_start = mark;
            while value_start < end && is_space(bytes[value_start]) {
                value_start += 1;
            }
            let node = self.push_node(NodeKind::Doctype, tag_start)?;
            let value = self.range(value_start, end);
            self.set_value(node, value);
        }
        sc.set_position(end + 1);
        Ok(())
    }
}

/// Skip a DOCTYPE body, returning the position of its closing `>`
///
/// Quoted strings, comments, PIs and conditional sections are skipped
/// whole; every other `<` opens a nested markup declaration.
fn skip_doctype_body(sc: &mut Scanner<'_>) -> Step<usize> {
    let eof = |sc: &Scanner<'_>| (ParseStatus::BadDoctype, sc.len());
    let mut depth = 0usize;

    while let Some(b) = sc.peek() {
        match b {
            b'"' | b'\'' => {
                sc.advance(1);
                let end = sc.find_byte(b).ok_or_else(|| eof(sc))?;
                sc.set_position(end + 1);
            }
            b'<' if sc.starts_with(b"<!--") => {
                let end = sc.find_seq(b"-->").ok_or_else(|| eof(sc))?;
                sc.set_position(end + 3);
            }
            b'<' if sc.starts_with(b"<?") => {
                let end = sc.find_seq(b"?>").ok_or_else(|| eof(sc))?;
                sc.set_position(end + 2);
            }
            b'<' if sc.starts_with(b"<![") => {
                sc.advance(3);
                let mut nested = 1usize;
                while nested > 0 {
                    if sc.is_eof() {
                        return Err(eof(sc));
                    }
                    if sc.starts_with(b"<![") {
                        nested += 1;
                        sc.advance(3);
                    } else if sc.starts_with(b"]]>") {
                        nested -= 1;
                        sc.advance(3);
                    } else {
                        sc.advance(1);
                    }
                }
            }
            b'<' => {
                depth += 1;
                sc.advance(1);
            }
            b'>' => {
                if depth == 0 {
                    return Ok(sc.position());
                }
                depth -= 1;
                sc.advance(1);
            }
            _ => sc.advance(1),
        }
    }
    Err(eof(sc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::encoding::Encoding;
    use crate::dom::result::ParseResult;

    fn load(xml: &str, options: ParseOptions) -> (Document, ParseResult) {
        let mut doc = Document::new();
        let result = doc.load_string(xml, options);
        (doc, result)
    }

    fn kinds(doc: &Document, node: NodeId) -> Vec<NodeKind> {
        doc.children(node).map(|c| doc.kind(c)).collect()
    }

    #[test]
    fn test_parse_element_and_attributes() {
        let (doc, result) = load(r#"<node id="1" name='two'/>"#, ParseOptions::DEFAULT);
        assert!(result.is_ok());
        let node = doc.document_element().unwrap();
        assert_eq!(doc.name(node), "node");
        assert_eq!(doc.attribute_value(node, "id"), Some("1"));
        assert_eq!(doc.attribute_value(node, "name"), Some("two"));
    }

    #[test]
    fn test_mismatch_offset() {
        let (_, result) = load("<foo><bar/>", ParseOptions::DEFAULT);
        assert_eq!(result.status, ParseStatus::EndElementMismatch);
        assert_eq!(result.offset, 10);
        assert_eq!(result.description(), "Start-end tags mismatch");

        let (_, result) = load("<a><b></c></a>", ParseOptions::DEFAULT);
        assert_eq!(result.status, ParseStatus::EndElementMismatch);
        assert_eq!(result.offset, 8);
    }

    #[test]
    fn test_partial_tree_kept_on_error() {
        let (doc, result) = load("<a><b/><c></a>", ParseOptions::DEFAULT);
        assert!(!result.is_ok());
        let a = doc.document_element().unwrap();
        assert_eq!(doc.children(a).count(), 2);
    }

    #[test]
    fn test_empty_and_missing_element() {
        let (doc, result) = load("", ParseOptions::DEFAULT);
        assert!(result.is_ok());
        assert!(doc.document_element().is_none());

        let (_, result) = load("just text", ParseOptions::DEFAULT);
        assert_eq!(result.status, ParseStatus::NoDocumentElement);
        assert_eq!(result.offset, 8);

        let (doc, result) = load("just text", ParseOptions::DEFAULT | ParseOptions::FRAGMENT);
        assert!(result.is_ok());
        assert_eq!(kinds(&doc, doc.root()), [NodeKind::Pcdata]);
    }

    #[test]
    fn test_multiple_top_level_elements() {
        let (doc, result) = load("<a/><b/>", ParseOptions::DEFAULT);
        assert!(result.is_ok());
        assert_eq!(doc.children(doc.root()).count(), 2);
        assert_eq!(doc.name(doc.document_element().unwrap()), "a");
    }

    #[test]
    fn test_escapes_and_borrowing() {
        let (doc, _) = load("<a>plain</a>", ParseOptions::DEFAULT);
        let text = doc.first_child(doc.document_element().unwrap()).unwrap();
        assert!(doc.node(text).unwrap().value.is_borrowed());

        let (doc, _) = load("<a>x &lt; y &#65;</a>", ParseOptions::DEFAULT);
        let text = doc.first_child(doc.document_element().unwrap()).unwrap();
        assert_eq!(doc.value(text), "x < y A");
        assert!(!doc.node(text).unwrap().value.is_borrowed());

        let (doc, _) = load("<a>x &lt; y</a>", ParseOptions::MINIMAL);
        let text = doc.first_child(doc.document_element().unwrap()).unwrap();
        assert_eq!(doc.value(text), "x &lt; y");
    }

    #[test]
    fn test_whitespace_pcdata() {
        let xml = "<a> <b> </b>  <c/></a>";
        let (doc, _) = load(xml, ParseOptions::DEFAULT);
        let a = doc.document_element().unwrap();
        assert_eq!(kinds(&doc, a), [NodeKind::Element, NodeKind::Element]);

        let (doc, _) = load(xml, ParseOptions::DEFAULT | ParseOptions::WS_PCDATA);
        let a = doc.document_element().unwrap();
        assert_eq!(doc.children(a).count(), 4);

        let (doc, _) = load(xml, ParseOptions::DEFAULT | ParseOptions::WS_PCDATA_SINGLE);
        let a = doc.document_element().unwrap();
        assert_eq!(kinds(&doc, a), [NodeKind::Element, NodeKind::Element]);
        let b = doc.child(a, "b").unwrap();
        assert_eq!(kinds(&doc, b), [NodeKind::Pcdata]);
    }

    #[test]
    fn test_trim_and_eol() {
        let (doc, _) = load(
            "<a>  line\r\nnext  </a>",
            ParseOptions::DEFAULT | ParseOptions::TRIM_PCDATA,
        );
        assert_eq!(doc.child_value(doc.document_element().unwrap()), "line\nnext");
    }

    #[test]
    fn test_merge_pcdata() {
        let (doc, result) = load(
            "<node>First text<!-- c -->Second text<![CDATA[x]]>more<?pi d?>Last</node>",
            ParseOptions::MERGE_PCDATA,
        );
        assert!(result.is_ok());
        let node = doc.document_element().unwrap();
        assert_eq!(kinds(&doc, node), [NodeKind::Pcdata]);
        assert_eq!(doc.child_value(node), "First textSecond textmoreLast");

        // A kept comment separates the two texts
        let (doc, _) = load(
            "<node>a<!-- c -->b</node>",
            ParseOptions::MERGE_PCDATA | ParseOptions::COMMENTS,
        );
        let node = doc.document_element().unwrap();
        assert_eq!(
            kinds(&doc, node),
            [NodeKind::Pcdata, NodeKind::Comment, NodeKind::Pcdata]
        );
    }

    #[test]
    fn test_embed_pcdata() {
        let (doc, _) = load(
            "<a>text<b/>tail</a>",
            ParseOptions::DEFAULT | ParseOptions::EMBED_PCDATA,
        );
        let a = doc.document_element().unwrap();
        assert_eq!(doc.value(a), "text");
        assert_eq!(kinds(&doc, a), [NodeKind::Element, NodeKind::Pcdata]);
    }

    #[test]
    fn test_special_nodes() {
        let xml = "<?xml version=\"1.0\"?><!DOCTYPE root [<!ELEMENT root (#PCDATA)>]>\
                   <root><!--note--><?pi data?><![CDATA[<raw>]]></root>";
        let (doc, result) = load(xml, ParseOptions::FULL);
        assert!(result.is_ok(), "{}", result);
        assert_eq!(
            kinds(&doc, doc.root()),
            [NodeKind::Declaration, NodeKind::Doctype, NodeKind::Element]
        );
        let decl = doc.first_child(doc.root()).unwrap();
        assert_eq!(doc.name(decl), "xml");
        assert_eq!(doc.attribute_value(decl, "version"), Some("1.0"));
        let doctype = doc.next_sibling(decl).unwrap();
        assert_eq!(doc.value(doctype), "root [<!ELEMENT root (#PCDATA)>]");

        let root = doc.document_element().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(doc.value(children[0]), "note");
        assert_eq!(doc.name(children[1]), "pi");
        assert_eq!(doc.value(children[1]), "data");
        assert_eq!(doc.value(children[2]), "<raw>");

        let (doc, _) = load(xml, ParseOptions::DEFAULT);
        assert_eq!(kinds(&doc, doc.root()), [NodeKind::Element]);
        let root = doc.document_element().unwrap();
        assert_eq!(kinds(&doc, root), [NodeKind::Cdata]);
    }

    #[test]
    fn test_syntax_errors() {
        let cases = [
            ("<a><</a>", ParseStatus::UnrecognizedTag),
            ("<a><!-- x</a>", ParseStatus::BadComment),
            ("<a><![CDATA[x</a>", ParseStatus::BadCdata),
            ("<a><!DOCTYPE a></a>", ParseStatus::BadDoctype),
            ("<a><?xml version='1.0'?></a>", ParseStatus::BadPi),
            ("<a b></a>", ParseStatus::BadAttribute),
            ("<a b='1></a>", ParseStatus::BadAttribute),
            ("<a b='1'c='2'/>", ParseStatus::BadAttribute),
            ("<a/b>", ParseStatus::BadStartElement),
            ("<a></a x>", ParseStatus::BadEndElement),
            ("</a>", ParseStatus::EndElementMismatch),
        ];
        for (xml, status) in cases {
            let (_, result) = load(xml, ParseOptions::FULL);
            assert_eq!(result.status, status, "{}", xml);
            assert!(result.offset < xml.len());
        }
    }

    #[test]
    fn test_attribute_whitespace() {
        let xml = "<a v=\" x\t\ny  \"/>";
        let (doc, _) = load(xml, ParseOptions::DEFAULT);
        let a = doc.document_element().unwrap();
        assert_eq!(doc.attribute_value(a, "v"), Some(" x  y  "));

        let (doc, _) = load(xml, ParseOptions::DEFAULT | ParseOptions::WNORM_ATTRIBUTE);
        let a = doc.document_element().unwrap();
        assert_eq!(doc.attribute_value(a, "v"), Some("x y"));
    }

    #[test]
    fn test_utf16_input() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<r>é</r>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut doc = Document::new();
        let result = doc.load_buffer(&bytes, ParseOptions::DEFAULT, Encoding::Auto);
        assert!(result.is_ok());
        assert_eq!(result.encoding, Encoding::Utf16Le);
        assert_eq!(doc.child_value(doc.document_element().unwrap()), "é");
    }
}
