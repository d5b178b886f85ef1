//! Tree serialization
//!
//! Walks the tree with an explicit stack of enter/close entries, so deep
//! documents cannot overflow the call stack. Whitespace between nodes is
//! driven by a small state word: text content suppresses the newline and
//! indentation that would otherwise precede the next tag.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use memchr::memmem;

use super::buffered::BufferedWriter;
use super::sink::{IoSink, XmlWriter};
use crate::core::encoding::Encoding;
use crate::core::options::FormatOptions;
use crate::dom::node::{NodeId, NodeKind, NodeRecord};
use crate::dom::strings::TextSlot;
use crate::dom::Document;
use crate::error::Result;

/// Name written for elements, PIs and attributes without one
const ANONYMOUS: &str = ":anonymous";

const NEWLINE: u8 = 1;
const INDENT: u8 = 2;

enum StackEntry {
    Enter(NodeId, usize),
    Close(NodeId, usize),
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Context {
    Pcdata,
    Attribute,
}

struct Output<'a, 'w, W: XmlWriter + ?Sized> {
    doc: &'a Document,
    out: &'a mut BufferedWriter<'w, W>,
    /// Empty when indentation is off
    indent: &'a str,
    flags: FormatOptions,
}

impl<'a, W: XmlWriter + ?Sized> Output<'a, '_, W> {
    fn raw(&self) -> bool {
        self.flags.contains(FormatOptions::RAW)
    }

    fn str(&self, slot: TextSlot) -> &'a str {
        let doc: &'a Document = self.doc;
        doc.slot_str(slot)
    }

    fn name_of(&self, slot: TextSlot) -> &'a str {
        if slot.is_null() {
            ANONYMOUS
        } else {
            self.str(slot)
        }
    }

    fn write_indent(&mut self, depth: usize) {
        if self.indent.is_empty() {
            return;
        }
        for _ in 0..depth {
            self.out.write_str(self.indent);
        }
    }

    fn separate(&mut self, state: u8, depth: usize) {
        if state & NEWLINE != 0 && !self.raw() {
            self.out.write_char('\n');
        }
        if state & INDENT != 0 {
            self.write_indent(depth);
        }
    }

    fn run(&mut self, root: NodeId, depth: usize) {
        let mut state = INDENT;
        let doc: &'a Document = self.doc;
        let mut stack = vec![StackEntry::Enter(root, depth)];

        while let Some(entry) = stack.pop() {
            match entry {
                StackEntry::Enter(id, depth) => {
                    let Some(record) = doc.node(id) else {
                        continue;
                    };
                    match record.kind {
                        NodeKind::Pcdata | NodeKind::Cdata => {
                            self.simple(id, record);
                            state = 0;
                        }
                        NodeKind::Element => {
                            self.separate(state, depth);
                            state = NEWLINE | INDENT;
                            if self.start_tag(id, record, depth) {
                                if !record.value.is_null() {
                                    state = 0;
                                }
                                stack.push(StackEntry::Close(id, depth));
                                self.push_children(&mut stack, record, depth + 1);
                            }
                        }
                        NodeKind::Document => {
                            self.separate(state, depth);
                            state = INDENT;
                            self.push_children(&mut stack, record, depth);
                        }
                        _ => {
                            self.separate(state, depth);
                            self.simple(id, record);
                            state = NEWLINE | INDENT;
                        }
                    }
                }
                StackEntry::Close(id, depth) => {
                    self.separate(state, depth);
                    if let Some(record) = doc.node(id) {
                        let name = self.name_of(record.name);
                        self.out.write_str("</");
                        self.out.write_str(name);
                        self.out.write_char('>');
                    }
                    state = NEWLINE | INDENT;
                }
            }
        }

        if state & NEWLINE != 0 && !self.raw() {
            self.out.write_char('\n');
        }
    }

    fn push_children(&self, stack: &mut Vec<StackEntry>, record: &NodeRecord, depth: usize) {
        let mut child = record.last_child;
        while let Some(c) = child {
            stack.push(StackEntry::Enter(c, depth));
            child = self.doc.previous_sibling(c);
        }
    }

    /// Opening tag; `true` when the element stays open for children
    fn start_tag(&mut self, id: NodeId, record: &'a NodeRecord, depth: usize) -> bool {
        let name = self.name_of(record.name);
        let (indent, flags) = (self.indent, self.flags);
        self.out.write_char('<');
        self.out.write_str(name);
        self.attributes(id, indent, flags, depth);

        if record.value.is_null() {
            if record.first_child.is_some() {
                self.out.write_char('>');
                return true;
            }
            if self.flags.contains(FormatOptions::NO_EMPTY_ELEMENT_TAGS) {
                self.out.write_str("></");
                self.out.write_str(name);
                self.out.write_char('>');
            } else {
                if !self.raw() {
                    self.out.write_char(' ');
                }
                self.out.write_str("/>");
            }
            return false;
        }

        // Text embedded in the element itself
        let value = self.str(record.value);
        self.out.write_char('>');
        self.text(value, Context::Pcdata, flags);
        if record.first_child.is_some() {
            return true;
        }
        self.out.write_str("</");
        self.out.write_str(name);
        self.out.write_char('>');
        false
    }

    fn attributes(&mut self, id: NodeId, indent: &str, flags: FormatOptions, depth: usize) {
        let quote = if flags.contains(FormatOptions::ATTRIBUTE_SINGLE_QUOTE) {
            '\''
        } else {
            '"'
        };
        let own_line = flags.contains(FormatOptions::INDENT_ATTRIBUTES)
            && !flags.contains(FormatOptions::RAW);

        let doc: &'a Document = self.doc;
        for attr in doc.attributes(id) {
            let Some(record) = doc.attr(attr) else {
                continue;
            };
            if own_line {
                self.out.write_char('\n');
                if !indent.is_empty() {
                    for _ in 0..=depth {
                        self.out.write_str(indent);
                    }
                }
            } else {
                self.out.write_char(' ');
            }
            let name = self.name_of(record.name);
            self.out.write_str(name);
            self.out.write_char('=');
            self.out.write_char(quote);
            if !record.value.is_null() {
                let value = self.str(record.value);
                self.text(value, Context::Attribute, flags);
            }
            self.out.write_char(quote);
        }
    }

    /// Everything except elements and the document
    fn simple(&mut self, id: NodeId, record: &'a NodeRecord) {
        let value = self.str(record.value);
        let flags = self.flags;
        match record.kind {
            NodeKind::Pcdata => self.text(value, Context::Pcdata, flags),
            NodeKind::Cdata => self.cdata(value),
            NodeKind::Comment => self.comment(value),
            NodeKind::Pi => {
                let name = self.name_of(record.name);
                self.out.write_str("<?");
                self.out.write_str(name);
                if !record.value.is_null() {
                    self.out.write_char(' ');
                    self.pi_value(value);
                }
                self.out.write_str("?>");
            }
            NodeKind::Declaration => {
                let name = self.name_of(record.name);
                self.out.write_str("<?");
                self.out.write_str(name);
                self.attributes(id, "", flags | FormatOptions::RAW, 0);
                self.out.write_str("?>");
            }
            NodeKind::Doctype => {
                self.out.write_str("<!DOCTYPE");
                if !record.value.is_null() {
                    self.out.write_char(' ');
                    self.out.write_str(value);
                }
                self.out.write_char('>');
            }
            _ => {}
        }
    }

    fn text(&mut self, s: &str, ctx: Context, flags: FormatOptions) {
        if flags.contains(FormatOptions::NO_ESCAPES) {
            self.out.write_str(s);
            return;
        }
        let single = flags.contains(FormatOptions::ATTRIBUTE_SINGLE_QUOTE);
        let skip_control = flags.contains(FormatOptions::SKIP_CONTROL_CHARS);

        let mut start = 0;
        for (i, &b) in s.as_bytes().iter().enumerate() {
            let special = match ctx {
                Context::Pcdata => {
                    matches!(b, b'&' | b'<' | b'>')
                        || (b < 32 && !matches!(b, b'\t' | b'\n' | b'\r'))
                }
                Context::Attribute => matches!(b, b'&' | b'<' | b'"' | b'\'') || b < 32,
            };
            if !special {
                continue;
            }
            self.out.write_str(&s[start..i]);
            start = i + 1;
            match b {
                b'&' => self.out.write_str("&amp;"),
                b'<' => self.out.write_str("&lt;"),
                b'>' => self.out.write_str("&gt;"),
                b'"' if single => self.out.write_char('"'),
                b'"' => self.out.write_str("&quot;"),
                b'\'' if single => self.out.write_str("&apos;"),
                b'\'' => self.out.write_char('\''),
                control if !skip_control => {
                    self.out.write_str("&#");
                    self.out.write_char(char::from(b'0' + control / 10));
                    self.out.write_char(char::from(b'0' + control % 10));
                    self.out.write_char(';');
                }
                _ => {}
            }
        }
        self.out.write_str(&s[start..]);
    }

    /// `]]>` cannot appear inside a section, so it is split across two
    fn cdata(&mut self, s: &str) {
        let mut rest = s;
        loop {
            self.out.write_str("<![CDATA[");
            match memmem::find(rest.as_bytes(), b"]]>") {
                Some(at) => {
                    self.out.write_str(&rest[..at + 2]);
                    self.out.write_str("]]>");
                    rest = &rest[at + 2..];
                }
                None => {
                    self.out.write_str(rest);
                    self.out.write_str("]]>");
                    return;
                }
            }
        }
    }

    /// `--` and a trailing `-` are broken up with a space
    fn comment(&mut self, s: &str) {
        self.out.write_str("<!--");
        let bytes = s.as_bytes();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            if b == b'-' && matches!(bytes.get(i + 1), None | Some(b'-')) {
                self.out.write_str(&s[start..i]);
                self.out.write_str("- ");
                start = i + 1;
            }
        }
        self.out.write_str(&s[start..]);
        self.out.write_str("-->");
    }

    fn pi_value(&mut self, s: &str) {
        let mut rest = s;
        while let Some(at) = memmem::find(rest.as_bytes(), b"?>") {
            self.out.write_str(&rest[..at]);
            self.out.write_str("? >");
            rest = &rest[at + 2..];
        }
        self.out.write_str(rest);
    }
}

/// A declaration child before the first element
fn has_declaration(doc: &Document) -> bool {
    for child in doc.children(doc.root()) {
        match doc.kind(child) {
            NodeKind::Declaration => return true,
            NodeKind::Element => return false,
            _ => {}
        }
    }
    false
}

fn effective_indent(indent: &str, flags: FormatOptions) -> &str {
    if flags.intersects(FormatOptions::INDENT | FormatOptions::INDENT_ATTRIBUTES)
        && !flags.contains(FormatOptions::RAW)
    {
        indent
    } else {
        ""
    }
}

impl Document {
    /// Serialize the whole document
    ///
    /// Adds `<?xml version="1.0"?>` unless `NO_DECLARATION` is set or the
    /// document already has a declaration ahead of its first element.
    pub fn save<W: XmlWriter + ?Sized>(
        &self,
        sink: &mut W,
        indent: &str,
        flags: FormatOptions,
        encoding: Encoding,
    ) -> io::Result<()> {
        let mut out = BufferedWriter::new(sink, encoding);
        let encoding = out.encoding();
        debug!(?encoding, flags = flags.bits(), "saving document");

        if flags.contains(FormatOptions::WRITE_BOM) && encoding != Encoding::Latin1 {
            out.write_raw(encoding.bom());
        }
        if !flags.contains(FormatOptions::NO_DECLARATION) && !has_declaration(self) {
            out.write_str("<?xml version=\"1.0\"");
            if encoding == Encoding::Latin1 {
                out.write_str(" encoding=\"ISO-8859-1\"");
            }
            out.write_str("?>");
            if !flags.contains(FormatOptions::RAW) {
                out.write_char('\n');
            }
        }

        Output {
            doc: self,
            out: &mut out,
            indent: effective_indent(indent, flags),
            flags,
        }
        .run(self.root(), 0);
        out.flush()
    }

    /// Save to a file, creating or truncating it
    pub fn save_file<P: AsRef<Path>>(
        &self,
        path: P,
        indent: &str,
        flags: FormatOptions,
        encoding: Encoding,
    ) -> Result<()> {
        let path = path.as_ref();
        trace!(path = %path.display(), "save_file");
        let file = File::create(path)?;
        let mut sink = IoSink::new(BufWriter::new(file));
        self.save(&mut sink, indent, flags, encoding)?;
        sink.into_inner()?;
        Ok(())
    }

    /// Serialize to a UTF-8 string
    pub fn save_string(&self, indent: &str, flags: FormatOptions) -> String {
        let mut text = String::new();
        // Writing into a String cannot fail
        let _ = self.save(&mut text, indent, flags, Encoding::Utf8);
        text
    }

    /// Serialize one node and its subtree, indenting from `depth`
    ///
    /// Never writes a declaration or BOM; a missing node writes nothing.
    pub fn print<W: XmlWriter + ?Sized>(
        &self,
        sink: &mut W,
        node: NodeId,
        indent: &str,
        flags: FormatOptions,
        encoding: Encoding,
        depth: usize,
    ) -> io::Result<()> {
        if !self.contains(node) {
            return Ok(());
        }
        let mut out = BufferedWriter::new(sink, encoding);
        Output {
            doc: self,
            out: &mut out,
            indent: effective_indent(indent, flags),
            flags,
        }
        .run(node, depth);
        out.flush()
    }
}
