use rustydom::{
    Document, Encoding, FormatOptions, IoSink, NodeKind, ParseOptions, ParseStatus, StringSink,
};

const RAW: FormatOptions = FormatOptions::from_bits(
    FormatOptions::RAW.bits() | FormatOptions::NO_DECLARATION.bits(),
);

fn parse(xml: &str, options: ParseOptions) -> Document {
    let mut doc = Document::new();
    let result = doc.load_string(xml, options);
    assert!(result.is_ok(), "{}: {}", xml, result.description());
    doc
}

#[test]
fn test_minimal_round_trip() {
    let doc = parse("<node/>", ParseOptions::DEFAULT);
    assert_eq!(doc.save_string("", RAW), "<node/>");
}

#[test]
fn test_mismatched_end_tag() {
    let mut doc = Document::new();
    let result = doc.load_string("<foo><bar/>", ParseOptions::DEFAULT);
    assert_eq!(result.status, ParseStatus::EndElementMismatch);
    assert_eq!(result.offset, 10);
    assert_eq!(result.description(), "Start-end tags mismatch");
    assert!(result.into_result().is_err());
}

#[test]
fn test_merge_pcdata_across_comment() {
    let doc = parse(
        "<node>First text<!-- c -->Second text</node>",
        ParseOptions::DEFAULT | ParseOptions::MERGE_PCDATA,
    );
    let node = doc.child(doc.root(), "node").unwrap();
    let children: Vec<_> = doc.children(node).collect();
    assert_eq!(children.len(), 1);
    assert_eq!(doc.kind(children[0]), NodeKind::Pcdata);
    assert_eq!(doc.value(children[0]), "First textSecond text");
}

#[test]
fn test_numeric_attribute_text() {
    let mut doc = parse("<node/>", ParseOptions::DEFAULT);
    let node = doc.document_element().unwrap();
    let attr = doc.append_attribute(node, "v").unwrap();

    assert!(doc.set_attr_value_as(attr, 0.25f64));
    assert_eq!(doc.attr_value(attr), "0.25");

    assert!(doc.set_attr_value_as(attr, f64::MAX));
    assert_eq!(doc.attr_as(attr, 0.0f64), f64::MAX);
}

#[test]
fn test_integer_limits_round_trip() {
    let mut doc = parse("<node/>", ParseOptions::DEFAULT);
    let node = doc.document_element().unwrap();
    let attr = doc.append_attribute(node, "v").unwrap();

    for value in [i32::MIN, i32::MAX] {
        doc.set_attr_value_as(attr, value);
        assert_eq!(doc.attr_as(attr, 0i32), value);
    }
    for value in [u32::MIN, u32::MAX] {
        doc.set_attr_value_as(attr, value);
        assert_eq!(doc.attr_as(attr, 1u32), value);
    }
    for value in [i64::MIN, i64::MAX] {
        doc.set_attr_value_as(attr, value);
        assert_eq!(doc.attr_as(attr, 0i64), value);
    }
    for value in [u64::MIN, u64::MAX] {
        doc.set_attr_value_as(attr, value);
        assert_eq!(doc.attr_as(attr, 1u64), value);
    }

    // Element text goes through the same conversions
    let mut text = doc.text_mut(node);
    assert!(text.set_value(u64::MAX));
    assert_eq!(doc.text(node).as_value(0u64), u64::MAX);
}

#[test]
fn test_remove_middle_sibling() {
    let mut doc = parse("<r><a/><b/><c/></r>", ParseOptions::DEFAULT);
    let r = doc.document_element().unwrap();
    let a = doc.child(r, "a").unwrap();
    let b = doc.child(r, "b").unwrap();
    let c = doc.child(r, "c").unwrap();

    assert!(doc.remove_child(r, b));
    assert!(!doc.contains(b));
    assert_eq!(doc.first_child(r), Some(a));
    assert_eq!(doc.last_child(r), Some(c));
    assert_eq!(doc.next_sibling(a), Some(c));
    assert_eq!(doc.previous_sibling(c), Some(a));
    assert_eq!(doc.previous_sibling(a), None);
    assert_eq!(doc.next_sibling(c), None);

    assert!(doc.remove_child(r, a));
    assert_eq!(doc.first_child(r), Some(c));
    assert_eq!(doc.last_child(r), Some(c));
    assert!(doc.remove_child(r, c));
    assert_eq!(doc.first_child(r), None);
    assert_eq!(doc.save_string("", RAW), "<r/>");
}

#[test]
fn test_file_round_trip_utf16() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("doc.xml");

    let doc = parse(
        "<catalog><book id='1'>Caf\u{e9} &amp; cr\u{e8}me</book><!--x--></catalog>",
        ParseOptions::FULL,
    );
    let flags = FormatOptions::DEFAULT | FormatOptions::WRITE_BOM | FormatOptions::NO_DECLARATION;
    doc.save_file(&path, "  ", flags, Encoding::Utf16Le).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xFE]);

    let mut loaded = Document::new();
    let result = loaded.load_file(&path, ParseOptions::FULL, Encoding::Auto);
    assert!(result.is_ok());
    assert_eq!(result.encoding, Encoding::Utf16Le);
    assert_eq!(loaded.save_string("", RAW), doc.save_string("", RAW));

    let book = loaded.first_element_by_path(loaded.root(), "catalog/book", '/').unwrap();
    assert_eq!(loaded.child_value(book), "Caf\u{e9} & cr\u{e8}me");
    assert_eq!(loaded.attribute_value(book, "id"), Some("1"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut doc = Document::new();
    let result = doc.load_file(dir.path().join("absent.xml"), ParseOptions::DEFAULT, Encoding::Auto);
    assert_eq!(result.status, ParseStatus::FileNotFound);
}

#[test]
fn test_sinks() {
    let doc = parse("<a x='&lt;'>\u{e9}</a>", ParseOptions::DEFAULT);

    let mut io = IoSink::new(Vec::new());
    doc.save(&mut io, "", RAW, Encoding::Latin1).unwrap();
    assert_eq!(io.into_inner().unwrap(), b"<a x=\"&lt;\">\xe9</a>");

    let mut sink = StringSink::new(Encoding::Utf32Be);
    doc.save(&mut sink, "", RAW, Encoding::Utf32Be).unwrap();
    assert_eq!(sink.into_string().unwrap(), "<a x=\"&lt;\">\u{e9}</a>");
}

#[test]
fn test_mutation_then_serialize() {
    let mut doc = Document::new();
    let root = doc.root();
    let decl = doc.append_child(root, NodeKind::Declaration).unwrap();
    doc.set_attribute(decl, "version", "1.0");
    let list = doc.append_element(root, "list").unwrap();
    for i in 0..3 {
        let item = doc.append_element(list, "item").unwrap();
        doc.set_attribute(item, "n", &i.to_string());
    }
    let first = doc.first_child(list).unwrap();
    let last = doc.last_child(list).unwrap();
    doc.insert_move_before(list, last, first).unwrap();

    assert_eq!(
        doc.save_string("", RAW),
        "<?xml version=\"1.0\"?><list><item n=\"2\"/><item n=\"0\"/><item n=\"1\"/></list>"
    );
    assert_eq!(
        doc.save_string("\t", FormatOptions::DEFAULT),
        "<?xml version=\"1.0\"?>\n<list>\n\t<item n=\"2\" />\n\t<item n=\"0\" />\n\t<item n=\"1\" />\n</list>\n"
    );
}
