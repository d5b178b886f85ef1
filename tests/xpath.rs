use rustydom::{
    Document, Error, NodeSetOrder, ParseOptions, XPathNode, XPathQuery, XPathType,
    XPathVariableSet,
};

fn parse(xml: &str) -> Document {
    let mut doc = Document::new();
    assert!(doc.load_string(xml, ParseOptions::FULL).is_ok());
    doc
}

#[test]
fn test_attribute_query_all_types() {
    let doc = parse("<node attr='3'/>");
    let root = doc.root();
    let query = XPathQuery::new("node/@attr", None);

    assert!(query.evaluate_boolean(&doc, root));
    assert_eq!(query.evaluate_number(&doc, root), 3.0);
    assert_eq!(query.evaluate_string(&doc, root), "3");

    let set = query.evaluate_node_set(&doc, root).unwrap();
    assert_eq!(set.len(), 1);
    let node = doc.document_element().unwrap();
    assert_eq!(set[0].attribute(), doc.attribute(node, "attr"));
    assert_eq!(set[0].parent(&doc), Some(node));
}

#[test]
fn test_attribute_union_sorts() {
    let doc = parse("<node attr1='1' attr2='2' attr3='3'/>");
    let node = doc.document_element().unwrap();
    let expected: Vec<_> = doc.attributes(node).collect();

    let mut set = doc.select_nodes(node, "@* | @*", None).unwrap();
    assert_eq!(set.order(), NodeSetOrder::Unsorted);

    set.sort(&doc, false);
    let ascending: Vec<_> = set.iter().filter_map(|n| n.attribute()).collect();
    assert_eq!(ascending, expected);

    set.sort(&doc, true);
    let descending: Vec<_> = set.iter().filter_map(|n| n.attribute()).collect();
    let mut reversed = expected.clone();
    reversed.reverse();
    assert_eq!(descending, reversed);
    assert_eq!(set.order(), NodeSetOrder::SortedReverse);
}

#[test]
fn test_select_node_first_in_document_order() {
    let doc = parse("<r><a id='1'/><b><a id='2'/></b><a id='3'/></r>");
    let first = doc.select_node(doc.root(), "//a | //b", None).unwrap();
    assert_eq!(doc.name(first.node().unwrap()), "a");

    let last = doc.select_node(doc.root(), "(//a)[last()]", None).unwrap();
    let id = doc.attribute_value(last.node().unwrap(), "id");
    assert_eq!(id, Some("3"));

    let none = doc.select_node(doc.root(), "//missing", None).unwrap();
    assert!(none.is_null());
    assert_eq!(none, XPathNode::Null);
}

#[test]
fn test_query_reuse_across_documents() {
    let query = XPathQuery::compile("sum(//v) div count(//v)", None).unwrap();
    assert_eq!(query.return_type(), XPathType::Number);

    let a = parse("<r><v>1</v><v>3</v></r>");
    let b = parse("<r><v>10</v></r>");
    assert_eq!(query.evaluate_number(&a, a.root()), 2.0);
    assert_eq!(query.evaluate_number(&b, b.root()), 10.0);
}

#[test]
fn test_variables_see_later_values() {
    let doc = parse("<r><i n='1'/><i n='2'/><i n='3'/></r>");
    let mut vars = XPathVariableSet::new();
    vars.set_number("min", 2.0);
    let query = XPathQuery::compile("count(//i[@n >= $min])", Some(&vars)).unwrap();
    assert_eq!(query.evaluate_number(&doc, doc.root()), 2.0);

    vars.get("min").unwrap().set_number(3.0);
    assert_eq!(query.evaluate_number(&doc, doc.root()), 1.0);
}

#[test]
fn test_captured_node_set_is_live() {
    let mut doc = parse("<r><i>old</i></r>");
    let mut vars = XPathVariableSet::new();
    let items = doc.select_nodes(doc.root(), "//i", None).unwrap();
    vars.set_node_set("items", items);

    let i = doc.first_element_by_path(doc.root(), "r/i", '/').unwrap();
    let text = doc.first_child(i).unwrap();
    doc.set_value(text, "new");

    let query = XPathQuery::compile("string($items)", Some(&vars)).unwrap();
    assert_eq!(query.evaluate_string(&doc, doc.root()), "new");
}

#[test]
fn test_errors_at_the_boundary() {
    let doc = parse("<r/>");
    match doc.select_nodes(doc.root(), "//r[", None) {
        Err(Error::XPathSyntax { offset, .. }) => assert_eq!(offset, 4),
        other => panic!("expected syntax error, got {:?}", other),
    }
    assert!(matches!(
        doc.select_nodes(doc.root(), "count(//r)", None),
        Err(Error::XPathError(_))
    ));
    assert!(matches!(
        XPathQuery::compile("$undefined", None),
        Err(Error::XPathSyntax { .. })
    ));
}

#[test]
fn test_axes_from_middle() {
    let doc = parse("<r><a/><b><c/><d/></b><e/></r>");
    let c = doc.find_node(doc.root(), |n| doc.name(n) == "c").unwrap();
    let names = |expr: &str| -> Vec<String> {
        let mut set = doc.select_nodes(c, expr, None).unwrap();
        set.sort(&doc, false);
        set.iter()
            .map(|n| doc.name(n.node().unwrap()).to_string())
            .collect()
    };
    assert_eq!(names("following::*"), ["d", "e"]);
    assert_eq!(names("preceding::*"), ["a"]);
    assert_eq!(names("ancestor::*"), ["r", "b"]);
    assert_eq!(names("../following-sibling::*"), ["e"]);
    assert_eq!(names("preceding::*[1]"), ["a"]);
}
