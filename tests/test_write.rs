use eml_doc::{Document, Node, SchemaPath, ValueTree, WriteOptions};

#[test]
fn test_escape() {
    let expected = r#"<?xml version="1.0" encoding="UTF-8"?>
<root attr="&gt;&lt;&amp;&quot;&apos;attrval">
  <inner xmlns:ns="&gt;&lt;&amp;&quot;&apos;nsval">&gt;&lt;&amp;&quot;&apos;text</inner>
</root>
<!--<&amp;--><![CDATA[<&amp;]]><!DOCTYPE &lt;&amp;amp;>
<?<&amp;?>"#;
    let mut doc = Document::with_root("root");
    let root = doc.root_element().unwrap();
    root.mut_attributes(&mut doc)
        .insert("attr".to_string(), "><&\"'attrval".to_string());
    let inner_path = SchemaPath::new(["inner"]);
    doc.set(
        &inner_path,
        &SchemaPath::root(),
        ValueTree::single("inner", "><&\"'text"),
    )
    .unwrap();
    let inner = doc.find_one(&inner_path).unwrap();
    inner
        .mut_namespace_decls(&mut doc)
        .insert("ns".to_string(), "><&\"'nsval".to_string());
    let container = doc.container();
    for node in [
        Node::Comment("<&amp;".to_string()),
        Node::CData("<&amp;".to_string()),
        Node::DocType("<&amp;".to_string()),
        Node::PI("<&amp;".to_string()),
    ] {
        container.push_child(&mut doc, node).unwrap();
    }
    let xml = doc.write_str().unwrap();

    assert_eq!(xml, expected);
}

#[test]
fn test_write_file_with_tabs() {
    let mut doc = Document::with_root("eml");
    let path: SchemaPath = "dataset/title".parse().unwrap();
    doc.set(
        &path,
        &path.parent().unwrap(),
        ValueTree::single("title", "Bison Range"),
    )
    .unwrap();

    let opts = WriteOptions {
        indent_char: b'\t',
        indent_size: 1,
    };
    let xml = doc.write_str_with_opts(&opts).unwrap();
    assert!(xml.contains("\n\t<dataset>\n\t\t<title>Bison Range</title>\n\t</dataset>"));

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("written.xml");
    doc.write_file(&file).unwrap();
    let reread = Document::parse_file(&file).unwrap();
    let titles = reread.find(&path);
    assert_eq!(titles.len(), 1);
    assert_eq!(titles[0].text_content(&reread), "Bison Range");
}
