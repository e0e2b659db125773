use crate::document::{Document, Node};
use crate::error::{Error, Result};
use crate::value::ValueTree;
use indexmap::IndexMap;

#[derive(Debug)]
pub(crate) struct ElementData {
    full_name: String,
    attributes: IndexMap<String, String>, // q:attr="val" => {"q:attr": "val"}
    namespace_decls: IndexMap<String, String>, // local namespace newly defined in attributes
    parent: Option<Element>,
    children: Vec<Node>,
}

/// Represents an XML element.
///
/// This struct only contains a unique usize id and implements trait `Copy`.
/// So you do not need to bother with having a reference.
///
/// Because the actual data of the element is stored in [`Document`],
/// most methods takes `&Document` or `&mut Document` as its first argument.
///
/// New elements only enter a document through parsing or through
/// [`Document::serialize`] and [`Document::set`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Element {
    id: usize,
}

impl Element {
    /// Create a new detached element with name, reusing a released slot if there is one.
    pub(crate) fn new<S: Into<String>>(document: &mut Document, name: S) -> Element {
        let data = ElementData {
            full_name: name.into(),
            attributes: IndexMap::new(),
            namespace_decls: IndexMap::new(),
            parent: None,
            children: vec![],
        };
        match document.free.pop() {
            Some(id) => {
                document.store[id] = data;
                Element { id }
            }
            None => {
                document.store.push(data);
                Element {
                    id: document.store.len() - 1,
                }
            }
        }
    }

    /// Give a detached subtree's slots back to the document.
    pub(crate) fn release(&self, document: &mut Document) {
        if self.is_container() {
            return;
        }
        let children = std::mem::take(&mut self.mut_data(document).children);
        for node in children {
            if let Node::Element(child) = node {
                child.release(document);
            }
        }
        let data = self.mut_data(document);
        data.parent = None;
        data.attributes.clear();
        data.namespace_decls.clear();
        data.full_name.clear();
        document.free.push(self.id);
    }

    /// Create a new element and append it to `parent`.
    pub(crate) fn new_child<S: Into<String>>(
        document: &mut Document,
        parent: Element,
        name: S,
    ) -> Element {
        let elem = Element::new(document, name);
        elem.mut_data(document).parent = Some(parent);
        parent.mut_data(document).children.push(Node::Element(elem));
        elem
    }

    pub(crate) fn container() -> (Element, ElementData) {
        let elem_data = ElementData {
            full_name: String::new(),
            attributes: IndexMap::new(),
            namespace_decls: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        };
        (Element { id: 0 }, elem_data)
    }

    /// The container holds the top-level nodes of a document. It is not an XML element itself.
    pub fn is_container(&self) -> bool {
        self.id == 0
    }

    pub fn separate_prefix_name(full_name: &str) -> (&str, &str) {
        match full_name.split_once(':') {
            Some((prefix, name)) => (prefix, name),
            None => ("", full_name),
        }
    }
}

impl Element {
    fn data<'a>(&self, document: &'a Document) -> &'a ElementData {
        &document.store[self.id]
    }

    fn mut_data<'a>(&self, document: &'a mut Document) -> &'a mut ElementData {
        &mut document.store[self.id]
    }

    /// Get raw name of element, including its namespace prefix.
    pub fn full_name<'a>(&self, document: &'a Document) -> &'a str {
        &self.data(document).full_name
    }

    /// Get prefix and name of element.
    ///
    /// `<prefix:name>` -> `("prefix", "name")`
    pub fn prefix_name<'a>(&self, document: &'a Document) -> (&'a str, &'a str) {
        Self::separate_prefix_name(self.full_name(document))
    }

    pub fn prefix<'a>(&self, document: &'a Document) -> &'a str {
        self.prefix_name(document).0
    }

    pub fn name<'a>(&self, document: &'a Document) -> &'a str {
        self.prefix_name(document).1
    }

    /// Get attributes of element, in document order.
    ///
    /// The attribute names may have namespace prefix. To strip the prefix and only its name, call [`Element::separate_prefix_name`].
    pub fn attributes<'a>(&self, document: &'a Document) -> &'a IndexMap<String, String> {
        &self.data(document).attributes
    }

    pub fn attribute<'a>(&self, document: &'a Document, name: &str) -> Option<&'a str> {
        self.attributes(document).get(name).map(|v| v.as_str())
    }

    pub fn mut_attributes<'a>(
        &self,
        document: &'a mut Document,
    ) -> &'a mut IndexMap<String, String> {
        &mut self.mut_data(document).attributes
    }

    /// Gets `prefix:namespace` pairs declared in its attributes.
    /// The default namespace has an empty prefix.
    pub fn namespace_decls<'a>(&self, document: &'a Document) -> &'a IndexMap<String, String> {
        &self.data(document).namespace_decls
    }

    pub fn mut_namespace_decls<'a>(
        &self,
        document: &'a mut Document,
    ) -> &'a mut IndexMap<String, String> {
        &mut self.mut_data(document).namespace_decls
    }

    pub fn parent(&self, document: &Document) -> Option<Element> {
        self.data(document).parent
    }

    pub fn has_parent(&self, document: &Document) -> bool {
        self.parent(document).is_some()
    }

    pub fn children<'a>(&self, document: &'a Document) -> &'a Vec<Node> {
        &self.data(document).children
    }

    pub fn has_children(&self, document: &Document) -> bool {
        !self.children(document).is_empty()
    }

    pub fn child_elements(&self, document: &Document) -> Vec<Element> {
        self.children(document)
            .iter()
            .filter_map(|node| node.as_element())
            .collect()
    }

    /// First child element whose full name is `name`.
    pub fn find(&self, document: &Document, name: &str) -> Option<Element> {
        self.children(document)
            .iter()
            .filter_map(|node| node.as_element())
            .find(|e| e.full_name(document) == name)
    }

    /// All child elements whose full name is `name`, in document order.
    pub fn find_all(&self, document: &Document, name: &str) -> Vec<Element> {
        self.children(document)
            .iter()
            .filter_map(|node| node.as_element())
            .filter(|e| e.full_name(document) == name)
            .collect()
    }

    pub(crate) fn build_text_content(&self, document: &Document, buf: &mut String) {
        for node in self.children(document) {
            node.build_text_content(document, buf);
        }
    }

    /// Concatenated text of all descendant text and CData nodes.
    pub fn text_content(&self, document: &Document) -> String {
        let mut buf = String::new();
        self.build_text_content(document, &mut buf);
        buf
    }

    /// Replace all children with a single text node.
    pub fn set_text_content<S: Into<String>>(&self, document: &mut Document, text: S) {
        let old = std::mem::take(&mut self.mut_data(document).children);
        for node in old {
            if let Node::Element(elem) = node {
                elem.mut_data(document).parent = None;
            }
        }
        self.mut_data(document).children.push(Node::Text(text.into()));
    }

    /// Equivalent to `vec.push()`.
    ///
    /// # Errors
    ///
    /// - [`Error::HasAParent`]: If node is an element, it must not have a parent.
    /// Call `elem.detach()` before.
    /// - [`Error::ContainerCannotMove`]: The container cannot be a child.
    pub fn push_child(&self, document: &mut Document, node: Node) -> Result<()> {
        if let Node::Element(elem) = node {
            if elem.is_container() {
                return Err(Error::ContainerCannotMove);
            }
            let data = elem.mut_data(document);
            if data.parent.is_some() {
                return Err(Error::HasAParent);
            }
            data.parent = Some(*self);
        }
        self.mut_data(document).children.push(node);
        Ok(())
    }

    /// Remove child element by value.
    ///
    /// # Errors
    ///
    /// - [Error::NotFound]: Element was not found among its children.
    pub fn remove_child_elem(&self, document: &mut Document, element: Element) -> Result<()> {
        let children = &mut self.mut_data(document).children;
        let pos = children
            .iter()
            .position(|n| n.as_element() == Some(element))
            .ok_or(Error::NotFound)?;
        children.remove(pos);
        element.mut_data(document).parent = None;
        Ok(())
    }

    /// Remove element from its parent. The element stays valid and can be pushed elsewhere.
    pub fn detach(&self, document: &mut Document) -> Result<()> {
        if self.is_container() {
            return Err(Error::ContainerCannotMove);
        }
        match self.parent(document) {
            Some(parent) => parent.remove_child_elem(document, *self),
            None => Ok(()),
        }
    }

    /// Read this element back as `{tag: content}`.
    ///
    /// Leaf elements become scalars. A run of adjacent siblings sharing a tag
    /// becomes one [`ValueTree::Repeated`] entry; the same tag appearing again
    /// after another sibling starts a new entry, so document order is kept.
    pub fn to_value_tree(&self, document: &Document) -> ValueTree {
        ValueTree::single(self.full_name(document), self.content_tree(document))
    }

    fn content_tree(&self, document: &Document) -> ValueTree {
        let children = self.child_elements(document);
        if children.is_empty() {
            let text = self.text_content(document);
            return if text.is_empty() {
                ValueTree::Null
            } else {
                ValueTree::from(text)
            };
        }
        let mut runs: Vec<(&str, Vec<ValueTree>)> = Vec::new();
        for child in children {
            let tag = child.full_name(document);
            let content = child.content_tree(document);
            match runs.last_mut() {
                Some((last, items)) if *last == tag => items.push(content),
                _ => runs.push((tag, vec![content])),
            }
        }
        let entries = runs
            .into_iter()
            .map(|(tag, mut items)| {
                let value = if items.len() == 1 {
                    items.swap_remove(0)
                } else {
                    ValueTree::Repeated(items)
                };
                (tag.to_string(), value)
            })
            .collect();
        ValueTree::Mapping(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_children() {
        let xml = r#"
        <dataset>
            <title>Elk Survey</title>
            <creator>
                <individualName>
                    <surName>Wapiti</surName>
                </individualName>
            </creator>
            <keywordSet/>
        </dataset>
        "#;
        let doc = Document::from_str(xml).unwrap();
        let dataset = doc.root_element().unwrap();
        let title = dataset.child_elements(&doc)[0];
        let creator = dataset.child_elements(&doc)[1];
        let individual = creator.child_elements(&doc)[0];
        assert_eq!(dataset.name(&doc), "dataset");
        assert_eq!(title.text_content(&doc), "Elk Survey");
        assert_eq!(individual.name(&doc), "individualName");
        assert_eq!(dataset.child_elements(&doc).len(), 3);
        assert_eq!(dataset.find(&doc, "creator"), Some(creator));
        assert_eq!(creator.text_content(&doc), "Wapiti");
        assert!(dataset.find(&doc, "abstract").is_none());
        assert_eq!(individual.parent(&doc), Some(creator));
    }

    #[test]
    fn test_prefix_name() {
        let xml = r#"<eml:eml xmlns:eml="https://eml.ecoinformatics.org/eml-2.2.0" system="x"><dataset/></eml:eml>"#;
        let doc = Document::from_str(xml).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(root.prefix_name(&doc), ("eml", "eml"));
        assert_eq!(root.attribute(&doc, "system"), Some("x"));
        assert_eq!(
            root.namespace_decls(&doc).get("eml").map(|s| s.as_str()),
            Some("https://eml.ecoinformatics.org/eml-2.2.0")
        );
        let dataset = root.child_elements(&doc)[0];
        assert_eq!(dataset.prefix(&doc), "");
    }

    #[test]
    fn test_set_text_content_detaches_children() {
        let mut doc = Document::from_str("<a><b>x</b></a>").unwrap();
        let a = doc.root_element().unwrap();
        let b = a.child_elements(&doc)[0];
        a.set_text_content(&mut doc, "plain");
        assert!(!b.has_parent(&doc));
        assert!(a.child_elements(&doc).is_empty());
        assert_eq!(a.text_content(&doc), "plain");
    }

    #[test]
    fn test_detach_and_push() {
        let mut doc = Document::from_str("<a><b/><c/></a>").unwrap();
        let a = doc.root_element().unwrap();
        let b = a.find(&doc, "b").unwrap();
        let c = a.find(&doc, "c").unwrap();
        assert!(matches!(
            c.push_child(&mut doc, Node::Element(b)),
            Err(Error::HasAParent)
        ));
        b.detach(&mut doc).unwrap();
        c.push_child(&mut doc, Node::Element(b)).unwrap();
        assert_eq!(b.parent(&doc), Some(c));
        assert!(matches!(
            a.remove_child_elem(&mut doc, b),
            Err(Error::NotFound)
        ));
        let container = doc.container();
        assert!(matches!(
            container.detach(&mut doc),
            Err(Error::ContainerCannotMove)
        ));
    }

    #[test]
    fn test_to_value_tree_groups_repeats() {
        let xml = "<dataset><keywordSet><keyword>elk</keyword><keyword>survey</keyword></keywordSet></dataset>";
        let doc = Document::from_str(xml).unwrap();
        let set = doc.root_element().unwrap().child_elements(&doc)[0];
        let expected = ValueTree::single(
            "keywordSet",
            ValueTree::single("keyword", vec!["elk", "survey"]),
        );
        assert_eq!(set.to_value_tree(&doc), expected);
    }

    #[test]
    fn test_to_value_tree_keeps_order() {
        let xml = "<dataset><creator>A</creator><title>T</title><creator>B</creator></dataset>";
        let doc = Document::from_str(xml).unwrap();
        let expected = ValueTree::single(
            "dataset",
            ValueTree::mapping(vec![("creator", "A"), ("title", "T"), ("creator", "B")]),
        );
        assert_eq!(doc.root_element().unwrap().to_value_tree(&doc), expected);
    }
}
