use crate::document::{Document, WriteOptions};
use crate::element::Element;
use crate::error::{Error, Result};
use crate::fields::{Field, FieldValue};
use crate::path::SchemaPath;
use crate::value::ValueTree;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, warn};

pub const EML_NAMESPACE: &str = "https://eml.ecoinformatics.org/eml-2.2.0";
const ROOT_TAG: &str = "eml:eml";
const SYSTEM: &str = "eml-doc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Overwrite,
    Delete,
}

/// Passed to the confirmation callback before existing elements are replaced or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub field: Field,
    pub action: Action,
    /// The elements that would be lost, as `{tag: content}` trees.
    pub existing: Vec<ValueTree>,
}

/// Outcome of an edit that may need confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit {
    Applied,
    /// The confirmation callback declined. The document is unchanged.
    Declined,
}

type Confirm = Box<dyn FnMut(&Confirmation) -> bool>;

/// An editing session over one EML document.
///
/// ```
/// use eml_doc::{Eml, FieldValue};
///
/// let mut eml = Eml::new();
/// eml.set(FieldValue::Title("Elk Survey 2024".to_string())).unwrap();
/// let xml = eml.document().write_str().unwrap();
/// assert!(xml.contains("<dataset>"));
/// ```
pub struct Eml {
    document: Document,
    confirm: Option<Confirm>,
}

impl fmt::Debug for Eml {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Eml")
            .field("document", &self.document)
            .field("confirm", &self.confirm.is_some())
            .finish()
    }
}

impl Eml {
    /// An empty `<eml:eml>` document.
    pub fn new() -> Eml {
        let mut document = Document::with_root(ROOT_TAG);
        if let Some(root) = document.root_element() {
            root.mut_namespace_decls(&mut document)
                .insert("eml".to_string(), EML_NAMESPACE.to_string());
            root.mut_attributes(&mut document)
                .insert("system".to_string(), SYSTEM.to_string());
        }
        Eml {
            document,
            confirm: None,
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Eml> {
        let path = path.as_ref();
        let document = Document::parse_file(path)?;
        info!(path = %path.display(), "opened document");
        Ok(Eml::from_document(document))
    }

    /// Wrap a parsed document. A `system` attribute is added to the root
    /// element if it has none.
    pub fn from_document(mut document: Document) -> Eml {
        if let Some(root) = document.root_element() {
            root.mut_attributes(&mut document)
                .entry("system".to_string())
                .or_insert_with(|| SYSTEM.to_string());
        }
        Eml {
            document,
            confirm: None,
        }
    }

    /// Ask `confirm` before overwriting or deleting existing elements.
    /// Returning `false` cancels the edit.
    pub fn with_confirmation<F>(mut self, confirm: F) -> Eml
    where
        F: FnMut(&Confirmation) -> bool + 'static,
    {
        self.confirm = Some(Box::new(confirm));
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Elements holding `field`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchNode`]: the field is not in the document.
    pub fn get(&self, field: Field) -> Result<Vec<Element>> {
        let path = field.spec().path;
        let found = self.document.find(&path);
        if found.is_empty() {
            return Err(Error::NoSuchNode(path));
        }
        Ok(found)
    }

    /// Elements holding `field`, read back as `{tag: content}` trees.
    pub fn get_trees(&self, field: Field) -> Result<Vec<ValueTree>> {
        Ok(self
            .get(field)?
            .iter()
            .map(|elem| elem.to_value_tree(&self.document))
            .collect())
    }

    /// Validate `value` and write it in place of the field's current elements.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidValue`]: `value` is malformed or holds nothing but
    ///   blanks. Nothing is written.
    /// - see [`Eml::set_tree`].
    pub fn set(&mut self, value: FieldValue) -> Result<Edit> {
        value.validate()?;
        let field = value.field();
        let tree = value.to_tree();
        if tree.clone().prune_empty().is_none() {
            return Err(Error::InvalidValue(format!("{} has no values", field)));
        }
        self.set_tree(field, tree)
    }

    /// Write `tree` under the field's parent, replacing the field's current elements.
    ///
    /// `tree` is keyed by the field's tag, e.g. `{title: "..."}`.
    pub fn set_tree(&mut self, field: Field, tree: ValueTree) -> Result<Edit> {
        let spec = field.spec();
        if !self.confirmed(field, Action::Overwrite) {
            return Ok(Edit::Declined);
        }
        self.document.set(&spec.path, &spec.parent, tree)?;
        debug!(%field, "field set");
        Ok(Edit::Applied)
    }

    /// Remove every element holding `field`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchNode`]: the field is not in the document.
    pub fn delete(&mut self, field: Field) -> Result<Edit> {
        let path = field.spec().path;
        if self.document.find(&path).is_empty() {
            return Err(Error::NoSuchNode(path));
        }
        if !self.confirmed(field, Action::Delete) {
            return Ok(Edit::Declined);
        }
        let count = self.document.delete_all(&path)?;
        debug!(%field, count, "field deleted");
        Ok(Edit::Applied)
    }

    /// Record this editor's name and release in `additionalMetadata`.
    pub fn stamp_version(&mut self) -> Result<()> {
        let spec = Field::Version.spec();
        self.document
            .set(&spec.path, &spec.parent, FieldValue::Version.to_tree())
    }

    /// Write the document to `path`, which must end in `.xml`.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with_opts(path, &WriteOptions::default())
    }

    pub fn save_with_opts<P: AsRef<Path>>(&self, path: P, opts: &WriteOptions) -> Result<()> {
        let path = path.as_ref();
        let is_xml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("xml"));
        if !is_xml {
            return Err(Error::InvalidFileName(path.display().to_string()));
        }
        let xml = self.document.write_str_with_opts(opts)?;
        std::fs::write(path, xml)?;
        info!(path = %path.display(), "saved document");
        Ok(())
    }

    /// Tag outline of the elements at `path`, `depth` levels deep.
    ///
    /// Leaf elements show their text. Attributes and namespaces are left out.
    ///
    /// ```text
    /// <dataset>
    ///     <title>
    ///         Elk Survey
    ///     </title>
    /// </dataset>
    /// ```
    pub fn overview(&self, path: &SchemaPath, depth: usize) -> String {
        let mut out = String::new();
        for elem in self.document.find(path) {
            self.outline(elem, 0, depth, &mut out);
        }
        out
    }

    fn outline(&self, elem: Element, level: usize, depth: usize, out: &mut String) {
        let indent = "    ".repeat(level);
        let name = elem.full_name(&self.document);
        out.push_str(&format!("{}<{}>\n", indent, name));
        let children = elem.child_elements(&self.document);
        if children.is_empty() {
            let text = elem.text_content(&self.document);
            if !text.is_empty() {
                out.push_str(&format!("{}    {}\n", indent, text));
            }
        } else if level < depth {
            for child in children {
                self.outline(child, level + 1, depth, out);
            }
        } else {
            out.push_str(&format!("{}    ...\n", indent));
        }
        out.push_str(&format!("{}</{}>\n", indent, name));
    }

    fn confirmed(&mut self, field: Field, action: Action) -> bool {
        let confirm = match self.confirm.as_mut() {
            Some(confirm) => confirm,
            None => return true,
        };
        let existing: Vec<ValueTree> = self
            .document
            .find(&field.spec().path)
            .iter()
            .map(|elem| elem.to_value_tree(&self.document))
            .collect();
        if existing.is_empty() {
            return true;
        }
        let accepted = confirm(&Confirmation {
            field,
            action,
            existing,
        });
        if !accepted {
            warn!(%field, ?action, "edit declined");
        }
        accepted
    }
}

impl FromStr for Eml {
    type Err = Error;

    fn from_str(xml: &str) -> Result<Eml> {
        Ok(Eml::from_document(Document::parse_str(xml)?))
    }
}

impl Default for Eml {
    fn default() -> Self {
        Eml::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{Cui, Party};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_new_root() {
        let eml = Eml::new();
        let doc = eml.document();
        let root = doc.root_element().unwrap();
        assert_eq!(root.full_name(doc), ROOT_TAG);
        assert_eq!(root.attribute(doc, "system"), Some(SYSTEM));
        assert_eq!(
            root.namespace_decls(doc).get("eml").map(String::as_str),
            Some(EML_NAMESPACE)
        );
    }

    #[test]
    fn test_set_get_delete() {
        let mut eml = Eml::new();
        assert!(matches!(eml.get(Field::Title), Err(Error::NoSuchNode(_))));
        assert_eq!(
            eml.set(FieldValue::Title("Elk Survey".to_string())).unwrap(),
            Edit::Applied
        );
        assert_eq!(
            eml.get_trees(Field::Title).unwrap(),
            vec![ValueTree::single("title", "Elk Survey")]
        );
        eml.set(FieldValue::Cui(Cui::FederalOnly)).unwrap();
        assert_eq!(
            eml.get_trees(Field::Cui).unwrap(),
            vec![ValueTree::single("CUI", "FED_ONLY")]
        );
        assert_eq!(eml.delete(Field::Title).unwrap(), Edit::Applied);
        assert!(eml.get(Field::Title).is_err());
        assert!(matches!(eml.delete(Field::Title), Err(Error::NoSuchNode(_))));
    }

    #[test]
    fn test_invalid_value_leaves_document() {
        let mut eml = Eml::new();
        let before = eml.document().write_str().unwrap();
        assert!(matches!(
            eml.set(FieldValue::Title("  ".to_string())),
            Err(Error::InvalidValue(_))
        ));
        assert_eq!(eml.document().write_str().unwrap(), before);
    }

    #[test]
    fn test_blank_party_keeps_creators() {
        let xml = r#"<eml:eml xmlns:eml="https://eml.ecoinformatics.org/eml-2.2.0"><dataset>
            <creator><individualName><surName>Smith</surName></individualName></creator>
            <creator><organizationName>NPS</organizationName></creator>
        </dataset></eml:eml>"#;
        let mut eml = Eml::from_str(xml).unwrap();
        let before = eml.document().write_str().unwrap();
        let blank = Party {
            given_name: Some("None".to_string()),
            sur_name: Some("  ".to_string()),
            ..Party::default()
        };
        assert!(matches!(
            eml.set(FieldValue::Creator(blank)),
            Err(Error::InvalidValue(_))
        ));
        assert_eq!(eml.get(Field::Creator).unwrap().len(), 2);
        assert_eq!(eml.document().write_str().unwrap(), before);
    }

    #[test]
    fn test_tree_for_other_field_is_rejected() {
        let mut eml = Eml::new();
        eml.set(FieldValue::Title("Elk Survey".to_string())).unwrap();
        assert!(matches!(
            eml.set_tree(Field::Title, ValueTree::single("abstract", "x")),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(eml.get(Field::Abstract), Err(Error::NoSuchNode(_))));
        assert_eq!(
            eml.get_trees(Field::Title).unwrap(),
            vec![ValueTree::single("title", "Elk Survey")]
        );
    }

    #[test]
    fn test_confirmation() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        let mut eml = Eml::new().with_confirmation(move |c: &Confirmation| {
            log.borrow_mut().push((c.field, c.action, c.existing.len()));
            false
        });
        // Nothing to lose, so no prompt.
        eml.set(FieldValue::Creator(Party {
            sur_name: Some("Wapiti".to_string()),
            ..Party::default()
        }))
        .unwrap();
        assert!(seen.borrow().is_empty());

        let before = eml.document().write_str().unwrap();
        let edit = eml
            .set(FieldValue::Creator(Party {
                organization_name: Some("NPS".to_string()),
                ..Party::default()
            }))
            .unwrap();
        assert_eq!(edit, Edit::Declined);
        assert_eq!(eml.delete(Field::Creator).unwrap(), Edit::Declined);
        assert_eq!(eml.document().write_str().unwrap(), before);
        assert_eq!(
            *seen.borrow(),
            vec![
                (Field::Creator, Action::Overwrite, 1),
                (Field::Creator, Action::Delete, 1)
            ]
        );
    }

    #[test]
    fn test_stamp_version_twice() {
        let mut eml = Eml::new();
        eml.stamp_version().unwrap();
        eml.stamp_version().unwrap();
        let trees = eml.get_trees(Field::Version).unwrap();
        assert_eq!(trees.len(), 1);
        let stamp = trees[0].get("emlEditor").unwrap();
        assert_eq!(
            stamp.get("release").and_then(ValueTree::as_scalar).map(|s| s.to_string()),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_from_str_keeps_system() {
        let eml: Eml = r#"<eml:eml xmlns:eml="https://eml.ecoinformatics.org/eml-2.2.0" system="knb"><dataset/></eml:eml>"#
            .parse()
            .unwrap();
        let doc = eml.document();
        assert_eq!(doc.root_element().unwrap().attribute(doc, "system"), Some("knb"));

        let eml: Eml = "<eml><dataset/></eml>".parse().unwrap();
        let doc = eml.document();
        assert_eq!(doc.root_element().unwrap().attribute(doc, "system"), Some(SYSTEM));
    }

    #[test]
    fn test_save_requires_xml() {
        let eml = Eml::new();
        assert!(matches!(
            eml.save("metadata.json"),
            Err(Error::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_overview() {
        let mut eml = Eml::new();
        eml.set(FieldValue::Title("Elk Survey".to_string())).unwrap();
        eml.set(FieldValue::Keywords(vec!["elk".to_string()])).unwrap();
        let outline = eml.overview(&"dataset".parse().unwrap(), 1);
        let expected = "<dataset>\n    <title>\n        Elk Survey\n    </title>\n    <keywordSet>\n        ...\n    </keywordSet>\n</dataset>\n";
        assert_eq!(outline, expected);
    }
}
