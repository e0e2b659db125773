use crate::document::Document;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::path::SchemaPath;
use crate::value::ValueTree;
use tracing::{debug, trace};

/// Wrap `tree` in the missing ancestor tags.
///
/// `missing` lists the absent ancestors nearest-missing first, so the first
/// tag becomes the innermost wrapper and the last tag the outermost one.
/// `["coverage", "dataset"]` turns `T` into `{dataset: {coverage: T}}`.
///
/// # Panics
///
/// Panics if `missing` is empty. Write the tree directly under the parent instead.
pub fn rebuild_under_missing_ancestors<S: AsRef<str>>(tree: ValueTree, missing: &[S]) -> ValueTree {
    assert!(
        !missing.is_empty(),
        "no missing ancestors to rebuild the value tree under"
    );
    missing
        .iter()
        .fold(tree, |inner, tag| ValueTree::single(tag.as_ref(), inner))
}

impl Document {
    /// Write `tree` as children of `parent`.
    ///
    /// Scalars become text elements, mappings become nested elements and
    /// repeated values become one sibling element per item. [`ValueTree::Null`]
    /// entries are skipped. The tree is checked before anything is written, so
    /// on error the document is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::UnserializableStructure`]: the tree is not a mapping, or holds a repeat inside a repeat.
    pub fn serialize(&mut self, tree: &ValueTree, parent: Element) -> Result<()> {
        let parent_tag = parent.full_name(self).to_string();
        tree.check_serializable(&parent_tag)?;
        self.write_tree(tree, parent)
    }

    fn write_tree(&mut self, tree: &ValueTree, parent: Element) -> Result<()> {
        match tree {
            ValueTree::Null => Ok(()),
            ValueTree::Mapping(entries) => {
                for (tag, value) in entries {
                    self.write_entry(tag, value, parent)?;
                }
                Ok(())
            }
            _ => Err(Error::UnserializableStructure(
                parent.full_name(self).to_string(),
            )),
        }
    }

    fn write_entry(&mut self, tag: &str, value: &ValueTree, parent: Element) -> Result<()> {
        match value {
            ValueTree::Null => Ok(()),
            ValueTree::Scalar(scalar) => {
                let elem = Element::new_child(self, parent, tag);
                elem.set_text_content(self, scalar.to_string());
                Ok(())
            }
            ValueTree::Mapping(_) => {
                let elem = Element::new_child(self, parent, tag);
                self.write_tree(value, elem)
            }
            ValueTree::Repeated(items) => {
                for item in items {
                    if let ValueTree::Repeated(_) = item {
                        return Err(Error::UnserializableStructure(tag.to_string()));
                    }
                    self.write_entry(tag, item, parent)?;
                }
                Ok(())
            }
        }
    }

    /// Remove every element matching `path`. Returns how many were removed.
    ///
    /// The removed subtrees are released and their slots reused by later
    /// insertions, so handles to them must not be used afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchNode`]: nothing matches `path`.
    pub fn delete_all(&mut self, path: &SchemaPath) -> Result<usize> {
        let found = self.find(path);
        if found.is_empty() {
            return Err(Error::NoSuchNode(path.clone()));
        }
        for elem in &found {
            elem.detach(self)?;
            elem.release(self);
        }
        debug!(%path, count = found.len(), "deleted elements");
        Ok(found.len())
    }

    /// Replace whatever is at `path` with `tree`.
    ///
    /// `tree` is the content of `expected_parent`. For `path = dataset/title`
    /// and `expected_parent = dataset` it looks like `{title: "..."}`; with
    /// `expected_parent` set to the root it is `{dataset: {title: "..."}}`.
    /// Wrappers for ancestors that already exist are not written again.
    ///
    /// Existing elements at `path` are deleted, `tree` is pruned, and the
    /// result is written under the parent of `path`, creating whichever of its
    /// ancestors don't exist yet. Calling `set` twice with the same arguments
    /// gives the same document as calling it once. If nothing is left after
    /// pruning, the old elements are still removed and no ancestor is created.
    ///
    /// Every check runs before the document is touched, so on error it is unchanged.
    ///
    /// # Errors
    ///
    /// - [`Error::UnserializableStructure`]: see [`Document::serialize`].
    /// - [`Error::InvalidValue`]: `tree` holds tags that don't lead to `path`.
    /// - [`Error::StructuralIntegrity`]: the document has no root element.
    /// - [`Error::AmbiguousParent`]: the deepest existing ancestor is repeated.
    ///
    /// # Panics
    ///
    /// Panics if `expected_parent` is not a strict prefix of `path`.
    pub fn set(
        &mut self,
        path: &SchemaPath,
        expected_parent: &SchemaPath,
        tree: ValueTree,
    ) -> Result<()> {
        assert!(
            path.starts_with(expected_parent) && expected_parent.len() < path.len(),
            "`{}` is not an ancestor of `{}`",
            expected_parent,
            path
        );
        let root = self.root_element().ok_or(Error::StructuralIntegrity)?;
        let tree = match tree.prune_empty() {
            Some(tree) => {
                let parent_tag = match expected_parent.tag() {
                    Some(tag) => tag.to_string(),
                    None => root.full_name(self).to_string(),
                };
                tree.check_serializable(&parent_tag)?;
                narrow_to_parent(tree, path, expected_parent)?
            }
            None => {
                trace!(%path, "value tree is empty after pruning");
                ValueTree::Null
            }
        };

        // Deleting `path` leaves its ancestors alone, so the anchor can be
        // resolved before anything is removed.
        let parent = path.truncated(path.len() - 1);
        let presence = self.missing_ancestors(&parent);
        let anchor_path = presence.deepest_existing()?;
        let anchor = if anchor_path.is_root() {
            root
        } else {
            self.find_one(&anchor_path)?
        };

        match self.delete_all(path) {
            Ok(_) | Err(Error::NoSuchNode(_)) => {}
            Err(err) => return Err(err),
        }
        if tree.is_null() {
            return Ok(());
        }

        if anchor_path == parent {
            debug!(%path, "writing under existing parent");
            self.write_tree(&tree, anchor)
        } else {
            let missing = presence.missing_suffix(&parent);
            debug!(%path, anchor = %anchor_path, ?missing, "creating missing ancestors");
            let wrapped = rebuild_under_missing_ancestors(tree, &missing);
            self.write_tree(&wrapped, anchor)
        }
    }
}

/// Strip the wrappers between `expected_parent` and the parent of `path`
/// from a pruned tree, leaving `{tag: ...}` entries for the last segment only.
fn narrow_to_parent(
    tree: ValueTree,
    path: &SchemaPath,
    expected_parent: &SchemaPath,
) -> Result<ValueTree> {
    let segments = path.segments();
    let mut tree = tree;
    for depth in expected_parent.len()..segments.len() - 1 {
        let wrapper = &segments[depth];
        tree = match tree {
            ValueTree::Mapping(mut entries) if entries.len() == 1 && entries[0].0 == *wrapper => {
                entries.swap_remove(0).1
            }
            _ => {
                return Err(Error::InvalidValue(format!(
                    "value under `{}` must be a single `{}` entry",
                    path.truncated(depth),
                    wrapper
                )))
            }
        };
    }
    let tag = &segments[segments.len() - 1];
    match &tree {
        ValueTree::Mapping(entries) if entries.iter().all(|(key, _)| key == tag) => Ok(tree),
        _ => Err(Error::InvalidValue(format!(
            "value under `{}` must only hold `{}` entries",
            path.truncated(segments.len() - 1),
            tag
        ))),
    }
}
