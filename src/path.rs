use crate::document::Document;
use crate::element::Element;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Tag names locating a family of elements, starting below the root element.
///
/// `[dataset, creator]` matches every `<creator>` that is a child of a
/// `<dataset>` that is a child of the root element. The empty path denotes
/// the root element itself.
///
/// Parses from `"dataset/creator"`, `"./dataset/creator"` or `"dataset.creator"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaPath {
    segments: Vec<String>,
}

impl SchemaPath {
    pub fn new<I, S>(segments: I) -> SchemaPath
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SchemaPath {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The path of the root element.
    pub fn root() -> SchemaPath {
        SchemaPath {
            segments: Vec::new(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Tag of the elements this path matches.
    pub fn tag(&self) -> Option<&str> {
        self.segments.last().map(|s| s.as_str())
    }

    /// This path without its last segment.
    pub fn parent(&self) -> Option<SchemaPath> {
        if self.is_root() {
            return None;
        }
        Some(self.truncated(self.len() - 1))
    }

    /// The first `len` segments of this path.
    pub fn truncated(&self, len: usize) -> SchemaPath {
        SchemaPath::new(self.segments.iter().take(len).cloned())
    }

    pub fn starts_with(&self, prefix: &SchemaPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn join<S: Into<String>>(&self, tag: S) -> SchemaPath {
        let mut segments = self.segments.clone();
        segments.push(tag.into());
        SchemaPath { segments }
    }

    /// Every truncation of this path, longest first, down to a single segment.
    ///
    /// `dataset/coverage/temporalCoverage` gives
    /// `[dataset/coverage/temporalCoverage, dataset/coverage, dataset]`.
    pub fn ancestor_chain(&self) -> Vec<SchemaPath> {
        (1..=self.len()).rev().map(|len| self.truncated(len)).collect()
    }
}

impl FromStr for SchemaPath {
    type Err = Error;

    fn from_str(s: &str) -> Result<SchemaPath> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
        if trimmed.is_empty() || trimmed == "." {
            return Ok(SchemaPath::root());
        }
        let segments: Vec<&str> = trimmed.split(|c| c == '/' || c == '.').collect();
        if segments.iter().any(|seg| seg.trim().is_empty()) {
            return Err(Error::InvalidValue(format!("empty segment in path `{}`", s)));
        }
        Ok(SchemaPath::new(segments.into_iter().map(str::trim)))
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return write!(f, ".");
        }
        write!(f, "{}", self.segments.join("/"))
    }
}

/// Which entries of a path's ancestor chain currently exist in a document.
///
/// Entries keep the order of [`SchemaPath::ancestor_chain`], longest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorPresence {
    entries: Vec<(SchemaPath, bool)>,
    root_present: bool,
}

impl AncestorPresence {
    pub fn iter(&self) -> impl Iterator<Item = (&SchemaPath, bool)> {
        self.entries.iter().map(|(path, present)| (path, *present))
    }

    pub fn is_present(&self, path: &SchemaPath) -> Option<bool> {
        if path.is_root() {
            return Some(self.root_present);
        }
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, present)| *present)
    }

    /// The longest path in the chain that exists.
    ///
    /// Falls back to the root element when no chain entry exists.
    ///
    /// # Errors
    ///
    /// - [`Error::StructuralIntegrity`]: the document has no root element.
    pub fn deepest_existing(&self) -> Result<SchemaPath> {
        if let Some((path, _)) = self.entries.iter().find(|(_, present)| *present) {
            return Ok(path.clone());
        }
        if self.root_present {
            Ok(SchemaPath::root())
        } else {
            Err(Error::StructuralIntegrity)
        }
    }

    /// The longest path in the chain that does not exist, `None` if the whole chain exists.
    pub fn deepest_missing(&self) -> Option<&SchemaPath> {
        self.entries
            .iter()
            .find(|(_, present)| !*present)
            .map(|(path, _)| path)
    }

    /// Tags of the absent ancestors up to and including `parent`, nearest-missing first.
    ///
    /// For `dataset/coverage/temporalCoverage` with only the root present and
    /// `parent = dataset/coverage` this is `[coverage, dataset]`.
    pub fn missing_suffix(&self, parent: &SchemaPath) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(path, present)| !*present && parent.starts_with(path))
            .filter_map(|(path, _)| path.tag().map(str::to_string))
            .collect()
    }
}

impl Document {
    /// All elements matching `path`, in document order.
    ///
    /// An empty result is not an error.
    pub fn find(&self, path: &SchemaPath) -> Vec<Element> {
        let root = match self.root_element() {
            Some(root) => root,
            None => return Vec::new(),
        };
        let mut matches = vec![root];
        for segment in path.segments() {
            matches = matches
                .iter()
                .flat_map(|elem| elem.find_all(self, segment))
                .collect();
            if matches.is_empty() {
                break;
            }
        }
        matches
    }

    /// Presence of every entry of `path.ancestor_chain()`.
    pub fn missing_ancestors(&self, path: &SchemaPath) -> AncestorPresence {
        let entries = path
            .ancestor_chain()
            .into_iter()
            .map(|ancestor| {
                let present = !self.find(&ancestor).is_empty();
                (ancestor, present)
            })
            .collect();
        AncestorPresence {
            entries,
            root_present: self.root_element().is_some(),
        }
    }

    /// The single element at `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoSuchNode`]: nothing matches.
    /// - [`Error::AmbiguousParent`]: more than one element matches.
    pub fn find_one(&self, path: &SchemaPath) -> Result<Element> {
        let found = self.find(path);
        match found.as_slice() {
            [] => Err(Error::NoSuchNode(path.clone())),
            [one] => Ok(*one),
            _ => Err(Error::AmbiguousParent {
                path: path.clone(),
                count: found.len(),
            }),
        }
    }
}
