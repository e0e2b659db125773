use crate::error::{Error, Result};
use std::fmt;

/// Leaf content of a [`ValueTree`], written as element text.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Blank text and the literal `"None"` count as no value.
pub(crate) fn is_blank_text(text: &str) -> bool {
    text.trim().is_empty() || text == "None"
}

impl Scalar {
    /// See [`ValueTree::prune_empty`].
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Text(text) => is_blank_text(text),
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Text(text) => write!(f, "{}", text),
            Scalar::Integer(n) => write!(f, "{}", n),
            Scalar::Float(n) => write!(f, "{}", n),
        }
    }
}

/// Nested values to be written as XML elements.
///
/// Every mapping key becomes a child tag; a [`ValueTree::Repeated`] value
/// becomes one sibling element per item, all with the same tag.
///
/// ```
/// use eml_doc::ValueTree;
///
/// // <keywordSet><keyword>elk</keyword><keyword>survey</keyword></keywordSet>
/// let tree = ValueTree::single("keywordSet", ValueTree::single("keyword", vec!["elk", "survey"]));
/// assert!(tree.get("keywordSet").is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum ValueTree {
    /// An unfilled slot. Removed by [`ValueTree::prune_empty`].
    Null,
    Scalar(Scalar),
    Mapping(Vec<(String, ValueTree)>),
    Repeated(Vec<ValueTree>),
}

impl ValueTree {
    pub fn mapping<I, K, V>(entries: I) -> ValueTree
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ValueTree>,
    {
        ValueTree::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// A mapping with one entry, `{tag: value}`.
    pub fn single<K: Into<String>, V: Into<ValueTree>>(tag: K, value: V) -> ValueTree {
        ValueTree::Mapping(vec![(tag.into(), value.into())])
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ValueTree::Null)
    }

    /// Value of the first entry named `tag`, if this is a mapping.
    pub fn get(&self, tag: &str) -> Option<&ValueTree> {
        match self {
            ValueTree::Mapping(entries) => entries.iter().find(|(k, _)| k == tag).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ValueTree::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Remove every null, blank or `"None"` scalar and every mapping or
    /// repeat left without entries, recursively.
    ///
    /// Returns `None` when nothing is left. Pruning a pruned tree returns it unchanged.
    pub fn prune_empty(self) -> Option<ValueTree> {
        match self {
            ValueTree::Null => None,
            ValueTree::Scalar(scalar) if scalar.is_blank() => None,
            ValueTree::Scalar(scalar) => Some(ValueTree::Scalar(scalar)),
            ValueTree::Mapping(entries) => {
                let entries: Vec<(String, ValueTree)> = entries
                    .into_iter()
                    .filter_map(|(tag, value)| value.prune_empty().map(|value| (tag, value)))
                    .collect();
                if entries.is_empty() {
                    None
                } else {
                    Some(ValueTree::Mapping(entries))
                }
            }
            ValueTree::Repeated(items) => {
                let items: Vec<ValueTree> =
                    items.into_iter().filter_map(ValueTree::prune_empty).collect();
                if items.is_empty() {
                    None
                } else {
                    Some(ValueTree::Repeated(items))
                }
            }
        }
    }

    /// Check that this tree can be written under an element named `parent_tag`.
    ///
    /// The top level must be a mapping (or null), and repeated items must be
    /// scalars or mappings.
    ///
    /// # Errors
    ///
    /// - [`Error::UnserializableStructure`]: names the tag the offending value sits under.
    pub fn check_serializable(&self, parent_tag: &str) -> Result<()> {
        match self {
            ValueTree::Null => Ok(()),
            ValueTree::Mapping(entries) => {
                for (tag, value) in entries {
                    value.check_entry(tag)?;
                }
                Ok(())
            }
            _ => Err(Error::UnserializableStructure(parent_tag.to_string())),
        }
    }

    fn check_entry(&self, tag: &str) -> Result<()> {
        match self {
            ValueTree::Null | ValueTree::Scalar(_) => Ok(()),
            ValueTree::Mapping(_) => self.check_serializable(tag),
            ValueTree::Repeated(items) => {
                for item in items {
                    match item {
                        ValueTree::Repeated(_) => {
                            return Err(Error::UnserializableStructure(tag.to_string()))
                        }
                        ValueTree::Mapping(_) => item.check_serializable(tag)?,
                        ValueTree::Null | ValueTree::Scalar(_) => {}
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<Scalar> for ValueTree {
    fn from(scalar: Scalar) -> Self {
        ValueTree::Scalar(scalar)
    }
}

impl From<&str> for ValueTree {
    fn from(text: &str) -> Self {
        ValueTree::Scalar(Scalar::Text(text.to_string()))
    }
}

impl From<String> for ValueTree {
    fn from(text: String) -> Self {
        ValueTree::Scalar(Scalar::Text(text))
    }
}

impl From<&String> for ValueTree {
    fn from(text: &String) -> Self {
        ValueTree::Scalar(Scalar::Text(text.clone()))
    }
}

impl From<i64> for ValueTree {
    fn from(n: i64) -> Self {
        ValueTree::Scalar(Scalar::Integer(n))
    }
}

impl From<i32> for ValueTree {
    fn from(n: i32) -> Self {
        ValueTree::Scalar(Scalar::Integer(i64::from(n)))
    }
}

impl From<u32> for ValueTree {
    fn from(n: u32) -> Self {
        ValueTree::Scalar(Scalar::Integer(i64::from(n)))
    }
}

impl From<f64> for ValueTree {
    fn from(n: f64) -> Self {
        ValueTree::Scalar(Scalar::Float(n))
    }
}

impl<T: Into<ValueTree>> From<Option<T>> for ValueTree {
    fn from(value: Option<T>) -> Self {
        value.map_or(ValueTree::Null, Into::into)
    }
}

impl<T: Into<ValueTree>> From<Vec<T>> for ValueTree {
    fn from(items: Vec<T>) -> Self {
        ValueTree::Repeated(items.into_iter().map(Into::into).collect())
    }
}
