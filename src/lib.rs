//! Read, edit and write EML (Ecological Metadata Language) documents.
//!
//! A [`Document`] is parsed with quick-xml into an arena of elements. Values
//! are written with [`Document::set`], which takes a [`SchemaPath`] and a
//! [`ValueTree`], creates whatever ancestors are missing and replaces the
//! elements already there. [`Eml`] wraps a document with the well-known EML
//! [`Field`]s.
//!
//! ```
//! use eml_doc::{Document, SchemaPath, ValueTree};
//!
//! let mut doc = Document::parse_str("<eml/>").unwrap();
//! let path: SchemaPath = "dataset/coverage/temporalCoverage".parse().unwrap();
//! let parent = path.parent().unwrap();
//! let tree = ValueTree::single(
//!     "temporalCoverage",
//!     ValueTree::single("rangeOfDates", ValueTree::single("beginDate", "2024-05-01")),
//! );
//! doc.set(&path, &parent, tree).unwrap();
//! assert_eq!(doc.find(&path).len(), 1);
//! ```

mod document;
mod element;
mod eml;
mod error;
mod fields;
mod parser;
mod path;
mod synth;
mod value;

pub use crate::document::{Document, Node, WriteOptions};
pub use crate::element::Element;
pub use crate::eml::{Action, Confirmation, Edit, Eml, EML_NAMESPACE};
pub use crate::error::{Error, Result};
pub use crate::fields::{
    BoundingBox, Cui, Field, FieldSpec, FieldValue, GeographicCoverage, License, Party, Publisher,
    UsageCitation, APP_NAME, APP_RELEASE,
};
pub use crate::parser::ReadOptions;
pub use crate::path::{AncestorPresence, SchemaPath};
pub use crate::synth::rebuild_under_missing_ancestors;
pub use crate::value::{Scalar, ValueTree};
