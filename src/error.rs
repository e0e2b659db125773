use crate::path::SchemaPath;
use quick_xml::Error as XMLError;
use std::{str::Utf8Error, string::FromUtf8Error};

/// Wrapper around `std::Result`
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug)]
pub enum Error {
    /// [`std::io`] related error.
    Io(std::io::Error),
    /// Decoding related error.
    /// Maybe the XML declaration has an encoding value that it doesn't recognize,
    /// or it doesn't match its actual encoding,
    CannotDecode,
    /// Assorted errors while parsing XML.
    MalformedXML(String),
    /// The container element cannot have a parent.
    ContainerCannotMove,
    /// You need to call `element.detach()` before assigning another parent.
    HasAParent,
    /// Parsing is only allowed into an empty document.
    NotEmpty,
    /// Element was not found among its parent's children.
    NotFound,
    /// No element matches the schema path.
    NoSuchNode(SchemaPath),
    /// A value tree has a shape with no tag mapping, such as a list of lists.
    /// Holds the tag the offending value sits under.
    UnserializableStructure(String),
    /// The document has no root element to resolve paths against.
    StructuralIntegrity,
    /// The element to write under is repeated, so there is no single target.
    AmbiguousParent { path: SchemaPath, count: usize },
    /// A field value was rejected before touching the document.
    InvalidValue(String),
    /// Documents can only be saved to `.xml` files.
    InvalidFileName(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO Error: {}", err),
            Error::CannotDecode => write!(f, "Cannot decode XML"),
            Error::MalformedXML(err) => write!(f, "Malformed XML: {}", err),
            Error::ContainerCannotMove => write!(f, "Container element cannot move"),
            Error::HasAParent => write!(
                f,
                "Element already has a parent. Call detach() before changing parent."
            ),
            Error::NotEmpty => write!(f, "Document is not empty"),
            Error::NotFound => write!(f, "Element not found among children"),
            Error::NoSuchNode(path) => write!(f, "No element at `{}`", path),
            Error::UnserializableStructure(tag) => write!(
                f,
                "Value under `{}` has no unambiguous XML representation",
                tag
            ),
            Error::StructuralIntegrity => write!(f, "Document has no root element"),
            Error::AmbiguousParent { path, count } => write!(
                f,
                "Expected a single element at `{}`, found {}",
                path, count
            ),
            Error::InvalidValue(msg) => write!(f, "Invalid value: {}", msg),
            Error::InvalidFileName(name) => {
                write!(f, "Invalid file name `{}`, expected a .xml file", name)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<XMLError> for Error {
    fn from(err: XMLError) -> Error {
        match err {
            XMLError::EndEventMismatch { expected, found } => Error::MalformedXML(format!(
                "Closing tag mismatch. Expected {}, found {}",
                expected, found,
            )),
            XMLError::Io(err) => Error::Io(err),
            XMLError::Utf8(_) => Error::CannotDecode,
            err => Error::MalformedXML(err.to_string()),
        }
    }
}

impl From<FromUtf8Error> for Error {
    fn from(_: FromUtf8Error) -> Error {
        Error::CannotDecode
    }
}
impl From<Utf8Error> for Error {
    fn from(_: Utf8Error) -> Error {
        Error::CannotDecode
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
