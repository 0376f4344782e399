//! The tree abstraction the transformation engine reads from and writes into.
//!
//! A [`Document`] owns its nodes in an arena; [`XmlNode`] is a cheap `Copy` handle
//! into it. Source, stylesheet and output trees are all plain documents, and the
//! output document doubles as the node factory handed to the engine.

pub mod datasource;
pub mod document;
pub mod error;
pub mod parse;
pub mod serialize;

pub use document::{Document, NodeId, NodeKind, XmlNode};
pub use error::DomError;
pub use serialize::{SerializeOptions, escape_attribute, escape_text, xml_text, xml_value};

/// Namespace URI permanently bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
