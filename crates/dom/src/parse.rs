//! Loads XML text into a [`Document`] through roxmltree.

use crate::XML_NAMESPACE;
use crate::document::{Document, XmlNode};
use crate::error::DomError;
use roxmltree::NodeType as SourceType;
use weft_xpath1::QName;

impl Document {
    /// Parses `text` into a new mutable document.
    ///
    /// roxmltree resolves entities and namespaces; element and attribute prefixes
    /// are recovered from the declarations in scope. Namespace declarations
    /// themselves are not materialized as attributes.
    pub fn parse(text: &str) -> Result<Document, DomError> {
        let mut options = roxmltree::ParsingOptions::default();
        options.allow_dtd = true;
        let source = roxmltree::Document::parse_with_options(text, options)?;

        let doc = Document::new();
        let root = doc.root();
        for child in source.root().children() {
            load(&doc, root, child)?;
        }
        log::debug!("Parsed document with {} nodes", doc.node_count());
        Ok(doc)
    }
}

fn qualified(node: roxmltree::Node<'_, '_>, namespace: Option<&str>, local: &str) -> QName {
    let prefix = namespace
        .and_then(|uri| {
            if uri == XML_NAMESPACE {
                Some("xml")
            } else {
                node.lookup_prefix(uri)
            }
        })
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string);
    QName {
        prefix,
        local_part: local.to_string(),
    }
}

fn load<'d>(
    doc: &'d Document,
    parent: XmlNode<'d>,
    node: roxmltree::Node<'_, '_>,
) -> Result<(), DomError> {
    let created = match node.node_type() {
        SourceType::Element => {
            let tag = node.tag_name();
            let element = doc.create_element_qname(qualified(node, tag.namespace(), tag.name()));
            for attr in node.attributes() {
                let name = qualified(node, attr.namespace(), attr.name());
                element.set_attribute(&name.to_string(), attr.value())?;
            }
            for child in node.children() {
                load(doc, element, child)?;
            }
            element
        }
        SourceType::Text => doc.create_text(node.text().unwrap_or_default()),
        SourceType::Comment => doc.create_comment(node.text().unwrap_or_default()),
        SourceType::PI => match node.pi() {
            Some(pi) => doc.create_processing_instruction(pi.target, pi.value.unwrap_or_default()),
            None => return Ok(()),
        },
        SourceType::Root => return Ok(()),
    };
    parent.append_child(created)
}
