//! Node copying for `xsl:copy` and `xsl:copy-of`.

use crate::error::XsltError;
use weft_dom::{NodeKind, XmlNode};

/// Copies `src` (but not its attributes or children) into `dst`. Returns the
/// new element when `src` is an element. Attributes are set on `dst`;
/// document, fragment and processing-instruction nodes produce nothing.
pub(crate) fn copy_node<'o>(
    dst: XmlNode<'o>,
    src: XmlNode<'_>,
) -> Result<Option<XmlNode<'o>>, XsltError> {
    let doc = dst.document();
    let created = match src.kind() {
        NodeKind::Element => {
            let element = doc.create_element(&src.qualified_name());
            dst.append_child(element)?;
            return Ok(Some(element));
        }
        NodeKind::Text => doc.create_text(&src.value()),
        NodeKind::CData => doc.create_cdata(&src.value()),
        NodeKind::Comment => doc.create_comment(&src.value()),
        NodeKind::Attribute => {
            let name = src.qualified_name();
            if !dst.is_element() {
                return Err(XsltError::NotAnElement {
                    name,
                    kind: dst.kind().to_string(),
                });
            }
            dst.set_attribute(&name, &src.value())?;
            return Ok(None);
        }
        NodeKind::Document | NodeKind::Fragment | NodeKind::ProcessingInstruction => {
            return Ok(None);
        }
    };
    dst.append_child(created)?;
    Ok(None)
}

/// Copies `src` with its attributes and descendants into `dst`. Documents and
/// fragments contribute their children.
pub(crate) fn copy_of<'o>(dst: XmlNode<'o>, src: XmlNode<'_>) -> Result<(), XsltError> {
    match src.kind() {
        NodeKind::Document | NodeKind::Fragment => {
            for child in src.children() {
                copy_of(dst, child)?;
            }
        }
        NodeKind::Element => {
            if let Some(element) = copy_node(dst, src)? {
                for attr in src.attributes() {
                    copy_node(element, attr)?;
                }
                for child in src.children() {
                    copy_of(element, child)?;
                }
            }
        }
        _ => {
            copy_node(dst, src)?;
        }
    }
    Ok(())
}
