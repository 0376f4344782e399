//! Renders nodes back to XML text.

use crate::document::{NodeKind, XmlNode};
use quick_xml::escape::partial_escape;

/// Serializer switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Emit CDATA sections as their raw content instead of `<![CDATA[...]]>`.
    pub cdata: bool,
}

/// Escapes `&`, `<` and `>` for character data. An `&amp;` already present in
/// the input stays `&amp;`.
pub fn escape_text(s: &str) -> String {
    partial_escape(s).replace("&amp;amp;", "&amp;")
}

/// Escapes a value for a double-quoted attribute.
pub fn escape_attribute(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

/// The text value of a node: character data for text, CDATA and attributes,
/// the concatenated descendant text for containers, nothing otherwise.
pub fn xml_value(node: XmlNode<'_>) -> String {
    match node.kind() {
        NodeKind::Text | NodeKind::CData | NodeKind::Attribute => node.value(),
        NodeKind::Element | NodeKind::Document | NodeKind::Fragment => node.text_content(),
        NodeKind::Comment | NodeKind::ProcessingInstruction => String::new(),
    }
}

/// Serializes a node and its subtree. Attributes with an empty value are
/// written as `name=""`, never dropped.
pub fn xml_text(node: XmlNode<'_>, options: &SerializeOptions) -> String {
    let mut buf = String::new();
    write_node(node, options, &mut buf);
    buf
}

fn write_node(node: XmlNode<'_>, options: &SerializeOptions, buf: &mut String) {
    match node.kind() {
        NodeKind::Text => buf.push_str(&escape_text(&node.value())),
        NodeKind::CData => {
            if options.cdata {
                buf.push_str(&node.value());
            } else {
                buf.push_str("<![CDATA[");
                buf.push_str(&node.value());
                buf.push_str("]]>");
            }
        }
        NodeKind::Comment => {
            buf.push_str("<!--");
            buf.push_str(&node.value());
            buf.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            buf.push_str("<?");
            buf.push_str(&node.qualified_name());
            let data = node.value();
            if !data.is_empty() {
                buf.push(' ');
                buf.push_str(&data);
            }
            buf.push_str("?>");
        }
        NodeKind::Element => {
            let name = node.qualified_name();
            buf.push('<');
            buf.push_str(&name);
            for attr in node.attributes() {
                buf.push(' ');
                buf.push_str(&attr.qualified_name());
                buf.push_str("=\"");
                buf.push_str(&escape_attribute(&attr.value()));
                buf.push('"');
            }
            let children = node.children();
            if children.is_empty() {
                buf.push_str("/>");
            } else {
                buf.push('>');
                for child in children {
                    write_node(child, options, buf);
                }
                buf.push_str("</");
                buf.push_str(&name);
                buf.push('>');
            }
        }
        NodeKind::Document | NodeKind::Fragment => {
            for child in node.children() {
                write_node(child, options, buf);
            }
        }
        NodeKind::Attribute => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Document;

    fn roundtrip(xml: &str) -> String {
        let doc = Document::parse(xml).unwrap();
        xml_text(doc.root(), &SerializeOptions::default())
    }

    #[test]
    fn test_escaped_ampersand_is_kept() {
        assert_eq!(roundtrip("<root>Fish&amp;pie</root>"), "<root>Fish&amp;pie</root>");
    }

    #[test]
    fn test_text_escaping() {
        assert_eq!(roundtrip("<root>Fish>pie</root>"), "<root>Fish&gt;pie</root>");
        assert_eq!(roundtrip("<root>Fish'pie</root>"), "<root>Fish'pie</root>");
        assert_eq!(roundtrip(r#"<root>Fish"pie</root>"#), r#"<root>Fish"pie</root>"#);
    }

    #[test]
    fn test_attribute_escaping() {
        assert_eq!(
            roundtrip(r#"<root dish="eat>hunger">Fish</root>"#),
            r#"<root dish="eat&gt;hunger">Fish</root>"#
        );
        assert_eq!(
            roundtrip(r#"<root dish="eat'hunger">Fish</root>"#),
            r#"<root dish="eat'hunger">Fish</root>"#
        );
        assert_eq!(
            roundtrip(r#"<root dish='eat"hunger'>Fish</root>"#),
            r#"<root dish="eat&quot;hunger">Fish</root>"#
        );
    }

    #[test]
    fn test_escaping_is_idempotent() {
        assert_eq!(escape_text("a & b"), "a &amp; b");
        assert_eq!(escape_text("a &amp; b"), "a &amp; b");
        assert_eq!(escape_text("<&>"), "&lt;&amp;&gt;");
        assert_eq!(escape_attribute(r#"say "hi" & go"#), "say &quot;hi&quot; &amp; go");
    }

    #[test]
    fn test_built_tree() {
        let doc = Document::new();
        let fragment = doc.create_fragment();
        let el = doc.create_element("fo:block");
        el.set_attribute("y", "z").unwrap();
        fragment.append_child(el).unwrap();
        fragment.append_child(doc.create_element("empty")).unwrap();
        fragment.append_child(doc.create_comment(" c ")).unwrap();
        fragment
            .append_child(doc.create_processing_instruction("render", "fast"))
            .unwrap();
        el.append_child(doc.create_cdata("a<b")).unwrap();

        assert_eq!(
            xml_text(fragment, &SerializeOptions::default()),
            r#"<fo:block y="z"><![CDATA[a<b]]></fo:block><empty/><!-- c --><?render fast?>"#
        );
        assert_eq!(
            xml_text(el, &SerializeOptions { cdata: true }),
            r#"<fo:block y="z">a<b</fo:block>"#
        );
    }

    #[test]
    fn test_empty_attributes_are_kept() {
        assert_eq!(roundtrip(r#"<root a="" b="1"/>"#), r#"<root a="" b="1"/>"#);
        let doc = Document::new();
        let el = doc.create_element("x");
        el.set_attribute("empty", "").unwrap();
        assert_eq!(xml_text(el, &SerializeOptions::default()), r#"<x empty=""/>"#);
    }

    #[test]
    fn test_xml_value() {
        let doc = Document::parse(r#"<a n="1">x<!--c--><b>y</b></a>"#).unwrap();
        let a = doc.document_element().unwrap();
        assert_eq!(xml_value(a), "xy");
        assert_eq!(xml_value(a.attributes()[0]), "1");
        assert_eq!(xml_value(a.children()[1]), "");
    }
}
