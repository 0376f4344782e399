//! Lets the XPath engine walk a [`Document`].

use crate::document::{NodeKind, XmlNode};
use weft_xpath1::{DataSourceNode, NodeType, QName};

impl<'d> DataSourceNode<'d> for XmlNode<'d> {
    fn node_type(&self) -> NodeType {
        match self.kind() {
            NodeKind::Document | NodeKind::Fragment => NodeType::Root,
            NodeKind::Element => NodeType::Element,
            NodeKind::Attribute => NodeType::Attribute,
            NodeKind::Text | NodeKind::CData => NodeType::Text,
            NodeKind::Comment => NodeType::Comment,
            NodeKind::ProcessingInstruction => NodeType::ProcessingInstruction,
        }
    }

    fn name(&self) -> Option<QName> {
        self.qname()
    }

    fn string_value(&self) -> String {
        self.text_content()
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'd> {
        Box::new(XmlNode::attributes(self).into_iter())
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'd> {
        Box::new(XmlNode::children(self).into_iter())
    }

    fn parent(&self) -> Option<Self> {
        XmlNode::parent(self)
    }
}
