//! Arena-backed mutable XML tree.

use crate::error::DomError;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use weft_xpath1::QName;

static NEXT_DOCUMENT_ID: AtomicUsize = AtomicUsize::new(1);

/// Index of a node inside its owning [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Fragment,
    Element,
    Attribute,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    fn can_have_children(self) -> bool {
        matches!(self, NodeKind::Document | NodeKind::Fragment | NodeKind::Element)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Fragment => "fragment",
            NodeKind::Element => "element",
            NodeKind::Attribute => "attribute",
            NodeKind::Text => "text",
            NodeKind::CData => "cdata",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    /// Element and attribute names; the target of a processing instruction.
    name: Option<QName>,
    value: String,
    parent: Option<NodeId>,
    /// Index within the parent's child (or attribute) list.
    slot: usize,
    children: Vec<NodeId>,
    attributes: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind, name: Option<QName>, value: String) -> Self {
        Self {
            kind,
            name,
            value,
            parent: None,
            slot: 0,
            children: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

/// An XML document. Node 0 is always the document node; every other node is
/// created through the `create_*` factory methods and stays owned by the
/// document whether or not it is attached.
pub struct Document {
    id: usize,
    nodes: RefCell<Vec<NodeData>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("nodes", &self.nodes.borrow().len())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        let id = NEXT_DOCUMENT_ID.fetch_add(1, AtomicOrdering::Relaxed);
        Document {
            id,
            nodes: RefCell::new(vec![NodeData::new(
                NodeKind::Document,
                None,
                String::new(),
            )]),
        }
    }

    /// The document node.
    pub fn root(&self) -> XmlNode<'_> {
        XmlNode {
            doc: self,
            id: NodeId(0),
        }
    }

    /// The first element child of the document node.
    pub fn document_element(&self) -> Option<XmlNode<'_>> {
        self.root().children().into_iter().find(XmlNode::is_element)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    fn alloc(&self, data: NodeData) -> XmlNode<'_> {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(data);
        XmlNode {
            doc: self,
            id: NodeId(nodes.len() - 1),
        }
    }

    /// Creates a detached element. `name` may carry a `prefix:` part.
    pub fn create_element(&self, name: &str) -> XmlNode<'_> {
        self.create_element_qname(QName::parse(name))
    }

    pub fn create_element_qname(&self, name: QName) -> XmlNode<'_> {
        self.alloc(NodeData::new(NodeKind::Element, Some(name), String::new()))
    }

    pub fn create_text(&self, text: &str) -> XmlNode<'_> {
        self.alloc(NodeData::new(NodeKind::Text, None, text.to_string()))
    }

    pub fn create_cdata(&self, text: &str) -> XmlNode<'_> {
        self.alloc(NodeData::new(NodeKind::CData, None, text.to_string()))
    }

    pub fn create_comment(&self, text: &str) -> XmlNode<'_> {
        self.alloc(NodeData::new(NodeKind::Comment, None, text.to_string()))
    }

    pub fn create_processing_instruction(&self, target: &str, data: &str) -> XmlNode<'_> {
        self.alloc(NodeData::new(
            NodeKind::ProcessingInstruction,
            Some(QName::parse(target)),
            data.to_string(),
        ))
    }

    pub fn create_fragment(&self) -> XmlNode<'_> {
        self.alloc(NodeData::new(NodeKind::Fragment, None, String::new()))
    }

    fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&NodeData) -> R) -> R {
        f(&self.nodes.borrow()[id.0])
    }
}

/// Removes `child` from `parent`'s child list and renumbers the siblings after it.
fn detach(nodes: &mut [NodeData], parent: NodeId, child: NodeId) {
    let siblings = &mut nodes[parent.0].children;
    if let Some(pos) = siblings.iter().position(|&c| c == child) {
        siblings.remove(pos);
        let shifted: Vec<NodeId> = siblings[pos..].to_vec();
        for (offset, id) in shifted.into_iter().enumerate() {
            nodes[id.0].slot = pos + offset;
        }
    }
    nodes[child.0].parent = None;
}

/// A handle to one node of a [`Document`].
#[derive(Clone, Copy)]
pub struct XmlNode<'d> {
    doc: &'d Document,
    id: NodeId,
}

impl<'d> XmlNode<'d> {
    pub fn document(&self) -> &'d Document {
        self.doc
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.doc.with_node(self.id, |n| n.kind)
    }

    pub fn is_element(&self) -> bool {
        self.kind() == NodeKind::Element
    }

    pub fn qname(&self) -> Option<QName> {
        self.doc.with_node(self.id, |n| n.name.clone())
    }

    /// The DOM `nodeName`: `prefix:local` for named nodes, `#text` and friends otherwise.
    pub fn qualified_name(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Attribute | NodeKind::ProcessingInstruction => {
                self.qname().map(|q| q.to_string()).unwrap_or_default()
            }
            NodeKind::Text => "#text".to_string(),
            NodeKind::CData => "#cdata-section".to_string(),
            NodeKind::Comment => "#comment".to_string(),
            NodeKind::Document => "#document".to_string(),
            NodeKind::Fragment => "#document-fragment".to_string(),
        }
    }

    pub fn local_name(&self) -> Option<String> {
        self.qname().map(|q| q.local_part)
    }

    pub fn prefix(&self) -> Option<String> {
        self.qname().and_then(|q| q.prefix)
    }

    /// The DOM `nodeValue`: character data for text-like nodes and attributes,
    /// empty for containers.
    pub fn value(&self) -> String {
        self.doc.with_node(self.id, |n| n.value.clone())
    }

    /// Concatenated text of all descendant text and CDATA nodes for containers,
    /// the node's own value for everything else.
    pub fn text_content(&self) -> String {
        match self.kind() {
            NodeKind::Element | NodeKind::Document | NodeKind::Fragment => {
                let mut out = String::new();
                self.collect_text(&mut out);
                out
            }
            _ => self.value(),
        }
    }

    fn collect_text(&self, out: &mut String) {
        for child in self.children() {
            match child.kind() {
                NodeKind::Text | NodeKind::CData => out.push_str(&child.value()),
                NodeKind::Element => child.collect_text(out),
                _ => {}
            }
        }
    }

    pub fn parent(&self) -> Option<XmlNode<'d>> {
        let doc = self.doc;
        doc.with_node(self.id, |n| n.parent)
            .map(|id| XmlNode { doc, id })
    }

    /// Parent, grandparent, and so on up to the topmost node.
    pub fn ancestors(&self) -> impl Iterator<Item = XmlNode<'d>> + use<'d> {
        std::iter::successors(self.parent(), |n| n.parent())
    }

    /// The topmost ancestor, or the node itself when it is detached.
    pub fn root(&self) -> XmlNode<'d> {
        self.ancestors().last().unwrap_or(*self)
    }

    pub fn children(&self) -> Vec<XmlNode<'d>> {
        let doc = self.doc;
        doc.with_node(self.id, |n| {
            n.children.iter().map(|&id| XmlNode { doc, id }).collect()
        })
    }

    pub fn attributes(&self) -> Vec<XmlNode<'d>> {
        let doc = self.doc;
        doc.with_node(self.id, |n| {
            n.attributes.iter().map(|&id| XmlNode { doc, id }).collect()
        })
    }

    /// Looks up an attribute value by qualified name.
    pub fn attribute(&self, name: &str) -> Option<String> {
        let wanted = QName::parse(name);
        let nodes = self.doc.nodes.borrow();
        nodes[self.id.0]
            .attributes
            .iter()
            .map(|a| &nodes[a.0])
            .find(|a| a.name.as_ref() == Some(&wanted))
            .map(|a| a.value.clone())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Sets an attribute, replacing the value of an existing one with the same
    /// qualified name. Only elements carry attributes.
    pub fn set_attribute(&self, name: &str, value: &str) -> Result<(), DomError> {
        let kind = self.kind();
        if kind != NodeKind::Element {
            return Err(DomError::NotAnElement {
                name: name.to_string(),
                kind: kind.to_string(),
            });
        }
        let qname = QName::parse(name);
        let mut nodes = self.doc.nodes.borrow_mut();
        let existing = nodes[self.id.0]
            .attributes
            .iter()
            .copied()
            .find(|a| nodes[a.0].name.as_ref() == Some(&qname));
        match existing {
            Some(attr) => nodes[attr.0].value = value.to_string(),
            None => {
                let mut data = NodeData::new(NodeKind::Attribute, Some(qname), value.to_string());
                data.parent = Some(self.id);
                data.slot = nodes[self.id.0].attributes.len();
                nodes.push(data);
                let attr = NodeId(nodes.len() - 1);
                nodes[self.id.0].attributes.push(attr);
            }
        }
        Ok(())
    }

    /// Appends `child` as the last child of this node, detaching it from any
    /// previous parent. Appending a fragment moves the fragment's children.
    pub fn append_child(&self, child: XmlNode<'d>) -> Result<(), DomError> {
        if self.doc.id != child.doc.id {
            return Err(DomError::WrongDocument);
        }
        let parent_kind = self.kind();
        let child_kind = child.kind();
        let creates_cycle = child == *self || self.ancestors().any(|a| a == child);
        if !parent_kind.can_have_children()
            || matches!(child_kind, NodeKind::Document | NodeKind::Attribute)
            || creates_cycle
        {
            return Err(DomError::InvalidChild {
                parent: parent_kind.to_string(),
                child: child_kind.to_string(),
            });
        }

        if child_kind == NodeKind::Fragment {
            for grandchild in child.children() {
                self.append_child(grandchild)?;
            }
            return Ok(());
        }

        let mut nodes = self.doc.nodes.borrow_mut();
        if let Some(old_parent) = nodes[child.id.0].parent {
            detach(&mut nodes, old_parent, child.id);
        }
        let slot = nodes[self.id.0].children.len();
        nodes[self.id.0].children.push(child.id);
        let data = &mut nodes[child.id.0];
        data.parent = Some(self.id);
        data.slot = slot;
        Ok(())
    }

    /// Root of the node's tree plus the (attribute-or-child, slot) path to it.
    fn order_key(&self) -> (NodeId, Vec<(u8, usize)>) {
        let nodes = self.doc.nodes.borrow();
        let mut path = Vec::new();
        let mut current = self.id;
        while let Some(parent) = nodes[current.0].parent {
            let data = &nodes[current.0];
            let axis = if data.kind == NodeKind::Attribute { 0 } else { 1 };
            path.push((axis, data.slot));
            current = parent;
        }
        path.reverse();
        (current, path)
    }
}

impl fmt::Debug for XmlNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "XmlNode({}#{} {})",
            self.doc.id,
            self.id.0,
            self.qualified_name()
        )
    }
}

impl PartialEq for XmlNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.doc.id == other.doc.id && self.id == other.id
    }
}

impl Eq for XmlNode<'_> {}

impl Hash for XmlNode<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.doc.id.hash(state);
        self.id.hash(state);
    }
}

impl PartialOrd for XmlNode<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Document order. Attributes sort after their element and before its children.
/// Separate trees are ordered by document, then by the creation order of their roots.
impl Ord for XmlNode<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.doc.id.cmp(&other.doc.id).then_with(|| {
            if self.id == other.id {
                Ordering::Equal
            } else {
                self.order_key().cmp(&other.order_key())
            }
        })
    }
}
