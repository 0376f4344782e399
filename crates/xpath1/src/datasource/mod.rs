//! Defines the core abstraction for a navigable data source tree.
use std::fmt;
use std::hash::Hash;

/// A qualified name, consisting of an optional prefix and a local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local_part: String,
}

impl QName {
    /// Splits a lexical `prefix:local` name. A name without a colon has no prefix.
    pub fn parse(name: &str) -> Self {
        match name.split_once(':') {
            Some((prefix, local)) if !prefix.is_empty() => QName {
                prefix: Some(prefix.to_string()),
                local_part: local.to_string(),
            },
            _ => QName {
                prefix: None,
                local_part: name.to_string(),
            },
        }
    }

    /// Tests this name against a name test as written in an expression.
    /// A prefixed test must match prefix and local part; an unprefixed test
    /// only looks at the local part.
    pub fn matches(&self, test: &str) -> bool {
        match test.split_once(':') {
            Some((prefix, local)) => {
                self.prefix.as_deref() == Some(prefix) && self.local_part == local
            }
            None => self.local_part == test,
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None => f.write_str(&self.local_part),
        }
    }
}

/// The type of a node in the data source tree, aligned with the XPath 1.0 data model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// The universal contract for a node in a hierarchical data source.
///
/// The XPath engine is written exclusively against this trait, so any tree that
/// can hand out cheap `Copy` handles to its nodes can be queried.
///
/// `'a` is the lifetime of the underlying tree storage.
///
/// `Ord` must be document order: expressions rely on it to sort and deduplicate
/// node-sets.
pub trait DataSourceNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    /// The type of the node (Element, Text, Attribute, etc.).
    fn node_type(&self) -> NodeType;

    /// The qualified name of the node (e.g., `fo:block`). Returns `None` for node
    /// types that do not have names, such as text or root nodes. For a processing-
    /// instruction, this is its target.
    fn name(&self) -> Option<QName>;

    /// The string value of the node, as defined by the XPath 1.0 `string()` function.
    /// - For a text node, this is its content.
    /// - For an element or root, this is the concatenation of the string values of
    ///   all its descendant text nodes.
    /// - For an attribute, this is its value.
    /// - For a comment or processing instruction, this is its content.
    fn string_value(&self) -> String;

    /// An iterator over the attribute nodes of this node.
    /// The iterator will be empty for non-element nodes.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// An iterator over the child nodes of this node.
    /// The iterator will be empty for leaf nodes (like text or attributes).
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. Returns `None` for the root node or detached nodes.
    fn parent(&self) -> Option<Self>;
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::cmp::Ordering;
    use std::collections::HashMap;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData {
        node_type: NodeType,
        name: Option<QName>,
        value: String,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    /// An in-memory tree whose node ids are assigned in document order.
    #[derive(Debug)]
    pub struct MockTree {
        nodes: HashMap<usize, MockNodeData>,
        parent_map: HashMap<usize, usize>,
    }

    impl MockTree {
        fn insert(&mut self, id: usize, parent: Option<usize>, data: MockNodeData) {
            if let Some(pid) = parent {
                self.parent_map.insert(id, pid);
            }
            self.nodes.insert(id, data);
        }
    }

    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree,
    }

    impl PartialEq for MockNode<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl Eq for MockNode<'_> {}

    impl PartialOrd for MockNode<'_> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for MockNode<'_> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl Hash for MockNode<'_> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> DataSourceNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.nodes[&self.id].node_type
        }

        fn name(&self) -> Option<QName> {
            self.tree.nodes[&self.id].name.clone()
        }

        fn string_value(&self) -> String {
            self.tree.nodes[&self.id].value.clone()
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let attribute_ids = tree.nodes[&self.id].attributes.clone();
            Box::new(
                attribute_ids
                    .into_iter()
                    .map(move |id| MockNode { id, tree }),
            )
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            let children_ids = tree.nodes[&self.id].children.clone();
            Box::new(
                children_ids
                    .into_iter()
                    .map(move |id| MockNode { id, tree }),
            )
        }

        fn parent(&self) -> Option<Self> {
            self.tree.parent_map.get(&self.id).map(|&pid| MockNode {
                id: pid,
                tree: self.tree,
            })
        }
    }

    fn element(name: &str, value: &str, children: Vec<usize>, attributes: Vec<usize>) -> MockNodeData {
        MockNodeData {
            node_type: NodeType::Element,
            name: Some(QName::parse(name)),
            value: value.to_string(),
            children,
            attributes,
        }
    }

    fn leaf(node_type: NodeType, name: Option<&str>, value: &str) -> MockNodeData {
        MockNodeData {
            node_type,
            name: name.map(QName::parse),
            value: value.to_string(),
            children: vec![],
            attributes: vec![],
        }
    }

    /// Creates a small mock tree; ids follow document order:
    /// ```text
    /// <root>                                 0
    ///   <para id="p1" xml:lang="en">Hello</para>   1, @2 @3, text 4
    ///   <!-- comment node -->                5
    ///   <div></div>                          6
    ///   <?pi-target pi-value?>               7
    ///   <para>World</para>                   8, text 9
    /// </root>
    /// ```
    pub fn create_test_tree() -> MockTree {
        let mut tree = MockTree {
            nodes: HashMap::new(),
            parent_map: HashMap::new(),
        };
        tree.insert(
            0,
            None,
            MockNodeData {
                node_type: NodeType::Root,
                name: None,
                value: "HelloWorld".to_string(),
                children: vec![1, 5, 6, 7, 8],
                attributes: vec![],
            },
        );
        tree.insert(1, Some(0), element("para", "Hello", vec![4], vec![2, 3]));
        tree.insert(2, Some(1), leaf(NodeType::Attribute, Some("id"), "p1"));
        tree.insert(3, Some(1), leaf(NodeType::Attribute, Some("xml:lang"), "en"));
        tree.insert(4, Some(1), leaf(NodeType::Text, None, "Hello"));
        tree.insert(5, Some(0), leaf(NodeType::Comment, None, " comment node "));
        tree.insert(6, Some(0), element("div", "", vec![], vec![]));
        tree.insert(
            7,
            Some(0),
            leaf(NodeType::ProcessingInstruction, Some("pi-target"), "pi-value"),
        );
        tree.insert(8, Some(0), element("para", "World", vec![9], vec![]));
        tree.insert(9, Some(8), leaf(NodeType::Text, None, "World"));
        tree
    }
}
