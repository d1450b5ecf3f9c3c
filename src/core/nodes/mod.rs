use std::fmt;

use crate::id::NodeId;

pub mod element;
pub mod text;

pub use element::Element;
pub use text::{Comment, Text};

/// Elements that never carry children and serialize without a closing tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

/// A node of the markup tree.
///
/// `Fragment` has no identity of its own; it only groups nodes while they are
/// moved around, and is flattened whenever it is spliced into a parent.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(Text),
    Comment(Comment),
    Fragment(Vec<Node>),
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(Text::new(content))
    }

    pub fn comment(content: impl Into<String>) -> Self {
        Node::Comment(Comment::new(content))
    }

    pub fn fragment(nodes: Vec<Node>) -> Self {
        Node::Fragment(nodes)
    }

    /// Inert placeholder left where a node was removed.
    pub fn marker() -> Self {
        Node::Comment(Comment::new(""))
    }

    /// Wraps a list of sibling nodes, avoiding a fragment for a single node.
    pub fn from_nodes(mut nodes: Vec<Node>) -> Self {
        if nodes.len() == 1 {
            if let Some(node) = nodes.pop() {
                return node;
            }
        }
        Node::Fragment(nodes)
    }

    pub fn id(&self) -> Option<NodeId> {
        match self {
            Node::Element(e) => Some(e.id()),
            Node::Text(t) => Some(t.id()),
            Node::Comment(c) => Some(c.id()),
            Node::Fragment(_) => None,
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Element(e) => &e.children,
            Node::Fragment(nodes) => nodes,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element(e) => Some(&mut e.children),
            Node::Fragment(nodes) => Some(nodes),
            _ => None,
        }
    }

    /// Deep copy with fresh ids for every node in the copy.
    pub fn duplicate(&self) -> Node {
        match self {
            Node::Element(e) => Node::Element(e.duplicate()),
            Node::Text(t) => Node::Text(Text::new(t.content.clone())),
            Node::Comment(c) => Node::Comment(Comment::new(c.content.clone())),
            Node::Fragment(nodes) => Node::Fragment(nodes.iter().map(Node::duplicate).collect()),
        }
    }

    /// Flattens a fragment into its members; any other node becomes a single-item list.
    pub fn into_nodes(self) -> Vec<Node> {
        match self {
            Node::Fragment(nodes) => nodes.into_iter().flat_map(Node::into_nodes).collect(),
            other => vec![other],
        }
    }

    pub fn text_content(&self) -> String {
        match self {
            Node::Text(t) => t.content.clone(),
            Node::Comment(_) => String::new(),
            Node::Element(e) => e.children.iter().map(Node::text_content).collect(),
            Node::Fragment(nodes) => nodes.iter().map(Node::text_content).collect(),
        }
    }

    pub fn to_markup(&self) -> String {
        self.to_string()
    }

    /// Child-index path from this node to the node carrying `id`.
    pub fn path_to(&self, id: NodeId) -> Option<Vec<usize>> {
        if self.id() == Some(id) {
            return Some(Vec::new());
        }
        for (index, child) in self.children().iter().enumerate() {
            if let Some(mut path) = child.path_to(id) {
                path.insert(0, index);
                return Some(path);
            }
        }
        None
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.path_to(id).is_some()
    }

    /// Child list reached by following `path` from this node.
    pub fn children_at_mut(&mut self, path: &[usize]) -> Option<&mut Vec<Node>> {
        let mut list = self.children_mut()?;
        for &index in path {
            list = list.get_mut(index)?.children_mut()?;
        }
        Some(list)
    }

    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id() == Some(id) {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Node::Element(element)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Element(e) => write!(f, "{}", e),
            Node::Text(t) => f.write_str(&escape_text(&t.content)),
            Node::Comment(c) => write!(f, "<!--{}-->", c.content),
            Node::Fragment(nodes) => {
                for node in nodes {
                    write!(f, "{}", node)?;
                }
                Ok(())
            }
        }
    }
}

pub fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(raw: &str) -> String {
    escape_text(raw).replace('"', "&quot;")
}
