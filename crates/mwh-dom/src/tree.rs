//! DOM Tree (arena-based allocation)
//!
//! Nodes are never freed while the page lives; removing a node only
//! detaches it, so a `NodeId` stays valid for the whole session.

use crate::{DomError, NodeId};

/// Tag used for the document root
const DOCUMENT_TAG: &str = "#document";

/// Element node
#[derive(Debug, Clone)]
pub struct Node {
    /// Lowercase tag name
    pub tag: String,
    /// Parent node (None if detached or root)
    pub parent: Option<NodeId>,
    /// Children in document order
    pub children: Vec<NodeId>,
    /// Class list
    pub classes: Vec<String>,
    /// Attributes in insertion order
    pub attrs: Vec<(String, String)>,
    /// Inline style declarations
    pub style: Vec<(String, String)>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            parent: None,
            children: Vec::new(),
            classes: Vec::new(),
            attrs: Vec::new(),
            style: Vec::new(),
        }
    }

    #[inline]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if !self.has_class(class) {
            self.classes.push(class.to_string());
        }
    }

    /// Get an attribute value
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute
    pub fn set_attr(&mut self, name: &str, value: &str) {
        // Check if attribute already exists
        for (n, v) in self.attrs.iter_mut() {
            if n == name {
                *v = value.to_string();
                return;
            }
        }
        self.attrs.push((name.to_string(), value.to_string()));
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(n, _)| n != name);
    }

    /// Get an inline style property
    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.iter()
            .find(|(p, _)| p == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set an inline style property
    pub fn set_style(&mut self, property: &str, value: &str) {
        for (p, v) in self.style.iter_mut() {
            if p == property {
                *v = value.to_string();
                return;
            }
        }
        self.style.push((property.to_string(), value.to_string()));
    }
}

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document root
    pub fn new() -> Self {
        Self { nodes: vec![Node::new(DOCUMENT_TAG)] }
    }

    /// Document root
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: the document root exists from construction
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(tag));
        id
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.get(parent).is_none() {
            return Err(DomError::NodeNotFound(parent));
        }
        if self.get(child).is_none() {
            return Err(DomError::NodeNotFound(child));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest(child));
        }

        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
        Ok(())
    }

    /// Remove a node from its parent; the node and its subtree stay in the arena
    pub fn detach(&mut self, node: NodeId) {
        let Some(parent) = self.get(node).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.get_mut(parent) {
            p.children.retain(|&c| c != node);
        }
        self.nodes[node.index()].parent = None;
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node).and_then(|n| n.parent)
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.get(node).map(|n| n.tag.as_str())
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node).and_then(|n| n.attr(name))
    }

    /// Set an attribute; returns false if the node does not exist
    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> bool {
        match self.get_mut(node) {
            Some(n) => {
                n.set_attr(name, value);
                true
            }
            None => false,
        }
    }

    /// Set an inline style; returns false if the node does not exist
    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> bool {
        match self.get_mut(node) {
            Some(n) => {
                n.set_style(property, value);
                true
            }
            None => false,
        }
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(NodeId::ROOT, node)
    }

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Closest inclusive ancestor matching `predicate` (like `Element.closest`)
    pub fn closest(&self, node: NodeId, predicate: impl Fn(&Node) -> bool) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.get(id)?;
            if n.tag != DOCUMENT_TAG && predicate(n) {
                return Some(id);
            }
            current = n.parent;
        }
        None
    }

    /// Closest inclusive ancestor carrying `class`
    pub fn closest_with_class(&self, node: NodeId, class: &str) -> Option<NodeId> {
        self.closest(node, |n| n.has_class(class))
    }

    /// All descendants of `node` in document order (excluding `node`)
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Descendants of `node` carrying any of `classes`
    pub fn query_classes(&self, node: NodeId, classes: &[&str]) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&id| {
                self.get(id)
                    .map(|n| classes.iter().any(|c| n.has_class(c)))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Connected elements with the given tag, in document order
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        let tag = tag.to_ascii_lowercase();
        self.descendants(NodeId::ROOT)
            .into_iter()
            .filter(|&id| self.tag(id) == Some(tag.as_str()))
            .collect()
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}
