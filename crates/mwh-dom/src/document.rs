//! Document - High-level document API

use crate::{DomTree, NodeId};

/// HTML Document
#[derive(Debug, Clone)]
pub struct Document {
    /// The DOM tree
    pub tree: DomTree,
    /// Cached reference to <html> element
    html_element: NodeId,
    /// Cached reference to <body> element
    body_element: NodeId,
}

impl Document {
    /// Create a document with the basic html/head/body structure
    pub fn new() -> Self {
        let mut tree = DomTree::new();

        let html = tree.create_element("html");
        let head = tree.create_element("head");
        let body = tree.create_element("body");

        for (parent, child) in [(NodeId::ROOT, html), (html, head), (html, body)] {
            if let Err(err) = tree.append_child(parent, child) {
                tracing::warn!(%err, "document skeleton incomplete");
            }
        }

        Self {
            tree,
            html_element: html,
            body_element: body,
        }
    }

    pub fn html(&self) -> NodeId {
        self.html_element
    }

    pub fn body(&self) -> NodeId {
        self.body_element
    }

    /// Create an element and append it under `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str, classes: &[&str]) -> NodeId {
        let id = self.tree.create_element(tag);
        if let Some(node) = self.tree.get_mut(id) {
            for class in classes {
                node.add_class(class);
            }
        }
        if let Err(err) = self.tree.append_child(parent, id) {
            tracing::warn!(%err, "left new <{}> detached", tag);
        }
        id
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
