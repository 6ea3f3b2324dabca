//! mwh DOM
//!
//! The slice of the page document the media runtime needs.
//!
//! Features:
//! - Arena-based element tree with classes, attributes and inline styles
//! - `DOMRect` geometry and CSS-style root margins
//! - Intersection observation against the viewport

mod tree;
mod document;
pub mod geometry;
pub mod intersection;

pub use tree::{DomTree, Node};
pub use document::Document;
pub use geometry::{DOMRect, RootMargin};
pub use intersection::{
    IntersectionObserver, IntersectionObserverEntry, IntersectionObserverOptions,
};

use serde::{Deserialize, Serialize};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Build an id from a raw arena index
    pub const fn from_raw(index: u32) -> Self {
        NodeId(index)
    }

    /// Raw arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// DOM error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomError {
    #[error("Invalid root margin: {0}")]
    InvalidMargin(String),

    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    #[error("Cannot insert {0:?} under its own descendant")]
    HierarchyRequest(NodeId),
}
