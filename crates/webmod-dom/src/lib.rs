//! webmod DOM - Page snapshots
//!
//! Read-only, queryable snapshot of a web page as seen by the screen reader:
//! an arena element tree with attributes, semantic roles, text content and
//! document order.

mod node;
mod page;
mod role;
mod state;
mod tree;

pub use node::{Attribute, ElementData, Node, NodeData};
pub use page::{ElementKey, Page};
pub use role::Role;
pub use state::State;
pub use tree::{Ancestors, Children, PageTree};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Invalid/null node ID
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check if this ID points to a node
    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    /// Arena index
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Errors raised while building a snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("Unknown node: {0:?}")]
    UnknownNode(NodeId),

    #[error("Node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("Cannot append {child:?} under {parent:?}")]
    InvalidAppend { parent: NodeId, child: NodeId },
}
