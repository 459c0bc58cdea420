//! Page tree (arena-based allocation)

use crate::{DomError, ElementData, Node, NodeId};

/// Arena-based element tree
///
/// Node 0 is always the document node.
#[derive(Debug, Clone)]
pub struct PageTree {
    nodes: Vec<Node>,
}

impl PageTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self { nodes: vec![Node::document()] }
    }

    /// Document node
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get element data by ID
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.get(id).and_then(Node::as_element)
    }

    /// Get text by ID (text nodes only)
    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(Node::as_text)
    }

    /// Number of nodes in the tree
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree holds nothing but the document node
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(Node::element(tag))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Set an attribute on an element
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let node = self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))?;
        let elem = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        elem.set_attr(name, value);
        Ok(())
    }

    /// Set the host-stable identity of an element
    pub fn set_control_id(&mut self, id: NodeId, control_id: u64) -> Result<(), DomError> {
        let node = self.nodes.get_mut(id.index()).ok_or(DomError::UnknownNode(id))?;
        let elem = node.as_element_mut().ok_or(DomError::NotAnElement(id))?;
        elem.control_id = Some(control_id);
        Ok(())
    }

    /// Append a detached node as last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        let invalid = DomError::InvalidAppend { parent, child };
        if parent == child || child == NodeId::ROOT {
            return Err(invalid);
        }
        let parent_node = self.get(parent).ok_or(DomError::UnknownNode(parent))?;
        if parent_node.is_text() {
            return Err(invalid);
        }
        let child_node = self.get(child).ok_or(DomError::UnknownNode(child))?;
        if child_node.parent.is_valid() {
            return Err(invalid);
        }

        let last = parent_node.last_child;
        {
            let child_node = &mut self.nodes[child.index()];
            child_node.parent = parent;
            child_node.prev_sibling = last;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
        Ok(())
    }

    /// Create an element and append it in one step
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Result<NodeId, DomError> {
        let id = self.create_element(tag);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Create a text node and append it in one step
    pub fn append_text(&mut self, parent: NodeId, content: &str) -> Result<NodeId, DomError> {
        let id = self.create_text(content);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).map(|n| n.parent).filter(|p| p.is_valid())
    }

    /// Iterate over children
    pub fn children(&self, id: NodeId) -> Children<'_> {
        let first = self.get(id).map(|n| n.first_child).unwrap_or(NodeId::NONE);
        Children { tree: self, next: first }
    }

    /// Iterate over ancestors, nearest first (the node itself excluded)
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors { tree: self, next: self.parent(id) }
    }

    /// Check whether `ancestor` strictly contains `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Nodes of the subtree rooted at `id` in document order (pre-order),
    /// `id` included
    pub fn preorder(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if self.get(id).is_none() {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut kids: Vec<NodeId> = self.children(current).collect();
            kids.reverse();
            stack.extend(kids);
        }
        out
    }

    /// Concatenated text of the subtree, whitespace collapsed
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut parts = Vec::new();
        for node in self.preorder(id) {
            if let Some(text) = self.text(node) {
                parts.extend(text.split_whitespace());
            }
        }
        parts.join(" ")
    }
}

impl Default for PageTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Children iterator
pub struct Children<'a> {
    tree: &'a PageTree,
    next: NodeId,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if !self.next.is_valid() {
            return None;
        }
        let current = self.next;
        self.next = self.tree.get(current).map(|n| n.next_sibling).unwrap_or(NodeId::NONE);
        Some(current)
    }
}

/// Ancestors iterator
pub struct Ancestors<'a> {
    tree: &'a PageTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}
