//! Page - High-level snapshot API

use std::fmt;

use crate::{ElementData, NodeId, PageTree};

const NO_POSITION: u32 = u32::MAX;

/// Identity of an element that survives re-snapshotting
///
/// Hosts that expose a stable control id get `Control`; otherwise the
/// element's document-order position stands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKey {
    Control(u64),
    Position(usize),
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(id) => write!(f, "control#{}", id),
            Self::Position(pos) => write!(f, "element@{}", pos),
        }
    }
}

/// Read-only snapshot of a page
#[derive(Debug, Clone)]
pub struct Page {
    url: String,
    window_title: String,
    tree: PageTree,
    /// Elements in document order
    order: Vec<NodeId>,
    /// Arena index -> position in `order`
    positions: Vec<u32>,
    /// Arena index -> text node immediately preceding the element
    prev_text: Vec<NodeId>,
}

impl Page {
    /// Freeze a tree into a snapshot
    pub fn new(url: &str, window_title: &str, tree: PageTree) -> Self {
        let len = tree.len();
        let mut order = Vec::new();
        let mut positions = vec![NO_POSITION; len];
        let mut prev_text = vec![NodeId::NONE; len];
        let mut last_text = NodeId::NONE;

        for id in tree.preorder(tree.root()) {
            let Some(node) = tree.get(id) else { continue };
            if node.is_element() {
                positions[id.index()] = order.len() as u32;
                prev_text[id.index()] = last_text;
                order.push(id);
            } else if node.as_text().is_some_and(|t| !t.trim().is_empty()) {
                last_text = id;
            }
        }

        tracing::trace!(url, elements = order.len(), "page snapshot built");

        Self {
            url: url.to_string(),
            window_title: window_title.to_string(),
            tree,
            order,
            positions,
            prev_text,
        }
    }

    /// Page URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host window title
    pub fn window_title(&self) -> &str {
        &self.window_title
    }

    /// Underlying tree
    pub fn tree(&self) -> &PageTree {
        &self.tree
    }

    /// All elements in document order
    pub fn elements(&self) -> &[NodeId] {
        &self.order
    }

    /// Element data by ID
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.tree.element(id)
    }

    /// Check whether the element belongs to this snapshot
    pub fn contains(&self, id: NodeId) -> bool {
        self.position(id).is_some()
    }

    /// Position of an element in document order
    pub fn position(&self, id: NodeId) -> Option<usize> {
        match self.positions.get(id.index()) {
            Some(&pos) if pos != NO_POSITION => Some(pos as usize),
            _ => None,
        }
    }

    /// Element at a document-order position
    pub fn at(&self, position: usize) -> Option<NodeId> {
        self.order.get(position).copied()
    }

    /// Text content of an element, whitespace collapsed
    pub fn text(&self, id: NodeId) -> String {
        self.tree.inner_text(id)
    }

    /// Text of the non-blank text node immediately preceding the element
    pub fn previous_text(&self, id: NodeId) -> Option<&str> {
        let text_id = *self.prev_text.get(id.index())?;
        if !text_id.is_valid() {
            return None;
        }
        self.tree.text(text_id).map(str::trim)
    }

    /// Stable identity for an element
    pub fn key(&self, id: NodeId) -> Option<ElementKey> {
        let elem = self.element(id)?;
        match elem.control_id {
            Some(control) => Some(ElementKey::Control(control)),
            None => self.position(id).map(ElementKey::Position),
        }
    }

    /// Resolve a key from another snapshot into this one
    pub fn find_key(&self, key: ElementKey) -> Option<NodeId> {
        match key {
            ElementKey::Position(pos) => self.at(pos),
            ElementKey::Control(control) => self
                .order
                .iter()
                .copied()
                .find(|&id| self.element(id).and_then(|e| e.control_id) == Some(control)),
        }
    }

    /// Document `<title>` text, empty if none
    pub fn title(&self) -> String {
        self.order
            .iter()
            .copied()
            .find(|&id| self.element(id).is_some_and(|e| e.tag == "title"))
            .map(|id| self.text(id))
            .unwrap_or_default()
    }

    /// Text used when an element is announced: its text content, falling
    /// back to `aria-label`, `alt`, `title` or `value`
    pub fn label(&self, id: NodeId) -> String {
        let text = self.text(id);
        if !text.is_empty() {
            return text;
        }
        let Some(elem) = self.element(id) else {
            return text;
        };
        ["aria-label", "alt", "title", "value", "placeholder"]
            .iter()
            .find_map(|name| elem.get_attr(name).map(str::trim).filter(|v| !v.is_empty()))
            .map(str::to_string)
            .unwrap_or_default()
    }
}
