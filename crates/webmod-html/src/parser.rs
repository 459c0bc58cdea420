//! HTML5 Parser implementation
//!
//! Uses html5ever's build-in RcDom and converts to our snapshot format.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use webmod_dom::{NodeId, Page, PageTree};

use crate::ParseError;

/// Attribute carrying a host-stable element identity
const CONTROL_ID_ATTR: &str = "data-webmod-id";

/// Elements whose text never reaches the screen reader
const SILENT_TAGS: &[&str] = &["script", "style", "template", "noscript"];

/// HTML5 parser
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML into a page snapshot
    pub fn parse(&self, html: &str, url: &str, window_title: &str) -> Result<Page, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut tree = PageTree::new();
        let root = tree.root();
        self.convert_node(&dom.document, &mut tree, root, false)?;

        tracing::debug!("Parsed {} nodes", tree.len());
        Ok(Page::new(url, window_title, tree))
    }

    /// Convert an RcDom node to our snapshot format
    fn convert_node(
        &self,
        handle: &Handle,
        tree: &mut PageTree,
        parent: NodeId,
        silent: bool,
    ) -> Result<(), ParseError> {
        match &handle.data {
            RcNodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, parent, silent)?;
                }
            }
            RcNodeData::Text { contents } => {
                let text = contents.borrow();
                if !silent && !text.trim().is_empty() {
                    tree.append_text(parent, &text)?;
                }
            }
            RcNodeData::Element { name, attrs, .. } => {
                let tag = name.local.as_ref();
                let id = tree.append_element(parent, tag)?;

                for attr in attrs.borrow().iter() {
                    let attr_name = attr.name.local.as_ref();
                    let value = attr.value.as_ref();
                    if attr_name == CONTROL_ID_ATTR {
                        match value.trim().parse::<u64>() {
                            Ok(control) => tree.set_control_id(id, control)?,
                            Err(_) => tracing::trace!(value, "ignoring non-numeric control id"),
                        }
                    }
                    tree.set_attr(id, attr_name, value)?;
                }

                let silent = silent || SILENT_TAGS.contains(&tag);
                for child in handle.children.borrow().iter() {
                    self.convert_node(child, tree, id, silent)?;
                }
            }
            RcNodeData::Doctype { .. }
            | RcNodeData::Comment { .. }
            | RcNodeData::ProcessingInstruction { .. } => {}
        }
        Ok(())
    }
}

impl Default for HtmlParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
        let page = HtmlParser::new().parse(html, "about:blank", "").unwrap();

        assert_eq!(page.title(), "Test");
        assert_eq!(page.elements().len(), 5);
    }

    #[test]
    fn test_parse_fragment() {
        let html = "<div><span>Text</span></div>";
        let page = HtmlParser::new().parse(html, "about:blank", "").unwrap();

        // Fragments get wrapped in html/head/body by html5ever
        let tags: Vec<_> = page.elements().iter().map(|&id| page.element(id).unwrap().tag.clone()).collect();
        assert_eq!(tags, vec!["html", "head", "body", "div", "span"]);
    }

    #[test]
    fn test_control_ids_and_silent_text() {
        let html = r#"<button data-webmod-id="7">Go</button><script>var x = 1;</script>"#;
        let page = HtmlParser::new().parse(html, "about:blank", "").unwrap();
        let button = page
            .elements()
            .iter()
            .copied()
            .find(|&id| page.element(id).unwrap().tag == "button")
            .unwrap();
        assert_eq!(page.element(button).unwrap().control_id, Some(7));

        let body = page.elements()[2];
        assert_eq!(page.text(body), "Go");
    }
}
