//! webmod HTML
//!
//! Stand-in for the host element-tree provider: turns HTML text into a
//! [`webmod_dom::Page`] snapshot using html5ever.

mod parser;

pub use parser::HtmlParser;

use webmod_dom::Page;

/// Parse an HTML string into a page snapshot
pub fn parse(html: &str, url: &str, window_title: &str) -> Result<Page, ParseError> {
    HtmlParser::new().parse(html, url, window_title)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read HTML input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to build snapshot: {0}")]
    Dom(#[from] webmod_dom::DomError),
}
