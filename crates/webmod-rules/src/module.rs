//! Web modules

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};
use crate::rule::Rule;

/// Current on-disk format version
pub const FORMAT_VERSION: &str = "1.0";

const FORBIDDEN_NAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Check that a module name can be used as a file name
pub fn validate_name(name: &str) -> Result<()> {
    let malformed = |reason| RuleError::MalformedName { name: name.to_string(), reason };
    if name.trim().is_empty() {
        return Err(malformed("name is empty"));
    }
    if name.contains(FORBIDDEN_NAME_CHARS) {
        return Err(malformed("name contains one of \\ / : * ? \" < > |"));
    }
    if name.chars().any(char::is_control) {
        return Err(malformed("name contains control characters"));
    }
    Ok(())
}

/// Which sites a module applies to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteKey {
    /// URL fragments; any one contained in the page URL selects the module
    #[serde(default, rename = "url", skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    /// Substring of the host window title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_title: Option<String>,
}

impl SiteKey {
    /// A key with neither URLs nor title never selects its module
    pub fn is_empty(&self) -> bool {
        self.urls.iter().all(|u| u.is_empty())
            && self.window_title.as_deref().is_none_or(str::is_empty)
    }
}

/// Named, per-site collection of rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebModule {
    pub name: String,
    pub site: SiteKey,
    /// Contextual help, Markdown
    pub help: Option<String>,
    pub format_version: String,
    /// Ordered; order drives automatic actions and result ties
    pub rules: Vec<Rule>,
}

impl WebModule {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            site: SiteKey::default(),
            help: None,
            format_version: FORMAT_VERSION.to_string(),
            rules: Vec::new(),
        }
    }

    pub fn with_url(mut self, url: &str) -> Self {
        self.site.urls.push(url.to_string());
        self
    }

    pub fn with_window_title(mut self, title: &str) -> Self {
        self.site.window_title = Some(title.to_string());
        self
    }

    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}
