//! Rule loading errors

use std::path::PathBuf;

/// Errors raised while loading, validating or storing a web module
///
/// Matching never fails: an absent element is an empty result.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("Malformed module name {name:?}: {reason}")]
    MalformedName { name: String, reason: &'static str },

    #[error("Duplicate rule name {0:?}")]
    DuplicateRule(String),

    #[error("Rule {rule:?}: context {context:?} does not name a rule of this module")]
    UnknownContext { rule: String, context: String },

    #[error("Rule {rule:?}: context {context:?} is not flagged as a context rule")]
    NotAContext { rule: String, context: String },

    #[error("Context cycle: {}", path.join(" -> "))]
    ContextCycle { path: Vec<String> },

    #[error("Page title rule {rule:?} depends on the page title through {via:?}")]
    PageTitleLoop { rule: String, via: String },

    #[error("Rule {rule:?}: invalid {field} expression {source_text:?}: {message}")]
    InvalidExpression {
        rule: String,
        field: &'static str,
        source_text: String,
        message: String,
    },

    #[error("Rule {rule:?}: invalid gesture {gesture:?}: {message}")]
    InvalidGesture {
        rule: String,
        gesture: String,
        message: String,
    },

    #[error("Gesture {gesture} is bound by both {first:?} and {second:?}")]
    DuplicateGesture {
        gesture: String,
        first: String,
        second: String,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid module file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("A web module named {0:?} already exists")]
    DuplicateRef(String),

    #[error("Web module {0:?} not found")]
    NotFound(String),
}

impl RuleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
