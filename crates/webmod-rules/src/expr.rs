//! Value expressions
//!
//! Criteria values are small boolean expressions over the candidate's
//! property values:
//!
//! - `a|b` accepts either alternative
//! - `a&b` requires both clauses
//! - `!a` rejects `a`
//! - an alternative containing `*` is a substring test (stars removed)
//!
//! For class names, spaces also separate `&` clauses.

use std::fmt;

/// A single literal test
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Exact(String),
    Contains(String),
}

impl Pattern {
    fn parse(text: &str) -> Self {
        if text.contains('*') {
            Self::Contains(text.replace('*', ""))
        } else {
            Self::Exact(text.to_string())
        }
    }

    fn test(&self, value: &str) -> bool {
        match self {
            Self::Exact(expected) => value == expected,
            Self::Contains(needle) => !value.is_empty() && value.contains(needle.as_str()),
        }
    }

    fn fold_case(&mut self) {
        match self {
            Self::Exact(s) | Self::Contains(s) => *s = s.to_ascii_lowercase(),
        }
    }
}

/// One `&` clause: `|`-separated alternatives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Clause {
    accept: Vec<Pattern>,
    reject: Vec<Pattern>,
}

impl Clause {
    fn test(&self, values: &[&str]) -> bool {
        let accepted = self.accept.is_empty()
            || values.iter().any(|v| self.accept.iter().any(|p| p.test(v)));
        let rejected = values.iter().any(|v| self.reject.iter().any(|p| p.test(v)));
        accepted && !rejected
    }
}

/// Compiled value expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueExpr {
    clauses: Vec<Clause>,
}

impl ValueExpr {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Self, String> {
        Self::parse_with(source, false)
    }

    /// Parse a class-name expression, where spaces mean `&`
    pub fn parse_class(source: &str) -> Result<Self, String> {
        Self::parse_with(source, true)
    }

    fn parse_with(source: &str, space_is_and: bool) -> Result<Self, String> {
        let normalized;
        let source = if space_is_and {
            normalized = source.split_whitespace().collect::<Vec<_>>().join("&");
            normalized.as_str()
        } else {
            source
        };

        let mut clauses = Vec::new();
        for clause_src in source.split('&') {
            let mut clause = Clause::default();
            for alt in clause_src.split('|') {
                let alt = alt.trim();
                if alt.is_empty() {
                    continue;
                }
                match alt.strip_prefix('!') {
                    Some(negated) => {
                        let negated = negated.trim();
                        if negated.is_empty() {
                            return Err("`!` must be followed by a value".into());
                        }
                        clause.reject.push(Pattern::parse(negated));
                    }
                    None => clause.accept.push(Pattern::parse(alt)),
                }
            }
            if clause.accept.is_empty() && clause.reject.is_empty() {
                return Err("empty clause".into());
            }
            clauses.push(clause);
        }
        Ok(Self { clauses })
    }

    /// Lower-case every pattern, for case-insensitive properties
    pub fn fold_case(mut self) -> Self {
        for clause in &mut self.clauses {
            clause.accept.iter_mut().chain(clause.reject.iter_mut()).for_each(Pattern::fold_case);
        }
        self
    }

    /// Test a single (possibly absent) property value
    pub fn matches(&self, value: Option<&str>) -> bool {
        match value {
            Some(v) => self.matches_any(&[v]),
            None => self.matches_any(&[]),
        }
    }

    /// Test a multi-valued property: each clause may be satisfied by a
    /// different value
    pub fn matches_any(&self, values: &[&str]) -> bool {
        self.clauses.iter().all(|c| c.test(values))
    }

    /// Rewrite every exact literal, failing on the first rejected one
    pub fn try_map_exact<E>(mut self, f: impl Fn(&str) -> Result<String, E>) -> Result<Self, E> {
        for clause in &mut self.clauses {
            for pattern in clause.accept.iter_mut().chain(clause.reject.iter_mut()) {
                if let Pattern::Exact(s) = pattern {
                    *s = f(s)?;
                }
            }
        }
        Ok(self)
    }
}

impl fmt::Display for ValueExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |p: &Pattern, neg: bool| {
            let bang = if neg { "!" } else { "" };
            match p {
                Pattern::Exact(s) => format!("{bang}{s}"),
                Pattern::Contains(s) => format!("{bang}*{s}*"),
            }
        };
        let clauses: Vec<String> = self
            .clauses
            .iter()
            .map(|c| {
                c.accept
                    .iter()
                    .map(|p| render(p, false))
                    .chain(c.reject.iter().map(|p| render(p, true)))
                    .collect::<Vec<_>>()
                    .join("|")
            })
            .collect();
        f.write_str(&clauses.join("&"))
    }
}

/// Text filter of a rule's criteria
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextFilter {
    /// Substring of the element's own text content
    Contains(String),
    /// Substring of the text immediately preceding the element
    Previous(String),
}

impl TextFilter {
    /// Marker selecting the previous-text mode
    pub const PREVIOUS_MARKER: char = '<';

    pub fn parse(source: &str) -> Result<Self, String> {
        let filter = match source.strip_prefix(Self::PREVIOUS_MARKER) {
            Some(rest) => Self::Previous(rest.trim().to_string()),
            None => Self::Contains(source.trim().to_string()),
        };
        match &filter {
            Self::Contains(s) | Self::Previous(s) if s.is_empty() => Err("empty text".into()),
            _ => Ok(filter),
        }
    }
}

/// Page-title gate: `title` must equal the page title, or differ from it
/// when negated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleGate {
    pub title: String,
    pub negated: bool,
}

impl TitleGate {
    /// Parse `Title`, `!Title`, or `\!Title` for a literal leading `!`
    pub fn parse(source: &str) -> Result<Self, String> {
        let source = source.trim();
        let (rest, negated) = match source.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (source, false),
        };
        let title = rest.strip_prefix('\\').unwrap_or(rest);
        if title.is_empty() {
            return Err("empty title".into());
        }
        Ok(Self { title: title.to_string(), negated })
    }

    pub fn matches(&self, page_title: &str) -> bool {
        (page_title == self.title) != self.negated
    }
}
