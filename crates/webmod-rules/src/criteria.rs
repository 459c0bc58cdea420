//! Criteria
//!
//! Conjunction of optional element filters. The serialized form keeps the
//! user's expressions verbatim; [`CompiledCriteria`] is what the matcher
//! runs.

use serde::{Deserialize, Serialize};
use webmod_dom::{NodeId, Page, Role, State};

use crate::expr::{TextFilter, ValueExpr};

/// How a rule's context terms apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContextScope {
    /// Context terms gate the whole rule
    #[default]
    Page,
    /// Positive terms restrict candidates to descendants of the context's
    /// matches; negated terms exclude those descendants
    Within,
}

impl ContextScope {
    fn is_page(&self) -> bool {
        *self == Self::Page
    }
}

/// Element filters of a rule, as written by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Criteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// State names, e.g. `expanded & !disabled`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub states: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "ContextScope::is_page")]
    pub context_scope: ContextScope,
    /// Exact page title required (`!` negates)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_page_title: Option<String>,
}

impl Criteria {
    pub fn tag(value: &str) -> Self {
        Self { tag: Some(value.into()), ..Default::default() }
    }

    pub fn role(value: &str) -> Self {
        Self { role: Some(value.into()), ..Default::default() }
    }

    pub fn text(value: &str) -> Self {
        Self { text: Some(value.into()), ..Default::default() }
    }

    pub fn with_context(mut self, expr: &str) -> Self {
        self.context = Some(expr.into());
        self
    }

    pub fn with_page_title(mut self, expr: &str) -> Self {
        self.context_page_title = Some(expr.into());
        self
    }

    pub fn within(mut self) -> Self {
        self.context_scope = ContextScope::Within;
        self
    }

    /// Check that no filter is set
    pub fn is_empty(&self) -> bool {
        [
            &self.text,
            &self.role,
            &self.tag,
            &self.id,
            &self.class_name,
            &self.src,
            &self.states,
            &self.context,
            &self.context_page_title,
        ]
        .iter()
        .all(|f| f.as_deref().is_none_or(|s| s.trim().is_empty()))
    }

    /// Compile the element filters (context and page title are resolved by
    /// the module)
    pub fn compile(&self) -> Result<CompiledCriteria, (&'static str, String, String)> {
        fn field<T>(
            name: &'static str,
            value: &Option<String>,
            parse: impl Fn(&str) -> Result<T, String>,
        ) -> Result<Option<T>, (&'static str, String, String)> {
            match value.as_deref().map(str::trim) {
                None | Some("") => Ok(None),
                Some(src) => parse(src).map(Some).map_err(|msg| (name, src.to_string(), msg)),
            }
        }

        // Aliases such as `none` compare as their canonical role name
        let role = field("role", &self.role, |s| {
            ValueExpr::parse(s)?.fold_case().try_map_exact(|lit| {
                Role::parse(lit)
                    .map(|r| r.as_str().to_string())
                    .ok_or_else(|| format!("unknown role `{}`", lit))
            })
        })?;

        Ok(CompiledCriteria {
            text: field("text", &self.text, TextFilter::parse)?,
            role,
            tag: field("tag", &self.tag, |s| ValueExpr::parse(s).map(ValueExpr::fold_case))?,
            id: field("id", &self.id, ValueExpr::parse)?,
            class_name: field("className", &self.class_name, ValueExpr::parse_class)?,
            src: field("src", &self.src, ValueExpr::parse)?,
            states: field("states", &self.states, |s| {
                ValueExpr::parse(s)?.fold_case().try_map_exact(|lit| {
                    State::parse(lit)
                        .map(|st| st.as_str().to_string())
                        .ok_or_else(|| format!("unknown state `{}`", lit))
                })
            })?,
        })
    }
}

/// Element filters ready to run
#[derive(Debug, Clone, Default)]
pub struct CompiledCriteria {
    pub text: Option<TextFilter>,
    pub role: Option<ValueExpr>,
    pub tag: Option<ValueExpr>,
    pub id: Option<ValueExpr>,
    pub class_name: Option<ValueExpr>,
    pub src: Option<ValueExpr>,
    pub states: Option<ValueExpr>,
}

impl CompiledCriteria {
    /// Test one element against every filter
    pub fn matches(&self, page: &Page, id: NodeId) -> bool {
        let Some(elem) = page.element(id) else {
            return false;
        };
        if let Some(tag) = &self.tag {
            if !tag.matches(Some(&elem.tag)) {
                return false;
            }
        }
        if let Some(role) = &self.role {
            if !role.matches(elem.role().map(|r| r.as_str())) {
                return false;
            }
        }
        if let Some(expr) = &self.id {
            if !expr.matches(elem.id.as_deref()) {
                return false;
            }
        }
        if let Some(expr) = &self.class_name {
            let classes: Vec<&str> = elem.classes.iter().map(String::as_str).collect();
            if !expr.matches_any(&classes) {
                return false;
            }
        }
        if let Some(expr) = &self.src {
            if !expr.matches(elem.src_file_name()) {
                return false;
            }
        }
        if let Some(expr) = &self.states {
            let states: Vec<&str> = elem.states().iter().map(State::as_str).collect();
            if !expr.matches_any(&states) {
                return false;
            }
        }
        match &self.text {
            None => true,
            Some(TextFilter::Contains(needle)) => page.text(id).contains(needle.as_str()),
            Some(TextFilter::Previous(needle)) => {
                page.previous_text(id).is_some_and(|t| t.contains(needle.as_str()))
            }
        }
    }

    /// Nested matches collapse to the innermost one
    pub fn keeps_innermost(&self) -> bool {
        matches!(self.text, Some(TextFilter::Contains(_)))
    }
}
