//! Criteria proposals
//!
//! Given an element the user is on, suggest criteria values from the most
//! specific (the element's own properties) to the most general (properties
//! of distant ancestors).

use std::collections::HashSet;
use std::fmt;

use webmod_dom::{NodeId, Page};

use crate::criteria::Criteria;
use crate::expr::TextFilter;

/// Criteria field a proposal fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Text,
    PreviousText,
    Id,
    ClassName,
    Src,
    Role,
    States,
    Tag,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::PreviousText => "previous text",
            Self::Id => "id",
            Self::ClassName => "className",
            Self::Src => "src",
            Self::Role => "role",
            Self::States => "states",
            Self::Tag => "tag",
        }
    }
}

/// One suggested criteria value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub field: Field,
    pub value: String,
    /// Ancestor generalizations needed: 0 for the element itself
    pub distance: usize,
}

impl Proposal {
    /// Criteria made of this proposal alone
    pub fn to_criteria(&self) -> Criteria {
        let value = Some(self.value.clone());
        match self.field {
            Field::Text => Criteria { text: value, ..Default::default() },
            Field::PreviousText => Criteria {
                text: Some(format!("{}{}", TextFilter::PREVIOUS_MARKER, self.value)),
                ..Default::default()
            },
            Field::Id => Criteria { id: value, ..Default::default() },
            Field::ClassName => Criteria { class_name: value, ..Default::default() },
            Field::Src => Criteria { src: value, ..Default::default() },
            Field::Role => Criteria { role: value, ..Default::default() },
            Field::States => Criteria { states: value, ..Default::default() },
            Field::Tag => Criteria { tag: value, ..Default::default() },
        }
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}={:?}", self.distance, self.field.as_str(), self.value)
    }
}

/// Proposals for an element, most specific first
///
/// Ordered by distance, then by field; a value seen nearer the element
/// hides the same value further up.
pub fn propose(page: &Page, element: NodeId) -> Vec<Proposal> {
    let Some(_) = page.element(element) else {
        return Vec::new();
    };

    let mut raw = Vec::new();
    let text = page.text(element);
    if !text.is_empty() {
        raw.push(Proposal { field: Field::Text, value: text, distance: 0 });
    }
    if let Some(prev) = page.previous_text(element) {
        raw.push(Proposal { field: Field::PreviousText, value: prev.to_string(), distance: 0 });
    }

    let chain = std::iter::once(element).chain(page.tree().ancestors(element));
    for (distance, id) in chain.enumerate() {
        let Some(elem) = page.element(id) else { continue };
        let mut push = |field, value: &str| {
            raw.push(Proposal { field, value: value.to_string(), distance });
        };
        if let Some(value) = elem.id.as_deref() {
            push(Field::Id, value);
        }
        for class in &elem.classes {
            push(Field::ClassName, class);
        }
        if let Some(value) = elem.src_file_name() {
            push(Field::Src, value);
        }
        if let Some(role) = elem.role() {
            push(Field::Role, role.as_str());
        }
        let states = elem.states();
        if !states.is_empty() {
            let joined: Vec<&str> = states.iter().map(|s| s.as_str()).collect();
            push(Field::States, &joined.join(" & "));
        }
        push(Field::Tag, &elem.tag);
    }

    raw.sort_by(|a, b| a.distance.cmp(&b.distance).then(a.field.cmp(&b.field)));
    let mut seen = HashSet::new();
    raw.retain(|p| seen.insert((p.field, p.value.clone())));
    raw
}
