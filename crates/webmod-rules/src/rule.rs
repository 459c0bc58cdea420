//! Rules and actions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::criteria::Criteria;

/// What a rule does to its primary match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Move the virtual cursor and announce
    #[serde(rename = "moveto")]
    MoveTo,
    /// Announce without moving
    #[serde(rename = "speak")]
    Speak,
    /// Move and start continuous reading
    #[serde(rename = "sayall")]
    SayAll,
    /// Simulated click
    #[serde(rename = "activate")]
    Activate,
    /// Simulated mouse move
    #[serde(rename = "mouseMove")]
    MouseMove,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Self::MoveTo => "Move to",
            Self::Speak => "Speak",
            Self::SayAll => "Say all",
            Self::Activate => "Activate",
            Self::MouseMove => "Mouse move",
        }
    }

    /// Actions that move the virtual cursor
    pub fn moves_cursor(&self) -> bool {
        matches!(self, Self::MoveTo | Self::SayAll)
    }

    /// Actions that may change the page
    pub fn may_mutate(&self) -> bool {
        matches!(self, Self::Activate | Self::MouseMove)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How paging treats a rule's matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    /// A paging stop
    #[default]
    Marker,
    /// A region: moving to it restricts in-zone paging to its subtree
    Zone,
}

impl RuleKind {
    fn is_marker(&self) -> bool {
        *self == Self::Marker
    }
}

fn default_true() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &usize) -> bool {
    *value == 0
}

/// A named matcher with its bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Rule {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "RuleKind::is_marker")]
    pub kind: RuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub criteria: Criteria,
    /// Tried in order when `criteria` finds no primary match
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Criteria>,
    /// Which candidate is the primary match (0-based)
    #[serde(default, skip_serializing_if = "is_zero")]
    pub index: usize,
    /// Keep every candidate in the match set
    #[serde(default, skip_serializing_if = "is_false")]
    pub multiple: bool,
    /// `None` defers to whether the primary match is an edit field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_mode: Option<bool>,
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub speak_name: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub skip_page_down: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_page_title: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_context: bool,
    /// Gesture identifier -> action
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub gestures: BTreeMap<String, Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_action: Option<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_value: Option<String>,
}

impl Rule {
    pub fn new(name: &str, criteria: Criteria) -> Self {
        Self {
            name: name.to_string(),
            kind: RuleKind::Marker,
            comment: None,
            criteria,
            alternatives: Vec::new(),
            index: 0,
            multiple: false,
            form_mode: None,
            speak_name: true,
            skip_page_down: false,
            is_page_title: false,
            is_context: false,
            gestures: BTreeMap::new(),
            auto_action: None,
            custom_name: None,
            custom_value: None,
        }
    }

    pub fn with_gesture(mut self, gesture: &str, action: Action) -> Self {
        self.gestures.insert(gesture.to_string(), action);
        self
    }

    pub fn with_auto_action(mut self, action: Action) -> Self {
        self.auto_action = Some(action);
        self
    }

    pub fn with_alternative(mut self, criteria: Criteria) -> Self {
        self.alternatives.push(criteria);
        self
    }

    pub fn zone(mut self) -> Self {
        self.kind = RuleKind::Zone;
        self
    }

    pub fn context(mut self) -> Self {
        self.is_context = true;
        self
    }

    /// Every criteria set, in the order they are tried
    pub fn criteria_sets(&self) -> impl Iterator<Item = &Criteria> {
        std::iter::once(&self.criteria).chain(&self.alternatives)
    }

    pub fn is_zone(&self) -> bool {
        self.kind == RuleKind::Zone
    }

    /// Name spoken on trigger
    pub fn label(&self) -> &str {
        self.custom_name.as_deref().filter(|s| !s.is_empty()).unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_json() {
        let rule: Rule = serde_json::from_str(r#"{"name": "Search", "criteria": {"tag": "input"}}"#).unwrap();
        assert_eq!(rule.index, 0);
        assert!(rule.speak_name);
        assert!(!rule.multiple);
        assert_eq!(rule.form_mode, None);
        assert!(rule.gestures.is_empty());
    }

    #[test]
    fn test_serializes_only_non_defaults() {
        let rule = Rule::new("Menu", Criteria::tag("nav"))
            .with_gesture("kb:control+m", Action::MoveTo)
            .with_auto_action(Action::Speak);
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Menu",
                "criteria": {"tag": "nav"},
                "gestures": {"kb:control+m": "moveto"},
                "autoAction": "speak"
            })
        );
    }

    #[test]
    fn test_zone_and_alternatives_json() {
        let json = r#"{
            "name": "Results",
            "type": "zone",
            "criteria": {"id": "results"},
            "alternatives": [{"className": "results"}]
        }"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert!(rule.is_zone());
        let sets: Vec<&Criteria> = rule.criteria_sets().collect();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[1].class_name.as_deref(), Some("results"));

        let back = serde_json::to_value(Rule::new("m", Criteria::tag("a"))).unwrap();
        assert!(back.get("type").is_none());
        assert!(back.get("alternatives").is_none());
        assert!(serde_json::from_str::<Rule>(r#"{"name": "x", "type": "landmark"}"#).is_err());
    }

    #[test]
    fn test_label_prefers_custom_name() {
        let mut rule = Rule::new("btn-1", Criteria::default());
        assert_eq!(rule.label(), "btn-1");
        rule.custom_name = Some("Send".into());
        assert_eq!(rule.label(), "Send");
    }

    #[test]
    fn test_action_ids() {
        let actions: Vec<Action> = serde_json::from_str(r#"["moveto", "sayall", "mouseMove"]"#).unwrap();
        assert_eq!(actions, vec![Action::MoveTo, Action::SayAll, Action::MouseMove]);
        assert!(Action::SayAll.moves_cursor());
        assert!(Action::Activate.may_mutate());
    }
}
