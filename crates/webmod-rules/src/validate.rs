//! Module validation
//!
//! Turns a [`WebModule`] into a [`LoadedModule`]: criteria compiled,
//! context references resolved, gestures normalized. Loading is
//! all-or-nothing; the first configuration error rejects the module.

use std::collections::{HashMap, HashSet};

use crate::criteria::{CompiledCriteria, ContextScope, Criteria};
use crate::error::{Result, RuleError};
use crate::expr::TitleGate;
use crate::keys::Gesture;
use crate::module::{validate_name, WebModule};
use crate::rule::{Action, Rule};

/// One resolved `&` term of a context expression: `a|b` or `!a|b`
///
/// A positive term holds when any of its rules has a match; a negated
/// term when none has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextTerm {
    /// Indices of the alternative context rules
    pub rules: Vec<usize>,
    pub negated: bool,
}

/// One criteria set of a rule, resolved
#[derive(Debug, Clone)]
pub struct CompiledAlternative {
    pub criteria: CompiledCriteria,
    pub context: Vec<ContextTerm>,
    pub scope: ContextScope,
    pub page_title: Option<TitleGate>,
}

/// Rule with everything resolved against its module
#[derive(Debug, Clone)]
pub struct CompiledRule {
    /// Criteria sets in the order they are tried
    pub alternatives: Vec<CompiledAlternative>,
    pub shortcuts: Vec<(Gesture, Action)>,
}

impl CompiledRule {
    /// Context rules referenced by any criteria set
    pub fn dependencies(&self) -> impl Iterator<Item = usize> + '_ {
        self.alternatives
            .iter()
            .flat_map(|alt| &alt.context)
            .flat_map(|term| term.rules.iter().copied())
    }

    pub fn uses_page_title(&self) -> bool {
        self.alternatives.iter().any(|alt| alt.page_title.is_some())
    }
}

/// A validated module, ready for matching
#[derive(Debug, Clone)]
pub struct LoadedModule {
    module: WebModule,
    compiled: Vec<CompiledRule>,
    names: HashMap<String, usize>,
    bindings: HashMap<Gesture, (usize, Action)>,
}

/// Split a context expression into `&` terms of `|` alternatives, each
/// term optionally negated by a leading `!`
pub fn parse_context(source: &str) -> std::result::Result<Vec<(Vec<String>, bool)>, String> {
    let mut terms = Vec::new();
    for raw in source.split('&') {
        let raw = raw.trim();
        let (body, negated) = match raw.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        let mut names = Vec::new();
        for name in body.split('|').map(str::trim) {
            if name.is_empty() {
                return Err("empty context term".into());
            }
            if name.contains('!') {
                return Err(format!("unsupported operator in context term `{}`", raw));
            }
            names.push(name.to_string());
        }
        terms.push((names, negated));
    }
    Ok(terms)
}

impl LoadedModule {
    /// Validate and compile a module
    pub fn load(module: WebModule) -> Result<Self> {
        validate_name(&module.name)?;

        let mut names = HashMap::with_capacity(module.rules.len());
        for (idx, rule) in module.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(RuleError::MalformedName {
                    name: rule.name.clone(),
                    reason: "rule name is empty",
                });
            }
            if names.insert(rule.name.clone(), idx).is_some() {
                return Err(RuleError::DuplicateRule(rule.name.clone()));
            }
        }

        let mut compiled = Vec::with_capacity(module.rules.len());
        let mut bindings: HashMap<Gesture, (usize, Action)> = HashMap::new();
        for (idx, rule) in module.rules.iter().enumerate() {
            let compiled_rule = compile_rule(rule, &module.rules, &names)?;
            for (gesture, action) in &compiled_rule.shortcuts {
                if let Some(&(other, _)) = bindings.get(gesture) {
                    return Err(RuleError::DuplicateGesture {
                        gesture: gesture.to_string(),
                        first: module.rules[other].name.clone(),
                        second: rule.name.clone(),
                    });
                }
                bindings.insert(gesture.clone(), (idx, *action));
            }
            if rule.criteria_sets().any(Criteria::is_empty) {
                tracing::warn!(module = %module.name, rule = %rule.name, "rule has no criteria and matches every element");
            }
            compiled.push(compiled_rule);
        }

        check_cycles(&module.rules, &compiled)?;
        check_page_title(&module.rules, &compiled)?;

        tracing::debug!(module = %module.name, rules = compiled.len(), "module validated");
        Ok(Self { module, compiled, names, bindings })
    }

    pub fn module(&self) -> &WebModule {
        &self.module
    }

    pub fn name(&self) -> &str {
        &self.module.name
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn rule(&self, idx: usize) -> &Rule {
        &self.module.rules[idx]
    }

    pub fn rules(&self) -> &[Rule] {
        &self.module.rules
    }

    pub fn compiled(&self, idx: usize) -> &CompiledRule {
        &self.compiled[idx]
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Rule and action bound to a gesture
    pub fn binding(&self, gesture: &Gesture) -> Option<(usize, Action)> {
        self.bindings.get(gesture).copied()
    }

    /// Every bound gesture, sorted
    pub fn gestures(&self) -> Vec<&Gesture> {
        let mut gestures: Vec<_> = self.bindings.keys().collect();
        gestures.sort();
        gestures
    }
}

fn compile_rule(rule: &Rule, rules: &[Rule], names: &HashMap<String, usize>) -> Result<CompiledRule> {
    let alternatives = rule
        .criteria_sets()
        .map(|criteria| compile_alternative(rule, criteria, rules, names))
        .collect::<Result<Vec<_>>>()?;

    let mut shortcuts = Vec::with_capacity(rule.gestures.len());
    for (source, action) in &rule.gestures {
        let gesture = Gesture::parse(source).map_err(|message| RuleError::InvalidGesture {
            rule: rule.name.clone(),
            gesture: source.clone(),
            message,
        })?;
        if shortcuts.iter().any(|(g, _)| *g == gesture) {
            return Err(RuleError::DuplicateGesture {
                gesture: gesture.to_string(),
                first: rule.name.clone(),
                second: rule.name.clone(),
            });
        }
        shortcuts.push((gesture, *action));
    }

    Ok(CompiledRule { alternatives, shortcuts })
}

fn compile_alternative(
    rule: &Rule,
    criteria: &Criteria,
    rules: &[Rule],
    names: &HashMap<String, usize>,
) -> Result<CompiledAlternative> {
    let invalid = |field: &'static str, source_text: &str, message: String| RuleError::InvalidExpression {
        rule: rule.name.clone(),
        field,
        source_text: source_text.to_string(),
        message,
    };

    let compiled = criteria
        .compile()
        .map_err(|(field, source_text, message)| invalid(field, &source_text, message))?;

    let mut context = Vec::new();
    if let Some(source) = criteria.context.as_deref().filter(|s| !s.trim().is_empty()) {
        let terms = parse_context(source).map_err(|message| invalid("context", source, message))?;
        for (alternatives, negated) in terms {
            let mut resolved = Vec::with_capacity(alternatives.len());
            for name in alternatives {
                let idx = *names.get(&name).ok_or_else(|| RuleError::UnknownContext {
                    rule: rule.name.clone(),
                    context: name.clone(),
                })?;
                if !rules[idx].is_context {
                    return Err(RuleError::NotAContext { rule: rule.name.clone(), context: name });
                }
                resolved.push(idx);
            }
            context.push(ContextTerm { rules: resolved, negated });
        }
    }

    let page_title = match criteria.context_page_title.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(source) => Some(TitleGate::parse(source).map_err(|message| invalid("contextPageTitle", source, message))?),
        None => None,
    };

    Ok(CompiledAlternative { criteria: compiled, context, scope: criteria.context_scope, page_title })
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    Active,
    Done,
}

/// Reject self-referencing context chains, direct or transitive
fn check_cycles(rules: &[Rule], compiled: &[CompiledRule]) -> Result<()> {
    fn visit(
        idx: usize,
        rules: &[Rule],
        compiled: &[CompiledRule],
        state: &mut [Visit],
        stack: &mut Vec<usize>,
    ) -> Result<()> {
        match state[idx] {
            Visit::Done => return Ok(()),
            Visit::Active => {
                let start = stack.iter().position(|&i| i == idx).unwrap_or(0);
                let path = stack[start..]
                    .iter()
                    .chain(std::iter::once(&idx))
                    .map(|&i| rules[i].name.clone())
                    .collect();
                return Err(RuleError::ContextCycle { path });
            }
            Visit::New => {}
        }
        state[idx] = Visit::Active;
        stack.push(idx);
        for dep in compiled[idx].dependencies() {
            visit(dep, rules, compiled, state, stack)?;
        }
        stack.pop();
        state[idx] = Visit::Done;
        Ok(())
    }

    let mut state = vec![Visit::New; compiled.len()];
    let mut stack = Vec::new();
    for idx in 0..compiled.len() {
        visit(idx, rules, compiled, &mut state, &mut stack)?;
    }
    Ok(())
}

/// Page-title rules may not depend on the page title, even through their
/// context rules
fn check_page_title(rules: &[Rule], compiled: &[CompiledRule]) -> Result<()> {
    for (idx, rule) in rules.iter().enumerate().filter(|(_, r)| r.is_page_title) {
        let mut seen = HashSet::new();
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if compiled[current].uses_page_title() {
                return Err(RuleError::PageTitleLoop {
                    rule: rule.name.clone(),
                    via: rules[current].name.clone(),
                });
            }
            stack.extend(compiled[current].dependencies());
        }
    }
    Ok(())
}
