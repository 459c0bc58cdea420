//! Rule matcher
//!
//! Evaluates a loaded module against one page snapshot. Results are
//! memoized for the lifetime of a [`Matcher`], so context rules shared by
//! several rules are evaluated once per pass.

use webmod_dom::{NodeId, Page};

use crate::criteria::ContextScope;
use crate::title::page_title;
use crate::validate::{CompiledAlternative, LoadedModule};

/// Result of evaluating one rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Index of the rule in its module
    pub rule: usize,
    /// Criteria set that produced the primary match (0 is the rule's own)
    pub alternative: Option<usize>,
    /// Every qualifying element, document order
    pub candidates: Vec<NodeId>,
    /// Element shortcuts act on
    pub primary: Option<NodeId>,
    /// Navigable elements: every candidate for `multiple` rules, else the
    /// primary alone
    pub matches: Vec<NodeId>,
}

impl MatchResult {
    fn empty(rule: usize) -> Self {
        Self { rule, ..Default::default() }
    }

    /// A rule is active when it has a primary match
    pub fn is_active(&self) -> bool {
        self.primary.is_some()
    }
}

/// Single evaluation pass over a page
pub struct Matcher<'a> {
    module: &'a LoadedModule,
    page: &'a Page,
    cache: Vec<Option<MatchResult>>,
    title: Option<String>,
}

impl<'a> Matcher<'a> {
    pub fn new(module: &'a LoadedModule, page: &'a Page) -> Self {
        Self { module, page, cache: vec![None; module.len()], title: None }
    }

    /// Evaluate one rule (and, transitively, its context rules)
    pub fn evaluate(&mut self, rule: usize) -> Option<&MatchResult> {
        self.ensure(rule);
        self.cache.get(rule).and_then(Option::as_ref)
    }

    /// Page title as seen by `contextPageTitle` gates
    pub fn page_title(&mut self) -> &str {
        self.ensure_title();
        self.title.as_deref().unwrap_or_default()
    }

    /// Evaluate every rule, module order
    pub fn evaluate_all(mut self) -> Vec<MatchResult> {
        for rule in 0..self.module.len() {
            self.ensure(rule);
        }
        let results: Vec<MatchResult> = self
            .cache
            .into_iter()
            .enumerate()
            .map(|(rule, r)| r.unwrap_or_else(|| MatchResult::empty(rule)))
            .collect();
        tracing::debug!(
            module = self.module.name(),
            url = self.page.url(),
            active = results.iter().filter(|r| r.is_active()).count(),
            "evaluation pass complete"
        );
        results
    }

    fn ensure(&mut self, rule: usize) {
        if rule >= self.cache.len() || self.cache[rule].is_some() {
            return;
        }
        // Context rules first; validation guarantees the graph is acyclic
        let module = self.module;
        let compiled = module.compiled(rule);
        for dep in compiled.dependencies() {
            self.ensure(dep);
        }
        if compiled.uses_page_title() {
            self.ensure_title();
        }
        let result = self.compute(rule);
        self.cache[rule] = Some(result);
    }

    /// Page-title rules never depend on the title, so this cannot recurse
    fn ensure_title(&mut self) {
        if self.title.is_some() {
            return;
        }
        let title_rules: Vec<usize> = (0..self.module.len()).filter(|&i| self.module.rule(i).is_page_title).collect();
        for &rule in &title_rules {
            self.ensure(rule);
        }
        let title = page_title(
            self.module,
            self.page,
            title_rules.iter().filter_map(|&i| self.cache[i].as_ref()),
        );
        tracing::trace!(title = %title, "page title resolved");
        self.title = Some(title);
    }

    /// Matches of any of the given context rules
    fn context_matches<'s>(&'s self, rules: &'s [usize]) -> impl Iterator<Item = NodeId> + 's {
        rules
            .iter()
            .filter_map(|&rule| self.cache.get(rule).and_then(Option::as_ref))
            .flat_map(|r| r.matches.iter().copied())
    }

    fn compute(&self, idx: usize) -> MatchResult {
        let rule = self.module.rule(idx);
        let mut fallback: Option<Vec<NodeId>> = None;

        for (alt_idx, alt) in self.module.compiled(idx).alternatives.iter().enumerate() {
            let Some(candidates) = self.candidates(idx, alt) else {
                continue;
            };
            let Some(&primary) = candidates.get(rule.index) else {
                if fallback.is_none() && !candidates.is_empty() {
                    fallback = Some(candidates);
                }
                continue;
            };
            let matches = if rule.multiple { candidates.clone() } else { vec![primary] };
            tracing::trace!(rule = %rule.name, alternative = alt_idx, candidates = candidates.len(), "rule evaluated");
            return MatchResult { rule: idx, alternative: Some(alt_idx), candidates, primary: Some(primary), matches };
        }

        tracing::trace!(rule = %rule.name, "rule not found");
        MatchResult { candidates: fallback.unwrap_or_default(), ..MatchResult::empty(idx) }
    }

    /// Candidates of one criteria set, `None` when a page gate fails
    fn candidates(&self, idx: usize, alt: &CompiledAlternative) -> Option<Vec<NodeId>> {
        if let Some(gate) = &alt.page_title {
            if !gate.matches(self.title.as_deref().unwrap_or_default()) {
                tracing::trace!(rule = %self.module.rule(idx).name, "page title not satisfied");
                return None;
            }
        }

        if alt.scope == ContextScope::Page {
            for term in &alt.context {
                let present = self.context_matches(&term.rules).next().is_some();
                if present == term.negated {
                    tracing::trace!(rule = %self.module.rule(idx).name, "context not satisfied");
                    return None;
                }
            }
        }

        let mut candidates: Vec<NodeId> = self
            .page
            .elements()
            .iter()
            .copied()
            .filter(|&id| alt.criteria.matches(self.page, id))
            .collect();

        if alt.criteria.keeps_innermost() {
            candidates = innermost(self.page, candidates);
        }

        if alt.scope == ContextScope::Within {
            let tree = self.page.tree();
            for term in &alt.context {
                let roots: Vec<NodeId> = self.context_matches(&term.rules).collect();
                candidates.retain(|&id| {
                    let inside = roots.iter().any(|&root| tree.is_ancestor(root, id));
                    inside != term.negated
                });
            }
        }
        Some(candidates)
    }
}

/// Drop every candidate that contains another candidate
fn innermost(page: &Page, candidates: Vec<NodeId>) -> Vec<NodeId> {
    let tree = page.tree();
    let mut containers = std::collections::HashSet::new();
    for &id in &candidates {
        containers.extend(tree.ancestors(id));
    }
    candidates.into_iter().filter(|id| !containers.contains(id)).collect()
}

/// Evaluate every rule of a module against a page
pub fn evaluate(module: &LoadedModule, page: &Page) -> Vec<MatchResult> {
    Matcher::new(module, page).evaluate_all()
}
