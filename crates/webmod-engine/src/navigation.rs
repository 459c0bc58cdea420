//! Paging navigation
//!
//! Next/previous result in document order, across every rule's match set.
//! Three levels, as bound by the host:
//!
//! - zones only ([`NavQuery::zones`])
//! - zones and markers, skipping `skip_page_down` results and the content
//!   of skipped zones the caret is not in ([`NavQuery::default`])
//! - results inside the current zone ([`NavQuery::in_zone`])

use webmod_dom::{NodeId, Page};
use webmod_rules::{LoadedModule, MatchResult};

/// Paging direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// Paging request
#[derive(Debug, Clone)]
pub struct NavQuery {
    /// Restrict to one rule; also lifts `skip_page_down`
    pub rule: Option<String>,
    /// Wrap around at either end
    pub cycle: bool,
    /// Zone results only
    pub zones_only: bool,
    /// Stay inside the current zone
    pub respect_zone: bool,
}

impl Default for NavQuery {
    fn default() -> Self {
        Self { rule: None, cycle: true, zones_only: false, respect_zone: false }
    }
}

impl NavQuery {
    pub fn rule(name: &str) -> Self {
        Self { rule: Some(name.to_string()), ..Self::default() }
    }

    pub fn zones() -> Self {
        Self { zones_only: true, ..Self::default() }
    }

    pub fn in_zone() -> Self {
        Self { respect_zone: true, cycle: false, ..Self::default() }
    }

    pub fn with_cycle(mut self, cycle: bool) -> Self {
        self.cycle = cycle;
        self
    }

    fn honours_skip(&self) -> bool {
        self.rule.is_none() && !self.zones_only && !self.respect_zone
    }

    /// What is announced when paging finds nothing
    pub fn not_found(&self, direction: Direction, zone: Option<&Zone>) -> String {
        if self.zones_only {
            return match (zone, direction) {
                (None, _) => "No zone",
                (Some(_), Direction::Next) => "No next zone",
                (Some(_), Direction::Previous) => "No previous zone",
            }
            .to_string();
        }
        let base = match (self.cycle, direction) {
            (true, _) => "No marker",
            (false, Direction::Next) => "No next marker",
            (false, Direction::Previous) => "No previous marker",
        };
        match zone {
            Some(_) if self.respect_zone => format!("{base} in this zone"),
            _ => base.to_string(),
        }
    }
}

/// The current zone: a zone rule's element, whose subtree bounds in-zone
/// paging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    pub rule: usize,
    pub element: NodeId,
}

impl Zone {
    /// The zone element itself or any of its descendants
    pub fn contains(&self, page: &Page, element: NodeId) -> bool {
        element == self.element || page.tree().is_ancestor(self.element, element)
    }

    fn is(&self, stop: &Stop) -> bool {
        stop.rule == self.rule && stop.element == self.element
    }
}

/// Where paging starts from
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub caret: Option<NodeId>,
    pub zone: Option<Zone>,
}

/// A paging stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stop {
    pub rule: usize,
    pub element: NodeId,
    pub position: usize,
}

/// Every navigable stop, document order; one stop per element, earliest
/// rule wins
pub fn stops(module: &LoadedModule, page: &Page, results: &[MatchResult], cursor: &Cursor, query: &NavQuery) -> Vec<Stop> {
    let skipped_zones: Vec<Zone> = if query.honours_skip() {
        results
            .iter()
            .filter(|r| module.rule(r.rule).is_zone() && module.rule(r.rule).skip_page_down)
            .flat_map(|r| r.matches.iter().map(|&element| Zone { rule: r.rule, element }))
            .filter(|zone| !cursor.caret.is_some_and(|caret| zone.contains(page, caret)))
            .collect()
    } else {
        Vec::new()
    };
    let zone = cursor.zone.filter(|_| query.respect_zone);

    let mut stops: Vec<Stop> = Vec::new();
    for result in results {
        let rule = module.rule(result.rule);
        if query.zones_only && !rule.is_zone() {
            continue;
        }
        match &query.rule {
            Some(name) if *name != rule.name => continue,
            None if query.honours_skip() && rule.skip_page_down => continue,
            _ => {}
        }
        for &element in &result.matches {
            if skipped_zones.iter().any(|z| z.contains(page, element)) {
                continue;
            }
            let Some(position) = page.position(element) else { continue };
            let stop = Stop { rule: result.rule, element, position };
            if let Some(zone) = &zone {
                if !zone.contains(page, element) || zone.is(&stop) {
                    continue;
                }
            }
            stops.push(stop);
        }
    }
    stops.sort_by_key(|s| (s.position, s.rule));
    stops.dedup_by_key(|s| s.position);
    stops
}

/// Find the stop after (or before) the caret, wrapping when the query
/// cycles
///
/// Without a caret, next finds the first stop and previous the last.
/// Stepping back from inside a zone skips the zone's own stop.
pub fn find(
    module: &LoadedModule,
    page: &Page,
    results: &[MatchResult],
    cursor: &Cursor,
    direction: Direction,
    query: &NavQuery,
) -> Option<Stop> {
    let stops = stops(module, page, results, cursor, query);
    let from = cursor.caret.and_then(|c| page.position(c));

    let pick = |relative: bool| {
        let eligible = |s: &&Stop| {
            if !relative {
                return true;
            }
            let ahead = match (direction, from) {
                (_, None) => true,
                (Direction::Next, Some(pos)) => s.position > pos,
                (Direction::Previous, Some(pos)) => s.position < pos,
            };
            let own_zone = direction == Direction::Previous && cursor.zone.is_some_and(|z| z.is(s));
            ahead && !own_zone
        };
        match direction {
            Direction::Next => stops.iter().find(eligible),
            Direction::Previous => stops.iter().rev().find(eligible),
        }
        .copied()
    };

    pick(true).or_else(|| {
        if !query.cycle {
            return None;
        }
        let wrapped = pick(false);
        if wrapped.is_some() {
            tracing::debug!(?direction, "paging wrapped around");
        }
        wrapped
    })
}
