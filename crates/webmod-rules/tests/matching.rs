//! Matching tests for webmod-rules
//!
//! Whole modules evaluated against parsed pages.

use webmod_dom::{NodeId, Page};
use webmod_rules::{evaluate, Action, Criteria, LoadedModule, Rule, RuleError, WebModule};

fn page(html: &str) -> Page {
    webmod_html::parse(html, "https://shop.example.com/list", "Shop").unwrap()
}

fn load(rules: Vec<Rule>) -> LoadedModule {
    let mut module = WebModule::new("shop").with_url("shop.example.com");
    module.rules = rules;
    LoadedModule::load(module).unwrap()
}

fn tags_of(page: &Page, tag: &str) -> Vec<NodeId> {
    page.elements()
        .iter()
        .copied()
        .filter(|&id| page.element(id).is_some_and(|e| e.tag == tag))
        .collect()
}

const LIST: &str = r#"
    <h1>Products</h1>
    <ul id="products">
      <li class="item">One</li>
      <li class="item sale">Two</li>
      <li class="item">Three <ul><li class="sub">Three-A</li></ul></li>
      <li class="item sale">Four</li>
      <li class="item">Five</li>
    </ul>
"#;

// ============================================================================
// Tag-only rules
// ============================================================================

#[test]
fn test_tag_only_matches_every_element_of_tag_in_document_order() {
    let page = page(LIST);
    let module = load(vec![Rule::new("items", Criteria::tag("li"))]);
    let results = evaluate(&module, &page);
    assert_eq!(results[0].candidates, tags_of(&page, "li"));
}

#[test]
fn test_single_rule_match_set_has_at_most_one_element() {
    let page = page(LIST);
    let module = load(vec![Rule::new("items", Criteria::tag("li"))]);
    let results = evaluate(&module, &page);
    assert_eq!(results[0].candidates.len(), 6);
    assert_eq!(results[0].matches.len(), 1);
}

#[test]
fn test_multiple_rule_keeps_every_candidate() {
    let page = page(LIST);
    let mut rule = Rule::new("sales", Criteria { class_name: Some("item sale".into()), ..Default::default() });
    rule.multiple = true;
    let results = evaluate(&load(vec![rule]), &page);
    let texts: Vec<String> = results[0].matches.iter().map(|&id| page.text(id)).collect();
    assert_eq!(texts, vec!["Two", "Four"]);
}

#[test]
fn test_index_selects_third_of_five() {
    let page = page("<p>a</p><p>b</p><p>c</p><p>d</p><p>e</p>");
    let mut rule = Rule::new("third", Criteria::tag("p"));
    rule.index = 2;
    let results = evaluate(&load(vec![rule]), &page);
    assert_eq!(results[0].candidates.len(), 5);
    let primary = results[0].primary.unwrap();
    assert_eq!(primary, results[0].candidates[2]);
    assert_eq!(page.text(primary), "c");
    assert_eq!(results[0].matches, vec![primary]);
}

#[test]
fn test_no_match_is_empty_not_error() {
    let page = page(LIST);
    let module = load(vec![Rule::new("search", Criteria::role("searchbox"))]);
    let results = evaluate(&module, &page);
    assert!(results[0].candidates.is_empty());
    assert!(!results[0].is_active());
}

// ============================================================================
// Value expressions
// ============================================================================

#[test]
fn test_id_wildcard_and_negation() {
    let page = page(r#"<div id="ad-top"></div><div id="main-ad"></div><div id="content"></div>"#);
    let module = load(vec![
        Rule::new("ads", Criteria { id: Some("*ad*".into()), ..Default::default() }),
        Rule::new("not-ads", Criteria { tag: Some("div".into()), id: Some("!*ad*".into()), ..Default::default() }),
    ]);
    let results = evaluate(&module, &page);
    assert_eq!(results[0].candidates.len(), 2);
    let kept = results[1].primary.unwrap();
    assert_eq!(page.element(kept).unwrap().id.as_deref(), Some("content"));
}

#[test]
fn test_src_file_name_and_previous_text() {
    let page = page(r#"<img src="/i/logo.png?x=1"><span>Password</span><input type="password">"#);
    let module = load(vec![
        Rule::new("logo", Criteria { src: Some("logo.png".into()), ..Default::default() }),
        Rule::new("password", Criteria { tag: Some("input".into()), text: Some("<Password".into()), ..Default::default() }),
    ]);
    let results = evaluate(&module, &page);
    assert!(results[0].is_active());
    assert!(results[1].is_active());
}

// ============================================================================
// Context
// ============================================================================

#[test]
fn test_negated_context_follows_context_presence() {
    let rules = || {
        vec![
            Rule::new("dialog", Criteria::role("dialog")).context(),
            Rule::new("button", Criteria::tag("button").with_context("!dialog"))
                .with_gesture("kb:control+b", Action::MoveTo),
        ]
    };

    let without_dialog = page("<button>Ok</button>");
    let results = evaluate(&load(rules()), &without_dialog);
    assert!(!results[0].is_active());
    assert!(results[1].is_active());

    let with_dialog = page(r#"<div role="dialog">Hi</div><button>Ok</button>"#);
    let results = evaluate(&load(rules()), &with_dialog);
    assert!(results[0].is_active());
    assert!(!results[1].is_active());
}

#[test]
fn test_positive_context_gate() {
    let rules = vec![
        Rule::new("cart", Criteria { id: Some("cart".into()), ..Default::default() }).context(),
        Rule::new("checkout", Criteria::tag("button").with_context("cart")),
    ];
    let module = load(rules);

    let results = evaluate(&module, &page(r#"<button>Pay</button>"#));
    assert!(!results[1].is_active());

    let results = evaluate(&module, &page(r#"<div id="cart"></div><button>Pay</button>"#));
    assert!(results[1].is_active());
}

#[test]
fn test_self_referencing_context_rejected() {
    for rules in [
        vec![Rule::new("a", Criteria::tag("a").with_context("a")).context()],
        vec![
            Rule::new("a", Criteria::tag("a").with_context("!b")).context(),
            Rule::new("b", Criteria::tag("b").with_context("a")).context(),
        ],
    ] {
        let mut module = WebModule::new("cyclic");
        module.rules = rules;
        let err = LoadedModule::load(module).unwrap_err();
        assert!(matches!(err, RuleError::ContextCycle { .. }), "got {err}");
    }
}
