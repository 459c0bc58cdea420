//! Integration tests for webmod-engine
//!
//! Pages flow through the engine the way a host delivers them; every
//! effect is captured by a [`Recorder`].

use std::time::{Duration, Instant};

use webmod_dom::{ElementKey, Page};
use webmod_engine::{
    CascadeLimit, Config, Diagnostic, Direction, Effect, Engine, Event, EventLoop, ExecError, NavQuery, Recorder,
};
use webmod_rules::{Action, Criteria, Gesture, ModuleStore, Rule, WebModule};

const URL: &str = "https://mail.example.com/inbox";

fn page(html: &str) -> Page {
    webmod_html::parse(html, URL, "Mail").unwrap()
}

fn engine(rules: Vec<Rule>) -> Engine {
    engine_with(Config::default(), rules)
}

fn engine_with(config: Config, rules: Vec<Rule>) -> Engine {
    let mut module = WebModule::new("Mail").with_url("mail.example.com");
    module.rules = rules;
    Engine::with_modules(config, vec![module]).unwrap()
}

fn by_id(id: &str) -> Criteria {
    Criteria { id: Some(id.to_string()), ..Criteria::default() }
}

fn gesture(source: &str) -> Gesture {
    Gesture::parse(source).unwrap()
}

fn clicks(exec: &Recorder) -> usize {
    exec.effects.iter().filter(|e| matches!(e, Effect::Click(_))).count()
}

fn diagnostics(engine: &mut Engine) -> Vec<Diagnostic> {
    engine.session_mut().map(|s| s.take_diagnostics()).unwrap_or_default()
}

// ============================================================================
// Double press
// ============================================================================

fn heading_engine() -> Engine {
    engine(vec![
        Rule::new("heading", Criteria::tag("h1")).with_gesture("kb:control+h", Action::Speak),
    ])
}

#[test]
fn test_single_press_announces_after_window() {
    let mut engine = heading_engine();
    let mut exec = Recorder::new();
    let t0 = Instant::now();
    engine.page_changed(page("<h1>Inbox</h1>"), &mut exec, t0).unwrap();
    exec.clear();

    assert!(engine.shortcut(&gesture("kb:ctrl+h"), &mut exec, t0).unwrap());
    assert!(exec.effects.is_empty(), "nothing spoken inside the window");
    assert_eq!(engine.next_deadline(), Some(t0 + Duration::from_millis(500)));

    engine.poll(&mut exec, t0 + Duration::from_millis(600));
    assert_eq!(exec.announcements(), vec!["heading - Inbox"]);
    assert!(exec.moves().is_empty());
}

#[test]
fn test_double_press_moves_once_without_announce() {
    let mut engine = heading_engine();
    let mut exec = Recorder::new();
    let t0 = Instant::now();
    let p = page("<h1>Inbox</h1>");
    let h1 = p.elements()[3];
    engine.page_changed(p, &mut exec, t0).unwrap();
    exec.clear();

    engine.shortcut(&gesture("kb:control+h"), &mut exec, t0).unwrap();
    engine.shortcut(&gesture("kb:control+h"), &mut exec, t0 + Duration::from_millis(200)).unwrap();
    engine.poll(&mut exec, t0 + Duration::from_secs(2));

    assert!(exec.announcements().is_empty());
    assert_eq!(exec.moves(), vec![h1]);
    assert_eq!(engine.session().unwrap().caret(), Some(h1));
}

#[test]
fn test_shortcut_unmatched_rule_reports_not_found() {
    let mut engine = heading_engine();
    let mut exec = Recorder::new();
    engine.page_changed(page("<p>empty</p>"), &mut exec, Instant::now()).unwrap();

    assert!(engine.shortcut(&gesture("kb:control+h"), &mut exec, Instant::now()).unwrap());
    assert_eq!(exec.announcements(), vec!["heading not found"]);
    assert_eq!(engine.next_deadline(), None);
}

#[test]
fn test_armed_speak_dropped_when_rule_goes_away() {
    let mut engine = heading_engine();
    let mut exec = Recorder::new();
    let t0 = Instant::now();
    let ms = |n: u64| t0 + Duration::from_millis(n);
    engine.page_changed(page("<h1>Inbox</h1>"), &mut exec, ms(0)).unwrap();

    engine.shortcut(&gesture("kb:control+h"), &mut exec, ms(0)).unwrap();
    engine.page_changed(page("<p>loading</p>"), &mut exec, ms(100)).unwrap();
    assert_eq!(engine.next_deadline(), None);

    engine.shortcut(&gesture("kb:control+h"), &mut exec, ms(200)).unwrap();
    engine.poll(&mut exec, ms(2000));
    assert_eq!(exec.announcements(), vec!["heading not found"], "reported once");

    // A page change that keeps the element keeps the press
    exec.clear();
    engine.page_changed(page("<h1>Inbox</h1>"), &mut exec, ms(3000)).unwrap();
    engine.shortcut(&gesture("kb:control+h"), &mut exec, ms(3000)).unwrap();
    engine.page_changed(page("<h1>Inbox (1)</h1>"), &mut exec, ms(3100)).unwrap();
    engine.poll(&mut exec, ms(4000));
    assert_eq!(exec.announcements(), vec!["heading - Inbox (1)"]);
}

#[test]
fn test_unbound_gesture_is_not_consumed() {
    let mut engine = heading_engine();
    let mut exec = Recorder::new();
    engine.page_changed(page("<h1>Inbox</h1>"), &mut exec, Instant::now()).unwrap();
    assert!(!engine.shortcut(&gesture("kb:alt+x"), &mut exec, Instant::now()).unwrap());
}

// ============================================================================
// Automatic actions
// ============================================================================

#[test]
fn test_auto_actions_fire_once_per_transition_in_rule_order() {
    let mut engine = engine(vec![
        Rule::new("first", Criteria::tag("h1")).with_auto_action(Action::Speak),
        Rule::new("second", Criteria::tag("h2")).with_auto_action(Action::Speak),
    ]);
    let mut exec = Recorder::new();
    let now = Instant::now();

    engine.page_changed(page("<p>loading</p>"), &mut exec, now).unwrap();
    assert!(exec.announcements().is_empty());

    // h2 precedes h1 in the document; rule order still wins
    engine.page_changed(page("<h2>Two</h2><h1>One</h1>"), &mut exec, now).unwrap();
    assert_eq!(exec.announcements(), vec!["first - One", "second - Two"]);

    exec.clear();
    engine.page_changed(page("<h2>Two</h2><h1>One</h1>"), &mut exec, now).unwrap();
    assert!(exec.announcements().is_empty(), "still present, no new transition");

    engine.page_changed(page("<h2>Two</h2>"), &mut exec, now).unwrap();
    engine.page_changed(page("<h2>Two</h2><h1>Again</h1>"), &mut exec, now).unwrap();
    assert_eq!(exec.announcements(), vec!["first - Again"]);
}

#[test]
fn test_cascade_aborts_on_repeated_rule_and_element() {
    let mut engine = engine(vec![
        Rule::new("r1", by_id("a")).with_auto_action(Action::Activate),
        Rule::new("r2", by_id("b")).with_auto_action(Action::Activate),
    ]);
    let page_a = r#"<button id="a" data-webmod-id="1">A</button>"#;
    let page_b = r#"<button id="b" data-webmod-id="2">B</button>"#;
    let mut exec = Recorder::new();
    exec.queue_mutation(page(page_b));
    exec.queue_mutation(page(page_a));

    engine.page_changed(page(page_a), &mut exec, Instant::now()).unwrap();

    assert_eq!(clicks(&exec), 2);
    assert_eq!(
        diagnostics(&mut engine),
        vec![Diagnostic::CascadeAborted {
            rule: "r1".to_string(),
            element: ElementKey::Control(1),
            limit: CascadeLimit::Repeated,
        }]
    );

    // Presence was resynchronized; the same content does not refire
    engine.page_changed(page(page_a), &mut exec, Instant::now()).unwrap();
    assert_eq!(clicks(&exec), 2);
}

#[test]
fn test_cascade_depth_is_bounded() {
    let config = Config { max_cascade_depth: 2, ..Config::default() };
    let rules = (1..=4)
        .map(|n| Rule::new(&format!("r{n}"), by_id(&format!("e{n}"))).with_auto_action(Action::Activate))
        .collect();
    let mut engine = engine_with(config, rules);
    let html = |n: u32| format!(r#"<button id="e{n}" data-webmod-id="{n}">{n}</button>"#);

    let mut exec = Recorder::new();
    for n in 2..=4 {
        exec.queue_mutation(page(&html(n)));
    }
    engine.page_changed(page(&html(1)), &mut exec, Instant::now()).unwrap();

    assert_eq!(clicks(&exec), 3);
    assert_eq!(
        diagnostics(&mut engine),
        vec![Diagnostic::CascadeAborted {
            rule: "r3".to_string(),
            element: ElementKey::Control(3),
            limit: CascadeLimit::Depth(3),
        }]
    );
}

#[test]
fn test_auto_move_cooldown() {
    let mut engine = engine(vec![Rule::new("main", Criteria::tag("main")).with_auto_action(Action::MoveTo)]);
    let mut exec = Recorder::new();
    let t0 = Instant::now();
    let at = |secs: u64| t0 + Duration::from_secs(secs);

    engine.page_changed(page("<main>a</main>"), &mut exec, at(0)).unwrap();
    engine.page_changed(page("<p>gone</p>"), &mut exec, at(1)).unwrap();
    engine.page_changed(page("<main>b</main>"), &mut exec, at(2)).unwrap();
    assert_eq!(exec.moves().len(), 1, "second move inside the cooldown is throttled");

    engine.page_changed(page("<p>gone</p>"), &mut exec, at(3)).unwrap();
    engine.page_changed(page("<main>c</main>"), &mut exec, at(5)).unwrap();
    assert_eq!(exec.moves().len(), 2);
}

// ============================================================================
// Execution failures
// ============================================================================

#[test]
fn test_stale_element_reported_once_and_not_retried() {
    let mut engine = engine(vec![
        Rule::new("go", Criteria::tag("a")).with_gesture("kb:control+g", Action::Activate),
    ]);
    let mut exec = Recorder::new();
    engine.page_changed(page(r#"<a href="/x">Go</a>"#), &mut exec, Instant::now()).unwrap();
    exec.queue_failure(ExecError::Stale);

    engine.shortcut(&gesture("kb:control+g"), &mut exec, Instant::now()).unwrap();
    assert_eq!(clicks(&exec), 0);
    assert_eq!(
        diagnostics(&mut engine),
        vec![Diagnostic::ExecutionFailed {
            rule: "go".to_string(),
            action: Action::Activate,
            error: ExecError::Stale,
        }]
    );
    assert!(diagnostics(&mut engine).is_empty());

    engine.shortcut(&gesture("kb:control+g"), &mut exec, Instant::now()).unwrap();
    assert_eq!(clicks(&exec), 1);
}

#[test]
fn test_form_mode_follows_target() {
    let mut engine = engine(vec![
        Rule::new("search", Criteria::tag("input")).with_gesture("kb:control+s", Action::MoveTo),
    ]);
    let mut exec = Recorder::new();
    engine.page_changed(page(r#"<input type="text" aria-label="Search">"#), &mut exec, Instant::now()).unwrap();
    engine.shortcut(&gesture("kb:control+s"), &mut exec, Instant::now()).unwrap();
    assert!(exec.effects.contains(&Effect::FormMode(true)));
}

// ============================================================================
// Page title and paging
// ============================================================================

#[test]
fn test_page_title_change_is_announced() {
    let mut title = Rule::new("title", Criteria::tag("h1"));
    title.is_page_title = true;
    let mut engine = engine(vec![title]);
    let mut exec = Recorder::new();

    engine.page_changed(page("<h1>Inbox</h1>"), &mut exec, Instant::now()).unwrap();
    assert!(exec.announcements().is_empty(), "first title is not announced");

    engine.page_changed(page("<h1>Sent</h1>"), &mut exec, Instant::now()).unwrap();
    assert_eq!(exec.announcements(), vec!["Sent"]);
    assert_eq!(engine.session().unwrap().page_title(), Some("Sent"));
}

#[test]
fn test_paging_reaches_end() {
    let mut headings = Rule::new("headings", Criteria::tag("h2"));
    headings.multiple = true;
    let mut engine = engine(vec![headings]);
    let mut exec = Recorder::new();
    engine.page_changed(page("<h2>A</h2><p>x</p><h2>B</h2>"), &mut exec, Instant::now()).unwrap();

    let q = NavQuery::default().with_cycle(false);
    let first = engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    let second = engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    assert!(second.position > first.position);
    assert!(engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().is_none());

    assert_eq!(exec.announcements(), vec!["No next marker"]);
    assert_eq!(exec.moves(), vec![first.element, second.element]);
    assert!(exec.effects.contains(&Effect::MoveTo {
        element: first.element,
        announcement: "headings - A".to_string(),
    }));
}

#[test]
fn test_paging_wraps_by_default() {
    let mut headings = Rule::new("headings", Criteria::tag("h2"));
    headings.multiple = true;
    let mut engine = engine(vec![headings]);
    let mut exec = Recorder::new();
    engine.page_changed(page("<h2>A</h2><h2>B</h2>"), &mut exec, Instant::now()).unwrap();

    let q = NavQuery::default();
    let first = engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    let wrapped = engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    assert_eq!(wrapped, first);
    assert!(exec.announcements().is_empty());

    engine.page_changed(page("<p>none</p>"), &mut exec, Instant::now()).unwrap();
    assert!(engine.navigate_results(Direction::Previous, &q, &mut exec).unwrap().is_none());
    assert_eq!(exec.announcements(), vec!["No marker"]);
}

// ============================================================================
// Zones
// ============================================================================

const ZONED: &str = "<h2>Top</h2><section id=results><h2>R1</h2><h2>R2</h2></section><h2>Bottom</h2>";

fn zone_engine() -> Engine {
    let mut headings = Rule::new("headings", Criteria::tag("h2"));
    headings.multiple = true;
    let results = Rule::new("results", by_id("results")).zone().with_gesture("kb:control+r", Action::MoveTo);
    engine(vec![headings, results])
}

fn text_of(engine: &Engine, element: webmod_dom::NodeId) -> String {
    engine.session().and_then(|s| s.page()).map(|p| p.text(element)).unwrap_or_default()
}

#[test]
fn test_zone_restricts_in_zone_paging() {
    let mut engine = zone_engine();
    let mut exec = Recorder::new();
    let now = Instant::now();
    engine.page_changed(page(ZONED), &mut exec, now).unwrap();

    engine.shortcut(&gesture("kb:control+r"), &mut exec, now).unwrap();
    let zone = engine.session().unwrap().zone().unwrap();
    assert_eq!(zone.rule, 1);

    let q = NavQuery::in_zone();
    let r1 = engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    let r2 = engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().unwrap();
    assert_eq!((text_of(&engine, r1.element), text_of(&engine, r2.element)), ("R1".into(), "R2".into()));
    assert!(engine.navigate_results(Direction::Next, &q, &mut exec).unwrap().is_none());
    assert_eq!(exec.announcements(), vec!["No next marker in this zone"]);
    assert_eq!(engine.session().unwrap().zone(), Some(zone), "moving inside keeps the zone");

    // The zone follows its rule across page changes
    engine.page_changed(page(ZONED), &mut exec, now).unwrap();
    assert_eq!(engine.session().unwrap().zone().map(|z| z.rule), Some(1));

    // Leaving it drops it
    let bottom = engine.navigate_results(Direction::Next, &NavQuery::default(), &mut exec).unwrap().unwrap();
    assert_eq!(text_of(&engine, bottom.element), "Bottom");
    assert_eq!(engine.session().unwrap().zone(), None);
}

#[test]
fn test_zone_events() {
    let mut engine = zone_engine();
    let mut exec = Recorder::new();
    let now = Instant::now();
    engine.page_changed(page(ZONED), &mut exec, now).unwrap();

    let top = engine
        .session()
        .and_then(|s| s.page())
        .and_then(|p| p.elements().iter().copied().find(|&id| p.text(id) == "Top"))
        .unwrap();
    engine.handle(Event::CaretMoved(Some(top)), &mut exec, now).unwrap();
    assert_eq!(engine.session().unwrap().caret(), Some(top));

    // Paging onto a zone enters it
    let stop = engine.navigate_results(Direction::Next, &NavQuery::default(), &mut exec).unwrap().unwrap();
    assert_eq!(stop.rule, 1);
    assert!(engine.session().unwrap().zone().is_some());

    engine.handle(Event::ClearZone, &mut exec, now).unwrap();
    assert_eq!(engine.session().unwrap().zone(), None);
    let next = engine.navigate_results(Direction::Next, &NavQuery::in_zone(), &mut exec).unwrap().unwrap();
    assert_eq!(text_of(&engine, next.element), "R1", "without a zone nothing restricts paging");
}

// ============================================================================
// Module lifecycle
// ============================================================================

#[test]
fn test_page_change_selects_module() {
    let modules = vec![
        WebModule::new("Mail").with_url("mail.example.com"),
        WebModule::new("Shop").with_url("shop.example.com"),
    ];
    let mut engine = Engine::with_modules(Config::default(), modules).unwrap();
    let mut exec = Recorder::new();

    engine.page_changed(page("<p>x</p>"), &mut exec, Instant::now()).unwrap();
    assert_eq!(engine.active_module(), Some("Mail"));

    let shop = webmod_html::parse("<p>y</p>", "https://shop.example.com/", "Shop").unwrap();
    engine.page_changed(shop, &mut exec, Instant::now()).unwrap();
    assert_eq!(engine.active_module(), Some("Shop"));

    let other = webmod_html::parse("<p>z</p>", "https://other.org/", "Other").unwrap();
    engine.page_changed(other, &mut exec, Instant::now()).unwrap();
    assert_eq!(engine.active_module(), None);
}

#[test]
fn test_engine_opens_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModuleStore::new(dir.path());
    let module = WebModule::new("Mail")
        .with_url("mail.example.com")
        .with_rule(Rule::new("heading", Criteria::tag("h1")).with_auto_action(Action::Speak));
    store.create(&module, false).unwrap();
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

    let config = Config { modules_dir: dir.path().to_path_buf(), ..Config::default() };
    let (mut engine, broken) = Engine::open(config).unwrap();
    assert_eq!(broken.len(), 1);
    assert_eq!(engine.module_names().collect::<Vec<_>>(), vec!["Mail"]);

    let mut exec = Recorder::new();
    engine.page_changed(page("<h1>Inbox</h1>"), &mut exec, Instant::now()).unwrap();
    assert_eq!(exec.announcements(), vec!["heading - Inbox"]);
}

// ============================================================================
// Event loop
// ============================================================================

#[test]
fn test_event_loop_fires_speak_at_deadline() {
    let config = Config { double_press_window_ms: 20, ..Config::default() };
    let engine = engine_with(config, vec![
        Rule::new("heading", Criteria::tag("h1")).with_gesture("kb:control+h", Action::Speak),
    ]);
    let (event_loop, tx) = EventLoop::new(engine, Recorder::new());

    let driver = async move {
        tx.send(Event::PageChanged(page("<h1>Inbox</h1>"))).await.unwrap();
        tx.send(Event::Shortcut(gesture("kb:control+h"))).await.unwrap();
        smol::Timer::after(Duration::from_millis(200)).await;
        tx.send(Event::Shutdown).await.unwrap();
    };
    let ((_, exec), ()) = smol::block_on(smol::future::zip(event_loop.run(), driver));

    assert_eq!(exec.announcements(), vec!["heading - Inbox"]);
    assert!(exec.moves().is_empty());
}

#[test]
fn test_event_loop_double_press_cancels_timer() {
    let engine = engine(vec![
        Rule::new("heading", Criteria::tag("h1")).with_gesture("kb:control+h", Action::Speak),
    ]);
    let (event_loop, tx) = EventLoop::new(engine, Recorder::new());

    let driver = async move {
        tx.send(Event::PageChanged(page("<h1>Inbox</h1>"))).await.unwrap();
        tx.send(Event::Shortcut(gesture("kb:control+h"))).await.unwrap();
        tx.send(Event::Shortcut(gesture("kb:control+h"))).await.unwrap();
        tx.send(Event::Shutdown).await.unwrap();
    };
    let ((_, exec), ()) = smol::block_on(smol::future::zip(event_loop.run(), driver));

    assert!(exec.announcements().is_empty());
    assert_eq!(exec.moves().len(), 1);
}
