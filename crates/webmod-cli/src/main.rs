//! webmod command line tool

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use webmod_dom::{NodeId, Page};
use webmod_engine::{Config, Effect, Recorder, Session};
use webmod_rules::store::read_module_file;
use webmod_rules::{evaluate, page_title, propose, Gesture, LoadedModule, ModuleStore};

use crate::cli::{Cli, Command, PageArgs, Target};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Check { files } => Ok(cmd_check(&files)),
        Command::Match { target } => cmd_match(&target),
        Command::Propose { page, element } => cmd_propose(&page, element),
        Command::Press { target, gestures, interval_ms } => {
            cmd_press(&config, &target, &gestures, Duration::from_millis(interval_ms))
        }
        Command::Catalog { dir } => cmd_catalog(dir.unwrap_or(config.modules_dir)),
    }
}

fn load_module(path: &Path) -> Result<LoadedModule> {
    let module = read_module_file(path)?;
    LoadedModule::load(module).with_context(|| format!("invalid module {}", path.display()))
}

fn load_page(args: &PageArgs) -> Result<Page> {
    let html = std::fs::read_to_string(&args.page)
        .with_context(|| format!("cannot read page {}", args.page.display()))?;
    let page = webmod_html::parse(&html, &args.url, &args.title)?;
    tracing::debug!(elements = page.elements().len(), url = %args.url, "page parsed");
    Ok(page)
}

fn describe(page: &Page, element: NodeId) -> String {
    let position = page.position(element).map_or_else(|| "?".to_string(), |p| p.to_string());
    let tag = page.element(element).map_or("", |e| e.tag.as_str());
    format!("#{position} <{tag}>")
}

fn cmd_check(files: &[PathBuf]) -> ExitCode {
    let mut failed = 0;
    for file in files {
        match read_module_file(file).and_then(LoadedModule::load) {
            Ok(module) => {
                println!("ok       {} ({}, {} rules)", file.display(), module.name(), module.len());
                for gesture in module.gestures() {
                    if let Some((rule, action)) = module.binding(gesture) {
                        println!("  {:<24} {} {}", gesture.display(), action, module.rule(rule).name);
                    }
                }
            }
            Err(e) => {
                failed += 1;
                println!("invalid  {}: {e}", file.display());
            }
        }
    }
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn cmd_match(target: &Target) -> Result<ExitCode> {
    let module = load_module(&target.module)?;
    let page = load_page(&target.page)?;
    let results = evaluate(&module, &page);

    for result in &results {
        let rule = module.rule(result.rule);
        let via = match result.alternative {
            Some(alt) if alt > 0 => format!(" (alternative {alt})"),
            _ => String::new(),
        };
        println!(
            "{}: {} candidate(s), {} match(es){via}",
            rule.name,
            result.candidates.len(),
            result.matches.len()
        );
        for &element in &result.matches {
            println!("  {} {}", describe(&page, element), webmod_engine::announcement(rule, &page, element));
        }
    }
    println!("title: {}", page_title(&module, &page, &results));
    Ok(ExitCode::SUCCESS)
}

fn cmd_propose(args: &PageArgs, position: usize) -> Result<ExitCode> {
    let page = load_page(args)?;
    let element = page
        .at(position)
        .with_context(|| format!("no element at position {position} ({} elements)", page.elements().len()))?;

    println!("{}", describe(&page, element));
    for proposal in propose(&page, element) {
        println!("  {proposal}");
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_press(config: &Config, target: &Target, gestures: &[String], interval: Duration) -> Result<ExitCode> {
    let module = load_module(&target.module)?;
    let page = load_page(&target.page)?;
    let gestures = gestures
        .iter()
        .map(|g| Gesture::parse(g).map_err(anyhow::Error::msg))
        .collect::<Result<Vec<_>>>()?;

    let mut session = Session::new(module, config);
    let mut exec = Recorder::new();
    let mut now = Instant::now();
    session.page_changed(page, &mut exec, now);

    for gesture in &gestures {
        if !session.shortcut(gesture, &mut exec, now) {
            println!("unbound  {gesture}");
        }
        now += interval;
    }
    session.poll(&mut exec, now + config.double_press_window());

    let Some(page) = session.page() else {
        return Ok(ExitCode::SUCCESS);
    };
    for effect in &exec.effects {
        match effect {
            Effect::Announce(text) => println!("announce {text}"),
            Effect::FormMode(enabled) => println!("formmode {}", if *enabled { "on" } else { "off" }),
            Effect::MoveTo { element, announcement } => {
                println!("moveto   {} {announcement}", describe(page, *element))
            }
            Effect::SayAll { element, announcement } => {
                println!("sayall   {} {announcement}", describe(page, *element))
            }
            Effect::Click(element) => println!("click    {}", describe(page, *element)),
            Effect::MouseMove(element) => println!("mouse    {}", describe(page, *element)),
        }
    }

    let diagnostics = session.take_diagnostics();
    for diagnostic in &diagnostics {
        println!("failed   {diagnostic}");
    }
    Ok(if diagnostics.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn cmd_catalog(dir: PathBuf) -> Result<ExitCode> {
    let store = ModuleStore::new(dir);
    let catalog = store
        .catalog()
        .with_context(|| format!("cannot list {}", store.dir().display()))?;

    for entry in &catalog.entries {
        let title = entry.site.window_title.as_deref().unwrap_or("");
        println!("{}\t{}\t{}", entry.name, entry.site.urls.join(","), title);
    }
    for broken in &catalog.broken {
        eprintln!("broken: {broken}");
    }
    Ok(if catalog.broken.is_empty() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
