//! Command line arguments

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "webmod", version, about = "Check web modules and try them against HTML pages")]
pub struct Cli {
    /// Engine configuration (JSON)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate module files
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Evaluate a module against a page and print every rule's matches
    Match {
        #[command(flatten)]
        target: Target,
    },

    /// Suggest criteria that would find an element
    Propose {
        #[command(flatten)]
        page: PageArgs,

        /// Document position of the element
        #[arg(long)]
        element: usize,
    },

    /// Press gestures against a page and print the resulting effects
    Press {
        #[command(flatten)]
        target: Target,

        /// Gestures, e.g. kb:control+shift+h
        #[arg(required = true)]
        gestures: Vec<String>,

        /// Delay between presses; below the double-press window the same
        /// gesture escalates
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
    },

    /// List the modules in the store
    Catalog {
        /// Store directory, instead of the configured one
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// HTML file standing in for the live page
    #[arg(long)]
    pub page: PathBuf,

    /// Page URL
    #[arg(long, default_value = "about:blank")]
    pub url: String,

    /// Window title
    #[arg(long, default_value = "")]
    pub title: String,
}

#[derive(Debug, Args)]
pub struct Target {
    /// Module file
    #[arg(long)]
    pub module: PathBuf,

    #[command(flatten)]
    pub page: PageArgs,
}
