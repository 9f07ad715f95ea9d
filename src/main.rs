// this_file: src/main.rs
//! Slidesmith CLI - render slide decks from templates

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde::Serialize;
use slidesmith::{
    logging, DeckRenderer, DeckSpec, LowerThirdPositions, RenderConfig, SlideLayout, Templates,
    UnknownSectionPolicy,
};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

/// Slidesmith - template-driven slide renderer
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Set log level (error, warn, info, debug, trace)
    #[arg(short = 'l', long, global = true, default_value = logging::default_level())]
    log_level: String,

    /// Enable quiet mode (only errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "log_level")]
    quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a deck to PNG files, printing one JSON outcome per slide
    Render {
        /// Render configuration
        #[arg(short, long, default_value = "setup.json")]
        config: PathBuf,

        /// Deck file (uses stdin if not specified)
        #[arg(short, long)]
        deck: Option<PathBuf>,

        /// Render slides in parallel
        #[arg(long)]
        parallel: bool,

        /// Stroke section boxes for layout debugging
        #[arg(long)]
        outline: bool,
    },

    /// Validate a template file and optional lower-third table
    Validate {
        /// Template file
        #[arg(short, long)]
        templates: PathBuf,

        /// Lower-third position table
        #[arg(short, long)]
        positions: Option<PathBuf>,

        /// Drop unknown section types instead of rejecting the file
        #[arg(long)]
        skip_unknown: bool,
    },

    /// Print the computed section geometry of every slide as JSON
    Layout {
        /// Render configuration
        #[arg(short, long, default_value = "setup.json")]
        config: PathBuf,

        /// Deck file (uses stdin if not specified)
        #[arg(short, long)]
        deck: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.quiet { "error".to_string() } else { cli.log_level.clone() };
    logging::init_logging(&log_level, cli.quiet, true);

    match cli.command {
        Commands::Render {
            config,
            deck,
            parallel,
            outline,
        } => render(&config, deck.as_deref(), parallel, outline),
        Commands::Validate {
            templates,
            positions,
            skip_unknown,
        } => validate(&templates, positions.as_deref(), skip_unknown),
        Commands::Layout { config, deck } => layout(&config, deck.as_deref()),
        Commands::Version => {
            println!("slidesmith version {}", slidesmith::VERSION);
            println!("Template-driven slide renderer");
            Ok(())
        }
    }
}

fn read_deck(path: Option<&Path>) -> Result<DeckSpec> {
    let deck = match path {
        Some(path) => DeckSpec::load(path)
            .with_context(|| format!("Failed to read deck {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            DeckSpec::from_json(&buffer).context("Failed to parse deck from stdin")?
        }
    };
    Ok(deck)
}

fn load_config(path: &Path) -> Result<RenderConfig> {
    RenderConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

/// Render every slide and print outcomes as JSONL
fn render(config_path: &Path, deck_path: Option<&Path>, parallel: bool, outline: bool) -> Result<()> {
    let mut config = load_config(config_path)?;
    config.parallel |= parallel;
    config.outline_sections |= outline;
    let deck = read_deck(deck_path)?;

    let renderer = DeckRenderer::from_config(config)?;
    let outcomes = renderer.run(&deck)?;
    for outcome in &outcomes {
        println!("{}", outcome.to_jsonl()?);
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        error!("{} of {} slide(s) failed", failed, outcomes.len());
        bail!("{} of {} slide(s) failed", failed, outcomes.len());
    }
    info!("Wrote {} slide(s)", outcomes.len());
    Ok(())
}

/// Check templates (and positions) parse and validate
fn validate(templates: &Path, positions: Option<&Path>, skip_unknown: bool) -> Result<()> {
    let policy = if skip_unknown {
        UnknownSectionPolicy::Skip
    } else {
        UnknownSectionPolicy::Fail
    };

    match Templates::load(templates, policy) {
        Ok(loaded) => {
            println!("✓ Valid templates");
            println!("  Slide types: {}", loaded.names().join(", "));
        }
        Err(e) => {
            println!("✗ Invalid templates: {}", e);
            return Err(e.into());
        }
    }

    if let Some(path) = positions {
        match LowerThirdPositions::load(path) {
            Ok(table) => {
                let mut keys: Vec<&String> = table.0.keys().collect();
                keys.sort();
                println!("✓ Valid lower-third positions");
                let keys: Vec<&str> = keys.into_iter().map(String::as_str).collect();
                println!("  Layouts: {}", keys.join(", "));
            }
            Err(e) => {
                println!("✗ Invalid lower-third positions: {}", e);
                return Err(e.into());
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct LayoutReport {
    index: usize,
    slide_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<SlideLayout>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Print section geometry without drawing anything
fn layout(config_path: &Path, deck_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let deck = read_deck(deck_path)?;
    let renderer = DeckRenderer::from_config(config)?;

    let plans = deck.plan(
        &renderer.config().slide_type_field,
        renderer.config().title_template.as_deref(),
    )?;
    let title = deck.title(&renderer.config().title_field);

    let reports: Vec<LayoutReport> = plans
        .iter()
        .map(|plan| match renderer.layout_slide(&deck, plan, &title) {
            Ok(layout) => LayoutReport {
                index: plan.index,
                slide_type: plan.slide_type.clone(),
                layout: Some(layout),
                error: None,
            },
            Err(e) => LayoutReport {
                index: plan.index,
                slide_type: plan.slide_type.clone(),
                layout: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}
