use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use sitefx::markup::Page;
use sitefx::{report, SiteConfig};

/// Inspect the enhancement markup of an authored page
#[derive(Parser)]
#[command(name = "sitefx", version, about)]
struct Cli {
    /// JSON file overriding the default site configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report players, grid layouts, tag styles and the contact button
    Scan {
        file: PathBuf,
        /// Viewport width used for the grid layout
        #[arg(long)]
        width: Option<u32>,
    },
    /// Initialize every player, scroll each into view and report the result
    Simulate {
        file: PathBuf,
        /// Visible ratio delivered to each player's observer
        #[arg(long, default_value_t = 1.0)]
        ratio: f64,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<SiteConfig> {
    match path {
        Some(path) => SiteConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(SiteConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let mut config = load_config(cli.config.as_ref())?;

    let json = match cli.command {
        Command::Scan { file, width } => {
            if let Some(width) = width {
                config.viewport.width = width;
            }
            config.validate()?;
            let page = Page::load(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            serde_json::to_string_pretty(&report::page(&page, &config, None)?)?
        }
        Command::Simulate { file, ratio } => {
            anyhow::ensure!((0.0..=1.0).contains(&ratio), "ratio must be within [0, 1]");
            let page = Page::load(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            serde_json::to_string_pretty(&report::players(&page, &config, Some(ratio))?)?
        }
    };
    println!("{}", json);
    Ok(())
}
