use anyhow::{bail, Context, Result};
use clap::Parser;
use directories::ProjectDirs;
use guardfix_core::Config;
use log::{debug, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Locate graphiti_core and insert the empty-choices guards
    guardfix

    # Show what would change without touching any file
    guardfix --dry-run

    # Look in an extra virtualenv first and only ask one interpreter
    guardfix --search-root ~/.venvs/app/lib/python3.12/site-packages --interpreter python3

EXIT STATUS:
    0  at least one file was patched
    1  nothing was patched (already patched, or nothing to patch)
    2  no installation found, or the configuration is invalid

CONFIG:
    Default config location: ~/.config/guardfix/config.toml (optional)
    Use --ignore-config to use built-in defaults instead."#)]
pub struct Args {
    #[arg(
        short,
        long,
        help = "Path to config file [default: ~/.config/guardfix/config.toml]"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Use built-in defaults, ignore config file")]
    pub ignore_config: bool,

    #[arg(long, help = "Report what would change without writing files")]
    pub dry_run: bool,

    #[arg(long, help = "Fail the run if any rule matched nothing")]
    pub strict: bool,

    #[arg(
        long,
        num_args = 1..,
        value_name = "DIR",
        help = "Extra site-packages directories, searched before the configured ones"
    )]
    pub search_root: Vec<String>,

    #[arg(
        long,
        num_args = 1..,
        value_name = "EXE",
        help = "Interpreters to query for the package location [default: from config]"
    )]
    pub interpreter: Vec<String>,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Increase log verbosity (-v, -vv, -vvv)")]
    pub verbose: u8,
}

pub fn load_config(args: &Args) -> Result<Config> {
    if args.ignore_config {
        return Ok(Config::default());
    }

    let config_path = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file not found at {:?}", path);
            }
            path.clone()
        }
        None => match get_default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using built-in defaults");
                return Ok(Config::default());
            }
        },
    };

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file at {:?}", config_path))?;
    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file at {:?}", config_path))?;

    info!("Loaded config from {:?}", config_path);
    Ok(config)
}

/// Folds command-line overrides into the loaded config.
pub fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if !args.search_root.is_empty() {
        let mut roots = args.search_root.clone();
        roots.append(&mut config.locator.search_roots);
        config.locator.search_roots = roots;
    }

    if !args.interpreter.is_empty() {
        config.locator.interpreters = args.interpreter.clone();
    }

    if args.strict {
        config.strict = true;
    }

    config
}

fn get_default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "guardfix").map(|dirs| dirs.config_dir().join("config.toml"))
}
