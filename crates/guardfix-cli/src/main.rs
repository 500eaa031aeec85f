mod config;

use anyhow::Result;
use clap::Parser;
use config::{apply_overrides, load_config, Args};
use guardfix_core::{build_patcher, run, Locator, RunSummary};
use std::process;

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn completion_line(summary: &RunSummary, dry_run: bool) -> String {
    if dry_run {
        format!(
            "Dry run completed. {} files would be patched; nothing was written.",
            summary.patched_count()
        )
    } else {
        format!(
            "Patching completed. {} files successfully patched.",
            summary.patched_count()
        )
    }
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    println!("\n--- Summary ---");
    println!("Directories processed: {}", summary.directories.len());
    println!("Files examined:        {}", summary.reports.len());
    println!("Files with errors:     {}", summary.failed_count());
    if !summary.unmatched_rules.is_empty() {
        println!("Rules never matched:   {}", summary.unmatched_rules.join(", "));
    }
    println!("\n{}", completion_line(summary, dry_run));
}

fn execute(args: &Args) -> Result<i32> {
    let config = apply_overrides(load_config(args)?, args);
    let patcher = build_patcher(&config, args.dry_run)?;
    let locator = Locator::from_config(&config);

    let summary = run(&config, &locator, &patcher)?;
    print_summary(&summary, args.dry_run);

    if config.strict && !summary.unmatched_rules.is_empty() {
        println!("Strict mode: failing because some rules matched nothing.");
    }
    Ok(summary.exit_code())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match execute(&args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(2);
        }
    }
}
