use crate::config::Config;
use crate::error::DriverError;
use crate::locator::Locator;
use crate::operations::Patcher;
use crate::rules::compile_rules;
use crate::types::{FileReport, PatchOutcome, RunSummary};
use log::warn;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

pub fn build_patcher(config: &Config, dry_run: bool) -> Result<Patcher, DriverError> {
    let rules = compile_rules(&config.rules)?;
    Ok(Patcher::new(rules)
        .atomic_write(config.atomic_write)
        .dry_run(dry_run))
}

pub fn target_files(config: &Config, dir: &Path) -> Vec<PathBuf> {
    config.files.iter().map(|f| dir.join(f)).collect()
}

fn report_line(report: &FileReport) -> String {
    let path = &report.path;
    match &report.outcome {
        PatchOutcome::NotFound => format!("File not found: {:?}", path),
        PatchOutcome::Unchanged => format!("No changes needed: {:?}", path),
        PatchOutcome::Patched { rewrites } => {
            format!("Patched: {:?} ({} rewrite(s))", path, rewrites)
        }
        PatchOutcome::WouldPatch { rewrites } => {
            format!("[DRY RUN] Would patch: {:?} ({} rewrite(s))", path, rewrites)
        }
        PatchOutcome::Failed(e) => format!("Error: {}", e),
    }
}

pub fn run(
    config: &Config,
    locator: &Locator,
    patcher: &Patcher,
) -> Result<RunSummary, DriverError> {
    let directories = locator.locate();
    if directories.is_empty() {
        return Err(DriverError::NoTargetsLocated {
            package: config.package.clone(),
        });
    }

    println!("Found {} paths: {:?}", config.package, directories);

    let mut reports = Vec::new();
    for dir in &directories {
        println!("\nProcessing path: {:?}", dir);
        for file in target_files(config, dir) {
            let report = patcher.patch_file(&file);
            println!("{}", report_line(&report));
            reports.push(report);
        }
    }

    let unmatched_rules = unmatched_rules(patcher, &reports);
    for rule in &unmatched_rules {
        warn!(
            "Rule '{}' matched nothing in any target file; the package layout may have changed",
            rule
        );
    }

    Ok(RunSummary {
        directories,
        reports,
        unmatched_rules,
        strict: config.strict,
    })
}

/// Rules whose pattern occurred in no readable file, already-patched ones included.
fn unmatched_rules(patcher: &Patcher, reports: &[FileReport]) -> Vec<String> {
    let seen: BTreeSet<&str> = reports
        .iter()
        .flat_map(|r| r.applications.iter())
        .filter(|a| a.matched > 0)
        .map(|a| a.rule.as_str())
        .collect();

    patcher
        .rules()
        .iter()
        .filter(|r| !seen.contains(r.name.as_str()))
        .map(|r| r.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::StaticResolver;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_no_targets_is_fatal() {
        let dir = tempdir().unwrap();
        let config = Config::default();
        let locator = Locator::new().with(StaticResolver::new(
            &[dir.path().display().to_string()],
            &config.subpackage,
        ));
        let patcher = build_patcher(&config, false).unwrap();

        let err = run(&config, &locator, &patcher).unwrap_err();
        assert!(matches!(err, DriverError::NoTargetsLocated { .. }));
    }

    #[test]
    fn test_unmatched_rule_is_reported_and_strict_fails() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("llm_client");
        fs::create_dir_all(&target).unwrap();
        fs::write(
            target.join("groq_client.py"),
            "def f(response):\n    result = response.choices[0]\n",
        )
        .unwrap();

        let config = Config {
            strict: true,
            ..Config::default()
        };
        let locator = Locator::new().with(StaticResolver::new(
            &[dir.path().display().to_string()],
            &config.subpackage,
        ));
        let patcher = build_patcher(&config, false).unwrap();
        let summary = run(&config, &locator, &patcher).unwrap();

        assert_eq!(summary.patched_count(), 1);
        assert_eq!(summary.unmatched_rules, vec!["guard-response-object"]);
        assert!(summary.strict);
        assert_eq!(summary.exit_code(), 1);

        let lenient = RunSummary {
            strict: false,
            ..summary
        };
        assert_eq!(lenient.exit_code(), 0);
    }

    #[test]
    fn test_invalid_rule_fails_before_any_io() {
        let mut config = Config::default();
        config.rules[0].pattern = "(".to_string();

        assert!(matches!(
            build_patcher(&config, false),
            Err(DriverError::Rules(_))
        ));
    }

    #[test]
    fn test_report_line_wording() {
        let report = FileReport {
            path: PathBuf::from("a.py"),
            outcome: PatchOutcome::Unchanged,
            applications: Vec::new(),
        };
        assert_eq!(report_line(&report), "No changes needed: \"a.py\"");
    }
}
