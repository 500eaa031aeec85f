use crate::error::PatchError;
use crate::operations::file_operations::{read_file_content, write_file_content};
use crate::rules::PatchRule;
use crate::types::{FileReport, PatchOutcome, RuleApplication};
use log::debug;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub content: String,
    pub applications: Vec<RuleApplication>,
}

impl Applied {
    pub fn rewrites(&self) -> usize {
        self.applications.iter().map(|a| a.rewrites).sum()
    }
}

/// Runs every rule in order, each one on the previous rule's output.
pub fn apply_rules(content: &str, rules: &[PatchRule]) -> Applied {
    let mut current = content.to_string();
    let mut applications = Vec::with_capacity(rules.len());

    for rule in rules {
        let (next, application) = rule.apply(&current);
        debug!(
            "Rule '{}': {} matched, {} rewritten",
            rule.name, application.matched, application.rewrites
        );
        current = next;
        applications.push(application);
    }

    Applied {
        content: current,
        applications,
    }
}

pub struct Patcher {
    rules: Vec<PatchRule>,
    atomic_write: bool,
    dry_run: bool,
}

impl Patcher {
    pub fn new(rules: Vec<PatchRule>) -> Self {
        Self {
            rules,
            atomic_write: true,
            dry_run: false,
        }
    }

    pub fn atomic_write(mut self, atomic: bool) -> Self {
        self.atomic_write = atomic;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn rules(&self) -> &[PatchRule] {
        &self.rules
    }

    pub fn patch_file(&self, path: &Path) -> FileReport {
        let (outcome, applications) = self.run(path);
        FileReport {
            path: path.to_path_buf(),
            outcome,
            applications,
        }
    }

    fn run(&self, path: &Path) -> (PatchOutcome, Vec<RuleApplication>) {
        if !path.exists() {
            return (PatchOutcome::NotFound, Vec::new());
        }

        let original = match read_file_content(path) {
            Ok(content) => content,
            Err(source) => {
                let err = PatchError::Read {
                    path: path.to_path_buf(),
                    source,
                };
                return (PatchOutcome::Failed(err), Vec::new());
            }
        };

        let applied = apply_rules(&original, &self.rules);
        if applied.content == original {
            return (PatchOutcome::Unchanged, applied.applications);
        }

        if let Some(rule) = self.first_non_idempotent(&applied.content) {
            let err = PatchError::NotIdempotent {
                path: path.to_path_buf(),
                rule,
            };
            return (PatchOutcome::Failed(err), applied.applications);
        }

        let rewrites = applied.rewrites();
        if self.dry_run {
            return (PatchOutcome::WouldPatch { rewrites }, applied.applications);
        }

        match self.write_verified(path, &applied.content) {
            Ok(()) => (PatchOutcome::Patched { rewrites }, applied.applications),
            Err(err) => (PatchOutcome::Failed(err), applied.applications),
        }
    }

    fn first_non_idempotent(&self, patched: &str) -> Option<String> {
        apply_rules(patched, &self.rules)
            .applications
            .into_iter()
            .find(|a| a.rewrites > 0)
            .map(|a| a.rule)
    }

    fn write_verified(&self, path: &Path, content: &str) -> Result<(), PatchError> {
        write_file_content(path, content, self.atomic_write).map_err(|source| {
            PatchError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;

        let persisted = read_file_content(path).map_err(|source| PatchError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        if persisted != content {
            return Err(PatchError::Verify {
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}
