use crate::error::PatchError;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleApplication {
    pub rule: String,
    /// Occurrences of the rule's pattern, including ones that were already patched.
    pub matched: usize,
    pub rewrites: usize,
}

#[derive(Debug)]
pub enum PatchOutcome {
    NotFound,
    Unchanged,
    Patched { rewrites: usize },
    WouldPatch { rewrites: usize },
    Failed(PatchError),
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        matches!(
            self,
            PatchOutcome::Patched { .. } | PatchOutcome::WouldPatch { .. }
        )
    }
}

#[derive(Debug)]
pub struct FileReport {
    pub path: PathBuf,
    pub outcome: PatchOutcome,
    pub applications: Vec<RuleApplication>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub directories: Vec<PathBuf>,
    pub reports: Vec<FileReport>,
    pub unmatched_rules: Vec<String>,
    pub strict: bool,
}

impl RunSummary {
    pub fn patched_count(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.changed()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, PatchOutcome::Failed(_)))
            .count()
    }

    pub fn succeeded(&self) -> bool {
        self.patched_count() > 0 && !(self.strict && !self.unmatched_rules.is_empty())
    }

    pub fn exit_code(&self) -> i32 {
        if self.succeeded() {
            0
        } else {
            1
        }
    }
}
