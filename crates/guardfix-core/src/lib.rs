pub mod config;
pub mod driver;
pub mod error;
pub mod locator;
pub mod operations;
pub mod rules;
pub mod types;

pub use config::{Config, LocatorConfig};
pub use driver::{build_patcher, run};
pub use error::{DriverError, PatchError, ProbeError, RuleError};
pub use locator::{
    InterpreterProbe, InterpreterResolver, Locator, PathResolver, ProcessProbe, StaticResolver,
};
pub use operations::{apply_rules, Applied, Patcher};
pub use rules::{PatchRule, Rewriter, RuleSpec};
pub use types::{FileReport, PatchOutcome, RuleApplication, RunSummary};
