use crate::rules::{default_rule_specs, RuleSpec};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Importable name of the installed package, e.g. `graphiti_core`.
    pub package: String,
    /// Directory inside the package holding the files to patch.
    pub subpackage: String,
    #[serde(alias = "targets")]
    pub files: Vec<String>,
    pub strict: bool,
    pub atomic_write: bool,
    pub locator: LocatorConfig,
    pub rules: Vec<RuleSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package: "graphiti_core".to_string(),
            subpackage: "llm_client".to_string(),
            files: vec![
                "openai_base_client.py".to_string(),
                "groq_client.py".to_string(),
                "openai_generic_client.py".to_string(),
            ],
            strict: false,
            atomic_write: true,
            locator: LocatorConfig::default(),
            rules: default_rule_specs(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LocatorConfig {
    pub search_roots: Vec<String>,
    pub interpreters: Vec<String>,
    pub timeout_secs: u64,
}

impl LocatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.clamp(1, MAX_TIMEOUT_SECS))
    }
}

impl Default for LocatorConfig {
    fn default() -> Self {
        let search_roots = ["/app/.venv", "/usr/local", "/opt/venv"]
            .into_iter()
            .flat_map(|prefix| {
                ["3.12", "3.11"]
                    .into_iter()
                    .map(move |v| format!("{}/lib/python{}/site-packages", prefix, v))
            })
            .collect();

        Self {
            search_roots,
            interpreters: vec![
                "/usr/bin/python".to_string(),
                "/usr/bin/python3".to_string(),
                "python".to_string(),
                "python3".to_string(),
            ],
            timeout_secs: 5,
        }
    }
}
