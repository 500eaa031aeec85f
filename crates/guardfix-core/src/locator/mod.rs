pub mod probe;

pub use probe::{InterpreterProbe, ProcessProbe};

use crate::config::Config;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// One strategy for finding directories that hold the files to patch.
pub trait PathResolver {
    fn name(&self) -> &str;
    fn resolve(&self) -> Vec<PathBuf>;
}

#[derive(Debug, Clone)]
pub struct StaticResolver {
    pub search_roots: Vec<PathBuf>,
    pub subpackage: PathBuf,
}

impl StaticResolver {
    pub fn new<S: AsRef<str>>(roots: &[S], subpackage: &str) -> Self {
        let search_roots = roots
            .iter()
            .map(|r| PathBuf::from(shellexpand::tilde(r.as_ref()).into_owned()))
            .collect();
        Self {
            search_roots,
            subpackage: PathBuf::from(subpackage),
        }
    }
}

impl PathResolver for StaticResolver {
    fn name(&self) -> &str {
        "search roots"
    }

    fn resolve(&self) -> Vec<PathBuf> {
        self.search_roots
            .iter()
            .map(|root| root.join(&self.subpackage))
            .filter(|candidate| {
                let found = candidate.is_dir();
                debug!("Candidate {:?}: {}", candidate, if found { "found" } else { "absent" });
                found
            })
            .collect()
    }
}

pub struct InterpreterResolver<P: InterpreterProbe> {
    pub interpreters: Vec<String>,
    pub package: String,
    pub subpackage: PathBuf,
    pub probe: P,
}

impl<P: InterpreterProbe> PathResolver for InterpreterResolver<P> {
    fn name(&self) -> &str {
        "interpreter query"
    }

    fn resolve(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();

        for interpreter in &self.interpreters {
            match self.probe.package_dir(interpreter, &self.package) {
                Ok(package_dir) => {
                    let candidate = package_dir.join(&self.subpackage);
                    if candidate.is_dir() {
                        info!("'{}' resolved {:?}", interpreter, candidate);
                        found.push(candidate);
                    } else {
                        warn!(
                            "'{}' reports {:?} but {:?} does not exist",
                            interpreter, package_dir, candidate
                        );
                    }
                }
                Err(e) => warn!("Could not find package via {}: {}", interpreter, e),
            }
        }

        found
    }
}

/// Ordered fallback chain: the first resolver that finds anything wins.
#[derive(Default)]
pub struct Locator {
    resolvers: Vec<Box<dyn PathResolver>>,
}

impl Locator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, resolver: impl PathResolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    pub fn from_config(config: &Config) -> Self {
        let locator = &config.locator;
        Self::new()
            .with(StaticResolver::new(&locator.search_roots, &config.subpackage))
            .with(InterpreterResolver {
                interpreters: locator.interpreters.clone(),
                package: config.package.clone(),
                subpackage: PathBuf::from(&config.subpackage),
                probe: ProcessProbe::new(locator.timeout()),
            })
    }

    pub fn locate(&self) -> Vec<PathBuf> {
        for resolver in &self.resolvers {
            let found = dedup(resolver.resolve());
            if !found.is_empty() {
                info!("{} located {} directories", resolver.name(), found.len());
                return found;
            }
            debug!("{} located nothing, falling back", resolver.name());
        }
        Vec::new()
    }
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut unique: Vec<PathBuf> = Vec::with_capacity(paths.len());
    for path in paths {
        if !unique.iter().any(|p| same_dir(p, &path)) {
            unique.push(path);
        }
    }
    unique
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use std::collections::HashMap;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    struct FakeProbe(HashMap<String, PathBuf>);

    impl InterpreterProbe for FakeProbe {
        fn package_dir(&self, interpreter: &str, _package: &str) -> Result<PathBuf, ProbeError> {
            self.0.get(interpreter).cloned().ok_or(ProbeError::Timeout {
                interpreter: interpreter.to_string(),
                timeout: Duration::from_secs(1),
            })
        }
    }

    #[test]
    fn test_static_resolver_keeps_only_existing() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(b.join("graphiti_core/llm_client")).unwrap();

        let roots = [a.join("graphiti_core"), b.join("graphiti_core")];
        let roots: Vec<String> = roots.iter().map(|p| p.display().to_string()).collect();
        let resolver = StaticResolver::new(&roots, "llm_client");

        assert_eq!(resolver.resolve(), vec![b.join("graphiti_core/llm_client")]);
    }

    #[test]
    fn test_static_resolver_ignores_plain_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("llm_client"), "not a dir").unwrap();
        let resolver = StaticResolver::new(&[dir.path().display().to_string()], "llm_client");

        assert!(resolver.resolve().is_empty());
    }

    #[test]
    fn test_interpreter_resolver_skips_failures() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("graphiti_core");
        fs::create_dir_all(pkg.join("llm_client")).unwrap();

        let mut answers = HashMap::new();
        answers.insert("python3".to_string(), pkg.clone());
        answers.insert("python-stale".to_string(), dir.path().join("gone"));

        let resolver = InterpreterResolver {
            interpreters: vec![
                "python".to_string(),
                "python-stale".to_string(),
                "python3".to_string(),
            ],
            package: "graphiti_core".to_string(),
            subpackage: PathBuf::from("llm_client"),
            probe: FakeProbe(answers),
        };

        assert_eq!(resolver.resolve(), vec![pkg.join("llm_client")]);
    }

    #[test]
    fn test_locator_falls_back_in_order() {
        let dir = tempdir().unwrap();
        let pkg = dir.path().join("site/graphiti_core");
        fs::create_dir_all(pkg.join("llm_client")).unwrap();

        let mut answers = HashMap::new();
        answers.insert("python".to_string(), pkg.clone());
        answers.insert("python3".to_string(), pkg.clone());

        let locator = Locator::new()
            .with(StaticResolver::new(
                &[dir.path().join("empty").display().to_string()],
                "llm_client",
            ))
            .with(InterpreterResolver {
                interpreters: vec!["python".to_string(), "python3".to_string()],
                package: "graphiti_core".to_string(),
                subpackage: PathBuf::from("llm_client"),
                probe: FakeProbe(answers),
            });

        assert_eq!(locator.locate(), vec![pkg.join("llm_client")]);
    }

    #[test]
    fn test_locator_prefers_first_non_empty_resolver() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("llm_client")).unwrap();

        let locator = Locator::new()
            .with(StaticResolver::new(
                &[dir.path().display().to_string()],
                "llm_client",
            ))
            .with(InterpreterResolver {
                interpreters: vec!["python3".to_string()],
                package: "graphiti_core".to_string(),
                subpackage: PathBuf::from("llm_client"),
                probe: FakeProbe(HashMap::new()),
            });

        assert_eq!(locator.locate(), vec![dir.path().join("llm_client")]);
    }

    #[test]
    fn test_locator_with_nothing_found_is_empty() {
        let dir = tempdir().unwrap();
        let locator = Locator::new().with(StaticResolver::new(
            &[dir.path().join("nope").display().to_string()],
            "llm_client",
        ));

        assert!(locator.locate().is_empty());
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        fs::create_dir_all(&a).unwrap();
        fs::create_dir_all(&b).unwrap();

        let out = dedup(vec![b.clone(), a.clone(), b.clone(), a.join(".")]);
        assert_eq!(out, vec![b, a]);
    }
}
