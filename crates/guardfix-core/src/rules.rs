use crate::error::RuleError;
use crate::types::RuleApplication;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const EMPTY_CHOICES_CONDITION: &str = "if not response.choices:";
pub const EMPTY_CHOICES_RAISE: &str =
    "    raise Exception('Empty response from LLM: no choices returned')";

#[derive(Debug, Clone)]
pub enum Rewriter {
    /// Regex replacement template, may reference capture groups (`$1`, `${name}`).
    Template(String),
    /// Lines inserted before the line holding each match, at that line's indentation.
    Guard(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct PatchRule {
    pub name: String,
    pub matcher: Regex,
    pub rewriter: Rewriter,
}

/// Serialized form of a rule as it appears under `[[rules]]` in the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RuleSpec {
    pub name: String,
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Vec<String>>,
}

impl RuleSpec {
    pub fn guard(name: &str, pattern: &str, guard: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            pattern: pattern.to_string(),
            replacement: None,
            guard: Some(guard.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn compile(&self) -> Result<PatchRule, RuleError> {
        let matcher = Regex::new(&self.pattern).map_err(|source| RuleError::Pattern {
            name: self.name.clone(),
            source,
        })?;

        let rewriter = match (&self.replacement, &self.guard) {
            (Some(_), Some(_)) => return Err(RuleError::AmbiguousRewriter(self.name.clone())),
            (None, None) => return Err(RuleError::MissingRewriter(self.name.clone())),
            (Some(template), None) => Rewriter::Template(template.clone()),
            (None, Some(lines)) => {
                if lines.iter().all(|l| l.trim().is_empty()) {
                    return Err(RuleError::EmptyGuard(self.name.clone()));
                }
                Rewriter::Guard(lines.clone())
            }
        };

        Ok(PatchRule {
            name: self.name.clone(),
            matcher,
            rewriter,
        })
    }
}

/// The bounds checks inserted ahead of every unguarded `response.choices[0]` access.
pub fn default_rule_specs() -> Vec<RuleSpec> {
    let guard = [EMPTY_CHOICES_CONDITION, EMPTY_CHOICES_RAISE];
    vec![
        RuleSpec::guard(
            "guard-response-object",
            r"(?m)^[ \t]*response_object = response\.choices\[0\]",
            &guard,
        ),
        RuleSpec::guard(
            "guard-result",
            r"(?m)^[ \t]*result = response\.choices\[0\]",
            &guard,
        ),
    ]
}

pub fn compile_rules(specs: &[RuleSpec]) -> Result<Vec<PatchRule>, RuleError> {
    specs.iter().map(RuleSpec::compile).collect()
}

impl PatchRule {
    /// Applies the rule to every match in `content`.
    pub fn apply(&self, content: &str) -> (String, RuleApplication) {
        match &self.rewriter {
            Rewriter::Template(template) => self.apply_template(content, template),
            Rewriter::Guard(lines) => self.apply_guard(content, lines),
        }
    }

    fn apply_template(&self, content: &str, template: &str) -> (String, RuleApplication) {
        let matched = self.matcher.find_iter(content).count();
        let rewritten = self.matcher.replace_all(content, template).into_owned();
        let rewrites = if rewritten == content { 0 } else { matched };

        (rewritten, self.application(matched, rewrites))
    }

    fn apply_guard(&self, content: &str, lines: &[String]) -> (String, RuleApplication) {
        let mut output = String::with_capacity(content.len());
        let mut copied_up_to = 0;
        let mut last_guarded_line = None;
        let mut matched = 0;
        let mut rewrites = 0;

        for m in self.matcher.find_iter(content) {
            matched += 1;

            let line_start = content[..m.start()].rfind('\n').map_or(0, |i| i + 1);
            if last_guarded_line == Some(line_start) {
                continue;
            }

            let line = &content[line_start..];
            let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
            let eol = line_ending(content, line_start);
            let block = guard_block(&line[..indent_len], lines, eol);

            if content[..line_start].ends_with(&block) {
                continue;
            }

            output.push_str(&content[copied_up_to..line_start]);
            output.push_str(&block);
            copied_up_to = line_start;
            last_guarded_line = Some(line_start);
            rewrites += 1;
        }

        output.push_str(&content[copied_up_to..]);
        (output, self.application(matched, rewrites))
    }

    fn application(&self, matched: usize, rewrites: usize) -> RuleApplication {
        RuleApplication {
            rule: self.name.clone(),
            matched,
            rewrites,
        }
    }
}

/// Line ending used by the line starting at `line_start`, falling back to the
/// previous line when it is the unterminated last line.
fn line_ending(content: &str, line_start: usize) -> &'static str {
    let terminated_crlf = match content[line_start..].find('\n') {
        Some(i) => content[line_start..line_start + i].ends_with('\r'),
        None => content[..line_start].ends_with("\r\n"),
    };
    if terminated_crlf {
        "\r\n"
    } else {
        "\n"
    }
}

fn guard_block(indent: &str, lines: &[String], eol: &str) -> String {
    let mut block = String::new();
    for line in lines {
        if !line.is_empty() {
            block.push_str(indent);
        }
        block.push_str(line);
        block.push_str(eol);
    }
    block
}
