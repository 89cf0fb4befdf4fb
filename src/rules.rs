//! Response rules: ordered pattern/template pairs and their table format.
//!
//! A rule table is plain data (`RuleTable`, loadable from TOML) until it is
//! compiled into `ResponseRule`s. Compilation is where every configuration
//! defect is caught, so the responder never fails at response time.
//!
//! # Matching policy
//!
//! Every pattern is compiled case-insensitive and anchored at the start of the
//! input (`(?i)^(?:pattern)`). Trailing text after the match is allowed. An
//! empty pattern string marks the rule as the catch-all.
//!
//! # Table format
//!
//! ```toml
//! [[rules]]
//! patterns = ['Are you ([\w\s]+)\?']
//! templates = ["Why would you think I am %1?"]
//!
//! [[rules]]
//! patterns = ['']
//! templates = ["Is everything OK?"]
//!
//! [reflections]
//! my = "your"
//! ```

use crate::error::{AgentError, Result};
use crate::reflection::ReflectionMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;

/// Matches `%1`, `%2`, ... placeholders inside templates.
#[allow(clippy::expect_used)]
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%(\d+)").expect("placeholder pattern is valid"));

/// How a rule decides whether it applies.
#[derive(Debug, Clone)]
pub enum RuleMatcher {
    /// Alternative expressions, tried in order.
    Patterns(Vec<Regex>),
    /// Applies to any input. Terminates the rule list.
    CatchAll,
}

/// One compiled rule: a matcher plus non-empty reply templates.
#[derive(Debug, Clone)]
pub struct ResponseRule {
    matcher: RuleMatcher,
    templates: Vec<String>,
}

impl ResponseRule {
    /// Compile a rule from pattern sources and templates.
    ///
    /// Any empty pattern source turns the whole rule into a catch-all.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Rules`] if there are no patterns or templates, a
    /// pattern does not compile, or a template references a capture group
    /// that some pattern of the rule does not have.
    pub fn new<P, T>(patterns: &[P], templates: &[T]) -> Result<Self>
    where
        P: AsRef<str>,
        T: AsRef<str>,
    {
        if patterns.is_empty() {
            return Err(AgentError::Rules("rule has no patterns".into()));
        }
        let templates: Vec<String> = templates.iter().map(|t| t.as_ref().to_owned()).collect();

        if patterns.iter().any(|p| p.as_ref().is_empty()) {
            return Self::catch_all(templates);
        }

        let compiled = patterns
            .iter()
            .map(|p| compile_pattern(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_parts(RuleMatcher::Patterns(compiled), templates)
    }

    /// A rule that answers any input with one of `templates`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Rules`] if `templates` is empty or references a
    /// capture group.
    pub fn catch_all(templates: Vec<String>) -> Result<Self> {
        Self::from_parts(RuleMatcher::CatchAll, templates)
    }

    fn from_parts(matcher: RuleMatcher, templates: Vec<String>) -> Result<Self> {
        if templates.is_empty() {
            return Err(AgentError::Rules("rule has no templates".into()));
        }
        for template in &templates {
            let Some(highest) = highest_placeholder(template) else {
                continue;
            };
            match &matcher {
                RuleMatcher::CatchAll => {
                    return Err(AgentError::Rules(format!(
                        "catch-all template \"{template}\" references %{highest} but captures nothing"
                    )));
                }
                RuleMatcher::Patterns(patterns) => {
                    // captures_len() counts the implicit whole-match group 0.
                    if let Some(short) = patterns.iter().find(|p| p.captures_len() <= highest) {
                        return Err(AgentError::Rules(format!(
                            "template \"{template}\" references %{highest} but pattern `{}` has {} group(s)",
                            short.as_str(),
                            short.captures_len() - 1
                        )));
                    }
                }
            }
        }
        Ok(Self { matcher, templates })
    }

    /// The rule's matcher.
    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    /// The rule's reply templates.
    pub fn templates(&self) -> &[String] {
        &self.templates
    }

    /// Whether this rule applies to any input.
    pub fn is_catch_all(&self) -> bool {
        matches!(self.matcher, RuleMatcher::CatchAll)
    }

    /// Try each alternative in order; return the first match's captures.
    ///
    /// A catch-all never returns captures; the responder handles it separately.
    pub(crate) fn captures<'t>(&self, text: &'t str) -> Option<regex::Captures<'t>> {
        match &self.matcher {
            RuleMatcher::Patterns(patterns) => patterns.iter().find_map(|p| p.captures(text)),
            RuleMatcher::CatchAll => None,
        }
    }
}

/// Compile a pattern source with the crate-wide matching policy.
fn compile_pattern(source: &str) -> Result<Regex> {
    Regex::new(&format!("(?i)^(?:{source})"))
        .map_err(|e| AgentError::Rules(format!("invalid pattern `{source}`: {e}")))
}

/// Highest `%n` index used by a template, if any.
fn highest_placeholder(template: &str) -> Option<usize> {
    PLACEHOLDER
        .captures_iter(template)
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .max()
}

/// Serializable form of a single rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Alternative pattern sources. `""` marks the catch-all.
    pub patterns: Vec<String>,
    /// Reply templates with `%n` placeholders.
    pub templates: Vec<String>,
}

impl RuleSpec {
    fn from_static(patterns: &[&str], templates: &[&str]) -> Self {
        Self {
            patterns: patterns.iter().map(|&p| p.to_owned()).collect(),
            templates: templates.iter().map(|&t| t.to_owned()).collect(),
        }
    }
}

/// Serializable rule table: ordered rules plus an optional reflection override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Rules in priority order. The catch-all goes last.
    pub rules: Vec<RuleSpec>,
    /// Replacement reflection map. Built-in swaps are used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflections: Option<BTreeMap<String, String>>,
}

impl RuleTable {
    /// The built-in HAL table.
    pub fn hal() -> Self {
        Self {
            rules: vec![
                RuleSpec::from_static(
                    &["You are (worrying|scary|disturbing)"],
                    &["Yes, I am %1.", "Oh, sooo %1."],
                ),
                RuleSpec::from_static(
                    &[r"Are you ([\w\s]+)\?"],
                    &["Why would you think I am %1?", "Would you like me to be %1?"],
                ),
                RuleSpec::from_static(&[""], &["Is everything OK?", "Can you still communicate?"]),
            ],
            reflections: None,
        }
    }

    /// Load a table from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse a table from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Rules`] if the text is not a valid table.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| AgentError::Rules(format!("invalid rule table: {e}")))
    }

    /// Compile every rule, in order.
    ///
    /// # Errors
    ///
    /// Returns the first rule's compilation error, prefixed with its position.
    pub fn compile(&self) -> Result<Vec<ResponseRule>> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                ResponseRule::new(&spec.patterns, &spec.templates).map_err(|e| match e {
                    AgentError::Rules(msg) => AgentError::Rules(format!("rule {}: {msg}", i + 1)),
                    other => other,
                })
            })
            .collect()
    }

    /// The reflection map this table asks for.
    pub fn reflection_map(&self) -> ReflectionMap {
        match &self.reflections {
            Some(words) => ReflectionMap::new(words.iter().map(|(k, v)| (k, v.clone()))),
            None => ReflectionMap::default(),
        }
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::hal()
    }
}
