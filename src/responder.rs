//! Ordered pattern-matching response engine.
//!
//! The first rule (in declaration order) with a matching alternative wins. A
//! template is picked uniformly at random from that rule and every `%n`
//! placeholder is replaced by capture `n`, reflected word by word. The
//! catch-all rule is mandatory, so `respond` is total.

use crate::error::{AgentError, Result};
use crate::reflection::ReflectionMap;
use crate::rules::{PLACEHOLDER, ResponseRule, RuleTable};
use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

/// Rule-based responder. Immutable after construction.
#[derive(Debug, Clone)]
pub struct Responder {
    /// Pattern rules, in priority order.
    rules: Vec<ResponseRule>,
    /// Templates of the catch-all rule.
    fallback: Vec<String>,
    reflections: ReflectionMap,
}

impl Responder {
    /// Build a responder from compiled rules.
    ///
    /// The rule list is cut at its first catch-all. Rules declared after it can
    /// never match; they are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Rules`] if no catch-all rule is present.
    pub fn new(rules: Vec<ResponseRule>, reflections: ReflectionMap) -> Result<Self> {
        let total = rules.len();
        let mut ordered = Vec::with_capacity(total);
        let mut fallback = None;

        for rule in rules {
            if rule.is_catch_all() {
                fallback = Some(rule.templates().to_vec());
                break;
            }
            ordered.push(rule);
        }

        let Some(fallback) = fallback else {
            return Err(AgentError::Rules(
                "rule table has no catch-all rule; add a rule with an empty pattern last".into(),
            ));
        };

        let unreachable = total - ordered.len() - 1;
        if unreachable > 0 {
            warn!("{unreachable} rule(s) declared after the catch-all will never match");
        }

        Ok(Self {
            rules: ordered,
            fallback,
            reflections,
        })
    }

    /// Compile a serializable table into a responder.
    ///
    /// # Errors
    ///
    /// Returns an error if any rule fails to compile or the catch-all is missing.
    pub fn from_table(table: &RuleTable) -> Result<Self> {
        Self::new(table.compile()?, table.reflection_map())
    }

    /// Responder over the built-in HAL table.
    ///
    /// # Errors
    ///
    /// Only fails if the built-in table is broken.
    pub fn hal() -> Result<Self> {
        Self::from_table(&RuleTable::hal())
    }

    /// Number of pattern rules, catch-all excluded.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Answer `text` using the thread-local RNG.
    pub fn respond(&self, text: &str) -> String {
        self.respond_with(text, &mut rand::thread_rng())
    }

    /// Answer `text` drawing the template choice from `rng`.
    pub fn respond_with<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> String {
        for (index, rule) in self.rules.iter().enumerate() {
            let Some(caps) = rule.captures(text) else {
                continue;
            };
            debug!(rule = index + 1, "response rule matched");
            let template = choose(rule.templates(), rng);
            let reply = PLACEHOLDER.replace_all(template, |p: &regex::Captures<'_>| {
                let captured = p
                    .get(1)
                    .and_then(|n| n.as_str().parse::<usize>().ok())
                    .and_then(|n| caps.get(n))
                    .map_or("", |m| m.as_str());
                self.reflections.reflect(captured)
            });
            return tidy_punctuation(reply.into_owned());
        }

        debug!("no response rule matched, using catch-all");
        choose(&self.fallback, rng).to_owned()
    }
}

/// Pick a template uniformly at random. Templates are never empty.
fn choose<'a, R: Rng + ?Sized>(templates: &'a [String], rng: &mut R) -> &'a str {
    templates.choose(rng).map_or("", String::as_str)
}

/// Collapse doubled terminal punctuation produced by substitution.
fn tidy_punctuation(mut reply: String) -> String {
    if reply.ends_with("?.") {
        reply.truncate(reply.len() - 2);
        reply.push('.');
    } else if reply.ends_with("??") {
        reply.truncate(reply.len() - 2);
        reply.push('?');
    }
    reply
}
