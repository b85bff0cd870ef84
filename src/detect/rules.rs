use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// CSS selector for a notification container
    Selector,
    /// Failure-language phrase searched in visible text
    Text,
}

/// A detection rule as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultRuleSpec {
    pub kind: RuleKind,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl FaultRuleSpec {
    pub fn new(kind: RuleKind, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
            label: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Locator {
    Css(String),
    Text(Regex),
}

/// A compiled, ready-to-probe rule.
#[derive(Debug, Clone)]
pub struct FaultRule {
    pub label: String,
    pub locator: Locator,
}

#[derive(Debug)]
pub struct RuleError {
    pub value: String,
    pub source: regex::Error,
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid fault pattern '{}': {}", self.value, self.source)
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| RuleError {
            value: pattern.to_string(),
            source: e,
        })
}

/// Compile rules in order; the first invalid pattern aborts.
pub fn compile_rules(configured: &[FaultRuleSpec]) -> Result<Vec<FaultRule>, RuleError> {
    configured
        .iter()
        .map(|rule| {
            let locator = match rule.kind {
                RuleKind::Selector => Locator::Css(rule.value.clone()),
                RuleKind::Text => Locator::Text(case_insensitive(&rule.value)?),
            };
            let label = rule.label.clone().unwrap_or_else(|| match rule.kind {
                RuleKind::Selector => rule.value.clone(),
                RuleKind::Text => format!("text=/{}/i", rule.value),
            });
            Ok(FaultRule { label, locator })
        })
        .collect()
}

/// Console messages that are known noise.
#[derive(Debug, Clone, Default)]
pub struct ConsoleFilter {
    ignore: Vec<Regex>,
}

impl ConsoleFilter {
    pub fn new(patterns: &[String]) -> Result<Self, RuleError> {
        let ignore = patterns
            .iter()
            .map(|p| case_insensitive(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ignore })
    }

    pub fn is_benign(&self, text: &str) -> bool {
        self.ignore.iter().any(|re| re.is_match(text))
    }
}
