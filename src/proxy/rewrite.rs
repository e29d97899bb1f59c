//! Path rewrite engine.
//!
//! # Responsibilities
//! - Compile redirect rules once, at proxy construction
//! - Match each rule against the full path (path + query), anchored at the start
//! - Produce the redirect target of the first matching rule
//!
//! # Design Decisions
//! - Method-agnostic
//! - Matching is pure; a match means no upstream call is made
//! - Substitution replaces every match in the full path, not only the anchored one

use regex::Regex;

use crate::config::RewriteConfig;
use crate::proxy::error::ProxyError;

/// A compiled `(pattern, template)` pair.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    template: String,
}

impl RewriteRule {
    /// Compile a rule. The template uses `$1` / `${name}` capture references.
    pub fn new(pattern: &str, template: &str) -> Result<Self, ProxyError> {
        let regex = Regex::new(pattern).map_err(|source| ProxyError::InvalidRewrite {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: regex,
            template: template.to_string(),
        })
    }

    /// Whether the pattern matches at the very start of `full_path`.
    ///
    /// The leftmost match starts at 0 exactly when some match starts at 0.
    pub fn matches(&self, full_path: &str) -> bool {
        self.pattern
            .find(full_path)
            .is_some_and(|m| m.start() == 0)
    }

    /// Apply the template, or `None` when the rule does not match.
    pub fn apply(&self, full_path: &str) -> Option<String> {
        if !self.matches(full_path) {
            return None;
        }
        Some(
            self.pattern
                .replace_all(full_path, self.template.as_str())
                .into_owned(),
        )
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

/// Ordered rule list; first match wins.
#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    rules: Vec<RewriteRule>,
}

impl RewriteRules {
    pub fn compile(configs: &[RewriteConfig]) -> Result<Self, ProxyError> {
        let rules = configs
            .iter()
            .map(|c| RewriteRule::new(&c.pattern, &c.to))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The redirect target for `full_path`, if any rule matches.
    pub fn redirect_for(&self, full_path: &str) -> Option<String> {
        tracing::debug!(full_path = %full_path, "Dispatch full path");

        let (index, target) = self
            .rules
            .iter()
            .enumerate()
            .find_map(|(i, rule)| rule.apply(full_path).map(|t| (i, t)))?;

        tracing::debug!(rule = index, redirect_to = %target, "Rewrite rule matched");
        Some(target)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
