//! Rate limit rules configuration and matching.
//!
//! A rule binds a request path matcher (an exact path or a regular expression)
//! to a window literal and a request ceiling. Rules are loaded as an ordered
//! [`RuleSet`] in which the first matching rule wins.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, trace};

use super::policy::PathLimit;
use super::window::parse_window_seconds;
use crate::error::{PathlimitError, Result};

/// Window cache value meaning "not parsed yet". Real windows are at least 1s.
const WINDOW_UNSET: u64 = 0;

/// A single rate limit policy.
///
/// When both `path` and `path_pattern` are set, the exact path wins and the
/// pattern is never evaluated.
///
/// Exact paths compare case-insensitively while patterns keep regex semantics
/// and are therefore case-sensitive unless they opt out with `(?i)`. Both
/// behaviours are relied upon by existing rule files.
///
/// Patterns use the syntax of the [`regex`] crate, which has no lookaround and
/// no backreferences. Rule files written for engines that support them fail
/// with [`PathlimitError::MalformedPattern`] and need those patterns rewritten.
///
/// Unknown keys are rejected when deserializing, so a misspelled matcher
/// cannot silently disable a rule.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RateLimitRule {
    /// Exact request path this rule applies to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Regular expression this rule applies to, used only without `path`
    #[serde(default, alias = "pathRegex", skip_serializing_if = "Option::is_none")]
    pub path_pattern: Option<String>,
    /// Window literal such as `10s`, `5m`, `2h` or `1d`
    pub window: String,
    /// Requests permitted within one window
    pub max_requests: i64,
    /// Parsed `window` in seconds, `WINDOW_UNSET` until first read
    #[serde(skip)]
    window_seconds: AtomicU64,
    /// Compiled `path_pattern`, filled on first successful compile
    #[serde(skip)]
    compiled_pattern: OnceLock<Regex>,
}

impl RateLimitRule {
    /// Create a new rule from raw configuration values.
    ///
    /// Nothing is validated here; a bad window or pattern is reported by the
    /// first call that needs it.
    pub fn new(
        path: Option<String>,
        path_pattern: Option<String>,
        window: impl Into<String>,
        max_requests: i64,
    ) -> Self {
        Self {
            path,
            path_pattern,
            window: window.into(),
            max_requests,
            window_seconds: AtomicU64::new(WINDOW_UNSET),
            compiled_pattern: OnceLock::new(),
        }
    }

    /// Create a rule that matches one exact path.
    pub fn exact(path: impl Into<String>, window: impl Into<String>, max_requests: i64) -> Self {
        Self::new(Some(path.into()), None, window, max_requests)
    }

    /// Create a rule that matches a regular expression.
    pub fn pattern(
        pattern: impl Into<String>,
        window: impl Into<String>,
        max_requests: i64,
    ) -> Self {
        Self::new(None, Some(pattern.into()), window, max_requests)
    }

    /// Whether this rule governs a request for `path`.
    ///
    /// `path` is expected to be normalized already (no query string).
    pub fn match_path(&self, path: &str) -> Result<bool> {
        if let Some(exact) = non_empty(&self.path) {
            return Ok(eq_ignore_case(path, exact));
        }

        if let Some(pattern) = non_empty(&self.path_pattern) {
            let regex = self.compiled_pattern(pattern)?;
            let matched = regex.is_match(path);
            trace!(pattern = %pattern, path = %path, matched, "Evaluated path pattern");
            return Ok(matched);
        }

        Ok(false)
    }

    /// Length of the window in seconds.
    ///
    /// Parsed on first access and remembered afterwards.
    pub fn window_seconds(&self) -> Result<u64> {
        let cached = self.window_seconds.load(Ordering::Acquire);
        if cached >= 1 {
            return Ok(cached);
        }

        let seconds = parse_window_seconds(&self.window)?;
        debug!(window = %self.window, seconds, "Parsed rate limit window");
        // Racing first reads all store the same value.
        self.window_seconds.store(seconds, Ordering::Release);
        Ok(seconds)
    }

    /// Requests permitted within one window.
    pub fn max_requests(&self) -> i64 {
        self.max_requests
    }

    /// Effective matching target of this rule.
    ///
    /// This is `path` when it is set, otherwise `path_pattern`. When neither
    /// is set the (empty or missing) `path` is returned, not the pattern.
    pub fn path_key(&self) -> Option<&str> {
        if non_empty(&self.path).is_none() && non_empty(&self.path_pattern).is_some() {
            self.path_pattern.as_deref()
        } else {
            self.path.as_deref()
        }
    }

    /// Parse the window and compile the pattern now instead of on first use.
    pub fn validate(&self) -> Result<()> {
        self.window_seconds()?;
        if let Some(pattern) = non_empty(&self.path_pattern) {
            self.compiled_pattern(pattern)?;
        }
        Ok(())
    }

    fn compiled_pattern(&self, pattern: &str) -> Result<&Regex> {
        if let Some(regex) = self.compiled_pattern.get() {
            return Ok(regex);
        }

        let regex = Regex::new(pattern).map_err(|source| PathlimitError::MalformedPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        debug!(pattern = %pattern, "Compiled path pattern");
        Ok(self.compiled_pattern.get_or_init(|| regex))
    }
}

impl Clone for RateLimitRule {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            path_pattern: self.path_pattern.clone(),
            window: self.window.clone(),
            max_requests: self.max_requests,
            window_seconds: AtomicU64::new(self.window_seconds.load(Ordering::Acquire)),
            compiled_pattern: self.compiled_pattern.clone(),
        }
    }
}

impl PathLimit for RateLimitRule {
    fn match_path(&self, path: &str) -> Result<bool> {
        RateLimitRule::match_path(self, path)
    }

    fn window_seconds(&self) -> Result<u64> {
        RateLimitRule::window_seconds(self)
    }

    fn max_requests(&self) -> i64 {
        self.max_requests
    }

    fn path_key(&self) -> Option<&str> {
        RateLimitRule::path_key(self)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Locale-independent case-insensitive equality.
fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// An ordered collection of rate limit rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    /// Rules in configuration order
    #[serde(default)]
    pub rules: Vec<RateLimitRule>,
}

impl RuleSet {
    /// Create a rule set from rules in priority order.
    pub fn new(rules: Vec<RateLimitRule>) -> Self {
        Self { rules }
    }

    /// Load a rule set from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading rate limit rules");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load a rule set from a YAML string.
    ///
    /// Accepts either a mapping with a `rules` list or a bare list of rules.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let parse_error = |e: serde_yaml::Error| {
            PathlimitError::Config(format!("Failed to parse rate limit rules: {}", e))
        };

        let value: serde_yaml::Value = serde_yaml::from_str(yaml).map_err(parse_error)?;
        let rules: Vec<RateLimitRule> = match value {
            serde_yaml::Value::Null => Vec::new(),
            serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value).map_err(parse_error)?,
            _ => serde_yaml::from_value::<RuleSet>(value)
                .map_err(parse_error)?
                .rules,
        };

        debug!(count = rules.len(), "Parsed rate limit rules");
        Ok(Self::new(rules))
    }

    /// Parse every window and compile every pattern.
    ///
    /// Returns the first failure together with the index of its rule.
    pub fn validate(&self) -> Result<()> {
        for (index, rule) in self.rules.iter().enumerate() {
            rule.validate().map_err(|source| PathlimitError::InvalidRule {
                index,
                source: Box::new(source),
            })?;
        }
        Ok(())
    }

    /// Find the first rule that governs `path`, with its index.
    pub fn find_match(&self, path: &str) -> Result<Option<(usize, &RateLimitRule)>> {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.match_path(path)? {
                return Ok(Some((index, rule)));
            }
        }
        Ok(None)
    }

    /// Find every rule that governs `path` with its index, in configuration order.
    pub fn matching(&self, path: &str) -> Result<Vec<(usize, &RateLimitRule)>> {
        let mut matched = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.match_path(path)? {
                matched.push((index, rule));
            }
        }
        Ok(matched)
    }

    /// Iterate over the rules in order.
    pub fn iter(&self) -> std::slice::Iter<'_, RateLimitRule> {
        self.rules.iter()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a RateLimitRule;
    type IntoIter = std::slice::Iter<'a, RateLimitRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
