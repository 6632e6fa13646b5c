//! Policy pattern matching.
//!
//! A pattern is either a literal string or a template whose `<...>` segments
//! are regular expressions, e.g. `urn:iam::user/<[0-9]+>`. Templates always
//! match the whole value. Compiled templates are cached per matcher.

use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;

use iam_core::{IamError, IamResult};

const OPEN: char = '<';
const CLOSE: char = '>';

/// Compiles and caches pattern templates.
#[derive(Debug, Default)]
pub struct PatternMatcher {
    cache: RwLock<HashMap<String, Regex>>,
}

impl PatternMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `value` matches `pattern`. A malformed template is an error.
    pub fn matches(&self, pattern: &str, value: &str) -> IamResult<bool> {
        if !pattern.contains(OPEN) {
            return Ok(pattern == value);
        }

        if let Some(re) = self.cached(pattern) {
            return Ok(re.is_match(value));
        }

        let re = compile(pattern)?;
        let hit = re.is_match(value);
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(pattern.to_string(), re);
        }
        Ok(hit)
    }

    /// True when any of `patterns` matches `value`.
    pub fn matches_any(&self, patterns: &[String], value: &str) -> IamResult<bool> {
        for pattern in patterns {
            if self.matches(pattern, value)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn cached(&self, pattern: &str) -> Option<Regex> {
        self.cache.read().ok()?.get(pattern).cloned()
    }
}

/// Translate a template into an anchored regular expression.
pub fn compile(pattern: &str) -> IamResult<Regex> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut depth = 0usize;
    let mut literal = String::new();
    let mut expr = String::new();

    for c in pattern.chars() {
        match c {
            OPEN => {
                if depth == 0 {
                    out.push_str(&regex::escape(&literal));
                    literal.clear();
                } else {
                    expr.push(c);
                }
                depth += 1;
            }
            CLOSE if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    out.push_str("(?:");
                    out.push_str(&expr);
                    out.push(')');
                    expr.clear();
                } else {
                    expr.push(c);
                }
            }
            _ if depth > 0 => expr.push(c),
            _ => literal.push(c),
        }
    }

    if depth != 0 {
        return Err(IamError::invalid(format!("unbalanced pattern delimiters in {pattern:?}")));
    }

    out.push_str(&regex::escape(&literal));
    out.push('$');

    Regex::new(&out).map_err(|e| IamError::invalid(format!("pattern {pattern:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_patterns_compare_exactly() {
        let m = PatternMatcher::new();
        assert!(m.matches("iam:user:load", "iam:user:load").unwrap());
        assert!(!m.matches("iam:user:load", "iam:user:load2").unwrap());
        assert!(!m.matches("urn:iam::user/.*", "urn:iam::user/1").unwrap());
    }

    #[test]
    fn templates_match_whole_value() {
        let m = PatternMatcher::new();
        assert!(m.matches("urn:iam::user/<[0-9]+>", "urn:iam::user/123").unwrap());
        assert!(!m.matches("urn:iam::user/<[0-9]+>", "urn:iam::user/12a").unwrap());
        assert!(!m.matches("iam:<user|group>", "xiam:user").unwrap());
        assert!(m.matches("iam:user:<.*>", "iam:user:write-attr").unwrap());
    }

    #[test]
    fn nested_delimiters_stay_inside_the_expression() {
        let m = PatternMatcher::new();
        assert!(m.matches("a<(?P<n>[0-9])>", "a7").unwrap());
    }

    #[test]
    fn malformed_templates_error() {
        let m = PatternMatcher::new();
        assert!(m.matches("urn:iam::user/<[0-9]+", "urn:iam::user/1").is_err());
        assert!(m.matches("urn:<(>", "urn:(").is_err());
    }

    #[test]
    fn cache_is_reused() {
        let m = PatternMatcher::new();
        for _ in 0..3 {
            assert!(m.matches("x<.+>", "xy").unwrap());
        }
        assert_eq!(m.cache.read().unwrap().len(), 1);
    }
}
