//! Constraint aliases.
//!
//! Patterns may name a constraint by alias, `{id:number}`, instead of
//! spelling the regex. Aliases are substituted before a pattern is parsed,
//! both when matching and when generating URLs.

use indexmap::IndexMap;
use regex::{Captures, Regex};

/// The alias -> regex table consulted before parsing patterns.
///
/// # Example
///
/// ```
/// use waypoint_router::PatternMatchers;
///
/// let mut patterns = PatternMatchers::default();
/// patterns.add("year", "[0-9]{4}");
///
/// assert_eq!(patterns.substitute("/post/{id:number}"), "/post/{id:[0-9]+}");
/// assert_eq!(patterns.substitute("/y/{y:year}"), "/y/{y:[0-9]{4}}");
/// ```
#[derive(Debug, Clone)]
pub struct PatternMatchers {
    aliases: IndexMap<String, String>,
}

impl PatternMatchers {
    /// Creates a table with no aliases.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            aliases: IndexMap::new(),
        }
    }

    /// Adds or replaces an alias.
    pub fn add(&mut self, alias: impl Into<String>, regex: impl Into<String>) -> &mut Self {
        self.aliases.insert(alias.into(), regex.into());
        self
    }

    /// Returns the regex registered for `alias`.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    /// Iterates over `(alias, regex)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, r)| (a.as_str(), r.as_str()))
    }

    /// Replaces every `{name:alias}` in `path` with `{name:regex}`.
    #[must_use]
    pub fn substitute(&self, path: &str) -> String {
        let mut path = path.to_string();
        for (alias, regex) in &self.aliases {
            if !path.contains(alias.as_str()) {
                continue;
            }
            let Ok(finder) = Regex::new(&format!(r"\{{([^{{}}:]+?):{}\}}", regex::escape(alias)))
            else {
                continue;
            };
            path = finder
                .replace_all(&path, |caps: &Captures<'_>| format!("{{{}:{regex}}}", &caps[1]))
                .into_owned();
        }
        path
    }
}

impl Default for PatternMatchers {
    /// The built-in aliases: `number`, `word`, `alphanum_dash`, `slug`, `uuid`.
    fn default() -> Self {
        let mut patterns = Self::empty();
        patterns
            .add("number", "[0-9]+")
            .add("word", "[a-zA-Z]+")
            .add("alphanum_dash", "[a-zA-Z0-9-_]+")
            .add("slug", "[a-z0-9-]+")
            .add(
                "uuid",
                "[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
            );
        patterns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_aliases() {
        let patterns = PatternMatchers::default();
        assert_eq!(patterns.get("number"), Some("[0-9]+"));
        assert_eq!(patterns.iter().count(), 5);
    }

    #[test]
    fn test_substitute_multiple() {
        let patterns = PatternMatchers::default();
        assert_eq!(
            patterns.substitute("/u/{id:uuid}/{name:slug}"),
            format!(
                "/u/{{id:{}}}/{{name:[a-z0-9-]+}}",
                patterns.get("uuid").unwrap()
            )
        );
    }

    #[test]
    fn test_unknown_alias_is_kept_as_regex() {
        let patterns = PatternMatchers::default();
        assert_eq!(patterns.substitute("/x/{id:numbers}"), "/x/{id:numbers}");
        assert_eq!(patterns.substitute("/x/{id}"), "/x/{id}");
    }

    #[test]
    fn test_replacement_with_dollar_is_literal() {
        let mut patterns = PatternMatchers::empty();
        patterns.add("end", "a$");
        assert_eq!(patterns.substitute("/{x:end}"), "/{x:a$}");
    }
}
