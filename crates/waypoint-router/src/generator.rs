//! Reverse routing: building URLs from route patterns.
//!
//! Captures are filled from named arguments first, then from positional
//! arguments in declaration order. The most specific expansion of a pattern
//! is tried first, so `/archive[/{year}]` becomes `/archive/2024` when a year
//! is given and `/archive` otherwise. Arguments left over end up in the
//! query string.

use indexmap::IndexMap;
use regex::Regex;
use url::form_urlencoded;
use waypoint_core::{default_port, RequestTarget, RoutingError, RoutingResult};

use crate::pattern::{anchored, Part, RoutePattern};
use crate::patterns::PatternMatchers;

/// Arguments for URL generation.
///
/// # Example
///
/// ```
/// use waypoint_router::UrlArgs;
///
/// let args = UrlArgs::new().with("id", 42).arg("intro");
/// assert_eq!(args.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlArgs {
    named: IndexMap<String, String>,
    positional: Vec<String>,
}

impl UrlArgs {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named argument.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.named.insert(name.into(), value.to_string());
        self
    }

    /// Adds a positional argument.
    #[must_use]
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.positional.push(value.to_string());
        self
    }

    /// Returns the number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.named.len() + self.positional.len()
    }

    /// Returns true if there are no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for UrlArgs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |args, (name, value)| args.with(name, value))
    }
}

/// Scheme, host and port overrides for absolute URLs.
///
/// Unset fields fall back to the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlContext {
    /// Scheme override.
    pub scheme: Option<String>,
    /// Host override.
    pub host: Option<String>,
    /// Port override.
    pub port: Option<u16>,
    /// The request being handled, if any.
    pub request: Option<RequestTarget>,
}

/// Builds URLs for route patterns.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    patterns: PatternMatchers,
    base_prefix: String,
}

impl UrlGenerator {
    /// Creates a generator. `base_prefix` is prepended to every path.
    pub fn new(patterns: PatternMatchers, base_prefix: impl Into<String>) -> Self {
        Self {
            patterns,
            base_prefix: base_prefix.into(),
        }
    }

    /// Builds the URL of `path` with `args`.
    ///
    /// When `absolute` is set, the URL starts with scheme, host and, unless
    /// it is the scheme's default, port.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidRouteUrl`] if the pattern does not
    /// parse, no expansion can be filled from `args`, or an absolute URL is
    /// requested without any known host.
    ///
    /// # Example
    ///
    /// ```
    /// use waypoint_router::{PatternMatchers, UrlArgs, UrlContext, UrlGenerator};
    ///
    /// let generator = UrlGenerator::new(PatternMatchers::default(), "");
    /// let url = generator
    ///     .generate(
    ///         "/post/{id:number}",
    ///         &UrlArgs::new().arg(42).with("ref", "feed"),
    ///         false,
    ///         &UrlContext::default(),
    ///     )
    ///     .unwrap();
    /// assert_eq!(url, "/post/42?ref=feed");
    /// ```
    pub fn generate(
        &self,
        path: &str,
        args: &UrlArgs,
        absolute: bool,
        context: &UrlContext,
    ) -> RoutingResult<String> {
        let source = self.patterns.substitute(path);
        let pattern = RoutePattern::parse(&source)
            .map_err(|err| RoutingError::invalid_url(path, err.to_string()))?;

        let mut failure = String::from("no expansion");
        let mut filled = None;
        for parts in pattern.alternatives().iter().rev() {
            match fill(parts, args) {
                Ok(result) => {
                    filled = Some(result);
                    break;
                }
                Err(reason) => failure = reason,
            }
        }
        let (path_part, query) = filled.ok_or_else(|| RoutingError::invalid_url(path, failure))?;

        let mut url = format!("{}{path_part}", self.base_prefix);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        if !absolute {
            return Ok(url);
        }

        let request = context.request.as_ref();
        // The request's port only carries over when its scheme is kept.
        let (scheme, request_port) = match (&context.scheme, request) {
            (Some(scheme), Some(r)) if r.scheme.eq_ignore_ascii_case(scheme) => {
                (scheme.to_ascii_lowercase(), r.port)
            }
            (Some(scheme), _) => (scheme.to_ascii_lowercase(), None),
            (None, Some(r)) => (r.scheme.to_ascii_lowercase(), r.port),
            (None, None) => ("http".to_string(), None),
        };
        let host = context
            .host
            .clone()
            .or_else(|| request.map(|r| r.host.clone()))
            .filter(|host| !host.is_empty())
            .ok_or_else(|| RoutingError::invalid_url(path, "no host for an absolute url"))?;
        let port = context
            .port
            .or(request_port)
            .filter(|port| Some(*port) != default_port(&scheme));

        Ok(match port {
            Some(port) => format!("{scheme}://{host}:{port}{url}"),
            None => format!("{scheme}://{host}{url}"),
        })
    }
}

/// Fills one expansion. Returns the path and the encoded query of unused
/// arguments, or the reason the expansion cannot be filled.
fn fill(parts: &[Part], args: &UrlArgs) -> Result<(String, String), String> {
    let mut named = args.named.clone();
    let mut cursor = 0;
    let mut path = String::new();

    for part in parts {
        match part {
            Part::Literal(text) => path.push_str(text),
            Part::Capture { name, regex } => {
                let value = if let Some(value) = named.shift_remove(name) {
                    value
                } else if let Some(value) = args.positional.get(cursor) {
                    cursor += 1;
                    value.clone()
                } else {
                    return Err(format!("missing argument `{name}`"));
                };

                let valid = !value.is_empty()
                    && Regex::new(&anchored(regex)).is_ok_and(|re| re.is_match(&value));
                if !valid {
                    return Err(format!("argument `{name}` = `{value}` does not match `{regex}`"));
                }
                path.push_str(&value);
            }
        }
    }

    let mut query = form_urlencoded::Serializer::new(String::new());
    for (index, value) in args.positional.iter().enumerate().skip(cursor) {
        query.append_pair(&index.to_string(), value);
    }
    for (name, value) in &named {
        query.append_pair(name, value);
    }
    Ok((path, query.finish()))
}
