//! Route pattern parsing.
//!
//! A pattern is a path with placeholders and optional trailing parts:
//!
//! - `{name}` captures one path segment (`[^/]+`)
//! - `{name:regex}` captures what `regex` accepts; the regex may contain
//!   balanced braces, e.g. `{year:[0-9]{4}}`
//! - `[...]` marks an optional trailing part; parts nest, `/a[/b[/c]]`
//!
//! Parsing expands optional parts into alternatives, least specific first.
//! `/archive[/{year}[/{month}]]` yields `/archive`, `/archive/{year}` and
//! `/archive/{year}/{month}`.

use regex::Regex;
use regex_syntax::hir::{Class, Hir, HirKind, Literal};
use waypoint_core::{Params, RoutingError, RoutingResult};

/// Regex used for a placeholder without an explicit one.
pub const DEFAULT_CAPTURE: &str = "[^/]+";

/// A literal run or a capture within a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    /// Text matched verbatim.
    Literal(String),
    /// A named capture constrained by a regex.
    Capture {
        /// Variable name.
        name: String,
        /// Constraint regex (unanchored source).
        regex: String,
    },
}

/// A parsed route pattern.
///
/// # Example
///
/// ```
/// use waypoint_router::pattern::{Part, RoutePattern};
///
/// let pattern = RoutePattern::parse("/post/{id:[0-9]+}[/{slug}]").unwrap();
/// assert_eq!(pattern.alternatives().len(), 2);
/// assert_eq!(pattern.variables(), vec!["id", "slug"]);
/// assert!(matches!(pattern.alternatives()[0][1], Part::Capture { .. }));
/// ```
#[derive(Debug, Clone)]
pub struct RoutePattern {
    source: String,
    alternatives: Vec<Vec<Part>>,
}

enum Token {
    Text(String),
    Capture { name: String, regex: String },
    Open,
    Close,
}

impl RoutePattern {
    /// Parses `source`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::BadRouteDeclaration`] for unbalanced brackets
    /// or braces, an optional part that is not at the end, an empty
    /// optional part, an invalid or repeated placeholder name, or an
    /// invalid regex.
    pub fn parse(source: &str) -> RoutingResult<Self> {
        let tokens = tokenize(source)?;

        let trailing = tokens
            .iter()
            .rev()
            .take_while(|t| matches!(t, Token::Close))
            .count();
        let body = &tokens[..tokens.len() - trailing];

        if body.iter().any(|t| matches!(t, Token::Close)) {
            return Err(RoutingError::bad_route(
                source,
                "optional segments can only occur at the end of a route",
            ));
        }
        let opens = body.iter().filter(|t| matches!(t, Token::Open)).count();
        if opens != trailing {
            return Err(RoutingError::bad_route(
                source,
                "number of opening `[` and closing `]` does not match",
            ));
        }

        let mut alternatives = Vec::with_capacity(opens + 1);
        let mut current: Vec<Part> = Vec::new();
        for (n, chunk) in body.split(|t| matches!(t, Token::Open)).enumerate() {
            if n > 0 && chunk.is_empty() {
                return Err(RoutingError::bad_route(source, "empty optional part"));
            }
            for token in chunk {
                match token {
                    Token::Text(text) => match current.last_mut() {
                        Some(Part::Literal(last)) => last.push_str(text),
                        _ => current.push(Part::Literal(text.clone())),
                    },
                    Token::Capture { name, regex } => current.push(Part::Capture {
                        name: name.clone(),
                        regex: regex.clone(),
                    }),
                    Token::Open | Token::Close => {}
                }
            }
            alternatives.push(current.clone());
        }

        let mut seen: Vec<&str> = Vec::new();
        for part in &current {
            if let Part::Capture { name, .. } = part {
                if seen.contains(&name.as_str()) {
                    return Err(RoutingError::bad_route(
                        source,
                        format!("cannot use the same placeholder `{name}` twice"),
                    ));
                }
                seen.push(name);
            }
        }

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    /// Returns the pattern as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the expansions, least specific first.
    #[must_use]
    pub fn alternatives(&self) -> &[Vec<Part>] {
        &self.alternatives
    }

    /// Returns the variable names of the most specific expansion, in order.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        self.alternatives
            .last()
            .into_iter()
            .flatten()
            .filter_map(|part| match part {
                Part::Capture { name, .. } => Some(name.as_str()),
                Part::Literal(_) => None,
            })
            .collect()
    }
}

/// Returns the literal path of `parts`, or `None` if it captures anything.
pub(crate) fn literal_path(parts: &[Part]) -> Option<String> {
    parts.iter().try_fold(String::new(), |mut path, part| match part {
        Part::Literal(text) => {
            path.push_str(text);
            Some(path)
        }
        Part::Capture { .. } => None,
    })
}

fn tokenize(source: &str) -> RoutingResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut chars = source.chars();

    let flush = |text: &mut String, tokens: &mut Vec<Token>| {
        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(text)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                flush(&mut text, &mut tokens);
                let mut depth = 1;
                let mut inner = String::new();
                loop {
                    let Some(next) = chars.next() else {
                        return Err(RoutingError::bad_route(source, "unterminated placeholder"));
                    };
                    match next {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    inner.push(next);
                }
                tokens.push(capture(source, &inner)?);
            }
            '}' => return Err(RoutingError::bad_route(source, "unexpected `}`")),
            '[' => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Open);
            }
            ']' => {
                flush(&mut text, &mut tokens);
                tokens.push(Token::Close);
            }
            _ => text.push(c),
        }
    }
    flush(&mut text, &mut tokens);
    Ok(tokens)
}

fn capture(source: &str, inner: &str) -> RoutingResult<Token> {
    let (name, regex) = match inner.split_once(':') {
        Some((name, regex)) => (name.trim(), regex.trim()),
        None => (inner.trim(), DEFAULT_CAPTURE),
    };

    let mut chars = name.chars();
    let valid_name = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid_name {
        return Err(RoutingError::bad_route(
            source,
            format!("invalid placeholder name `{name}`"),
        ));
    }
    if regex.is_empty() {
        return Err(RoutingError::bad_route(
            source,
            format!("empty constraint for placeholder `{name}`"),
        ));
    }
    Regex::new(&anchored(regex)).map_err(|err| {
        RoutingError::bad_route(source, format!("invalid constraint for `{name}`: {err}"))
    })?;

    Ok(Token::Capture {
        name: name.to_string(),
        regex: regex.to_string(),
    })
}

/// Wraps `regex` so it must match a whole string.
pub(crate) fn anchored(regex: &str) -> String {
    format!("^(?:{regex})$")
}

/// One `/`-delimited piece of a pattern, as stored in the match tree.
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    /// Matched by string equality.
    Literal(String),
    /// Matched by a regex over exactly one path segment.
    Pattern(SegmentPattern),
    /// Matched by a regex over the whole remaining path.
    Tail(SegmentPattern),
}

/// A compiled segment containing at least one capture.
#[derive(Debug, Clone)]
pub(crate) struct SegmentPattern {
    key: String,
    regex: Regex,
    groups: Vec<(String, String)>,
}

impl SegmentPattern {
    fn compile(source: &str, parts: &[Part]) -> RoutingResult<Self> {
        let mut pattern = String::from("^");
        let mut key = String::new();
        let mut groups = Vec::new();

        for part in parts {
            match part {
                Part::Literal(text) => {
                    pattern.push_str(&regex::escape(text));
                    key.push_str(text);
                }
                Part::Capture { name, regex } => {
                    let group = format!("__c{}", groups.len());
                    pattern.push_str(&format!("(?P<{group}>(?:{regex}))"));
                    key.push_str(&format!("{{{name}:{regex}}}"));
                    groups.push((name.clone(), group));
                }
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern)
            .map_err(|err| RoutingError::bad_route(source, err.to_string()))?;
        Ok(Self { key, regex, groups })
    }

    /// Identity of the segment for edge sharing in the tree.
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Matches `value`, appending captures to `params` on success.
    pub(crate) fn capture(&self, value: &str, params: &mut Params) -> bool {
        let Some(caps) = self.regex.captures(value) else {
            return false;
        };
        for (name, group) in &self.groups {
            if let Some(m) = caps.name(group) {
                params.push(name.as_str(), m.as_str());
            }
        }
        true
    }
}

/// Splits one expansion into tree segments.
///
/// The segment before the leading `/` is dropped. A final segment holding a
/// capture whose regex accepts `/` becomes a [`Segment::Tail`].
pub(crate) fn segments(source: &str, parts: &[Part]) -> RoutingResult<Vec<Segment>> {
    let mut pieces: Vec<Vec<Part>> = vec![Vec::new()];
    for part in parts {
        match part {
            Part::Literal(text) => {
                for (i, piece) in text.split('/').enumerate() {
                    if i > 0 {
                        pieces.push(Vec::new());
                    }
                    if !piece.is_empty() {
                        if let Some(last) = pieces.last_mut() {
                            last.push(Part::Literal(piece.to_string()));
                        }
                    }
                }
            }
            Part::Capture { .. } => {
                if let Some(last) = pieces.last_mut() {
                    last.push(part.clone());
                }
            }
        }
    }
    if pieces.len() > 1 && pieces[0].is_empty() {
        pieces.remove(0);
    }

    let count = pieces.len();
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| {
            if let Some(text) = literal_path(&piece) {
                return Ok(Segment::Literal(text));
            }
            let pattern = SegmentPattern::compile(source, &piece)?;
            if i + 1 == count && spans_segments(&piece) {
                Ok(Segment::Tail(pattern))
            } else {
                Ok(Segment::Pattern(pattern))
            }
        })
        .collect()
}

fn spans_segments(parts: &[Part]) -> bool {
    parts.iter().any(|part| match part {
        Part::Capture { regex, .. } => {
            regex_syntax::parse(regex).is_ok_and(|hir| admits_slash(&hir))
        }
        Part::Literal(_) => false,
    })
}

/// Returns true if some string `hir` matches can contain a `/`.
fn admits_slash(hir: &Hir) -> bool {
    match hir.kind() {
        HirKind::Literal(Literal(bytes)) => bytes.contains(&b'/'),
        HirKind::Class(Class::Unicode(class)) => class
            .ranges()
            .iter()
            .any(|range| range.start() <= '/' && '/' <= range.end()),
        HirKind::Class(Class::Bytes(class)) => class
            .ranges()
            .iter()
            .any(|range| range.start() <= b'/' && b'/' <= range.end()),
        HirKind::Repetition(repetition) if repetition.max == Some(0) => false,
        kind => kind.subs().iter().any(admits_slash),
    }
}
