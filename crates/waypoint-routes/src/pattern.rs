//! Route path patterns
//!
//! Supported segment forms:
//! - `users`: static, must match exactly
//! - `:id`: captures one segment
//! - `:id?`: optional, may be omitted
//! - `*`, `:rest(.*)*`, `:rest(.*)`: captures the remaining suffix (last segment only)

use waypoint_location::{decode_segment, encode_segment, split_segments, Params};

use crate::error::RouteError;
use crate::Result;

/// Param name used for bare `*` wildcards.
pub const CATCH_ALL_PARAM: &str = "pathMatch";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSegment {
    Static(String),
    Param { name: String, optional: bool },
    Wildcard { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    source: String,
    segments: Vec<PatternSegment>,
}

impl PathPattern {
    pub fn parse(path: &str) -> Result<Self> {
        let segments = split_segments(path)
            .into_iter()
            .map(|raw| parse_segment(path, raw))
            .collect::<Result<Vec<_>>>()?;

        if let Some(pos) = segments
            .iter()
            .position(|s| matches!(s, PatternSegment::Wildcard { .. }))
        {
            if pos + 1 != segments.len() {
                return Err(invalid(path, "wildcard must be the last segment"));
            }
        }

        Ok(Self {
            source: path.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments that capture a param (including wildcards)
    pub fn dynamic_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| !matches!(s, PatternSegment::Static(_)))
            .count()
    }

    pub fn is_static(&self) -> bool {
        self.dynamic_count() == 0
    }

    pub fn has_wildcard(&self) -> bool {
        matches!(self.segments.last(), Some(PatternSegment::Wildcard { .. }))
    }

    /// A pattern made of nothing but a wildcard (`*`, `/:pathMatch(.*)*`).
    pub fn is_catch_all(&self) -> bool {
        self.segments.len() == 1 && self.has_wildcard()
    }

    /// Key for the exact-match table; `None` for dynamic patterns.
    pub fn static_key(&self, case_sensitive: bool) -> Option<String> {
        if !self.is_static() {
            return None;
        }
        let joined = self
            .segments
            .iter()
            .filter_map(|s| match s {
                PatternSegment::Static(value) => Some(value.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        let key = format!("/{}", joined);
        Some(if case_sensitive {
            key
        } else {
            key.to_lowercase()
        })
    }

    /// Match already-split path segments, returning the captured params.
    ///
    /// Optional params are filled left to right with however many extra
    /// segments the path carries, so the tolerance is exactly the number of
    /// optionals omitted. A trailing wildcard takes whatever remains.
    pub fn match_segments(&self, path: &[&str], case_sensitive: bool) -> Option<Params> {
        let required = self
            .segments
            .iter()
            .filter(|s| {
                matches!(
                    s,
                    PatternSegment::Static(_) | PatternSegment::Param { optional: false, .. }
                )
            })
            .count();
        let optional = self
            .segments
            .iter()
            .filter(|s| matches!(s, PatternSegment::Param { optional: true, .. }))
            .count();

        if path.len() < required {
            return None;
        }
        let extra = path.len() - required;
        if !self.has_wildcard() && extra > optional {
            return None;
        }

        let mut fill = extra.min(optional);
        let mut params = Params::new();
        let mut idx = 0;

        for segment in &self.segments {
            match segment {
                PatternSegment::Static(expected) => {
                    let actual = path.get(idx)?;
                    if !segment_eq(expected, actual, case_sensitive) {
                        return None;
                    }
                    idx += 1;
                }
                PatternSegment::Param {
                    name,
                    optional: false,
                } => {
                    let actual = path.get(idx)?;
                    params.insert(name.clone(), decode_segment(actual));
                    idx += 1;
                }
                PatternSegment::Param {
                    name,
                    optional: true,
                } => {
                    if fill > 0 {
                        let actual = path.get(idx)?;
                        params.insert(name.clone(), decode_segment(actual));
                        idx += 1;
                        fill -= 1;
                    }
                }
                PatternSegment::Wildcard { name } => {
                    let rest = path
                        .get(idx..)
                        .unwrap_or_default()
                        .iter()
                        .map(|s| decode_segment(s))
                        .collect::<Vec<_>>()
                        .join("/");
                    params.insert(name.clone(), rest);
                    idx = path.len();
                }
            }
        }

        (idx == path.len()).then_some(params)
    }

    /// Build a concrete path by substituting params into the pattern.
    pub fn build(&self, params: &Params, route: &str) -> Result<String> {
        let mut parts = Vec::with_capacity(self.segments.len());

        for segment in &self.segments {
            match segment {
                PatternSegment::Static(value) => parts.push(value.clone()),
                PatternSegment::Param { name, optional } => {
                    match params.get(name).filter(|v| !v.is_empty()) {
                        Some(value) => parts.push(encode_segment(value)),
                        None if *optional => {}
                        None => {
                            return Err(RouteError::MissingParam {
                                route: route.to_string(),
                                param: name.clone(),
                            })
                        }
                    }
                }
                PatternSegment::Wildcard { name } => {
                    if let Some(rest) = params.get(name).filter(|v| !v.is_empty()) {
                        let encoded = rest
                            .split('/')
                            .filter(|s| !s.is_empty())
                            .map(encode_segment)
                            .collect::<Vec<_>>()
                            .join("/");
                        parts.push(encoded);
                    }
                }
            }
        }

        Ok(format!("/{}", parts.join("/")))
    }
}

fn parse_segment(path: &str, raw: &str) -> Result<PatternSegment> {
    if raw == "*" {
        return Ok(PatternSegment::Wildcard {
            name: CATCH_ALL_PARAM.to_string(),
        });
    }

    let Some(rest) = raw.strip_prefix(':') else {
        return Ok(PatternSegment::Static(raw.to_string()));
    };

    if let Some(open) = rest.find('(') {
        let name = &rest[..open];
        let regex = &rest[open..];
        if !matches!(regex, "(.*)" | "(.*)*" | "(.*)+") {
            return Err(unsupported(path, "custom param patterns"));
        }
        validate_name(path, name)?;
        return Ok(PatternSegment::Wildcard {
            name: name.to_string(),
        });
    }

    if let Some(name) = rest.strip_suffix('?') {
        validate_name(path, name)?;
        return Ok(PatternSegment::Param {
            name: name.to_string(),
            optional: true,
        });
    }

    if rest.ends_with('*') || rest.ends_with('+') {
        return Err(unsupported(path, "repeatable params"));
    }

    validate_name(path, rest)?;
    Ok(PatternSegment::Param {
        name: rest.to_string(),
        optional: false,
    })
}

fn validate_name(path: &str, name: &str) -> Result<()> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(invalid(path, &format!("invalid param name '{}'", name)));
    }
    Ok(())
}

fn segment_eq(expected: &str, actual: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        expected == actual
    } else {
        expected.to_lowercase() == actual.to_lowercase()
    }
}

fn invalid(path: &str, reason: &str) -> RouteError {
    RouteError::InvalidPattern {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

fn unsupported(path: &str, reason: &str) -> RouteError {
    RouteError::UnsupportedPattern {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segs(path: &str) -> Vec<&str> {
        split_segments(path)
    }

    #[test]
    fn test_parse_segments() {
        let pattern = PathPattern::parse("/users/:id/posts/:slug?").unwrap();
        assert_eq!(pattern.segment_count(), 4);
        assert_eq!(pattern.dynamic_count(), 2);
        assert!(!pattern.is_static());

        let catch_all = PathPattern::parse("/:pathMatch(.*)*").unwrap();
        assert!(catch_all.is_catch_all());
        assert_eq!(
            catch_all.segments(),
            &[PatternSegment::Wildcard {
                name: "pathMatch".into()
            }]
        );
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(PathPattern::parse("/files/*/edit").is_err());
        assert!(PathPattern::parse("/users/:id(\\d+)").is_err());
        assert!(PathPattern::parse("/tags/:tag+").is_err());
        assert!(PathPattern::parse("/users/:").is_err());
    }

    #[test]
    fn test_match_params() {
        let pattern = PathPattern::parse("/users/:id").unwrap();
        let params = pattern.match_segments(&segs("/users/42"), true).unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));

        assert!(pattern.match_segments(&segs("/users"), true).is_none());
        assert!(pattern.match_segments(&segs("/users/42/x"), true).is_none());
        assert!(pattern.match_segments(&segs("/people/42"), true).is_none());
    }

    #[test]
    fn test_match_decodes_params() {
        let pattern = PathPattern::parse("/tags/:tag").unwrap();
        let params = pattern.match_segments(&segs("/tags/caf%C3%A9"), true).unwrap();
        assert_eq!(params.get("tag").map(String::as_str), Some("café"));
    }

    #[test]
    fn test_trailing_optionals_are_individually_omittable() {
        let pattern = PathPattern::parse("/a/:x?/:y?").unwrap();

        let none = pattern.match_segments(&segs("/a"), true).unwrap();
        assert!(none.is_empty());

        let one = pattern.match_segments(&segs("/a/1"), true).unwrap();
        assert_eq!(one.get("x").map(String::as_str), Some("1"));
        assert!(one.get("y").is_none());

        let two = pattern.match_segments(&segs("/a/1/2"), true).unwrap();
        assert_eq!(two.get("y").map(String::as_str), Some("2"));

        assert!(pattern.match_segments(&segs("/a/1/2/3"), true).is_none());
    }

    #[test]
    fn test_middle_optional() {
        let pattern = PathPattern::parse("/docs/:version?/intro").unwrap();
        assert!(pattern.match_segments(&segs("/docs/intro"), true).is_some());
        let params = pattern.match_segments(&segs("/docs/v2/intro"), true).unwrap();
        assert_eq!(params.get("version").map(String::as_str), Some("v2"));
    }

    #[test]
    fn test_wildcard_captures_suffix() {
        let pattern = PathPattern::parse("/files/*").unwrap();
        let params = pattern.match_segments(&segs("/files/a/b/c.txt"), true).unwrap();
        assert_eq!(params.get("pathMatch").map(String::as_str), Some("a/b/c.txt"));

        let empty = pattern.match_segments(&segs("/files"), true).unwrap();
        assert_eq!(empty.get("pathMatch").map(String::as_str), Some(""));
    }

    #[test]
    fn test_case_sensitivity() {
        let pattern = PathPattern::parse("/About").unwrap();
        assert!(pattern.match_segments(&segs("/about"), false).is_some());
        assert!(pattern.match_segments(&segs("/about"), true).is_none());
        assert_eq!(pattern.static_key(false).as_deref(), Some("/about"));
        assert_eq!(pattern.static_key(true).as_deref(), Some("/About"));
    }

    #[test]
    fn test_build_path() {
        let pattern = PathPattern::parse("/users/:id/:tab?").unwrap();
        let mut params = Params::new();
        params.insert("id".into(), "a b".into());
        assert_eq!(pattern.build(&params, "user").unwrap(), "/users/a%20b");

        params.insert("tab".into(), "posts".into());
        assert_eq!(pattern.build(&params, "user").unwrap(), "/users/a%20b/posts");

        let err = pattern.build(&Params::new(), "user").unwrap_err();
        assert_eq!(
            err,
            RouteError::MissingParam {
                route: "user".into(),
                param: "id".into()
            }
        );
    }
}
