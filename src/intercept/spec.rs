//! Intercept specs: which calls the engine attaches to.

use glob::{MatchOptions, Pattern};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// One call matcher, shaped like a browser test runner's route matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptSpec {
    /// HTTP method, `*` or absent for any.
    pub method: Option<String>,
    /// Glob over the URL path, e.g. `/todos/*`.
    pub pathname: Option<String>,
    /// Glob over the whole URL.
    pub url: Option<String>,
    /// Resource type (`xhr`, `fetch`, ...), only checked by the host.
    pub resource_type: Option<String>,
}

/// A single spec or a list of specs; both are handled uniformly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InterceptSpecs {
    /// Exactly one spec.
    One(InterceptSpec),
    /// Several specs, each with its own sequence.
    Many(Vec<InterceptSpec>),
}

impl InterceptSpecs {
    /// Flatten into a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<InterceptSpec> {
        match self {
            Self::One(spec) => vec![spec],
            Self::Many(specs) => specs,
        }
    }

    /// Returns `true` for an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Many(specs) if specs.is_empty())
    }
}

impl InterceptSpec {
    /// Spec matching any call whose path matches `pathname`.
    #[must_use]
    pub fn any(pathname: &str) -> Self {
        Self { method: None, pathname: Some(pathname.to_string()), ..Self::default() }
    }

    /// Spec matching `method` calls whose path matches `pathname`.
    #[must_use]
    pub fn new(method: &str, pathname: &str) -> Self {
        Self { method: Some(method.to_string()), ..Self::any(pathname) }
    }

    /// Whether a call with this method and URL falls under the spec.
    ///
    /// `url` is the URL as the page requested it, normally absolute:
    /// `pathname` globs see its path, `url` globs see all of it.
    #[must_use]
    pub fn matches(&self, method: &str, url: &str) -> bool {
        let method_ok = match self.method.as_deref() {
            None | Some("*") => true,
            Some(expected) => expected.eq_ignore_ascii_case(method),
        };
        let pathname_ok =
            self.pathname.as_deref().is_none_or(|pattern| glob_matches(pattern, &pathname_of(url)));
        let url_ok = self.url.as_deref().is_none_or(|pattern| glob_matches(pattern, url));
        method_ok && pathname_ok && url_ok
    }
}

/// Strip `base_url` from the front of `url`, leaving other URLs untouched.
#[must_use]
pub fn relative_url(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !base.is_empty() => url.strip_prefix(base).unwrap_or(url).to_string(),
        _ => url.to_string(),
    }
}

/// Inverse of [`relative_url`]: put `base_url` back in front of a path.
#[must_use]
pub fn absolute_url(base_url: Option<&str>, url: &str) -> String {
    match base_url {
        Some(base) if !base.is_empty() && url.starts_with('/') => {
            format!("{}{url}", base.trim_end_matches('/'))
        }
        _ => url.to_string(),
    }
}

/// The path component of an absolute or relative URL, without query or fragment.
fn pathname_of(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        return parsed.path().to_string();
    }
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].to_string()
}

/// Glob match with `{a,b}` alternation; `*` stays within one path segment.
fn glob_matches(pattern: &str, candidate: &str) -> bool {
    let options = MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    expand_braces(pattern).iter().any(|alternative| {
        Pattern::new(alternative).is_ok_and(|p| p.matches_with(candidate, options))
    })
}

/// Expand the first `{a,b,...}` group recursively; patterns without braces
/// expand to themselves.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };
    let (prefix, rest) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|choice| expand_braces(&format!("{prefix}{choice}{rest}")))
        .collect()
}
