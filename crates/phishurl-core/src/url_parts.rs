//! Lenient URL splitting.
//!
//! Every function here is total: a URL that cannot be parsed produces
//! empty components rather than an error, so one bad row never fails a
//! batch.
//!
//! Two views of the same input are kept. The structural fields (`scheme`,
//! `netloc`, `path`, `query`) are raw slices of the input, split by the
//! generic `scheme://netloc/path?query#fragment` layout with no
//! normalisation. `host` is the WHATWG host the `url` crate derives, used
//! for the public suffix split.

use std::net::IpAddr;
use std::sync::OnceLock;

use regex::Regex;
use tracing::Level;
use url::{ParseError, Url};

use crate::security_log::{EventDomain, PipelineEvent};

const IPV4_PATTERN: &str = r"[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}";

/// Components of a URL used by the lexical features and the text views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlParts {
    /// Lowercased scheme, empty when the input carried none.
    pub scheme: String,
    /// Raw authority between `//` and the path, userinfo and port included.
    /// Empty when the input has no `//`.
    pub netloc: String,
    /// Raw path, empty when the input has none.
    pub path: String,
    /// Raw query without the leading `?`.
    pub query: String,
    /// Normalised host (lowercase, punycode, no port). Schemeless input is
    /// read as `http://`; empty when no valid host can be derived.
    pub host: String,
    /// Set when splitting failed and the fields above are defaults.
    pub degraded: bool,
}

impl UrlParts {
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        let split = match RawSplit::split(raw) {
            Ok(split) => split,
            Err(reason) => return Self::degraded(raw, reason),
        };
        let host = match parse_host(raw) {
            Ok(host) => host,
            Err(err) => {
                let reason = err.to_string();
                PipelineEvent::new(Level::DEBUG, EventDomain::UrlParse, "host_unparsed", &reason)
                    .detail(raw)
                    .emit();
                String::new()
            }
        };
        Self {
            scheme: split.scheme,
            netloc: split.netloc,
            path: split.path,
            query: split.query,
            host,
            degraded: false,
        }
    }

    /// Safe defaults for a URL that failed to split.
    pub fn degraded(raw: &str, reason: &str) -> Self {
        PipelineEvent::new(Level::DEBUG, EventDomain::UrlParse, "parse_degraded", reason)
            .detail(raw)
            .emit();
        Self {
            degraded: true,
            ..Self::default()
        }
    }

    pub fn host_parts(&self) -> HostParts {
        HostParts::split(&self.host)
    }
}

struct RawSplit {
    scheme: String,
    netloc: String,
    path: String,
    query: String,
}

impl RawSplit {
    fn split(raw: &str) -> Result<Self, &'static str> {
        let cleaned: String = raw
            .trim_start_matches(|c: char| c <= ' ')
            .chars()
            .filter(|c| !matches!(c, '\t' | '\r' | '\n'))
            .collect();
        let mut rest = cleaned.as_str();
        let mut scheme = String::new();
        if let Some(i) = rest.find(':') {
            let head = &rest[..i];
            let starts_alpha = head.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
            if starts_alpha && head.chars().all(is_scheme_char) {
                scheme = head.to_ascii_lowercase();
                rest = &rest[i + 1..];
            }
        }
        let mut netloc = "";
        if let Some(after) = rest.strip_prefix("//") {
            let end = after.find(['/', '?', '#']).unwrap_or(after.len());
            netloc = &after[..end];
            rest = &after[end..];
            check_brackets(netloc)?;
        }
        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        Ok(Self {
            scheme,
            netloc: netloc.to_string(),
            path: path.to_string(),
            query: query.to_string(),
        })
    }
}

fn is_scheme_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')
}

/// Brackets must pair up and enclose an IP literal or an `v…` future form.
fn check_brackets(netloc: &str) -> Result<(), &'static str> {
    let open = netloc.contains('[');
    if open != netloc.contains(']') {
        return Err("unbalanced brackets in authority");
    }
    if open {
        let inner = netloc.split_once('[').map_or("", |(_, after)| after);
        let inner = inner.split_once(']').map_or(inner, |(host, _)| host);
        if !inner.starts_with('v') && inner.parse::<IpAddr>().is_err() {
            return Err("invalid bracketed host");
        }
    }
    Ok(())
}

fn parse_host(raw: &str) -> Result<String, ParseError> {
    let url = match Url::parse(raw) {
        // "example.com/login": still has a host worth measuring.
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("http://{raw}"))?,
        other => other?,
    };
    Ok(url.host_str().unwrap_or("").to_string())
}

/// A hostname split against the public suffix list.
///
/// For `login.secure.example.co.uk`: subdomain `login.secure`, domain
/// `example`, suffix `co.uk`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostParts {
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

impl HostParts {
    pub fn split(host: &str) -> Self {
        let host = host.trim_end_matches('.');
        if host.is_empty() {
            return Self::default();
        }
        if host.starts_with('[') || host.parse::<IpAddr>().is_ok() {
            return Self {
                domain: host.to_string(),
                ..Self::default()
            };
        }
        let suffix_len = icann_suffix_len(host);
        if suffix_len >= host.len() {
            return Self {
                suffix: host.to_string(),
                ..Self::default()
            };
        }
        let (rest, suffix) = if suffix_len == 0 {
            (host, "")
        } else {
            let cut = host.len() - suffix_len;
            match (host.get(..cut - 1), host.get(cut..)) {
                (Some(rest), Some(suffix)) => (rest, suffix),
                _ => (host, ""),
            }
        };
        let (subdomain, domain) = match rest.rfind('.') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => ("", rest),
        };
        Self {
            subdomain: subdomain.to_string(),
            domain: domain.to_string(),
            suffix: suffix.to_string(),
        }
    }

    /// `domain.suffix`, or the bare domain label when either half is missing.
    pub fn registered_domain(&self) -> String {
        if !self.domain.is_empty() && !self.suffix.is_empty() {
            format!("{}.{}", self.domain, self.suffix)
        } else {
            self.domain.clone()
        }
    }

    /// Number of dot-separated labels in the subdomain.
    pub fn subdomain_count(&self) -> usize {
        if self.subdomain.is_empty() {
            0
        } else {
            self.subdomain.matches('.').count() + 1
        }
    }
}

/// Byte length of the longest ICANN public suffix of `host`, 0 when none
/// is known. Private registrations (`github.io`, `blogspot.com`) are
/// skipped by retrying below their leftmost label.
fn icann_suffix_len(host: &str) -> usize {
    let mut candidate = host;
    loop {
        let Some(found) = psl::suffix(candidate.as_bytes()).filter(|s| s.is_known()) else {
            return 0;
        };
        let len = found.as_bytes().len();
        if found.typ() == Some(psl::Type::Icann) {
            return len;
        }
        let Some(private) = candidate.get(candidate.len().saturating_sub(len)..) else {
            return 0;
        };
        match private.split_once('.') {
            Some((_, below)) => candidate = below,
            None => return 0,
        }
    }
}

fn ipv4_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(IPV4_PATTERN).ok()).as_ref()
}

/// True when the hostname contains four dot-separated groups of 1-3 digits.
pub fn contains_ipv4(hostname: &str) -> bool {
    ipv4_pattern().is_some_and(|re| re.is_match(hostname))
}
