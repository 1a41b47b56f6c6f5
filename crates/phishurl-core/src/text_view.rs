//! String views of a URL fed to the TF-IDF vectorizers.

use percent_encoding::percent_decode_str;

use crate::url_parts::UrlParts;

/// Percent-decoded raw path and query joined by one space.
///
/// A URL that fails to split yields the empty string.
pub fn path_query_view(url: &str) -> String {
    path_query_from_parts(&UrlParts::parse(url))
}

pub fn path_query_from_parts(parts: &UrlParts) -> String {
    if parts.degraded {
        return String::new();
    }
    let path = percent_decode_str(&parts.path).decode_utf8_lossy();
    let query = percent_decode_str(&parts.query).decode_utf8_lossy();
    format!("{path} {query}")
}

/// Registered domain (`example.co.uk`), the bare host label when no public
/// suffix is known, or the empty string when the URL has no host.
pub fn domain_view(url: &str) -> String {
    domain_from_parts(&UrlParts::parse(url))
}

pub fn domain_from_parts(parts: &UrlParts) -> String {
    parts.host_parts().registered_domain()
}

pub fn path_query_views<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    urls.iter().map(|u| path_query_view(u.as_ref())).collect()
}

pub fn domain_views<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    urls.iter().map(|u| domain_view(u.as_ref())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_path_and_query() {
        assert_eq!(
            path_query_view("http://example.com/my%20account/login?next=%2Fhome&id=7"),
            "/my account/login next=/home&id=7"
        );
    }

    #[test]
    fn missing_query_keeps_separator() {
        assert_eq!(path_query_view("https://example.com/secure"), "/secure ");
    }

    #[test]
    fn unsplittable_url_is_empty() {
        assert_eq!(path_query_view("http://[oops/x"), "");
        assert_eq!(domain_view("http://[oops/x"), "");
        assert_eq!(domain_view(""), "");
    }

    #[test]
    fn invalid_host_keeps_path_view() {
        assert_eq!(path_query_view("http://exa mple.com/x?a=1"), "/x a=1");
        assert_eq!(domain_view("http://exa mple.com/x"), "");
    }

    #[test]
    fn empty_parts_give_lone_separator() {
        assert_eq!(path_query_view(""), " ");
        assert_eq!(path_query_view("http://example.com"), " ");
    }

    #[test]
    fn schemeless_path_keeps_host_text() {
        assert_eq!(path_query_view("example.com/login?x=1"), "example.com/login x=1");
        assert_eq!(domain_view("example.com/login?x=1"), "example.com");
    }

    #[test]
    fn invalid_utf8_escape_is_replaced() {
        let view = path_query_view("http://example.com/%FF");
        assert!(view.starts_with('/'));
        assert!(view.contains('\u{FFFD}'));
    }

    #[test]
    fn domain_strips_subdomains() {
        assert_eq!(domain_view("https://login.paypal.co.uk/x"), "paypal.co.uk");
        assert_eq!(domain_view("http://192.168.0.1/"), "192.168.0.1");
        assert_eq!(domain_view("paypal.com.verify-account.info/login"), "verify-account.info");
        assert_eq!(domain_view("https://paypal-login.github.io/x"), "github.io");
        assert_eq!(domain_view("http://secure-bank.blogspot.com/"), "blogspot.com");
    }

    #[test]
    fn batch_preserves_order_and_length() {
        let urls = ["http://a.com/x", "", "http://b.org/y?z=1"];
        let pq = path_query_views(&urls);
        let dv = domain_views(&urls);
        assert_eq!(pq, vec!["/x ", " ", "/y z=1"]);
        assert_eq!(dv, vec!["a.com", "", "b.org"]);
    }
}
