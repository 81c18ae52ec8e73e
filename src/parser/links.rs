//! Link extraction from HTML anchors and plain-text bodies.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;
use url::Url;

use crate::parser::html;

/// Sentinel domain recorded for URLs that cannot be parsed at all.
pub const MALFORMED_DOMAIN: &str = "MALFORMED";

/// Characters stripped from the end of bare URLs found in plain text
/// (closing punctuation that regularly trails a pasted link).
const TRAILING_PUNCTUATION: &[char] = &[']', '>', ')', '}', ',', '.', ';'];

/// Number of characters of surrounding text kept on each side of a
/// plain-text link as its context.
const CONTEXT_WINDOW: usize = 30;

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?://[^\s"<>\]]+"#).expect("static regex must parse")
    })
}

/// Find all links in HTML anchors and bare plain-text URLs.
///
/// Returns the raw URL strings and, aligned by index, the context of
/// each: the serialized anchor markup for HTML links, a ±30-character
/// text window for plain-text links.
pub fn extract_links(plain_body: &str, html_body: &str) -> (Vec<String>, Vec<String>) {
    let (mut urls, mut contexts) = html::anchor_links(html_body);

    for m in url_re().find_iter(plain_body) {
        urls.push(m.as_str().trim_end_matches(TRAILING_PUNCTUATION).to_string());
        contexts.push(text_window(plain_body, m.start(), m.end()));
    }

    (urls, contexts)
}

/// A ±[`CONTEXT_WINDOW`]-character window around a match, with an
/// ellipsis standing in for the URL itself.
fn text_window(text: &str, start: usize, end: usize) -> String {
    let prefix: String = {
        let mut chars: Vec<char> = text[..start].chars().rev().take(CONTEXT_WINDOW).collect();
        chars.reverse();
        chars.into_iter().collect()
    };
    let suffix: String = text[end..].chars().take(CONTEXT_WINDOW).collect();
    format!("{prefix}…{suffix}")
}

/// The network location of a URL.
///
/// Relative references have no network location and yield an empty
/// string; anything that fails to parse outright yields the
/// [`MALFORMED_DOMAIN`] sentinel instead of an error.
pub fn link_domain(raw_url: &str) -> String {
    match Url::parse(raw_url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or("");
            match parsed.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            }
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => String::new(),
        Err(error) => {
            debug!(url = raw_url, %error, "Unparseable URL");
            MALFORMED_DOMAIN.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_plain_text_urls() {
        let (urls, contexts) = extract_links("Visit http://example.com/a today", "");
        assert_eq!(urls, vec!["http://example.com/a"]);
        assert_eq!(contexts, vec!["Visit … today"]);
    }

    #[test]
    fn test_trailing_punctuation_stripped() {
        let (urls, _) = extract_links("see (https://example.com/x).", "");
        assert_eq!(urls, vec!["https://example.com/x"]);
    }

    #[test]
    fn test_html_and_plain_combined() {
        let (urls, contexts) = extract_links(
            "plain http://plain.example.com here",
            r#"<a href="http://html.example.com">go</a>"#,
        );
        // HTML anchors come first, then plain-text matches.
        assert_eq!(
            urls,
            vec!["http://html.example.com", "http://plain.example.com"]
        );
        assert_eq!(contexts.len(), 2);
        assert!(contexts[0].starts_with("<a"));
        assert!(contexts[1].contains('…'));
    }

    #[test]
    fn test_context_window_clips_at_boundaries() {
        let (_, contexts) = extract_links("http://a.example.com", "");
        assert_eq!(contexts, vec!["…"]);
    }

    #[test]
    fn test_link_domain_host_only() {
        assert_eq!(link_domain("http://example.com/a/b"), "example.com");
    }

    #[test]
    fn test_link_domain_with_port() {
        assert_eq!(link_domain("http://example.com:8080/x"), "example.com:8080");
    }

    #[test]
    fn test_link_domain_relative() {
        assert_eq!(link_domain("unsubscribe.html"), "");
    }

    #[test]
    fn test_link_domain_malformed() {
        assert_eq!(link_domain("http://[::bad"), MALFORMED_DOMAIN);
    }

    #[test]
    fn test_case_insensitive_scheme() {
        let (urls, _) = extract_links("HTTPS://Example.COM/path", "");
        assert_eq!(urls, vec!["HTTPS://Example.COM/path"]);
    }
}
