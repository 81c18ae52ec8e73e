//! HTML body analysis using the `scraper` crate (servo's html5ever).
//!
//! html5ever accepts arbitrarily malformed markup, so census and link
//! extraction never fail; an empty or broken body simply yields fewer
//! entries.

use scraper::{Html, Selector};

use crate::model::{AttributeEntry, TagEntry, ValueEntry};

/// Attributes whose values are whitespace-separated lists; each list
/// element is counted separately in the census.
const LIST_VALUED_ATTRIBUTES: &[&str] = &["class", "rel", "rev", "headers", "accept-charset"];

fn all_elements() -> Selector {
    Selector::parse("*").expect("static selector must parse")
}

fn anchors_with_href() -> Selector {
    Selector::parse("a[href]").expect("static selector must parse")
}

/// Census of every tag, attribute and attribute value in an HTML body.
///
/// Tags, attributes and values are kept in first-seen order. An
/// [`AttributeEntry`]'s count is the sum of its value counts, so a
/// list-valued attribute with two elements contributes two.
pub fn tag_census(html_body: &str) -> Vec<TagEntry> {
    if html_body.is_empty() {
        return Vec::new();
    }

    let document = Html::parse_fragment(html_body);
    let root_id = document.root_element().id();
    let selector = all_elements();

    let mut tags: Vec<TagEntry> = Vec::new();
    for element in document.select(&selector) {
        // Skip the synthetic fragment root, not part of the message.
        if element.id() == root_id {
            continue;
        }
        let name = element.value().name();
        let tag = match tags.iter_mut().find(|t| t.tag == name) {
            Some(tag) => tag,
            None => {
                tags.push(TagEntry {
                    tag: name.to_string(),
                    count: 0,
                    attributes: Vec::new(),
                });
                tags.last_mut().expect("just pushed")
            }
        };
        tag.count += 1;

        for (attr_name, attr_value) in element.value().attrs() {
            let attribute = match tag.attributes.iter_mut().find(|a| a.attribute == attr_name) {
                Some(attribute) => attribute,
                None => {
                    tag.attributes.push(AttributeEntry {
                        attribute: attr_name.to_string(),
                        count: 0,
                        values: Vec::new(),
                    });
                    tag.attributes.last_mut().expect("just pushed")
                }
            };
            for value in split_attribute_values(attr_name, attr_value) {
                attribute.count += 1;
                match attribute.values.iter_mut().find(|v| v.value == value) {
                    Some(entry) => entry.count += 1,
                    None => attribute.values.push(ValueEntry {
                        value: value.to_string(),
                        count: 1,
                    }),
                }
            }
        }
    }

    tags
}

/// One element per list entry for list-valued attributes, the raw value
/// otherwise. An empty singleton value still counts once.
fn split_attribute_values<'a>(name: &str, value: &'a str) -> Vec<&'a str> {
    if LIST_VALUED_ATTRIBUTES.contains(&name) {
        value.split_whitespace().collect()
    } else {
        vec![value]
    }
}

/// Every `<a href=…>` in the HTML body: the raw href plus the serialized
/// anchor markup as its context, in document order.
pub fn anchor_links(html_body: &str) -> (Vec<String>, Vec<String>) {
    if html_body.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let document = Html::parse_fragment(html_body);
    let selector = anchors_with_href();

    let mut urls = Vec::new();
    let mut contexts = Vec::new();
    for anchor in document.select(&selector) {
        if let Some(href) = anchor.value().attr("href") {
            urls.push(href.to_string());
            contexts.push(anchor.html());
        }
    }
    (urls, contexts)
}

/// Reduce HTML to its visible text, for snippets in summaries and the
/// labelling session. Scripts and styles are removed, remaining tags
/// stripped, common entities decoded, whitespace collapsed.
pub fn strip_tags(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    let mut out = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }

    for (entity, plain) in [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&#160;", " "),
    ] {
        out = out.replace(entity, plain);
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove an entire tag block (e.g. `<script>…</script>`), case-insensitively.
fn remove_tag_block(html: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;

    while let Some(start) = find_ascii_ci(remaining, &open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        match find_ascii_ci(after, &close) {
            Some(end) => remaining = &after[end + close.len()..],
            None => {
                remaining = "";
                break;
            }
        }
    }
    result.push_str(remaining);
    result
}

/// Byte offset of an ASCII needle, ignoring ASCII case. The needle
/// starts with `<`, so a hit is always on a char boundary.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}
