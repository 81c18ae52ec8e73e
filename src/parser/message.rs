//! Assembles one [`MessageRecord`] from raw message bytes.
//!
//! Header fields come from a permissive header scan; MIME bodies and
//! attachment dispositions come from `mail-parser`, with a raw-text
//! fallback for messages it cannot parse at all.

use std::collections::BTreeSet;

use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::warn;

use crate::error::Result;
use crate::model::{EmailAddress, MessageRecord};
use crate::parser::eml::parse_identifier;
use crate::parser::headers::{decode_encoded_words, HeaderBlock};
use crate::parser::{html, links};

/// Build a [`MessageRecord`] from raw message bytes.
///
/// `stem` is the filename stem of the form `<integer>_<label>`;
/// `folder_label` is the containing folder's name (e.g. `trec_ham`),
/// whose prefix before the first underscore becomes the record source.
///
/// The only hard failure is a malformed identifier stem. Everything
/// else degrades per-field: missing or broken headers become empty
/// strings, an undecodable body becomes empty, unparseable URLs get the
/// sentinel domain.
pub fn build_record(raw: &[u8], stem: &str, folder_label: &str) -> Result<MessageRecord> {
    let (id, label) = parse_identifier(stem)?;
    let source = folder_label
        .split('_')
        .next()
        .unwrap_or(folder_label)
        .to_string();

    let headers = HeaderBlock::scan(raw);

    let subject = headers
        .first("subject")
        .map(decode_encoded_words)
        .unwrap_or_default();

    let sender = headers
        .first("from")
        .map(|raw_from| EmailAddress::parse(&decode_encoded_words(raw_from)))
        .unwrap_or_else(|| EmailAddress {
            name: String::new(),
            address: String::new(),
        });

    // All To and Cc occurrences count, not just the first of each.
    let mut recipients: Vec<EmailAddress> = Vec::new();
    for value in headers.all("to").chain(headers.all("cc")) {
        recipients.extend(EmailAddress::parse_list(&decode_encoded_words(value)));
    }

    let auth_failed = headers
        .all("authentication-results")
        .any(|value| value.to_lowercase().contains("fail"));

    let (plain_body, html_body, has_attachment) = extract_bodies(raw, stem, folder_label);

    let html_tags = html::tag_census(&html_body);

    let (raw_links, link_contexts) = links::extract_links(&plain_body, &html_body);
    let link_count = raw_links.len() as u32;
    let distinct: BTreeSet<&str> = raw_links.iter().map(String::as_str).collect();
    let duplicate_link_count = link_count - distinct.len() as u32;
    let link_domains: BTreeSet<String> =
        raw_links.iter().map(|u| links::link_domain(u)).collect();

    Ok(MessageRecord {
        id,
        label,
        source,
        subject,
        body: plain_body,
        html_tags,
        sender_address: sender.address,
        sender_name: sender.name,
        link_count,
        duplicate_link_count,
        link_domains,
        link_contexts,
        recipient_count: recipients.len() as u32,
        has_attachment,
        auth_failed,
    })
}

/// Extract the plain and HTML bodies plus the attachment flag.
///
/// The first `text/plain` leaf becomes the plain body and the first
/// `text/html` leaf the HTML body; later parts of the same type are
/// ignored. Messages `mail-parser` rejects outright fall back to the
/// raw text after the header section.
fn extract_bodies(raw: &[u8], stem: &str, folder_label: &str) -> (String, String, bool) {
    match MessageParser::default().parse(raw) {
        Some(message) => {
            let mut plain: Option<String> = None;
            let mut html: Option<String> = None;
            for part in &message.parts {
                match &part.body {
                    PartType::Text(text) if plain.is_none() => {
                        plain = Some(text.trim().to_string());
                    }
                    PartType::Html(body) if html.is_none() => {
                        html = Some(body.trim().to_string());
                    }
                    _ => {}
                }
            }

            let has_attachment = message.parts.iter().any(|part| {
                part.content_disposition()
                    .map(|d| d.ctype().eq_ignore_ascii_case("attachment"))
                    .unwrap_or(false)
            });

            (
                plain.unwrap_or_default(),
                html.unwrap_or_default(),
                has_attachment,
            )
        }
        None => {
            warn!(
                file = %format!("{folder_label}/{stem}.eml"),
                "Message rejected by MIME parser; using raw body fallback"
            );
            (raw_body_fallback(raw), String::new(), false)
        }
    }
}

/// Everything after the first blank line, decoded lossily.
fn raw_body_fallback(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if let Some(pos) = text.find("\n\n") {
        text[pos + 2..].trim().to_string()
    } else if let Some(pos) = text.find("\r\n\r\n") {
        text[pos + 4..].trim().to_string()
    } else {
        String::new()
    }
}
