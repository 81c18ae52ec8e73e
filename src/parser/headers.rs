//! Permissive RFC 5322 header scanning: folding, repeated occurrences,
//! and RFC 2047 encoded-word decoding.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// All headers of one message, unfolded, with lowercase names.
///
/// Unlike a map, this keeps every occurrence of a repeated header
/// (`To`/`Cc` may appear more than once and all of them count).
#[derive(Debug, Default)]
pub struct HeaderBlock {
    entries: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Scan the header section of a raw message.
    ///
    /// Bytes are decoded as UTF-8 with a Windows-1252 fallback (which
    /// accepts every byte), so scanning itself never fails.
    pub fn scan(raw: &[u8]) -> Self {
        let header_bytes = header_section(raw);
        let text = decode_header_bytes(header_bytes);
        let mut entries: Vec<(String, String)> = Vec::new();

        for line in text.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                // Folded continuation line.
                if let Some(last) = entries.last_mut() {
                    last.1.push(' ');
                    last.1.push_str(line.trim());
                }
            } else if let Some(colon) = line.find(':') {
                let name = line[..colon].trim().to_lowercase();
                let value = line[colon + 1..].trim().to_string();
                entries.push((name, value));
            }
            // Lines without a colon that are not continuations are skipped.
        }

        Self { entries }
    }

    /// First value for a header name (already lowercase-matched).
    pub fn first(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for a header name, in message order.
    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Everything before the first blank line (or the whole input).
fn header_section(raw: &[u8]) -> &[u8] {
    let mut i = 0;
    while i + 1 < raw.len() {
        if raw[i] == b'\n' && raw[i + 1] == b'\n' {
            return &raw[..i];
        }
        if i + 3 < raw.len() && &raw[i..i + 4] == b"\r\n\r\n" {
            return &raw[..i];
        }
        i += 1;
    }
    raw
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252.
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF][..]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

fn encoded_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"=\?([^?\s]+)\?([BbQq])\?([^?\s]*)\?=").expect("static regex must parse")
    })
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?SG9sYQ==?= =?UTF-8?B?IG11bmRv?="` → `"Hola mundo"`.
/// Whitespace between two adjacent encoded words is dropped (RFC 2047
/// §6.2); anything that fails to decode is preserved verbatim.
pub fn decode_encoded_words(input: &str) -> String {
    let re = encoded_word_re();
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0;
    let mut prev_end: Option<usize> = None;

    for caps in re.captures_iter(input) {
        let whole = caps.get(0).expect("capture 0 always present");
        let gap = &input[cursor..whole.start()];
        // Only swallow the gap when it is pure whitespace between two words.
        let between_words = prev_end.is_some() && !gap.is_empty() && gap.trim().is_empty();
        if !between_words {
            out.push_str(gap);
        }

        let charset = &caps[1];
        let bytes = match &caps[2] {
            "B" | "b" => decode_base64(&caps[3]),
            _ => Some(decode_q(&caps[3])),
        };
        match bytes {
            Some(bytes) => out.push_str(&decode_charset(charset, &bytes)),
            None => out.push_str(whole.as_str()),
        }

        cursor = whole.end();
        prev_end = Some(whole.end());
    }

    out.push_str(&input[cursor..]);
    out
}

/// Minimal base64 decoder; returns `None` on a non-alphabet byte.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    fn val(c: u8) -> Option<u8> {
        match c {
            b'A'..=b'Z' => Some(c - b'A'),
            b'a'..=b'z' => Some(c - b'a' + 26),
            b'0'..=b'9' => Some(c - b'0' + 52),
            b'+' => Some(62),
            b'/' => Some(63),
            _ => None,
        }
    }

    let mut out = Vec::with_capacity(input.len() * 3 / 4);
    let mut acc: u32 = 0;
    let mut bits = 0;
    for &b in input.as_bytes() {
        if b == b'=' || b.is_ascii_whitespace() {
            continue;
        }
        acc = (acc << 6) | u32::from(val(b)?);
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((acc >> bits) as u8);
        }
    }
    Some(out)
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q(input: &str) -> Vec<u8> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(b'=');
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    out
}

/// Decode bytes using a named charset, falling back to lossy UTF-8.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
        let (decoded, _, _) = encoding.decode(bytes);
        decoded.into_owned()
    } else {
        debug!(charset, "Unknown charset in encoded word, using UTF-8 lossy");
        String::from_utf8_lossy(bytes).into_owned()
    }
}
