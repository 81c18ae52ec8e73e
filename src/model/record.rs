//! The structured message record and its nested HTML census types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One distinct value observed for a given HTML attribute within one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueEntry {
    /// The attribute value (one list element for multi-valued attributes).
    pub value: String,
    /// Occurrence count within the message.
    pub count: u32,
}

/// Aggregate of one attribute name across all instances of one tag name.
///
/// `count` equals the sum of all value counts; `values` holds no
/// duplicate `value` and preserves first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntry {
    /// Attribute name (e.g. `href`).
    pub attribute: String,
    /// Sum of all value counts for this attribute.
    pub count: u32,
    /// Distinct values with their counts, in first-seen order.
    pub values: Vec<ValueEntry>,
}

/// Aggregate of one HTML tag name within one message.
///
/// `attributes` holds no duplicate attribute name and preserves
/// first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    /// Tag name (e.g. `a`).
    pub tag: String,
    /// Number of instances of this tag in the message.
    pub count: u32,
    /// Per-attribute aggregates, in first-seen order.
    pub attributes: Vec<AttributeEntry>,
}

/// Ground-truth label of a message, derived from its filename suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Label {
    /// A legitimate, non-spam message.
    Ham,
    /// An unsolicited/abusive message.
    Spam,
    /// A message with unknown ground truth, to be predicted on.
    Inbox,
    /// Any other folder suffix, carried through verbatim.
    Other(String),
}

impl Label {
    /// Parse a label from a filename suffix (e.g. the `spam` in `12_spam`).
    pub fn parse(s: &str) -> Self {
        match s {
            "ham" => Self::Ham,
            "spam" => Self::Spam,
            "inbox" => Self::Inbox,
            other => Self::Other(other.to_string()),
        }
    }

    /// The textual form used in filenames and the table file.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ham => "ham",
            Self::Spam => "spam",
            Self::Inbox => "inbox",
            Self::Other(s) => s,
        }
    }

    /// Whether this message carries ground truth usable for training.
    pub fn is_labelled(&self) -> bool {
        matches!(self, Self::Ham | Self::Spam)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.as_str().to_string()
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured representation of one parsed email message.
///
/// One record per source `.eml` file. Records are immutable after
/// construction: relabelling or any other change produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Numeric identifier from the filename stem (`12` in `12_spam.eml`).
    pub id: u64,
    /// Label from the filename suffix (`spam` in `12_spam.eml`).
    pub label: Label,
    /// Dataset name, from the folder label (`trec` in `trec_ham`).
    pub source: String,
    /// Decoded subject line.
    pub subject: String,
    /// Plain-text body (first `text/plain` part).
    pub body: String,
    /// Census of every tag, attribute and attribute value in the HTML body.
    pub html_tags: Vec<TagEntry>,
    /// Bare sender address from the `From` header (may be empty).
    pub sender_address: String,
    /// Sender display name from the `From` header (may be empty).
    pub sender_name: String,
    /// Total number of links found in HTML anchors and the plain body.
    pub link_count: u32,
    /// `link_count` minus the number of distinct raw link strings.
    pub duplicate_link_count: u32,
    /// Distinct network locations of all links; `MALFORMED` for
    /// unparseable URLs.
    pub link_domains: BTreeSet<String>,
    /// Surrounding markup or text window for each link, in link order.
    pub link_contexts: Vec<String>,
    /// Number of addresses across all `To` and `Cc` header occurrences.
    pub recipient_count: u32,
    /// Whether any MIME part declares an attachment content-disposition.
    pub has_attachment: bool,
    /// Whether any `Authentication-Results` header reports a failure.
    pub auth_failed: bool,
}

impl MessageRecord {
    /// Return a copy of this record carrying a different label.
    ///
    /// Records are never mutated in place; relabelling from a judgment
    /// store goes through here.
    pub fn with_label(&self, label: Label) -> Self {
        Self {
            label,
            ..self.clone()
        }
    }
}
