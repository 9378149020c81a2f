// Signal extraction: feed documents → raw items → normalized Articles.
//
// `parse_document` is the only fallible step (a document that cannot be read
// at all). `extract` never fails: missing fields become empty strings and a
// missing or unreadable date falls back to the fetch time.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use pulse_common::{Article, SignalError, SignalResult, SourceKind};
use regex::Regex;
use serde_json::{Map, Value};

pub const MAX_KEYWORDS: usize = 10;
const MIN_KEYWORD_CHARS: usize = 3;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>").expect("valid regex")
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([A-Za-z][\w]*)").expect("valid regex"));

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "have", "his", "how", "its", "may", "now", "see", "two", "who",
    "did", "get", "got", "him", "she", "too", "use", "way", "with", "this", "that", "from",
    "they", "will", "would", "there", "their", "what", "about", "which", "when", "were", "been",
    "into", "than", "then", "them", "these", "those", "some", "such", "only", "over", "also",
    "just", "more", "most", "other", "after", "before", "where", "while", "your", "yours",
    "could", "should", "said", "says", "like", "very", "here", "each", "much", "many", "does",
    "doing", "being", "because", "through", "between", "under", "again", "why", "off", "own",
    "same", "both", "few", "nor", "don", "didn", "doesn", "isn", "wasn", "aren", "won", "via",
    "per", "new", "news", "read", "post", "posted", "appeared", "first", "continue", "reading",
    "comments", "article", "http", "https", "www", "com", "html", "amp", "nbsp",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

/// One item as read off the wire, before normalization. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub category: Option<String>,
}

impl RawItem {
    fn is_blank(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |v| v.trim().is_empty());
        blank(&self.title) && blank(&self.description) && blank(&self.link)
    }
}

/// Normalize one raw item into an Article. Pure; never fails.
pub fn extract(raw: &RawItem, source_name: &str, fetched_at: DateTime<Utc>) -> Article {
    let title = strip_markup(raw.title.as_deref().unwrap_or_default());
    let description = strip_markup(raw.description.as_deref().unwrap_or_default());
    let text = format!("{title} {description}");

    Article {
        keywords: extract_keywords(&text),
        hashtags: extract_hashtags(&text),
        title,
        description,
        link: raw.link.as_deref().unwrap_or_default().trim().to_string(),
        published_at: raw.published.unwrap_or(fetched_at),
        category: raw
            .category
            .as_deref()
            .map(strip_markup)
            .filter(|c| !c.is_empty()),
        source: source_name.to_string(),
    }
}

/// Lowercased content words: split on non-word characters, drop short tokens and
/// stop words, keep first-seen order, cap at `MAX_KEYWORDS`.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut seen = HashSet::new();
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.chars().count() >= MIN_KEYWORD_CHARS)
        .filter(|token| !STOP_WORD_SET.contains(token))
        .filter(|token| seen.insert(*token))
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

/// Explicit `#tags`, lowercased and deduplicated, without the `#`.
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    HASHTAG_RE
        .captures_iter(text)
        .filter_map(|c| {
            let tag = c[1].to_lowercase();
            seen.insert(tag.clone()).then_some(tag)
        })
        .collect()
}

/// Remove HTML tags, decode common entities, collapse whitespace.
pub fn strip_markup(input: &str) -> String {
    let without_blocks = SCRIPT_STYLE_RE.replace_all(input, " ");
    let without_tags = TAG_RE.replace_all(&without_blocks, " ");
    let decoded = decode_entities(&without_tags);
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(input: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(input, |caps: &regex::Captures| {
        let code = &caps[1];
        let value = match code.strip_prefix('x').or_else(|| code.strip_prefix('X')) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse::<u32>().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(|c| c.to_string())
            .unwrap_or_default()
    });
    numeric
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// --- Document parsing ---

/// Parse a whole feed document into raw items.
/// RSS/Atom via feed-rs; JSON must be a flat array of records.
pub fn parse_document(
    kind: SourceKind,
    body: &[u8],
    source_name: &str,
) -> SignalResult<Vec<RawItem>> {
    let items = match kind {
        SourceKind::Rss => parse_feed(body, source_name)?,
        SourceKind::Json => parse_json_array(body, source_name)?,
    };
    Ok(items.into_iter().filter(|item| !item.is_blank()).collect())
}

fn parse_feed(body: &[u8], source_name: &str) -> SignalResult<Vec<RawItem>> {
    let feed = feed_rs::parser::parse(body).map_err(|e| SignalError::Parse {
        name: source_name.to_string(),
        message: e.to_string(),
    })?;

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()));

            let description = entry
                .summary
                .map(|s| s.content)
                .filter(|s| !s.trim().is_empty())
                .or_else(|| entry.content.and_then(|c| c.body));

            let category = entry
                .categories
                .first()
                .map(|c| c.label.clone().unwrap_or_else(|| c.term.clone()));

            RawItem {
                title: entry.title.map(|t| t.content),
                description,
                link,
                published: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc)),
                category,
            }
        })
        .collect();

    Ok(items)
}

fn parse_json_array(body: &[u8], source_name: &str) -> SignalResult<Vec<RawItem>> {
    let value: Value = serde_json::from_slice(body).map_err(|e| SignalError::Parse {
        name: source_name.to_string(),
        message: e.to_string(),
    })?;

    let Value::Array(records) = value else {
        return Err(SignalError::Parse {
            name: source_name.to_string(),
            message: "expected a top-level JSON array".to_string(),
        });
    };

    Ok(records
        .iter()
        .filter_map(Value::as_object)
        .map(raw_item_from_record)
        .collect())
}

fn raw_item_from_record(record: &Map<String, Value>) -> RawItem {
    RawItem {
        title: string_field(record, &["title", "name", "headline"]),
        description: string_field(
            record,
            &["description", "summary", "content", "selftext", "body"],
        ),
        link: string_field(record, &["link", "url", "permalink", "id"]),
        published: date_field(
            record,
            &[
                "publishedAt",
                "published_at",
                "pubDate",
                "published",
                "date",
                "created_at",
                "created_utc",
            ],
        ),
        category: string_field(record, &["category", "topic", "subreddit", "tags"]),
    }
}

/// First non-empty string among `keys`. Arrays yield their first string element;
/// any other shape counts as absent.
fn string_field(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(values) => values
            .iter()
            .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
            .map(str::to_string),
        _ => None,
    })
}

fn date_field(record: &Map<String, Value>, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) => parse_date(s),
        Value::Number(n) => n.as_f64().and_then(from_unix),
        _ => None,
    })
}

/// RFC 3339, RFC 2822, or a UNIX timestamp in a string.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(from_unix))
}

/// Seconds since the epoch; values that only make sense as milliseconds are scaled.
fn from_unix(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let secs = if value > 1e12 { value / 1000.0 } else { value };
    Utc.timestamp_opt(secs as i64, 0).single()
}
