use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

static WATCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtube\.com/watch\?v=([a-zA-Z0-9_-]{11})").unwrap());
static SHORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtu\.be/([a-zA-Z0-9_-]{11})").unwrap());

/// One inline run inside a block. Only text runs carry content; mentions,
/// equations and the like deserialize with `text_run: None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Element {
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    elements: Vec<Element>,
}

/// Wire shape of a docx block: a numeric type plus a payload keyed by type name.
#[derive(Debug, Deserialize)]
struct RawBlock {
    #[serde(default)]
    block_type: u32,
    text: Option<Payload>,
    heading1: Option<Payload>,
    heading2: Option<Payload>,
    heading3: Option<Payload>,
    bullet: Option<Payload>,
    ordered: Option<Payload>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawBlock")]
pub enum Block {
    Page,
    Text(Vec<Element>),
    Heading { level: u8, elements: Vec<Element> },
    Bullet(Vec<Element>),
    Ordered(Vec<Element>),
    Unsupported(u32),
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let els = |p: Option<Payload>| p.unwrap_or_default().elements;
        match raw.block_type {
            1 => Block::Page,
            2 => Block::Text(els(raw.text)),
            3 => Block::Heading { level: 1, elements: els(raw.heading1) },
            4 => Block::Heading { level: 2, elements: els(raw.heading2) },
            5 => Block::Heading { level: 3, elements: els(raw.heading3) },
            12 => Block::Bullet(els(raw.bullet)),
            13 => Block::Ordered(els(raw.ordered)),
            other => Block::Unsupported(other),
        }
    }
}

/// Concatenate the text of every run, no separator.
pub fn extract_text(elements: &[Element]) -> String {
    elements
        .iter()
        .filter_map(|el| el.text_run.as_ref())
        .map(|tr| tr.content.as_str())
        .collect()
}

/// First YouTube id (11 chars) found in `text`, long-form URL before short link.
pub fn detect_video_id(text: &str) -> Option<String> {
    [&*WATCH_RE, &*SHORT_RE]
        .iter()
        .find_map(|re| re.captures(text))
        .map(|caps| caps[1].to_string())
}
