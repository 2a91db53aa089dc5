use super::blocks::{detect_video_id, extract_text, Block};

/// Section titles containing this keyword hold the episode highlights.
pub const HIGHLIGHTS_MARKER: &str = "精华";

const SEPARATOR: &str = "---";
const BULLET_PREFIX: &str = "• ";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub title: String,
    pub paragraphs: Vec<String>,
}

impl Section {
    fn titled(title: String) -> Self {
        Section {
            title,
            paragraphs: Vec::new(),
        }
    }
}

/// Result of folding one document's blocks.
#[derive(Debug, Clone, Default)]
pub struct DocumentContent {
    pub sections: Vec<Section>,
    pub full_text: String,
    pub video_id: Option<String>,
}

/// Fold state: the open section plus everything already closed.
#[derive(Debug, Default)]
struct Accumulator {
    current: Section,
    closed: Vec<Section>,
    full_text: String,
    video_id: Option<String>,
}

impl Accumulator {
    /// Close the open section (only if it has paragraphs) and open `next`.
    fn start(mut self, next: Section) -> Self {
        let done = std::mem::replace(&mut self.current, next);
        if !done.paragraphs.is_empty() {
            self.closed.push(done);
        }
        self
    }

    fn step(self, block: &Block) -> Self {
        let candidate = match block {
            Block::Heading { level: 1 | 2, elements } => {
                return self.start(Section::titled(extract_text(elements)));
            }
            Block::Heading { elements, .. } | Block::Text(elements) | Block::Ordered(elements) => {
                extract_text(elements)
            }
            Block::Bullet(elements) => format!("{}{}", BULLET_PREFIX, extract_text(elements)),
            Block::Page | Block::Unsupported(_) => return self,
        };
        self.paragraph(candidate)
    }

    fn paragraph(mut self, text: String) -> Self {
        let trimmed = text.trim();
        if trimmed == SEPARATOR {
            return self.start(Section::default());
        }
        if trimmed.is_empty() {
            return self;
        }

        self.full_text.push_str(&text);
        self.full_text.push('\n');
        if self.video_id.is_none() {
            self.video_id = detect_video_id(&text);
        }
        self.current.paragraphs.push(text);
        self
    }

    fn finish(self) -> DocumentContent {
        let done = self.start(Section::default());
        DocumentContent {
            sections: done.closed,
            full_text: done.full_text,
            video_id: done.video_id,
        }
    }
}

/// Fold an ordered block list into non-empty sections, full text and the
/// first video id mentioned.
pub fn build_sections(blocks: &[Block]) -> DocumentContent {
    blocks
        .iter()
        .fold(Accumulator::default(), Accumulator::step)
        .finish()
}

/// Pick (intro, highlights) from the section list.
///
/// Sequential first-match policy: the first untitled section is the intro and
/// any section whose title carries [`HIGHLIGHTS_MARKER`] is the highlights
/// (last one wins). A titled non-marker section becomes the intro only while
/// none is set. Afterwards the first section backs up an empty intro and,
/// when there is more than one section, the last backs up empty highlights.
pub fn classify(sections: &[Section]) -> (Vec<String>, Vec<String>) {
    let mut intro: Vec<String> = Vec::new();
    let mut highlights: Vec<String> = Vec::new();

    for sec in sections {
        let is_marker = sec.title.contains(HIGHLIGHTS_MARKER);
        let untitled = sec.title.is_empty();
        if is_marker || untitled {
            if intro.is_empty() && untitled {
                intro = sec.paragraphs.clone();
            } else if is_marker {
                highlights = sec.paragraphs.clone();
            }
        } else if intro.is_empty() {
            intro = sec.paragraphs.clone();
        }
    }

    if intro.is_empty() {
        if let Some(first) = sections.first() {
            intro = first.paragraphs.clone();
        }
    }
    if highlights.is_empty() && sections.len() > 1 {
        if let Some(last) = sections.last() {
            highlights = last.paragraphs.clone();
        }
    }

    (intro, highlights)
}

// ── Tests ──
