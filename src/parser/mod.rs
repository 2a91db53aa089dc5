pub mod blocks;
pub mod sections;
pub mod title;

use blocks::Block;
use sections::Section;

pub struct ParsedContent {
    pub sections: Vec<Section>,
    pub intro: Vec<String>,
    pub highlights: Vec<String>,
    pub full_text: String,
    pub video_id: Option<String>,
}

/// Two-step pipeline: blocks → sections → (intro, highlights).
pub fn process_blocks(blocks: &[Block]) -> ParsedContent {
    let doc = sections::build_sections(blocks);
    let (intro, highlights) = sections::classify(&doc.sections);
    ParsedContent {
        sections: doc.sections,
        intro,
        highlights,
        full_text: doc.full_text,
        video_id: doc.video_id,
    }
}
