use std::thread;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::feishu::{DocumentSource, WikiNode};
use crate::parser::{self, title::parse_title, ParsedContent};
use crate::settings::Settings;
use crate::youtube::{self, VideoMetadata, VideoSource};

pub const MAX_INTRO: usize = 15;
pub const MAX_HIGHLIGHTS: usize = 20;
pub const MAX_FULL_TEXT_CHARS: usize = 5000;

/// One episode as written to the feed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub id: String,
    pub title: String,
    pub raw_title: String,
    pub date_code: String,
    pub youtube_id: Option<String>,
    pub feishu_url: String,
    pub intro: Vec<String>,
    pub highlights: Vec<String>,
    pub full_text: String,
    #[serde(flatten)]
    pub video: VideoMetadata,
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn clamp(mut v: Vec<String>, max: usize) -> Vec<String> {
    v.truncate(max);
    v
}

/// Build the record for one document from its parsed blocks and video metadata.
pub fn assemble(
    node: &WikiNode,
    parsed: ParsedContent,
    video: VideoMetadata,
    feishu_url: String,
) -> NormalizedRecord {
    let (date_code, title) = parse_title(&node.title);

    NormalizedRecord {
        id: node.node_token.clone(),
        title,
        raw_title: node.title.clone(),
        date_code,
        youtube_id: parsed.video_id,
        feishu_url,
        intro: clamp(parsed.intro, MAX_INTRO),
        highlights: clamp(parsed.highlights, MAX_HIGHLIGHTS),
        full_text: truncate_chars(&parsed.full_text, MAX_FULL_TEXT_CHARS),
        video,
    }
}

/// Newest date code first. Stable, so equal codes keep listing order and
/// empty codes end up last.
pub fn sort_by_date_code(records: &mut [NormalizedRecord]) {
    records.sort_by(|a, b| b.date_code.cmp(&a.date_code));
}

/// Fetch, normalize and enrich every document, one at a time, then sort.
pub fn build_feed(
    docs: &dyn DocumentSource,
    videos: &dyn VideoSource,
    settings: &Settings,
    limit: Option<usize>,
) -> Result<Vec<NormalizedRecord>> {
    build_feed_with(docs, videos, settings, limit, thread::sleep)
}

/// `build_feed` with the inter-request pause supplied by the caller. The
/// pause runs once after each document that had a video to enrich.
fn build_feed_with(
    docs: &dyn DocumentSource,
    videos: &dyn VideoSource,
    settings: &Settings,
    limit: Option<usize>,
    mut pause: impl FnMut(Duration),
) -> Result<Vec<NormalizedRecord>> {
    info!("Fetching podcast list...");
    let mut nodes = docs.list_documents()?;
    info!("Found {} podcasts", nodes.len());
    if let Some(n) = limit {
        nodes.truncate(n);
    }

    let pb = ProgressBar::new(nodes.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let total = nodes.len();
    let mut records = Vec::with_capacity(total);
    for (i, node) in nodes.iter().enumerate() {
        info!("[{}/{}] {}", i + 1, total, node.title);
        pb.set_message(node.title.clone());

        let blocks = docs.document_blocks(&node.obj_token);
        let parsed = parser::process_blocks(&blocks);
        let video = youtube::enrich(videos, parsed.video_id.as_deref());
        if parsed.video_id.is_some() {
            pause(settings.request_delay());
        }

        records.push(assemble(node, parsed, video, settings.wiki_url(&node.node_token)));
        pb.inc(1);
    }
    pb.finish_and_clear();

    sort_by_date_code(&mut records);
    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;
    use crate::parser::blocks::tests::run;
    use crate::parser::blocks::Block;
    use crate::parser::process_blocks;
    use crate::youtube::tests::{sample_oembed, FakeVideos, SAMPLE_PAGE};

    struct FakeDocs {
        nodes: Vec<WikiNode>,
        blocks: HashMap<String, Vec<Block>>,
    }

    impl DocumentSource for FakeDocs {
        fn list_documents(&self) -> Result<Vec<WikiNode>> {
            Ok(self.nodes.clone())
        }

        fn document_blocks(&self, obj_token: &str) -> Vec<Block> {
            self.blocks.get(obj_token).cloned().unwrap_or_default()
        }
    }

    fn settings() -> Settings {
        Settings {
            app_id: "cli_test".into(),
            app_secret: "secret".into(),
            space_id: "space".into(),
            parent_node: "parent".into(),
            base_url: "http://localhost".into(),
            wiki_url_base: "https://my.feishu.cn/wiki".into(),
            output: PathBuf::from("unused.json"),
            request_delay_ms: 0,
        }
    }

    fn node(title: &str, token: &str) -> WikiNode {
        WikiNode {
            title: title.into(),
            obj_token: format!("obj_{}", token),
            node_token: token.into(),
        }
    }

    fn text(s: &str) -> Block {
        Block::Text(vec![run(s)])
    }

    fn record_with_code(code: &str, id: &str) -> NormalizedRecord {
        NormalizedRecord {
            id: id.into(),
            title: String::new(),
            raw_title: String::new(),
            date_code: code.into(),
            youtube_id: None,
            feishu_url: String::new(),
            intro: Vec::new(),
            highlights: Vec::new(),
            full_text: String::new(),
            video: VideoMetadata::default(),
        }
    }

    #[test]
    fn sort_descending_empty_last() {
        let mut records: Vec<_> = ["2023", "2025", "", "2024"]
            .iter()
            .enumerate()
            .map(|(i, c)| record_with_code(c, &i.to_string()))
            .collect();
        sort_by_date_code(&mut records);
        let codes: Vec<&str> = records.iter().map(|r| r.date_code.as_str()).collect();
        assert_eq!(codes, vec!["2025", "2024", "2023", ""]);
    }

    #[test]
    fn sort_is_stable() {
        let mut records = vec![
            record_with_code("2024", "a"),
            record_with_code("", "x"),
            record_with_code("2024", "b"),
            record_with_code("", "y"),
            record_with_code("2024", "c"),
        ];
        sort_by_date_code(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "x", "y"]);
    }

    #[test]
    fn highlights_clamp_to_first_twenty() {
        let mut blocks = vec![text("intro"), Block::Heading { level: 2, elements: vec![run("精华")] }];
        blocks.extend((0..30).map(|i| text(&format!("h{}", i))));
        let rec = assemble(&node("0101 Ep", "n1"), process_blocks(&blocks), VideoMetadata::default(), String::new());
        assert_eq!(rec.highlights.len(), 20);
        assert_eq!(rec.highlights.first().map(String::as_str), Some("h0"));
        assert_eq!(rec.highlights.last().map(String::as_str), Some("h19"));
    }

    #[test]
    fn intro_clamps_to_fifteen() {
        let blocks: Vec<_> = (0..40).map(|i| text(&format!("p{}", i))).collect();
        let rec = assemble(&node("Ep", "n1"), process_blocks(&blocks), VideoMetadata::default(), String::new());
        assert_eq!(rec.intro.len(), 15);
        assert!(rec.highlights.is_empty());
    }

    #[test]
    fn full_text_clamps_by_characters() {
        let long = "精".repeat(6000);
        let rec = assemble(&node("Ep", "n1"), process_blocks(&[text(&long)]), VideoMetadata::default(), String::new());
        assert_eq!(rec.full_text.chars().count(), MAX_FULL_TEXT_CHARS);
        assert!(rec.full_text.chars().all(|c| c == '精'));
    }

    #[test]
    fn truncate_short_string_untouched() {
        assert_eq!(truncate_chars("abc", 5), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abcd", 3), "abc");
    }

    #[test]
    fn builds_sorted_enriched_feed() {
        let fixture = std::fs::read_to_string("tests/fixtures/episode_blocks.json").unwrap();
        let episode: Vec<Block> = serde_json::from_str(&fixture).unwrap();

        let docs = FakeDocs {
            nodes: vec![
                node("Untitled Episode", "wikA"),
                node("2024：Building a Better CLI", "wikB"),
                node("2025 New Year Special", "wikC"),
            ],
            blocks: HashMap::from([
                ("obj_wikA".to_string(), vec![text("no video here")]),
                ("obj_wikB".to_string(), episode),
            ]),
        };
        let videos = FakeVideos {
            oembed: Some(sample_oembed()),
            page: Some(SAMPLE_PAGE.into()),
            ..Default::default()
        };

        let feed = build_feed(&docs, &videos, &settings(), None).unwrap();
        let ids: Vec<&str> = feed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["wikC", "wikB", "wikA"]);
        // only the episode with a video triggers lookups
        assert_eq!(videos.calls.get(), 2);

        let ep = &feed[1];
        assert_eq!(ep.date_code, "2024");
        assert_eq!(ep.title, "Building a Better CLI");
        assert_eq!(ep.raw_title, "2024：Building a Better CLI");
        assert_eq!(ep.youtube_id.as_deref(), Some("dQw4w9WgXcQ"));
        assert_eq!(ep.feishu_url, "https://my.feishu.cn/wiki/wikB");
        assert_eq!(ep.video.view_count, Some(123456));
        assert_eq!(ep.video.channel_name.as_deref(), Some("Dev Talk"));

        let empty = &feed[0];
        assert!(empty.intro.is_empty() && empty.full_text.is_empty());
        assert_eq!(empty.video, VideoMetadata::default());

        let untitled = &feed[2];
        assert_eq!(untitled.date_code, "");
        assert_eq!(untitled.intro, vec!["no video here"]);
        assert!(untitled.youtube_id.is_none());
    }

    #[test]
    fn pauses_only_after_video_lookups() {
        let docs = FakeDocs {
            nodes: vec![node("0001 a", "a"), node("0002 b", "b"), node("0003 c", "c")],
            blocks: HashMap::from([
                ("obj_a".to_string(), vec![text("https://youtu.be/dQw4w9WgXcQ")]),
                ("obj_b".to_string(), vec![text("plain intro")]),
                (
                    "obj_c".to_string(),
                    vec![text("https://www.youtube.com/watch?v=abcdefghijk")],
                ),
            ]),
        };
        let videos = FakeVideos::default();
        let mut s = settings();
        s.request_delay_ms = 500;

        let mut pauses = Vec::new();
        let feed = build_feed_with(&docs, &videos, &s, None, |d| pauses.push(d)).unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(pauses, vec![Duration::from_millis(500); 2]);
        // oEmbed + watch page for each of the two videos
        assert_eq!(videos.calls.get(), 4);
    }

    #[test]
    fn no_pause_without_videos() {
        let docs = FakeDocs {
            nodes: vec![node("0001 a", "a"), node("0002 b", "b")],
            blocks: HashMap::from([("obj_a".to_string(), vec![text("nothing to watch")])]),
        };
        let mut pauses = 0;
        build_feed_with(&docs, &FakeVideos::default(), &settings(), None, |_| pauses += 1).unwrap();
        assert_eq!(pauses, 0);
    }

    #[test]
    fn limit_caps_documents() {
        let docs = FakeDocs {
            nodes: vec![node("0001 a", "a"), node("0002 b", "b"), node("0003 c", "c")],
            blocks: HashMap::new(),
        };
        let feed = build_feed(&docs, &FakeVideos::default(), &settings(), Some(2)).unwrap();
        let ids: Vec<&str> = feed.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn json_shape() {
        let rec = record_with_code("2024", "wikB");
        let json = serde_json::to_value(&rec).unwrap();
        for key in [
            "id", "title", "rawTitle", "dateCode", "youtubeId", "feishuUrl", "intro",
            "highlights", "fullText", "ytTitle", "ytChannel", "ytChannelUrl", "ytViews",
            "ytPublished",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert!(json["youtubeId"].is_null());
    }
}
