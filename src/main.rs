mod catalog;
mod error;
mod feishu;
mod parser;
mod record;
mod settings;
mod youtube;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};

use crate::feishu::FeishuClient;
use crate::record::NormalizedRecord;
use crate::settings::Settings;
use crate::youtube::YoutubeClient;

#[derive(Parser)]
#[command(name = "podcast_feed", about = "Podcast feed builder from a Feishu wiki")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every episode document, enrich with YouTube metadata and write the feed
    Build {
        /// Output path (default: FEISHU_OUTPUT or data/podcasts.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Max documents to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Compact table of a generated feed
    List {
        /// Feed file to read
        #[arg(short, long, default_value = "data/podcasts.json")]
        input: PathBuf,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Show one episode with its neighbours
    Show {
        /// Wiki node token of the episode
        id: String,
        /// Feed file to read
        #[arg(short, long, default_value = "data/podcasts.json")]
        input: PathBuf,
    },
    /// Run the block pipeline offline on a saved block dump
    Inspect {
        /// JSON array of blocks or a raw blocks API response
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build { output, limit } => {
            // Credentials are checked here, before anything touches the network.
            let settings = Settings::load()?;
            let output = output.unwrap_or_else(|| settings.output.clone());

            let docs = FeishuClient::connect(&settings)?;
            let videos = YoutubeClient::new()?;
            let records = record::build_feed(&docs, &videos, &settings, limit)?;
            catalog::write_feed(&output, &records)?;
            eprintln!(
                "\nDone! Generated {} with {} entries",
                output.display(),
                records.len()
            );
            Ok(())
        }
        Commands::List { input, limit } => {
            let records = catalog::load_feed(&input)?;
            if records.is_empty() {
                println!("Feed is empty.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<4} | {:<36} | {:<11} | {:>9} | {:>3} | {:>3}",
                "#", "Code", "Title", "Video", "Views", "In", "Hl"
            );
            println!("{}", "-".repeat(88));
            for (i, r) in records.iter().take(limit).enumerate() {
                let views = r
                    .video
                    .view_count
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "-".into());
                println!(
                    "{:>3} | {:<4} | {:<36} | {:<11} | {:>9} | {:>3} | {:>3}",
                    i + 1,
                    r.date_code,
                    truncate(&r.title, 36),
                    r.youtube_id.as_deref().unwrap_or("-"),
                    views,
                    r.intro.len(),
                    r.highlights.len()
                );
            }
            println!("\n{} episodes", records.len());
            Ok(())
        }
        Commands::Show { id, input } => {
            let records = catalog::load_feed(&input)?;
            let Some(r) = catalog::find(&records, &id) else {
                anyhow::bail!("No episode with id {}", id);
            };
            print_record(r);

            let (prev, next) = catalog::adjacent(&records, &id);
            println!();
            if let Some(p) = prev {
                println!("Prev: {} ({})", p.title, p.id);
            }
            if let Some(n) = next {
                println!("Next: {} ({})", n.title, n.id);
            }
            Ok(())
        }
        Commands::Inspect { file } => {
            let json = std::fs::read_to_string(&file)?;
            let blocks = feishu::parse_block_dump(&json)?;
            let parsed = parser::process_blocks(&blocks);

            println!("{} blocks -> {} sections", blocks.len(), parsed.sections.len());
            for (i, s) in parsed.sections.iter().enumerate() {
                let title = if s.title.is_empty() { "(untitled)" } else { s.title.as_str() };
                println!("  [{}] {} ({} paragraphs)", i, title, s.paragraphs.len());
            }
            println!("Video:      {}", parsed.video_id.as_deref().unwrap_or("-"));
            println!("Intro:      {}", parsed.intro.len());
            for p in &parsed.intro {
                println!("  {}", truncate(p, 80));
            }
            println!("Highlights: {}", parsed.highlights.len());
            for h in &parsed.highlights {
                println!("  {}", truncate(h, 80));
            }
            println!("Full text:  {} chars", parsed.full_text.chars().count());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_record(r: &NormalizedRecord) {
    println!("{} [{}]", r.title, if r.date_code.is_empty() { "-" } else { r.date_code.as_str() });
    println!("Raw title: {}", r.raw_title);
    println!("Wiki:      {}", r.feishu_url);
    if let Some(id) = &r.youtube_id {
        println!("Video:     https://youtu.be/{}", id);
    }
    if let Some(t) = &r.video.title {
        println!("YT title:  {}", t);
    }
    if let Some(c) = &r.video.channel_name {
        println!("Channel:   {}", c);
    }
    if let Some(v) = r.video.view_count {
        println!("Views:     {}", v);
    }
    if let Some(d) = &r.video.publish_date {
        println!("Published: {}", d);
    }

    println!("\n--- Intro ---");
    for p in &r.intro {
        println!("{}", p);
    }
    if !r.highlights.is_empty() {
        println!("\n--- Highlights ---");
        for h in &r.highlights {
            println!("{}", h);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
