use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::{FeedError, Result};

const DEFAULT_BASE_URL: &str = "https://open.feishu.cn/open-apis";
const DEFAULT_WIKI_URL_BASE: &str = "https://my.feishu.cn/wiki";
const DEFAULT_SPACE_ID: &str = "7591325128043121630";
const DEFAULT_PARENT_NODE: &str = "TOSJwKzxTiFdiRk0aducHNBFntg";
const DEFAULT_OUTPUT: &str = "data/podcasts.json";
const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Everything the pipeline needs from the outside world, passed explicitly.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app_id: String,
    pub app_secret: String,
    pub space_id: String,
    pub parent_node: String,
    pub base_url: String,
    pub wiki_url_base: String,
    pub output: PathBuf,
    pub request_delay_ms: u64,
}

impl Settings {
    /// Defaults, then `podcast_feed.toml` if present, then `FEISHU_*` env vars.
    pub fn load() -> Result<Self> {
        let settings: Settings = defaults()?
            .add_source(File::with_name("podcast_feed").required(false))
            .add_source(Environment::with_prefix("FEISHU"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_id.trim().is_empty() || self.app_secret.trim().is_empty() {
            return Err(FeedError::MissingCredentials);
        }
        Ok(())
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// Public wiki link for a node token.
    pub fn wiki_url(&self, node_token: &str) -> String {
        format!("{}/{}", self.wiki_url_base.trim_end_matches('/'), node_token)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>> {
    Ok(Config::builder()
        .set_default("app_id", "")?
        .set_default("app_secret", "")?
        .set_default("space_id", DEFAULT_SPACE_ID)?
        .set_default("parent_node", DEFAULT_PARENT_NODE)?
        .set_default("base_url", DEFAULT_BASE_URL)?
        .set_default("wiki_url_base", DEFAULT_WIKI_URL_BASE)?
        .set_default("output", DEFAULT_OUTPUT)?
        .set_default("request_delay_ms", DEFAULT_REQUEST_DELAY_MS)?)
}
