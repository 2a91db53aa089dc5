use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};
use crate::parser::blocks::Block;
use crate::settings::Settings;

const NODE_PAGE_SIZE: &str = "50";
const BLOCK_PAGE_SIZE: &str = "100";

/// A child document of the configured wiki node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WikiNode {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub obj_token: String,
    #[serde(default)]
    pub node_token: String,
}

/// Where the documents come from.
pub trait DocumentSource {
    fn list_documents(&self) -> Result<Vec<WikiNode>>;
    /// All blocks of one document, pagination resolved. Never fails: a bad
    /// page ends the listing and the blocks gathered so far are returned.
    fn document_blocks(&self, obj_token: &str) -> Vec<Block>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
    tenant_access_token: Option<String>,
}

/// A saved block listing: either a bare array of blocks or one raw API page.
#[derive(Deserialize)]
#[serde(untagged)]
enum BlockDump {
    Blocks(Vec<Block>),
    Response(Envelope<Page<Block>>),
}

pub fn parse_block_dump(json: &str) -> Result<Vec<Block>> {
    match serde_json::from_str(json)? {
        BlockDump::Blocks(blocks) => Ok(blocks),
        BlockDump::Response(env) if env.code != 0 => Err(FeedError::Api {
            code: env.code,
            msg: env.msg,
        }),
        BlockDump::Response(env) => Ok(env.data.map(|p| p.items).unwrap_or_default()),
    }
}

pub struct FeishuClient {
    http: Client,
    base_url: String,
    space_id: String,
    parent_node: String,
    token: String,
}

impl FeishuClient {
    /// Exchange the app credentials for a tenant token. Failing here is fatal.
    pub fn connect(settings: &Settings) -> Result<Self> {
        settings.validate()?;
        // Feishu calls carry no timeout of their own.
        let http = Client::builder().timeout(None::<Duration>).build()?;
        let base_url = settings.base_url.trim_end_matches('/').to_string();

        info!("Fetching token...");
        let resp: TokenResponse = http
            .post(format!("{}/auth/v3/tenant_access_token/internal", base_url))
            .json(&serde_json::json!({
                "app_id": settings.app_id,
                "app_secret": settings.app_secret,
            }))
            .send()?
            .json()?;

        let token = match resp.tenant_access_token {
            Some(t) if !t.is_empty() => t,
            _ => return Err(FeedError::Token(format!("code {}: {}", resp.code, resp.msg))),
        };

        Ok(FeishuClient {
            http,
            base_url,
            space_id: settings.space_id.clone(),
            parent_node: settings.parent_node.clone(),
            token,
        })
    }

    fn fetch_page<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Page<T>> {
        let resp = req.bearer_auth(&self.token).send()?;
        let status = resp.status();
        let url = resp.url().to_string();
        let body = resp.text()?;
        read_page(status, &url, &body)
    }
}

/// Decode one listing page. A non-success status, an undecodable body or a
/// non-zero `code` is an error.
fn read_page<T: DeserializeOwned>(status: StatusCode, url: &str, body: &str) -> Result<Page<T>> {
    if !status.is_success() {
        return Err(FeedError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let envelope: Envelope<Page<T>> = serde_json::from_str(body)?;
    if envelope.code != 0 {
        return Err(FeedError::Api {
            code: envelope.code,
            msg: envelope.msg,
        });
    }
    Ok(envelope.data.unwrap_or(Page {
        items: Vec::new(),
        has_more: false,
        page_token: None,
    }))
}

/// Follow `page_token` until `has_more` is false or no token comes back. The
/// first failing page ends the walk and its error is handed back next to what
/// was gathered.
fn walk_pages<T, F>(what: &str, mut fetch: F) -> (Vec<T>, Option<FeedError>)
where
    F: FnMut(Option<&str>) -> Result<Page<T>>,
{
    let mut items = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let page = match fetch(page_token.as_deref()) {
            Ok(p) => p,
            Err(e) => return (items, Some(e)),
        };
        items.extend(page.items);
        debug!("{}: {} items so far", what, items.len());

        match page.page_token.filter(|t| !t.is_empty()) {
            Some(next) if page.has_more => page_token = Some(next),
            _ => break,
        }
    }

    (items, None)
}

impl DocumentSource for FeishuClient {
    fn list_documents(&self) -> Result<Vec<WikiNode>> {
        let url = format!("{}/wiki/v2/spaces/{}/nodes", self.base_url, self.space_id);
        let (nodes, err) = walk_pages::<WikiNode, _>("nodes", |page_token| {
            let mut req = self.http.get(&url).query(&[
                ("parent_node_token", self.parent_node.as_str()),
                ("page_size", NODE_PAGE_SIZE),
            ]);
            if let Some(t) = page_token {
                req = req.query(&[("page_token", t)]);
            }
            self.fetch_page(req)
        });
        if let Some(e) = err {
            warn!("Failed to fetch child nodes: {}", e);
        }
        Ok(nodes)
    }

    fn document_blocks(&self, obj_token: &str) -> Vec<Block> {
        let url = format!("{}/docx/v1/documents/{}/blocks", self.base_url, obj_token);
        let (blocks, err) = walk_pages::<Block, _>(obj_token, |page_token| {
            let mut req = self.http.get(&url).query(&[("page_size", BLOCK_PAGE_SIZE)]);
            if let Some(t) = page_token {
                req = req.query(&[("page_token", t)]);
            }
            self.fetch_page(req)
        });
        if let Some(e) = err {
            warn!("Block listing for {} stopped after {} blocks: {}", obj_token, blocks.len(), e);
        }
        blocks
    }
}
