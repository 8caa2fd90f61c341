//! Read access to the external content store (Notion) that owns the post feed.

use crate::domain::Post;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const UNTITLED_POST: &str = "Untitled Post";

/// Extracts the trailing 32-hex-digit page identifier from a Notion page url.
pub fn extract_page_id(page_url: &str) -> Result<String, String> {
    static RE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)([a-f0-9]{32})(?:[?#]|$)").expect("valid page id regex"));

    RE.captures(page_url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| format!("Failed to extract page id from `{page_url}`"))
}

/// Result of reading the feed. The provider failing is not an error for callers.
#[derive(Debug)]
pub enum Feed {
    Fetched(Vec<Post>),
    Unavailable,
}

impl Feed {
    pub fn into_posts(self) -> Vec<Post> {
        match self {
            Self::Fetched(posts) => posts,
            Self::Unavailable => Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct ContentClient {
    http_client: Client,
    base_url: String,
    notion_version: String,
    integration_secret: Secret<String>,
    page_id: String,
}

impl ContentClient {
    pub fn new(
        base_url: String,
        notion_version: String,
        integration_secret: Secret<String>,
        page_id: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            base_url,
            notion_version,
            integration_secret,
            page_id,
        })
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    /// Posts newest first. Never fails: any provider error is logged and
    /// reported as [`Feed::Unavailable`].
    #[tracing::instrument(name = "Fetch posts from content provider", skip(self))]
    pub async fn get_posts(&self) -> Feed {
        match self.query_posts().await {
            Ok(posts) => Feed::Fetched(posts),
            Err(e) => {
                tracing::error!(
                    error.cause_chain = ?e,
                    error.message = %e,
                    "Failed to fetch posts from the content provider"
                );
                Feed::Unavailable
            }
        }
    }

    async fn query_posts(&self) -> Result<Vec<Post>, anyhow::Error> {
        let request_body = json!({
            "sorts": [{ "property": "PublishedDate", "direction": "descending" }]
        });

        // The configured page id addresses the posts database directly.
        let response: QueryResponse = self
            .post(&format!("/v1/databases/{}/query", self.page_id))
            .json(&request_body)
            .send()
            .await
            .context("Failed to query the posts database")?
            .error_for_status()
            .context("Content provider rejected the posts query")?
            .json()
            .await
            .context("Failed to decode the posts query response")?;

        Ok(response.results.into_iter().map(Post::from).collect())
    }

    /// Retrieves a page object, mostly to check the integration can see it.
    #[tracing::instrument(skip(self))]
    pub async fn retrieve_page(&self, page_id: &str) -> Result<Value, anyhow::Error> {
        self.send_json(self.get(&format!("/v1/pages/{page_id}")))
            .await
            .with_context(|| format!("Failed to retrieve page {page_id}"))
    }

    #[tracing::instrument(skip(self))]
    pub async fn retrieve_database(&self, database_id: &str) -> Result<Database, anyhow::Error> {
        let database = self
            .send_json(self.get(&format!("/v1/databases/{database_id}")))
            .await
            .with_context(|| format!("Failed to retrieve database {database_id}"))?;

        serde_json::from_value(database).context("Failed to decode database object")
    }

    /// All databases embedded directly in `page_id`, following pagination.
    /// A child database that cannot be retrieved is logged and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn list_child_databases(&self, page_id: &str) -> Result<Vec<Database>, anyhow::Error> {
        let mut databases = Vec::new();
        let mut start_cursor: Option<String> = None;

        loop {
            let mut request = self.get(&format!("/v1/blocks/{page_id}/children"));
            if let Some(cursor) = &start_cursor {
                request = request.query(&[("start_cursor", cursor)]);
            }

            let children: BlockChildren = serde_json::from_value(
                self.send_json(request)
                    .await
                    .context("Failed to list page children")?,
            )
            .context("Failed to decode page children")?;

            for block in children.results {
                if block.kind != "child_database" {
                    continue;
                }

                match self.retrieve_database(&block.id).await {
                    Ok(database) => databases.push(database),
                    Err(e) => tracing::warn!(
                        error.cause_chain = ?e,
                        "Skipping child database {}",
                        block.id
                    ),
                }
            }

            match (children.has_more, children.next_cursor) {
                (true, Some(cursor)) => start_cursor = Some(cursor),
                _ => break,
            }
        }

        Ok(databases)
    }

    /// First child database of `page_id` whose title contains `fragment`, ignoring case.
    pub async fn find_database_titled(
        &self,
        page_id: &str,
        fragment: &str,
    ) -> Result<Option<Database>, anyhow::Error> {
        let fragment = fragment.to_lowercase();

        Ok(self
            .list_child_databases(page_id)
            .await?
            .into_iter()
            .find(|db| db.title().to_lowercase().contains(&fragment)))
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_database(&self, body: &Value) -> Result<Database, anyhow::Error> {
        let database = self
            .send_json(self.post("/v1/databases").json(body))
            .await
            .context("Failed to create database")?;

        serde_json::from_value(database).context("Failed to decode created database")
    }

    #[tracing::instrument(skip(self, body))]
    pub async fn create_page(&self, body: &Value) -> Result<Value, anyhow::Error> {
        self.send_json(self.post("/v1/pages").json(body))
            .await
            .context("Failed to create page")
    }

    fn get(&self, endpoint: &str) -> RequestBuilder {
        self.authorized(self.http_client.get(format!("{}{endpoint}", self.base_url)))
    }

    fn post(&self, endpoint: &str) -> RequestBuilder {
        self.authorized(self.http_client.post(format!("{}{endpoint}", self.base_url)))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(self.integration_secret.expose_secret())
            .header("Notion-Version", &self.notion_version)
    }

    async fn send_json(&self, request: RequestBuilder) -> Result<Value, reqwest::Error> {
        request.send().await?.error_for_status()?.json().await
    }
}

/// A database object, reduced to what provisioning needs.
#[derive(Debug, Deserialize)]
pub struct Database {
    pub id: String,
    #[serde(default)]
    title: Vec<RichText>,
}

impl Database {
    pub fn title(&self) -> &str {
        self.title
            .first()
            .map(|t| t.plain_text.as_str())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
struct BlockChildren {
    results: Vec<Block>,
    #[serde(default)]
    has_more: bool,
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct Block {
    id: String,
    #[serde(rename = "type", default)]
    kind: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    results: Vec<Page>,
}

#[derive(Deserialize)]
struct Page {
    id: String,
    url: String,
    cover: Option<Cover>,
    #[serde(default)]
    properties: PostProperties,
}

#[derive(Default, Deserialize)]
struct PostProperties {
    #[serde(rename = "Title")]
    title: Option<TitleProperty>,
    #[serde(rename = "Body")]
    body: Option<BodyProperty>,
    #[serde(rename = "Tags")]
    tags: Option<TagsProperty>,
    #[serde(rename = "PublishedDate")]
    published_date: Option<DateProperty>,
}

#[derive(Deserialize)]
struct TitleProperty {
    #[serde(default)]
    title: Vec<RichText>,
}

#[derive(Deserialize)]
struct BodyProperty {
    #[serde(default)]
    rich_text: Vec<RichText>,
}

#[derive(Deserialize)]
struct TagsProperty {
    #[serde(default)]
    multi_select: Vec<SelectOption>,
}

#[derive(Deserialize)]
struct DateProperty {
    date: Option<DateValue>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

#[derive(Deserialize)]
struct SelectOption {
    name: String,
}

#[derive(Deserialize)]
struct DateValue {
    start: Option<String>,
}

#[derive(Deserialize)]
struct Cover {
    external: Option<FileUrl>,
    file: Option<FileUrl>,
}

#[derive(Deserialize)]
struct FileUrl {
    url: String,
}

impl From<Page> for Post {
    fn from(page: Page) -> Self {
        let PostProperties {
            title,
            body,
            tags,
            published_date,
        } = page.properties;

        let title = title
            .and_then(|p| p.title.into_iter().next())
            .map(|t| t.plain_text)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNTITLED_POST.to_string());
        let body = body
            .and_then(|p| p.rich_text.into_iter().next())
            .map(|t| t.plain_text)
            .unwrap_or_default();
        let tags = tags
            .map(|p| p.multi_select.into_iter().map(|o| o.name).collect())
            .unwrap_or_default();
        let published_date = published_date
            .and_then(|p| p.date)
            .and_then(|d| d.start);
        let cover_image = page
            .cover
            .and_then(|c| c.external.or(c.file))
            .map(|f| f.url);

        Post {
            id: page.id,
            title,
            body,
            tags,
            published_date,
            url: page.url,
            cover_image,
        }
    }
}
