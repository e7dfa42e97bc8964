use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::api::ApiClient;
use crate::app::{MurmurError, Result};
use crate::config::ApiConfig;
use crate::domain::{compare_ids, Feed, Item};

const MAX_ERROR_BODY: usize = 200;

pub struct HttpApiClient {
    client: Client,
    base_url: Url,
    access_token: Option<String>,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("murmur/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, config)
    }

    fn with_client(client: Client, config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            access_token: config.access_token.clone(),
        })
    }

    fn endpoint(feed: Feed) -> &'static str {
        match feed {
            Feed::Timeline => "statuses/home_timeline.json",
            Feed::DirectMessages => "direct_messages/inbox.json",
        }
    }

    fn request_url(
        &self,
        feed: Feed,
        cursor: Option<(&str, &str)>,
        page_size: usize,
    ) -> Result<Url> {
        let mut url = self.base_url.join(Self::endpoint(feed))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("count", &page_size.to_string());
            if let Some((key, id)) = cursor {
                query.append_pair(key, id);
            }
        }
        Ok(url)
    }

    async fn get_items(&self, feed: Feed, url: Url) -> Result<Vec<Item>> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.access_token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
                headers.insert(AUTHORIZATION, value);
            }
        }

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(MurmurError::AuthExpired);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MurmurError::Api {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY).collect(),
            });
        }

        let body = response.bytes().await?;
        parse_items(feed, &body)
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn fetch_newer(
        &self,
        feed: Feed,
        since_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>> {
        let url = self.request_url(feed, since_id.map(|id| ("since_id", id)), page_size)?;
        self.get_items(feed, url).await
    }

    async fn fetch_older(
        &self,
        feed: Feed,
        max_id: Option<&str>,
        page_size: usize,
    ) -> Result<Vec<Item>> {
        let url = self.request_url(feed, max_id.map(|id| ("max_id", id)), page_size)?;
        let items = self.get_items(feed, url).await?;
        // max_id is inclusive on the server
        Ok(match max_id {
            Some(max_id) => items.into_iter().filter(|i| i.id != max_id).collect(),
            None => items,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    #[serde(default)]
    screen_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireItem {
    id: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    sender: Option<WireUser>,
}

/// Decode a JSON array of statuses or direct messages, newest first.
fn parse_items(feed: Feed, body: &[u8]) -> Result<Vec<Item>> {
    let wire: Vec<WireItem> = serde_json::from_slice(body)?;
    let fetched_at = Utc::now();

    let mut items: Vec<Item> = wire
        .into_iter()
        .map(|w| {
            let author = w
                .user
                .or(w.sender)
                .and_then(|u| u.screen_name.or(u.name));
            Item {
                id: w.id,
                feed,
                author,
                text: w.text,
                created_at: w.created_at.as_deref().and_then(parse_created_at),
                fetched_at,
            }
        })
        .collect();

    items.sort_by(|a, b| compare_ids(&b.id, &a.id));
    Ok(items)
}

fn parse_created_at(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, "%a %b %d %H:%M:%S %z %Y")
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
