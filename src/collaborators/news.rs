//! NewsAPI `/v2/everything` as a topic source.

use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result, Topic};
use reqwest::Client;
use serde::Deserialize;

use super::{http_client, NewsSource};
use crate::config::NewsConfig;

const NO_DESCRIPTION: &str = "No description available";

#[derive(Deserialize)]
struct EverythingResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

impl Article {
    fn into_topic(self) -> Topic {
        let description = self
            .description
            .filter(|d| !d.trim().is_empty())
            .or_else(|| {
                // NewsAPI truncates content with a "[+N chars]" suffix.
                self.content
                    .as_deref()
                    .map(|c| c.split("[+").next().unwrap_or_default().trim().to_string())
                    .filter(|c| !c.is_empty())
            })
            .unwrap_or_else(|| NO_DESCRIPTION.to_string());

        Topic {
            title: self.title.unwrap_or_default().trim().to_string(),
            description,
            url: self.url.unwrap_or_default(),
            source: self
                .source
                .and_then(|s| s.name)
                .unwrap_or_else(|| "Unknown".to_string()),
            published_at: self.published_at.unwrap_or_default(),
        }
    }
}

pub struct NewsApiSource {
    client: Client,
    base_url: String,
    query: String,
    page_size: u32,
    language: String,
    api_key: String,
}

impl NewsApiSource {
    pub fn new(config: &NewsConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: http_client(Duration::from_secs(config.timeout_secs)),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            query: config.query.clone(),
            page_size: config.page_size,
            language: config.language.clone(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    async fn latest(&self) -> Result<Vec<Topic>> {
        let page_size = self.page_size.to_string();
        let response = self
            .client
            .get(format!("{}/v2/everything", self.base_url))
            .query(&[
                ("q", self.query.as_str()),
                ("pageSize", page_size.as_str()),
                ("sortBy", "publishedAt"),
                ("language", self.language.as_str()),
            ])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::http(format!("news request failed: {e}")))?;

        let status = response.status();
        let body: EverythingResponse = response
            .json()
            .await
            .map_err(|e| Error::http(format!("invalid news response ({status}): {e}")))?;

        if body.status != "ok" {
            return Err(Error::http(format!(
                "news API returned status '{}': {}",
                body.status,
                body.message.unwrap_or_default()
            )));
        }

        let topics: Vec<Topic> = body.articles.into_iter().map(Article::into_topic).collect();
        tracing::debug!(articles = topics.len(), "News fetched");
        Ok(topics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(server: &MockServer) -> NewsApiSource {
        let config = NewsConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        NewsApiSource::new(&config, "news-key")
    }

    #[tokio::test]
    async fn maps_articles_to_topics() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/everything"))
            .and(query_param("pageSize", "50"))
            .and(query_param("sortBy", "publishedAt"))
            .and(query_param("language", "en"))
            .and(header("X-Api-Key", "news-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [
                    {
                        "title": " Chip shortage ends ",
                        "description": "Fabs catch up",
                        "url": "https://example.com/a",
                        "source": { "name": "Wired" },
                        "publishedAt": "2026-10-01T10:00:00Z"
                    },
                    {
                        "title": "Robots",
                        "description": null,
                        "content": "Cheap arms everywhere… [+1200 chars]",
                        "source": { "id": null }
                    },
                    { "title": "Bare" }
                ]
            })))
            .mount(&server)
            .await;

        let topics = source(&server).latest().await.unwrap();
        assert_eq!(topics.len(), 3);
        assert_eq!(topics[0].title, "Chip shortage ends");
        assert_eq!(topics[0].source, "Wired");
        assert_eq!(topics[1].description, "Cheap arms everywhere…");
        assert_eq!(topics[1].source, "Unknown");
        assert_eq!(topics[2].description, NO_DESCRIPTION);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid"
            })))
            .mount(&server)
            .await;

        let err = source(&server).latest().await.unwrap_err();
        assert!(err.to_string().contains("Your API key is invalid"));
    }
}
