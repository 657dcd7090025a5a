use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::core::config::WebSearchConfig;
use crate::core::errors::AiError;

#[derive(Debug, Clone, Serialize)]
pub struct WebResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearchProvider: Send + Sync {
    /// Top-k web results for the query, formatted as a numbered
    /// title+snippet text blob.
    async fn search(&self, query: &str, max_results: usize) -> Result<String, AiError>;
}

/// Web search over the configured provider, falling back to DuckDuckGo
/// when no provider key is configured.
pub struct HttpWebSearch {
    config: WebSearchConfig,
    client: Client,
}

impl HttpWebSearch {
    pub fn new(config: WebSearchConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    async fn fetch_results(&self, query: &str) -> Result<Vec<WebResult>, AiError> {
        match self.config.provider.as_str() {
            "google" => {
                if !self.config.google_api_key.is_empty()
                    && !self.config.google_engine_id.is_empty()
                {
                    return google_search(
                        &self.client,
                        query,
                        &self.config.google_api_key,
                        &self.config.google_engine_id,
                    )
                    .await;
                }
            }
            "brave" => {
                if !self.config.brave_api_key.is_empty() {
                    return brave_search(&self.client, query, &self.config.brave_api_key).await;
                }
            }
            "bing" => {
                if !self.config.bing_api_key.is_empty() {
                    return bing_search(&self.client, query, &self.config.bing_api_key).await;
                }
            }
            _ => {}
        }

        duckduckgo_search(&self.client, query).await
    }
}

#[async_trait]
impl WebSearchProvider for HttpWebSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<String, AiError> {
        let results = self.fetch_results(query).await?;
        tracing::debug!("web search for {:?} returned {} results", query, results.len());
        Ok(format_results(&results, max_results))
    }
}

pub fn format_results(results: &[WebResult], max_results: usize) -> String {
    if results.is_empty() {
        return "No web results found.".to_string();
    }

    results
        .iter()
        .take(max_results)
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n{}\n({})", i + 1, r.title, r.snippet, r.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

async fn google_search(
    client: &Client,
    query: &str,
    api_key: &str,
    engine_id: &str,
) -> Result<Vec<WebResult>, AiError> {
    let url = format!(
        "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}",
        api_key,
        engine_id,
        urlencoding::encode(query)
    );

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;

    if !response.status().is_success() {
        return Err(AiError::Provider {
            provider: "web-search",
            message: format!("Google search failed: {}", response.status()),
        });
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;
    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in items {
        let title = item
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let url = item
            .get("link")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let snippet = item
            .get("snippet")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if !title.is_empty() && !url.is_empty() {
            results.push(WebResult {
                title,
                url,
                snippet,
            });
        }
    }

    Ok(results)
}

async fn brave_search(
    client: &Client,
    query: &str,
    api_key: &str,
) -> Result<Vec<WebResult>, AiError> {
    let url = format!(
        "https://api.search.brave.com/res/v1/web/search?q={}",
        urlencoding::encode(query)
    );

    let response = client
        .get(url)
        .header("X-Subscription-Token", api_key)
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;

    if !response.status().is_success() {
        return Err(AiError::Provider {
            provider: "web-search",
            message: format!("Brave search failed: {}", response.status()),
        });
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;
    let mut results = Vec::new();

    if let Some(items) = payload
        .get("web")
        .and_then(|w| w.get("results"))
        .and_then(|v| v.as_array())
    {
        for item in items {
            let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("");
            let url = item.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let snippet = item
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or("");

            if !title.is_empty() && !url.is_empty() {
                results.push(WebResult {
                    title: title.to_string(),
                    url: url.to_string(),
                    snippet: snippet.to_string(),
                });
            }
        }
    }

    Ok(results)
}

async fn bing_search(
    client: &Client,
    query: &str,
    api_key: &str,
) -> Result<Vec<WebResult>, AiError> {
    let url = format!(
        "https://api.bing.microsoft.com/v7.0/search?q={}",
        urlencoding::encode(query)
    );

    let response = client
        .get(url)
        .header("Ocp-Apim-Subscription-Key", api_key)
        .send()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;

    if !response.status().is_success() {
        return Err(AiError::Provider {
            provider: "web-search",
            message: format!("Bing search failed: {}", response.status()),
        });
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;
    let mut results = Vec::new();

    if let Some(items) = payload
        .get("webPages")
        .and_then(|wp| wp.get("value"))
        .and_then(|v| v.as_array())
    {
        for item in items {
            let title = item.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let url = item.get("url").and_then(|v| v.as_str()).unwrap_or("");
            let snippet = item.get("snippet").and_then(|v| v.as_str()).unwrap_or("");

            if !title.is_empty() && !url.is_empty() {
                results.push(WebResult {
                    title: title.to_string(),
                    url: url.to_string(),
                    snippet: snippet.to_string(),
                });
            }
        }
    }

    Ok(results)
}

async fn duckduckgo_search(client: &Client, query: &str) -> Result<Vec<WebResult>, AiError> {
    let url = format!(
        "https://api.duckduckgo.com/?q={}&format=json&no_redirect=1&no_html=1",
        urlencoding::encode(query)
    );

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;

    if !response.status().is_success() {
        return Err(AiError::Provider {
            provider: "web-search",
            message: format!("DuckDuckGo search failed: {}", response.status()),
        });
    }

    let payload: Value = response
        .json()
        .await
        .map_err(|e| AiError::provider("web-search", e))?;
    let mut results = Vec::new();

    if let Some(abstract_text) = payload.get("AbstractText").and_then(|v| v.as_str()) {
        if let Some(url) = payload.get("AbstractURL").and_then(|v| v.as_str()) {
            if !abstract_text.is_empty() && !url.is_empty() {
                results.push(WebResult {
                    title: abstract_text
                        .split(" - ")
                        .next()
                        .unwrap_or(abstract_text)
                        .to_string(),
                    url: url.to_string(),
                    snippet: abstract_text.to_string(),
                });
            }
        }
    }

    if let Some(items) = payload.get("Results").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }
    if let Some(items) = payload.get("RelatedTopics").and_then(|v| v.as_array()) {
        extract_ddg_topics(items, &mut results);
    }

    Ok(results)
}

fn extract_ddg_topics(items: &[Value], results: &mut Vec<WebResult>) {
    for item in items {
        if let Some(topics) = item.get("Topics").and_then(|v| v.as_array()) {
            extract_ddg_topics(topics, results);
            continue;
        }
        let text = item.get("Text").and_then(|v| v.as_str()).unwrap_or("");
        let url = item.get("FirstURL").and_then(|v| v.as_str()).unwrap_or("");
        if text.is_empty() || url.is_empty() {
            continue;
        }
        results.push(WebResult {
            title: text.split(" - ").next().unwrap_or(text).to_string(),
            url: url.to_string(),
            snippet: text.to_string(),
        });
    }
}
