//! Media search
//!
//! Members look songs up on a video provider before suggesting them; the
//! chosen hit supplies `media_ref` and `view_count` for the draft. The
//! provider sits behind [`MediaSearch`] so the API can run without one
//! (tests, or no API key configured).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bandstand_common::config::MediaSearchConfig;
use bandstand_common::{Error, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("bandstand/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RATE_LIMIT_MS: u64 = 200;
const MAX_QUERY_LEN: usize = 200;

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaHit {
    /// Provider id, stored as the song's `media_ref`
    pub id: String,
    pub title: String,
    pub channel: String,
    pub thumbnail: Option<String>,
    pub view_count: Option<i64>,
}

#[async_trait]
pub trait MediaSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<MediaHit>>;
}

/// Trim and bound a user query
pub fn normalize_query(query: &str) -> Result<String> {
    let query = query.trim();
    if query.is_empty() {
        return Err(Error::Validation("search query is required".to_string()));
    }
    Ok(query.chars().take(MAX_QUERY_LEN).collect())
}

/// Spaces requests at least `min_interval` apart
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// YouTube Data API v3 client
pub struct YouTubeClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    max_results: u32,
    rate_limiter: Arc<RateLimiter>,
}

impl YouTubeClient {
    pub fn new(config: &MediaSearchConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("media_search.api_key is empty".to_string()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: config.api_key.trim().to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_results: config.max_results.clamp(1, 50),
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.rate_limiter.wait().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        debug!(url = %url, "Querying media provider");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("media provider unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), endpoint, "Media provider returned an error");
            return Err(Error::ServiceUnavailable(format!(
                "media provider returned {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("unreadable provider response: {}", e)))
    }
}

#[async_trait]
impl MediaSearch for YouTubeClient {
    async fn search(&self, query: &str) -> Result<Vec<MediaHit>> {
        let query = normalize_query(query)?;
        let max_results = self.max_results.to_string();

        let listing: SearchListResponse = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", max_results.as_str()),
                    ("q", query.as_str()),
                ],
            )
            .await?;

        let mut hits = hits_from_listing(listing);
        if hits.is_empty() {
            return Ok(hits);
        }

        // View counts are only available from the videos endpoint
        let ids = hits
            .iter()
            .map(|hit| hit.id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        match self
            .get_json::<VideoListResponse>("videos", &[("part", "statistics"), ("id", ids.as_str())])
            .await
        {
            Ok(stats) => apply_view_counts(&mut hits, stats),
            Err(e) => warn!("View counts unavailable, returning hits without them: {}", e),
        }

        info!(query = %query, hits = hits.len(), "Media search completed");
        Ok(hits)
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    #[serde(default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    /// Sent as a decimal string
    view_count: Option<String>,
}

/// Results that are videos; channels and playlists carry no video id
fn hits_from_listing(listing: SearchListResponse) -> Vec<MediaHit> {
    listing
        .items
        .into_iter()
        .filter_map(|item| {
            Some(MediaHit {
                id: item.id.video_id?,
                title: item.snippet.title,
                channel: item.snippet.channel_title,
                thumbnail: item.snippet.thumbnails.default.map(|t| t.url),
                view_count: None,
            })
        })
        .collect()
}

fn apply_view_counts(hits: &mut [MediaHit], stats: VideoListResponse) {
    for video in stats.items {
        let views = video
            .statistics
            .and_then(|s| s.view_count)
            .and_then(|v| v.parse::<i64>().ok());
        if let Some(hit) = hits.iter_mut().find(|hit| hit.id == video.id) {
            hit.view_count = views;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_listing_skips_non_videos() {
        let listing: SearchListResponse = serde_json::from_str(
            r#"{
                "items": [
                    {
                        "id": {"kind": "youtube#video", "videoId": "abc123"},
                        "snippet": {
                            "title": "Valerie (Live)",
                            "channelTitle": "Amy Winehouse",
                            "thumbnails": {"default": {"url": "https://i.ytimg.com/vi/abc123/default.jpg"}}
                        }
                    },
                    {
                        "id": {"kind": "youtube#channel", "channelId": "UC1"},
                        "snippet": {"title": "A channel"}
                    }
                ]
            }"#,
        )
        .unwrap();

        let hits = hits_from_listing(listing);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "abc123");
        assert_eq!(hits[0].channel, "Amy Winehouse");
        assert_eq!(
            hits[0].thumbnail.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/default.jpg")
        );
    }

    #[test]
    fn test_view_counts_are_parsed_from_strings() {
        let mut hits = vec![
            MediaHit {
                id: "a".to_string(),
                title: "A".to_string(),
                channel: "C".to_string(),
                thumbnail: None,
                view_count: None,
            },
            MediaHit {
                id: "b".to_string(),
                title: "B".to_string(),
                channel: "C".to_string(),
                thumbnail: None,
                view_count: None,
            },
        ];
        let stats: VideoListResponse = serde_json::from_str(
            r#"{"items": [
                {"id": "b", "statistics": {"viewCount": "1234567"}},
                {"id": "a", "statistics": {"viewCount": "not a number"}}
            ]}"#,
        )
        .unwrap();

        apply_view_counts(&mut hits, stats);

        assert_eq!(hits[0].view_count, None);
        assert_eq!(hits[1].view_count, Some(1_234_567));
    }

    #[test]
    fn test_normalize_query() {
        assert!(matches!(normalize_query("   "), Err(Error::Validation(_))));
        assert_eq!(normalize_query("  valerie ").unwrap(), "valerie");
        assert_eq!(normalize_query(&"x".repeat(500)).unwrap().len(), MAX_QUERY_LEN);
    }

    #[test]
    fn test_client_requires_api_key() {
        let config = MediaSearchConfig {
            api_key: " ".to_string(),
            base_url: "https://example.invalid".to_string(),
            max_results: 5,
        };
        assert!(matches!(YouTubeClient::new(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_service_unavailable() {
        let config = MediaSearchConfig {
            api_key: "key".to_string(),
            // Nothing listens on the discard port
            base_url: "http://127.0.0.1:9".to_string(),
            max_results: 5,
        };
        let client = YouTubeClient::new(&config).unwrap();

        let err = client.search("valerie").await.unwrap_err();
        assert!(matches!(err, Error::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let limiter = RateLimiter::new(100);
        let start = Instant::now();

        limiter.wait().await;
        limiter.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
