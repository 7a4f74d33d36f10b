//! Authoritative backend: the YouTube Data API v3 `videos.list` endpoint.

use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::dislikes::DislikeClient;
use crate::backend::{BackendMode, FetchRequest, MetadataFetcher};
use crate::error::FetchError;
use crate::normalize::{
    RawMetadata, category_label, normalize, parse_count, parse_iso8601_duration, resolve_country,
    split_rfc3339,
};
use crate::record::CanonicalRecord;

/// Identifier the liveness probe asks for; it has been public for years.
pub const PROBE_VIDEO_ID: &str = "dQw4w9WgXcQ";
const FETCH_PARTS: &str = "snippet,contentDetails,statistics";
const MAX_RETRIES: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    #[serde(default)]
    snippet: Snippet,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default, rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    published_at: Option<String>,
    channel_id: Option<String>,
    title: Option<String>,
    description: Option<String>,
    channel_title: Option<String>,
    category_id: Option<String>,
    default_language: Option<String>,
    default_audio_language: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentDetails {
    duration: Option<String>,
}

pub struct YouTubeApiFetcher {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
    dislikes: DislikeClient,
}

impl YouTubeApiFetcher {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        request_timeout: Duration,
        dislikes: DislikeClient,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(request_timeout).build();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            dislikes,
        }
    }

    /// One cheap request against a known-good identifier. Any failure means
    /// the backend is unusable for this session.
    pub fn probe(&self) -> Result<(), FetchError> {
        self.list_videos("id", PROBE_VIDEO_ID).map(|_| ())
    }

    fn list_videos(&self, parts: &str, video_id: &str) -> Result<VideoListResponse, FetchError> {
        let url = format!("{}/videos", self.api_base);
        let response = self
            .agent
            .get(&url)
            .query("part", parts)
            .query("id", video_id)
            .query("key", &self.api_key)
            .call()?;
        response
            .into_json::<VideoListResponse>()
            .map_err(|err| FetchError::Parse(err.to_string()))
    }

    fn list_with_retry(&self, video_id: &str) -> Result<VideoListResponse, FetchError> {
        let mut attempt = 0;
        loop {
            match self.list_videos(FETCH_PARTS, video_id) {
                Err(err) if err.is_transient() && attempt < MAX_RETRIES => {
                    let backoff = RETRY_BASE_DELAY * 2u32.pow(attempt);
                    debug!(identifier = video_id, error = %err, ?backoff, "retrying API request");
                    thread::sleep(backoff);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}

impl MetadataFetcher for YouTubeApiFetcher {
    fn mode(&self) -> BackendMode {
        BackendMode::Authoritative
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<CanonicalRecord, FetchError> {
        let video_id = request.identifier;
        let listing = self.list_with_retry(video_id).inspect_err(|err| {
            warn!(identifier = video_id, error = %err, "API fetch failed");
        })?;
        let item = listing
            .items
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::NotFound(video_id.to_owned()))?;
        let dislikes = self.dislikes.dislikes(video_id);
        Ok(normalize(map_item(item, video_id, request.source_url, dislikes)))
    }
}

fn map_item(item: VideoItem, video_id: &str, source_url: &str, dislikes: u64) -> RawMetadata {
    let VideoItem {
        snippet,
        statistics,
        content_details,
    } = item;
    let (upload_date, upload_time) = snippet
        .published_at
        .as_deref()
        .map(split_rfc3339)
        .unwrap_or((None, None));
    let country = resolve_country(
        snippet.country.as_deref(),
        &[
            snippet.default_language.as_deref(),
            snippet.default_audio_language.as_deref(),
        ],
    );

    RawMetadata {
        identifier: video_id.to_owned(),
        title: snippet.title.unwrap_or_default(),
        description: snippet.description.unwrap_or_default(),
        upload_date,
        upload_time,
        duration_seconds: content_details
            .duration
            .as_deref()
            .and_then(parse_iso8601_duration),
        view_count: parse_count(statistics.view_count.as_deref()),
        like_count: parse_count(statistics.like_count.as_deref()),
        dislike_count: dislikes,
        comment_count: parse_count(statistics.comment_count.as_deref()),
        channel_name: snippet.channel_title.unwrap_or_default(),
        channel_id: snippet.channel_id,
        country,
        category: category_label(snippet.category_id.as_deref()),
        thumbnail_url: Some(format!(
            "https://img.youtube.com/vi/{video_id}/maxresdefault.jpg"
        )),
        source_url: source_url.to_owned(),
        // The Data API never exposes playable stream URLs.
        download_url: None,
    }
}
