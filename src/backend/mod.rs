//! Metadata backends and the one-time choice between them.

pub mod dislikes;
pub mod youtube_api;
pub mod ytdlp;

use std::fmt;

use tracing::{info, warn};

use crate::config::AnalyzerSettings;
use crate::error::FetchError;
use crate::record::CanonicalRecord;

use self::dislikes::DislikeClient;
use self::youtube_api::YouTubeApiFetcher;
use self::ytdlp::YtDlpFetcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendMode {
    /// Official Data API with a working credential.
    Authoritative,
    /// yt-dlp scraping; slower and rate limited by pacing.
    Fallback,
}

impl fmt::Display for BackendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendMode::Authoritative => f.write_str("YouTube Data API"),
            BackendMode::Fallback => f.write_str("yt-dlp fallback"),
        }
    }
}

/// A single item to resolve. Only inputs with an extracted identifier reach
/// a fetcher.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub source_url: &'a str,
    pub identifier: &'a str,
}

pub trait MetadataFetcher {
    fn mode(&self) -> BackendMode;

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<CanonicalRecord, FetchError>;
}

/// Picks the backend for the whole session. A credential that passes the
/// liveness probe selects the Data API; anything else falls back to yt-dlp.
pub fn select_backend(settings: &AnalyzerSettings) -> Box<dyn MetadataFetcher + Send> {
    let dislikes = DislikeClient::new(&settings.dislike_api_base);

    if let Some(api_key) = settings.credential() {
        let api = YouTubeApiFetcher::new(
            &settings.api_base,
            api_key,
            settings.request_timeout,
            dislikes.clone(),
        );
        match api.probe() {
            Ok(()) => {
                info!(mode = %BackendMode::Authoritative, "metadata backend selected");
                return Box::new(api);
            }
            Err(err) => warn!(error = %err, "API key rejected or service unreachable, using yt-dlp"),
        }
    } else {
        info!("no API key configured, using yt-dlp");
    }

    let fallback = YtDlpFetcher::new(
        &settings.ytdlp_bin,
        settings.ytdlp_timeout,
        settings.resolve_download_urls,
        dislikes,
    );
    if let Err(err) = fallback.ensure_available() {
        warn!(error = %err, "yt-dlp unavailable, every item will fail");
    }
    info!(mode = %BackendMode::Fallback, "metadata backend selected");
    Box::new(fallback)
}
