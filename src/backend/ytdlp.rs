//! Fallback backend driven by the `yt-dlp` executable.
//!
//! yt-dlp is asked for `--dump-single-json` in metadata-only mode; its JSON
//! is parsed into [`VideoInfo`] and then normalized like the API output. A
//! second, optional invocation asks for a direct stream URL.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::backend::dislikes::DislikeClient;
use crate::backend::{BackendMode, FetchRequest, MetadataFetcher};
use crate::error::FetchError;
use crate::normalize::{
    OTHER_CATEGORY, RawMetadata, normalize, parse_compact_date, time_of_timestamp,
};
use crate::record::{CanonicalRecord, UNKNOWN};

pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)",
    "Mozilla/5.0 (Linux; Android 13; SM-S918B)",
];
pub const STREAM_FORMAT: &str = "best[height<=720][ext=mp4]/best[ext=mp4]";
const EXTRACTOR_ARGS: &str = "youtube:skip=hls,dash,sabr;player_client=android,ios";
const RETRIES: &str = "3";
const SOCKET_TIMEOUT_SECS: &str = "30";
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const VERSION_TIMEOUT: Duration = Duration::from_secs(10);

/// Subset of yt-dlp's info JSON. Everything is optional because scraped
/// metadata comes and goes.
#[derive(Debug, Default, Deserialize)]
struct VideoInfo {
    id: Option<String>,
    #[serde(rename = "_type")]
    kind: Option<String>,
    entries: Option<serde_json::Value>,
    title: Option<String>,
    fulltitle: Option<String>,
    description: Option<String>,
    like_count: Option<i64>,
    view_count: Option<i64>,
    comment_count: Option<i64>,
    upload_date: Option<String>,
    timestamp: Option<i64>,
    release_timestamp: Option<i64>,
    duration: Option<f64>,
    uploader: Option<String>,
    channel: Option<String>,
    channel_id: Option<String>,
    categories: Option<Vec<String>>,
    thumbnail: Option<String>,
}

impl VideoInfo {
    fn is_collection(&self) -> bool {
        self.entries.is_some()
            || matches!(self.kind.as_deref(), Some("playlist") | Some("multi_video"))
    }
}

pub struct YtDlpFetcher {
    program: PathBuf,
    timeout: Duration,
    resolve_download_urls: bool,
    dislikes: DislikeClient,
}

impl YtDlpFetcher {
    pub fn new(
        program: impl Into<PathBuf>,
        timeout: Duration,
        resolve_download_urls: bool,
        dislikes: DislikeClient,
    ) -> Self {
        Self {
            program: program.into(),
            timeout,
            resolve_download_urls,
            dislikes,
        }
    }

    /// Runs `yt-dlp --version` so a missing install is reported up front.
    /// A binary that hangs is killed like any other invocation.
    pub fn ensure_available(&self) -> Result<(), FetchError> {
        let mut command = Command::new(&self.program);
        command.arg("--version");
        run_with_timeout(command, self.timeout.min(VERSION_TIMEOUT), &self.program)
            .map(|_| ())
            .map_err(|err| match err {
                FetchError::Process(message) if message.starts_with("spawning") => {
                    FetchError::Process(format!(
                        "{} is not installed or not in PATH: {message}",
                        self.program.display()
                    ))
                }
                other => other,
            })
    }

    fn base_command(&self) -> Command {
        let user_agent = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let mut command = Command::new(&self.program);
        command
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--retries")
            .arg(RETRIES)
            .arg("--extractor-retries")
            .arg(RETRIES)
            .arg("--fragment-retries")
            .arg(RETRIES)
            .arg("--socket-timeout")
            .arg(SOCKET_TIMEOUT_SECS)
            .arg("--user-agent")
            .arg(user_agent)
            .arg("--extractor-args")
            .arg(EXTRACTOR_ARGS);
        command
    }

    fn fetch_info(&self, url: &str) -> Result<VideoInfo, FetchError> {
        let mut command = self.base_command();
        command
            .arg("--dump-single-json")
            .arg("--skip-download")
            .arg("--flat-playlist")
            .arg(url);
        let stdout = run_with_timeout(command, self.timeout, &self.program)?;
        serde_json::from_str(&stdout).map_err(|err| FetchError::Parse(err.to_string()))
    }

    /// Direct stream URL for the same input. Any failure simply means "none".
    fn stream_url(&self, url: &str) -> Option<String> {
        let mut command = self.base_command();
        command.arg("--get-url").arg("-f").arg(STREAM_FORMAT).arg(url);
        match run_with_timeout(command, self.timeout, &self.program) {
            Ok(stdout) => stdout
                .lines()
                .map(str::trim)
                .find(|line| line.starts_with("http"))
                .map(str::to_owned),
            Err(err) => {
                debug!(url, error = %err, "direct stream URL unavailable");
                None
            }
        }
    }
}

impl MetadataFetcher for YtDlpFetcher {
    fn mode(&self) -> BackendMode {
        BackendMode::Fallback
    }

    fn fetch(&self, request: &FetchRequest<'_>) -> Result<CanonicalRecord, FetchError> {
        let url = request.source_url;
        let info = self.fetch_info(url).inspect_err(|err| {
            warn!(url, error = %err, "yt-dlp metadata lookup failed");
        })?;
        if info.is_collection() {
            return Err(FetchError::NotFound(url.to_owned()));
        }
        let Some(video_id) = info.id.clone().filter(|id| !id.is_empty()) else {
            return Err(FetchError::NotFound(url.to_owned()));
        };

        let dislikes = self.dislikes.dislikes(&video_id);
        let download_url = if self.resolve_download_urls {
            self.stream_url(url)
        } else {
            None
        };
        Ok(normalize(map_info(info, video_id, url, dislikes, download_url)))
    }
}

fn map_info(
    info: VideoInfo,
    video_id: String,
    source_url: &str,
    dislikes: u64,
    download_url: Option<String>,
) -> RawMetadata {
    let count = |value: Option<i64>| value.unwrap_or(0).max(0) as u64;
    let upload_date = info.upload_date.as_deref().and_then(parse_compact_date);
    let upload_time = upload_date
        .and(info.timestamp.or(info.release_timestamp))
        .and_then(time_of_timestamp);
    let duration_seconds = info
        .duration
        .filter(|seconds| seconds.is_finite() && *seconds >= 1.0)
        .map(|seconds| seconds.trunc() as u64);
    let category = info
        .categories
        .as_ref()
        .and_then(|categories| categories.first())
        .cloned()
        .unwrap_or_else(|| OTHER_CATEGORY.to_owned());

    RawMetadata {
        identifier: video_id,
        title: info.title.or(info.fulltitle).unwrap_or_default(),
        description: info.description.unwrap_or_default(),
        upload_date,
        upload_time,
        duration_seconds,
        view_count: count(info.view_count),
        like_count: count(info.like_count),
        dislike_count: dislikes,
        comment_count: count(info.comment_count),
        channel_name: info.uploader.or(info.channel).unwrap_or_default(),
        channel_id: info.channel_id,
        // Scraped metadata has no trustworthy locale.
        country: UNKNOWN.to_owned(),
        category,
        thumbnail_url: info.thumbnail,
        source_url: source_url.to_owned(),
        download_url,
    }
}

/// Runs the command, collecting stdout, and kills it once `timeout` passes.
/// Output is drained on helper threads so a chatty child never blocks on a
/// full pipe while we poll.
fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
    program: &Path,
) -> Result<String, FetchError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| FetchError::Process(format!("spawning {}: {err}", program.display())))?;

    let stdout_reader = child.stdout.take().map(|mut out| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = out.read_to_end(&mut buf);
            buf
        })
    });
    let stderr_reader = child.stderr.take().map(|mut err| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = err.read_to_end(&mut buf);
            buf
        })
    });

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                // Readers are detached, not joined: a grandchild may still hold the pipes.
                drop(stdout_reader);
                drop(stderr_reader);
                return Err(FetchError::Process(format!(
                    "timed out after {}s",
                    timeout.as_secs_f64()
                )));
            }
            Ok(None) => thread::sleep(POLL_INTERVAL),
            Err(err) => return Err(FetchError::Process(err.to_string())),
        }
    };

    let stdout = stdout_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    let stderr = stderr_reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();

    if !status.success() {
        let message = String::from_utf8_lossy(&stderr);
        let last_line = message.lines().rev().find(|line| !line.trim().is_empty());
        return Err(FetchError::Process(format!(
            "exit status {status}: {}",
            last_line.unwrap_or("no output")
        )));
    }
    String::from_utf8(stdout).map_err(|err| FetchError::Parse(err.to_string()))
}
