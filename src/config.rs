use anyhow::{Context, Result, bail};
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONFIG_PATH: &str = "tube-analyzer.env";
pub const API_KEY_ENV_VAR: &str = "YOUTUBE_API_KEY";
pub const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_DISLIKE_API_BASE: &str = "https://returnyoutubedislikeapi.com";
pub const DEFAULT_YTDLP_BIN: &str = "yt-dlp";
pub const DEFAULT_PACING_MIN_SECS: f64 = 5.0;
pub const DEFAULT_PACING_MAX_SECS: f64 = 7.0;
pub const DEFAULT_YTDLP_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// Values as they appear in the persisted key/value file. Every field is
/// optional so a partial file still loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub dislike_api_base: Option<String>,
    pub ytdlp_bin: Option<PathBuf>,
    pub resolve_download_urls: Option<bool>,
    pub pacing_min_secs: Option<f64>,
    pub pacing_max_secs: Option<f64>,
    pub ytdlp_timeout_secs: Option<u64>,
}

/// Resolved settings handed to the analyzer. The pipeline never reads files
/// or the environment on its own.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub dislike_api_base: String,
    pub ytdlp_bin: PathBuf,
    pub resolve_download_urls: bool,
    pub pacing_min: Duration,
    pub pacing_max: Duration,
    pub ytdlp_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            dislike_api_base: DEFAULT_DISLIKE_API_BASE.to_string(),
            ytdlp_bin: PathBuf::from(DEFAULT_YTDLP_BIN),
            resolve_download_urls: true,
            pacing_min: Duration::from_secs_f64(DEFAULT_PACING_MIN_SECS),
            pacing_max: Duration::from_secs_f64(DEFAULT_PACING_MAX_SECS),
            ytdlp_timeout: Duration::from_secs(DEFAULT_YTDLP_TIMEOUT_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl AnalyzerSettings {
    /// Layers file values over the defaults.
    pub fn from_env_config(cfg: &EnvConfig) -> Result<Self> {
        let defaults = Self::default();
        let pacing_min_secs = cfg.pacing_min_secs.unwrap_or(DEFAULT_PACING_MIN_SECS);
        let pacing_max_secs = cfg.pacing_max_secs.unwrap_or(DEFAULT_PACING_MAX_SECS);
        if !(0.0..=pacing_max_secs).contains(&pacing_min_secs) {
            bail!(
                "PACING_MIN_SECS ({pacing_min_secs}) must be between 0 and PACING_MAX_SECS ({pacing_max_secs})"
            );
        }
        let pacing_min = Duration::try_from_secs_f64(pacing_min_secs)
            .with_context(|| format!("PACING_MIN_SECS ({pacing_min_secs}) is not a usable duration"))?;
        let pacing_max = Duration::try_from_secs_f64(pacing_max_secs)
            .with_context(|| format!("PACING_MAX_SECS ({pacing_max_secs}) is not a usable duration"))?;

        Ok(Self {
            api_key: cfg.api_key.clone().filter(|key| !key.trim().is_empty()),
            api_base: cfg.api_base.clone().unwrap_or(defaults.api_base),
            dislike_api_base: cfg
                .dislike_api_base
                .clone()
                .unwrap_or(defaults.dislike_api_base),
            ytdlp_bin: cfg.ytdlp_bin.clone().unwrap_or(defaults.ytdlp_bin),
            resolve_download_urls: cfg
                .resolve_download_urls
                .unwrap_or(defaults.resolve_download_urls),
            pacing_min,
            pacing_max,
            ytdlp_timeout: cfg
                .ytdlp_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.ytdlp_timeout),
            request_timeout: defaults.request_timeout,
        })
    }

    /// Non-blank credential, if any.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key.trim() {
                "API_KEY" => {
                    if !value.is_empty() {
                        cfg.api_key = Some(value.to_string());
                    }
                }
                "YOUTUBE_API_BASE" => cfg.api_base = Some(value.trim_end_matches('/').to_string()),
                "DISLIKE_API_BASE" => {
                    cfg.dislike_api_base = Some(value.trim_end_matches('/').to_string())
                }
                "YTDLP_BIN" => cfg.ytdlp_bin = Some(PathBuf::from(value)),
                "RESOLVE_DOWNLOAD_URLS" => {
                    cfg.resolve_download_urls = Some(parse_bool(value).with_context(|| {
                        format!("Parsing RESOLVE_DOWNLOAD_URLS from {}", path.display())
                    })?);
                }
                "PACING_MIN_SECS" => {
                    let secs: f64 = value.parse().with_context(|| {
                        format!("Parsing PACING_MIN_SECS from {}", path.display())
                    })?;
                    cfg.pacing_min_secs = Some(secs);
                }
                "PACING_MAX_SECS" => {
                    let secs: f64 = value.parse().with_context(|| {
                        format!("Parsing PACING_MAX_SECS from {}", path.display())
                    })?;
                    cfg.pacing_max_secs = Some(secs);
                }
                "YTDLP_TIMEOUT_SECS" => {
                    let secs: u64 = value.parse().with_context(|| {
                        format!("Parsing YTDLP_TIMEOUT_SECS from {}", path.display())
                    })?;
                    cfg.ytdlp_timeout_secs = Some(secs);
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn write_env_config(path: &Path, cfg: &EnvConfig) -> Result<()> {
    let mut content = String::from("# tube-analyzer settings\n");
    let mut push = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            content.push_str(&format!("{key}=\"{value}\"\n"));
        }
    };
    push("API_KEY", cfg.api_key.clone());
    push("YOUTUBE_API_BASE", cfg.api_base.clone());
    push("DISLIKE_API_BASE", cfg.dislike_api_base.clone());
    push(
        "YTDLP_BIN",
        cfg.ytdlp_bin.as_ref().map(|p| p.display().to_string()),
    );
    push(
        "RESOLVE_DOWNLOAD_URLS",
        cfg.resolve_download_urls.map(|v| v.to_string()),
    );
    push("PACING_MIN_SECS", cfg.pacing_min_secs.map(|v| v.to_string()));
    push("PACING_MAX_SECS", cfg.pacing_max_secs.map(|v| v.to_string()));
    push(
        "YTDLP_TIMEOUT_SECS",
        cfg.ytdlp_timeout_secs.map(|v| v.to_string()),
    );

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Writing {}", path.display()))
}

/// Stores the credential under `API_KEY`, keeping every other setting.
pub fn save_api_key(path: &Path, api_key: &str) -> Result<()> {
    let key = api_key.trim();
    if key.is_empty() {
        bail!("refusing to save an empty API key");
    }
    let mut cfg = read_env_config(path)?.unwrap_or_default();
    cfg.api_key = Some(key.to_string());
    write_env_config(path, &cfg)
}

/// Defaults, then the file (if present), then `YOUTUBE_API_KEY`.
pub fn load_settings_from(path: impl AsRef<Path>) -> Result<AnalyzerSettings> {
    let path = path.as_ref();
    let cfg = read_env_config(path)?.unwrap_or_default();
    let mut settings = AnalyzerSettings::from_env_config(&cfg)?;
    if let Ok(key) = env::var(API_KEY_ENV_VAR)
        && !key.trim().is_empty()
    {
        settings.api_key = Some(key.trim().to_string());
    }
    Ok(settings)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}
