// Runtime configuration: command line arguments with environment fallbacks,
// validated into a `Config` the rest of the crate consumes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use log::warn;

use crate::api::DEFAULT_BASE_URL;
use crate::auth::{TokenPolicy, DEFAULT_TOKEN_TTL};
use crate::chunk::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};

/// Watch a directory and upload every new video file to api.video.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Cli {
    /// Directory to watch, recursively
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// api.video API key
    #[arg(long, env = "API_VIDEO_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Base URL of the api.video web service
    #[arg(long, env = "API_VIDEO_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Bytes sent per upload request
    #[arg(long, env = "API_VIDEO_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Reuse access tokens until they expire instead of fetching one per request
    #[arg(long, env = "API_VIDEO_CACHE_TOKEN")]
    pub cache_token: bool,

    /// Token lifetime assumed when the auth response does not state one
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL.as_secs())]
    pub token_ttl_secs: u64,

    /// Prefix for the title and description of created videos
    #[arg(long, default_value = "Video")]
    pub title_prefix: String,

    /// Per-request timeout; requests never time out when unset
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Do not draw upload progress bars
    #[arg(long)]
    pub no_progress: bool,
}

/// Settings that shape a single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderConfig {
    pub chunk_size: usize,
    pub title_prefix: String,
    pub show_progress: bool,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            title_prefix: "Video".to_string(),
            show_progress: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    pub api_key: String,
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub token_policy: TokenPolicy,
    pub uploader: UploaderConfig,
}

impl Config {
    pub fn from_cli(cli: Cli) -> Result<Self> {
        if cli.api_key.trim().is_empty() {
            bail!("API_VIDEO_API_KEY must not be empty");
        }
        if cli.chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if cli.chunk_size < MIN_CHUNK_SIZE {
            warn!(
                "Chunk size {} is below the {} byte minimum api.video accepts for non-final chunks",
                cli.chunk_size, MIN_CHUNK_SIZE
            );
        }
        if cli.timeout_secs == Some(0) {
            bail!("timeout must be greater than zero");
        }

        let token_policy = if cli.cache_token {
            TokenPolicy::ReuseUntilExpiry {
                default_ttl: Duration::from_secs(cli.token_ttl_secs),
            }
        } else {
            TokenPolicy::AlwaysRefresh
        };

        Ok(Config {
            root: cli.root,
            api_key: cli.api_key,
            base_url: cli.base_url,
            timeout: cli.timeout_secs.map(Duration::from_secs),
            token_policy,
            uploader: UploaderConfig {
                chunk_size: cli.chunk_size,
                title_prefix: cli.title_prefix,
                show_progress: !cli.no_progress,
            },
        })
    }
}
