// API client module: a small blocking HTTP client for the api.video
// endpoints used by the uploader. The `VideoApi` trait is the seam the
// uploader talks to, so tests can swap the network out.

use std::time::Duration;

use chrono::{DateTime, Local};
use log::{debug, warn};
use reqwest::blocking::{multipart, Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_RANGE};
use serde::{Deserialize, Serialize};

use crate::chunk::Chunk;
use crate::errors::{ApiError, ApiResult};

pub const DEFAULT_BASE_URL: &str = "https://ws.api.video";
pub const AUTH_PATH: &str = "/auth/api-key";
pub const VIDEOS_PATH: &str = "/videos";

const TITLE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server-assigned identifier of a video container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoId(pub String);

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token plus the lifetime the server advertised for it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Option<Duration>,
}

impl AccessToken {
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Payload for the container creation endpoint.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
}

impl NewVideo {
    /// Title and description stamped with `now`.
    pub fn stamped(prefix: &str, now: DateTime<Local>) -> Self {
        let stamp = now.format(TITLE_TIME_FORMAT);
        NewVideo {
            title: format!("{} {}", prefix, stamp),
            description: format!("{} captured at {}", prefix, stamp),
        }
    }
}

#[derive(Serialize, Debug)]
struct AuthRequest<'a> {
    #[serde(rename = "apiKey")]
    api_key: &'a str,
}

#[derive(Deserialize, Debug)]
struct AuthResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct CreateVideoResponse {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// The three calls an upload needs.
pub trait VideoApi {
    /// Exchange the API key for a bearer token.
    fn authenticate(&self) -> ApiResult<AccessToken>;

    /// Create an empty video container.
    fn create_video(&self, token: &str, video: &NewVideo) -> ApiResult<VideoId>;

    /// Send one chunk of the source file to the container.
    fn upload_chunk(
        &self,
        token: &str,
        video_id: &VideoId,
        file_name: &str,
        chunk: Chunk,
    ) -> ApiResult<()>;
}

/// Blocking api.video client holding the HTTP client, base URL and API key.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ApiClient {
    /// Build a client. `timeout` of `None` means requests may block forever.
    pub fn new(base_url: &str, api_key: &str, timeout: Option<Duration>) -> ApiResult<Self> {
        // blocking clients default to a 30s timeout, so always set it explicitly
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload endpoint for one container.
    pub fn source_url(&self, video_id: &VideoId) -> String {
        self.url(&source_path(video_id))
    }

    fn auth_headers(token: &str) -> ApiResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, bearer_value(token)?);
        Ok(headers)
    }
}

impl VideoApi for ApiClient {
    fn authenticate(&self) -> ApiResult<AccessToken> {
        let res = self
            .client
            .post(self.url(AUTH_PATH))
            .header(ACCEPT, "application/json")
            .json(&AuthRequest {
                api_key: &self.api_key,
            })
            .send()?;

        let status = res.status();
        let body = res.text()?;
        if !status.is_success() {
            warn!("{} answered {}", AUTH_PATH, status);
        }
        parse_auth_response(&body)
    }

    fn create_video(&self, token: &str, video: &NewVideo) -> ApiResult<VideoId> {
        let res = self
            .client
            .post(self.url(VIDEOS_PATH))
            .headers(Self::auth_headers(token)?)
            .json(video)
            .send()?;

        let body = success_body(VIDEOS_PATH, res)?;
        parse_video_id(&body)
    }

    fn upload_chunk(
        &self,
        token: &str,
        video_id: &VideoId,
        file_name: &str,
        chunk: Chunk,
    ) -> ApiResult<()> {
        let path = source_path(video_id);
        let content_range = chunk.range.header_value();
        let mut headers = Self::auth_headers(token)?;
        headers.insert(
            CONTENT_RANGE,
            HeaderValue::from_str(&content_range).map_err(|_| ApiError::InvalidHeader {
                name: CONTENT_RANGE.to_string(),
            })?,
        );

        let part = multipart::Part::bytes(chunk.data).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);

        debug!("POST {} ({})", path, content_range);
        let res = self
            .client
            .post(self.url(&path))
            .headers(headers)
            .multipart(form)
            .send()?;

        success_body(&path, res)?;
        Ok(())
    }
}

fn source_path(video_id: &VideoId) -> String {
    format!("{}/{}/source", VIDEOS_PATH, video_id)
}

fn bearer_value(token: &str) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|_| ApiError::InvalidHeader {
        name: AUTHORIZATION.to_string(),
    })
}

/// Body of a 2xx response, or a `Status` error carrying the body text.
fn success_body(endpoint: &str, res: Response) -> ApiResult<String> {
    let status = res.status();
    let txt = res.text().unwrap_or_else(|_| "".into());
    if !status.is_success() {
        return Err(ApiError::status(endpoint, status.as_u16(), txt));
    }
    Ok(txt)
}

/// Reads `access_token` from an auth response. A missing token is not an
/// error here: it yields an empty token that the server will reject later.
pub fn parse_auth_response(body: &str) -> ApiResult<AccessToken> {
    let resp: AuthResponse = serde_json::from_str(body)?;
    let value = match resp.access_token {
        Some(t) => t,
        None => {
            warn!("Auth response has no access_token; requests will be unauthorized");
            String::new()
        }
    };
    Ok(AccessToken {
        value,
        expires_in: resp.expires_in.map(Duration::from_secs),
    })
}

pub fn parse_video_id(body: &str) -> ApiResult<VideoId> {
    let resp: CreateVideoResponse = serde_json::from_str(body)?;
    resp.video_id
        .filter(|id| !id.is_empty())
        .map(VideoId)
        .ok_or_else(|| ApiError::missing_field(VIDEOS_PATH, "videoId"))
}
