// Shared helpers: a recording stand-in for the api.video client and
// scratch files under the system temp directory.
#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use apivideo_drop::api::{AccessToken, NewVideo, VideoApi, VideoId};
use apivideo_drop::chunk::Chunk;
use apivideo_drop::errors::{ApiError, ApiResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Auth,
    Create {
        token: String,
        title: String,
    },
    Chunk {
        token: String,
        video_id: String,
        file_name: String,
        content_range: String,
        len: usize,
    },
}

/// Behaves like the service: empty tokens are rejected with 401.
#[derive(Default)]
pub struct FakeApi {
    pub calls: RefCell<Vec<Call>>,
    /// Auth responses carry no access_token.
    pub omit_token: bool,
    /// Create responses carry no videoId.
    pub omit_video_id: bool,
    /// Zero-based chunk indices that fail at the transport level.
    pub failing_chunks: Vec<usize>,
    pub auth_count: RefCell<u32>,
    pub chunk_count: RefCell<usize>,
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn auth_calls(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Auth).count()
    }

    pub fn create_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    pub fn chunk_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Chunk { .. }))
            .collect()
    }

    pub fn content_ranges(&self) -> Vec<String> {
        self.chunk_calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Chunk { content_range, .. } => Some(content_range),
                _ => None,
            })
            .collect()
    }
}

impl VideoApi for FakeApi {
    fn authenticate(&self) -> ApiResult<AccessToken> {
        self.calls.borrow_mut().push(Call::Auth);
        *self.auth_count.borrow_mut() += 1;
        let value = if self.omit_token {
            String::new()
        } else {
            format!("token-{}", self.auth_count.borrow())
        };
        Ok(AccessToken {
            value,
            expires_in: Some(std::time::Duration::from_secs(3600)),
        })
    }

    fn create_video(&self, token: &str, video: &NewVideo) -> ApiResult<VideoId> {
        self.calls.borrow_mut().push(Call::Create {
            token: token.to_string(),
            title: video.title.clone(),
        });
        if token.is_empty() {
            return Err(ApiError::status("/videos", 401, "Unauthorized".into()));
        }
        if self.omit_video_id {
            return Err(ApiError::missing_field("/videos", "videoId"));
        }
        Ok(VideoId("vi-test".into()))
    }

    fn upload_chunk(
        &self,
        token: &str,
        video_id: &VideoId,
        file_name: &str,
        chunk: Chunk,
    ) -> ApiResult<()> {
        let index = *self.chunk_count.borrow();
        *self.chunk_count.borrow_mut() += 1;
        self.calls.borrow_mut().push(Call::Chunk {
            token: token.to_string(),
            video_id: video_id.0.clone(),
            file_name: file_name.to_string(),
            content_range: chunk.range.header_value(),
            len: chunk.data.len(),
        });
        if self.failing_chunks.contains(&index) {
            return Err(transport_error());
        }
        Ok(())
    }
}

/// A genuine reqwest error that never touches the network.
pub fn transport_error() -> ApiError {
    match reqwest::blocking::get("http://[::1") {
        Err(e) => ApiError::Network(e),
        Ok(_) => unreachable!("malformed URL was accepted"),
    }
}

/// Unique scratch path for this test process.
pub fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("apivideo-drop-{}-{}", std::process::id(), name))
}

/// Write `len` patterned bytes to a fresh scratch file.
pub fn scratch_file(name: &str, len: usize) -> PathBuf {
    let path = scratch_path(name);
    let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    fs::write(&path, data).unwrap();
    path
}
