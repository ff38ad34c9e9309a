// Uploader: turns one created file into a video on api.video.
//
// classify -> create container -> chunk loop -> report. Every chunk is
// sent once; failed chunks are recorded and the loop moves on.

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, log, warn, Level};
use mime_guess::{mime, MimeGuess};

use crate::api::{NewVideo, VideoApi, VideoId};
use crate::auth::CredentialProvider;
use crate::chunk::{ByteRange, ChunkReader};
use crate::config::UploaderConfig;
use crate::errors::{UploadError, UploadResult};
use crate::watcher::CreatedFileHandler;

/// True when the file name maps to a `video/*` media type.
pub fn classify(path: &Path) -> bool {
    MimeGuess::from_path(path)
        .first()
        .map(|m| m.type_() == mime::VIDEO)
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    Sent,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOutcome {
    pub range: ByteRange,
    pub status: ChunkStatus,
}

impl ChunkOutcome {
    pub fn is_sent(&self) -> bool {
        self.status == ChunkStatus::Sent
    }
}

/// What happened to each chunk of one file.
#[derive(Debug, Clone)]
pub struct UploadReport {
    pub path: PathBuf,
    pub video_id: VideoId,
    pub total_bytes: u64,
    pub chunks: Vec<ChunkOutcome>,
}

impl UploadReport {
    fn new(path: &Path, video_id: VideoId, total_bytes: u64) -> Self {
        UploadReport {
            path: path.to_path_buf(),
            video_id,
            total_bytes,
            chunks: Vec::new(),
        }
    }

    fn record(&mut self, range: ByteRange, status: ChunkStatus) {
        self.chunks.push(ChunkOutcome { range, status });
    }

    pub fn failed_chunks(&self) -> impl Iterator<Item = &ChunkOutcome> {
        self.chunks.iter().filter(|c| !c.is_sent())
    }

    /// Bytes the server acknowledged.
    pub fn bytes_sent(&self) -> u64 {
        self.chunks
            .iter()
            .filter(|c| c.is_sent())
            .map(|c| c.range.size())
            .sum()
    }

    /// Every byte of the file went out in an accepted chunk.
    pub fn is_complete(&self) -> bool {
        self.failed_chunks().next().is_none() && self.bytes_sent() == self.total_bytes
    }
}

#[derive(Debug, Clone)]
pub enum UploadOutcome {
    Skipped { reason: String },
    Uploaded(UploadReport),
}

pub struct Uploader<A: VideoApi> {
    api: A,
    credentials: Box<dyn CredentialProvider>,
    config: UploaderConfig,
}

impl<A: VideoApi> Uploader<A> {
    pub fn new(
        api: A,
        credentials: impl CredentialProvider + 'static,
        config: UploaderConfig,
    ) -> Self {
        Uploader {
            api,
            credentials: Box::new(credentials),
            config,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn bearer_token(&mut self) -> UploadResult<String> {
        self.credentials
            .bearer_token(&self.api)
            .map_err(UploadError::Auth)
    }

    /// Upload `path` if it is a video. Only authentication, container
    /// creation and local I/O abort the upload; chunk failures end up in
    /// the report.
    pub fn upload(&mut self, path: &Path) -> UploadResult<UploadOutcome> {
        let display = path.display().to_string();

        if !classify(path) {
            debug!("Skipping non video file {}", display);
            return Ok(UploadOutcome::Skipped {
                reason: format!("{} is not a video", display),
            });
        }

        info!("Uploading {} to api.video", display);

        let file = File::open(path).map_err(|e| UploadError::io(&display, e))?;
        let total = file
            .metadata()
            .map_err(|e| UploadError::io(&display, e))?
            .len();
        info!("{} {:.2} MB", display, total as f64 / 1024.0 / 1024.0);

        let token = self.bearer_token()?;
        let video = NewVideo::stamped(&self.config.title_prefix, Local::now());
        let video_id = match self.api.create_video(&token, &video) {
            Ok(id) => id,
            Err(e) => {
                if e.is_unauthorized() {
                    self.credentials.invalidate();
                }
                return Err(UploadError::CreateVideo(e));
            }
        };
        debug!("Created container {} for {}", video_id, display);

        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let mut report = UploadReport::new(path, video_id.clone(), total);
        let progress = self.progress_bar(total, &file_name);

        for chunk in ChunkReader::new(file, total, self.config.chunk_size) {
            let chunk = chunk.map_err(|e| UploadError::io(&display, e))?;
            let range = chunk.range;
            let token = self.bearer_token()?;

            match self.api.upload_chunk(&token, &video_id, &file_name, chunk) {
                Ok(()) => report.record(range, ChunkStatus::Sent),
                Err(e) => {
                    error!("{} of {} failed: {}", range, display, e);
                    if e.is_unauthorized() {
                        self.credentials.invalidate();
                    }
                    report.record(
                        range,
                        ChunkStatus::Failed {
                            reason: e.to_string(),
                        },
                    );
                }
            }
            progress.inc(range.size());
        }
        progress.finish_and_clear();

        if total == 0 {
            warn!("{} is empty, video {} has no source", display, video_id);
        }
        info!("Finished uploading {} to api.video as {}", display, video_id);
        if !report.is_complete() {
            warn!(
                "{}: {} of {} chunks failed, {} of {} bytes sent",
                display,
                report.failed_chunks().count(),
                report.chunks.len(),
                report.bytes_sent(),
                total
            );
        }

        Ok(UploadOutcome::Uploaded(report))
    }

    fn progress_bar(&self, total: u64, name: &str) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) =
            ProgressStyle::with_template("{msg} [{bar:30}] {bytes}/{total_bytes} ({eta})")
        {
            pb.set_style(style);
        }
        pb.set_message(name.to_string());
        pb
    }
}

/// Permanent failures need someone to act; transient ones may clear up.
fn failure_level(e: &UploadError) -> Level {
    if e.is_permanent() {
        Level::Error
    } else {
        Level::Warn
    }
}

impl<A: VideoApi> CreatedFileHandler for Uploader<A> {
    fn handle_created(&mut self, path: &Path) {
        if let Err(e) = self.upload(path) {
            log!(
                failure_level(&e),
                "Upload of {} failed{}: {}",
                path.display(),
                if e.is_permanent() { " for good" } else { "" },
                e
            );
        }
    }
}
