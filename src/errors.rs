use thiserror::Error;

/// Failures talking to the video hosting API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Response from {endpoint} is missing `{field}`")]
    MissingField { endpoint: String, field: String },

    #[error("Invalid header value for {name}")]
    InvalidHeader { name: String },
}

impl ApiError {
    pub fn status(endpoint: &str, status: u16, body: String) -> Self {
        Self::Status {
            endpoint: endpoint.to_string(),
            status,
            body,
        }
    }

    pub fn missing_field(endpoint: &str, field: &str) -> Self {
        Self::MissingField {
            endpoint: endpoint.to_string(),
            field: field.to_string(),
        }
    }

    /// True when the server rejected the credentials of the request.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }
}

/// Failures that abort a single file upload.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Authentication failed: {0}")]
    Auth(#[source] ApiError),

    #[error("Could not create video container: {0}")]
    CreateVideo(#[source] ApiError),
}

impl UploadError {
    pub fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }

    /// Errors that will recur for the same file and credentials.
    pub fn is_permanent(&self) -> bool {
        match self {
            UploadError::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ),
            UploadError::Auth(e) | UploadError::CreateVideo(e) => {
                e.is_unauthorized() || matches!(e, ApiError::MissingField { .. })
            }
        }
    }
}

/// Failures setting up the directory watch.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Watch root does not exist: {path}")]
    MissingRoot { path: String },
}

pub type ApiResult<T> = Result<T, ApiError>;
pub type UploadResult<T> = Result<T, UploadError>;
