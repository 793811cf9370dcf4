use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Invalid store key: {0:?}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Failed reading response body: {0}")]
    Body(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("Playback rejected: {0}")]
    PlaybackRejected(String),

    #[error("Fullscreen unavailable: {0}")]
    Fullscreen(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
pub type FetchResult<T> = Result<T, FetchError>;
