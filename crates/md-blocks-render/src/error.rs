use std::io;

use md_blocks::StreamInconsistency;

/// Pipeline related errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("stream error: {0}")]
    Stream(#[from] StreamInconsistency),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}
