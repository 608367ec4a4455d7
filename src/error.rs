use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("failed to run git: {0}")]
    Spawn(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git status exited with {code}: {stderr}")]
    Failed { code: String, stderr: String },

    #[error("git status did not finish within {0:?}")]
    Timeout(Duration),
}

pub type Result<T> = std::result::Result<T, StatusError>;
