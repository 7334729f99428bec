use std::path::PathBuf;

use thiserror::Error;

/// A failed call against the backing data store (remote or local fallback).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn transport(action: &str, err: impl std::fmt::Display) -> Self {
        Self::new(format!("{action} failed: {err}"))
    }

    pub fn status(action: &str, status: u16, body: &str) -> Self {
        let detail = extract_message(body).unwrap_or_else(|| body.trim().to_string());
        if detail.is_empty() {
            Self::new(format!("{action} returned HTTP {status}"))
        } else {
            Self::new(format!("{action} returned HTTP {status}: {detail}"))
        }
    }

    pub fn decode(action: &str, err: impl std::fmt::Display) -> Self {
        Self::new(format!("Failed to decode {action} response: {err}"))
    }

    pub fn local(err: impl std::fmt::Display) -> Self {
        Self::new(format!("Local store error: {err}"))
    }
}

impl From<anyhow::Error> for RemoteError {
    fn from(err: anyhow::Error) -> Self {
        Self::local(format!("{err:#}"))
    }
}

/// PostgREST error bodies look like `{"message": "...", "code": "..."}`.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .and_then(|message| message.as_str())
        .map(|message| message.to_string())
}

/// Terminal failure of a store operation. Local state is untouched whenever one is returned.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Failed to serialize export: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to write export to {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Page {page} is out of range (last page is {total_pages})")]
    PageOutOfRange { page: u32, total_pages: u32 },

    #[error("Pages start at 1")]
    InvalidPage,

    #[error("{0}")]
    InvalidInput(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
