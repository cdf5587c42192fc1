//! Types for the scraper module.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while scraping a listing.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server answered HTTP {0}")]
    Status(u16),
}

/// A listing to scrape, with optional basic-auth credentials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ScrapeRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Credentials, when both parts are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Broad category of a listed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Document,
    Others,
}

impl MediaType {
    /// Classifies a lowercase extension (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "jpg" | "jpeg" | "png" | "webp" | "gif" | "heif" => Self::Image,
            "mp4" | "mkv" | "avi" | "mov" | "wmv" | "flv" | "webm" | "qt" | "m4v" | "ogg" => {
                Self::Video
            }
            "mp3" | "wav" | "aiff" | "aa" | "aax" | "flac" | "m4a" => Self::Audio,
            "pdf" | "txt" | "rtf" | "xls" | "ppt" | "doc" | "docx" | "xlsx" => Self::Document,
            _ => Self::Others,
        }
    }
}

/// A file link found in a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub media: MediaType,
    pub filename: String,
}

/// Folders and files of one listing page, in page order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contents {
    pub folders: Vec<String>,
    pub files: Vec<FileEntry>,
}

impl Contents {
    /// Files a link into folders or files by whether it has an extension.
    pub fn push_link(&mut self, link: String) {
        match link_extension(&link) {
            Some(ext) => self.files.push(FileEntry {
                media: MediaType::from_extension(&ext),
                filename: link,
            }),
            None => self.folders.push(link),
        }
    }
}

/// Extension of the last path segment, lowercased. `dir/` and `../` have none.
fn link_extension(link: &str) -> Option<String> {
    let segment = link.rsplit('/').next().unwrap_or(link);
    segment
        .rfind('.')
        .map(|dot| segment[dot + 1..].to_ascii_lowercase())
}
