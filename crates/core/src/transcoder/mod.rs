//! Transcoder module for extracting thumbnail frames.
//!
//! This module provides the `Transcoder` trait the worker pool calls and an
//! FFmpeg implementation that grabs a single frame from a remote media URL.
//!
//! # Example
//!
//! ```ignore
//! use soda_core::transcoder::{FfmpegTranscoder, Transcoder};
//!
//! let transcoder = FfmpegTranscoder::new(config.transcoder.clone());
//! transcoder.validate().await?;
//!
//! let image = transcoder
//!     .transcode("http://host/video.mp4", Path::new("./thumbnails/abc123.webp"))
//!     .await?;
//! ```

mod error;
mod ffmpeg;
mod traits;

pub use error::TranscodeError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
