//! FFmpeg-based thumbnail extraction.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::debug;

use super::error::TranscodeError;
use super::traits::Transcoder;
use crate::config::TranscoderConfig;

/// Grabs one frame of a remote video with ffmpeg and writes it as WebP.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds ffmpeg arguments for a single-frame extraction.
    fn build_args(&self, source_url: &str, dest: &Path) -> Vec<String> {
        vec![
            "-y".to_string(), // Overwrite output
            // Seeking before -i jumps on the input side, without decoding up to it
            "-ss".to_string(),
            self.config.seek.clone(),
            "-i".to_string(),
            source_url.to_string(),
            "-vf".to_string(),
            format!("scale={}:-1", self.config.width),
            "-update".to_string(),
            "1".to_string(),
            "-frames:v".to_string(),
            "1".to_string(),
            "-map_metadata".to_string(),
            "-1".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            dest.to_string_lossy().to_string(),
        ]
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn transcode(&self, source_url: &str, dest: &Path) -> Result<PathBuf, TranscodeError> {
        let start = Instant::now();

        // Ensure output directory exists
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|_| {
                TranscodeError::OutputDirectoryFailed {
                    path: parent.to_path_buf(),
                }
            })?;
        }

        let args = self.build_args(source_url, dest);
        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| TranscodeError::failed("ffmpeg stderr was not captured", None))?;
        let mut reader = BufReader::new(stderr).lines();

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let result = timeout(timeout_duration, async {
            let mut error_output = String::new();
            while let Ok(Some(line)) = reader.next_line().await {
                error_output.push_str(&line);
                error_output.push('\n');
            }

            let status = child.wait().await?;
            Ok::<(std::process::ExitStatus, String), std::io::Error>((status, error_output))
        })
        .await;

        match result {
            Ok(Ok((status, error_output))) => {
                if !status.success() {
                    return Err(TranscodeError::failed(
                        format!("FFmpeg exited with code: {:?}", status.code()),
                        if error_output.is_empty() {
                            None
                        } else {
                            Some(error_output)
                        },
                    ));
                }
            }
            Ok(Err(e)) => return Err(TranscodeError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                return Err(TranscodeError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        }

        // ffmpeg exits 0 without writing anything when the seek lands past the end
        tokio::fs::metadata(dest)
            .await
            .map_err(|_| TranscodeError::failed("Output file not created", None))?;

        debug!(
            "Extracted frame of {} into {} in {} ms",
            source_url,
            dest.display(),
            start.elapsed().as_millis()
        );

        Ok(dest.to_path_buf())
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscodeError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(TranscodeError::Io(e));
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        Ok(())
    }
}
