//! External-command camera adapter

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::application::ports::{Camera, CameraError};
use crate::domain::capture::CapturedImage;

/// Grab one JPEG frame from the first V4L2 device, written to stdout
const DEFAULT_COMMAND: &[&str] = &[
    "ffmpeg",
    "-hide_banner",
    "-loglevel",
    "error",
    "-f",
    "v4l2",
    "-i",
    "/dev/video0",
    "-frames:v",
    "1",
    "-q:v",
    "5",
    "-f",
    "mjpeg",
    "-",
];

/// Camera that runs a capture command and takes its stdout as the image.
///
/// The command line is split on whitespace; no shell is involved.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
}

impl CommandCamera {
    /// Parse a command line such as `libcamera-still -n -o -`
    pub fn from_command_line(command_line: &str) -> Result<Self, CameraError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| CameraError::Unavailable("camera command is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandCamera {
    fn default() -> Self {
        Self {
            program: DEFAULT_COMMAND[0].to_string(),
            args: DEFAULT_COMMAND[1..].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn take_picture(&self) -> Result<Option<CapturedImage>, CameraError> {
        debug!(program = %self.program, "running capture command");
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CameraError::Unavailable(format!("{} not found", self.program))
                } else {
                    CameraError::CaptureFailed(e.to_string())
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.trim();
            return Err(CameraError::CaptureFailed(if detail.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                detail.to_string()
            }));
        }

        if output.stdout.is_empty() {
            return Ok(None);
        }
        debug!(bytes = output.stdout.len(), "capture command produced image");
        Ok(Some(CapturedImage::from_bytes(&output.stdout)))
    }
}
