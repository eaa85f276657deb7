//! Frames loaded from a directory of JPEG files

use std::path::{Path, PathBuf};

use super::FrameSource;
use crate::buffer::Frame;
use crate::error::{Error, Result};

/// Cycles forever through a fixed set of frames
///
/// Typically loaded from a directory of `.jpg`/`.jpeg` files (sorted by file
/// name), which makes it a stand-in for a camera during development.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    frames: Vec<Frame>,
    next: usize,
}

impl DirectorySource {
    /// Load every JPEG file in `dir` into memory
    ///
    /// Empty files are skipped. Fails with [`Error::NoFrames`] if nothing is
    /// left.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();

        let mut paths = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_jpeg(&path) && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in paths {
            let data = tokio::fs::read(&path).await?;
            match Frame::new(data) {
                Ok(frame) => frames.push(frame),
                Err(_) => tracing::warn!(path = %path.display(), "Skipping empty frame file"),
            }
        }

        if frames.is_empty() {
            return Err(Error::NoFrames(dir.to_path_buf()));
        }

        tracing::info!(
            dir = %dir.display(),
            frames = frames.len(),
            "Loaded frame sequence"
        );

        Ok(Self { frames, next: 0 })
    }

    /// Cycle through frames already in memory
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::NoFrames(PathBuf::new()));
        }
        Ok(Self { frames, next: 0 })
    }

    /// Number of frames in one cycle
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for a constructed source
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for DirectorySource {
    async fn next_frame(&mut self) -> Result<Option<Frame>> {
        let frame = self.frames[self.next].clone();
        self.next = (self.next + 1) % self.frames.len();
        Ok(Some(frame))
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("jpg") || ext.eq_ignore_ascii_case("jpeg"))
        .unwrap_or(false)
}
