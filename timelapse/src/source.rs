use std::fs;
use std::path::PathBuf;

use timelapse_core::models::{CaptureError, FrameSource, Image};

/// Frame source over a directory of raw RGB24 captures (`*.rgb`), replayed
/// in file name order at fixed dimensions.
pub struct DirFrameSource {
    width: usize,
    height: usize,
    files: Vec<PathBuf>,
    next: usize,
}

impl DirFrameSource {

    pub fn new(dir: &str, width: usize, height: usize) -> Result<Self, CaptureError> {
        let entries = fs::read_dir(dir).map_err(|err| CaptureError::Failed {
            description: format!("failed to list {}: {}", dir, err),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map(|ext| ext == "rgb").unwrap_or(false))
            .collect();
        files.sort();

        debug!("found {} frame files in {}", files.len(), dir);

        Ok(DirFrameSource {
            width,
            height,
            files,
            next: 0,
        })
    }
}

impl FrameSource for DirFrameSource {

    fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    fn next_frame(&mut self) -> Result<Option<Image>, CaptureError> {
        if self.next == self.files.len() {
            return Ok(None);
        }

        let path = self.files[self.next].clone();
        self.next += 1;

        let data = fs::read(&path).map_err(|err| CaptureError::Failed {
            description: format!("failed to read {}: {}", path.display(), err),
        })?;

        let image = Image::from_rgb24(&data, self.width, self.height).ok_or_else(|| CaptureError::InvalidFrame {
            description: format!("{} is not a {}x{} rgb24 frame", path.display(), self.width, self.height),
        })?;

        Ok(Some(image))
    }
}
