use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::app_config::ImageFormat;
use crate::errors::StorageError;
use crate::frame_extractor::FrameImage;

// @module: Frame persistence with ordered naming

/// Zero-padding width for a frame count.
///
/// Four digits cover the common case; wider counts widen the field so
/// lexicographic file order always equals temporal order, instead of
/// wrapping or colliding past 9999 frames.
pub fn index_width_for(expected_count: usize) -> usize {
    let digits = expected_count.max(1).to_string().len();
    digits.max(4)
}

/// Persists extracted frames under a directory with index-encoded names.
///
/// File names are `frame_<index>.<ext>` with the index 1-based and
/// zero-padded to the width computed from the expected frame count. Saves
/// are idempotent per index: re-saving overwrites instead of accumulating
/// stale files, which keeps re-runs clean.
pub struct FrameStore {
    /// Directory holding the frames
    dir: PathBuf,

    /// Image encoding, decides the file extension
    format: ImageFormat,

    /// Zero-padding width for indices
    index_width: usize,
}

impl FrameStore {
    /// Create the store, creating its directory if needed
    pub fn create<P: AsRef<Path>>(
        dir: P,
        format: ImageFormat,
        expected_count: usize,
    ) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::CreateDir {
            path: dir.clone(),
            message: e.to_string(),
        })?;

        Ok(FrameStore {
            dir,
            format,
            index_width: index_width_for(expected_count),
        })
    }

    /// Path a given 1-based index maps to
    pub fn frame_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!(
            "frame_{index:0width$}.{ext}",
            width = self.index_width,
            ext = self.format.extension()
        ))
    }

    /// Persist an image under its segment index, overwriting any prior file
    pub fn save(&self, image: &FrameImage, index: usize) -> Result<PathBuf, StorageError> {
        let path = self.frame_path(index);
        fs::write(&path, &image.data).map_err(|e| StorageError::Write {
            path: path.clone(),
            message: e.to_string(),
        })?;

        debug!("Saved frame {} ({} bytes)", path.display(), image.data.len());
        Ok(path)
    }

    /// Directory holding the frames
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Zero-padding width in use
    pub fn index_width(&self) -> usize {
        self.index_width
    }
}
