//! Append-only persistence of per-pass artifacts.
//!
//! Layout, stable for external tooling:
//!
//! ```text
//! <session>/reference.png
//! <session>/pass-<n>/rendered.png
//! <session>/pass-<n>/diff.png
//! ```
//!
//! Prior passes are never deleted or overwritten; they form the audit
//! trail a reviewer walks through.

use image::{DynamicImage, GrayImage};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::VergenceError;

/// Records rendered images and heatmaps under one session directory.
///
/// The directory is injected by the caller; the recorder never reaches for
/// ambient temp paths, so sessions can live anywhere and run side by side.
#[derive(Debug, Clone)]
pub struct PassRecorder {
    session_dir: PathBuf,
}

/// Stable references to the artifacts of one recorded pass.
#[derive(Debug, Clone)]
pub struct PassArtifacts {
    pub rendered_path: PathBuf,
    pub heatmap_path: PathBuf,
}

impl PassRecorder {
    pub fn new(session_dir: impl Into<PathBuf>) -> Result<Self, VergenceError> {
        let session_dir = session_dir.into();
        fs::create_dir_all(&session_dir)?;
        Ok(Self { session_dir })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn reference_path(&self) -> PathBuf {
        self.session_dir.join("reference.png")
    }

    /// Persist the session's reference image. The reference never changes,
    /// so an already present file is left untouched.
    pub fn record_reference(&self, reference: &DynamicImage) -> Result<PathBuf, VergenceError> {
        let path = self.reference_path();
        if !path.exists() {
            reference.save(&path).map_err(|e| {
                VergenceError::Recorder(format!("writing {}: {e}", path.display()))
            })?;
        }
        Ok(path)
    }

    /// Persist the rendered image and heatmap for one pass.
    ///
    /// Fails if the pass directory already exists: passes are append-only.
    pub fn record_pass(
        &self,
        index: u32,
        rendered: &DynamicImage,
        heatmap: &GrayImage,
    ) -> Result<PassArtifacts, VergenceError> {
        let dir = self.session_dir.join(format!("pass-{index}"));
        fs::create_dir(&dir).map_err(|e| {
            if e.kind() == ErrorKind::AlreadyExists {
                VergenceError::Recorder(format!(
                    "pass {index} already recorded under {}",
                    self.session_dir.display()
                ))
            } else {
                VergenceError::Io(e)
            }
        })?;

        let rendered_path = dir.join("rendered.png");
        rendered.save(&rendered_path).map_err(|e| {
            VergenceError::Recorder(format!("writing {}: {e}", rendered_path.display()))
        })?;

        let heatmap_path = dir.join("diff.png");
        heatmap.save(&heatmap_path).map_err(|e| {
            VergenceError::Recorder(format!("writing {}: {e}", heatmap_path.display()))
        })?;

        Ok(PassArtifacts {
            rendered_path,
            heatmap_path,
        })
    }

    /// Count the `pass-<n>` directories already present in the session.
    pub fn recorded_passes(&self) -> Result<u32, VergenceError> {
        let mut count = 0;
        for entry in fs::read_dir(&self.session_dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let is_pass = name
                .to_str()
                .and_then(|s| s.strip_prefix("pass-"))
                .map(|rest| rest.parse::<u32>().is_ok())
                .unwrap_or(false);
            if is_pass {
                count += 1;
            }
        }
        Ok(count)
    }
}
