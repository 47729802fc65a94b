//! Output path resolution.
//!
//! Callers name outputs, never place them: only the final component of an
//! output name is kept and it is always joined onto the configured output
//! root.

use std::path::{Path, PathBuf};
use video_edit_mcp_common::error::{Error, Result};

/// Maps caller-supplied output names to absolute destinations.
#[derive(Debug, Clone)]
pub struct OutputResolver {
    root: PathBuf,
}

impl OutputResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute destination for `name`. Does not touch the file system.
    ///
    /// ```
    /// use video_edit_mcp::output::OutputResolver;
    ///
    /// let resolver = OutputResolver::new("/srv/out");
    /// let path = resolver.resolve("../../etc/clip.mp4").unwrap();
    /// assert_eq!(path, std::path::Path::new("/srv/out/clip.mp4"));
    /// ```
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let file_name = Path::new(name.trim())
            .file_name()
            .ok_or_else(|| Error::validation(format!("'{}' is not a valid output name", name)))?;
        Ok(std::path::absolute(self.root.join(file_name))?)
    }

    /// Destination for `name`, with the output root created.
    pub async fn prepare(&self, name: &str) -> Result<PathBuf> {
        let path = self.resolve(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(path)
    }

    /// Destination for part `index` (1-based) of a split `name`:
    /// `clip.mp4` becomes `clip_part_1.mp4`.
    pub fn segment(&self, name: &str, index: usize) -> Result<PathBuf> {
        let base = self.resolve(name)?;
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file_name = match base.extension() {
            Some(ext) => format!("{}_part_{}.{}", stem, index, ext.to_string_lossy()),
            None => format!("{}_part_{}", stem, index),
        };
        Ok(base.with_file_name(file_name))
    }
}
