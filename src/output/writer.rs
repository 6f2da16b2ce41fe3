//! Artifact persistence

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use super::renderer::RenderedArtifacts;
use crate::config::OutputConfig;
use crate::errors::{AppError, AppResult};

/// Paths of the artifacts a run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArtifacts {
    pub playlist: PathBuf,
    pub listing: PathBuf,
}

/// Writes rendered artifacts into the output directory
///
/// Each file is written to a sibling temp file and renamed into place, so a
/// reader never sees a partially written artifact.
pub struct ArtifactWriter {
    output_dir: PathBuf,
    m3u_filename: String,
    txt_filename: String,
}

impl ArtifactWriter {
    pub fn new<P: Into<PathBuf>>(output_dir: P, m3u_filename: &str, txt_filename: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            m3u_filename: m3u_filename.to_string(),
            txt_filename: txt_filename.to_string(),
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.output_dir, &config.m3u_filename, &config.txt_filename)
    }

    pub async fn write(&self, artifacts: &RenderedArtifacts) -> AppResult<WrittenArtifacts> {
        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| AppError::output(&self.output_dir, e.to_string()))?;

        let playlist = self.output_dir.join(&self.m3u_filename);
        let listing = self.output_dir.join(&self.txt_filename);
        replace_file(&playlist, &artifacts.playlist).await?;
        replace_file(&listing, &artifacts.listing).await?;

        info!(
            "Wrote {} and {} ({} entries)",
            playlist.display(),
            listing.display(),
            artifacts.emitted
        );
        Ok(WrittenArtifacts { playlist, listing })
    }
}

async fn replace_file(path: &Path, contents: &str) -> AppResult<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::output(path, "not a file path"))?;
    let mut temp_name = std::ffi::OsString::from(".");
    temp_name.push(file_name);
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents)
        .await
        .map_err(|e| AppError::output(&temp_path, e.to_string()))?;

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(AppError::output(path, e.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifacts() -> RenderedArtifacts {
        RenderedArtifacts {
            playlist: "#EXTM3U\n".to_string(),
            listing: "News,#genre#\n".to_string(),
            emitted: 0,
            suppressed: 0,
        }
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_files() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path().join("nested/output"), "live.m3u", "live.txt");

        let written = writer.write(&artifacts()).await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&written.playlist).await.unwrap(), "#EXTM3U\n");
        assert_eq!(tokio::fs::read_to_string(&written.listing).await.unwrap(), "News,#genre#\n");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested/output"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_write_replaces_previous_artifacts() {
        let dir = TempDir::new().unwrap();
        let writer = ArtifactWriter::new(dir.path(), "live.m3u", "live.txt");
        std::fs::write(dir.path().join("live.m3u"), "old contents that are longer").unwrap();

        writer.write(&artifacts()).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("live.m3u")).unwrap(), "#EXTM3U\n");
    }

    #[tokio::test]
    async fn test_unwritable_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "a file, not a directory").unwrap();

        let writer = ArtifactWriter::new(blocker.join("out"), "live.m3u", "live.txt");
        let err = writer.write(&artifacts()).await.unwrap_err();
        assert!(matches!(err, AppError::Output { .. }));
    }
}
