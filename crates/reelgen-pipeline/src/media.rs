//! File input and output for the command-line driver.

use std::path::{Path, PathBuf};

use reelgen_models::ImageArtifact;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::state::PipelineState;

/// Read an image from disk, inferring its media type from the extension.
pub async fn load_image(path: &Path) -> PipelineResult<ImageArtifact> {
    let media_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageArtifact::media_type_for_extension)
        .ok_or_else(|| PipelineError::UnsupportedImage(path.display().to_string()))?;

    let bytes = tokio::fs::read(path).await?;
    debug!(path = %path.display(), bytes = bytes.len(), media_type, "Loaded source image");

    Ok(ImageArtifact::new(bytes, media_type)?)
}

/// Write every artifact present on the state into `dir`.
///
/// Returns the paths written, in script, audio, video order.
pub async fn write_outputs(dir: &Path, state: &PipelineState) -> PipelineResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir).await?;
    let mut written = Vec::new();

    if let Some(script) = state.script() {
        let path = dir.join("script.txt");
        tokio::fs::write(&path, script).await?;
        written.push(path);
    }

    if let Some(audio) = state.audio() {
        let path = dir.join(format!("narration.{}", audio.extension()));
        tokio::fs::write(&path, &audio.bytes).await?;
        written.push(path);
    }

    if let Some(video) = state.video() {
        let path = dir.join("video.mp4");
        tokio::fs::write(&path, &video.bytes).await?;
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_image_infers_media_type() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.JPG");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let image = load_image(&path).await.unwrap();
        assert_eq!(image.media_type, "image/jpeg");
        assert_eq!(image.bytes, vec![0xff, 0xd8, 0xff]);
    }

    #[tokio::test]
    async fn test_load_image_rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.gif");
        std::fs::write(&path, [1]).unwrap();

        let err = load_image(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedImage(_)));
    }

    #[tokio::test]
    async fn test_load_image_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("frame.png");
        std::fs::write(&path, []).unwrap();

        let err = load_image(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Artifact(_)));
    }

    #[tokio::test]
    async fn test_write_outputs_skips_missing_artifacts() {
        let dir = tempdir().unwrap();
        let mut state = PipelineState::new();
        state.edit_script("A short script.").unwrap();

        let written = write_outputs(dir.path(), &state).await.unwrap();
        assert_eq!(written, vec![dir.path().join("script.txt")]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("script.txt")).unwrap(),
            "A short script."
        );
    }
}
