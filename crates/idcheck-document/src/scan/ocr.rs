// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine for photographed identity cards, built on `ocrs` (neural text
// detection and recognition executed by `rten`).
//
// Two model files are required in the configured directory:
//
// - `text-detection.rten`   locates text regions
// - `text-recognition.rten` decodes characters within each region
//
// Running `ocrs-cli` once downloads both to `$XDG_CACHE_HOME/ocrs`, which is
// also the directory used when `ocr_model_dir` is not configured.

use std::path::{Path, PathBuf};

use idcheck_core::error::IdCheckError;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::extract::TextRecognizer;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, then `~/.cache/ocrs`, then `./ocrs-models`.
pub fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Locations of the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expect both models under `dir` with their well-known file names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// `dir` if configured, otherwise the cache directory.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), IdCheckError> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(IdCheckError::OcrError(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

fn load_model(role: &str, path: &Path) -> Result<Model, IdCheckError> {
    info!(role, path = %path.display(), "Loading OCR model");
    Model::load_file(path).map_err(|err| {
        IdCheckError::OcrError(format!(
            "failed to load {role} model from {}: {err}",
            path.display()
        ))
    })
}

/// Loaded OCR models. Loading is the expensive step: build once at startup
/// and share.
pub struct OcrEngine {
    engine: OcrsEngine,
}

impl std::fmt::Debug for OcrEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OcrEngine").finish_non_exhaustive()
    }
}

impl OcrEngine {
    /// Load both models named by `config`.
    ///
    /// `ocrs` and `rten` are unusably slow in debug builds; the workspace
    /// profile compiles them optimised.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: &OcrConfig) -> Result<Self, IdCheckError> {
        config.validate()?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(load_model("detection", &config.detection_model_path)?),
            recognition_model: Some(load_model("recognition", &config.recognition_model_path)?),
            ..Default::default()
        })
        .map_err(|err| IdCheckError::OcrError(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine ready");
        Ok(Self { engine })
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self, IdCheckError> {
        Self::new(&OcrConfig::from_dir(dir))
    }

    /// All text on the card, one recognised line per output line.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn recognize_text(&self, image: &DynamicImage) -> Result<String, IdCheckError> {
        let rgb = image.to_rgb8();
        let dimensions = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), dimensions).map_err(|err| {
            IdCheckError::OcrError(format!(
                "failed to create image source ({}x{}): {err}",
                dimensions.0, dimensions.1
            ))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| IdCheckError::OcrError(format!("OCR preprocessing failed: {err}")))?;
        let text = self
            .engine
            .get_text(&input)
            .map_err(|err| IdCheckError::OcrError(format!("OCR text recognition failed: {err}")))?;

        debug!(lines = text.lines().count(), chars = text.len(), "OCR complete");
        Ok(text)
    }
}

impl TextRecognizer for OcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<String, IdCheckError> {
        self.recognize_text(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir_uses_well_known_names() {
        let config = OcrConfig::from_dir("/srv/models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/srv/models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/srv/models/text-recognition.rten")
        );
    }

    #[test]
    fn unset_dir_falls_back_to_cache() {
        let config = OcrConfig::from_optional_dir(None);
        assert!(config.detection_model_path.ends_with(DETECTION_MODEL_FILENAME));
        assert_eq!(config, OcrConfig::default());
    }

    #[test]
    fn missing_models_fail_validation() {
        let config = OcrConfig::from_dir("/nonexistent/ocr-models");
        assert!(matches!(config.validate(), Err(IdCheckError::OcrError(_))));
    }

    #[test]
    fn engine_fails_cleanly_without_models() {
        let result = OcrEngine::from_model_dir("/nonexistent/ocr-models");
        assert!(matches!(result, Err(IdCheckError::OcrError(_))));
    }
}
