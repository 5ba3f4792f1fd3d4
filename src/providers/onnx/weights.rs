use std::{fs, path::Path};

use ndarray::{Array1, Array2};
use serde::Deserialize;

use super::{artefact::OnnxArtefact, errors::OnnxExtractorError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WeightsFile {
    channels: usize,
    classes: usize,
    weights: Vec<Vec<f32>>,
}

/// Dense-layer kernel mapping pooled feature channels to class scores.
///
/// Stored as `channels x classes`, matching the Keras kernel layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassWeights {
    kernel: Array2<f32>,
}

impl ClassWeights {
    /// Verify and load a weights artefact.
    ///
    /// # Errors
    ///
    /// Returns checksum, I/O, parse, or consistency errors.
    pub fn load(artefact: &OnnxArtefact) -> Result<Self, OnnxExtractorError> {
        artefact.verify()?;
        let raw = fs::read_to_string(&artefact.path).map_err(|source| OnnxExtractorError::Io {
            path: artefact.path.clone(),
            source,
        })?;
        Self::from_json(&raw, &artefact.path)
    }

    fn from_json(raw: &str, path: &Path) -> Result<Self, OnnxExtractorError> {
        let file: WeightsFile =
            serde_json::from_str(raw).map_err(|source| OnnxExtractorError::ParseWeights {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_rows(file.channels, file.classes, file.weights)
    }

    /// Build from one row of `classes` weights per channel.
    ///
    /// # Errors
    ///
    /// Returns [`OnnxExtractorError::InvalidWeights`] when the declared
    /// dimensions are zero or disagree with the rows.
    pub fn from_rows(
        channels: usize,
        classes: usize,
        rows: Vec<Vec<f32>>,
    ) -> Result<Self, OnnxExtractorError> {
        if channels == 0 || classes == 0 {
            return Err(OnnxExtractorError::InvalidWeights(format!(
                "dimensions must be non-zero, got {channels}x{classes}"
            )));
        }
        if rows.len() != channels {
            return Err(OnnxExtractorError::InvalidWeights(format!(
                "declared {channels} channels but found {} rows",
                rows.len()
            )));
        }
        if let Some((index, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != classes) {
            return Err(OnnxExtractorError::InvalidWeights(format!(
                "row {index} has {} entries but expected {classes}",
                row.len()
            )));
        }
        let flat: Vec<f32> = rows.into_iter().flatten().collect();
        let kernel = Array2::from_shape_vec((channels, classes), flat)
            .map_err(|err| OnnxExtractorError::InvalidWeights(err.to_string()))?;
        Ok(Self { kernel })
    }

    #[must_use]
    pub fn channels(&self) -> usize {
        self.kernel.nrows()
    }

    #[must_use]
    pub fn classes(&self) -> usize {
        self.kernel.ncols()
    }

    /// Weight vector over channels for `class`.
    #[must_use]
    pub fn for_class(&self, class: usize) -> Option<Array1<f32>> {
        (class < self.classes()).then(|| self.kernel.column(class).to_owned())
    }
}
