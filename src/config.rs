//! Reconstruction options and the TOML settings file.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, SymbolMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutRule {
    /// Only the character count is checked.
    #[default]
    CountOnly,
    /// Additionally, no letter may follow a digit in reading order.
    LettersBeforeDigits,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionOptions {
    /// Boxes overlapping above this IoU are duplicates of one character.
    pub iou_threshold: f32,
    /// Center x distance, in pixels, below which two boxes share a column.
    pub center_epsilon: f32,
    pub min_characters: usize,
    pub max_characters: usize,
    pub layout: LayoutRule,
}

impl Default for ReconstructionOptions {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            center_epsilon: 0.5,
            min_characters: 6,
            max_characters: 7,
            layout: LayoutRule::CountOnly,
        }
    }
}

impl ReconstructionOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return Err(Error::Config(format!(
                "iou_threshold must be in (0, 1], got {}",
                self.iou_threshold
            )));
        }
        if !self.center_epsilon.is_finite() || self.center_epsilon < 0.0 {
            return Err(Error::Config(format!(
                "center_epsilon must be a non-negative number, got {}",
                self.center_epsilon
            )));
        }
        if self.min_characters > self.max_characters {
            return Err(Error::Config(format!(
                "min_characters ({}) exceeds max_characters ({})",
                self.min_characters, self.max_characters
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub plate_model: PathBuf,
    pub ocr_model: PathBuf,
    /// One class label per line, in model class id order.
    pub ocr_labels: PathBuf,
    pub threads: usize,
    pub input_size: u32,
    pub confidence_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            plate_model: "models/yolov10_license_plate_detection.onnx".into(),
            ocr_model: "models/yolov10_arabic_ocr.onnx".into(),
            ocr_labels: "models/arabic_ocr_labels.txt".into(),
            threads: 4,
            input_size: 640,
            confidence_threshold: 0.25,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlateConfig {
    pub reconstruction: ReconstructionOptions,
    pub models: ModelConfig,
    /// Replaces the built-in Egyptian table when present.
    pub symbols: Option<BTreeMap<String, char>>,
}

impl PlateConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        contents.parse()
    }

    pub fn validate(&self) -> Result<()> {
        self.reconstruction.validate()?;
        if self.models.input_size == 0 {
            return Err(Error::Config("input_size must be positive".to_string()));
        }
        if let Some(symbols) = &self.symbols {
            if symbols.is_empty() {
                return Err(Error::Config("symbol table is empty".to_string()));
            }
        }
        Ok(())
    }

    /// The configured symbol table, or the shared built-in one.
    pub fn symbol_map(&self) -> Result<Arc<SymbolMap>> {
        match &self.symbols {
            Some(symbols) => Ok(Arc::new(SymbolMap::new(
                symbols.iter().map(|(label, grapheme)| (label.as_str(), *grapheme)),
            )?)),
            None => Ok(SymbolMap::egyptian()),
        }
    }
}

impl std::str::FromStr for PlateConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let config: PlateConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
