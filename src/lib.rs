use std::{path::PathBuf, sync::Arc};

use float_ord::FloatOrd;
use image::DynamicImage;
use tracing::instrument;
use yolo_net::{load_labels, YoloNet};

mod config;
mod error;
mod reconstruct;
mod result;
pub mod sequence;
pub mod suppress;
pub mod symbols;
pub mod util;
pub mod validate;
pub mod yolo_net;

pub use config::*;
pub use error::*;
pub use reconstruct::*;
pub use result::*;
pub use symbols::SymbolMap;
use util::{annotate, part_image};

pub use ort as runtime;

pub struct PlateReaderBuilder {
    threads: usize,
    plate_path: Option<PathBuf>,
    ocr_paths: Option<(PathBuf, PathBuf)>,
    input_size: u32,
    confidence_threshold: f32,
    options: ReconstructionOptions,
    symbols: Option<Arc<SymbolMap>>,
    execution_providers: Vec<ExecutionProvider>,
}

impl PlateReaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds every setting from a loaded configuration file.
    pub fn from_config(config: &PlateConfig) -> Result<Self> {
        config.validate()?;
        let models = &config.models;
        Ok(Self::new()
            .threads(models.threads)
            .plate_model(&models.plate_model)
            .ocr_model(&models.ocr_model, &models.ocr_labels)
            .input_size(models.input_size)
            .confidence_threshold(models.confidence_threshold)
            .options(config.reconstruction)
            .symbols(config.symbol_map()?))
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn plate_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.plate_path = Some(path.into());
        self
    }

    pub fn ocr_model(
        mut self,
        model_path: impl Into<PathBuf>,
        labels_path: impl Into<PathBuf>,
    ) -> Self {
        self.ocr_paths = Some((model_path.into(), labels_path.into()));
        self
    }

    pub fn input_size(mut self, input_size: u32) -> Self {
        self.input_size = input_size;
        self
    }

    pub fn confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn options(mut self, options: ReconstructionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn symbols(mut self, symbols: Arc<SymbolMap>) -> Self {
        self.symbols = Some(symbols);
        self
    }

    pub fn with_execution_providers(
        mut self,
        providers: impl IntoIterator<Item = ExecutionProvider>,
    ) -> Self {
        self.execution_providers = providers.into_iter().collect();
        self
    }

    #[instrument(skip(self), level = "debug")]
    fn init_models(&mut self) -> Result<(YoloNet, YoloNet, Vec<String>)> {
        let defaults = ModelConfig::default();
        let plate_path = self.plate_path.take().unwrap_or(defaults.plate_model);
        let (ocr_path, labels_path) = self
            .ocr_paths
            .take()
            .unwrap_or((defaults.ocr_model, defaults.ocr_labels));
        let init = |path| {
            YoloNet::init(
                path,
                self.threads,
                self.input_size,
                self.confidence_threshold,
                &self.execution_providers,
            )
        };
        Ok((init(plate_path)?, init(ocr_path)?, load_labels(labels_path)?))
    }

    #[instrument(skip(self))]
    pub fn build(mut self) -> Result<PlateReader> {
        if self.input_size == 0 {
            return Err(Error::Config("input_size must be positive".to_string()));
        }
        let symbols = self.symbols.take().unwrap_or_else(SymbolMap::egyptian);
        let reconstructor = Reconstructor::new(symbols, self.options)?;
        let (plate_model, ocr_model, ocr_labels) = self.init_models()?;
        Ok(PlateReader {
            plate_model,
            ocr_model,
            ocr_labels,
            reconstructor,
        })
    }
}

impl Default for PlateReaderBuilder {
    fn default() -> Self {
        let models = ModelConfig::default();
        Self {
            threads: models.threads,
            plate_path: None,
            ocr_paths: None,
            input_size: models.input_size,
            confidence_threshold: models.confidence_threshold,
            options: ReconstructionOptions::default(),
            symbols: None,
            execution_providers: DEFAULT_PROVIDERS.to_vec(),
        }
    }
}

/// Locates the plate in a photo, detects its characters and reconstructs the plate text.
pub struct PlateReader {
    plate_model: YoloNet,
    ocr_model: YoloNet,
    ocr_labels: Vec<String>,
    reconstructor: Reconstructor,
}

impl PlateReader {
    pub fn reconstructor(&self) -> &Reconstructor {
        &self.reconstructor
    }

    #[instrument(skip(self, image))]
    pub fn read(&self, image: &DynamicImage) -> Result<PlateReading> {
        let plates = self.plate_model.detect(image)?;
        let Some(plate) = plates
            .into_iter()
            .max_by_key(|it| FloatOrd(it.score))
            .map(|it| PlateBox {
                score: it.score,
                rect: it.rect,
            })
        else {
            log::debug!("No license plate detected");
            return Ok(PlateReading {
                plate: None,
                candidate: None,
                annotated_crop: None,
            });
        };

        let crop = part_image(image, &plate.rect);
        if crop.width() == 0 || crop.height() == 0 {
            log::debug!("Plate box {:?} lies outside the image", plate.rect);
            return Ok(PlateReading {
                plate: Some(plate),
                candidate: None,
                annotated_crop: None,
            });
        }
        #[cfg(feature = "debug")]
        if let Err(err) = crop.save("part_images/plate.png") {
            log::warn!("Failed to save plate crop: {err}");
        }

        let detections = self.detect_characters(&crop)?;
        let candidate = self.reconstructor.reconstruct(&detections);
        let annotated_crop = annotate(&crop, candidate.characters().iter().map(|it| &it.bounds));

        Ok(PlateReading {
            plate: Some(plate),
            candidate: Some(candidate),
            annotated_crop: Some(annotated_crop),
        })
    }

    pub fn read_path(&self, path: impl AsRef<std::path::Path>) -> Result<PlateReading> {
        let image = image::open(path)?;
        self.read(&image)
    }

    /// Runs only the character model on an already cropped plate.
    #[instrument(level = "debug", skip(self, plate))]
    pub fn detect_characters(&self, plate: &DynamicImage) -> Result<Vec<CharacterDetection>> {
        Ok(self
            .ocr_model
            .detect(plate)?
            .into_iter()
            .map(|it| it.to_character(&self.ocr_labels))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Default,
    #[cfg(feature = "coreml")]
    CoreML,
    #[cfg(feature = "cuda")]
    Cuda,
    #[cfg(feature = "directml")]
    DirectML,
}

const DEFAULT_PROVIDERS: &[ExecutionProvider] = &[
    #[cfg(feature = "coreml")]
    ExecutionProvider::CoreML,
    #[cfg(feature = "directml")]
    ExecutionProvider::DirectML,
    #[cfg(feature = "cuda")]
    ExecutionProvider::Cuda,
    ExecutionProvider::Default,
];
