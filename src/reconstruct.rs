use std::sync::Arc;

use tracing::instrument;

use crate::{
    sequence::reading_order, suppress::suppress_duplicates, validate::validate,
    CharacterDetection, PlateCandidate, ReconstructionOptions, Result, SymbolMap,
};

/// Arithmetic mean of the confidences, `0.0` for no detections, clamped to `[0, 1]`.
pub fn mean_confidence<'a>(detections: impl IntoIterator<Item = &'a CharacterDetection>) -> f32 {
    let (sum, count) = detections
        .into_iter()
        .fold((0.0f64, 0usize), |(sum, count), it| {
            (sum + it.confidence as f64, count + 1)
        });
    if count == 0 {
        return 0.0;
    }
    ((sum / count as f64) as f32).clamp(0.0, 1.0)
}

/// Turns the unordered character detections of one plate crop into a [`PlateCandidate`].
///
/// Holds only the shared symbol table and plain options, so one instance can serve any number of
/// threads at once.
#[derive(Debug, Clone)]
pub struct Reconstructor {
    symbols: Arc<SymbolMap>,
    options: ReconstructionOptions,
}

impl Reconstructor {
    /// Fails when `options` does not pass [`ReconstructionOptions::validate`].
    pub fn new(symbols: Arc<SymbolMap>, options: ReconstructionOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { symbols, options })
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn options(&self) -> &ReconstructionOptions {
        &self.options
    }

    #[instrument(level = "debug", skip_all, fields(detections = detections.len()))]
    pub fn reconstruct(&self, detections: &[CharacterDetection]) -> PlateCandidate {
        let survivors = suppress_duplicates(detections, self.options.iou_threshold);
        let order = reading_order(detections, &survivors, self.options.center_epsilon);
        let (mapped, mapping_errors) = self.symbols.map_sequence(detections, &order);

        let (characters, graphemes): (Vec<_>, Vec<_>) = mapped
            .into_iter()
            .map(|(index, grapheme)| (detections[index].clone(), grapheme))
            .unzip();
        let mean_confidence = mean_confidence(&characters);
        let invalid_reason = validate(&graphemes, &self.options);

        match invalid_reason {
            Some(reason) => log::debug!("Plate rejected: {reason}"),
            None => log::debug!(
                "Plate accepted with {} characters, confidence {mean_confidence:.4}",
                graphemes.len()
            ),
        }

        PlateCandidate::assemble(
            characters,
            graphemes,
            mean_confidence,
            invalid_reason,
            mapping_errors,
        )
    }
}

impl Default for Reconstructor {
    fn default() -> Self {
        Self {
            symbols: SymbolMap::egyptian(),
            options: ReconstructionOptions::default(),
        }
    }
}
