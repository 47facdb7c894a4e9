use std::fmt;

use geo::{coord, Rect};
use image::RgbImage;
use serde::Serialize;
use thiserror::Error;

/// One character box reported by the character detector for a cropped plate.
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterDetection {
    pub label: String,
    pub confidence: f32,
    pub bounds: Rect<f32>,
}

impl CharacterDetection {
    /// `x`/`y` is the top-left corner, in pixels of the plate crop.
    pub fn new(
        label: impl Into<String>,
        confidence: f32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounds: Rect::new(coord! { x: x, y: y }, coord! { x: x + width, y: y + height }),
        }
    }
}

/// A class label that has no entry in the symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown class label `{label}` at detection {index}")]
pub struct MappingError {
    /// Position of the offending detection in the caller's input.
    pub index: usize,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    NoCharacters,
    CharacterCount { count: usize, min: usize, max: usize },
    LetterAfterDigit { position: usize },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NoCharacters => write!(f, "no characters detected"),
            InvalidReason::CharacterCount { count, min, max } => {
                write!(f, "character count {count} outside [{min},{max}]")
            }
            InvalidReason::LetterAfterDigit { position } => {
                write!(f, "letter at position {position} follows a digit")
            }
        }
    }
}

/// The reconstructed plate for one image.
///
/// Built once by [`Reconstructor::reconstruct`](crate::Reconstructor::reconstruct) and never
/// mutated afterwards. Characters and graphemes are in reading order and always have the same
/// length; `text` is the graphemes joined by single spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct PlateCandidate {
    characters: Vec<CharacterDetection>,
    graphemes: Vec<char>,
    text: String,
    mean_confidence: f32,
    invalid_reason: Option<InvalidReason>,
    mapping_errors: Vec<MappingError>,
}

impl PlateCandidate {
    pub(crate) fn assemble(
        characters: Vec<CharacterDetection>,
        graphemes: Vec<char>,
        mean_confidence: f32,
        invalid_reason: Option<InvalidReason>,
        mapping_errors: Vec<MappingError>,
    ) -> Self {
        debug_assert_eq!(characters.len(), graphemes.len());
        let text = graphemes
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            characters,
            graphemes,
            text,
            mean_confidence,
            invalid_reason,
            mapping_errors,
        }
    }

    pub fn characters(&self) -> &[CharacterDetection] {
        &self.characters
    }

    pub fn graphemes(&self) -> &[char] {
        &self.graphemes
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mean_confidence(&self) -> f32 {
        self.mean_confidence
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }

    pub fn invalid_reason(&self) -> Option<InvalidReason> {
        self.invalid_reason
    }

    pub fn mapping_errors(&self) -> &[MappingError] {
        &self.mapping_errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlateBox {
    pub score: f32,
    pub rect: Rect<f32>,
}

/// End-to-end outcome of [`PlateReader::read`](crate::PlateReader::read).
#[derive(Debug, Clone)]
pub struct PlateReading {
    pub plate: Option<PlateBox>,
    pub candidate: Option<PlateCandidate>,
    pub annotated_crop: Option<RgbImage>,
}

impl PlateReading {
    pub fn success(&self) -> bool {
        self.candidate
            .as_ref()
            .is_some_and(PlateCandidate::is_valid)
    }

    /// Best-effort text, also populated for invalid candidates.
    pub fn text(&self) -> &str {
        self.candidate
            .as_ref()
            .map(PlateCandidate::text)
            .unwrap_or_default()
    }

    /// Zero unless the reading succeeded.
    pub fn confidence(&self) -> f32 {
        match &self.candidate {
            Some(candidate) if candidate.is_valid() => candidate.mean_confidence(),
            _ => 0.0,
        }
    }

    pub fn error(&self) -> Option<String> {
        match (&self.plate, &self.candidate) {
            (None, _) => Some("no license plate detected in the image".to_string()),
            (Some(_), None) => Some("no characters detected".to_string()),
            (Some(_), Some(candidate)) => candidate.invalid_reason().map(|it| it.to_string()),
        }
    }

    pub fn summary(&self) -> ReadingSummary {
        ReadingSummary {
            success: self.success(),
            plate_text: self.text().to_string(),
            confidence: self.confidence(),
            error: self.error(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingSummary {
    pub success: bool,
    pub plate_text: String,
    pub confidence: f32,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_tags() {
        assert_eq!(
            InvalidReason::NoCharacters.to_string(),
            "no characters detected"
        );
        assert_eq!(
            InvalidReason::CharacterCount {
                count: 5,
                min: 6,
                max: 7
            }
            .to_string(),
            "character count 5 outside [6,7]"
        );
    }

    #[test]
    fn text_is_space_joined() {
        let characters = vec![
            CharacterDetection::new("a", 0.9, 10.0, 0.0, 5.0, 5.0),
            CharacterDetection::new("1", 0.8, 0.0, 0.0, 5.0, 5.0),
        ];
        let candidate =
            PlateCandidate::assemble(characters, vec!['\u{0623}', '\u{0661}'], 0.85, None, vec![]);
        assert_eq!(candidate.text(), "\u{0623} \u{0661}");
        assert_eq!(candidate.text().split(' ').count(), candidate.characters().len());
    }

    #[test]
    fn reading_without_plate_reports_error() {
        let reading = PlateReading {
            plate: None,
            candidate: None,
            annotated_crop: None,
        };
        let summary = reading.summary();
        assert!(!summary.success);
        assert_eq!(summary.plate_text, "");
        assert_eq!(summary.confidence, 0.0);
        assert_eq!(
            summary.error.as_deref(),
            Some("no license plate detected in the image")
        );
    }
}
