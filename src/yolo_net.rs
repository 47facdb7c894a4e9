use std::path::{Path, PathBuf};

use geo::{coord, Rect};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{ArrayView2, Axis, Ix3};
use ort::{inputs, ExecutionProviderDispatch, GraphOptimizationLevel, Session};
use tracing::instrument;

use crate::{
    util::{to_input_tensor, Scale},
    CharacterDetection, Error, ExecutionProvider, Result,
};

/// `x1 y1 x2 y2 score class` per row.
const ROW_LEN: usize = 6;

/// One box from a YOLOv10 end-to-end head, in source image pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloBox {
    pub class_id: usize,
    pub score: f32,
    pub rect: Rect<f32>,
}

pub struct YoloNet {
    session: Session,
    input_size: u32,
    confidence_threshold: f32,
}

#[cfg(feature = "cuda")]
fn setup_cuda() -> ExecutionProviderDispatch {
    use ort::CUDAExecutionProvider;

    CUDAExecutionProvider::default().build()
}

#[cfg(feature = "directml")]
fn setup_directml() -> ExecutionProviderDispatch {
    use ort::DirectMLExecutionProvider;

    DirectMLExecutionProvider::default().build()
}

#[cfg(feature = "coreml")]
fn setup_coreml() -> ExecutionProviderDispatch {
    use ort::CoreMLExecutionProvider;

    CoreMLExecutionProvider::default().build()
}

impl YoloNet {
    #[instrument(level = "debug")]
    pub fn init(
        path: PathBuf,
        num_threads: usize,
        input_size: u32,
        confidence_threshold: f32,
        execution_providers: &[ExecutionProvider],
    ) -> Result<Self> {
        #[cfg(feature = "directml")]
        let parallel = !execution_providers.contains(&ExecutionProvider::DirectML);
        #[cfg(not(feature = "directml"))]
        let parallel = true;

        let execution_providers = execution_providers.iter().filter_map(
            |provider| -> Option<ExecutionProviderDispatch> {
                match provider {
                    ExecutionProvider::Default => None,
                    #[cfg(feature = "cuda")]
                    ExecutionProvider::Cuda => Some(setup_cuda()),
                    #[cfg(feature = "directml")]
                    ExecutionProvider::DirectML => Some(setup_directml()),
                    #[cfg(feature = "coreml")]
                    ExecutionProvider::CoreML => Some(setup_coreml()),
                }
            },
        );

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_memory_pattern(parallel)?
            .with_parallel_execution(parallel)?
            .with_inter_threads(num_threads)?
            .with_intra_threads(num_threads)?
            .with_execution_providers(execution_providers)?
            .commit_from_file(path)?;

        log::debug!("YOLO inputs: {:?}", session.inputs);
        log::debug!("YOLO outputs: {:?}", session.outputs);

        Ok(Self {
            session,
            input_size,
            confidence_threshold,
        })
    }

    #[instrument(level = "debug", skip(self, image))]
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<YoloBox>> {
        let scale = Scale::to_square(image, self.input_size);
        let resized = image.resize_exact(
            scale.target_width,
            scale.target_height,
            FilterType::Triangle,
        );
        let input_values = to_input_tensor(&resized).insert_axis(Axis(0));
        let outputs = self.session.run(inputs!["images" => input_values]?)?;
        let (_, output) = outputs
            .first_key_value()
            .ok_or_else(|| Error::Inference("model produced no outputs".to_string()))?;
        let predictions = output
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()
            .map_err(|err| Error::Inference(format!("expected a (1, N, 6) tensor: {err}")))?;
        log::trace!("Output tensor size: {:?}", predictions.dim());
        if predictions.len_of(Axis(2)) < ROW_LEN {
            return Err(Error::Inference(format!(
                "expected {ROW_LEN} values per box, got {}",
                predictions.len_of(Axis(2))
            )));
        }

        let boxes = decode_boxes(
            predictions.index_axis(Axis(0), 0),
            scale,
            self.confidence_threshold,
        );
        log::debug!("Detected {} boxes", boxes.len());
        Ok(boxes)
    }
}

/// Keeps rows scoring at least `confidence_threshold` and scales them back to source pixels.
/// Rows with non-finite values are dropped.
pub fn decode_boxes(
    rows: ArrayView2<f32>,
    scale: Scale,
    confidence_threshold: f32,
) -> Vec<YoloBox> {
    let Scale {
        factor_x, factor_y, ..
    } = scale;
    rows.outer_iter()
        .filter(|row| row.len() >= ROW_LEN)
        .filter(|row| row.iter().take(ROW_LEN).all(|it| it.is_finite()))
        .filter(|row| row[4] >= confidence_threshold)
        .map(|row| YoloBox {
            class_id: row[5].max(0.0).round() as usize,
            score: row[4],
            rect: Rect::new(
                coord! { x: row[0] * factor_x, y: row[1] * factor_y },
                coord! { x: row[2] * factor_x, y: row[3] * factor_y },
            ),
        })
        .collect()
}

impl YoloBox {
    /// Names the box through `labels`. Ids past the end become `#<id>`, which no symbol table
    /// knows, so the box is later dropped as a mapping error.
    pub fn to_character(&self, labels: &[String]) -> CharacterDetection {
        CharacterDetection {
            label: labels
                .get(self.class_id)
                .cloned()
                .unwrap_or_else(|| format!("#{}", self.class_id)),
            confidence: self.score,
            bounds: self.rect,
        }
    }
}

/// Class names, one per line, in class id order.
pub fn load_labels(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let labels = std::fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    if labels.is_empty() {
        return Err(Error::Config("labels file is empty".to_string()));
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    const HALF: Scale = Scale {
        factor_x: 0.5,
        factor_y: 2.0,
        target_width: 640,
        target_height: 640,
    };

    #[test]
    fn keeps_rows_at_threshold() {
        let rows = array![
            [0.0, 0.0, 10.0, 10.0, 0.25, 1.0],
            [0.0, 0.0, 10.0, 10.0, 0.2499, 2.0],
            [0.0, 0.0, 10.0, 10.0, 0.9, 3.0],
        ];
        let boxes = decode_boxes(rows.view(), HALF, 0.25);
        let ids = boxes.iter().map(|it| it.class_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(boxes[0].score, 0.25);
    }

    #[test]
    fn scales_back_to_source_pixels() {
        let rows = array![[100.0, 40.0, 140.0, 120.0, 0.8, 7.0]];
        let boxes = decode_boxes(rows.view(), HALF, 0.25);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].rect.min(), coord! { x: 50.0, y: 80.0 });
        assert_eq!(boxes[0].rect.max(), coord! { x: 70.0, y: 240.0 });
    }

    #[test]
    fn drops_non_finite_rows() {
        let rows = array![
            [f32::NAN, 0.0, 10.0, 10.0, 0.9, 1.0],
            [0.0, 0.0, f32::INFINITY, 10.0, 0.9, 1.0],
            [0.0, 0.0, 10.0, 10.0, 0.9, 1.0],
        ];
        assert_eq!(decode_boxes(rows.view(), HALF, 0.25).len(), 1);
    }

    #[test]
    fn class_id_past_labels_becomes_unknown() {
        let labels = vec!["a".to_string(), "1".to_string()];
        let known = YoloBox {
            class_id: 1,
            score: 0.7,
            rect: Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 5.0, y: 5.0 }),
        };
        let unknown = YoloBox {
            class_id: 9,
            ..known
        };

        assert_eq!(known.to_character(&labels).label, "1");
        assert_eq!(known.to_character(&labels).confidence, 0.7);
        let character = unknown.to_character(&labels);
        assert_eq!(character.label, "#9");

        let (mapped, errors) =
            crate::SymbolMap::egyptian().map_sequence(&[character], &[0]);
        assert!(mapped.is_empty());
        assert_eq!(errors[0].label, "#9");
    }
}
