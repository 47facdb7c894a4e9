use geo::{Area, Rect};
use image::{DynamicImage, Pixel, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use ndarray::Array3;
use tracing::instrument;

const ANNOTATION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);

/// Intersection over union of two axis-aligned boxes. Degenerate boxes never overlap.
pub fn iou(a: &Rect<f32>, b: &Rect<f32>) -> f32 {
    let x1 = a.min().x.max(b.min().x);
    let y1 = a.min().y.max(b.min().y);
    let x2 = a.max().x.min(b.max().x);
    let y2 = a.max().y.min(b.max().y);

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.unsigned_area() + b.unsigned_area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// RGB planes scaled to `[0, 1]`, laid out as `(3, height, width)`.
#[instrument(level = "debug", skip(image))]
pub(crate) fn to_input_tensor(image: &DynamicImage) -> Array3<f32> {
    let image = image.to_rgb32f();
    Array3::<f32>::from_shape_fn(
        (3, image.height() as usize, image.width() as usize),
        |(ch, y, x)| image.get_pixel(x as u32, y as u32).channels()[ch],
    )
}

#[derive(Debug, Clone, Copy)]
pub struct Scale {
    pub factor_x: f32,
    pub factor_y: f32,
    pub target_width: u32,
    pub target_height: u32,
}

impl Scale {
    /// Scale between `image` and a square model input of side `target_size`.
    pub fn to_square(image: &DynamicImage, target_size: u32) -> Self {
        let factor_x = image.width() as f32 / target_size as f32;
        let factor_y = image.height() as f32 / target_size as f32;
        log::debug!(
            "Resize will change image dimensions from (w: {}, h: {}) to (w: {target_size}, h: {target_size}) with scaling factor ({factor_x}, {factor_y}).",
            image.width(),
            image.height()
        );
        Self {
            factor_x,
            factor_y,
            target_width: target_size,
            target_height: target_size,
        }
    }
}

pub(crate) fn part_image(image: &DynamicImage, rect: &Rect<f32>) -> DynamicImage {
    let clamp_x = |value: f32| (value.max(0.0) as u32).min(image.width());
    let clamp_y = |value: f32| (value.max(0.0) as u32).min(image.height());
    let (x, y) = (clamp_x(rect.min().x), clamp_y(rect.min().y));
    let width = clamp_x(rect.max().x).saturating_sub(x);
    let height = clamp_y(rect.max().y).saturating_sub(y);
    log::trace!("Slicing subimage to {rect:?}");
    image.crop_imm(x, y, width, height)
}

/// Draws a two pixel wide box around every rect.
pub(crate) fn annotate<'a>(
    image: &DynamicImage,
    rects: impl IntoIterator<Item = &'a Rect<f32>>,
) -> RgbImage {
    let mut canvas = image.to_rgb8();
    for rect in rects {
        let x = rect.min().x.round() as i32;
        let y = rect.min().y.round() as i32;
        let width = (rect.width().round() as u32).max(1);
        let height = (rect.height().round() as u32).max(1);
        draw_hollow_rect_mut(
            &mut canvas,
            imageproc::rect::Rect::at(x, y).of_size(width, height),
            ANNOTATION_COLOR,
        );
        if width > 2 && height > 2 {
            draw_hollow_rect_mut(
                &mut canvas,
                imageproc::rect::Rect::at(x + 1, y + 1).of_size(width - 2, height - 2),
                ANNOTATION_COLOR,
            );
        }
    }
    canvas
}

#[cfg(test)]
mod tests {
    use geo::coord;

    use super::*;

    fn rect(x: f32, y: f32, w: f32, h: f32) -> Rect<f32> {
        Rect::new(coord! { x: x, y: y }, coord! { x: x + w, y: y + h })
    }

    #[test]
    fn iou_of_nested_boxes() {
        let iou = iou(&rect(0.0, 0.0, 10.0, 10.0), &rect(0.0, 0.0, 10.0, 8.0));
        assert!((iou - 0.8).abs() < 1e-6);
    }

    #[test]
    fn iou_of_disjoint_boxes_is_zero() {
        assert_eq!(
            iou(&rect(0.0, 0.0, 10.0, 10.0), &rect(20.0, 0.0, 10.0, 10.0)),
            0.0
        );
    }

    #[test]
    fn iou_of_degenerate_boxes_is_zero() {
        assert_eq!(
            iou(&rect(5.0, 5.0, 0.0, 0.0), &rect(5.0, 5.0, 0.0, 0.0)),
            0.0
        );
    }

    #[test]
    fn part_image_clamps_to_bounds() {
        let image = DynamicImage::new_rgb8(100, 50);
        let part = part_image(&image, &rect(80.0, -10.0, 40.0, 30.0));
        assert_eq!((part.width(), part.height()), (20, 20));
    }

    #[test]
    fn input_tensor_is_channel_first() {
        let image = DynamicImage::new_rgb8(4, 2);
        let tensor = to_input_tensor(&image);
        assert_eq!(tensor.dim(), (3, 2, 4));
    }
}
