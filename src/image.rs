use crate::{Color, Coordinate, MontageError};

/// Minimum number of aligned source images a stack must hold.
pub const MIN_REQUIRED_IMAGES: usize = 2;

/// Image with 3 bytes per pixel
#[derive(Clone, Default)]
pub struct ColorImage {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl ColorImage {
    pub fn new_w_h(width: usize, height: usize) -> Self {
        Self {
            pixels: vec![0; width * height * 3],
            width,
            height,
        }
    }

    /// Solid fill, mostly useful for tests and synthetic inputs.
    pub fn new_filled(width: usize, height: usize, color: Color) -> Self {
        let mut image = Self::new_w_h(width, height);
        for i in 0..width * height {
            image.set_pixel_at(i, &color);
        }
        image
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Color {
        let index = y * self.width + x;
        self.get_pixel_at(index)
    }

    pub fn get_pixel_at(&self, index: usize) -> Color {
        let index = index * 3;
        let r = self.pixels[index];
        let g = self.pixels[index + 1];
        let b = self.pixels[index + 2];

        Color::new(r, g, b)
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, color: &Color) {
        let index = y * self.width + x;
        self.set_pixel_at(index, color);
    }

    pub fn set_pixel_at(&mut self, index: usize, color: &Color) {
        let index = index * 3;
        self.pixels[index] = color.r;
        self.pixels[index + 1] = color.g;
        self.pixels[index + 2] = color.b;
    }
}

/// Ordered, fixed collection of same-size aligned images. A label is an
/// index into this stack.
pub struct ImageStack {
    images: Vec<ColorImage>,
    width: usize,
    height: usize,
}

impl ImageStack {
    pub fn new(images: Vec<ColorImage>) -> Result<Self, MontageError> {
        if images.len() < MIN_REQUIRED_IMAGES {
            return Err(MontageError::TooFewImages {
                required: MIN_REQUIRED_IMAGES,
                given: images.len(),
            });
        }
        let width = images[0].width;
        let height = images[0].height;
        for (index, image) in images.iter().enumerate() {
            if image.width != width || image.height != height {
                return Err(MontageError::DimensionMismatch {
                    index,
                    width: image.width,
                    height: image.height,
                    expected_width: width,
                    expected_height: height,
                });
            }
        }
        Ok(Self {
            images,
            width,
            height,
        })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn images(&self) -> &[ColorImage] {
        &self.images
    }

    pub fn get(&self, label: usize) -> &ColorImage {
        &self.images[label]
    }

    /// Color of image `label` at a grid position.
    pub fn sample(&self, label: usize, point: Coordinate) -> Color {
        self.images[label].get_pixel(point.col as usize, point.row as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_rejects_single_image() {
        let result = ImageStack::new(vec![ColorImage::new_w_h(2, 2)]);
        assert_eq!(
            result.err(),
            Some(MontageError::TooFewImages {
                required: MIN_REQUIRED_IMAGES,
                given: 1
            })
        );
    }

    #[test]
    fn stack_rejects_mismatched_dimensions() {
        let result = ImageStack::new(vec![ColorImage::new_w_h(2, 2), ColorImage::new_w_h(2, 3)]);
        assert!(matches!(
            result.err(),
            Some(MontageError::DimensionMismatch { index: 1, .. })
        ));
    }

    #[test]
    fn stack_samples_by_label() {
        let a = ColorImage::new_filled(2, 2, Color::new(1, 2, 3));
        let b = ColorImage::new_filled(2, 2, Color::new(4, 5, 6));
        let stack = ImageStack::new(vec![a, b]).unwrap();
        assert_eq!(stack.sample(0, Coordinate::new(1, 1)), Color::new(1, 2, 3));
        assert_eq!(stack.sample(1, Coordinate::new(0, 1)), Color::new(4, 5, 6));
    }

    #[test]
    fn image_pixel_round_trip() {
        let mut image = ColorImage::new_w_h(3, 2);
        image.set_pixel(2, 1, &Color::new(9, 8, 7));
        assert_eq!(image.get_pixel(2, 1), Color::new(9, 8, 7));
        assert_eq!(image.get_pixel(0, 0), Color::new(0, 0, 0));
    }
}
