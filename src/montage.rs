use num_traits::clamp;

use crate::{
    Color, ColorImage, Coordinate, CostModel, ExpansionEngine, ImageStack, Label,
    LikelihoodModel, MontageError,
};

/// Scale from penalty units to 8 bit gray for the diagnostic images.
const PENALTY_VALUE_CONVERSION_COEFFICIENT: f64 = 100.0;

/// Marker colors for rendering label maps. Labels past the end wrap
/// around.
pub const LABEL_COLORS: [Color; 21] = [
    Color { r: 255, g: 0, b: 0 },
    Color { r: 0, g: 255, b: 0 },
    Color { r: 0, g: 0, b: 255 },
    Color { r: 255, g: 255, b: 0 },
    Color { r: 255, g: 0, b: 255 },
    Color { r: 0, g: 255, b: 255 },
    Color { r: 255, g: 128, b: 0 },
    Color { r: 255, g: 0, b: 128 },
    Color { r: 0, g: 255, b: 128 },
    Color { r: 128, g: 255, b: 0 },
    Color { r: 0, g: 128, b: 255 },
    Color { r: 255, g: 255, b: 128 },
    Color { r: 255, g: 128, b: 255 },
    Color { r: 128, g: 255, b: 255 },
    Color { r: 255, g: 128, b: 128 },
    Color { r: 128, g: 255, b: 255 },
    Color { r: 255, g: 128, b: 128 },
    Color { r: 128, g: 255, b: 128 },
    Color { r: 128, g: 128, b: 255 },
    Color { r: 128, g: 64, b: 128 },
    Color { r: 128, g: 128, b: 64 },
];

/// End-to-end montage pipeline: takes a stack of aligned exposures,
/// assigns every output pixel a source via energy minimization, and
/// renders the composite plus diagnostic views of the solution.
pub struct Montage {
    engine: ExpansionEngine<LikelihoodModel>,
    width: usize,
    height: usize,
}

impl Montage {
    pub fn new(images: Vec<ColorImage>) -> Result<Self, MontageError> {
        let stack = ImageStack::new(images)?;
        let width = stack.width();
        let height = stack.height();
        let model = LikelihoodModel::new(stack)?;
        Ok(Self {
            engine: ExpansionEngine::new(model, width, height),
            width,
            height,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Runs the optimization to convergence and returns the final energy.
    /// The labeling persists for the render methods.
    pub fn compute(&mut self) -> f64 {
        log::info!(
            "computing montage labeling, {}x{} pixels, {} sources",
            self.width,
            self.height,
            self.engine.model().label_count()
        );
        let energy = self.engine.compute();
        log::info!("montage labeling converged, energy {}", energy);
        energy
    }

    pub fn labels(&self) -> &[Label] {
        self.engine.labels()
    }

    /// Assembles the output image: every pixel is copied from the source
    /// its label names.
    pub fn composite(&self) -> ColorImage {
        let stack = self.engine.model().stack();
        let mut composite = ColorImage::new_w_h(self.width, self.height);
        for (index, &label) in self.engine.labels().iter().enumerate() {
            composite.set_pixel_at(index, &stack.get(label as usize).get_pixel_at(index));
        }
        composite
    }

    /// False-color view of the labeling, one marker color per source.
    pub fn label_image(&self) -> ColorImage {
        let mut image = ColorImage::new_w_h(self.width, self.height);
        for (index, &label) in self.engine.labels().iter().enumerate() {
            image.set_pixel_at(index, &LABEL_COLORS[label as usize % LABEL_COLORS.len()]);
        }
        image
    }

    /// Grayscale view of the per-pixel data penalty under the current
    /// labeling. Brighter means the chosen source is less likely there.
    pub fn data_penalty_image(&self) -> ColorImage {
        self.penalty_image(|engine, point| engine.current_data_penalty(point))
    }

    /// Grayscale view of the worst seam penalty each pixel pays against
    /// its neighborhood. Bright pixels sit on expensive seams.
    pub fn interaction_penalty_image(&self) -> ColorImage {
        self.penalty_image(|engine, point| engine.current_max_interaction_penalty(point))
    }

    fn penalty_image<F>(&self, penalty: F) -> ColorImage
    where
        F: Fn(&ExpansionEngine<LikelihoodModel>, Coordinate) -> f64,
    {
        let mut image = ColorImage::new_w_h(self.width, self.height);
        for row in 0..self.height {
            for col in 0..self.width {
                let value = penalty(&self.engine, Coordinate::new(col as i32, row as i32));
                let gray = clamp(PENALTY_VALUE_CONVERSION_COEFFICIENT * value, 0.0, 255.0) as u8;
                image.set_pixel(col, row, &Color::new(gray, gray, gray));
            }
        }
        image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sources_keep_the_first_label() {
        let color = Color::new(80, 120, 160);
        let images = vec![
            ColorImage::new_filled(4, 4, color),
            ColorImage::new_filled(4, 4, color),
        ];
        let mut montage = Montage::new(images).unwrap();
        let energy = montage.compute();

        assert!(montage.labels().iter().all(|&label| label == 0));
        assert_eq!(energy, 0.0);

        let composite = montage.composite();
        for index in 0..16 {
            assert_eq!(composite.get_pixel_at(index), color);
        }
        let label_image = montage.label_image();
        for index in 0..16 {
            assert_eq!(label_image.get_pixel_at(index), LABEL_COLORS[0]);
        }
    }

    /// Three sources agreeing everywhere except one corner, where the
    /// third source's color is the consensus. The optimizer should
    /// switch exactly that corner to source 2 and leave the rest on the
    /// default source.
    fn outlier_corner_images() -> Vec<ColorImage> {
        let background = [
            Color::new(63, 63, 63),
            Color::new(63, 63, 63),
            Color::new(64, 64, 64),
        ];
        let corner = [
            Color::new(10, 63, 100),
            Color::new(70, 64, 101),
            Color::new(10, 65, 100),
        ];
        background
            .iter()
            .zip(corner.iter())
            .map(|(back, front)| {
                let mut image = ColorImage::new_filled(4, 4, *back);
                image.set_pixel(0, 0, front);
                image
            })
            .collect()
    }

    #[test]
    fn consensus_corner_switches_source() {
        let mut montage = Montage::new(outlier_corner_images()).unwrap();
        montage.compute();

        for row in 0..4 {
            for col in 0..4 {
                let expected = if col == 0 && row == 0 { 2 } else { 0 };
                assert_eq!(
                    montage.labels()[row * 4 + col],
                    expected,
                    "label at ({}, {})",
                    col,
                    row
                );
            }
        }

        let composite = montage.composite();
        assert_eq!(composite.get_pixel(0, 0), Color::new(10, 65, 100));
        assert_eq!(composite.get_pixel(3, 3), Color::new(63, 63, 63));

        let label_image = montage.label_image();
        assert_eq!(label_image.get_pixel(0, 0), LABEL_COLORS[2]);
        assert_eq!(label_image.get_pixel(1, 0), LABEL_COLORS[0]);
    }

    #[test]
    fn penalty_images_expose_the_seam() {
        let mut montage = Montage::new(outlier_corner_images()).unwrap();
        montage.compute();

        let interaction = montage.interaction_penalty_image();
        // The switched corner borders two seams; far pixels border none.
        assert!(interaction.get_pixel(0, 0).r > 0);
        assert_eq!(interaction.get_pixel(3, 3).r, 0);

        let data = montage.data_penalty_image();
        // Data penalty at the corner under source 2 is 5/9.
        assert_eq!(data.get_pixel(0, 0).r, 55);
        // Background pixels under source 0 pay 19/27.
        assert_eq!(data.get_pixel(2, 2).r, 70);
    }

    #[test]
    fn rejects_undersized_stacks() {
        let result = Montage::new(vec![ColorImage::new_w_h(2, 2)]);
        assert!(matches!(
            result,
            Err(MontageError::TooFewImages { given: 1, .. })
        ));
    }
}
