use crate::energy::model::{color_difference_metric, CostModel, Label, INFINITE_CAPACITY};
use crate::{Coordinate, HistogramTable, ImageStack, MontageError};

/// Floor added to every nonzero seam penalty; keeps disagreeing labels
/// strictly more expensive than agreeing ones even where the sources
/// match exactly.
const PENALTY_FLOOR: f64 = 0.000001;

/// Scale of the color-difference metric relative to the data term.
const PENALTY_SCALE: f64 = 0.1;

/// Cost model backed by per-pixel color histograms of the stack. A label
/// is cheap where its color is common across the sources at that pixel,
/// and seams are cheap where the two sources look alike.
pub struct LikelihoodModel {
    stack: ImageStack,
    histograms: HistogramTable,
    limit: Coordinate,
}

impl LikelihoodModel {
    pub fn new(stack: ImageStack) -> Result<Self, MontageError> {
        let histograms = HistogramTable::build(&stack)?;
        let limit = Coordinate::new(stack.width() as i32, stack.height() as i32);
        Ok(Self {
            stack,
            histograms,
            limit,
        })
    }

    pub fn stack(&self) -> &ImageStack {
        &self.stack
    }

    pub fn histograms(&self) -> &HistogramTable {
        &self.histograms
    }
}

impl CostModel for LikelihoodModel {
    fn label_count(&self) -> usize {
        self.stack.len()
    }

    /// One minus the empirical probability of the label's color at that
    /// pixel. Out-of-bounds positions are unpayable.
    fn data_penalty(&self, point: Coordinate, label: Label) -> f64 {
        if !point.in_bounds(self.limit) {
            return INFINITE_CAPACITY;
        }
        let color = self.stack.sample(label as usize, point);
        let probability = self
            .histograms
            .pixel(point.col as usize, point.row as usize)
            .probability(&color);
        assert!(
            (0.0..=1.0).contains(&probability),
            "probability {} outside the unit interval",
            probability
        );
        1.0 - probability
    }

    fn interaction_penalty(
        &self,
        p: Coordinate,
        q: Coordinate,
        p_label: Label,
        q_label: Label,
    ) -> f64 {
        let metric = color_difference_metric(&self.stack, p, q, p_label, q_label);
        if metric == 0.0 {
            0.0
        } else {
            PENALTY_FLOOR + PENALTY_SCALE * metric
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, ColorImage};

    fn small_stack() -> ImageStack {
        let a = ColorImage::new_filled(2, 2, Color::new(100, 100, 100));
        let mut b = ColorImage::new_filled(2, 2, Color::new(100, 100, 100));
        b.set_pixel(1, 1, &Color::new(160, 100, 100));
        ImageStack::new(vec![a, b]).unwrap()
    }

    #[test]
    fn data_penalty_reflects_agreement() {
        let model = LikelihoodModel::new(small_stack()).unwrap();
        // Both sources agree at (0, 0); either label is free there.
        assert_eq!(model.data_penalty(Coordinate::new(0, 0), 0), 0.0);
        assert_eq!(model.data_penalty(Coordinate::new(0, 0), 1), 0.0);
        // At (1, 1) each source sees its own color half the time.
        assert!((model.data_penalty(Coordinate::new(1, 1), 0) - 0.5).abs() < 1e-12);
        assert!((model.data_penalty(Coordinate::new(1, 1), 1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn data_penalty_stays_in_unit_interval() {
        let model = LikelihoodModel::new(small_stack()).unwrap();
        for row in 0..2 {
            for col in 0..2 {
                for label in 0..2 {
                    let penalty = model.data_penalty(Coordinate::new(col, row), label);
                    assert!((0.0..=1.0).contains(&penalty));
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_is_unpayable() {
        let model = LikelihoodModel::new(small_stack()).unwrap();
        assert_eq!(
            model.data_penalty(Coordinate::new(-1, 0), 0),
            INFINITE_CAPACITY
        );
        assert_eq!(
            model.data_penalty(Coordinate::new(0, 2), 1),
            INFINITE_CAPACITY
        );
    }

    #[test]
    fn equal_labels_cost_nothing() {
        let model = LikelihoodModel::new(small_stack()).unwrap();
        let p = Coordinate::new(0, 1);
        let q = Coordinate::new(1, 1);
        assert_eq!(model.interaction_penalty(p, q, 0, 0), 0.0);
        assert_eq!(model.interaction_penalty(p, q, 1, 1), 0.0);
    }

    #[test]
    fn identical_sources_cost_nothing_across_labels() {
        // The sources only differ at (1, 1); a seam along the top row is
        // free because the underlying colors match.
        let model = LikelihoodModel::new(small_stack()).unwrap();
        let p = Coordinate::new(0, 0);
        let q = Coordinate::new(1, 0);
        assert_eq!(model.interaction_penalty(p, q, 0, 1), 0.0);
    }

    #[test]
    fn visible_seams_carry_the_floor() {
        let model = LikelihoodModel::new(small_stack()).unwrap();
        let p = Coordinate::new(1, 0);
        let q = Coordinate::new(1, 1);
        // Sources differ by 60 in red at q only: metric 60 / 6 = 10.
        let expected = PENALTY_FLOOR + PENALTY_SCALE * 10.0;
        let penalty = model.interaction_penalty(p, q, 0, 1);
        assert!((penalty - expected).abs() < 1e-12);
        assert!(penalty >= PENALTY_FLOOR);
    }

    #[test]
    fn interaction_is_symmetric() {
        let model = LikelihoodModel::new(small_stack()).unwrap();
        let p = Coordinate::new(1, 0);
        let q = Coordinate::new(1, 1);
        assert_eq!(
            model.interaction_penalty(p, q, 0, 1),
            model.interaction_penalty(q, p, 1, 0)
        );
    }
}
