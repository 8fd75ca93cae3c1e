use crate::{Coordinate, ImageStack};

/// Index into the image stack selecting which source supplies a pixel.
pub type Label = u16;

/// Large finite stand-in for an infinite cost. Keeps network weights
/// numerically bounded; never reached by realistic color metrics.
pub const INFINITE_CAPACITY: f64 = 1_000_000.0;

/// Divisor applied to the raw color-difference metric.
const INTERACTION_PENALTY_COEFFICIENT: f64 = 6.0;

/// Cost structure driving the expansion engine. Implementations score a
/// label per pixel (`data_penalty`) and a label pair per neighboring pixel
/// pair (`interaction_penalty`).
///
/// The interaction contract: the penalty is 0 when the labels are equal,
/// nonnegative and symmetric otherwise, in the sense that
/// `interaction_penalty(p, q, x, y) == interaction_penalty(q, p, y, x)`.
pub trait CostModel {
    /// Number of labels this model can score.
    fn label_count(&self) -> usize;

    /// Cost of assigning `label` at `point`, independent of neighbors.
    fn data_penalty(&self, point: Coordinate, label: Label) -> f64;

    /// Cost of a seam between neighboring pixels `p` and `q` labeled
    /// `p_label` and `q_label`.
    fn interaction_penalty(
        &self,
        p: Coordinate,
        q: Coordinate,
        p_label: Label,
        q_label: Label,
    ) -> f64;
}

/// Base seam metric between two labels at a neighboring pixel pair: the
/// Euclidean color difference of the two source images, evaluated at both
/// pixels, summed, scaled down and capped.
pub fn color_difference_metric(
    stack: &ImageStack,
    p: Coordinate,
    q: Coordinate,
    p_label: Label,
    q_label: Label,
) -> f64 {
    assert!(
        (p_label as usize) < stack.len() && (q_label as usize) < stack.len(),
        "label pair ({}, {}) outside stack of {} images",
        p_label,
        q_label,
        stack.len()
    );

    if p_label == q_label {
        return 0.0;
    }

    let difference_at = |point: Coordinate| {
        let a = stack.sample(p_label as usize, point).to_color_i32();
        let b = stack.sample(q_label as usize, point).to_color_i32();
        a.diff(&b).to_color_f64().magnitude()
    };

    let metric = (difference_at(p) + difference_at(q)) / INTERACTION_PENALTY_COEFFICIENT;
    metric.min(INFINITE_CAPACITY)
}
