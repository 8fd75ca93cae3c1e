use crate::maxflow::{FlowNetwork, MaxFlowSolver, NodeId, Segment};
use crate::{Coordinate, CostModel, Label};

/// Upper bound on full passes over the label set.
pub const MAX_PASSES: usize = 100;

/// Residual pairwise weight above this after the submodular reduction
/// means the cost model violates the metric assumption.
const NONMETRIC_TOLERANCE: f64 = 0.0001;

/// Neighbor offsets covering each undirected grid edge exactly once.
const NEIGHBORS: [Coordinate; 2] = [Coordinate::new(1, 0), Coordinate::new(0, -1)];

/// Running record of submodularity violations observed while building
/// expansion graphs. A non-empty record means expansion moves are no
/// longer guaranteed to reach a strong local optimum.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub struct NonmetricStats {
    pub occurrences: usize,
    pub max_excess: f64,
}

impl NonmetricStats {
    fn record(&mut self, excess: f64) {
        self.occurrences += 1;
        if excess > self.max_excess {
            self.max_excess = excess;
        }
    }
}

/// Alpha-expansion over a label grid. One move per candidate label: every
/// pixel may either keep its label or switch to the candidate, decided
/// jointly by one min-cut; moves that fail to lower the energy are
/// discarded, so the energy never increases.
///
/// The cost model is injected as a strategy; the engine itself owns the
/// label grid and the move mechanics.
pub struct ExpansionEngine<M: CostModel> {
    model: M,
    labels: Vec<Label>,
    width: usize,
    height: usize,
    limit: Coordinate,
    /// Which terminal represents the candidate label. Fixed per instance;
    /// both polarities produce the same optima.
    alpha_at_sink: bool,
    nonmetric: NonmetricStats,
}

impl<M: CostModel> ExpansionEngine<M> {
    pub fn new(model: M, width: usize, height: usize) -> Self {
        Self::with_polarity(model, width, height, false)
    }

    pub fn with_polarity(model: M, width: usize, height: usize, alpha_at_sink: bool) -> Self {
        Self {
            model,
            labels: vec![0; width * height],
            width,
            height,
            limit: Coordinate::new(width as i32, height as i32),
            alpha_at_sink,
            nonmetric: NonmetricStats::default(),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn label_at(&self, point: Coordinate) -> Label {
        assert!(point.in_bounds(self.limit), "coordinate {:?} outside grid", point);
        self.labels[point.index(self.width)]
    }

    /// Replaces the whole label grid, e.g. to resume from a prior run.
    pub fn set_labels(&mut self, labels: Vec<Label>) {
        assert_eq!(labels.len(), self.width * self.height);
        assert!(labels
            .iter()
            .all(|&label| (label as usize) < self.model.label_count()));
        self.labels = labels;
    }

    pub fn nonmetric_stats(&self) -> NonmetricStats {
        self.nonmetric
    }

    /// Total energy of a labeling: data penalties over all pixels plus
    /// each undirected neighbor pair's interaction penalty counted once.
    pub fn compute_energy(&self) -> f64 {
        let mut energy = 0.0;
        for row in 0..self.height as i32 {
            for col in 0..self.width as i32 {
                let p = Coordinate::new(col, row);
                let p_label = self.labels[p.index(self.width)];
                energy += self.model.data_penalty(p, p_label);

                for offset in &NEIGHBORS {
                    let q = p + *offset;
                    if q.in_bounds(self.limit) {
                        let q_label = self.labels[q.index(self.width)];
                        energy += self.model.interaction_penalty(p, q, p_label, q_label);
                    }
                }
            }
        }
        energy
    }

    /// One expansion move toward `alpha`. Returns the energy after the
    /// move: strictly lower if the move was accepted and the labels
    /// rewritten, otherwise exactly `energy_old` with the labels intact.
    pub fn expand(&mut self, alpha: Label, energy_old: f64) -> f64 {
        assert!(
            (alpha as usize) < self.model.label_count(),
            "candidate label {} outside the label set",
            alpha
        );
        log::debug!("expansion move toward label {}, energy {}", alpha, energy_old);

        let size = self.width * self.height;
        let mut net = FlowNetwork::with_capacity(size);
        let mut node_of: Vec<Option<NodeId>> = vec![None; size];
        let mut terminal_delta = vec![0.0; size];
        let mut energy = 0.0;

        // Pixels already at alpha cannot change in this move; they join the
        // energy directly and get no graph node. Every other pixel gets a
        // node with the data-cost delta of switching.
        for row in 0..self.height as i32 {
            for col in 0..self.width as i32 {
                let p = Coordinate::new(col, row);
                let index = p.index(self.width);
                let p_label = self.labels[index];

                if p_label == alpha {
                    energy += self.model.data_penalty(p, p_label);
                    continue;
                }

                node_of[index] = Some(net.add_node());
                let current = self.model.data_penalty(p, p_label);
                terminal_delta[index] = self.model.data_penalty(p, alpha) - current;
                energy += current;
            }
        }

        // Pairwise terms via the submodular reduction: shared lower bounds
        // move into the endpoint terminal deltas, the residual becomes the
        // edge between the two nodes.
        for row in 0..self.height as i32 {
            for col in 0..self.width as i32 {
                let p = Coordinate::new(col, row);
                let p_index = p.index(self.width);
                let p_label = self.labels[p_index];

                for offset in &NEIGHBORS {
                    let q = p + *offset;
                    if !q.in_bounds(self.limit) {
                        continue;
                    }
                    let q_index = q.index(self.width);
                    let q_label = self.labels[q_index];

                    match (node_of[p_index], node_of[q_index]) {
                        (Some(p_node), Some(q_node)) => {
                            let mut penalty00 =
                                self.model.interaction_penalty(p, q, p_label, q_label);
                            let mut penalty0a =
                                self.model.interaction_penalty(p, q, p_label, alpha);
                            let mut penalty_a0 =
                                self.model.interaction_penalty(p, q, alpha, q_label);

                            let delta = penalty00.min(penalty0a);
                            if delta > 0.0 {
                                terminal_delta[p_index] -= delta;
                                energy += delta;
                                penalty00 -= delta;
                                penalty0a -= delta;
                            }
                            let delta = penalty00.min(penalty_a0);
                            if delta > 0.0 {
                                terminal_delta[q_index] -= delta;
                                energy += delta;
                                penalty00 -= delta;
                                penalty_a0 -= delta;
                            }

                            if penalty00 > NONMETRIC_TOLERANCE {
                                self.nonmetric.record(penalty00);
                                log::warn!(
                                    "non-metric interaction penalty between {:?} and {:?}, residual {}",
                                    p,
                                    q,
                                    penalty00
                                );
                            }

                            if self.alpha_at_sink {
                                net.add_edge(p_node, q_node, penalty0a, penalty_a0);
                            } else {
                                net.add_edge(p_node, q_node, penalty_a0, penalty0a);
                            }
                        }
                        (Some(_), None) => {
                            // Neighbor is fixed at alpha; the seam cost of
                            // p staying put folds into p's terminal delta.
                            let delta = self.model.interaction_penalty(p, q, p_label, alpha);
                            terminal_delta[p_index] -= delta;
                            energy += delta;
                        }
                        (None, Some(_)) => {
                            let delta = self.model.interaction_penalty(p, q, alpha, q_label);
                            terminal_delta[q_index] -= delta;
                            energy += delta;
                        }
                        (None, None) => {}
                    }
                }
            }
        }

        // Accumulated deltas become terminal capacities; which terminal
        // depends on the polarity.
        for index in 0..size {
            if let Some(node) = node_of[index] {
                let delta = terminal_delta[index];
                if self.alpha_at_sink {
                    if delta > 0.0 {
                        net.set_terminal_weights(node, delta, 0.0);
                    } else {
                        net.set_terminal_weights(node, 0.0, -delta);
                        energy += delta;
                    }
                } else if delta > 0.0 {
                    net.set_terminal_weights(node, 0.0, delta);
                } else {
                    net.set_terminal_weights(node, -delta, 0.0);
                    energy += delta;
                }
            }
        }

        energy += MaxFlowSolver::new(&mut net).run();

        if energy < energy_old {
            let changed_side = if self.alpha_at_sink {
                Segment::Sink
            } else {
                Segment::Source
            };
            for index in 0..size {
                if let Some(node) = node_of[index] {
                    if net.segment_of(node) == changed_side {
                        self.labels[index] = alpha;
                    }
                }
            }
            energy
        } else {
            energy_old
        }
    }

    /// Runs expansion moves over all labels in stack order until a full
    /// pass accepts no move, or the pass cap is hit. Returns the final
    /// energy; the label grid is updated in place.
    pub fn compute(&mut self) -> f64 {
        let mut energy = self.compute_energy();
        log::debug!("starting energy {}", energy);

        for pass in 0..MAX_PASSES {
            let mut improved = false;
            for label in 0..self.model.label_count() {
                let before = energy;
                energy = self.expand(label as Label, before);
                if energy < before {
                    improved = true;
                }
                log::debug!("pass {}, label {}, energy {}", pass, label, energy);
            }
            if !improved {
                break;
            }
        }
        energy
    }

    /// Data penalty of the current label at a grid position.
    pub fn current_data_penalty(&self, point: Coordinate) -> f64 {
        assert!(point.in_bounds(self.limit), "coordinate {:?} outside grid", point);
        self.model.data_penalty(point, self.labels[point.index(self.width)])
    }

    /// Largest interaction penalty between a grid position and its
    /// in-bounds 4-neighborhood under the current labeling.
    pub fn current_max_interaction_penalty(&self, point: Coordinate) -> f64 {
        assert!(point.in_bounds(self.limit), "coordinate {:?} outside grid", point);
        let p_label = self.labels[point.index(self.width)];
        let offsets = [
            Coordinate::new(-1, 0),
            Coordinate::new(1, 0),
            Coordinate::new(0, -1),
            Coordinate::new(0, 1),
        ];
        let mut max_penalty = 0.0f64;
        for offset in &offsets {
            let q = point + *offset;
            if q.in_bounds(self.limit) {
                let q_label = self.labels[q.index(self.width)];
                let penalty = self.model.interaction_penalty(point, q, p_label, q_label);
                max_penalty = max_penalty.max(penalty);
            }
        }
        max_penalty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Potts-style toy model over a tiny grid: data costs come from a
    /// table, disagreeing neighbors pay a flat rate.
    struct PottsModel {
        labels: usize,
        width: usize,
        /// Per pixel, per label.
        data: Vec<Vec<f64>>,
        rate: f64,
    }

    impl CostModel for PottsModel {
        fn label_count(&self) -> usize {
            self.labels
        }

        fn data_penalty(&self, point: Coordinate, label: Label) -> f64 {
            self.data[point.index(self.width)][label as usize]
        }

        fn interaction_penalty(
            &self,
            _p: Coordinate,
            _q: Coordinate,
            p_label: Label,
            q_label: Label,
        ) -> f64 {
            if p_label == q_label {
                0.0
            } else {
                self.rate
            }
        }
    }

    /// 1x2 grid, 2 labels. Pixel 0 prefers label 0, pixel 1 prefers
    /// label 1; the seam rate decides whether they agree.
    fn two_pixel_model(rate: f64) -> PottsModel {
        PottsModel {
            labels: 2,
            width: 2,
            data: vec![vec![0.0, 2.0], vec![2.0, 0.0]],
            rate,
        }
    }

    #[test]
    fn energy_counts_each_edge_once() {
        let model = two_pixel_model(0.5);
        let mut engine = ExpansionEngine::new(model, 2, 1);
        engine.set_labels(vec![0, 1]);
        // data 0.0 + 0.0, one seam at 0.5
        assert_eq!(engine.compute_energy(), 0.5);

        engine.set_labels(vec![0, 0]);
        // data 0.0 + 2.0, no seam
        assert_eq!(engine.compute_energy(), 2.0);
    }

    #[test]
    fn cheap_seam_splits_labels() {
        let mut engine = ExpansionEngine::new(two_pixel_model(0.5), 2, 1);
        let energy = engine.compute();
        assert_eq!(engine.labels(), &[0, 1]);
        assert!((energy - 0.5).abs() < 1e-9);
        assert!((engine.compute_energy() - energy).abs() < 1e-9);
    }

    #[test]
    fn expensive_seam_merges_labels() {
        // Seam costs more than the worst data penalty, so one label wins.
        let mut engine = ExpansionEngine::new(two_pixel_model(5.0), 2, 1);
        let energy = engine.compute();
        assert_eq!(engine.labels()[0], engine.labels()[1]);
        assert!((energy - 2.0).abs() < 1e-9);
        assert!((engine.compute_energy() - energy).abs() < 1e-9);
    }

    #[test]
    fn expand_never_increases_energy() {
        let mut engine = ExpansionEngine::new(two_pixel_model(1.0), 2, 1);
        for start in [[0u16, 0], [0, 1], [1, 0], [1, 1]] {
            for alpha in 0..2u16 {
                engine.set_labels(start.to_vec());
                let before = engine.compute_energy();
                let after = engine.expand(alpha, before);
                assert!(after <= before, "expand({}) raised {} to {}", alpha, before, after);
                assert!((engine.compute_energy() - after).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn both_polarities_agree() {
        for alpha_at_sink in [false, true] {
            let mut engine =
                ExpansionEngine::with_polarity(two_pixel_model(0.5), 2, 1, alpha_at_sink);
            let energy = engine.compute();
            assert_eq!(engine.labels(), &[0, 1]);
            assert!((energy - 0.5).abs() < 1e-9);
        }
    }

    /// Interaction table that breaks the metric assumption: switching
    /// either endpoint to alpha is far cheaper than the current seam.
    struct NonmetricModel;

    impl CostModel for NonmetricModel {
        fn label_count(&self) -> usize {
            3
        }

        fn data_penalty(&self, _point: Coordinate, _label: Label) -> f64 {
            1.0
        }

        fn interaction_penalty(
            &self,
            _p: Coordinate,
            _q: Coordinate,
            p_label: Label,
            q_label: Label,
        ) -> f64 {
            if p_label == q_label {
                0.0
            } else if p_label == 2 || q_label == 2 {
                0.1
            } else {
                10.0
            }
        }
    }

    #[test]
    fn nonmetric_costs_are_reported() {
        let mut engine = ExpansionEngine::new(NonmetricModel, 2, 1);
        engine.set_labels(vec![0, 1]);
        let before = engine.compute_energy();
        engine.expand(2, before);
        let stats = engine.nonmetric_stats();
        assert!(stats.occurrences > 0);
        // residual = 10.0 - 0.1 - 0.1
        assert!((stats.max_excess - 9.8).abs() < 1e-9);
    }

    #[test]
    fn introspection_reads_current_labeling() {
        let mut engine = ExpansionEngine::new(two_pixel_model(0.5), 2, 1);
        engine.set_labels(vec![0, 1]);
        let p = Coordinate::new(0, 0);
        assert_eq!(engine.current_data_penalty(p), 0.0);
        assert_eq!(engine.current_max_interaction_penalty(p), 0.5);

        engine.set_labels(vec![1, 1]);
        assert_eq!(engine.current_data_penalty(p), 2.0);
        assert_eq!(engine.current_max_interaction_penalty(p), 0.0);
    }

    #[test]
    #[should_panic(expected = "outside grid")]
    fn introspection_rejects_out_of_bounds() {
        let engine = ExpansionEngine::new(two_pixel_model(0.5), 2, 1);
        engine.current_data_penalty(Coordinate::new(2, 0));
    }
}
