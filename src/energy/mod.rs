pub mod engine;
pub mod likelihood;
pub mod model;

pub use engine::{ExpansionEngine, NonmetricStats, MAX_PASSES};
pub use likelihood::LikelihoodModel;
pub use model::{color_difference_metric, CostModel, Label, INFINITE_CAPACITY};
