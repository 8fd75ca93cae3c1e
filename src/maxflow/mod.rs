pub mod network;
pub mod solver;

pub use network::{ArcId, FlowNetwork, NodeId, Parent, Segment};
pub use solver::MaxFlowSolver;
