pub mod color;
pub mod coord;
pub mod energy;
pub mod error;
pub mod histogram;
pub mod image;
pub mod maxflow;
pub mod montage;

pub use color::*;
pub use coord::*;
pub use energy::*;
pub use error::*;
pub use histogram::*;
pub use image::*;
pub use maxflow::*;
pub use montage::*;
