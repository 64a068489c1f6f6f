pub mod labels;
pub mod prediction;

pub use labels::{AlignError, LabelSet};
pub use prediction::Prediction;
