pub mod logistic;

pub use logistic::{BinaryLogisticModel, LogisticModel, LogisticParams};
