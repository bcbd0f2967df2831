pub mod binary_relevance;
pub mod committee;
pub mod density;
pub mod error_reduction;
pub mod factory;
pub mod multilabel;
pub mod uncertainty;
pub mod variance_reduction;
