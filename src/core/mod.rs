pub mod engine;
pub mod extractor;
pub mod mapping;
pub mod motif_db;
pub mod normalization;
pub mod pipeline;
pub mod reference;
pub mod validation;

pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
