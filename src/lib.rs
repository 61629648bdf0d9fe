pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig};

pub use config::toml_config::TomlConfig;
pub use core::{engine::PipelineEngine, motif_db::MotifDb, pipeline::PhosphoPipeline};
pub use domain::model::RunSummary;
pub use utils::error::{PhosphomError, Result};
