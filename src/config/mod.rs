#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use std::path::Path;

/// Output file prefix derived from the input document, e.g. `peptides` for `data/peptides.docx`.
pub fn default_base_name(word_path: &str) -> &str {
    Path::new(word_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("phosphom")
}

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use super::default_base_name;
    use crate::core::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "phosphom")]
    #[command(about = "Map kinase phosphorylation motifs onto Word documents and validate them against PhosphoSitePlus")]
    #[command(version)]
    pub struct CliConfig {
        /// Word document with protein sequences and annotated peptides
        #[arg(short = 'w', long = "word")]
        pub word: String,

        /// PSP substrate workbook (.xlsx) or directory of <kinase>.csv files
        #[arg(short = 'r', long = "ref", env = "PHOSPHOM_REFERENCE")]
        pub reference: Option<String>,

        /// Directory receiving the mapped document and reports
        #[arg(short = 'o', long = "output", default_value = ".")]
        pub output_path: String,

        /// Prefix for output files (defaults to the input file name)
        #[arg(short = 'n', long = "name")]
        pub name: Option<String>,

        /// Minimum motif specificity reported in annotations
        #[arg(short = 'c', long = "confidence", default_value_t = 0.0)]
        pub min_confidence: f64,

        /// Enable verbose output
        #[arg(short, long)]
        pub verbose: bool,

        /// Log CPU and memory usage per stage
        #[arg(long)]
        pub monitor: bool,

        /// Emit logs as JSON lines on stderr
        #[arg(long)]
        pub json_logs: bool,
    }

    impl ConfigProvider for CliConfig {
        fn word_path(&self) -> &str {
            &self.word
        }

        fn reference_path(&self) -> Option<&str> {
            self.reference.as_deref()
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn base_name(&self) -> &str {
            self.name
                .as_deref()
                .unwrap_or_else(|| default_base_name(&self.word))
        }

        fn min_confidence(&self) -> f64 {
            self.min_confidence
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_path("word", &self.word)?;
            validation::validate_file_extension("word", &self.word, &["docx"])?;
            if let Some(reference) = &self.reference {
                validation::validate_reference_path("ref", reference)?;
            }
            validation::validate_path("output", &self.output_path)?;
            if let Some(name) = &self.name {
                validation::validate_non_empty_string("name", name)?;
            }
            validation::validate_range("confidence", self.min_confidence, 0.0, 1.0)?;
            Ok(())
        }
    }

}
