use crate::config::default_base_name;
use crate::core::motif_db::MotifSpec;
use crate::core::ConfigProvider;
use crate::utils::error::{PhosphomError, Result};
use crate::utils::validation::{self, Validate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

static ENV_VAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
    /// Extra motifs appended to the built-in database.
    #[serde(default)]
    pub motifs: Vec<MotifSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub word: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub min_confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub verbose: Option<bool>,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| PhosphomError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("input.word", &self.input.word)?;
        validation::validate_file_extension("input.word", &self.input.word, &["docx"])?;

        if let Some(reference) = &self.input.reference {
            if reference.contains("${") {
                return Err(PhosphomError::InvalidConfigValueError {
                    field: "input.reference".to_string(),
                    value: reference.clone(),
                    reason: "Unresolved environment variable".to_string(),
                });
            }
            validation::validate_reference_path("input.reference", reference)?;
        }

        validation::validate_path("output.path", &self.output.path)?;
        if let Some(name) = &self.output.name {
            validation::validate_non_empty_string("output.name", name)?;
        }

        validation::validate_range("analysis.min_confidence", self.min_confidence(), 0.0, 1.0)?;

        for (i, motif) in self.motifs.iter().enumerate() {
            validation::validate_non_empty_string(&format!("motifs[{}].kinase", i), &motif.kinase)?;
            validation::validate_non_empty_string(&format!("motifs[{}].pattern", i), &motif.pattern)?;
            validation::validate_range(
                &format!("motifs[{}].specificity", i),
                motif.specificity,
                0.0,
                1.0,
            )?;
        }

        Ok(())
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn verbose(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.verbose)
            .unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn word_path(&self) -> &str {
        &self.input.word
    }

    fn reference_path(&self) -> Option<&str> {
        self.input.reference.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn base_name(&self) -> &str {
        self.output
            .name
            .as_deref()
            .unwrap_or_else(|| default_base_name(&self.input.word))
    }

    fn min_confidence(&self) -> f64 {
        self.analysis.min_confidence.unwrap_or(0.0)
    }

    fn custom_motifs(&self) -> &[MotifSpec] {
        &self.motifs
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
