use thiserror::Error;

#[derive(Error, Debug)]
pub enum PhosphomError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid motif pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Document error: {message}")]
    DocumentError { message: String },

    #[error("Reference data error: {message}")]
    ReferenceError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("No motif data matching the criteria was found")]
    EmptyExtraction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Reference,
    Processing,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PhosphomError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PhosphomError::ConfigError { .. }
            | PhosphomError::ConfigValidationError { .. }
            | PhosphomError::InvalidConfigValueError { .. }
            | PhosphomError::MissingConfigError { .. }
            | PhosphomError::PatternError(_) => ErrorCategory::Configuration,
            PhosphomError::ZipError(_)
            | PhosphomError::XmlError(_)
            | PhosphomError::DocumentError { .. }
            | PhosphomError::EmptyExtraction => ErrorCategory::Input,
            PhosphomError::ReferenceError { .. } | PhosphomError::CsvError(_) => {
                ErrorCategory::Reference
            }
            PhosphomError::ProcessingError { .. } | PhosphomError::SerializationError(_) => {
                ErrorCategory::Processing
            }
            PhosphomError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PhosphomError::ReferenceError { .. } | PhosphomError::CsvError(_) => {
                ErrorSeverity::Medium
            }
            PhosphomError::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command-line flags or the TOML configuration file"
            }
            ErrorCategory::Input => {
                "Make sure the input is a valid .docx containing protein sequences and annotated peptides"
            }
            ErrorCategory::Reference => {
                "Provide a PhosphoSitePlus reference (.xlsx or a directory of <kinase>.csv) via -r / --ref"
            }
            ErrorCategory::Processing => "Re-run with --verbose to see which step failed",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PhosphomError::EmptyExtraction => {
                "No annotated peptides were found in the mapped document".to_string()
            }
            PhosphomError::MissingConfigError { field } => {
                format!("Required setting '{}' was not provided", field)
            }
            PhosphomError::IoError(e) => format!("File access failed: {}", e),
            other => other.to_string(),
        }
    }

    /// Process exit code for a failed run.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, PhosphomError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = PhosphomError::ReferenceError {
            message: "missing sheet".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Reference);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert_eq!(err.exit_code(), 2);

        let err = PhosphomError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_empty_extraction_fails_the_run() {
        let err = PhosphomError::EmptyExtraction;
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(err.exit_code(), 1);
        assert!(err.user_friendly_message().contains("No annotated peptides"));
    }
}
