use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("not a unit file: {path}")]
    UnsupportedPath { path: String },

    #[error("no unit files resolved from the provided path(s)")]
    NoSourceFiles,

    #[error("no Agent, Team, or Workflow instances found in the provided path(s)")]
    NoUnitsDiscovered,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Discovery,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl BootstrapError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BootstrapError::PathNotFound { .. }
            | BootstrapError::UnsupportedPath { .. }
            | BootstrapError::NoSourceFiles => ErrorCategory::Input,
            BootstrapError::NoUnitsDiscovered => ErrorCategory::Discovery,
            BootstrapError::ConfigError { .. } | BootstrapError::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            BootstrapError::IoError(_) | BootstrapError::ServerError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Discovery => ErrorSeverity::High,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            BootstrapError::PathNotFound { path } => {
                format!("Check that '{}' exists and is readable", path)
            }
            BootstrapError::UnsupportedPath { path } => {
                format!("Pass a .toml unit file or a directory instead of '{}'", path)
            }
            BootstrapError::NoSourceFiles => {
                "Point at .toml unit files or at directories that contain them".to_string()
            }
            BootstrapError::NoUnitsDiscovered => {
                "Define at least one top-level table with kind = \"agent\", \"team\" or \"workflow\"; check the warnings above for skipped files".to_string()
            }
            BootstrapError::ConfigError { .. } | BootstrapError::InvalidConfigValueError { .. } => {
                "Fix agentos.toml or the AGENTOS_* environment variables".to_string()
            }
            BootstrapError::IoError(_) => "Check file permissions and available disk space".to_string(),
            BootstrapError::ServerError { .. } => {
                "Make sure the host is resolvable and the port is free".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        format!("Error: {}", self)
    }

    /// Every fatal condition terminates the process with status 1.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// A recoverable failure while evaluating one unit module.
///
/// `install_hint` pattern-matches the `Display` text, so `ModuleNotFound`
/// must keep the "No module named" wording.
#[derive(Error, Debug)]
pub enum LoadFailure {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid syntax: {message}")]
    Syntax { message: String },

    #[error("No module named '{name}'")]
    ModuleNotFound { name: String },

    #[error("cannot import name '{name}' from '{module}'")]
    ImportName { name: String, module: String },

    #[error("name '{name}' is not defined")]
    UndefinedName { name: String },

    #[error("circular reference while evaluating '{name}'")]
    CircularReference { name: String },

    #[error("circular import of module '{module}'")]
    CircularImport { module: String },

    #[error("unknown kind '{kind}' for '{name}'")]
    UnknownKind { name: String, kind: String },

    #[error("invalid {kind} '{name}': {message}")]
    InvalidUnit {
        name: String,
        kind: String,
        message: String,
    },

    #[error("'{name}' is not an agent or team")]
    NotAMember { name: String },
}

pub type Result<T> = std::result::Result<T, BootstrapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_exit_with_one() {
        let errors = [
            BootstrapError::PathNotFound {
                path: "missing/".to_string(),
            },
            BootstrapError::NoSourceFiles,
            BootstrapError::NoUnitsDiscovered,
        ];
        for e in errors {
            assert_eq!(e.exit_code(), 1);
            assert!(e.severity() >= ErrorSeverity::High);
        }
    }

    #[test]
    fn test_path_error_names_offending_path() {
        let e = BootstrapError::PathNotFound {
            path: "agents/nope.toml".to_string(),
        };
        assert_eq!(e.category(), ErrorCategory::Input);
        assert!(e.user_friendly_message().contains("agents/nope.toml"));
        assert!(e.recovery_suggestion().contains("agents/nope.toml"));
    }

    #[test]
    fn test_module_not_found_wording() {
        let failure = LoadFailure::ModuleNotFound {
            name: "google.genai".to_string(),
        };
        assert_eq!(failure.to_string(), "No module named 'google.genai'");
    }
}
