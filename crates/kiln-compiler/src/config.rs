//! Compiler options
//!
//! Supplied by the driver, usually from a `kiln.toml` `[compiler]` table or
//! built directly in code.

use crate::ir::MemoryAnnotation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur while loading options
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse TOML
    #[error("Failed to parse compiler options: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Validation error
    #[error("Invalid compiler options: {0}")]
    ValidationError(String),
}

/// C++ language level the emitted code may rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetDialect {
    #[serde(rename = "c++17", alias = "cxx17")]
    Cxx17,
    #[default]
    #[serde(rename = "c++20", alias = "cxx20")]
    Cxx20,
}

impl TargetDialect {
    /// Coroutines, `requires` clauses, designated initializers.
    pub fn is_cxx20(&self) -> bool {
        matches!(self, TargetDialect::Cxx20)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    pub target_dialect: TargetDialect,

    /// Category for bindings no rule resolves. Must not be `auto`.
    pub default_ownership: MemoryAnnotation,

    /// Source type name -> emitted type name, applied before built-in mapping.
    pub type_name_overrides: BTreeMap<String, String>,

    pub emit_line_map: bool,

    /// Wrap top-level statements in `Main()` and emit `int main`.
    pub emit_entry_point: bool,

    /// Header of the runtime support library.
    pub runtime_header: String,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            target_dialect: TargetDialect::default(),
            default_ownership: MemoryAnnotation::Shared,
            type_name_overrides: BTreeMap::new(),
            emit_line_map: false,
            emit_entry_point: true,
            runtime_header: "core.h".to_string(),
        }
    }
}

impl CompilerOptions {
    /// Parse options from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let options: CompilerOptions = toml::from_str(content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_ownership == MemoryAnnotation::Auto {
            return Err(ConfigError::ValidationError(
                "default_ownership must be a concrete category, not 'auto'".to_string(),
            ));
        }
        if let Some((from, _)) = self.type_name_overrides.iter().find(|(_, to)| to.trim().is_empty()) {
            return Err(ConfigError::ValidationError(format!(
                "type_name_overrides entry '{}' maps to an empty name",
                from
            )));
        }
        if self.runtime_header.trim().is_empty() {
            return Err(ConfigError::ValidationError("runtime_header is empty".to_string()));
        }
        Ok(())
    }

    pub fn with_dialect(mut self, dialect: TargetDialect) -> Self {
        self.target_dialect = dialect;
        self
    }

    pub fn with_default_ownership(mut self, ownership: MemoryAnnotation) -> Self {
        self.default_ownership = ownership;
        self
    }

    pub fn with_override(mut self, from: &str, to: &str) -> Self {
        self.type_name_overrides.insert(from.to_string(), to.to_string());
        self
    }

    pub fn with_line_map(mut self, enabled: bool) -> Self {
        self.emit_line_map = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompilerOptions::default();
        assert_eq!(options.target_dialect, TargetDialect::Cxx20);
        assert_eq!(options.default_ownership, MemoryAnnotation::Shared);
        assert!(options.emit_entry_point);
        assert!(!options.emit_line_map);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_parse_full_table() {
        let toml = r#"
            target_dialect = "c++17"
            default_ownership = "unique"
            emit_line_map = true

            [type_name_overrides]
            Date = "std::chrono::system_clock::time_point"
        "#;
        let options = CompilerOptions::from_toml_str(toml).expect("valid options");
        assert_eq!(options.target_dialect, TargetDialect::Cxx17);
        assert_eq!(options.default_ownership, MemoryAnnotation::Unique);
        assert!(options.emit_line_map);
        assert_eq!(
            options.type_name_overrides.get("Date").map(String::as_str),
            Some("std::chrono::system_clock::time_point")
        );
        assert_eq!(options.runtime_header, "core.h");
    }

    #[test]
    fn test_dialect_alias() {
        let options = CompilerOptions::from_toml_str("target_dialect = \"cxx17\"").expect("valid");
        assert!(!options.target_dialect.is_cxx20());
    }

    #[test]
    fn test_auto_default_rejected() {
        let err = CompilerOptions::from_toml_str("default_ownership = \"auto\"").unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_unknown_dialect_is_parse_error() {
        let err = CompilerOptions::from_toml_str("target_dialect = \"c++98\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }
}
