//! Error types for covgrid boundary operations.
//!
//! The validators themselves never fail: malformed content becomes a
//! [`Warning`](crate::Warning). These errors only cover getting bytes in
//! from disk and compiling configured patterns.

/// Errors arising while loading inputs or configuration.
#[derive(Debug, thiserror::Error)]
pub enum CovgridError {
    /// The file could not be read.
    #[error("failed to read file: {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for the expected shape.
    #[error("invalid json at {path}: {source}")]
    ParseJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The file is not valid TOML for the expected shape.
    #[error("invalid toml at {path}: {source}")]
    ParseToml {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// A configured pattern does not compile.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Compile a configured pattern, keeping the offending text in the error.
pub fn compile_pattern(pattern: &str) -> Result<regex::Regex, CovgridError> {
    regex::Regex::new(pattern).map_err(|source| CovgridError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}
