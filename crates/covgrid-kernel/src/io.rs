//! File loading helpers shared by the CLI and tests.

use crate::error::CovgridError;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub fn read_json_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, CovgridError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| CovgridError::ReadFile {
        path: display_path(path),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| CovgridError::ParseJson {
        path: display_path(path),
        source,
    })
}

pub fn read_toml_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, CovgridError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| CovgridError::ReadFile {
        path: display_path(path),
        source,
    })?;
    toml::from_str(&text).map_err(|source| CovgridError::ParseToml {
        path: display_path(path),
        source,
    })
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
