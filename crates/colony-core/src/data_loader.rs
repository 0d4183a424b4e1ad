//! Data-driven registry loading.
//!
//! Feature-gated behind `data-loader`. Building templates are read from JSON,
//! TOML or RON into a [`RegistryBuilder`]; the caller finalizes it, which is
//! where layout validation happens.

use crate::registry::{BuildingTemplateDef, RegistryBuilder};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Top-level content file.
#[derive(Debug, Default, serde::Deserialize)]
pub struct RegistryData {
    #[serde(default)]
    pub buildings: Vec<BuildingTemplateDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Toml,
    Ron,
}

pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        Some("ron") => Ok(Format::Ron),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ---------------------------------------------------------------------------
// Loading functions
// ---------------------------------------------------------------------------

/// Load templates from a JSON string.
pub fn load_registry_json(json: &str) -> Result<RegistryBuilder, DataLoadError> {
    load_registry_str(json, Format::Json, Path::new("<json>"))
}

/// Load templates from `content` in the given format. `origin` only labels
/// parse errors.
pub fn load_registry_str(content: &str, format: Format, origin: &Path) -> Result<RegistryBuilder, DataLoadError> {
    let parse_error = |detail: String| DataLoadError::Parse {
        file: origin.to_path_buf(),
        detail,
    };
    let data: RegistryData = match format {
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(e.to_string()))?,
    };
    Ok(build_registry(data))
}

/// Load templates from a file; the format comes from its extension.
pub fn load_registry_file(path: &Path) -> Result<RegistryBuilder, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    tracing::debug!(file = %path.display(), ?format, "loading building templates");
    load_registry_str(&content, format, path)
}

fn build_registry(data: RegistryData) -> RegistryBuilder {
    let mut builder = RegistryBuilder::new();
    for def in data.buildings {
        builder.register_building(&def.name, def.worker, def.variant, def.stacks);
    }
    builder
}
