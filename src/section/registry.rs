//! Section registry: read-only catalog of section contracts, in declaration order.

use crate::error::ApiError;
use crate::section::{SectionKind, SectionSpec};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::error;

/// Catalog of sections that make up one document.
///
/// Declaration order is dispatch order. Keys are unique and validated on construction,
/// so a registry that exists is always usable.
#[derive(Debug, Clone)]
pub struct SectionRegistry {
    sections: Vec<SectionSpec>,
    index: HashMap<String, usize>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sections: Vec<SectionSpec>,
}

impl SectionRegistry {
    /// Build a registry, rejecting empty catalogs, duplicate or blank keys, and
    /// tabular sections without fields.
    pub fn new(sections: Vec<SectionSpec>) -> Result<Self, ApiError> {
        if sections.is_empty() {
            return Err(defect("Registry must contain at least one section".to_string()));
        }

        let mut index = HashMap::with_capacity(sections.len());
        for (position, spec) in sections.iter().enumerate() {
            if spec.key.trim().is_empty() {
                return Err(defect(format!(
                    "Section at position {} has an empty key",
                    position
                )));
            }
            if let SectionKind::Tabular {
                record_shape,
                min_records,
            } = &spec.kind
            {
                if record_shape.is_empty() {
                    return Err(defect(format!(
                        "Tabular section '{}' declares no record fields",
                        spec.key
                    )));
                }
                if *min_records == 0 {
                    return Err(defect(format!(
                        "Tabular section '{}' must require at least one record",
                        spec.key
                    )));
                }
            }
            if index.insert(spec.key.clone(), position).is_some() {
                return Err(defect(format!(
                    "Duplicate section key '{}'",
                    spec.key
                )));
            }
        }

        Ok(Self { sections, index })
    }

    /// Assemble a registry from a catalog already known to be valid.
    pub(crate) fn from_parts(sections: Vec<SectionSpec>, index: HashMap<String, usize>) -> Self {
        Self { sections, index }
    }

    /// Load a catalog from TOML text (`[[sections]]` tables).
    pub fn from_toml_str(content: &str) -> Result<Self, ApiError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::new(file.sections)
    }

    /// Load a catalog from a TOML file on disk.
    pub fn from_file(path: &Path) -> Result<Self, ApiError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ApiError::ConfigError(format!(
                "Failed to read section catalog {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Look up a section by key.
    pub fn get(&self, key: &str) -> Result<&SectionSpec, ApiError> {
        self.index
            .get(key)
            .map(|&position| &self.sections[position])
            .ok_or_else(|| ApiError::UnknownSection(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Sections in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SectionSpec> {
        self.sections.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.key.as_str())
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

fn defect(message: String) -> ApiError {
    error!(reason = %message, "Section registry rejected");
    ApiError::RegistryDefect(message)
}
