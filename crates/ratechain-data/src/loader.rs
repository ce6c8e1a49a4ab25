//! Reads dataset files, resolves cross-references, builds a [`Dataset`].
//!
//! A dataset directory holds up to four files, each in RON, JSON or TOML and
//! discovered by base name: `items` (required), `groups` (required),
//! `factories` (optional) and `processes` (required).

use crate::schema::{FactoryData, ItemData, ProcessData, StackData};
use ratechain_core::dataset::{Dataset, DatasetBuilder, DatasetError};
use ratechain_core::error::ChainError;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur while loading data files or running an analysis
/// described by them.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A serialization error occurred while writing a file.
    #[error("write error in {file}: {detail}")]
    Write { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// A definition was rejected by the dataset registry.
    #[error("invalid definition in {file}: {source}")]
    Invalid {
        file: PathBuf,
        #[source]
        source: DatasetError,
    },

    /// The analysis itself failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DataLoadError {
    /// Attach a file to a registry error, mapping reference and duplicate
    /// errors onto their file-scoped variants.
    pub fn in_file(file: &Path, err: DatasetError) -> Self {
        let file = file.to_path_buf();
        match err {
            DatasetError::DuplicateItem(name)
            | DatasetError::DuplicateGroup(name)
            | DatasetError::DuplicateFactory(name)
            | DatasetError::DuplicateProcess(name) => DataLoadError::DuplicateName { file, name },
            DatasetError::UnknownItem { item, .. } => DataLoadError::UnresolvedRef {
                file,
                name: item,
                expected_kind: "item",
            },
            DatasetError::UnknownGroup { group, .. } => DataLoadError::UnresolvedRef {
                file,
                name: group,
                expected_kind: "factory group",
            },
            source => DataLoadError::Invalid { file, source },
        }
    }
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    debug!(target: "ratechain::data", file = %path.display(), ?format, "reading data file");

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let table: toml::Value = deserialize_file(path)?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

// ===========================================================================
// Dataset loading
// ===========================================================================

fn stack_refs(stacks: &[StackData]) -> Vec<(&str, f64)> {
    stacks.iter().map(StackData::as_pair).collect()
}

/// Load every dataset file in `dir` and build the registry.
///
/// Definitions are registered in dependency order (items, groups,
/// factories, processes) so each file can reference the ones before it.
pub fn load_dataset(dir: &Path) -> Result<Dataset, DataLoadError> {
    let mut builder = DatasetBuilder::new();

    let items_path = require_data_file(dir, "items")?;
    let items: Vec<ItemData> = deserialize_list(&items_path, "items")?;
    for item in &items {
        builder
            .register_item(&item.id, item.display_name(), item.group.as_deref())
            .map_err(|e| DataLoadError::in_file(&items_path, e))?;
    }

    let groups_path = require_data_file(dir, "groups")?;
    let groups: Vec<String> = deserialize_list(&groups_path, "groups")?;
    for group in &groups {
        builder
            .register_group(group)
            .map_err(|e| DataLoadError::in_file(&groups_path, e))?;
    }

    let mut factory_count = 0;
    if let Some(factories_path) = find_data_file(dir, "factories")? {
        let factories: Vec<FactoryData> = deserialize_list(&factories_path, "factories")?;
        for factory in &factories {
            let groups: Vec<&str> = factory.groups.iter().map(String::as_str).collect();
            builder
                .register_factory(
                    &factory.id,
                    factory.display_name(),
                    &groups,
                    factory.duration_multiplier,
                    factory.output_multiplier,
                )
                .map_err(|e| DataLoadError::in_file(&factories_path, e))?;
        }
        factory_count = factories.len();
    }

    let processes_path = require_data_file(dir, "processes")?;
    let processes: Vec<ProcessData> = deserialize_list(&processes_path, "processes")?;
    for process in &processes {
        builder
            .register_process(
                &process.id,
                &stack_refs(&process.inputs),
                &stack_refs(&process.outputs),
                process.duration,
                &process.group,
            )
            .map_err(|e| DataLoadError::in_file(&processes_path, e))?;
    }

    debug!(
        target: "ratechain::data",
        dir = %dir.display(),
        items = items.len(),
        groups = groups.len(),
        factories = factory_count,
        processes = processes.len(),
        "dataset loaded"
    );
    Ok(builder.build())
}

// ===========================================================================
// Tests
// ===========================================================================
