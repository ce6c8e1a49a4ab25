//! Analysis configuration: what to produce, what crosses the boundary, and
//! which machines and solver to use.

use crate::loader::{DataLoadError, deserialize_file};
use crate::schema::StackData;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Which rate solver the pipeline runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverKind {
    /// Demand-propagation walk. Exact for trees and DAGs only.
    Walk,
    /// Linear system over every item.
    #[default]
    Balance,
}

/// Extra multipliers stacked onto a factory (modules, beacons, upgrades).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ModifierData {
    #[serde(default = "one")]
    pub duration: f64,
    #[serde(default = "one")]
    pub output: f64,
}

fn one() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// An analysis request, read from a RON, JSON or TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Item rates to produce.
    pub targets: Vec<StackData>,
    /// Items supplied from outside.
    #[serde(default)]
    pub imports: Vec<String>,
    /// Items allowed to leave the network.
    #[serde(default)]
    pub exports: Vec<String>,
    /// Processes to leave out.
    #[serde(default)]
    pub disabled: Vec<String>,
    /// Process ids in preference order, for items with several producers.
    #[serde(default)]
    pub priorities: Vec<String>,
    /// Factory per process id.
    #[serde(default)]
    pub factories: BTreeMap<String, String>,
    /// Default factory per factory group.
    #[serde(default)]
    pub group_factories: BTreeMap<String, String>,
    /// Multipliers per factory id.
    #[serde(default)]
    pub modifiers: BTreeMap<String, ModifierData>,
    #[serde(default)]
    pub solver: SolverKind,
    /// Convert processes to per-machine rates before solving.
    #[serde(default = "default_true")]
    pub convert_rates: bool,
    #[serde(default = "default_true")]
    pub collapse_cycles: bool,
    /// Treat items nothing produces as imported.
    #[serde(default = "default_true")]
    pub implicit_imports: bool,
    /// Treat items nothing consumes as exported. Balance solver only.
    #[serde(default = "default_true")]
    pub implicit_exports: bool,
    /// Overrides the balance solver's snapping tolerance.
    #[serde(default)]
    pub tolerance: Option<f64>,

    #[serde(skip)]
    source: Option<PathBuf>,
}

impl AnalysisConfig {
    /// A configuration with defaults and the given targets.
    pub fn new(targets: Vec<StackData>) -> Self {
        Self {
            targets,
            imports: Vec::new(),
            exports: Vec::new(),
            disabled: Vec::new(),
            priorities: Vec::new(),
            factories: BTreeMap::new(),
            group_factories: BTreeMap::new(),
            modifiers: BTreeMap::new(),
            solver: SolverKind::default(),
            convert_rates: true,
            collapse_cycles: true,
            implicit_imports: true,
            implicit_exports: true,
            tolerance: None,
            source: None,
        }
    }

    /// The file this configuration was read from, used to scope reference
    /// errors.
    pub fn source(&self) -> &Path {
        self.source
            .as_deref()
            .unwrap_or_else(|| Path::new("<analysis>"))
    }
}

/// Read an analysis configuration; the format follows the extension.
pub fn load_analysis(path: &Path) -> Result<AnalysisConfig, DataLoadError> {
    let mut config: AnalysisConfig = deserialize_file(path)?;
    config.source = Some(path.to_path_buf());
    Ok(config)
}
