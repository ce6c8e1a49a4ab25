//! Serde data file structs for dataset definitions.
//!
//! These structs define the on-disk format for items, factory groups,
//! factories and processes. They are deserialized from RON, JSON, or TOML
//! data files and then registered into a core dataset by the loader.

use serde::{Deserialize, Serialize};

fn one() -> f64 {
    1.0
}

// ===========================================================================
// Items
// ===========================================================================

/// An item definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

impl ItemData {
    /// The display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ===========================================================================
// Stacks
// ===========================================================================

/// An item quantity, in short tuple form or full form.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StackData {
    /// Short form: `("item_id", quantity)`.
    Short(String, f64),
    /// Full form with explicit fields.
    Full { item: String, quantity: f64 },
}

impl StackData {
    pub fn item(&self) -> &str {
        match self {
            StackData::Short(item, _) | StackData::Full { item, .. } => item,
        }
    }

    pub fn quantity(&self) -> f64 {
        match self {
            StackData::Short(_, quantity) | StackData::Full { quantity, .. } => *quantity,
        }
    }

    pub fn as_pair(&self) -> (&str, f64) {
        (self.item(), self.quantity())
    }
}

// ===========================================================================
// Factories
// ===========================================================================

/// A factory (machine) definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FactoryData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub groups: Vec<String>,
    #[serde(default = "one")]
    pub duration_multiplier: f64,
    #[serde(default = "one")]
    pub output_multiplier: f64,
}

impl FactoryData {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

// ===========================================================================
// Processes
// ===========================================================================

/// A process (recipe) definition in a data file. Duration defaults to one
/// time unit.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessData {
    pub id: String,
    #[serde(default)]
    pub inputs: Vec<StackData>,
    pub outputs: Vec<StackData>,
    #[serde(default = "one")]
    pub duration: f64,
    pub group: String,
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for a list of items in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

/// Wrapper for a list of factory groups in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlGroups {
    pub groups: Vec<String>,
}

/// Wrapper for a list of factories in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlFactories {
    pub factories: Vec<FactoryData>,
}

/// Wrapper for a list of processes in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlProcesses {
    pub processes: Vec<ProcessData>,
}

// ===========================================================================
// Tests
// ===========================================================================
