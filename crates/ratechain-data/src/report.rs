//! Serializable summary of a solved chain.

use crate::loader::{DataLoadError, Format, detect_format};
use ratechain_core::solution::Solution;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Produced and consumed rate of one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ItemFlow {
    pub produced: f64,
    pub consumed: f64,
    pub net: f64,
}

/// Flat, map-only view of a [`Solution`], ready to write as RON, JSON or
/// TOML.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Count per process id.
    pub counts: BTreeMap<String, f64>,
    /// Factory count per rate process id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub machines: BTreeMap<String, Machines>,
    pub items: BTreeMap<String, ItemFlow>,
    /// Net inflow required from outside, per item.
    pub imports: BTreeMap<String, f64>,
    /// Net outflow per item.
    pub surplus: BTreeMap<String, f64>,
}

/// Machines running one rate process.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Machines {
    pub factory: String,
    pub count: f64,
}

impl Report {
    pub fn from_solution(solution: &Solution) -> Self {
        let counts = solution.counts.clone();

        let machines = solution
            .chain
            .processes()
            .iter()
            .filter_map(|p| {
                let factory = p.factory()?;
                Some((
                    p.id.clone(),
                    Machines {
                        factory: factory.id.clone(),
                        count: solution.count(&p.id),
                    },
                ))
            })
            .collect();

        let materials = &solution.materials;
        let items = materials
            .items()
            .map(|item| {
                let id = item.id();
                let flow = ItemFlow {
                    produced: materials.total_positive(id),
                    consumed: -materials.total_negative(id),
                    net: materials.total(id),
                };
                (id.to_string(), flow)
            })
            .collect();

        let imports = solution
            .imports()
            .into_iter()
            .map(|s| (s.item.id().to_string(), s.quantity))
            .collect();
        let surplus = solution
            .surplus()
            .into_iter()
            .map(|s| (s.item.id().to_string(), s.quantity))
            .collect();

        Self {
            counts,
            machines,
            items,
            imports,
            surplus,
        }
    }

    /// Render in `format`. `file` only labels errors.
    pub fn render(&self, format: Format, file: &Path) -> Result<String, DataLoadError> {
        let write_error = |detail: String| DataLoadError::Write {
            file: file.to_path_buf(),
            detail,
        };
        match format {
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| write_error(e.to_string())),
            Format::Json => serde_json::to_string_pretty(self).map_err(|e| write_error(e.to_string())),
            Format::Toml => toml::to_string_pretty(self).map_err(|e| write_error(e.to_string())),
        }
    }
}

/// Write `report` to `path`; the format follows the extension.
pub fn write_report(report: &Report, path: &Path) -> Result<(), DataLoadError> {
    let format = detect_format(path)?;
    let text = report.render(format, path)?;
    std::fs::write(path, text)?;
    info!(target: "ratechain::data", file = %path.display(), ?format, "wrote report");
    Ok(())
}
