//! Linear-algebra balance solver.
//!
//! Builds one equation per item: the per-tick flows of every process (output
//! positive, input negative) weighted by the process counts, plus a slack
//! variable for each imported (`+1`) and exported (`-1`) item, must equal the
//! requested rate for target items and zero for everything else. The system
//! is reduced with [`Matrix::reduce`] and the counts read off the last column.

use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::item::Item;
use crate::matrix::{DEFAULT_TOLERANCE, Matrix};
use crate::process::Process;
use crate::solution::{ProcessCounts, Solution};
use crate::stack::{EPSILON, Stack};
use crate::visitor::{ChainVisitor, VisitorCaps};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Configuration for [`BalanceSolver`].
#[derive(Debug, Clone)]
pub struct BalanceConfig {
    /// Snapping tolerance for matrix reduction.
    pub tolerance: f64,
    /// Treat items that no process produces as imported.
    pub implicit_imports: bool,
    /// Treat items that no process consumes (and that are not targets) as exported.
    pub implicit_exports: bool,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            implicit_imports: true,
            implicit_exports: true,
        }
    }
}

/// Solves for process counts that balance every item except targets and
/// boundary (imported/exported) items.
///
/// Free unknowns of an under-determined system are set to zero. A system
/// without a consistent solution, or whose solution needs a process to run a
/// negative number of times, is [`ChainError::Unsatisfiable`].
#[derive(Debug)]
pub struct BalanceSolver {
    targets: Vec<Stack>,
    imports: BTreeSet<String>,
    exports: BTreeSet<String>,
    config: BalanceConfig,

    items: BTreeMap<String, Item>,
    process_ids: BTreeSet<String>,
    /// (item id, process id) -> per-tick coefficient.
    coefficients: BTreeMap<(String, String), f64>,
}

impl BalanceSolver {
    pub fn new(targets: Vec<Stack>) -> Self {
        Self {
            targets,
            imports: BTreeSet::new(),
            exports: BTreeSet::new(),
            config: BalanceConfig::default(),
            items: BTreeMap::new(),
            process_ids: BTreeSet::new(),
            coefficients: BTreeMap::new(),
        }
    }

    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports.extend(imports.into_iter().map(Into::into));
        self
    }

    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports.extend(exports.into_iter().map(Into::into));
        self
    }

    pub fn with_config(mut self, config: BalanceConfig) -> Self {
        self.config = config;
        self
    }

    fn add_coefficient(&mut self, item: &Item, process: &Process, value: f64) {
        *self
            .coefficients
            .entry((item.id().to_string(), process.id.clone()))
            .or_default() += value / process.duration;
    }
}

impl ChainVisitor for BalanceSolver {
    type Output = Solution;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps {
            initialize: true,
            items: true,
            processes: true,
            inputs: true,
            outputs: true,
        }
    }

    fn initialize(&mut self, chain: &ProcessChain) -> Result<(), ChainError> {
        if self.targets.is_empty() {
            return Err(ChainError::MissingPrecondition {
                pass: "balance solver",
                requirement: "at least one target".to_string(),
            });
        }
        for target in &self.targets {
            let id = target.item.id();
            if !chain.produces(id) && !self.imports.contains(id) {
                return Err(ChainError::UnresolvedItem {
                    item: id.to_string(),
                    requested_by: None,
                });
            }
        }
        Ok(())
    }

    fn visit_item(&mut self, item: &Item) -> Result<(), ChainError> {
        self.items.insert(item.id().to_string(), item.clone());
        Ok(())
    }

    fn visit_process(&mut self, process: &Process) -> Result<(), ChainError> {
        self.process_ids.insert(process.id.clone());
        Ok(())
    }

    fn visit_input(&mut self, input: &Stack, process: &Process) -> Result<(), ChainError> {
        self.add_coefficient(&input.item, process, -input.quantity);
        Ok(())
    }

    fn visit_output(&mut self, process: &Process, output: &Stack) -> Result<(), ChainError> {
        self.add_coefficient(&output.item, process, output.quantity);
        Ok(())
    }

    fn finish(self, chain: &ProcessChain) -> Result<Solution, ChainError> {
        let tolerance = self.config.tolerance;
        if let Some(((item, pid), value)) = self.coefficients.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ChainError::Unsatisfiable {
                reason: format!("process '{pid}' has a non-finite rate {value} for item '{item}'"),
            });
        }
        let mut requirement: BTreeMap<&str, f64> = BTreeMap::new();
        for target in &self.targets {
            *requirement.entry(target.item.id()).or_default() += target.quantity;
        }

        // Boundary items, explicit then implicit.
        let mut imports = self.imports.clone();
        let mut exports = self.exports.clone();
        for id in self.items.keys() {
            if requirement.contains_key(id.as_str()) {
                continue;
            }
            if self.config.implicit_imports && !chain.produces(id) {
                imports.insert(id.clone());
            } else if self.config.implicit_exports && !chain.consumes(id) && !imports.contains(id) {
                exports.insert(id.clone());
            }
        }
        for id in &self.imports {
            if !self.items.contains_key(id) {
                debug!(target: "ratechain::solver", item = %id, "import not touched by chain");
            }
        }
        for id in &self.exports {
            if !self.items.contains_key(id) {
                debug!(target: "ratechain::solver", item = %id, "export not touched by chain");
            }
        }

        let rows: Vec<&String> = self.items.keys().collect();
        let row_of: BTreeMap<&str, usize> = rows
            .iter()
            .enumerate()
            .map(|(r, id)| (id.as_str(), r))
            .collect();
        let processes: Vec<&String> = self.process_ids.iter().collect();
        let import_cols: Vec<&String> = imports.iter().filter(|id| row_of.contains_key(id.as_str())).collect();
        let export_cols: Vec<&String> = exports.iter().filter(|id| row_of.contains_key(id.as_str())).collect();

        let unknowns = processes.len() + import_cols.len() + export_cols.len();
        let mut matrix = Matrix::zeros(rows.len(), unknowns + 1);

        for (col, pid) in processes.iter().enumerate() {
            for (r, item_id) in rows.iter().enumerate() {
                let key = ((*item_id).clone(), (*pid).clone());
                if let Some(&v) = self.coefficients.get(&key) {
                    matrix.set(r, col, v);
                }
            }
        }
        let mut col = processes.len();
        for id in &import_cols {
            matrix.set(row_of[id.as_str()], col, 1.0);
            col += 1;
        }
        for id in &export_cols {
            matrix.set(row_of[id.as_str()], col, -1.0);
            col += 1;
        }
        for (id, rate) in &requirement {
            if let Some(&r) = row_of.get(id) {
                matrix.set(r, unknowns, *rate);
            }
        }

        debug!(
            target: "ratechain::solver",
            rows = rows.len(),
            processes = processes.len(),
            imports = import_cols.len(),
            exports = export_cols.len(),
            "reducing balance system"
        );
        let reduction = matrix.reduce(true, tolerance);

        if let Some(&bad) = matrix.inconsistent_rows(tolerance).first() {
            let item = rows[matrix.origin(bad)];
            warn!(target: "ratechain::solver", item = %item, "balance system is inconsistent");
            return Err(ChainError::Unsatisfiable {
                reason: format!("item '{item}' cannot be balanced with the given imports and exports"),
            });
        }

        let mut counts = ProcessCounts::new();
        for (col, pid) in processes.iter().enumerate() {
            let value = reduction
                .pivot_row(col)
                .map(|r| matrix.get(r, unknowns))
                .unwrap_or(0.0);
            if !value.is_finite() || value < -EPSILON {
                return Err(ChainError::Unsatisfiable {
                    reason: format!("process '{pid}' would need to run {value} times"),
                });
            }
            counts.insert((*pid).clone(), value.max(0.0));
        }

        debug!(target: "ratechain::solver", rank = reduction.rank(), "balance solved");
        Solution::from_counts(chain.clone(), counts)
    }
}
