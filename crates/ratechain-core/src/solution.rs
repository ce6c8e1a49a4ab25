use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::stack::{EPSILON, Stack, StackSet};
use std::collections::BTreeMap;

/// Required count per process id. Counts are the number of copies of the
/// process running in parallel.
pub type ProcessCounts = BTreeMap<String, f64>;

/// The result of a solving pass: the chain that was solved, how many of each
/// process it needs, and the material flows that follow.
#[derive(Debug, Clone)]
pub struct Solution {
    pub chain: ProcessChain,
    pub counts: ProcessCounts,
    /// Per-item ledger of production (positive) and consumption (negative)
    /// per unit time.
    pub materials: StackSet,
}

impl Solution {
    /// Build a solution from counts, deriving the material ledger.
    ///
    /// Every count must name a process in `chain`.
    pub fn from_counts(chain: ProcessChain, counts: ProcessCounts) -> Result<Self, ChainError> {
        if let Some(unknown) = counts.keys().find(|id| !chain.contains(id)) {
            return Err(ChainError::UnknownProcess(unknown.clone()));
        }

        let mut materials = StackSet::new();
        for process in chain.processes() {
            let Some(&count) = counts.get(&process.id) else {
                continue;
            };
            for output in process.output_rates(count) {
                materials.add(output)?;
            }
            for input in process.input_rates(count) {
                materials.sub(input)?;
            }
        }

        Ok(Self {
            chain,
            counts,
            materials,
        })
    }

    /// Count for a process, zero when absent.
    pub fn count(&self, process_id: &str) -> f64 {
        self.counts.get(process_id).copied().unwrap_or(0.0)
    }

    /// Machines needed for a rate process, which runs in unit time so its
    /// count is the number of factories. `None` for other kinds.
    pub fn machine_count(&self, process_id: &str) -> Option<f64> {
        self.chain
            .get(process_id)
            .and_then(|p| p.factory())
            .map(|_| self.count(process_id))
    }

    /// Items the chain consumes more of than it produces, as positive rates.
    pub fn imports(&self) -> Vec<Stack> {
        self.materials
            .items()
            .filter_map(|item| {
                let net = self.materials.total(item.id());
                (net < -EPSILON).then(|| Stack::new(item.clone(), -net))
            })
            .collect()
    }

    /// Items the chain produces more of than it consumes.
    pub fn surplus(&self) -> Vec<Stack> {
        self.materials
            .items()
            .filter_map(|item| {
                let net = self.materials.total(item.id());
                (net > EPSILON).then(|| Stack::new(item.clone(), net))
            })
            .collect()
    }
}
