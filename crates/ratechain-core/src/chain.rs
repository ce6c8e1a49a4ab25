use crate::error::ChainError;
use crate::item::Item;
use crate::process::Process;
use std::collections::{HashMap, HashSet};
use tracing::debug;

// ---------------------------------------------------------------------------
// Producer selection
// ---------------------------------------------------------------------------

/// Picks one producer when several processes output the same item.
///
/// Returns the index into `candidates`, or `None` to decline.
pub trait ProducerSelector {
    fn select(&self, item_id: &str, candidates: &[&Process]) -> Option<usize>;
}

impl<F> ProducerSelector for F
where
    F: Fn(&str, &[&Process]) -> Option<usize>,
{
    fn select(&self, item_id: &str, candidates: &[&Process]) -> Option<usize> {
        self(item_id, candidates)
    }
}

/// Chooses the candidate listed earliest in a preference order of process ids.
#[derive(Debug, Clone, Default)]
pub struct PrioritySelector {
    order: Vec<String>,
}

impl PrioritySelector {
    pub fn new<I, S>(order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            order: order.into_iter().map(Into::into).collect(),
        }
    }
}

impl ProducerSelector for PrioritySelector {
    fn select(&self, _item_id: &str, candidates: &[&Process]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, p)| {
                self.order
                    .iter()
                    .position(|id| *id == p.id)
                    .map(|rank| (rank, idx))
            })
            .min()
            .map(|(_, idx)| idx)
    }
}

// ---------------------------------------------------------------------------
// ProcessChain
// ---------------------------------------------------------------------------

/// A set of processes plus producer and consumer indices.
///
/// The indices map an item id to the positions of the processes that output
/// (`by_output`) or consume (`by_input`) it. They are derived from the
/// process list on construction and never patched: every structural change
/// returns a new chain, leaving the receiver valid for other passes.
#[derive(Debug, Clone, Default)]
pub struct ProcessChain {
    processes: Vec<Process>,
    by_output: HashMap<String, Vec<usize>>,
    by_input: HashMap<String, Vec<usize>>,
}

impl ProcessChain {
    /// Index `processes` as given. Ids are assumed unique (a [`Dataset`]
    /// guarantees this); use [`ProcessChain::try_new`] for lists assembled
    /// from elsewhere.
    ///
    /// [`Dataset`]: crate::dataset::Dataset
    pub fn new(processes: Vec<Process>) -> Self {
        let mut by_output: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_input: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, process) in processes.iter().enumerate() {
            for output in &process.outputs {
                by_output
                    .entry(output.item.id().to_string())
                    .or_default()
                    .push(idx);
            }
            for input in &process.inputs {
                by_input
                    .entry(input.item.id().to_string())
                    .or_default()
                    .push(idx);
            }
        }
        Self {
            processes,
            by_output,
            by_input,
        }
    }

    /// Like [`ProcessChain::new`], but fails with
    /// [`ChainError::DuplicateProcess`] on the first repeated id.
    pub fn try_new(processes: Vec<Process>) -> Result<Self, ChainError> {
        let mut seen = HashSet::new();
        if let Some(dup) = processes.iter().find(|p| !seen.insert(p.id.as_str())) {
            return Err(ChainError::DuplicateProcess(dup.id.clone()));
        }
        Ok(Self::new(processes))
    }

    // -----------------------------------------------------------------------
    // Structural changes (each returns a new chain)
    // -----------------------------------------------------------------------

    /// A chain without the processes named in `ids`. Unknown ids are ignored.
    pub fn disable(&self, ids: &[&str]) -> ProcessChain {
        let kept: Vec<Process> = self
            .processes
            .iter()
            .filter(|p| !ids.contains(&p.id.as_str()))
            .cloned()
            .collect();
        if kept.len() + ids.len() != self.processes.len() {
            debug!(
                target: "ratechain::chain",
                requested = ids.len(),
                removed = self.processes.len() - kept.len(),
                "disable skipped unknown ids"
            );
        }
        ProcessChain::new(kept)
    }

    /// A chain with `processes` appended.
    pub fn enable<I>(&self, processes: I) -> Result<ProcessChain, ChainError>
    where
        I: IntoIterator<Item = Process>,
    {
        self.replace(&[], processes)
    }

    /// Remove `ids` and append `processes` in one step.
    pub fn replace<I>(&self, ids: &[&str], processes: I) -> Result<ProcessChain, ChainError>
    where
        I: IntoIterator<Item = Process>,
    {
        let next: Vec<Process> = self
            .processes
            .iter()
            .filter(|p| !ids.contains(&p.id.as_str()))
            .cloned()
            .chain(processes)
            .collect();
        ProcessChain::try_new(next)
    }

    /// A chain holding only the processes for which `keep` returns true.
    pub fn retain<F>(&self, mut keep: F) -> ProcessChain
    where
        F: FnMut(&Process) -> bool,
    {
        ProcessChain::new(self.processes.iter().filter(|p| keep(p)).cloned().collect())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Process> {
        self.processes.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Positions of the processes that output `item_id`.
    pub fn producer_indices(&self, item_id: &str) -> &[usize] {
        self.by_output
            .get(item_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Positions of the processes that consume `item_id`.
    pub fn consumer_indices(&self, item_id: &str) -> &[usize] {
        self.by_input.get(item_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn producers(&self, item_id: &str) -> Vec<&Process> {
        self.producer_indices(item_id)
            .iter()
            .map(|&idx| &self.processes[idx])
            .collect()
    }

    pub fn consumers(&self, item_id: &str) -> Vec<&Process> {
        self.consumer_indices(item_id)
            .iter()
            .map(|&idx| &self.processes[idx])
            .collect()
    }

    pub fn produces(&self, item_id: &str) -> bool {
        !self.producer_indices(item_id).is_empty()
    }

    pub fn consumes(&self, item_id: &str) -> bool {
        !self.consumer_indices(item_id).is_empty()
    }

    pub fn has_proxies(&self) -> bool {
        self.processes.iter().any(Process::is_proxy)
    }

    /// Every item touched by any process, deduplicated, in first-seen order.
    pub fn all_items(&self) -> Vec<Item> {
        let mut seen: HashSet<Item> = HashSet::new();
        let mut items = Vec::new();
        for process in &self.processes {
            for stack in process.inputs.iter().chain(process.outputs.iter()) {
                if seen.insert(stack.item.clone()) {
                    items.push(stack.item.clone());
                }
            }
        }
        items
    }

    /// The process that should produce `item_id` for `requested_by`.
    ///
    /// A single producer is returned directly. Several producers are handed
    /// to `selector`; without one, or when it declines, the choice is
    /// [`ChainError::AmbiguousProduction`]. No producer at all is
    /// [`ChainError::UnresolvedItem`]; callers that allow imports check
    /// [`produces`](Self::produces) first.
    pub fn select_producer(
        &self,
        item_id: &str,
        requested_by: Option<&str>,
        selector: Option<&dyn ProducerSelector>,
    ) -> Result<&Process, ChainError> {
        let candidates = self.producers(item_id);
        match candidates.as_slice() {
            [] => Err(ChainError::UnresolvedItem {
                item: item_id.to_string(),
                requested_by: requested_by.map(str::to_string),
            }),
            [only] => Ok(*only),
            many => selector
                .and_then(|s| s.select(item_id, many))
                .and_then(|idx| many.get(idx).copied())
                .ok_or_else(|| ChainError::AmbiguousProduction {
                    item: item_id.to_string(),
                    candidates: many.iter().map(|p| p.id.clone()).collect(),
                }),
        }
    }
}
