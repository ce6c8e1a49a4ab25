//! Elementary cycle detection over the process dependency graph.
//!
//! Processes are the nodes. There is an edge from `a` to `b` when some output
//! item of `a` is an input of `b`; a process that consumes its own output has
//! an edge to itself.

use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::visitor::{ChainVisitor, VisitorCaps};
use std::collections::HashSet;
use tracing::{debug, trace};

/// A closed loop of processes, identified by process id.
///
/// Normalized so it starts at its lexicographically smallest id; the order
/// after that follows the edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cycle {
    processes: Vec<String>,
}

impl Cycle {
    /// Build a cycle from ids in edge order, rotating to the canonical start.
    pub fn new(mut processes: Vec<String>) -> Self {
        if let Some(start) = processes
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(idx, _)| idx)
        {
            processes.rotate_left(start);
        }
        Self { processes }
    }

    pub fn processes(&self) -> &[String] {
        &self.processes
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.processes.iter().any(|p| p == id)
    }
}

/// Distinct successors of each process, in output order.
fn successors(chain: &ProcessChain) -> Vec<Vec<usize>> {
    chain
        .processes()
        .iter()
        .map(|process| {
            let mut next = Vec::new();
            for output in &process.outputs {
                for &consumer in chain.consumer_indices(output.item.id()) {
                    if !next.contains(&consumer) {
                        next.push(consumer);
                    }
                }
            }
            next
        })
        .collect()
}

/// Every elementary cycle in `chain`, each reported once, in discovery order.
///
/// Depth-first search runs from every process in chain order, keeping the
/// current path. Reaching a process already on the path closes a cycle: the
/// path slice from that process onward. From root `r` the search only enters
/// processes positioned at or after `r`; any cycle through an earlier process
/// was already enumerated from that process's own root. Duplicates are
/// dropped by comparing normalized forms.
pub fn find_cycles(chain: &ProcessChain) -> Vec<Cycle> {
    let graph = successors(chain);
    let ids: Vec<&str> = chain.processes().iter().map(|p| p.id.as_str()).collect();
    let mut seen: HashSet<Cycle> = HashSet::new();
    let mut cycles = Vec::new();

    for root in 0..graph.len() {
        let mut path: Vec<usize> = vec![root];
        let mut on_path = vec![false; graph.len()];
        on_path[root] = true;
        // Frame: (node, index of the next successor to try).
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];

        while let Some(frame) = stack.last_mut() {
            let (node, next) = *frame;
            let Some(&succ) = graph[node].get(next) else {
                stack.pop();
                path.pop();
                on_path[node] = false;
                continue;
            };
            frame.1 += 1;

            if succ < root {
                continue;
            }
            if on_path[succ] {
                let start = path.iter().position(|&n| n == succ).unwrap_or(0);
                let cycle = Cycle::new(path[start..].iter().map(|&n| ids[n].to_string()).collect());
                if seen.insert(cycle.clone()) {
                    trace!(target: "ratechain::cycles", cycle = ?cycle.processes(), "cycle found");
                    cycles.push(cycle);
                }
                continue;
            }
            on_path[succ] = true;
            path.push(succ);
            stack.push((succ, 0));
        }
    }

    debug!(
        target: "ratechain::cycles",
        processes = graph.len(),
        cycles = cycles.len(),
        "cycle detection finished"
    );
    cycles
}

/// Visitor form of [`find_cycles`].
#[derive(Debug, Default)]
pub struct CycleDetector;

impl ChainVisitor for CycleDetector {
    type Output = Vec<Cycle>;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps::default()
    }

    fn finish(self, chain: &ProcessChain) -> Result<Vec<Cycle>, ChainError> {
        Ok(find_cycles(chain))
    }
}

impl ProcessChain {
    /// Shorthand for [`find_cycles`].
    pub fn cycles(&self) -> Vec<Cycle> {
        find_cycles(self)
    }

    pub fn is_acyclic(&self) -> bool {
        find_cycles(self).is_empty()
    }
}
