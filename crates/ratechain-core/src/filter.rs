use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::visitor::{ChainVisitor, VisitorCaps};
use std::collections::{BTreeSet, HashSet, VecDeque};
use tracing::debug;

/// Keeps only the processes that feed the target items.
///
/// Walks the producer index upstream from each target: every producer of a
/// reached item is kept and its inputs are reached in turn. Imported items
/// are reached but not walked past.
#[derive(Debug, Clone, Default)]
pub struct ReachabilityFilter {
    targets: Vec<String>,
    imports: HashSet<String>,
}

impl ReachabilityFilter {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            imports: HashSet::new(),
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
}

impl ChainVisitor for ReachabilityFilter {
    type Output = ProcessChain;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps::default()
    }

    fn finish(self, chain: &ProcessChain) -> Result<ProcessChain, ChainError> {
        let mut reached: HashSet<String> = HashSet::new();
        let mut kept: BTreeSet<usize> = BTreeSet::new();
        let mut queue: VecDeque<String> = self.targets.iter().cloned().collect();

        while let Some(item) = queue.pop_front() {
            if !reached.insert(item.clone()) || self.imports.contains(&item) {
                continue;
            }
            for &idx in chain.producer_indices(&item) {
                if !kept.insert(idx) {
                    continue;
                }
                for input in &chain.processes()[idx].inputs {
                    queue.push_back(input.item.id().to_string());
                }
            }
        }

        let ids: HashSet<&str> = kept
            .iter()
            .map(|&idx| chain.processes()[idx].id.as_str())
            .collect();
        debug!(
            target: "ratechain::chain",
            kept = ids.len(),
            dropped = chain.len() - ids.len(),
            "reachability filter"
        );
        Ok(chain.retain(|p| ids.contains(p.id.as_str())))
    }
}
