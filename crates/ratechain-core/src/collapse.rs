use crate::chain::ProcessChain;
use crate::cycle::find_cycles;
use crate::error::ChainError;
use crate::process::Process;
use crate::visitor::{ChainVisitor, VisitorCaps};
use tracing::debug;

/// Replaces cycles with proxy processes until the chain is acyclic.
///
/// Each round collapses the shortest remaining cycle (earliest found on
/// ties) into one proxy carrying the cycle's net stoichiometry, then
/// searches again. A proxy may itself become a member of a later cycle, in
/// which case it nests inside the new proxy.
///
/// Every round removes at least one non-proxy process or shrinks the chain,
/// so the loop ends.
#[derive(Debug, Default)]
pub struct CycleRemover;

impl ChainVisitor for CycleRemover {
    type Output = ProcessChain;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps::default()
    }

    fn finish(self, chain: &ProcessChain) -> Result<ProcessChain, ChainError> {
        let mut current = chain.clone();
        let mut rounds = 0usize;

        loop {
            let cycles = find_cycles(&current);
            let Some(shortest) = cycles.iter().min_by_key(|c| c.len()) else {
                break;
            };

            let members = shortest
                .processes()
                .iter()
                .map(|id| {
                    current
                        .get(id)
                        .cloned()
                        .ok_or_else(|| ChainError::UnknownProcess(id.clone()))
                })
                .collect::<Result<Vec<Process>, ChainError>>()?;
            let proxy = Process::from_cycle(members)?;
            debug!(
                target: "ratechain::cycles",
                proxy = %proxy.id,
                members = shortest.len(),
                remaining = cycles.len() - 1,
                "collapsed cycle"
            );

            let ids: Vec<&str> = shortest.processes().iter().map(String::as_str).collect();
            current = current.replace(&ids, [proxy])?;
            rounds += 1;
        }

        debug!(target: "ratechain::cycles", rounds, processes = current.len(), "chain is acyclic");
        Ok(current)
    }
}

impl ProcessChain {
    /// Shorthand for running [`CycleRemover`].
    pub fn remove_cycles(&self) -> Result<ProcessChain, ChainError> {
        self.accept(CycleRemover)
    }
}
