use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::solution::{ProcessCounts, Solution};
use crate::visitor::{ChainVisitor, VisitorCaps};
use tracing::debug;

/// Reinstates the members of every proxy process, scaling the proxy's count
/// by each member's ratio. Proxies nested inside proxies are expanded in
/// turn until none remain. The material ledger is rebuilt from the expanded
/// counts.
///
/// A proxy without a count is expanded without contributing counts.
#[derive(Debug)]
pub struct CycleExpander {
    counts: ProcessCounts,
}

impl CycleExpander {
    pub fn new(counts: ProcessCounts) -> Self {
        Self { counts }
    }
}

impl ChainVisitor for CycleExpander {
    type Output = Solution;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps::initialize_only()
    }

    fn initialize(&mut self, chain: &ProcessChain) -> Result<(), ChainError> {
        if let Some(stray) = self.counts.keys().find(|id| !chain.contains(id)) {
            return Err(ChainError::MissingPrecondition {
                pass: "cycle expansion",
                requirement: format!(
                    "process counts computed for this chain (no process '{stray}')"
                ),
            });
        }
        Ok(())
    }

    fn finish(mut self, chain: &ProcessChain) -> Result<Solution, ChainError> {
        let mut current = chain.clone();

        while let Some(proxy_process) = current.processes().iter().find(|p| p.is_proxy()).cloned() {
            let Some(proxy) = proxy_process.as_proxy() else {
                break;
            };
            if let Some(count) = self.counts.remove(&proxy_process.id) {
                for member in &proxy.members {
                    let ratio = proxy.ratios.get(&member.id).copied().unwrap_or(1.0);
                    *self.counts.entry(member.id.clone()).or_default() += count * ratio;
                }
            }
            debug!(
                target: "ratechain::cycles",
                proxy = %proxy_process.id,
                members = proxy.members.len(),
                "expanded proxy"
            );
            current = current.replace(&[proxy_process.id.as_str()], proxy.members.iter().cloned())?;
        }

        Solution::from_counts(current, self.counts)
    }
}

impl Solution {
    /// Expand every proxy in the solved chain back into its members.
    pub fn expand_cycles(self) -> Result<Solution, ChainError> {
        self.chain.accept(CycleExpander::new(self.counts))
    }
}
