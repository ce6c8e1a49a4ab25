//! Demand-propagation solver.
//!
//! Starting from the target rates, each deficit is assigned to the process
//! that produces it, that process's inputs become new deficits, and so on
//! until every deficit is met or reaches an imported item. The walk picks a
//! single producer per item and never revisits a process to rebalance shared
//! byproducts, so it is exact for tree- and DAG-shaped networks only. Use
//! [`BalanceSolver`](crate::balance::BalanceSolver) when flows re-converge.

use crate::chain::{ProcessChain, ProducerSelector};
use crate::error::ChainError;
use crate::solution::{ProcessCounts, Solution};
use crate::stack::{EPSILON, Stack, StackSet};
use crate::visitor::{ChainVisitor, VisitorCaps};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::{debug, trace};

/// Configuration for [`RateWalker`].
#[derive(Debug, Clone)]
pub struct RateConfig {
    /// Items that no process produces are supplied from outside instead of
    /// failing with [`ChainError::UnresolvedItem`].
    pub implicit_imports: bool,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            implicit_imports: true,
        }
    }
}

/// Walks demand from the targets back to raw inputs.
///
/// The chain must be acyclic; collapse cycles with
/// [`CycleRemover`](crate::collapse::CycleRemover) first.
pub struct RateWalker<'s> {
    targets: Vec<Stack>,
    imports: HashSet<String>,
    selector: Option<&'s dyn ProducerSelector>,
    config: RateConfig,
}

impl<'s> RateWalker<'s> {
    pub fn new(targets: Vec<Stack>) -> Self {
        Self {
            targets,
            imports: HashSet::new(),
            selector: None,
            config: RateConfig::default(),
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

    pub fn with_selector(mut self, selector: &'s dyn ProducerSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    pub fn with_config(mut self, config: RateConfig) -> Self {
        self.config = config;
        self
    }
}

impl ChainVisitor for RateWalker<'_> {
    type Output = Solution;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps::initialize_only()
    }

    fn initialize(&mut self, chain: &ProcessChain) -> Result<(), ChainError> {
        if self.targets.is_empty() {
            return Err(ChainError::MissingPrecondition {
                pass: "rate walk",
                requirement: "at least one target".to_string(),
            });
        }
        if !chain.is_acyclic() {
            return Err(ChainError::MissingPrecondition {
                pass: "rate walk",
                requirement: "an acyclic chain (collapse cycles first)".to_string(),
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

    fn finish(self, chain: &ProcessChain) -> Result<Solution, ChainError> {
        // Net rate each item must reach: the target rate, or zero.
        let mut required: BTreeMap<&str, f64> = BTreeMap::new();
        for target in &self.targets {
            *required.entry(target.item.id()).or_default() += target.quantity;
        }

        let mut ledger = StackSet::new();
        let mut counts = ProcessCounts::new();
        let mut queue: VecDeque<Stack> = self
            .targets
            .iter()
            .filter(|t| !self.imports.contains(t.item.id()))
            .cloned()
            .collect();
        let mut steps = 0usize;

        while let Some(demand) = queue.pop_front() {
            let id = demand.item.id();
            // Deficits are re-read at pop time so an item queued twice
            // before it is produced is only made once.
            let goal = required.get(id).copied().unwrap_or(0.0);
            let deficit = goal - ledger.total(id);
            if deficit <= EPSILON {
                trace!(target: "ratechain::solver", item = %id, "deficit already met");
                continue;
            }

            let process = chain.select_producer(id, None, self.selector)?;
            let Some(count) = process.process_count_for_rate(&Stack::new(demand.item.clone(), deficit))
            else {
                continue;
            };
            *counts.entry(process.id.clone()).or_default() += count;
            steps += 1;
            trace!(
                target: "ratechain::solver",
                item = %id,
                process = %process.id,
                count,
                "assigned producer"
            );

            for output in process.output_rates(count) {
                ledger.add(output)?;
            }
            for input in process.input_rates(count) {
                let input_id = input.item.id().to_string();
                let item = input.item.clone();
                ledger.sub(input)?;

                if self.imports.contains(&input_id) {
                    continue;
                }
                if !chain.produces(&input_id) {
                    if self.config.implicit_imports {
                        continue;
                    }
                    return Err(ChainError::UnresolvedItem {
                        item: input_id,
                        requested_by: Some(process.id.clone()),
                    });
                }
                let goal = required.get(input_id.as_str()).copied().unwrap_or(0.0);
                let net = ledger.total(&input_id);
                if net < goal - EPSILON {
                    queue.push_back(Stack::new(item, goal - net));
                }
            }
        }

        debug!(
            target: "ratechain::solver",
            steps,
            processes = counts.len(),
            "rate walk finished"
        );
        Solution::from_counts(chain.clone(), counts)
    }
}

impl std::fmt::Debug for RateWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateWalker")
            .field("targets", &self.targets)
            .field("imports", &self.imports)
            .field("selector", &self.selector.is_some())
            .field("config", &self.config)
            .finish()
    }
}
