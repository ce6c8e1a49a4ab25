//! Ratechain Core -- production-rate analysis for resource-chain games.
//!
//! Given the recipes of a game (processes converting input items into output
//! items over time, run by machines called factories), this crate computes how
//! many of each process must run to sustain a target output rate, and the
//! material flows that follow.
//!
//! # Pass Pipeline
//!
//! Every analysis step is a pass over a [`chain::ProcessChain`] implementing
//! [`visitor::ChainVisitor`]. Passes never modify the chain they are given;
//! each returns a new chain or a result value. A typical run:
//!
//! 1. **Filter** -- [`filter::ReachabilityFilter`] keeps processes that feed
//!    the targets.
//! 2. **Rate conversion** -- [`rate::RateConversion`] normalizes processes to
//!    per-tick quantities for a chosen factory.
//! 3. **Cycle removal** -- [`collapse::CycleRemover`] replaces each loop with a
//!    proxy process carrying its net flows.
//! 4. **Solve** -- [`walk::RateWalker`] (demand walk, trees and DAGs) or
//!    [`balance::BalanceSolver`] (linear system, loops included).
//! 5. **Expansion** -- [`expand::CycleExpander`] turns proxy counts back into
//!    member counts.
//!
//! ```rust,ignore
//! let chain = dataset.chain().remove_cycles()?;
//! let solution = chain
//!     .accept(BalanceSolver::new(vec![Stack::new(gear, 1.0)]))?
//!     .expand_cycles()?;
//! ```
//!
//! # Key Types
//!
//! - [`item::Item`] -- identity-bearing resource handle.
//! - [`stack::Stack`] / [`stack::StackSet`] -- signed quantities and per-item ledgers.
//! - [`process::Process`] -- a recipe, tagged standard, rate, or proxy.
//! - [`dataset::Dataset`] -- validated registry of items, groups, factories, processes.
//! - [`solution::Solution`] -- process counts plus the material ledger.

pub mod balance;
pub mod chain;
pub mod collapse;
pub mod cycle;
pub mod dataset;
pub mod error;
pub mod expand;
pub mod factory;
pub mod filter;
pub mod item;
pub mod matrix;
pub mod process;
pub mod rate;
pub mod render;
pub mod solution;
pub mod stack;
pub mod visitor;
pub mod walk;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
