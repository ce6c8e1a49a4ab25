//! Runs a full analysis: dataset plus configuration in, solution out.
//!
//! Stages, each a pass returning a fresh chain:
//!
//! 1. drop disabled processes
//! 2. keep only processes that feed the targets
//! 3. convert to per-machine rates (optional)
//! 4. collapse cycles into proxies (optional)
//! 5. solve with the configured solver
//! 6. expand proxies back into their members

use crate::analysis::{AnalysisConfig, SolverKind};
use crate::loader::{DataLoadError, load_dataset, resolve_name};
use ratechain_core::balance::{BalanceConfig, BalanceSolver};
use ratechain_core::chain::{PrioritySelector, ProcessChain};
use ratechain_core::dataset::{Dataset, DatasetError};
use ratechain_core::factory::Factory;
use ratechain_core::filter::ReachabilityFilter;
use ratechain_core::rate::RateConversion;
use ratechain_core::solution::Solution;
use ratechain_core::stack::Stack;
use ratechain_core::walk::{RateConfig, RateWalker};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

fn resolve_targets(dataset: &Dataset, config: &AnalysisConfig) -> Result<Vec<Stack>, DataLoadError> {
    config
        .targets
        .iter()
        .map(|target| {
            dataset
                .item(target.item())
                .map(|item| Stack::new(item.clone(), target.quantity()))
                .ok_or_else(|| DataLoadError::UnresolvedRef {
                    file: config.source().to_path_buf(),
                    name: target.item().to_string(),
                    expected_kind: "item",
                })
        })
        .collect()
}

/// Dataset factories with configured modifiers applied, keyed by id.
fn modified_factories(
    dataset: &Dataset,
    config: &AnalysisConfig,
) -> Result<HashMap<String, Factory>, DataLoadError> {
    let mut factories: HashMap<String, Factory> = dataset
        .factories()
        .iter()
        .map(|f| (f.id.clone(), f.clone()))
        .collect();
    for (id, modifier) in &config.modifiers {
        let base = resolve_name(&factories, id, config.source(), "factory")?;
        for (multiplier, value) in [("duration", modifier.duration), ("output", modifier.output)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DataLoadError::Invalid {
                    file: config.source().to_path_buf(),
                    source: DatasetError::InvalidMultiplier {
                        factory: id.clone(),
                        multiplier,
                    },
                });
            }
        }
        let modified = base.modify(modifier.duration, modifier.output);
        factories.insert(id.clone(), modified);
    }
    Ok(factories)
}

fn rate_conversion(dataset: &Dataset, config: &AnalysisConfig) -> Result<RateConversion, DataLoadError> {
    let factories = modified_factories(dataset, config)?;
    let ordered = dataset
        .factories()
        .iter()
        .filter_map(|f| factories.get(&f.id).cloned())
        .collect();

    let mut conversion = RateConversion::new(ordered);
    for (process, factory_id) in &config.factories {
        if dataset.process(process).is_none() {
            return Err(DataLoadError::UnresolvedRef {
                file: config.source().to_path_buf(),
                name: process.clone(),
                expected_kind: "process",
            });
        }
        let factory = resolve_name(&factories, factory_id, config.source(), "factory")?;
        conversion = conversion.with_process_factory(process, factory.clone());
    }
    for (group, factory_id) in &config.group_factories {
        if dataset.group(group).is_none() {
            return Err(DataLoadError::UnresolvedRef {
                file: config.source().to_path_buf(),
                name: group.clone(),
                expected_kind: "factory group",
            });
        }
        let factory = resolve_name(&factories, factory_id, config.source(), "factory")?;
        conversion = conversion.with_group_factory(group, factory.clone());
    }
    Ok(conversion)
}

/// Run the configured analysis over `dataset`.
pub fn run_analysis(dataset: &Dataset, config: &AnalysisConfig) -> Result<Solution, DataLoadError> {
    let targets = resolve_targets(dataset, config)?;
    let target_ids: Vec<&str> = targets.iter().map(|t| t.item.id()).collect();

    for id in &config.disabled {
        if dataset.process(id).is_none() {
            warn!(target: "ratechain::data", process = %id, "disabled process not in dataset");
        }
    }
    let disabled: Vec<&str> = config.disabled.iter().map(String::as_str).collect();
    let mut chain: ProcessChain = dataset.chain().disable(&disabled);

    chain = chain.accept(
        ReachabilityFilter::new(target_ids.iter().copied()).with_imports(config.imports.iter().cloned()),
    )?;
    debug!(target: "ratechain::data", processes = chain.len(), "filtered to targets");

    if config.convert_rates {
        chain = chain.accept(rate_conversion(dataset, config)?)?;
    }

    if config.collapse_cycles {
        chain = chain.remove_cycles()?;
    }

    let solution = match config.solver {
        SolverKind::Walk => {
            let selector = PrioritySelector::new(config.priorities.iter().cloned());
            chain.accept(
                RateWalker::new(targets)
                    .with_imports(config.imports.iter().cloned())
                    .with_selector(&selector)
                    .with_config(RateConfig {
                        implicit_imports: config.implicit_imports,
                    }),
            )?
        }
        SolverKind::Balance => {
            let mut balance = BalanceConfig {
                implicit_imports: config.implicit_imports,
                implicit_exports: config.implicit_exports,
                ..BalanceConfig::default()
            };
            if let Some(tolerance) = config.tolerance {
                balance.tolerance = tolerance;
            }
            chain.accept(
                BalanceSolver::new(targets)
                    .with_imports(config.imports.iter().cloned())
                    .with_exports(config.exports.iter().cloned())
                    .with_config(balance),
            )?
        }
    };

    let solution = if solution.chain.has_proxies() {
        solution.expand_cycles()?
    } else {
        solution
    };

    info!(
        target: "ratechain::data",
        solver = ?config.solver,
        processes = solution.counts.len(),
        imports = solution.imports().len(),
        "analysis complete"
    );
    Ok(solution)
}

/// Load the dataset in `data_dir` and the configuration at `config_path`,
/// then run the analysis.
pub fn analyze(data_dir: &Path, config_path: &Path) -> Result<Solution, DataLoadError> {
    let dataset = load_dataset(data_dir)?;
    let config = crate::analysis::load_analysis(config_path)?;
    run_analysis(&dataset, &config)
}
