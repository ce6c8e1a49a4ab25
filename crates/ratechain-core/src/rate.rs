use crate::chain::ProcessChain;
use crate::error::ChainError;
use crate::factory::Factory;
use crate::process::{Process, ProcessKind};
use crate::visitor::{ChainVisitor, VisitorCaps};
use std::collections::HashMap;
use tracing::debug;

/// Converts every standard process into a rate process run by a chosen
/// factory, so that solved counts are machine counts.
///
/// The factory for a process is, in order: the per-process override, the
/// override for its group, then the first registered factory that supports
/// the group. Proxy and already-converted processes pass through unchanged.
#[derive(Debug, Clone, Default)]
pub struct RateConversion {
    factories: Vec<Factory>,
    by_process: HashMap<String, Factory>,
    by_group: HashMap<String, Factory>,
    converted: Vec<Process>,
}

impl RateConversion {
    /// `factories` in registration order.
    pub fn new(factories: Vec<Factory>) -> Self {
        Self {
            factories,
            ..Self::default()
        }
    }

    pub fn with_process_factory(mut self, process_id: &str, factory: Factory) -> Self {
        self.by_process.insert(process_id.to_string(), factory);
        self
    }

    pub fn with_group_factory(mut self, group: &str, factory: Factory) -> Self {
        self.by_group.insert(group.to_string(), factory);
        self
    }

    fn factory_for(&self, process: &Process) -> Option<&Factory> {
        self.by_process
            .get(&process.id)
            .or_else(|| self.by_group.get(process.group.id()))
            .or_else(|| self.factories.iter().find(|f| f.supports(&process.group)))
    }
}

impl ChainVisitor for RateConversion {
    type Output = ProcessChain;

    fn capabilities(&self, _chain: &ProcessChain) -> VisitorCaps {
        VisitorCaps {
            processes: true,
            ..VisitorCaps::default()
        }
    }

    fn visit_process(&mut self, process: &Process) -> Result<(), ChainError> {
        let next = match process.kind {
            ProcessKind::Standard => {
                let factory = self.factory_for(process).ok_or_else(|| ChainError::NoFactory {
                    process: process.id.clone(),
                    group: process.group.id().to_string(),
                })?;
                process.to_rate(factory)
            }
            ProcessKind::Rate { .. } | ProcessKind::Proxy(_) => process.clone(),
        };
        self.converted.push(next);
        Ok(())
    }

    fn finish(self, _chain: &ProcessChain) -> Result<ProcessChain, ChainError> {
        debug!(
            target: "ratechain::chain",
            processes = self.converted.len(),
            "converted to rate processes"
        );
        Ok(ProcessChain::new(self.converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::FactoryGroup;
    use crate::test_utils::{Fixture, assert_close};

    fn smelting(fx: &mut Fixture) -> (ProcessChain, FactoryGroup) {
        let group = FactoryGroup::new("smelting");
        let mut smelt = fx.process_with_duration("smelt", &[("ore", 1.0)], &[("plate", 1.0)], 3.2);
        smelt.group = group.clone();
        let mut steel = fx.process_with_duration("steel", &[("plate", 5.0)], &[("steel", 1.0)], 16.0);
        steel.group = group.clone();
        (ProcessChain::new(vec![smelt, steel]), group)
    }

    #[test]
    fn first_supporting_factory_is_the_default() {
        let mut fx = Fixture::new();
        let (chain, group) = smelting(&mut fx);
        let stone = Factory::new("stone", "Stone furnace", vec![group.clone()]);
        let steel = Factory::new("steel", "Steel furnace", vec![group]).with_multipliers(0.5, 1.0);
        let out = chain
            .accept(RateConversion::new(vec![stone.clone(), steel]))
            .unwrap();

        let smelt = out.get("smelt").unwrap();
        assert_eq!(smelt.factory(), Some(&stone));
        assert_eq!(smelt.duration, 1.0);
        assert_close(smelt.outputs[0].quantity, 1.0 / 3.2);
        assert_close(smelt.inputs[0].quantity, 1.0 / 3.2);
    }

    #[test]
    fn overrides_take_precedence() {
        let mut fx = Fixture::new();
        let (chain, group) = smelting(&mut fx);
        let stone = Factory::new("stone", "Stone furnace", vec![group.clone()]);
        let steel = Factory::new("steel", "Steel furnace", vec![group.clone()]).with_multipliers(0.5, 1.0);
        let electric = Factory::new("electric", "Electric furnace", vec![group]).with_multipliers(0.5, 1.2);

        let out = chain
            .accept(
                RateConversion::new(vec![stone])
                    .with_group_factory("smelting", steel.clone())
                    .with_process_factory("steel", electric.clone()),
            )
            .unwrap();

        assert_eq!(out.get("smelt").unwrap().factory(), Some(&steel));
        let converted = out.get("steel").unwrap();
        assert_eq!(converted.factory(), Some(&electric));
        // 1.2 steel per 8s.
        assert_close(converted.outputs[0].quantity, 1.2 / 8.0);
        assert_close(converted.inputs[0].quantity, 5.0 / 8.0);
    }

    #[test]
    fn missing_factory_is_an_error() {
        let mut fx = Fixture::new();
        let chain = ProcessChain::new(vec![fx.process("gear", &[("plate", 2.0)], &[("gear", 1.0)])]);
        let err = chain
            .accept(RateConversion::new(vec![Factory::new(
                "furnace",
                "Furnace",
                vec![FactoryGroup::new("smelting")],
            )]))
            .unwrap_err();
        assert!(matches!(
            err,
            ChainError::NoFactory { ref process, ref group } if process == "gear" && group == "assembler"
        ));
    }

    #[test]
    fn proxies_pass_through() {
        let mut fx = Fixture::new();
        let chain = ProcessChain::new(vec![fx.process("loop", &[("x", 1.0)], &[("x", 2.0)])])
            .remove_cycles()
            .unwrap();
        let out = chain.accept(RateConversion::new(Vec::new())).unwrap();
        assert!(out.processes()[0].is_proxy());
    }
}
