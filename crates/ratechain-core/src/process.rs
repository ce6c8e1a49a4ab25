use crate::factory::{Factory, FactoryGroup};
use crate::item::Item;
use crate::stack::{EPSILON, Stack, StackError, StackSet};
use serde::Serialize;
use std::collections::BTreeMap;

/// Group assigned to proxy processes synthesized from cycles.
pub const PROXY_GROUP: &str = "cycle";

/// What a [`Process`] represents beyond its recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProcessKind {
    /// A recipe as defined by the dataset.
    Standard,
    /// A recipe normalized to per-tick quantities for one factory.
    Rate { factory: Factory },
    /// A collapsed cycle of member processes.
    Proxy(Proxy),
}

/// The members of a collapsed cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Proxy {
    /// Member processes in cycle order.
    pub members: Vec<Process>,
    /// How many of each member (by id) must run per unit count of the proxy.
    pub ratios: BTreeMap<String, f64>,
}

/// A recipe converting input stacks into output stacks over `duration`.
///
/// Quantities on either side are per run. An item appears at most once per
/// side; use [`merge_stacks`](crate::stack::merge_stacks) before construction
/// when a source lists duplicates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Process {
    pub id: String,
    pub inputs: Vec<Stack>,
    pub outputs: Vec<Stack>,
    pub duration: f64,
    pub group: FactoryGroup,
    pub kind: ProcessKind,
}

impl Process {
    pub fn new(
        id: &str,
        inputs: Vec<Stack>,
        outputs: Vec<Stack>,
        duration: f64,
        group: FactoryGroup,
    ) -> Self {
        Self {
            id: id.to_string(),
            inputs,
            outputs,
            duration,
            group,
            kind: ProcessKind::Standard,
        }
    }

    /// Build a proxy from the members of a cycle.
    ///
    /// One run of the proxy is one run of every member. Flows between members
    /// cancel; the net surplus of each item becomes an output and the net
    /// deficit an input. The proxy runs in a unit duration, so a member's
    /// ratio is its own duration: that many parallel copies of it keep pace
    /// with one proxy run per tick.
    pub fn from_cycle(members: Vec<Process>) -> Result<Process, StackError> {
        let mut net = StackSet::new();
        for member in &members {
            for output in &member.outputs {
                net.add(output.clone())?;
            }
            for input in &member.inputs {
                net.sub(input.clone())?;
            }
        }

        let mut inputs = Vec::new();
        let mut outputs = Vec::new();
        for item in net.items() {
            let total = net.total(item.id());
            if total > EPSILON {
                outputs.push(Stack::new(item.clone(), total));
            } else if total < -EPSILON {
                inputs.push(Stack::new(item.clone(), -total));
            }
        }

        let ids: Vec<&str> = members.iter().map(|m| m.id.as_str()).collect();
        let id = format!("cycle({})", ids.join("+"));
        let ratios = members
            .iter()
            .map(|m| (m.id.clone(), m.duration))
            .collect();

        Ok(Process {
            id,
            inputs,
            outputs,
            duration: 1.0,
            group: FactoryGroup::new(PROXY_GROUP),
            kind: ProcessKind::Proxy(Proxy { members, ratios }),
        })
    }

    /// This process run by `factory`, normalized to one tick: the factory's
    /// multipliers are applied, then every quantity is divided by the adjusted
    /// duration.
    pub fn to_rate(&self, factory: &Factory) -> Process {
        let adjusted = factory.update_process(self);
        let duration = adjusted.duration;
        Process {
            id: adjusted.id,
            inputs: adjusted.inputs.iter().map(|s| s.div(duration)).collect(),
            outputs: adjusted.outputs.iter().map(|s| s.div(duration)).collect(),
            duration: 1.0,
            group: adjusted.group,
            kind: ProcessKind::Rate {
                factory: factory.clone(),
            },
        }
    }

    pub fn output(&self, item: &Item) -> Option<&Stack> {
        self.outputs.iter().find(|s| &s.item == item)
    }

    pub fn input(&self, item: &Item) -> Option<&Stack> {
        self.inputs.iter().find(|s| &s.item == item)
    }

    pub fn produces(&self, item_id: &str) -> bool {
        self.outputs.iter().any(|s| s.item.id() == item_id)
    }

    pub fn consumes(&self, item_id: &str) -> bool {
        self.inputs.iter().any(|s| s.item.id() == item_id)
    }

    /// Rate of `item` produced by `count` of this process running in parallel.
    pub fn production_rate(&self, item: &Item, count: f64) -> Option<Stack> {
        self.output(item)
            .map(|out| Stack::new(item.clone(), count * out.quantity / self.duration))
    }

    /// How many of this process must run to produce `rate`. Inverse of
    /// [`production_rate`](Self::production_rate).
    pub fn process_count_for_rate(&self, rate: &Stack) -> Option<f64> {
        self.output(&rate.item)
            .map(|out| self.duration * rate.quantity / out.quantity)
    }

    /// Inputs consumed by `count` runs.
    pub fn requirements_for_count(&self, count: f64) -> Vec<Stack> {
        self.inputs.iter().map(|s| s.mul(count)).collect()
    }

    /// Input consumption per unit time for `count` parallel processes.
    pub fn input_rates(&self, count: f64) -> Vec<Stack> {
        self.inputs
            .iter()
            .map(|s| s.mul(count / self.duration))
            .collect()
    }

    /// Output production per unit time for `count` parallel processes.
    pub fn output_rates(&self, count: f64) -> Vec<Stack> {
        self.outputs
            .iter()
            .map(|s| s.mul(count / self.duration))
            .collect()
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self.kind, ProcessKind::Proxy(_))
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match &self.kind {
            ProcessKind::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// The factory a rate process was normalized for.
    pub fn factory(&self) -> Option<&Factory> {
        match &self.kind {
            ProcessKind::Rate { factory } => Some(factory),
            _ => None,
        }
    }
}
